//! MurmurHash3 in its three reference shapes.
//!
//! - `x86_32`: one 32-bit state word, 4-byte blocks.
//! - `x86_128`: four 32-bit state words, 16-byte blocks.
//! - `x64_128`: two 64-bit state words, 16-byte blocks.
//!
//! 128-bit digests are packed little-endian: the first state word lands in
//! the low bits of the returned `u128`, matching the byte order the reference
//! implementation writes to its output buffer.

use crate::bits::fmix32;
use crate::bits::fmix64;
use crate::bits::read_u32;
use crate::bits::read_u64;
use crate::bits::rotl32;
use crate::bits::rotl64;

const X86_32_C1: u32 = 0xcc9e_2d51;
const X86_32_C2: u32 = 0x1b87_3593;

const X86_128_C1: u32 = 0x239b_961b;
const X86_128_C2: u32 = 0xab0e_9789;
const X86_128_C3: u32 = 0x38b3_4ae5;
const X86_128_C4: u32 = 0xa1e3_8b93;

const X64_128_C1: u64 = 0x87c3_7b91_1142_53d5;
const X64_128_C2: u64 = 0x4cf5_ad43_2745_937f;

/// Folds a partial block (at most eight bytes) into a little-endian word.
#[inline(always)]
fn tail_word(tail: &[u8]) -> u64 {
    tail.iter()
        .rev()
        .fold(0u64, |acc, &byte| (acc << 8) | byte as u64)
}

/// The `(digest width, word width)` combinations Murmur3 is defined for.
///
/// The 128-bit digest exists in two incompatible flavours, one per target
/// word width. [`Variant::NATIVE_128`] names the one matching this build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant {
    /// 32-bit digest.
    X86_32,
    /// 128-bit digest computed with 32-bit arithmetic.
    X86_128,
    /// 128-bit digest computed with 64-bit arithmetic.
    X64_128,
}

impl Variant {
    /// The 128-bit variant for the target's native word width.
    pub const NATIVE_128: Variant = if cfg!(target_pointer_width = "64") {
        Variant::X64_128
    } else {
        Variant::X86_128
    };

    /// Width of the digest in bits.
    pub const fn digest_bits(self) -> u32 {
        match self {
            Variant::X86_32 => 32,
            Variant::X86_128 | Variant::X64_128 => 128,
        }
    }

    /// Hashes `data` with this variant. 32-bit digests occupy the low bits.
    pub fn hash(self, data: &[u8], seed: u32) -> u128 {
        match self {
            Variant::X86_32 => murmur3_x86_32(data, seed) as u128,
            Variant::X86_128 => murmur3_x86_128(data, seed),
            Variant::X64_128 => murmur3_x64_128(data, seed),
        }
    }
}

/// MurmurHash3 with a 32-bit digest.
///
/// # Examples
///
/// ```rust
/// use prime_chain::murmur3::murmur3_x86_32;
///
/// assert_eq!(murmur3_x86_32(b"", 0), 0);
/// assert_eq!(murmur3_x86_32(b"hello", 0), 0x248b_fa47);
/// ```
pub fn murmur3_x86_32(data: &[u8], seed: u32) -> u32 {
    let mut h1 = seed;

    let mut blocks = data.chunks_exact(4);
    for block in &mut blocks {
        let mut k1 = read_u32(block, 0);
        k1 = k1.wrapping_mul(X86_32_C1);
        k1 = rotl32(k1, 15);
        k1 = k1.wrapping_mul(X86_32_C2);

        h1 ^= k1;
        h1 = rotl32(h1, 13);
        h1 = h1.wrapping_mul(5).wrapping_add(0xe654_6b64);
    }

    let tail = blocks.remainder();
    if !tail.is_empty() {
        let mut k1 = tail_word(tail) as u32;
        k1 = k1.wrapping_mul(X86_32_C1);
        k1 = rotl32(k1, 15);
        k1 = k1.wrapping_mul(X86_32_C2);
        h1 ^= k1;
    }

    h1 ^= data.len() as u32;
    fmix32(h1)
}

/// MurmurHash3 with a 128-bit digest, 32-bit arithmetic.
pub fn murmur3_x86_128(data: &[u8], seed: u32) -> u128 {
    let [mut h1, mut h2, mut h3, mut h4] = [seed; 4];

    let mut blocks = data.chunks_exact(16);
    for block in &mut blocks {
        let mut k1 = read_u32(block, 0);
        let mut k2 = read_u32(block, 4);
        let mut k3 = read_u32(block, 8);
        let mut k4 = read_u32(block, 12);

        k1 = rotl32(k1.wrapping_mul(X86_128_C1), 15).wrapping_mul(X86_128_C2);
        h1 ^= k1;
        h1 = rotl32(h1, 19).wrapping_add(h2);
        h1 = h1.wrapping_mul(5).wrapping_add(0x561c_cd1b);

        k2 = rotl32(k2.wrapping_mul(X86_128_C2), 16).wrapping_mul(X86_128_C3);
        h2 ^= k2;
        h2 = rotl32(h2, 17).wrapping_add(h3);
        h2 = h2.wrapping_mul(5).wrapping_add(0x0bca_a747);

        k3 = rotl32(k3.wrapping_mul(X86_128_C3), 17).wrapping_mul(X86_128_C4);
        h3 ^= k3;
        h3 = rotl32(h3, 15).wrapping_add(h4);
        h3 = h3.wrapping_mul(5).wrapping_add(0x96cd_1c35);

        k4 = rotl32(k4.wrapping_mul(X86_128_C4), 18).wrapping_mul(X86_128_C1);
        h4 ^= k4;
        h4 = rotl32(h4, 13).wrapping_add(h1);
        h4 = h4.wrapping_mul(5).wrapping_add(0x32ac_3b17);
    }

    // Each partial lane only exists once the tail reaches into it; the lanes
    // are folded highest first like the reference fall-through switch.
    let tail = blocks.remainder();
    if tail.len() > 12 {
        let k4 = tail_word(&tail[12..]) as u32;
        h4 ^= rotl32(k4.wrapping_mul(X86_128_C4), 18).wrapping_mul(X86_128_C1);
    }
    if tail.len() > 8 {
        let k3 = tail_word(&tail[8..tail.len().min(12)]) as u32;
        h3 ^= rotl32(k3.wrapping_mul(X86_128_C3), 17).wrapping_mul(X86_128_C4);
    }
    if tail.len() > 4 {
        let k2 = tail_word(&tail[4..tail.len().min(8)]) as u32;
        h2 ^= rotl32(k2.wrapping_mul(X86_128_C2), 16).wrapping_mul(X86_128_C3);
    }
    if !tail.is_empty() {
        let k1 = tail_word(&tail[..tail.len().min(4)]) as u32;
        h1 ^= rotl32(k1.wrapping_mul(X86_128_C1), 15).wrapping_mul(X86_128_C2);
    }

    let len = data.len() as u32;
    h1 ^= len;
    h2 ^= len;
    h3 ^= len;
    h4 ^= len;

    h1 = h1.wrapping_add(h2).wrapping_add(h3).wrapping_add(h4);
    h2 = h2.wrapping_add(h1);
    h3 = h3.wrapping_add(h1);
    h4 = h4.wrapping_add(h1);

    h1 = fmix32(h1);
    h2 = fmix32(h2);
    h3 = fmix32(h3);
    h4 = fmix32(h4);

    h1 = h1.wrapping_add(h2).wrapping_add(h3).wrapping_add(h4);
    h2 = h2.wrapping_add(h1);
    h3 = h3.wrapping_add(h1);
    h4 = h4.wrapping_add(h1);

    (h1 as u128) | ((h2 as u128) << 32) | ((h3 as u128) << 64) | ((h4 as u128) << 96)
}

/// MurmurHash3 with a 128-bit digest, 64-bit arithmetic.
///
/// # Examples
///
/// ```rust
/// use prime_chain::murmur3::murmur3_x64_128;
///
/// let digest = murmur3_x64_128(b"hello", 0);
/// assert_eq!(digest as u64, 0xcbd8_a7b3_41bd_9b02);
/// assert_eq!((digest >> 64) as u64, 0x5b1e_906a_48ae_1d19);
/// ```
pub fn murmur3_x64_128(data: &[u8], seed: u32) -> u128 {
    let mut h1 = seed as u64;
    let mut h2 = seed as u64;

    let mut blocks = data.chunks_exact(16);
    for block in &mut blocks {
        let mut k1 = read_u64(block, 0);
        let mut k2 = read_u64(block, 8);

        k1 = rotl64(k1.wrapping_mul(X64_128_C1), 31).wrapping_mul(X64_128_C2);
        h1 ^= k1;
        h1 = rotl64(h1, 27).wrapping_add(h2);
        h1 = h1.wrapping_mul(5).wrapping_add(0x52dc_e729);

        k2 = rotl64(k2.wrapping_mul(X64_128_C2), 33).wrapping_mul(X64_128_C1);
        h2 ^= k2;
        h2 = rotl64(h2, 31).wrapping_add(h1);
        h2 = h2.wrapping_mul(5).wrapping_add(0x3849_5ab5);
    }

    let tail = blocks.remainder();
    if tail.len() > 8 {
        let k2 = tail_word(&tail[8..]);
        h2 ^= rotl64(k2.wrapping_mul(X64_128_C2), 33).wrapping_mul(X64_128_C1);
    }
    if !tail.is_empty() {
        let k1 = tail_word(&tail[..tail.len().min(8)]);
        h1 ^= rotl64(k1.wrapping_mul(X64_128_C1), 31).wrapping_mul(X64_128_C2);
    }

    let len = data.len() as u64;
    h1 ^= len;
    h2 ^= len;

    h1 = h1.wrapping_add(h2);
    h2 = h2.wrapping_add(h1);

    h1 = fmix64(h1);
    h2 = fmix64(h2);

    h1 = h1.wrapping_add(h2);
    h2 = h2.wrapping_add(h1);

    (h1 as u128) | ((h2 as u128) << 64)
}

/// MurmurHash3 with a 128-bit digest, using the flavour native to this
/// target's word width.
#[inline]
pub fn murmur3_128(data: &[u8], seed: u32) -> u128 {
    Variant::NATIVE_128.hash(data, seed)
}
