//! Rotate and multiply-xor-shift primitives shared by the hash families.

/// Multiplier used by [`hash_128_to_64`].
const K_MUL: u64 = 0x9ddf_ea08_eb38_2d69;

/// Rotates `x` left by `r` bits.
#[inline(always)]
pub const fn rotl32(x: u32, r: u32) -> u32 {
    x.rotate_left(r)
}

/// Rotates `x` left by `r` bits.
#[inline(always)]
pub const fn rotl64(x: u64, r: u32) -> u64 {
    x.rotate_left(r)
}

/// Rotates `x` right by `shift` bits. A zero shift returns `x` unchanged.
#[inline(always)]
pub const fn rotr64(x: u64, shift: u32) -> u64 {
    x.rotate_right(shift)
}

/// Rotates `x` right by `shift` bits, where `shift` is in `1..64`.
///
/// This is the branch-free form CityHash uses when the shift is known to be
/// non-zero. Calling it with `shift == 0` is a logic error: it is checked in
/// debug builds only.
#[inline(always)]
pub const fn rotr64_at_least_one(x: u64, shift: u32) -> u64 {
    debug_assert!(shift > 0 && shift < 64);
    (x >> shift) | (x << (64 - shift))
}

/// Rotates a platform word right by `shift` bits.
#[inline(always)]
pub const fn rotate_word(x: usize, shift: u32) -> usize {
    x.rotate_right(shift)
}

/// Murmur3 32-bit finalizer: forces every input bit to affect every output
/// bit.
#[inline(always)]
pub const fn fmix32(mut h: u32) -> u32 {
    h ^= h >> 16;
    h = h.wrapping_mul(0x85eb_ca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2_ae35);
    h ^= h >> 16;
    h
}

/// Murmur3 64-bit finalizer.
#[inline(always)]
pub const fn fmix64(mut k: u64) -> u64 {
    k ^= k >> 33;
    k = k.wrapping_mul(0xff51_afd7_ed55_8ccd);
    k ^= k >> 33;
    k = k.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
    k ^= k >> 33;
    k
}

/// CityHash's `v ^ (v >> 47)` step.
#[inline(always)]
pub const fn shift_mix(v: u64) -> u64 {
    v ^ (v >> 47)
}

/// Folds a 128-bit value (`lo`, `hi`) into 64 bits.
///
/// Murmur-inspired; this is the "hash two words into one" step used
/// throughout the CityHash family.
#[inline(always)]
pub const fn hash_128_to_64(lo: u64, hi: u64) -> u64 {
    let mut a = (lo ^ hi).wrapping_mul(K_MUL);
    a ^= a >> 47;
    let mut b = (hi ^ a).wrapping_mul(K_MUL);
    b ^= b >> 47;
    b.wrapping_mul(K_MUL)
}

/// Reads a little-endian `u32` at `offset`.
///
/// Panics if fewer than four bytes remain; every caller has already checked
/// the length band it is in.
#[inline(always)]
pub(crate) fn read_u32(data: &[u8], offset: usize) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&data[offset..offset + 4]);
    u32::from_le_bytes(word)
}

/// Reads a little-endian `u64` at `offset`.
#[inline(always)]
pub(crate) fn read_u64(data: &[u8], offset: usize) -> u64 {
    let mut word = [0u8; 8];
    word.copy_from_slice(&data[offset..offset + 8]);
    u64::from_le_bytes(word)
}
