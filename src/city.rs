//! CityHash (v1.0.3 layout) with 64-bit and 128-bit digests.
//!
//! Inputs are hashed by length band:
//!
//! | length     | strategy                                               |
//! |------------|--------------------------------------------------------|
//! | `0..=16`   | closed-form mix of at most two loads and the length    |
//! | `17..=32`  | four loads from both ends, one 16-byte fold            |
//! | `33..=64`  | two `(fast, slow)` sum pairs, one per half             |
//! | `> 64`     | 64-byte rounds over two accumulators and two weak pairs |
//!
//! The 128-bit digest uses [`city_murmur`] below 128 bytes and an unrolled
//! 128-byte round above it.

use crate::bits::hash_128_to_64;
use crate::bits::read_u32;
use crate::bits::read_u64;
use crate::bits::rotr64;
use crate::bits::rotr64_at_least_one;
use crate::bits::shift_mix;

const K0: u64 = 0xc3a5_c85c_97cb_3127;
const K1: u64 = 0xb492_b66f_be98_f273;
/// Digest of the empty input for [`city_hash64`].
pub const K2: u64 = 0x9ae1_6a3b_2f90_404f;
const K3: u64 = 0xc949_d7c7_509e_6557;

#[inline(always)]
fn hash_len16(u: u64, v: u64) -> u64 {
    hash_128_to_64(u, v)
}

#[inline(always)]
fn low64(value: u128) -> u64 {
    value as u64
}

#[inline(always)]
fn high64(value: u128) -> u64 {
    (value >> 64) as u64
}

#[inline(always)]
fn pack(lo: u64, hi: u64) -> u128 {
    (lo as u128) | ((hi as u128) << 64)
}

fn hash_len_0_to_16(s: &[u8]) -> u64 {
    let len = s.len();
    if len > 8 {
        let a = read_u64(s, 0);
        let b = read_u64(s, len - 8);
        return hash_len16(a, rotr64_at_least_one(b.wrapping_add(len as u64), len as u32)) ^ b;
    }
    if len >= 4 {
        let a = read_u32(s, 0) as u64;
        return hash_len16((len as u64).wrapping_add(a << 3), read_u32(s, len - 4) as u64);
    }
    if len > 0 {
        let a = s[0] as u32;
        let b = s[len >> 1] as u32;
        let c = s[len - 1] as u32;
        let y = a.wrapping_add(b << 8);
        let z = (len as u32).wrapping_add(c << 2);
        return shift_mix((y as u64).wrapping_mul(K2) ^ (z as u64).wrapping_mul(K3))
            .wrapping_mul(K2);
    }
    K2
}

fn hash_len_17_to_32(s: &[u8]) -> u64 {
    let len = s.len();
    let a = read_u64(s, 0).wrapping_mul(K1);
    let b = read_u64(s, 8);
    let c = read_u64(s, len - 8).wrapping_mul(K2);
    let d = read_u64(s, len - 16).wrapping_mul(K0);
    hash_len16(
        rotr64(a.wrapping_sub(b), 43)
            .wrapping_add(rotr64(c, 30))
            .wrapping_add(d),
        a.wrapping_add(rotr64(b ^ K3, 20))
            .wrapping_sub(c)
            .wrapping_add(len as u64),
    )
}

/// Weak hash of 32 bytes `w, x, y, z` folded into seeds `a, b`.
///
/// Returns a `(first, second)` pair; only strong enough as an intermediate.
#[inline(always)]
fn weak_hash_len32_with_seeds_words(
    w: u64,
    x: u64,
    y: u64,
    z: u64,
    mut a: u64,
    mut b: u64,
) -> (u64, u64) {
    a = a.wrapping_add(w);
    b = rotr64(b.wrapping_add(a).wrapping_add(z), 21);
    let c = a;
    a = a.wrapping_add(x);
    a = a.wrapping_add(y);
    b = b.wrapping_add(rotr64(a, 44));
    (a.wrapping_add(z), b.wrapping_add(c))
}

#[inline(always)]
fn weak_hash_len32_with_seeds(s: &[u8], offset: usize, a: u64, b: u64) -> (u64, u64) {
    weak_hash_len32_with_seeds_words(
        read_u64(s, offset),
        read_u64(s, offset + 8),
        read_u64(s, offset + 16),
        read_u64(s, offset + 24),
        a,
        b,
    )
}

/// Folds the two words at `offsets` into a `(fast, slow)` sum pair, starting
/// from the running sum `a` and the end word `z`.
#[inline(always)]
fn half_sums(s: &[u8], mut a: u64, z: u64, offsets: [usize; 2]) -> (u64, u64) {
    let b = rotr64(a.wrapping_add(z), 52);
    let mut c = rotr64(a, 37);
    a = a.wrapping_add(read_u64(s, offsets[0]));
    c = c.wrapping_add(rotr64(a, 7));
    a = a.wrapping_add(read_u64(s, offsets[1]));
    (
        a.wrapping_add(z),
        b.wrapping_add(rotr64(a, 31)).wrapping_add(c),
    )
}

fn hash_len_33_to_64(s: &[u8]) -> u64 {
    let len = s.len();

    let z = read_u64(s, 24);
    let a = read_u64(s, 0).wrapping_add(
        (len as u64)
            .wrapping_add(read_u64(s, len - 16))
            .wrapping_mul(K0),
    );
    let (vf, vs) = half_sums(s, a, z, [8, 16]);

    let a = read_u64(s, 16).wrapping_add(read_u64(s, len - 32));
    let z = read_u64(s, len - 8);
    let (wf, ws) = half_sums(s, a, z, [len - 24, len - 16]);

    let r = shift_mix(
        vf.wrapping_add(ws)
            .wrapping_mul(K2)
            .wrapping_add(wf.wrapping_add(vs).wrapping_mul(K0)),
    );
    shift_mix(r.wrapping_mul(K0).wrapping_add(vs)).wrapping_mul(K2)
}

/// The state carried across 64-byte rounds.
struct LongState {
    x: u64,
    y: u64,
    z: u64,
    v: (u64, u64),
    w: (u64, u64),
}

impl LongState {
    /// Consumes the 64 bytes at `offset`.
    #[inline(always)]
    fn round(&mut self, s: &[u8], offset: usize) {
        self.x = rotr64(
            self.x
                .wrapping_add(self.y)
                .wrapping_add(self.v.0)
                .wrapping_add(read_u64(s, offset + 8)),
            37,
        )
        .wrapping_mul(K1);
        self.y = rotr64(
            self.y
                .wrapping_add(self.v.1)
                .wrapping_add(read_u64(s, offset + 48)),
            42,
        )
        .wrapping_mul(K1);
        self.x ^= self.w.1;
        self.y = self
            .y
            .wrapping_add(self.v.0)
            .wrapping_add(read_u64(s, offset + 40));
        self.z = rotr64(self.z.wrapping_add(self.w.0), 33).wrapping_mul(K1);
        self.v = weak_hash_len32_with_seeds(
            s,
            offset,
            self.v.1.wrapping_mul(K1),
            self.x.wrapping_add(self.w.0),
        );
        self.w = weak_hash_len32_with_seeds(
            s,
            offset + 32,
            self.z.wrapping_add(self.w.1),
            self.y.wrapping_add(read_u64(s, offset + 16)),
        );
        core::mem::swap(&mut self.z, &mut self.x);
    }
}

/// CityHash64 of `s`.
///
/// # Examples
///
/// ```rust
/// use prime_chain::city::K2;
/// use prime_chain::city::city_hash64;
///
/// assert_eq!(city_hash64(b""), K2);
/// assert_eq!(city_hash64(b"abc"), city_hash64(b"abc"));
/// ```
pub fn city_hash64(s: &[u8]) -> u64 {
    let len = s.len();
    if len <= 32 {
        if len <= 16 {
            return hash_len_0_to_16(s);
        }
        return hash_len_17_to_32(s);
    }
    if len <= 64 {
        return hash_len_33_to_64(s);
    }

    // Seed the state from the last 64 bytes, then run the rounds from the
    // front over every whole 64-byte block before the tail.
    let x = read_u64(s, len - 40);
    let y = read_u64(s, len - 16).wrapping_add(read_u64(s, len - 56));
    let z = hash_len16(read_u64(s, len - 48).wrapping_add(len as u64), read_u64(s, len - 24));
    let v = weak_hash_len32_with_seeds(s, len - 64, len as u64, z);
    let w = weak_hash_len32_with_seeds(s, len - 32, y.wrapping_add(K1), x);
    let mut state = LongState {
        x: x.wrapping_mul(K1).wrapping_add(read_u64(s, 0)),
        y,
        z,
        v,
        w,
    };

    let rounded = (len - 1) & !63;
    let mut offset = 0;
    while offset < rounded {
        state.round(s, offset);
        offset += 64;
    }

    let LongState { x, y, z, v, w } = state;
    hash_len16(
        hash_len16(v.0, w.0)
            .wrapping_add(shift_mix(y).wrapping_mul(K1))
            .wrapping_add(z),
        hash_len16(v.1, w.1).wrapping_add(x),
    )
}

/// CityHash64 of `s` folded with two seeds.
pub fn city_hash64_with_seeds(s: &[u8], seed0: u64, seed1: u64) -> u64 {
    hash_len16(city_hash64(s).wrapping_sub(seed0), seed1)
}

/// CityHash64 of `s` folded with one seed.
pub fn city_hash64_with_seed(s: &[u8], seed: u64) -> u64 {
    city_hash64_with_seeds(s, K2, seed)
}

/// 128-bit hash of short inputs, blending CityHash mixing with a Murmur
/// style multiply-rotate loop over 16-byte blocks.
///
/// `seed` packs `(low, high)` words like every 128-bit value in this crate.
pub fn city_murmur(s: &[u8], seed: u128) -> u128 {
    let len = s.len();
    let mut a = low64(seed);
    let mut b = high64(seed);
    let mut c;
    let mut d;

    if len <= 16 {
        a = shift_mix(a.wrapping_mul(K1)).wrapping_mul(K1);
        c = b.wrapping_mul(K1).wrapping_add(hash_len_0_to_16(s));
        d = shift_mix(a.wrapping_add(if len >= 8 { read_u64(s, 0) } else { c }));
    } else {
        c = hash_len16(read_u64(s, len - 8).wrapping_add(K1), a);
        d = hash_len16(b.wrapping_add(len as u64), c.wrapping_add(read_u64(s, len - 16)));
        a = a.wrapping_add(d);

        // Blocks start at 0 and stop once fewer than 16 bytes would remain
        // past the block, so the last block may overlap the tail.
        let mut offset = 0;
        let mut remaining = len as isize - 16;
        while remaining > 0 {
            a ^= shift_mix(read_u64(s, offset).wrapping_mul(K1)).wrapping_mul(K1);
            a = a.wrapping_mul(K1);
            b ^= a;
            c ^= shift_mix(read_u64(s, offset + 8).wrapping_mul(K1)).wrapping_mul(K1);
            c = c.wrapping_mul(K1);
            d ^= c;
            offset += 16;
            remaining -= 16;
        }
    }

    let a = hash_len16(a, c);
    let b = hash_len16(d, b);
    pack(a ^ b, hash_len16(b, a))
}

/// CityHash128 of `s` with an explicit seed.
pub fn city_hash128_with_seed(s: &[u8], seed: u128) -> u128 {
    let mut len = s.len();
    if len < 128 {
        return city_murmur(s, seed);
    }

    let x = low64(seed);
    let y = high64(seed);
    let z = (len as u64).wrapping_mul(K1);
    let v0 = rotr64(y ^ K1, 49).wrapping_mul(K1).wrapping_add(read_u64(s, 0));
    let v1 = rotr64(v0, 42).wrapping_mul(K1).wrapping_add(read_u64(s, 8));
    let w0 = rotr64(y.wrapping_add(z), 35).wrapping_mul(K1).wrapping_add(x);
    let w1 = rotr64(x.wrapping_add(read_u64(s, 88)), 53).wrapping_mul(K1);
    let mut state = LongState {
        x,
        y,
        z,
        v: (v0, v1),
        w: (w0, w1),
    };

    let mut offset = 0;
    loop {
        state.round(s, offset);
        state.round(s, offset + 64);
        offset += 128;
        len -= 128;
        if len < 128 {
            break;
        }
    }

    let LongState {
        mut x,
        mut y,
        z,
        mut v,
        mut w,
    } = state;
    y = y
        .wrapping_add(rotr64(w.0, 37).wrapping_mul(K0))
        .wrapping_add(z);
    x = x.wrapping_add(rotr64(v.0.wrapping_add(z), 49).wrapping_mul(K0));

    // Hash up to four 32-byte chunks ending at the end of the input. A chunk
    // may start before `offset` and reread bytes the rounds already consumed;
    // at least 128 bytes precede `offset`, so the start never underflows.
    let end = offset + len;
    let mut tail_done = 0;
    while tail_done < len {
        tail_done += 32;
        y = rotr64(y.wrapping_sub(x), 42)
            .wrapping_mul(K0)
            .wrapping_add(v.1);
        w.0 = w.0.wrapping_add(read_u64(s, end - tail_done + 16));
        x = rotr64(x, 49).wrapping_mul(K0).wrapping_add(w.0);
        w.0 = w.0.wrapping_add(v.0);
        v = weak_hash_len32_with_seeds(s, end - tail_done, v.0, v.1);
    }

    let x = hash_len16(x, v.0);
    let y = hash_len16(y, w.0);
    pack(
        hash_len16(x.wrapping_add(v.1), w.1).wrapping_add(y),
        hash_len16(x.wrapping_add(w.1), y.wrapping_add(v.1)),
    )
}

/// CityHash128 of `s`.
///
/// Inputs of 16 bytes or more seed the hash from their own first 16 bytes.
pub fn city_hash128(s: &[u8]) -> u128 {
    if s.len() >= 16 {
        let seed = pack(read_u64(s, 0) ^ K3, read_u64(s, 8));
        city_hash128_with_seed(&s[16..], seed)
    } else {
        city_hash128_with_seed(s, pack(K0, K1))
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use super::*;

    fn sample(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 7 + 3) as u8).collect()
    }

    #[test]
    fn empty_input_is_k2() {
        assert_eq!(city_hash64(&[]), K2);
        assert_eq!(city_hash64(&[]), 0x9ae1_6a3b_2f90_404f);
    }

    #[test]
    fn hash64_regression_per_band() {
        let data = sample(300);
        let cases: [(usize, u64); 6] = [
            (3, 0xf6aa_543c_a4b8_bf14),
            (12, 0x0f8f_5996_e9d9_f7ef),
            (24, 0x7353_f729_0432_3f52),
            (48, 0xa7b0_eb0c_7882_e506),
            (100, 0x90d1_3909_657d_cf12),
            (300, 0x0495_4d84_a69f_0ea2),
        ];
        for (len, expected) in cases {
            assert_eq!(city_hash64(&data[..len]), expected, "len {len}");
        }
    }

    #[test]
    fn hash128_regression_per_band() {
        let data = sample(300);
        let cases: [(usize, u128); 6] = [
            (0, 0x3cb5_40c3_92e5_1e29_3df0_9dfc_64c0_9a2b),
            (10, 0x3a52_4a04_6478_8553_7291_5fb0_91e8_6db5),
            (40, 0x66d0_1b06_9b21_2437_0b84_2212_c6c8_5c49),
            (127, 0x5d58_2060_4b01_deea_1f1c_2a3c_6282_9942),
            (128, 0x108f_b9e5_b83f_dff4_11d0_0b10_d669_4d31),
            (300, 0x3dba_c6de_27b7_e1d4_589c_872c_1f28_abfb),
        ];
        for (len, expected) in cases {
            assert_eq!(city_hash128(&data[..len]), expected, "len {len}");
        }
    }

    #[test]
    fn seeded_variants() {
        let data = sample(300);
        assert_eq!(city_hash64_with_seed(&data[..50], 42), 0x1b70_8704_c6f8_ef3e);
        assert_eq!(city_hash64_with_seeds(&data[..50], 1, 2), 0xaf28_1200_7a61_a212);
        assert_eq!(
            city_hash128_with_seed(&data[..200], pack(5, 6)),
            0x3a96_585f_6ba0_2163_e07a_fec5_7583_20f5
        );
        assert_eq!(
            city_murmur(&data[..20], pack(5, 6)),
            0x002d_40f3_8d59_43e8_3371_fd1a_75e7_c980
        );
        assert_ne!(city_hash64_with_seed(&data[..50], 1), city_hash64(&data[..50]));
    }

    #[test]
    fn every_length_is_deterministic() {
        let data = sample(260);
        let mut seen = alloc::collections::BTreeSet::new();
        for len in 0..=data.len() {
            let h = city_hash64(&data[..len]);
            assert_eq!(h, city_hash64(&data[..len]));
            assert!(seen.insert(h), "collision at len {len}");
            assert_eq!(city_hash128(&data[..len]), city_hash128(&data[..len]));
        }
    }
}
