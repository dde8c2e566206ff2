//! Table-driven cyclic redundancy checks at 16, 32 and 64 bits.
//!
//! All three widths use the reflected (LSB-first) form of their generator
//! polynomial, so one table step is `table[(rem ^ byte) & 0xff] ^ (rem >> 8)`.
//! The remainder starts at `seed ^ !0`. The 16 and 32-bit variants invert it
//! again on the way out; the 64-bit variant returns the raw remainder.

use core::hash::BuildHasher;
use core::hash::Hasher;

/// CRC-16/CCITT generator, reflected.
pub const CRC16_POLY: u16 = 0x8408;
/// CRC-32/IEEE generator, reflected.
pub const CRC32_POLY: u32 = 0xedb8_8320;
/// CRC-64/ECMA-182 generator, reflected.
pub const CRC64_POLY: u64 = 0xc96c_5795_d787_0f42;

const fn crc16_table(poly: u16) -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut byte = 0;
    while byte < 256 {
        let mut rem = byte as u16;
        let mut bit = 0;
        while bit < 8 {
            rem = if rem & 1 != 0 { (rem >> 1) ^ poly } else { rem >> 1 };
            bit += 1;
        }
        table[byte] = rem;
        byte += 1;
    }
    table
}

const fn crc32_table(poly: u32) -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut byte = 0;
    while byte < 256 {
        let mut rem = byte as u32;
        let mut bit = 0;
        while bit < 8 {
            rem = if rem & 1 != 0 { (rem >> 1) ^ poly } else { rem >> 1 };
            bit += 1;
        }
        table[byte] = rem;
        byte += 1;
    }
    table
}

const fn crc64_table(poly: u64) -> [u64; 256] {
    let mut table = [0u64; 256];
    let mut byte = 0;
    while byte < 256 {
        let mut rem = byte as u64;
        let mut bit = 0;
        while bit < 8 {
            rem = if rem & 1 != 0 { (rem >> 1) ^ poly } else { rem >> 1 };
            bit += 1;
        }
        table[byte] = rem;
        byte += 1;
    }
    table
}

static CRC16_TABLE: [u16; 256] = crc16_table(CRC16_POLY);
static CRC32_TABLE: [u32; 256] = crc32_table(CRC32_POLY);
static CRC64_TABLE: [u64; 256] = crc64_table(CRC64_POLY);

#[inline(always)]
fn crc32_update(mut rem: u32, data: &[u8]) -> u32 {
    for &byte in data {
        rem = CRC32_TABLE[((rem ^ byte as u32) & 0xff) as usize] ^ (rem >> 8);
    }
    rem
}

/// CRC-16 of `data`. With `seed == 0` this is CRC-16/X-25.
///
/// # Examples
///
/// ```rust
/// use prime_chain::crc::crc16;
///
/// assert_eq!(crc16(b"123456789", 0), 0x906e);
/// ```
pub fn crc16(data: &[u8], seed: u16) -> u16 {
    let mut rem = seed ^ u16::MAX;
    for &byte in data {
        rem = CRC16_TABLE[((rem ^ byte as u16) & 0xff) as usize] ^ (rem >> 8);
    }
    rem ^ u16::MAX
}

/// CRC-32 of `data`.
///
/// Passing a previous digest as `seed` continues that computation, so
/// `crc32(b, crc32(a, 0)) == crc32(a ++ b, 0)`.
///
/// # Examples
///
/// ```rust
/// use prime_chain::crc::crc32;
///
/// assert_eq!(crc32(b"", 0), 0);
/// assert_eq!(crc32(b"123456789", 0), 0xcbf4_3926);
/// assert_eq!(crc32(b"456789", crc32(b"123", 0)), 0xcbf4_3926);
/// ```
pub fn crc32(data: &[u8], seed: u32) -> u32 {
    crc32_update(seed ^ u32::MAX, data) ^ u32::MAX
}

/// CRC-64 of `data`, returned without the final inversion.
///
/// The result is the bitwise complement of CRC-64/XZ for `seed == 0`.
pub fn crc64(data: &[u8], seed: u64) -> u64 {
    let mut rem = seed ^ u64::MAX;
    for &byte in data {
        rem = CRC64_TABLE[((rem ^ byte as u64) & 0xff) as usize] ^ (rem >> 8);
    }
    rem
}

/// Incremental CRC-32 usable as a [`Hasher`].
///
/// Every `write` feeds the bytes into one running remainder, so the digest
/// of several writes equals [`crc32`] over their concatenation.
#[derive(Debug, Clone, Copy)]
pub struct Crc32 {
    rem: u32,
}

impl Crc32 {
    /// Starts a CRC-32 computation with seed 0.
    pub const fn new() -> Self {
        Self::with_seed(0)
    }

    /// Starts a CRC-32 computation continuing from `seed`.
    pub const fn with_seed(seed: u32) -> Self {
        Self {
            rem: seed ^ u32::MAX,
        }
    }

    /// Feeds `data` into the checksum.
    pub fn update(&mut self, data: &[u8]) {
        self.rem = crc32_update(self.rem, data);
    }

    /// The checksum of everything fed so far.
    pub const fn digest(&self) -> u32 {
        self.rem ^ u32::MAX
    }
}

impl Default for Crc32 {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher for Crc32 {
    fn finish(&self) -> u64 {
        self.digest() as u64
    }

    fn write(&mut self, bytes: &[u8]) {
        self.update(bytes);
    }
}

/// [`BuildHasher`] producing [`Crc32`] hashers.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildCrc32 {
    seed: u32,
}

impl BuildCrc32 {
    /// Hashers built from this state start from `seed`.
    pub const fn with_seed(seed: u32) -> Self {
        Self { seed }
    }
}

impl BuildHasher for BuildCrc32 {
    type Hasher = Crc32;

    fn build_hasher(&self) -> Self::Hasher {
        Crc32::with_seed(self.seed)
    }
}
