//! Word-sized hashing for fixed-size scalars.
//!
//! A value no wider than a machine word hashes to its own bit pattern,
//! widened to `usize`; integer keys cost nothing to hash and still spread
//! well over a prime number of buckets. Wider values hand their bytes to the
//! byte-oriented family that matches the target word: Murmur3 (32-bit digest)
//! on 32-bit targets, CityHash64 on 64-bit targets.

use core::hash::BuildHasher;
use core::hash::Hasher;
use core::mem::size_of;
use core::ptr::NonNull;

use crate::bits::hash_128_to_64;

cfg_if::cfg_if! {
    if #[cfg(target_pointer_width = "64")] {
        /// Hashes `bytes` to a word with CityHash64.
        #[inline]
        pub fn hash_bytes(bytes: &[u8]) -> usize {
            crate::city::city_hash64(bytes) as usize
        }
    } else {
        /// Hashes `bytes` to a word with 32-bit Murmur3.
        #[inline]
        pub fn hash_bytes(bytes: &[u8]) -> usize {
            crate::murmur3::murmur3_x86_32(bytes, 0) as usize
        }
    }
}

/// Hashing for values with a fixed byte width.
///
/// Implemented for every primitive integer, `bool`, `char`, `f32`, `f64`, raw
/// pointers and [`NonNull`]. Field-less enums opt in with
/// [`impl_scalar_hash_for_enum!`](crate::impl_scalar_hash_for_enum).
///
/// # Examples
///
/// ```rust
/// use prime_chain::scalar::ScalarHash;
///
/// assert_eq!(7usize.scalar_hash(), 7);
/// assert_eq!(0.0f64.scalar_hash(), (-0.0f64).scalar_hash());
/// ```
pub trait ScalarHash {
    /// Returns the word-sized hash of `self`.
    fn scalar_hash(&self) -> usize;
}

macro_rules! impl_scalar_hash_int {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ScalarHash for $ty {
                #[inline]
                fn scalar_hash(&self) -> usize {
                    if size_of::<$ty>() <= size_of::<usize>() {
                        *self as usize
                    } else {
                        hash_bytes(&self.to_ne_bytes())
                    }
                }
            }
        )*
    };
}

impl_scalar_hash_int!(u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize);

impl ScalarHash for bool {
    #[inline]
    fn scalar_hash(&self) -> usize {
        *self as usize
    }
}

impl ScalarHash for char {
    #[inline]
    fn scalar_hash(&self) -> usize {
        *self as usize
    }
}

impl ScalarHash for f32 {
    #[inline]
    fn scalar_hash(&self) -> usize {
        // -0.0 == 0.0 but the bit patterns differ.
        if *self == 0.0 {
            return 0;
        }
        self.to_bits().scalar_hash()
    }
}

impl ScalarHash for f64 {
    #[inline]
    fn scalar_hash(&self) -> usize {
        if *self == 0.0 {
            return 0;
        }
        self.to_bits().scalar_hash()
    }
}

impl<T: ?Sized> ScalarHash for *const T {
    #[inline]
    fn scalar_hash(&self) -> usize {
        self.cast::<()>() as usize
    }
}

impl<T: ?Sized> ScalarHash for *mut T {
    #[inline]
    fn scalar_hash(&self) -> usize {
        self.cast::<()>() as usize
    }
}

impl<T: ?Sized> ScalarHash for NonNull<T> {
    #[inline]
    fn scalar_hash(&self) -> usize {
        self.as_ptr().scalar_hash()
    }
}

/// Implements [`ScalarHash`] for field-less `Copy` enums through their
/// integer representation.
///
/// # Examples
///
/// ```rust
/// use prime_chain::impl_scalar_hash_for_enum;
/// use prime_chain::scalar::ScalarHash;
///
/// #[derive(Clone, Copy)]
/// #[repr(u8)]
/// enum Color {
///     Red = 1,
///     Green = 2,
/// }
///
/// impl_scalar_hash_for_enum!(Color as u8);
///
/// assert_eq!(Color::Green.scalar_hash(), 2);
/// ```
#[macro_export]
macro_rules! impl_scalar_hash_for_enum {
    ($($ty:ty as $repr:ty),* $(,)?) => {
        $(
            impl $crate::scalar::ScalarHash for $ty {
                #[inline]
                fn scalar_hash(&self) -> usize {
                    $crate::scalar::ScalarHash::scalar_hash(&(*self as $repr))
                }
            }
        )*
    };
}

/// Hashes a padding-free aggregate by its bytes.
///
/// Values of at most one word are zero-extended into a word and returned as
/// is, mirroring the scalar case; wider values go through [`hash_bytes`].
pub fn hash_pod<T: bytemuck::NoUninit>(value: &T) -> usize {
    let bytes = bytemuck::bytes_of(value);
    if bytes.len() <= size_of::<usize>() {
        let mut word = [0u8; size_of::<usize>()];
        word[..bytes.len()].copy_from_slice(bytes);
        usize::from_ne_bytes(word)
    } else {
        hash_bytes(bytes)
    }
}

/// A [`Hasher`] built on [`ScalarHash`].
///
/// The first write sets the state to the written word (or to
/// [`hash_bytes`] of written bytes); every later write is folded into the
/// state with CityHash's 128-to-64 combiner. Hashing a single integer key
/// therefore returns the integer itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScalarHasher {
    state: u64,
    primed: bool,
}

impl ScalarHasher {
    #[inline(always)]
    fn fold(&mut self, word: u64) {
        if self.primed {
            self.state = hash_128_to_64(self.state, word);
        } else {
            self.state = word;
            self.primed = true;
        }
    }
}

impl Hasher for ScalarHasher {
    #[inline]
    fn finish(&self) -> u64 {
        self.state
    }

    #[inline]
    fn write(&mut self, bytes: &[u8]) {
        self.fold(hash_bytes(bytes) as u64);
    }

    #[inline]
    fn write_u8(&mut self, i: u8) {
        self.fold(i as u64);
    }

    #[inline]
    fn write_u16(&mut self, i: u16) {
        self.fold(i as u64);
    }

    #[inline]
    fn write_u32(&mut self, i: u32) {
        self.fold(i as u64);
    }

    #[inline]
    fn write_u64(&mut self, i: u64) {
        self.fold(i);
    }

    #[inline]
    fn write_u128(&mut self, i: u128) {
        self.fold(i.scalar_hash() as u64);
    }

    #[inline]
    fn write_usize(&mut self, i: usize) {
        self.fold(i as u64);
    }
}

/// The default hash builder for [`HashMap`](crate::HashMap) and
/// [`HashSet`](crate::HashSet).
///
/// Unkeyed and deterministic: the same key always hashes the same way, in
/// every process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScalarState;

impl BuildHasher for ScalarState {
    type Hasher = ScalarHasher;

    #[inline]
    fn build_hasher(&self) -> Self::Hasher {
        ScalarHasher::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    #[repr(i16)]
    enum Level {
        Low = -1,
        High = 300,
    }

    crate::impl_scalar_hash_for_enum!(Level as i16);

    #[derive(Clone, Copy, bytemuck::NoUninit)]
    #[repr(C)]
    struct Pair {
        a: u32,
        b: u32,
    }

    #[derive(Clone, Copy, bytemuck::NoUninit)]
    #[repr(C)]
    struct Triple {
        a: u32,
        b: u32,
        c: u32,
    }

    #[test]
    fn word_sized_values_are_their_bits() {
        assert_eq!(0usize.scalar_hash(), 0);
        assert_eq!(12345usize.scalar_hash(), 12345);
        assert_eq!(u32::MAX.scalar_hash(), u32::MAX as usize);
        assert_eq!((-1isize).scalar_hash(), usize::MAX);
        assert_eq!(true.scalar_hash(), 1);
        assert_eq!('A'.scalar_hash(), 65);

        let value = 5u8;
        let ptr: *const u8 = &value;
        assert_eq!(ptr.scalar_hash(), ptr as usize);
        assert_eq!(NonNull::from(&value).scalar_hash(), ptr as usize);
    }

    #[test]
    fn signed_zero_hashes_alike() {
        assert_eq!(0.0f32.scalar_hash(), 0);
        assert_eq!((-0.0f32).scalar_hash(), 0);
        assert_eq!(0.0f64.scalar_hash(), 0);
        assert_eq!((-0.0f64).scalar_hash(), 0);
        assert_ne!(1.0f64.scalar_hash(), (-1.0f64).scalar_hash());
        assert_eq!(1.5f32.scalar_hash(), 1.5f32.to_bits() as usize);
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn wide_values_use_city_on_64_bit() {
        let x = 0x0123_4567_89ab_cdef_fedc_ba98_7654_3210u128;
        assert_eq!(x.scalar_hash(), crate::city::city_hash64(&x.to_ne_bytes()) as usize);
        assert_eq!(u64::MAX.scalar_hash(), usize::MAX);
        assert_eq!(f64::MAX.scalar_hash(), f64::MAX.to_bits() as usize);
    }

    #[cfg(target_pointer_width = "32")]
    #[test]
    fn wide_values_use_murmur_on_32_bit() {
        let x = 0x0123_4567_89ab_cdefu64;
        assert_eq!(
            x.scalar_hash(),
            crate::murmur3::murmur3_x86_32(&x.to_ne_bytes(), 0) as usize
        );
    }

    #[test]
    fn enums_hash_through_their_repr() {
        assert_eq!(Level::Low.scalar_hash(), (-1i16).scalar_hash());
        assert_eq!(Level::High.scalar_hash(), 300);
    }

    #[test]
    fn aggregates_hash_by_bytes() {
        let pair = Pair { a: 1, b: 2 };
        let triple = Triple { a: 1, b: 2, c: 3 };
        if size_of::<usize>() == 8 {
            assert_eq!(hash_pod(&pair), usize::from_ne_bytes(*bytemuck::cast_ref(&pair)));
        }
        assert_eq!(hash_pod(&triple), hash_bytes(bytemuck::bytes_of(&triple)));
        assert_eq!(hash_pod(&3u16), 3);
    }

    #[test]
    fn hasher_passes_single_integers_through() {
        let state = ScalarState;
        assert_eq!(state.hash_one(42u64), 42);
        assert_eq!(state.hash_one(7u8), 7);
        assert_eq!(state.hash_one(42u64), state.hash_one(42u64));
        assert_ne!(state.hash_one((1u32, 2u32)), state.hash_one((2u32, 1u32)));
        assert_eq!(state.hash_one("key"), state.hash_one("key"));
        assert_ne!(state.hash_one("key"), state.hash_one("kez"));
    }
}
