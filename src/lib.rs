#![warn(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod allocator;

pub mod bits;

pub mod city;

pub mod crc;

mod error;

/// A key-value map over the chained hash table.
///
/// This module provides a `HashMap` that wraps the `HashTable` and provides
/// a standard key-value map interface with configurable hashers.
pub mod hash_map;

/// A hash set over the chained hash table.
pub mod hash_set;

/// The chained hash table with a prime number of buckets.
///
/// Values are stored with their precomputed `u64` hash; callers supply the
/// hash and an equality predicate on every lookup.
pub mod hash_table;

pub mod murmur3;

pub mod prime;

pub mod scalar;

pub use allocator::Allocator;
pub use allocator::Global;
pub use error::Error;
pub use hash_map::Entry;
pub use hash_map::HashMap;
pub use hash_set::HashSet;
pub use hash_table::HashTable;
pub use scalar::ScalarState;
