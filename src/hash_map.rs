use core::borrow::Borrow;
use core::fmt::Debug;
use core::hash::BuildHasher;
use core::hash::Hash;
use core::iter::FusedIterator;
use core::ops::Index;

use crate::allocator::Allocator;
use crate::allocator::Global;
use crate::error::Error;
use crate::hash_table::Entry as TableEntry;
use crate::hash_table::HashTable;
use crate::hash_table::alloc_failed;
use crate::scalar::ScalarState;

/// A hash map built on the prime-bucketed chained [`HashTable`].
///
/// `HashMap<K, V, S, A>` stores key-value pairs where keys implement
/// `Hash + Eq`, hashing them with the builder `S`. The default builder,
/// [`ScalarState`], hashes an integer key to itself, which spreads well over
/// the table's prime number of buckets.
///
/// [`insert`](HashMap::insert) replaces the value of an existing key;
/// [`insert_multi`](HashMap::insert_multi) keeps duplicates side by side, so
/// a map can also serve as a multimap.
///
/// Operations that allocate call [`handle_alloc_error`] when the allocator
/// fails; [`try_reserve`](HashMap::try_reserve) reports the failure instead.
///
/// # Performance Characteristics
///
/// - **Memory**: one `usize` per bucket, plus the size of `(K, V)`, a `u64`
///   hash and a `usize` link per entry
///
/// [`handle_alloc_error`]: alloc::alloc::handle_alloc_error
#[derive(Clone)]
pub struct HashMap<K, V, S = ScalarState, A: Allocator = Global> {
    table: HashTable<(K, V), A>,
    hash_builder: S,
}

impl<K, V, S, A> Debug for HashMap<K, V, S, A>
where
    K: Debug,
    V: Debug,
    A: Allocator,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V> HashMap<K, V, ScalarState> {
    /// Creates a new hash map using [`ScalarState`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use prime_chain::HashMap;
    /// #
    /// let map: HashMap<i32, String> = HashMap::new();
    /// assert!(map.is_empty());
    /// assert_eq!(map.bucket_count(), 2);
    /// ```
    pub fn new() -> Self {
        Self::with_hasher(ScalarState)
    }

    /// Creates a new hash map for `capacity` entries using [`ScalarState`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use prime_chain::HashMap;
    /// #
    /// let map: HashMap<i32, String> = HashMap::with_capacity(100);
    /// assert!(map.capacity() >= 100);
    /// ```
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, ScalarState)
    }
}

impl<K, V, S> HashMap<K, V, S> {
    /// Creates a new hash map with the given hasher builder.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::BuildHasher;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # use prime_chain::HashMap;
    /// #
    /// # struct SimpleHasher;
    /// # impl BuildHasher for SimpleHasher {
    /// #     type Hasher = SipHasher;
    /// #
    /// #     fn build_hasher(&self) -> Self::Hasher {
    /// #         SipHasher::new()
    /// #     }
    /// # }
    /// #
    /// let map: HashMap<i32, String, _> = HashMap::with_hasher(SimpleHasher);
    /// assert!(map.is_empty());
    /// ```
    pub fn with_hasher(hash_builder: S) -> Self {
        Self::with_hasher_in(hash_builder, Global)
    }

    /// Creates a new hash map with the specified capacity and hasher builder.
    ///
    /// The bucket count is the smallest prime not below `capacity`.
    pub fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Self {
        Self::with_capacity_and_hasher_in(capacity, hash_builder, Global)
    }
}

impl<K, V, S, A: Allocator> HashMap<K, V, S, A> {
    /// Creates a new hash map with the given hasher builder, allocating from
    /// `alloc`.
    pub fn with_hasher_in(hash_builder: S, alloc: A) -> Self {
        Self::with_capacity_and_hasher_in(0, hash_builder, alloc)
    }

    /// Creates a new hash map for `capacity` entries with the given hasher
    /// builder, allocating from `alloc`.
    pub fn with_capacity_and_hasher_in(capacity: usize, hash_builder: S, alloc: A) -> Self {
        Self {
            table: HashTable::with_capacity_in(capacity, alloc),
            hash_builder,
        }
    }

    /// Returns the number of elements in the map.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use prime_chain::HashMap;
    /// #
    /// let mut map = HashMap::new();
    /// assert_eq!(map.len(), 0);
    /// map.insert(1, "a");
    /// assert_eq!(map.len(), 1);
    /// ```
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the map contains no elements.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Number of entries the map holds before it must allocate again.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Length of the bucket array. Always prime.
    pub fn bucket_count(&self) -> usize {
        self.table.bucket_count()
    }

    /// Average number of entries per bucket.
    pub fn load_factor(&self) -> f32 {
        self.table.load_factor()
    }

    /// The load factor an insertion may not exceed.
    pub fn max_load_factor(&self) -> f32 {
        self.table.max_load_factor()
    }

    /// Sets the maximum load factor, growing if the map is already above it.
    ///
    /// # Panics
    ///
    /// Panics unless `factor` is finite and positive.
    pub fn set_max_load_factor(&mut self, factor: f32) {
        self.table
            .set_max_load_factor(factor)
            .unwrap_or_else(|err| alloc_failed(err));
    }

    /// Returns a reference to the map's hasher builder.
    pub fn hasher(&self) -> &S {
        &self.hash_builder
    }

    /// Returns a reference to the map's allocator.
    pub fn allocator(&self) -> &A {
        self.table.allocator()
    }

    /// Clears the map, removing all key-value pairs.
    ///
    /// The bucket array is kept.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use prime_chain::HashMap;
    /// #
    /// let mut map = HashMap::new();
    /// map.insert(1, "a");
    /// map.clear();
    /// assert!(map.is_empty());
    /// ```
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Keeps only the entries for which `f` returns `true`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use prime_chain::HashMap;
    /// #
    /// let mut map: HashMap<i32, i32> = (0..8).map(|x| (x, x * 10)).collect();
    /// map.retain(|&k, _| k % 2 == 0);
    /// assert_eq!(map.len(), 4);
    /// ```
    pub fn retain<F>(&mut self, mut f: F)
    where
        F: FnMut(&K, &mut V) -> bool,
    {
        self.table.retain(|(k, v)| f(&*k, v));
    }

    /// Rebuilds the bucket array with at least `bucket_count` buckets,
    /// rounded up to a prime that keeps the load factor bound. May shrink.
    pub fn rehash(&mut self, bucket_count: usize) {
        self.table
            .rehash(bucket_count)
            .unwrap_or_else(|err| alloc_failed(err));
    }

    /// Shrinks the bucket array and entry storage as much as the load factor
    /// allows.
    pub fn shrink_to_fit(&mut self) {
        self.table
            .shrink_to_fit()
            .unwrap_or_else(|err| alloc_failed(err));
    }

    /// Reserves capacity for at least `additional` more elements.
    pub fn reserve(&mut self, additional: usize) {
        self.try_reserve(additional)
            .unwrap_or_else(|err| alloc_failed(err));
    }

    /// Reserves capacity for at least `additional` more elements, reporting
    /// allocation failure.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use prime_chain::Error;
    /// # use prime_chain::HashMap;
    /// #
    /// let mut map: HashMap<u64, u64> = HashMap::new();
    /// map.try_reserve(10)?;
    /// assert!(map.capacity() >= 10);
    /// assert_eq!(map.try_reserve(usize::MAX), Err(Error::CapacityOverflow));
    /// # Ok::<(), Error>(())
    /// ```
    pub fn try_reserve(&mut self, additional: usize) -> Result<(), Error> {
        self.table.reserve(additional)
    }

    /// An iterator visiting all key-value pairs in bucket order.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use prime_chain::HashMap;
    /// #
    /// let mut map = HashMap::new();
    /// map.insert(1, "a");
    /// map.insert(2, "b");
    ///
    /// let mut pairs: Vec<_> = map.iter().collect();
    /// pairs.sort();
    /// assert_eq!(pairs, [(&1, &"a"), (&2, &"b")]);
    /// ```
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            inner: self.table.iter(),
        }
    }

    /// An iterator visiting all key-value pairs, with mutable references to
    /// the values.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut {
            inner: self.table.iter_mut(),
        }
    }

    /// An iterator visiting all keys.
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys { inner: self.iter() }
    }

    /// An iterator visiting all values.
    pub fn values(&self) -> Values<'_, K, V> {
        Values { inner: self.iter() }
    }

    /// An iterator visiting all values mutably.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use prime_chain::HashMap;
    /// #
    /// let mut map = HashMap::new();
    /// map.insert("a", 1);
    /// for value in map.values_mut() {
    ///     *value += 10;
    /// }
    /// assert_eq!(map[&"a"], 11);
    /// ```
    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V> {
        ValuesMut {
            inner: self.iter_mut(),
        }
    }

    /// Clears the map, returning all key-value pairs as an iterator.
    pub fn drain(&mut self) -> Drain<'_, K, V, A> {
        Drain {
            inner: self.table.drain(),
        }
    }
}

impl<K, V, S, A> HashMap<K, V, S, A>
where
    K: Hash + Eq,
    S: BuildHasher,
    A: Allocator,
{
    #[inline]
    fn hash<Q>(&self, key: &Q) -> u64
    where
        Q: Hash + ?Sized,
    {
        self.hash_builder.hash_one(key)
    }

    /// Inserts a key-value pair into the map.
    ///
    /// If the key is already present its value is replaced and the old value
    /// returned; the stored key is kept.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use prime_chain::HashMap;
    /// #
    /// let mut map = HashMap::new();
    /// assert_eq!(map.insert(37, "a"), None);
    /// assert_eq!(map.insert(37, "b"), Some("a"));
    /// assert_eq!(map.get(&37), Some(&"b"));
    /// ```
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let hash = self.hash(&key);
        match self
            .table
            .entry(hash, |(k, _)| k == &key)
            .unwrap_or_else(|err| alloc_failed(err))
        {
            TableEntry::Occupied(mut entry) => {
                let old_value = core::mem::replace(&mut entry.get_mut().1, value);
                Some(old_value)
            }
            TableEntry::Vacant(entry) => {
                entry.insert((key, value));
                None
            }
        }
    }

    /// Inserts a key-value pair even if the key is already present.
    ///
    /// The new pair is found first by lookups until it is removed.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use prime_chain::HashMap;
    /// #
    /// let mut map = HashMap::new();
    /// map.insert_multi(5, "first");
    /// map.insert_multi(5, "second");
    ///
    /// assert_eq!(map.len(), 2);
    /// assert_eq!(map.count(&5), 2);
    /// assert_eq!(map.get(&5), Some(&"second"));
    /// ```
    pub fn insert_multi(&mut self, key: K, value: V) -> &mut V {
        let hash = self.hash(&key);
        &mut self
            .table
            .insert(hash, (key, value))
            .unwrap_or_else(|err| alloc_failed(err))
            .1
    }

    /// Returns a reference to the value corresponding to the key.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use prime_chain::HashMap;
    /// #
    /// let mut map: HashMap<String, i32> = HashMap::new();
    /// map.insert("one".to_string(), 1);
    /// assert_eq!(map.get("one"), Some(&1));
    /// assert_eq!(map.get("two"), None);
    /// ```
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get_key_value(key).map(|(_, v)| v)
    }

    /// Returns the stored key and its value.
    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = self.hash(key);
        self.table
            .find(hash, |(k, _)| k.borrow() == key)
            .map(|(k, v)| (k, v))
    }

    /// Returns a mutable reference to the value corresponding to the key.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = self.hash(key);
        self.table
            .find_mut(hash, |(k, _)| k.borrow() == key)
            .map(|(_, v)| v)
    }

    /// Returns `true` if the map contains the key.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = self.hash(key);
        self.table.contains(hash, |(k, _)| k.borrow() == key)
    }

    /// Number of entries stored under the key.
    pub fn count<Q>(&self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = self.hash(key);
        self.table.count(hash, |(k, _)| k.borrow() == key)
    }

    /// Removes a key from the map, returning its value.
    ///
    /// Removing an absent key does nothing.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use prime_chain::HashMap;
    /// #
    /// let mut map = HashMap::new();
    /// map.insert(1, "a");
    /// assert_eq!(map.remove(&1), Some("a"));
    /// assert_eq!(map.remove(&1), None);
    /// ```
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.remove_entry(key).map(|(_, v)| v)
    }

    /// Removes a key from the map, returning the stored key and value.
    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = self.hash(key);
        self.table.remove(hash, |(k, _)| k.borrow() == key)
    }

    /// Removes every entry stored under the key, returning how many there
    /// were.
    pub fn remove_all<Q>(&mut self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = self.hash(key);
        self.table.remove_all(hash, |(k, _)| k.borrow() == key)
    }

    /// Gets the given key's corresponding entry for in-place manipulation.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use prime_chain::HashMap;
    /// #
    /// let mut letters = HashMap::new();
    /// for ch in "a short treatise on fungi".chars() {
    ///     *letters.entry(ch).or_insert(0) += 1;
    /// }
    /// assert_eq!(letters[&'s'], 2);
    /// assert_eq!(letters[&'t'], 3);
    /// assert_eq!(letters.get(&'y'), None);
    /// ```
    pub fn entry(&mut self, key: K) -> Entry<'_, K, V, A> {
        let hash = self.hash(&key);
        match self
            .table
            .entry(hash, |(k, _)| k == &key)
            .unwrap_or_else(|err| alloc_failed(err))
        {
            TableEntry::Occupied(entry) => Entry::Occupied(OccupiedEntry { entry }),
            TableEntry::Vacant(entry) => Entry::Vacant(VacantEntry { entry, key }),
        }
    }
}

impl<K, V> Default for HashMap<K, V, ScalarState> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S, A> PartialEq for HashMap<K, V, S, A>
where
    K: Hash + Eq,
    V: PartialEq,
    S: BuildHasher,
    A: Allocator,
{
    /// Maps are equal when they hold the same entries, in any order and with
    /// the same multiplicities.
    fn eq(&self, other: &Self) -> bool {
        if self.len() != other.len() {
            return false;
        }

        self.iter().all(|(key, value)| {
            let same = |(k, v): &(K, V)| k == key && v == value;
            self.table.count(self.hash(key), same) == other.table.count(other.hash(key), same)
        })
    }
}

impl<K, V, S, A> Eq for HashMap<K, V, S, A>
where
    K: Hash + Eq,
    V: Eq,
    S: BuildHasher,
    A: Allocator,
{
}

impl<K, Q, V, S, A> Index<&Q> for HashMap<K, V, S, A>
where
    K: Hash + Eq + Borrow<Q>,
    Q: Hash + Eq + ?Sized,
    S: BuildHasher,
    A: Allocator,
{
    type Output = V;

    /// # Panics
    ///
    /// Panics if the key is not present.
    fn index(&self, key: &Q) -> &V {
        self.get(key).expect("key not found in HashMap")
    }
}

impl<K, V, S, A> Extend<(K, V)> for HashMap<K, V, S, A>
where
    K: Hash + Eq,
    S: BuildHasher,
    A: Allocator,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        self.reserve(iter.size_hint().0);
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<'a, K, V, S, A> Extend<(&'a K, &'a V)> for HashMap<K, V, S, A>
where
    K: Hash + Eq + Copy,
    V: Copy,
    S: BuildHasher,
    A: Allocator,
{
    fn extend<I: IntoIterator<Item = (&'a K, &'a V)>>(&mut self, iter: I) {
        self.extend(iter.into_iter().map(|(&k, &v)| (k, v)));
    }
}

impl<K, V, S> FromIterator<(K, V)> for HashMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::with_hasher(S::default());
        map.extend(iter);
        map
    }
}

impl<K, V, S, A: Allocator> IntoIterator for HashMap<K, V, S, A> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V, A>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            inner: self.table.into_iter(),
        }
    }
}

impl<'a, K, V, S, A: Allocator> IntoIterator for &'a HashMap<K, V, S, A> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V, S, A: Allocator> IntoIterator for &'a mut HashMap<K, V, S, A> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

/// A view into a single entry in the map, which may either be vacant or
/// occupied.
///
/// This enum is constructed from the [`entry`] method on [`HashMap`].
///
/// [`entry`]: HashMap::entry
pub enum Entry<'a, K, V, A: Allocator = Global> {
    /// A vacant entry.
    Vacant(VacantEntry<'a, K, V, A>),
    /// An occupied entry.
    Occupied(OccupiedEntry<'a, K, V, A>),
}

impl<'a, K, V, A: Allocator> Entry<'a, K, V, A> {
    /// Inserts a default value if the entry is vacant and returns a mutable
    /// reference.
    pub fn or_insert(self, default: V) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default),
        }
    }

    /// Inserts a value computed from a closure if the entry is vacant and
    /// returns a mutable reference.
    pub fn or_insert_with<F>(self, default: F) -> &'a mut V
    where
        F: FnOnce() -> V,
    {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default()),
        }
    }

    /// Inserts a value computed from the key if the entry is vacant.
    pub fn or_insert_with_key<F>(self, default: F) -> &'a mut V
    where
        F: FnOnce(&K) -> V,
    {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let value = default(entry.key());
                entry.insert(value)
            }
        }
    }

    /// Provides in-place mutable access to an occupied entry before any
    /// potential inserts.
    pub fn and_modify<F>(self, f: F) -> Self
    where
        F: FnOnce(&mut V),
    {
        match self {
            Entry::Occupied(mut entry) => {
                f(entry.get_mut());
                Entry::Occupied(entry)
            }
            Entry::Vacant(entry) => Entry::Vacant(entry),
        }
    }

    /// Returns a reference to this entry's key.
    pub fn key(&self) -> &K {
        match self {
            Entry::Occupied(entry) => entry.key(),
            Entry::Vacant(entry) => entry.key(),
        }
    }
}

impl<'a, K, V, A> Entry<'a, K, V, A>
where
    V: Default,
    A: Allocator,
{
    /// Inserts the default value if the entry is vacant and returns a mutable
    /// reference.
    pub fn or_default(self) -> &'a mut V {
        self.or_insert_with(Default::default)
    }
}

/// A view into a vacant entry in the map.
pub struct VacantEntry<'a, K, V, A: Allocator = Global> {
    entry: crate::hash_table::VacantEntry<'a, (K, V), A>,
    key: K,
}

impl<'a, K, V, A: Allocator> VacantEntry<'a, K, V, A> {
    /// Gets a reference to the key that would be used when inserting a value.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Take ownership of the key.
    pub fn into_key(self) -> K {
        self.key
    }

    /// Inserts the value into the map and returns a mutable reference to it.
    pub fn insert(self, value: V) -> &'a mut V {
        &mut self.entry.insert((self.key, value)).1
    }
}

/// A view into an occupied entry in the map.
pub struct OccupiedEntry<'a, K, V, A: Allocator = Global> {
    entry: crate::hash_table::OccupiedEntry<'a, (K, V), A>,
}

impl<'a, K, V, A: Allocator> OccupiedEntry<'a, K, V, A> {
    /// Gets a reference to the key in the entry.
    pub fn key(&self) -> &K {
        &self.entry.get().0
    }

    /// Gets a reference to the value in the entry.
    pub fn get(&self) -> &V {
        &self.entry.get().1
    }

    /// Gets a mutable reference to the value in the entry.
    pub fn get_mut(&mut self) -> &mut V {
        &mut self.entry.get_mut().1
    }

    /// Converts the entry into a mutable reference to the value.
    pub fn into_mut(self) -> &'a mut V {
        &mut self.entry.into_mut().1
    }

    /// Inserts a value into the entry and returns the old value.
    pub fn insert(&mut self, value: V) -> V {
        core::mem::replace(&mut self.entry.get_mut().1, value)
    }

    /// Removes the entry from the map and returns the value.
    pub fn remove(self) -> V {
        self.entry.remove().1
    }

    /// Removes the entry from the map and returns the key and value.
    pub fn remove_entry(self) -> (K, V) {
        self.entry.remove()
    }
}

/// An iterator over the key-value pairs of a `HashMap`.
pub struct Iter<'a, K, V> {
    inner: crate::hash_table::Iter<'a, (K, V)>,
}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, v)| (k, v))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<K, V> FusedIterator for Iter<'_, K, V> {}

/// A mutable iterator over the key-value pairs of a `HashMap`.
pub struct IterMut<'a, K, V> {
    inner: crate::hash_table::IterMut<'a, (K, V)>,
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, v)| (&*k, v))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for IterMut<'_, K, V> {}

impl<K, V> FusedIterator for IterMut<'_, K, V> {}

/// An iterator over the keys of a `HashMap`.
pub struct Keys<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Keys<'_, K, V> {}

/// An iterator over the values of a `HashMap`.
pub struct Values<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Values<'_, K, V> {}

/// A mutable iterator over the values of a `HashMap`.
pub struct ValuesMut<'a, K, V> {
    inner: IterMut<'a, K, V>,
}

impl<'a, K, V> Iterator for ValuesMut<'a, K, V> {
    type Item = &'a mut V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for ValuesMut<'_, K, V> {}

/// A draining iterator over the key-value pairs of a `HashMap`.
///
/// Pairs not consumed are dropped along with the iterator.
pub struct Drain<'a, K, V, A: Allocator = Global> {
    inner: crate::hash_table::Drain<'a, (K, V), A>,
}

impl<K, V, A: Allocator> Iterator for Drain<'_, K, V, A> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V, A: Allocator> ExactSizeIterator for Drain<'_, K, V, A> {}

/// An owning iterator over the key-value pairs of a `HashMap`.
pub struct IntoIter<K, V, A: Allocator = Global> {
    inner: crate::hash_table::IntoIter<(K, V), A>,
}

impl<K, V, A: Allocator> Iterator for IntoIter<K, V, A> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V, A: Allocator> ExactSizeIterator for IntoIter<K, V, A> {}

#[cfg(test)]
mod tests {
    use alloc::string::String;
    use alloc::string::ToString;
    use alloc::vec;
    use alloc::vec::Vec;
    use core::hash::BuildHasher;

    use rand::Rng;
    use rand::SeedableRng;
    use rand::TryRngCore;
    use rand::rngs::OsRng;
    use rand::rngs::SmallRng;
    use siphasher::sip::SipHasher;

    use super::*;
    use crate::prime::is_prime;

    #[derive(Clone)]
    struct SipHashBuilder {
        k1: u64,
        k2: u64,
    }

    impl BuildHasher for SipHashBuilder {
        type Hasher = SipHasher;

        fn build_hasher(&self) -> Self::Hasher {
            SipHasher::new_with_keys(self.k1, self.k2)
        }
    }

    impl Default for SipHashBuilder {
        fn default() -> Self {
            let mut rng = OsRng;
            Self {
                k1: rng.try_next_u64().unwrap_or(0),
                k2: rng.try_next_u64().unwrap_or(0),
            }
        }
    }

    #[test]
    fn test_new_and_with_hasher() {
        let map: HashMap<i32, String> = HashMap::new();
        assert!(map.is_empty());
        assert_eq!(map.len(), 0);
        assert_eq!(map.bucket_count(), 2);

        let map2 = HashMap::<i32, String, _>::with_hasher(SipHashBuilder::default());
        assert!(map2.is_empty());
        assert_eq!(map2.len(), 0);
    }

    #[test]
    fn test_with_capacity() {
        let map: HashMap<i32, String> = HashMap::with_capacity(100);
        assert!(map.capacity() >= 100);
        assert!(map.is_empty());
        assert_eq!(map.bucket_count(), 101);

        let map2 =
            HashMap::<i32, String, _>::with_capacity_and_hasher(200, SipHashBuilder::default());
        assert!(map2.capacity() >= 200);
        assert!(map2.is_empty());
    }

    #[test]
    fn test_insert_and_get() {
        let mut map = HashMap::with_hasher(SipHashBuilder::default());

        assert_eq!(map.insert(1, "hello".to_string()), None);
        assert_eq!(map.len(), 1);
        assert!(!map.is_empty());

        assert_eq!(map.get(&1), Some(&"hello".to_string()));
        assert_eq!(map.get(&2), None);

        assert_eq!(
            map.insert(1, "world".to_string()),
            Some("hello".to_string())
        );
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&1), Some(&"world".to_string()));
    }

    #[test]
    fn test_get_mut() {
        let mut map = HashMap::with_hasher(SipHashBuilder::default());
        map.insert(1, "hello".to_string());

        if let Some(value) = map.get_mut(&1) {
            value.push_str(" world");
        }

        assert_eq!(map.get(&1), Some(&"hello world".to_string()));
        assert_eq!(map.get_mut(&2), None);
    }

    #[test]
    fn test_get_key_value_and_borrowed_lookups() {
        let mut map: HashMap<String, i32> = HashMap::new();
        map.insert("alpha".to_string(), 1);

        assert_eq!(map.get_key_value("alpha"), Some((&"alpha".to_string(), &1)));
        assert!(map.contains_key("alpha"));
        assert_eq!(map.count("alpha"), 1);
        assert_eq!(map.remove("alpha"), Some(1));
        assert!(map.get_key_value("alpha").is_none());
    }

    #[test]
    fn test_contains_key() {
        let mut map = HashMap::with_hasher(SipHashBuilder::default());
        assert!(!map.contains_key(&1));

        map.insert(1, "value".to_string());
        assert!(map.contains_key(&1));
        assert!(!map.contains_key(&2));
    }

    #[test]
    fn test_remove() {
        let mut map = HashMap::with_hasher(SipHashBuilder::default());
        map.insert(1, "hello".to_string());
        map.insert(2, "world".to_string());

        assert_eq!(map.remove(&1), Some("hello".to_string()));
        assert_eq!(map.len(), 1);
        assert!(!map.contains_key(&1));
        assert!(map.contains_key(&2));

        assert_eq!(map.remove(&1), None);
        assert_eq!(map.remove(&3), None);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_remove_entry() {
        let mut map = HashMap::with_hasher(SipHashBuilder::default());
        map.insert(1, "hello".to_string());

        assert_eq!(map.remove_entry(&1), Some((1, "hello".to_string())));
        assert_eq!(map.len(), 0);
        assert_eq!(map.remove_entry(&1), None);
    }

    #[test]
    fn test_insert_multi() {
        let mut map = HashMap::new();
        map.insert_multi(7u64, "a");
        *map.insert_multi(7u64, "b") = "c";
        map.insert_multi(8u64, "d");

        assert_eq!(map.len(), 3);
        assert_eq!(map.count(&7), 2);
        assert_eq!(map.get(&7), Some(&"c"));

        assert_eq!(map.insert(7, "e"), Some("c"));
        assert_eq!(map.count(&7), 2);

        assert_eq!(map.remove_all(&7), 2);
        assert_eq!(map.count(&7), 0);
        assert_eq!(map.remove_all(&7), 0);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_clear() {
        let mut map = HashMap::with_hasher(SipHashBuilder::default());
        map.insert(1, "hello".to_string());
        map.insert(2, "world".to_string());
        let buckets = map.bucket_count();

        assert_eq!(map.len(), 2);
        map.clear();
        assert_eq!(map.len(), 0);
        assert!(map.is_empty());
        assert!(!map.contains_key(&1));
        assert!(!map.contains_key(&2));
        assert_eq!(map.bucket_count(), buckets);
    }

    #[test]
    fn test_reserve() {
        let mut map = HashMap::<i32, String, _>::with_hasher(SipHashBuilder::default());
        let initial_capacity = map.capacity();

        map.reserve(1000);
        assert!(map.capacity() >= initial_capacity + 1000);
        assert!(is_prime(map.bucket_count()));
    }

    #[test]
    fn test_rehash_and_shrink() {
        let mut map: HashMap<u64, u64> = (0..100).map(|i| (i, i)).collect();
        map.rehash(500);
        assert_eq!(map.bucket_count(), 503);

        map.retain(|&k, _| k < 3);
        map.shrink_to_fit();
        assert_eq!(map.bucket_count(), 3);
        assert_eq!(map.capacity(), 3);
        assert_eq!(map.get(&2), Some(&2));
    }

    #[test]
    fn test_max_load_factor() {
        let mut map: HashMap<u64, u64> = HashMap::new();
        assert_eq!(map.max_load_factor(), 1.0);
        map.set_max_load_factor(0.5);
        for i in 0..200 {
            map.insert(i, i);
            assert!(map.load_factor() <= 0.5);
        }
        map.set_max_load_factor(4.0);
        map.shrink_to_fit();
        assert!(map.load_factor() <= 4.0);
        assert!(map.load_factor() > 2.0);
    }

    #[test]
    fn test_integer_keys_fill_a_prime_table() {
        let mut map = HashMap::new();
        for key in 1..=1000u64 {
            map.insert(key, key * 2);
        }

        assert_eq!(map.len(), 1000);
        assert!(is_prime(map.bucket_count()));
        assert!(map.bucket_count() >= 1000);
        assert!(map.load_factor() <= 1.0);

        // ScalarState hashes integers to themselves, so each key has its
        // own bucket.
        assert_eq!(map.hasher().hash_one(1000u64), 1000);
        for key in 1..=1000u64 {
            assert_eq!(map[&key], key * 2);
        }
    }

    #[test]
    fn test_entry_api() {
        let mut map = HashMap::with_hasher(SipHashBuilder::default());

        let value = map.entry(1).or_insert("hello".to_string());
        assert_eq!(value, &"hello".to_string());
        assert_eq!(map.len(), 1);

        let value = map.entry(1).or_insert("world".to_string());
        assert_eq!(value, &"hello".to_string());
        assert_eq!(map.len(), 1);

        map.entry(2).or_insert_with(|| "computed".to_string());
        assert_eq!(map.get(&2), Some(&"computed".to_string()));

        map.entry(1)
            .and_modify(|v| v.push_str(" world"))
            .or_insert("default".to_string());
        assert_eq!(map.get(&1), Some(&"hello world".to_string()));

        map.entry(4).or_insert_with_key(|k| k.to_string());
        assert_eq!(map.get(&4), Some(&"4".to_string()));

        assert_eq!(map.entry(3).key(), &3);
    }

    #[test]
    fn test_entry_or_default() {
        let mut map: HashMap<i32, Vec<i32>, SipHashBuilder> =
            HashMap::with_hasher(SipHashBuilder::default());

        map.entry(1).or_default().push(42);
        assert_eq!(map.get(&1), Some(&vec![42]));

        map.entry(1).or_default().push(24);
        assert_eq!(map.get(&1), Some(&vec![42, 24]));
    }

    #[test]
    fn test_occupied_entry() {
        let mut map = HashMap::with_hasher(SipHashBuilder::default());
        map.insert(1, "hello".to_string());

        match map.entry(1) {
            Entry::Occupied(mut entry) => {
                assert_eq!(entry.key(), &1);
                assert_eq!(entry.get(), &"hello".to_string());

                *entry.get_mut() = "world".to_string();
                assert_eq!(entry.get(), &"world".to_string());

                let old_value = entry.insert("new".to_string());
                assert_eq!(old_value, "world".to_string());
                assert_eq!(entry.get(), &"new".to_string());

                let (key, value) = entry.remove_entry();
                assert_eq!(key, 1);
                assert_eq!(value, "new".to_string());
            }
            Entry::Vacant(_) => panic!("Expected occupied entry"),
        }

        assert!(map.is_empty());
    }

    #[test]
    fn test_vacant_entry() {
        let mut map = HashMap::with_hasher(SipHashBuilder::default());

        match map.entry(1) {
            Entry::Vacant(entry) => {
                assert_eq!(entry.key(), &1);

                let value = entry.insert("hello".to_string());
                assert_eq!(value, &"hello".to_string());
            }
            Entry::Occupied(_) => panic!("Expected vacant entry"),
        }

        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&1), Some(&"hello".to_string()));
    }

    #[test]
    fn test_iterators() {
        let mut map = HashMap::with_hasher(SipHashBuilder::default());
        map.insert(1, "one".to_string());
        map.insert(2, "two".to_string());
        map.insert(3, "three".to_string());

        let pairs: std::collections::HashMap<i32, String> =
            map.iter().map(|(k, v)| (*k, v.clone())).collect();
        assert_eq!(pairs.len(), 3);
        assert_eq!(pairs.get(&1), Some(&"one".to_string()));
        assert_eq!(pairs.get(&2), Some(&"two".to_string()));
        assert_eq!(pairs.get(&3), Some(&"three".to_string()));

        let keys: std::collections::HashSet<i32> = map.keys().copied().collect();
        assert_eq!(keys.len(), 3);
        assert!(keys.contains(&1));
        assert!(keys.contains(&2));
        assert!(keys.contains(&3));

        let values: std::collections::HashSet<String> = map.values().cloned().collect();
        assert_eq!(values.len(), 3);
        assert!(values.contains("one"));
        assert!(values.contains("two"));
        assert!(values.contains("three"));

        for (_, v) in &mut map {
            v.push('!');
        }
        for v in map.values_mut() {
            v.push('?');
        }
        assert_eq!(map[&2], "two!?");
        assert_eq!((&map).into_iter().len(), 3);
    }

    #[test]
    fn test_drain() {
        let mut map = HashMap::with_hasher(SipHashBuilder::default());
        map.insert(1, "one".to_string());
        map.insert(2, "two".to_string());
        map.insert(3, "three".to_string());

        let drained: std::collections::HashMap<i32, String> = map.drain().collect();
        assert_eq!(drained.len(), 3);
        assert!(map.is_empty());

        assert_eq!(drained.get(&1), Some(&"one".to_string()));
        assert_eq!(drained.get(&2), Some(&"two".to_string()));
        assert_eq!(drained.get(&3), Some(&"three".to_string()));
    }

    #[test]
    fn test_into_iterator() {
        let map: HashMap<u32, char> = [(1, 'a'), (2, 'b'), (3, 'c')].into_iter().collect();
        let mut pairs: Vec<(u32, char)> = map.into_iter().collect();
        pairs.sort();
        assert_eq!(pairs, [(1, 'a'), (2, 'b'), (3, 'c')]);
    }

    #[test]
    fn test_collision_handling() {
        let mut map = HashMap::with_hasher(SipHashBuilder::default());

        for i in 0..1000 {
            map.insert(i, i * 2);
        }

        assert_eq!(map.len(), 1000);

        for i in 0..1000 {
            assert_eq!(map.get(&i), Some(&(i * 2)));
        }

        for i in (0..1000).step_by(2) {
            assert_eq!(map.remove(&i), Some(i * 2));
        }

        assert_eq!(map.len(), 500);

        for i in (1..1000).step_by(2) {
            assert_eq!(map.get(&i), Some(&(i * 2)));
        }
    }

    #[test]
    fn test_string_keys() {
        let mut map = HashMap::new();

        map.insert("hello".to_string(), 1);
        map.insert("world".to_string(), 2);
        map.insert("rust".to_string(), 3);

        assert_eq!(map.get("hello"), Some(&1));
        assert_eq!(map.get("world"), Some(&2));
        assert_eq!(map.get("rust"), Some(&3));
        assert_eq!(map.get("missing"), None);
    }

    #[test]
    fn test_default_trait() {
        let map: HashMap<i32, String> = HashMap::default();
        assert!(map.is_empty());
        assert_eq!(map.len(), 0);
    }

    #[test]
    fn test_equality_ignores_order() {
        let mut a = HashMap::new();
        let mut b = HashMap::with_capacity(64);
        for i in 0..20u32 {
            a.insert(i, i * 3);
        }
        for i in (0..20u32).rev() {
            b.insert(i, i * 3);
        }
        assert_eq!(a, b);

        b.insert(5, 0);
        assert_ne!(a, b);
        b.insert(5, 15);
        assert_eq!(a, b);

        b.insert(20, 60);
        assert_ne!(a, b);
    }

    #[test]
    fn test_equality_counts_duplicates() {
        let mut a = HashMap::new();
        let mut b = HashMap::new();
        a.insert_multi(1u8, 'x');
        a.insert_multi(1u8, 'x');
        a.insert_multi(2u8, 'y');
        b.insert_multi(1u8, 'x');
        b.insert_multi(2u8, 'y');
        b.insert_multi(2u8, 'y');
        assert_ne!(a, b);

        b.remove(&2);
        b.insert_multi(1u8, 'x');
        assert_eq!(a, b);
    }

    #[test]
    fn test_extend_and_from_iter() {
        let mut map: HashMap<u32, &str> = [(1, "a"), (2, "b")].into_iter().collect();
        map.extend([(2, "B"), (3, "c")]);
        assert_eq!(map.len(), 3);
        assert_eq!(map[&2], "B");

        let other: HashMap<u32, &str> = [(9, "z")].into_iter().collect();
        map.extend(&other);
        assert_eq!(map[&9], "z");
    }

    #[test]
    #[should_panic(expected = "key not found")]
    fn test_index_missing_key_panics() {
        let map: HashMap<u32, u32> = HashMap::new();
        let _ = map[&1];
    }

    #[test]
    fn test_debug_and_clone() {
        let mut map = HashMap::new();
        map.insert(1u8, "one");
        assert_eq!(alloc::format!("{:?}", map), r#"{1: "one"}"#);

        let mut cloned = map.clone();
        cloned.insert(1, "uno");
        assert_eq!(map[&1], "one");
        assert_eq!(cloned[&1], "uno");
    }

    #[test]
    fn test_complex_values() {
        let mut map = HashMap::with_hasher(SipHashBuilder::default());

        let vec1 = vec![1, 2, 3];
        let vec2 = vec![4, 5, 6];

        map.insert("first".to_string(), vec1.clone());
        map.insert("second".to_string(), vec2.clone());

        assert_eq!(map.get("first"), Some(&vec1));
        assert_eq!(map.get("second"), Some(&vec2));

        if let Some(v) = map.get_mut("first") {
            v.push(4);
        }

        assert_eq!(map.get("first"), Some(&vec![1, 2, 3, 4]));
    }

    #[test]
    fn test_random_operations_against_std() {
        let mut rng = SmallRng::seed_from_u64(0xc0ffee);
        let mut map = HashMap::with_hasher(SipHashBuilder::default());
        let mut model = std::collections::HashMap::new();

        for step in 0..50_000u32 {
            let key = rng.random_range(0..2048u32);
            match rng.random_range(0..10) {
                0..=4 => assert_eq!(map.insert(key, step), model.insert(key, step)),
                5..=7 => assert_eq!(map.remove(&key), model.remove(&key)),
                8 => {
                    *map.entry(key).or_insert(0) += 1;
                    *model.entry(key).or_insert(0) += 1;
                }
                _ => assert_eq!(map.get(&key), model.get(&key)),
            }
            assert_eq!(map.len(), model.len());
            assert!(map.load_factor() <= map.max_load_factor());
        }

        let mut ours: Vec<_> = map.iter().map(|(&k, &v)| (k, v)).collect();
        let mut theirs: Vec<_> = model.into_iter().collect();
        ours.sort();
        theirs.sort();
        assert_eq!(ours, theirs);
    }
}
