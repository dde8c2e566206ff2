use core::borrow::Borrow;
use core::fmt::Debug;
use core::hash::BuildHasher;
use core::hash::Hash;
use core::iter::FusedIterator;

use crate::allocator::Allocator;
use crate::allocator::Global;
use crate::error::Error;
use crate::hash_table::Entry as TableEntry;
use crate::hash_table::HashTable;
use crate::hash_table::alloc_failed;
use crate::scalar::ScalarState;

/// A hash set built on the prime-bucketed chained [`HashTable`].
///
/// `HashSet<T, S, A>` stores values of type `T` where `T` implements
/// `Hash + Eq`, hashing them with the builder `S` ([`ScalarState`] by
/// default). [`insert`](HashSet::insert) skips values already present;
/// [`insert_multi`](HashSet::insert_multi) stores them again, making the set
/// a multiset.
///
/// # Performance Characteristics
///
/// - **Memory**: one `usize` per bucket, plus the size of `T`, a `u64` hash
///   and a `usize` link per entry.
#[derive(Clone)]
pub struct HashSet<T, S = ScalarState, A: Allocator = Global> {
    table: HashTable<T, A>,
    hash_builder: S,
}

impl<T, S, A> PartialEq for HashSet<T, S, A>
where
    T: Hash + Eq,
    S: BuildHasher,
    A: Allocator,
{
    /// Sets are equal when they hold the same values with the same
    /// multiplicities, in any order.
    fn eq(&self, other: &Self) -> bool {
        if self.len() != other.len() {
            return false;
        }
        self.iter().all(|v| self.count(v) == other.count(v))
    }
}

impl<T, S, A> Eq for HashSet<T, S, A>
where
    T: Hash + Eq,
    S: BuildHasher,
    A: Allocator,
{
}

impl<T, S, A> Debug for HashSet<T, S, A>
where
    T: Debug,
    A: Allocator,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<T> HashSet<T, ScalarState> {
    /// Creates an empty `HashSet` using [`ScalarState`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// use prime_chain::HashSet;
    ///
    /// let set: HashSet<i32> = HashSet::new();
    /// assert!(set.is_empty());
    /// ```
    pub fn new() -> Self {
        Self::with_hasher(ScalarState)
    }

    /// Creates an empty `HashSet` for `capacity` values using
    /// [`ScalarState`].
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, ScalarState)
    }
}

impl<T, S> HashSet<T, S> {
    /// Creates a new hash set with the given hasher builder.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::BuildHasher;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # use prime_chain::HashSet;
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
    /// let set: HashSet<i32, _> = HashSet::with_hasher(SimpleHasher);
    /// assert!(set.is_empty());
    /// ```
    pub fn with_hasher(hash_builder: S) -> Self {
        Self::with_hasher_in(hash_builder, Global)
    }

    /// Creates a new hash set with the specified capacity and hasher builder.
    pub fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Self {
        Self::with_capacity_and_hasher_in(capacity, hash_builder, Global)
    }
}

impl<T, S, A: Allocator> HashSet<T, S, A> {
    /// Creates a new hash set with the given hasher builder, allocating from
    /// `alloc`.
    pub fn with_hasher_in(hash_builder: S, alloc: A) -> Self {
        Self::with_capacity_and_hasher_in(0, hash_builder, alloc)
    }

    /// Creates a new hash set for `capacity` values with the given hasher
    /// builder, allocating from `alloc`.
    pub fn with_capacity_and_hasher_in(capacity: usize, hash_builder: S, alloc: A) -> Self {
        Self {
            table: HashTable::with_capacity_in(capacity, alloc),
            hash_builder,
        }
    }

    /// Returns the number of elements in the set.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the set contains no elements.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Number of values the set holds before it must allocate again.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Length of the bucket array. Always prime.
    pub fn bucket_count(&self) -> usize {
        self.table.bucket_count()
    }

    /// Average number of values per bucket.
    pub fn load_factor(&self) -> f32 {
        self.table.load_factor()
    }

    /// The load factor an insertion may not exceed.
    pub fn max_load_factor(&self) -> f32 {
        self.table.max_load_factor()
    }

    /// Sets the maximum load factor, growing if the set is already above it.
    ///
    /// # Panics
    ///
    /// Panics unless `factor` is finite and positive.
    pub fn set_max_load_factor(&mut self, factor: f32) {
        self.table
            .set_max_load_factor(factor)
            .unwrap_or_else(|err| alloc_failed(err));
    }

    /// Returns a reference to the set's hasher builder.
    pub fn hasher(&self) -> &S {
        &self.hash_builder
    }

    /// Clears the set, removing all values. The bucket array is kept.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use prime_chain::HashSet;
    ///
    /// let mut set = HashSet::new();
    /// set.insert(1);
    /// set.clear();
    /// assert!(set.is_empty());
    /// ```
    pub fn clear(&mut self) {
        self.table.clear();
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
    pub fn try_reserve(&mut self, additional: usize) -> Result<(), Error> {
        self.table.reserve(additional)
    }

    /// Rebuilds the bucket array with at least `bucket_count` buckets,
    /// rounded up to a prime that keeps the load factor bound. May shrink.
    pub fn rehash(&mut self, bucket_count: usize) {
        self.table
            .rehash(bucket_count)
            .unwrap_or_else(|err| alloc_failed(err));
    }

    /// An iterator visiting all elements in bucket order.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use prime_chain::HashSet;
    ///
    /// let mut set = HashSet::new();
    /// set.insert("a");
    /// set.insert("b");
    ///
    /// let mut values: Vec<_> = set.iter().copied().collect();
    /// values.sort();
    /// assert_eq!(values, ["a", "b"]);
    /// ```
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            inner: self.table.iter(),
        }
    }

    /// Clears the set, returning all elements as an iterator.
    pub fn drain(&mut self) -> Drain<'_, T, A> {
        Drain {
            inner: self.table.drain(),
        }
    }

    /// Retains only the elements specified by the predicate.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use prime_chain::HashSet;
    ///
    /// let mut set: HashSet<i32> = (1..=4).collect();
    /// set.retain(|&x| x % 2 == 0);
    /// assert_eq!(set.len(), 2);
    /// assert!(set.contains(&2));
    /// assert!(set.contains(&4));
    /// ```
    pub fn retain(&mut self, mut f: impl FnMut(&T) -> bool) {
        self.table.retain(|v| f(&*v));
    }
}

impl<T, S, A> HashSet<T, S, A>
where
    T: Hash + Eq,
    S: BuildHasher,
    A: Allocator,
{
    #[inline]
    fn hash<Q>(&self, value: &Q) -> u64
    where
        Q: Hash + ?Sized,
    {
        self.hash_builder.hash_one(value)
    }

    /// Adds a value to the set.
    ///
    /// Returns whether the value was newly inserted.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use prime_chain::HashSet;
    ///
    /// let mut set = HashSet::new();
    /// assert!(set.insert(2));
    /// assert!(!set.insert(2));
    /// assert_eq!(set.len(), 1);
    /// ```
    pub fn insert(&mut self, value: T) -> bool {
        let hash = self.hash(&value);
        match self
            .table
            .entry(hash, |v| v == &value)
            .unwrap_or_else(|err| alloc_failed(err))
        {
            TableEntry::Occupied(_) => false,
            TableEntry::Vacant(entry) => {
                entry.insert(value);
                true
            }
        }
    }

    /// Adds a value even if an equal one is present.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use prime_chain::HashSet;
    ///
    /// let mut set = HashSet::new();
    /// set.insert_multi('x');
    /// set.insert_multi('x');
    /// assert_eq!(set.count(&'x'), 2);
    /// ```
    pub fn insert_multi(&mut self, value: T) {
        let hash = self.hash(&value);
        self.table
            .insert(hash, value)
            .unwrap_or_else(|err| alloc_failed(err));
    }

    /// Returns `true` if the set contains the value.
    pub fn contains<Q>(&self, value: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = self.hash(value);
        self.table.contains(hash, |v| v.borrow() == value)
    }

    /// Number of stored copies of the value.
    pub fn count<Q>(&self, value: &Q) -> usize
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = self.hash(value);
        self.table.count(hash, |v| v.borrow() == value)
    }

    /// Returns a reference to the stored value equal to the given one.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use prime_chain::HashSet;
    ///
    /// let set: HashSet<String> = ["apple".to_string()].into_iter().collect();
    /// assert_eq!(set.get("apple"), Some(&"apple".to_string()));
    /// assert_eq!(set.get("pear"), None);
    /// ```
    pub fn get<Q>(&self, value: &Q) -> Option<&T>
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = self.hash(value);
        self.table.find(hash, |v| v.borrow() == value)
    }

    /// Removes one copy of the value. Returns whether it was present.
    pub fn remove<Q>(&mut self, value: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.take(value).is_some()
    }

    /// Removes and returns one stored copy of the value.
    pub fn take<Q>(&mut self, value: &Q) -> Option<T>
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = self.hash(value);
        self.table.remove(hash, |v| v.borrow() == value)
    }

    /// Adds a value, replacing and returning an equal stored value.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use prime_chain::HashSet;
    ///
    /// let mut set = HashSet::new();
    /// assert_eq!(set.replace(5), None);
    /// assert_eq!(set.replace(5), Some(5));
    /// assert_eq!(set.len(), 1);
    /// ```
    pub fn replace(&mut self, value: T) -> Option<T> {
        let hash = self.hash(&value);
        match self
            .table
            .entry(hash, |v| v == &value)
            .unwrap_or_else(|err| alloc_failed(err))
        {
            TableEntry::Occupied(mut entry) => Some(core::mem::replace(entry.get_mut(), value)),
            TableEntry::Vacant(entry) => {
                entry.insert(value);
                None
            }
        }
    }

    /// Returns `true` if `self` has no elements in common with `other`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use prime_chain::HashSet;
    ///
    /// let a: HashSet<i32> = [1, 2].into_iter().collect();
    /// let b: HashSet<i32> = [3, 4].into_iter().collect();
    /// assert!(a.is_disjoint(&b));
    /// ```
    pub fn is_disjoint(&self, other: &Self) -> bool {
        if self.len() <= other.len() {
            self.iter().all(|v| !other.contains(v))
        } else {
            other.iter().all(|v| !self.contains(v))
        }
    }

    /// Returns `true` if `other` holds every element of `self` at least as
    /// many times as `self` does.
    ///
    /// Copies added with [`insert_multi`](HashSet::insert_multi) count, so
    /// this is the multiset order matching `==`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use prime_chain::HashSet;
    ///
    /// let a: HashSet<i32> = [1, 2].into_iter().collect();
    /// let b: HashSet<i32> = [1, 2, 3].into_iter().collect();
    /// assert!(a.is_subset(&b));
    /// assert!(!b.is_subset(&a));
    ///
    /// let mut twice = HashSet::new();
    /// twice.insert_multi(1);
    /// twice.insert_multi(1);
    /// assert!(!twice.is_subset(&b));
    /// ```
    pub fn is_subset(&self, other: &Self) -> bool {
        if self.len() > other.len() {
            return false;
        }
        self.iter().all(|v| self.count(v) <= other.count(v))
    }

    /// Returns `true` if `self` holds every element of `other` at least as
    /// many times as `other` does.
    pub fn is_superset(&self, other: &Self) -> bool {
        other.is_subset(self)
    }

    /// Returns an iterator over the union of `self` and `other`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use prime_chain::HashSet;
    ///
    /// let a: HashSet<i32> = [1, 2].into_iter().collect();
    /// let b: HashSet<i32> = [2, 3].into_iter().collect();
    ///
    /// let union: Vec<_> = a.union(&b).copied().collect();
    /// assert_eq!(union.len(), 3);
    /// ```
    pub fn union<'a>(&'a self, other: &'a Self) -> Union<'a, T, S, A> {
        Union {
            iter: self.iter(),
            other_iter: other.iter(),
            set: self,
        }
    }

    /// Returns an iterator over the elements of `self` also in `other`.
    pub fn intersection<'a>(&'a self, other: &'a Self) -> Intersection<'a, T, S, A> {
        if self.len() <= other.len() {
            Intersection {
                iter: self.iter(),
                other,
            }
        } else {
            Intersection {
                iter: other.iter(),
                other: self,
            }
        }
    }

    /// Returns an iterator over the elements of `self` not in `other`.
    pub fn difference<'a>(&'a self, other: &'a Self) -> Difference<'a, T, S, A> {
        Difference {
            iter: self.iter(),
            other,
        }
    }

    /// Returns an iterator over the elements in exactly one of the sets.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use prime_chain::HashSet;
    ///
    /// let a: HashSet<i32> = [1, 2].into_iter().collect();
    /// let b: HashSet<i32> = [2, 3].into_iter().collect();
    ///
    /// let mut sym_diff: Vec<_> = a.symmetric_difference(&b).copied().collect();
    /// sym_diff.sort();
    /// assert_eq!(sym_diff, [1, 3]);
    /// ```
    pub fn symmetric_difference<'a>(&'a self, other: &'a Self) -> SymmetricDifference<'a, T, S, A> {
        SymmetricDifference {
            iter: self.difference(other).chain(other.difference(self)),
        }
    }
}

impl<T> Default for HashSet<T, ScalarState> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, S, A: Allocator> IntoIterator for HashSet<T, S, A> {
    type Item = T;
    type IntoIter = IntoIter<T, A>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            inner: self.table.into_iter(),
        }
    }
}

impl<'a, T, S, A: Allocator> IntoIterator for &'a HashSet<T, S, A> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T, S> FromIterator<T> for HashSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::with_hasher(S::default());
        set.extend(iter);
        set
    }
}

impl<T, S, A> Extend<T> for HashSet<T, S, A>
where
    T: Hash + Eq,
    S: BuildHasher,
    A: Allocator,
{
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        self.reserve(iter.size_hint().0);
        for value in iter {
            self.insert(value);
        }
    }
}

impl<'a, T, S, A> Extend<&'a T> for HashSet<T, S, A>
where
    T: Hash + Eq + Copy,
    S: BuildHasher,
    A: Allocator,
{
    fn extend<I: IntoIterator<Item = &'a T>>(&mut self, iter: I) {
        self.extend(iter.into_iter().copied());
    }
}

/// An iterator over the elements of a `HashSet`.
pub struct Iter<'a, T> {
    inner: crate::hash_table::Iter<'a, T>,
}

impl<T> Clone for Iter<'_, T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<T> FusedIterator for Iter<'_, T> {}

/// A draining iterator over the elements of a `HashSet`.
pub struct Drain<'a, T, A: Allocator = Global> {
    inner: crate::hash_table::Drain<'a, T, A>,
}

impl<T, A: Allocator> Iterator for Drain<'_, T, A> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

/// An owning iterator over the elements of a `HashSet`.
pub struct IntoIter<T, A: Allocator = Global> {
    inner: crate::hash_table::IntoIter<T, A>,
}

impl<T, A: Allocator> Iterator for IntoIter<T, A> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

/// An iterator over the union of two sets.
pub struct Union<'a, T, S, A: Allocator = Global> {
    iter: Iter<'a, T>,
    other_iter: Iter<'a, T>,
    set: &'a HashSet<T, S, A>,
}

impl<'a, T, S, A> Iterator for Union<'a, T, S, A>
where
    T: Hash + Eq,
    S: BuildHasher,
    A: Allocator,
{
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(v) = self.iter.next() {
            return Some(v);
        }
        loop {
            let v = self.other_iter.next()?;
            if !self.set.contains(v) {
                return Some(v);
            }
        }
    }
}

/// An iterator over the intersection of two sets.
pub struct Intersection<'a, T, S, A: Allocator = Global> {
    iter: Iter<'a, T>,
    other: &'a HashSet<T, S, A>,
}

impl<'a, T, S, A> Iterator for Intersection<'a, T, S, A>
where
    T: Hash + Eq,
    S: BuildHasher,
    A: Allocator,
{
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let v = self.iter.next()?;
            if self.other.contains(v) {
                return Some(v);
            }
        }
    }
}

/// An iterator over the difference of two sets.
pub struct Difference<'a, T, S, A: Allocator = Global> {
    iter: Iter<'a, T>,
    other: &'a HashSet<T, S, A>,
}

impl<'a, T, S, A> Iterator for Difference<'a, T, S, A>
where
    T: Hash + Eq,
    S: BuildHasher,
    A: Allocator,
{
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let v = self.iter.next()?;
            if !self.other.contains(v) {
                return Some(v);
            }
        }
    }
}

/// An iterator over the symmetric difference of two sets.
pub struct SymmetricDifference<'a, T, S, A: Allocator = Global> {
    iter: core::iter::Chain<Difference<'a, T, S, A>, Difference<'a, T, S, A>>,
}

impl<'a, T, S, A> Iterator for SymmetricDifference<'a, T, S, A>
where
    T: Hash + Eq,
    S: BuildHasher,
    A: Allocator,
{
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next()
    }
}
