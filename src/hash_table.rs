use alloc::alloc::handle_alloc_error;
use alloc::vec::Vec;
use core::alloc::Layout;
use core::fmt::Debug;
use core::iter::FusedIterator;
use core::marker::PhantomData;
use core::mem::ManuallyDrop;
use core::mem::MaybeUninit;
use core::ptr::NonNull;

use crate::allocator::Allocator;
use crate::allocator::Global;
use crate::error::Error;
use crate::prime::next_prime;

/// Chain terminator and empty-bucket marker.
const NIL: usize = usize::MAX;

const DEFAULT_MAX_LOAD_FACTOR: f32 = 1.0;

/// Smallest arena the table grows into once it needs one.
const MIN_ARENA_CAPACITY: usize = 4;

/// Number of buckets needed to hold `len` entries under `max_load_factor`.
#[inline(always)]
fn buckets_for(len: usize, max_load_factor: f32) -> usize {
    // Float to integer casts saturate.
    (len as f64 / max_load_factor as f64).ceil() as usize
}

/// The prime bucket count serving a request for `n` buckets.
///
/// Requests whose array could never be laid out fail before the prime search.
fn prime_bucket_count(n: usize) -> Result<usize, Error> {
    Layout::array::<usize>(n)?;
    Ok(next_prime(n))
}

#[inline(always)]
fn exceeds_load(len: usize, bucket_count: usize, max_load_factor: f32) -> bool {
    len as f64 > bucket_count as f64 * max_load_factor as f64
}

#[cold]
#[inline(never)]
pub(crate) fn alloc_failed(err: Error) -> ! {
    match err {
        Error::AllocationFailure { layout } => handle_alloc_error(layout),
        Error::CapacityOverflow => panic!("capacity overflow"),
    }
}

/// One arena slot. Live slots hold an initialized `value` and link to the next
/// entry of their chain; free slots link to the next free slot.
struct Node<V> {
    hash: u64,
    next: usize,
    value: MaybeUninit<V>,
}

/// `cap` contiguous slots of `T` obtained from an [`Allocator`].
///
/// Has no `Drop`: the owner releases it through the allocator it came from.
struct RawBuf<T> {
    ptr: NonNull<T>,
    cap: usize,
}

impl<T> RawBuf<T> {
    const fn empty() -> Self {
        Self {
            ptr: NonNull::dangling(),
            cap: 0,
        }
    }

    fn allocate_in<A: Allocator>(cap: usize, alloc: &A) -> Result<Self, Error> {
        if cap == 0 {
            return Ok(Self::empty());
        }
        let layout = Layout::array::<T>(cap)?;
        let ptr = alloc
            .allocate(layout)
            .map_err(|err| err.with_layout(layout))?;
        Ok(Self {
            ptr: ptr.cast(),
            cap,
        })
    }

    fn bytes(&self) -> usize {
        core::mem::size_of::<T>() * self.cap
    }

    /// # Safety
    ///
    /// `self` must have come from `allocate_in` on `alloc`. Its slots must not
    /// be used afterwards.
    unsafe fn release_in<A: Allocator>(&mut self, alloc: &A) {
        if self.cap != 0 {
            // SAFETY: `allocate_in` validated this exact layout.
            unsafe {
                let layout = Layout::from_size_align_unchecked(self.bytes(), align_of::<T>());
                alloc.deallocate(self.ptr.cast(), layout);
            }
        }
        *self = Self::empty();
    }

    /// # Safety
    ///
    /// `index` must be less than `cap`.
    #[inline(always)]
    unsafe fn slot(&self, index: usize) -> *mut T {
        debug_assert!(index < self.cap);
        // SAFETY: Caller ensures `index` is in bounds.
        unsafe { self.ptr.as_ptr().add(index) }
    }
}

/// A buffer that goes back to its allocator unless it is committed.
struct Pending<'a, T, A: Allocator> {
    buf: RawBuf<T>,
    alloc: &'a A,
}

impl<'a, T, A: Allocator> Pending<'a, T, A> {
    fn new(buf: RawBuf<T>, alloc: &'a A) -> Self {
        Self { buf, alloc }
    }

    fn commit(self) -> RawBuf<T> {
        let this = ManuallyDrop::new(self);
        // SAFETY: `this` is never dropped, so the buffer has exactly one owner.
        unsafe { core::ptr::read(&this.buf) }
    }
}

impl<T, A: Allocator> Drop for Pending<'_, T, A> {
    fn drop(&mut self) {
        // SAFETY: The buffer came from `self.alloc` and was never published.
        unsafe { self.buf.release_in(self.alloc) }
    }
}

/// Points every head of `buckets` at [`NIL`].
///
/// # Safety
///
/// `buckets` must be a live allocation.
unsafe fn clear_heads(buckets: &RawBuf<usize>) {
    // SAFETY: Caller ensures the allocation is live. All bits set is `NIL`.
    unsafe { core::ptr::write_bytes(buckets.ptr.as_ptr(), 0xff, buckets.cap) }
}

/// Reverses every chain of `buckets` in place.
///
/// Rebuilds prepend while walking each old chain from its head, which leaves
/// entries sharing a hash in reverse order; one more reversal restores it.
///
/// # Safety
///
/// Every chain of `buckets` must only reach live slots of `nodes`.
unsafe fn reverse_chains<V>(buckets: &RawBuf<usize>, nodes: &RawBuf<Node<V>>) {
    for bucket in 0..buckets.cap {
        // SAFETY: Caller ensures every index on the chain is a live slot.
        unsafe {
            let mut index = *buckets.slot(bucket);
            let mut reversed = NIL;
            while index != NIL {
                let node = nodes.slot(index);
                let next = (*node).next;
                (*node).next = reversed;
                reversed = index;
                index = next;
            }
            *buckets.slot(bucket) = reversed;
        }
    }
}

/// Debug statistics for hash table analysis.
///
/// Available in tests and with the `stats` feature.
#[cfg(any(test, feature = "stats"))]
#[derive(Debug, Clone)]
pub struct DebugStats {
    /// Number of elements currently in the table
    pub populated: usize,
    /// Length of the bucket array
    pub bucket_count: usize,
    /// Whether the bucket count is prime
    pub bucket_count_is_prime: bool,
    /// Buckets with an empty chain
    pub empty_buckets: usize,
    /// Length of the longest chain
    pub longest_chain: usize,
    /// Entries per bucket
    pub load_factor: f64,
    /// Load factor that triggers growth
    pub max_load_factor: f64,
    /// Entry slots allocated in the arena
    pub arena_capacity: usize,
    /// Total memory in bytes used by the table
    pub total_bytes: usize,
    /// Bytes held by empty buckets and unused arena slots
    pub wasted_bytes: usize,
}

#[cfg(any(test, feature = "stats"))]
impl DebugStats {
    /// Pretty-print the debug statistics.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        println!("=== Hash Table Debug Statistics ===");
        println!(
            "Population: {} in {} buckets ({:.2}% load, max {:.2}%)",
            self.populated,
            self.bucket_count,
            self.load_factor * 100.0,
            self.max_load_factor * 100.0
        );
        println!(
            "Buckets: {} empty, longest chain {}, prime: {}",
            self.empty_buckets, self.longest_chain, self.bucket_count_is_prime
        );
        println!(
            "Arena: {}/{} slots in use",
            self.populated, self.arena_capacity
        );
        println!("Total Allocated: {} bytes", self.total_bytes);
        println!(
            "Memory: {} bytes wasted ({:.02}%)",
            self.wasted_bytes,
            if self.total_bytes == 0 {
                0.0
            } else {
                (self.wasted_bytes as f64 / self.total_bytes as f64) * 100.0
            }
        );
    }
}

/// A separately chained hash table with a prime number of buckets.
///
/// `HashTable<V>` stores values of type `V`. Like a raw table, it requires you
/// to provide both the hash value and an equality predicate for each
/// operation; an entry lives in bucket `hash % bucket_count()` and collisions
/// are chained behind it.
///
/// Insertion never checks for duplicates: use [`entry`] for insert-if-absent.
/// When an insertion would push `len() / bucket_count()` past the maximum
/// load factor (1.0 by default) the bucket array grows to the smallest prime
/// of at least `2 * bucket_count() + 1` that restores the bound.
///
/// Entries live in an arena allocated from `A` and are chained by index; each
/// caches its hash, so growth relinks entries without rehashing them or moving
/// their values.
///
/// Every operation that allocates reports failure through [`Error`] and
/// leaves the table untouched when it does.
///
/// [`entry`]: HashTable::entry
///
/// ## Example
///
/// ```rust
/// # use core::hash::Hash;
/// # use core::hash::Hasher;
/// #
/// # use prime_chain::hash_table::HashTable;
/// # use siphasher::sip::SipHasher;
/// #
/// # #[derive(Debug, PartialEq)]
/// # struct Person {
/// #     id: u64,
/// #     name: String,
/// # }
/// #
/// # fn hash_id(id: u64) -> u64 {
/// #     let mut hasher = SipHasher::new();
/// #     id.hash(&mut hasher);
/// #     hasher.finish()
/// # }
///
/// let mut table = HashTable::new();
/// let hash = hash_id(123);
///
/// match table.entry(hash, |p: &Person| p.id == 123).unwrap() {
///     prime_chain::hash_table::Entry::Vacant(entry) => {
///         entry.insert(Person {
///             id: 123,
///             name: "Alice".to_string(),
///         });
///     }
///     prime_chain::hash_table::Entry::Occupied(_) => {
///         println!("Person already exists");
///     }
/// }
/// assert_eq!(table.bucket_count(), 2);
/// ```
pub struct HashTable<V, A: Allocator = Global> {
    buckets: RawBuf<usize>,
    nodes: RawBuf<Node<V>>,

    /// Arena slots below this index have held a value at some point.
    touched: usize,
    free: usize,

    populated: usize,
    max_load_factor: f32,

    alloc: A,
    _phantom: PhantomData<V>,
}

// SAFETY: The table owns its values and buffers outright.
unsafe impl<V: Send, A: Allocator + Send> Send for HashTable<V, A> {}
// SAFETY: Shared access only hands out shared references to values.
unsafe impl<V: Sync, A: Allocator + Sync> Sync for HashTable<V, A> {}

impl<V, A: Allocator> Debug for HashTable<V, A> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let chains = (0..self.buckets.cap)
            .map(|bucket| self.bucket_len(bucket))
            .collect::<Vec<_>>();

        f.debug_struct("HashTable")
            .field("populated", &self.populated)
            .field("bucket_count", &self.buckets.cap)
            .field("max_load_factor", &self.max_load_factor)
            .field("arena_capacity", &self.nodes.cap)
            .field("chains", &chains)
            .finish()
    }
}

impl<V, A> Clone for HashTable<V, A>
where
    V: Clone,
    A: Allocator + Clone,
{
    fn clone(&self) -> Self {
        let mut new_table =
            Self::allocate_parts(self.buckets.cap, self.populated, self.alloc.clone())
                .unwrap_or_else(|err| alloc_failed(err));
        new_table.max_load_factor = self.max_load_factor;

        // SAFETY: Both tables have the same bucket count, so every entry keeps
        // its bucket. `new_table` has an arena slot for each source entry and
        // is consistent after every step should `clone` panic.
        unsafe {
            for bucket in 0..self.buckets.cap {
                let mut tail = NIL;
                let mut index = self.head(bucket);
                while index != NIL {
                    let node = self.node(index);
                    let value = node.value.assume_init_ref().clone();

                    let slot = new_table.take_slot();
                    new_table.nodes.slot(slot).write(Node {
                        hash: node.hash,
                        next: NIL,
                        value: MaybeUninit::new(value),
                    });
                    if tail == NIL {
                        new_table.set_head(bucket, slot);
                    } else {
                        new_table.node_mut(tail).next = slot;
                    }
                    tail = slot;
                    new_table.populated += 1;

                    index = node.next;
                }
            }
        }

        debug_assert!(new_table.populated == self.populated);
        new_table
    }
}

impl<V, A: Allocator> Drop for HashTable<V, A> {
    fn drop(&mut self) {
        // SAFETY: Chains only reach initialized values, and both buffers came
        // from `self.alloc`.
        unsafe {
            self.drop_values();
            self.buckets.release_in(&self.alloc);
            self.nodes.release_in(&self.alloc);
        }
    }
}

impl<V> Default for HashTable<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> HashTable<V> {
    /// Creates an empty table with the smallest bucket array, two buckets.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use prime_chain::hash_table::HashTable;
    /// #
    /// let table: HashTable<String> = HashTable::new();
    /// assert!(table.is_empty());
    /// assert_eq!(table.bucket_count(), 2);
    /// ```
    pub fn new() -> Self {
        Self::new_in(Global)
    }

    /// Creates a new hash table that can hold `capacity` values without
    /// growing.
    ///
    /// The bucket count is the smallest prime not below `capacity`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use prime_chain::hash_table::HashTable;
    /// #
    /// let table: HashTable<String> = HashTable::with_capacity(100);
    /// assert!(table.capacity() >= 100);
    /// assert_eq!(table.bucket_count(), 101);
    /// ```
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_in(capacity, Global)
    }
}

impl<V, A: Allocator> HashTable<V, A> {
    /// Creates an empty table drawing memory from `alloc`.
    ///
    /// # Panics
    ///
    /// Calls [`handle_alloc_error`] if the initial bucket array cannot be
    /// allocated.
    pub fn new_in(alloc: A) -> Self {
        Self::with_capacity_in(0, alloc)
    }

    /// Creates a table for `capacity` values drawing memory from `alloc`.
    ///
    /// # Panics
    ///
    /// Calls [`handle_alloc_error`] if allocation fails, and panics if the
    /// requested size overflows.
    pub fn with_capacity_in(capacity: usize, alloc: A) -> Self {
        Self::try_with_capacity_in(capacity, alloc).unwrap_or_else(|err| alloc_failed(err))
    }

    /// Creates a table for `capacity` values, reporting allocation failure.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use prime_chain::Error;
    /// # use prime_chain::allocator::Global;
    /// # use prime_chain::hash_table::HashTable;
    /// #
    /// let table: HashTable<u64> = HashTable::try_with_capacity_in(10, Global)?;
    /// assert_eq!(table.bucket_count(), 11);
    ///
    /// let too_big = HashTable::<u64>::try_with_capacity_in(usize::MAX / 2, Global);
    /// assert_eq!(too_big.unwrap_err(), Error::CapacityOverflow);
    /// # Ok::<(), Error>(())
    /// ```
    pub fn try_with_capacity_in(capacity: usize, alloc: A) -> Result<Self, Error> {
        let bucket_count = prime_bucket_count(buckets_for(capacity, DEFAULT_MAX_LOAD_FACTOR).max(1))?;
        Self::allocate_parts(bucket_count, capacity, alloc)
    }

    fn allocate_parts(bucket_count: usize, capacity: usize, alloc: A) -> Result<Self, Error> {
        let buckets = Pending::new(RawBuf::allocate_in(bucket_count, &alloc)?, &alloc);
        let nodes = RawBuf::allocate_in(capacity, &alloc)?;
        let buckets = buckets.commit();

        // SAFETY: Freshly allocated.
        unsafe { clear_heads(&buckets) };

        Ok(Self {
            buckets,
            nodes,
            touched: 0,
            free: NIL,
            populated: 0,
            max_load_factor: DEFAULT_MAX_LOAD_FACTOR,
            alloc,
            _phantom: PhantomData,
        })
    }

    /// # Safety
    ///
    /// `bucket` must be less than the bucket count.
    #[inline(always)]
    unsafe fn head(&self, bucket: usize) -> usize {
        // SAFETY: Caller ensures `bucket` is in bounds.
        unsafe { *self.buckets.slot(bucket) }
    }

    /// # Safety
    ///
    /// `bucket` must be less than the bucket count.
    #[inline(always)]
    unsafe fn set_head(&mut self, bucket: usize, index: usize) {
        // SAFETY: Caller ensures `bucket` is in bounds.
        unsafe { *self.buckets.slot(bucket) = index }
    }

    /// # Safety
    ///
    /// `index` must name an arena slot below `touched`.
    #[inline(always)]
    unsafe fn node(&self, index: usize) -> &Node<V> {
        // SAFETY: Caller ensures the slot has been written.
        unsafe { &*self.nodes.slot(index) }
    }

    /// # Safety
    ///
    /// `index` must name an arena slot below `touched`.
    #[inline(always)]
    unsafe fn node_mut(&mut self, index: usize) -> &mut Node<V> {
        // SAFETY: Caller ensures the slot has been written.
        unsafe { &mut *self.nodes.slot(index) }
    }

    #[inline(always)]
    fn bucket_index(&self, hash: u64) -> usize {
        (hash % self.buckets.cap as u64) as usize
    }

    fn heads(&self) -> &[usize] {
        // SAFETY: The bucket array is always allocated and fully initialized.
        unsafe { core::slice::from_raw_parts(self.buckets.ptr.as_ptr(), self.buckets.cap) }
    }

    /// Finds the first entry matching `hash` and `eq`, returning the index of
    /// its chain predecessor ([`NIL`] at the head) and its own index.
    #[inline]
    fn search(&self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<(usize, usize)> {
        let bucket = self.bucket_index(hash);
        let mut prev = NIL;
        // SAFETY: `bucket` is in bounds and chains only reach live nodes.
        unsafe {
            let mut index = self.head(bucket);
            while index != NIL {
                let node = self.node(index);
                if node.hash == hash && eq(node.value.assume_init_ref()) {
                    return Some((prev, index));
                }
                prev = index;
                index = node.next;
            }
        }
        None
    }

    /// Pops a slot for a new entry.
    ///
    /// # Safety
    ///
    /// The arena must have room: `len() < arena capacity`.
    #[inline]
    unsafe fn take_slot(&mut self) -> usize {
        debug_assert!(self.populated < self.nodes.cap);
        if self.free != NIL {
            let index = self.free;
            // SAFETY: Free-list indices are below `touched`.
            self.free = unsafe { self.node(index).next };
            index
        } else {
            let index = self.touched;
            self.touched += 1;
            index
        }
    }

    /// Prepends a new entry to the chain for `hash`.
    ///
    /// # Safety
    ///
    /// The arena must have room for one more entry, and the bucket array must
    /// already be sized for it.
    #[inline]
    unsafe fn link(&mut self, hash: u64, value: V) -> &mut V {
        let bucket = self.bucket_index(hash);
        // SAFETY: Caller ensures a free slot exists; `bucket` is in bounds.
        unsafe {
            let index = self.take_slot();
            let head = self.head(bucket);
            self.nodes.slot(index).write(Node {
                hash,
                next: head,
                value: MaybeUninit::new(value),
            });
            self.set_head(bucket, index);
            self.populated += 1;
            (*self.nodes.slot(index)).value.assume_init_mut()
        }
    }

    /// Detaches an entry from its chain, returns its slot to the free list and
    /// hands back the value.
    ///
    /// # Safety
    ///
    /// `index` must be a live entry in `bucket`'s chain and `prev` its
    /// predecessor, or [`NIL`] if it heads the chain.
    unsafe fn unlink(&mut self, bucket: usize, prev: usize, index: usize) -> V {
        // SAFETY: Caller guarantees the chain position.
        unsafe {
            let next = self.node(index).next;
            if prev == NIL {
                self.set_head(bucket, next);
            } else {
                self.node_mut(prev).next = next;
            }

            let free = self.free;
            let node = self.node_mut(index);
            node.next = free;
            let value = node.value.assume_init_read();

            self.free = index;
            self.populated -= 1;
            value
        }
    }

    /// Unlinks the first entry in bucket `*cursor` or later, advancing the
    /// cursor past buckets that are empty.
    fn pop_from(&mut self, cursor: &mut usize) -> Option<V> {
        if self.populated == 0 {
            return None;
        }

        while *cursor < self.buckets.cap {
            // SAFETY: `*cursor` is in bounds; a non-NIL head is a live entry
            // with no predecessor.
            unsafe {
                let head = self.head(*cursor);
                if head != NIL {
                    return Some(self.unlink(*cursor, NIL, head));
                }
            }
            *cursor += 1;
        }

        None
    }

    /// Drops every live value without touching the links.
    ///
    /// # Safety
    ///
    /// The chains must be reset or discarded afterwards.
    unsafe fn drop_values(&mut self) {
        if !core::mem::needs_drop::<V>() || self.populated == 0 {
            return;
        }
        // SAFETY: Chains only reach initialized values.
        unsafe {
            for bucket in 0..self.buckets.cap {
                let mut index = self.head(bucket);
                while index != NIL {
                    let node = self.node_mut(index);
                    index = node.next;
                    node.value.assume_init_drop();
                }
            }
        }
    }

    /// Makes room for `additional` more entries: a larger bucket array if the
    /// load factor demands it and a larger arena if it is full.
    ///
    /// Both buffers are acquired before either is installed.
    fn prepare(&mut self, additional: usize) -> Result<(), Error> {
        let required = self
            .populated
            .checked_add(additional)
            .ok_or(Error::CapacityOverflow)?;

        let bucket_count = self.buckets.cap;
        let new_bucket_count = if exceeds_load(required, bucket_count, self.max_load_factor) {
            Some(prime_bucket_count(
                buckets_for(required, self.max_load_factor)
                    .max(bucket_count.saturating_mul(2).saturating_add(1)),
            )?)
        } else {
            None
        };
        let new_arena_capacity = (required > self.nodes.cap).then(|| {
            required
                .max(self.nodes.cap.saturating_mul(2))
                .max(MIN_ARENA_CAPACITY)
        });

        let buckets = match new_bucket_count {
            Some(count) => Some(Pending::new(
                RawBuf::allocate_in(count, &self.alloc)?,
                &self.alloc,
            )),
            None => None,
        };
        let nodes = match new_arena_capacity {
            Some(cap) => Some(RawBuf::allocate_in(cap, &self.alloc)?),
            None => None,
        };
        let buckets = buckets.map(Pending::commit);

        // SAFETY: Both buffers are fresh allocations from `self.alloc`.
        unsafe {
            if let Some(nodes) = nodes {
                self.adopt_arena(nodes);
            }
            if let Some(buckets) = buckets {
                self.relink(buckets);
            }
        }
        Ok(())
    }

    /// Moves the arena into `nodes`, which must be at least as large.
    ///
    /// # Safety
    ///
    /// `nodes` must be a fresh allocation from `self.alloc`.
    unsafe fn adopt_arena(&mut self, nodes: RawBuf<Node<V>>) {
        debug_assert!(nodes.cap >= self.touched);
        // SAFETY: Slots below `touched` are the only ones ever written; the
        // buffers are distinct allocations. Indices stay valid.
        unsafe {
            core::ptr::copy_nonoverlapping(
                self.nodes.ptr.as_ptr(),
                nodes.ptr.as_ptr(),
                self.touched,
            );
            let mut old = core::mem::replace(&mut self.nodes, nodes);
            old.release_in(&self.alloc);
        }
    }

    /// Relinks every entry into `buckets` by its cached hash and releases the
    /// old bucket array.
    ///
    /// # Safety
    ///
    /// `buckets` must be a fresh, non-empty allocation from `self.alloc`.
    unsafe fn relink(&mut self, buckets: RawBuf<usize>) {
        // SAFETY: Every chain index names a live node; every target bucket is
        // computed against the new bucket count.
        unsafe {
            clear_heads(&buckets);
            let mut old = core::mem::replace(&mut self.buckets, buckets);

            for bucket in 0..old.cap {
                let mut index = *old.slot(bucket);
                while index != NIL {
                    let node = &mut *self.nodes.slot(index);
                    let next = node.next;
                    let target = self.bucket_index(node.hash);
                    node.next = *self.buckets.slot(target);
                    *self.buckets.slot(target) = index;
                    index = next;
                }
            }
            reverse_chains(&self.buckets, &self.nodes);

            old.release_in(&self.alloc);
        }
    }

    /// Returns an iterator over all values in the table.
    ///
    /// Values come bucket by bucket, each chain from its head.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::Hash;
    /// # use core::hash::Hasher;
    /// #
    /// # use prime_chain::hash_table::HashTable;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # fn hash_str(s: &str) -> u64 {
    /// #     let mut hasher = SipHasher::new();
    /// #     s.hash(&mut hasher);
    /// #     hasher.finish()
    /// # }
    /// #
    /// let mut table = HashTable::new();
    /// table.insert(hash_str("key1"), "key1".to_string())?;
    /// table.insert(hash_str("key2"), "key2".to_string())?;
    ///
    /// let mut values: Vec<&String> = table.iter().collect();
    /// values.sort();
    /// assert_eq!(values, ["key1", "key2"]);
    /// # Ok::<(), prime_chain::Error>(())
    /// ```
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            heads: self.heads(),
            nodes: self.nodes.ptr,
            bucket: 0,
            index: NIL,
            remaining: self.populated,
            _phantom: PhantomData,
        }
    }

    /// Returns an iterator yielding mutable references to all values.
    pub fn iter_mut(&mut self) -> IterMut<'_, V> {
        IterMut {
            heads: self.heads(),
            nodes: self.nodes.ptr,
            bucket: 0,
            index: NIL,
            remaining: self.populated,
            _phantom: PhantomData,
        }
    }

    /// Returns an iterator that removes and yields all values from the table.
    ///
    /// After the iterator is dropped the table is empty; its bucket array and
    /// arena are kept.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use prime_chain::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::new();
    /// table.insert(7, "seven".to_string())?;
    ///
    /// let values: Vec<String> = table.drain().collect();
    /// assert!(table.is_empty());
    /// assert_eq!(values, ["seven"]);
    /// # Ok::<(), prime_chain::Error>(())
    /// ```
    pub fn drain(&mut self) -> Drain<'_, V, A> {
        Drain {
            table: self,
            bucket: 0,
        }
    }

    /// Returns `true` if the table contains no elements.
    pub fn is_empty(&self) -> bool {
        self.populated == 0
    }

    /// Returns the number of elements in the table.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use prime_chain::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::new();
    /// assert_eq!(table.len(), 0);
    ///
    /// table.insert(1, 1u64)?;
    /// table.insert(1, 1u64)?;
    /// assert_eq!(table.len(), 2);
    /// # Ok::<(), prime_chain::Error>(())
    /// ```
    pub fn len(&self) -> usize {
        self.populated
    }

    /// Number of values the table holds before it must allocate again.
    pub fn capacity(&self) -> usize {
        let by_load = (self.buckets.cap as f64 * self.max_load_factor as f64) as usize;
        by_load.min(self.nodes.cap)
    }

    /// Length of the bucket array. Always prime.
    pub fn bucket_count(&self) -> usize {
        self.buckets.cap
    }

    /// The bucket an entry with `hash` lives in.
    pub fn bucket(&self, hash: u64) -> usize {
        self.bucket_index(hash)
    }

    /// Number of entries chained in `bucket`.
    ///
    /// # Panics
    ///
    /// Panics if `bucket >= self.bucket_count()`.
    pub fn bucket_len(&self, bucket: usize) -> usize {
        assert!(bucket < self.buckets.cap, "bucket index out of range");
        let mut len = 0;
        // SAFETY: `bucket` is in bounds and chains only reach live nodes.
        unsafe {
            let mut index = self.head(bucket);
            while index != NIL {
                len += 1;
                index = self.node(index).next;
            }
        }
        len
    }

    /// Average number of entries per bucket.
    pub fn load_factor(&self) -> f32 {
        self.populated as f32 / self.buckets.cap as f32
    }

    /// The load factor an insertion may not exceed.
    pub fn max_load_factor(&self) -> f32 {
        self.max_load_factor
    }

    /// Sets the maximum load factor, growing the bucket array if the table is
    /// already above it.
    ///
    /// On failure the previous factor stays in effect.
    ///
    /// # Panics
    ///
    /// Panics unless `factor` is finite and positive.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use prime_chain::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::with_capacity(10);
    /// for i in 0..10u64 {
    ///     table.insert(i, i)?;
    /// }
    /// table.set_max_load_factor(0.25)?;
    /// assert!(table.load_factor() <= 0.25);
    /// assert_eq!(table.bucket_count(), 41);
    /// # Ok::<(), prime_chain::Error>(())
    /// ```
    pub fn set_max_load_factor(&mut self, factor: f32) -> Result<(), Error> {
        assert!(
            factor.is_finite() && factor > 0.0,
            "max load factor must be finite and positive"
        );
        let previous = core::mem::replace(&mut self.max_load_factor, factor);
        if exceeds_load(self.populated, self.buckets.cap, factor) {
            if let Err(err) = self.rehash(0) {
                self.max_load_factor = previous;
                return Err(err);
            }
        }
        Ok(())
    }

    /// Returns a reference to the table's allocator.
    pub fn allocator(&self) -> &A {
        &self.alloc
    }

    /// Removes all elements from the table.
    ///
    /// The bucket array and arena are kept.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use prime_chain::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::new();
    /// for i in 0..20u64 {
    ///     table.insert(i, i)?;
    /// }
    /// let buckets = table.bucket_count();
    ///
    /// table.clear();
    /// assert!(table.is_empty());
    /// assert_eq!(table.bucket_count(), buckets);
    /// # Ok::<(), prime_chain::Error>(())
    /// ```
    pub fn clear(&mut self) {
        // SAFETY: The chains are reset right after the values are dropped.
        unsafe {
            self.drop_values();
            clear_heads(&self.buckets);
        }
        self.populated = 0;
        self.touched = 0;
        self.free = NIL;
    }

    /// Rebuilds the bucket array with the smallest prime count that is at
    /// least `bucket_count` and keeps the load factor bound.
    ///
    /// Does nothing if that is the current count; otherwise the table may
    /// grow or shrink. Entries are relinked by their stored hash.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use prime_chain::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::new();
    /// for i in 0..5u64 {
    ///     table.insert(i, i)?;
    /// }
    /// table.rehash(100)?;
    /// assert_eq!(table.bucket_count(), 101);
    ///
    /// table.rehash(0)?;
    /// assert_eq!(table.bucket_count(), 5);
    /// assert_eq!(table.find(3, |&v| v == 3), Some(&3));
    /// # Ok::<(), prime_chain::Error>(())
    /// ```
    pub fn rehash(&mut self, bucket_count: usize) -> Result<(), Error> {
        let target =
            prime_bucket_count(bucket_count.max(buckets_for(self.populated, self.max_load_factor)))?;
        if target == self.buckets.cap {
            return Ok(());
        }

        let buckets = RawBuf::allocate_in(target, &self.alloc)?;
        // SAFETY: Fresh, non-empty allocation from `self.alloc`.
        unsafe { self.relink(buckets) };
        Ok(())
    }

    /// Reserves room for at least `additional` more elements.
    ///
    /// Grows the arena if it is short and, if the load factor requires it,
    /// grows the bucket array to at least `2 * bucket_count() + 1`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use prime_chain::hash_table::HashTable;
    /// #
    /// let mut table: HashTable<u64> = HashTable::new();
    /// table.reserve(50)?;
    /// assert!(table.capacity() >= 50);
    /// assert_eq!(table.bucket_count(), 53);
    /// # Ok::<(), prime_chain::Error>(())
    /// ```
    pub fn reserve(&mut self, additional: usize) -> Result<(), Error> {
        self.prepare(additional)
    }

    /// Shrinks the bucket array to the smallest prime that keeps the load
    /// factor bound, and the arena to exactly `len()` slots.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use prime_chain::hash_table::HashTable;
    /// #
    /// let mut table: HashTable<u64> = HashTable::with_capacity(1000);
    /// table.insert(42, 5)?;
    /// table.insert(123, 10)?;
    ///
    /// table.shrink_to_fit()?;
    /// assert_eq!(table.bucket_count(), 2);
    /// assert_eq!(table.capacity(), 2);
    /// # Ok::<(), prime_chain::Error>(())
    /// ```
    pub fn shrink_to_fit(&mut self) -> Result<(), Error> {
        let target = prime_bucket_count(buckets_for(self.populated, self.max_load_factor))?;
        if target == self.buckets.cap && self.nodes.cap == self.populated {
            return Ok(());
        }

        let buckets = Pending::new(RawBuf::allocate_in(target, &self.alloc)?, &self.alloc);
        let nodes = RawBuf::allocate_in(self.populated, &self.alloc)?;
        let buckets = buckets.commit();

        // SAFETY: Every live node is copied exactly once into the packed arena
        // and linked into the new bucket array; the old buffers are released
        // without dropping anything.
        unsafe {
            clear_heads(&buckets);
            let mut packed = 0;
            for bucket in 0..self.buckets.cap {
                let mut index = self.head(bucket);
                while index != NIL {
                    let node = self.nodes.slot(index);
                    let next = (*node).next;
                    let target = ((*node).hash % buckets.cap as u64) as usize;

                    core::ptr::copy_nonoverlapping(node, nodes.slot(packed), 1);
                    (*nodes.slot(packed)).next = *buckets.slot(target);
                    *buckets.slot(target) = packed;

                    packed += 1;
                    index = next;
                }
            }
            debug_assert!(packed == self.populated);
            reverse_chains(&buckets, &nodes);

            let mut old_buckets = core::mem::replace(&mut self.buckets, buckets);
            let mut old_nodes = core::mem::replace(&mut self.nodes, nodes);
            old_buckets.release_in(&self.alloc);
            old_nodes.release_in(&self.alloc);

            self.touched = packed;
            self.free = NIL;
        }
        Ok(())
    }

    /// Inserts `value` under `hash`, growing first if needed.
    ///
    /// Always inserts, even when an equal value is already present; use
    /// [`entry`](HashTable::entry) for insert-if-absent.
    ///
    /// # Errors
    ///
    /// If growing fails the table is unchanged and `value` is dropped.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use prime_chain::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::new();
    /// *table.insert(9, 1u32)? += 1;
    /// table.insert(9, 1u32)?;
    /// assert_eq!(table.count(9, |_| true), 2);
    /// # Ok::<(), prime_chain::Error>(())
    /// ```
    pub fn insert(&mut self, hash: u64, value: V) -> Result<&mut V, Error> {
        self.prepare(1)?;
        // SAFETY: `prepare` reserved a slot and sized the bucket array.
        Ok(unsafe { self.link(hash, value) })
    }

    /// Removes and returns the first value matching `hash` and `eq`.
    ///
    /// Returns `None`, leaving the table untouched, if there is none.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use prime_chain::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::new();
    /// table.insert(42, 42u64)?;
    ///
    /// assert_eq!(table.remove(42, |&n| n == 42), Some(42));
    /// assert!(table.is_empty());
    /// assert_eq!(table.remove(99, |&n| n == 99), None);
    /// # Ok::<(), prime_chain::Error>(())
    /// ```
    pub fn remove(&mut self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<V> {
        let (prev, index) = self.search(hash, eq)?;
        let bucket = self.bucket_index(hash);
        // SAFETY: `search` located the entry and its predecessor in `bucket`.
        Some(unsafe { self.unlink(bucket, prev, index) })
    }

    /// Removes every value matching `hash` and `eq`, returning how many were
    /// removed.
    pub fn remove_all(&mut self, hash: u64, eq: impl Fn(&V) -> bool) -> usize {
        let bucket = self.bucket_index(hash);
        let mut removed = 0;
        // SAFETY: `prev` always trails `index` within `bucket`'s chain.
        unsafe {
            let mut prev = NIL;
            let mut index = self.head(bucket);
            while index != NIL {
                let node = self.node(index);
                let next = node.next;
                if node.hash == hash && eq(node.value.assume_init_ref()) {
                    drop(self.unlink(bucket, prev, index));
                    removed += 1;
                } else {
                    prev = index;
                }
                index = next;
            }
        }
        removed
    }

    /// Keeps only the values for which `f` returns `true`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use prime_chain::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::new();
    /// for i in 0..10u64 {
    ///     table.insert(i, i)?;
    /// }
    /// table.retain(|v| *v % 2 == 0);
    /// assert_eq!(table.len(), 5);
    /// # Ok::<(), prime_chain::Error>(())
    /// ```
    pub fn retain(&mut self, mut f: impl FnMut(&mut V) -> bool) {
        // SAFETY: `prev` always trails `index` within `bucket`'s chain.
        unsafe {
            for bucket in 0..self.buckets.cap {
                let mut prev = NIL;
                let mut index = self.head(bucket);
                while index != NIL {
                    let node = self.node_mut(index);
                    let next = node.next;
                    if f(node.value.assume_init_mut()) {
                        prev = index;
                    } else {
                        drop(self.unlink(bucket, prev, index));
                    }
                    index = next;
                }
            }
        }
    }

    /// Gets the entry for the given hash and equality predicate.
    ///
    /// Finding an existing value never allocates. For a vacant entry the
    /// table first makes room for one more value, so inserting through the
    /// returned [`VacantEntry`] cannot fail.
    ///
    /// # Errors
    ///
    /// Fails, leaving the table unchanged, when the key is absent and growing
    /// fails.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::Hash;
    /// # use core::hash::Hasher;
    /// #
    /// # use prime_chain::hash_table::Entry;
    /// # use prime_chain::hash_table::HashTable;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # fn hash_str(s: &str) -> u64 {
    /// #     let mut hasher = SipHasher::new();
    /// #     s.hash(&mut hasher);
    /// #     hasher.finish()
    /// # }
    /// #
    /// let mut table = HashTable::new();
    /// let hash = hash_str("hello");
    ///
    /// match table.entry(hash, |s: &String| s == "hello")? {
    ///     Entry::Vacant(entry) => {
    ///         entry.insert("hello".to_string());
    ///     }
    ///     Entry::Occupied(mut entry) => {
    ///         *entry.get_mut() = "updated".to_string();
    ///     }
    /// }
    ///
    /// table
    ///     .entry(hash, |s: &String| s == "hello")?
    ///     .or_insert("hello".to_string());
    /// assert_eq!(table.len(), 1);
    /// # Ok::<(), prime_chain::Error>(())
    /// ```
    pub fn entry(&mut self, hash: u64, eq: impl Fn(&V) -> bool) -> Result<Entry<'_, V, A>, Error> {
        if let Some((prev, index)) = self.search(hash, eq) {
            let bucket = self.bucket_index(hash);
            return Ok(Entry::Occupied(OccupiedEntry {
                table: self,
                bucket,
                prev,
                index,
            }));
        }

        self.prepare(1)?;
        Ok(Entry::Vacant(VacantEntry { table: self, hash }))
    }

    /// Finds the first value matching `hash` and `eq`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use prime_chain::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::new();
    /// table.insert(5, (5u64, "five"))?;
    ///
    /// assert_eq!(table.find(5, |&(k, _)| k == 5), Some(&(5, "five")));
    /// assert_eq!(table.find(6, |&(k, _)| k == 6), None);
    /// # Ok::<(), prime_chain::Error>(())
    /// ```
    pub fn find(&self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<&V> {
        let (_, index) = self.search(hash, eq)?;
        // SAFETY: `search` only returns live entries.
        Some(unsafe { self.node(index).value.assume_init_ref() })
    }

    /// Finds the first value matching `hash` and `eq`, mutably.
    pub fn find_mut(&mut self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<&mut V> {
        let (_, index) = self.search(hash, eq)?;
        // SAFETY: `search` only returns live entries.
        Some(unsafe { self.node_mut(index).value.assume_init_mut() })
    }

    /// Returns `true` if a value matches `hash` and `eq`.
    pub fn contains(&self, hash: u64, eq: impl Fn(&V) -> bool) -> bool {
        self.search(hash, eq).is_some()
    }

    /// Counts the values matching `hash` and `eq`.
    pub fn count(&self, hash: u64, eq: impl Fn(&V) -> bool) -> usize {
        let mut count = 0;
        // SAFETY: The bucket is in bounds and chains only reach live nodes.
        unsafe {
            let mut index = self.head(self.bucket_index(hash));
            while index != NIL {
                let node = self.node(index);
                if node.hash == hash && eq(node.value.assume_init_ref()) {
                    count += 1;
                }
                index = node.next;
            }
        }
        count
    }

    /// Computes a histogram of chain lengths.
    ///
    /// Index `i` holds the number of buckets whose chain has exactly `i`
    /// entries; the vector ends at the longest chain.
    ///
    /// Available in tests and with the `stats` feature.
    #[cfg(any(test, feature = "stats"))]
    pub fn chain_histogram(&self) -> Vec<usize> {
        let mut hist = alloc::vec![0usize; 1];
        for bucket in 0..self.buckets.cap {
            let len = self.bucket_len(bucket);
            if len >= hist.len() {
                hist.resize(len + 1, 0);
            }
            hist[len] += 1;
        }
        hist
    }

    /// Returns detailed utilization statistics for debugging.
    ///
    /// Available in tests and with the `stats` feature.
    #[cfg(any(test, feature = "stats"))]
    pub fn debug_stats(&self) -> DebugStats {
        let hist = self.chain_histogram();
        let empty_buckets = hist[0];

        DebugStats {
            populated: self.populated,
            bucket_count: self.buckets.cap,
            bucket_count_is_prime: crate::prime::is_prime(self.buckets.cap),
            empty_buckets,
            longest_chain: hist.len() - 1,
            load_factor: self.populated as f64 / self.buckets.cap as f64,
            max_load_factor: self.max_load_factor as f64,
            arena_capacity: self.nodes.cap,
            total_bytes: self.buckets.bytes() + self.nodes.bytes(),
            wasted_bytes: empty_buckets * core::mem::size_of::<usize>()
                + (self.nodes.cap - self.populated) * core::mem::size_of::<Node<V>>(),
        }
    }

    /// Pretty-prints the chain-length histogram horizontally using stdout.
    ///
    /// Requires the `std` feature and either tests or the `stats` feature.
    #[cfg(all(any(test, feature = "stats"), feature = "std"))]
    pub fn print_chain_histogram(&self) {
        let hist = self.chain_histogram();
        let max = *hist.iter().max().unwrap_or(&0);
        if max == 0 {
            println!("chain histogram: empty");
            return;
        }

        let max_bar = 60usize;
        let total_units = max_bar * 8;
        println!(
            "chain histogram ({} entries, {} buckets):",
            self.populated, self.buckets.cap
        );

        let make_bar = |count: usize| -> alloc::string::String {
            if count == 0 {
                return alloc::string::String::new();
            }
            let units = ((count as u128 * total_units as u128).div_ceil(max as u128)) as usize;
            let full = units / 8;
            let rem = units % 8;
            let mut bar = "█".repeat(full);
            if rem > 0 {
                let ch = match rem {
                    1 => '▏',
                    2 => '▎',
                    3 => '▍',
                    4 => '▌',
                    5 => '▋',
                    6 => '▊',
                    7 => '▉',
                    _ => unreachable!(),
                };
                bar.push(ch);
            }
            bar
        };

        for (len, &count) in hist.iter().enumerate() {
            println!("{:>3} | {} ({})", len, make_bar(count), count);
        }
    }
}

/// A view into a single entry in the hash table, which may be vacant or
/// occupied.
///
/// This enum is constructed from the [`entry`] method on [`HashTable`].
///
/// [`entry`]: HashTable::entry
///
/// # Examples
///
/// ```rust
/// # use prime_chain::hash_table::Entry;
/// # use prime_chain::hash_table::HashTable;
/// #
/// let mut table = HashTable::new();
///
/// match table.entry(17, |s: &String| s == "key")? {
///     Entry::Vacant(entry) => {
///         entry.insert("key".to_string());
///     }
///     Entry::Occupied(entry) => {
///         println!("Key already exists with value: {}", entry.get());
///     }
/// }
/// # Ok::<(), prime_chain::Error>(())
/// ```
pub enum Entry<'a, V, A: Allocator = Global> {
    /// A vacant entry - the key is not present in the table
    Vacant(VacantEntry<'a, V, A>),
    /// An occupied entry - the key is present in the table
    Occupied(OccupiedEntry<'a, V, A>),
}

impl<'a, V, A: Allocator> Entry<'a, V, A> {
    /// Inserts `default` if the entry is vacant and returns a mutable
    /// reference to the value in the entry.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use prime_chain::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::new();
    ///
    /// let value = table.entry(3, |s: &String| s == "key")?.or_insert("key".to_string());
    /// assert_eq!(value, "key");
    ///
    /// let existing = table.entry(3, |s: &String| s == "key")?.or_insert("other".to_string());
    /// assert_eq!(existing, "key");
    /// # Ok::<(), prime_chain::Error>(())
    /// ```
    pub fn or_insert(self, default: V) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default),
        }
    }

    /// Inserts the result of `default` if the entry is vacant and returns a
    /// mutable reference to the value in the entry.
    ///
    /// `default` only runs for vacant entries.
    pub fn or_insert_with(self, default: impl FnOnce() -> V) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default()),
        }
    }

    /// Modifies an occupied entry in place and returns the value; returns
    /// `None` for a vacant entry.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use prime_chain::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::new();
    /// assert_eq!(table.entry(42, |&n: &u64| n == 42)?.and_modify(|v| *v += 1), None);
    ///
    /// table.insert(42, 42u64)?;
    /// let result = table.entry(42, |&n: &u64| n == 42)?.and_modify(|v| *v += 1);
    /// assert_eq!(result, Some(&mut 43));
    /// # Ok::<(), prime_chain::Error>(())
    /// ```
    pub fn and_modify(self, f: impl FnOnce(&mut V)) -> Option<&'a mut V> {
        match self {
            Entry::Occupied(entry) => {
                let value = entry.into_mut();
                f(value);
                Some(value)
            }
            Entry::Vacant(_) => None,
        }
    }

    /// Inserts `V::default()` if the entry is vacant and returns a mutable
    /// reference to the value in the entry.
    pub fn or_default(self) -> &'a mut V
    where
        V: Default,
    {
        self.or_insert_with(Default::default)
    }
}

/// A view into a vacant entry in the hash table.
///
/// The table already has room for the value, so [`insert`] cannot fail.
///
/// [`insert`]: VacantEntry::insert
pub struct VacantEntry<'a, V, A: Allocator = Global> {
    table: &'a mut HashTable<V, A>,
    hash: u64,
}

impl<'a, V, A: Allocator> VacantEntry<'a, V, A> {
    /// The hash this entry was looked up with.
    pub fn hash(&self) -> u64 {
        self.hash
    }

    /// Inserts a value into the vacant entry and returns a mutable reference to
    /// it.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use prime_chain::hash_table::Entry;
    /// # use prime_chain::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::new();
    ///
    /// match table.entry(8, |s: &String| s == "key")? {
    ///     Entry::Vacant(entry) => {
    ///         let value_ref = entry.insert("value".to_string());
    ///         assert_eq!(value_ref, "value");
    ///     }
    ///     Entry::Occupied(_) => unreachable!("Entry should be vacant"),
    /// }
    /// # Ok::<(), prime_chain::Error>(())
    /// ```
    pub fn insert(self, value: V) -> &'a mut V {
        let VacantEntry { table, hash } = self;
        // SAFETY: `HashTable::entry` reserved room before creating this entry,
        // and nothing else can touch the table while it is borrowed.
        unsafe { table.link(hash, value) }
    }
}

/// A view into an occupied entry in the hash table.
pub struct OccupiedEntry<'a, V, A: Allocator = Global> {
    table: &'a mut HashTable<V, A>,
    bucket: usize,
    prev: usize,
    index: usize,
}

impl<'a, V, A: Allocator> OccupiedEntry<'a, V, A> {
    /// Gets a reference to the value in the entry.
    pub fn get(&self) -> &V {
        // SAFETY: The entry was found live and the table is borrowed since.
        unsafe { self.table.node(self.index).value.assume_init_ref() }
    }

    /// Gets a mutable reference to the value in the entry.
    pub fn get_mut(&mut self) -> &mut V {
        // SAFETY: The entry was found live and the table is borrowed since.
        unsafe { self.table.node_mut(self.index).value.assume_init_mut() }
    }

    /// Converts the entry into a mutable reference bound to the table's
    /// borrow.
    pub fn into_mut(self) -> &'a mut V {
        let table = self.table;
        // SAFETY: The entry was found live and the table is borrowed since.
        unsafe { table.node_mut(self.index).value.assume_init_mut() }
    }

    /// Removes the value from the table and returns it.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use prime_chain::hash_table::Entry;
    /// # use prime_chain::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::new();
    /// table.insert(4, "key".to_string())?;
    ///
    /// let removed_value = match table.entry(4, |s: &String| s == "key")? {
    ///     Entry::Occupied(entry) => entry.remove(),
    ///     Entry::Vacant(_) => unreachable!(),
    /// };
    /// assert_eq!(removed_value, "key");
    /// assert!(table.is_empty());
    /// # Ok::<(), prime_chain::Error>(())
    /// ```
    pub fn remove(self) -> V {
        // SAFETY: `bucket`, `prev` and `index` came from `search`, and the
        // table has been exclusively borrowed since.
        unsafe { self.table.unlink(self.bucket, self.prev, self.index) }
    }
}

/// An iterator over the values in a [`HashTable`].
///
/// This struct is created by the [`iter`] method on [`HashTable`].
///
/// [`iter`]: HashTable::iter
pub struct Iter<'a, V> {
    heads: &'a [usize],
    nodes: NonNull<Node<V>>,
    bucket: usize,
    index: usize,
    remaining: usize,
    _phantom: PhantomData<&'a V>,
}

// SAFETY: Behaves like `&'a V`.
unsafe impl<V: Sync> Send for Iter<'_, V> {}
// SAFETY: Behaves like `&'a V`.
unsafe impl<V: Sync> Sync for Iter<'_, V> {}

impl<V> Clone for Iter<'_, V> {
    fn clone(&self) -> Self {
        Self {
            heads: self.heads,
            nodes: self.nodes,
            bucket: self.bucket,
            index: self.index,
            remaining: self.remaining,
            _phantom: PhantomData,
        }
    }
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        while self.index == NIL {
            self.index = self.heads[self.bucket];
            self.bucket += 1;
        }

        // SAFETY: `index` came from a chain of the borrowed table, and
        // `remaining` guarantees another live entry exists.
        unsafe {
            let node = &*self.nodes.as_ptr().add(self.index);
            self.index = node.next;
            self.remaining -= 1;
            Some(node.value.assume_init_ref())
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<V> ExactSizeIterator for Iter<'_, V> {}

impl<V> FusedIterator for Iter<'_, V> {}

/// A mutable iterator over the values in a [`HashTable`].
///
/// This struct is created by the [`iter_mut`] method on [`HashTable`].
///
/// [`iter_mut`]: HashTable::iter_mut
pub struct IterMut<'a, V> {
    heads: &'a [usize],
    nodes: NonNull<Node<V>>,
    bucket: usize,
    index: usize,
    remaining: usize,
    _phantom: PhantomData<&'a mut V>,
}

// SAFETY: Behaves like `&'a mut V`.
unsafe impl<V: Send> Send for IterMut<'_, V> {}
// SAFETY: Behaves like `&'a mut V`.
unsafe impl<V: Sync> Sync for IterMut<'_, V> {}

impl<'a, V> Iterator for IterMut<'a, V> {
    type Item = &'a mut V;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        while self.index == NIL {
            self.index = self.heads[self.bucket];
            self.bucket += 1;
        }

        // SAFETY: Each live entry is yielded once, and the table stays
        // exclusively borrowed for `'a`.
        unsafe {
            let node = &mut *self.nodes.as_ptr().add(self.index);
            self.index = node.next;
            self.remaining -= 1;
            Some(node.value.assume_init_mut())
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<V> ExactSizeIterator for IterMut<'_, V> {}

impl<V> FusedIterator for IterMut<'_, V> {}

/// A draining iterator over the values in a [`HashTable`].
///
/// This struct is created by the [`drain`] method on [`HashTable`]. Each
/// yielded value is unlinked first, so the table stays consistent even if the
/// iterator is leaked.
///
/// [`drain`]: HashTable::drain
pub struct Drain<'a, V, A: Allocator = Global> {
    table: &'a mut HashTable<V, A>,
    bucket: usize,
}

impl<V, A: Allocator> Drop for Drain<'_, V, A> {
    fn drop(&mut self) {
        for _ in &mut *self {}

        if self.table.populated == 0 {
            self.table.touched = 0;
            self.table.free = NIL;
        }
    }
}

impl<V, A: Allocator> Iterator for Drain<'_, V, A> {
    type Item = V;

    fn next(&mut self) -> Option<Self::Item> {
        self.table.pop_from(&mut self.bucket)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.table.populated, Some(self.table.populated))
    }
}

impl<V, A: Allocator> ExactSizeIterator for Drain<'_, V, A> {}

impl<V, A: Allocator> FusedIterator for Drain<'_, V, A> {}

/// An owning iterator over the values of a [`HashTable`].
///
/// Values it does not yield are dropped with it.
pub struct IntoIter<V, A: Allocator = Global> {
    table: HashTable<V, A>,
    bucket: usize,
}

impl<V, A: Allocator> Iterator for IntoIter<V, A> {
    type Item = V;

    fn next(&mut self) -> Option<Self::Item> {
        self.table.pop_from(&mut self.bucket)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.table.populated, Some(self.table.populated))
    }
}

impl<V, A: Allocator> ExactSizeIterator for IntoIter<V, A> {}

impl<V, A: Allocator> FusedIterator for IntoIter<V, A> {}

impl<V, A: Allocator> IntoIterator for HashTable<V, A> {
    type Item = V;
    type IntoIter = IntoIter<V, A>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            table: self,
            bucket: 0,
        }
    }
}

impl<'a, V, A: Allocator> IntoIterator for &'a HashTable<V, A> {
    type Item = &'a V;
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, V, A: Allocator> IntoIterator for &'a mut HashTable<V, A> {
    type Item = &'a mut V;
    type IntoIter = IterMut<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

#[cfg(test)]
mod tests {
    use alloc::rc::Rc;
    use alloc::string::String;
    use alloc::string::ToString;
    use alloc::vec;
    use core::cell::Cell;
    use core::hash::Hasher;

    use rand::Rng;
    use rand::SeedableRng;
    use rand::TryRngCore;
    use rand::rngs::OsRng;
    use rand::rngs::SmallRng;
    use siphasher::sip::SipHasher;

    use super::*;
    use crate::allocator::AllocError;
    use crate::prime::is_prime;

    struct HashState {
        k0: u64,
        k1: u64,
    }

    impl HashState {
        fn default() -> Self {
            let mut rng = OsRng;
            Self {
                k0: rng.try_next_u64().unwrap(),
                k1: rng.try_next_u64().unwrap(),
            }
        }

        fn build_hasher(&self) -> SipHasher {
            SipHasher::new_with_keys(self.k0, self.k1)
        }
    }

    #[derive(Debug, PartialEq, Eq, Clone)]
    struct Item {
        key: u64,
        value: i32,
    }

    #[derive(Debug, PartialEq, Eq, Clone)]
    struct StringItem {
        key: String,
        value: i32,
    }

    fn hash_key(state: &HashState, key: u64) -> u64 {
        let mut h = state.build_hasher();
        h.write_u64(key);
        h.finish()
    }

    fn hash_string_key(state: &HashState, key: &str) -> u64 {
        let mut h = state.build_hasher();
        h.write(key.as_bytes());
        h.finish()
    }

    /// Allocator with a budget of successful allocations and a count of live
    /// blocks.
    #[derive(Clone, Default)]
    struct Budget {
        remaining: Rc<Cell<usize>>,
        live: Rc<Cell<usize>>,
    }

    impl Budget {
        fn with(remaining: usize) -> Self {
            let budget = Self::default();
            budget.remaining.set(remaining);
            budget
        }
    }

    // SAFETY: Forwards successful requests to `Global`.
    unsafe impl Allocator for Budget {
        fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
            if self.remaining.get() == 0 {
                return Err(AllocError);
            }
            self.remaining.set(self.remaining.get() - 1);
            self.live.set(self.live.get() + 1);
            Global.allocate(layout)
        }

        unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
            self.live.set(self.live.get() - 1);
            // SAFETY: Forwarded contract.
            unsafe { Global.deallocate(ptr, layout) }
        }
    }

    /// Counts drops through a shared counter.
    #[derive(Debug)]
    struct Tracked {
        key: u64,
        drops: Rc<Cell<usize>>,
    }

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.drops.set(self.drops.get() + 1);
        }
    }

    fn assert_consistent<V, A: Allocator>(table: &HashTable<V, A>) {
        assert!(is_prime(table.bucket_count()), "{:?}", table);
        let mut walked = 0;
        for bucket in 0..table.bucket_count() {
            walked += table.bucket_len(bucket);
        }
        assert_eq!(walked, table.len());
        assert_eq!(table.iter().count(), table.len());
    }

    #[test]
    fn insert_and_find() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::with_capacity(0);
        for k in 0..32u64 {
            let hash = hash_key(&state, k);
            match table.entry(hash, |v: &Item| v.key == k).unwrap() {
                Entry::Vacant(v) => {
                    v.insert(Item {
                        key: k,
                        value: (k as i32) * 2,
                    });
                    assert_eq!(
                        table.find(hash, |v| v.key == k),
                        Some(&Item {
                            key: k,
                            value: (k as i32) * 2
                        }),
                        "{:#?}",
                        table
                    );
                }
                Entry::Occupied(_) => panic!("unexpected occupied on first insert: {:#?}", table),
            }
        }
        assert_eq!(table.len(), 32);
        for k in 0..32u64 {
            let hash = hash_key(&state, k);
            assert_eq!(
                table.find(hash, |v| v.key == k),
                Some(&Item {
                    key: k,
                    value: (k as i32) * 2
                }),
                "{:#?}",
                table
            );
        }

        let miss_hash = hash_key(&state, 999);
        assert!(table.find(miss_hash, |v| v.key == 999).is_none());
        assert_consistent(&table);
    }

    #[test]
    fn duplicate_entry_is_occupied() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::new();
        let k = 42u64;
        let hash = hash_key(&state, k);

        match table.entry(hash, |v| v.key == k).unwrap() {
            Entry::Vacant(v) => {
                v.insert(Item { key: k, value: 7 });
            }
            Entry::Occupied(_) => panic!("should be vacant first time"),
        }

        match table.entry(hash, |v| v.key == k).unwrap() {
            Entry::Occupied(mut occ) => {
                assert_eq!(occ.get().value, 7);
                occ.get_mut().value = 11;
            }
            Entry::Vacant(_) => panic!("should be occupied second time"),
        }

        assert_eq!(table.len(), 1);
        assert_eq!(table.find(hash, |v| v.key == k).unwrap().value, 11);
    }

    #[test]
    fn insert_keeps_duplicates() {
        let mut table: HashTable<Item> = HashTable::new();
        for value in 0..5 {
            table.insert(9, Item { key: 9, value }).unwrap();
        }
        table.insert(10, Item { key: 10, value: 0 }).unwrap();

        assert_eq!(table.len(), 6);
        assert_eq!(table.count(9, |v| v.key == 9), 5);
        assert!(table.remove(9, |v| v.key == 9).is_some());
        assert_eq!(table.count(9, |v| v.key == 9), 4);
        assert_eq!(table.remove_all(9, |v| v.key == 9), 4);
        assert_eq!(table.count(9, |v| v.key == 9), 0);
        assert_eq!(table.len(), 1);
        assert_consistent(&table);
    }

    #[test]
    fn rebuilds_keep_the_newest_duplicate_first() {
        let mut table: HashTable<Item> = HashTable::new();
        for value in 0..3 {
            table.insert(7, Item { key: 7, value }).unwrap();
        }
        let order = |table: &HashTable<Item>| -> Vec<i32> {
            table.iter().map(|item| item.value).collect()
        };
        assert_eq!(order(&table), [2, 1, 0]);

        table.rehash(53).unwrap();
        assert_eq!(table.bucket_count(), 53);
        assert_eq!(table.find(7, |v| v.key == 7).unwrap().value, 2);
        assert_eq!(order(&table), [2, 1, 0]);

        table.rehash(0).unwrap();
        assert_eq!(table.find(7, |v| v.key == 7).unwrap().value, 2);

        table.shrink_to_fit().unwrap();
        assert_eq!(table.find(7, |v| v.key == 7).unwrap().value, 2);
        assert_eq!(order(&table), [2, 1, 0]);

        // Growth driven by insertion relinks the same way.
        for key in 100..200u64 {
            table.insert(key, Item { key, value: -1 }).unwrap();
        }
        assert_eq!(table.find(7, |v| v.key == 7).unwrap().value, 2);
        assert_eq!(table.remove(7, |v| v.key == 7).unwrap().value, 2);
        assert_eq!(table.find(7, |v| v.key == 7).unwrap().value, 1);
        assert_consistent(&table);
    }

    #[test]
    fn equal_hashes_with_distinct_values_share_a_chain() {
        let mut table: HashTable<Item> = HashTable::with_capacity(16);
        for key in 0..8u64 {
            table.insert(0, Item { key, value: key as i32 }).unwrap();
        }
        assert_eq!(table.bucket_len(0), 8);
        for key in 0..8u64 {
            assert_eq!(table.find(0, |v| v.key == key).unwrap().value, key as i32);
        }
        assert_eq!(table.remove(0, |v| v.key == 3).unwrap().value, 3);
        assert!(!table.contains(0, |v| v.key == 3));
        assert_eq!(table.bucket_len(0), 7);
    }

    #[test]
    fn find_mut_and_modify() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::new();
        for k in 0..10u64 {
            table
                .insert(hash_key(&state, k), Item { key: k, value: 0 })
                .unwrap();
        }
        for k in 0..10u64 {
            table
                .find_mut(hash_key(&state, k), |v| v.key == k)
                .unwrap()
                .value = k as i32 + 100;
        }
        for k in 0..10u64 {
            assert_eq!(
                table.find(hash_key(&state, k), |v| v.key == k).unwrap().value,
                k as i32 + 100
            );
        }
        assert!(table.find_mut(hash_key(&state, 77), |v| v.key == 77).is_none());
    }

    #[test]
    fn remove_missing_key_is_a_no_op() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::new();
        for k in 0..20u64 {
            table
                .insert(hash_key(&state, k), Item { key: k, value: 1 })
                .unwrap();
        }
        let buckets = table.bucket_count();

        assert_eq!(table.remove(hash_key(&state, 500), |v| v.key == 500), None);
        assert_eq!(table.remove_all(hash_key(&state, 500), |v| v.key == 500), 0);
        assert_eq!(table.len(), 20);
        assert_eq!(table.bucket_count(), buckets);
    }

    #[test]
    fn grows_to_a_prime_bucket_count() {
        let mut table: HashTable<u64> = HashTable::new();
        assert_eq!(table.bucket_count(), 2);

        let mut seen = vec![table.bucket_count()];
        for key in 1..=1000u64 {
            table.insert(key, key).unwrap();
            assert!(table.load_factor() <= table.max_load_factor());
            if *seen.last().unwrap() != table.bucket_count() {
                seen.push(table.bucket_count());
            }
        }

        assert!(is_prime(table.bucket_count()));
        assert!(table.bucket_count() >= 1000);
        assert_eq!(seen, [2, 5, 11, 23, 47, 97, 197, 397, 797, 1597]);
        for key in 1..=1000u64 {
            assert_eq!(table.find(key, |&v| v == key), Some(&key));
        }
        assert_consistent(&table);
    }

    #[test]
    fn load_factor_bound_holds_for_custom_factors() {
        let state = HashState::default();
        for factor in [0.5f32, 0.75, 2.0, 3.5] {
            let mut table: HashTable<u64> = HashTable::new();
            table.set_max_load_factor(factor).unwrap();
            for key in 0..500u64 {
                table.insert(hash_key(&state, key), key).unwrap();
                assert!(
                    table.len() as f64 <= table.bucket_count() as f64 * factor as f64,
                    "{factor}: {:?}",
                    table
                );
            }
            assert_consistent(&table);
        }
    }

    #[test]
    #[should_panic(expected = "max load factor must be finite and positive")]
    fn zero_load_factor_panics() {
        let mut table: HashTable<u64> = HashTable::new();
        let _ = table.set_max_load_factor(0.0);
    }

    #[test]
    fn rehash_preserves_contents_and_may_shrink() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::new();
        for k in 0..100u64 {
            table
                .insert(hash_key(&state, k), Item { key: k, value: k as i32 })
                .unwrap();
        }

        table.rehash(1000).unwrap();
        assert_eq!(table.bucket_count(), 1009);
        assert_consistent(&table);

        // Below the load bound the request is raised to it.
        table.rehash(10).unwrap();
        assert_eq!(table.bucket_count(), 101);
        assert_consistent(&table);

        let before = table.bucket_count();
        table.rehash(before).unwrap();
        assert_eq!(table.bucket_count(), before);

        for k in 0..100u64 {
            let hash = hash_key(&state, k);
            assert_eq!(table.find(hash, |v| v.key == k).unwrap().value, k as i32);
            assert_eq!(table.bucket(hash), (hash % table.bucket_count() as u64) as usize);
        }
    }

    #[test]
    fn reserve_at_least_doubles() {
        let mut table: HashTable<u64> = HashTable::with_capacity(10);
        assert_eq!(table.bucket_count(), 11);
        for i in 0..10u64 {
            table.insert(i, i).unwrap();
        }

        table.reserve(0).unwrap();
        assert_eq!(table.bucket_count(), 11);

        table.reserve(2).unwrap();
        assert_eq!(table.bucket_count(), 23);
        assert!(table.capacity() >= 12);

        let buckets = table.bucket_count();
        let arena = table.nodes.cap;
        table.insert(10, 10).unwrap();
        table.insert(11, 11).unwrap();
        assert_eq!(table.bucket_count(), buckets);
        assert_eq!(table.nodes.cap, arena);

        assert_eq!(table.reserve(usize::MAX), Err(Error::CapacityOverflow));
        assert_eq!(table.len(), 12);
    }

    #[test]
    fn failed_growth_leaves_the_table_unchanged() {
        let budget = Budget::with(2);
        let mut table = HashTable::new_in(budget.clone());
        table.insert(1, 1u64).unwrap();
        table.insert(2, 2u64).unwrap();
        assert_eq!(budget.remaining.get(), 0);
        assert_eq!(table.bucket_count(), 2);

        let err = table.insert(3, 3).unwrap_err();
        assert_eq!(
            err,
            Error::AllocationFailure {
                layout: Layout::array::<usize>(5).unwrap()
            }
        );
        assert_eq!(table.len(), 2);
        assert_eq!(table.bucket_count(), 2);
        assert_eq!(table.find(1, |&v| v == 1), Some(&1));
        assert_eq!(table.find(2, |&v| v == 2), Some(&2));
        assert!(!table.contains(3, |&v| v == 3));

        assert!(table.rehash(50).is_err());
        assert_eq!(table.bucket_count(), 2);
        assert!(table.entry(3, |&v| v == 3).is_err());
        assert_eq!(table.len(), 2);
        assert!(matches!(table.entry(2, |&v| v == 2), Ok(Entry::Occupied(_))));

        budget.remaining.set(1);
        table.insert(3, 3).unwrap();
        assert_eq!(table.bucket_count(), 5);
        assert_consistent(&table);
    }

    #[test]
    fn failed_arena_growth_releases_the_new_bucket_array() {
        let budget = Budget::with(16);
        let mut table = HashTable::new_in(budget.clone());
        for i in 0..4u64 {
            table.insert(i, i).unwrap();
        }
        let live = budget.live.get();
        let buckets = table.bucket_count();

        // The bucket array fits in the budget, the arena does not.
        budget.remaining.set(1);
        assert!(matches!(
            table.reserve(100),
            Err(Error::AllocationFailure { .. })
        ));
        assert_eq!(budget.live.get(), live);
        assert_eq!(table.bucket_count(), buckets);
        assert_eq!(table.len(), 4);
        for i in 0..4u64 {
            assert!(table.contains(i, |&v| v == i));
        }

        budget.remaining.set(2);
        table.reserve(100).unwrap();
        assert!(table.capacity() >= 104);
        assert_consistent(&table);

        drop(table);
        assert_eq!(budget.live.get(), 0);
    }

    #[test]
    fn try_with_capacity_reports_failure() {
        let budget = Budget::with(0);
        let err = HashTable::<u64, _>::try_with_capacity_in(10, budget.clone()).unwrap_err();
        assert_eq!(err.layout(), Some(Layout::array::<usize>(11).unwrap()));

        // Bucket array succeeds, arena fails: nothing stays allocated.
        budget.remaining.set(1);
        assert!(HashTable::<u64, _>::try_with_capacity_in(10, budget.clone()).is_err());
        assert_eq!(budget.live.get(), 0);
    }

    #[test]
    fn iter_and_drain() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::with_capacity(0);
        for k in 0..50u64 {
            let hash = hash_key(&state, k);
            table
                .entry(hash, |v| v.key == k)
                .unwrap()
                .or_insert(Item {
                    key: k,
                    value: k as i32,
                });
        }

        let mut seen = vec![false; 50];
        let iter = table.iter();
        assert_eq!(iter.len(), 50);
        for item in iter {
            seen[item.key as usize] = true;
        }
        assert!(seen.iter().all(|&b| b));

        for item in table.iter_mut() {
            item.value += 1;
        }

        let mut drained: Vec<Item> = table.drain().collect();
        drained.sort_by_key(|item| item.key);
        assert_eq!(drained.len(), 50);
        assert!(drained.iter().all(|item| item.value == item.key as i32 + 1));
        assert!(table.is_empty());
        assert!(table.iter().next().is_none());
        assert_consistent(&table);
    }

    #[test]
    fn partial_drain_empties_the_table() {
        let drops = Rc::new(Cell::new(0));
        let mut table = HashTable::new();
        for key in 0..10u64 {
            table
                .insert(
                    key,
                    Tracked {
                        key,
                        drops: drops.clone(),
                    },
                )
                .unwrap();
        }

        let mut drain = table.drain();
        assert_eq!(drain.len(), 10);
        drop(drain.next());
        drop(drain);

        assert_eq!(drops.get(), 10);
        assert!(table.is_empty());
        table.insert(3, Tracked { key: 3, drops: drops.clone() }).unwrap();
        assert_eq!(table.find(3, |t| t.key == 3).unwrap().key, 3);
    }

    #[test]
    fn owned_iteration_drops_the_rest() {
        let drops = Rc::new(Cell::new(0));
        let mut table = HashTable::new();
        for key in 0..6u64 {
            table
                .insert(
                    key,
                    Tracked {
                        key,
                        drops: drops.clone(),
                    },
                )
                .unwrap();
        }

        let mut iter = table.into_iter();
        assert_eq!(iter.len(), 6);
        let first = iter.next().unwrap();
        assert_eq!(iter.len(), 5);
        drop(iter);
        assert_eq!(drops.get(), 5);
        drop(first);
        assert_eq!(drops.get(), 6);

        let mut table: HashTable<u64> = HashTable::new();
        for key in 0..30u64 {
            table.insert(key, key).unwrap();
        }
        for value in &mut table {
            *value *= 2;
        }
        assert_eq!((&table).into_iter().sum::<u64>(), 870);
        let mut values: Vec<u64> = table.into_iter().collect();
        values.sort();
        assert_eq!(values, (0..30u64).map(|v| v * 2).collect::<Vec<_>>());
    }

    #[test]
    fn every_value_is_dropped_once() {
        let drops = Rc::new(Cell::new(0));
        let mut table = HashTable::new();
        for key in 0..100u64 {
            table
                .insert(
                    key,
                    Tracked {
                        key,
                        drops: drops.clone(),
                    },
                )
                .unwrap();
        }

        drop(table.remove(5, |t| t.key == 5));
        assert_eq!(drops.get(), 1);
        table.retain(|t| t.key % 2 == 0);
        assert_eq!(drops.get(), 50);
        table.shrink_to_fit().unwrap();
        assert_eq!(drops.get(), 50);
        table.clear();
        assert_eq!(drops.get(), 100);

        for key in 0..10u64 {
            table
                .insert(
                    key,
                    Tracked {
                        key,
                        drops: drops.clone(),
                    },
                )
                .unwrap();
        }
        drop(table);
        assert_eq!(drops.get(), 110);
    }

    #[test]
    fn freed_slots_are_reused() {
        let mut table: HashTable<u64> = HashTable::with_capacity(8);
        for i in 0..8u64 {
            table.insert(i, i).unwrap();
        }
        let arena = table.nodes.cap;
        for round in 0..100u64 {
            let key = round % 8;
            assert_eq!(table.remove(key, |&v| v == key), Some(key));
            table.insert(key, key).unwrap();
        }
        assert_eq!(table.nodes.cap, arena);
        assert_eq!(table.touched, 8);
        assert_consistent(&table);
    }

    #[test]
    fn insert_and_find_string_keys() {
        let state = HashState::default();
        let mut table: HashTable<StringItem> = HashTable::new();
        let keys = ["alpha", "beta", "gamma", "delta", "epsilon"];

        for (i, key) in keys.iter().enumerate() {
            let hash = hash_string_key(&state, key);
            table
                .entry(hash, |v| v.key == *key)
                .unwrap()
                .or_insert(StringItem {
                    key: key.to_string(),
                    value: i as i32,
                });
        }

        for (i, key) in keys.iter().enumerate() {
            let hash = hash_string_key(&state, key);
            assert_eq!(table.find(hash, |v| v.key == *key).unwrap().value, i as i32);
        }

        let hash = hash_string_key(&state, "gamma");
        assert_eq!(table.remove(hash, |v| v.key == "gamma").unwrap().value, 2);
        assert!(table.find(hash, |v| v.key == "gamma").is_none());
        assert_eq!(table.len(), 4);
    }

    #[test]
    fn entry_or_insert_with() {
        let mut table: HashTable<Item> = HashTable::new();
        let mut calls = 0;
        for _ in 0..3 {
            table.entry(1, |v| v.key == 1).unwrap().or_insert_with(|| {
                calls += 1;
                Item { key: 1, value: 5 }
            });
        }
        assert_eq!(calls, 1);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn entry_into_mut() {
        let mut table: HashTable<Item> = HashTable::new();
        table.insert(1, Item { key: 1, value: 10 }).unwrap();
        match table.entry(1, |v| v.key == 1).unwrap() {
            Entry::Occupied(occ) => occ.into_mut().value = 20,
            Entry::Vacant(_) => panic!("expected occupied"),
        }
        assert_eq!(table.find(1, |v| v.key == 1).unwrap().value, 20);
        assert_eq!(*table.entry(2, |v| v.key == 2).unwrap().or_default(), Item { key: 0, value: 0 });
    }

    impl Default for Item {
        fn default() -> Self {
            Item { key: 0, value: 0 }
        }
    }

    #[test]
    fn occupied_entry_removes_chain_interior() {
        let mut table: HashTable<Item> = HashTable::with_capacity(4);
        for key in 0..4u64 {
            table.insert(7, Item { key, value: 0 }).unwrap();
        }
        for key in [2u64, 0, 3, 1] {
            match table.entry(7, |v| v.key == key).unwrap() {
                Entry::Occupied(occ) => assert_eq!(occ.remove().key, key),
                Entry::Vacant(_) => panic!("expected occupied"),
            }
            assert_consistent(&table);
        }
        assert!(table.is_empty());
    }

    #[test]
    fn zero_sized_values() {
        let mut table: HashTable<()> = HashTable::new();
        for hash in 0..10u64 {
            table.insert(hash % 3, ()).unwrap();
        }
        assert_eq!(table.len(), 10);
        assert_eq!(table.count(0, |_| true), 4);
        assert_eq!(table.remove_all(1, |_| true), 3);
        assert_eq!(table.len(), 7);
    }

    #[test]
    fn randomized_against_a_model() {
        let mut rng = SmallRng::seed_from_u64(0x5eed);
        let mut table: HashTable<(u64, u64)> = HashTable::new();
        let mut model = alloc::collections::BTreeMap::new();

        for _ in 0..20_000 {
            let key = rng.random_range(0..512u64);
            let hash = key.wrapping_mul(0x9e37_79b9_7f4a_7c15);
            match rng.random_range(0..4) {
                0 | 1 => {
                    let value = rng.random::<u64>();
                    match table.entry(hash, |&(k, _)| k == key).unwrap() {
                        Entry::Occupied(mut occ) => occ.get_mut().1 = value,
                        Entry::Vacant(vac) => {
                            vac.insert((key, value));
                        }
                    }
                    model.insert(key, value);
                }
                2 => {
                    assert_eq!(
                        table.remove(hash, |&(k, _)| k == key).map(|(_, v)| v),
                        model.remove(&key)
                    );
                }
                _ => {
                    assert_eq!(
                        table.find(hash, |&(k, _)| k == key).map(|&(_, v)| v),
                        model.get(&key).copied()
                    );
                }
            }
            assert_eq!(table.len(), model.len());
        }

        assert_consistent(&table);
        let mut contents: Vec<(u64, u64)> = table.iter().copied().collect();
        contents.sort();
        assert_eq!(contents, model.into_iter().collect::<Vec<_>>());
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    #[cfg(feature = "std")]
    fn histogram_output() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::with_capacity(10000);
        for k in 0..table.capacity() as u64 {
            table
                .insert(hash_key(&state, k), Item { key: k, value: 0 })
                .unwrap();
        }

        table.print_chain_histogram();
        table.debug_stats().print();
    }

    #[test]
    fn stats_describe_the_chains() {
        let mut table: HashTable<u64> = HashTable::with_capacity(10);
        for i in 0..3u64 {
            table.insert(0, i).unwrap();
        }
        table.insert(1, 9).unwrap();

        let hist = table.chain_histogram();
        assert_eq!(hist, [9, 1, 0, 1]);
        assert_eq!(hist.iter().sum::<usize>(), table.bucket_count());

        let stats = table.debug_stats();
        assert_eq!(stats.populated, 4);
        assert_eq!(stats.bucket_count, 11);
        assert!(stats.bucket_count_is_prime);
        assert_eq!(stats.empty_buckets, 9);
        assert_eq!(stats.longest_chain, 3);
        assert_eq!(stats.arena_capacity, 10);
        assert!(stats.wasted_bytes < stats.total_bytes);
    }

    #[test]
    fn test_clone() {
        let state = HashState::default();
        let mut original: HashTable<StringItem> = HashTable::with_capacity(10);

        let test_data = [
            ("hello", 1),
            ("world", 2),
            ("rust", 3),
            ("clone", 4),
            ("test", 5),
        ];

        for (key, value) in test_data.iter() {
            let hash = hash_string_key(&state, key);
            original
                .entry(hash, |v| v.key == *key)
                .unwrap()
                .or_insert(StringItem {
                    key: key.to_string(),
                    value: *value,
                });
        }

        let cloned = original.clone();

        assert_eq!(original.len(), cloned.len());
        assert_eq!(original.bucket_count(), cloned.bucket_count());
        for bucket in 0..original.bucket_count() {
            assert_eq!(original.bucket_len(bucket), cloned.bucket_len(bucket));
        }
        assert!(original.iter().eq(cloned.iter()));

        let hash = hash_string_key(&state, "hello");
        if let Some(item) = original.find_mut(hash, |v| v.key == "hello") {
            item.value = 999;
        }

        assert_eq!(original.find(hash, |v| v.key == "hello").unwrap().value, 999);
        assert_eq!(cloned.find(hash, |v| v.key == "hello").unwrap().value, 1);
    }

    #[test]
    fn test_clone_empty_table() {
        let original: HashTable<Item> = HashTable::with_capacity(10);
        let cloned = original.clone();

        assert!(original.is_empty());
        assert!(cloned.is_empty());
        assert_eq!(cloned.bucket_count(), 11);
    }

    #[test]
    fn test_shrink_to_fit_after_removals() {
        let mut table: HashTable<u64> = HashTable::new();
        for i in 0..1000u64 {
            table.insert(i, i).unwrap();
        }
        table.retain(|&mut v| v < 10);
        assert!(table.bucket_count() >= 1000);

        table.shrink_to_fit().unwrap();
        assert_eq!(table.bucket_count(), 11);
        assert_eq!(table.nodes.cap, 10);
        assert_eq!(table.touched, 10);
        assert_consistent(&table);
        for i in 0..10u64 {
            assert_eq!(table.find(i, |&v| v == i), Some(&i));
        }

        table.insert(10, 10).unwrap();
        assert_consistent(&table);
    }

    #[test]
    fn test_shrink_to_fit_empty_table() {
        let mut table: HashTable<u64> = HashTable::with_capacity(100);
        table.shrink_to_fit().unwrap();
        assert_eq!(table.bucket_count(), 2);
        assert_eq!(table.capacity(), 0);

        table.insert(1, 1).unwrap();
        assert_eq!(table.find(1, |&v| v == 1), Some(&1));
    }

    #[test]
    fn debug_lists_chain_lengths() {
        let mut table: HashTable<u64> = HashTable::new();
        table.insert(0, 0).unwrap();
        let rendered = alloc::format!("{:?}", table);
        assert!(rendered.starts_with("HashTable"));
        assert!(rendered.contains("chains: [1, 0]"));
    }

    #[test]
    fn send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<HashTable<String>>();
        assert_send_sync::<Iter<'_, String>>();
        assert_send_sync::<IterMut<'_, String>>();
        assert_send_sync::<Drain<'_, String>>();
        assert_send_sync::<IntoIter<String>>();
    }
}
