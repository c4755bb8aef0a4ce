//! Extendible hash table.
//!
//! Maps keys to values through a directory of `2^G` slots (`G` = global
//! depth), each referencing a bucket of bounded capacity. A bucket at
//! local depth `d <= G` is shared by exactly `2^(G-d)` directory slots -
//! the slots whose low `d` hash bits agree. A full bucket splits on its
//! next discriminating bit; the directory doubles only when the splitting
//! bucket already has `d == G`.
//!
//! The buffer pool uses this as its page directory (`PageId -> FrameId`).

use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher, Hash};

use parking_lot::Mutex;

/// A bucket holding up to `bucket_size` key-value pairs.
struct Bucket<K, V> {
    /// Local depth: the number of hash bits this bucket discriminates on.
    depth: usize,
    /// Entries, unordered. Bounded by the table's bucket size.
    items: Vec<(K, V)>,
}

impl<K: Eq, V> Bucket<K, V> {
    fn new(depth: usize, capacity: usize) -> Self {
        Self {
            depth,
            items: Vec::with_capacity(capacity),
        }
    }

    fn find(&self, key: &K) -> Option<&V> {
        self.items.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    fn remove(&mut self, key: &K) -> bool {
        match self.items.iter().position(|(k, _)| k == key) {
            Some(pos) => {
                self.items.swap_remove(pos);
                true
            }
            None => false,
        }
    }

    /// Inserts or overwrites. Returns `false` if the bucket is full and
    /// the key is not already present.
    fn insert(&mut self, key: K, value: V, bucket_size: usize) -> bool {
        if let Some((_, v)) = self.items.iter_mut().find(|(k, _)| *k == key) {
            *v = value;
            return true;
        }
        if self.items.len() >= bucket_size {
            return false;
        }
        self.items.push((key, value));
        true
    }
}

/// Mutable state behind the table's single latch.
struct Inner<K, V> {
    /// Global depth: the directory has `2^global_depth` slots.
    global_depth: usize,
    /// Directory: slot -> index into `buckets`.
    dir: Vec<usize>,
    /// Bucket arena. Split reuses the old slot for the low half and
    /// appends a slot for the high half, so indices stay stable.
    buckets: Vec<Bucket<K, V>>,
    /// Total number of entries.
    len: usize,
}

/// A concurrent extendible hash table.
///
/// All operations are linearizable under a single table latch. Lookups
/// index the directory with `hash(key) & ((1 << G) - 1)`; inserts split
/// full buckets, doubling the directory when necessary, and retry until
/// the key fits.
///
/// The hasher is a type parameter (defaulting to the std `RandomState`)
/// so callers with structured keys can supply a cheaper or deterministic
/// hash.
///
/// # Example
///
/// ```rust
/// use oxbow_storage::hash::ExtendibleHashTable;
///
/// let table = ExtendibleHashTable::new(4);
/// table.insert(1u64, "one");
/// assert_eq!(table.find(&1), Some("one"));
/// assert!(table.remove(&1));
/// assert_eq!(table.find(&1), None);
/// ```
pub struct ExtendibleHashTable<K, V, S = RandomState> {
    /// Bucket capacity, fixed at construction.
    bucket_size: usize,
    hasher: S,
    inner: Mutex<Inner<K, V>>,
}

impl<K: Hash + Eq + Clone, V: Clone> ExtendibleHashTable<K, V> {
    /// Creates a table with the given bucket capacity and the default
    /// hasher.
    pub fn new(bucket_size: usize) -> Self {
        Self::with_hasher(bucket_size, RandomState::new())
    }
}

impl<K, V, S> ExtendibleHashTable<K, V, S>
where
    K: Hash + Eq + Clone,
    V: Clone,
    S: BuildHasher,
{
    /// Creates a table with the given bucket capacity and hasher.
    ///
    /// The table starts at global depth 0: one directory slot, one empty
    /// bucket.
    ///
    /// # Panics
    ///
    /// Panics if `bucket_size` is zero.
    pub fn with_hasher(bucket_size: usize, hasher: S) -> Self {
        assert!(bucket_size > 0, "bucket_size must be > 0");
        Self {
            bucket_size,
            hasher,
            inner: Mutex::new(Inner {
                global_depth: 0,
                dir: vec![0],
                buckets: vec![Bucket::new(0, bucket_size)],
                len: 0,
            }),
        }
    }

    #[inline]
    fn slot_of(&self, key: &K, global_depth: usize) -> usize {
        let mask = (1usize << global_depth) - 1;
        (self.hasher.hash_one(key) as usize) & mask
    }

    /// Looks up the value bound to `key`.
    pub fn find(&self, key: &K) -> Option<V> {
        let inner = self.inner.lock();
        let slot = self.slot_of(key, inner.global_depth);
        inner.buckets[inner.dir[slot]].find(key).cloned()
    }

    /// Removes the binding for `key`. Returns `false` if absent.
    pub fn remove(&self, key: &K) -> bool {
        let mut inner = self.inner.lock();
        let slot = self.slot_of(key, inner.global_depth);
        let bucket = inner.dir[slot];
        if inner.buckets[bucket].remove(key) {
            inner.len -= 1;
            true
        } else {
            false
        }
    }

    /// Inserts `key -> value`, overwriting any existing binding.
    ///
    /// When the target bucket is full, it is split: its local depth grows
    /// by one, its entries are redistributed on the new bit, and the
    /// insert retries. If every key in the bucket collides on the new bit
    /// the split repeats until a distinguishing bit is found, doubling
    /// the directory as needed.
    pub fn insert(&self, key: K, value: V) {
        let mut inner = self.inner.lock();
        loop {
            let slot = self.slot_of(&key, inner.global_depth);
            let bucket = inner.dir[slot];
            let had = inner.buckets[bucket].find(&key).is_some();
            if inner.buckets[bucket].insert(key.clone(), value.clone(), self.bucket_size) {
                if !had {
                    inner.len += 1;
                }
                return;
            }
            self.split(&mut inner, bucket);
        }
    }

    /// Splits the full bucket at arena index `bucket`, doubling the
    /// directory first if the bucket already discriminates on every
    /// directory bit.
    fn split(&self, inner: &mut Inner<K, V>, bucket: usize) {
        if inner.buckets[bucket].depth == inner.global_depth {
            // Double the directory: the new upper half mirrors the lower.
            let old_len = inner.dir.len();
            for i in 0..old_len {
                let b = inner.dir[i];
                inner.dir.push(b);
            }
            inner.global_depth += 1;
        }

        let new_depth = inner.buckets[bucket].depth + 1;
        let bit = 1usize << (new_depth - 1);

        // The old arena slot becomes the low-half bucket; the high half
        // gets a fresh slot.
        let items = std::mem::take(&mut inner.buckets[bucket].items);
        inner.buckets[bucket].depth = new_depth;
        let high = inner.buckets.len();
        inner.buckets.push(Bucket::new(new_depth, self.bucket_size));

        for slot in 0..inner.dir.len() {
            if inner.dir[slot] == bucket && slot & bit != 0 {
                inner.dir[slot] = high;
            }
        }

        // Redistribute. Each half receives at most the old bucket's
        // entries, so these inserts cannot overflow.
        for (k, v) in items {
            let slot = self.slot_of(&k, inner.global_depth);
            let target = inner.dir[slot];
            inner.buckets[target].items.push((k, v));
        }
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.inner.lock().len
    }

    /// Returns `true` if the table holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the global depth of the directory.
    pub fn global_depth(&self) -> usize {
        self.inner.lock().global_depth
    }

    /// Returns the local depth of the bucket referenced by directory slot
    /// `dir_index`.
    ///
    /// # Panics
    ///
    /// Panics if `dir_index >= 2^global_depth`.
    pub fn local_depth(&self, dir_index: usize) -> usize {
        let inner = self.inner.lock();
        inner.buckets[inner.dir[dir_index]].depth
    }

    /// Returns the number of buckets currently allocated.
    pub fn num_buckets(&self) -> usize {
        self.inner.lock().buckets.len()
    }
}

impl<K, V, S> std::fmt::Debug for ExtendibleHashTable<K, V, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("ExtendibleHashTable")
            .field("global_depth", &inner.global_depth)
            .field("dir_size", &inner.dir.len())
            .field("num_buckets", &inner.buckets.len())
            .field("len", &inner.len)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::hash::Hasher;

    /// Hasher that returns u64 keys verbatim, so tests can steer keys
    /// onto chosen low bits.
    #[derive(Clone, Default)]
    struct IdentityState;

    struct IdentityHasher(u64);

    impl Hasher for IdentityHasher {
        fn finish(&self) -> u64 {
            self.0
        }

        fn write(&mut self, bytes: &[u8]) {
            for &b in bytes {
                self.0 = (self.0 << 8) | u64::from(b);
            }
        }

        fn write_u64(&mut self, v: u64) {
            self.0 = v;
        }
    }

    impl BuildHasher for IdentityState {
        type Hasher = IdentityHasher;

        fn build_hasher(&self) -> IdentityHasher {
            IdentityHasher(0)
        }
    }

    fn identity_table(bucket_size: usize) -> ExtendibleHashTable<u64, u64, IdentityState> {
        ExtendibleHashTable::with_hasher(bucket_size, IdentityState)
    }

    /// Checks the structural invariants: `|dir| = 2^G`, and every bucket
    /// at depth `d` is referenced by exactly the `2^(G-d)` slots that
    /// agree on its low `d` bits.
    fn assert_directory_invariants<K, V, S>(table: &ExtendibleHashTable<K, V, S>) {
        let inner = table.inner.lock();
        assert_eq!(inner.dir.len(), 1 << inner.global_depth);

        for (slot, &bucket) in inner.dir.iter().enumerate() {
            let depth = inner.buckets[bucket].depth;
            assert!(depth <= inner.global_depth);

            let low_bits = slot & ((1 << depth) - 1);
            let refs = inner
                .dir
                .iter()
                .enumerate()
                .filter(|&(_, &b)| b == bucket)
                .map(|(s, _)| s)
                .collect::<Vec<_>>();
            assert_eq!(refs.len(), 1 << (inner.global_depth - depth));
            for r in refs {
                assert_eq!(r & ((1 << depth) - 1), low_bits);
            }
        }
    }

    #[test]
    fn test_insert_find_remove() {
        let table = ExtendibleHashTable::new(4);
        table.insert(1u64, 10u64);
        table.insert(2, 20);
        table.insert(3, 30);

        assert_eq!(table.find(&1), Some(10));
        assert_eq!(table.find(&2), Some(20));
        assert_eq!(table.find(&3), Some(30));
        assert_eq!(table.find(&4), None);
        assert_eq!(table.len(), 3);

        assert!(table.remove(&2));
        assert!(!table.remove(&2));
        assert_eq!(table.find(&2), None);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_insert_overwrites() {
        let table = ExtendibleHashTable::new(2);
        table.insert(1u64, 10u64);
        table.insert(1, 11);
        assert_eq!(table.find(&1), Some(11));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_split_on_full_bucket() {
        let table = identity_table(2);
        // Keys 0 and 1 differ in bit 0, but at depth 0 they share the
        // single bucket; inserting a third key forces a split.
        table.insert(0, 0);
        table.insert(1, 1);
        table.insert(2, 2);

        assert!(table.global_depth() >= 1);
        for k in 0..3u64 {
            assert_eq!(table.find(&k), Some(k));
        }
        assert_directory_invariants(&table);
    }

    #[test]
    fn test_repeated_splits_on_colliding_low_bits() {
        let table = identity_table(2);
        // All keys are congruent to 0 mod 8, so bits 0..2 never
        // distinguish them; splits must cascade until bit 3 separates
        // key 8 from 0 and 16.
        table.insert(0, 0);
        table.insert(8, 8);
        table.insert(16, 16);

        assert!(table.global_depth() >= 4);
        for &k in &[0u64, 8, 16] {
            assert_eq!(table.find(&k), Some(k));
        }
        assert_directory_invariants(&table);
    }

    #[test]
    fn test_bucket_size_one_degenerates_to_bit_discrimination() {
        let table = identity_table(1);
        for k in 0..8u64 {
            table.insert(k, k * 100);
        }
        // With one entry per bucket, the directory grows until each
        // resident key maps to its own slot.
        assert_eq!(table.global_depth(), 3);
        for k in 0..8u64 {
            assert_eq!(table.find(&k), Some(k * 100));
        }
        assert_directory_invariants(&table);
    }

    #[test]
    fn test_local_depth_tracks_splits() {
        let table = identity_table(1);
        table.insert(0, 0);
        table.insert(1, 1);

        assert_eq!(table.global_depth(), 1);
        assert_eq!(table.local_depth(0), 1);
        assert_eq!(table.local_depth(1), 1);
        assert_eq!(table.num_buckets(), 2);
    }

    #[test]
    fn test_shared_bucket_slots() {
        let table = identity_table(1);
        // Splitting on keys 0 and 4 (differ in bit 2) drives global
        // depth to 3 while untouched buckets stay shallow and shared.
        table.insert(0, 0);
        table.insert(4, 4);

        assert_eq!(table.global_depth(), 3);
        assert_directory_invariants(&table);
    }

    #[test]
    fn test_many_keys_default_hasher() {
        let table = ExtendibleHashTable::new(4);
        for k in 0..1000u64 {
            table.insert(k, k.wrapping_mul(7));
        }
        assert_eq!(table.len(), 1000);
        for k in 0..1000u64 {
            assert_eq!(table.find(&k), Some(k.wrapping_mul(7)));
        }
        for k in (0..1000u64).step_by(2) {
            assert!(table.remove(&k));
        }
        assert_eq!(table.len(), 500);
        for k in 0..1000u64 {
            let expected = (k % 2 == 1).then(|| k.wrapping_mul(7));
            assert_eq!(table.find(&k), expected);
        }
        assert_directory_invariants(&table);
    }

    #[test]
    fn test_remove_absent_after_growth() {
        let table = identity_table(2);
        for k in 0..32u64 {
            table.insert(k, k);
        }
        assert!(!table.remove(&99));
        assert_eq!(table.len(), 32);
    }
}
