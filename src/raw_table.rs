//! RawTable: the chained hash-table core every map in the crate layers on.
//!
//! Entries live in a slotmap arena and are threaded into per-bucket chains
//! through `next` keys. The bucket array length is always a power of two so
//! indexing is a mask of the spread hash. Layers above reach the structure
//! through three seams: `insert_new` (create + add), `remove_entry`
//! (unlink with a known chain predecessor) and `reuse` (overwrite a live
//! entry in place). Per-entry layer state rides along in `ext`.

use crate::config::{threshold, TableConfig, MAXIMUM_CAPACITY};
use crate::error::Result;
use crate::strategy::HashStrategy;
use core::borrow::Borrow;
use core::mem;
use slotmap::{DefaultKey, SlotMap};
use std::sync::atomic::{AtomicU64, Ordering};

/// Stable, generational position of an entry. A handle to a removed entry
/// never resolves again, even if its arena slot is recycled.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Handle(DefaultKey);

impl Handle {
    pub(crate) fn new(k: DefaultKey) -> Self {
        Handle(k)
    }
    pub(crate) fn raw_handle(&self) -> DefaultKey {
        self.0
    }
}

/// Identity of one table instance; cursors remember it to catch use with a
/// different map.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct TableId(u64);

impl TableId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        TableId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Entry<K, V, X> {
    /// Strategy hash of the key, computed once at insertion.
    pub(crate) hash: u64,
    pub(crate) key: K,
    pub(crate) value: V,
    next: Option<DefaultKey>,
    pub(crate) ext: X,
}

pub(crate) struct RawTable<K, V, S, X = ()> {
    id: TableId,
    strategy: S,
    buckets: Box<[Option<DefaultKey>]>,
    slots: SlotMap<DefaultKey, Entry<K, V, X>>,
    load_factor: f32,
    threshold: usize,
    mod_count: u64,
}

/// Scrambles the strategy hash so that weak low bits (addresses, small
/// integers) still spread across buckets.
#[inline]
fn spread(hash: u64) -> u64 {
    let h = hash ^ (hash >> 33);
    let h = h.wrapping_mul(0xff51_afd7_ed55_8ccd);
    h ^ (h >> 33)
}

#[inline]
pub(crate) fn bucket_index(hash: u64, buckets: usize) -> usize {
    debug_assert!(buckets.is_power_of_two());
    (spread(hash) as usize) & (buckets - 1)
}

impl<K, V, S, X> RawTable<K, V, S, X> {
    /// A table with the default configuration.
    pub(crate) fn new(strategy: S) -> Self {
        Self::from_valid_config(&TableConfig::default(), strategy)
    }

    pub(crate) fn with_config(config: &TableConfig, strategy: S) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_valid_config(config, strategy))
    }

    /// Build from a configuration the caller has already validated.
    pub(crate) fn from_valid_config(config: &TableConfig, strategy: S) -> Self {
        let buckets = config.bucket_count();
        Self {
            id: TableId::next(),
            strategy,
            buckets: vec![None; buckets].into_boxed_slice(),
            slots: SlotMap::with_key(),
            load_factor: config.load_factor,
            threshold: config.threshold_for(buckets),
            mod_count: 0,
        }
    }

    pub(crate) fn id(&self) -> TableId {
        self.id
    }

    pub(crate) fn strategy(&self) -> &S {
        &self.strategy
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn capacity(&self) -> usize {
        self.buckets.len()
    }

    pub(crate) fn mod_count(&self) -> u64 {
        self.mod_count
    }

    /// Record a structural change made by a layer (e.g. an order splice).
    pub(crate) fn touch(&mut self) {
        self.mod_count = self.mod_count.wrapping_add(1);
    }

    pub(crate) fn hash_of<Q>(&self, q: &Q) -> u64
    where
        Q: ?Sized,
        S: HashStrategy<Q>,
    {
        HashStrategy::<Q>::hash(&self.strategy, q)
    }

    /// Walk the chain for `hash` and return the first entry whose key
    /// satisfies `is_match`, together with its chain predecessor.
    pub(crate) fn find_slot<F>(
        &self,
        hash: u64,
        mut is_match: F,
    ) -> Option<(Option<DefaultKey>, DefaultKey)>
    where
        F: FnMut(&K) -> bool,
    {
        let mut prev = None;
        let mut cur = self.buckets[bucket_index(hash, self.buckets.len())];
        while let Some(k) = cur {
            let e = &self.slots[k];
            if e.hash == hash && is_match(&e.key) {
                return Some((prev, k));
            }
            prev = cur;
            cur = e.next;
        }
        None
    }

    pub(crate) fn find_by<F>(&self, hash: u64, is_match: F) -> Option<DefaultKey>
    where
        F: FnMut(&K) -> bool,
    {
        self.find_slot(hash, is_match).map(|(_, k)| k)
    }

    pub(crate) fn find<Q>(&self, q: &Q) -> Option<DefaultKey>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        S: HashStrategy<Q>,
    {
        self.find_hashed(self.hash_of(q), q)
    }

    /// Like `find`, with the hash of `q` already computed.
    pub(crate) fn find_hashed<Q>(&self, hash: u64, q: &Q) -> Option<DefaultKey>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        S: HashStrategy<Q>,
    {
        self.find_by(hash, |k| HashStrategy::<Q>::equals(&self.strategy, q, k.borrow()))
    }

    /// Like `find_hashed`, also returning the chain predecessor for removal.
    pub(crate) fn find_slot_hashed<Q>(
        &self,
        hash: u64,
        q: &Q,
    ) -> Option<(Option<DefaultKey>, DefaultKey)>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        S: HashStrategy<Q>,
    {
        self.find_slot(hash, |k| HashStrategy::<Q>::equals(&self.strategy, q, k.borrow()))
    }

    pub(crate) fn get(&self, k: DefaultKey) -> Option<&Entry<K, V, X>> {
        self.slots.get(k)
    }

    pub(crate) fn get_mut(&mut self, k: DefaultKey) -> Option<&mut Entry<K, V, X>> {
        self.slots.get_mut(k)
    }

    /// Create an entry at the head of its bucket chain, growing the bucket
    /// array afterwards if the table went over its threshold.
    pub(crate) fn insert_new(&mut self, hash: u64, key: K, value: V, ext: X) -> DefaultKey {
        let index = bucket_index(hash, self.buckets.len());
        let next = self.buckets[index];
        let k = self.slots.insert(Entry {
            hash,
            key,
            value,
            next,
            ext,
        });
        self.buckets[index] = Some(k);
        self.touch();
        if self.slots.len() > self.threshold {
            self.grow();
        }
        k
    }

    /// Unlink `k` given its chain predecessor (as returned by `find_slot`).
    pub(crate) fn remove_entry(
        &mut self,
        k: DefaultKey,
        previous: Option<DefaultKey>,
    ) -> Option<Entry<K, V, X>> {
        let entry = self.slots.remove(k)?;
        match previous {
            Some(p) => self.slots[p].next = entry.next,
            None => {
                let index = bucket_index(entry.hash, self.buckets.len());
                debug_assert_eq!(self.buckets[index], Some(k));
                self.buckets[index] = entry.next;
            }
        }
        self.touch();
        Some(entry)
    }

    /// Unlink `k` without a known predecessor; walks its chain.
    pub(crate) fn unlink(&mut self, k: DefaultKey) -> Option<Entry<K, V, X>> {
        let hash = self.slots.get(k)?.hash;
        let previous = self.chain_predecessor(hash, k);
        self.remove_entry(k, previous)
    }

    /// Overwrite a live entry with a new mapping and relink it under the
    /// bucket of `hash`. The arena slot, its handle and `ext` are kept.
    pub(crate) fn reuse(&mut self, k: DefaultKey, hash: u64, key: K, value: V) -> Option<(K, V)> {
        let old_hash = self.slots.get(k)?.hash;
        self.detach(k, old_hash);
        let index = bucket_index(hash, self.buckets.len());
        let head = self.buckets[index];
        let e = &mut self.slots[k];
        e.hash = hash;
        e.next = head;
        let old_key = mem::replace(&mut e.key, key);
        let old_value = mem::replace(&mut e.value, value);
        self.buckets[index] = Some(k);
        self.touch();
        Some((old_key, old_value))
    }

    fn detach(&mut self, k: DefaultKey, hash: u64) {
        let next = self.slots[k].next;
        match self.chain_predecessor(hash, k) {
            Some(p) => self.slots[p].next = next,
            None => {
                let index = bucket_index(hash, self.buckets.len());
                self.buckets[index] = next;
            }
        }
    }

    fn chain_predecessor(&self, hash: u64, k: DefaultKey) -> Option<DefaultKey> {
        let mut prev = None;
        let mut cur = self.buckets[bucket_index(hash, self.buckets.len())];
        while let Some(c) = cur {
            if c == k {
                return prev;
            }
            prev = cur;
            cur = self.slots[c].next;
        }
        debug_assert!(false, "entry missing from its bucket chain");
        None
    }

    fn grow(&mut self) {
        let current = self.buckets.len();
        if current < MAXIMUM_CAPACITY {
            self.resize(current * 2);
        }
    }

    /// Make room for `additional` more entries without intermediate resizes.
    pub(crate) fn reserve(&mut self, additional: usize) {
        let wanted = self.slots.len().saturating_add(additional);
        let mut capacity = self.buckets.len();
        while threshold(capacity, self.load_factor) < wanted && capacity < MAXIMUM_CAPACITY {
            capacity *= 2;
        }
        if capacity != self.buckets.len() {
            self.resize(capacity);
        }
    }

    /// Relink every entry into a fresh bucket array of `new_capacity` in a
    /// single pass over the old chains.
    fn resize(&mut self, new_capacity: usize) {
        let old_capacity = self.buckets.len();
        let mut buckets = vec![None; new_capacity].into_boxed_slice();
        for head in self.buckets.iter() {
            let mut cur = *head;
            while let Some(k) = cur {
                let e = &mut self.slots[k];
                cur = e.next;
                let index = bucket_index(e.hash, new_capacity);
                e.next = buckets[index];
                buckets[index] = Some(k);
            }
        }
        self.buckets = buckets;
        self.threshold = threshold(new_capacity, self.load_factor);
        self.touch();
        tracing::debug!(
            old_capacity,
            new_capacity,
            len = self.slots.len(),
            "resized hash table"
        );
    }

    pub(crate) fn clear(&mut self) {
        self.slots.clear();
        self.buckets.fill(None);
        self.touch();
    }

    /// First entry in bucket order.
    pub(crate) fn first(&self) -> Option<DefaultKey> {
        self.first_from(0)
    }

    /// Last entry in bucket order.
    pub(crate) fn last(&self) -> Option<DefaultKey> {
        self.last_before(self.buckets.len())
    }

    pub(crate) fn after(&self, k: DefaultKey) -> Option<DefaultKey> {
        let e = self.slots.get(k)?;
        if e.next.is_some() {
            return e.next;
        }
        self.first_from(bucket_index(e.hash, self.buckets.len()) + 1)
    }

    pub(crate) fn before(&self, k: DefaultKey) -> Option<DefaultKey> {
        let hash = self.slots.get(k)?.hash;
        match self.chain_predecessor(hash, k) {
            Some(p) => Some(p),
            None => self.last_before(bucket_index(hash, self.buckets.len())),
        }
    }

    fn first_from(&self, index: usize) -> Option<DefaultKey> {
        self.buckets[index..].iter().find_map(|head| *head)
    }

    fn last_before(&self, end: usize) -> Option<DefaultKey> {
        self.buckets[..end]
            .iter()
            .rev()
            .find_map(|head| head.map(|h| self.chain_tail(h)))
    }

    fn chain_tail(&self, head: DefaultKey) -> DefaultKey {
        let mut cur = head;
        while let Some(n) = self.slots[cur].next {
            cur = n;
        }
        cur
    }

    /// Arena-order scan, for lookups where order does not matter.
    pub(crate) fn entries(&self) -> impl Iterator<Item = (DefaultKey, &Entry<K, V, X>)> {
        self.slots.iter()
    }

    pub(crate) fn entries_mut(&mut self) -> impl Iterator<Item = (DefaultKey, &mut Entry<K, V, X>)> {
        self.slots.iter_mut()
    }

    pub(crate) fn into_entries(self) -> slotmap::basic::IntoIter<DefaultKey, Entry<K, V, X>> {
        self.slots.into_iter()
    }

    /// Every live entry reached by walking the bucket chains, checking that
    /// each sits in the bucket its hash selects and that the count matches.
    #[cfg(test)]
    pub(crate) fn assert_chains_consistent(&self) -> Vec<DefaultKey> {
        let mut seen = Vec::with_capacity(self.slots.len());
        for (i, head) in self.buckets.iter().enumerate() {
            let mut cur = *head;
            while let Some(k) = cur {
                let e = self.slots.get(k).expect("chain key must be live");
                assert_eq!(bucket_index(e.hash, self.buckets.len()), i);
                seen.push(k);
                cur = e.next;
            }
        }
        assert_eq!(seen.len(), self.slots.len());
        seen
    }
}

impl<K: Clone, V: Clone, S: Clone, X: Clone> Clone for RawTable<K, V, S, X> {
    fn clone(&self) -> Self {
        Self {
            id: TableId::next(),
            strategy: self.strategy.clone(),
            buckets: self.buckets.clone(),
            slots: self.slots.clone(),
            load_factor: self.load_factor,
            threshold: self.threshold,
            mod_count: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::Natural;
    use core::hash::{BuildHasher, Hasher};
    use std::collections::BTreeSet;

    #[derive(Clone, Default)]
    struct ConstBuildHasher;
    struct ConstHasher;
    impl BuildHasher for ConstBuildHasher {
        type Hasher = ConstHasher;
        fn build_hasher(&self) -> Self::Hasher {
            ConstHasher
        }
    }
    impl Hasher for ConstHasher {
        fn write(&mut self, _bytes: &[u8]) {}
        fn finish(&self) -> u64 {
            0
        } // force all keys into the same chain
    }

    type Table = RawTable<String, i32, Natural>;

    fn table(capacity: usize) -> Table {
        RawTable::with_config(&TableConfig::with_capacity(capacity), Natural::new()).unwrap()
    }

    fn put(t: &mut Table, k: &str, v: i32) -> DefaultKey {
        let hash = t.hash_of(k);
        t.insert_new(hash, k.to_string(), v, ())
    }

    /// Invariant: inserted keys are found; absent keys are not; every entry
    /// sits in the bucket its hash selects.
    #[test]
    fn insert_and_find() {
        let mut t = table(4);
        for (i, k) in ["a", "b", "c"].iter().enumerate() {
            put(&mut t, k, i as i32);
        }
        assert_eq!(t.len(), 3);
        let k = t.find("b").expect("b present");
        assert_eq!(t.get(k).map(|e| e.value), Some(1));
        assert!(t.find("z").is_none());
        t.assert_chains_consistent();
    }

    /// Invariant: crossing the threshold doubles the bucket array and keeps
    /// every entry reachable from the right bucket.
    #[test]
    fn grows_past_threshold() {
        let mut t = table(4);
        assert_eq!(t.capacity(), 4);
        for i in 0..4 {
            put(&mut t, &format!("k{i}"), i);
        }
        assert_eq!(t.capacity(), 8);
        for i in 4..40 {
            put(&mut t, &format!("k{i}"), i);
        }
        assert!(t.capacity() >= 64);
        assert_eq!(t.assert_chains_consistent().len(), 40);
        for i in 0..40 {
            assert!(t.find(format!("k{i}").as_str()).is_some());
        }
    }

    /// Invariant: removal through the recorded predecessor works at the head,
    /// middle and tail of a single long chain.
    #[test]
    fn remove_from_single_chain() {
        let mut t: RawTable<String, i32, Natural<ConstBuildHasher>> = RawTable::with_config(
            &TableConfig::default(),
            Natural::with_hasher(ConstBuildHasher),
        )
        .unwrap();
        for (i, k) in ["a", "b", "c", "d"].iter().enumerate() {
            let hash = t.hash_of(*k);
            t.insert_new(hash, k.to_string(), i as i32, ());
        }
        for k in ["b", "d", "a"] {
            let hash = t.hash_of(k);
            let (prev, key) = t.find_slot(hash, |s| s == k).unwrap();
            let e = t.remove_entry(key, prev).unwrap();
            assert_eq!(e.key, k);
            t.assert_chains_consistent();
        }
        assert_eq!(t.len(), 1);
        assert!(t.find("c").is_some());
    }

    /// Invariant: every insert, removal, resize, reuse and clear bumps the
    /// modification counter; lookups never do.
    #[test]
    fn modification_counter_tracks_structure() {
        let mut t = table(16);
        let m0 = t.mod_count();
        let k = put(&mut t, "a", 1);
        let m1 = t.mod_count();
        assert!(m1 > m0);
        let _ = t.find("a");
        let _ = t.first();
        assert_eq!(t.mod_count(), m1);
        let hash = t.hash_of("b");
        t.reuse(k, hash, "b".to_string(), 2).unwrap();
        let m2 = t.mod_count();
        assert!(m2 > m1);
        t.unlink(k).unwrap();
        assert!(t.mod_count() > m2);
        let m3 = t.mod_count();
        t.clear();
        assert!(t.mod_count() > m3);
    }

    /// Invariant: reuse keeps the slot, replaces key/value/hash and moves the
    /// entry to the bucket of its new hash.
    #[test]
    fn reuse_relinks_under_new_hash() {
        let mut t = table(16);
        let k = put(&mut t, "old", 1);
        put(&mut t, "other", 2);
        let hash = t.hash_of("new");
        let (ok, ov) = t.reuse(k, hash, "new".to_string(), 3).unwrap();
        assert_eq!((ok.as_str(), ov), ("old", 1));
        assert_eq!(t.find("new"), Some(k));
        assert!(t.find("old").is_none());
        assert_eq!(t.len(), 2);
        t.assert_chains_consistent();
    }

    /// Invariant: `after` from `first` and `before` from `last` visit the
    /// same entries in exactly reversed order.
    #[test]
    fn bucket_order_traversal_is_reversible() {
        let mut t: RawTable<String, i32, Natural<ConstBuildHasher>> = RawTable::with_config(
            &TableConfig::with_capacity(8),
            Natural::with_hasher(ConstBuildHasher),
        )
        .unwrap();
        let mut n = table(8);
        for i in 0..5 {
            let key = format!("k{i}");
            let hash = t.hash_of(key.as_str());
            t.insert_new(hash, key.clone(), i, ());
            put(&mut n, &key, i);
        }
        for tbl in [
            collect_both_ways(&t.first(), |k| t.after(k), &t.last(), |k| t.before(k)),
            collect_both_ways(&n.first(), |k| n.after(k), &n.last(), |k| n.before(k)),
        ] {
            let (forward, mut backward) = tbl;
            backward.reverse();
            assert_eq!(forward.len(), 5);
            assert_eq!(forward, backward);
        }
        let keys: BTreeSet<_> = std::iter::successors(n.first(), |k| n.after(*k))
            .map(|k| n.get(k).unwrap().key.clone())
            .collect();
        assert_eq!(keys.len(), 5);
    }

    fn collect_both_ways(
        first: &Option<DefaultKey>,
        after: impl Fn(DefaultKey) -> Option<DefaultKey>,
        last: &Option<DefaultKey>,
        before: impl Fn(DefaultKey) -> Option<DefaultKey>,
    ) -> (Vec<DefaultKey>, Vec<DefaultKey>) {
        let forward = std::iter::successors(*first, |k| after(*k)).collect();
        let backward = std::iter::successors(*last, |k| before(*k)).collect();
        (forward, backward)
    }

    /// Invariant: `reserve` grows once to a capacity whose threshold admits
    /// the requested entries.
    #[test]
    fn reserve_presizes() {
        let mut t = table(2);
        t.reserve(100);
        assert!(threshold(t.capacity(), 0.75) >= 100);
        let cap = t.capacity();
        for i in 0..100 {
            put(&mut t, &format!("k{i}"), i);
        }
        assert_eq!(t.capacity(), cap);
    }

    /// Invariant: a clone is an independent table with its own identity.
    #[test]
    fn clone_is_independent() {
        let mut t = table(4);
        put(&mut t, "a", 1);
        let mut c = t.clone();
        assert_ne!(t.id(), c.id());
        put(&mut c, "b", 2);
        assert_eq!(t.len(), 1);
        assert_eq!(c.len(), 2);
        c.assert_chains_consistent();
    }
}
