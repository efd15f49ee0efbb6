//! LruMap: a size-bounded linked map with least-recently-used eviction.
//!
//! The order ring runs from least to most recently used. A hit through
//! `get`/`get_mut`/`put` moves the entry to the newest end. When a new key
//! arrives while the map is full, the oldest entry acceptable to the
//! `EvictionHook` is overwritten in place with the new mapping; its arena
//! slot is reused rather than freed and reallocated. If the hook refuses
//! every candidate it is offered, the map grows past `max_size` instead.

use crate::config::LruConfig;
use crate::cursor::{FindKey, FindValue, Handle, MapCursor, Navigable, TableId};
use crate::error::Result;
use crate::linked_table::LinkedTable;
use crate::strategy::{HashStrategy, Natural, ValueEquivalence};
use crate::view::{Entries, EntriesMut, Iter, Keys, KeysMut, Values, ValuesMut};
use core::borrow::Borrow;
use core::convert::Infallible;
use core::fmt;
use core::mem;
use slotmap::DefaultKey;

/// Decides whether the least recently used entry may be evicted.
pub trait EvictionHook<K, V> {
    /// Return false to keep `key` in the map.
    fn remove_lru(&mut self, key: &K, value: &V) -> bool;
}

/// Evicts whatever is oldest.
#[derive(Clone, Copy, Debug, Default)]
pub struct AlwaysEvict;

impl<K, V> EvictionHook<K, V> for AlwaysEvict {
    #[inline]
    fn remove_lru(&mut self, _key: &K, _value: &V) -> bool {
        true
    }
}

impl<K, V, F> EvictionHook<K, V> for F
where
    F: FnMut(&K, &V) -> bool,
{
    #[inline]
    fn remove_lru(&mut self, key: &K, value: &V) -> bool {
        self(key, value)
    }
}

pub struct LruMap<K, V, S = Natural, H = AlwaysEvict> {
    table: LinkedTable<K, V, S>,
    max_size: usize,
    scan_until_removable: bool,
    hook: H,
}

impl<K, V> LruMap<K, V> {
    /// A map holding at most `max_size` entries.
    pub fn new(max_size: usize) -> Result<Self> {
        Self::with_config(LruConfig::with_max_size(max_size), Natural::default(), AlwaysEvict)
    }
}

impl<K, V, H> LruMap<K, V, Natural, H> {
    pub fn with_hook(max_size: usize, hook: H) -> Result<Self> {
        Self::with_config(LruConfig::with_max_size(max_size), Natural::default(), hook)
    }
}

impl<K, V, S, H> LruMap<K, V, S, H> {
    pub fn with_config(config: LruConfig, strategy: S, hook: H) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            table: LinkedTable::with_config(&config.table(), strategy)?,
            max_size: config.max_size,
            scan_until_removable: config.scan_until_removable,
            hook,
        })
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.len() == 0
    }

    /// True once the map holds `max_size` entries or more.
    pub fn is_full(&self) -> bool {
        self.table.len() >= self.max_size
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn is_scan_until_removable(&self) -> bool {
        self.scan_until_removable
    }

    pub fn capacity(&self) -> usize {
        self.table.raw().capacity()
    }

    pub fn hook(&self) -> &H {
        &self.hook
    }

    pub fn hook_mut(&mut self) -> &mut H {
        &mut self.hook
    }

    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Ring and chains agree; returns keys least recently used first.
    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) -> Vec<&K> {
        let slots = self.table.assert_ring_consistent();
        slots.into_iter().filter_map(|k| self.table.raw().get(k)).map(|e| &e.key).collect()
    }

    /// Least recently used key: the next eviction candidate.
    pub fn lru_key(&self) -> Option<&K> {
        self.table.raw().get(self.table.first()?).map(|e| &e.key)
    }

    /// Most recently used key.
    pub fn mru_key(&self) -> Option<&K> {
        self.table.raw().get(self.table.last()?).map(|e| &e.key)
    }
}

impl<K, V, S, H> LruMap<K, V, S, H>
where
    S: HashStrategy<K>,
    H: EvictionHook<K, V>,
{
    /// Look up `key` and mark it most recently used.
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        S: HashStrategy<Q>,
    {
        let k = self.promote(key)?;
        self.table.raw().get(k).map(|e| &e.value)
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        S: HashStrategy<Q>,
    {
        let k = self.promote(key)?;
        self.table.value_mut(k)
    }

    fn promote<Q>(&mut self, key: &Q) -> Option<DefaultKey>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        S: HashStrategy<Q>,
    {
        let k = self.table.raw().find(key)?;
        self.table.move_to_newest(k);
        Some(k)
    }

    /// Look up `key` without touching recency.
    pub fn peek<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        S: HashStrategy<Q>,
    {
        let k = self.table.raw().find(key)?;
        self.table.raw().get(k).map(|e| &e.value)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized,
        S: HashStrategy<Q>,
    {
        self.table.raw().find(key).is_some()
    }

    /// Map `key` to `value` as the most recently used entry, evicting the
    /// least recently used one first if the map is full.
    pub fn put(&mut self, key: K, value: V) -> Option<V> {
        let hash = self.table.raw().hash_of(&key);
        if let Some(k) = self.table.raw().find_hashed(hash, &key) {
            self.table.move_to_newest(k);
            return self.table.value_mut(k).map(|v| mem::replace(v, value));
        }
        if self.is_full() {
            match self.eviction_victim() {
                Some(victim) => {
                    tracing::trace!(len = self.table.len(), "evicting least recently used entry");
                    self.table.reuse(victim, hash, key, value);
                    return None;
                }
                None => tracing::trace!(
                    len = self.table.len(),
                    max_size = self.max_size,
                    "eviction refused, growing past max size"
                ),
            }
        }
        self.table.insert_newest(hash, key, value);
        None
    }

    /// Walk from the oldest entry asking the hook for permission. Without
    /// `scan_until_removable` only the oldest is asked.
    fn eviction_victim(&mut self) -> Option<DefaultKey> {
        let mut cur = self.table.first();
        while let Some(k) = cur {
            let e = self.table.raw().get(k)?;
            if self.hook.remove_lru(&e.key, &e.value) {
                return Some(k);
            }
            tracing::trace!("eviction candidate vetoed");
            if !self.scan_until_removable {
                return None;
            }
            cur = self.table.after(k);
        }
        None
    }

    pub fn put_all<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        self.extend(iter);
    }

    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        S: HashStrategy<Q>,
    {
        let hash = self.table.raw().hash_of(key);
        let (previous, k) = self.table.raw().find_slot_hashed(hash, key)?;
        self.table.remove_entry(k, previous).map(|e| e.value)
    }

    /// Iterate from least to most recently used, without promoting.
    pub fn iter(&self) -> Iter<'_, Self> {
        Iter::new(self)
    }

    pub fn keys(&self) -> Keys<'_, Self> {
        Keys::new(self)
    }

    pub fn values(&self) -> Values<'_, Self> {
        Values::new(self)
    }

    pub fn entries(&self) -> Entries<'_, Self> {
        Entries::new(self)
    }

    pub fn keys_mut(&mut self) -> KeysMut<'_, Self> {
        KeysMut::new(self)
    }

    pub fn values_mut(&mut self) -> ValuesMut<'_, Self> {
        ValuesMut::new(self)
    }

    pub fn entries_mut(&mut self) -> EntriesMut<'_, Self> {
        EntriesMut::new(self)
    }

    pub fn cursor(&self) -> MapCursor {
        MapCursor::new(self)
    }
}

impl<K, V, S, H> LruMap<K, V, S, H>
where
    S: HashStrategy<K> + ValueEquivalence<V>,
    H: EvictionHook<K, V>,
{
    pub fn contains_value(&self, value: &V) -> bool {
        self.find_value(value).is_some()
    }
}

impl<K, V, S, H> Navigable for LruMap<K, V, S, H>
where
    S: HashStrategy<K>,
    H: EvictionHook<K, V>,
{
    type Key = K;
    type Value = V;
    type Rejection = Infallible;

    fn table_id(&self) -> TableId {
        self.table.raw().id()
    }

    fn modification_count(&self) -> u64 {
        self.table.raw().mod_count()
    }

    fn len(&self) -> usize {
        self.table.len()
    }

    fn first_handle(&self) -> Option<Handle> {
        self.table.first().map(Handle::new)
    }

    fn last_handle(&self) -> Option<Handle> {
        self.table.last().map(Handle::new)
    }

    fn handle_after(&self, h: Handle) -> Option<Handle> {
        self.table.after(h.raw_handle()).map(Handle::new)
    }

    fn handle_before(&self, h: Handle) -> Option<Handle> {
        self.table.before(h.raw_handle()).map(Handle::new)
    }

    fn find_key(&self, key: &K) -> Option<Handle> {
        self.table.raw().find(key).map(Handle::new)
    }

    fn entry(&self, h: Handle) -> Option<(&K, &V)> {
        self.table
            .raw()
            .get(h.raw_handle())
            .map(|e| (&e.key, &e.value))
    }

    fn replace_value(&mut self, h: Handle, value: V) -> core::result::Result<V, Infallible> {
        match self.table.value_mut(h.raw_handle()) {
            Some(v) => Ok(mem::replace(v, value)),
            None => panic!("replace_value on a handle that is not live"),
        }
    }

    fn remove_handle(&mut self, h: Handle) -> Option<(K, V)> {
        self.table.unlink(h.raw_handle()).map(|e| (e.key, e.value))
    }
}

impl<K, V, S, H, Q> FindKey<Q> for LruMap<K, V, S, H>
where
    K: Borrow<Q>,
    Q: ?Sized,
    S: HashStrategy<K> + HashStrategy<Q>,
    H: EvictionHook<K, V>,
{
    fn find_key_by(&self, key: &Q) -> Option<Handle> {
        self.table.raw().find(key).map(Handle::new)
    }
}

impl<K, V, S, H> FindValue for LruMap<K, V, S, H>
where
    S: HashStrategy<K> + ValueEquivalence<V>,
    H: EvictionHook<K, V>,
{
    fn values_equal(&self, a: &V, b: &V) -> bool {
        self.table.raw().strategy().values_equal(a, b)
    }
}

impl<K: Clone, V: Clone, S: Clone, H: Clone> Clone for LruMap<K, V, S, H> {
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone(),
            max_size: self.max_size,
            scan_until_removable: self.scan_until_removable,
            hook: self.hook.clone(),
        }
    }
}

impl<K, V, S, H> fmt::Debug for LruMap<K, V, S, H>
where
    K: fmt::Debug,
    V: fmt::Debug,
    S: HashStrategy<K>,
    H: EvictionHook<K, V>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, S, H> Extend<(K, V)> for LruMap<K, V, S, H>
where
    S: HashStrategy<K>,
    H: EvictionHook<K, V>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.put(k, v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order<H: EvictionHook<&'static str, i32>>(m: &LruMap<&'static str, i32, Natural, H>) -> Vec<&'static str> {
        m.table.assert_ring_consistent();
        m.keys().iter().copied().collect()
    }

    /// Invariant: a read promotes, so the next eviction takes the
    /// second-oldest key.
    #[test]
    fn get_promotes_before_eviction() {
        let mut m = LruMap::new(4).unwrap();
        for (i, k) in ["A", "B", "C", "D"].into_iter().enumerate() {
            m.put(k, i as i32);
        }
        assert_eq!(m.get("A"), Some(&0));
        assert_eq!(order(&m), ["B", "C", "D", "A"]);
        m.put("E", 4);
        assert_eq!(order(&m), ["C", "D", "A", "E"]);
        assert!(!m.contains_key("B"));
        assert_eq!(m.len(), 4);
    }

    /// Invariant: eviction reuses the victim's slot instead of allocating.
    #[test]
    fn eviction_reuses_the_victims_slot() {
        let mut m = LruMap::new(2).unwrap();
        m.put("a", 1);
        m.put("b", 2);
        let victim = m.find_key(&"a").unwrap();
        m.put("c", 3);
        assert_eq!(m.find_key(&"c"), Some(victim));
        assert_eq!(m.len(), 2);
    }

    /// Invariant: peek and contains_key do not change recency; promoting the
    /// newest entry is not a modification.
    #[test]
    fn peek_does_not_promote() {
        let mut m = LruMap::new(3).unwrap();
        m.put("a", 1);
        m.put("b", 2);
        let before = m.modification_count();
        assert_eq!(m.peek("a"), Some(&1));
        assert!(m.contains_key("a"));
        assert_eq!(m.get("b"), Some(&2));
        assert_eq!(m.modification_count(), before);
        assert_eq!(m.lru_key(), Some(&"a"));
        assert_eq!(m.mru_key(), Some(&"b"));
    }

    /// Invariant: a refusing hook lets the map exceed its bound by one per
    /// insertion and keeps the refused victim.
    #[test]
    fn vetoed_eviction_grows_past_bound() {
        let mut m = LruMap::with_hook(2, |_: &&str, _: &i32| false).unwrap();
        m.put("a", 1);
        m.put("b", 2);
        assert!(m.is_full());
        m.put("c", 3);
        assert_eq!(m.len(), 3);
        assert!(m.contains_key("a"));
        assert_eq!(order(&m), ["a", "b", "c"]);
    }

    /// Invariant: with scanning enabled the oldest acceptable entry is
    /// evicted, skipping protected ones.
    #[test]
    fn scan_skips_protected_entries() {
        let config = LruConfig {
            scan_until_removable: true,
            ..LruConfig::with_max_size(3)
        };
        let protect = |k: &&str, _: &i32| !k.starts_with('_');
        let mut m = LruMap::with_config(config, Natural::new(), protect).unwrap();
        assert!(m.is_scan_until_removable());
        m.put("_sys", 0);
        m.put("x", 1);
        m.put("y", 2);
        m.put("z", 3);
        assert_eq!(order(&m), ["_sys", "y", "z"]);

        let no_scan = LruConfig::with_max_size(3);
        let mut n = LruMap::with_config(no_scan, Natural::new(), protect).unwrap();
        n.put("_sys", 0);
        n.put("x", 1);
        n.put("y", 2);
        n.put("z", 3);
        assert_eq!(order(&n), ["_sys", "x", "y", "z"]);
    }

    /// Invariant: updating an existing key promotes it and never evicts.
    #[test]
    fn update_promotes_without_eviction() {
        let mut m = LruMap::new(2).unwrap();
        m.put("a", 1);
        m.put("b", 2);
        assert_eq!(m.put("a", 10), Some(1));
        assert_eq!(order(&m), ["b", "a"]);
        m.put("c", 3);
        assert_eq!(order(&m), ["a", "c"]);
    }
}
