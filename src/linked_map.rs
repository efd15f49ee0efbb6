//! LinkedMap: a hashed map that remembers insertion order.
//!
//! Re-putting an existing key replaces its value in place; the key keeps
//! its position. Iteration, views and cursors all walk the order ring, so
//! their order does not depend on bucket layout.

use crate::config::TableConfig;
use crate::cursor::{FindKey, FindValue, Handle, MapCursor, Navigable, TableId};
use crate::error::Result;
use crate::linked_table::LinkedTable;
use crate::strategy::{HashStrategy, Natural, ValueEquivalence};
use crate::view::{Entries, EntriesMut, Iter, Keys, KeysMut, Values, ValuesMut};
use core::borrow::Borrow;
use core::convert::Infallible;
use core::fmt;
use core::mem;

pub struct LinkedMap<K, V, S = Natural> {
    table: LinkedTable<K, V, S>,
}

impl<K, V> LinkedMap<K, V> {
    pub fn new() -> Self {
        Self::with_strategy(Natural::default())
    }

    pub fn with_capacity(capacity: usize) -> Result<Self> {
        Self::with_config(TableConfig::with_capacity(capacity), Natural::default())
    }
}

impl<K, V, S: Default> Default for LinkedMap<K, V, S> {
    fn default() -> Self {
        Self::with_strategy(S::default())
    }
}

impl<K, V, S> LinkedMap<K, V, S> {
    pub fn with_strategy(strategy: S) -> Self {
        Self {
            table: LinkedTable::new(strategy),
        }
    }

    pub fn with_config(config: TableConfig, strategy: S) -> Result<Self> {
        Ok(Self {
            table: LinkedTable::with_config(&config, strategy)?,
        })
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.table.raw().capacity()
    }

    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Ring and chains agree; returns keys oldest first.
    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) -> Vec<&K> {
        let slots = self.table.assert_ring_consistent();
        slots.into_iter().filter_map(|k| self.table.raw().get(k)).map(|e| &e.key).collect()
    }

    fn key_at(&self, k: Option<slotmap::DefaultKey>) -> Option<&K> {
        self.table.raw().get(k?).map(|e| &e.key)
    }

    /// Oldest key.
    pub fn first_key(&self) -> Option<&K> {
        self.key_at(self.table.first())
    }

    /// Newest key.
    pub fn last_key(&self) -> Option<&K> {
        self.key_at(self.table.last())
    }

    pub fn first(&self) -> Option<(&K, &V)> {
        let e = self.table.raw().get(self.table.first()?)?;
        Some((&e.key, &e.value))
    }

    pub fn last(&self) -> Option<(&K, &V)> {
        let e = self.table.raw().get(self.table.last()?)?;
        Some((&e.key, &e.value))
    }

    pub fn pop_first(&mut self) -> Option<(K, V)> {
        let k = self.table.first()?;
        self.table.unlink(k).map(|e| (e.key, e.value))
    }

    pub fn pop_last(&mut self) -> Option<(K, V)> {
        let k = self.table.last()?;
        self.table.unlink(k).map(|e| (e.key, e.value))
    }

    /// Entry at `index` in insertion order.
    pub fn get_index(&self, index: usize) -> Option<(&K, &V)> {
        let e = self.table.raw().get(self.table.nth(index)?)?;
        Some((&e.key, &e.value))
    }

    pub fn remove_index(&mut self, index: usize) -> Option<(K, V)> {
        let k = self.table.nth(index)?;
        self.table.unlink(k).map(|e| (e.key, e.value))
    }

    /// Keep only the entries `keep` accepts, visiting them in order.
    pub fn retain<F: FnMut(&K, &mut V) -> bool>(&mut self, mut keep: F) {
        let mut cur = self.table.first();
        while let Some(k) = cur {
            cur = self.table.after(k);
            let discard = match self.table.key_value_mut(k) {
                Some((key, value)) => !keep(key, value),
                None => false,
            };
            if discard {
                self.table.unlink(k);
            }
        }
    }
}

impl<K, V, S: HashStrategy<K>> LinkedMap<K, V, S> {
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        S: HashStrategy<Q>,
    {
        let k = self.table.raw().find(key)?;
        self.table.raw().get(k).map(|e| &e.value)
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        S: HashStrategy<Q>,
    {
        let k = self.table.raw().find(key)?;
        self.table.value_mut(k)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized,
        S: HashStrategy<Q>,
    {
        self.table.raw().find(key).is_some()
    }

    /// Map `key` to `value`. A new key goes to the end of the order; an
    /// existing one keeps its place.
    pub fn put(&mut self, key: K, value: V) -> Option<V> {
        let hash = self.table.raw().hash_of(&key);
        if let Some(k) = self.table.raw().find_hashed(hash, &key) {
            return self.table.value_mut(k).map(|v| mem::replace(v, value));
        }
        self.table.insert_newest(hash, key, value);
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
        self.remove_entry(key).map(|(_, v)| v)
    }

    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        S: HashStrategy<Q>,
    {
        let hash = self.table.raw().hash_of(key);
        let (previous, k) = self.table.raw().find_slot_hashed(hash, key)?;
        self.table.remove_entry(k, previous).map(|e| (e.key, e.value))
    }

    /// Key inserted right after `key`.
    pub fn next_key<Q>(&self, key: &Q) -> Option<&K>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        S: HashStrategy<Q>,
    {
        let k = self.table.raw().find(key)?;
        self.key_at(self.table.after(k))
    }

    /// Key inserted right before `key`.
    pub fn previous_key<Q>(&self, key: &Q) -> Option<&K>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        S: HashStrategy<Q>,
    {
        let k = self.table.raw().find(key)?;
        self.key_at(self.table.before(k))
    }

    /// Position of `key` in insertion order.
    pub fn index_of<Q>(&self, key: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        S: HashStrategy<Q>,
    {
        self.table.raw().find(key).map(|k| self.table.position(k))
    }

    pub fn reserve(&mut self, additional: usize) {
        self.table.reserve(additional);
    }

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

impl<K, V, S> LinkedMap<K, V, S>
where
    S: HashStrategy<K> + ValueEquivalence<V>,
{
    pub fn contains_value(&self, value: &V) -> bool {
        self.find_value(value).is_some()
    }
}

impl<K, V, S: HashStrategy<K>> Navigable for LinkedMap<K, V, S> {
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

impl<K, V, S, Q> FindKey<Q> for LinkedMap<K, V, S>
where
    K: Borrow<Q>,
    Q: ?Sized,
    S: HashStrategy<K> + HashStrategy<Q>,
{
    fn find_key_by(&self, key: &Q) -> Option<Handle> {
        self.table.raw().find(key).map(Handle::new)
    }
}

impl<K, V, S> FindValue for LinkedMap<K, V, S>
where
    S: HashStrategy<K> + ValueEquivalence<V>,
{
    fn values_equal(&self, a: &V, b: &V) -> bool {
        self.table.raw().strategy().values_equal(a, b)
    }
}

impl<K: Clone, V: Clone, S: Clone> Clone for LinkedMap<K, V, S> {
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone(),
        }
    }
}

/// Order-insensitive, like `HashedMap`: two linked maps are equal when they
/// hold the same mappings.
impl<K, V, S> PartialEq for LinkedMap<K, V, S>
where
    S: HashStrategy<K> + ValueEquivalence<V>,
{
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self.iter().all(|(k, v)| {
                other
                    .get(k)
                    .is_some_and(|ov| self.table.raw().strategy().values_equal(v, ov))
            })
    }
}

impl<K: fmt::Debug, V: fmt::Debug, S: HashStrategy<K>> fmt::Debug for LinkedMap<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, S: HashStrategy<K>> Extend<(K, V)> for LinkedMap<K, V, S> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        self.reserve(iter.size_hint().0);
        for (k, v) in iter {
            self.put(k, v);
        }
    }
}

impl<K, V, S: HashStrategy<K> + Default> FromIterator<(K, V)> for LinkedMap<K, V, S> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::default();
        map.extend(iter);
        map
    }
}

impl<'a, K, V, S: HashStrategy<K>> IntoIterator for &'a LinkedMap<K, V, S> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, LinkedMap<K, V, S>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Owning iterator in insertion order.
pub struct IntoIter<K, V, S>(LinkedMap<K, V, S>);

impl<K, V, S> Iterator for IntoIter<K, V, S> {
    type Item = (K, V);

    fn next(&mut self) -> Option<(K, V)> {
        self.0.pop_first()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.0.len(), Some(self.0.len()))
    }
}

impl<K, V, S> DoubleEndedIterator for IntoIter<K, V, S> {
    fn next_back(&mut self) -> Option<(K, V)> {
        self.0.pop_last()
    }
}

impl<K, V, S> ExactSizeIterator for IntoIter<K, V, S> {}

impl<K, V, S> IntoIterator for LinkedMap<K, V, S> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V, S>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter(self)
    }
}
