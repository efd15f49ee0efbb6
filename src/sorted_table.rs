//! SortedTable: a key-ordered table with stable handles.
//!
//! Entries live in a slotmap arena and a `BTreeMap` indexes them by key, so
//! a `Handle` to an entry survives unrelated inserts and removals exactly as
//! it does in the hashed tables. Navigation from a handle goes through the
//! index (`O(log n)` per step). This is what lets the sorted bidi variant
//! share the views and the detached cursor of the hashed ones.

use crate::cursor::{FindKey, Handle, Navigable, TableId};
use core::borrow::Borrow;
use core::convert::Infallible;
use core::fmt;
use core::mem;
use core::ops::{Bound, RangeBounds};
use slotmap::{DefaultKey, SlotMap};
use std::collections::btree_map;
use std::collections::BTreeMap;

pub struct SortedTable<K, V> {
    id: TableId,
    index: BTreeMap<K, DefaultKey>,
    slots: SlotMap<DefaultKey, (K, V)>,
    mod_count: u64,
}

impl<K, V> Default for SortedTable<K, V> {
    fn default() -> Self {
        Self {
            id: TableId::next(),
            index: BTreeMap::new(),
            slots: SlotMap::new(),
            mod_count: 0,
        }
    }
}

impl<K, V> SortedTable<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn touch(&mut self) {
        self.mod_count = self.mod_count.wrapping_add(1);
    }

    pub fn clear(&mut self) {
        self.index.clear();
        self.slots.clear();
        self.touch();
    }
}

impl<K: Ord + Clone, V> SortedTable<K, V> {
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let k = self.index.get(key)?;
        self.slots.get(*k).map(|(_, v)| v)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.index.contains_key(key)
    }

    /// Insert or update. Updating an existing key keeps its handle and is
    /// not a structural change.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        if let Some(k) = self.index.get(&key) {
            if let Some(slot) = self.slots.get_mut(*k) {
                return Some(mem::replace(&mut slot.1, value));
            }
        }
        let k = self.slots.insert((key.clone(), value));
        self.index.insert(key, k);
        self.touch();
        None
    }

    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let k = self.index.remove(key)?;
        self.touch();
        self.slots.remove(k).map(|(_, v)| v)
    }

    pub fn first_key_value(&self) -> Option<(&K, &V)> {
        self.iter().next()
    }

    pub fn last_key_value(&self) -> Option<(&K, &V)> {
        self.iter().next_back()
    }

    /// Entries whose keys fall in `range`, in key order.
    ///
    /// Panics, like `BTreeMap::range`, if the range is inverted.
    pub fn range<Q, R>(&self, range: R) -> SortedRange<'_, K, V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
        R: RangeBounds<Q>,
    {
        SortedRange {
            inner: self.index.range(range),
            slots: &self.slots,
        }
    }

    pub fn iter(&self) -> SortedRange<'_, K, V> {
        self.range::<K, _>(..)
    }

    fn neighbour_after(&self, key: &K) -> Option<Handle> {
        self.index
            .range((Bound::Excluded(key), Bound::Unbounded))
            .next()
            .map(|(_, k)| Handle::new(*k))
    }

    fn neighbour_before(&self, key: &K) -> Option<Handle> {
        self.index
            .range(..key)
            .next_back()
            .map(|(_, k)| Handle::new(*k))
    }
}

/// Key-ordered iterator over a slice of a `SortedTable`.
pub struct SortedRange<'a, K, V> {
    inner: btree_map::Range<'a, K, DefaultKey>,
    slots: &'a SlotMap<DefaultKey, (K, V)>,
}

impl<K, V> Clone for SortedRange<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            slots: self.slots,
        }
    }
}

impl<'a, K, V> Iterator for SortedRange<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let (_, k) = self.inner.next()?;
        self.slots.get(*k).map(|(key, value)| (key, value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for SortedRange<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let (_, k) = self.inner.next_back()?;
        self.slots.get(*k).map(|(key, value)| (key, value))
    }
}

impl<K: Ord + Clone, V> Navigable for SortedTable<K, V> {
    type Key = K;
    type Value = V;
    type Rejection = Infallible;

    fn table_id(&self) -> TableId {
        self.id
    }

    fn modification_count(&self) -> u64 {
        self.mod_count
    }

    fn len(&self) -> usize {
        self.slots.len()
    }

    fn first_handle(&self) -> Option<Handle> {
        self.index.values().next().map(|k| Handle::new(*k))
    }

    fn last_handle(&self) -> Option<Handle> {
        self.index.values().next_back().map(|k| Handle::new(*k))
    }

    fn handle_after(&self, h: Handle) -> Option<Handle> {
        let (key, _) = self.slots.get(h.raw_handle())?;
        self.neighbour_after(key)
    }

    fn handle_before(&self, h: Handle) -> Option<Handle> {
        let (key, _) = self.slots.get(h.raw_handle())?;
        self.neighbour_before(key)
    }

    fn find_key(&self, key: &K) -> Option<Handle> {
        self.index.get(key).map(|k| Handle::new(*k))
    }

    fn entry(&self, h: Handle) -> Option<(&K, &V)> {
        self.slots.get(h.raw_handle()).map(|(k, v)| (k, v))
    }

    fn replace_value(&mut self, h: Handle, value: V) -> Result<V, Infallible> {
        match self.slots.get_mut(h.raw_handle()) {
            Some(slot) => Ok(mem::replace(&mut slot.1, value)),
            None => panic!("replace_value on a handle that is not live"),
        }
    }

    fn remove_handle(&mut self, h: Handle) -> Option<(K, V)> {
        let (key, value) = self.slots.remove(h.raw_handle())?;
        self.index.remove(&key);
        self.touch();
        Some((key, value))
    }
}

impl<K, V, Q> FindKey<Q> for SortedTable<K, V>
where
    K: Ord + Clone + Borrow<Q>,
    Q: ?Sized + Ord,
{
    fn find_key_by(&self, key: &Q) -> Option<Handle> {
        self.index.get(key).map(|k| Handle::new(*k))
    }
}

/// A clone is a new table: cursors of the original do not work on it.
impl<K: Clone, V: Clone> Clone for SortedTable<K, V> {
    fn clone(&self) -> Self {
        Self {
            id: TableId::next(),
            index: self.index.clone(),
            slots: self.slots.clone(),
            mod_count: 0,
        }
    }
}

impl<K: Ord + Clone, V: PartialEq> PartialEq for SortedTable<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<K: Ord + Clone + fmt::Debug, V: fmt::Debug> fmt::Debug for SortedTable<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
