//! HashedMap: the plain façade over the hash table core.
//!
//! Navigation order is bucket order: stable while the map is not
//! structurally modified, otherwise unspecified.

use crate::config::TableConfig;
use crate::cursor::{FindKey, FindValue, Handle, MapCursor, Navigable, TableId};
use crate::error::Result;
use crate::raw_table::{Entry, RawTable};
use crate::strategy::{CaseInsensitive, HashStrategy, Identity, Natural, ValueEquivalence};
use crate::view::{Entries, EntriesMut, Iter, Keys, KeysMut, Values, ValuesMut};
use core::borrow::Borrow;
use core::convert::Infallible;
use core::fmt;
use core::mem;
use slotmap::DefaultKey;

/// A chained hash map with a pluggable hashing strategy `S`.
pub struct HashedMap<K, V, S = Natural> {
    table: RawTable<K, V, S>,
}

/// Keys and values compared by the address they point at.
pub type IdentityMap<K, V> = HashedMap<K, V, Identity>;

/// String keys compared without regard to case.
pub type CaseInsensitiveMap<V> = HashedMap<String, V, CaseInsensitive>;

impl<K, V> HashedMap<K, V> {
    pub fn new() -> Self {
        Self::with_strategy(Natural::default())
    }

    /// A map with room for at least `capacity` buckets.
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        Self::with_config(TableConfig::with_capacity(capacity), Natural::default())
    }
}

impl<K, V, S: Default> Default for HashedMap<K, V, S> {
    fn default() -> Self {
        Self::with_strategy(S::default())
    }
}

impl<K, V, S> HashedMap<K, V, S> {
    pub fn with_strategy(strategy: S) -> Self {
        Self {
            table: RawTable::new(strategy),
        }
    }

    pub fn with_config(config: TableConfig, strategy: S) -> Result<Self> {
        Ok(Self {
            table: RawTable::with_config(&config, strategy)?,
        })
    }

    pub fn strategy(&self) -> &S {
        self.table.strategy()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.len() == 0
    }

    /// Current bucket count.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Chain walk agrees with the arena; returns keys in bucket order.
    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) -> Vec<&K> {
        let slots = self.table.assert_chains_consistent();
        slots.into_iter().filter_map(|k| self.table.get(k)).map(|e| &e.key).collect()
    }

    /// Mutable iteration in unspecified order. Not a structural change.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&K, &mut V)> {
        self.table.entries_mut().map(|(_, e)| (&e.key, &mut e.value))
    }

    pub fn retain<F: FnMut(&K, &mut V) -> bool>(&mut self, mut keep: F) {
        let mut cur = self.table.first();
        while let Some(k) = cur {
            cur = self.table.after(k);
            let discard = match self.table.get_mut(k) {
                Some(e) => !keep(&e.key, &mut e.value),
                None => false,
            };
            if discard {
                self.table.unlink(k);
            }
        }
    }
}

impl<K, V, S: HashStrategy<K>> HashedMap<K, V, S> {
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        S: HashStrategy<Q>,
    {
        let k = self.table.find(key)?;
        self.table.get(k).map(|e| &e.value)
    }

    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        S: HashStrategy<Q>,
    {
        let k = self.table.find(key)?;
        self.table.get(k).map(|e| (&e.key, &e.value))
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        S: HashStrategy<Q>,
    {
        let k = self.table.find(key)?;
        self.table.get_mut(k).map(|e| &mut e.value)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized,
        S: HashStrategy<Q>,
    {
        self.table.find(key).is_some()
    }

    /// Map `key` to `value`, returning the value it replaced. An existing
    /// key keeps the spelling it was first inserted with.
    pub fn put(&mut self, key: K, value: V) -> Option<V> {
        let hash = self.table.hash_of(&key);
        if let Some(k) = self.table.find_hashed(hash, &key) {
            return self
                .table
                .get_mut(k)
                .map(|e| mem::replace(&mut e.value, value));
        }
        self.table.insert_new(hash, key, value, ());
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
        let hash = self.table.hash_of(key);
        let (previous, k) = self.table.find_slot_hashed(hash, key)?;
        self.table.remove_entry(k, previous).map(|e| (e.key, e.value))
    }

    /// Make room for `additional` more entries without resizing.
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

    /// Key view whose removals write through to the map.
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

impl<K, V, S> HashedMap<K, V, S>
where
    S: HashStrategy<K> + ValueEquivalence<V>,
{
    /// Linear scan for a value equal under the strategy's value equivalence.
    pub fn contains_value(&self, value: &V) -> bool {
        self.find_value(value).is_some()
    }
}

impl<K, V, S: HashStrategy<K>> Navigable for HashedMap<K, V, S> {
    type Key = K;
    type Value = V;
    type Rejection = Infallible;

    fn table_id(&self) -> TableId {
        self.table.id()
    }

    fn modification_count(&self) -> u64 {
        self.table.mod_count()
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
        self.table.find(key).map(Handle::new)
    }

    fn entry(&self, h: Handle) -> Option<(&K, &V)> {
        self.table.get(h.raw_handle()).map(|e| (&e.key, &e.value))
    }

    fn replace_value(&mut self, h: Handle, value: V) -> core::result::Result<V, Infallible> {
        match self.table.get_mut(h.raw_handle()) {
            Some(e) => Ok(mem::replace(&mut e.value, value)),
            None => panic!("replace_value on a handle that is not live"),
        }
    }

    fn remove_handle(&mut self, h: Handle) -> Option<(K, V)> {
        self.table.unlink(h.raw_handle()).map(|e| (e.key, e.value))
    }
}

impl<K, V, S, Q> FindKey<Q> for HashedMap<K, V, S>
where
    K: Borrow<Q>,
    Q: ?Sized,
    S: HashStrategy<K> + HashStrategy<Q>,
{
    fn find_key_by(&self, key: &Q) -> Option<Handle> {
        self.table.find(key).map(Handle::new)
    }
}

impl<K, V, S> FindValue for HashedMap<K, V, S>
where
    S: HashStrategy<K> + ValueEquivalence<V>,
{
    fn values_equal(&self, a: &V, b: &V) -> bool {
        self.table.strategy().values_equal(a, b)
    }
}

impl<K: Clone, V: Clone, S: Clone> Clone for HashedMap<K, V, S> {
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone(),
        }
    }
}

impl<K, V, S> PartialEq for HashedMap<K, V, S>
where
    S: HashStrategy<K> + ValueEquivalence<V>,
{
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self.iter().all(|(k, v)| {
                other
                    .get(k)
                    .is_some_and(|ov| self.table.strategy().values_equal(v, ov))
            })
    }
}

impl<K: fmt::Debug, V: fmt::Debug, S: HashStrategy<K>> fmt::Debug for HashedMap<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, S: HashStrategy<K>> Extend<(K, V)> for HashedMap<K, V, S> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        self.reserve(iter.size_hint().0);
        for (k, v) in iter {
            self.put(k, v);
        }
    }
}

impl<K, V, S: HashStrategy<K> + Default> FromIterator<(K, V)> for HashedMap<K, V, S> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::default();
        map.extend(iter);
        map
    }
}

impl<'a, K, V, S: HashStrategy<K>> IntoIterator for &'a HashedMap<K, V, S> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, HashedMap<K, V, S>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Owning iterator, in unspecified order.
pub struct IntoIter<K, V>(slotmap::basic::IntoIter<DefaultKey, Entry<K, V, ()>>);

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<(K, V)> {
        self.0.next().map(|(_, e)| (e.key, e.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl<K, V, S> IntoIterator for HashedMap<K, V, S> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter(self.table.into_entries())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    /// Invariant: put returns the replaced value and never grows len for an
    /// existing key; remove returns the value exactly once.
    #[test]
    fn put_get_remove_contract() {
        let mut m = HashedMap::new();
        assert_eq!(m.put("a".to_string(), 1), None);
        assert_eq!(m.put("a".to_string(), 2), Some(1));
        assert_eq!(m.len(), 1);
        assert_eq!(m.get("a"), Some(&2));
        assert!(m.contains_key("a"));
        assert!(m.contains_value(&2));
        assert!(!m.contains_value(&1));
        assert_eq!(m.remove("a"), Some(2));
        assert_eq!(m.remove("a"), None);
        assert!(m.is_empty());
    }

    /// Invariant: identity maps keep equal-but-distinct allocations apart.
    #[test]
    fn identity_map_distinguishes_allocations() {
        let a = Rc::new("k".to_string());
        let b = Rc::new("k".to_string());
        let mut m: IdentityMap<Rc<String>, i32> = IdentityMap::default();
        m.put(Rc::clone(&a), 1);
        m.put(Rc::clone(&b), 2);
        assert_eq!(m.len(), 2);
        assert_eq!(m.get(&a), Some(&1));
        assert_eq!(m.get(&Rc::clone(&b)), Some(&2));
        assert!(m.get(&Rc::new("k".to_string())).is_none());
    }

    /// Invariant: case-insensitive keys collide and keep the first spelling.
    #[test]
    fn case_insensitive_keeps_first_spelling() {
        let mut m: CaseInsensitiveMap<i32> = CaseInsensitiveMap::default();
        m.put("Content-Type".to_string(), 1);
        assert_eq!(m.put("CONTENT-TYPE".to_string(), 2), Some(1));
        assert_eq!(m.len(), 1);
        assert_eq!(m.get("content-type"), Some(&2));
        assert_eq!(m.keys().iter().next().map(String::as_str), Some("Content-Type"));
    }

    /// Invariant: retain removes exactly the rejected entries and keeps the
    /// chains consistent.
    #[test]
    fn retain_and_iter_mut() {
        let mut m: HashedMap<i32, i32> = (0..50).map(|i| (i, i)).collect();
        for (_, v) in m.iter_mut() {
            *v *= 10;
        }
        m.retain(|k, _| k % 3 == 0);
        assert_eq!(m.len(), 17);
        assert_eq!(m.get(&9), Some(&90));
        assert!(m.get(&10).is_none());
        assert_eq!(m.table.assert_chains_consistent().len(), 17);
    }

    /// Invariant: equality ignores bucket layout and insertion order.
    #[test]
    fn equality_and_clone() {
        let a: HashedMap<i32, &str> = [(1, "x"), (2, "y")].into_iter().collect();
        let mut b = HashedMap::with_capacity(64).unwrap();
        b.put(2, "y");
        b.put(1, "x");
        assert_eq!(a, b);
        let c = a.clone();
        assert_eq!(a, c);
        assert_ne!(a.table_id(), c.table_id());
        b.put(3, "z");
        assert_ne!(a, b);
    }

    /// Invariant: iteration visits every entry once, forwards and backwards.
    #[test]
    fn iteration_is_double_ended() {
        let m: HashedMap<i32, i32> = (0..20).map(|i| (i, -i)).collect();
        let forward: Vec<_> = m.iter().map(|(k, _)| *k).collect();
        let mut backward: Vec<_> = m.iter().rev().map(|(k, _)| *k).collect();
        backward.reverse();
        assert_eq!(forward, backward);
        let mut sorted = forward.clone();
        sorted.sort();
        assert_eq!(sorted, (0..20).collect::<Vec<_>>());
        assert_eq!(m.iter().len(), 20);
        let mut owned: Vec<_> = m.into_iter().collect();
        owned.sort();
        assert_eq!(owned[3], (3, -3));
    }
}
