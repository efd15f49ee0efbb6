//! Bidirectional maps built from two ordinary tables.
//!
//! `DualBidiMap` owns a forward table `K -> V` and a reverse table `V -> K`
//! and keeps them a bijection: every forward pair `(k, v)` has the reverse
//! pair `(v, k)` and nothing else. Putting a value that is already bound to
//! another key silently unbinds that other key.
//!
//! The inverse view swaps the roles of the two tables without copying.
//! Because the map owns both tables, an inverse is a borrow of the map
//! (`inverse`, `inverse_mut`) or the map itself turned around
//! (`into_inverse`); asking an inverse for its inverse hands back the
//! original map.

use crate::cursor::{FindKey, FindValue, Handle, MapCursor, Navigable, TableId};
use crate::error::BidiError;
use crate::hashed_map::HashedMap;
use crate::linked_map::LinkedMap;
use crate::sorted_table::{SortedRange, SortedTable};
use crate::strategy::{HashStrategy, Natural};
use crate::view::{Entries, EntriesMut, Iter, Keys, KeysMut, Values, ValuesMut};
use core::fmt;
use core::marker::PhantomData;
use core::ops::{Bound, RangeBounds};

/// The table contract a bidi map is built from.
pub trait BidiTable<K, V> {
    type Iter<'a>: Iterator<Item = (&'a K, &'a V)>
    where
        Self: 'a,
        K: 'a,
        V: 'a;

    fn get(&self, key: &K) -> Option<&V>;

    fn contains_key(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    fn insert(&mut self, key: K, value: V) -> Option<V>;
    fn remove(&mut self, key: &K) -> Option<V>;
    fn len(&self) -> usize;
    fn clear(&mut self);
    fn iter(&self) -> Self::Iter<'_>;
}

impl<K, V, S: HashStrategy<K>> BidiTable<K, V> for HashedMap<K, V, S> {
    type Iter<'a> = Iter<'a, HashedMap<K, V, S>>
    where
        Self: 'a,
        K: 'a,
        V: 'a;

    fn get(&self, key: &K) -> Option<&V> {
        HashedMap::get(self, key)
    }

    fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.put(key, value)
    }

    fn remove(&mut self, key: &K) -> Option<V> {
        HashedMap::remove(self, key)
    }

    fn len(&self) -> usize {
        HashedMap::len(self)
    }

    fn clear(&mut self) {
        HashedMap::clear(self);
    }

    fn iter(&self) -> Self::Iter<'_> {
        HashedMap::iter(self)
    }
}

impl<K, V, S: HashStrategy<K>> BidiTable<K, V> for LinkedMap<K, V, S> {
    type Iter<'a> = Iter<'a, LinkedMap<K, V, S>>
    where
        Self: 'a,
        K: 'a,
        V: 'a;

    fn get(&self, key: &K) -> Option<&V> {
        LinkedMap::get(self, key)
    }

    fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.put(key, value)
    }

    fn remove(&mut self, key: &K) -> Option<V> {
        LinkedMap::remove(self, key)
    }

    fn len(&self) -> usize {
        LinkedMap::len(self)
    }

    fn clear(&mut self) {
        LinkedMap::clear(self);
    }

    fn iter(&self) -> Self::Iter<'_> {
        LinkedMap::iter(self)
    }
}

impl<K: Ord + Clone, V> BidiTable<K, V> for SortedTable<K, V> {
    type Iter<'a> = SortedRange<'a, K, V>
    where
        Self: 'a,
        K: 'a,
        V: 'a;

    fn get(&self, key: &K) -> Option<&V> {
        SortedTable::get(self, key)
    }

    fn insert(&mut self, key: K, value: V) -> Option<V> {
        SortedTable::insert(self, key, value)
    }

    fn remove(&mut self, key: &K) -> Option<V> {
        SortedTable::remove(self, key)
    }

    fn len(&self) -> usize {
        SortedTable::len(self)
    }

    fn clear(&mut self) {
        SortedTable::clear(self);
    }

    fn iter(&self) -> Self::Iter<'_> {
        SortedTable::iter(self)
    }
}

/// Install `key -> value` in `forward` and `value -> key` in `reverse`,
/// first dropping whatever either side was bound to.
fn put_pair<K, V, F, R>(forward: &mut F, reverse: &mut R, key: K, value: V) -> Option<V>
where
    K: Clone,
    V: Clone,
    F: BidiTable<K, V>,
    R: BidiTable<V, K>,
{
    if let Some(old_value) = forward.get(&key).cloned() {
        reverse.remove(&old_value);
    }
    if let Some(old_key) = reverse.get(&value).cloned() {
        forward.remove(&old_key);
    }
    let previous = forward.insert(key.clone(), value.clone());
    reverse.insert(value, key);
    previous
}

fn remove_pair<K, V, F, R>(forward: &mut F, reverse: &mut R, key: &K) -> Option<V>
where
    F: BidiTable<K, V>,
    R: BidiTable<V, K>,
{
    let value = forward.remove(key)?;
    reverse.remove(&value);
    Some(value)
}

pub struct DualBidiMap<K, V, F, R> {
    forward: F,
    reverse: R,
    marker: PhantomData<fn() -> (K, V)>,
}

pub type DualHashBidiMap<K, V, S = Natural> =
    DualBidiMap<K, V, HashedMap<K, V, S>, HashedMap<V, K, S>>;

/// Iterates in insertion order of the keys.
pub type DualLinkedBidiMap<K, V, S = Natural> =
    DualBidiMap<K, V, LinkedMap<K, V, S>, LinkedMap<V, K, S>>;

/// Keys and values both kept sorted by their `Ord`.
pub type DualTreeBidiMap<K, V> = DualBidiMap<K, V, SortedTable<K, V>, SortedTable<V, K>>;

impl<K, V, F: Default, R: Default> Default for DualBidiMap<K, V, F, R> {
    fn default() -> Self {
        Self {
            forward: F::default(),
            reverse: R::default(),
            marker: PhantomData,
        }
    }
}

impl<K, V, F, R> DualBidiMap<K, V, F, R>
where
    K: Clone,
    V: Clone,
    F: BidiTable<K, V>,
    R: BidiTable<V, K>,
{
    pub fn new() -> Self
    where
        F: Default,
        R: Default,
    {
        Self::default()
    }

    /// Bind `key` and `value` to each other, returning the value `key` was
    /// bound to. Any other key bound to `value` is removed.
    pub fn put(&mut self, key: K, value: V) -> Option<V> {
        put_pair(&mut self.forward, &mut self.reverse, key, value)
    }

    pub fn put_all<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.put(k, v);
        }
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.forward.get(key)
    }

    /// The key bound to `value`.
    pub fn key_for(&self, value: &V) -> Option<&K> {
        self.reverse.get(value)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.forward.contains_key(key)
    }

    /// A reverse-table lookup, not a scan.
    pub fn contains_value(&self, value: &V) -> bool {
        self.reverse.contains_key(value)
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        remove_pair(&mut self.forward, &mut self.reverse, key)
    }

    pub fn remove_by_value(&mut self, value: &V) -> Option<K> {
        remove_pair(&mut self.reverse, &mut self.forward, value)
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.len() == 0
    }

    pub fn clear(&mut self) {
        self.forward.clear();
        self.reverse.clear();
    }

    /// Mappings in the forward table's order.
    pub fn iter(&self) -> F::Iter<'_> {
        self.forward.iter()
    }

    pub fn forward(&self) -> &F {
        &self.forward
    }

    pub fn reverse(&self) -> &R {
        &self.reverse
    }

    pub fn inverse(&self) -> Inverse<'_, K, V, F, R> {
        Inverse { map: self }
    }

    pub fn inverse_mut(&mut self) -> InverseMut<'_, K, V, F, R> {
        InverseMut { map: self }
    }

    /// Turn the map around in O(1): values become keys.
    pub fn into_inverse(self) -> DualBidiMap<V, K, R, F> {
        DualBidiMap {
            forward: self.reverse,
            reverse: self.forward,
            marker: PhantomData,
        }
    }
}

impl<K, V, S> DualBidiMap<K, V, HashedMap<K, V, S>, HashedMap<V, K, S>>
where
    S: HashStrategy<K> + HashStrategy<V> + Clone,
{
    /// Both directions hashed with `strategy`.
    pub fn with_strategy(strategy: S) -> Self {
        Self {
            forward: HashedMap::with_strategy(strategy.clone()),
            reverse: HashedMap::with_strategy(strategy),
            marker: PhantomData,
        }
    }
}

impl<K, V, S> DualBidiMap<K, V, LinkedMap<K, V, S>, LinkedMap<V, K, S>>
where
    S: HashStrategy<K> + HashStrategy<V> + Clone,
{
    pub fn with_strategy(strategy: S) -> Self {
        Self {
            forward: LinkedMap::with_strategy(strategy.clone()),
            reverse: LinkedMap::with_strategy(strategy),
            marker: PhantomData,
        }
    }
}

/// Views and cursors walk the forward table. Removing through them also
/// removes the reverse pair; `set_value` refuses to break the bijection.
impl<K, V, F, R> DualBidiMap<K, V, F, R>
where
    K: Clone,
    V: Clone + PartialEq,
    F: BidiTable<K, V> + Navigable<Key = K, Value = V, Rejection = core::convert::Infallible>,
    R: BidiTable<V, K>,
{
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

impl<K, V, F, R> Navigable for DualBidiMap<K, V, F, R>
where
    K: Clone,
    V: Clone,
    F: BidiTable<K, V> + Navigable<Key = K, Value = V, Rejection = core::convert::Infallible>,
    R: BidiTable<V, K>,
{
    type Key = K;
    type Value = V;
    type Rejection = BidiError;

    fn table_id(&self) -> TableId {
        self.forward.table_id()
    }

    fn modification_count(&self) -> u64 {
        self.forward.modification_count()
    }

    fn len(&self) -> usize {
        Navigable::len(&self.forward)
    }

    fn first_handle(&self) -> Option<Handle> {
        self.forward.first_handle()
    }

    fn last_handle(&self) -> Option<Handle> {
        self.forward.last_handle()
    }

    fn handle_after(&self, h: Handle) -> Option<Handle> {
        self.forward.handle_after(h)
    }

    fn handle_before(&self, h: Handle) -> Option<Handle> {
        self.forward.handle_before(h)
    }

    fn find_key(&self, key: &K) -> Option<Handle> {
        self.forward.find_key(key)
    }

    fn entry(&self, h: Handle) -> Option<(&K, &V)> {
        self.forward.entry(h)
    }

    /// Rejected when `value` is already bound to a different key; the map
    /// is left untouched.
    fn replace_value(&mut self, h: Handle, value: V) -> Result<V, BidiError> {
        let key = match self.forward.entry(h) {
            Some((k, _)) => k.clone(),
            None => panic!("replace_value on a handle that is not live"),
        };
        if let Some(bound) = self.reverse.get(&value) {
            if self.forward.find_key(bound) != Some(h) {
                return Err(BidiError::ValueAlreadyBound);
            }
        }
        let old = match self.forward.replace_value(h, value.clone()) {
            Ok(old) => old,
            Err(never) => match never {},
        };
        self.reverse.remove(&old);
        self.reverse.insert(value, key);
        Ok(old)
    }

    fn remove_handle(&mut self, h: Handle) -> Option<(K, V)> {
        let (k, v) = self.forward.remove_handle(h)?;
        self.reverse.remove(&v);
        Some((k, v))
    }
}

impl<K, V, F, R, Q> FindKey<Q> for DualBidiMap<K, V, F, R>
where
    K: Clone,
    V: Clone,
    Q: ?Sized,
    F: BidiTable<K, V> + FindKey<Q> + Navigable<Key = K, Value = V, Rejection = core::convert::Infallible>,
    R: BidiTable<V, K>,
{
    fn find_key_by(&self, key: &Q) -> Option<Handle> {
        self.forward.find_key_by(key)
    }
}

impl<K, V, F, R> FindValue for DualBidiMap<K, V, F, R>
where
    K: Clone,
    V: Clone + PartialEq,
    F: BidiTable<K, V> + Navigable<Key = K, Value = V, Rejection = core::convert::Infallible>,
    R: BidiTable<V, K>,
{
    fn values_equal(&self, a: &V, b: &V) -> bool {
        a == b
    }

    fn find_value(&self, value: &V) -> Option<Handle> {
        let key = self.reverse.get(value)?;
        self.forward.find_key(key)
    }
}

impl<K, V, F: Clone, R: Clone> Clone for DualBidiMap<K, V, F, R> {
    fn clone(&self) -> Self {
        Self {
            forward: self.forward.clone(),
            reverse: self.reverse.clone(),
            marker: PhantomData,
        }
    }
}

impl<K, V, F: PartialEq, R> PartialEq for DualBidiMap<K, V, F, R> {
    fn eq(&self, other: &Self) -> bool {
        self.forward == other.forward
    }
}

impl<K, V, F, R> fmt::Debug for DualBidiMap<K, V, F, R>
where
    K: Clone + fmt::Debug,
    V: Clone + fmt::Debug,
    F: BidiTable<K, V>,
    R: BidiTable<V, K>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, F, R> Extend<(K, V)> for DualBidiMap<K, V, F, R>
where
    K: Clone,
    V: Clone,
    F: BidiTable<K, V>,
    R: BidiTable<V, K>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        self.put_all(iter);
    }
}

impl<K, V, F, R> FromIterator<(K, V)> for DualBidiMap<K, V, F, R>
where
    K: Clone,
    V: Clone,
    F: BidiTable<K, V> + Default,
    R: BidiTable<V, K> + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::default();
        map.put_all(iter);
        map
    }
}

/// Read-only inverse of a `DualBidiMap`: looks up keys by value.
pub struct Inverse<'a, K, V, F, R> {
    map: &'a DualBidiMap<K, V, F, R>,
}

impl<'a, K, V, F, R> Inverse<'a, K, V, F, R>
where
    K: Clone,
    V: Clone,
    F: BidiTable<K, V>,
    R: BidiTable<V, K>,
{
    pub fn get(&self, value: &V) -> Option<&'a K> {
        self.map.reverse.get(value)
    }

    pub fn key_for(&self, key: &K) -> Option<&'a V> {
        self.map.forward.get(key)
    }

    pub fn contains_key(&self, value: &V) -> bool {
        self.map.reverse.contains_key(value)
    }

    pub fn contains_value(&self, key: &K) -> bool {
        self.map.forward.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> R::Iter<'a> {
        self.map.reverse.iter()
    }

    /// The original map.
    pub fn inverse(&self) -> &'a DualBidiMap<K, V, F, R> {
        self.map
    }
}

/// Mutable inverse of a `DualBidiMap`: binds and removes by value.
pub struct InverseMut<'a, K, V, F, R> {
    map: &'a mut DualBidiMap<K, V, F, R>,
}

impl<K, V, F, R> InverseMut<'_, K, V, F, R>
where
    K: Clone,
    V: Clone,
    F: BidiTable<K, V>,
    R: BidiTable<V, K>,
{
    /// Bind `value` to `key`, returning the key `value` was bound to.
    pub fn put(&mut self, value: V, key: K) -> Option<K> {
        put_pair(&mut self.map.reverse, &mut self.map.forward, value, key)
    }

    pub fn get(&self, value: &V) -> Option<&K> {
        self.map.reverse.get(value)
    }

    pub fn key_for(&self, key: &K) -> Option<&V> {
        self.map.forward.get(key)
    }

    pub fn contains_key(&self, value: &V) -> bool {
        self.map.reverse.contains_key(value)
    }

    pub fn contains_value(&self, key: &K) -> bool {
        self.map.forward.contains_key(key)
    }

    pub fn remove(&mut self, value: &V) -> Option<K> {
        self.map.remove_by_value(value)
    }

    pub fn remove_by_value(&mut self, key: &K) -> Option<V> {
        self.map.remove(key)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }

    pub fn iter(&self) -> R::Iter<'_> {
        self.map.reverse.iter()
    }

    pub fn inverse(&self) -> &DualBidiMap<K, V, F, R> {
        self.map
    }

    pub fn inverse_mut(&mut self) -> &mut DualBidiMap<K, V, F, R> {
        self.map
    }
}

impl<K, V> DualTreeBidiMap<K, V>
where
    K: Ord + Clone,
    V: Ord + Clone,
{
    pub fn first_key(&self) -> Option<&K> {
        self.forward.first_key_value().map(|(k, _)| k)
    }

    pub fn last_key(&self) -> Option<&K> {
        self.forward.last_key_value().map(|(k, _)| k)
    }

    /// Smallest key greater than `key`.
    pub fn next_key(&self, key: &K) -> Option<&K> {
        self.forward
            .range((Bound::Excluded(key), Bound::Unbounded))
            .next()
            .map(|(k, _)| k)
    }

    /// Largest key less than `key`.
    pub fn previous_key(&self, key: &K) -> Option<&K> {
        self.forward.range(..key).next_back().map(|(k, _)| k)
    }

    /// The mappings whose keys fall in `bounds`.
    ///
    /// Panics, like `BTreeMap::range`, if the range is inverted.
    pub fn range<B: RangeBounds<K>>(&self, bounds: B) -> RangeView<'_, K, V> {
        RangeView {
            map: self,
            bounds: KeyRange::new(bounds),
        }
    }

    pub fn range_mut<B: RangeBounds<K>>(&mut self, bounds: B) -> RangeViewMut<'_, K, V> {
        RangeViewMut {
            map: self,
            bounds: KeyRange::new(bounds),
        }
    }

    /// Keys strictly less than `to`.
    pub fn head_map(&self, to: &K) -> RangeView<'_, K, V> {
        self.range((Bound::Unbounded, Bound::Excluded(to.clone())))
    }

    /// Keys greater than or equal to `from`.
    pub fn tail_map(&self, from: &K) -> RangeView<'_, K, V> {
        self.range((Bound::Included(from.clone()), Bound::Unbounded))
    }

    /// Keys in `from..to`.
    pub fn sub_map(&self, from: &K, to: &K) -> RangeView<'_, K, V> {
        self.range((Bound::Included(from.clone()), Bound::Excluded(to.clone())))
    }
}

#[derive(Clone, Debug)]
struct KeyRange<K> {
    lower: Bound<K>,
    upper: Bound<K>,
}

impl<K: Ord + Clone> KeyRange<K> {
    fn new<B: RangeBounds<K>>(bounds: B) -> Self {
        Self {
            lower: bounds.start_bound().cloned(),
            upper: bounds.end_bound().cloned(),
        }
    }

    fn as_ref(&self) -> (Bound<&K>, Bound<&K>) {
        (self.lower.as_ref(), self.upper.as_ref())
    }

    fn contains(&self, key: &K) -> bool {
        self.as_ref().contains(key)
    }
}

/// Key-range view of a `DualTreeBidiMap`. Value queries consult the full
/// reverse table and then check that the bound key is in range.
pub struct RangeView<'a, K, V> {
    map: &'a DualTreeBidiMap<K, V>,
    bounds: KeyRange<K>,
}

impl<'a, K: Ord + Clone, V: Ord + Clone> RangeView<'a, K, V> {
    pub fn get(&self, key: &K) -> Option<&'a V> {
        if !self.bounds.contains(key) {
            return None;
        }
        self.map.get(key)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    pub fn key_for(&self, value: &V) -> Option<&'a K> {
        self.map.key_for(value).filter(|k| self.bounds.contains(k))
    }

    pub fn contains_value(&self, value: &V) -> bool {
        self.key_for(value).is_some()
    }

    pub fn iter(&self) -> SortedRange<'a, K, V> {
        self.map.forward.range(self.bounds.as_ref())
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    pub fn first_key(&self) -> Option<&'a K> {
        self.iter().next().map(|(k, _)| k)
    }

    pub fn last_key(&self) -> Option<&'a K> {
        self.iter().next_back().map(|(k, _)| k)
    }
}

/// Key-range view of a `DualTreeBidiMap` that removes through both tables.
pub struct RangeViewMut<'a, K, V> {
    map: &'a mut DualTreeBidiMap<K, V>,
    bounds: KeyRange<K>,
}

impl<K: Ord + Clone, V: Ord + Clone> RangeViewMut<'_, K, V> {
    pub fn get(&self, key: &K) -> Option<&V> {
        if !self.bounds.contains(key) {
            return None;
        }
        self.map.get(key)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    pub fn key_for(&self, value: &V) -> Option<&K> {
        self.map.key_for(value).filter(|k| self.bounds.contains(k))
    }

    pub fn contains_value(&self, value: &V) -> bool {
        self.key_for(value).is_some()
    }

    pub fn iter(&self) -> SortedRange<'_, K, V> {
        self.map.forward.range(self.bounds.as_ref())
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    /// Bind `key` to `value` in the full map.
    ///
    /// Panics if `key` is outside the view's range.
    pub fn put(&mut self, key: K, value: V) -> Option<V> {
        assert!(self.bounds.contains(&key), "key is outside the range of this view");
        self.map.put(key, value)
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        if !self.bounds.contains(key) {
            return None;
        }
        self.map.remove(key)
    }

    /// Remove the mapping for `value` if its key is in range.
    pub fn remove_by_value(&mut self, value: &V) -> Option<K> {
        let key = self.key_for(value)?.clone();
        self.map.remove(&key)?;
        Some(key)
    }

    /// Remove every in-range mapping from both tables.
    pub fn clear(&mut self) {
        let keys: Vec<K> = self.iter().map(|(k, _)| k.clone()).collect();
        for k in &keys {
            self.map.remove(k);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_bijection<F, R>(m: &DualBidiMap<i32, String, F, R>)
    where
        F: BidiTable<i32, String>,
        R: BidiTable<String, i32>,
    {
        assert_eq!(m.forward().len(), m.reverse().len());
        for (k, v) in m.iter() {
            assert_eq!(m.key_for(v), Some(k));
        }
    }

    /// Invariant: re-binding a value to a new key unbinds the old key from
    /// both tables.
    #[test]
    fn rebinding_value_unbinds_old_key() {
        let mut m: DualHashBidiMap<i32, String> = DualBidiMap::new();
        m.put(1, "x".to_string());
        m.put(2, "x".to_string());
        assert_eq!(m.len(), 1);
        assert_eq!(m.get(&2).map(String::as_str), Some("x"));
        assert_eq!(m.key_for(&"x".to_string()), Some(&2));
        assert!(!m.contains_key(&1));
        assert_eq!(m.reverse().len(), 1);
        assert_bijection(&m);
    }

    /// Invariant: re-binding a key to a new value frees the old value.
    #[test]
    fn rebinding_key_frees_old_value() {
        let mut m: DualLinkedBidiMap<i32, String> = DualBidiMap::new();
        assert_eq!(m.put(1, "x".to_string()), None);
        assert_eq!(m.put(1, "y".to_string()), Some("x".to_string()));
        assert!(!m.contains_value(&"x".to_string()));
        assert_eq!(m.key_for(&"y".to_string()), Some(&1));
        assert_bijection(&m);
    }

    /// Invariant: the inverse of the inverse is the original map itself.
    #[test]
    fn inverse_of_inverse_is_self() {
        let mut m: DualHashBidiMap<i32, String> = DualBidiMap::new();
        m.put(1, "a".to_string());
        let inv = m.inverse();
        assert_eq!(inv.get(&"a".to_string()), Some(&1));
        assert!(core::ptr::eq(inv.inverse(), &m));

        let mut inv = m.inverse_mut();
        assert_eq!(inv.put("b".to_string(), 2), None);
        assert_eq!(inv.put("a".to_string(), 3), Some(1));
        assert_eq!(inv.get(&"b".to_string()), Some(&2));
        assert_eq!(m.get(&3).map(String::as_str), Some("a"));
        assert!(!m.contains_key(&1));
        assert_bijection(&m);

        let flipped = m.into_inverse();
        assert_eq!(flipped.get(&"b".to_string()), Some(&2));
    }

    /// Invariant: removal through a view or cursor drops the reverse pair
    /// too.
    #[test]
    fn view_and_cursor_removal_updates_reverse() {
        let mut m: DualLinkedBidiMap<i32, String> =
            (0..5).map(|i| (i, format!("v{i}"))).collect();
        assert!(m.values_mut().remove(&"v1".to_string()));
        assert!(m.keys_mut().remove(&2));
        assert!(!m.contains_value(&"v2".to_string()));
        let mut cur = m.cursor();
        cur.next(&m);
        assert_eq!(cur.remove(&mut m), (0, "v0".to_string()));
        assert_eq!(m.key_for(&"v0".to_string()), None);
        assert_eq!(m.len(), 2);
        assert_bijection(&m);
    }

    /// Invariant: set_value through a cursor refuses a value bound to a
    /// different key and leaves the map unchanged.
    #[test]
    fn cursor_set_value_guards_bijection() {
        let mut m: DualLinkedBidiMap<i32, String> = DualBidiMap::new();
        m.put(1, "a".to_string());
        m.put(2, "b".to_string());
        let mut cur = m.cursor();
        cur.next(&m);
        assert_eq!(
            cur.set_value(&mut m, "b".to_string()),
            Err(BidiError::ValueAlreadyBound)
        );
        assert_eq!(cur.set_value(&mut m, "a".to_string()), Ok("a".to_string()));
        assert_eq!(cur.set_value(&mut m, "c".to_string()), Ok("a".to_string()));
        assert_eq!(m.key_for(&"c".to_string()), Some(&1));
        assert!(!m.contains_value(&"a".to_string()));
        assert_eq!(cur.next(&m).map(|(k, _)| *k), Some(2));
        assert_bijection(&m);
    }

    /// Invariant: the sorted variant walks its views and cursor in key
    /// order, and removal through them drops the reverse pair.
    #[test]
    fn tree_views_and_cursor_keep_reverse() {
        let mut m: DualTreeBidiMap<i32, String> =
            [3, 1, 4, 0, 2].iter().map(|i| (*i, format!("v{i}"))).collect();
        let keys: Vec<i32> = m.keys().iter().copied().collect();
        assert_eq!(keys, [0, 1, 2, 3, 4]);
        assert!(m.values().contains(&"v3".to_string()));
        assert!(m.values_mut().remove(&"v1".to_string()));
        assert!(m.keys_mut().remove(&2));
        m.entries_mut().retain(|k, _| *k != 4);
        assert_eq!(m.key_for(&"v1".to_string()), None);
        assert_eq!(m.key_for(&"v4".to_string()), None);

        let mut cur = m.cursor();
        assert_eq!(cur.next(&m).map(|(k, _)| *k), Some(0));
        assert_eq!(cur.remove(&mut m), (0, "v0".to_string()));
        assert_eq!(cur.next(&m).map(|(k, _)| *k), Some(3));
        assert_eq!(cur.set_value(&mut m, "w3".to_string()), Ok("v3".to_string()));
        assert_eq!(m.key_for(&"w3".to_string()), Some(&3));
        assert!(!m.contains_value(&"v3".to_string()));
        assert_eq!(m.len(), 1);
        assert_bijection(&m);
    }

    /// Invariant: range views answer value queries and clear through the
    /// full reverse table.
    #[test]
    fn tree_range_views() {
        let mut m: DualTreeBidiMap<i32, String> =
            (1..=6).map(|i| (i, format!("v{i}"))).collect();
        assert_eq!(m.first_key(), Some(&1));
        assert_eq!(m.last_key(), Some(&6));
        assert_eq!(m.next_key(&3), Some(&4));
        assert_eq!(m.previous_key(&3), Some(&2));
        assert_eq!(m.previous_key(&1), None);

        let head = m.head_map(&3);
        assert_eq!(head.len(), 2);
        assert!(head.contains_value(&"v2".to_string()));
        assert!(!head.contains_value(&"v5".to_string()));
        assert_eq!(m.tail_map(&5).first_key(), Some(&5));
        assert_eq!(m.sub_map(&2, &5).last_key(), Some(&4));

        let mut mid = m.range_mut(2..=4);
        assert_eq!(mid.remove_by_value(&"v6".to_string()), None);
        assert_eq!(mid.remove_by_value(&"v3".to_string()), Some(3));
        mid.clear();
        assert!(mid.is_empty());
        assert_eq!(m.len(), 3);
        assert_eq!(m.key_for(&"v4".to_string()), None);
        assert_eq!(m.reverse().len(), 3);
        assert_bijection(&m);
    }
}
