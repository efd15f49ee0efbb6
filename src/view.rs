//! Live key, value and entry views.
//!
//! Views are projections of a `Navigable` map, never copies. The read views
//! borrow the map shared; the `*Mut` views borrow it exclusively and write
//! removals straight through (for a bidi map that includes the reverse
//! table). No view can insert.

use crate::cursor::{FindKey, FindValue, Handle, Navigable};
use core::fmt;
use core::iter::FusedIterator;

/// Double-ended iterator over a `Navigable` map in its navigation order.
pub struct Iter<'a, M: ?Sized> {
    map: &'a M,
    front: Option<Handle>,
    back: Option<Handle>,
    remaining: usize,
}

impl<'a, M: Navigable + ?Sized> Iter<'a, M> {
    pub(crate) fn new(map: &'a M) -> Self {
        Self {
            map,
            front: map.first_handle(),
            back: map.last_handle(),
            remaining: map.len(),
        }
    }
}

impl<M: ?Sized> Clone for Iter<'_, M> {
    fn clone(&self) -> Self {
        Self {
            map: self.map,
            front: self.front,
            back: self.back,
            remaining: self.remaining,
        }
    }
}

impl<'a, M: Navigable + ?Sized> Iterator for Iter<'a, M> {
    type Item = (&'a M::Key, &'a M::Value);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let h = self.front?;
        self.front = self.map.handle_after(h);
        self.remaining -= 1;
        self.map.entry(h)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<M: Navigable + ?Sized> DoubleEndedIterator for Iter<'_, M> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let h = self.back?;
        self.back = self.map.handle_before(h);
        self.remaining -= 1;
        self.map.entry(h)
    }
}

impl<M: Navigable + ?Sized> ExactSizeIterator for Iter<'_, M> {}
impl<M: Navigable + ?Sized> FusedIterator for Iter<'_, M> {}

pub struct KeyIter<'a, M: ?Sized>(Iter<'a, M>);

impl<'a, M: Navigable + ?Sized> Iterator for KeyIter<'a, M> {
    type Item = &'a M::Key;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl<M: Navigable + ?Sized> DoubleEndedIterator for KeyIter<'_, M> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.0.next_back().map(|(k, _)| k)
    }
}

impl<M: Navigable + ?Sized> ExactSizeIterator for KeyIter<'_, M> {}

pub struct ValueIter<'a, M: ?Sized>(Iter<'a, M>);

impl<'a, M: Navigable + ?Sized> Iterator for ValueIter<'a, M> {
    type Item = &'a M::Value;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl<M: Navigable + ?Sized> DoubleEndedIterator for ValueIter<'_, M> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.0.next_back().map(|(_, v)| v)
    }
}

impl<M: Navigable + ?Sized> ExactSizeIterator for ValueIter<'_, M> {}

/// Remove every entry for which `keep` returns false, in navigation order.
pub(crate) fn retain_entries<M, F>(map: &mut M, mut keep: F)
where
    M: Navigable + ?Sized,
    F: FnMut(&M::Key, &M::Value) -> bool,
{
    let mut cur = map.first_handle();
    while let Some(h) = cur {
        cur = map.handle_after(h);
        let discard = match map.entry(h) {
            Some((k, v)) => !keep(k, v),
            None => false,
        };
        if discard {
            map.remove_handle(h);
        }
    }
}

fn clear_entries<M: Navigable + ?Sized>(map: &mut M) {
    retain_entries(map, |_, _| false);
}

fn entry_matches<M, Q>(map: &M, key: &Q, value: &M::Value) -> Option<Handle>
where
    M: FindKey<Q> + FindValue + ?Sized,
    Q: ?Sized,
{
    let h = map.find_key_by(key)?;
    let (_, v) = map.entry(h)?;
    map.values_equal(v, value).then_some(h)
}

macro_rules! read_view_common {
    ($view:ident) => {
        impl<'a, M: Navigable + ?Sized> $view<'a, M> {
            pub fn len(&self) -> usize {
                self.map.len()
            }

            pub fn is_empty(&self) -> bool {
                self.map.len() == 0
            }
        }

        impl<M: ?Sized> Clone for $view<'_, M> {
            fn clone(&self) -> Self {
                *self
            }
        }

        impl<M: ?Sized> Copy for $view<'_, M> {}
    };
}

/// Shared key view.
pub struct Keys<'a, M: ?Sized> {
    map: &'a M,
}

read_view_common!(Keys);

impl<'a, M: Navigable + ?Sized> Keys<'a, M> {
    pub(crate) fn new(map: &'a M) -> Self {
        Self { map }
    }

    pub fn contains<Q: ?Sized>(&self, key: &Q) -> bool
    where
        M: FindKey<Q>,
    {
        self.map.find_key_by(key).is_some()
    }

    pub fn iter(&self) -> KeyIter<'a, M> {
        KeyIter(Iter::new(self.map))
    }
}

impl<'a, M: Navigable + ?Sized> IntoIterator for Keys<'a, M> {
    type Item = &'a M::Key;
    type IntoIter = KeyIter<'a, M>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<M> fmt::Debug for Keys<'_, M>
where
    M: Navigable + ?Sized,
    M::Key: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// Shared value view.
pub struct Values<'a, M: ?Sized> {
    map: &'a M,
}

read_view_common!(Values);

impl<'a, M: Navigable + ?Sized> Values<'a, M> {
    pub(crate) fn new(map: &'a M) -> Self {
        Self { map }
    }

    pub fn iter(&self) -> ValueIter<'a, M> {
        ValueIter(Iter::new(self.map))
    }
}

impl<M: FindValue + ?Sized> Values<'_, M> {
    pub fn contains(&self, value: &M::Value) -> bool {
        self.map.find_value(value).is_some()
    }
}

impl<'a, M: Navigable + ?Sized> IntoIterator for Values<'a, M> {
    type Item = &'a M::Value;
    type IntoIter = ValueIter<'a, M>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<M> fmt::Debug for Values<'_, M>
where
    M: Navigable + ?Sized,
    M::Value: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// Shared entry view.
pub struct Entries<'a, M: ?Sized> {
    map: &'a M,
}

read_view_common!(Entries);

impl<'a, M: Navigable + ?Sized> Entries<'a, M> {
    pub(crate) fn new(map: &'a M) -> Self {
        Self { map }
    }

    pub fn iter(&self) -> Iter<'a, M> {
        Iter::new(self.map)
    }
}

impl<M: FindValue + ?Sized> Entries<'_, M> {
    /// True if `key` is present and mapped to a value equal to `value`.
    pub fn contains<Q: ?Sized>(&self, key: &Q, value: &M::Value) -> bool
    where
        M: FindKey<Q>,
    {
        entry_matches(self.map, key, value).is_some()
    }
}

impl<'a, M: Navigable + ?Sized> IntoIterator for Entries<'a, M> {
    type Item = (&'a M::Key, &'a M::Value);
    type IntoIter = Iter<'a, M>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

macro_rules! mut_view_common {
    ($view:ident) => {
        impl<'a, M: Navigable + ?Sized> $view<'a, M> {
            pub(crate) fn new(map: &'a mut M) -> Self {
                Self { map }
            }

            pub fn len(&self) -> usize {
                self.map.len()
            }

            pub fn is_empty(&self) -> bool {
                self.map.len() == 0
            }

            /// Remove every entry from the underlying map.
            pub fn clear(&mut self) {
                clear_entries(&mut *self.map);
            }
        }
    };
}

/// Key view that removes through to the map.
pub struct KeysMut<'a, M: ?Sized> {
    map: &'a mut M,
}

mut_view_common!(KeysMut);

impl<M: Navigable + ?Sized> KeysMut<'_, M> {
    pub fn contains<Q: ?Sized>(&self, key: &Q) -> bool
    where
        M: FindKey<Q>,
    {
        self.map.find_key_by(key).is_some()
    }

    pub fn iter(&self) -> KeyIter<'_, M> {
        KeyIter(Iter::new(&*self.map))
    }

    /// Remove `key` and its value; false if it was absent.
    pub fn remove<Q: ?Sized>(&mut self, key: &Q) -> bool
    where
        M: FindKey<Q>,
    {
        match self.map.find_key_by(key) {
            Some(h) => self.map.remove_handle(h).is_some(),
            None => false,
        }
    }

    pub fn retain<F: FnMut(&M::Key) -> bool>(&mut self, mut keep: F) {
        retain_entries(&mut *self.map, |k, _| keep(k));
    }
}

/// Value view that removes through to the map.
pub struct ValuesMut<'a, M: ?Sized> {
    map: &'a mut M,
}

mut_view_common!(ValuesMut);

impl<M: Navigable + ?Sized> ValuesMut<'_, M> {
    pub fn iter(&self) -> ValueIter<'_, M> {
        ValueIter(Iter::new(&*self.map))
    }

    pub fn retain<F: FnMut(&M::Value) -> bool>(&mut self, mut keep: F) {
        retain_entries(&mut *self.map, |_, v| keep(v));
    }
}

impl<M: FindValue + ?Sized> ValuesMut<'_, M> {
    pub fn contains(&self, value: &M::Value) -> bool {
        self.map.find_value(value).is_some()
    }

    /// Remove the first entry holding `value`; false if there is none.
    pub fn remove(&mut self, value: &M::Value) -> bool {
        match self.map.find_value(value) {
            Some(h) => self.map.remove_handle(h).is_some(),
            None => false,
        }
    }
}

/// Entry view that removes through to the map.
pub struct EntriesMut<'a, M: ?Sized> {
    map: &'a mut M,
}

mut_view_common!(EntriesMut);

impl<M: Navigable + ?Sized> EntriesMut<'_, M> {
    pub fn iter(&self) -> Iter<'_, M> {
        Iter::new(&*self.map)
    }

    pub fn retain<F: FnMut(&M::Key, &M::Value) -> bool>(&mut self, keep: F) {
        retain_entries(&mut *self.map, keep);
    }
}

impl<M: FindValue + ?Sized> EntriesMut<'_, M> {
    pub fn contains<Q: ?Sized>(&self, key: &Q, value: &M::Value) -> bool
    where
        M: FindKey<Q>,
    {
        entry_matches(&*self.map, key, value).is_some()
    }

    /// Remove the mapping only if `key` currently maps to `value`.
    pub fn remove<Q: ?Sized>(&mut self, key: &Q, value: &M::Value) -> bool
    where
        M: FindKey<Q>,
    {
        match entry_matches(&*self.map, key, value) {
            Some(h) => self.map.remove_handle(h).is_some(),
            None => false,
        }
    }
}
