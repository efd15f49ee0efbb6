//! Order tracking layered on RawTable.
//!
//! Every entry carries `before`/`after` links in its `ext` slot, threading
//! the table into a ring closed by a header that lives outside the arena.
//! `None` in a link means "the header". `header.after` is the oldest entry,
//! `header.before` the newest. Resizes never touch the links: they relink
//! bucket chains only.

use crate::config::TableConfig;
use crate::error::Result;
use crate::raw_table::{Entry, RawTable};
use slotmap::DefaultKey;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Links {
    before: Option<DefaultKey>,
    after: Option<DefaultKey>,
}

pub(crate) struct LinkedTable<K, V, S> {
    raw: RawTable<K, V, S, Links>,
    header: Links,
}

impl<K, V, S> LinkedTable<K, V, S> {
    pub(crate) fn new(strategy: S) -> Self {
        Self {
            raw: RawTable::new(strategy),
            header: Links::default(),
        }
    }

    pub(crate) fn with_config(config: &TableConfig, strategy: S) -> Result<Self> {
        Ok(Self {
            raw: RawTable::with_config(config, strategy)?,
            header: Links::default(),
        })
    }

    /// Read access to the underlying table. Structural changes must go
    /// through `LinkedTable` so the ring stays closed.
    pub(crate) fn raw(&self) -> &RawTable<K, V, S, Links> {
        &self.raw
    }

    pub(crate) fn value_mut(&mut self, k: DefaultKey) -> Option<&mut V> {
        self.raw.get_mut(k).map(|e| &mut e.value)
    }

    pub(crate) fn key_value_mut(&mut self, k: DefaultKey) -> Option<(&K, &mut V)> {
        self.raw.get_mut(k).map(|e| (&e.key, &mut e.value))
    }

    pub(crate) fn len(&self) -> usize {
        self.raw.len()
    }

    pub(crate) fn reserve(&mut self, additional: usize) {
        self.raw.reserve(additional);
    }

    fn links(&self, node: Option<DefaultKey>) -> Links {
        match node {
            Some(k) => self.raw.get(k).map(|e| e.ext).unwrap_or_default(),
            None => self.header,
        }
    }

    fn links_mut(&mut self, node: Option<DefaultKey>) -> Option<&mut Links> {
        match node {
            Some(k) => self.raw.get_mut(k).map(|e| &mut e.ext),
            None => Some(&mut self.header),
        }
    }

    fn set_after(&mut self, node: Option<DefaultKey>, to: Option<DefaultKey>) {
        if let Some(l) = self.links_mut(node) {
            l.after = to;
        }
    }

    fn set_before(&mut self, node: Option<DefaultKey>, to: Option<DefaultKey>) {
        if let Some(l) = self.links_mut(node) {
            l.before = to;
        }
    }

    /// Splice `k` in just before the header, making it the newest entry.
    fn link_newest(&mut self, k: DefaultKey) {
        let newest = self.header.before;
        self.set_before(Some(k), newest);
        self.set_after(Some(k), None);
        self.set_after(newest, Some(k));
        self.header.before = Some(k);
    }

    fn unlink_order(&mut self, k: DefaultKey) {
        let Links { before, after } = self.links(Some(k));
        self.set_after(before, after);
        self.set_before(after, before);
    }

    /// Create an entry as the newest in the ring.
    pub(crate) fn insert_newest(&mut self, hash: u64, key: K, value: V) -> DefaultKey {
        let k = self.raw.insert_new(hash, key, value, Links::default());
        self.link_newest(k);
        k
    }

    /// Remove `k` given its chain predecessor.
    pub(crate) fn remove_entry(
        &mut self,
        k: DefaultKey,
        previous: Option<DefaultKey>,
    ) -> Option<Entry<K, V, Links>> {
        self.raw.get(k)?;
        self.unlink_order(k);
        self.raw.remove_entry(k, previous)
    }

    /// Remove `k`, walking its chain for the predecessor.
    pub(crate) fn unlink(&mut self, k: DefaultKey) -> Option<Entry<K, V, Links>> {
        self.raw.get(k)?;
        self.unlink_order(k);
        self.raw.unlink(k)
    }

    /// Move `k` to the newest end. Returns false, without counting a
    /// modification, when it is already there.
    pub(crate) fn move_to_newest(&mut self, k: DefaultKey) -> bool {
        if self.header.before == Some(k) || self.raw.get(k).is_none() {
            return false;
        }
        self.unlink_order(k);
        self.link_newest(k);
        self.raw.touch();
        true
    }

    /// Overwrite `k` in place with a new mapping that becomes the newest
    /// entry. Returns the mapping it replaced.
    pub(crate) fn reuse(&mut self, k: DefaultKey, hash: u64, key: K, value: V) -> Option<(K, V)> {
        self.raw.get(k)?;
        self.unlink_order(k);
        let old = self.raw.reuse(k, hash, key, value);
        self.link_newest(k);
        old
    }

    pub(crate) fn clear(&mut self) {
        self.raw.clear();
        self.header = Links::default();
    }

    /// Oldest entry.
    pub(crate) fn first(&self) -> Option<DefaultKey> {
        self.header.after
    }

    /// Newest entry.
    pub(crate) fn last(&self) -> Option<DefaultKey> {
        self.header.before
    }

    pub(crate) fn after(&self, k: DefaultKey) -> Option<DefaultKey> {
        self.raw.get(k)?.ext.after
    }

    pub(crate) fn before(&self, k: DefaultKey) -> Option<DefaultKey> {
        self.raw.get(k)?.ext.before
    }

    /// Entry `index` positions from the oldest end, walking from whichever
    /// end of the ring is nearer.
    pub(crate) fn nth(&self, index: usize) -> Option<DefaultKey> {
        let len = self.len();
        if index >= len {
            return None;
        }
        if index < len / 2 {
            std::iter::successors(self.first(), |k| self.after(*k)).nth(index)
        } else {
            std::iter::successors(self.last(), |k| self.before(*k)).nth(len - 1 - index)
        }
    }

    /// Position of `k` counted from the oldest end.
    pub(crate) fn position(&self, k: DefaultKey) -> usize {
        std::iter::successors(self.before(k), |p| self.before(*p)).count()
    }

    /// Walk the ring both ways and check it against the bucket chains:
    /// same entries, `len` steps each way, exact reverse orders.
    #[cfg(test)]
    pub(crate) fn assert_ring_consistent(&self) -> Vec<DefaultKey> {
        let forward: Vec<_> = std::iter::successors(self.first(), |k| self.after(*k))
            .take(self.len() + 1)
            .collect();
        let mut backward: Vec<_> = std::iter::successors(self.last(), |k| self.before(*k))
            .take(self.len() + 1)
            .collect();
        assert_eq!(forward.len(), self.len());
        backward.reverse();
        assert_eq!(forward, backward);
        let mut chained = self.raw.assert_chains_consistent();
        let mut ring = forward.clone();
        chained.sort();
        ring.sort();
        assert_eq!(chained, ring);
        forward
    }
}

impl<K: Clone, V: Clone, S: Clone> Clone for LinkedTable<K, V, S> {
    fn clone(&self) -> Self {
        // Slot keys survive a slotmap clone, so the links stay valid.
        Self {
            raw: self.raw.clone(),
            header: self.header,
        }
    }
}
