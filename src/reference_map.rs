//! ReferenceMap: a hashed map whose keys and values may be held weakly.
//!
//! Keys and values are shared `Rc`s. Each side is held through a holder of
//! the configured strength:
//!
//! - `Hard`: the map owns a strong count.
//! - `Soft`: strong until the owner signals memory pressure with
//!   `reclaim_soft`, which lets go of soft referents nothing else owns.
//! - `Weak`: the map never keeps the referent alive.
//!
//! There is no collector to notice when a referent goes away. Instead the
//! owner of a referent reports its release on the map's `ReferenceQueue`,
//! and queued notices are consumed at the start of the next `put`,
//! `remove`, `clear` or explicit `purge`. Lookups never wait for a purge: an
//! entry whose key or value no longer upgrades is treated as absent at once.
//! `expunge_stale` sweeps the whole table for callers that do not use the
//! queue.
//!
//! The hash of a key is taken from the live key at insertion and cached in
//! the entry, so a stale entry can still be located and unlinked after its
//! key is gone.
//!
//! Traversal hands out `Rc` snapshots rather than references: the
//! `*_mut` views remove through to the map and `ReferenceCursor` walks it
//! in bucket order, both stepping over stale entries.

use crate::config::ReferenceConfig;
use crate::cursor::{assert_in_sync, assert_owner, no_current_entry, TableId};
use crate::error::Result;
use crate::raw_table::RawTable;
use crate::strategy::{ByAddress, HashStrategy, Natural, ValueEquivalence};
use core::borrow::Borrow;
use core::fmt;
use hashbrown::HashMap;
use slotmap::DefaultKey;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

/// How strongly a `ReferenceMap` holds a key or a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceStrength {
    Hard,
    Soft,
    Weak,
}

enum Slot<T: ?Sized> {
    Hard(Rc<T>),
    Soft(Rc<T>),
    Weak(Weak<T>),
}

struct Holder<T: ?Sized> {
    address: usize,
    slot: Slot<T>,
}

fn address_of<T: ?Sized>(ptr: *const T) -> usize {
    ptr.cast::<()>() as usize
}

impl<T: ?Sized> Holder<T> {
    fn new(referent: Rc<T>, strength: ReferenceStrength) -> Self {
        let address = address_of(Rc::as_ptr(&referent));
        let slot = match strength {
            ReferenceStrength::Hard => Slot::Hard(referent),
            ReferenceStrength::Soft => Slot::Soft(referent),
            ReferenceStrength::Weak => Slot::Weak(Rc::downgrade(&referent)),
        };
        Self { address, slot }
    }

    /// Run `f` on the referent if it is still alive.
    fn with<R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        match &self.slot {
            Slot::Hard(rc) | Slot::Soft(rc) => Some(f(rc)),
            Slot::Weak(w) => w.upgrade().map(|rc| f(&rc)),
        }
    }

    fn upgrade(&self) -> Option<Rc<T>> {
        match &self.slot {
            Slot::Hard(rc) | Slot::Soft(rc) => Some(Rc::clone(rc)),
            Slot::Weak(w) => w.upgrade(),
        }
    }

    fn is_live(&self) -> bool {
        match &self.slot {
            Slot::Hard(_) | Slot::Soft(_) => true,
            Slot::Weak(w) => w.strong_count() > 0,
        }
    }

    /// Hard holders never need a release notice.
    fn is_watched(&self) -> bool {
        !matches!(self.slot, Slot::Hard(_))
    }

    /// Strong count of a soft referent; `None` for other holders.
    fn soft_strong_count(&self) -> Option<usize> {
        match &self.slot {
            Slot::Soft(rc) => Some(Rc::strong_count(rc)),
            _ => None,
        }
    }

    /// Give up a soft holder's strong count.
    fn release_soft(&mut self) {
        let weak = match &self.slot {
            Slot::Soft(rc) => Rc::downgrade(rc),
            _ => return,
        };
        self.slot = Slot::Weak(weak);
    }

    fn into_weak(self) -> Weak<T> {
        match self.slot {
            Slot::Hard(rc) | Slot::Soft(rc) => Rc::downgrade(&rc),
            Slot::Weak(w) => w,
        }
    }
}

/// Release notices from the owners of referents to the map.
///
/// Cloning shares the same queue. Enqueueing a referent that is still
/// strongly held elsewhere is harmless: the map only purges entries whose
/// holders actually fail to upgrade when the notice is consumed.
#[derive(Clone, Default)]
pub struct ReferenceQueue {
    notices: Rc<RefCell<VecDeque<usize>>>,
}

impl ReferenceQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report that the owner is releasing `referent`.
    pub fn enqueue<T: ?Sized>(&self, referent: &Rc<T>) {
        self.notices
            .borrow_mut()
            .push_back(address_of(Rc::as_ptr(referent)));
    }

    /// Report a release after the fact, from a weak handle.
    pub fn enqueue_weak<T: ?Sized>(&self, referent: &Weak<T>) {
        self.notices
            .borrow_mut()
            .push_back(address_of(referent.as_ptr()));
    }

    pub fn len(&self) -> usize {
        RefCell::borrow(&self.notices).len()
    }

    pub fn is_empty(&self) -> bool {
        RefCell::borrow(&self.notices).is_empty()
    }

    fn push_address(&self, address: usize) {
        self.notices.borrow_mut().push_back(address);
    }

    fn drain(&self) -> Vec<usize> {
        self.notices.borrow_mut().drain(..).collect()
    }
}

impl fmt::Debug for ReferenceQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReferenceQueue")
            .field("pending", &self.len())
            .finish()
    }
}

pub struct ReferenceMap<K: ?Sized, V: ?Sized, S = Natural> {
    table: RawTable<Holder<K>, Holder<V>, S>,
    key_strength: ReferenceStrength,
    value_strength: ReferenceStrength,
    purge_values: bool,
    queue: ReferenceQueue,
    /// Referent address -> entries referring to it: every value, and keys
    /// not held hard.
    watched: HashMap<usize, Vec<DefaultKey>>,
    /// Values of purged keys by referent address, kept observable until
    /// they die.
    orphans: HashMap<usize, Weak<V>>,
}

/// Keys and values compared by the address of their referent.
pub type ReferenceIdentityMap<K, V> = ReferenceMap<K, V, ByAddress>;

impl<K: ?Sized, V: ?Sized> ReferenceMap<K, V> {
    /// Hard keys, soft values.
    pub fn new() -> Self {
        Self::build(ReferenceConfig::default(), Natural::default())
    }

    pub fn with_strengths(key_strength: ReferenceStrength, value_strength: ReferenceStrength) -> Self {
        Self::build(
            ReferenceConfig::new(key_strength, value_strength),
            Natural::default(),
        )
    }
}

impl<K: ?Sized, V: ?Sized, S: Default> Default for ReferenceMap<K, V, S> {
    fn default() -> Self {
        Self::build(ReferenceConfig::default(), S::default())
    }
}

impl<K: ?Sized, V: ?Sized, S> ReferenceMap<K, V, S> {
    pub fn with_config(config: ReferenceConfig, strategy: S) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config, strategy))
    }

    fn build(config: ReferenceConfig, strategy: S) -> Self {
        Self {
            table: RawTable::from_valid_config(&config.table, strategy),
            key_strength: config.key_strength,
            value_strength: config.value_strength,
            purge_values: config.purge_values,
            queue: ReferenceQueue::new(),
            watched: HashMap::new(),
            orphans: HashMap::new(),
        }
    }

    /// A handle on this map's release queue for owners of referents.
    pub fn queue(&self) -> ReferenceQueue {
        self.queue.clone()
    }

    pub fn key_strength(&self) -> ReferenceStrength {
        self.key_strength
    }

    pub fn value_strength(&self) -> ReferenceStrength {
        self.value_strength
    }

    pub fn is_purge_values(&self) -> bool {
        self.purge_values
    }

    /// Entries in the table, including stale ones not yet purged. Call
    /// `purge` or `expunge_stale` first for an exact count, or use
    /// `live_len`.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.len() == 0
    }

    /// Entries whose key and value are both still alive.
    pub fn live_len(&self) -> usize {
        self.table
            .entries()
            .filter(|(_, e)| e.key.is_live() && e.value.is_live())
            .count()
    }

    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    fn watch(&mut self, address: usize, k: DefaultKey) {
        self.watched.entry(address).or_default().push(k);
    }

    fn unwatch(&mut self, address: usize, k: DefaultKey) {
        if let Some(list) = self.watched.get_mut(&address) {
            list.retain(|w| *w != k);
            if list.is_empty() {
                self.watched.remove(&address);
            }
        }
    }

    fn watch_entry(&mut self, k: DefaultKey) {
        let Some(e) = self.table.get(k) else { return };
        let key = e.key.is_watched().then_some(e.key.address);
        let value = e.value.address;
        if let Some(a) = key {
            self.watch(a, k);
        }
        self.watch(value, k);
    }

    /// Unlink `k` and drop its bookkeeping; returns the value holder.
    fn detach(&mut self, k: DefaultKey, previous: Option<Option<DefaultKey>>) -> Option<Holder<V>> {
        let e = match previous {
            Some(p) => self.table.remove_entry(k, p)?,
            None => self.table.unlink(k)?,
        };
        if e.key.is_watched() {
            self.unwatch(e.key.address, k);
        }
        self.unwatch(e.value.address, k);
        Some(e.value)
    }

    /// True if a live key is still mapped to the referent at `address`.
    fn value_bound(&self, address: usize) -> bool {
        self.watched.get(&address).is_some_and(|entries| {
            entries.iter().any(|k| {
                self.table
                    .get(*k)
                    .is_some_and(|e| e.value.address == address && e.key.is_live())
            })
        })
    }

    fn purge_entry(&mut self, k: DefaultKey) {
        let Some(value) = self.detach(k, None) else { return };
        if self.purge_values {
            return;
        }
        let address = value.address;
        let already = self
            .orphans
            .get(&address)
            .is_some_and(|w| w.strong_count() > 0);
        if already || self.value_bound(address) {
            return;
        }
        let orphan = value.into_weak();
        if orphan.strong_count() > 0 {
            self.orphans.insert(address, orphan);
        }
    }

    fn live_pair(&self, k: DefaultKey) -> Option<(Rc<K>, Rc<V>)> {
        let e = self.table.get(k)?;
        Some((e.key.upgrade()?, e.value.upgrade()?))
    }

    fn is_live_entry(&self, k: DefaultKey) -> bool {
        self.table
            .get(k)
            .is_some_and(|e| e.key.is_live() && e.value.is_live())
    }

    /// Overwrite the value of entry `k` in place, moving its index entry.
    /// Not a structural change. Returns the old value if still alive.
    fn replace_value_at(&mut self, k: DefaultKey, value: Rc<V>) -> Option<Rc<V>> {
        let holder = Holder::new(value, self.value_strength);
        let address = holder.address;
        let e = self.table.get_mut(k)?;
        let old = core::mem::replace(&mut e.value, holder);
        self.unwatch(old.address, k);
        self.watch(address, k);
        old.upgrade()
    }

    /// Consume queued release notices, purging every entry whose key or
    /// value was released. Returns the number of entries purged.
    pub fn purge(&mut self) -> usize {
        self.orphans.retain(|_, w| w.strong_count() > 0);
        let notices = self.queue.drain();
        if notices.is_empty() {
            return 0;
        }
        let mut purged = 0;
        for address in notices {
            let Some(candidates) = self.watched.get(&address).cloned() else {
                continue;
            };
            for k in candidates {
                let stale = self
                    .table
                    .get(k)
                    .is_some_and(|e| !e.key.is_live() || !e.value.is_live());
                if stale {
                    self.purge_entry(k);
                    purged += 1;
                }
            }
        }
        tracing::debug!(purged, remaining = self.table.len(), "purged released entries");
        purged
    }

    /// Sweep every entry, purging those whose key or value is gone, without
    /// relying on release notices.
    pub fn expunge_stale(&mut self) -> usize {
        let stale: Vec<DefaultKey> = self
            .table
            .entries()
            .filter(|(_, e)| !e.key.is_live() || !e.value.is_live())
            .map(|(k, _)| k)
            .collect();
        for k in &stale {
            self.purge_entry(*k);
        }
        self.orphans.retain(|_, w| w.strong_count() > 0);
        tracing::debug!(purged = stale.len(), remaining = self.table.len(), "expunged stale entries");
        stale.len()
    }

    /// Memory pressure: release every soft referent that only this map
    /// keeps alive and purge the entries holding it. Soft referents still
    /// owned elsewhere stay soft. Returns the number of entries purged.
    pub fn reclaim_soft(&mut self) -> usize {
        // address -> (soft holders in this map, strong count)
        let mut soft: HashMap<usize, (usize, usize)> = HashMap::new();
        for (_, e) in self.table.entries() {
            let holders = [
                e.key.soft_strong_count().map(|c| (e.key.address, c)),
                e.value.soft_strong_count().map(|c| (e.value.address, c)),
            ];
            for (address, strong) in holders.into_iter().flatten() {
                soft.entry(address).or_insert((0, strong)).0 += 1;
            }
        }
        soft.retain(|_, (held, strong)| *held == *strong);
        for (_, e) in self.table.entries_mut() {
            if soft.contains_key(&e.key.address) {
                e.key.release_soft();
            }
            if soft.contains_key(&e.value.address) {
                e.value.release_soft();
            }
        }
        tracing::trace!(released = soft.len(), "released soft references");
        for address in soft.keys() {
            self.queue.push_address(*address);
        }
        self.purge()
    }

    pub fn clear(&mut self) {
        self.queue.drain();
        self.table.clear();
        self.watched.clear();
        self.orphans.clear();
    }

    /// Values of purged keys that are still alive elsewhere, each once.
    pub fn orphaned_values(&self) -> Vec<Rc<V>> {
        self.orphans.values().filter_map(Weak::upgrade).collect()
    }

    /// Live mappings in bucket order. Stale entries are skipped.
    pub fn iter(&self) -> impl Iterator<Item = (Rc<K>, Rc<V>)> + '_ {
        std::iter::successors(self.table.first(), move |k| self.table.after(*k))
            .filter_map(move |k| self.live_pair(k))
    }

    pub fn entries(&self) -> impl Iterator<Item = (Rc<K>, Rc<V>)> + '_ {
        self.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = Rc<K>> + '_ {
        self.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = Rc<V>> + '_ {
        self.iter().map(|(_, v)| v)
    }

    /// Keep only the live entries `keep` accepts; stale entries are purged.
    pub fn retain<F: FnMut(&K, &V) -> bool>(&mut self, mut keep: F) {
        let doomed: Vec<DefaultKey> = self
            .table
            .entries()
            .filter(|(_, e)| {
                let kept = e
                    .key
                    .with(|k| e.value.with(|v| keep(k, v)))
                    .flatten();
                kept != Some(true)
            })
            .map(|(k, _)| k)
            .collect();
        for k in doomed {
            self.detach(k, None);
        }
    }

    pub fn keys_mut(&mut self) -> ReferenceKeysMut<'_, K, V, S> {
        ReferenceKeysMut { map: self }
    }

    pub fn values_mut(&mut self) -> ReferenceValuesMut<'_, K, V, S> {
        ReferenceValuesMut { map: self }
    }

    pub fn entries_mut(&mut self) -> ReferenceEntriesMut<'_, K, V, S> {
        ReferenceEntriesMut { map: self }
    }

    /// A cursor positioned before the first entry.
    pub fn cursor(&self) -> ReferenceCursor {
        ReferenceCursor {
            owner: self.table.id(),
            expected: self.table.mod_count(),
            next: self.table.first(),
            last: None,
        }
    }
}

impl<K: ?Sized, V: ?Sized, S: HashStrategy<K>> ReferenceMap<K, V, S> {
    fn find_live<Q>(&self, key: &Q) -> Option<(Option<DefaultKey>, DefaultKey)>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        S: HashStrategy<Q>,
    {
        let hash = self.table.hash_of(key);
        let strategy = self.table.strategy();
        self.table.find_slot(hash, |holder| {
            holder
                .with(|k| HashStrategy::<Q>::equals(strategy, key, k.borrow()))
                .unwrap_or(false)
        })
    }

    /// The value for `key`, if both are still alive.
    pub fn get<Q>(&self, key: &Q) -> Option<Rc<V>>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        S: HashStrategy<Q>,
    {
        let (_, k) = self.find_live(key)?;
        self.table.get(k)?.value.upgrade()
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized,
        S: HashStrategy<Q>,
    {
        self.get(key).is_some()
    }

    /// Map `key` to `value`, returning the previous value if it is still
    /// alive. Consumes pending release notices first.
    pub fn put(&mut self, key: Rc<K>, value: Rc<V>) -> Option<Rc<V>> {
        self.purge();
        let hash = self.table.hash_of(&*key);
        let found = {
            let strategy = self.table.strategy();
            self.table.find_by(hash, |holder| {
                holder
                    .with(|k| HashStrategy::<K>::equals(strategy, &*key, k))
                    .unwrap_or(false)
            })
        };
        if let Some(k) = found {
            return self.replace_value_at(k, value);
        }
        let holder = Holder::new(value, self.value_strength);
        let k = self
            .table
            .insert_new(hash, Holder::new(key, self.key_strength), holder, ());
        self.watch_entry(k);
        None
    }

    /// Remove `key`, returning its value if still alive. Consumes pending
    /// release notices first.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<Rc<V>>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        S: HashStrategy<Q>,
    {
        self.remove_live(key)?.upgrade()
    }

    fn remove_live<Q>(&mut self, key: &Q) -> Option<Holder<V>>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        S: HashStrategy<Q>,
    {
        self.purge();
        let (previous, k) = self.find_live(key)?;
        self.detach(k, Some(previous))
    }
}

impl<K: ?Sized, V: ?Sized, S: ValueEquivalence<V>> ReferenceMap<K, V, S> {
    /// First live entry, in bucket order, whose value is equivalent to
    /// `value`.
    fn find_value(&self, value: &V) -> Option<DefaultKey> {
        let strategy = self.table.strategy();
        std::iter::successors(self.table.first(), |k| self.table.after(*k)).find(|k| {
            self.table.get(*k).is_some_and(|e| {
                e.key.is_live()
                    && e.value
                        .with(|v| strategy.values_equal(v, value))
                        .unwrap_or(false)
            })
        })
    }

    /// True if a live entry, or a still-living orphan of a purged key, holds
    /// a value equivalent to `value`.
    pub fn contains_value(&self, value: &V) -> bool {
        let strategy = self.table.strategy();
        let in_table = self.table.entries().any(|(_, e)| {
            e.key.is_live()
                && e.value
                    .with(|v| strategy.values_equal(v, value))
                    .unwrap_or(false)
        });
        in_table
            || self
                .orphans
                .values()
                .filter_map(Weak::upgrade)
                .any(|v| strategy.values_equal(&*v, value))
    }
}

impl<K, V, S> ReferenceMap<K, V, S>
where
    K: ?Sized,
    V: ?Sized,
    S: HashStrategy<K> + ValueEquivalence<V>,
{
    fn find_entry<Q>(&self, key: &Q, value: &V) -> Option<DefaultKey>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        S: HashStrategy<Q>,
    {
        let (_, k) = self.find_live(key)?;
        let strategy = self.table.strategy();
        self.table
            .get(k)?
            .value
            .with(|v| strategy.values_equal(v, value))
            .unwrap_or(false)
            .then_some(k)
    }
}

/// Detached bidirectional cursor over a `ReferenceMap`.
///
/// Behaves like `MapCursor`, including its fail-fast checks, but yields
/// `Rc` snapshots and steps over entries whose key or value has gone. The
/// cursor's own `remove` does not consume pending release notices.
#[derive(Debug, Clone)]
pub struct ReferenceCursor {
    owner: TableId,
    expected: u64,
    next: Option<DefaultKey>,
    last: Option<DefaultKey>,
}

impl ReferenceCursor {
    fn check<K: ?Sized, V: ?Sized, S>(&self, map: &ReferenceMap<K, V, S>) {
        assert_in_sync(self.owner, self.expected, map.table.id(), map.table.mod_count());
    }

    fn current(&self) -> DefaultKey {
        match self.last {
            Some(k) => k,
            None => no_current_entry(),
        }
    }

    fn before_gap<K: ?Sized, V: ?Sized, S>(&self, map: &ReferenceMap<K, V, S>) -> Option<DefaultKey> {
        match self.next {
            Some(n) => map.table.before(n),
            None => map.table.last(),
        }
    }

    pub fn has_next<K: ?Sized, V: ?Sized, S>(&self, map: &ReferenceMap<K, V, S>) -> bool {
        self.check(map);
        std::iter::successors(self.next, |k| map.table.after(*k)).any(|k| map.is_live_entry(k))
    }

    pub fn has_previous<K: ?Sized, V: ?Sized, S>(&self, map: &ReferenceMap<K, V, S>) -> bool {
        self.check(map);
        std::iter::successors(self.before_gap(map), |k| map.table.before(*k))
            .any(|k| map.is_live_entry(k))
    }

    pub fn next<K: ?Sized, V: ?Sized, S>(
        &mut self,
        map: &ReferenceMap<K, V, S>,
    ) -> Option<(Rc<K>, Rc<V>)> {
        self.check(map);
        while let Some(k) = self.next {
            self.next = map.table.after(k);
            if let Some(pair) = map.live_pair(k) {
                self.last = Some(k);
                return Some(pair);
            }
        }
        None
    }

    pub fn previous<K: ?Sized, V: ?Sized, S>(
        &mut self,
        map: &ReferenceMap<K, V, S>,
    ) -> Option<(Rc<K>, Rc<V>)> {
        self.check(map);
        let mut cur = self.before_gap(map);
        while let Some(k) = cur {
            self.next = Some(k);
            if let Some(pair) = map.live_pair(k) {
                self.last = Some(k);
                return Some(pair);
            }
            cur = map.table.before(k);
        }
        None
    }

    /// Key of the entry last returned, or `None` if it has died since.
    ///
    /// Panics before the first move, after `remove`, or on a stale cursor.
    pub fn key<K: ?Sized, V: ?Sized, S>(&self, map: &ReferenceMap<K, V, S>) -> Option<Rc<K>> {
        self.check(map);
        map.table.get(self.current())?.key.upgrade()
    }

    pub fn value<K: ?Sized, V: ?Sized, S>(&self, map: &ReferenceMap<K, V, S>) -> Option<Rc<V>> {
        self.check(map);
        map.table.get(self.current())?.value.upgrade()
    }

    /// Replace the current entry's value, returning the old one if it is
    /// still alive.
    pub fn set_value<K: ?Sized, V: ?Sized, S>(
        &mut self,
        map: &mut ReferenceMap<K, V, S>,
        value: Rc<V>,
    ) -> Option<Rc<V>> {
        self.check(map);
        let k = self.current();
        map.replace_value_at(k, value)
    }

    /// Remove the current entry, returning it if both sides were still
    /// alive. The walk continues from the same gap.
    pub fn remove<K: ?Sized, V: ?Sized, S>(
        &mut self,
        map: &mut ReferenceMap<K, V, S>,
    ) -> Option<(Rc<K>, Rc<V>)> {
        self.check(map);
        let k = self.current();
        if self.next == Some(k) {
            self.next = map.table.after(k);
        }
        let pair = map.live_pair(k);
        map.detach(k, None);
        self.last = None;
        self.expected = map.table.mod_count();
        pair
    }

    /// Rewind to before the first entry and resynchronize with the map.
    pub fn reset<K: ?Sized, V: ?Sized, S>(&mut self, map: &ReferenceMap<K, V, S>) {
        assert_owner(self.owner, map.table.id());
        self.expected = map.table.mod_count();
        self.next = map.table.first();
        self.last = None;
    }
}

macro_rules! reference_view_common {
    ($view:ident) => {
        impl<K: ?Sized, V: ?Sized, S> $view<'_, K, V, S> {
            /// Live entries seen through the view.
            pub fn len(&self) -> usize {
                self.map.live_len()
            }

            pub fn is_empty(&self) -> bool {
                self.len() == 0
            }

            /// Remove every entry from the underlying map.
            pub fn clear(&mut self) {
                self.map.clear();
            }
        }
    };
}

/// Key view of a `ReferenceMap` that removes through to the map.
pub struct ReferenceKeysMut<'a, K: ?Sized, V: ?Sized, S = Natural> {
    map: &'a mut ReferenceMap<K, V, S>,
}

reference_view_common!(ReferenceKeysMut);

impl<K: ?Sized, V: ?Sized, S> ReferenceKeysMut<'_, K, V, S> {
    pub fn iter(&self) -> impl Iterator<Item = Rc<K>> + '_ {
        self.map.keys()
    }

    pub fn retain<F: FnMut(&K) -> bool>(&mut self, mut keep: F) {
        self.map.retain(|k, _| keep(k));
    }
}

impl<K: ?Sized, V: ?Sized, S: HashStrategy<K>> ReferenceKeysMut<'_, K, V, S> {
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized,
        S: HashStrategy<Q>,
    {
        self.map.contains_key(key)
    }

    /// Remove `key` and its value; false if no live key matched.
    pub fn remove<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized,
        S: HashStrategy<Q>,
    {
        self.map.remove_live(key).is_some()
    }
}

/// Value view of a `ReferenceMap` that removes through to the map.
pub struct ReferenceValuesMut<'a, K: ?Sized, V: ?Sized, S = Natural> {
    map: &'a mut ReferenceMap<K, V, S>,
}

reference_view_common!(ReferenceValuesMut);

impl<K: ?Sized, V: ?Sized, S> ReferenceValuesMut<'_, K, V, S> {
    pub fn iter(&self) -> impl Iterator<Item = Rc<V>> + '_ {
        self.map.values()
    }

    pub fn retain<F: FnMut(&V) -> bool>(&mut self, mut keep: F) {
        self.map.retain(|_, v| keep(v));
    }
}

impl<K: ?Sized, V: ?Sized, S: ValueEquivalence<V>> ReferenceValuesMut<'_, K, V, S> {
    /// True if a live entry holds an equivalent value. Orphaned values do
    /// not count here.
    pub fn contains(&self, value: &V) -> bool {
        self.map.find_value(value).is_some()
    }

    /// Remove the first live entry holding `value`.
    pub fn remove(&mut self, value: &V) -> bool {
        self.map.purge();
        match self.map.find_value(value) {
            Some(k) => self.map.detach(k, None).is_some(),
            None => false,
        }
    }
}

/// Entry view of a `ReferenceMap` that removes through to the map.
pub struct ReferenceEntriesMut<'a, K: ?Sized, V: ?Sized, S = Natural> {
    map: &'a mut ReferenceMap<K, V, S>,
}

reference_view_common!(ReferenceEntriesMut);

impl<K: ?Sized, V: ?Sized, S> ReferenceEntriesMut<'_, K, V, S> {
    pub fn iter(&self) -> impl Iterator<Item = (Rc<K>, Rc<V>)> + '_ {
        self.map.iter()
    }

    pub fn retain<F: FnMut(&K, &V) -> bool>(&mut self, keep: F) {
        self.map.retain(keep);
    }
}

impl<K, V, S> ReferenceEntriesMut<'_, K, V, S>
where
    K: ?Sized,
    V: ?Sized,
    S: HashStrategy<K> + ValueEquivalence<V>,
{
    pub fn contains<Q>(&self, key: &Q, value: &V) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized,
        S: HashStrategy<Q>,
    {
        self.map.find_entry(key, value).is_some()
    }

    /// Remove the mapping only if `key` currently maps to `value`.
    pub fn remove<Q>(&mut self, key: &Q, value: &V) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized,
        S: HashStrategy<Q>,
    {
        self.map.purge();
        match self.map.find_entry(key, value) {
            Some(k) => self.map.detach(k, None).is_some(),
            None => false,
        }
    }
}

impl<K, V, S> fmt::Debug for ReferenceMap<K, V, S>
where
    K: ?Sized + fmt::Debug,
    V: ?Sized + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::ReferenceStrength::{Hard, Soft, Weak as WeakRef};

    fn rc(s: &str) -> Rc<String> {
        Rc::new(s.to_string())
    }

    /// Invariant: a weak key that dies is absent immediately and purged by
    /// the next structural operation once its release is reported.
    #[test]
    fn released_weak_key_is_purged() {
        let mut m: ReferenceMap<String, String> = ReferenceMap::with_strengths(WeakRef, Hard);
        let queue = m.queue();
        let k = rc("k");
        m.put(Rc::clone(&k), rc("v"));
        assert_eq!(m.get("k").as_deref().map(String::as_str), Some("v"));
        queue.enqueue(&k);
        drop(k);
        assert!(m.get("k").is_none());
        assert_eq!(m.len(), 1);
        assert_eq!(m.live_len(), 0);
        assert_eq!(m.purge(), 1);
        assert_eq!(m.len(), 0);
        assert!(!m.contains_key("k"));
    }

    /// Invariant: the queue counts pending notices until a purge drains them.
    #[test]
    fn queue_counts_pending_notices() {
        let mut m: ReferenceMap<String, String> = ReferenceMap::with_strengths(WeakRef, Hard);
        let queue = m.queue();
        assert!(queue.is_empty());
        let (a, b) = (rc("a"), rc("b"));
        m.put(Rc::clone(&a), rc("1"));
        m.put(Rc::clone(&b), rc("2"));
        queue.enqueue(&a);
        queue.enqueue(&b);
        assert_eq!(queue.len(), 2);
        assert_eq!(m.queue().len(), 2);
        drop(a);
        drop(b);
        assert_eq!(m.purge(), 2);
        assert!(queue.is_empty());
    }

    /// Invariant: a notice for a referent that is still alive purges nothing.
    #[test]
    fn premature_notice_is_ignored() {
        let mut m: ReferenceMap<String, String> = ReferenceMap::with_strengths(WeakRef, Hard);
        let k = rc("k");
        m.put(Rc::clone(&k), rc("v"));
        m.queue().enqueue(&k);
        assert_eq!(m.purge(), 0);
        assert!(m.contains_key("k"));
    }

    /// Invariant: memory pressure releases only soft values nothing else
    /// owns; a survivor stays soft and outlives its other owner until the
    /// next signal.
    #[test]
    fn reclaim_soft_drops_unshared_values() {
        let mut m: ReferenceMap<String, String> = ReferenceMap::new();
        let shared = rc("shared");
        m.put(rc("a"), rc("only-here"));
        m.put(rc("b"), Rc::clone(&shared));
        assert_eq!(m.live_len(), 2);
        assert_eq!(m.reclaim_soft(), 1);
        assert!(m.get("a").is_none());
        assert_eq!(m.get("b"), Some(Rc::clone(&shared)));
        drop(shared);
        assert_eq!(m.get("b").as_deref().map(String::as_str), Some("shared"));
        assert_eq!(m.expunge_stale(), 0);
        assert_eq!(m.reclaim_soft(), 1);
        assert!(m.is_empty());
    }

    /// Invariant: a referent held softly by several entries and nothing
    /// else is released from all of them at once.
    #[test]
    fn reclaim_soft_counts_holders_within_the_map() {
        let mut m: ReferenceMap<String, String> = ReferenceMap::new();
        let v = rc("v");
        m.put(rc("a"), Rc::clone(&v));
        m.put(rc("b"), Rc::clone(&v));
        assert_eq!(m.reclaim_soft(), 0);
        drop(v);
        assert_eq!(m.reclaim_soft(), 2);
        assert!(m.is_empty());
    }

    /// Invariant: a long-lived value shared by many purged keys is orphaned
    /// once, and not at all while a live key still maps to it.
    #[test]
    fn orphans_are_recorded_once_per_referent() {
        let mut m: ReferenceMap<String, String> = ReferenceMap::with_strengths(WeakRef, Soft);
        let queue = m.queue();
        let shared = rc("shared");
        for i in 0..1000 {
            let k = rc(&format!("k{i}"));
            m.put(Rc::clone(&k), Rc::clone(&shared));
            queue.enqueue(&k);
            drop(k);
            m.purge();
        }
        assert_eq!(m.len(), 0);
        assert_eq!(m.orphaned_values(), [Rc::clone(&shared)]);

        m.clear();
        let keeper = rc("keeper");
        let doomed = rc("doomed");
        m.put(Rc::clone(&keeper), Rc::clone(&shared));
        m.put(Rc::clone(&doomed), Rc::clone(&shared));
        queue.enqueue(&doomed);
        drop(doomed);
        assert_eq!(m.purge(), 1);
        assert!(m.orphaned_values().is_empty());
        assert_eq!(m.get("keeper"), Some(shared));
    }

    /// Invariant: the cursor skips stale entries, removes through the map
    /// and fails fast on outside structural change.
    #[test]
    fn cursor_skips_stale_and_removes() {
        let mut m: ReferenceMap<String, String> = ReferenceMap::with_strengths(Hard, WeakRef);
        let kept: Vec<_> = (0..4).map(|i| rc(&format!("v{i}"))).collect();
        for (i, v) in kept.iter().enumerate() {
            m.put(rc(&format!("k{i}")), Rc::clone(v));
        }
        m.put(rc("dead"), rc("gone"));
        assert_eq!(m.len(), 5);

        let mut cur = m.cursor();
        let mut seen = Vec::new();
        while let Some((k, _)) = cur.next(&m) {
            seen.push(k.to_string());
        }
        seen.sort();
        assert_eq!(seen, ["k0", "k1", "k2", "k3"]);
        assert!(!cur.has_next(&m));
        assert!(cur.has_previous(&m));

        let (k, v) = cur.previous(&m).unwrap();
        assert_eq!(cur.key(&m), Some(Rc::clone(&k)));
        assert_eq!(cur.set_value(&mut m, Rc::clone(&kept[0])), Some(v));
        assert_eq!(cur.remove(&mut m).map(|(k, _)| k), Some(Rc::clone(&k)));
        assert!(!m.contains_key(k.as_str()));
        assert_eq!(m.live_len(), 3);
        assert!(cur.previous(&m).is_some());

        cur.reset(&m);
        assert_eq!(std::iter::from_fn(|| cur.next(&m)).count(), 3);
    }

    #[test]
    #[should_panic(expected = "structurally modified")]
    fn cursor_fails_fast() {
        let mut m: ReferenceMap<String, String> = ReferenceMap::with_strengths(Hard, Hard);
        m.put(rc("a"), rc("1"));
        let mut cur = m.cursor();
        cur.next(&m);
        m.put(rc("b"), rc("2"));
        cur.next(&m);
    }

    /// Invariant: removal through each view writes through to the table.
    #[test]
    fn views_remove_through() {
        let mut m: ReferenceMap<String, String> = ReferenceMap::with_strengths(Hard, Hard);
        for i in 0..6 {
            m.put(rc(&format!("k{i}")), rc(&format!("v{i}")));
        }
        assert!(m.keys_mut().contains("k0"));
        assert!(m.keys_mut().remove("k0"));
        assert!(!m.keys_mut().remove("k0"));
        assert!(m.values_mut().contains(&"v1".to_string()));
        assert!(m.values_mut().remove(&"v1".to_string()));
        assert!(!m.entries_mut().remove("k2", &"v3".to_string()));
        assert!(m.entries_mut().remove("k2", &"v2".to_string()));
        m.entries_mut().retain(|k, _| k != "k3");
        assert_eq!(m.keys_mut().len(), 2);
        let mut left: Vec<String> = m.values_mut().iter().map(|v| v.to_string()).collect();
        left.sort();
        assert_eq!(left, ["v4", "v5"]);
        m.values_mut().clear();
        assert!(m.is_empty());
    }

    /// Invariant: without purge_values an orphaned value stays observable
    /// while alive; with it, the value is gone with the key.
    #[test]
    fn orphaned_values_follow_purge_values() {
        for purge_values in [false, true] {
            let config = ReferenceConfig {
                purge_values,
                ..ReferenceConfig::new(WeakRef, Soft)
            };
            let mut m: ReferenceMap<String, String> =
                ReferenceMap::with_config(config, Natural::new()).unwrap();
            let k = rc("k");
            let v = rc("v");
            m.put(Rc::clone(&k), Rc::clone(&v));
            m.queue().enqueue(&k);
            drop(k);
            m.purge();
            assert!(m.get("k").is_none());
            assert_eq!(m.contains_value(&"v".to_string()), !purge_values);
            assert_eq!(m.orphaned_values().len(), usize::from(!purge_values));
            drop(v);
            assert!(!m.contains_value(&"v".to_string()));
        }
    }

    /// Invariant: identity maps distinguish equal referents by allocation.
    #[test]
    fn identity_variant_compares_referents() {
        let mut m: ReferenceIdentityMap<String, i32> = ReferenceIdentityMap::default();
        let a = rc("same");
        let b = rc("same");
        m.put(Rc::clone(&a), Rc::new(1));
        m.put(Rc::clone(&b), Rc::new(2));
        assert_eq!(m.len(), 2);
        assert_eq!(m.get(&*a).as_deref(), Some(&1));
        assert_eq!(m.get(&*b).as_deref(), Some(&2));
        assert!(m.get(&*rc("same")).is_none());
    }

    /// Invariant: replacing a value re-registers the watch so a later
    /// release of the new value still purges the entry.
    #[test]
    fn replacement_rewatches_value() {
        let mut m: ReferenceMap<str, String> = ReferenceMap::with_strengths(Hard, WeakRef);
        let queue = m.queue();
        let key: Rc<str> = Rc::from("k");
        let v1 = rc("one");
        let v2 = rc("two");
        m.put(Rc::clone(&key), Rc::clone(&v1));
        assert_eq!(m.put(Rc::clone(&key), Rc::clone(&v2)), Some(v1));
        queue.enqueue(&v2);
        drop(v2);
        m.remove("missing");
        assert_eq!(m.len(), 0);
        assert!(queue.is_empty());
    }
}
