//! Positional navigation shared by every map, and the detached cursor built
//! on it.
//!
//! A `MapCursor` does not borrow its map. It records the map's `TableId`
//! and modification count when created and after each of its own
//! structural operations, and takes the map as an argument on every call.
//! Any call that finds a different table, or a counter that moved without
//! the cursor's involvement, panics before returning data.

pub use crate::raw_table::{Handle, TableId};

/// A map whose entries can be walked in a stable order by handle.
///
/// `Self::Rejection` is what `replace_value` may refuse with: maps that
/// accept any value use `core::convert::Infallible`.
pub trait Navigable {
    type Key;
    type Value;
    type Rejection;

    fn table_id(&self) -> TableId;
    fn modification_count(&self) -> u64;
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn first_handle(&self) -> Option<Handle>;
    fn last_handle(&self) -> Option<Handle>;
    fn handle_after(&self, h: Handle) -> Option<Handle>;
    fn handle_before(&self, h: Handle) -> Option<Handle>;
    fn find_key(&self, key: &Self::Key) -> Option<Handle>;
    fn entry(&self, h: Handle) -> Option<(&Self::Key, &Self::Value)>;

    /// Replace the value at a live handle. Does not count as a structural
    /// change.
    ///
    /// Panics if `h` does not refer to a live entry.
    fn replace_value(&mut self, h: Handle, value: Self::Value)
        -> Result<Self::Value, Self::Rejection>;

    fn remove_handle(&mut self, h: Handle) -> Option<(Self::Key, Self::Value)>;
}

/// Lookup by a borrowed form `Q` of a `Navigable` map's key, so views of a
/// `String`-keyed map can be queried with `&str`.
pub trait FindKey<Q: ?Sized>: Navigable {
    fn find_key_by(&self, key: &Q) -> Option<Handle>;
}

/// Value lookup for a `Navigable` map.
///
/// The default `find_value` is a linear scan in navigation order; maps with
/// a value index override it.
pub trait FindValue: Navigable {
    fn values_equal(&self, a: &Self::Value, b: &Self::Value) -> bool;

    fn find_value(&self, value: &Self::Value) -> Option<Handle> {
        let mut cur = self.first_handle();
        while let Some(h) = cur {
            if let Some((_, v)) = self.entry(h) {
                if self.values_equal(v, value) {
                    return Some(h);
                }
            }
            cur = self.handle_after(h);
        }
        None
    }
}

pub(crate) fn assert_owner(owner: TableId, actual: TableId) {
    assert!(actual == owner, "cursor used with a map it was not created from");
}

/// Panics unless the cursor's recorded table and counter match the map's.
pub(crate) fn assert_in_sync(owner: TableId, expected: u64, actual: TableId, count: u64) {
    assert_owner(owner, actual);
    assert!(
        count == expected,
        "map was structurally modified outside this cursor"
    );
}

pub(crate) fn no_current_entry() -> ! {
    panic!("cursor has no current entry: call next or previous first")
}

/// Detached bidirectional cursor.
///
/// The cursor sits between two entries. `next` returns the entry after the
/// gap and moves past it, `previous` the entry before it. `key`, `value`,
/// `set_value` and `remove` act on whichever entry was returned last.
#[derive(Debug, Clone)]
pub struct MapCursor {
    owner: TableId,
    expected: u64,
    /// Entry `next` would return; `None` once past the end.
    next: Option<Handle>,
    last: Option<Handle>,
}

impl MapCursor {
    /// A cursor positioned before the first entry of `map`.
    pub fn new<M: Navigable + ?Sized>(map: &M) -> Self {
        Self {
            owner: map.table_id(),
            expected: map.modification_count(),
            next: map.first_handle(),
            last: None,
        }
    }

    fn check<M: Navigable + ?Sized>(&self, map: &M) {
        assert_in_sync(self.owner, self.expected, map.table_id(), map.modification_count());
    }

    fn current(&self) -> Handle {
        match self.last {
            Some(h) => h,
            None => no_current_entry(),
        }
    }

    pub fn has_next<M: Navigable + ?Sized>(&self, map: &M) -> bool {
        self.check(map);
        self.next.is_some()
    }

    pub fn has_previous<M: Navigable + ?Sized>(&self, map: &M) -> bool {
        self.check(map);
        self.before_gap(map).is_some()
    }

    fn before_gap<M: Navigable + ?Sized>(&self, map: &M) -> Option<Handle> {
        match self.next {
            Some(n) => map.handle_before(n),
            None => map.last_handle(),
        }
    }

    pub fn next<'m, M: Navigable + ?Sized>(
        &mut self,
        map: &'m M,
    ) -> Option<(&'m M::Key, &'m M::Value)> {
        self.check(map);
        let h = self.next?;
        self.next = map.handle_after(h);
        self.last = Some(h);
        map.entry(h)
    }

    pub fn previous<'m, M: Navigable + ?Sized>(
        &mut self,
        map: &'m M,
    ) -> Option<(&'m M::Key, &'m M::Value)> {
        self.check(map);
        let h = self.before_gap(map)?;
        self.next = Some(h);
        self.last = Some(h);
        map.entry(h)
    }

    /// Key of the entry last returned by `next` or `previous`.
    ///
    /// Panics before the first move, after `remove`, or on a stale cursor.
    pub fn key<'m, M: Navigable + ?Sized>(&self, map: &'m M) -> &'m M::Key {
        self.check(map);
        match map.entry(self.current()) {
            Some((k, _)) => k,
            None => panic!("cursor position no longer refers to a live entry"),
        }
    }

    pub fn value<'m, M: Navigable + ?Sized>(&self, map: &'m M) -> &'m M::Value {
        self.check(map);
        match map.entry(self.current()) {
            Some((_, v)) => v,
            None => panic!("cursor position no longer refers to a live entry"),
        }
    }

    /// Replace the current entry's value, returning the old one, or the
    /// map's rejection with the map unchanged.
    pub fn set_value<M: Navigable + ?Sized>(
        &mut self,
        map: &mut M,
        value: M::Value,
    ) -> Result<M::Value, M::Rejection> {
        self.check(map);
        let h = self.current();
        let result = map.replace_value(h, value);
        self.expected = map.modification_count();
        result
    }

    /// Remove the current entry. The cursor stays in the same gap, so the
    /// following `next`/`previous` continue the walk.
    ///
    /// Panics when there is no current entry, including a second `remove`
    /// without an intervening move.
    pub fn remove<M: Navigable + ?Sized>(&mut self, map: &mut M) -> (M::Key, M::Value) {
        self.check(map);
        let h = self.current();
        if self.next == Some(h) {
            self.next = map.handle_after(h);
        }
        let removed = match map.remove_handle(h) {
            Some(kv) => kv,
            None => panic!("cursor position no longer refers to a live entry"),
        };
        self.last = None;
        self.expected = map.modification_count();
        removed
    }

    /// Rewind to before the first entry and resynchronize with the map's
    /// current state.
    pub fn reset<M: Navigable + ?Sized>(&mut self, map: &M) {
        assert_owner(self.owner, map.table_id());
        self.expected = map.modification_count();
        self.next = map.first_handle();
        self.last = None;
    }
}
