//! hashed-maps: a chained hash-table engine and the map family layered on
//! it: plain, insertion-ordered, LRU-bounded, reference-purging and
//! bidirectional.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: one hash table core that every variant extends through a small
//!   set of seams, so each layer adds a single concern and can be reasoned
//!   about on its own.
//! - Layers:
//!   - RawTable<K, V, S, X>: separate-chaining table over a slotmap arena.
//!     Chains are threaded through arena keys, hashes are cached per entry,
//!     and `X` carries whatever per-entry state the layer above needs.
//!     Exposes the extension seams `insert_new`, `remove_entry`, `unlink`
//!     and `reuse`.
//!   - LinkedTable<K, V, S>: threads every entry into a doubly-linked ring
//!     closed by a header, recording insertion (or access) order. Resizes
//!     relink chains only; the ring is never rebuilt.
//!   - HashedMap, LinkedMap, LruMap: public façades. LruMap bounds the
//!     linked table and evicts by reusing the oldest entry's slot.
//!   - ReferenceMap: keys and values behind hard, soft or weak `Rc`
//!     holders, purged through a host-driven `ReferenceQueue`.
//!   - SortedTable<K, V>: slotmap arena indexed by a `BTreeMap`, giving
//!     key-ordered entries the same stable handles as the hashed tables.
//!   - DualBidiMap: two tables (hashed, linked or sorted) kept a bijection.
//! - Collaterals: every ordered façade implements `Navigable`, which backs
//!   the live views in `view` and the detached `MapCursor` in `cursor`.
//!
//! Constraints
//! - Single-threaded: no locking, no atomics beyond table identities.
//! - No per-entry heap allocation beyond the arena and the bucket array.
//! - Stable, generational slot keys behind a small `Handle` wrapper: a stale
//!   handle never resolves to a newer entry in a reused slot.
//! - O(1) average lookups; the bucket array length is always a power of two
//!   and grows by doubling once `len` passes `capacity * load_factor`.
//!
//! Hashing and rehashing
//! - Keys are hashed and compared only through the table's `HashStrategy`.
//!   The hash is computed once on insertion and cached; a resize reuses the
//!   cached value and never calls back into user code.
//!
//! Fail-fast iteration
//! - Every structural change bumps the table's modification counter. Views
//!   borrow the map, so the borrow checker rules out concurrent change; the
//!   detached `MapCursor` instead re-checks the map's identity and counter
//!   on every call and panics on a mismatch.
//! - Value replacement is not structural; an LRU promotion is.
//!
//! Error policy
//! - Bad construction parameters return `ConfigError`.
//! - A bidi `set_value` that would break the bijection returns
//!   `BidiError::ValueAlreadyBound` and leaves the map untouched.
//! - Cursor misuse panics: it is a programming error, not a runtime
//!   condition.
//!
//! Notes and non-goals
//! - No thread safety, no serialization, no sorted hash maps.
//! - ReferenceMap does not lend `&V`; it hands out `Rc<V>` snapshots since a
//!   weakly held value may disappear at any time.

pub mod config;
pub mod cursor;
pub mod error;
pub mod strategy;
pub mod view;

mod raw_table;
mod linked_table;
pub mod sorted_table;

pub mod bidi_map;
pub mod hashed_map;
pub mod linked_map;
pub mod lru_map;
pub mod reference_map;

mod table_proptest;
mod lru_map_proptest;
mod bidi_map_proptest;

// Public surface
pub use bidi_map::{
    BidiTable, DualBidiMap, DualHashBidiMap, DualLinkedBidiMap, DualTreeBidiMap, Inverse,
    InverseMut, RangeView, RangeViewMut,
};
pub use config::{LruConfig, ReferenceConfig, TableConfig};
pub use cursor::{FindKey, FindValue, Handle, MapCursor, Navigable, TableId};
pub use error::{BidiError, ConfigError, Result};
pub use hashed_map::{CaseInsensitiveMap, HashedMap, IdentityMap};
pub use linked_map::LinkedMap;
pub use lru_map::{AlwaysEvict, EvictionHook, LruMap};
pub use reference_map::{
    ReferenceCursor, ReferenceEntriesMut, ReferenceIdentityMap, ReferenceKeysMut, ReferenceMap,
    ReferenceQueue, ReferenceStrength, ReferenceValuesMut,
};
pub use sorted_table::{SortedRange, SortedTable};
pub use strategy::{ByAddress, CaseInsensitive, HashStrategy, Identity, MultiKey, Natural, ValueEquivalence};
