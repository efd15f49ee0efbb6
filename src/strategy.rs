//! Pluggable key hashing/equality and value equivalence.
//!
//! Every table takes one strategy object `S` at construction. Keys are
//! hashed and compared through `HashStrategy`, values through
//! `ValueEquivalence`. The two traits are separate so that a strategy can
//! fold key case (say) while comparing values naturally.
//!
//! The hash a strategy produces for a key is computed once at insertion and
//! cached in the entry; tables never rehash a stored key.

use core::borrow::Borrow;
use core::hash::{BuildHasher, Hash, Hasher};
use core::ops::Deref;
use std::collections::hash_map::RandomState;

/// Hashing and equality for keys of type `T`.
///
/// Implementations must be consistent: `equals(a, b)` implies
/// `hash(a) == hash(b)`. When a table is queried with a borrowed form `Q` of
/// its key type, the strategy must hash `Q` and `K` identically, as
/// `Borrow` requires for `Hash`.
pub trait HashStrategy<T: ?Sized> {
    fn hash(&self, value: &T) -> u64;
    fn equals(&self, a: &T, b: &T) -> bool;
}

/// Equality used by value scans (`contains_value`, value views).
pub trait ValueEquivalence<T: ?Sized> {
    fn values_equal(&self, a: &T, b: &T) -> bool;
}

/// The key's own `Hash`/`Eq`, hashed with `S`.
#[derive(Clone, Debug, Default)]
pub struct Natural<S = RandomState> {
    hasher: S,
}

impl Natural {
    /// Natural hashing with the standard `RandomState`.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<S> Natural<S> {
    pub fn with_hasher(hasher: S) -> Self {
        Self { hasher }
    }
}

impl<T, S> HashStrategy<T> for Natural<S>
where
    T: ?Sized + Hash + Eq,
    S: BuildHasher,
{
    #[inline]
    fn hash(&self, value: &T) -> u64 {
        self.hasher.hash_one(value)
    }

    #[inline]
    fn equals(&self, a: &T, b: &T) -> bool {
        a == b
    }
}

impl<T: ?Sized + PartialEq, S> ValueEquivalence<T> for Natural<S> {
    #[inline]
    fn values_equal(&self, a: &T, b: &T) -> bool {
        a == b
    }
}

#[inline]
fn address<T: ?Sized>(r: &T) -> usize {
    (r as *const T).cast::<()>() as usize
}

/// Pointer identity for smart-pointer keys and values (`Rc`, `Arc`, `Box`,
/// `&T`): two keys are equal only if they point at the same allocation.
#[derive(Clone, Copy, Debug, Default)]
pub struct Identity;

impl<T: Deref> HashStrategy<T> for Identity {
    #[inline]
    fn hash(&self, value: &T) -> u64 {
        address(&**value) as u64
    }

    #[inline]
    fn equals(&self, a: &T, b: &T) -> bool {
        address(&**a) == address(&**b)
    }
}

impl<T: Deref> ValueEquivalence<T> for Identity {
    #[inline]
    fn values_equal(&self, a: &T, b: &T) -> bool {
        address(&**a) == address(&**b)
    }
}

/// Identity of the referenced place itself.
///
/// Only meaningful when the references handed to the table point into
/// storage that does not move, such as the inside of an `Rc` allocation.
/// `ReferenceMap` uses this to compare referents by identity.
#[derive(Clone, Copy, Debug, Default)]
pub struct ByAddress;

impl<T: ?Sized> HashStrategy<T> for ByAddress {
    #[inline]
    fn hash(&self, value: &T) -> u64 {
        address(value) as u64
    }

    #[inline]
    fn equals(&self, a: &T, b: &T) -> bool {
        address(a) == address(b)
    }
}

impl<T: ?Sized> ValueEquivalence<T> for ByAddress {
    #[inline]
    fn values_equal(&self, a: &T, b: &T) -> bool {
        address(a) == address(b)
    }
}

/// Case-insensitive string keys. Values compare naturally.
///
/// Keys are folded upper-then-lower per character, so `"STRASSE"`,
/// `"strasse"` and `"Strasse"` collide. The stored key keeps the spelling it
/// was first inserted with.
#[derive(Clone, Debug, Default)]
pub struct CaseInsensitive<S = RandomState> {
    hasher: S,
}

impl<S> CaseInsensitive<S> {
    pub fn with_hasher(hasher: S) -> Self {
        Self { hasher }
    }
}

fn fold(s: &str) -> impl Iterator<Item = char> + '_ {
    s.chars()
        .flat_map(char::to_uppercase)
        .flat_map(char::to_lowercase)
}

impl<T, S> HashStrategy<T> for CaseInsensitive<S>
where
    T: ?Sized + AsRef<str>,
    S: BuildHasher,
{
    fn hash(&self, value: &T) -> u64 {
        let mut h = self.hasher.build_hasher();
        for c in fold(value.as_ref()) {
            h.write_u32(c as u32);
        }
        h.write_u8(0xff);
        h.finish()
    }

    fn equals(&self, a: &T, b: &T) -> bool {
        fold(a.as_ref()).eq(fold(b.as_ref()))
    }
}

impl<T: ?Sized + PartialEq, S> ValueEquivalence<T> for CaseInsensitive<S> {
    #[inline]
    fn values_equal(&self, a: &T, b: &T) -> bool {
        a == b
    }
}

/// A composite key made of several parts, hashed and compared as a unit.
///
/// Borrows as `[T]`, so a table keyed by `MultiKey<T>` can be queried with a
/// plain slice: `map.get(&["a", "b"][..])`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MultiKey<T>(Box<[T]>);

impl<T> MultiKey<T> {
    pub fn new<I: IntoIterator<Item = T>>(parts: I) -> Self {
        MultiKey(parts.into_iter().collect())
    }

    pub fn parts(&self) -> &[T] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<T> From<Vec<T>> for MultiKey<T> {
    fn from(parts: Vec<T>) -> Self {
        MultiKey(parts.into_boxed_slice())
    }
}

impl<T> Borrow<[T]> for MultiKey<T> {
    fn borrow(&self) -> &[T] {
        &self.0
    }
}
