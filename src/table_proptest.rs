#![cfg(test)]

// Property tests for HashedMap and LinkedMap kept inside the crate so they
// can check bucket chains and the order ring after every operation.

use crate::config::TableConfig;
use crate::hashed_map::HashedMap;
use crate::linked_map::LinkedMap;
use crate::strategy::Natural;
use proptest::prelude::*;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::hash::{BuildHasher, Hasher};

// Key newtype with Borrow<str> to exercise borrowed lookup.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
struct Key(String);
impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
impl std::borrow::Borrow<str> for Key {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// Pool-indexed operations: indices shrink to earlier keys, the pool shrinks,
// and op lists shrink in length.
#[derive(Clone, Debug)]
enum OpI {
    Put(usize, i32),
    Remove(usize),
    Get(usize),
    Contains(String),
    Mutate(usize, i32),
    PopFirst,
    CursorRemove(usize),
    Iterate,
}

fn key_from(pool: &[String], i: usize) -> Key {
    Key(pool[i].clone())
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<OpI>)> {
    proptest::collection::vec("[a-z]{0,5}", 1..=12).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let contains_pool = proptest::sample::select(pool.clone());
        let op = prop_oneof![
            4 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::Put(i, v)),
            2 => idx.clone().prop_map(OpI::Remove),
            1 => idx.clone().prop_map(OpI::Get),
            1 => prop_oneof![contains_pool, "[a-z]{0,5}"].prop_map(OpI::Contains),
            1 => (idx.clone(), any::<i32>()).prop_map(|(i, d)| OpI::Mutate(i, d)),
            1 => Just(OpI::PopFirst),
            1 => (0usize..16).prop_map(OpI::CursorRemove),
            1 => Just(OpI::Iterate),
        ];
        proptest::collection::vec(op, 1..80).prop_map(move |ops| (pool.clone(), ops))
    })
}

#[derive(Clone, Default)]
struct ConstBuildHasher;
struct ConstHasher;
impl BuildHasher for ConstBuildHasher {
    type Hasher = ConstHasher;
    fn build_hasher(&self) -> Self::Hasher {
        ConstHasher
    }
}
impl Hasher for ConstHasher {
    fn write(&mut self, _bytes: &[u8]) {}
    fn finish(&self) -> u64 {
        0
    }
}

// Runs a scenario against HashedMap with the given strategy and a std
// HashMap model. Starts tiny so resizes happen mid-run.
fn run_hashed<B: BuildHasher>(
    strategy: Natural<B>,
    pool: &[String],
    ops: Vec<OpI>,
) -> Result<(), TestCaseError> {
    let mut sut: HashedMap<Key, i32, Natural<B>> =
        HashedMap::with_config(TableConfig::with_capacity(2), strategy).unwrap();
    let mut model: HashMap<Key, i32> = HashMap::new();

    for op in ops {
        match op {
            OpI::Put(i, v) => {
                let k = key_from(pool, i);
                prop_assert_eq!(sut.put(k.clone(), v), model.insert(k, v));
            }
            OpI::Remove(i) => {
                let k = key_from(pool, i);
                prop_assert_eq!(sut.remove(&k), model.remove(&k));
            }
            OpI::Get(i) => {
                let k = key_from(pool, i);
                prop_assert_eq!(sut.get(&k), model.get(&k));
            }
            OpI::Contains(s) => {
                prop_assert_eq!(sut.contains_key(s.as_str()), model.keys().any(|k| k.0 == s));
            }
            OpI::Mutate(i, d) => {
                let k = key_from(pool, i);
                if let Some(v) = sut.get_mut(&k) {
                    *v = v.saturating_add(d);
                }
                if let Some(v) = model.get_mut(&k) {
                    *v = v.saturating_add(d);
                }
            }
            OpI::PopFirst => {
                // Hashed maps have no order to pop from; remove through the
                // first entry of the iteration order instead.
                let first = sut.keys().iter().next().cloned();
                if let Some(k) = first {
                    prop_assert_eq!(sut.remove(&k), model.remove(&k));
                }
            }
            OpI::CursorRemove(n) => {
                let mut cur = sut.cursor();
                let mut hit = None;
                for _ in 0..=n {
                    hit = cur.next(&sut).map(|(k, _)| k.clone());
                }
                if let Some(k) = hit {
                    let (rk, rv) = cur.remove(&mut sut);
                    prop_assert_eq!(&rk, &k);
                    prop_assert_eq!(Some(rv), model.remove(&k));
                }
            }
            OpI::Iterate => {
                let s_keys: BTreeSet<_> = sut.keys().iter().cloned().collect();
                let m_keys: BTreeSet<_> = model.keys().cloned().collect();
                prop_assert_eq!(s_keys, m_keys);
            }
        }

        let chained = sut.assert_consistent();
        prop_assert_eq!(chained.len(), model.len());
        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
        prop_assert!(sut.len() <= sut.capacity());
    }
    Ok(())
}

// Property: HashedMap matches a std HashMap on every operation, and after
// each step every entry sits exactly once in the chain of its bucket.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_hashed_state_machine((pool, ops) in arb_scenario()) {
        run_hashed(Natural::new(), &pool, ops)?;
    }

    // Same invariants with every key in one bucket.
    #[test]
    fn prop_hashed_state_machine_with_collisions((pool, ops) in arb_scenario()) {
        run_hashed(Natural::with_hasher(ConstBuildHasher), &pool, ops)?;
    }
}

// Property: LinkedMap matches an insertion-ordered model. Updating a key
// keeps its position; the ring, walked either way, visits exactly the
// entries the chains hold, in model order.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_linked_state_machine((pool, ops) in arb_scenario()) {
        let mut sut: LinkedMap<Key, i32> =
            LinkedMap::with_config(TableConfig::with_capacity(2), Natural::new()).unwrap();
        let mut model: Vec<(Key, i32)> = Vec::new();

        for op in ops {
            match op {
                OpI::Put(i, v) => {
                    let k = key_from(&pool, i);
                    let expected = match model.iter_mut().find(|(mk, _)| *mk == k) {
                        Some((_, mv)) => Some(std::mem::replace(mv, v)),
                        None => {
                            model.push((k.clone(), v));
                            None
                        }
                    };
                    prop_assert_eq!(sut.put(k, v), expected);
                }
                OpI::Remove(i) => {
                    let k = key_from(&pool, i);
                    let expected = model
                        .iter()
                        .position(|(mk, _)| *mk == k)
                        .map(|p| model.remove(p).1);
                    prop_assert_eq!(sut.remove(&k), expected);
                }
                OpI::Get(i) => {
                    let k = key_from(&pool, i);
                    let expected = model.iter().find(|(mk, _)| *mk == k).map(|(_, v)| v);
                    prop_assert_eq!(sut.get(&k), expected);
                    let index = model.iter().position(|(mk, _)| *mk == k);
                    prop_assert_eq!(sut.index_of(&k), index);
                }
                OpI::Contains(s) => {
                    prop_assert_eq!(sut.contains_key(s.as_str()), model.iter().any(|(k, _)| k.0 == s));
                }
                OpI::Mutate(i, d) => {
                    let k = key_from(&pool, i);
                    if let Some(v) = sut.get_mut(&k) {
                        *v = v.saturating_add(d);
                    }
                    if let Some((_, v)) = model.iter_mut().find(|(mk, _)| *mk == k) {
                        *v = v.saturating_add(d);
                    }
                }
                OpI::PopFirst => {
                    let expected = if model.is_empty() { None } else { Some(model.remove(0)) };
                    prop_assert_eq!(sut.pop_first(), expected);
                }
                OpI::CursorRemove(n) => {
                    let mut cur = sut.cursor();
                    let mut hit = false;
                    for _ in 0..=n {
                        hit = cur.next(&sut).is_some();
                    }
                    if hit {
                        let removed = cur.remove(&mut sut);
                        prop_assert_eq!(removed, model.remove(n));
                        // The walk continues with the entry that followed.
                        let after = cur.next(&sut).map(|(k, v)| (k.clone(), *v));
                        prop_assert_eq!(after.as_ref(), model.get(n));
                    }
                }
                OpI::Iterate => {
                    let forward: Vec<_> = sut.iter().map(|(k, v)| (k.clone(), *v)).collect();
                    prop_assert_eq!(&forward, &model);
                    let backward: Vec<_> = sut.iter().rev().map(|(k, _)| k.clone()).collect();
                    let mut expected: Vec<_> = model.iter().map(|(k, _)| k.clone()).collect();
                    expected.reverse();
                    prop_assert_eq!(backward, expected);
                }
            }

            let ring: Vec<Key> = sut.assert_consistent().into_iter().cloned().collect();
            let model_keys: Vec<Key> = model.iter().map(|(k, _)| k.clone()).collect();
            prop_assert_eq!(ring, model_keys);
            prop_assert_eq!(sut.first_key(), model.first().map(|(k, _)| k));
            prop_assert_eq!(sut.last_key(), model.last().map(|(k, _)| k));
        }
    }
}
