#![cfg(test)]

// Property tests for the bidi maps: after any operation sequence the forward
// and reverse tables are exact mirrors and agree with a one-way model.

use crate::bidi_map::{BidiTable, DualBidiMap, DualHashBidiMap, DualLinkedBidiMap, DualTreeBidiMap};
use crate::cursor::Navigable;
use crate::error::BidiError;
use core::convert::Infallible;
use proptest::prelude::*;
use std::collections::BTreeMap;

#[derive(Clone, Debug)]
enum Op {
    Put(u8, u8),
    InversePut(u8, u8),
    Remove(u8),
    RemoveByValue(u8),
    CursorSet(usize, u8),
}

fn arb_op() -> impl Strategy<Value = Op> {
    let small = 0u8..8;
    prop_oneof![
        4 => (small.clone(), small.clone()).prop_map(|(k, v)| Op::Put(k, v)),
        1 => (small.clone(), small.clone()).prop_map(|(v, k)| Op::InversePut(v, k)),
        1 => small.clone().prop_map(Op::Remove),
        1 => small.clone().prop_map(Op::RemoveByValue),
        1 => (0usize..8, small).prop_map(|(n, v)| Op::CursorSet(n, v)),
    ]
}

fn model_put(model: &mut BTreeMap<u8, u8>, k: u8, v: u8) -> Option<u8> {
    model.retain(|mk, mv| *mv != v || *mk == k);
    model.insert(k, v)
}

fn check_mirror<F, R>(sut: &DualBidiMap<u8, u8, F, R>, model: &BTreeMap<u8, u8>) -> Result<(), TestCaseError>
where
    F: BidiTable<u8, u8>,
    R: BidiTable<u8, u8>,
{
    prop_assert_eq!(sut.len(), model.len());
    prop_assert_eq!(sut.reverse().len(), model.len());
    for (k, v) in model {
        prop_assert_eq!(sut.get(k), Some(v));
        prop_assert_eq!(sut.key_for(v), Some(k));
    }
    let mut forward: Vec<_> = sut.iter().map(|(k, v)| (*k, *v)).collect();
    forward.sort();
    let want: Vec<_> = model.iter().map(|(k, v)| (*k, *v)).collect();
    prop_assert_eq!(forward, want);
    Ok(())
}

fn run_ops<F, R>(sut: &mut DualBidiMap<u8, u8, F, R>, ops: Vec<Op>) -> Result<(), TestCaseError>
where
    F: BidiTable<u8, u8>,
    R: BidiTable<u8, u8>,
{
    let mut model = BTreeMap::new();
    for op in ops {
        match op {
            Op::Put(k, v) => {
                let expected = model_put(&mut model, k, v);
                prop_assert_eq!(sut.put(k, v), expected);
            }
            Op::InversePut(v, k) => {
                let expected = model.iter().find(|(_, mv)| **mv == v).map(|(mk, _)| *mk);
                model_put(&mut model, k, v);
                prop_assert_eq!(sut.inverse_mut().put(v, k), expected);
            }
            Op::Remove(k) => {
                prop_assert_eq!(sut.remove(&k), model.remove(&k));
            }
            Op::RemoveByValue(v) => {
                let expected = model.iter().find(|(_, mv)| **mv == v).map(|(mk, _)| *mk);
                if let Some(k) = expected {
                    model.remove(&k);
                }
                prop_assert_eq!(sut.remove_by_value(&v), expected);
            }
            // Cursors need a navigable forward table; handled separately.
            Op::CursorSet(..) => {}
        }
        check_mirror(sut, &model)?;
    }
    Ok(())
}

// Property: the hash, linked and tree variants all keep the bijection.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_hash_bidi_bijection(ops in proptest::collection::vec(arb_op(), 1..60)) {
        let mut sut: DualHashBidiMap<u8, u8> = DualBidiMap::new();
        run_ops(&mut sut, ops)?;
    }

    #[test]
    fn prop_linked_bidi_bijection(ops in proptest::collection::vec(arb_op(), 1..60)) {
        let mut sut: DualLinkedBidiMap<u8, u8> = DualBidiMap::new();
        run_ops(&mut sut, ops)?;
    }

    #[test]
    fn prop_tree_bidi_bijection(ops in proptest::collection::vec(arb_op(), 1..60)) {
        let mut sut: DualTreeBidiMap<u8, u8> = DualBidiMap::new();
        run_ops(&mut sut, ops)?;
    }
}

fn run_cursor_ops<F, R>(sut: &mut DualBidiMap<u8, u8, F, R>, ops: Vec<Op>) -> Result<(), TestCaseError>
where
    F: BidiTable<u8, u8> + Navigable<Key = u8, Value = u8, Rejection = Infallible>,
    R: BidiTable<u8, u8>,
{
    let mut model = BTreeMap::new();
    for op in ops {
        match op {
            Op::Put(k, v) | Op::InversePut(v, k) => {
                model_put(&mut model, k, v);
                sut.put(k, v);
            }
            Op::Remove(k) => {
                model.remove(&k);
                sut.remove(&k);
            }
            Op::RemoveByValue(v) => {
                model.retain(|_, mv| *mv != v);
                sut.remove_by_value(&v);
            }
            Op::CursorSet(n, v) => {
                let mut cur = sut.cursor();
                let mut key = None;
                for _ in 0..=n {
                    key = cur.next(&*sut).map(|(k, _)| *k);
                }
                if let Some(k) = key {
                    let holder = model.iter().find(|(_, mv)| **mv == v).map(|(mk, _)| *mk);
                    let result = cur.set_value(&mut *sut, v);
                    match holder {
                        Some(other) if other != k => {
                            prop_assert_eq!(result, Err(BidiError::ValueAlreadyBound));
                        }
                        _ => {
                            prop_assert_eq!(result, Ok(model[&k]));
                            model.insert(k, v);
                        }
                    }
                    // The cursor stays usable after either outcome.
                    prop_assert_eq!(cur.key(&*sut), &k);
                }
            }
        }
        check_mirror(sut, &model)?;
    }
    Ok(())
}

// Property: set_value through a cursor either succeeds and rebinds the
// value, or is refused because another key holds it, with the map intact.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_linked_cursor_set_value_guards(ops in proptest::collection::vec(arb_op(), 1..60)) {
        let mut sut: DualLinkedBidiMap<u8, u8> = DualBidiMap::new();
        run_cursor_ops(&mut sut, ops)?;
    }

    #[test]
    fn prop_tree_cursor_set_value_guards(ops in proptest::collection::vec(arb_op(), 1..60)) {
        let mut sut: DualTreeBidiMap<u8, u8> = DualBidiMap::new();
        run_cursor_ops(&mut sut, ops)?;
    }
}
