#![cfg(test)]

// Property tests for LruMap against a VecDeque model ordered from least to
// most recently used.

use crate::config::LruConfig;
use crate::lru_map::LruMap;
use crate::strategy::Natural;
use proptest::prelude::*;
use std::collections::VecDeque;

#[derive(Clone, Debug)]
enum Op {
    Put(u8, i32),
    Get(u8),
    Peek(u8),
    Remove(u8),
    Iterate,
}

fn arb_op() -> impl Strategy<Value = Op> {
    let key = 0u8..10;
    prop_oneof![
        4 => (key.clone(), -5i32..50).prop_map(|(k, v)| Op::Put(k, v)),
        2 => key.clone().prop_map(Op::Get),
        1 => key.clone().prop_map(Op::Peek),
        1 => key.prop_map(Op::Remove),
        1 => Just(Op::Iterate),
    ]
}

// Negative values are protected from eviction.
fn evictable(v: i32) -> bool {
    v >= 0
}

struct Model {
    entries: VecDeque<(u8, i32)>,
    max_size: usize,
    scan: bool,
}

impl Model {
    fn position(&self, k: u8) -> Option<usize> {
        self.entries.iter().position(|(mk, _)| *mk == k)
    }

    fn promote(&mut self, k: u8) -> Option<i32> {
        let p = self.position(k)?;
        let entry = self.entries.remove(p)?;
        self.entries.push_back(entry);
        Some(entry.1)
    }

    fn put(&mut self, k: u8, v: i32) -> Option<i32> {
        if let Some(p) = self.position(k) {
            let (_, old) = self.entries.remove(p)?;
            self.entries.push_back((k, v));
            return Some(old);
        }
        if self.entries.len() >= self.max_size {
            let victim = if self.scan {
                self.entries.iter().position(|(_, mv)| evictable(*mv))
            } else {
                self.entries.front().filter(|(_, mv)| evictable(*mv)).map(|_| 0)
            };
            if let Some(p) = victim {
                self.entries.remove(p);
            }
        }
        self.entries.push_back((k, v));
        None
    }
}

// Property: under any mix of puts, promoting reads, peeks and removals the
// map holds exactly the model's entries in the model's recency order. It
// grows past the bound only when every candidate it was allowed to offer
// the hook was refused.
proptest! {
    #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]
    #[test]
    fn prop_lru_state_machine(
        max_size in 1usize..6,
        scan in any::<bool>(),
        ops in proptest::collection::vec(arb_op(), 1..100),
    ) {
        let config = LruConfig { scan_until_removable: scan, ..LruConfig::with_max_size(max_size) };
        let mut sut = LruMap::with_config(config, Natural::new(), |_: &u8, v: &i32| evictable(*v))
            .unwrap();
        let mut model = Model { entries: VecDeque::new(), max_size, scan };

        for op in ops {
            match op {
                Op::Put(k, v) => {
                    let expected = model.put(k, v);
                    prop_assert_eq!(sut.put(k, v), expected);
                }
                Op::Get(k) => {
                    let expected = model.promote(k);
                    prop_assert_eq!(sut.get(&k).copied(), expected);
                }
                Op::Peek(k) => {
                    let expected = model.position(k).map(|p| model.entries[p].1);
                    prop_assert_eq!(sut.peek(&k).copied(), expected);
                }
                Op::Remove(k) => {
                    let expected = model.position(k).and_then(|p| model.entries.remove(p)).map(|e| e.1);
                    prop_assert_eq!(sut.remove(&k), expected);
                }
                Op::Iterate => {
                    let got: Vec<_> = sut.iter().map(|(k, v)| (*k, *v)).collect();
                    let want: Vec<_> = model.entries.iter().copied().collect();
                    prop_assert_eq!(got, want);
                }
            }

            let ring: Vec<u8> = sut.assert_consistent().into_iter().copied().collect();
            let want: Vec<u8> = model.entries.iter().map(|(k, _)| *k).collect();
            prop_assert_eq!(ring, want);
            prop_assert_eq!(sut.lru_key(), model.entries.front().map(|(k, _)| k));
            prop_assert_eq!(sut.mru_key(), model.entries.back().map(|(k, _)| k));
            prop_assert_eq!(sut.len(), model.entries.len());
            prop_assert_eq!(sut.is_full(), model.entries.len() >= max_size);
        }
    }
}
