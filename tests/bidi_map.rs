// Bidi maps through the public API.
//
// The core invariants exercised:
// - Bijection: every key maps to one value and every value back to it.
// - Inverse views share storage with the map they came from.
// - Guarded set_value: a value bound elsewhere is refused, map unchanged.
use hashed_maps::{
    BidiError, CaseInsensitive, DualBidiMap, DualHashBidiMap, DualLinkedBidiMap, DualTreeBidiMap,
};

#[test]
fn put_displaces_both_directions() {
    let mut m: DualHashBidiMap<u32, &str> = DualBidiMap::new();
    m.put(1, "x");
    m.put(2, "y");
    // 1 takes "y" from 2, and loses "x".
    assert_eq!(m.put(1, "y"), Some("x"));
    assert_eq!(m.len(), 1);
    assert_eq!(m.key_for(&"y"), Some(&1));
    assert!(!m.contains_key(&2));
    assert!(!m.contains_value(&"x"));
}

#[test]
fn inverse_reads_and_writes_through() {
    let mut m: DualLinkedBidiMap<&str, u32> = DualBidiMap::new();
    m.put("one", 1);
    m.put("two", 2);
    {
        let inv = m.inverse();
        assert_eq!(inv.get(&2), Some(&"two"));
        assert!(inv.contains_value(&"one"));
        let pairs: Vec<_> = inv.iter().map(|(v, k)| (*v, *k)).collect();
        assert_eq!(pairs, [(1, "one"), (2, "two")]);
    }
    {
        let mut inv = m.inverse_mut();
        assert_eq!(inv.remove(&1), Some("one"));
        inv.put(3, "three");
        assert_eq!(inv.len(), 2);
    }
    assert_eq!(m.get(&"three"), Some(&3));
    let flipped = m.into_inverse();
    assert_eq!(flipped.get(&2), Some(&"two"));
    assert_eq!(flipped.inverse().get(&"three"), Some(&3));
}

// Test: linked variant iterates in key insertion order.
#[test]
fn linked_variant_keeps_insertion_order() {
    let m: DualLinkedBidiMap<u32, char> = [(3, 'c'), (1, 'a'), (2, 'b')].into_iter().collect();
    let keys: Vec<_> = m.keys().iter().copied().collect();
    assert_eq!(keys, [3, 1, 2]);
    assert_eq!(format!("{m:?}"), "{3: 'c', 1: 'a', 2: 'b'}");
}

#[test]
fn cursor_set_value_is_guarded() {
    let mut m: DualLinkedBidiMap<u32, &str> = [(1, "a"), (2, "b")].into_iter().collect();
    let mut cur = m.cursor();
    cur.next(&m);
    assert_eq!(cur.set_value(&mut m, "b"), Err(BidiError::ValueAlreadyBound));
    assert_eq!(m.get(&1), Some(&"a"));
    assert_eq!(m.key_for(&"b"), Some(&2));
    assert_eq!(cur.set_value(&mut m, "z"), Ok("a"));
    assert_eq!(m.key_for(&"z"), Some(&1));
    assert_eq!(m.key_for(&"a"), None);
}

#[test]
fn views_remove_through_both_tables() {
    let mut m: DualHashBidiMap<u32, u32> = (0..10).map(|i| (i, i + 100)).collect();
    m.values_mut().retain(|v| v % 2 == 0);
    assert_eq!(m.len(), 5);
    assert_eq!(m.reverse().len(), 5);
    assert!(m.values().contains(&104));
    assert!(!m.contains_value(&105));
    m.entries_mut().clear();
    assert!(m.is_empty());
    assert_eq!(m.reverse().len(), 0);
}

// Test: one strategy serves both directions.
#[test]
fn case_insensitive_both_ways() {
    let mut m: DualHashBidiMap<String, String, CaseInsensitive> =
        DualHashBidiMap::with_strategy(CaseInsensitive::default());
    m.put("Key".to_string(), "Value".to_string());
    assert_eq!(m.get(&"KEY".to_string()).map(String::as_str), Some("Value"));
    assert_eq!(m.key_for(&"value".to_string()).map(String::as_str), Some("Key"));
}

#[test]
fn tree_ranges() {
    let mut m: DualTreeBidiMap<u32, String> = (0..10).map(|i| (i, format!("v{i}"))).collect();
    let mid = m.sub_map(&3, &7);
    assert_eq!(mid.len(), 4);
    assert_eq!(mid.first_key(), Some(&3));
    assert_eq!(mid.last_key(), Some(&6));
    assert!(mid.contains_value(&"v5".to_string()));
    assert!(!mid.contains_value(&"v7".to_string()));
    assert_eq!(mid.get(&8), None);

    let mut tail = m.range_mut(8..);
    assert_eq!(tail.remove(&2), None);
    assert_eq!(tail.remove(&9), Some("v9".to_string()));
    tail.put(8, "eight".to_string());
    assert_eq!(m.key_for(&"eight".to_string()), Some(&8));
    assert_eq!(m.key_for(&"v8".to_string()), None);
    assert_eq!(m.last_key(), Some(&8));
}

// Test: the sorted variant walks backwards through its cursor, and removal
// through views or the cursor frees the values in the reverse table.
#[test]
fn tree_cursor_and_views_keep_reverse() {
    let mut m: DualTreeBidiMap<u32, String> = [5, 1, 3, 2, 4]
        .into_iter()
        .map(|i| (i, format!("v{i}")))
        .collect();
    let mut cur = m.cursor();
    let mut walked = Vec::new();
    while let Some((k, _)) = cur.next(&m) {
        walked.push(*k);
    }
    assert_eq!(walked, [1, 2, 3, 4, 5]);
    assert_eq!(cur.previous(&m).map(|(k, _)| *k), Some(5));
    assert_eq!(cur.remove(&mut m), (5, "v5".to_string()));
    assert_eq!(cur.previous(&m).map(|(k, _)| *k), Some(4));
    assert_eq!(m.key_for(&"v5".to_string()), None);

    m.keys_mut().retain(|k| k % 2 == 0);
    assert_eq!(m.len(), 2);
    assert!(!m.contains_value(&"v3".to_string()));
    assert!(m.entries_mut().remove(&2, &"v2".to_string()));
    assert_eq!(m.key_for(&"v2".to_string()), None);
    assert_eq!(m.reverse().len(), 1);
    assert_eq!(m.values().iter().collect::<Vec<_>>(), ["v4"]);
}

#[test]
#[should_panic(expected = "map was structurally modified")]
fn tree_cursor_fails_fast() {
    let mut m: DualTreeBidiMap<u32, u32> = (0..4).map(|i| (i, i)).collect();
    let mut cur = m.cursor();
    cur.next(&m);
    m.remove(&3);
    cur.next(&m);
}

#[test]
#[should_panic(expected = "outside the range")]
fn range_put_outside_bounds_panics() {
    let mut m: DualTreeBidiMap<u32, u32> = (0..4).map(|i| (i, i)).collect();
    m.range_mut(..2).put(3, 30);
}
