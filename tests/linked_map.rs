// LinkedMap through the public API.
//
// The core invariants exercised:
// - Order: iteration follows first insertion; updates keep position.
// - Neighbours and indices agree with iteration order.
// - Cursor and view removals keep the order of the survivors.
use hashed_maps::{LinkedMap, Navigable};

fn keys(m: &LinkedMap<&'static str, i32>) -> Vec<&'static str> {
    m.keys().iter().copied().collect()
}

#[test]
fn order_survives_updates_and_removals() {
    let mut m = LinkedMap::new();
    for (i, k) in ["d", "a", "c", "b"].into_iter().enumerate() {
        m.put(k, i as i32);
    }
    m.put("d", 10);
    m.remove("c");
    m.put("c", 11);
    assert_eq!(keys(&m), ["d", "a", "b", "c"]);
    assert_eq!(m.first(), Some((&"d", &10)));
    assert_eq!(m.last(), Some((&"c", &11)));
}

#[test]
fn neighbours_and_positions() {
    let m: LinkedMap<&str, i32> = [("x", 1), ("y", 2), ("z", 3)].into_iter().collect();
    assert_eq!(m.next_key("x"), Some(&"y"));
    assert_eq!(m.next_key("z"), None);
    assert_eq!(m.previous_key("y"), Some(&"x"));
    assert_eq!(m.previous_key("x"), None);
    assert_eq!(m.next_key("missing"), None);
    assert_eq!(m.index_of("z"), Some(2));
    assert_eq!(m.get_index(1), Some((&"y", &2)));
    assert_eq!(m.get_index(3), None);
}

#[test]
fn remove_index_and_pop() {
    let mut m: LinkedMap<&str, i32> = (0..6).map(|i| (["a", "b", "c", "d", "e", "f"][i], i as i32)).collect();
    assert_eq!(m.remove_index(4), Some(("e", 4)));
    assert_eq!(m.remove_index(9), None);
    assert_eq!(m.pop_first(), Some(("a", 0)));
    assert_eq!(m.pop_last(), Some(("f", 5)));
    assert_eq!(keys(&m), ["b", "c", "d"]);
}

// Test: removing through a cursor mid-walk keeps the walk in order.
#[test]
fn cursor_filters_in_order() {
    let mut m: LinkedMap<&str, i32> = [("a", 1), ("b", 2), ("c", 3), ("d", 4)].into_iter().collect();
    let mut cur = m.cursor();
    let mut visited = Vec::new();
    while let Some((k, v)) = cur.next(&m) {
        visited.push(*k);
        if v % 2 == 0 {
            cur.remove(&mut m);
        }
    }
    assert_eq!(visited, ["a", "b", "c", "d"]);
    assert_eq!(keys(&m), ["a", "c"]);

    // Walking back visits the survivors in reverse.
    let mut back = Vec::new();
    while let Some((k, _)) = cur.previous(&m) {
        back.push(*k);
    }
    assert_eq!(back, ["c", "a"]);
    assert!(!cur.has_previous(&m));
}

#[test]
fn views_follow_order() {
    let mut m: LinkedMap<&str, i32> = [("q", 1), ("r", 2), ("s", 3)].into_iter().collect();
    let values: Vec<_> = m.values().iter().rev().copied().collect();
    assert_eq!(values, [3, 2, 1]);
    m.entries_mut().retain(|k, _| *k != "r");
    assert_eq!(keys(&m), ["q", "s"]);
    assert_eq!(m.keys().len(), 2);
    assert!(m.keys().contains(&"s"));
}

#[test]
fn owning_iteration_in_order_from_both_ends() {
    let m: LinkedMap<i32, i32> = (0..5).map(|i| (i, i * i)).collect();
    let mut it = m.into_iter();
    assert_eq!(it.len(), 5);
    assert_eq!(it.next(), Some((0, 0)));
    assert_eq!(it.next_back(), Some((4, 16)));
    assert_eq!(it.collect::<Vec<_>>(), [(1, 1), (2, 4), (3, 9)]);
}

#[test]
fn equality_ignores_order_and_clones_are_new_tables() {
    let a: LinkedMap<i32, i32> = [(1, 1), (2, 2)].into_iter().collect();
    let b: LinkedMap<i32, i32> = [(2, 2), (1, 1)].into_iter().collect();
    assert_eq!(a, b);
    let c = a.clone();
    assert_eq!(a, c);
    assert_ne!(a.table_id(), c.table_id());
    assert_eq!(format!("{a:?}"), "{1: 1, 2: 2}");
}
