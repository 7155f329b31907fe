use btree::{BTree, Config, MemoryStore};
use proptest::collection::vec;
use proptest::prelude::*;
use std::collections::BTreeSet;

fn empty_tree(min_degree: usize) -> BTree<MemoryStore> {
    BTree::open_store(
        MemoryStore::new(),
        &Config::new().with_min_degree(min_degree),
    )
    .unwrap()
}

fn degrees() -> impl Strategy<Value = usize> {
    prop_oneof![Just(2usize), Just(3usize), Just(10usize)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn inserted_keys_come_back_sorted_without_duplicates(
        t in degrees(),
        keys in vec(-500i32..500, 0..400),
    ) {
        let mut tree = empty_tree(t);
        for key in &keys {
            tree.insert(*key).unwrap();
        }

        let expected: Vec<i32> = keys.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
        prop_assert_eq!(tree.keys().unwrap(), expected.clone());

        let stats = tree.validate().unwrap();
        prop_assert_eq!(stats.keys, expected.len());
        prop_assert_eq!(stats.height, tree.height().unwrap());
        for key in &expected {
            prop_assert!(tree.contains(*key).unwrap());
        }
    }

    #[test]
    fn removals_drop_exactly_the_removed_key(
        t in degrees(),
        keys in vec(0i32..300, 0..300),
        removals in vec(0i32..300, 0..300),
    ) {
        let mut tree = empty_tree(t);
        let mut model = BTreeSet::new();
        for key in &keys {
            tree.insert(*key).unwrap();
            model.insert(*key);
        }

        for key in &removals {
            prop_assert_eq!(tree.remove(*key).unwrap(), model.remove(key));
            prop_assert!(!tree.contains(*key).unwrap());
            tree.validate().unwrap();
        }
        prop_assert_eq!(tree.keys().unwrap(), model.into_iter().collect::<Vec<_>>());
    }

    #[test]
    fn removing_an_absent_key_changes_no_record(
        t in degrees(),
        keys in vec(0i32..1000, 1..300),
        absent in 0i32..1000,
    ) {
        let mut tree = empty_tree(t);
        for key in &keys {
            tree.insert(*key * 2).unwrap();
        }
        let before = tree.pager().store().clone();
        prop_assert!(!tree.remove(absent * 2 + 1).unwrap());
        prop_assert!(!tree.remove(1).unwrap());
        prop_assert_eq!(tree.pager().store(), &before);
    }

    #[test]
    fn interleaved_inserts_and_removes_keep_invariants(
        t in degrees(),
        ops in vec((any::<bool>(), 0i32..120), 0..500),
    ) {
        let mut tree = empty_tree(t);
        let mut model = BTreeSet::new();
        for (insert, key) in ops {
            if insert {
                tree.insert(key).unwrap();
                model.insert(key);
            } else {
                prop_assert_eq!(tree.remove(key).unwrap(), model.remove(&key));
            }
        }
        tree.validate().unwrap();
        prop_assert_eq!(tree.keys().unwrap(), model.into_iter().collect::<Vec<_>>());
    }
}

#[test]
fn emptying_a_tall_tree_returns_to_a_single_leaf() {
    let mut tree = empty_tree(10);
    for key in 0..5000 {
        tree.insert(key).unwrap();
    }
    assert!(tree.height().unwrap() >= 3);

    for key in (0..5000).rev() {
        assert!(tree.remove(key).unwrap());
    }
    let stats = tree.validate().unwrap();
    assert_eq!(stats.height, 1);
    assert_eq!(stats.nodes, 1);
    assert_eq!(stats.keys, 0);
    assert_eq!(tree.pager().store().len(), 1);
}
