use super::*;

use proptest::prelude::*;
use std::collections::{BTreeMap, HashSet};

use crate::node::ROOT_ID;

/// Walk every reachable record and check the structural invariants.
pub(crate) fn validate_tree<S: Store>(t: &Tree<S>) {
    let root = t.root().expect("root record must exist");
    assert_eq!(root.id, ROOT_ID);
    assert!(root.path.is_empty(), "root path must be empty");
    assert!(root.edge_label.is_empty(), "root edge label must be empty");

    let last = t.last_issued_id().unwrap();
    let mut seen = HashSet::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        assert!(seen.insert(node.id), "node {} reachable twice", node.id);
        assert!(node.id <= last, "node {} above watermark {last}", node.id);

        if !node.is_root() {
            assert!(!node.edge_label.is_empty(), "node {} has an empty edge", node.id);
            if node.values.is_empty() {
                assert!(
                    node.children.len() >= 2,
                    "branch-only node {} must fork",
                    node.id
                );
            }
        }

        for (&byte, &id) in &node.children {
            let child = t
                .node(id)
                .unwrap()
                .unwrap_or_else(|| panic!("dangling child {id} under node {}", node.id));
            assert_eq!(
                child.edge_label.first(),
                Some(&byte),
                "children key must be the child's first edge byte"
            );
            let mut expected = node.path.clone();
            expected.extend_from_slice(&child.edge_label);
            assert_eq!(child.path, expected, "path of node {id} must extend its parent's");
            stack.push(child);
        }
    }
}

fn sorted_entries<S: Store>(t: &Tree<S>) -> Vec<Entry> {
    let mut entries = t.entries().unwrap();
    entries.sort();
    entries
}

#[derive(Clone, Debug)]
enum Op {
    Insert(Vec<u8>, String),
    Get(Vec<u8>),
    Reopen,
}

fn key_strategy() -> impl Strategy<Value = Vec<u8>> + Clone {
    // A tiny alphabet makes shared prefixes, and so splits, the common case.
    prop_oneof![
        4 => prop::collection::vec(prop::sample::select(vec![b'a', b'b', b'c']), 0..=6),
        1 => prop::collection::vec(any::<u8>(), 0..=8),
    ]
}

fn ops_strategy() -> impl Strategy<Value = Vec<Op>> {
    let key = key_strategy();
    let op = prop_oneof![
        60 => (key.clone(), "[a-z0-9]{0,4}").prop_map(|(k, v)| Op::Insert(k, v)),
        35 => key.clone().prop_map(Op::Get),
        5 => Just(Op::Reopen),
    ];
    prop::collection::vec(op, 0..=200)
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        max_shrink_iters: 10_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_equivalence(ops in ops_strategy()) {
        let store = MemStore::new();
        let mut t = Tree::with_store(store.clone()).unwrap();
        let mut m: BTreeMap<Vec<u8>, Vec<String>> = BTreeMap::new();
        let mut watermark = t.last_issued_id().unwrap();

        for op in ops {
            match op {
                Op::Insert(key, value) => {
                    t.insert(&key, value.clone()).unwrap();
                    m.entry(key).or_default().push(value);
                }
                Op::Get(key) => {
                    prop_assert_eq!(t.get(&key).unwrap(), m.get(&key).cloned());
                }
                Op::Reopen => {
                    let closed_at = t.close().unwrap();
                    t = Tree::with_store(store.clone()).unwrap();
                    prop_assert_eq!(t.last_issued_id().unwrap(), closed_at);
                }
            }

            let now = t.last_issued_id().unwrap();
            prop_assert!(now >= watermark, "watermark went backwards: {} -> {}", watermark, now);
            watermark = now;
        }

        validate_tree(&t);
        let expected: Vec<Entry> = m.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        prop_assert_eq!(sorted_entries(&t), expected);
        for (key, values) in &m {
            let (node, matched) = t.lookup(&t.root().unwrap(), key, 0).unwrap();
            prop_assert_eq!(matched, key.len());
            prop_assert_eq!(&node.path, key);
            prop_assert_eq!(&node.values, values);
        }
    }

    #[test]
    fn prop_scan_prefix_matches_model(
        keys in prop::collection::vec(key_strategy(), 0..=60),
        prefix in key_strategy(),
    ) {
        let mut t = Tree::with_store(MemStore::new()).unwrap();
        let mut m: BTreeMap<Vec<u8>, Vec<String>> = BTreeMap::new();
        for (i, key) in keys.into_iter().enumerate() {
            t.insert(&key, i.to_string()).unwrap();
            m.entry(key).or_default().push(i.to_string());
        }

        let mut got = t.scan_prefix(&prefix).unwrap();
        got.sort();
        let expected: Vec<Entry> = m
            .iter()
            .filter(|(k, _)| k.starts_with(&prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        prop_assert_eq!(got, expected);
    }
}

fn for_each_permutation<T: Clone>(items: &[T], mut f: impl FnMut(Vec<T>)) {
    fn rec<T: Clone>(items: &[T], used: &mut [bool], out: &mut Vec<T>, f: &mut impl FnMut(Vec<T>)) {
        if out.len() == items.len() {
            f(out.clone());
            return;
        }
        for i in 0..items.len() {
            if used[i] {
                continue;
            }
            used[i] = true;
            out.push(items[i].clone());
            rec(items, used, out, f);
            out.pop();
            used[i] = false;
        }
    }

    let mut used = vec![false; items.len()];
    let mut out = Vec::with_capacity(items.len());
    rec(items, &mut used, &mut out, &mut f);
}

#[test]
fn exhaustive_insert_order_small_set() {
    let keys: Vec<Vec<u8>> = vec![
        b"a".to_vec(),
        b"b".to_vec(),
        b"c".to_vec(),
        b"aa".to_vec(),
        b"ab".to_vec(),
        b"ba".to_vec(),
    ];

    for_each_permutation(&keys, |perm| {
        let mut t = Tree::with_store(MemStore::new()).unwrap();
        let mut m: BTreeMap<Vec<u8>, Vec<String>> = BTreeMap::new();

        for (i, k) in perm.into_iter().enumerate() {
            t.insert(&k, i.to_string()).unwrap();
            m.entry(k).or_default().push(i.to_string());
        }

        validate_tree(&t);
        let expected: Vec<Entry> = m.into_iter().collect();
        assert_eq!(sorted_entries(&t), expected);
    });
}

#[test]
fn exhaustive_split_order_nested_prefixes() {
    // Every key is a prefix of, or diverges mid-edge from, another one.
    let keys: Vec<&str> = vec!["abcd", "ab", "abx", "abcq", "a", "abcdz"];

    for_each_permutation(&keys, |perm| {
        let mut t = Tree::with_store(MemStore::new()).unwrap();
        for key in &perm {
            t.insert(key, *key).unwrap();
        }

        validate_tree(&t);
        for key in &keys {
            assert_eq!(
                t.get(key).unwrap(),
                Some(vec![key.to_string()]),
                "lost {key} after order {perm:?}"
            );
        }
        assert_eq!(t.entries().unwrap().len(), keys.len());
    });
}
