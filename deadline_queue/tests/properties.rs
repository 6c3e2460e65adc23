//! Structural properties of the deadline skip list under arbitrary
//! insert/remove sequences, checked against an ordered-set model.

use core_types::{Pid, VirtualDeadline};
use deadline_queue::{DeadlineSkipList, EntryKey, QueueError, SkipListConfig};
use proptest::prelude::*;
use std::collections::BTreeSet;

#[derive(Debug, Clone)]
enum Op {
    Insert(u32, u64),
    Remove(u32, u64),
}

fn op() -> impl Strategy<Value = Op> {
    // Narrow ranges so collisions, duplicate inserts and misses are common.
    prop_oneof![
        (0u32..12, 0u64..40).prop_map(|(p, d)| Op::Insert(p, d)),
        (0u32..12, 0u64..40).prop_map(|(p, d)| Op::Remove(p, d)),
    ]
}

fn key(p: u32, d: u64) -> EntryKey {
    EntryKey::new(Pid::new(p), VirtualDeadline::new(d))
}

fn apply(list: &mut DeadlineSkipList, model: &mut BTreeSet<EntryKey>, op: &Op) {
    match *op {
        Op::Insert(p, d) => {
            let result = list.insert(Pid::new(p), VirtualDeadline::new(d));
            if model.insert(key(p, d)) {
                let height = result.expect("fresh key must insert");
                assert_eq!(
                    list.tower_height(Pid::new(p), VirtualDeadline::new(d)),
                    Some(height)
                );
            } else {
                assert!(matches!(result, Err(QueueError::Duplicate { .. })));
            }
        }
        Op::Remove(p, d) => {
            let result = list.remove(Pid::new(p), VirtualDeadline::new(d));
            if model.remove(&key(p, d)) {
                assert!(result.is_ok());
            } else {
                assert!(matches!(result, Err(QueueError::NotFound { .. })));
            }
        }
    }
}

proptest! {
    #[test]
    fn level_zero_matches_model(
        seed in any::<u32>(),
        levels in 1usize..7,
        ops in prop::collection::vec(op(), 0..120),
    ) {
        let mut list = DeadlineSkipList::with_config(SkipListConfig { levels, seed }).unwrap();
        let mut model = BTreeSet::new();

        for op in &ops {
            apply(&mut list, &mut model, op);

            prop_assert!(list.verify().is_ok(), "{:?}", list.verify());
            let level0: Vec<EntryKey> = list.iter().collect();
            let expected: Vec<EntryKey> = model.iter().copied().collect();
            prop_assert_eq!(level0, expected);
            prop_assert_eq!(list.len(), model.len());
        }
    }

    #[test]
    fn peek_min_is_model_minimum(
        seed in any::<u32>(),
        ops in prop::collection::vec(op(), 0..80),
    ) {
        let mut list = DeadlineSkipList::with_config(SkipListConfig { levels: 4, seed }).unwrap();
        let mut model = BTreeSet::new();

        for op in &ops {
            apply(&mut list, &mut model, op);
            prop_assert_eq!(list.peek_min(), model.iter().next().map(|k| k.pid));
            prop_assert_eq!(list.peek_min().is_none(), model.is_empty());
        }
    }

    #[test]
    fn insert_then_remove_is_identity(
        seed in any::<u32>(),
        ops in prop::collection::vec(op(), 0..60),
        p in 100u32..110,
        d in 0u64..40,
    ) {
        let mut list = DeadlineSkipList::with_config(SkipListConfig { levels: 4, seed }).unwrap();
        let mut model = BTreeSet::new();
        for op in &ops {
            apply(&mut list, &mut model, op);
        }

        let before = list.dump();
        let nodes = list.node_count();

        // Pids 100.. never appear in `ops`, so the key is fresh.
        list.insert(Pid::new(p), VirtualDeadline::new(d)).unwrap();
        list.remove(Pid::new(p), VirtualDeadline::new(d)).unwrap();

        prop_assert_eq!(list.dump(), before);
        prop_assert_eq!(list.node_count(), nodes);
    }

    #[test]
    fn every_level_is_a_sorted_subset_of_the_one_below(
        seed in any::<u32>(),
        ops in prop::collection::vec(op(), 0..120),
    ) {
        let mut list = DeadlineSkipList::with_config(SkipListConfig { levels: 5, seed }).unwrap();
        let mut model = BTreeSet::new();
        for op in &ops {
            apply(&mut list, &mut model, op);
        }

        let dump = list.dump();
        for level in &dump {
            prop_assert!(level.windows(2).all(|w| w[0] < w[1]));
        }
        for pair in dump.windows(2) {
            let below: BTreeSet<EntryKey> = pair[1].iter().copied().collect();
            prop_assert!(pair[0].iter().all(|k| below.contains(k)));
        }
    }
}
