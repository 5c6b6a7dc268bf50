//! Integration tests for the tree-text CRDT.
//!
//! These tests verify correctness across multiple scenarios including basic
//! editing, concurrent multi-replica sessions, and convergence properties.

use crdt_treetext::{OpMeta, Operation, ReplicaId, TreeText};

/// Delivers `ops` (one origin's output, in order) to `target`.
fn deliver(ops: &[Operation], origin: ReplicaId, target: &mut TreeText) {
    for op in ops {
        target.apply(op, OpMeta::remote(origin)).unwrap();
    }
}

#[test]
fn test_simple_append() {
    let mut doc = TreeText::new(1);
    for (i, ch) in "hello".chars().enumerate() {
        doc.insert(i, &ch.to_string()).unwrap();
    }

    assert_eq!(doc.len(), 5);
    assert_eq!(doc.to_string(), "hello");
    assert_eq!(doc.node_count(), 6); // five characters plus the root sentinel
    doc.check_consistency().unwrap();
}

#[test]
fn test_mid_string_insert() {
    let mut doc = TreeText::new(1);
    doc.insert(0, "hello").unwrap();
    doc.insert(2, "X").unwrap();

    assert_eq!(doc.to_string(), "heXllo");
    let pos = doc.position_at(3).unwrap();
    assert_eq!(doc.index_of(&pos).unwrap(), (3, true));
    doc.check_consistency().unwrap();
}

#[test]
fn test_deletion_preserves_positions() {
    let mut doc = TreeText::new(1);
    doc.insert(0, "hello").unwrap();
    doc.insert(2, "X").unwrap();

    let e_id = doc.position_at(1).unwrap();
    doc.delete(1, 1).unwrap();

    assert_eq!(doc.to_string(), "hXllo");
    assert_eq!(doc.len(), 5);
    assert_eq!(doc.index_of(&e_id).unwrap(), (1, false));
    doc.check_consistency().unwrap();
}

#[test]
fn test_concurrent_append_runs() {
    const REPLICAS: usize = 10;
    const OPS_PER_REPLICA: usize = 100;

    let mut replicas: Vec<TreeText> = (1..=REPLICAS as u64).map(TreeText::new).collect();
    let mut logs: Vec<Vec<Operation>> = Vec::new();

    for doc in replicas.iter_mut() {
        let mut log = Vec::new();
        for _ in 0..OPS_PER_REPLICA {
            let at = doc.len();
            log.extend(doc.insert(at, "a").unwrap());
        }
        logs.push(log);
    }

    // full exchange: every replica receives every other replica's log in order
    for (target_idx, doc) in replicas.iter_mut().enumerate() {
        for (origin_idx, log) in logs.iter().enumerate() {
            if origin_idx != target_idx {
                deliver(log, origin_idx as u64 + 1, doc);
            }
        }
    }

    let expected_len = REPLICAS * OPS_PER_REPLICA;
    let reference = replicas[0].to_string();
    assert_eq!(reference.chars().count(), expected_len);
    for doc in &replicas {
        assert_eq!(doc.to_string(), reference);
        assert_eq!(doc.len(), expected_len);
        doc.check_consistency().unwrap();
    }
}

#[test]
fn test_concurrent_inserts_at_same_index() {
    let mut a = TreeText::new(1);
    let mut b = TreeText::new(2);

    let ops_a = a.insert(0, "A").unwrap();
    let ops_b = b.insert(0, "B").unwrap();

    deliver(&ops_b, 2, &mut a);
    deliver(&ops_a, 1, &mut b);

    assert_eq!(a.to_string(), b.to_string());
    assert_eq!(a.len(), 2);
    // both ids carry counter 1; the lower replica id sorts first
    assert_eq!(a.to_string(), "AB");
    a.check_consistency().unwrap();
    b.check_consistency().unwrap();
}

#[test]
fn test_exchange_order_does_not_matter() {
    let make_session = || {
        let mut a = TreeText::new(1);
        let mut b = TreeText::new(2);
        let mut c = TreeText::new(3);
        let ops_a = a.insert(0, "one ").unwrap();
        let ops_b = b.insert(0, "two ").unwrap();
        let ops_c = c.insert(0, "three ").unwrap();
        (a, vec![(1u64, ops_a), (2u64, ops_b), (3u64, ops_c)])
    };

    // deliver the foreign logs to replica 1 in two different orders
    let (mut first, logs) = make_session();
    for (origin, ops) in logs.iter().skip(1) {
        deliver(ops, *origin, &mut first);
    }

    let (mut second, logs) = make_session();
    for (origin, ops) in logs.iter().skip(1).rev() {
        deliver(ops, *origin, &mut second);
    }

    assert_eq!(first.to_string(), second.to_string());
    assert_eq!(first.len(), 14);
}

#[test]
fn test_concurrent_edit_and_delete() {
    let mut a = TreeText::new(1);
    let mut b = TreeText::new(2);

    let setup = a.insert(0, "shared").unwrap();
    deliver(&setup, 1, &mut b);

    // a deletes "ha" while b inserts in the middle
    let del_ops = a.delete(1, 2).unwrap();
    let ins_ops = b.insert(3, "!!").unwrap();

    deliver(&ins_ops, 2, &mut a);
    deliver(&del_ops, 1, &mut b);

    assert_eq!(a.to_string(), b.to_string());
    a.check_consistency().unwrap();
    b.check_consistency().unwrap();
}

#[test]
fn test_reference_trace_replay() {
    enum Step {
        Insert(usize, char),
        Delete(usize),
    }
    use Step::*;

    let trace = [
        Insert(0, 'b'),
        Insert(1, 'd'),
        Insert(1, 'c'),
        Insert(0, 'a'), // "abcd"
        Delete(2),      // "abd"
        Insert(3, 'e'), // "abde"
        Delete(0),      // "bde"
        Insert(1, 'x'), // "bxde"
    ];
    let final_text = "bxde";

    let mut doc = TreeText::new(1);
    for step in &trace {
        match *step {
            Insert(at, ch) => {
                doc.insert(at, &ch.to_string()).unwrap();
            }
            Delete(at) => {
                doc.delete(at, 1).unwrap();
            }
        }
    }

    assert_eq!(doc.to_string(), final_text);
    doc.check_consistency().unwrap();
}

#[test]
fn test_replay_on_fresh_replica_matches() {
    let mut editor = TreeText::new(1);
    let mut log = Vec::new();
    log.extend(editor.insert(0, "the quick brown fox").unwrap());
    log.extend(editor.delete(4, 6).unwrap());
    log.extend(editor.insert(4, "sly ").unwrap());
    log.extend(editor.delete(0, 4).unwrap());

    let mut observer = TreeText::new(2);
    deliver(&log, 1, &mut observer);

    assert_eq!(observer.to_string(), editor.to_string());
    assert_eq!(observer.to_string(), "sly brown fox");
    observer.check_consistency().unwrap();
}

#[test]
fn test_wire_round_trip_between_replicas() {
    let mut a = TreeText::new(1);
    let mut b = TreeText::new(2);

    let ops = a.insert(0, "payload").unwrap();
    for op in &ops {
        let bytes = op.encode().unwrap();
        let decoded = Operation::decode(&bytes).unwrap();
        b.apply(&decoded, OpMeta::remote(1)).unwrap();
    }

    assert_eq!(b.to_string(), "payload");
}
