//! Advanced concurrent editing example for the tree-text CRDT.
//!
//! This example showcases:
//! - Concurrent operations across many replicas with full convergence
//! - Conflict resolution at a single contested position
//! - Throughput measurement for local edits and remote application
//!
//! Run with: cargo run --example concurrent_editing

use std::time::Instant;

use crdt_treetext::{OpMeta, Operation, ReplicaId, TreeText};

fn main() {
    println!("=== Advanced Concurrent Tree-Text CRDT Example ===\n");

    basic_concurrent_demo();
    println!();

    stress_test_demo();
    println!();

    conflict_resolution_demo();
}

fn deliver(ops: &[Operation], origin: ReplicaId, target: &mut TreeText) {
    for op in ops {
        target.apply(op, OpMeta::remote(origin)).unwrap();
    }
}

/// Three replicas edit concurrently, then exchange logs.
fn basic_concurrent_demo() {
    println!("--- Basic Concurrent Operations ---");

    let mut docs: Vec<TreeText> = (1..=3).map(TreeText::new).collect();
    let fragments = ["alpha ", "bravo ", "charlie "];

    let mut logs: Vec<Vec<Operation>> = Vec::new();
    for (doc, fragment) in docs.iter_mut().zip(fragments) {
        logs.push(doc.insert(0, fragment).unwrap());
    }

    for target in 0..docs.len() {
        for origin in 0..logs.len() {
            if origin != target {
                let log = logs[origin].clone();
                deliver(&log, origin as u64 + 1, &mut docs[target]);
            }
        }
    }

    println!("All three replicas after exchange:");
    for doc in &docs {
        println!("  replica {}: '{}'", doc.replica_id(), doc);
    }
    assert!(docs.windows(2).all(|w| w[0].to_string() == w[1].to_string()));
    println!("✓ Converged");
}

/// Ten replicas append 100 characters each, then fully synchronize.
fn stress_test_demo() {
    println!("--- Stress Test: 10 replicas x 100 appends ---");

    const REPLICAS: usize = 10;
    const OPS: usize = 100;

    let mut docs: Vec<TreeText> = (1..=REPLICAS as u64).map(TreeText::new).collect();
    let mut logs: Vec<Vec<Operation>> = Vec::new();

    let start = Instant::now();
    for doc in docs.iter_mut() {
        let mut log = Vec::new();
        for i in 0..OPS {
            let ch = (b'a' + (i % 26) as u8) as char;
            let at = doc.len();
            log.extend(doc.insert(at, &ch.to_string()).unwrap());
        }
        logs.push(log);
    }
    let local_time = start.elapsed();

    let start = Instant::now();
    for target in 0..REPLICAS {
        for origin in 0..REPLICAS {
            if origin != target {
                let log = logs[origin].clone();
                deliver(&log, origin as u64 + 1, &mut docs[target]);
            }
        }
    }
    let sync_time = start.elapsed();

    let reference = docs[0].to_string();
    assert!(docs.iter().all(|d| d.to_string() == reference));
    assert_eq!(reference.chars().count(), REPLICAS * OPS);

    println!("  {} local operations in {:?}", REPLICAS * OPS, local_time);
    println!(
        "  {} remote applications in {:?}",
        REPLICAS * (REPLICAS - 1) * OPS,
        sync_time
    );
    println!("  final document length: {}", docs[0].len());
    println!("✓ All {} replicas converged", REPLICAS);
}

/// Several replicas insert at the same contested position.
fn conflict_resolution_demo() {
    println!("--- Conflict Resolution at One Position ---");

    let mut docs: Vec<TreeText> = (1..=4).map(TreeText::new).collect();

    // everyone types their replica id at position 0 concurrently
    let mut logs: Vec<Vec<Operation>> = Vec::new();
    for doc in docs.iter_mut() {
        let digit = char::from_digit(doc.replica_id() as u32, 10).unwrap();
        logs.push(doc.insert(0, &digit.to_string()).unwrap());
    }

    for target in 0..docs.len() {
        for origin in (0..logs.len()).rev() {
            if origin != target {
                let log = logs[origin].clone();
                deliver(&log, origin as u64 + 1, &mut docs[target]);
            }
        }
    }

    println!("Contested inserts resolved identically everywhere:");
    for doc in &docs {
        println!("  replica {}: '{}'", doc.replica_id(), doc);
    }
    assert!(docs.windows(2).all(|w| w[0].to_string() == w[1].to_string()));
    println!("✓ Deterministic order: '{}'", docs[0]);
}
