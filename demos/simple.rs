//! Simple standalone example of tree-text CRDT usage.
//!
//! This example demonstrates the basic functionality of the replicated
//! document in a simple, easy-to-understand scenario.
//!
//! Run with: cargo run --example simple

use crdt_treetext::{OpMeta, TreeText};

fn main() {
    println!("=== Simple Tree-Text CRDT Example ===\n");

    // Create two replicas representing two users
    let mut alice = TreeText::new(1);
    let mut bob = TreeText::new(2);

    println!("Alice (replica 1) and Bob (replica 2) start editing a document\n");

    // Alice types "Hello"
    println!("Alice types 'Hello':");
    let alice_ops = alice.insert(0, "Hello").unwrap();
    println!("  Alice's document: '{}'", alice);

    // Bob concurrently types "World!" starting from the beginning
    println!("\nBob concurrently types 'World!' (also from the start):");
    let bob_ops = bob.insert(0, "World!").unwrap();
    println!("  Bob's document: '{}'", bob);

    println!("\n--- Before Synchronization ---");
    println!("  Alice sees: '{}'", alice);
    println!("  Bob sees:   '{}'", bob);

    // Synchronize: Alice receives Bob's operations
    println!("\n--- Synchronizing Changes ---");
    println!("Alice receives Bob's operations...");
    for op in &bob_ops {
        alice.apply(op, OpMeta::remote(2)).unwrap();
    }

    // Bob receives Alice's operations
    println!("Bob receives Alice's operations...");
    for op in &alice_ops {
        bob.apply(op, OpMeta::remote(1)).unwrap();
    }

    println!("\n--- After Synchronization ---");
    println!("  Alice sees: '{}'", alice);
    println!("  Bob sees:   '{}'", bob);

    // Verify convergence
    if alice.to_string() == bob.to_string() {
        println!("\n✓ SUCCESS: Both users converged to the same document!");
        println!("✓ Final content: '{}'", alice);
    } else {
        println!("\n✗ ERROR: Documents did not converge!");
    }

    // Demonstrate stable positions
    println!("\n=== Stable Position Example ===");
    let pinned = alice.position_at(0).unwrap();
    println!("Alice pins the first character (id {})", pinned);

    let ops = bob.insert(0, ">> ").unwrap();
    for op in &ops {
        alice.apply(op, OpMeta::remote(2)).unwrap();
    }
    let (index, present) = alice.index_of(&pinned).unwrap();
    println!(
        "After Bob prepends '>> ', the pinned character moved to index {} (present: {})",
        index, present
    );

    // Demonstrate deletion
    println!("\n=== Deletion Example ===");
    println!("Alice deletes the first character");
    let del_ops = alice.delete(0, 1).unwrap();
    println!("  Alice's document: '{}'", alice);

    println!("Synchronizing deletion to Bob...");
    for op in &del_ops {
        bob.apply(op, OpMeta::remote(1)).unwrap();
    }
    println!("  Bob's document: '{}'", bob);

    if alice.to_string() == bob.to_string() {
        println!("✓ Deletion synchronized successfully!");
    }

    println!("\n=== Example Complete ===");
    println!("This demonstrates how the tree-text CRDT ensures eventual");
    println!("consistency in collaborative editing scenarios without conflicts!");
}
