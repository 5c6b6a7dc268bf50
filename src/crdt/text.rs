//! The replicated text document.
//!
//! [`TreeText`] is one replica's view of a collaboratively edited string.
//! Characters live in an interleaving tree: every node is anchored under its
//! parent on the left or right side at creation time and never moves, with
//! concurrent siblings ranked by id. The canonical order (left-children
//! blocks, the node itself if present, right-children blocks, siblings
//! ascending by id) is a pure function of that shape, so replicas that have
//! seen the same operations render the same text.
//!
//! The interleaving tree is deliberately never walked for position queries —
//! it can degenerate into long chains under sequential typing. Instead every
//! node also hangs in a balanced order index ([`BalancedIndex`]) for
//! index↔node queries, and in two spine lists ([`SpineIndex`]) that hand a
//! remote insertion its canonical neighbor in O(log n). Local edits are
//! applied immediately and returned as [`Operation`]s for the transport to
//! broadcast; remote operations arrive through [`TreeText::apply`].

use std::fmt;

use tracing::{debug, warn};

use crate::crdt::error::{Result, TextError};
use crate::crdt::index::BalancedIndex;
use crate::crdt::node::{CharNode, NodeRef, NodeStore, Side};
use crate::crdt::ops::{OpMeta, Operation, TextEvent};
use crate::crdt::spine::SpineIndex;
use crate::crdt::types::{LamportClock, ReplicaId, UniqueId};

/// The canonical-order neighbor a new node is attached next to.
enum Neighbor {
    Pred(NodeRef),
    Succ(NodeRef),
}

type Subscriber = Box<dyn FnMut(&TextEvent) + Send + Sync>;

/// A tree-text CRDT replica.
///
/// Single-threaded by design: every operation handler runs to completion,
/// and either finishes (emitting its event) or errors, in which case the
/// replica must be considered corrupted.
pub struct TreeText {
    replica_id: ReplicaId,
    clock: LamportClock,
    store: NodeStore,
    root: NodeRef,
    index: BalancedIndex,
    left_spines: SpineIndex,
    right_spines: SpineIndex,
    subscribers: Vec<Subscriber>,
}

impl TreeText {
    /// Creates an empty replica.
    pub fn new(replica_id: ReplicaId) -> Self {
        let mut store = NodeStore::new();
        let root = store.insert(CharNode::root_sentinel());
        TreeText {
            replica_id,
            clock: LamportClock::new(replica_id),
            store,
            root,
            index: BalancedIndex::new(root),
            left_spines: SpineIndex::new(Side::Left),
            right_spines: SpineIndex::new(Side::Right),
            subscribers: Vec::new(),
        }
    }

    /// Gets the replica ID for this instance.
    pub fn replica_id(&self) -> ReplicaId {
        self.replica_id
    }

    /// Gets the current clock value (for debugging/testing).
    pub fn current_clock(&self) -> u64 {
        self.clock.current_counter()
    }

    /// Number of visible characters.
    pub fn len(&self) -> usize {
        self.index.len(&self.store)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total node count, tombstones and the root sentinel included.
    pub fn node_count(&self) -> usize {
        self.store.node_count()
    }

    /// Registers a callback invoked synchronously after every applied
    /// operation, local and remote alike.
    pub fn subscribe(&mut self, f: impl FnMut(&TextEvent) + Send + Sync + 'static) {
        self.subscribers.push(Box::new(f));
    }

    // ------------------------------------------------------------------
    // Local edits
    // ------------------------------------------------------------------

    /// Inserts `text` at character index `index` (`0..=len`).
    ///
    /// Each character becomes one operation, generated and applied left to
    /// right so that every character anchors on the one before it. Returns
    /// the operations for the transport to broadcast, in order.
    pub fn insert(&mut self, index: usize, text: &str) -> Result<Vec<Operation>> {
        let length = self.len();
        if index > length {
            return Err(TextError::IndexOutOfBounds { index, length });
        }

        let mut ops = Vec::new();
        let mut at = index;
        for value in text.chars() {
            let (parent, side) = self.insertion_anchor(at)?;
            let op = Operation::Insert {
                id: UniqueId::from(self.clock.tick()),
                parent_id: self.store[parent].id,
                is_left_child: side == Side::Left,
                value,
            };
            self.apply(&op, OpMeta::local(self.replica_id))?;
            ops.push(op);
            at += 1;
        }
        Ok(ops)
    }

    /// Deletes `count` characters starting at `index` (`index + count <= len`).
    ///
    /// Targets are resolved from right to left so each resolved index stays
    /// valid while earlier ones are applied. Returns the operations to
    /// broadcast.
    pub fn delete(&mut self, index: usize, count: usize) -> Result<Vec<Operation>> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let length = self.len();
        if index + count > length {
            return Err(TextError::IndexOutOfBounds {
                index: index + count - 1,
                length,
            });
        }

        let mut ops = Vec::with_capacity(count);
        for offset in (0..count).rev() {
            let node = self.index.index_to_node(&self.store, index + offset)?;
            let op = Operation::Delete {
                id: self.store[node].id,
            };
            self.apply(&op, OpMeta::local(self.replica_id))?;
            ops.push(op);
        }
        Ok(ops)
    }

    /// Computes where a character inserted at cursor index `at` anchors in
    /// the interleaving tree.
    ///
    /// The left-origin is the present character before the cursor (the root
    /// for `at == 0`). If it has no right children yet the new node becomes
    /// its right child; otherwise the new node becomes a left child of its
    /// canonical successor, which is guaranteed to have no left children.
    fn insertion_anchor(&self, at: usize) -> Result<(NodeRef, Side)> {
        let left_origin = if at == 0 {
            self.root
        } else {
            self.index.index_to_node(&self.store, at - 1)?
        };

        if self.store[left_origin].right_children.is_empty() {
            Ok((left_origin, Side::Right))
        } else {
            let succ = self
                .index
                .next_node(&self.store, left_origin)
                .ok_or_else(|| {
                    TextError::InvariantViolation(
                        "left-origin with right children has no successor".into(),
                    )
                })?;
            Ok((succ, Side::Left))
        }
    }

    // ------------------------------------------------------------------
    // Applying operations
    // ------------------------------------------------------------------

    /// Applies one operation (local or remote, in causal order) and emits
    /// its event. Returns `None` for deletes of already-tombstoned nodes.
    pub fn apply(&mut self, op: &Operation, meta: OpMeta) -> Result<Option<TextEvent>> {
        let event = match *op {
            Operation::Insert {
                id,
                parent_id,
                is_left_child,
                value,
            } => {
                self.clock.update(id.timestamp());
                Some(self.apply_insert(id, parent_id, is_left_child, value, meta)?)
            }
            Operation::Delete { id } => self.apply_delete(id, meta)?,
        };
        if let Some(ref ev) = event {
            self.notify(ev);
        }
        Ok(event)
    }

    /// Decodes and applies an operation received from the transport.
    pub fn apply_encoded(&mut self, bytes: &[u8], meta: OpMeta) -> Result<Option<TextEvent>> {
        let op = Operation::decode(bytes)?;
        self.apply(&op, meta)
    }

    fn apply_insert(
        &mut self,
        id: UniqueId,
        parent_id: UniqueId,
        is_left_child: bool,
        value: char,
        meta: OpMeta,
    ) -> Result<TextEvent> {
        let parent = self
            .store
            .lookup(&parent_id)
            .ok_or(TextError::UnknownId(parent_id))?;
        let side = if is_left_child { Side::Left } else { Side::Right };

        let new = self.store.insert(CharNode::new(id, value, parent, side));

        // Splice into the parent's sibling run at the id-ordered slot.
        let k = {
            let siblings = self.store[parent].children(side);
            match siblings.binary_search_by(|&c| self.store[c].id.cmp(&id)) {
                Err(slot) => slot,
                Ok(_) => {
                    return Err(TextError::InvariantViolation(format!(
                        "duplicate sibling id {}",
                        id
                    )))
                }
            }
        };
        self.store[parent].children_mut(side).insert(k, new);

        // The new node's canonical neighbor, tombstones counted. Read the
        // spine lists before they are updated for the new node below.
        let neighbor = match side {
            Side::Left => {
                let siblings = self.store[parent].children(Side::Left);
                if k + 1 == siblings.len() {
                    Neighbor::Succ(parent)
                } else {
                    let next_sibling = siblings[k + 1];
                    Neighbor::Succ(self.left_spines.get_end(&self.store, next_sibling))
                }
            }
            Side::Right => {
                if k == 0 {
                    Neighbor::Pred(parent)
                } else {
                    let prev_sibling = self.store[parent].right_children[k - 1];
                    Neighbor::Pred(self.right_spines.get_end(&self.store, prev_sibling))
                }
            }
        };

        // Balanced index: attach next to the neighbor, bump counts, retrace.
        match neighbor {
            Neighbor::Pred(p) => self.index.insert_after(&mut self.store, p, new),
            Neighbor::Succ(succ) => self.index.insert_before(&mut self.store, succ, new),
        }

        // Spine lists: the new node starts a fresh spine on both sides
        // unless it became the parent's new extreme child, in which case it
        // takes over the parent's spine (severing the old extension first
        // when one exists).
        match side {
            Side::Left => {
                let sibling_count = self.store[parent].left_children.len();
                if k == 0 {
                    if sibling_count >= 2 {
                        self.left_spines.split(&mut self.store, parent);
                    }
                    self.left_spines.append(&mut self.store, parent, new);
                } else {
                    self.left_spines.create(&mut self.store, new);
                }
                self.right_spines.create(&mut self.store, new);
            }
            Side::Right => {
                let sibling_count = self.store[parent].right_children.len();
                if k + 1 == sibling_count {
                    if sibling_count >= 2 {
                        self.right_spines.split(&mut self.store, parent);
                    }
                    self.right_spines.append(&mut self.store, parent, new);
                } else {
                    self.right_spines.create(&mut self.store, new);
                }
                self.left_spines.create(&mut self.store, new);
            }
        }

        let (index, _) = self.index.node_to_index(&self.store, new);
        debug!(id = %id, index, value = %value, "applied insert");
        Ok(TextEvent::Insert {
            index,
            value,
            id,
            meta,
        })
    }

    fn apply_delete(&mut self, id: UniqueId, meta: OpMeta) -> Result<Option<TextEvent>> {
        let node = self.store.lookup(&id).ok_or(TextError::UnknownId(id))?;
        if !self.store[node].is_present {
            warn!(id = %id, "ignoring delete of tombstoned node");
            return Ok(None);
        }

        let (index, _) = self.index.node_to_index(&self.store, node);
        self.store[node].is_present = false;
        self.index.deduct_presence(&mut self.store, node);

        let value = self.store[node].value;
        debug!(id = %id, index, "applied delete");
        Ok(Some(TextEvent::Delete {
            index,
            value,
            id,
            meta,
        }))
    }

    fn notify(&mut self, event: &TextEvent) {
        if self.subscribers.is_empty() {
            return;
        }
        let mut subscribers = std::mem::take(&mut self.subscribers);
        for f in subscribers.iter_mut() {
            f(event);
        }
        self.subscribers = subscribers;
    }

    // ------------------------------------------------------------------
    // Positions
    // ------------------------------------------------------------------

    /// The stable id of the character at `index`. The id survives edits
    /// elsewhere and remains a valid `index_of` argument for the node's
    /// lifetime.
    pub fn position_at(&self, index: usize) -> Result<UniqueId> {
        let node = self.index.index_to_node(&self.store, index)?;
        Ok(self.store[node].id)
    }

    /// Resolves a stable id to `(ge_index, is_present)`: the number of
    /// visible characters before it, and whether it is still visible.
    pub fn index_of(&self, id: &UniqueId) -> Result<(usize, bool)> {
        let node = self.store.lookup(id).ok_or(TextError::UnknownId(*id))?;
        Ok(self.index.node_to_index(&self.store, node))
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Snapshot serialization; not provided by this layer.
    pub fn save(&self) -> Result<Vec<u8>> {
        Err(TextError::NotImplemented("save"))
    }

    /// Snapshot deserialization; not provided by this layer.
    pub fn load(_bytes: &[u8]) -> Result<Self> {
        Err(TextError::NotImplemented("load"))
    }

    // ------------------------------------------------------------------
    // Consistency checking
    // ------------------------------------------------------------------

    /// Verifies the replica's internal invariants: balanced-tree shape and
    /// counts, order agreement between both trees, spine ends, and the
    /// text/length pair. Intended for tests and debugging; O(n).
    pub fn check_consistency(&self) -> Result<()> {
        self.index.validate(&self.store)?;

        let canonical = self.canonical_inorder();
        let balanced = self.balanced_inorder();
        if canonical != balanced {
            return Err(TextError::InvariantViolation(
                "balanced index order diverged from canonical order".into(),
            ));
        }

        for n in self.store.handles() {
            let leftmost = self.extreme_descendant(n, Side::Left);
            if self.left_spines.get_end(&self.store, n) != leftmost {
                return Err(TextError::InvariantViolation(format!(
                    "left spine end of {} is not its leftmost descendant",
                    self.store[n].id
                )));
            }
            let rightmost = self.extreme_descendant(n, Side::Right);
            if self.right_spines.get_end(&self.store, n) != rightmost {
                return Err(TextError::InvariantViolation(format!(
                    "right spine end of {} is not its rightmost descendant",
                    self.store[n].id
                )));
            }
        }

        let text = self.index.collect_text(&self.store);
        if text.chars().count() != self.len() {
            return Err(TextError::InvariantViolation(format!(
                "text length {} disagrees with count {}",
                text.chars().count(),
                self.len()
            )));
        }
        Ok(())
    }

    /// Canonical order of every node (tombstones and sentinel included) by
    /// direct interleaving-tree walk.
    fn canonical_inorder(&self) -> Vec<NodeRef> {
        enum Item {
            Visit(NodeRef),
            Emit(NodeRef),
        }

        let mut out = Vec::with_capacity(self.store.node_count());
        let mut stack = vec![Item::Visit(self.root)];
        while let Some(item) = stack.pop() {
            match item {
                Item::Visit(n) => {
                    for &c in self.store[n].right_children.iter().rev() {
                        stack.push(Item::Visit(c));
                    }
                    stack.push(Item::Emit(n));
                    for &c in self.store[n].left_children.iter().rev() {
                        stack.push(Item::Visit(c));
                    }
                }
                Item::Emit(n) => out.push(n),
            }
        }
        out
    }

    fn balanced_inorder(&self) -> Vec<NodeRef> {
        let mut out = Vec::with_capacity(self.store.node_count());
        let mut stack: Vec<NodeRef> = Vec::new();
        let mut cur = Some(self.index.root());
        while cur.is_some() || !stack.is_empty() {
            while let Some(n) = cur {
                stack.push(n);
                cur = self.store[n].b_left;
            }
            if let Some(n) = stack.pop() {
                out.push(n);
                cur = self.store[n].b_right;
            }
        }
        out
    }

    /// Leftmost or rightmost descendant by direct interleaving-tree walk.
    fn extreme_descendant(&self, mut n: NodeRef, side: Side) -> NodeRef {
        loop {
            let children = self.store[n].children(side);
            let next = match side {
                Side::Left => children.first(),
                Side::Right => children.last(),
            };
            match next {
                Some(&c) => n = c,
                None => return n,
            }
        }
    }
}

impl fmt::Display for TreeText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.index.collect_text(&self.store))
    }
}

impl fmt::Debug for TreeText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeText")
            .field("replica_id", &self.replica_id)
            .field("len", &self.len())
            .field("node_count", &self.node_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Delivers every op from `from` to `to`, in order.
    fn deliver(ops: &[Operation], from: ReplicaId, to: &mut TreeText) {
        for op in ops {
            to.apply(op, OpMeta::remote(from)).unwrap();
        }
    }

    #[test]
    fn test_creation() {
        let doc = TreeText::new(1);
        assert_eq!(doc.replica_id(), 1);
        assert_eq!(doc.current_clock(), 0);
        assert_eq!(doc.len(), 0);
        assert!(doc.is_empty());
        assert_eq!(doc.node_count(), 1); // root sentinel
        assert_eq!(doc.to_string(), "");
        doc.check_consistency().unwrap();
    }

    #[test]
    fn test_basic_insertion() {
        let mut doc = TreeText::new(1);
        let ops = doc.insert(0, "hello").unwrap();

        assert_eq!(ops.len(), 5);
        assert_eq!(doc.to_string(), "hello");
        assert_eq!(doc.len(), 5);
        doc.check_consistency().unwrap();
    }

    #[test]
    fn test_mid_string_insertion() {
        let mut doc = TreeText::new(1);
        doc.insert(0, "hello").unwrap();
        doc.insert(2, "X").unwrap();

        assert_eq!(doc.to_string(), "heXllo");
        let pos = doc.position_at(3).unwrap();
        assert_eq!(doc.index_of(&pos).unwrap(), (3, true));
        doc.check_consistency().unwrap();
    }

    #[test]
    fn test_deletion_tombstones() {
        let mut doc = TreeText::new(1);
        doc.insert(0, "hello").unwrap();
        let e_id = doc.position_at(1).unwrap();

        doc.delete(1, 1).unwrap();
        assert_eq!(doc.to_string(), "hllo");
        assert_eq!(doc.len(), 4);
        assert_eq!(doc.node_count(), 6); // tombstone retained
        assert_eq!(doc.index_of(&e_id).unwrap(), (1, false));
        doc.check_consistency().unwrap();
    }

    #[test]
    fn test_multi_char_delete() {
        let mut doc = TreeText::new(1);
        doc.insert(0, "abcdef").unwrap();
        let ops = doc.delete(1, 3).unwrap();

        assert_eq!(ops.len(), 3);
        assert_eq!(doc.to_string(), "aef");
        doc.check_consistency().unwrap();
    }

    #[test]
    fn test_insert_bounds() {
        let mut doc = TreeText::new(1);
        doc.insert(0, "ab").unwrap();
        assert!(doc.insert(3, "x").is_err());
        assert!(doc.insert(2, "x").is_ok());
    }

    #[test]
    fn test_delete_bounds() {
        let mut doc = TreeText::new(1);
        doc.insert(0, "abc").unwrap();
        assert!(doc.delete(2, 2).is_err());
        assert!(doc.delete(0, 4).is_err());
        assert!(doc.delete(2, 1).is_ok());
    }

    #[test]
    fn test_remote_exchange_converges() {
        let mut a = TreeText::new(1);
        let mut b = TreeText::new(2);

        let ops_a = a.insert(0, "abc").unwrap();
        let ops_b = b.insert(0, "xyz").unwrap();

        deliver(&ops_b, 2, &mut a);
        deliver(&ops_a, 1, &mut b);

        assert_eq!(a.to_string(), b.to_string());
        assert_eq!(a.len(), 6);
        a.check_consistency().unwrap();
        b.check_consistency().unwrap();
    }

    #[test]
    fn test_concurrent_inserts_order_by_id() {
        let mut a = TreeText::new(1);
        let mut b = TreeText::new(2);

        let ops_a = a.insert(0, "A").unwrap();
        let ops_b = b.insert(0, "B").unwrap();

        deliver(&ops_b, 2, &mut a);
        deliver(&ops_a, 1, &mut b);

        assert_eq!(a.to_string(), b.to_string());
        // same counter, so replica 1's id orders first
        assert_eq!(a.to_string(), "AB");
    }

    #[test]
    fn test_duplicate_delete_is_noop() {
        let mut a = TreeText::new(1);
        a.insert(0, "ab").unwrap();
        let ops = a.delete(0, 1).unwrap();

        // re-apply the same delete
        let echo = a.apply(&ops[0], OpMeta::remote(1)).unwrap();
        assert_eq!(echo, None);
        assert_eq!(a.to_string(), "b");
        a.check_consistency().unwrap();
    }

    #[test]
    fn test_unknown_parent_is_fatal() {
        let mut doc = TreeText::new(1);
        let op = Operation::Insert {
            id: UniqueId::new(10, 9),
            parent_id: UniqueId::new(99, 9),
            is_left_child: false,
            value: 'x',
        };
        assert!(matches!(
            doc.apply(&op, OpMeta::remote(9)),
            Err(TextError::UnknownId(_))
        ));
    }

    #[test]
    fn test_unknown_delete_target_is_fatal() {
        let mut doc = TreeText::new(1);
        let op = Operation::Delete {
            id: UniqueId::new(42, 3),
        };
        assert!(matches!(
            doc.apply(&op, OpMeta::remote(3)),
            Err(TextError::UnknownId(_))
        ));
    }

    #[test]
    fn test_events_fire_in_order() {
        use std::sync::{Arc, Mutex};

        let mut doc = TreeText::new(1);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        doc.subscribe(move |ev| sink.lock().unwrap().push(*ev));

        doc.insert(0, "ab").unwrap();
        doc.delete(0, 1).unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert!(matches!(seen[0], TextEvent::Insert { index: 0, value: 'a', .. }));
        assert!(matches!(seen[1], TextEvent::Insert { index: 1, value: 'b', .. }));
        assert!(matches!(seen[2], TextEvent::Delete { index: 0, value: 'a', .. }));
        assert!(seen.iter().all(|ev| match ev {
            TextEvent::Insert { meta, .. } | TextEvent::Delete { meta, .. } => meta.is_local,
        }));
    }

    #[test]
    fn test_encoded_round_trip_applies() {
        let mut a = TreeText::new(1);
        let mut b = TreeText::new(2);
        let ops = a.insert(0, "hi").unwrap();

        for op in &ops {
            let bytes = op.encode().unwrap();
            b.apply_encoded(&bytes, OpMeta::remote(1)).unwrap();
        }
        assert_eq!(b.to_string(), "hi");
    }

    #[test]
    fn test_save_load_unimplemented() {
        let doc = TreeText::new(1);
        assert!(matches!(doc.save(), Err(TextError::NotImplemented(_))));
        assert!(matches!(
            TreeText::load(b"{}"),
            Err(TextError::NotImplemented(_))
        ));
    }

    #[test]
    fn test_interleaved_typing_and_deleting() {
        let mut doc = TreeText::new(1);
        doc.insert(0, "the quick fox").unwrap();
        doc.delete(4, 6).unwrap();
        assert_eq!(doc.to_string(), "the fox");
        doc.insert(4, "brown ").unwrap();
        assert_eq!(doc.to_string(), "the brown fox");
        doc.check_consistency().unwrap();
    }
}
