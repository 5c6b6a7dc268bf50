//! Split/append spine lists.
//!
//! The interleaving tree's leftmost-descendant relation decomposes into
//! disjoint paths ("spines"): starting from any node, repeatedly taking the
//! first left child walks to its leftmost descendant, and distinct nodes
//! share the suffix of that walk. Symmetrically for rightmost descendants
//! through last right children. Each such maximal path is tracked as one
//! list; the last element of a node's list *is* its extreme descendant,
//! which is how remote insertions find their canonical-order neighbor
//! without walking the (unbalanced) interleaving tree.
//!
//! A list is stored as a positionally keyed AVL tree threaded through the
//! per-node [`SpineLinks`] in the shared arena, one tree per spine, with no
//! key comparisons anywhere: order is purely structural. Heights are stored
//! (height of a missing child is -1). A list is identified by its root node
//! (the unique member with no spine parent), so there is no registry to keep
//! in sync.
//!
//! Operations:
//! - `create(v)`: make v a fresh singleton list.
//! - `append(e, v)`: append v after the last element of e's list.
//! - `get_end(v)`: last element of v's list, O(log n).
//! - `split(v)`: cut v's list into `[start, v]` and `(v, end]`, v staying in
//!   the left half. Implemented with the join-based AVL split algorithm.

use crate::crdt::node::{NodeRef, NodeStore, Side, SpineLinks};

/// Handle on one side's spine lists. Stateless besides the side selector;
/// all data lives in the arena's embedded links.
#[derive(Debug, Clone, Copy)]
pub struct SpineIndex {
    side: Side,
}

impl SpineIndex {
    pub fn new(side: Side) -> Self {
        SpineIndex { side }
    }

    // ------------------------------------------------------------------
    // Link plumbing
    // ------------------------------------------------------------------

    fn links<'a>(&self, s: &'a NodeStore, n: NodeRef) -> &'a SpineLinks {
        s[n].spine(self.side)
    }

    fn height(&self, s: &NodeStore, n: Option<NodeRef>) -> i32 {
        match n {
            Some(n) => self.links(s, n).height,
            None => -1,
        }
    }

    fn update_height(&self, s: &mut NodeStore, n: NodeRef) {
        let h = 1 + self
            .height(s, self.links(s, n).left)
            .max(self.height(s, self.links(s, n).right));
        s[n].spine_mut(self.side).height = h;
    }

    fn set_left(&self, s: &mut NodeStore, n: NodeRef, child: Option<NodeRef>) {
        s[n].spine_mut(self.side).left = child;
        if let Some(c) = child {
            s[c].spine_mut(self.side).parent = Some(n);
        }
    }

    fn set_right(&self, s: &mut NodeStore, n: NodeRef, child: Option<NodeRef>) {
        s[n].spine_mut(self.side).right = child;
        if let Some(c) = child {
            s[c].spine_mut(self.side).parent = Some(n);
        }
    }

    /// Replaces `old` with `new` in `parent`'s child slot (or clears the
    /// parent link when there is no parent).
    fn replace_child(
        &self,
        s: &mut NodeStore,
        parent: Option<NodeRef>,
        old: NodeRef,
        new: NodeRef,
    ) {
        s[new].spine_mut(self.side).parent = parent;
        if let Some(p) = parent {
            if self.links(s, p).left == Some(old) {
                s[p].spine_mut(self.side).left = Some(new);
            } else {
                s[p].spine_mut(self.side).right = Some(new);
            }
        }
    }

    fn detach(&self, s: &mut NodeStore, n: Option<NodeRef>) -> Option<NodeRef> {
        if let Some(r) = n {
            s[r].spine_mut(self.side).parent = None;
        }
        n
    }

    fn clear(&self, s: &mut NodeStore, n: NodeRef) {
        *s[n].spine_mut(self.side) = SpineLinks::default();
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    fn root_of(&self, s: &NodeStore, mut n: NodeRef) -> NodeRef {
        while let Some(p) = self.links(s, n).parent {
            n = p;
        }
        n
    }

    fn rightmost(&self, s: &NodeStore, mut n: NodeRef) -> NodeRef {
        while let Some(r) = self.links(s, n).right {
            n = r;
        }
        n
    }

    /// The last element of the list containing `v`: climb to the list root,
    /// then descend right all the way.
    pub fn get_end(&self, s: &NodeStore, v: NodeRef) -> NodeRef {
        self.rightmost(s, self.root_of(s, v))
    }

    // ------------------------------------------------------------------
    // Rotations and rebalancing (height-based)
    // ------------------------------------------------------------------

    fn rotate_left(&self, s: &mut NodeStore, x: NodeRef) -> NodeRef {
        let z = self.links(s, x).right.expect("rotate_left without right child");
        let parent = self.links(s, x).parent;
        let inner = self.links(s, z).left;

        s[x].spine_mut(self.side).right = inner;
        if let Some(t) = inner {
            s[t].spine_mut(self.side).parent = Some(x);
        }
        self.set_left(s, z, Some(x));
        self.replace_child(s, parent, x, z);

        self.update_height(s, x);
        self.update_height(s, z);
        z
    }

    fn rotate_right(&self, s: &mut NodeStore, x: NodeRef) -> NodeRef {
        let z = self.links(s, x).left.expect("rotate_right without left child");
        let parent = self.links(s, x).parent;
        let inner = self.links(s, z).right;

        s[x].spine_mut(self.side).left = inner;
        if let Some(t) = inner {
            s[t].spine_mut(self.side).parent = Some(x);
        }
        self.set_right(s, z, Some(x));
        self.replace_child(s, parent, x, z);

        self.update_height(s, x);
        self.update_height(s, z);
        z
    }

    fn balance(&self, s: &NodeStore, n: NodeRef) -> i32 {
        self.height(s, self.links(s, n).left) - self.height(s, self.links(s, n).right)
    }

    /// Restores the AVL invariant at `n` if it is violated, returning the
    /// root of the (possibly rotated) subtree.
    fn rebalance_node(&self, s: &mut NodeStore, n: NodeRef) -> NodeRef {
        let bal = self.balance(s, n);
        if bal > 1 {
            let l = self.links(s, n).left.expect("left-heavy without left child");
            if self.height(s, self.links(s, l).left) < self.height(s, self.links(s, l).right) {
                self.rotate_left(s, l);
            }
            self.rotate_right(s, n)
        } else if bal < -1 {
            let r = self.links(s, n).right.expect("right-heavy without right child");
            if self.height(s, self.links(s, r).right) < self.height(s, self.links(s, r).left) {
                self.rotate_right(s, r);
            }
            self.rotate_left(s, n)
        } else {
            self.update_height(s, n);
            n
        }
    }

    fn rebalance_upward(&self, s: &mut NodeStore, start: NodeRef) {
        let mut n = start;
        loop {
            let n2 = self.rebalance_node(s, n);
            match self.links(s, n2).parent {
                Some(p) => n = p,
                None => break,
            }
        }
    }

    // ------------------------------------------------------------------
    // List operations
    // ------------------------------------------------------------------

    /// Starts a new singleton list containing `v`.
    pub fn create(&self, s: &mut NodeStore, v: NodeRef) {
        self.clear(s, v);
    }

    /// Appends `v` after the last element of the list containing `e`.
    pub fn append(&self, s: &mut NodeStore, e: NodeRef, v: NodeRef) {
        let end = self.get_end(s, e);
        self.clear(s, v);
        self.set_right(s, end, Some(v));
        self.rebalance_upward(s, end);
    }

    /// Splits the list containing `v` into `[start, v]` and `(v, end]`.
    ///
    /// `v` stays in (at the end of) the left half; the right half becomes an
    /// independent list rooted at whatever the joins produce.
    pub fn split(&self, s: &mut NodeStore, v: NodeRef) {
        // Record the path to the root before any relinking.
        let mut path: Vec<(NodeRef, bool)> = Vec::new();
        let mut child = v;
        while let Some(p) = self.links(s, child).parent {
            let from_left = self.links(s, p).left == Some(child);
            path.push((p, from_left));
            child = p;
        }

        let v_left = self.links(s, v).left;
        let v_right = self.links(s, v).right;
        let mut left_half = self.detach(s, v_left);
        let mut right_half = self.detach(s, v_right);

        for (p, from_left) in path {
            if from_left {
                // p and its right subtree come after v
                let p_right = self.links(s, p).right;
                let pr = self.detach(s, p_right);
                self.clear(s, p);
                right_half = Some(self.join(s, right_half, p, pr));
            } else {
                // p and its left subtree come before v
                let p_left = self.links(s, p).left;
                let pl = self.detach(s, p_left);
                self.clear(s, p);
                left_half = Some(self.join(s, pl, p, left_half));
            }
        }

        // v rejoins the left half as its new end.
        self.clear(s, v);
        if let Some(l) = left_half {
            let end = self.rightmost(s, l);
            self.set_right(s, end, Some(v));
            self.rebalance_upward(s, end);
        }
        // right_half (if any) is already a detached, balanced list root.
    }

    // ------------------------------------------------------------------
    // AVL join
    // ------------------------------------------------------------------

    /// Joins `l`, the single node `k`, and `r` into one balanced tree whose
    /// inorder is l · k · r. `k`'s old links are discarded.
    fn join(
        &self,
        s: &mut NodeStore,
        l: Option<NodeRef>,
        k: NodeRef,
        r: Option<NodeRef>,
    ) -> NodeRef {
        let hl = self.height(s, l);
        let hr = self.height(s, r);
        if hl > hr + 1 {
            self.join_right(s, l.expect("taller left side missing"), k, r)
        } else if hr > hl + 1 {
            self.join_left(s, l, k, r.expect("taller right side missing"))
        } else {
            self.make_node(s, k, l, r);
            k
        }
    }

    /// Links `k` over children `l` and `r` and recomputes its height. The
    /// parent link is cleared; callers attach the result where they need it.
    fn make_node(&self, s: &mut NodeStore, k: NodeRef, l: Option<NodeRef>, r: Option<NodeRef>) {
        s[k].spine_mut(self.side).parent = None;
        s[k].spine_mut(self.side).left = l;
        s[k].spine_mut(self.side).right = r;
        if let Some(c) = l {
            s[c].spine_mut(self.side).parent = Some(k);
        }
        if let Some(c) = r {
            s[c].spine_mut(self.side).parent = Some(k);
        }
        self.update_height(s, k);
    }

    /// Descends the right rim of the taller left tree `tl` until the
    /// remainder is joinable with `tr` directly, restoring balance with at
    /// most one (possibly double) rotation per level on the way back up.
    fn join_right(
        &self,
        s: &mut NodeStore,
        tl: NodeRef,
        k: NodeRef,
        tr: Option<NodeRef>,
    ) -> NodeRef {
        let l_left = self.links(s, tl).left;
        let c = self.links(s, tl).right;

        if self.height(s, c) <= self.height(s, tr) + 1 {
            self.make_node(s, k, c, tr);
            self.set_right(s, tl, Some(k));
            self.update_height(s, tl);
            if self.height(s, Some(k)) > self.height(s, l_left) + 1 {
                self.rotate_right(s, k);
                self.rotate_left(s, tl)
            } else {
                tl
            }
        } else {
            let mid = self.join_right(s, c.expect("rim descent past leaf"), k, tr);
            self.set_right(s, tl, Some(mid));
            self.update_height(s, tl);
            if self.height(s, Some(mid)) > self.height(s, l_left) + 1 {
                self.rotate_left(s, tl)
            } else {
                tl
            }
        }
    }

    /// Mirror of `join_right` for a taller right tree.
    fn join_left(
        &self,
        s: &mut NodeStore,
        tl: Option<NodeRef>,
        k: NodeRef,
        tr: NodeRef,
    ) -> NodeRef {
        let r_right = self.links(s, tr).right;
        let c = self.links(s, tr).left;

        if self.height(s, c) <= self.height(s, tl) + 1 {
            self.make_node(s, k, tl, c);
            self.set_left(s, tr, Some(k));
            self.update_height(s, tr);
            if self.height(s, Some(k)) > self.height(s, r_right) + 1 {
                self.rotate_left(s, k);
                self.rotate_right(s, tr)
            } else {
                tr
            }
        } else {
            let mid = self.join_left(s, tl, k, c.expect("rim descent past leaf"));
            self.set_left(s, tr, Some(mid));
            self.update_height(s, tr);
            if self.height(s, Some(mid)) > self.height(s, r_right) + 1 {
                self.rotate_right(s, tr)
            } else {
                tr
            }
        }
    }
}
