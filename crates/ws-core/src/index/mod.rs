//! Index Module - red-black ordered key index (C9)
//!
//! A classic CLRS red-black tree, re-expressed over a `Vec`-backed arena
//! instead of individually heap-allocated nodes: nodes are referenced by
//! `u32` index, parent/left/right links are indices, and index `0` is a
//! permanent sentinel (`NIL`) so rotations never need a null check. The
//! node pool is preallocated up to a user-chosen capacity (0 = unbounded);
//! deleted nodes return their slot to a free list for reuse rather than
//! shrinking the arena, so steady-state insert/delete does no allocation
//! once the pool is warm.
//!
//! Operators that need a global total order across an otherwise
//! unordered stream of records - sort, top-k eviction, time-windowed
//! dedup - keep one of these per worker and serialize access themselves;
//! the tree itself assumes a single owner and does no internal locking.

use std::cmp::Ordering;

const NIL: u32 = 0;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Color {
    Red,
    Black,
}

struct Node<K, V> {
    key: Option<K>,
    value: Option<V>,
    origin_channel: u32,
    color: Color,
    parent: u32,
    left: u32,
    right: u32,
}

impl<K, V> Node<K, V> {
    fn sentinel() -> Self {
        Node {
            key: None,
            value: None,
            origin_channel: 0,
            color: Color::Black,
            parent: NIL,
            left: NIL,
            right: NIL,
        }
    }
}

/// A red-black tree keyed by `K`, carrying an opaque `V` payload and an
/// origin-channel tag per node.
pub struct RbTree<K, V> {
    nodes: Vec<Node<K, V>>,
    free: Vec<u32>,
    root: u32,
    min: u32,
    max: u32,
    last_insert: u32,
    cap: usize,
    len: usize,
    cmp: Box<dyn Fn(&K, &K) -> Ordering>,
}

impl<K, V> RbTree<K, V> {
    /// Construct a tree with the given node-pool capacity (0 = unbounded)
    /// and comparator.
    pub fn new<F>(cap: usize, cmp: F) -> Self
    where
        F: Fn(&K, &K) -> Ordering + 'static,
    {
        Self {
            nodes: vec![Node::sentinel()],
            free: Vec::new(),
            root: NIL,
            min: NIL,
            max: NIL,
            last_insert: NIL,
            cap,
            len: 0,
            cmp: Box::new(cmp),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.cap
    }

    fn key(&self, idx: u32) -> &K {
        self.nodes[idx as usize].key.as_ref().expect("live node must have a key")
    }

    fn alloc_node(&mut self, key: K, value: V, origin_channel: u32) -> Option<u32> {
        if let Some(idx) = self.free.pop() {
            let node = &mut self.nodes[idx as usize];
            node.key = Some(key);
            node.value = Some(value);
            node.origin_channel = origin_channel;
            node.color = Color::Red;
            node.parent = NIL;
            node.left = NIL;
            node.right = NIL;
            return Some(idx);
        }
        if self.cap != 0 && self.nodes.len() > self.cap {
            return None;
        }
        let idx = self.nodes.len() as u32;
        self.nodes.push(Node {
            key: Some(key),
            value: Some(value),
            origin_channel,
            color: Color::Red,
            parent: NIL,
            left: NIL,
            right: NIL,
        });
        Some(idx)
    }

    fn free_node(&mut self, idx: u32) {
        let node = &mut self.nodes[idx as usize];
        node.key = None;
        node.value = None;
        node.parent = NIL;
        node.left = NIL;
        node.right = NIL;
        self.free.push(idx);
    }

    /// Seed a search for the insertion ancestor by walking up from
    /// `last_insert` until the key is bracketed, turning near-sorted input
    /// into a local walk instead of a descent from the root.
    fn seeded_insertion_ancestor(&self, key: &K) -> u32 {
        if self.root == NIL || self.last_insert == NIL {
            return self.root;
        }
        let mut node = self.last_insert;
        loop {
            let ordering = (self.cmp)(key, self.key(node));
            let parent = self.nodes[node as usize].parent;
            if ordering == Ordering::Equal || parent == NIL {
                return node;
            }
            let node_is_right_child = self.nodes[parent as usize].right == node;
            let node_is_left_child = self.nodes[parent as usize].left == node;
            match ordering {
                Ordering::Less if node_is_right_child => {
                    if (self.cmp)(key, self.key(parent)) != Ordering::Less {
                        return parent;
                    }
                }
                Ordering::Greater if node_is_left_child => {
                    if (self.cmp)(key, self.key(parent)) != Ordering::Greater {
                        return parent;
                    }
                }
                _ => {}
            }
            node = parent;
        }
    }

    fn descend_from(&self, start: u32, key: &K) -> (u32, bool) {
        let mut node = start;
        let mut went_left = true;
        if node == NIL {
            return (NIL, true);
        }
        loop {
            match (self.cmp)(key, self.key(node)) {
                Ordering::Less => {
                    went_left = true;
                    if self.nodes[node as usize].left == NIL {
                        break;
                    }
                    node = self.nodes[node as usize].left;
                }
                _ => {
                    went_left = false;
                    if self.nodes[node as usize].right == NIL {
                        break;
                    }
                    node = self.nodes[node as usize].right;
                }
            }
        }
        (node, went_left)
    }

    fn attach(&mut self, parent: u32, child: u32, as_left: bool) {
        self.nodes[child as usize].parent = parent;
        if parent == NIL {
            self.root = child;
        } else if as_left {
            self.nodes[parent as usize].left = child;
        } else {
            self.nodes[parent as usize].right = child;
        }
    }

    /// Insert during warm-up: maintains both the min and max caches.
    pub fn insert_initial(&mut self, key: K, value: V, origin_channel: u32) -> Option<u32> {
        self.insert_impl(key, value, origin_channel, NIL, true)
    }

    /// Insert in steady state: seeds the search from `last_insert`;
    /// assumes the min node is only ever displaced by `delete_min`.
    pub fn insert(&mut self, key: K, value: V, origin_channel: u32) -> Option<u32> {
        let ancestor = self.seeded_insertion_ancestor(&key);
        self.insert_impl(key, value, origin_channel, ancestor, false)
    }

    fn insert_impl(
        &mut self,
        key: K,
        value: V,
        origin_channel: u32,
        seed: u32,
        is_initial: bool,
    ) -> Option<u32> {
        let start = if self.root == NIL {
            NIL
        } else if is_initial {
            self.root
        } else {
            seed
        };
        let (parent, as_left) = self.descend_from(start, &key);

        let idx = self.alloc_node(key, value, origin_channel)?;
        self.attach(parent, idx, as_left);
        self.insert_fixup(idx);
        self.len += 1;
        self.last_insert = idx;

        if self.min == NIL || (self.cmp)(self.key(idx), self.key(self.min)) == Ordering::Less {
            self.min = idx;
        }
        if self.max == NIL || (self.cmp)(self.key(idx), self.key(self.max)) == Ordering::Greater {
            self.max = idx;
        }

        Some(idx)
    }

    fn rotate_left(&mut self, x: u32) {
        let y = self.nodes[x as usize].right;
        self.nodes[x as usize].right = self.nodes[y as usize].left;
        if self.nodes[y as usize].left != NIL {
            self.nodes[self.nodes[y as usize].left as usize].parent = x;
        }
        self.nodes[y as usize].parent = self.nodes[x as usize].parent;
        let parent = self.nodes[x as usize].parent;
        if parent == NIL {
            self.root = y;
        } else if self.nodes[parent as usize].left == x {
            self.nodes[parent as usize].left = y;
        } else {
            self.nodes[parent as usize].right = y;
        }
        self.nodes[y as usize].left = x;
        self.nodes[x as usize].parent = y;
    }

    fn rotate_right(&mut self, x: u32) {
        let y = self.nodes[x as usize].left;
        self.nodes[x as usize].left = self.nodes[y as usize].right;
        if self.nodes[y as usize].right != NIL {
            self.nodes[self.nodes[y as usize].right as usize].parent = x;
        }
        self.nodes[y as usize].parent = self.nodes[x as usize].parent;
        let parent = self.nodes[x as usize].parent;
        if parent == NIL {
            self.root = y;
        } else if self.nodes[parent as usize].right == x {
            self.nodes[parent as usize].right = y;
        } else {
            self.nodes[parent as usize].left = y;
        }
        self.nodes[y as usize].right = x;
        self.nodes[x as usize].parent = y;
    }

    fn is_red(&self, idx: u32) -> bool {
        idx != NIL && self.nodes[idx as usize].color == Color::Red
    }

    fn insert_fixup(&mut self, mut z: u32) {
        while self.is_red(self.nodes[z as usize].parent) {
            let parent = self.nodes[z as usize].parent;
            let grandparent = self.nodes[parent as usize].parent;
            if grandparent == NIL {
                break;
            }
            if parent == self.nodes[grandparent as usize].left {
                let uncle = self.nodes[grandparent as usize].right;
                if self.is_red(uncle) {
                    self.nodes[parent as usize].color = Color::Black;
                    self.nodes[uncle as usize].color = Color::Black;
                    self.nodes[grandparent as usize].color = Color::Red;
                    z = grandparent;
                } else {
                    if z == self.nodes[parent as usize].right {
                        z = parent;
                        self.rotate_left(z);
                    }
                    let parent = self.nodes[z as usize].parent;
                    let grandparent = self.nodes[parent as usize].parent;
                    self.nodes[parent as usize].color = Color::Black;
                    self.nodes[grandparent as usize].color = Color::Red;
                    self.rotate_right(grandparent);
                }
            } else {
                let uncle = self.nodes[grandparent as usize].left;
                if self.is_red(uncle) {
                    self.nodes[parent as usize].color = Color::Black;
                    self.nodes[uncle as usize].color = Color::Black;
                    self.nodes[grandparent as usize].color = Color::Red;
                    z = grandparent;
                } else {
                    if z == self.nodes[parent as usize].left {
                        z = parent;
                        self.rotate_right(z);
                    }
                    let parent = self.nodes[z as usize].parent;
                    let grandparent = self.nodes[parent as usize].parent;
                    self.nodes[parent as usize].color = Color::Black;
                    self.nodes[grandparent as usize].color = Color::Red;
                    self.rotate_left(grandparent);
                }
            }
        }
        self.nodes[self.root as usize].color = Color::Black;
    }

    fn minimum(&self, mut node: u32) -> u32 {
        while self.nodes[node as usize].left != NIL {
            node = self.nodes[node as usize].left;
        }
        node
    }

    fn maximum(&self, mut node: u32) -> u32 {
        while self.nodes[node as usize].right != NIL {
            node = self.nodes[node as usize].right;
        }
        node
    }

    fn transplant(&mut self, u: u32, v: u32) {
        let parent = self.nodes[u as usize].parent;
        if parent == NIL {
            self.root = v;
        } else if self.nodes[parent as usize].left == u {
            self.nodes[parent as usize].left = v;
        } else {
            self.nodes[parent as usize].right = v;
        }
        if v != NIL {
            self.nodes[v as usize].parent = parent;
        }
    }

    /// Remove the node holding `key`, returning its value if present.
    pub fn delete(&mut self, key: &K) -> Option<V> {
        let z = self.find_node(key)?;
        self.delete_node(z)
    }

    /// Remove and return the value with the smallest key.
    pub fn delete_min(&mut self) -> Option<(K, V)> {
        if self.min == NIL {
            return None;
        }
        let idx = self.min;
        let key = self.nodes[idx as usize].key.clone_key();
        let value = self.delete_node(idx)?;
        Some((key, value))
    }

    fn delete_node(&mut self, z: u32) -> Option<V> {
        let mut y = z;
        let mut y_original_color = self.nodes[y as usize].color;
        let x;
        let x_parent;

        if self.nodes[z as usize].left == NIL {
            x = self.nodes[z as usize].right;
            x_parent = self.nodes[z as usize].parent;
            self.transplant(z, self.nodes[z as usize].right);
        } else if self.nodes[z as usize].right == NIL {
            x = self.nodes[z as usize].left;
            x_parent = self.nodes[z as usize].parent;
            self.transplant(z, self.nodes[z as usize].left);
        } else {
            y = self.minimum(self.nodes[z as usize].right);
            y_original_color = self.nodes[y as usize].color;
            x = self.nodes[y as usize].right;
            if self.nodes[y as usize].parent == z {
                x_parent = y;
                if x != NIL {
                    self.nodes[x as usize].parent = y;
                }
            } else {
                x_parent = self.nodes[y as usize].parent;
                self.transplant(y, self.nodes[y as usize].right);
                self.nodes[y as usize].right = self.nodes[z as usize].right;
                self.nodes[self.nodes[y as usize].right as usize].parent = y;
            }
            self.transplant(z, y);
            self.nodes[y as usize].left = self.nodes[z as usize].left;
            self.nodes[self.nodes[y as usize].left as usize].parent = y;
            self.nodes[y as usize].color = self.nodes[z as usize].color;
        }

        if y_original_color == Color::Black {
            self.delete_fixup(x, x_parent);
        }

        let value = self.nodes[z as usize].value.take();
        self.len -= 1;

        if self.min == z {
            self.min = if self.root == NIL { NIL } else { self.minimum(self.root) };
        }
        if self.max == z {
            self.max = if self.root == NIL { NIL } else { self.maximum(self.root) };
        }
        if self.last_insert == z {
            self.last_insert = self.root;
        }

        self.free_node(z);
        value
    }

    fn delete_fixup(&mut self, mut x: u32, mut x_parent: u32) {
        while x != self.root && !self.is_red(x) {
            if x_parent == NIL {
                break;
            }
            if x == self.nodes[x_parent as usize].left {
                let mut w = self.nodes[x_parent as usize].right;
                if self.is_red(w) {
                    self.nodes[w as usize].color = Color::Black;
                    self.nodes[x_parent as usize].color = Color::Red;
                    self.rotate_left(x_parent);
                    w = self.nodes[x_parent as usize].right;
                }
                if !self.is_red(self.nodes[w as usize].left) && !self.is_red(self.nodes[w as usize].right) {
                    self.nodes[w as usize].color = Color::Red;
                    x = x_parent;
                    x_parent = self.nodes[x as usize].parent;
                } else {
                    if !self.is_red(self.nodes[w as usize].right) {
                        self.nodes[self.nodes[w as usize].left as usize].color = Color::Black;
                        self.nodes[w as usize].color = Color::Red;
                        self.rotate_right(w);
                        w = self.nodes[x_parent as usize].right;
                    }
                    self.nodes[w as usize].color = self.nodes[x_parent as usize].color;
                    self.nodes[x_parent as usize].color = Color::Black;
                    self.nodes[self.nodes[w as usize].right as usize].color = Color::Black;
                    self.rotate_left(x_parent);
                    x = self.root;
                    x_parent = NIL;
                }
            } else {
                let mut w = self.nodes[x_parent as usize].left;
                if self.is_red(w) {
                    self.nodes[w as usize].color = Color::Black;
                    self.nodes[x_parent as usize].color = Color::Red;
                    self.rotate_right(x_parent);
                    w = self.nodes[x_parent as usize].left;
                }
                if !self.is_red(self.nodes[w as usize].right) && !self.is_red(self.nodes[w as usize].left) {
                    self.nodes[w as usize].color = Color::Red;
                    x = x_parent;
                    x_parent = self.nodes[x as usize].parent;
                } else {
                    if !self.is_red(self.nodes[w as usize].left) {
                        self.nodes[self.nodes[w as usize].right as usize].color = Color::Black;
                        self.nodes[w as usize].color = Color::Red;
                        self.rotate_left(w);
                        w = self.nodes[x_parent as usize].left;
                    }
                    self.nodes[w as usize].color = self.nodes[x_parent as usize].color;
                    self.nodes[x_parent as usize].color = Color::Black;
                    self.nodes[self.nodes[w as usize].left as usize].color = Color::Black;
                    self.rotate_right(x_parent);
                    x = self.root;
                    x_parent = NIL;
                }
            }
        }
        if x != NIL {
            self.nodes[x as usize].color = Color::Black;
        }
    }

    fn find_node(&self, key: &K) -> Option<u32> {
        let mut node = self.root;
        while node != NIL {
            match (self.cmp)(key, self.key(node)) {
                Ordering::Equal => return Some(node),
                Ordering::Less => node = self.nodes[node as usize].left,
                Ordering::Greater => node = self.nodes[node as usize].right,
            }
        }
        None
    }

    /// Returns all (key, value) pairs with key in the closed range
    /// `[low, high]`, in ascending order.
    pub fn enumerate(&self, low: &K, high: &K) -> Vec<(&K, &V)> {
        let mut out = Vec::new();
        self.enumerate_rec(self.root, low, high, &mut out);
        out
    }

    fn enumerate_rec<'a>(&'a self, node: u32, low: &K, high: &K, out: &mut Vec<(&'a K, &'a V)>) {
        if node == NIL {
            return;
        }
        let k = self.key(node);
        if (self.cmp)(k, low) == Ordering::Greater || (self.cmp)(k, low) == Ordering::Equal {
            self.enumerate_rec(self.nodes[node as usize].left, low, high, out);
        }
        if (self.cmp)(k, low) != Ordering::Less && (self.cmp)(k, high) != Ordering::Greater {
            out.push((k, self.nodes[node as usize].value.as_ref().unwrap()));
        }
        if (self.cmp)(k, high) == Ordering::Less || (self.cmp)(k, high) == Ordering::Equal {
            self.enumerate_rec(self.nodes[node as usize].right, low, high, out);
        }
    }

    /// Verify red-black invariants (root is black, no red-red, equal
    /// black-height on every root-to-leaf path). For tests/debug assertions.
    pub fn check_invariants(&self) -> bool {
        if self.root != NIL && self.is_red(self.root) {
            return false;
        }
        self.check_node(self.root).is_some()
    }

    fn check_node(&self, node: u32) -> Option<usize> {
        if node == NIL {
            return Some(1);
        }
        if self.is_red(node) {
            let left = self.nodes[node as usize].left;
            let right = self.nodes[node as usize].right;
            if self.is_red(left) || self.is_red(right) {
                return None;
            }
        }
        let left_bh = self.check_node(self.nodes[node as usize].left)?;
        let right_bh = self.check_node(self.nodes[node as usize].right)?;
        if left_bh != right_bh {
            return None;
        }
        Some(left_bh + if self.is_red(node) { 0 } else { 1 })
    }
}

trait CloneKey<K> {
    fn clone_key(&self) -> K;
}

impl<K: Clone> CloneKey<K> for Option<K> {
    fn clone_key(&self) -> K {
        self.clone().expect("live node must have a key")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_tree() -> RbTree<i32, &'static str> {
        RbTree::new(0, |a: &i32, b: &i32| a.cmp(b))
    }

    #[test]
    fn ordered_emit_via_delete_min() {
        let mut tree = int_tree();
        for (i, k) in [7, 3, 9, 1, 5, 8, 2, 6, 4].into_iter().enumerate() {
            if i == 0 {
                tree.insert_initial(k, "v", 0);
            } else {
                tree.insert(k, "v", 0);
            }
        }
        assert!(tree.check_invariants());

        let mut emitted = vec![];
        while let Some((k, _)) = tree.delete_min() {
            emitted.push(k);
        }
        assert_eq!(emitted, vec![1, 2, 3, 4, 5, 6, 7, 8, 9]);
    }

    #[test]
    fn invariants_hold_after_interleaved_insert_delete() {
        let mut tree = int_tree();
        for k in [10, 20, 5, 15, 25, 1, 30, 12] {
            tree.insert(k, "v", 0);
            assert!(tree.check_invariants());
        }
        tree.delete(&15);
        assert!(tree.check_invariants());
        tree.delete(&10);
        assert!(tree.check_invariants());
        assert_eq!(tree.len(), 6);
    }

    #[test]
    fn enumerate_returns_closed_range_in_order() {
        let mut tree = int_tree();
        for k in [5, 1, 9, 3, 7, 2, 8, 4, 6] {
            tree.insert(k, "v", 0);
        }
        let range = tree.enumerate(&3, &7);
        let keys: Vec<i32> = range.iter().map(|(k, _)| **k).collect();
        assert_eq!(keys, vec![3, 4, 5, 6, 7]);
    }

    #[test]
    fn node_pool_exhaustion_returns_none() {
        let mut tree: RbTree<i32, ()> = RbTree::new(3, |a, b| a.cmp(b));
        assert!(tree.insert_initial(1, (), 0).is_some());
        assert!(tree.insert(2, (), 0).is_some());
        assert!(tree.insert(3, (), 0).is_some());
        assert!(tree.insert(4, (), 0).is_none());
    }

    #[test]
    fn freed_slots_are_reused() {
        let mut tree: RbTree<i32, ()> = RbTree::new(2, |a, b| a.cmp(b));
        tree.insert_initial(1, (), 0);
        tree.insert(2, (), 0);
        assert!(tree.insert(3, (), 0).is_none());
        tree.delete(&1);
        assert!(tree.insert(3, (), 0).is_some());
    }
}
