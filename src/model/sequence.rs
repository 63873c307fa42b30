//! Ordered child collection.
//!
//! A randomized balanced tree (treap) keyed by in-order position. Every node
//! records its subtree size and its parent, so a handle can be turned back into
//! a position by walking up to the root. Handles stay valid across inserts,
//! removals of other nodes, single-node resorts and full sorts; only removing
//! the node itself invalidates its handle.

use std::cmp::Ordering;

use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// Key of one per-directory collection in the model.
    pub struct CollectionId;
    /// Stable reference to one element of a [`Sequence`].
    pub struct SeqHandle;
}

#[derive(Debug)]
struct Node<T> {
    value: T,
    priority: u32,
    size: usize,
    parent: Option<SeqHandle>,
    left: Option<SeqHandle>,
    right: Option<SeqHandle>,
}

#[derive(Debug)]
pub struct Sequence<T> {
    nodes: SlotMap<SeqHandle, Node<T>>,
    root: Option<SeqHandle>,
}

impl<T> Default for Sequence<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Sequence<T> {
    pub fn new() -> Self {
        Self {
            nodes: SlotMap::with_key(),
            root: None,
        }
    }

    pub fn len(&self) -> usize {
        self.size(self.root)
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub fn contains(&self, handle: SeqHandle) -> bool {
        self.nodes.contains_key(handle)
    }

    pub fn get(&self, handle: SeqHandle) -> Option<&T> {
        self.nodes.get(handle).map(|node| &node.value)
    }

    /// Mutable access to an element.
    ///
    /// Changing anything the ordering depends on must be followed by
    /// [`Sequence::sort_changed`] for the same handle.
    pub fn get_mut(&mut self, handle: SeqHandle) -> Option<&mut T> {
        self.nodes.get_mut(handle).map(|node| &mut node.value)
    }

    pub fn first(&self) -> Option<SeqHandle> {
        self.root.map(|root| self.leftmost(root))
    }

    /// Handle of the element at position `n`.
    pub fn nth(&self, mut n: usize) -> Option<SeqHandle> {
        let mut cur = self.root;
        while let Some(handle) = cur {
            let node = &self.nodes[handle];
            let left_size = self.size(node.left);
            match n.cmp(&left_size) {
                Ordering::Less => cur = node.left,
                Ordering::Equal => return Some(handle),
                Ordering::Greater => {
                    n -= left_size + 1;
                    cur = node.right;
                }
            }
        }
        None
    }

    /// Current position of `handle`, or `None` if it was removed.
    pub fn position(&self, handle: SeqHandle) -> Option<usize> {
        if !self.contains(handle) {
            return None;
        }
        let mut pos = self.size(self.nodes[handle].left);
        let mut cur = handle;
        while let Some(parent) = self.nodes[cur].parent {
            if self.nodes[parent].right == Some(cur) {
                pos += self.size(self.nodes[parent].left) + 1;
            }
            cur = parent;
        }
        Some(pos)
    }

    pub fn next(&self, handle: SeqHandle) -> Option<SeqHandle> {
        if !self.contains(handle) {
            return None;
        }
        if let Some(right) = self.nodes[handle].right {
            return Some(self.leftmost(right));
        }
        let mut cur = handle;
        while let Some(parent) = self.nodes[cur].parent {
            if self.nodes[parent].left == Some(cur) {
                return Some(parent);
            }
            cur = parent;
        }
        None
    }

    pub fn prev(&self, handle: SeqHandle) -> Option<SeqHandle> {
        if !self.contains(handle) {
            return None;
        }
        if let Some(left) = self.nodes[handle].left {
            return Some(self.rightmost(left));
        }
        let mut cur = handle;
        while let Some(parent) = self.nodes[cur].parent {
            if self.nodes[parent].right == Some(cur) {
                return Some(parent);
            }
            cur = parent;
        }
        None
    }

    /// Handles in sequence order.
    pub fn handles(&self) -> Handles<'_, T> {
        Handles {
            seq: self,
            next: self.first(),
        }
    }

    /// Insert `value` after every element that does not compare greater.
    pub fn insert_sorted<F>(&mut self, value: T, mut cmp: F) -> SeqHandle
    where
        F: FnMut(&T, &T) -> Ordering,
    {
        let handle = self.nodes.insert(Node {
            value,
            priority: rand::random(),
            size: 1,
            parent: None,
            left: None,
            right: None,
        });
        self.link_sorted(handle, &mut cmp);
        handle
    }

    pub fn remove(&mut self, handle: SeqHandle) -> Option<T> {
        if !self.contains(handle) {
            return None;
        }
        self.detach(handle);
        self.nodes.remove(handle).map(|node| node.value)
    }

    /// Move a single element to where `cmp` says it belongs now.
    ///
    /// An element that still sits between neighbours it does not compare
    /// greater/less than is left alone, so equal keys keep their order.
    /// Returns `false` for a dead handle.
    pub fn sort_changed<F>(&mut self, handle: SeqHandle, mut cmp: F) -> bool
    where
        F: FnMut(&T, &T) -> Ordering,
    {
        if !self.contains(handle) {
            return false;
        }
        let value = &self.nodes[handle].value;
        let after_prev = self
            .prev(handle)
            .map_or(true, |prev| cmp(&self.nodes[prev].value, value) != Ordering::Greater);
        let before_next = self
            .next(handle)
            .map_or(true, |next| cmp(value, &self.nodes[next].value) != Ordering::Greater);
        if after_prev && before_next {
            return true;
        }
        self.detach(handle);
        self.link_sorted(handle, &mut cmp);
        true
    }

    /// Stable sort of the whole sequence. Handles keep pointing at the same
    /// elements.
    pub fn sort<F>(&mut self, mut cmp: F)
    where
        F: FnMut(&T, &T) -> Ordering,
    {
        let mut order: Vec<SeqHandle> = self.handles().collect();
        if order.len() <= 1 {
            return;
        }
        order.sort_by(|&a, &b| cmp(&self.nodes[a].value, &self.nodes[b].value));

        // Rebuild as a cartesian tree over the existing priorities so the
        // heap property survives the reorder.
        let mut spine: Vec<SeqHandle> = Vec::with_capacity(order.len());
        for &handle in &order {
            {
                let node = &mut self.nodes[handle];
                node.left = None;
                node.right = None;
                node.parent = None;
                node.size = 1;
            }
            let mut last = None;
            while let Some(&top) = spine.last() {
                if self.nodes[top].priority < self.nodes[handle].priority {
                    last = spine.pop();
                } else {
                    break;
                }
            }
            self.nodes[handle].left = last;
            if let Some(&top) = spine.last() {
                self.nodes[top].right = Some(handle);
            }
            spine.push(handle);
        }
        let root = spine.first().copied();
        self.fix_subtree(root);
        self.set_root(root);
    }

    fn size(&self, subtree: Option<SeqHandle>) -> usize {
        subtree.map_or(0, |handle| self.nodes[handle].size)
    }

    fn leftmost(&self, mut handle: SeqHandle) -> SeqHandle {
        while let Some(left) = self.nodes[handle].left {
            handle = left;
        }
        handle
    }

    fn rightmost(&self, mut handle: SeqHandle) -> SeqHandle {
        while let Some(right) = self.nodes[handle].right {
            handle = right;
        }
        handle
    }

    /// Recompute the size of `handle` and point its children back at it.
    fn update(&mut self, handle: SeqHandle) {
        let (left, right) = {
            let node = &self.nodes[handle];
            (node.left, node.right)
        };
        self.nodes[handle].size = 1 + self.size(left) + self.size(right);
        if let Some(left) = left {
            self.nodes[left].parent = Some(handle);
        }
        if let Some(right) = right {
            self.nodes[right].parent = Some(handle);
        }
    }

    fn fix_subtree(&mut self, subtree: Option<SeqHandle>) -> usize {
        let Some(handle) = subtree else {
            return 0;
        };
        let (left, right) = {
            let node = &self.nodes[handle];
            (node.left, node.right)
        };
        let size = 1 + self.fix_subtree(left) + self.fix_subtree(right);
        self.update(handle);
        size
    }

    fn set_root(&mut self, root: Option<SeqHandle>) {
        self.root = root;
        if let Some(root) = root {
            self.nodes[root].parent = None;
        }
    }

    /// Split `subtree` into elements that do not compare greater than `key`
    /// and the rest.
    fn split<F>(
        &mut self,
        subtree: Option<SeqHandle>,
        key: SeqHandle,
        cmp: &mut F,
    ) -> (Option<SeqHandle>, Option<SeqHandle>)
    where
        F: FnMut(&T, &T) -> Ordering,
    {
        let Some(handle) = subtree else {
            return (None, None);
        };
        let goes_left = cmp(&self.nodes[handle].value, &self.nodes[key].value) != Ordering::Greater;
        if goes_left {
            let right = self.nodes[handle].right;
            let (lower, upper) = self.split(right, key, cmp);
            self.nodes[handle].right = lower;
            self.update(handle);
            (Some(handle), upper)
        } else {
            let left = self.nodes[handle].left;
            let (lower, upper) = self.split(left, key, cmp);
            self.nodes[handle].left = upper;
            self.update(handle);
            (lower, Some(handle))
        }
    }

    fn merge(&mut self, a: Option<SeqHandle>, b: Option<SeqHandle>) -> Option<SeqHandle> {
        match (a, b) {
            (None, other) | (other, None) => other,
            (Some(x), Some(y)) => {
                if self.nodes[x].priority > self.nodes[y].priority {
                    let right = self.nodes[x].right;
                    let merged = self.merge(right, Some(y));
                    self.nodes[x].right = merged;
                    self.update(x);
                    Some(x)
                } else {
                    let left = self.nodes[y].left;
                    let merged = self.merge(Some(x), left);
                    self.nodes[y].left = merged;
                    self.update(y);
                    Some(y)
                }
            }
        }
    }

    /// Link a free-standing node into the tree at its sorted position.
    fn link_sorted<F>(&mut self, handle: SeqHandle, cmp: &mut F)
    where
        F: FnMut(&T, &T) -> Ordering,
    {
        let root = self.root.take();
        let (lower, upper) = self.split(root, handle, cmp);
        let lower = self.merge(lower, Some(handle));
        let root = self.merge(lower, upper);
        self.set_root(root);
    }

    /// Unlink `handle` from the tree, leaving it free-standing.
    fn detach(&mut self, handle: SeqHandle) {
        let (left, right, parent) = {
            let node = &self.nodes[handle];
            (node.left, node.right, node.parent)
        };
        let merged = self.merge(left, right);
        match parent {
            None => self.set_root(merged),
            Some(parent) => {
                if self.nodes[parent].left == Some(handle) {
                    self.nodes[parent].left = merged;
                } else {
                    self.nodes[parent].right = merged;
                }
                self.update(parent);
                let mut cur = self.nodes[parent].parent;
                while let Some(ancestor) = cur {
                    let (l, r) = {
                        let node = &self.nodes[ancestor];
                        (node.left, node.right)
                    };
                    self.nodes[ancestor].size = 1 + self.size(l) + self.size(r);
                    cur = self.nodes[ancestor].parent;
                }
            }
        }
        let node = &mut self.nodes[handle];
        node.left = None;
        node.right = None;
        node.parent = None;
        node.size = 1;
    }
}

/// Iterator over the handles of a [`Sequence`] in order.
pub struct Handles<'a, T> {
    seq: &'a Sequence<T>,
    next: Option<SeqHandle>,
}

impl<T> Iterator for Handles<'_, T> {
    type Item = SeqHandle;

    fn next(&mut self) -> Option<SeqHandle> {
        let current = self.next?;
        self.next = self.seq.next(current);
        Some(current)
    }
}
