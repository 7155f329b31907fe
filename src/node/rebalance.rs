//! Insertion and deletion over persisted nodes.
//!
//! Every step works on nodes loaded through the [`Pager`] and writes a node
//! back as soon as its content at that level is final. Deletion fixes a
//! minimal child (by rotation or merge) before descending into it, so every
//! node reached by a delete can give up a key without underflowing.

use super::{Node, Slot};
use crate::error::{Error, Result};
use crate::node_type::{Key, NodeType};
use crate::pager::{IdAllocator, Pager};
use crate::store::Store;
use tracing::debug;

impl Node {
    /// Creates a new root whose only child is the full node `child`, then
    /// splits that child. The tree grows by one level.
    pub fn grow<S: Store, A: IdAllocator>(pager: &mut Pager<S, A>, child: Node) -> Result<Node> {
        let mut root = pager.allocate(NodeType::Internal)?;
        root.children_mut()?.push(child.id);
        root.split_child(pager, 0, child)?;
        Ok(root)
    }

    /// Adds `target` to the subtree rooted at this node, which must not be full.
    /// Adding a key that is already present does nothing.
    pub fn add<S: Store, A: IdAllocator>(
        &mut self,
        pager: &mut Pager<S, A>,
        target: Key,
    ) -> Result<()> {
        loop {
            let index = match self.locate(target) {
                Slot::Found(_) => return Ok(()),
                Slot::Descend(index) => index,
            };
            if self.is_leaf() {
                self.keys.insert(index, target);
                return pager.save(self);
            }
            let mut child = pager.load(self.child_id(index)?)?;
            if child.is_full(pager.degree()) {
                // The promoted key may now be `target` or change which child covers it.
                self.split_child(pager, index, child)?;
                continue;
            }
            return child.add(pager, target);
        }
    }

    /// Splits `child`, the full child at `index`, into two minimal halves and
    /// promotes its middle key into this node. Persists both halves and this node.
    pub fn split_child<S: Store, A: IdAllocator>(
        &mut self,
        pager: &mut Pager<S, A>,
        index: usize,
        mut child: Node,
    ) -> Result<()> {
        let degree = pager.degree();
        if !child.is_full(degree) {
            return Err(Error::invariant(child.id, "split of a node that is not full"));
        }
        let t = degree.get();

        let mut sibling = pager.allocate(child.node_type())?;
        sibling.keys.extend(child.keys.drain(t..));
        if let Some(children) = child.children.as_mut() {
            sibling.children_mut()?.extend(children.drain(t..));
        }
        let middle = child
            .keys
            .pop()
            .ok_or_else(|| Error::corrupt(child.id, "split left no key to promote"))?;
        pager.save(&sibling)?;

        self.keys.insert(index, middle);
        self.children_mut()?.insert(index + 1, sibling.id);
        debug!(parent = %self.id, child = %child.id, sibling = %sibling.id, promoted = middle, "split node");

        pager.save(&child)?;
        pager.save(self)
    }

    /// Removes `target` from the subtree rooted at this node. Removing an absent
    /// key leaves the keys unchanged, although minimal nodes on the search path
    /// may still be rebalanced.
    pub fn remove<S: Store, A: IdAllocator>(
        &mut self,
        pager: &mut Pager<S, A>,
        target: Key,
    ) -> Result<()> {
        match (self.locate(target), self.is_leaf()) {
            (Slot::Found(index), true) => {
                self.keys.remove(index);
                pager.save(self)
            }
            (Slot::Descend(_), true) => Ok(()),
            (Slot::Found(index), false) => self.remove_separator(pager, index, target),
            (Slot::Descend(index), false) => self.remove_from_child(pager, index, target),
        }
    }

    // `target` is the separator at `index` of this internal node.
    fn remove_separator<S: Store, A: IdAllocator>(
        &mut self,
        pager: &mut Pager<S, A>,
        index: usize,
        target: Key,
    ) -> Result<()> {
        let degree = pager.degree();
        let mut child = pager.load(self.child_id(index)?)?;
        if !child.is_minimal(degree) {
            self.keys[index] = child.remove_rightmost(pager)?;
            return pager.save(self);
        }
        let mut sibling = pager.load(self.child_id(index + 1)?)?;
        if !sibling.is_minimal(degree) {
            self.keys[index] = sibling.remove_leftmost(pager)?;
            return pager.save(self);
        }
        self.merge_children(pager, index, &mut child, sibling)?;
        pager.save(self)?;
        child.remove(pager, target)
    }

    fn remove_from_child<S: Store, A: IdAllocator>(
        &mut self,
        pager: &mut Pager<S, A>,
        index: usize,
        target: Key,
    ) -> Result<()> {
        let mut child = pager.load(self.child_id(index)?)?;
        if child.is_minimal(pager.degree()) {
            child = self.fix_minimal_child(pager, index, child)?;
            pager.save(self)?;
        }
        child.remove(pager, target)
    }

    /// Removes and returns the smallest key of this subtree.
    pub(crate) fn remove_leftmost<S: Store, A: IdAllocator>(
        &mut self,
        pager: &mut Pager<S, A>,
    ) -> Result<Key> {
        if self.is_leaf() {
            if self.keys.is_empty() {
                return Err(Error::corrupt(self.id, "no key left in leaf"));
            }
            let key = self.keys.remove(0);
            pager.save(self)?;
            return Ok(key);
        }
        let mut child = pager.load(self.child_id(0)?)?;
        if child.is_minimal(pager.degree()) {
            child = self.fix_minimal_child(pager, 0, child)?;
            pager.save(self)?;
        }
        child.remove_leftmost(pager)
    }

    /// Removes and returns the largest key of this subtree.
    pub(crate) fn remove_rightmost<S: Store, A: IdAllocator>(
        &mut self,
        pager: &mut Pager<S, A>,
    ) -> Result<Key> {
        if self.is_leaf() {
            let key = self
                .keys
                .pop()
                .ok_or_else(|| Error::corrupt(self.id, "no key left in leaf"))?;
            pager.save(self)?;
            return Ok(key);
        }
        let last = self.keys.len();
        let mut child = pager.load(self.child_id(last)?)?;
        if child.is_minimal(pager.degree()) {
            child = self.fix_minimal_child(pager, last, child)?;
            pager.save(self)?;
        }
        child.remove_rightmost(pager)
    }

    /// Gives the minimal child at `index` an extra key, borrowing from a
    /// neighbor when one can spare a key and merging with a neighbor otherwise.
    /// Returns the node that now covers the child's key range: the child
    /// itself, or its left neighbor when the child was merged into it.
    /// Persists every child it changes; this node is left to the caller.
    fn fix_minimal_child<S: Store, A: IdAllocator>(
        &mut self,
        pager: &mut Pager<S, A>,
        index: usize,
        mut child: Node,
    ) -> Result<Node> {
        let degree = pager.degree();
        let last = self.keys.len();

        if index == 0 {
            let mut right = pager.load(self.child_id(1)?)?;
            if right.is_minimal(degree) {
                self.merge_children(pager, 0, &mut child, right)?;
            } else {
                self.rotate_left(pager, 0, &mut child, &mut right)?;
            }
            return Ok(child);
        }

        if index == last {
            let mut left = pager.load(self.child_id(index - 1)?)?;
            if left.is_minimal(degree) {
                self.merge_children(pager, index - 1, &mut left, child)?;
                return Ok(left);
            }
            self.rotate_right(pager, index - 1, &mut left, &mut child)?;
            return Ok(child);
        }

        let mut right = pager.load(self.child_id(index + 1)?)?;
        if !right.is_minimal(degree) {
            self.rotate_left(pager, index, &mut child, &mut right)?;
            return Ok(child);
        }
        let mut left = pager.load(self.child_id(index - 1)?)?;
        if !left.is_minimal(degree) {
            self.rotate_right(pager, index - 1, &mut left, &mut child)?;
        } else {
            self.merge_children(pager, index, &mut child, right)?;
        }
        Ok(child)
    }

    /// Merges `sibling`, the child at `index + 1`, into `child`, the child at
    /// `index`, pulling the separator between them down from this node.
    /// Persists `child` and deletes the record of `sibling`.
    pub(crate) fn merge_children<S: Store, A: IdAllocator>(
        &mut self,
        pager: &mut Pager<S, A>,
        index: usize,
        child: &mut Node,
        mut sibling: Node,
    ) -> Result<()> {
        check_same_kind(child, &sibling)?;
        self.check_separator(index)?;
        let separator = self.keys.remove(index);
        self.children_mut()?.remove(index + 1);

        child.keys.push(separator);
        child.keys.append(&mut sibling.keys);
        if let (Some(children), Some(moved)) = (child.children.as_mut(), sibling.children.as_mut()) {
            children.append(moved);
        }
        debug!(parent = %self.id, child = %child.id, absorbed = %sibling.id, separator, "merged nodes");

        pager.save(child)?;
        pager.delete(sibling.id)
    }

    /// Moves the separator at `index` down to the end of `child` and the first
    /// key of `sibling` (the child at `index + 1`) up in its place. For
    /// internal nodes the first child of `sibling` moves along.
    /// Persists `sibling` and `child`.
    pub(crate) fn rotate_left<S: Store, A: IdAllocator>(
        &mut self,
        pager: &mut Pager<S, A>,
        index: usize,
        child: &mut Node,
        sibling: &mut Node,
    ) -> Result<()> {
        check_same_kind(child, sibling)?;
        self.check_separator(index)?;
        if sibling.keys.is_empty() {
            return Err(Error::corrupt(sibling.id, "no key to rotate left"));
        }

        child.keys.push(self.keys[index]);
        if let (Some(children), Some(moved)) = (child.children.as_mut(), sibling.children.as_mut()) {
            if moved.is_empty() {
                return Err(Error::corrupt(sibling.id, "no child to rotate left"));
            }
            children.push(moved.remove(0));
        }
        self.keys[index] = sibling.keys.remove(0);
        debug!(parent = %self.id, from = %sibling.id, to = %child.id, "rotated left");

        pager.save(sibling)?;
        pager.save(child)
    }

    /// Mirror of [`Node::rotate_left`]: `sibling` is the child at `index` and
    /// `child` the one at `index + 1`. The separator moves to the front of
    /// `child` and the last key of `sibling` takes its place.
    /// Persists `sibling` and `child`.
    pub(crate) fn rotate_right<S: Store, A: IdAllocator>(
        &mut self,
        pager: &mut Pager<S, A>,
        index: usize,
        sibling: &mut Node,
        child: &mut Node,
    ) -> Result<()> {
        check_same_kind(child, sibling)?;
        self.check_separator(index)?;
        let borrowed = sibling
            .keys
            .pop()
            .ok_or_else(|| Error::corrupt(sibling.id, "no key to rotate right"))?;

        child.keys.insert(0, self.keys[index]);
        if let (Some(children), Some(moved)) = (child.children.as_mut(), sibling.children.as_mut()) {
            let last = moved
                .pop()
                .ok_or_else(|| Error::corrupt(sibling.id, "no child to rotate right"))?;
            children.insert(0, last);
        }
        self.keys[index] = borrowed;
        debug!(parent = %self.id, from = %sibling.id, to = %child.id, "rotated right");

        pager.save(sibling)?;
        pager.save(child)
    }

    // A separator at `index` needs children on both sides of it.
    fn check_separator(&self, index: usize) -> Result<()> {
        if index >= self.keys.len() {
            return Err(Error::corrupt(
                self.id,
                format!("no separator at position {}", index),
            ));
        }
        self.child_id(index + 1).map(|_| ())
    }
}

// Siblings sit at the same depth, so both are leaves or both are internal.
fn check_same_kind(child: &Node, sibling: &Node) -> Result<()> {
    if child.is_leaf() != sibling.is_leaf() {
        return Err(Error::invariant(
            sibling.id,
            format!("sibling of node {} is a different kind of node", child.id),
        ));
    }
    Ok(())
}
