use crate::config::Config;
use crate::error::{Error, Result};
use crate::node::{Node, Slot};
use crate::node_type::{Key, NodeId, NodeType};
use crate::pager::{IdAllocator, Pager, SequentialIds};
use crate::store::Store;
use std::collections::HashSet;
use tracing::{info, warn};

/// Shape of a tree as measured by [`BTree::validate`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TreeStats {
    pub height: usize,
    pub nodes: usize,
    pub keys: usize,
}

/// BTree owns the id of the root node. It grows the tree by one level when
/// the root is full and shrinks it when the root is left without keys.
///
/// A mutation that fails part way may leave some nodes written and others
/// not. The tree is then poisoned: further inserts and removes are refused
/// until [`BTree::revalidate`] confirms the stored tree is sound.
pub struct BTree<S, A = SequentialIds> {
    pager: Pager<S, A>,
    root: NodeId,
    poisoned: bool,
}

impl<S: Store> BTree<S> {
    /// Opens the tree kept in `store`, creating an empty one when the store
    /// holds no records.
    pub fn open_store(store: S, config: &Config) -> Result<BTree<S>> {
        BTree::recover(Pager::new(store, config.degree()?)?)
    }
}

impl<S: Store, A: IdAllocator> BTree<S, A> {
    /// Creates an empty tree whose root is a fresh leaf.
    pub fn create(mut pager: Pager<S, A>) -> Result<BTree<S, A>> {
        let root = pager.allocate(NodeType::Leaf)?;
        pager.save(&root)?;
        info!(root = %root.id(), "created tree");
        Ok(BTree {
            pager,
            root: root.id(),
            poisoned: false,
        })
    }

    /// Attaches to an existing tree rooted at `root`.
    pub fn open(pager: Pager<S, A>, root: NodeId) -> Result<BTree<S, A>> {
        pager.load(root)?;
        Ok(BTree {
            pager,
            root,
            poisoned: false,
        })
    }

    /// Finds the root among the stored records as the one record no other
    /// record points to. An empty store gets a fresh tree.
    pub fn recover(pager: Pager<S, A>) -> Result<BTree<S, A>> {
        let ids = pager.store().ids()?;
        let first = match ids.first() {
            Some(id) => *id,
            None => return BTree::create(pager),
        };

        let mut referenced = HashSet::new();
        for id in &ids {
            if let Some(children) = pager.load(*id)?.children() {
                referenced.extend(children.iter().copied());
            }
        }
        let roots: Vec<NodeId> = ids
            .into_iter()
            .filter(|id| !referenced.contains(id))
            .collect();

        if let [root] = roots.as_slice() {
            info!(root = %root, "recovered tree");
            return BTree::open(pager, *root);
        }
        Err(Error::invariant(
            roots.first().copied().unwrap_or(first),
            format!("expected exactly one unreferenced record, found {}", roots.len()),
        ))
    }

    pub fn root_id(&self) -> NodeId {
        self.root
    }

    pub fn pager(&self) -> &Pager<S, A> {
        &self.pager
    }

    pub fn into_pager(self) -> Pager<S, A> {
        self.pager
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Inserts `key`. Inserting a key that is already present does nothing.
    pub fn insert(&mut self, key: Key) -> Result<()> {
        self.mutate(|tree| tree.insert_key(key))
    }

    /// Removes `key`, reporting whether it was present. Removing an absent
    /// key writes nothing.
    pub fn remove(&mut self, key: Key) -> Result<bool> {
        self.mutate(|tree| tree.remove_key(key))
    }

    pub fn contains(&self, key: Key) -> Result<bool> {
        let mut node = self.pager.load(self.root)?;
        loop {
            match node.locate(key) {
                Slot::Found(_) => return Ok(true),
                Slot::Descend(_) if node.is_leaf() => return Ok(false),
                Slot::Descend(index) => node = self.pager.load(node.child_id(index)?)?,
            }
        }
    }

    /// Every key in ascending order.
    pub fn keys(&self) -> Result<Vec<Key>> {
        let mut keys = Vec::new();
        self.collect_keys(self.root, &mut keys)?;
        Ok(keys)
    }

    /// Number of levels; a tree whose root is a leaf has height one.
    pub fn height(&self) -> Result<usize> {
        let mut node = self.pager.load(self.root)?;
        let mut height = 1;
        while !node.is_leaf() {
            node = self.pager.load(node.child_id(0)?)?;
            height += 1;
        }
        Ok(height)
    }

    /// Walks the whole tree and checks its structure: ordered keys within the
    /// bounds set by the separators above them, key counts within the degree,
    /// one more child than keys in internal nodes, all leaves on one level,
    /// and no stored record that the root cannot reach.
    pub fn validate(&self) -> Result<TreeStats> {
        let mut walk = Walk::default();
        self.check_subtree(self.root, None, None, 1, &mut walk)?;

        for id in self.pager.store().ids()? {
            if !walk.seen.contains(&id) {
                return Err(Error::invariant(id, "record is not reachable from the root"));
            }
        }
        Ok(walk.stats)
    }

    /// Validates the stored tree and, if it is sound, lifts the poisoning
    /// left by an earlier failed mutation.
    pub fn revalidate(&mut self) -> Result<TreeStats> {
        let stats = self.validate()?;
        if self.poisoned {
            info!(root = %self.root, "tree revalidated");
            self.poisoned = false;
        }
        Ok(stats)
    }

    fn mutate<T, F>(&mut self, op: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        if self.poisoned {
            return Err(Error::Poisoned);
        }
        op(self).map_err(|e| {
            warn!(root = %self.root, error = %e, "mutation failed, tree poisoned");
            self.poisoned = true;
            Error::TreeCorruption(Box::new(e))
        })
    }

    fn insert_key(&mut self, key: Key) -> Result<()> {
        let mut root = self.pager.load(self.root)?;
        if root.is_full(self.pager.degree()) {
            let old_root = root.id();
            root = Node::grow(&mut self.pager, root)?;
            self.root = root.id();
            info!(old_root = %old_root, root = %self.root, "tree grew by one level");
        }
        root.add(&mut self.pager, key)
    }

    fn remove_key(&mut self, key: Key) -> Result<bool> {
        if !self.contains(key)? {
            return Ok(false);
        }
        let mut root = self.pager.load(self.root)?;
        root.remove(&mut self.pager, key)?;

        if !root.is_leaf() && root.keys().is_empty() {
            let old_root = root.id();
            self.root = root.child_id(0)?;
            self.pager.delete(old_root)?;
            info!(old_root = %old_root, root = %self.root, "tree shrank by one level");
        }
        Ok(true)
    }

    fn collect_keys(&self, id: NodeId, keys: &mut Vec<Key>) -> Result<()> {
        let node = self.pager.load(id)?;
        match node.children() {
            None => keys.extend_from_slice(node.keys()),
            Some(children) => {
                for (i, child) in children.iter().enumerate() {
                    self.collect_keys(*child, keys)?;
                    if let Some(key) = node.keys().get(i) {
                        keys.push(*key);
                    }
                }
            }
        }
        Ok(())
    }

    fn check_subtree(
        &self,
        id: NodeId,
        lower: Option<Key>,
        upper: Option<Key>,
        depth: usize,
        walk: &mut Walk,
    ) -> Result<()> {
        if !walk.seen.insert(id) {
            return Err(Error::invariant(id, "node is reachable more than once"));
        }
        let node = self.pager.load(id)?;
        let keys = node.keys();
        let degree = self.pager.degree();
        let is_root = id == self.root;

        if keys.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(Error::invariant(id, "keys are not strictly increasing"));
        }
        if let (Some(low), Some(first)) = (lower, keys.first()) {
            if *first <= low {
                return Err(Error::invariant(id, format!("key {} is not above separator {}", first, low)));
            }
        }
        if let (Some(high), Some(last)) = (upper, keys.last()) {
            if *last >= high {
                return Err(Error::invariant(id, format!("key {} is not below separator {}", last, high)));
            }
        }
        if keys.len() > degree.max_keys() {
            return Err(Error::invariant(id, format!("{} keys overflow the node", keys.len())));
        }
        if !is_root && keys.len() < degree.min_keys() {
            return Err(Error::invariant(id, format!("{} keys underflow the node", keys.len())));
        }

        walk.stats.nodes += 1;
        walk.stats.keys += keys.len();

        match node.children() {
            None => match walk.leaf_depth {
                None => {
                    walk.leaf_depth = Some(depth);
                    walk.stats.height = depth;
                }
                Some(expected) if expected != depth => {
                    return Err(Error::invariant(
                        id,
                        format!("leaf at depth {} but others are at depth {}", depth, expected),
                    ));
                }
                Some(_) => {}
            },
            Some(children) => {
                if keys.is_empty() {
                    return Err(Error::invariant(id, "internal node without keys"));
                }
                if children.len() != keys.len() + 1 {
                    return Err(Error::invariant(
                        id,
                        format!("{} children for {} keys", children.len(), keys.len()),
                    ));
                }
                for (i, child) in children.iter().enumerate() {
                    let low = if i == 0 { lower } else { Some(keys[i - 1]) };
                    let high = keys.get(i).copied().or(upper);
                    self.check_subtree(*child, low, high, depth + 1, walk)?;
                }
            }
        }
        Ok(())
    }
}

#[derive(Default)]
struct Walk {
    seen: HashSet<NodeId>,
    leaf_depth: Option<usize>,
    stats: TreeStats,
}
