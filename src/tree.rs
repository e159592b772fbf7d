// Copyright (c) 2022, MaidSafe.
// All rights reserved.
//
// This SAFE Network Software is licensed under the BSD-3-Clause license.
// Please see the LICENSE file for more details.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use super::Error;

/// Stable external identifier of a taxon ("OTT id").
///
/// External ids key the leaf index map; all core algorithms work on the
/// dense indices derived from them.
pub type OttId = u64;

/// Dense arena index of a node within one [`Tree`].
pub type NodeId = usize;

/// A node stored in a [`Tree`] arena.
///
/// Child order is insertion order.  Monotypic (out-degree-one) nodes are
/// legal; several passes suppress or skip them.
#[derive(Debug, Clone, Default)]
pub struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    ott_id: Option<OttId>,
    name: Option<String>,
    depth: u32,
}

impl Node {
    /// returns the parent node id, or None for a root / detached node.
    #[inline]
    pub fn parent_id(&self) -> Option<NodeId> {
        self.parent
    }

    /// returns the ordered child list.
    #[inline]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// returns the external id, if any.
    #[inline]
    pub fn ott_id(&self) -> Option<OttId> {
        self.ott_id
    }

    /// returns the taxon name, if any.
    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// returns the depth filled in by [`compute_depth`](super::compute_depth)
    /// (1 = root); 0 means depths have not been computed.
    #[inline]
    pub fn depth(&self) -> u32 {
        self.depth
    }
}

/// A rooted tree held in an arena (`Vec<Node>` indexed by [`NodeId`]).
///
/// Detached or collapsed nodes stay allocated but become unreachable from
/// the root; traversals only visit the live subtree.
#[derive(Debug, Clone, Default)]
pub struct Tree {
    nodes: Vec<Node>,
    root: Option<NodeId>,
}

impl Tree {
    /// create a new, empty Tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a node that becomes the tree's root.
    ///
    /// Any previous root is left in the arena without a parent; the caller
    /// may re-attach it (this is how a monotypic parent is pushed above an
    /// old root).
    pub fn create_root(&mut self) -> NodeId {
        let id = self.alloc();
        self.root = Some(id);
        id
    }

    /// Creates a fresh node as the last child of `parent`.
    pub fn create_child(&mut self, parent: NodeId) -> NodeId {
        let id = self.alloc();
        self.nodes[id].parent = Some(parent);
        self.nodes[parent].children.push(id);
        id
    }

    fn alloc(&mut self) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node::default());
        id
    }

    /// Attaches a detached node as the last child of `parent`.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) {
        debug_assert!(self.nodes[child].parent.is_none());
        self.nodes[child].parent = Some(parent);
        self.nodes[parent].children.push(child);
    }

    /// Unlinks a node from its parent, keeping its subtree intact.
    pub fn detach(&mut self, node: NodeId) {
        if let Some(p) = self.nodes[node].parent.take() {
            let children = &mut self.nodes[p].children;
            if let Some(pos) = children.iter().position(|&c| c == node) {
                children.remove(pos);
            }
        }
    }

    /// Collapses an internal node: its children are spliced into its place
    /// in the parent's child list and the node itself is detached.
    ///
    /// The node must have children and a parent.
    pub fn collapse_node(&mut self, node: NodeId) {
        debug_assert!(!self.nodes[node].children.is_empty());
        let parent = self.nodes[node].parent.expect("collapse of a root node");
        let kids = std::mem::replace(&mut self.nodes[node].children, Vec::new());
        let pos = self.nodes[parent]
            .children
            .iter()
            .position(|&c| c == node)
            .expect("node not among its parent's children");
        self.nodes[parent].children.remove(pos);
        for (k, &child) in kids.iter().enumerate() {
            self.nodes[parent].children.insert(pos + k, child);
        }
        for &child in &kids {
            self.nodes[child].parent = Some(parent);
        }
        self.nodes[node].parent = None;
    }

    /// Drops the subtree below a node, turning it into a tip.
    ///
    /// The detached descendants stay in the arena but become unreachable.
    pub fn destroy_children(&mut self, node: NodeId) {
        let kids = std::mem::replace(&mut self.nodes[node].children, Vec::new());
        for child in kids {
            self.nodes[child].parent = None;
        }
    }

    /// returns the root node id, or None for an empty tree.
    #[inline]
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Total number of allocated nodes, including detached ones.
    #[inline]
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// returns node `id`.
    #[inline]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    /// returns the parent of `id`, or None.
    #[inline]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].parent
    }

    /// returns the ordered children of `id`.
    #[inline]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id].children
    }

    /// true if `id` has no children.
    #[inline]
    pub fn is_tip(&self, id: NodeId) -> bool {
        self.nodes[id].children.is_empty()
    }

    /// Number of children of `id`.
    #[inline]
    pub fn out_degree(&self, id: NodeId) -> usize {
        self.nodes[id].children.len()
    }

    /// returns the external id of `id`, if any.
    #[inline]
    pub fn ott_id(&self, id: NodeId) -> Option<OttId> {
        self.nodes[id].ott_id
    }

    /// sets the external id of `id`.
    #[inline]
    pub fn set_ott_id(&mut self, id: NodeId, ott: OttId) {
        self.nodes[id].ott_id = Some(ott);
    }

    /// returns the name of `id`, if any.
    #[inline]
    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.nodes[id].name.as_deref()
    }

    /// sets the name of `id`.
    #[inline]
    pub fn set_name(&mut self, id: NodeId, name: impl Into<String>) {
        self.nodes[id].name = Some(name.into());
    }

    /// returns the computed depth of `id` (1 = root, 0 = not computed).
    #[inline]
    pub fn depth(&self, id: NodeId) -> u32 {
        self.nodes[id].depth
    }

    #[inline]
    pub(crate) fn set_depth(&mut self, id: NodeId, depth: u32) {
        self.nodes[id].depth = depth;
    }

    /// All live nodes in preorder (parents before children).
    pub fn preorder(&self) -> Vec<NodeId> {
        match self.root {
            Some(root) => self.preorder_from(root),
            None => Vec::new(),
        }
    }

    /// The subtree of `top` in preorder.
    pub fn preorder_from(&self, top: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![top];
        while let Some(nd) = stack.pop() {
            out.push(nd);
            for &c in self.nodes[nd].children.iter().rev() {
                stack.push(c);
            }
        }
        out
    }

    /// All live nodes in postorder (children before parents).
    pub fn postorder(&self) -> Vec<NodeId> {
        let mut out = self.preorder();
        out.reverse();
        out
    }

    /// The tips below `top` (or `top` itself if it is a tip), left to right.
    pub fn leaves_below(&self, top: NodeId) -> Vec<NodeId> {
        self.preorder_from(top)
            .into_iter()
            .filter(|&nd| self.is_tip(nd))
            .collect()
    }

    /// All live tips, left to right.
    pub fn leaves(&self) -> Vec<NodeId> {
        match self.root {
            Some(root) => self.leaves_below(root),
            None => Vec::new(),
        }
    }

    /// Number of live tips.
    pub fn count_leaves(&self) -> usize {
        self.leaves().len()
    }

    /// Maps every externally identified live node to its [`NodeId`].
    ///
    /// Fails if two live nodes carry the same external id.
    pub fn ottid_to_node(&self) -> Result<HashMap<OttId, NodeId>, Error> {
        let mut map = HashMap::new();
        for nd in self.preorder() {
            if let Some(id) = self.nodes[nd].ott_id {
                if map.insert(id, nd).is_some() {
                    return Err(Error::DuplicateId(id));
                }
            }
        }
        Ok(map)
    }

    /// The sorted set of external ids on the live tips.
    ///
    /// Fails if a tip has no id or two tips share one.
    pub fn leaf_ids(&self) -> Result<BTreeSet<OttId>, Error> {
        let mut ids = BTreeSet::new();
        for nd in self.leaves() {
            let id = self.nodes[nd].ott_id.ok_or(Error::MissingTipId)?;
            if !ids.insert(id) {
                return Err(Error::DuplicateId(id));
            }
        }
        Ok(ids)
    }

    /// Builds a star tree: one root with a tip per id.
    pub fn star<I: IntoIterator<Item = OttId>>(ids: I) -> Self {
        let mut tree = Tree::new();
        let root = tree.create_root();
        for id in ids {
            let tip = tree.create_child(root);
            tree.set_ott_id(tip, id);
        }
        tree
    }

    /// Per-node sets of descendant tip ids, indexed by [`NodeId`].
    ///
    /// A tip contributes its own id; unreachable nodes keep empty sets.
    pub fn descendant_id_sets(&self) -> Vec<BTreeSet<OttId>> {
        let mut sets: Vec<BTreeSet<OttId>> = vec![BTreeSet::new(); self.nodes.len()];
        for nd in self.postorder() {
            if self.is_tip(nd) {
                if let Some(id) = self.nodes[nd].ott_id {
                    sets[nd].insert(id);
                }
            } else {
                let mut acc = BTreeSet::new();
                for &c in self.children(nd) {
                    acc.extend(sets[c].iter().cloned());
                }
                sets[nd] = acc;
            }
        }
        sets
    }

    /// A canonical parenthesized form of the topology, for tests and debug
    /// output (children ordered by their smallest descendant id).
    ///
    /// Tips print their external id, or their name when no id is set.
    pub fn topology(&self) -> String {
        fn min_id(tree: &Tree, nd: NodeId) -> OttId {
            if tree.is_tip(nd) {
                tree.ott_id(nd).unwrap_or(OttId::max_value())
            } else {
                tree.children(nd)
                    .iter()
                    .map(|&c| min_id(tree, c))
                    .min()
                    .unwrap_or(OttId::max_value())
            }
        }
        fn write(tree: &Tree, nd: NodeId, out: &mut String) {
            if tree.is_tip(nd) {
                match tree.ott_id(nd) {
                    Some(id) => out.push_str(&id.to_string()),
                    None => out.push_str(tree.name(nd).unwrap_or("?")),
                }
                return;
            }
            let mut kids: Vec<NodeId> = tree.children(nd).to_vec();
            kids.sort_by_key(|&c| min_id(tree, c));
            out.push('(');
            for (i, c) in kids.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write(tree, *c, out);
            }
            out.push(')');
        }
        let mut out = String::new();
        if let Some(root) = self.root {
            write(self, root, &mut out);
        }
        out
    }

    /// walks the live tree and calls FnMut f for each node with its depth
    /// below the root.
    ///
    /// walk uses a non-recursive algorithm, so calling it on a deep tree
    /// will not cause stack overflow.
    pub fn walk<F>(&self, mut f: F)
    where
        F: FnMut(&Self, NodeId, usize),
    {
        let mut stack: Vec<(NodeId, usize)> = Vec::new();
        if let Some(root) = self.root {
            stack.push((root, 0));
        }
        while let Some((next, level)) = stack.pop() {
            f(self, next, level);
            for &child in self.nodes[next].children.iter().rev() {
                stack.push((child, level + 1));
            }
        }
    }
}

impl fmt::Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut r = Ok(());
        self.walk(|tree, nd, level| {
            if r.is_err() {
                return;
            }
            let label = match (tree.ott_id(nd), tree.name(nd)) {
                (Some(id), Some(name)) => format!("{} [{}]", id, name),
                (Some(id), None) => format!("{}", id),
                (None, Some(name)) => name.to_string(),
                (None, None) => ".".to_string(),
            };
            r = writeln!(f, "{:indent$}{}", "", label, indent = level * 2);
        });
        r
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn collapse_splices_children_in_place() {
        let mut t = Tree::new();
        let root = t.create_root();
        let a = t.create_child(root);
        let inner = t.create_child(root);
        let b = t.create_child(inner);
        let c = t.create_child(inner);
        let d = t.create_child(root);
        t.collapse_node(inner);
        assert_eq!(t.children(root), &[a, b, c, d]);
        assert_eq!(t.parent(b), Some(root));
        assert_eq!(t.parent(inner), None);
    }

    #[test]
    fn topology_is_canonical() {
        let mut t = Tree::new();
        let root = t.create_root();
        let inner = t.create_child(root);
        for id in &[4, 3] {
            let tip = t.create_child(inner);
            t.set_ott_id(tip, *id);
        }
        for id in &[2, 1] {
            let tip = t.create_child(root);
            t.set_ott_id(tip, *id);
        }
        assert_eq!(t.topology(), "(1,2,(3,4))");
    }
}
