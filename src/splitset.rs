// Copyright (c) 2022, MaidSafe.
// All rights reserved.
//
// This SAFE Network Software is licensed under the BSD-3-Clause license.
// Please see the LICENSE file for more details.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::tree::{NodeId, OttId, Tree};
use super::Error;

/// A tree viewed as an indexed family of splits: the shared front-end of
/// the quartet and triplet engines.
///
/// Leaves get dense indices in external-id order; every node maps to its
/// descendant index set, and every informative internal node (non-root,
/// below-root grouping) is reachable from its index set.
#[derive(Debug)]
pub struct TreeSplitSet<'a> {
    tree: &'a Tree,
    ids: Vec<OttId>,
    index_of: HashMap<OttId, usize>,
    leaf_node: Vec<NodeId>,
    node_taxset: HashMap<NodeId, BTreeSet<usize>>,
    informative: Vec<(NodeId, BTreeSet<usize>)>,
    root: NodeId,
}

impl<'a> TreeSplitSet<'a> {
    /// Indexes `tree`.  Every tip must carry a unique external id.
    pub fn new(tree: &'a Tree) -> Result<Self, Error> {
        let root = tree.root().ok_or(Error::EmptyTree)?;

        let mut by_id: BTreeMap<OttId, NodeId> = BTreeMap::new();
        for leaf in tree.leaves() {
            let id = tree.ott_id(leaf).ok_or(Error::MissingTipId)?;
            if by_id.insert(id, leaf).is_some() {
                return Err(Error::DuplicateId(id));
            }
        }

        let mut ids = Vec::with_capacity(by_id.len());
        let mut index_of = HashMap::new();
        let mut leaf_node = Vec::with_capacity(by_id.len());
        for (id, nd) in &by_id {
            index_of.insert(*id, ids.len());
            ids.push(*id);
            leaf_node.push(*nd);
        }

        let mut node_taxset: HashMap<NodeId, BTreeSet<usize>> = HashMap::new();
        // informative groupings, deduplicated (a pass-through chain shares
        // one set; the shallowest node stands for it)
        let mut informative_map: BTreeMap<BTreeSet<usize>, NodeId> = BTreeMap::new();
        for nd in tree.postorder() {
            let mut taxset = BTreeSet::new();
            if tree.is_tip(nd) {
                let id = tree.ott_id(nd).ok_or(Error::MissingTipId)?;
                taxset.insert(index_of[&id]);
            } else {
                for &c in tree.children(nd) {
                    let child_set = node_taxset[&c].clone();
                    taxset.extend(child_set);
                }
                if nd != root {
                    informative_map.insert(taxset.clone(), nd);
                }
            }
            node_taxset.insert(nd, taxset);
        }

        let informative = informative_map.into_iter().map(|(s, n)| (n, s)).collect();

        Ok(TreeSplitSet {
            tree,
            ids,
            index_of,
            leaf_node,
            node_taxset,
            informative,
            root,
        })
    }

    /// Number of indexed tips.
    #[inline]
    pub fn num_tips(&self) -> usize {
        self.ids.len()
    }

    /// The external id at a leaf index.
    #[inline]
    pub fn id(&self, index: usize) -> OttId {
        self.ids[index]
    }

    /// The leaf index of an external id, if present.
    #[inline]
    pub fn index_of(&self, id: OttId) -> Option<usize> {
        self.index_of.get(&id).cloned()
    }

    /// The tree node of a leaf index.
    #[inline]
    pub fn leaf_node(&self, index: usize) -> NodeId {
        self.leaf_node[index]
    }

    /// The underlying tree.
    #[inline]
    pub fn tree(&self) -> &Tree {
        self.tree
    }

    /// The root node.
    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The descendant index set of a node.
    #[inline]
    pub fn taxset(&self, nd: NodeId) -> &BTreeSet<usize> {
        &self.node_taxset[&nd]
    }

    /// The informative internal groupings, one representative node each.
    #[inline]
    pub fn informative(&self) -> &[(NodeId, BTreeSet<usize>)] {
        &self.informative
    }

    /// Verifies that two indexed trees cover the same leaf ids.
    pub fn same_leaf_set(&self, other: &TreeSplitSet<'_>) -> Result<(), Error> {
        if self.ids == other.ids {
            return Ok(());
        }
        let mismatch = self
            .ids
            .iter()
            .find(|id| !other.index_of.contains_key(*id))
            .or_else(|| {
                other
                    .ids
                    .iter()
                    .find(|id| !self.index_of.contains_key(*id))
            })
            .cloned()
            .unwrap_or(0);
        Err(Error::LeafSetMismatch(mismatch))
    }
}
