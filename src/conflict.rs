// Copyright (c) 2022, MaidSafe.
// All rights reserved.
//
// This SAFE Network Software is licensed under the BSD-3-Clause license.
// Please see the LICENSE file for more details.

//! Classifies every non-trivial internal node of one rooted tree against
//! another rooted tree over their shared leaf set.
//!
//! For a node `x` of the first tree and nodes `y` of the second, the
//! classifier finds examples of `y supported_by x`, `y partial_path_of x`,
//! `y terminal x`, `y conflicts_with x` and `y resolved_by x`.  Displayed
//! groups decompose as: terminal when the group is a single shared leaf,
//! supported_by when exactly one node of the second tree displays it,
//! partial_path_of when a chain of nodes does.
//!
//! Run the analysis in both directions to obtain support (first → second)
//! and resolution (second → first) information simultaneously.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::induced::{compute_depth, compute_tips, induced_tree, mrca_from_depth};
use super::tree::{NodeId, OttId, Tree};
use super::Error;

/// How a node of the second tree relates to a node of the first tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Relation {
    /// The node displays the group and is the only node that does.
    SupportedBy,
    /// The node displays the group as part of a chain of nodes with the
    /// same induced group.
    PartialPathOf,
    /// The group is a single shared leaf.
    Terminal,
    /// The node holds some but not all of the group plus outside leaves.
    ConflictsWith,
    /// The node displays neither the group nor any conflict; merging the
    /// group in would refine it.
    ResolvedBy,
}

/// One classification: `node2` (in the second tree) stands in `relation`
/// to `node1` (in the first tree).  Node ids refer to the original trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictRecord {
    /// The relation, read as "`node2` *relation* `node1`".
    pub relation: Relation,
    /// Node of the second tree.
    pub node2: NodeId,
    /// Node of the first tree.
    pub node1: NodeId,
}

/// Both trees projected to the shared leaf set, with the per-node counters
/// the classification walk needs.
pub(crate) struct InducedPair {
    pub t1: Tree,
    pub t2: Tree,
    pub to_src1: HashMap<NodeId, NodeId>,
    pub to_src2: HashMap<NodeId, NodeId>,
    n_tips1: Vec<usize>,
    n_tips2: Vec<usize>,
    // transient per-group counter, zeroed between groups
    include2: Vec<usize>,
    // t1 node -> corresponding t2 node; starts out filled for leaves only
    summary: Vec<Option<NodeId>>,
}

/// Projects both trees onto their shared leaves.  None when they share no
/// leaves (nothing to classify).
pub(crate) fn induce_pair(tree1: &Tree, tree2: &Tree) -> Result<Option<InducedPair>, Error> {
    let mut s1 = tree1.clone();
    let mut s2 = tree2.clone();
    compute_depth(&mut s1);
    compute_depth(&mut s2);

    let (mut t1, map1) = induced_tree(&s1, &s2)?;
    let (mut t2, map2) = induced_tree(&s2, &s1)?;
    if t1.root().is_none() || t2.root().is_none() {
        return Ok(None);
    }
    compute_depth(&mut t1);
    compute_depth(&mut t2);

    let n_tips1 = compute_tips(&t1);
    let n_tips2 = compute_tips(&t2);
    let include2 = vec![0usize; t2.num_nodes()];
    let mut summary = vec![None; t1.num_nodes()];

    // pair up the leaves through their external ids
    let mut t2_leaf_of_id: HashMap<OttId, NodeId> = HashMap::new();
    for leaf in t2.leaves() {
        if let Some(id) = t2.ott_id(leaf) {
            t2_leaf_of_id.insert(id, leaf);
        }
    }
    for leaf in t1.leaves() {
        let id = leaf_id(&t1, leaf)?;
        let other = t2_leaf_of_id
            .get(&id)
            .ok_or(Error::LeafSetMismatch(id))?;
        summary[leaf] = Some(*other);
    }

    let to_src1 = invert(map1);
    let to_src2 = invert(map2);

    Ok(Some(InducedPair {
        t1,
        t2,
        to_src1,
        to_src2,
        n_tips1,
        n_tips2,
        include2,
        summary,
    }))
}

fn leaf_id(tree: &Tree, leaf: NodeId) -> Result<OttId, Error> {
    tree.ott_id(leaf).ok_or(Error::MissingTipId)
}

fn invert(map: HashMap<NodeId, NodeId>) -> HashMap<NodeId, NodeId> {
    map.into_iter().map(|(src, ind)| (ind, src)).collect()
}

/// The classification walk over an induced pair.
///
/// `sink` receives `(relation, node2-in-induced-t2, node1-in-induced-t1)`
/// plus a view of the pair, so callers can map ids back or inspect the
/// induced structure at emission time (it mutates as displayed groups are
/// contracted).
pub(crate) fn run<F>(pair: &mut InducedPair, sink: &mut F)
where
    F: FnMut(Relation, NodeId, NodeId, &InducedPair),
{
    let l_total = pair.t1.count_leaves();

    // Collect up front: contraction drops already-visited descendants.
    let tree_nodes = pair.t1.postorder();

    for nd in tree_nodes {
        if pair.t1.parent(nd).is_none() {
            continue;
        }
        // Knuckles carry no grouping of their own.  Projection to the
        // shared leaf set can create knuckles that were not originally
        // there.
        if pair.t1.out_degree(nd) == 1 {
            continue;
        }
        // A node covering every shared tip is no split either.
        if pair.n_tips1[nd] == l_total {
            continue;
        }

        if pair.t1.is_tip(nd) {
            let mut nd2 = pair.summary[nd].expect("unpaired leaf");
            sink(Relation::Terminal, nd2, nd, pair);
            while let Some(p) = pair.t2.parent(nd2) {
                if pair.t2.out_degree(p) != 1 {
                    break;
                }
                sink(Relation::Terminal, p, nd, pair);
                nd2 = p;
            }
            continue;
        }

        // The leaves below nd; contracted groups act as single leaves that
        // still carry their original tip counts.
        let leaves1 = pair.t1.leaves_below(nd);
        debug_assert!(leaves1.len() >= 2);
        let l2: usize = leaves1.iter().map(|&x| pair.n_tips1[x]).sum();

        let leaves2: Vec<NodeId> = leaves1
            .iter()
            .map(|&x| pair.summary[x].expect("unpaired leaf"))
            .collect();

        let mrca = leaves2[1..]
            .iter()
            .fold(leaves2[0], |m, &x| mrca_from_depth(&pair.t2, m, x));

        // all nodes on the paths from the group's leaves up to the mrca
        let mut node_set: HashSet<NodeId> = HashSet::new();
        node_set.insert(mrca);
        for &leaf in &leaves2 {
            let mut x = leaf;
            while x != mrca {
                if !node_set.insert(x) {
                    break;
                }
                x = pair.t2.parent(x).expect("leaf outside the mrca subtree");
            }
        }

        // children before parents
        let mut nodes: Vec<NodeId> = node_set.into_iter().collect();
        nodes.sort_by(|&x, &y| pair.t2.depth(y).cmp(&pair.t2.depth(x)).then(x.cmp(&y)));

        // Accumulate how many of the group's tips sit under each path node.
        if nodes.len() > 1 {
            for i in 0..nodes.len() - 1 {
                let x = nodes[i];
                if pair.t2.is_tip(x) {
                    pair.include2[x] = pair.n_tips2[x];
                }
                debug_assert!(x != mrca);
                let p = pair.t2.parent(x).expect("path node without parent");
                let below = pair.include2[x];
                pair.include2[p] += below;
                debug_assert!(pair.include2[x] <= pair.n_tips2[x]);
            }
        }

        // The mrca covering extra tips means conflict or resolution.
        let conflicts_or_resolved_by = pair.include2[mrca] < pair.n_tips2[mrca];

        if !conflicts_or_resolved_by {
            let parent = pair.t2.parent(mrca).expect("mrca cannot be the root here");
            if pair.n_tips2[parent] > pair.n_tips2[mrca] {
                sink(Relation::SupportedBy, mrca, nd, pair);
            } else {
                // a chain of nodes covers exactly the same leaf set
                let mut nd2 = Some(mrca);
                while let Some(x) = nd2 {
                    if pair.n_tips2[x] != pair.n_tips2[mrca] {
                        break;
                    }
                    sink(Relation::PartialPathOf, x, nd, pair);
                    nd2 = pair.t2.parent(x);
                }
            }
        }

        let mut conflicts: Vec<NodeId> = Vec::new();
        for &x in &nodes {
            // some but not all of the group, plus tips from outside it
            if pair.include2[x] < pair.n_tips2[x] && pair.include2[x] < l2 {
                conflicts.push(x);
            }
        }
        for &x in &nodes {
            pair.include2[x] = 0;
        }

        for i in 0..conflicts.len() {
            let c = conflicts[i];
            sink(Relation::ConflictsWith, c, nd, pair);
        }

        if conflicts.is_empty() && conflicts_or_resolved_by {
            sink(Relation::ResolvedBy, mrca, nd, pair);
        }

        // A displayed group contracts to a single leaf on both sides so
        // enclosing groups treat it as one unit.
        if !conflicts_or_resolved_by {
            pair.summary[nd] = Some(mrca);
            pair.t1.destroy_children(nd);
            pair.t2.destroy_children(mrca);
        }
    }
}

/// Classifies every non-trivial internal node of `tree1` against `tree2`
/// over their shared leaf set.
///
/// Records carry node ids of the *original* trees; `node2` belongs to
/// `tree2` and `node1` to `tree1`, read as "`node2` relation `node1`"
/// (so `SupportedBy` means a `tree2` node is supported by a `tree1` node).
/// Trees sharing no leaves yield no records.
pub fn conflict_records(tree1: &Tree, tree2: &Tree) -> Result<Vec<ConflictRecord>, Error> {
    let mut records = Vec::new();
    if let Some(mut pair) = induce_pair(tree1, tree2)? {
        run(&mut pair, &mut |relation, n2, n1, p: &InducedPair| {
            records.push(ConflictRecord {
                relation,
                node2: p.to_src2[&n2],
                node1: p.to_src1[&n1],
            });
        });
    }
    Ok(records)
}
