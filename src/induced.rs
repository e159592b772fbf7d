// Copyright (c) 2022, MaidSafe.
// All rights reserved.
//
// This SAFE Network Software is licensed under the BSD-3-Clause license.
// Please see the LICENSE file for more details.

use std::collections::{HashMap, HashSet};

use super::tree::{NodeId, OttId, Tree};
use super::Error;

/// Fills in each node's depth in one preorder pass (root depth = 1).
pub fn compute_depth(tree: &mut Tree) {
    for nd in tree.preorder() {
        let depth = match tree.parent(nd) {
            Some(p) => tree.depth(p) + 1,
            None => 1,
        };
        tree.set_depth(nd, depth);
    }
}

/// Most recent common ancestor of two nodes, in constant time per level.
///
/// Correct only after [`compute_depth`] has run on the containing tree: the
/// deeper node is lifted until depths match, then both are lifted together.
pub fn mrca_from_depth(tree: &Tree, mut a: NodeId, mut b: NodeId) -> NodeId {
    debug_assert!(tree.depth(a) > 0 && tree.depth(b) > 0);
    while tree.depth(a) > tree.depth(b) {
        a = tree.parent(a).expect("depth fields are stale");
    }
    while tree.depth(b) > tree.depth(a) {
        b = tree.parent(b).expect("depth fields are stale");
    }
    while a != b {
        a = tree.parent(a).expect("nodes from different trees");
        b = tree.parent(b).expect("nodes from different trees");
    }
    a
}

/// Per-node count of descendant tips (a tip counts itself), indexed by
/// [`NodeId`].
pub fn compute_tips(tree: &Tree) -> Vec<usize> {
    let mut tips = vec![0usize; tree.num_nodes()];
    for nd in tree.postorder() {
        if tree.is_tip(nd) {
            tips[nd] = 1;
        }
        if let Some(p) = tree.parent(nd) {
            tips[p] += tips[nd];
        }
    }
    tips
}

/// Projects `source` onto the leaves it shares with `reference`.
///
/// The induced tree holds every node on the path from each shared leaf up
/// to their common MRCA — pass-through (out-degree-one) nodes included,
/// since the conflict walks depend on them.  Returns the induced tree and
/// the `source node -> induced node` map; the tree is empty when the trees
/// share no leaves.
///
/// `source` must have had [`compute_depth`] run on it.
pub fn induced_tree(
    source: &Tree,
    reference: &Tree,
) -> Result<(Tree, HashMap<NodeId, NodeId>), Error> {
    let source_leaves = leaf_id_map(source)?;
    let reference_leaves = leaf_id_map(reference)?;

    // shared leaves, in id order for deterministic child order
    let mut shared: Vec<(OttId, NodeId)> = source_leaves
        .iter()
        .filter(|(id, _)| reference_leaves.contains_key(id))
        .map(|(&id, &nd)| (id, nd))
        .collect();
    shared.sort();

    let mut induced = Tree::new();
    let mut to_induced: HashMap<NodeId, NodeId> = HashMap::new();
    if shared.is_empty() {
        return Ok((induced, to_induced));
    }

    let mrca = shared[1..]
        .iter()
        .fold(shared[0].1, |m, &(_, nd)| mrca_from_depth(source, m, nd));

    // every node on a leaf-to-mrca path belongs to the induced tree
    let mut keep: HashSet<NodeId> = HashSet::new();
    keep.insert(mrca);
    for &(_, leaf) in &shared {
        let mut x = leaf;
        while x != mrca {
            if !keep.insert(x) {
                break;
            }
            x = source.parent(x).expect("leaf outside the mrca subtree");
        }
    }

    // parents first; the kept set is closed upwards to the mrca
    let mut ordered: Vec<NodeId> = keep.into_iter().collect();
    ordered.sort_by_key(|&nd| (source.depth(nd), nd));

    for nd in ordered {
        let at = if nd == mrca {
            induced.create_root()
        } else {
            let parent = source.parent(nd).expect("kept node without parent");
            let induced_parent = to_induced[&parent];
            induced.create_child(induced_parent)
        };
        if let Some(id) = source.ott_id(nd) {
            induced.set_ott_id(at, id);
        }
        if let Some(name) = source.name(nd) {
            induced.set_name(at, name.to_string());
        }
        to_induced.insert(nd, at);
    }

    Ok((induced, to_induced))
}

fn leaf_id_map(tree: &Tree) -> Result<HashMap<OttId, NodeId>, Error> {
    let mut map = HashMap::new();
    for nd in tree.leaves() {
        if let Some(id) = tree.ott_id(nd) {
            if map.insert(id, nd).is_some() {
                return Err(Error::DuplicateId(id));
            }
        }
    }
    Ok(map)
}

#[cfg(test)]
mod test {
    use super::*;

    fn chain() -> Tree {
        // ((1,2),(3,4))
        let mut t = Tree::new();
        let root = t.create_root();
        let left = t.create_child(root);
        let right = t.create_child(root);
        for (parent, id) in &[(left, 1), (left, 2), (right, 3), (right, 4)] {
            let tip = t.create_child(*parent);
            t.set_ott_id(tip, *id);
        }
        t
    }

    #[test]
    fn mrca_and_depth() {
        let mut t = chain();
        compute_depth(&mut t);
        let leaves = t.leaves();
        let root = t.root().unwrap();
        assert_eq!(t.depth(root), 1);
        assert_eq!(mrca_from_depth(&t, leaves[0], leaves[3]), root);
        assert_eq!(
            mrca_from_depth(&t, leaves[0], leaves[1]),
            t.parent(leaves[0]).unwrap()
        );
    }

    #[test]
    fn projection_keeps_shared_leaves_only() {
        let mut t = chain();
        compute_depth(&mut t);
        let reference = Tree::star(vec![1, 2, 3]);
        let (induced, _) = induced_tree(&t, &reference).unwrap();
        assert_eq!(induced.count_leaves(), 3);
        // the node above 4 survives as a pass-through node above 3
        assert_eq!(induced.topology(), "((1,2),(3))");
    }
}
