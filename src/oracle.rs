// Copyright (c) 2022, MaidSafe.
// All rights reserved.
//
// This SAFE Network Software is licensed under the BSD-3-Clause license.
// Please see the LICENSE file for more details.

use std::collections::HashSet;

use log::debug;

use super::conflict::{induce_pair, run, InducedPair, Relation};
use super::tree::{NodeId, Tree};
use super::Error;

/// Internal nodes of `tree_to_clean` that directly conflict with `ok_tree`
/// over the shared leaf set.
///
/// A conflicting induced node and its pass-through ancestors all map back
/// to source nodes asserting the same grouping, so the whole chain is
/// reported.
pub(crate) fn conflicting_nodes(
    ok_tree: &Tree,
    tree_to_clean: &Tree,
) -> Result<HashSet<NodeId>, Error> {
    let mut out: HashSet<NodeId> = HashSet::new();

    if let Some(mut pair) = induce_pair(tree_to_clean, ok_tree)? {
        run(&mut pair, &mut |relation, _n2, n1, p: &InducedPair| {
            if relation != Relation::ConflictsWith {
                return;
            }
            debug_assert!(!p.t1.is_tip(n1));
            let mut x = n1;
            loop {
                out.insert(p.to_src1[&x]);
                match p.t1.parent(x) {
                    Some(parent) if p.t1.out_degree(parent) == 1 => x = parent,
                    _ => break,
                }
            }
        });
    }

    Ok(out)
}

/// Collapses every internal node of `tree_to_clean` that directly conflicts
/// with `ok_tree`.
///
/// Oracle detection of conflict is a normal signal: the node is collapsed
/// and processing continues.
pub fn remove_conflicting_splits_from_tree(
    ok_tree: &Tree,
    tree_to_clean: &mut Tree,
) -> Result<(), Error> {
    let nodes = conflicting_nodes(ok_tree, tree_to_clean)?;
    if !nodes.is_empty() {
        debug!("oracle: collapsing {} conflicting node(s)", nodes.len());
    }
    for nd in nodes {
        tree_to_clean.collapse_node(nd);
    }
    Ok(())
}
