// Copyright (c) 2022, MaidSafe.
// All rights reserved.
//
// This SAFE Network Software is licensed under the BSD-3-Clause license.
// Please see the LICENSE file for more details.

//! The supertree driver: feeds prioritized input trees through the oracle
//! and the BUILD solver, then assembles and annotates the summary tree.
//!
//! Earlier trees win: a split of a later tree that conflicts with what has
//! already been accepted is rejected and its node collapsed in the source
//! tree, so it does not participate downstream.  The last tree is the
//! taxonomy (or a synthesized star when so configured).

use std::collections::BTreeSet;

use log::{debug, trace};
use quickcheck::{Arbitrary, Gen};
use serde::{Deserialize, Serialize};

use super::build::{extend_solution, TaxonScratch};
use super::induced::compute_depth;
use super::names::{add_names, add_root_and_tip_names};
use super::oracle::remove_conflicting_splits_from_tree;
use super::solution::SolutionRef;
use super::tree::{NodeId, OttId, Tree};
use super::{check_placement, Error, LeafIndexMap, Placement, RSplit, Solution};

/// Enumeration order of a tree's internal-node splits.
///
/// The order changes which splits survive acceptance when rejections
/// cascade, but both orders produce trees displaying the same maximal
/// accepted set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BranchOrder {
    /// Parents before children.
    Preorder,
    /// Children before parents.
    Postorder,
}

/// Tie-break when several taxonomy names map onto one summary node and no
/// unique root-most name remains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CanonicalPolicy {
    /// Keep the first name listed (the historical convention).
    FirstListed,
    /// Keep the name with the smallest external id.
    SmallestId,
}

/// Driver configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Divide-and-conquer batch acceptance instead of one split at a time.
    pub batching: bool,
    /// Remove directly conflicting nodes from each tree before BUILD.
    pub oracle: bool,
    /// Reuse solver work across successive calls.
    pub incremental: bool,
    /// With `incremental`: rollback records instead of rebuilding from the
    /// last known good split list after a rejection.
    pub rollback: bool,
    /// Split enumeration order per tree.
    pub branch_order: BranchOrder,
    /// Synthesize a star taxonomy from the union of input leaves instead of
    /// expecting one as the last tree.
    pub synthesize_taxonomy: bool,
    /// Silently drop tips not present in the taxonomy.
    pub prune_unrecognized: bool,
    /// Require an external id on every tip.
    pub set_ott_ids: bool,
    /// Canonical-name tie-break for the name transfer.
    pub canonical_policy: CanonicalPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            batching: true,
            oracle: true,
            incremental: true,
            rollback: true,
            branch_order: BranchOrder::Preorder,
            synthesize_taxonomy: false,
            prune_unrecognized: false,
            set_ott_ids: true,
            canonical_policy: CanonicalPolicy::FirstListed,
        }
    }
}

// Random solver configurations; the equivalence properties assert that the
// engine knobs do not change the result.
impl Arbitrary for Config {
    fn arbitrary<G: Gen>(g: &mut G) -> Self {
        Config {
            batching: bool::arbitrary(g),
            oracle: bool::arbitrary(g),
            incremental: bool::arbitrary(g),
            rollback: bool::arbitrary(g),
            branch_order: if bool::arbitrary(g) {
                BranchOrder::Preorder
            } else {
                BranchOrder::Postorder
            },
            synthesize_taxonomy: false,
            prune_unrecognized: false,
            set_ott_ids: true,
            canonical_policy: CanonicalPolicy::FirstListed,
        }
    }
}

/// The summary tree plus the placement anomalies found on it.
#[derive(Debug)]
pub struct CombineOutput {
    /// The rooted summary tree (topology, names, external ids).
    pub tree: Tree,
    /// Taxa placed outside their taxonomic ancestor.
    pub placements: Vec<Placement>,
}

/// One split per non-root internal node, tagged with the node so a
/// rejection can collapse it.
fn splits_for_tree(
    order: BranchOrder,
    tree: &Tree,
    index: &LeafIndexMap,
) -> Result<Vec<(NodeId, RSplit)>, Error> {
    let des = tree.descendant_id_sets();
    let root = match tree.root() {
        Some(root) => root,
        None => return Ok(Vec::new()),
    };
    let leaf_taxa = index.remap(&des[root])?;

    let mut splits = Vec::new();
    for nd in ordered_nodes(order, tree) {
        if tree.is_tip(nd) || nd == root {
            continue;
        }
        let descendants = index.remap(&des[nd])?;
        if descendants.len() < 2 {
            continue;
        }
        splits.push((nd, RSplit::from_include_all(&descendants, &leaf_taxa)));
    }
    Ok(splits)
}

/// Taxonomy splits with the exemption set honored: an exempt child's
/// descendants leave the include group, and an exempt sibling's descendants
/// leave the exclude group, so an exempt taxon may settle on any branch
/// that does not exclude it.
fn splits_for_taxonomy_tree(
    order: BranchOrder,
    tree: &Tree,
    index: &LeafIndexMap,
    incertae_sedis: &BTreeSet<OttId>,
) -> Result<Vec<(NodeId, RSplit)>, Error> {
    if incertae_sedis.is_empty() {
        return splits_for_tree(order, tree, index);
    }

    let root = match tree.root() {
        Some(root) => root,
        None => return Ok(Vec::new()),
    };
    let des = tree.descendant_id_sets();
    let exempt =
        |tree: &Tree, nd: NodeId| tree.ott_id(nd).map_or(false, |id| incertae_sedis.contains(&id));

    // include sets: union over the non-exempt children
    let mut include: Vec<BTreeSet<OttId>> = vec![BTreeSet::new(); tree.num_nodes()];
    for nd in tree.postorder() {
        if tree.is_tip(nd) {
            if let Some(id) = tree.ott_id(nd) {
                include[nd].insert(id);
            }
            continue;
        }
        if nd == root {
            continue;
        }
        let mut inc = BTreeSet::new();
        for &child in tree.children(nd) {
            if !exempt(tree, child) {
                inc.extend(des[child].iter().cloned());
            }
        }
        include[nd] = inc;
    }

    // exclude sets: the parent's exclusions plus the non-exempt siblings
    let mut exclude: Vec<BTreeSet<OttId>> = vec![BTreeSet::new(); tree.num_nodes()];
    for nd in tree.preorder() {
        if tree.is_tip(nd) || nd == root {
            continue;
        }
        let parent = tree.parent(nd).expect("non-root node without parent");
        let mut ex = exclude[parent].clone();
        for &sib in tree.children(parent) {
            if sib != nd && !exempt(tree, sib) {
                ex.extend(des[sib].iter().cloned());
            }
        }
        exclude[nd] = ex;
    }

    let mut splits = Vec::new();
    for nd in ordered_nodes(order, tree) {
        if tree.is_tip(nd) || nd == root {
            continue;
        }
        let inc = index.remap(&include[nd])?;
        if inc.len() < 2 {
            continue;
        }
        let exc = index.remap(&exclude[nd])?;
        splits.push((nd, RSplit::from_include_exclude(&inc, &exc)));
    }
    Ok(splits)
}

fn ordered_nodes(order: BranchOrder, tree: &Tree) -> Vec<NodeId> {
    match order {
        BranchOrder::Preorder => tree.preorder(),
        BranchOrder::Postorder => tree.postorder(),
    }
}

/// Incremental acceptance state shared across the input trees.
struct Acceptor<'a> {
    config: &'a Config,
    all_leaves_indices: Vec<usize>,
    scratch: TaxonScratch,
    solution: Option<SolutionRef>,
    consistent: Vec<RSplit>,
    total_build_calls: usize,
}

impl<'a> Acceptor<'a> {
    fn new(config: &'a Config, n: usize) -> Self {
        Acceptor {
            config,
            all_leaves_indices: (0..n).collect(),
            scratch: TaxonScratch::new(),
            solution: None,
            consistent: Vec::new(),
            total_build_calls: 0,
        }
    }

    /// Tries a contiguous split range; on single-split failure the source
    /// node is collapsed.
    fn add_range(
        &mut self,
        splits: &[(NodeId, RSplit)],
        tree: &mut Tree,
        start: usize,
        n: usize,
    ) -> bool {
        let result;
        if self.config.incremental {
            if self.solution.is_none() {
                self.solution = Some(Solution::shared(self.all_leaves_indices.clone()));
            }
            let new_splits: Vec<RSplit> =
                splits[start..start + n].iter().map(|(_, s)| s.clone()).collect();

            let solution = self
                .solution
                .as_mut()
                .expect("acceptor without a solution");
            result = extend_solution(
                solution,
                new_splits.clone(),
                self.config.rollback,
                &mut self.scratch,
            );
            trace!(
                "consistent = {} -> {}: {}",
                self.consistent.len(),
                self.consistent.len() + n,
                if result { "ok" } else { "FAIL" }
            );
            if result {
                self.consistent.extend(new_splits);
            } else if !self.config.rollback {
                // the failed call left the solution dirty; rebuild from the
                // last known good list
                let mut rebuilt = Solution::shared(self.all_leaves_indices.clone());
                let ok = extend_solution(
                    &mut rebuilt,
                    self.consistent.clone(),
                    false,
                    &mut self.scratch,
                );
                debug_assert!(ok);
                self.solution = Some(rebuilt);
                self.total_build_calls += 1;
            }
            debug_assert_eq!(
                self.consistent.len(),
                self.solution
                    .as_ref()
                    .map(|s| s.borrow().n_splits_from_components())
                    .unwrap_or(0)
            );
        } else {
            for (_, split) in &splits[start..start + n] {
                self.consistent.push(split.clone());
            }
            let mut fresh = Solution::shared(self.all_leaves_indices.clone());
            result = extend_solution(
                &mut fresh,
                self.consistent.clone(),
                false,
                &mut self.scratch,
            );
            self.solution = Some(fresh);
            trace!(
                "consistent = {} -> {}: {}",
                self.consistent.len() - n,
                self.consistent.len(),
                if result { "ok" } else { "FAIL" }
            );
            if !result {
                for _ in 0..n {
                    self.consistent.pop();
                }
            }
        }

        self.total_build_calls += 1;

        if n == 1 && !result {
            tree.collapse_node(splits[start].0);
        }

        result
    }

    /// Divide-and-conquer acceptance: try the whole range, halve on failure.
    fn add_batch(&mut self, splits: &[(NodeId, RSplit)], tree: &mut Tree, start: usize, n: usize) {
        debug_assert!(n >= 1);
        debug_assert!(start + n <= splits.len());
        let result = self.add_range(splits, tree, start, n);
        if !result && n > 1 {
            let n1 = n / 2;
            let n2 = n - n1;
            self.add_batch(splits, tree, start, n1);
            self.add_batch(splits, tree, start + n1, n2);
        }
    }
}

/// Combines prioritized rooted trees into a single rooted summary tree.
///
/// The last tree is the taxonomy unless `synthesize_taxonomy` is set, in
/// which case a star over the union of input leaves is appended.  Earlier
/// trees take priority; rejected groupings are collapsed in their source
/// tree.  Ids in `incertae_sedis` are exempt from the taxonomy's
/// include/exclude tightening and may resolve anywhere that does not
/// exclude them.
pub fn combine(
    mut trees: Vec<Tree>,
    incertae_sedis: &BTreeSet<OttId>,
    config: &Config,
) -> Result<CombineOutput, Error> {
    if trees.is_empty() {
        return Err(Error::NoTrees);
    }

    if config.synthesize_taxonomy {
        let mut union: BTreeSet<OttId> = BTreeSet::new();
        for tree in &trees {
            union.extend(tree.leaf_ids()?);
        }
        trees.push(Tree::star(union));
    }

    if config.set_ott_ids {
        for tree in &trees {
            // surfaces missing or duplicate tip ids
            tree.leaf_ids()?;
        }
    }

    // 1. Standardize ids to 0..n-1 for this subproblem.
    let taxonomy_leaves = trees
        .last()
        .expect("checked above")
        .leaf_ids()?;
    let index = LeafIndexMap::from_set(&taxonomy_leaves);

    if config.prune_unrecognized {
        let last = trees.len() - 1;
        for tree in &mut trees[..last] {
            let unknown: Vec<NodeId> = tree
                .leaves()
                .into_iter()
                .filter(|&nd| {
                    tree.ott_id(nd)
                        .map_or(false, |id| index.index_of(id).is_none())
                })
                .collect();
            for nd in unknown {
                tree.detach(nd);
            }
        }
    }

    let mut acceptor = Acceptor::new(config, index.len());

    // 2. Find splits in priority order and feed them through the solver.
    for i in 0..trees.len() {
        let is_taxonomy = i == trees.len() - 1;

        // Remove splits of tree i that directly conflict with previous
        // trees, unless this is the taxonomy and exemptions are in play.
        if config.oracle && (!is_taxonomy || incertae_sedis.is_empty()) {
            let (earlier, rest) = trees.split_at_mut(i);
            let tree_i = &mut rest[0];
            for ok_tree in earlier.iter() {
                remove_conflicting_splits_from_tree(ok_tree, tree_i)?;
            }
        }

        let splits = if is_taxonomy {
            splits_for_taxonomy_tree(config.branch_order, &trees[i], &index, incertae_sedis)?
        } else {
            splits_for_tree(config.branch_order, &trees[i], &index)?
        };
        if splits.is_empty() {
            continue;
        }

        if config.batching {
            acceptor.add_batch(&splits, &mut trees[i], 0, splits.len());
        } else {
            for j in 0..splits.len() {
                acceptor.add_batch(&splits, &mut trees[i], j, 1);
            }
        }

        debug!(
            "tree {}: total build calls = {}",
            i, acceptor.total_build_calls
        );
    }

    // Taxonomy nodes that survived the oracle and the solver carry the
    // names.
    let taxonomy = trees.last_mut().expect("checked above");
    let compatible_taxa: Vec<NodeId> = taxonomy
        .preorder()
        .into_iter()
        .filter(|&nd| taxonomy.parent(nd).is_some() && !taxonomy.is_tip(nd))
        .collect();

    // 3. Construct the final tree and map indices back to ids.
    let mut tree = super::build_tree(&acceptor.all_leaves_indices, &acceptor.consistent)
        .ok_or(Error::Invariant("accepted splits turned inconsistent"))?;
    for nd in tree.preorder() {
        if tree.is_tip(nd) {
            let idx = tree.ott_id(nd).expect("solver tip without index") as usize;
            tree.set_ott_id(nd, index.id(idx));
        }
    }

    // The local taxonomy copy was modified, so recompute depths before the
    // name transfer leans on them.
    compute_depth(taxonomy);
    add_root_and_tip_names(&mut tree, taxonomy)?;
    add_names(&mut tree, taxonomy, &compatible_taxa, config.canonical_policy)?;

    let placements = check_placement(&tree, taxonomy)?;

    Ok(CombineOutput { tree, placements })
}
