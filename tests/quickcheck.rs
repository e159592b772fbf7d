// Copyright (c) 2022, MaidSafe.
// All rights reserved.
//
// This SAFE Network Software is licensed under the BSD-3-Clause license.
// Please see the LICENSE file for more details.

/// property tests for the solver, the driver and the distance engines
use quickcheck::{Arbitrary, Gen, TestResult};
use rand::Rng;
use std::collections::BTreeSet;

use supertree::build::{build_tree, extend_solution, TaxonScratch};
use supertree::quartet::{QuartetDist, QuartetTable};
use supertree::{
    combine, BranchOrder, Config, LeafIndexMap, NodeId, OttId, RSplit, Solution, Tree,
    TreeSplitSet,
};

// A random multifurcating rooted tree over the ids 1..=n.
#[derive(Debug, Clone)]
struct ArbTree {
    tree: Tree,
}

// Two random trees over the same leaf ids, for comparison properties.
#[derive(Debug, Clone)]
struct ArbTreePair {
    t1: Tree,
    t2: Tree,
    ids: Vec<OttId>,
}

// Recursively partition the ids into 2-3 groups; single ids become tips,
// larger groups become child subtrees.  This yields arbitrary rooted
// multifurcating shapes.
fn grow<G: Gen>(tree: &mut Tree, parent: NodeId, ids: &[OttId], g: &mut G) {
    if ids.len() == 1 {
        let tip = tree.create_child(parent);
        tree.set_ott_id(tip, ids[0]);
        return;
    }
    let k = if ids.len() == 2 { 2 } else { 2 + g.gen_range(0, 2) };
    let mut buckets: Vec<Vec<OttId>> = vec![Vec::new(); k];
    for &id in ids {
        buckets[g.gen_range(0, k)].push(id);
    }
    // keep the partition proper: at least two non-empty groups
    if buckets.iter().filter(|b| !b.is_empty()).count() < 2 {
        let donor = buckets
            .iter()
            .position(|b| b.len() > 1)
            .expect("some bucket holds everything");
        let id = buckets[donor].pop().expect("non-empty donor");
        buckets[(donor + 1) % k].push(id);
    }
    for bucket in buckets {
        match bucket.len() {
            0 => {}
            1 => {
                let tip = tree.create_child(parent);
                tree.set_ott_id(tip, bucket[0]);
            }
            _ => {
                let nd = tree.create_child(parent);
                grow(tree, nd, &bucket, g);
            }
        }
    }
}

fn random_tree<G: Gen>(ids: &[OttId], g: &mut G) -> Tree {
    let mut tree = Tree::new();
    let root = tree.create_root();
    grow(&mut tree, root, ids, g);
    tree
}

impl Arbitrary for ArbTree {
    fn arbitrary<G: Gen>(g: &mut G) -> Self {
        let n = 3 + g.gen_range(0, 6);
        let ids: Vec<OttId> = (1..=n as OttId).collect();
        ArbTree {
            tree: random_tree(&ids, g),
        }
    }
}

impl Arbitrary for ArbTreePair {
    fn arbitrary<G: Gen>(g: &mut G) -> Self {
        let n = 3 + g.gen_range(0, 6);
        let ids: Vec<OttId> = (1..=n as OttId).collect();
        ArbTreePair {
            t1: random_tree(&ids, g),
            t2: random_tree(&ids, g),
            ids,
        }
    }
}

// helper: the splits of a tree's internal nodes over its own leaf set.
fn splits_of(tree: &Tree) -> (LeafIndexMap, Vec<RSplit>) {
    let ids = tree.leaf_ids().expect("generated tips carry unique ids");
    let index = LeafIndexMap::from_set(&ids);
    let des = tree.descendant_id_sets();
    let root = tree.root().expect("generated trees are rooted");
    let all = index.all_indices();

    let mut splits = Vec::new();
    for nd in tree.preorder() {
        if nd == root || tree.is_tip(nd) {
            continue;
        }
        let include = index.remap(&des[nd]).expect("leaves are indexed");
        if include.len() < 2 {
            continue;
        }
        splits.push(RSplit::from_include_all(&include, &all));
    }
    (index, splits)
}

// helper: does a solver tree (tips carry indices as ids) display a split?
fn displays(tree: &Tree, split: &RSplit) -> bool {
    let des = tree.descendant_id_sets();
    tree.preorder().into_iter().any(|nd| {
        split
            .include()
            .iter()
            .all(|&i| des[nd].contains(&(i as OttId)))
            && split
                .exclude()
                .iter()
                .all(|&i| !des[nd].contains(&(i as OttId)))
    })
}

quickcheck::quickcheck! {

    // the splits of any rooted tree are jointly consistent, and the tree
    // BUILD returns displays every one of them
    fn prop_build_accepts_own_splits(t: ArbTree) -> bool {
        let (index, splits) = splits_of(&t.tree);
        let leaves: Vec<usize> = (0..index.len()).collect();

        match build_tree(&leaves, &splits) {
            Some(result) => splits.iter().all(|s| displays(&result, s)),
            None => false,
        }
    }

    // a rejected extension leaves the solution exactly as it was
    fn prop_failed_extension_rolls_back(pair: ArbTreePair) -> TestResult {
        let (_, splits1) = splits_of(&pair.t1);
        let (_, splits2) = splits_of(&pair.t2);
        let leaves: Vec<usize> = (0..pair.ids.len()).collect();

        let mut solution = Solution::shared(leaves);
        let mut scratch = TaxonScratch::new();
        for split in &splits1 {
            if !extend_solution(&mut solution, vec![split.clone()], true, &mut scratch) {
                return TestResult::error("a tree's own splits must be consistent");
            }
        }

        let mut any_failed = false;
        for split in &splits2 {
            let before = solution.borrow().get_tree().topology();
            let n_before = solution.borrow().n_splits_from_components();
            let ok = extend_solution(&mut solution, vec![split.clone()], true, &mut scratch);
            if !ok {
                any_failed = true;
                if solution.borrow().get_tree().topology() != before {
                    return TestResult::failed();
                }
                if solution.borrow().n_splits_from_components() != n_before {
                    return TestResult::failed();
                }
            }
        }

        // pairs without any conflict exercise nothing here
        if any_failed {
            TestResult::passed()
        } else {
            TestResult::discard()
        }
    }

    // rollback mode and rebuild-from-last-good mode accept the same splits
    // and produce the same tree
    fn prop_rollback_and_rebuild_agree(pair: ArbTreePair) -> bool {
        let (_, splits1) = splits_of(&pair.t1);
        let (_, splits2) = splits_of(&pair.t2);
        let leaves: Vec<usize> = (0..pair.ids.len()).collect();
        let sequence: Vec<RSplit> =
            splits1.iter().chain(splits2.iter()).cloned().collect();

        let mut with_rollback = Solution::shared(leaves.clone());
        let mut scratch = TaxonScratch::new();
        let mut accepted = 0;
        for split in &sequence {
            if extend_solution(&mut with_rollback, vec![split.clone()], true, &mut scratch) {
                accepted += 1;
            }
        }

        let mut rebuilt = Solution::shared(leaves.clone());
        let mut consistent: Vec<RSplit> = Vec::new();
        for split in &sequence {
            if extend_solution(&mut rebuilt, vec![split.clone()], false, &mut scratch) {
                consistent.push(split.clone());
            } else {
                rebuilt = Solution::shared(leaves.clone());
                if !extend_solution(&mut rebuilt, consistent.clone(), false, &mut scratch) {
                    return false;
                }
            }
        }

        accepted == consistent.len()
            && with_rollback.borrow().get_tree().topology()
                == rebuilt.borrow().get_tree().topology()
    }

    // oracle, batching, incremental reuse and rollback are pure engine
    // knobs: the combined topology never depends on them
    fn prop_engine_knobs_preserve_combine(pair: ArbTreePair, config: Config) -> bool {
        let star = Tree::star(pair.ids.iter().cloned());
        let exemptions = BTreeSet::new();

        let reference = match combine(
            vec![pair.t1.clone(), pair.t2.clone(), star.clone()],
            &exemptions,
            &Config::default(),
        ) {
            Ok(out) => out.tree.topology(),
            Err(_) => return false,
        };

        let mut config = config;
        config.branch_order = BranchOrder::Preorder;
        match combine(vec![pair.t1.clone(), pair.t2.clone(), star], &exemptions, &config) {
            Ok(out) => out.tree.topology() == reference,
            Err(_) => false,
        }
    }

    // quartet distance is symmetric in its arguments
    fn prop_quartet_distance_symmetric(pair: ArbTreePair) -> TestResult {
        if pair.ids.len() < 4 {
            return TestResult::discard();
        }
        let tas1 = match TreeSplitSet::new(&pair.t1) {
            Ok(tas) => tas,
            Err(_) => return TestResult::error("generated trees are indexable"),
        };
        let tas2 = match TreeSplitSet::new(&pair.t2) {
            Ok(tas) => tas,
            Err(_) => return TestResult::error("generated trees are indexable"),
        };
        let q1 = QuartetTable::new(&tas1);
        let q2 = QuartetTable::new(&tas2);

        let forward = match QuartetDist::new(&q1, &q2) {
            Ok(dist) => dist,
            Err(_) => return TestResult::error("tables share the index space"),
        };
        let backward = match QuartetDist::new(&q2, &q1) {
            Ok(dist) => dist,
            Err(_) => return TestResult::error("tables share the index space"),
        };

        TestResult::from_bool(forward.diff_comp() == backward.diff_comp())
    }
}
