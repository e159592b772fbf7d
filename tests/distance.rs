// Copyright (c) 2022, MaidSafe.
// All rights reserved.
//
// This SAFE Network Software is licensed under the BSD-3-Clause license.
// Please see the LICENSE file for more details.

/// tests for the quartet/triplet distance engines
mod common;

use common::{node, tip, tree_of};
use supertree::quartet::{QuartetClass, QuartetDist, QuartetTable};
use supertree::triplet::{TripletDist, TripletDistAnalysis, TripletTable};
use supertree::{Tree, TreeSplitSet};

// Identical four-leaf trees: one comparable quartet, no differences.
#[test]
fn identical_trees_have_zero_distance() {
    let t1 = tree_of(node(vec![
        node(vec![tip(1), tip(2)]),
        node(vec![tip(3), tip(4)]),
    ]));
    let t2 = t1.clone();

    let tas1 = TreeSplitSet::new(&t1).expect("indexable");
    let tas2 = TreeSplitSet::new(&t2).expect("indexable");
    tas1.same_leaf_set(&tas2).expect("same leaves");

    let q1 = QuartetTable::new(&tas1);
    let q2 = QuartetTable::new(&tas2);
    assert_eq!(q1.class(0, 1, 2, 3), QuartetClass::OneTwo);

    let dist = QuartetDist::new(&q1, &q2).expect("same size");
    assert_eq!(dist.diff_comp(), (0, 1));
    for i in 0..4 {
        assert_eq!(dist.diff_comp_for_index(i), (0, 1));
    }
}

// Crossed cherries disagree on their only quartet, in both directions.
#[test]
fn crossed_cherries_disagree_symmetrically() {
    let t1 = tree_of(node(vec![
        node(vec![tip(1), tip(2)]),
        node(vec![tip(3), tip(4)]),
    ]));
    let t2 = tree_of(node(vec![
        node(vec![tip(1), tip(3)]),
        node(vec![tip(2), tip(4)]),
    ]));

    let tas1 = TreeSplitSet::new(&t1).expect("indexable");
    let tas2 = TreeSplitSet::new(&t2).expect("indexable");
    let q1 = QuartetTable::new(&tas1);
    let q2 = QuartetTable::new(&tas2);
    assert_eq!(q1.class(0, 1, 2, 3), QuartetClass::OneTwo);
    assert_eq!(q2.class(0, 1, 2, 3), QuartetClass::OneThree);

    let forward = QuartetDist::new(&q1, &q2).expect("same size");
    let backward = QuartetDist::new(&q2, &q1).expect("same size");
    assert_eq!(forward.diff_comp(), (1, 1));
    assert_eq!(forward.diff_comp(), backward.diff_comp());
}

// A star is compatible with any resolution, in both directions.
#[test]
fn polytomy_is_compatible_with_resolution() {
    let resolved = tree_of(node(vec![
        node(vec![tip(1), tip(2)]),
        node(vec![tip(3), tip(4)]),
    ]));
    let star = Tree::star(vec![1, 2, 3, 4]);

    let tas1 = TreeSplitSet::new(&resolved).expect("indexable");
    let tas2 = TreeSplitSet::new(&star).expect("indexable");
    let q1 = QuartetTable::new(&tas1);
    let q2 = QuartetTable::new(&tas2);
    assert_eq!(q2.class(0, 1, 2, 3), QuartetClass::Polytomy);

    let forward = QuartetDist::new(&q1, &q2).expect("same size");
    let backward = QuartetDist::new(&q2, &q1).expect("same size");
    assert_eq!(forward.diff_comp(), (0, 1));
    assert_eq!(backward.diff_comp(), (0, 1));
}

// Every sorted tuple of a fully resolved tree is tabulated and resolved.
#[test]
fn resolved_tree_fills_the_table() {
    let caterpillar = tree_of(node(vec![
        node(vec![node(vec![node(vec![tip(1), tip(2)]), tip(3)]), tip(4)]),
        tip(5),
    ]));
    let tas = TreeSplitSet::new(&caterpillar).expect("indexable");
    let table = QuartetTable::new(&tas);

    let n = table.num_tips();
    assert_eq!(n, 5);
    let mut informative = 0;
    for i in 0..n {
        for j in i + 1..n {
            for k in j + 1..n {
                for l in k + 1..n {
                    let class = table.class(i, j, k, l);
                    assert_ne!(class, QuartetClass::Unknown);
                    assert_ne!(class, QuartetClass::Polytomy);
                    informative += 1;
                }
            }
        }
    }
    // C(5,4)
    assert_eq!(informative, 5);
}

// Triplets of the crossed cherries all conflict; pruning peels the
// smallest-index worst leaf each round until nothing differs.
#[test]
fn pruning_drains_the_differences() {
    let t1 = tree_of(node(vec![
        node(vec![tip(1), tip(2)]),
        node(vec![tip(3), tip(4)]),
    ]));
    let t2 = tree_of(node(vec![
        node(vec![tip(1), tip(3)]),
        node(vec![tip(2), tip(4)]),
    ]));

    let tas1 = TreeSplitSet::new(&t1).expect("indexable");
    let tas2 = TreeSplitSet::new(&t2).expect("indexable");
    let r1 = TripletTable::new(&tas1);
    let r2 = TripletTable::new(&tas2);
    let dist = TripletDist::new(&r1, &r2).expect("same size");
    assert_eq!(dist.diff_comp(), (4, 4));

    let analysis = TripletDistAnalysis::new(&t1, &t2).expect("same leaves");
    assert_eq!(analysis.num_rounds(), 3);
    assert_eq!(analysis.diff_comp_for_round(0), (4, 4));
    assert_eq!(analysis.diff_comp_for_round(1), (1, 1));
    assert_eq!(analysis.diff_comp_for_round(2), (0, 0));

    let pruned: Vec<u64> = analysis.pruned().iter().map(|p| p.id).collect();
    assert_eq!(pruned, vec![1, 2]);
}

// Trees over different leaf sets cannot be compared.
#[test]
fn leaf_set_mismatch_is_fatal() {
    let t1 = tree_of(node(vec![node(vec![tip(1), tip(2)]), tip(3)]));
    let t2 = tree_of(node(vec![node(vec![tip(1), tip(2)]), tip(9)]));

    assert!(TripletDistAnalysis::new(&t1, &t2).is_err());
}
