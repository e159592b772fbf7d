// Copyright (c) 2022, MaidSafe.
// All rights reserved.
//
// This SAFE Network Software is licensed under the BSD-3-Clause license.
// Please see the LICENSE file for more details.

/// tests for the conflict classifier and the oracle
mod common;

use common::{node, tip, tree_of};
use supertree::{conflict_records, remove_conflicting_splits_from_tree, Relation, Tree};

fn count(records: &[supertree::ConflictRecord], relation: Relation) -> usize {
    records.iter().filter(|r| r.relation == relation).count()
}

// ((1,2),(3,4)) against ((1,3),(2,4)): every non-trivial grouping of one
// tree conflicts with both groupings of the other; nothing is supported.
#[test]
fn crossed_cherries_conflict() {
    let t1 = tree_of(node(vec![
        node(vec![tip(1), tip(2)]),
        node(vec![tip(3), tip(4)]),
    ]));
    let t2 = tree_of(node(vec![
        node(vec![tip(1), tip(3)]),
        node(vec![tip(2), tip(4)]),
    ]));

    let records = conflict_records(&t1, &t2).expect("classification runs");
    assert_eq!(count(&records, Relation::ConflictsWith), 4);
    assert_eq!(count(&records, Relation::SupportedBy), 0);
    assert_eq!(count(&records, Relation::ResolvedBy), 0);
    assert_eq!(count(&records, Relation::Terminal), 4);

    // and symmetrically
    let reverse = conflict_records(&t2, &t1).expect("classification runs");
    assert_eq!(count(&reverse, Relation::ConflictsWith), 4);
    assert_eq!(count(&reverse, Relation::SupportedBy), 0);
}

// Identical trees support each other's groupings.
#[test]
fn identical_trees_support() {
    let t1 = tree_of(node(vec![
        node(vec![tip(1), tip(2)]),
        node(vec![tip(3), tip(4)]),
    ]));

    let records = conflict_records(&t1, &t1.clone()).expect("classification runs");
    assert_eq!(count(&records, Relation::SupportedBy), 2);
    assert_eq!(count(&records, Relation::ConflictsWith), 0);
    assert_eq!(count(&records, Relation::ResolvedBy), 0);
    assert_eq!(count(&records, Relation::Terminal), 4);
}

// A resolved grouping refines a star: the star's root is resolved by it.
#[test]
fn resolution_of_a_polytomy() {
    let t1 = tree_of(node(vec![node(vec![tip(1), tip(2)]), tip(3), tip(4)]));
    let star = Tree::star(vec![1, 2, 3, 4]);

    let records = conflict_records(&t1, &star).expect("classification runs");
    assert_eq!(count(&records, Relation::ResolvedBy), 1);
    assert_eq!(count(&records, Relation::ConflictsWith), 0);
    assert_eq!(count(&records, Relation::SupportedBy), 0);
}

// A chain of nodes covering the same leaves is a partial path, not support.
#[test]
fn pass_through_chain_is_a_partial_path() {
    let t1 = tree_of(node(vec![
        node(vec![tip(1), tip(2)]),
        node(vec![tip(3), tip(4)]),
    ]));
    // the {1,2} group sits under an out-degree-one node
    let t2 = tree_of(node(vec![
        node(vec![node(vec![tip(1), tip(2)])]),
        node(vec![tip(3), tip(4)]),
    ]));

    let records = conflict_records(&t1, &t2).expect("classification runs");
    assert_eq!(count(&records, Relation::PartialPathOf), 2);
    assert_eq!(count(&records, Relation::SupportedBy), 1);
    assert_eq!(count(&records, Relation::ConflictsWith), 0);
}

// Every non-trivial internal node lands in exactly one class per grouping:
// over the shared subset {1,2,3,4} the projected trees agree.
#[test]
fn classification_respects_the_shared_leaf_set() {
    let t1 = tree_of(node(vec![
        node(vec![tip(1), tip(2), tip(9)]),
        node(vec![tip(3), tip(4)]),
    ]));
    let t2 = tree_of(node(vec![
        node(vec![tip(1), tip(2)]),
        node(vec![tip(3), tip(4), tip(7)]),
    ]));

    let records = conflict_records(&t1, &t2).expect("classification runs");
    assert_eq!(count(&records, Relation::ConflictsWith), 0);
    assert_eq!(count(&records, Relation::SupportedBy), 2);
}

// The oracle collapses exactly the conflicting groupings of the later
// tree.
#[test]
fn oracle_collapses_conflicting_groupings() {
    let ok_tree = tree_of(node(vec![
        node(vec![tip(1), tip(2)]),
        node(vec![tip(3), tip(4)]),
    ]));
    let mut to_clean = tree_of(node(vec![
        node(vec![tip(1), tip(3)]),
        node(vec![tip(2), tip(4)]),
    ]));

    remove_conflicting_splits_from_tree(&ok_tree, &mut to_clean).expect("oracle runs");
    assert_eq!(to_clean.topology(), "(1,2,3,4)");
}

// A grouping that only involves leaves absent from the other tree is left
// alone by the oracle.
#[test]
fn oracle_keeps_unshared_groupings() {
    let ok_tree = tree_of(node(vec![node(vec![tip(1), tip(2)]), tip(3), tip(4)]));
    let mut to_clean = tree_of(node(vec![
        node(vec![tip(8), tip(9)]),
        tip(1),
        tip(2),
        tip(3),
    ]));

    remove_conflicting_splits_from_tree(&ok_tree, &mut to_clean).expect("oracle runs");
    assert_eq!(to_clean.topology(), "(1,2,3,(8,9))");
}
