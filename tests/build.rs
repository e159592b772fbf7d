// Copyright (c) 2022, MaidSafe.
// All rights reserved.
//
// This SAFE Network Software is licensed under the BSD-3-Clause license.
// Please see the LICENSE file for more details.

/// tests for the incremental BUILD solver
use supertree::build::{build_tree, check_consistent, extend_solution, TaxonScratch};
use supertree::{RSplit, Solution};

// Leaves are the indices 0..n-1 throughout; the driver owns the mapping to
// real ids.
fn all_leaves(n: usize) -> Vec<usize> {
    (0..n).collect()
}

// A single split over {0,1,2,3} grouping {0,1}.
//
// Expected: success, and the tree ((0,1),2,3).
#[test]
fn single_split_builds_a_cherry() {
    let leaves = all_leaves(4);
    let split = RSplit::from_include_all(&[0, 1], &leaves);

    let tree = build_tree(&leaves, &[split]).expect("one split is always consistent");
    assert_eq!(tree.topology(), "((0,1),2,3)");
}

// {0,1}|{2,3} and {0,2}|{1,3} cannot be displayed by one rooted tree,
// although each is fine on its own.
#[test]
fn conflicting_pair_fails_together() {
    let leaves = all_leaves(4);
    let s1 = RSplit::from_include_all(&[0, 1], &leaves);
    let s2 = RSplit::from_include_all(&[0, 2], &leaves);

    assert!(check_consistent(&leaves, &[s1.clone()]));
    assert!(check_consistent(&leaves, &[s2.clone()]));
    assert!(!check_consistent(&leaves, &[s1, s2]));
}

// Nested splits recurse into sub-problems.
#[test]
fn nested_splits_build_a_ladder() {
    let leaves = all_leaves(5);
    let outer = RSplit::from_include_all(&[0, 1, 2], &leaves);
    let inner = RSplit::from_include_all(&[0, 1], &leaves);

    let tree = build_tree(&leaves, &[outer, inner]).expect("nested splits are consistent");
    assert_eq!(tree.topology(), "(((0,1),2),3,4)");
}

// No splits at all yields the star.
#[test]
fn no_splits_build_a_star() {
    let leaves = all_leaves(4);
    let tree = build_tree(&leaves, &[]).expect("the empty split set is consistent");
    assert_eq!(tree.topology(), "(0,1,2,3)");
}

// A failing incremental call must leave the solution exactly as it was:
// accepting the same split again afterwards still works, and the tree is
// unchanged.
#[test]
fn failed_extension_rolls_back() {
    let leaves = all_leaves(4);
    let s1 = RSplit::from_include_all(&[0, 1], &leaves);
    let s2 = RSplit::from_include_all(&[0, 2], &leaves);
    let s3 = RSplit::from_include_all(&[2, 3], &leaves);

    let mut solution = Solution::shared(leaves.clone());
    let mut scratch = TaxonScratch::new();

    assert!(extend_solution(&mut solution, vec![s1], true, &mut scratch));
    let before = solution.borrow().get_tree().topology();
    let splits_before = solution.borrow().n_splits_from_components();

    assert!(!extend_solution(&mut solution, vec![s2], true, &mut scratch));
    assert_eq!(solution.borrow().get_tree().topology(), before);
    assert_eq!(solution.borrow().n_splits_from_components(), splits_before);

    // the rolled-back solution is still extendable
    assert!(extend_solution(&mut solution, vec![s3], true, &mut scratch));
    assert_eq!(solution.borrow().get_tree().topology(), "((0,1),(2,3))");
}

// Rollback and rebuild-from-last-good must agree on the final tree.
#[test]
fn rollback_and_rebuild_agree() {
    let leaves = all_leaves(5);
    let sequence = vec![
        RSplit::from_include_all(&[0, 1], &leaves),
        RSplit::from_include_all(&[0, 2], &leaves), // conflicts, rejected
        RSplit::from_include_all(&[3, 4], &leaves),
        RSplit::from_include_all(&[0, 1, 2], &leaves),
    ];

    // rollback mode
    let mut with_rollback = Solution::shared(leaves.clone());
    let mut scratch = TaxonScratch::new();
    let mut accepted = Vec::new();
    for split in &sequence {
        if extend_solution(&mut with_rollback, vec![split.clone()], true, &mut scratch) {
            accepted.push(split.clone());
        }
    }

    // rebuild mode: a failed call dirties the solution, so rebuild from the
    // accepted list
    let mut rebuilt = Solution::shared(leaves.clone());
    let mut consistent = Vec::new();
    for split in &sequence {
        if extend_solution(&mut rebuilt, vec![split.clone()], false, &mut scratch) {
            consistent.push(split.clone());
        } else {
            rebuilt = Solution::shared(leaves.clone());
            assert!(extend_solution(
                &mut rebuilt,
                consistent.clone(),
                false,
                &mut scratch
            ));
        }
    }

    assert_eq!(
        with_rollback.borrow().get_tree().topology(),
        rebuilt.borrow().get_tree().topology()
    );
    assert_eq!(accepted.len(), consistent.len());
}

// Splits accepted in separate batches end up in the same tree as one batch.
#[test]
fn batched_and_single_acceptance_agree() {
    let leaves = all_leaves(6);
    let splits = vec![
        RSplit::from_include_all(&[0, 1], &leaves),
        RSplit::from_include_all(&[2, 3], &leaves),
        RSplit::from_include_all(&[0, 1, 2, 3], &leaves),
        RSplit::from_include_all(&[4, 5], &leaves),
    ];

    let one_shot = build_tree(&leaves, &splits).expect("consistent");

    let mut solution = Solution::shared(leaves.clone());
    let mut scratch = TaxonScratch::new();
    for split in &splits {
        assert!(extend_solution(
            &mut solution,
            vec![split.clone()],
            true,
            &mut scratch
        ));
    }

    assert_eq!(
        one_shot.topology(),
        solution.borrow().get_tree().topology()
    );
}
