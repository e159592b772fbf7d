// Copyright (c) 2022, MaidSafe.
// All rights reserved.
//
// This SAFE Network Software is licensed under the BSD-3-Clause license.
// Please see the LICENSE file for more details.

//! Rooted supertree construction and comparison for phylogenetic trees.
//!
//! Given a prioritized sequence of rooted input trees over overlapping leaf
//! sets (phylogenetic estimates first, a taxonomy last), [`combine`] produces
//! a single rooted summary tree displaying as many of the input groupings as
//! are jointly consistent, honoring the priority order.
//!
//! Three engines underlie this:
//!
//! * the incremental BUILD solver ([`build`]), which decides whether a set of
//!   rooted bipartitions is displayable by one rooted tree and constructs
//!   such a tree, supporting cheap rollback on failure;
//! * the conflict classifier ([`conflict`]), which relates every non-trivial
//!   internal node of one rooted tree to the nodes of another
//!   (supported_by / partial_path_of / terminal / conflicts_with /
//!   resolved_by);
//! * the quartet/triplet distance engines ([`quartet`], [`triplet`]), which
//!   tabulate every size-4 (size-3) leaf subset into resolution classes and
//!   compute taxon-weighted distances.
//!
//! Newick parsing/serialization, file I/O and taxonomy loading are the
//! caller's concern; trees enter and leave through the [`Tree`] arena type.
//!
//! For usage/examples, see:
//!   tests/build.rs
//!   tests/combine.rs
#![deny(missing_docs)]

mod error;
pub use self::error::Error;

mod tree;
pub use self::tree::{Node, NodeId, OttId, Tree};

mod index;
pub use self::index::LeafIndexMap;

mod rsplit;
pub use self::rsplit::RSplit;

mod solution;
pub use self::solution::{Component, ComponentRef, Solution, SolutionRef};

mod rollback;

pub mod build;
pub use self::build::{build_tree, check_consistent, extend_solution, TaxonScratch};

mod induced;
pub use self::induced::{compute_depth, compute_tips, induced_tree, mrca_from_depth};

pub mod conflict;
pub use self::conflict::{conflict_records, ConflictRecord, Relation};

mod oracle;
pub use self::oracle::remove_conflicting_splits_from_tree;

pub mod combine;
pub use self::combine::{combine, BranchOrder, CanonicalPolicy, CombineOutput, Config};

mod names;
pub use self::names::{check_placement, Placement};

mod splitset;
pub use self::splitset::TreeSplitSet;

pub mod quartet;
pub use self::quartet::{QuartetClass, QuartetDist, QuartetTable};

pub mod triplet;
pub use self::triplet::{PrunedLeaf, TripletClass, TripletDist, TripletDistAnalysis, TripletTable};

mod compare;
pub use self::compare::CompClass;

mod coordinator;
pub use self::coordinator::{ReadGuard, ReadWriteCoordinator, WriteGuard};
