// Copyright (c) 2022, MaidSafe.
// All rights reserved.
//
// This SAFE Network Software is licensed under the BSD-3-Clause license.
// Please see the LICENSE file for more details.

use thiserror::Error;

use super::OttId;

/// Fatal conditions surfaced to the caller.
///
/// BUILD inconsistency and oracle-detected conflicts are *not* errors: the
/// solver reports them through its return value and processing continues.
/// Everything here aborts the current subproblem.
#[derive(Debug, Error)]
pub enum Error {
    /// The same external id appeared twice where a bijection is required.
    #[error("duplicate external id {0}")]
    DuplicateId(OttId),

    /// A tip carried no external id although ids were required on every tip.
    #[error("tip without an external id")]
    MissingTipId,

    /// An external id was looked up that the current leaf set does not hold.
    #[error("unknown external id {0}")]
    UnknownId(OttId),

    /// Two trees being compared do not cover the same leaf set.
    #[error("trees must have the same leaf set (mismatch at id {0})")]
    LeafSetMismatch(OttId),

    /// A rooted tree was required but the tree has no root node.
    #[error("tree has no root")]
    EmptyTree,

    /// An operation needed at least one input tree.
    #[error("no input trees")]
    NoTrees,

    /// A bookkeeping invariant was violated; this indicates a bug, not bad
    /// input.
    #[error("internal invariant violated: {0}")]
    Invariant(&'static str),
}
