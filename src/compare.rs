// Copyright (c) 2022, MaidSafe.
// All rights reserved.
//
// This SAFE Network Software is licensed under the BSD-3-Clause license.
// Please see the LICENSE file for more details.

use serde::{Deserialize, Serialize};

use super::quartet::QuartetClass;
use super::triplet::TripletClass;

/// Pairwise comparison of two resolution classes for the same leaf tuple.
///
/// The comparison is symmetric in its arguments; only
/// `ConflictingResolution` counts toward a distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompClass {
    /// Both trees leave the tuple unresolved.
    BothUnresolved,
    /// One tree resolves the tuple, the other leaves it open.
    Compatible,
    /// Both trees resolve the tuple the same way.
    SameResolution,
    /// The trees resolve the tuple differently.
    ConflictingResolution,
    /// At least one side carries no information for the tuple.
    NoComparison,
}

pub(crate) fn comp_quartet(a: QuartetClass, b: QuartetClass) -> CompClass {
    use QuartetClass::*;
    match (a, b) {
        (Unknown, _) | (_, Unknown) | (NotQ, _) | (_, NotQ) => CompClass::NoComparison,
        (Polytomy, Polytomy) => CompClass::BothUnresolved,
        (Polytomy, _) | (_, Polytomy) => CompClass::Compatible,
        _ if a == b => CompClass::SameResolution,
        _ => CompClass::ConflictingResolution,
    }
}

pub(crate) fn comp_triplet(a: TripletClass, b: TripletClass) -> CompClass {
    use TripletClass::*;
    match (a, b) {
        (Unknown, _) | (_, Unknown) | (NotQ, _) | (_, NotQ) => CompClass::NoComparison,
        (Polytomy, Polytomy) => CompClass::BothUnresolved,
        (Polytomy, _) | (_, Polytomy) => CompClass::Compatible,
        _ if a == b => CompClass::SameResolution,
        _ => CompClass::ConflictingResolution,
    }
}

/// Per-taxon distance fraction `diffs / comparable`.
pub(crate) fn frac_diff_from_pair(pair: (usize, usize)) -> f64 {
    pair.0 as f64 / pair.1 as f64
}
