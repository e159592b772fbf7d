// Copyright (c) 2022, MaidSafe.
// All rights reserved.
//
// This SAFE Network Software is licensed under the BSD-3-Clause license.
// Please see the LICENSE file for more details.

//! Dense quartet tables: every sorted 4-tuple of leaf indices mapped to its
//! resolution class on a tree, plus the pairwise table comparison.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::compare::{comp_quartet, CompClass};
use super::splitset::TreeSplitSet;
use super::tree::NodeId;
use super::Error;

/// Resolution class of one leaf 4-tuple on a rooted tree.
///
/// For a sorted tuple `(a, b, c, d)` the resolved classes name the position
/// of the pair that joins first: `OneTwo` = `ab|cd`, `OneThree` = `ac|bd`,
/// `OneFour` = `ad|bc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuartetClass {
    /// No information recorded for the tuple.
    Unknown,
    /// The four paths meet at one node: unresolved.
    Polytomy,
    /// First and second elements pair up.
    OneTwo,
    /// First and third elements pair up.
    OneThree,
    /// First and fourth elements pair up.
    OneFour,
    /// Not a quartet of this tree.
    NotQ,
}

impl fmt::Display for QuartetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            QuartetClass::Unknown => "?",
            QuartetClass::Polytomy => "*",
            QuartetClass::NotQ => "X",
            QuartetClass::OneTwo => "12",
            QuartetClass::OneThree => "13",
            QuartetClass::OneFour => "14",
        };
        write!(f, "{}", s)
    }
}

// The packed jagged storage: dimension one is indexed by the smallest
// tuple element, the rest by successive gaps minus one.
pub(crate) fn gen_by_fourth<T: Clone>(num_tax: usize, third_index: usize, def: &T) -> Vec<T> {
    let min_real_ind = third_index + 1;
    debug_assert!(min_real_ind < num_tax);
    let max_real_ind = num_tax - 1;
    vec![def.clone(); 1 + max_real_ind - min_real_ind]
}

pub(crate) fn gen_by_third<T: Clone>(num_tax: usize, sec_index: usize, def: &T) -> Vec<Vec<T>> {
    let min_real_ind = sec_index + 1;
    debug_assert!(min_real_ind < num_tax);
    let max_real_ind = num_tax - 2;
    (min_real_ind..=max_real_ind)
        .map(|i| gen_by_fourth(num_tax, i, def))
        .collect()
}

pub(crate) fn gen_by_sec<T: Clone>(num_tax: usize, first_ind: usize, def: &T) -> Vec<Vec<Vec<T>>> {
    let min_real_ind = first_ind + 1;
    debug_assert!(min_real_ind < num_tax);
    let max_real_ind = num_tax - 3;
    (min_real_ind..=max_real_ind)
        .map(|i| gen_by_third(num_tax, i, def))
        .collect()
}

/// The quartet table of one tree: a class for every sorted 4-tuple of leaf
/// indices.
///
/// Trees with fewer than four tips produce an empty table.
#[derive(Debug)]
pub struct QuartetTable {
    num_tips: usize,
    by_lowest: Vec<Vec<Vec<Vec<QuartetClass>>>>,
}

impl QuartetTable {
    /// Tabulates every quartet of the indexed tree.
    pub fn new(tas: &TreeSplitSet<'_>) -> Self {
        let num_tips = tas.num_tips();
        let mut table = QuartetTable {
            num_tips,
            by_lowest: Vec::new(),
        };
        if num_tips < 4 {
            return table;
        }
        table.by_lowest.reserve(num_tips - 3);
        for row in 0..num_tips - 3 {
            table
                .by_lowest
                .push(gen_by_sec(num_tips, row, &QuartetClass::Unknown));
        }

        let full: BTreeSet<usize> = (0..num_tips).collect();
        for (nd, taxset) in tas.informative() {
            let outgroup: Vec<usize> = full.difference(taxset).cloned().collect();
            table.register_nd(tas, *nd, &outgroup);
        }
        table.register_nd(tas, tas.root(), &[]);
        table
    }

    /// Number of indexed tips.
    #[inline]
    pub fn num_tips(&self) -> usize {
        self.num_tips
    }

    /// The class of the sorted tuple `(i, j, k, l)`; requires
    /// `i < j < k < l < num_tips()`.
    #[inline]
    pub fn class(&self, i: usize, j: usize, k: usize, l: usize) -> QuartetClass {
        debug_assert!(i < j && j < k && k < l && l < self.num_tips);
        self.by_lowest[i][j - i - 1][k - j - 1][l - k - 1]
    }

    fn register_nd(&mut self, tas: &TreeSplitSet<'_>, par: NodeId, outgroup: &[usize]) {
        let children = tas.tree().children(par).to_vec();
        for (ci, &c1) in children.iter().enumerate() {
            for &c2 in &children[ci + 1..] {
                self.register_sibs(tas.taxset(c1), tas.taxset(c2), outgroup);
            }
        }
        if children.len() > 2 {
            self.register_polytomy(tas, &children, outgroup);
        }
    }

    /// Tuples drawing from three or more children of a polytomy meet at it
    /// and stay unresolved: a fourth element comes from a distinct fourth
    /// child or from the outgroup.
    fn register_polytomy(&mut self, tas: &TreeSplitSet<'_>, children: &[NodeId], outgroup: &[usize]) {
        for a in 0..children.len() {
            for b in a + 1..children.len() {
                for c in b + 1..children.len() {
                    let (s1, s2, s3) = (
                        tas.taxset(children[a]),
                        tas.taxset(children[b]),
                        tas.taxset(children[c]),
                    );
                    self.register_poly_out(s1, s2, s3, outgroup);
                    for d in c + 1..children.len() {
                        let fourth: Vec<usize> =
                            tas.taxset(children[d]).iter().cloned().collect();
                        self.register_poly_out(s1, s2, s3, &fourth);
                    }
                }
            }
        }
    }

    fn register_poly_out(
        &mut self,
        f_set: &BTreeSet<usize>,
        s_set: &BTreeSet<usize>,
        t_set: &BTreeSet<usize>,
        fourth: &[usize],
    ) {
        for &fci in f_set {
            for &sci in s_set {
                let (fs_small, fs_large) = if fci < sci { (fci, sci) } else { (sci, fci) };
                for &tci in t_set {
                    let (fst_small, fst_mid, fst_large) = if tci < fs_small {
                        (tci, fs_small, fs_large)
                    } else if tci < fs_large {
                        (fs_small, tci, fs_large)
                    } else {
                        (fs_small, fs_large, tci)
                    };
                    for &oci in fourth {
                        self.register_poly_last_unsorted(fst_small, fst_mid, fst_large, oci);
                    }
                }
            }
        }
    }

    fn register_poly_last_unsorted(&mut self, u1: usize, u2: usize, u3: usize, uu: usize) {
        let (s1, s2, s3, s4);
        if uu < u2 {
            s3 = u2;
            s4 = u3;
            if uu < u1 {
                s1 = uu;
                s2 = u1;
            } else {
                s1 = u1;
                s2 = uu;
            }
        } else {
            s1 = u1;
            s2 = u2;
            if uu < u3 {
                s3 = uu;
                s4 = u3;
            } else {
                s3 = u3;
                s4 = uu;
            }
        }
        self.register_sorted(QuartetClass::Polytomy, s1, s2, s3, s4);
    }

    fn register_sibs(
        &mut self,
        lc_set: &BTreeSet<usize>,
        nc_set: &BTreeSet<usize>,
        out: &[usize],
    ) {
        for &lci in lc_set {
            for &nci in nc_set {
                let (in_small, in_large) = if lci < nci { (lci, nci) } else { (nci, lci) };
                for (oi, &out_small) in out.iter().enumerate() {
                    for &out_large in &out[oi + 1..] {
                        self.register_quartet(in_small, in_large, out_small, out_large);
                    }
                }
            }
        }
    }

    /// Classifies by where the joined pair lands within the sorted tuple.
    fn register_quartet(
        &mut self,
        in_small: usize,
        in_large: usize,
        out_small: usize,
        out_large: usize,
    ) {
        debug_assert!(in_small < in_large);
        debug_assert!(out_small < out_large);
        if in_small < out_small {
            if in_large < out_small {
                self.register_sorted(QuartetClass::OneTwo, in_small, in_large, out_small, out_large);
            } else if in_large < out_large {
                debug_assert!(in_large != out_small);
                self.register_sorted(
                    QuartetClass::OneThree,
                    in_small,
                    out_small,
                    in_large,
                    out_large,
                );
            } else {
                debug_assert!(out_large < in_large);
                self.register_sorted(
                    QuartetClass::OneFour,
                    in_small,
                    out_small,
                    out_large,
                    in_large,
                );
            }
        } else if in_small < out_large {
            debug_assert!(out_small < in_small);
            if in_large < out_large {
                self.register_sorted(
                    QuartetClass::OneFour,
                    out_small,
                    in_small,
                    in_large,
                    out_large,
                );
            } else {
                debug_assert!(out_large < in_large);
                self.register_sorted(
                    QuartetClass::OneThree,
                    out_small,
                    in_small,
                    out_large,
                    in_large,
                );
            }
        } else {
            debug_assert!(out_large < in_small);
            self.register_sorted(QuartetClass::OneTwo, out_small, out_large, in_small, in_large);
        }
    }

    fn register_sorted(&mut self, qt: QuartetClass, fir: usize, sec: usize, thi: usize, fou: usize) {
        debug_assert!(fir < sec && sec < thi && thi < fou);
        self.by_lowest[fir][sec - fir - 1][thi - sec - 1][fou - thi - 1] = qt;
    }
}

/// Pairwise comparison of two quartet tables over the same leaf index
/// space: aggregate and per-taxon conflicting/comparable counts.
#[derive(Debug)]
pub struct QuartetDist {
    num_tips: usize,
    num_diffs: usize,
    num_comp: usize,
    diff_by_taxon: Vec<usize>,
    comp_by_taxon: Vec<usize>,
    by_lowest: Vec<Vec<Vec<Vec<CompClass>>>>,
}

impl QuartetDist {
    /// Compares two tables cell by cell.  The tables must be over the same
    /// number of tips (callers check id-level equality via
    /// [`TreeSplitSet::same_leaf_set`]).
    pub fn new(q1: &QuartetTable, q2: &QuartetTable) -> Result<Self, Error> {
        if q1.num_tips != q2.num_tips {
            return Err(Error::Invariant("quartet tables differ in size"));
        }
        let num_tips = q1.num_tips;
        let mut dist = QuartetDist {
            num_tips,
            num_diffs: 0,
            num_comp: 0,
            diff_by_taxon: vec![0; num_tips],
            comp_by_taxon: vec![0; num_tips],
            by_lowest: Vec::new(),
        };
        if num_tips >= 4 {
            dist.calc_diffs_mat(q1, q2);
        }
        Ok(dist)
    }

    fn calc_diffs_mat(&mut self, q1: &QuartetTable, q2: &QuartetTable) {
        let n = self.num_tips;
        self.by_lowest.reserve(n - 3);
        for row in 0..n - 3 {
            self.by_lowest.push(gen_by_sec(n, row, &CompClass::NoComparison));
        }

        for i in 0..n - 3 {
            for j in i + 1..n - 2 {
                for k in j + 1..n - 1 {
                    for l in k + 1..n {
                        let cmp = comp_quartet(q1.class(i, j, k, l), q2.class(i, j, k, l));
                        self.by_lowest[i][j - i - 1][k - j - 1][l - k - 1] = cmp;
                        if cmp == CompClass::NoComparison {
                            continue;
                        }
                        // only conflicts count as distance: polytomy,
                        // compatible and same all count as no difference
                        if cmp == CompClass::ConflictingResolution {
                            self.diff_by_taxon[i] += 1;
                            self.diff_by_taxon[j] += 1;
                            self.diff_by_taxon[k] += 1;
                            self.diff_by_taxon[l] += 1;
                            self.num_diffs += 1;
                        }
                        self.num_comp += 1;
                        self.comp_by_taxon[i] += 1;
                        self.comp_by_taxon[j] += 1;
                        self.comp_by_taxon[k] += 1;
                        self.comp_by_taxon[l] += 1;
                    }
                }
            }
        }
    }

    /// `(conflicting, comparable)` over all tuples.
    #[inline]
    pub fn diff_comp(&self) -> (usize, usize) {
        (self.num_diffs, self.num_comp)
    }

    /// `(conflicting, comparable)` over the tuples containing one taxon.
    #[inline]
    pub fn diff_comp_for_index(&self, index: usize) -> (usize, usize) {
        (self.diff_by_taxon[index], self.comp_by_taxon[index])
    }
}
