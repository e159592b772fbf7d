// Copyright (c) 2022, MaidSafe.
// All rights reserved.
//
// This SAFE Network Software is licensed under the BSD-3-Clause license.
// Please see the LICENSE file for more details.

//! Dense triplet tables and the iterative worst-leaf pruning analysis.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::compare::{comp_triplet, frac_diff_from_pair, CompClass};
use super::splitset::TreeSplitSet;
use super::tree::{NodeId, OttId, Tree};
use super::Error;

/// Resolution class of one leaf 3-tuple on a rooted tree.
///
/// For a sorted tuple `(a, b, c)` the resolved classes name the pair that
/// joins first: `OneTwo` = `ab|c`, `OneThree` = `ac|b`, `TwoThree` = `bc|a`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TripletClass {
    /// No information recorded for the tuple.
    Unknown,
    /// The three paths meet at one node: unresolved.
    Polytomy,
    /// First and second elements pair up.
    OneTwo,
    /// First and third elements pair up.
    OneThree,
    /// Second and third elements pair up.
    TwoThree,
    /// Not a triplet of this tree.
    NotQ,
}

impl fmt::Display for TripletClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TripletClass::Unknown => "?",
            TripletClass::Polytomy => "*",
            TripletClass::NotQ => "X",
            TripletClass::OneTwo => "12",
            TripletClass::OneThree => "13",
            TripletClass::TwoThree => "23",
        };
        write!(f, "{}", s)
    }
}

pub(crate) fn gen_tm_by_third<T: Clone>(num_tax: usize, third_index: usize, def: &T) -> Vec<T> {
    let min_real_ind = third_index + 1;
    debug_assert!(min_real_ind < num_tax);
    let max_real_ind = num_tax - 1;
    vec![def.clone(); 1 + max_real_ind - min_real_ind]
}

pub(crate) fn gen_tm_by_sec<T: Clone>(num_tax: usize, sec_index: usize, def: &T) -> Vec<Vec<T>> {
    let min_real_ind = sec_index + 1;
    debug_assert!(min_real_ind < num_tax);
    let max_real_ind = num_tax - 2;
    (min_real_ind..=max_real_ind)
        .map(|i| gen_tm_by_third(num_tax, i, def))
        .collect()
}

/// The triplet table of one tree: a class for every sorted 3-tuple of leaf
/// indices.
///
/// Trees with fewer than three tips produce an empty table.
#[derive(Debug)]
pub struct TripletTable {
    num_tips: usize,
    by_lowest: Vec<Vec<Vec<TripletClass>>>,
}

impl TripletTable {
    /// Tabulates every triplet of the indexed tree.
    pub fn new(tas: &TreeSplitSet<'_>) -> Self {
        let num_tips = tas.num_tips();
        let mut table = TripletTable {
            num_tips,
            by_lowest: Vec::new(),
        };
        if num_tips < 3 {
            return table;
        }
        table.by_lowest.reserve(num_tips - 2);
        for row in 0..num_tips - 2 {
            table
                .by_lowest
                .push(gen_tm_by_sec(num_tips, row, &TripletClass::Unknown));
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

    /// The class of the sorted tuple `(i, j, k)`; requires
    /// `i < j < k < num_tips()`.
    #[inline]
    pub fn class(&self, i: usize, j: usize, k: usize) -> TripletClass {
        debug_assert!(i < j && j < k && k < self.num_tips);
        self.by_lowest[i][j - i - 1][k - j - 1]
    }

    fn register_nd(&mut self, tas: &TreeSplitSet<'_>, par: NodeId, outgroup: &[usize]) {
        let children = tas.tree().children(par).to_vec();
        for (ci, &c1) in children.iter().enumerate() {
            for &c2 in &children[ci + 1..] {
                self.register_sibs(tas.taxset(c1), tas.taxset(c2), outgroup);
            }
        }
        if children.len() > 2 {
            self.register_polytomy(tas, &children);
        }
    }

    /// A triplet meeting at a polytomy draws from three distinct children;
    /// the outgroup is not involved.
    fn register_polytomy(&mut self, tas: &TreeSplitSet<'_>, children: &[NodeId]) {
        for a in 0..children.len() {
            for b in a + 1..children.len() {
                for c in b + 1..children.len() {
                    self.register_poly_out(
                        tas.taxset(children[a]),
                        tas.taxset(children[b]),
                        tas.taxset(children[c]),
                    );
                }
            }
        }
    }

    fn register_poly_out(
        &mut self,
        f_set: &BTreeSet<usize>,
        s_set: &BTreeSet<usize>,
        t_set: &BTreeSet<usize>,
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
                    self.register_sorted(TripletClass::Polytomy, fst_small, fst_mid, fst_large);
                }
            }
        }
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
                for &out_small in out {
                    self.register_triplet(in_small, in_large, out_small);
                }
            }
        }
    }

    fn register_triplet(&mut self, in_small: usize, in_large: usize, out_small: usize) {
        debug_assert!(in_small < in_large);
        if in_small < out_small {
            if in_large < out_small {
                self.register_sorted(TripletClass::OneTwo, in_small, in_large, out_small);
            } else {
                self.register_sorted(TripletClass::OneThree, in_small, out_small, in_large);
            }
        } else {
            debug_assert!(out_small < in_small);
            self.register_sorted(TripletClass::TwoThree, out_small, in_small, in_large);
        }
    }

    fn register_sorted(&mut self, tt: TripletClass, fir: usize, sec: usize, thi: usize) {
        debug_assert!(fir < sec && sec < thi);
        self.by_lowest[fir][sec - fir - 1][thi - sec - 1] = tt;
    }
}

/// Pairwise comparison of two triplet tables, recomputable under a growing
/// set of pruned (taboo) leaves.
#[derive(Debug)]
pub struct TripletDist {
    num_tips: usize,
    num_diffs: usize,
    num_comp: usize,
    diff_by_taxon: Vec<usize>,
    comp_by_taxon: Vec<usize>,
    by_lowest: Vec<Vec<Vec<CompClass>>>,
    prev_ignored: BTreeSet<usize>,
}

impl TripletDist {
    /// Compares two tables cell by cell.  The tables must be over the same
    /// number of tips (callers check id-level equality via
    /// [`TreeSplitSet::same_leaf_set`]).
    pub fn new(t1: &TripletTable, t2: &TripletTable) -> Result<Self, Error> {
        if t1.num_tips != t2.num_tips {
            return Err(Error::Invariant("triplet tables differ in size"));
        }
        let num_tips = t1.num_tips;
        let mut dist = TripletDist {
            num_tips,
            num_diffs: 0,
            num_comp: 0,
            diff_by_taxon: vec![0; num_tips],
            comp_by_taxon: vec![0; num_tips],
            by_lowest: Vec::new(),
            prev_ignored: BTreeSet::new(),
        };
        if num_tips >= 3 {
            let empty = BTreeSet::new();
            dist.calc_diffs_mat(t1, t2, &empty, true);
        }
        Ok(dist)
    }

    /// `(conflicting, comparable)` over the unpruned tuples.
    #[inline]
    pub fn diff_comp(&self) -> (usize, usize) {
        (self.num_diffs, self.num_comp)
    }

    /// `(conflicting, comparable)` over the unpruned tuples containing one
    /// taxon.
    #[inline]
    pub fn diff_comp_for_index(&self, index: usize) -> (usize, usize) {
        (self.diff_by_taxon[index], self.comp_by_taxon[index])
    }

    /// The unpruned taxa with the highest `diffs / comparable` fraction.
    pub fn get_highest_dist(&self, taboo: &BTreeSet<usize>) -> BTreeSet<usize> {
        let mut biggest: BTreeSet<usize> = BTreeSet::new();
        let mut frac_diff = -1.0f64;
        for i in 0..self.diff_by_taxon.len() {
            if taboo.contains(&i) || self.comp_by_taxon[i] == 0 {
                continue;
            }
            let cd = frac_diff_from_pair(self.diff_comp_for_index(i));
            if cd > frac_diff {
                biggest.clear();
                biggest.insert(i);
                frac_diff = cd;
            } else if (cd - frac_diff).abs() < std::f64::EPSILON {
                biggest.insert(i);
            }
        }
        biggest
    }

    /// Recomputes the counters with `taboo` leaves excluded (reusing the
    /// stored per-tuple comparisons) and returns the totals.
    pub fn calc_diff_comp(&mut self, taboo: &BTreeSet<usize>) -> (usize, usize) {
        if *taboo != self.prev_ignored {
            self.recount(taboo);
        }
        self.diff_comp()
    }

    fn calc_diffs_mat(
        &mut self,
        t1: &TripletTable,
        t2: &TripletTable,
        taboo: &BTreeSet<usize>,
        calc_comp: bool,
    ) {
        self.prev_ignored = taboo.clone();
        let n = self.num_tips;
        if calc_comp {
            self.by_lowest.reserve(n - 2);
            for row in 0..n - 2 {
                self.by_lowest
                    .push(gen_tm_by_sec(n, row, &CompClass::NoComparison));
            }
        }
        self.num_diffs = 0;
        self.num_comp = 0;
        self.diff_by_taxon = vec![0; n];
        self.comp_by_taxon = vec![0; n];

        for i in 0..n - 2 {
            if taboo.contains(&i) {
                continue;
            }
            for j in i + 1..n - 1 {
                if taboo.contains(&j) {
                    continue;
                }
                for k in j + 1..n {
                    if taboo.contains(&k) {
                        continue;
                    }
                    let cmp = if calc_comp {
                        let c = comp_triplet(t1.class(i, j, k), t2.class(i, j, k));
                        self.by_lowest[i][j - i - 1][k - j - 1] = c;
                        c
                    } else {
                        self.by_lowest[i][j - i - 1][k - j - 1]
                    };
                    self.tally(cmp, i, j, k);
                }
            }
        }
    }

    fn recount(&mut self, taboo: &BTreeSet<usize>) {
        self.prev_ignored = taboo.clone();
        let n = self.num_tips;
        self.num_diffs = 0;
        self.num_comp = 0;
        self.diff_by_taxon = vec![0; n];
        self.comp_by_taxon = vec![0; n];
        if n < 3 {
            return;
        }
        for i in 0..n - 2 {
            if taboo.contains(&i) {
                continue;
            }
            for j in i + 1..n - 1 {
                if taboo.contains(&j) {
                    continue;
                }
                for k in j + 1..n {
                    if taboo.contains(&k) {
                        continue;
                    }
                    let cmp = self.by_lowest[i][j - i - 1][k - j - 1];
                    self.tally(cmp, i, j, k);
                }
            }
        }
    }

    fn tally(&mut self, cmp: CompClass, i: usize, j: usize, k: usize) {
        if cmp == CompClass::NoComparison {
            return;
        }
        // only conflicts count as distance: polytomy, compatible and same
        // all count as no difference
        if cmp == CompClass::ConflictingResolution {
            self.diff_by_taxon[i] += 1;
            self.diff_by_taxon[j] += 1;
            self.diff_by_taxon[k] += 1;
            self.num_diffs += 1;
        }
        self.num_comp += 1;
        self.comp_by_taxon[i] += 1;
        self.comp_by_taxon[j] += 1;
        self.comp_by_taxon[k] += 1;
    }
}

/// One pruned leaf of the pruning analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrunedLeaf {
    /// The leaf's dense index.
    pub index: usize,
    /// The leaf's external id.
    pub id: OttId,
    /// The leaf's node in the first tree.
    pub node1: NodeId,
    /// The leaf's node in the second tree.
    pub node2: NodeId,
    /// `(conflicting, comparable)` contribution of the leaf when pruned.
    pub diff_comp: (usize, usize),
}

/// Iterative worst-leaf pruning: each round records the total distance,
/// then prunes the leaf contributing the highest per-leaf fraction (ties to
/// the smallest index) until no differences remain.
#[derive(Debug)]
pub struct TripletDistAnalysis {
    rounds: Vec<(usize, usize)>,
    pruned: Vec<PrunedLeaf>,
}

impl TripletDistAnalysis {
    /// Runs the analysis over two trees on the same leaf set.
    pub fn new(tree1: &Tree, tree2: &Tree) -> Result<Self, Error> {
        let tas1 = TreeSplitSet::new(tree1)?;
        let tas2 = TreeSplitSet::new(tree2)?;
        tas1.same_leaf_set(&tas2)?;

        let t1 = TripletTable::new(&tas1);
        let t2 = TripletTable::new(&tas2);
        let mut dist = TripletDist::new(&t1, &t2)?;

        let mut rounds = Vec::new();
        let mut pruned = Vec::new();
        let mut pruned_inds: BTreeSet<usize> = BTreeSet::new();
        loop {
            let dc = dist.calc_diff_comp(&pruned_inds);
            rounds.push(dc);
            if dc.0 < 1 {
                break;
            }
            let highest = dist.get_highest_dist(&pruned_inds);
            let most_recent = *highest
                .iter()
                .next()
                .ok_or(Error::Invariant("differences without a worst leaf"))?;
            pruned_inds.insert(most_recent);
            pruned.push(PrunedLeaf {
                index: most_recent,
                id: tas1.id(most_recent),
                node1: tas1.leaf_node(most_recent),
                node2: tas2.leaf_node(most_recent),
                diff_comp: dist.diff_comp_for_index(most_recent),
            });
        }

        Ok(TripletDistAnalysis { rounds, pruned })
    }

    /// Number of recorded rounds (the last one has no differences left).
    pub fn num_rounds(&self) -> usize {
        self.rounds.len()
    }

    /// `(conflicting, comparable)` totals for one round.
    pub fn diff_comp_for_round(&self, round: usize) -> (usize, usize) {
        self.rounds[round]
    }

    /// The leaf pruned after one round, if the round had differences.
    pub fn pruned_after_round(&self, round: usize) -> Option<&PrunedLeaf> {
        self.pruned.get(round)
    }

    /// All pruned leaves, in pruning order.
    pub fn pruned(&self) -> &[PrunedLeaf] {
        &self.pruned
    }
}
