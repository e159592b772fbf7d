// Copyright (c) 2022, MaidSafe.
// All rights reserved.
//
// This SAFE Network Software is licensed under the BSD-3-Clause license.
// Please see the LICENSE file for more details.

//! The incremental BUILD solver.
//!
//! [`extend_solution`] adds a batch of rooted splits to a (possibly already
//! populated) [`Solution`], merging components and recursing into the
//! affected sub-problems.  Inconsistency is a normal signal, not an error:
//! the call returns `false` and, in rollback mode, leaves the solution
//! byte-equivalent to its state before the call.
//!
//! [`build_tree`] and [`check_consistent`] are the one-shot wrappers over a
//! fresh solution.

use std::cell::RefCell;
use std::rc::Rc;

use log::trace;

use super::rollback::{MergeRollback, SolutionRollback};
use super::solution::{Component, ComponentRef, SolutionRef};
use super::tree::Tree;
use super::{RSplit, Solution};

/// Transient map from taxon id to its position in the current level's taxon
/// list.
///
/// One scratch vector serves a whole subproblem: it is sized to the largest
/// level seen and must be fully reset between levels, which the solver does
/// by clearing exactly the slots it set.  Passing it as an explicit mutable
/// borrow keeps the solver free of global state.
#[derive(Debug, Default)]
pub struct TaxonScratch {
    slots: Vec<Option<usize>>,
}

impl TaxonScratch {
    /// Creates an empty scratch map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Grows the map to cover taxon ids below `n`.
    pub fn ensure(&mut self, n: usize) {
        if self.slots.len() < n {
            self.slots.resize(n, None);
        }
    }

    fn init(&mut self, taxa: &[usize]) {
        debug_assert!(self.slots.iter().all(|s| s.is_none()));
        for (i, &taxon) in taxa.iter().enumerate() {
            self.slots[taxon] = Some(i);
        }
    }

    fn clear(&mut self, taxa: &[usize]) {
        for &taxon in taxa {
            self.slots[taxon] = None;
        }
    }

    #[inline]
    fn get(&self, taxon: usize) -> Option<usize> {
        self.slots[taxon]
    }
}

fn exclude_group_intersects_taxon_set(split: &RSplit, scratch: &TaxonScratch) -> bool {
    split.exclude().iter().any(|&t| scratch.get(t).is_some())
}

/// Merges two distinct components; the larger one survives.  Returns the
/// survivor.
fn merge_components(
    mut c1: ComponentRef,
    mut c2: ComponentRef,
    component_for_index: &mut [Option<ComponentRef>],
    merges: &mut Vec<MergeRollback>,
    record: bool,
) -> ComponentRef {
    if c2.borrow().elements.len() > c1.borrow().elements.len() {
        std::mem::swap(&mut c1, &mut c2);
    }

    let mut b1 = c1.borrow_mut();
    let mut b2 = c2.borrow_mut();

    for &i in &b2.elements {
        component_for_index[i] = Some(c1.clone());
    }

    let old_solution = b1.solution.clone();
    if let Some(sol) = &old_solution {
        // Reverting must be able to restore this exact solution pointer.
        debug_assert!(b1.old_solutions.is_empty());
        b1.old_solutions.push(sol.clone());
    }
    if let Some(sol) = &b2.solution {
        b1.old_solutions.push(sol.clone());
    }

    if record {
        merges.push(MergeRollback {
            survivor: c1.clone(),
            absorbed: Some(c2.clone()),
            splice_at: b1.elements.len(),
            old_solution,
        });
    }

    // One of these components could be new, composed only of
    // previously-trivial singletons.
    let absorbed_old: Vec<SolutionRef> = b2.old_solutions.iter().cloned().collect();
    b1.old_solutions.extend(absorbed_old);

    b1.solution = None;

    let moved: Vec<usize> = b2.elements.drain(..).collect();
    b1.elements.extend(moved);

    drop(b1);
    drop(b2);
    c1
}

/// Absorbs a trivial singleton into a component.
fn merge_component_with_trivial(
    c1: &ComponentRef,
    index2: usize,
    component_for_index: &mut [Option<ComponentRef>],
    merges: &mut Vec<MergeRollback>,
    record: bool,
) {
    component_for_index[index2] = Some(c1.clone());

    let mut b1 = c1.borrow_mut();

    let old_solution = b1.solution.clone();
    if let Some(sol) = &old_solution {
        debug_assert!(b1.old_solutions.is_empty());
        b1.old_solutions.push(sol.clone());
    }

    if record {
        merges.push(MergeRollback {
            survivor: c1.clone(),
            absorbed: None,
            splice_at: 0,
            old_solution,
        });
    }

    b1.solution = None;
    b1.elements.push(index2);
}

/// Merges every taxon of `group` into a single component.
fn merge_group<I: IntoIterator<Item = usize>>(
    group: I,
    components: &mut Vec<ComponentRef>,
    component_for_index: &mut Vec<Option<ComponentRef>>,
    merges: &mut Vec<MergeRollback>,
    record: bool,
    scratch: &TaxonScratch,
) {
    let mut split_comp: Option<ComponentRef> = None;
    for taxon in group {
        let index = scratch.get(taxon).expect("taxon outside the current level");
        let taxon_comp = component_for_index[index].clone();
        match (split_comp.clone(), taxon_comp) {
            (None, None) => {
                let fresh = Rc::new(RefCell::new(Component::default()));
                components.push(fresh.clone());
                merge_component_with_trivial(&fresh, index, component_for_index, merges, record);
                split_comp = Some(fresh);
            }
            (None, Some(existing)) => {
                split_comp = Some(existing);
            }
            (Some(comp), None) => {
                merge_component_with_trivial(&comp, index, component_for_index, merges, record);
            }
            (Some(comp), Some(existing)) => {
                if !Rc::ptr_eq(&comp, &existing) {
                    let survivor =
                        merge_components(comp, existing, component_for_index, merges, record);
                    split_comp = Some(survivor);
                }
            }
        }
    }
}

/// If the one pending sub-solution covers exactly this taxon set, adopt it
/// wholesale; the pending splits still get processed against it.
fn maybe_reuse_solution(solution: &mut SolutionRef, sub_solutions: &mut Vec<SolutionRef>) {
    if sub_solutions.len() == 1
        && sub_solutions[0].borrow().taxa.len() == solution.borrow().taxa.len()
    {
        let prev = sub_solutions[0].clone();
        debug_assert!(same_taxon_set(&prev.borrow().taxa, &solution.borrow().taxa));
        // Adopting only makes sense into a blank slate.
        debug_assert!(solution.borrow().implied_splits.is_empty());
        debug_assert!(solution
            .borrow()
            .non_implied_splits_from_components()
            .is_empty());
        *solution = prev;
        sub_solutions.clear();
    }
}

fn same_taxon_set(a: &[usize], b: &[usize]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut a2 = a.to_vec();
    let mut b2 = b.to_vec();
    a2.sort_unstable();
    b2.sort_unstable();
    a2 == b2
}

/// Splits vacuous at this level move to the implied list; sub-solutions
/// whose pass-through splits would stay vacuous here are expanded back into
/// their constituent pieces.
fn remove_implied_splits(
    solution: &SolutionRef,
    new_splits: &mut Vec<RSplit>,
    sub_solutions: &mut Vec<SolutionRef>,
    scratch: &mut TaxonScratch,
) {
    if new_splits.is_empty() && sub_solutions.is_empty() {
        return;
    }

    scratch.init(&solution.borrow().taxa);

    let mut k = new_splits.len();
    while k > 0 {
        k -= 1;
        if !exclude_group_intersects_taxon_set(&new_splits[k], scratch) {
            let split = new_splits.swap_remove(k);
            solution.borrow_mut().implied_splits.push(split);
        }
    }

    let mut k = sub_solutions.len();
    while k > 0 {
        k -= 1;
        let sub = sub_solutions[k].clone();
        debug_assert!(!Rc::ptr_eq(solution, &sub));

        // A pass-through split that is vacuous at this level no longer
        // justifies keeping the bundle glued; expand the sub-solution and
        // hand its splits back into the right category.
        let mut punctured = false;
        {
            let subb = sub.borrow();
            for (i, split) in subb.implied_splits.iter().enumerate() {
                let implied = !exclude_group_intersects_taxon_set(split, scratch);
                if implied && !punctured {
                    punctured = true;
                    for prev in &subb.implied_splits[..i] {
                        new_splits.push(prev.clone());
                    }
                }
                if punctured {
                    if implied {
                        solution.borrow_mut().implied_splits.push(split.clone());
                    } else {
                        new_splits.push(split.clone());
                    }
                }
            }
        }

        if punctured {
            {
                let subb = sub.borrow();
                for fragment in &subb.components {
                    let frag_solution = fragment
                        .borrow()
                        .solution
                        .clone()
                        .expect("expanded component without a solution");
                    sub_solutions.push(frag_solution);
                }
            }
            sub_solutions.swap_remove(k);
        }
    }

    scratch.clear(&solution.borrow().taxa);
}

/// Component-merging pass over one level's workload.
fn merge_workload(
    solution: &SolutionRef,
    new_splits: &[RSplit],
    sub_solutions: &[SolutionRef],
    rb: &mut SolutionRollback,
    scratch: &TaxonScratch,
    use_rollback: bool,
) {
    let mut sol = solution.borrow_mut();
    let n_taxa = sol.taxa.len();

    rb.n_orig_components = Some(sol.components.len());
    let has_initial_components = !sol.components.is_empty();
    // A pass that started with no components rolls back by clearing, so
    // individual merge records are only needed past the first pass.
    let record = use_rollback && has_initial_components;

    let Solution {
        ref mut components,
        ref mut component_for_index,
        ..
    } = *sol;

    for split in new_splits {
        merge_group(
            split.include().iter().cloned(),
            components,
            component_for_index,
            &mut rb.merges,
            record,
            scratch,
        );
    }
    for sub in sub_solutions {
        let group = sub.borrow().taxa.clone();
        debug_assert!(group.len() < n_taxa);
        merge_group(
            group,
            components,
            component_for_index,
            &mut rb.merges,
            record,
            scratch,
        );
    }

    // Pack: drop components emptied by merging, keeping the unpacked vector
    // for rollback.
    let packed: Vec<ComponentRef> = components
        .iter()
        .filter(|c| !c.borrow().elements.is_empty())
        .cloned()
        .collect();
    let unpacked = std::mem::replace(components, packed);
    rb.old_components = Some(unpacked);
}

/// Hands each split and sub-solution down to the component owning its first
/// taxon (merging has put the whole group there).
fn assign(
    solution: &SolutionRef,
    new_splits: Vec<RSplit>,
    sub_solutions: Vec<SolutionRef>,
    scratch: &TaxonScratch,
) {
    let sol = solution.borrow();

    for split in new_splits {
        let first = scratch
            .get(split.include()[0])
            .expect("split taxon outside the current level");
        let component = sol.component_for_index[first]
            .clone()
            .expect("merged taxon without a component");
        component.borrow_mut().new_splits.push(split);
    }

    for sub in sub_solutions {
        let first_taxon = sub.borrow().taxa[0];
        let first = scratch
            .get(first_taxon)
            .expect("sub-solution taxon outside the current level");
        let component = sol.component_for_index[first]
            .clone()
            .expect("merged taxon without a component");
        component.borrow_mut().old_solutions.push(sub);
    }
}

/// Recurses into every component.  After a failure the remaining components
/// are still visited, but only to drain their pending workloads so rollback
/// sees a clean state.
fn solve_subproblems(
    solution: &SolutionRef,
    log: &mut Vec<SolutionRollback>,
    scratch: &mut TaxonScratch,
    use_rollback: bool,
) -> bool {
    let (components, taxa) = {
        let sol = solution.borrow();
        (sol.components.clone(), sol.taxa.clone())
    };

    let mut failed = false;
    for component in &components {
        let (comp_new_splits, comp_sub_solutions) = {
            let mut comp = component.borrow_mut();
            debug_assert!(comp.elements.len() >= 2);
            (
                std::mem::replace(&mut comp.new_splits, Vec::new()),
                std::mem::replace(&mut comp.old_solutions, Vec::new()),
            )
        };

        if failed {
            continue;
        }

        // A merge invalidated this component's solution; start a fresh one
        // over its taxa.
        if component.borrow().solution.is_none() {
            let child_taxa = component.borrow().get_taxa(&taxa);
            component.borrow_mut().solution = Some(Solution::shared(child_taxa));
        }

        let mut child = component
            .borrow()
            .solution
            .clone()
            .expect("component without a solution");
        let ok = build_inc_a(
            &mut child,
            comp_new_splits,
            comp_sub_solutions,
            log,
            scratch,
            false,
            use_rollback,
        );
        // The child handle may have been swapped for a reused solution.
        component.borrow_mut().solution = Some(child);

        if !ok {
            failed = true;
        }
    }

    !failed
}

/// One level of the incremental solver.
fn build_inc_a(
    solution: &mut SolutionRef,
    mut new_splits: Vec<RSplit>,
    mut sub_solutions: Vec<SolutionRef>,
    log: &mut Vec<SolutionRollback>,
    scratch: &mut TaxonScratch,
    top: bool,
    use_rollback: bool,
) -> bool {
    // 1. Adopt a previous solution to this exact problem, if one arrived.
    maybe_reuse_solution(solution, &mut sub_solutions);

    // 2. A pre-existing solution needs a rollback record; a fresh one is
    //    cheaper to discard wholesale.
    let solution_is_new = {
        let mut sol = solution.borrow_mut();
        let fresh = sol.visited == 0;
        sol.visited += 1;
        fresh
    };
    let mut rb = SolutionRollback::new(solution.clone());

    // 3. Move vacuous splits aside; expand punctured sub-solutions.
    if !top {
        remove_implied_splits(solution, &mut new_splits, &mut sub_solutions, scratch);
    }

    // 4. Nothing left to add: consistent.
    if new_splits.is_empty() && sub_solutions.is_empty() {
        if use_rollback && !solution_is_new {
            log.push(rb);
        }
        return true;
    }

    scratch.init(&solution.borrow().taxa);

    // 5. Merge the workload into components.
    merge_workload(solution, &new_splits, &sub_solutions, &mut rb, scratch, use_rollback);

    if use_rollback && !solution_is_new {
        log.push(rb);
    }

    // 6. One component holding every taxon means the workload is
    //    inconsistent at this level.
    if solution.borrow().all_taxa_in_one_component() {
        scratch.clear(&solution.borrow().taxa);
        return false;
    }

    // 7. Distribute the workload over the components.
    assign(solution, new_splits, sub_solutions, scratch);

    scratch.clear(&solution.borrow().taxa);

    // 8. Recurse.
    solve_subproblems(solution, log, scratch, use_rollback)
}

/// Adds a batch of splits to `solution`.
///
/// Returns `true` when the splits are jointly consistent with the solution,
/// which is then extended in place.  On failure with `use_rollback` set the
/// solution is restored to its prior state; without it the solution is left
/// dirty and the caller is expected to rebuild from its last known good
/// split list.
pub fn extend_solution(
    solution: &mut SolutionRef,
    new_splits: Vec<RSplit>,
    use_rollback: bool,
    scratch: &mut TaxonScratch,
) -> bool {
    if let Some(max) = solution.borrow().taxa.iter().max() {
        scratch.ensure(max + 1);
    }

    let n_new = new_splits.len();
    let mut log: Vec<SolutionRollback> = Vec::new();
    let ok = build_inc_a(
        solution,
        new_splits,
        Vec::new(),
        &mut log,
        scratch,
        true,
        use_rollback,
    );

    if !ok && use_rollback {
        for rb in log.drain(..).rev() {
            rb.rollback();
        }
    }
    trace!(
        "BUILD: {} new split(s) -> {}",
        n_new,
        if ok { "ok" } else { "inconsistent" }
    );

    ok
}

/// Runs BUILD over a fresh solution and reports whether `splits` are
/// jointly displayable by a single rooted tree on `all_leaves`.
pub fn check_consistent(all_leaves: &[usize], splits: &[RSplit]) -> bool {
    let mut solution = Solution::shared(all_leaves.to_vec());
    let mut scratch = TaxonScratch::new();
    extend_solution(&mut solution, splits.to_vec(), true, &mut scratch)
}

/// Runs BUILD over a fresh solution and returns a displaying tree, or None
/// when the splits are inconsistent.
///
/// Tips of the returned tree carry leaf *indices* as their external ids.
pub fn build_tree(all_leaves: &[usize], splits: &[RSplit]) -> Option<Tree> {
    let mut solution = Solution::shared(all_leaves.to_vec());
    let mut scratch = TaxonScratch::new();
    if extend_solution(&mut solution, splits.to_vec(), true, &mut scratch) {
        let tree = solution.borrow().get_tree();
        Some(tree)
    } else {
        None
    }
}
