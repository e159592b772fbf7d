// Copyright (c) 2022, MaidSafe.
// All rights reserved.
//
// This SAFE Network Software is licensed under the BSD-3-Clause license.
// Please see the LICENSE file for more details.

use super::solution::{ComponentRef, Solution, SolutionRef};

/// Undo record for one component merger.
///
/// `splice_at` is the survivor's element count before the absorbed
/// component's elements were appended; splitting the vector there hands the
/// tail back.  `absorbed == None` records a merge with a trivial singleton,
/// undone by popping the one appended position.
#[derive(Debug)]
pub(crate) struct MergeRollback {
    pub survivor: ComponentRef,
    pub absorbed: Option<ComponentRef>,
    pub splice_at: usize,
    pub old_solution: Option<SolutionRef>,
}

impl MergeRollback {
    /// Undoes the recorded merger inside `sol`.
    fn unmerge(&self, sol: &mut Solution) {
        let mut survivor = self.survivor.borrow_mut();
        match &self.absorbed {
            Some(absorbed) => {
                let tail = survivor.elements.split_off(self.splice_at);
                let mut abs = absorbed.borrow_mut();
                debug_assert!(abs.elements.is_empty());
                for &x in &tail {
                    sol.component_for_index[x] = Some(absorbed.clone());
                }
                abs.elements = tail;
            }
            None => {
                let index = survivor
                    .elements
                    .pop()
                    .expect("unmerge of an empty component");
                sol.component_for_index[index] = None;
            }
        }

        if self.old_solution.is_some() {
            survivor.solution = self.old_solution.clone();
        }

        survivor.old_solutions.clear();
        debug_assert!(survivor.new_splits.is_empty());
    }
}

/// Undo record for one solver pass over one [`Solution`].
///
/// Holds shared handles into the living solution; the top-level call owns
/// the log for the duration of the call, drains it in reverse on failure
/// and discards it on success.
#[derive(Debug)]
pub(crate) struct SolutionRollback {
    solution: SolutionRef,
    n_old_implied_splits: usize,
    pub merges: Vec<MergeRollback>,
    pub n_orig_components: Option<usize>,
    pub old_components: Option<Vec<ComponentRef>>,
}

impl SolutionRollback {
    pub fn new(solution: SolutionRef) -> Self {
        let n_old_implied_splits = solution.borrow().implied_splits.len();
        SolutionRollback {
            solution,
            n_old_implied_splits,
            merges: Vec::new(),
            n_orig_components: None,
            old_components: None,
        }
    }

    /// Restores the solution to its state before the recorded pass.
    pub fn rollback(mut self) {
        let mut sol = self.solution.borrow_mut();

        debug_assert!(self.n_old_implied_splits <= sol.implied_splits.len());
        sol.implied_splits.truncate(self.n_old_implied_splits);

        // A pass that started with no components is undone wholesale.
        if self.n_orig_components == Some(0) {
            sol.components.clear();
            for owner in sol.component_for_index.iter_mut() {
                *owner = None;
            }
            return;
        }

        for merge in self.merges.iter().rev() {
            merge.unmerge(&mut sol);
        }

        // Components created while merging sit at the tail of the unpacked
        // vector and must be empty again after the unmerges; restoring the
        // snapshot and truncating drops them.
        if let Some(unpacked) = self.old_components.take() {
            let n_orig = self
                .n_orig_components
                .expect("component snapshot without an original count");
            sol.components = unpacked;
            debug_assert!(sol.components[n_orig..]
                .iter()
                .all(|c| c.borrow().elements.is_empty()));
            debug_assert!(n_orig <= sol.components.len());
            sol.components.truncate(n_orig);
            debug_assert!(sol
                .components
                .iter()
                .all(|c| !c.borrow().elements.is_empty()));
        }
    }
}
