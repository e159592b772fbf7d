// Copyright (c) 2022, MaidSafe.
// All rights reserved.
//
// This SAFE Network Software is licensed under the BSD-3-Clause license.
// Please see the LICENSE file for more details.

use std::cell::RefCell;
use std::rc::Rc;

use super::tree::{OttId, Tree};
use super::RSplit;

/// Shared handle to a [`Solution`].
///
/// Sub-solutions are transferred between parents when a subproblem's taxon
/// set matches a previously solved one, so they need shared ownership.
pub type SolutionRef = Rc<RefCell<Solution>>;

/// Shared handle to a [`Component`].
pub type ComponentRef = Rc<RefCell<Component>>;

/// A non-trivial component at one level of the BUILD recursion: a maximal
/// group of taxa currently required to be together.
///
/// `elements` are positions into the owning [`Solution`]'s taxon list, in
/// merge order.  Between solver calls the pending workloads (`new_splits`,
/// `old_solutions`) are empty.
#[derive(Debug, Default)]
pub struct Component {
    /// Positions (into the owning solution's `taxa`) merged into this
    /// component.
    pub elements: Vec<usize>,
    /// The solved sub-problem for this component, if still valid.
    pub solution: Option<SolutionRef>,
    /// Splits to be processed when this component is next recursed into.
    pub new_splits: Vec<RSplit>,
    /// Prior sub-solutions to be absorbed on the next recursion.
    pub old_solutions: Vec<SolutionRef>,
}

impl Component {
    /// The taxa of this component, looked up in the owning solution's list.
    pub fn get_taxa(&self, other_taxa: &[usize]) -> Vec<usize> {
        self.elements.iter().map(|&i| other_taxa[i]).collect()
    }
}

/// The recursive BUILD state for one taxon set: a partition of the taxa
/// into non-trivial components (each owning a child solution) plus implicit
/// trivial singletons.
///
/// Invariants at every stable state:
/// * the component element lists plus the trivial singletons partition
///   `0..taxa.len()`;
/// * `component_for_index[i]` points at the component holding position `i`
///   (None = trivial singleton);
/// * `visited == 0` exactly for a freshly created solution.
#[derive(Debug, Default)]
pub struct Solution {
    /// The taxa of this sub-problem (leaf indices of the enclosing
    /// subproblem).
    pub taxa: Vec<usize>,
    /// Splits vacuously satisfied at this level: their exclude group does
    /// not intersect `taxa`.  They pass through unchanged and are
    /// re-examined whenever this solution is redeployed under a larger
    /// taxon set.
    pub implied_splits: Vec<RSplit>,
    /// Component owning each position of `taxa`, None for singletons.
    pub component_for_index: Vec<Option<ComponentRef>>,
    /// The non-trivial components.
    pub components: Vec<ComponentRef>,
    /// Number of solver passes over this solution; zero means fresh.
    pub visited: u32,
}

impl Solution {
    /// Creates a fresh solution over a taxon list.
    pub fn new(taxa: Vec<usize>) -> Self {
        let n = taxa.len();
        Solution {
            taxa,
            implied_splits: Vec::new(),
            component_for_index: vec![None; n],
            components: Vec::new(),
            visited: 0,
        }
    }

    /// Creates a fresh shared solution over a taxon list.
    pub fn shared(taxa: Vec<usize>) -> SolutionRef {
        Rc::new(RefCell::new(Self::new(taxa)))
    }

    /// True when a single component holds every taxon; at the top level
    /// this is the BUILD failure condition.
    pub fn all_taxa_in_one_component(&self) -> bool {
        match self.component_for_index.first() {
            Some(Some(c)) => c.borrow().elements.len() == self.taxa.len(),
            _ => false,
        }
    }

    /// Splits displayed below this solution, not counting this level's
    /// implied splits.
    pub fn non_implied_splits_from_components(&self) -> Vec<RSplit> {
        let mut splits = Vec::new();
        for component in &self.components {
            let comp = component.borrow();
            if let Some(sub) = &comp.solution {
                splits.extend(sub.borrow().splits_from_components());
            }
        }
        splits
    }

    /// All splits this solution currently accounts for.
    pub fn splits_from_components(&self) -> Vec<RSplit> {
        let mut splits = self.non_implied_splits_from_components();
        splits.extend(self.implied_splits.iter().cloned());
        splits
    }

    /// Number of splits this solution currently accounts for.
    pub fn n_splits_from_components(&self) -> usize {
        let mut n = self.implied_splits.len();
        for component in &self.components {
            let comp = component.borrow();
            if let Some(sub) = &comp.solution {
                n += sub.borrow().n_splits_from_components();
            }
        }
        n
    }

    /// Checks that every component carries a solved sub-problem, recursively.
    pub fn valid(&self) -> bool {
        self.components.iter().all(|component| {
            let comp = component.borrow();
            match &comp.solution {
                Some(sub) => sub.borrow().valid(),
                None => false,
            }
        })
    }

    /// Extracts the solved tree.
    ///
    /// Tips carry the taxon index as their external id; the driver remaps
    /// indices back to real ids afterwards.
    pub fn get_tree(&self) -> Tree {
        let mut tree = Tree::new();
        let root = tree.create_root();
        self.attach_to(&mut tree, root);
        tree
    }

    fn attach_to(&self, tree: &mut Tree, at: usize) {
        // children for the non-trivial components, then the singletons
        for component in &self.components {
            let comp = component.borrow();
            let sub = comp
                .solution
                .as_ref()
                .expect("component without a solved sub-problem");
            let child = tree.create_child(at);
            sub.borrow().attach_to(tree, child);
        }
        for (index, owner) in self.component_for_index.iter().enumerate() {
            if owner.is_none() {
                let tip = tree.create_child(at);
                tree.set_ott_id(tip, self.taxa[index] as OttId);
            }
        }
    }
}
