// Copyright (c) 2022, MaidSafe.
// All rights reserved.
//
// This SAFE Network Software is licensed under the BSD-3-Clause license.
// Please see the LICENSE file for more details.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::combine::CanonicalPolicy;
use super::induced::compute_depth;
use super::tree::{NodeId, OttId, Tree};
use super::Error;

/// A taxon that ended up outside its taxonomic ancestor in the summary:
/// `displaced` sits under `intended_parent` in the taxonomy but not in the
/// summary tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    /// External id of the displaced taxon.
    pub displaced: OttId,
    /// External id of its nearest named summary ancestor.
    pub intended_parent: OttId,
}

/// Inserts a fresh out-degree-one parent above `nd` and returns it.
pub(crate) fn add_monotypic_parent(tree: &mut Tree, nd: NodeId) -> NodeId {
    match tree.parent(nd) {
        Some(p) => {
            let monotypic = tree.create_child(p);
            tree.detach(nd);
            tree.add_child(monotypic, nd);
            monotypic
        }
        None => {
            let monotypic = tree.create_root();
            tree.add_child(monotypic, nd);
            monotypic
        }
    }
}

/// Copies the taxonomy's root and tip names (and the root id) onto the
/// summary.
pub(crate) fn add_root_and_tip_names(summary: &mut Tree, taxonomy: &Tree) -> Result<(), Error> {
    let summary_root = summary.root().ok_or(Error::EmptyTree)?;
    let taxonomy_root = taxonomy.root().ok_or(Error::EmptyTree)?;

    if let Some(name) = taxonomy.name(taxonomy_root) {
        let name = name.to_string();
        summary.set_name(summary_root, name);
    }
    if let Some(id) = taxonomy.ott_id(taxonomy_root) {
        summary.set_ott_id(summary_root, id);
    }

    let summary_ids = summary.ottid_to_node()?;
    for leaf in taxonomy.leaves() {
        let id = taxonomy.ott_id(leaf).ok_or(Error::MissingTipId)?;
        let nd = *summary_ids.get(&id).ok_or(Error::UnknownId(id))?;
        if let Some(name) = taxonomy.name(leaf) {
            let name = name.to_string();
            summary.set_name(nd, name);
        }
    }
    Ok(())
}

/// Walks up from the node holding the first id until the descendant set
/// covers all of `ids`.
fn find_mrca_of_desids(
    ids: &BTreeSet<OttId>,
    summary: &Tree,
    summary_ids: &HashMap<OttId, NodeId>,
    des: &[BTreeSet<OttId>],
) -> Result<NodeId, Error> {
    let first = *ids.iter().next().ok_or(Error::Invariant("empty taxon"))?;
    let mut node = *summary_ids.get(&first).ok_or(Error::UnknownId(first))?;
    while !ids.is_subset(&des[node]) {
        node = summary
            .parent(node)
            .ok_or(Error::Invariant("taxon not covered by the summary root"))?;
    }
    Ok(node)
}

/// Is `n1` a proper ancestor of `n2`?  Depth fields must be filled in.
fn is_ancestor_of(tree: &Tree, n1: NodeId, mut n2: NodeId) -> bool {
    debug_assert!(n1 == n2 || tree.depth(n1) != 0 || tree.depth(n2) != 0);
    if tree.depth(n2) <= tree.depth(n1) {
        return false;
    }
    while tree.depth(n2) != tree.depth(n1) {
        n2 = match tree.parent(n2) {
            Some(p) => p,
            None => return false,
        };
    }
    n1 == n2
}

/// The node that is an ancestor of every other node in the group, if a
/// unique one exists.
fn find_unique_maximum(tree: &Tree, nodes: &[NodeId]) -> Option<NodeId> {
    for (i, &candidate) in nodes.iter().enumerate() {
        let ancestor_of_all = nodes
            .iter()
            .enumerate()
            .all(|(j, &other)| j == i || is_ancestor_of(tree, candidate, other));
        if ancestor_of_all {
            return Some(candidate);
        }
    }
    None
}

fn select_canonical(
    taxonomy: &Tree,
    names: &[NodeId],
    policy: CanonicalPolicy,
) -> NodeId {
    debug_assert!(names.len() >= 2);
    match policy {
        CanonicalPolicy::FirstListed => names[0],
        CanonicalPolicy::SmallestId => *names
            .iter()
            .min_by_key(|&&nd| taxonomy.ott_id(nd).unwrap_or(OttId::max_value()))
            .unwrap_or(&names[0]),
    }
}

fn set_name_and_maybe_ott_id(taxonomy: &Tree, from: NodeId, summary: &mut Tree, to: NodeId) {
    if let Some(name) = taxonomy.name(from) {
        let name = name.to_string();
        summary.set_name(to, name);
    }
    if let Some(id) = taxonomy.ott_id(from) {
        summary.set_ott_id(to, id);
    }
}

/// Transfers the names of the surviving taxonomy nodes onto the summary.
///
/// Each taxon lands on the MRCA of its descendant leaves.  When several
/// names map to one summary node, unique root-most names peel off into
/// fresh out-degree-one parents; whatever remains picks a canonical name
/// per `policy` and the rest are logged as equivalent ids.
///
/// The taxonomy must have had [`compute_depth`] run on it.
pub(crate) fn add_names(
    summary: &mut Tree,
    taxonomy: &Tree,
    compatible_taxa: &[NodeId],
    policy: CanonicalPolicy,
) -> Result<(), Error> {
    let summary_ids = summary.ottid_to_node()?;
    let mut des = summary.descendant_id_sets();
    let taxonomy_des = taxonomy.descendant_id_sets();

    // group the taxa by the summary node their leaf set lands on
    let mut name_groups: BTreeMap<NodeId, Vec<NodeId>> = BTreeMap::new();
    for &taxon in compatible_taxa {
        let mrca = find_mrca_of_desids(&taxonomy_des[taxon], summary, &summary_ids, &des)?;
        name_groups.entry(mrca).or_insert_with(Vec::new).push(taxon);
        // The summary node may cover extra ids when an exempt taxon was
        // placed inside this group.
    }

    for (summary_node, mut names) in name_groups {
        // Peel unique root-most names into monotypic parents; this happens
        // when an exempt child of a taxon moved tip-ward and the remaining
        // group collapsed onto one node.
        while let Some(max) = find_unique_maximum(taxonomy, &names) {
            if names.len() == 1 {
                set_name_and_maybe_ott_id(taxonomy, max, summary, summary_node);
            } else {
                let p = add_monotypic_parent(summary, summary_node);
                debug_assert_eq!(p, des.len());
                let covered = des[summary_node].clone();
                des.push(covered);
                set_name_and_maybe_ott_id(taxonomy, max, summary, p);
            }
            names.retain(|&nd| nd != max);
            if names.is_empty() {
                break;
            }
        }

        if !names.is_empty() {
            let canonical = select_canonical(taxonomy, &names, policy);
            set_name_and_maybe_ott_id(taxonomy, canonical, summary, summary_node);
            names.retain(|&nd| nd != canonical);
            register_ottid_equivalences(taxonomy, canonical, &names);
        }
    }
    Ok(())
}

fn register_ottid_equivalences(taxonomy: &Tree, canonical: NodeId, names: &[NodeId]) {
    let list: Vec<String> = names
        .iter()
        .map(|&nd| taxonomy.name(nd).unwrap_or("<unnamed>").to_string())
        .collect();
    debug!(
        "{} (canonical): equivalent to {}",
        taxonomy.name(canonical).unwrap_or("<unnamed>"),
        list.join(" ")
    );
}

/// Nearest ancestor carrying an external id, or None when only the root is
/// left.
fn find_ancestor_id(tree: &Tree, mut nd: NodeId) -> Option<OttId> {
    while let Some(p) = tree.parent(nd) {
        if let Some(id) = tree.ott_id(p) {
            return Some(id);
        }
        nd = p;
    }
    None
}

fn is_ancestral_to(tree: &Tree, anc: NodeId, mut n1: NodeId) -> bool {
    if tree.depth(n1) < tree.depth(anc) {
        return false;
    }
    while tree.depth(n1) > tree.depth(anc) {
        n1 = match tree.parent(n1) {
            Some(p) => p,
            None => return false,
        };
    }
    n1 == anc
}

/// Finds summary taxa placed outside their taxonomic ancestor.
///
/// For every identified non-root summary node, the nearest identified
/// summary ancestor is compared against the taxonomy: if the node is not a
/// taxonomic descendant of that ancestor, the pair is reported.  Nodes that
/// are named but carry no id disable the check (with a warning), since the
/// comparison is id-based.
pub fn check_placement(summary: &Tree, taxonomy: &Tree) -> Result<Vec<Placement>, Error> {
    for nd in summary.postorder() {
        if summary.parent(nd).is_some()
            && summary.name(nd).is_some()
            && summary.ott_id(nd).is_none()
        {
            warn!("named summary node has no id; skipping the placement check");
            return Ok(Vec::new());
        }
    }

    let mut tax = taxonomy.clone();
    compute_depth(&mut tax);
    let node_from_id = tax.ottid_to_node()?;

    let mut placements = Vec::new();
    for nd in summary.postorder() {
        if summary.parent(nd).is_none() {
            continue;
        }
        let id = match summary.ott_id(nd) {
            Some(id) => id,
            None => continue,
        };
        let anc_id = match find_ancestor_id(summary, nd) {
            Some(anc) => anc,
            // ancestor is the root
            None => continue,
        };
        let tax_nd = *node_from_id.get(&id).ok_or(Error::UnknownId(id))?;
        let tax_anc = *node_from_id.get(&anc_id).ok_or(Error::UnknownId(anc_id))?;
        if !is_ancestral_to(&tax, tax_anc, tax_nd) {
            placements.push(Placement {
                displaced: id,
                intended_parent: anc_id,
            });
        }
    }
    Ok(placements)
}
