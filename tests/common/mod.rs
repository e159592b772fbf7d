// Copyright (c) 2022, MaidSafe.
// All rights reserved.
//
// This SAFE Network Software is licensed under the BSD-3-Clause license.
// Please see the LICENSE file for more details.

//! Helpers shared by the scenario tests.

use supertree::{NodeId, OttId, Tree};

/// A clade description for building small test trees by hand.
#[derive(Debug, Clone)]
pub enum Clade {
    Tip(OttId),
    Node(Vec<Clade>),
}

pub fn tip(id: OttId) -> Clade {
    Clade::Tip(id)
}

pub fn node(children: Vec<Clade>) -> Clade {
    Clade::Node(children)
}

/// Builds a tree from a clade description.
pub fn tree_of(clade: Clade) -> Tree {
    let mut tree = Tree::new();
    let root = tree.create_root();
    match clade {
        Clade::Tip(id) => tree.set_ott_id(root, id),
        Clade::Node(children) => {
            for child in children {
                attach(&mut tree, root, child);
            }
        }
    }
    tree
}

fn attach(tree: &mut Tree, parent: NodeId, clade: Clade) {
    let nd = tree.create_child(parent);
    match clade {
        Clade::Tip(id) => tree.set_ott_id(nd, id),
        Clade::Node(children) => {
            for child in children {
                attach(tree, nd, child);
            }
        }
    }
}
