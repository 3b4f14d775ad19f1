//! Flatten/unflatten boundary adapter
//!
//! Converts a [`Tree`] into a flat leaf sequence plus a [`TreeSpec`]
//! structure descriptor and back. This is the only surface the external
//! array/autodiff engine and the persistence collaborator see; the entire
//! obligation toward them is round-trip fidelity.
//!
//! Two properties the descriptor carries beyond plain shape:
//! - Leaf *identities* occupy one slot each: paths aliasing the same
//!   allocation share a slot index, and unflatten restores the aliasing.
//! - Frozen leaves are embedded in the descriptor as static entries and do
//!   not appear in the flat sequence, keeping them opaque to the numeric
//!   traversal.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::TreeError;
use crate::leaf::{Leaf, LeafId};
use crate::node::{Node, Seq, Tree};

/// Structure descriptor node
#[derive(Debug, Clone, PartialEq)]
pub enum SpecNode {
    /// Named-field level, fields in canonical order
    Tree(Vec<(String, SpecNode)>),
    /// Index-addressed level
    Seq(Vec<SpecNode>),
    /// Dynamic leaf: index into the flat leaf sequence
    Slot {
        /// Position in the flat sequence; aliased paths share a position
        index: usize,
        /// Registered tag of the leaf type at flatten time
        tag: &'static str,
    },
    /// Leaf embedded in the descriptor, opaque to numeric traversal
    Static(Leaf),
}

/// Structure descriptor sufficient to rebuild a tree from its leaf sequence
#[derive(Debug, Clone, PartialEq)]
pub struct TreeSpec {
    fields: Vec<(String, SpecNode)>,
    leaf_count: usize,
}

impl TreeSpec {
    /// Number of distinct dynamic leaves the descriptor expects
    #[inline]
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    /// Root-level field descriptors in canonical order
    #[inline]
    #[must_use]
    pub fn fields(&self) -> &[(String, SpecNode)] {
        &self.fields
    }

    /// Serializable shape summary for the persistence collaborator
    #[must_use]
    pub fn summary(&self) -> SpecSummary {
        SpecSummary::Tree(
            self.fields
                .iter()
                .map(|(name, child)| (name.clone(), summarize(child)))
                .collect(),
        )
    }
}

/// Serializable summary of a descriptor's shape
///
/// Static entries are summarized by tag only; their values stay with the
/// in-memory descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecSummary {
    /// Named-field level
    Tree(Vec<(String, SpecSummary)>),
    /// Index-addressed level
    Seq(Vec<SpecSummary>),
    /// Dynamic leaf slot
    Slot {
        /// Position in the flat sequence
        index: usize,
        /// Leaf type tag
        tag: String,
    },
    /// Embedded static leaf
    Static {
        /// Leaf type tag
        tag: String,
    },
}

fn summarize(spec: &SpecNode) -> SpecSummary {
    match spec {
        SpecNode::Tree(fields) => SpecSummary::Tree(
            fields
                .iter()
                .map(|(name, child)| (name.clone(), summarize(child)))
                .collect(),
        ),
        SpecNode::Seq(items) => SpecSummary::Seq(items.iter().map(summarize).collect()),
        SpecNode::Slot { index, tag } => SpecSummary::Slot {
            index: *index,
            tag: (*tag).to_string(),
        },
        SpecNode::Static(leaf) => SpecSummary::Static {
            tag: leaf.tag().to_string(),
        },
    }
}

/// Flatten a tree into its leaf sequence and structure descriptor
#[must_use]
pub fn flatten(tree: &Tree) -> (Vec<Leaf>, TreeSpec) {
    let mut leaves = Vec::new();
    let mut seen: HashMap<LeafId, usize> = HashMap::new();

    let fields = tree
        .iter()
        .map(|(name, child)| (name.to_string(), spec_node(child, &mut leaves, &mut seen)))
        .collect();

    let leaf_count = leaves.len();
    tracing::trace!("flattened tree into {} dynamic leaves", leaf_count);
    (leaves, TreeSpec { fields, leaf_count })
}

fn spec_node(node: &Node, leaves: &mut Vec<Leaf>, seen: &mut HashMap<LeafId, usize>) -> SpecNode {
    match node {
        Node::Leaf(leaf) if leaf.is_frozen() => SpecNode::Static(leaf.clone()),
        Node::Leaf(leaf) => {
            let index = *seen.entry(leaf.id()).or_insert_with(|| {
                leaves.push(leaf.clone());
                leaves.len() - 1
            });
            SpecNode::Slot {
                index,
                tag: leaf.tag(),
            }
        }
        Node::Tree(tree) => SpecNode::Tree(
            tree.iter()
                .map(|(name, child)| (name.to_string(), spec_node(child, leaves, seen)))
                .collect(),
        ),
        Node::Seq(seq) => SpecNode::Seq(
            seq.iter()
                .map(|child| spec_node(child, leaves, seen))
                .collect(),
        ),
    }
}

/// Rebuild a tree from a structure descriptor and a flat leaf sequence
///
/// Aliased slots receive clones of the same handle, so aliasing present at
/// flatten time is restored by identity.
///
/// # Errors
/// Fails with [`TreeError::LeafCount`] when the sequence length disagrees
/// with the descriptor.
pub fn unflatten(
    spec: &TreeSpec,
    leaves: impl IntoIterator<Item = Leaf>,
) -> Result<Tree, TreeError> {
    let leaves: Vec<Leaf> = leaves.into_iter().collect();
    if leaves.len() != spec.leaf_count {
        return Err(TreeError::LeafCount {
            expected: spec.leaf_count,
            got: leaves.len(),
        });
    }

    let mut map = IndexMap::new();
    for (name, child) in &spec.fields {
        map.insert(name.clone(), build_node(child, &leaves)?);
    }
    Ok(Tree::from_fields(map))
}

fn build_node(spec: &SpecNode, leaves: &[Leaf]) -> Result<Node, TreeError> {
    match spec {
        SpecNode::Slot { index, .. } => {
            leaves
                .get(*index)
                .cloned()
                .map(Node::Leaf)
                .ok_or(TreeError::LeafCount {
                    expected: index + 1,
                    got: leaves.len(),
                })
        }
        SpecNode::Static(leaf) => Ok(Node::Leaf(leaf.clone())),
        SpecNode::Tree(fields) => {
            let mut map = IndexMap::new();
            for (name, child) in fields {
                map.insert(name.clone(), build_node(child, leaves)?);
            }
            Ok(Node::Tree(Tree::from_fields(map)))
        }
        SpecNode::Seq(items) => {
            let children = items
                .iter()
                .map(|child| build_node(child, leaves))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Node::Seq(Seq::new(children)))
        }
    }
}

impl Tree {
    /// Flatten this tree; see [`flatten`]
    #[must_use]
    pub fn flatten(&self) -> (Vec<Leaf>, TreeSpec) {
        flatten(self)
    }
}
