//! Leaf classification: mask and unmask
//!
//! [`mask`] hides auxiliary leaves from the numeric boundary by wrapping
//! them in [`Frozen`](arbor_tree::Frozen) sentinels; [`unmask`] restores
//! them. A masked tree still carries every value: flatten simply embeds
//! the frozen leaves in the structure descriptor instead of the flat
//! sequence, so the external gradient/optimizer collaborator only ever sees
//! the numeric leaves.

use std::collections::HashMap;

use arbor_tree::registry::LeafClass;
use arbor_tree::{Leaf, LeafId, Node, Seq, Token, Tree, TreeBuilder, TreePath};

/// Freeze every leaf whose registered class is not numeric
///
/// Unregistered leaf types freeze. Already-frozen leaves are left alone, so
/// `mask(mask(t)) == mask(t)`.
#[must_use]
pub fn mask(tree: &Tree) -> Tree {
    mask_with(tree, |_, leaf| leaf.class() != LeafClass::Numeric)
}

/// Freeze every leaf matching a predicate
///
/// The predicate sees the leaf's path and handle. Frozen leaves are skipped
/// before the predicate runs (idempotence), and aliased leaves are wrapped
/// once: paths sharing an allocation share the wrapper afterwards.
#[must_use]
pub fn mask_with<P>(tree: &Tree, mut predicate: P) -> Tree
where
    P: FnMut(&TreePath, &Leaf) -> bool,
{
    let mut wrapped: HashMap<LeafId, Leaf> = HashMap::new();
    let mut frozen_count = 0_usize;
    let mut path = TreePath::root();

    let result = rebuild(tree, &mut path, &mut |path, leaf| {
        if leaf.is_frozen() || !predicate(path, leaf) {
            return None;
        }
        frozen_count += 1;
        Some(
            wrapped
                .entry(leaf.id())
                .or_insert_with(|| leaf.freeze())
                .clone(),
        )
    });

    tracing::debug!("mask froze {} leaves", frozen_count);
    result
}

/// Unwrap every frozen leaf; other leaves pass through unchanged
///
/// Unwrapped handles alias the originally wrapped allocations, so
/// `unmask(mask(t)) == t` under the default predicate, and
/// `unmask(unmask(t)) == unmask(t)` always.
#[must_use]
pub fn unmask(tree: &Tree) -> Tree {
    let mut path = TreePath::root();
    rebuild(tree, &mut path, &mut |_, leaf| {
        leaf.is_frozen().then(|| leaf.thaw())
    })
}

/// Rebuild a tree by leaf substitution, sharing untouched branches
fn rebuild(
    tree: &Tree,
    path: &mut TreePath,
    substitute: &mut dyn FnMut(&TreePath, &Leaf) -> Option<Leaf>,
) -> Tree {
    match rebuild_tree(tree, path, substitute) {
        Some(changed) => changed,
        None => tree.clone(),
    }
}

fn rebuild_tree(
    tree: &Tree,
    path: &mut TreePath,
    substitute: &mut dyn FnMut(&TreePath, &Leaf) -> Option<Leaf>,
) -> Option<Tree> {
    let mut changed = false;
    let mut builder = TreeBuilder::new();
    for (name, child) in tree.iter() {
        path.push(Token::name(name));
        let rebuilt = rebuild_node(child, path, substitute);
        path.pop();
        match rebuilt {
            Some(node) => {
                changed = true;
                builder = builder.field(name, node);
            }
            None => {
                builder = builder.field(name, child.clone());
            }
        }
    }
    changed.then(|| builder.build())
}

fn rebuild_node(
    node: &Node,
    path: &mut TreePath,
    substitute: &mut dyn FnMut(&TreePath, &Leaf) -> Option<Leaf>,
) -> Option<Node> {
    match node {
        Node::Leaf(leaf) => substitute(path, leaf).map(Node::Leaf),
        Node::Tree(tree) => rebuild_tree(tree, path, substitute).map(Node::Tree),
        Node::Seq(seq) => {
            let mut changed = false;
            let mut items = Vec::with_capacity(seq.len());
            for (index, child) in seq.iter().enumerate() {
                path.push(Token::index(index));
                let rebuilt = rebuild_node(child, path, substitute);
                path.pop();
                match rebuilt {
                    Some(node) => {
                        changed = true;
                        items.push(node);
                    }
                    None => items.push(child.clone()),
                }
            }
            changed.then(|| Node::Seq(Seq::new(items)))
        }
    }
}
