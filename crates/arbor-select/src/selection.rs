//! Deferred selections over a tree
//!
//! A [`Selection`] binds a tree to a chain of criteria and resolves lazily:
//! nothing is walked until `get`/`set`/`apply`/`reduce` runs. Resolution
//! visits fields in canonical order, so every operation observes leaves in
//! flatten order. `set` and `apply` rebuild only the branches holding a
//! selected leaf; everything else stays shared with the source tree.

use arbor_tree::{BoxedError, Leaf, Node, Seq, Token, Tree, TreeBuilder, TreePath};

use crate::criterion::Criterion;
use crate::error::SelectError;

/// Entry point for selections
pub trait Select {
    /// Begin a selection at the root level
    fn at(&self, criterion: Criterion) -> Selection;
}

impl Select for Tree {
    fn at(&self, criterion: Criterion) -> Selection {
        Selection {
            tree: self.clone(),
            chain: vec![criterion],
        }
    }
}

/// Deferred computation bound to a tree and a criterion chain
#[derive(Debug, Clone)]
pub struct Selection {
    tree: Tree,
    chain: Vec<Criterion>,
}

/// Value form accepted by [`Selection::set`]
#[derive(Debug, Clone)]
pub enum SetValue {
    /// Replace every selected leaf with clones of one handle
    Broadcast(Leaf),
    /// Assign one value per selected leaf, positionally in canonical order
    PerLeaf(Vec<Leaf>),
}

impl From<Leaf> for SetValue {
    fn from(leaf: Leaf) -> Self {
        Self::Broadcast(leaf)
    }
}

impl From<Vec<Leaf>> for SetValue {
    fn from(values: Vec<Leaf>) -> Self {
        Self::PerLeaf(values)
    }
}

impl Selection {
    /// Narrow the selection one nesting level deeper
    #[must_use]
    pub fn at(mut self, criterion: Criterion) -> Self {
        self.chain.push(criterion);
        self
    }

    /// Selected leaves in canonical flatten order
    ///
    /// An empty match yields an empty vector, never an error.
    ///
    /// # Errors
    /// Fails only when a mask criterion does not mirror its target.
    pub fn get(&self) -> Result<Vec<Leaf>, SelectError> {
        Ok(self.resolve()?.into_iter().map(|(_, leaf)| leaf).collect())
    }

    /// Paths of the selected leaves in canonical flatten order
    ///
    /// # Errors
    /// Fails only when a mask criterion does not mirror its target.
    pub fn paths(&self) -> Result<Vec<TreePath>, SelectError> {
        Ok(self.resolve()?.into_iter().map(|(path, _)| path).collect())
    }

    /// New tree with the selected leaves replaced
    ///
    /// Unselected branches stay structurally shared with the source tree.
    ///
    /// # Errors
    /// - [`SelectError::CountMismatch`] when a per-leaf value sequence
    ///   disagrees with the number of selected leaves
    /// - [`SelectError::Shape`] when a mask criterion does not mirror
    pub fn set(&self, value: impl Into<SetValue>) -> Result<Tree, SelectError> {
        let selected = self.resolve()?;
        let replacements: Vec<(TreePath, Leaf)> = match value.into() {
            SetValue::Broadcast(leaf) => selected
                .into_iter()
                .map(|(path, _)| (path, leaf.clone()))
                .collect(),
            SetValue::PerLeaf(values) => {
                if values.len() != selected.len() {
                    return Err(SelectError::CountMismatch {
                        expected: selected.len(),
                        got: values.len(),
                    });
                }
                selected
                    .into_iter()
                    .zip(values)
                    .map(|((path, _), value)| (path, value))
                    .collect()
            }
        };
        tracing::trace!("setting {} selected leaves", replacements.len());
        Ok(rebuild_tree(&self.tree, 0, &replacements))
    }

    /// New tree with each selected leaf replaced by `f(&leaf)`
    ///
    /// # Errors
    /// A callback failure propagates as [`SelectError::Callback`], tagged
    /// with the path of the leaf it was visiting.
    pub fn apply<F>(&self, mut f: F) -> Result<Tree, SelectError>
    where
        F: FnMut(&Leaf) -> Result<Leaf, BoxedError>,
    {
        let selected = self.resolve()?;
        let mut replacements = Vec::with_capacity(selected.len());
        for (path, leaf) in selected {
            let replacement = f(&leaf).map_err(|source| SelectError::Callback {
                path: path.clone(),
                source,
            })?;
            replacements.push((path, replacement));
        }
        Ok(rebuild_tree(&self.tree, 0, &replacements))
    }

    /// Left fold over the selected leaves in canonical order
    ///
    /// An empty selection returns `init` unchanged.
    ///
    /// # Errors
    /// Callback failures propagate path-tagged, as with
    /// [`Selection::apply`].
    pub fn reduce<A, F>(&self, init: A, mut f: F) -> Result<A, SelectError>
    where
        F: FnMut(A, &Leaf) -> Result<A, BoxedError>,
    {
        let mut acc = init;
        for (path, leaf) in self.resolve()? {
            acc = f(acc, &leaf).map_err(|source| SelectError::Callback { path, source })?;
        }
        Ok(acc)
    }

    fn resolve(&self) -> Result<Vec<(TreePath, Leaf)>, SelectError> {
        let root = Node::Tree(self.tree.clone());
        let mut out = Vec::new();
        let mut path = TreePath::root();
        collect(&root, &self.chain, Vec::new(), &mut path, &mut out)?;
        tracing::trace!("selection resolved {} leaves", out.len());
        Ok(out)
    }
}

/// Walk a node, narrowing by the criterion chain
///
/// Token criteria consume one nesting level each. Mask criteria bind at the
/// node they appear on and then descend in lockstep with the target; a leaf
/// is selected only when the chain is exhausted and every bound mask holds a
/// `true` at the leaf's position.
fn collect(
    node: &Node,
    mut chain: &[Criterion],
    mut masks: Vec<Node>,
    path: &mut TreePath,
    out: &mut Vec<(TreePath, Leaf)>,
) -> Result<(), SelectError> {
    while let Some(Criterion::Mask(mask)) = chain.first() {
        let mask_node = Node::Tree(mask.clone());
        validate_mirror(&mask_node, node, path)?;
        masks.push(mask_node);
        chain = &chain[1..];
    }

    match node {
        Node::Leaf(leaf) => {
            // a leaf shallower than the remaining chain can never match
            if chain.is_empty() && masks_admit(&masks) {
                out.push((path.clone(), leaf.clone()));
            }
            Ok(())
        }
        Node::Tree(tree) => {
            for (name, child) in tree.iter() {
                let descend = chain.first().map_or(true, |c| c.matches_name(name));
                if !descend {
                    continue;
                }
                let token = Token::name(name);
                let child_masks = step_masks(&masks, &token, path)?;
                let rest = if chain.is_empty() { chain } else { &chain[1..] };
                path.push(token);
                let result = collect(child, rest, child_masks, path, out);
                path.pop();
                result?;
            }
            Ok(())
        }
        Node::Seq(seq) => {
            for (index, child) in seq.iter().enumerate() {
                let descend = chain.first().map_or(true, |c| c.matches_index(index));
                if !descend {
                    continue;
                }
                let token = Token::index(index);
                let child_masks = step_masks(&masks, &token, path)?;
                let rest = if chain.is_empty() { chain } else { &chain[1..] };
                path.push(token);
                let result = collect(child, rest, child_masks, path, out);
                path.pop();
                result?;
            }
            Ok(())
        }
    }
}

fn masks_admit(masks: &[Node]) -> bool {
    masks.iter().all(|mask| {
        mask.as_leaf()
            .and_then(|leaf| leaf.downcast_ref::<bool>().copied())
            .unwrap_or(false)
    })
}

fn step_masks(masks: &[Node], token: &Token, path: &TreePath) -> Result<Vec<Node>, SelectError> {
    masks
        .iter()
        .map(|mask| {
            mask.child(token)
                .cloned()
                .ok_or_else(|| SelectError::Shape {
                    path: path.clone(),
                    detail: "mask lost track of the target shape".to_string(),
                })
        })
        .collect()
}

/// Check that a mask node mirrors the target: same nesting, same field-name
/// sets at every level, boolean leaves. Runs in full before any selection,
/// so a mismatch can never leave a partial result behind.
fn validate_mirror(mask: &Node, target: &Node, path: &mut TreePath) -> Result<(), SelectError> {
    match (mask, target) {
        (Node::Leaf(mask_leaf), Node::Leaf(_)) => {
            if mask_leaf.downcast_ref::<bool>().is_none() {
                return Err(SelectError::Shape {
                    path: path.clone(),
                    detail: format!("mask leaf is not boolean ({})", mask_leaf.tag()),
                });
            }
            Ok(())
        }
        (Node::Tree(mask_tree), Node::Tree(target_tree)) => {
            for (name, target_child) in target_tree.iter() {
                let Some(mask_child) = mask_tree.get(name) else {
                    return Err(SelectError::Shape {
                        path: path.clone(),
                        detail: format!("mask is missing field '{name}'"),
                    });
                };
                path.push(Token::name(name));
                let result = validate_mirror(mask_child, target_child, path);
                path.pop();
                result?;
            }
            if mask_tree.len() != target_tree.len() {
                let extra = mask_tree
                    .field_names()
                    .find(|name| !target_tree.contains(name))
                    .unwrap_or("?");
                return Err(SelectError::Shape {
                    path: path.clone(),
                    detail: format!("mask has extra field '{extra}'"),
                });
            }
            Ok(())
        }
        (Node::Seq(mask_seq), Node::Seq(target_seq)) => {
            if mask_seq.len() != target_seq.len() {
                return Err(SelectError::Shape {
                    path: path.clone(),
                    detail: format!(
                        "mask sequence has {} items, target has {}",
                        mask_seq.len(),
                        target_seq.len()
                    ),
                });
            }
            for (index, (mask_child, target_child)) in
                mask_seq.iter().zip(target_seq.iter()).enumerate()
            {
                path.push(Token::index(index));
                let result = validate_mirror(mask_child, target_child, path);
                path.pop();
                result?;
            }
            Ok(())
        }
        (mask, target) => Err(SelectError::Shape {
            path: path.clone(),
            detail: format!("mask {} does not mirror target {}", kind(mask), kind(target)),
        }),
    }
}

fn kind(node: &Node) -> &'static str {
    match node {
        Node::Leaf(_) => "leaf",
        Node::Tree(_) => "tree",
        Node::Seq(_) => "sequence",
    }
}

/// Rebuild a tree, substituting the given path-ordered replacements
///
/// `repl` must be sorted in canonical order (resolution order guarantees
/// this), so the entries belonging to each branch form a contiguous run.
/// Branches with no replacements are returned as clones, preserving
/// structural sharing.
fn rebuild_tree(tree: &Tree, depth: usize, repl: &[(TreePath, Leaf)]) -> Tree {
    if repl.is_empty() {
        return tree.clone();
    }
    let mut builder = TreeBuilder::new();
    let mut rest = repl;
    for (name, child) in tree.iter() {
        let count = rest
            .iter()
            .take_while(
                |(p, _)| matches!(p.tokens().get(depth), Some(Token::Name(n)) if n == name),
            )
            .count();
        let (mine, after) = rest.split_at(count);
        rest = after;
        builder = builder.field(name, rebuild_node(child, depth + 1, mine));
    }
    builder.build()
}

fn rebuild_node(node: &Node, depth: usize, repl: &[(TreePath, Leaf)]) -> Node {
    if repl.is_empty() {
        return node.clone();
    }
    match node {
        Node::Leaf(_) => match repl.first() {
            Some((_, leaf)) => Node::Leaf(leaf.clone()),
            None => node.clone(),
        },
        Node::Tree(tree) => Node::Tree(rebuild_tree(tree, depth, repl)),
        Node::Seq(seq) => {
            let mut rest = repl;
            let items = seq
                .iter()
                .enumerate()
                .map(|(index, child)| {
                    let count = rest
                        .iter()
                        .take_while(|(p, _)| {
                            matches!(p.tokens().get(depth), Some(Token::Index(i)) if *i == index)
                        })
                        .count();
                    let (mine, after) = rest.split_at(count);
                    rest = after;
                    rebuild_node(child, depth + 1, mine)
                })
                .collect();
            Node::Seq(Seq::new(items))
        }
    }
}
