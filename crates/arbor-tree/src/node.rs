//! Tree containers and nodes
//!
//! [`Tree`] is an ordered, named-field container with persistent
//! copy-on-write semantics: cloning a handle is cheap, every write rebuilds
//! only the root-to-changed-node path, and untouched subtrees stay shared by
//! reference. A tree is sealed once built; writes through a sealed handle
//! fail with [`TreeError::ImmutableMutation`], and the sanctioned ways to
//! produce a changed tree are construction ([`TreeBuilder`]) and a detached
//! [`Tree::draft`] copy.

use std::collections::hash_map::DefaultHasher;
use std::fmt::{self, Debug, Formatter};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::TreeError;
use crate::leaf::{Leaf, LeafValue};
use crate::path::{Token, TreePath};

/// A node in a container tree
#[derive(Clone, PartialEq)]
pub enum Node {
    /// Terminal value
    Leaf(Leaf),
    /// Named-field level
    Tree(Tree),
    /// Index-addressed level
    Seq(Seq),
}

impl Node {
    /// Wrap a value as a leaf node
    #[must_use]
    pub fn leaf<T: LeafValue>(value: T) -> Self {
        Self::Leaf(Leaf::new(value))
    }

    /// Leaf view of this node
    #[inline]
    #[must_use]
    pub fn as_leaf(&self) -> Option<&Leaf> {
        match self {
            Self::Leaf(leaf) => Some(leaf),
            _ => None,
        }
    }

    /// Tree view of this node
    #[inline]
    #[must_use]
    pub fn as_tree(&self) -> Option<&Tree> {
        match self {
            Self::Tree(tree) => Some(tree),
            _ => None,
        }
    }

    /// Sequence view of this node
    #[inline]
    #[must_use]
    pub fn as_seq(&self) -> Option<&Seq> {
        match self {
            Self::Seq(seq) => Some(seq),
            _ => None,
        }
    }

    /// Check if this node is a terminal leaf
    #[inline]
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf(_))
    }

    /// Child addressed by a single path token
    #[must_use]
    pub fn child(&self, token: &Token) -> Option<&Node> {
        match (self, token) {
            (Self::Tree(tree), Token::Name(name)) => tree.get(name),
            (Self::Seq(seq), Token::Index(index)) => seq.get(*index),
            _ => None,
        }
    }

    /// Descendant addressed by a token sequence
    #[must_use]
    pub fn descendant(&self, tokens: &[Token]) -> Option<&Node> {
        let mut node = self;
        for token in tokens {
            node = node.child(token)?;
        }
        Some(node)
    }

    /// Visit every leaf below this node in canonical order
    pub fn for_each_leaf(&self, f: &mut dyn FnMut(&TreePath, &Leaf)) {
        let mut path = TreePath::root();
        walk(self, &mut path, f);
    }

    fn set_descendant(
        &mut self,
        tokens: &[Token],
        value: Node,
        full: &TreePath,
    ) -> Result<(), TreeError> {
        match tokens {
            [] => {
                *self = value;
                Ok(())
            }
            [head, rest @ ..] => match (self, head) {
                (Node::Tree(tree), Token::Name(name)) => {
                    let fields = Arc::make_mut(&mut tree.fields);
                    if rest.is_empty() {
                        fields.insert(name.clone(), value);
                        Ok(())
                    } else {
                        match fields.get_mut(name) {
                            Some(child) => child.set_descendant(rest, value, full),
                            None => Err(TreeError::PathNotFound { path: full.clone() }),
                        }
                    }
                }
                (Node::Seq(seq), Token::Index(index)) => {
                    let items = Arc::make_mut(&mut seq.items);
                    match items.get_mut(*index) {
                        Some(child) => child.set_descendant(rest, value, full),
                        None => Err(TreeError::PathNotFound { path: full.clone() }),
                    }
                }
                _ => Err(TreeError::PathNotFound { path: full.clone() }),
            },
        }
    }
}

fn walk(node: &Node, path: &mut TreePath, f: &mut dyn FnMut(&TreePath, &Leaf)) {
    match node {
        Node::Leaf(leaf) => f(path, leaf),
        Node::Tree(tree) => {
            for (name, child) in tree.iter() {
                path.push(Token::name(name));
                walk(child, path, f);
                path.pop();
            }
        }
        Node::Seq(seq) => {
            for (index, child) in seq.iter().enumerate() {
                path.push(Token::index(index));
                walk(child, path, f);
                path.pop();
            }
        }
    }
}

impl Debug for Node {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Leaf(leaf) => Debug::fmt(leaf, f),
            Self::Tree(tree) => Debug::fmt(tree, f),
            Self::Seq(seq) => Debug::fmt(seq, f),
        }
    }
}

impl From<Tree> for Node {
    fn from(tree: Tree) -> Self {
        Self::Tree(tree)
    }
}

impl From<Seq> for Node {
    fn from(seq: Seq) -> Self {
        Self::Seq(seq)
    }
}

impl From<Leaf> for Node {
    fn from(leaf: Leaf) -> Self {
        Self::Leaf(leaf)
    }
}

/// Ordered, named-field container with persistent copy-on-write semantics
///
/// # Invariants
/// - Field names are unique per level; insertion order is the canonical
///   flatten order.
/// - A write rebuilds only the root-to-changed-node path; every other
///   subtree is shared by reference with the pre-write value.
/// - Writes through a sealed handle fail; equality ignores the seal state.
#[derive(Clone)]
pub struct Tree {
    fields: Arc<IndexMap<String, Node>>,
    sealed: bool,
}

impl Tree {
    /// Start construction of a new tree
    #[inline]
    #[must_use]
    pub fn builder() -> TreeBuilder {
        TreeBuilder::new()
    }

    pub(crate) fn from_fields(fields: IndexMap<String, Node>) -> Self {
        Self {
            fields: Arc::new(fields),
            sealed: true,
        }
    }

    /// Detached, unsealed copy of this tree
    ///
    /// The draft shares every subtree with `self`, but writes on it rebuild
    /// the touched path, so nothing can alias back into `self`. This is the
    /// entry point used by mutation scopes.
    #[must_use]
    pub fn draft(&self) -> Tree {
        Tree {
            fields: Arc::clone(&self.fields),
            sealed: false,
        }
    }

    /// Seal this handle against further writes
    #[inline]
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    /// Check whether this handle is sealed
    #[inline]
    #[must_use]
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Number of fields at this level
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if this level has no fields
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Check if a field exists at this level
    #[inline]
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Node held by a field
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Node> {
        self.fields.get(name)
    }

    /// Leaf held by a field, if the field is a leaf
    #[inline]
    #[must_use]
    pub fn leaf(&self, name: &str) -> Option<&Leaf> {
        self.get(name)?.as_leaf()
    }

    /// Subtree held by a field, if the field is a tree
    #[inline]
    #[must_use]
    pub fn subtree(&self, name: &str) -> Option<&Tree> {
        self.get(name)?.as_tree()
    }

    /// Field names in canonical order
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Fields in canonical order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.fields.iter().map(|(name, node)| (name.as_str(), node))
    }

    /// Node addressed by a path
    ///
    /// The empty path addresses the root, which is not itself a [`Node`];
    /// it resolves to `None`.
    #[must_use]
    pub fn get_path(&self, path: &TreePath) -> Option<&Node> {
        let (first, rest) = path.tokens().split_first()?;
        let node = match first {
            Token::Name(name) => self.get(name)?,
            Token::Index(_) => return None,
        };
        node.descendant(rest)
    }

    /// Create or replace a field at this level
    ///
    /// # Errors
    /// Fails with [`TreeError::ImmutableMutation`] on a sealed handle.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        node: impl Into<Node>,
    ) -> Result<(), TreeError> {
        let name = name.into();
        if self.sealed {
            return Err(TreeError::ImmutableMutation { field: name });
        }
        Arc::make_mut(&mut self.fields).insert(name, node.into());
        Ok(())
    }

    /// Remove a field at this level, preserving the order of the rest
    ///
    /// # Errors
    /// Fails with [`TreeError::ImmutableMutation`] on a sealed handle.
    pub fn remove(&mut self, name: &str) -> Result<Option<Node>, TreeError> {
        if self.sealed {
            return Err(TreeError::ImmutableMutation {
                field: name.to_string(),
            });
        }
        Ok(Arc::make_mut(&mut self.fields).shift_remove(name))
    }

    /// Create or replace the node at a path
    ///
    /// Every intermediate node must already exist; only the final token may
    /// create a new field. Writes rebuild the addressed path and share the
    /// rest of the tree.
    ///
    /// # Errors
    /// - [`TreeError::ImmutableMutation`] on a sealed handle
    /// - [`TreeError::PathNotFound`] if an intermediate node is missing, the
    ///   path is empty, or a token kind does not match the level it addresses
    pub fn set_path(&mut self, path: &TreePath, node: impl Into<Node>) -> Result<(), TreeError> {
        if self.sealed {
            return Err(TreeError::ImmutableMutation {
                field: path.to_string(),
            });
        }
        let (first, rest) = path
            .tokens()
            .split_first()
            .ok_or_else(|| TreeError::PathNotFound { path: path.clone() })?;
        let Token::Name(name) = first else {
            return Err(TreeError::PathNotFound { path: path.clone() });
        };

        let fields = Arc::make_mut(&mut self.fields);
        if rest.is_empty() {
            fields.insert(name.clone(), node.into());
            return Ok(());
        }
        match fields.get_mut(name) {
            Some(child) => child.set_descendant(rest, node.into(), path),
            None => Err(TreeError::PathNotFound { path: path.clone() }),
        }
    }

    /// Every leaf below the root in canonical order, one entry per path
    ///
    /// Aliased leaves appear once per referencing path.
    #[must_use]
    pub fn leaves(&self) -> Vec<(TreePath, Leaf)> {
        let mut out = Vec::new();
        let mut path = TreePath::root();
        for (name, child) in self.iter() {
            path.push(Token::name(name));
            walk(child, &mut path, &mut |p, leaf| {
                out.push((p.clone(), leaf.clone()));
            });
            path.pop();
        }
        out
    }

    /// Structural hash over field names and leaf values
    ///
    /// # Errors
    /// Fails with [`TreeError::Unhashable`] naming the first leaf (in
    /// canonical order) whose type has no structural hash.
    pub fn try_hash(&self) -> Result<u64, TreeError> {
        let mut hasher = DefaultHasher::new();
        let mut path = TreePath::root();
        hash_tree(self, &mut path, &mut hasher)?;
        Ok(hasher.finish())
    }

    /// One-line-per-leaf rendering of the tree
    ///
    /// Frozen leaves render with the `#` sigil.
    #[must_use]
    pub fn describe(&self) -> String {
        use std::fmt::Write as _;
        let mut out = String::new();
        for (path, leaf) in self.leaves() {
            let _ = writeln!(out, "{path} = {leaf:?}");
        }
        out
    }
}

fn hash_tree(tree: &Tree, path: &mut TreePath, hasher: &mut DefaultHasher) -> Result<(), TreeError> {
    1_u8.hash(hasher);
    tree.len().hash(hasher);
    for (name, child) in tree.iter() {
        name.hash(hasher);
        path.push(Token::name(name));
        hash_node(child, path, hasher)?;
        path.pop();
    }
    Ok(())
}

fn hash_node(node: &Node, path: &mut TreePath, hasher: &mut DefaultHasher) -> Result<(), TreeError> {
    match node {
        Node::Leaf(leaf) => {
            0_u8.hash(hasher);
            let value = leaf.try_hash().ok_or_else(|| TreeError::Unhashable {
                path: path.clone(),
                tag: leaf.tag(),
            })?;
            value.hash(hasher);
            Ok(())
        }
        Node::Tree(tree) => hash_tree(tree, path, hasher),
        Node::Seq(seq) => {
            2_u8.hash(hasher);
            seq.len().hash(hasher);
            for (index, child) in seq.iter().enumerate() {
                path.push(Token::index(index));
                hash_node(child, path, hasher)?;
                path.pop();
            }
            Ok(())
        }
    }
}

impl PartialEq for Tree {
    // order-sensitive structural equality; the seal state is not a value
    fn eq(&self, other: &Self) -> bool {
        self.fields.len() == other.fields.len()
            && self
                .fields
                .iter()
                .zip(other.fields.iter())
                .all(|((a_name, a_node), (b_name, b_node))| a_name == b_name && a_node == b_node)
    }
}

impl Debug for Tree {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Ordered, index-addressed container of unnamed children
#[derive(Clone, Default, PartialEq)]
pub struct Seq {
    items: Arc<Vec<Node>>,
}

impl Seq {
    /// Create a sequence from its children
    #[must_use]
    pub fn new(items: Vec<Node>) -> Self {
        Self {
            items: Arc::new(items),
        }
    }

    /// Child at a position
    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Node> {
        self.items.get(index)
    }

    /// Number of children
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the sequence has no children
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Children in canonical order
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.items.iter()
    }
}

impl FromIterator<Node> for Seq {
    fn from_iter<I: IntoIterator<Item = Node>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl Debug for Seq {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// Construction-phase builder for [`Tree`]
///
/// Fields are declared in order; `build` seals the tree. Declaring a name a
/// second time replaces the pending value without disturbing its position.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    fields: IndexMap<String, Node>,
}

impl TreeBuilder {
    /// Create an empty builder
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a field
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, node: impl Into<Node>) -> Self {
        self.fields.insert(name.into(), node.into());
        self
    }

    /// Declare a leaf field
    #[must_use]
    pub fn leaf<T: LeafValue>(self, name: impl Into<String>, value: T) -> Self {
        self.field(name, Node::leaf(value))
    }

    /// Declare a subtree field
    #[must_use]
    pub fn subtree(self, name: impl Into<String>, tree: Tree) -> Self {
        self.field(name, Node::Tree(tree))
    }

    /// Finish construction, sealing the tree
    #[must_use]
    pub fn build(self) -> Tree {
        Tree::from_fields(self.fields)
    }
}
