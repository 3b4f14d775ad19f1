//! Functional mutation execution
//!
//! [`execute_mutating`] runs an apparently-mutating operation against a
//! private copy of a tree and returns the operation's value together with
//! the new tree. The original instance is never touched: the scope writes
//! through copy-on-write rebuilds on a detached draft, so no assignment can
//! alias back into the caller's fields. A failed operation produces no new
//! instance at all.

use arbor_tree::{BoxedError, Leaf, Node, Token, Tree, TreePath};

use crate::error::MutateError;

/// Write proxy bound to a private copy of a tree
///
/// All writes inside a mutating operation go through this scope; the scope
/// is the only sanctioned mutation surface outside construction. Consuming
/// the scope (by returning from the operation) ends its authority.
#[derive(Debug)]
pub struct MutationScope {
    tree: Tree,
}

impl MutationScope {
    fn open(instance: &Tree) -> Self {
        Self {
            tree: instance.draft(),
        }
    }

    fn commit(mut self) -> Tree {
        self.tree.seal();
        self.tree
    }

    /// Read view of the scope's current state
    #[inline]
    #[must_use]
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Node addressed by a path, if present
    #[inline]
    #[must_use]
    pub fn get(&self, path: &TreePath) -> Option<&Node> {
        self.tree.get_path(path)
    }

    /// Root-level leaf, if present
    #[inline]
    #[must_use]
    pub fn leaf(&self, name: &str) -> Option<&Leaf> {
        self.tree.leaf(name)
    }

    /// Create or replace a root-level field
    ///
    /// # Errors
    /// Propagates tree failures; the scope itself is always writable.
    pub fn set_field(
        &mut self,
        name: impl Into<String>,
        node: impl Into<Node>,
    ) -> Result<(), MutateError> {
        self.tree.insert(name, node).map_err(Into::into)
    }

    /// Create or replace the node at a path
    ///
    /// Intermediate nodes must exist; only the final token may create a new
    /// field.
    ///
    /// # Errors
    /// Fails with [`MutateError::Tree`] when an intermediate node is
    /// missing.
    pub fn set(&mut self, path: &TreePath, node: impl Into<Node>) -> Result<(), MutateError> {
        self.tree.set_path(path, node).map_err(Into::into)
    }

    /// Remove a root-level field
    ///
    /// # Errors
    /// Propagates tree failures; the scope itself is always writable.
    pub fn remove(&mut self, name: &str) -> Result<Option<Node>, MutateError> {
        self.tree.remove(name).map_err(Into::into)
    }

    /// Lazily materialize a root-level leaf field
    ///
    /// Returns the existing leaf when the field is present; otherwise
    /// creates it from `init` and returns the new leaf. Running the same
    /// operation against the committed result therefore sees the field
    /// without recreating it.
    ///
    /// # Errors
    /// Fails with [`MutateError::NotALeaf`] when the field exists but holds
    /// a subtree or sequence.
    pub fn materialize(
        &mut self,
        name: &str,
        init: impl FnOnce() -> Leaf,
    ) -> Result<Leaf, MutateError> {
        match self.tree.get(name) {
            Some(Node::Leaf(leaf)) => Ok(leaf.clone()),
            Some(_) => Err(MutateError::NotALeaf {
                path: TreePath::single(name),
            }),
            None => {
                let leaf = init();
                tracing::debug!("materializing field '{}'", name);
                self.tree.insert(name, Node::Leaf(leaf.clone()))?;
                Ok(leaf)
            }
        }
    }

    /// Rebind `dst` to the identical leaf handle held at `src`
    ///
    /// The two paths then alias the same allocation, and flatten/unflatten
    /// keeps them aliased. The binding lives on the committed copy only; it
    /// is discarded with the scope unless the caller keeps the returned
    /// tree. Tying the same destination again rebinds it: the last tie
    /// wins.
    ///
    /// # Errors
    /// - [`MutateError::PathNotFound`] when `src` is missing
    /// - [`MutateError::NotALeaf`] when `src` addresses a subtree
    /// - [`MutateError::Tree`] when `dst`'s parent is missing
    pub fn tie(&mut self, src: &TreePath, dst: &TreePath) -> Result<(), MutateError> {
        let leaf = match self.tree.get_path(src) {
            Some(Node::Leaf(leaf)) => leaf.clone(),
            Some(_) => {
                return Err(MutateError::NotALeaf { path: src.clone() });
            }
            None => {
                return Err(MutateError::PathNotFound { path: src.clone() });
            }
        };
        tracing::debug!("tying '{}' to '{}'", dst, src);
        self.tree.set_path(dst, Node::Leaf(leaf)).map_err(Into::into)
    }

    /// Rebind a root-level field to the leaf held by another root field
    ///
    /// Convenience form of [`MutationScope::tie`].
    ///
    /// # Errors
    /// As for [`MutationScope::tie`].
    pub fn tie_fields(&mut self, src: &str, dst: &str) -> Result<(), MutateError> {
        self.tie(
            &TreePath::new(vec![Token::name(src)]),
            &TreePath::new(vec![Token::name(dst)]),
        )
    }
}

/// Run an apparently-mutating operation, functionally
///
/// Opens a [`MutationScope`] over a private copy of `instance`, invokes
/// `op`, and returns the operation's value together with the (possibly
/// field-extended) copy. `instance` is provably unchanged: a structural
/// snapshot taken before and after the call compares equal.
///
/// # Errors
/// When `op` fails, no new instance is produced and the failure propagates
/// as [`MutateError::Operation`]: all-or-nothing, no partial field writes
/// survive.
pub fn execute_mutating<R, F>(instance: &Tree, op: F) -> Result<(R, Tree), MutateError>
where
    F: FnOnce(&mut MutationScope) -> Result<R, BoxedError>,
{
    let mut scope = MutationScope::open(instance);
    tracing::debug!("mutation scope opened");
    match op(&mut scope) {
        Ok(result) => {
            let tree = scope.commit();
            tracing::debug!("mutation scope committed");
            Ok((result, tree))
        }
        Err(source) => {
            tracing::debug!("mutation scope discarded: {}", source);
            Err(MutateError::Operation { source })
        }
    }
}
