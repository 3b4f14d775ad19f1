//! Error types for mutation execution

use arbor_tree::{BoxedError, TreeError, TreePath};

/// Errors raised by mutation scopes and the executor
#[derive(Debug, thiserror::Error)]
pub enum MutateError {
    /// The mutating operation itself failed; no new instance was produced
    #[error("mutating operation failed")]
    Operation {
        #[source]
        source: BoxedError,
    },

    /// Path does not address an existing node
    #[error("no node at path '{path}'")]
    PathNotFound { path: TreePath },

    /// Path addresses a subtree or sequence where a leaf was required
    #[error("path '{path}' does not address a leaf")]
    NotALeaf { path: TreePath },

    /// Underlying tree failure
    #[error(transparent)]
    Tree(#[from] TreeError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn operation_error_chains_source() {
        let err = MutateError::Operation {
            source: "singular matrix".into(),
        };
        assert_eq!(err.source().unwrap().to_string(), "singular matrix");
    }

    #[test]
    fn tree_error_converts() {
        let tree_err = TreeError::ImmutableMutation {
            field: "w".to_string(),
        };
        let err: MutateError = tree_err.into();
        assert!(matches!(err, MutateError::Tree(_)));
    }
}
