//! Error types for selection

use arbor_tree::{BoxedError, TreePath};

/// Errors raised while resolving or applying a selection
#[derive(Debug, thiserror::Error)]
pub enum SelectError {
    /// Mask tree does not mirror the target's shape
    #[error("mask shape mismatch at '{path}': {detail}")]
    Shape { path: TreePath, detail: String },

    /// Per-leaf assignment given the wrong number of values
    #[error("selection matched {expected} leaves but {got} values were provided")]
    CountMismatch { expected: usize, got: usize },

    /// Callback failure, tagged with the leaf it was visiting
    #[error("callback failed at '{path}'")]
    Callback {
        path: TreePath,
        #[source]
        source: BoxedError,
    },

    /// Invalid selection pattern
    #[error("invalid selection pattern")]
    Pattern(#[from] regex::Error),
}

impl SelectError {
    /// Check whether this error tags a callback failure
    #[inline]
    #[must_use]
    pub fn is_callback(&self) -> bool {
        matches!(self, Self::Callback { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_error_names_path() {
        let err = SelectError::Shape {
            path: "a.b".parse().unwrap(),
            detail: "mask is missing field 'x'".to_string(),
        };
        assert!(err.to_string().contains("a.b"));
        assert!(err.to_string().contains("missing field"));
    }

    #[test]
    fn count_mismatch_display() {
        let err = SelectError::CountMismatch {
            expected: 3,
            got: 2,
        };
        assert!(err.to_string().contains('3'));
        assert!(err.to_string().contains('2'));
    }

    #[test]
    fn callback_error_chains_source() {
        use std::error::Error as _;
        let err = SelectError::Callback {
            path: "w".parse().unwrap(),
            source: "division by zero".into(),
        };
        assert!(err.is_callback());
        assert_eq!(err.source().unwrap().to_string(), "division by zero");
    }
}
