//! Arbor tree containers
//!
//! Persistent, attribute-named tree values with copy-on-write structural
//! sharing.
//!
//! # Core Concepts
//!
//! - [`Tree`]: ordered, named-field container; sealed after construction,
//!   every apparent mutation yields a new tree sharing untouched subtrees
//! - [`Seq`]: index-addressed container nested inside trees
//! - [`Leaf`] / [`LeafValue`]: shared handles to terminal values; clones
//!   alias, so "tied" paths reference the same object
//! - [`TreePath`]: name/index addressing (`encoder.layers[2].weight`)
//! - [`flatten`] / [`unflatten`] and [`TreeSpec`]: the boundary exchanged
//!   with the external array/autodiff engine and the persistence
//!   collaborator
//! - [`Frozen`]: sentinel hiding a leaf from the numeric boundary
//! - [`registry`]: type-classification table deciding which leaf types the
//!   numeric boundary sees
//!
//! # Example
//!
//! ```rust,ignore
//! use arbor_tree::{Array, Tree};
//!
//! let linear = Tree::builder()
//!     .leaf("weight", Array::filled([2, 2], 0.1))
//!     .leaf("bias", Array::zeros([2]))
//!     .leaf("in_features", 2_i64)
//!     .build();
//!
//! let (leaves, spec) = linear.flatten();
//! // hand `leaves` to the array engine, rebuild with `unflatten(&spec, ..)`
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
mod error;
mod flatten;
mod leaf;
mod node;
mod path;

/// Leaf-type classification registry
pub mod registry;

// Re-exports
pub use error::TreeError;
pub use flatten::{flatten, unflatten, SpecNode, SpecSummary, TreeSpec};
pub use leaf::{Array, Frozen, FrozenDescriptor, Leaf, LeafId, LeafValue};
pub use node::{Node, Seq, Tree, TreeBuilder};
pub use path::{PathError, Token, TreePath};

/// Boxed error type carried by path-tagged callback and operation failures
pub type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
