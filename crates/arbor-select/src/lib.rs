//! Arbor selection algebra
//!
//! Path/mask-based selection over [`arbor_tree::Tree`] leaves.
//!
//! # Core Concepts
//!
//! - [`Select::at`]: begin a selection; chained [`Selection::at`] calls
//!   narrow it one nesting level at a time (intersection, never union)
//! - [`Criterion`]: names, sequence indices, anchored regex, boolean mask
//!   tree, or wildcard
//! - [`Selection`]: deferred view supporting `get` / `set` / `apply` /
//!   `reduce`, each resolving in canonical flatten order and returning a new
//!   tree that shares every unselected branch with the source
//!
//! # Example
//!
//! ```rust,ignore
//! use arbor_select::{Criterion, Select};
//!
//! let summed = model
//!     .at(Criterion::names(["linear1", "linear2"]))
//!     .at(Criterion::name("weight"))
//!     .reduce(0.0, |acc, leaf| {
//!         Ok(acc + leaf.downcast_ref::<f64>().copied().unwrap_or(0.0).abs())
//!     })?;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod criterion;
mod error;
mod selection;

pub use criterion::Criterion;
pub use error::SelectError;
pub use selection::{Select, Selection, SetValue};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
