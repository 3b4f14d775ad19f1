//! Arbor functional mutation and leaf classification
//!
//! Two mechanisms on top of [`arbor_tree`]:
//!
//! - [`execute_mutating`]: run an apparently-mutating operation against a
//!   private copy of a tree, returning `(result, new_tree)` and leaving the
//!   original untouched; all-or-nothing on failure. Supports lazy field
//!   materialization and call-scoped leaf tying through [`MutationScope`].
//! - [`mask`] / [`mask_with`] / [`unmask`]: wrap leaves in frozen sentinels
//!   to hide them from the numeric flatten boundary, and restore them.
//!
//! # Example
//!
//! ```rust,ignore
//! use arbor_functional::{execute_mutating, mask, unmask};
//!
//! let (loss, trained) = execute_mutating(&model, |scope| {
//!     let weight = scope.materialize("weight", init_weight)?;
//!     scope.tie_fields("weight", "decoder_weight")?;
//!     Ok(step(&weight))
//! })?;
//!
//! let visible_to_optimizer = mask(&trained);
//! assert_eq!(unmask(&visible_to_optimizer), trained);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod error;
mod freeze;
mod mutate;

pub use error::MutateError;
pub use freeze::{mask, mask_with, unmask};
pub use mutate::{execute_mutating, MutationScope};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
