//! Testing utilities for the arbor workspace
//!
//! Shared fixtures (deterministic model-shaped trees) and proptest
//! strategies for generating arbitrary trees.

#![allow(missing_docs)]

use arbor_tree::{Array, Node, Seq, Tree};

pub mod strategy;

/// Install a test logging subscriber; safe to call from every test
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Deterministic array: values `start`, `start + step`, ...
pub fn ramp(shape: impl Into<Vec<usize>>, start: f64, step: f64) -> Array {
    let shape = shape.into();
    let len: usize = shape.iter().product();
    let data: Vec<f64> = (0..len).map(|i| start + step * i as f64).collect();
    Array::new(shape, data)
}

/// Linear-layer-shaped branch: numeric `weight`/`bias` plus static dims
pub fn linear(in_features: usize, out_features: usize, seed: f64) -> Tree {
    Tree::builder()
        .leaf("weight", ramp([in_features, out_features], seed, 0.5))
        .leaf("bias", Array::zeros([out_features]))
        .leaf("in_features", in_features as i64)
        .leaf("out_features", out_features as i64)
        .build()
}

/// Three-branch model used by the selection scenarios
pub fn layered_model() -> Tree {
    Tree::builder()
        .subtree("linear1", linear(2, 4, 1.0))
        .subtree("linear2", linear(4, 4, -2.0))
        .subtree("linear3", linear(4, 1, 3.0))
        .leaf("name", "fnn".to_string())
        .build()
}

/// Tree holding one sequence field of scalar leaves
pub fn scalar_seq(name: &str, values: &[f64]) -> Tree {
    Tree::builder()
        .field(
            name,
            Seq::new(values.iter().map(|v| Node::leaf(*v)).collect()),
        )
        .build()
}
