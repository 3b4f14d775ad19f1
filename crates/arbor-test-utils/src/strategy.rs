//! Proptest strategies for arbitrary trees
//!
//! Generated trees mix every built-in leaf type, nest up to a few levels,
//! and include sequence nodes. Field names are unique per level by
//! construction.

use arbor_tree::{Array, Node, Seq, Tree, TreeBuilder};
use proptest::collection::{btree_map, vec};
use proptest::prelude::*;

/// Any built-in leaf as a node
pub fn leaf_node() -> impl Strategy<Value = Node> {
    prop_oneof![
        any::<f64>().prop_map(Node::leaf),
        any::<i64>().prop_map(Node::leaf),
        any::<bool>().prop_map(Node::leaf),
        "[a-z]{0,8}".prop_map(Node::leaf::<String>),
        vec(any::<f64>(), 0..6).prop_map(|data| {
            let shape = vec![data.len()];
            Node::leaf(Array::new(shape, data))
        }),
    ]
}

/// Any node: leaves at the bottom, trees and sequences above
pub fn node() -> impl Strategy<Value = Node> {
    leaf_node().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            vec(inner.clone(), 0..4).prop_map(|items| Node::Seq(Seq::new(items))),
            btree_map("[a-z]{1,6}", inner, 0..4).prop_map(|fields| {
                let mut builder = TreeBuilder::new();
                for (name, child) in fields {
                    builder = builder.field(name, child);
                }
                Node::Tree(builder.build())
            }),
        ]
    })
}

/// Arbitrary tree rooted at a named-field level
pub fn tree() -> impl Strategy<Value = Tree> {
    btree_map("[a-z]{1,6}", node(), 0..5).prop_map(|fields| {
        let mut builder = TreeBuilder::new();
        for (name, child) in fields {
            builder = builder.field(name, child);
        }
        builder.build()
    })
}
