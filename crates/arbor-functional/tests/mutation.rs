//! Mutation execution and classifier laws over model-shaped and generated trees

use arbor_functional::{execute_mutating, mask, mask_with, unmask, MutateError};
use arbor_select::{Criterion, Select};
use arbor_test_utils::{init_test_logging, layered_model, linear, strategy};
use arbor_tree::{flatten, unflatten, Array, Leaf, Node, Tree, TreePath};
use proptest::prelude::*;

proptest! {
    #[test]
    fn unmask_mask_is_identity(tree in strategy::tree()) {
        prop_assert_eq!(unmask(&mask(&tree)), tree);
    }

    #[test]
    fn mask_is_idempotent(tree in strategy::tree()) {
        prop_assert_eq!(mask(&mask(&tree)), mask(&tree));
    }

    #[test]
    fn unmask_is_idempotent(tree in strategy::tree()) {
        let unmasked = unmask(&tree);
        prop_assert_eq!(unmask(&unmasked), unmasked.clone());
    }

    #[test]
    fn masked_flatten_exposes_only_numeric_leaves(tree in strategy::tree()) {
        let (leaves, _) = flatten(&mask(&tree));
        prop_assert!(
            leaves.iter().all(|leaf| {
                leaf.is::<f64>() || leaf.is::<f32>() || leaf.is::<Array>()
            }),
            "masked flatten should expose only numeric leaves"
        );
    }

    #[test]
    fn failed_mutation_leaves_instance_intact(tree in strategy::tree()) {
        let snapshot = tree.clone();
        let result: Result<((), Tree), _> = execute_mutating(&tree, |scope| {
            scope.set_field("scratch", Node::leaf(1_i64))?;
            Err("forced failure".into())
        });
        prop_assert!(
            matches!(result, Err(MutateError::Operation { .. })),
            "forced failure should surface as an Operation error"
        );
        prop_assert_eq!(&tree, &snapshot);
    }

    #[test]
    fn successful_mutation_leaves_instance_intact(tree in strategy::tree()) {
        let snapshot = tree.clone();
        let (_, derived) = execute_mutating(&tree, |scope| {
            scope.set_field("scratch", Node::leaf(1_i64))?;
            Ok(())
        }).unwrap();
        prop_assert_eq!(&tree, &snapshot);
        prop_assert!(derived.contains("scratch"));
    }
}

#[test]
fn lazy_weight_materializes_once() {
    init_test_logging();
    // a linear layer constructed without its weight
    let layer = Tree::builder()
        .leaf("bias", Array::zeros([4]))
        .leaf("in_features", 2_i64)
        .leaf("out_features", 4_i64)
        .build();

    let forward = |scope: &mut arbor_functional::MutationScope| -> Result<f64, arbor_tree::BoxedError> {
        let weight = scope.materialize("weight", || Leaf::new(Array::filled([2, 4], 0.5)))?;
        let array = weight.downcast_ref::<Array>().ok_or("weight is not an array")?;
        Ok(array.data().iter().sum())
    };

    assert!(!layer.contains("weight"));

    let (first_sum, materialized) = execute_mutating(&layer, forward).unwrap();
    assert!(materialized.contains("weight"));
    assert!(!layer.contains("weight"));
    assert!((first_sum - 4.0).abs() < f64::EPSILON);

    let before = materialized.leaf("weight").unwrap().clone();
    let (second_sum, again) = execute_mutating(&materialized, forward).unwrap();
    assert!((second_sum - first_sum).abs() < f64::EPSILON);
    // the field is reused, not regenerated
    assert!(again.leaf("weight").unwrap().same(&before));
}

#[test]
fn tied_weights_survive_the_numeric_boundary() {
    let model = Tree::builder()
        .subtree("embed", linear(8, 4, 0.5))
        .subtree("head", linear(4, 8, 0.0))
        .build();

    let (_, tied) = execute_mutating(&model, |scope| {
        let src: TreePath = "embed.weight".parse()?;
        let dst: TreePath = "head.weight".parse()?;
        scope.tie(&src, &dst)?;
        Ok(())
    })
    .unwrap();

    let src: TreePath = "embed.weight".parse().unwrap();
    let dst: TreePath = "head.weight".parse().unwrap();

    let a = tied.get_path(&src).and_then(Node::as_leaf).unwrap();
    let b = tied.get_path(&dst).and_then(Node::as_leaf).unwrap();
    assert!(a.same(b));

    // one slot through flatten, aliasing restored by unflatten
    let (leaves, spec) = flatten(&tied);
    let rebuilt = unflatten(&spec, leaves).unwrap();
    let a = rebuilt.get_path(&src).and_then(Node::as_leaf).unwrap();
    let b = rebuilt.get_path(&dst).and_then(Node::as_leaf).unwrap();
    assert!(a.same(b));

    // the source model never saw the tie
    let a = model.get_path(&src).and_then(Node::as_leaf).unwrap();
    let b = model.get_path(&dst).and_then(Node::as_leaf).unwrap();
    assert!(!a.same(b));
}

#[test]
fn training_step_flow_over_masked_model() {
    // mask the model, hand numeric leaves out, scale them, rebuild, unmask
    let model = layered_model();
    let masked = mask(&model);

    let (leaves, spec) = flatten(&masked);
    let stepped: Vec<Leaf> = leaves
        .iter()
        .map(|leaf| match leaf.downcast_ref::<Array>() {
            Some(array) => {
                let data: Vec<f64> = array.data().iter().map(|v| v * 0.9).collect();
                Leaf::new(Array::new(array.shape().to_vec(), data))
            }
            None => leaf.clone(),
        })
        .collect();

    let updated = unmask(&unflatten(&spec, stepped).unwrap());

    // static configuration is untouched, numeric leaves moved
    assert_eq!(
        updated.subtree("linear1").unwrap().leaf("in_features").unwrap(),
        model.subtree("linear1").unwrap().leaf("in_features").unwrap()
    );
    assert_eq!(updated.leaf("name").unwrap(), model.leaf("name").unwrap());

    let moved = updated
        .subtree("linear1")
        .unwrap()
        .leaf("weight")
        .unwrap()
        .downcast_ref::<Array>()
        .unwrap()
        .data()[0];
    let original = model
        .subtree("linear1")
        .unwrap()
        .leaf("weight")
        .unwrap()
        .downcast_ref::<Array>()
        .unwrap()
        .data()[0];
    assert!((moved - original * 0.9).abs() < 1e-12);
}

#[test]
fn mask_with_custom_predicate_composes_with_selection() {
    let model = layered_model();
    // freeze one whole branch, then select every visible array leaf
    let masked = mask_with(&model, |path, _| path.to_string().starts_with("linear3"));

    let frozen_weight = masked.subtree("linear3").unwrap().leaf("weight").unwrap();
    assert!(frozen_weight.is_frozen());

    let visible: Vec<String> = {
        let (leaves, _) = flatten(&masked);
        leaves.iter().map(|leaf| leaf.tag().to_string()).collect()
    };
    // linear3's four leaves are gone from the flat sequence
    assert_eq!(visible.len(), model.leaves().len() - 4);

    // selection still reaches the frozen leaf as a value
    let frozen_count = masked
        .at(Criterion::name("linear3"))
        .reduce(0_usize, |acc, leaf| {
            Ok(acc + usize::from(leaf.is_frozen()))
        })
        .unwrap();
    assert_eq!(frozen_count, 4);
}

#[test]
fn mutation_then_hashability_via_mask() {
    let model = layered_model();
    assert!(model.try_hash().is_err());

    let (_, derived) = execute_mutating(&model, |scope| {
        scope.set_field("epoch", Node::leaf(3_i64))?;
        Ok(())
    })
    .unwrap();

    let frozen = mask_with(&derived, |_, _| true);
    let h1 = frozen.try_hash().unwrap();
    let h2 = mask_with(&derived, |_, _| true).try_hash().unwrap();
    assert_eq!(h1, h2);
}
