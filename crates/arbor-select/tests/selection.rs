//! Selection scenarios over model-shaped trees

use arbor_select::{Criterion, Select, SelectError};
use arbor_test_utils::{init_test_logging, layered_model, scalar_seq, strategy};
use arbor_tree::{Array, Leaf, Node, Seq, Tree};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

proptest! {
    #[test]
    fn wildcard_selection_matches_canonical_walk(tree in strategy::tree()) {
        let selected = tree.at(Criterion::all()).get().unwrap();
        let walked: Vec<_> = tree.leaves().into_iter().map(|(_, leaf)| leaf).collect();
        prop_assert_eq!(selected, walked);
    }

    #[test]
    fn selection_never_disturbs_the_source(tree in strategy::tree()) {
        let snapshot = tree.clone();
        let _ = tree.at(Criterion::all()).set(Leaf::new(0.0_f64)).unwrap();
        prop_assert_eq!(tree, snapshot);
    }
}

fn weight_abs_sum(model: &Tree, branch: &str) -> f64 {
    model
        .subtree(branch)
        .unwrap()
        .leaf("weight")
        .unwrap()
        .downcast_ref::<Array>()
        .unwrap()
        .data()
        .iter()
        .map(|v| v.abs())
        .sum()
}

#[test]
fn name_selection_sums_only_named_branches() {
    init_test_logging();
    let model = layered_model();

    let sum = model
        .at(Criterion::names(["linear1", "linear2"]))
        .at(Criterion::name("weight"))
        .reduce(0.0_f64, |acc, leaf| {
            let array = leaf.downcast_ref::<Array>().ok_or("expected an array leaf")?;
            Ok(acc + array.data().iter().map(|v| v.abs()).sum::<f64>())
        })
        .unwrap();

    let expected = weight_abs_sum(&model, "linear1") + weight_abs_sum(&model, "linear2");
    assert!((sum - expected).abs() < 1e-12);

    // the excluded branch would have shifted the result
    assert!(weight_abs_sum(&model, "linear3") > 0.0);
}

#[test]
fn boolean_mask_set_then_mean_square() {
    let values = [-1.0, -2.0, -3.0, 1.0, 2.0, 3.0];
    let tree = scalar_seq("values", &values);

    let positive_mask = Tree::builder()
        .field(
            "values",
            Seq::new(values.iter().map(|v| Node::leaf(*v > 0.0)).collect()),
        )
        .build();

    let zeroed = tree
        .at(Criterion::mask(positive_mask))
        .set(Leaf::new(0.0_f64))
        .unwrap();

    let sum_sq = zeroed
        .at(Criterion::all())
        .reduce(0.0_f64, |acc, leaf| {
            let v = leaf.downcast_ref::<f64>().copied().ok_or("expected f64")?;
            Ok(acc + v * v)
        })
        .unwrap();

    // only the non-positive entries contribute
    let remaining: Vec<f64> = values.iter().copied().filter(|v| *v <= 0.0).collect();
    let expected_sum: f64 = remaining.iter().map(|v| v * v).sum();
    assert!((sum_sq - expected_sum).abs() < 1e-12);

    let mean_sq = sum_sq / remaining.len() as f64;
    assert!((mean_sq - expected_sum / 3.0).abs() < 1e-12);
}

#[test]
fn mask_mismatch_never_partially_selects() {
    let tree = layered_model();
    // mirror of one branch only: not the tree's shape
    let bad_mask = Tree::builder()
        .leaf("weight", true)
        .leaf("bias", true)
        .leaf("in_features", false)
        .leaf("out_features", false)
        .build();

    let err = tree.at(Criterion::mask(bad_mask)).get().unwrap_err();
    assert!(matches!(err, SelectError::Shape { .. }));
}

#[test]
fn set_on_model_shares_other_branches() {
    let model = layered_model();
    let untouched_before = model
        .subtree("linear3")
        .unwrap()
        .leaf("weight")
        .unwrap()
        .clone();

    let updated = model
        .at(Criterion::names(["linear1", "linear2"]))
        .at(Criterion::name("weight"))
        .set(Leaf::new(Array::zeros([1])))
        .unwrap();

    let untouched_after = updated.subtree("linear3").unwrap().leaf("weight").unwrap();
    assert!(untouched_before.same(untouched_after));

    let name_after = updated.leaf("name").unwrap();
    assert!(model.leaf("name").unwrap().same(name_after));
}

#[test]
fn per_leaf_set_follows_canonical_order() {
    let model = layered_model();
    let updated = model
        .at(Criterion::all())
        .at(Criterion::name("bias"))
        .set(vec![
            Leaf::new(Array::filled([4], 1.0)),
            Leaf::new(Array::filled([4], 2.0)),
            Leaf::new(Array::filled([1], 3.0)),
        ])
        .unwrap();

    for (branch, fill) in [("linear1", 1.0), ("linear2", 2.0), ("linear3", 3.0)] {
        let bias = updated
            .subtree(branch)
            .unwrap()
            .leaf("bias")
            .unwrap()
            .downcast_ref::<Array>()
            .unwrap()
            .data()[0];
        assert!((bias - fill).abs() < f64::EPSILON);
    }
}

#[test]
fn per_leaf_set_arity_is_checked_against_selection() {
    let model = layered_model();
    let err = model
        .at(Criterion::all())
        .at(Criterion::name("bias"))
        .set(vec![Leaf::new(Array::zeros([4]))])
        .unwrap_err();
    assert!(matches!(
        err,
        SelectError::CountMismatch { expected: 3, got: 1 }
    ));
}

#[test]
fn empty_selection_laws() {
    let model = layered_model();
    let selection = model
        .at(Criterion::name("linear9"))
        .at(Criterion::name("weight"));

    assert_eq!(selection.get().unwrap(), vec![]);
    let folded = selection.reduce(1234.5_f64, |acc, _| Ok(acc)).unwrap();
    assert!((folded - 1234.5).abs() < f64::EPSILON);

    // setting through an empty selection returns an equal tree
    let unchanged = selection.set(Leaf::new(0.0_f64)).unwrap();
    assert_eq!(unchanged, model);
}

#[test]
fn pattern_selection_matches_numbered_branches() {
    let model = layered_model();
    let paths: Vec<String> = model
        .at(Criterion::pattern("linear[12]").unwrap())
        .at(Criterion::name("weight"))
        .paths()
        .unwrap()
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(paths, vec!["linear1.weight", "linear2.weight"]);
}
