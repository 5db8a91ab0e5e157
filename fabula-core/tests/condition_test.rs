use fabula_core::condition::eval_conditions;
use fabula_core::runtime::assets::NullAssets;
use fabula_core::vars::VarStore;
use fabula_doc::{Asset, AssetKind, Condition, ConditionOp, Project, Scalar};

fn store(entries: &[(&str, Scalar)]) -> VarStore {
    let mut vars = VarStore::default();
    for (id, value) in entries {
        vars.insert_raw(id.to_string(), value.clone());
    }
    vars
}

fn one(variable_id: &str, operator: ConditionOp, value: Option<Scalar>) -> Vec<Condition> {
    vec![Condition {
        variable_id: variable_id.into(),
        operator,
        value,
    }]
}

#[test]
fn test_empty_conditions_are_true() {
    let vars = store(&[]);
    assert!(eval_conditions(&[], &vars, &NullAssets));
}

#[test]
fn test_undefined_variable_is_false() {
    let vars = store(&[]);
    assert!(!eval_conditions(
        &one("ghost", ConditionOp::IsTrue, None),
        &vars,
        &NullAssets
    ));
    // Even negative operators fail closed on an undefined variable.
    assert!(!eval_conditions(
        &one("ghost", ConditionOp::IsFalse, None),
        &vars,
        &NullAssets
    ));
}

#[test]
fn test_truthiness_operators() {
    let vars = store(&[
        ("flag", Scalar::Bool(true)),
        ("zero", Scalar::Num(0.0)),
        ("text", Scalar::from("yes")),
        ("empty", Scalar::from("")),
    ]);
    assert!(eval_conditions(&one("flag", ConditionOp::IsTrue, None), &vars, &NullAssets));
    assert!(eval_conditions(&one("zero", ConditionOp::IsFalse, None), &vars, &NullAssets));
    assert!(eval_conditions(&one("text", ConditionOp::IsTrue, None), &vars, &NullAssets));
    assert!(eval_conditions(&one("empty", ConditionOp::IsFalse, None), &vars, &NullAssets));
}

#[test]
fn test_string_equality_is_case_insensitive() {
    let vars = store(&[("mood", Scalar::from("Happy"))]);
    assert!(eval_conditions(
        &one("mood", ConditionOp::Eq, Some(Scalar::from("happy"))),
        &vars,
        &NullAssets
    ));
    assert!(!eval_conditions(
        &one("mood", ConditionOp::Ne, Some(Scalar::from("HAPPY"))),
        &vars,
        &NullAssets
    ));
}

#[test]
fn test_numeric_comparison_coerces_strings() {
    let vars = store(&[("gold", Scalar::from("12"))]);
    assert!(eval_conditions(
        &one("gold", ConditionOp::Gt, Some(Scalar::Num(10.0))),
        &vars,
        &NullAssets
    ));
    assert!(eval_conditions(
        &one("gold", ConditionOp::Le, Some(Scalar::from("12"))),
        &vars,
        &NullAssets
    ));

    // Non-numeric text coerces to 0.
    let vars = store(&[("gold", Scalar::from("lots"))]);
    assert!(eval_conditions(
        &one("gold", ConditionOp::Ge, Some(Scalar::Num(0.0))),
        &vars,
        &NullAssets
    ));
    assert!(!eval_conditions(
        &one("gold", ConditionOp::Gt, Some(Scalar::Num(0.0))),
        &vars,
        &NullAssets
    ));
}

#[test]
fn test_contains_and_starts_with() {
    let vars = store(&[("inventory", Scalar::from("Rusty Key"))]);
    assert!(eval_conditions(
        &one("inventory", ConditionOp::Contains, Some(Scalar::from("key"))),
        &vars,
        &NullAssets
    ));
    assert!(eval_conditions(
        &one("inventory", ConditionOp::StartsWith, Some(Scalar::from("rusty"))),
        &vars,
        &NullAssets
    ));
    assert!(!eval_conditions(
        &one("inventory", ConditionOp::StartsWith, Some(Scalar::from("key"))),
        &vars,
        &NullAssets
    ));
}

#[test]
fn test_conditions_are_and_combined() {
    let vars = store(&[("a", Scalar::Bool(true)), ("b", Scalar::Bool(false))]);
    let both = vec![
        Condition {
            variable_id: "a".into(),
            operator: ConditionOp::IsTrue,
            value: None,
        },
        Condition {
            variable_id: "b".into(),
            operator: ConditionOp::IsTrue,
            value: None,
        },
    ];
    assert!(!eval_conditions(&both, &vars, &NullAssets));
}

#[test]
fn test_asset_id_matches_display_name() {
    // The variable holds an internal id; the author compares against
    // the name they see in the editor.
    let project = Project {
        id: "p".into(),
        assets: vec![Asset {
            id: "asset_91f2".into(),
            name: "Forest Clearing".into(),
            kind: AssetKind::Image,
            path: "bg/forest.png".into(),
            is_video: false,
            looping: false,
        }],
        ..Default::default()
    };
    let vars = store(&[("location", Scalar::from("asset_91f2"))]);

    assert!(eval_conditions(
        &one("location", ConditionOp::Eq, Some(Scalar::from("forest clearing"))),
        &vars,
        &project
    ));
    assert!(eval_conditions(
        &one("location", ConditionOp::Contains, Some(Scalar::from("forest"))),
        &vars,
        &project
    ));
    // The literal id still matches too.
    assert!(eval_conditions(
        &one("location", ConditionOp::Eq, Some(Scalar::from("asset_91f2"))),
        &vars,
        &project
    ));
}
