//! Pure predicate evaluation over the variable store.
//!
//! All conditions in a list are AND-combined; an empty list is true. A
//! condition reading an undefined variable makes the whole predicate
//! false, never an error.

use fabula_doc::{Condition, ConditionOp, Scalar};

use crate::runtime::assets::AssetSource;
use crate::vars::VarStore;

pub fn eval_conditions(conditions: &[Condition], vars: &VarStore, assets: &dyn AssetSource) -> bool {
    conditions.iter().all(|c| eval_one(c, vars, assets))
}

fn eval_one(cond: &Condition, vars: &VarStore, assets: &dyn AssetSource) -> bool {
    let Some(current) = vars.get(&cond.variable_id) else {
        log::debug!(
            "condition reads undefined variable '{}', evaluating false",
            cond.variable_id
        );
        return false;
    };

    let operand = cond.value.as_ref();

    match cond.operator {
        ConditionOp::IsTrue => current.as_truthy(),
        ConditionOp::IsFalse => !current.as_truthy(),
        ConditionOp::Eq => equals(current, operand, assets),
        ConditionOp::Ne => !equals(current, operand, assets),
        ConditionOp::Gt => numeric(current, operand, |a, b| a > b),
        ConditionOp::Lt => numeric(current, operand, |a, b| a < b),
        ConditionOp::Ge => numeric(current, operand, |a, b| a >= b),
        ConditionOp::Le => numeric(current, operand, |a, b| a <= b),
        ConditionOp::Contains => {
            let needle = operand_text(operand);
            texts_for(current, assets)
                .iter()
                .any(|t| t.contains(&needle))
        }
        ConditionOp::StartsWith => {
            let prefix = operand_text(operand);
            texts_for(current, assets)
                .iter()
                .any(|t| t.starts_with(&prefix))
        }
    }
}

fn numeric(current: &Scalar, operand: Option<&Scalar>, cmp: impl Fn(f64, f64) -> bool) -> bool {
    cmp(
        current.as_number(),
        operand.map(Scalar::as_number).unwrap_or(0.0),
    )
}

fn equals(current: &Scalar, operand: Option<&Scalar>, assets: &dyn AssetSource) -> bool {
    if let (Scalar::Num(a), Some(Scalar::Num(b))) = (current, operand) {
        return a == b;
    }
    let rhs = operand_text(operand);
    texts_for(current, assets).iter().any(|t| *t == rhs)
}

fn operand_text(operand: Option<&Scalar>) -> String {
    operand
        .map(|v| v.as_text().to_lowercase())
        .unwrap_or_default()
}

/// Lowercased comparable forms of the stored value. When the value is
/// an asset id, the asset's display name also qualifies, so authors can
/// compare against what they see in the editor.
fn texts_for(value: &Scalar, assets: &dyn AssetSource) -> Vec<String> {
    let literal = value.as_text();
    let mut texts = vec![literal.to_lowercase()];
    if let Some(name) = assets.display_name(&literal) {
        texts.push(name.to_lowercase());
    }
    texts
}
