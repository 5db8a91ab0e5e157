use serde::{Deserialize, Serialize};

use crate::value::Scalar;

/// A single predicate over one variable. A command or scene carries a
/// list of these, combined with AND.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub variable_id: String,
    pub operator: ConditionOp,
    #[serde(default)]
    pub value: Option<Scalar>,
}

/// Comparison operators as the editor writes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionOp {
    #[serde(rename = "is true")]
    IsTrue,
    #[serde(rename = "is false")]
    IsFalse,
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = "contains")]
    Contains,
    #[serde(rename = "startsWith")]
    StartsWith,
}

impl ConditionOp {
    /// Operators that compare numerically (both sides coerced).
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            ConditionOp::Gt | ConditionOp::Lt | ConditionOp::Ge | ConditionOp::Le
        )
    }
}
