use serde::{Deserialize, Serialize};

/// A runtime scalar: the value of a variable, a condition operand or a
/// mutation operand. Untagged on the wire (`true`, `42`, `"text"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Num(f64),
    Str(String),
}

impl Scalar {
    /// Best-effort numeric view. Non-numeric strings coerce to 0.
    pub fn as_number(&self) -> f64 {
        match self {
            Scalar::Num(n) => *n,
            Scalar::Bool(b) => {
                if *b { 1.0 } else { 0.0 }
            }
            Scalar::Str(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        }
    }

    /// Generic truthiness: false, 0 and "" are false, everything else true.
    pub fn as_truthy(&self) -> bool {
        match self {
            Scalar::Bool(b) => *b,
            Scalar::Num(n) => *n != 0.0,
            Scalar::Str(s) => !s.is_empty(),
        }
    }

    pub fn as_text(&self) -> String {
        match self {
            Scalar::Bool(b) => b.to_string(),
            Scalar::Num(n) => {
                if n.fract() == 0.0 && n.is_finite() {
                    format!("{}", *n as i64)
                } else {
                    n.to_string()
                }
            }
            Scalar::Str(s) => s.clone(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Scalar::Bool(_) => "boolean",
            Scalar::Num(_) => "number",
            Scalar::Str(_) => "string",
        }
    }
}

impl From<f64> for Scalar {
    fn from(n: f64) -> Self {
        Scalar::Num(n)
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Scalar::Bool(b)
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Str(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::Str(s)
    }
}
