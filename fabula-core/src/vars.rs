//! Typed variable store with the editor's mutation operators.
//!
//! Handlers stay pure by calling [`compute_mutation`] against the
//! current store and shipping the result in their patch; the store's
//! own [`VarStore::apply_mutation`] is the one-call form used by tests
//! and by input-driven writes.

use fabula_doc::{MutationOp, Scalar, VarType, Variable};
use rand::Rng;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VarStore {
    values: FxHashMap<String, Scalar>,
}

impl VarStore {
    /// Session start: materialize declared defaults.
    pub fn seed_defaults(&mut self, decls: &[Variable]) {
        for decl in decls {
            if let Some(default) = &decl.default {
                self.values
                    .entry(decl.id.clone())
                    .or_insert_with(|| coerce(decl.var_type, default));
            }
        }
    }

    pub fn get(&self, variable_id: &str) -> Option<&Scalar> {
        self.values.get(variable_id)
    }

    /// Write without coercion; patch application uses this because the
    /// handler already coerced against the declaration.
    pub fn insert_raw(&mut self, variable_id: String, value: Scalar) {
        self.values.insert(variable_id, value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Scalar)> {
        self.values.iter()
    }

    /// Type-directed write, the `set` operator.
    pub fn set(&mut self, decl: &Variable, value: &Scalar) -> Scalar {
        let coerced = coerce(decl.var_type, value);
        self.values.insert(decl.id.clone(), coerced.clone());
        coerced
    }

    /// Apply one mutation in place and return the stored result.
    pub fn apply_mutation<R: Rng>(
        &mut self,
        decl: &Variable,
        op: MutationOp,
        operand: Option<&Scalar>,
        min: Option<i64>,
        max: Option<i64>,
        rng: &mut R,
    ) -> Scalar {
        let next = compute_mutation(decl, self.get(&decl.id), op, operand, min, max, rng);
        self.values.insert(decl.id.clone(), next.clone());
        next
    }
}

/// Evaluate a mutation without touching any store.
///
/// `add`/`subtract`/`random` on a non-number variable are authoring
/// mistakes; they downgrade to `set` with a logged warning instead of
/// erroring.
pub fn compute_mutation<R: Rng>(
    decl: &Variable,
    current: Option<&Scalar>,
    op: MutationOp,
    operand: Option<&Scalar>,
    min: Option<i64>,
    max: Option<i64>,
    rng: &mut R,
) -> Scalar {
    let op = if op != MutationOp::Set && decl.var_type != VarType::Number {
        log::warn!(
            "operator {:?} on non-number variable '{}' downgraded to set",
            op,
            decl.id
        );
        MutationOp::Set
    } else {
        op
    };

    match op {
        MutationOp::Set => {
            let operand = operand.cloned().unwrap_or(Scalar::Str(String::new()));
            coerce(decl.var_type, &operand)
        }
        MutationOp::Add | MutationOp::Subtract => {
            let base = current.map(Scalar::as_number).unwrap_or(0.0);
            let delta = operand.map(Scalar::as_number).unwrap_or(0.0);
            Scalar::Num(if op == MutationOp::Add {
                base + delta
            } else {
                base - delta
            })
        }
        MutationOp::Random => {
            let (mut lo, mut hi) = (min.unwrap_or(0), max.unwrap_or(100));
            if lo > hi {
                log::warn!("random bounds swapped for '{}': {}..{}", decl.id, lo, hi);
                std::mem::swap(&mut lo, &mut hi);
            }
            Scalar::Num(rng.gen_range(lo..=hi) as f64)
        }
    }
}

/// `set` coercion per declared type.
pub fn coerce(var_type: VarType, value: &Scalar) -> Scalar {
    match var_type {
        VarType::Number => Scalar::Num(value.as_number()),
        VarType::String => Scalar::Str(value.as_text()),
        VarType::Boolean => Scalar::Bool(coerce_bool(value)),
    }
}

fn coerce_bool(value: &Scalar) -> bool {
    match value {
        Scalar::Bool(b) => *b,
        Scalar::Str(s) => match s.trim() {
            "true" | "1" => true,
            "false" | "0" | "" => false,
            _ => value.as_truthy(),
        },
        Scalar::Num(_) => value.as_truthy(),
    }
}
