//! Document model for the Fabula scene/command format.
//!
//! The authoring editor produces a JSON project document: scenes holding
//! ordered, possibly-branching command lists, plus variable, character
//! and asset tables. This crate defines the serde types for that wire
//! contract and a structural lint pass; it knows nothing about
//! execution. The runtime lives in `fabula-core`.

pub mod command;
pub mod condition;
pub mod project;
pub mod validate;
pub mod value;

pub use command::{ChoiceOption, Command, CommandKind, MutationOp};
pub use condition::{Condition, ConditionOp};
pub use project::{Asset, AssetKind, Character, Project, Scene, VarType, Variable};
pub use validate::{LintIssue, lint_project};
pub use value::Scalar;
