use serde::{Deserialize, Serialize};

use crate::command::Command;
use crate::condition::Condition;
use crate::value::Scalar;

/// The root document: everything the editor exports for one story.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Explicit entry point; falls back to the first declared scene.
    #[serde(default)]
    pub start_scene_id: Option<String>,
    #[serde(default)]
    pub scenes: Vec<Scene>,
    #[serde(default)]
    pub variables: Vec<Variable>,
    #[serde(default)]
    pub characters: Vec<Character>,
    #[serde(default)]
    pub assets: Vec<Asset>,
}

impl Project {
    pub fn scene(&self, id: &str) -> Option<&Scene> {
        self.scenes.iter().find(|s| s.id == id)
    }

    pub fn scene_index(&self, id: &str) -> Option<usize> {
        self.scenes.iter().position(|s| s.id == id)
    }

    /// The scene after `id` in declaration order.
    pub fn scene_after(&self, id: &str) -> Option<&Scene> {
        let idx = self.scene_index(id)?;
        self.scenes.get(idx + 1)
    }

    pub fn start_scene(&self) -> Option<&Scene> {
        match &self.start_scene_id {
            Some(id) => self.scene(id).or_else(|| self.scenes.first()),
            None => self.scenes.first(),
        }
    }

    pub fn variable(&self, id: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.id == id)
    }

    pub fn variable_by_name(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name == name)
    }

    pub fn character(&self, id: &str) -> Option<&Character> {
        self.characters.iter().find(|c| c.id == id)
    }

    pub fn asset(&self, id: &str) -> Option<&Asset> {
        self.assets.iter().find(|a| a.id == id)
    }
}

/// A named ordered command list with optional entry gate and fallback.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub commands: Vec<Command>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entry_conditions: Vec<Condition>,
    #[serde(default)]
    pub fallback_scene_id: Option<String>,
}

/// Declared variable. Lookup at runtime is by `id`; `name` only appears
/// in conditions display and `{name}` text interpolation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variable {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub var_type: VarType,
    #[serde(default)]
    pub default: Option<Scalar>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VarType {
    Number,
    String,
    Boolean,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Character {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub default_expression: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub id: String,
    pub name: String,
    pub kind: AssetKind,
    pub path: String,
    #[serde(default)]
    pub is_video: bool,
    #[serde(default, rename = "loop")]
    pub looping: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Image,
    Audio,
    Video,
}
