use fabula_doc::Command;
use serde::{Deserialize, Serialize};

use crate::runtime::ctx::Ctx;

/// One call-stack frame as persisted. `commands` is embedded so old
/// saves survive document edits; snapshots written by future builds may
/// omit it, in which case the list re-derives from the current scene.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameSnapshot {
    pub scene_id: String,
    pub pc: usize,
    #[serde(default)]
    pub commands: Option<Vec<Command>>,
}

#[derive(Serialize, Deserialize)]
pub struct SaveFile {
    pub timestamp_ms: u64,
    pub scene_name: String,
    pub ctx: Ctx,
    pub stack: Vec<FrameSnapshot>,
}

/// What the load menu shows without deserializing a whole session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotMeta {
    pub slot: u32,
    pub timestamp_ms: u64,
    pub scene_name: String,
}

#[derive(Serialize, Deserialize, Default)]
pub struct GlobalSave {
    pub settings: serde_json::Value,
}
