//! The command union: one tagged record per authorable step.
//!
//! Field names are the wire contract with the editor (`targetSceneId`,
//! `variableId`, ...). Commands are immutable once a run references
//! them; the interpreter only ever reads these structs.

use serde::{Deserialize, Serialize};

use crate::condition::Condition;
use crate::value::Scalar;

/// A single step in a scene's command list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Command {
    pub id: String,
    /// AND-combined guards. Empty means always runs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
    /// Do not block advancement on this command's timed effect.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub run_async: bool,
    #[serde(flatten)]
    pub kind: CommandKind,
}

impl Command {
    pub fn new(id: impl Into<String>, kind: CommandKind) -> Self {
        Self {
            id: id.into(),
            conditions: Vec::new(),
            run_async: false,
            kind,
        }
    }

    pub fn type_tag(&self) -> &'static str {
        self.kind.type_tag()
    }
}

/// The payload side of [`Command`], discriminated by the wire `type` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum CommandKind {
    /// A spoken (or narrated, when no speaker) line.
    Dialogue {
        #[serde(default)]
        character_id: Option<String>,
        text: String,
    },
    /// Replace the stage background. `assetId: null` clears it.
    SetBackground {
        #[serde(default)]
        asset_id: Option<String>,
        #[serde(default)]
        transition: Option<String>,
        #[serde(default)]
        duration_ms: Option<u64>,
    },
    ShowCharacter {
        character_id: String,
        #[serde(default)]
        expression: Option<String>,
        #[serde(default)]
        position: Option<String>,
        #[serde(default)]
        transition: Option<String>,
        #[serde(default)]
        duration_ms: Option<u64>,
    },
    HideCharacter {
        character_id: String,
        #[serde(default)]
        transition: Option<String>,
        #[serde(default)]
        duration_ms: Option<u64>,
    },
    MoveCharacter {
        character_id: String,
        position: String,
        #[serde(default)]
        duration_ms: Option<u64>,
    },
    /// Present a menu; each option may jump, target a label, or fall through.
    Choice {
        #[serde(default)]
        prompt: Option<String>,
        options: Vec<ChoiceOption>,
    },
    /// Opens a skip region; paired with a later `branchEnd` of the same id.
    BranchStart { branch_id: String },
    /// Closes a skip region. Always a no-op at runtime.
    BranchEnd { branch_id: String },
    SetVariable {
        variable_id: String,
        operator: MutationOp,
        #[serde(default)]
        value: Option<Scalar>,
        /// random() bounds, inclusive. Defaults 0..=100.
        #[serde(default)]
        min: Option<i64>,
        #[serde(default)]
        max: Option<i64>,
    },
    /// Prompt the player for a line of text, stored into a variable.
    TextInput {
        variable_id: String,
        #[serde(default)]
        prompt: Option<String>,
    },
    /// Leave this scene for another; clears the call/return stack.
    Jump { target_scene_id: String },
    /// Marker a `jumpToLabel` can target. No-op when executed in sequence.
    Label { label_id: String },
    JumpToLabel { label_id: String },
    /// Enter another scene with a return frame pushed; end-of-list or
    /// `returnToCaller` resumes after this command.
    CallScene { target_scene_id: String },
    ReturnToCaller,
    PlayMusic {
        asset_id: String,
        #[serde(default, rename = "loop")]
        looping: bool,
        #[serde(default)]
        volume: Option<f32>,
        #[serde(default)]
        fade_ms: Option<u64>,
    },
    StopMusic {
        #[serde(default)]
        fade_ms: Option<u64>,
    },
    PlayAmbient {
        asset_id: String,
        #[serde(default, rename = "loop")]
        looping: bool,
        #[serde(default)]
        volume: Option<f32>,
        #[serde(default)]
        fade_ms: Option<u64>,
    },
    StopAmbient {
        #[serde(default)]
        fade_ms: Option<u64>,
    },
    PlaySoundEffect {
        asset_id: String,
        #[serde(default)]
        volume: Option<f32>,
    },
    /// Full-screen video. Blocks until the adapter reports completion
    /// unless marked async.
    PlayMovie {
        asset_id: String,
        #[serde(default = "default_true")]
        skippable: bool,
    },
    Wait {
        duration_ms: u64,
        #[serde(default = "default_true")]
        skippable: bool,
    },
    ScreenShake {
        intensity: f32,
        duration_ms: u64,
    },
    ScreenFlash {
        #[serde(default)]
        color: Option<String>,
        duration_ms: u64,
    },
    /// Persistent color grade. `color: null` clears it.
    ScreenTint {
        #[serde(default)]
        color: Option<String>,
        #[serde(default)]
        duration_ms: Option<u64>,
    },
    PanZoom {
        x: f32,
        y: f32,
        scale: f32,
        #[serde(default)]
        duration_ms: Option<u64>,
    },
    ShowTextOverlay {
        overlay_id: String,
        text: String,
        #[serde(default)]
        position: Option<String>,
        #[serde(default)]
        duration_ms: Option<u64>,
    },
    ShowImageOverlay {
        overlay_id: String,
        asset_id: String,
        #[serde(default)]
        position: Option<String>,
        #[serde(default)]
        duration_ms: Option<u64>,
    },
    /// A tappable overlay; activating it navigates like a choice option.
    ShowButtonOverlay {
        overlay_id: String,
        text: String,
        #[serde(default)]
        target_scene_id: Option<String>,
        #[serde(default)]
        target_label_id: Option<String>,
    },
    HideOverlay { overlay_id: String },
    ClearOverlays,
    ShowDialogueBox,
    HideDialogueBox,
    /// Editor-side grouping marker. No-op at runtime.
    Group {
        #[serde(default)]
        name: Option<String>,
    },
}

fn default_true() -> bool {
    true
}

impl CommandKind {
    /// The wire discriminant, for logs.
    pub fn type_tag(&self) -> &'static str {
        match self {
            CommandKind::Dialogue { .. } => "dialogue",
            CommandKind::SetBackground { .. } => "setBackground",
            CommandKind::ShowCharacter { .. } => "showCharacter",
            CommandKind::HideCharacter { .. } => "hideCharacter",
            CommandKind::MoveCharacter { .. } => "moveCharacter",
            CommandKind::Choice { .. } => "choice",
            CommandKind::BranchStart { .. } => "branchStart",
            CommandKind::BranchEnd { .. } => "branchEnd",
            CommandKind::SetVariable { .. } => "setVariable",
            CommandKind::TextInput { .. } => "textInput",
            CommandKind::Jump { .. } => "jump",
            CommandKind::Label { .. } => "label",
            CommandKind::JumpToLabel { .. } => "jumpToLabel",
            CommandKind::CallScene { .. } => "callScene",
            CommandKind::ReturnToCaller => "returnToCaller",
            CommandKind::PlayMusic { .. } => "playMusic",
            CommandKind::StopMusic { .. } => "stopMusic",
            CommandKind::PlayAmbient { .. } => "playAmbient",
            CommandKind::StopAmbient { .. } => "stopAmbient",
            CommandKind::PlaySoundEffect { .. } => "playSoundEffect",
            CommandKind::PlayMovie { .. } => "playMovie",
            CommandKind::Wait { .. } => "wait",
            CommandKind::ScreenShake { .. } => "screenShake",
            CommandKind::ScreenFlash { .. } => "screenFlash",
            CommandKind::ScreenTint { .. } => "screenTint",
            CommandKind::PanZoom { .. } => "panZoom",
            CommandKind::ShowTextOverlay { .. } => "showTextOverlay",
            CommandKind::ShowImageOverlay { .. } => "showImageOverlay",
            CommandKind::ShowButtonOverlay { .. } => "showButtonOverlay",
            CommandKind::HideOverlay { .. } => "hideOverlay",
            CommandKind::ClearOverlays => "clearOverlays",
            CommandKind::ShowDialogueBox => "showDialogueBox",
            CommandKind::HideDialogueBox => "hideDialogueBox",
            CommandKind::Group { .. } => "group",
        }
    }
}

/// One entry of a `choice` menu.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceOption {
    pub text: String,
    #[serde(default)]
    pub target_scene_id: Option<String>,
    #[serde(default)]
    pub target_label_id: Option<String>,
    /// Options whose guards fail are not offered.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

/// Variable mutation operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MutationOp {
    Set,
    Add,
    Subtract,
    Random,
}
