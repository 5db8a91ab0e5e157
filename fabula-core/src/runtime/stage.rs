//! Renderable session state: what a presentation adapter draws.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Background, characters, overlays and screen effects. All mutation
/// goes through patch application, never in place.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StageState {
    pub background: Option<Background>,
    pub characters: HashMap<String, StageCharacter>,
    pub effects: ScreenEffects,
    pub movie: Option<MovieState>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Background {
    pub asset_id: String,
    pub url: Option<String>,
    pub is_video: bool,
    pub looping: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageCharacter {
    pub character_id: String,
    pub expression: Option<String>,
    /// Resolved sprite layer for the current expression.
    pub url: Option<String>,
    pub position: Option<String>,
    /// Transition the adapter is currently running for this character.
    pub transition: Option<ActiveTransition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveTransition {
    pub name: String,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScreenEffects {
    pub tint: Option<String>,
    pub flash: Option<String>,
    pub shake: Option<Shake>,
    pub pan_zoom: Option<PanZoom>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shake {
    pub intensity: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanZoom {
    pub x: f32,
    pub y: f32,
    pub scale: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieState {
    pub asset_id: String,
    pub url: Option<String>,
    pub skippable: bool,
}

/// Transient UI layer: overlays, the open dialogue line, an open choice
/// menu or text prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiState {
    pub overlays: HashMap<String, Overlay>,
    pub dialogue: Option<DialogueLine>,
    pub choice: Option<OpenChoice>,
    pub text_prompt: Option<String>,
    pub dialogue_box_visible: bool,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            overlays: HashMap::new(),
            dialogue: None,
            choice: None,
            text_prompt: None,
            dialogue_box_visible: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Overlay {
    Text {
        text: String,
        position: Option<String>,
    },
    Image {
        asset_id: String,
        url: Option<String>,
        position: Option<String>,
    },
    Button {
        text: String,
        target_scene_id: Option<String>,
        target_label_id: Option<String>,
        /// Scene that was current when the button appeared; label jumps
        /// from the button resolve against this scene.
        origin_scene_id: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogueLine {
    pub speaker: Option<String>,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenChoice {
    pub prompt: Option<String>,
    pub options: Vec<String>,
}

/// Declarative audio state; ramp mechanics live in the audio director.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MusicState {
    pub music: ChannelState,
    pub ambient: ChannelState,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelState {
    pub asset_id: Option<String>,
    pub looping: bool,
    pub volume: f32,
    pub position_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub speaker: Option<String>,
    pub text: String,
    /// True for the line recording a taken choice option.
    #[serde(default)]
    pub choice: bool,
}
