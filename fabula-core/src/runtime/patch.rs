//! State patches: the only way session state changes.
//!
//! Handlers and deferred timer actions both describe their effect as a
//! `StatePatch`; `Ctx::apply` shallow-merges each sub-patch into the
//! matching sub-tree, so a patch touching one character never clobbers
//! the rest of the stage.

use fabula_doc::Scalar;

use crate::runtime::stage::{
    Background, ChannelState, DialogueLine, HistoryRecord, MovieState, OpenChoice, Overlay,
    PanZoom, Shake, StageCharacter,
};

/// Three-state field: leave untouched, clear, or replace.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Field<T> {
    #[default]
    Keep,
    Clear,
    Set(T),
}

impl<T> Field<T> {
    pub fn apply_to(self, slot: &mut Option<T>) {
        match self {
            Field::Keep => {}
            Field::Clear => *slot = None,
            Field::Set(v) => *slot = Some(v),
        }
    }

    pub fn from_option(value: Option<T>) -> Self {
        match value {
            Some(v) => Field::Set(v),
            None => Field::Clear,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatePatch {
    pub stage: Option<StagePatch>,
    pub ui: Option<UiPatch>,
    pub music: Option<MusicPatch>,
    pub vars: Vec<(String, Scalar)>,
    pub history: Vec<HistoryRecord>,
}

impl StatePatch {
    pub fn stage(patch: StagePatch) -> Self {
        Self {
            stage: Some(patch),
            ..Default::default()
        }
    }

    pub fn ui(patch: UiPatch) -> Self {
        Self {
            ui: Some(patch),
            ..Default::default()
        }
    }

    pub fn music(patch: MusicPatch) -> Self {
        Self {
            music: Some(patch),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.stage.is_none()
            && self.ui.is_none()
            && self.music.is_none()
            && self.vars.is_empty()
            && self.history.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StagePatch {
    pub background: Field<Background>,
    /// Per-character upsert (`Some`) or removal (`None`).
    pub characters: Vec<(String, Option<StageCharacter>)>,
    /// Characters whose active transition just finished. Ids no longer
    /// on stage are ignored.
    pub clear_transitions: Vec<String>,
    pub tint: Field<String>,
    pub flash: Field<String>,
    pub shake: Field<Shake>,
    pub pan_zoom: Field<PanZoom>,
    pub movie: Field<MovieState>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UiPatch {
    /// Applied after `clear_overlays`.
    pub overlays: Vec<(String, Option<Overlay>)>,
    pub clear_overlays: bool,
    pub dialogue: Field<DialogueLine>,
    pub choice: Field<OpenChoice>,
    pub text_prompt: Field<String>,
    pub dialogue_box_visible: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MusicPatch {
    pub music: Option<ChannelState>,
    pub ambient: Option<ChannelState>,
    /// Position-only refresh from the audio tick.
    pub music_position_ms: Option<u64>,
    pub ambient_position_ms: Option<u64>,
}
