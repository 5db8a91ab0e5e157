use std::collections::VecDeque;

use fabula_doc::Project;
use serde::{Deserialize, Serialize};

use crate::event::OutputEvent;
use crate::runtime::patch::StatePatch;
use crate::runtime::stage::{HistoryRecord, MusicState, StageState, UiState};
use crate::vars::VarStore;

fn default_history_limit() -> usize {
    200
}

/// The serializable half of the live session. The interpreter owns the
/// frame stack; everything else lives here and changes only through
/// [`Ctx::apply`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ctx {
    pub vars: VarStore,
    pub stage: StageState,
    pub ui: UiState,
    pub music: MusicState,
    pub history: Vec<HistoryRecord>,
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    #[serde(skip)]
    pub event_queue: VecDeque<OutputEvent>,
}

impl Default for Ctx {
    fn default() -> Self {
        Self {
            vars: VarStore::default(),
            stage: StageState::default(),
            ui: UiState::default(),
            music: MusicState::default(),
            history: Vec::new(),
            history_limit: default_history_limit(),
            event_queue: VecDeque::new(),
        }
    }
}

impl Ctx {
    pub fn for_project(project: &Project, history_limit: usize) -> Self {
        let mut ctx = Self {
            history_limit,
            ..Default::default()
        };
        ctx.vars.seed_defaults(&project.variables);
        ctx
    }

    pub fn push(&mut self, event: OutputEvent) {
        self.event_queue.push_back(event);
    }

    pub fn pop(&mut self) -> Option<OutputEvent> {
        self.event_queue.pop_front()
    }

    pub fn drain(&mut self) -> Vec<OutputEvent> {
        self.event_queue.drain(..).collect()
    }

    /// Shallow-merge a patch into the session. Sub-trees not named by
    /// the patch are untouched.
    pub fn apply(&mut self, patch: StatePatch) {
        if let Some(stage) = patch.stage {
            stage.background.apply_to(&mut self.stage.background);
            for (id, entry) in stage.characters {
                match entry {
                    Some(character) => {
                        self.stage.characters.insert(id, character);
                    }
                    None => {
                        self.stage.characters.remove(&id);
                    }
                }
            }
            for id in stage.clear_transitions {
                if let Some(character) = self.stage.characters.get_mut(&id) {
                    character.transition = None;
                }
            }
            stage.tint.apply_to(&mut self.stage.effects.tint);
            stage.flash.apply_to(&mut self.stage.effects.flash);
            stage.shake.apply_to(&mut self.stage.effects.shake);
            stage.pan_zoom.apply_to(&mut self.stage.effects.pan_zoom);
            stage.movie.apply_to(&mut self.stage.movie);
        }

        if let Some(ui) = patch.ui {
            if ui.clear_overlays {
                self.ui.overlays.clear();
            }
            for (id, entry) in ui.overlays {
                match entry {
                    Some(overlay) => {
                        self.ui.overlays.insert(id, overlay);
                    }
                    None => {
                        self.ui.overlays.remove(&id);
                    }
                }
            }
            ui.dialogue.apply_to(&mut self.ui.dialogue);
            ui.choice.apply_to(&mut self.ui.choice);
            ui.text_prompt.apply_to(&mut self.ui.text_prompt);
            if let Some(visible) = ui.dialogue_box_visible {
                self.ui.dialogue_box_visible = visible;
            }
        }

        if let Some(music) = patch.music {
            if let Some(channel) = music.music {
                self.music.music = channel;
            }
            if let Some(channel) = music.ambient {
                self.music.ambient = channel;
            }
            if let Some(pos) = music.music_position_ms {
                self.music.music.position_ms = pos;
            }
            if let Some(pos) = music.ambient_position_ms {
                self.music.ambient.position_ms = pos;
            }
        }

        for (id, value) in patch.vars {
            self.vars.insert_raw(id, value);
        }

        for record in patch.history {
            self.push_history(record);
        }
    }

    fn push_history(&mut self, record: HistoryRecord) {
        self.history.push(record);
        if self.history.len() > self.history_limit {
            let overflow = self.history.len() - self.history_limit;
            self.history.drain(..overflow);
        }
    }
}
