//! One handler per command kind.
//!
//! Handlers read the session but never write it: each one returns a
//! [`CommandEffect`] describing the state patch, the events for the
//! adapter, any fire-and-forget timers, and the continuation policy.
//! The loop owns applying all of it.

use std::sync::OnceLock;

use fabula_doc::{AssetKind, ChoiceOption, Command, CommandKind, Project, Scalar};
use regex::Regex;

use crate::audio::{AudioDirector, ChannelId};
use crate::condition::eval_conditions;
use crate::config::PlaybackConfig;
use crate::event::OutputEvent;
use crate::runtime::assets::AssetSource;
use crate::runtime::ctx::Ctx;
use crate::runtime::patch::{Field, MusicPatch, StagePatch, StatePatch, UiPatch};
use crate::runtime::stage::{
    ActiveTransition, Background, ChannelState, DialogueLine, HistoryRecord, MovieState,
    OpenChoice, Overlay, PanZoom, Shake, StageCharacter,
};
use crate::scheduler::Deferred;
use crate::vars;

pub struct HandlerCtx<'a> {
    pub ctx: &'a Ctx,
    pub project: &'a Project,
    pub assets: &'a dyn AssetSource,
    pub audio: &'a mut AudioDirector,
    pub cfg: &'a PlaybackConfig,
    pub current_scene_id: &'a str,
}

/// Continuation policy a handler hands back to the loop.
#[derive(Debug, Clone, PartialEq)]
pub enum NextAction {
    Advance,
    /// Suspend until an external UI event (click, movie end).
    WaitInput,
    WaitChoice(Vec<ChoiceOption>),
    WaitText { variable_id: String },
    /// Suspend until the scheduled action fires; a skippable timer
    /// races against manual advance.
    Transition {
        delay_ms: u64,
        then: Deferred,
        skippable: bool,
    },
    Jump(String),
    JumpLabel(String),
    Call(String),
    Return,
    EndSession,
}

#[derive(Debug)]
pub struct CommandEffect {
    pub patch: StatePatch,
    pub events: Vec<OutputEvent>,
    /// Decoupled timers: scheduled regardless of the continuation, used
    /// by effects that end on their own (shake decay, timed overlays).
    pub timers: Vec<(u64, Deferred)>,
    pub next: NextAction,
}

impl CommandEffect {
    fn advance() -> Self {
        Self {
            patch: StatePatch::default(),
            events: Vec::new(),
            timers: Vec::new(),
            next: NextAction::Advance,
        }
    }
}

pub fn handle_command(hctx: &mut HandlerCtx, cmd: &Command) -> CommandEffect {
    log::trace!("dispatch {} '{}'", cmd.type_tag(), cmd.id);
    let mut fx = CommandEffect::advance();

    match &cmd.kind {
        CommandKind::Dialogue { character_id, text } => {
            let speaker = character_id.as_ref().map(|id| {
                match hctx.project.character(id) {
                    Some(c) => c.name.clone(),
                    None => {
                        log::warn!("dialogue speaker '{}' is not declared", id);
                        id.clone()
                    }
                }
            });
            let text = interpolate(text, hctx);
            fx.patch = StatePatch::ui(UiPatch {
                dialogue: Field::Set(DialogueLine {
                    speaker: speaker.clone(),
                    text: text.clone(),
                }),
                ..Default::default()
            });
            fx.patch.history.push(HistoryRecord {
                speaker: speaker.clone(),
                text: text.clone(),
                choice: false,
            });
            fx.events.push(OutputEvent::ShowDialogue { speaker, text });
            fx.next = NextAction::WaitInput;
        }

        CommandKind::SetBackground {
            asset_id,
            transition,
            duration_ms,
        } => {
            let transition = transition
                .clone()
                .unwrap_or_else(|| hctx.cfg.default_transition.clone());
            let duration = duration_ms.unwrap_or(hctx.cfg.default_transition_ms);

            let background = match asset_id {
                Some(id) => {
                    let url = hctx.assets.resolve(id, AssetKind::Image);
                    if url.is_none() {
                        log::warn!("background asset '{}' not found", id);
                    }
                    let meta = hctx.assets.metadata(id, AssetKind::Image);
                    Field::Set(Background {
                        asset_id: id.clone(),
                        url,
                        is_video: meta.is_video,
                        looping: meta.looping,
                    })
                }
                None => Field::Clear,
            };

            let (url, is_video, looping) = match &background {
                Field::Set(bg) => (bg.url.clone(), bg.is_video, bg.looping),
                _ => (None, false, false),
            };
            fx.patch = StatePatch::stage(StagePatch {
                background,
                ..Default::default()
            });
            fx.events.push(OutputEvent::SetBackground {
                url,
                is_video,
                looping,
                transition,
            });
            fx.next = if duration > 0 {
                NextAction::Transition {
                    delay_ms: duration,
                    then: Deferred::Advance,
                    skippable: false,
                }
            } else {
                NextAction::Advance
            };
        }

        CommandKind::ShowCharacter {
            character_id,
            expression,
            position,
            transition,
            duration_ms,
        } => {
            if hctx.project.character(character_id).is_none() {
                log::warn!("showCharacter: unknown character '{}'", character_id);
                return fx;
            }
            let expression = expression.clone().or_else(|| {
                hctx.project
                    .character(character_id)
                    .and_then(|c| c.default_expression.clone())
            });
            let duration = duration_ms.unwrap_or(hctx.cfg.default_transition_ms);
            let transition = ActiveTransition {
                name: transition
                    .clone()
                    .unwrap_or_else(|| hctx.cfg.default_transition.clone()),
                duration_ms: duration,
            };
            let sprite = sprite_asset_id(character_id, expression.as_deref());
            let url = hctx.assets.resolve(&sprite, AssetKind::Image).or_else(|| {
                hctx.assets.resolve(character_id, AssetKind::Image)
            });
            if url.is_none() {
                log::warn!("no sprite asset for '{}'", sprite);
            }
            fx.patch = StatePatch::stage(StagePatch {
                characters: vec![(
                    character_id.clone(),
                    Some(StageCharacter {
                        character_id: character_id.clone(),
                        expression,
                        url,
                        position: position.clone(),
                        transition: Some(transition),
                    }),
                )],
                ..Default::default()
            });
            fx.events.push(OutputEvent::StageChanged);
            if duration > 0 {
                fx.timers
                    .push((duration, Deferred::Patch(clear_character_transition(character_id))));
            }
        }

        CommandKind::HideCharacter {
            character_id,
            transition,
            duration_ms,
        } => {
            if !hctx.ctx.stage.characters.contains_key(character_id) {
                log::warn!("hideCharacter: '{}' is not on stage", character_id);
                return fx;
            }
            let duration = duration_ms.unwrap_or(hctx.cfg.default_transition_ms);
            if duration > 0 {
                // Mark the outgoing transition now, remove when it ends.
                let mut leaving = hctx.ctx.stage.characters[character_id].clone();
                leaving.transition = Some(ActiveTransition {
                    name: transition
                        .clone()
                        .unwrap_or_else(|| hctx.cfg.default_transition.clone()),
                    duration_ms: duration,
                });
                fx.patch = StatePatch::stage(StagePatch {
                    characters: vec![(character_id.clone(), Some(leaving))],
                    ..Default::default()
                });
                fx.timers.push((
                    duration,
                    Deferred::Patch(StatePatch::stage(StagePatch {
                        characters: vec![(character_id.clone(), None)],
                        ..Default::default()
                    })),
                ));
            } else {
                fx.patch = StatePatch::stage(StagePatch {
                    characters: vec![(character_id.clone(), None)],
                    ..Default::default()
                });
            }
            fx.events.push(OutputEvent::StageChanged);
        }

        CommandKind::MoveCharacter {
            character_id,
            position,
            duration_ms,
        } => {
            let Some(on_stage) = hctx.ctx.stage.characters.get(character_id) else {
                log::warn!("moveCharacter: '{}' is not on stage", character_id);
                return fx;
            };
            let duration = duration_ms.unwrap_or(hctx.cfg.default_transition_ms);
            let mut moved = on_stage.clone();
            moved.position = Some(position.clone());
            moved.transition = (duration > 0).then(|| ActiveTransition {
                name: "move".into(),
                duration_ms: duration,
            });
            fx.patch = StatePatch::stage(StagePatch {
                characters: vec![(character_id.clone(), Some(moved))],
                ..Default::default()
            });
            fx.events.push(OutputEvent::StageChanged);
            if duration > 0 {
                fx.timers
                    .push((duration, Deferred::Patch(clear_character_transition(character_id))));
            }
        }

        CommandKind::Choice { prompt, options } => {
            let offered: Vec<ChoiceOption> = options
                .iter()
                .filter(|o| eval_conditions(&o.conditions, &hctx.ctx.vars, hctx.assets))
                .cloned()
                .collect();
            if offered.is_empty() {
                log::warn!("choice '{}' has no admissible options, skipping", cmd.id);
                return fx;
            }
            let prompt = prompt.as_ref().map(|p| interpolate(p, hctx));
            let texts: Vec<String> = offered.iter().map(|o| interpolate(&o.text, hctx)).collect();
            fx.patch = StatePatch::ui(UiPatch {
                choice: Field::Set(OpenChoice {
                    prompt: prompt.clone(),
                    options: texts.clone(),
                }),
                ..Default::default()
            });
            fx.events.push(OutputEvent::ShowChoice {
                prompt,
                options: texts,
            });
            fx.next = NextAction::WaitChoice(offered);
        }

        // Branch markers reach the handler only when the loop already
        // decided to step into them.
        CommandKind::BranchStart { .. } | CommandKind::BranchEnd { .. } => {}
        CommandKind::Label { .. } | CommandKind::Group { .. } => {}

        CommandKind::SetVariable {
            variable_id,
            operator,
            value,
            min,
            max,
        } => {
            let Some(decl) = hctx.project.variable(variable_id) else {
                log::warn!("setVariable: unknown variable '{}'", variable_id);
                return fx;
            };
            let next = vars::compute_mutation(
                decl,
                hctx.ctx.vars.get(variable_id),
                *operator,
                value.as_ref(),
                *min,
                *max,
                &mut rand::thread_rng(),
            );
            fx.patch.vars.push((variable_id.clone(), next));
        }

        CommandKind::TextInput { variable_id, prompt } => {
            if hctx.project.variable(variable_id).is_none() {
                log::warn!("textInput: unknown variable '{}'", variable_id);
                return fx;
            }
            let prompt = prompt.as_ref().map(|p| interpolate(p, hctx));
            fx.patch = StatePatch::ui(UiPatch {
                text_prompt: Field::from_option(prompt.clone()),
                ..Default::default()
            });
            fx.events.push(OutputEvent::ShowTextPrompt { prompt });
            fx.next = NextAction::WaitText {
                variable_id: variable_id.clone(),
            };
        }

        CommandKind::Jump { target_scene_id } => {
            fx.next = NextAction::Jump(target_scene_id.clone());
        }
        CommandKind::JumpToLabel { label_id } => {
            fx.next = NextAction::JumpLabel(label_id.clone());
        }
        CommandKind::CallScene { target_scene_id } => {
            fx.next = NextAction::Call(target_scene_id.clone());
        }
        CommandKind::ReturnToCaller => {
            fx.next = NextAction::Return;
        }

        CommandKind::PlayMusic {
            asset_id,
            looping,
            volume,
            fade_ms,
        } => {
            let state = hctx.audio.play(
                hctx.assets,
                ChannelId::Music,
                asset_id,
                *looping,
                *volume,
                *fade_ms,
                &mut fx.events,
            );
            fx.patch = music_channel_patch(ChannelId::Music, state);
        }
        CommandKind::StopMusic { fade_ms } => {
            let state = hctx.audio.stop(ChannelId::Music, *fade_ms, &mut fx.events);
            fx.patch = music_channel_patch(ChannelId::Music, state);
        }
        CommandKind::PlayAmbient {
            asset_id,
            looping,
            volume,
            fade_ms,
        } => {
            let state = hctx.audio.play(
                hctx.assets,
                ChannelId::Ambient,
                asset_id,
                *looping,
                *volume,
                *fade_ms,
                &mut fx.events,
            );
            fx.patch = music_channel_patch(ChannelId::Ambient, state);
        }
        CommandKind::StopAmbient { fade_ms } => {
            let state = hctx.audio.stop(ChannelId::Ambient, *fade_ms, &mut fx.events);
            fx.patch = music_channel_patch(ChannelId::Ambient, state);
        }
        CommandKind::PlaySoundEffect { asset_id, volume } => {
            hctx.audio
                .play_sfx(hctx.assets, asset_id, *volume, &mut fx.events);
        }

        CommandKind::PlayMovie { asset_id, skippable } => {
            let Some(url) = hctx.assets.resolve(asset_id, AssetKind::Video) else {
                log::warn!("movie '{}' not found, skipping", asset_id);
                return fx;
            };
            fx.patch = StatePatch::stage(StagePatch {
                movie: Field::Set(MovieState {
                    asset_id: asset_id.clone(),
                    url: Some(url.clone()),
                    skippable: *skippable,
                }),
                ..Default::default()
            });
            fx.events.push(OutputEvent::PlayMovie {
                url,
                skippable: *skippable,
            });
            fx.next = NextAction::WaitInput;
        }

        CommandKind::Wait {
            duration_ms,
            skippable,
        } => {
            fx.next = NextAction::Transition {
                delay_ms: *duration_ms,
                then: Deferred::Advance,
                skippable: *skippable,
            };
        }

        CommandKind::ScreenShake {
            intensity,
            duration_ms,
        } => {
            fx.patch = StatePatch::stage(StagePatch {
                shake: Field::Set(Shake {
                    intensity: *intensity,
                }),
                ..Default::default()
            });
            fx.events.push(OutputEvent::ScreenEffect { kind: "shake" });
            fx.timers.push((
                *duration_ms,
                Deferred::Patch(StatePatch::stage(StagePatch {
                    shake: Field::Clear,
                    ..Default::default()
                })),
            ));
        }

        CommandKind::ScreenFlash { color, duration_ms } => {
            fx.patch = StatePatch::stage(StagePatch {
                flash: Field::Set(color.clone().unwrap_or_else(|| "#ffffff".into())),
                ..Default::default()
            });
            fx.events.push(OutputEvent::ScreenEffect { kind: "flash" });
            fx.timers.push((
                *duration_ms,
                Deferred::Patch(StatePatch::stage(StagePatch {
                    flash: Field::Clear,
                    ..Default::default()
                })),
            ));
        }

        CommandKind::ScreenTint { color, .. } => {
            fx.patch = StatePatch::stage(StagePatch {
                tint: Field::from_option(color.clone()),
                ..Default::default()
            });
            fx.events.push(OutputEvent::ScreenEffect { kind: "tint" });
        }

        CommandKind::PanZoom { x, y, scale, .. } => {
            fx.patch = StatePatch::stage(StagePatch {
                pan_zoom: Field::Set(PanZoom {
                    x: *x,
                    y: *y,
                    scale: *scale,
                }),
                ..Default::default()
            });
            fx.events.push(OutputEvent::ScreenEffect { kind: "panZoom" });
        }

        CommandKind::ShowTextOverlay {
            overlay_id,
            text,
            position,
            duration_ms,
        } => {
            fx.patch = StatePatch::ui(UiPatch {
                overlays: vec![(
                    overlay_id.clone(),
                    Some(Overlay::Text {
                        text: interpolate(text, hctx),
                        position: position.clone(),
                    }),
                )],
                ..Default::default()
            });
            fx.events.push(OutputEvent::OverlayChanged);
            push_overlay_expiry(&mut fx, overlay_id, *duration_ms);
        }

        CommandKind::ShowImageOverlay {
            overlay_id,
            asset_id,
            position,
            duration_ms,
        } => {
            let url = hctx.assets.resolve(asset_id, AssetKind::Image);
            if url.is_none() {
                log::warn!("overlay image '{}' not found", asset_id);
            }
            fx.patch = StatePatch::ui(UiPatch {
                overlays: vec![(
                    overlay_id.clone(),
                    Some(Overlay::Image {
                        asset_id: asset_id.clone(),
                        url,
                        position: position.clone(),
                    }),
                )],
                ..Default::default()
            });
            fx.events.push(OutputEvent::OverlayChanged);
            push_overlay_expiry(&mut fx, overlay_id, *duration_ms);
        }

        CommandKind::ShowButtonOverlay {
            overlay_id,
            text,
            target_scene_id,
            target_label_id,
        } => {
            fx.patch = StatePatch::ui(UiPatch {
                overlays: vec![(
                    overlay_id.clone(),
                    Some(Overlay::Button {
                        text: interpolate(text, hctx),
                        target_scene_id: target_scene_id.clone(),
                        target_label_id: target_label_id.clone(),
                        origin_scene_id: hctx.current_scene_id.to_string(),
                    }),
                )],
                ..Default::default()
            });
            fx.events.push(OutputEvent::OverlayChanged);
        }

        CommandKind::HideOverlay { overlay_id } => {
            if !hctx.ctx.ui.overlays.contains_key(overlay_id) {
                log::debug!("hideOverlay: '{}' not present", overlay_id);
                return fx;
            }
            fx.patch = StatePatch::ui(UiPatch {
                overlays: vec![(overlay_id.clone(), None)],
                ..Default::default()
            });
            fx.events.push(OutputEvent::OverlayChanged);
        }

        CommandKind::ClearOverlays => {
            fx.patch = StatePatch::ui(UiPatch {
                clear_overlays: true,
                ..Default::default()
            });
            fx.events.push(OutputEvent::OverlayChanged);
        }

        CommandKind::ShowDialogueBox => {
            fx.patch = StatePatch::ui(UiPatch {
                dialogue_box_visible: Some(true),
                ..Default::default()
            });
        }
        CommandKind::HideDialogueBox => {
            fx.patch = StatePatch::ui(UiPatch {
                dialogue_box_visible: Some(false),
                ..Default::default()
            });
        }
    }

    fx
}

/// Sprite assets follow the `{characterId}_{expression}` convention the
/// editor uses when it imports expression sheets.
pub fn sprite_asset_id(character_id: &str, expression: Option<&str>) -> String {
    match expression {
        Some(expr) => format!("{}_{}", character_id, expr),
        None => character_id.to_string(),
    }
}

fn clear_character_transition(character_id: &str) -> StatePatch {
    StatePatch::stage(StagePatch {
        clear_transitions: vec![character_id.to_string()],
        ..Default::default()
    })
}

fn push_overlay_expiry(fx: &mut CommandEffect, overlay_id: &str, duration_ms: Option<u64>) {
    if let Some(duration) = duration_ms {
        fx.timers.push((
            duration,
            Deferred::Patch(StatePatch::ui(UiPatch {
                overlays: vec![(overlay_id.to_string(), None)],
                ..Default::default()
            })),
        ));
    }
}

fn music_channel_patch(id: ChannelId, state: ChannelState) -> StatePatch {
    StatePatch::music(match id {
        ChannelId::Music => MusicPatch {
            music: Some(state),
            ..Default::default()
        },
        ChannelId::Ambient => MusicPatch {
            ambient: Some(state),
            ..Default::default()
        },
    })
}

static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();

/// Replace `{variableName}` placeholders with the variable's value.
/// Names are display identity; the session map is still keyed by id.
pub fn interpolate(text: &str, hctx: &HandlerCtx) -> String {
    if !text.contains('{') {
        return text.to_string();
    }
    let re = PLACEHOLDER
        .get_or_init(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder regex"));
    re.replace_all(text, |caps: &regex::Captures| {
        let name = &caps[1];
        hctx.project
            .variable_by_name(name)
            .and_then(|decl| hctx.ctx.vars.get(&decl.id))
            .map(Scalar::as_text)
            .unwrap_or_else(|| caps[0].to_string())
    })
    .into_owned()
}
