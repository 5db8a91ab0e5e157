//! The interpreter loop: one logical step per invocation.
//!
//! The loop owns the call stack, the effect scheduler and the audio
//! director; the serializable session lives in [`Ctx`]. `step` is
//! re-entrant-safe: feeding the same state back in is an idempotent
//! no-op thanks to the dispatch signature, and no handler failure can
//! leave the loop permanently stalled.

mod call_stack;
mod frame;
pub mod handlers;
pub mod navigate;
pub mod scanner;

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use fabula_doc::{ChoiceOption, Command, CommandKind, Project, Scalar};

use crate::audio::AudioDirector;
use crate::condition::eval_conditions;
use crate::config::{AudioConfig, PlaybackConfig};
use crate::event::{InputEvent, OutputEvent};
use crate::interp::call_stack::CallStack;
use crate::interp::frame::Frame;
use crate::interp::handlers::{CommandEffect, HandlerCtx, NextAction, handle_command};
use crate::interp::scanner::Scanner;
use crate::runtime::assets::AssetSource;
use crate::runtime::ctx::Ctx;
use crate::runtime::patch::{Field, StagePatch, StatePatch, UiPatch};
use crate::runtime::stage::{HistoryRecord, Overlay};
use crate::scheduler::{Deferred, Handle, Scheduler};
use crate::storager::types::FrameSnapshot;
use crate::vars;

/// `(scene, index, command)` of the last dispatch; a repeat evaluation
/// of the same logical state must not dispatch twice.
type Signature = (String, usize, String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopState {
    #[default]
    Idle,
    Executing,
    WaitingForInput,
    Transitioning,
    Ended,
}

pub struct Interpreter {
    project: Arc<Project>,
    assets: Arc<dyn AssetSource>,
    call_stack: CallStack,
    scheduler: Scheduler,
    audio: AudioDirector,
    playback: PlaybackConfig,
    state: LoopState,
    last_sig: Option<Signature>,
    pending_choice: Option<Vec<ChoiceOption>>,
    pending_text: Option<String>,
    /// Armed skippable timer: manual advance races it, exactly one wins.
    wait_handle: Option<Handle>,
}

impl Interpreter {
    pub fn new(project: Arc<Project>) -> Self {
        let audio_cfg: AudioConfig = fabula_shared::config::get("audio");
        let playback: PlaybackConfig = fabula_shared::config::get("playback");
        Self::with_config(project, audio_cfg, playback)
    }

    pub fn with_config(project: Arc<Project>, audio_cfg: AudioConfig, playback: PlaybackConfig) -> Self {
        let assets: Arc<dyn AssetSource> = project.clone();
        Self {
            project,
            assets,
            call_stack: CallStack::default(),
            scheduler: Scheduler::default(),
            audio: AudioDirector::new(audio_cfg),
            playback,
            state: LoopState::Idle,
            last_sig: None,
            pending_choice: None,
            pending_text: None,
            wait_handle: None,
        }
    }

    /// Swap the asset lookup for one backed by a collaborator subsystem
    /// instead of the project's own table.
    pub fn with_assets(mut self, assets: Arc<dyn AssetSource>) -> Self {
        self.assets = assets;
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn current_scene_id(&self) -> Option<&str> {
        self.call_stack.top().map(|f| f.scene_id.as_str())
    }

    pub fn current_index(&self) -> Option<usize> {
        self.call_stack.top().map(|f| f.pc)
    }

    pub fn current_scene_name(&self) -> Option<String> {
        let id = self.current_scene_id()?;
        self.project.scene(id).map(|s| s.name.clone())
    }

    pub fn stack_depth(&self) -> usize {
        self.call_stack.len()
    }

    pub fn audio_mut(&mut self) -> &mut AudioDirector {
        &mut self.audio
    }

    pub fn pending_effects(&self) -> usize {
        self.scheduler.pending()
    }

    /// Begin a fresh run at the project's start scene.
    pub fn start(&mut self, ctx: &mut Ctx) {
        let start_id = match self.project.start_scene() {
            Some(scene) => scene.id.clone(),
            None => {
                log::error!("project '{}' has no scenes", self.project.id);
                self.end_session(ctx);
                return;
            }
        };
        let resolved = navigate::resolve_entry_scene(&self.project, &start_id, &ctx.vars);
        self.jump_to(ctx, &resolved);
    }

    /// Advance exactly one logical step.
    pub fn step(&mut self, ctx: &mut Ctx) -> LoopState {
        match self.state {
            LoopState::WaitingForInput | LoopState::Transitioning | LoopState::Ended => {
                return self.state;
            }
            LoopState::Idle | LoopState::Executing => {}
        }

        let Some(frame) = self.call_stack.top() else {
            return self.end_session(ctx);
        };

        if frame.pc >= frame.commands.len() {
            return self.finish_list(ctx);
        }

        let cmd = frame.current().expect("in bounds").clone();
        let scene_id = frame.scene_id.clone();
        let pc = frame.pc;

        let sig = (scene_id.clone(), pc, cmd.id.clone());
        if self.last_sig.as_ref() == Some(&sig) {
            return self.state;
        }

        // Structured skip regions resolve before any dispatch.
        match &cmd.kind {
            CommandKind::BranchStart { branch_id } => {
                if eval_conditions(&cmd.conditions, &ctx.vars, self.assets.as_ref()) {
                    self.advance();
                } else {
                    let commands = self.call_stack.top().expect("frame").commands.clone();
                    match navigate::matching_branch_end(&commands, pc, branch_id) {
                        Some(end) => self.set_pc(end + 1),
                        None => {
                            log::warn!(
                                "branchStart '{}' unmatched in scene '{}', stepping past it",
                                branch_id,
                                scene_id
                            );
                            self.advance();
                        }
                    }
                }
                self.state = LoopState::Executing;
                return self.state;
            }
            CommandKind::BranchEnd { .. } | CommandKind::Group { .. } => {
                self.advance();
                self.state = LoopState::Executing;
                return self.state;
            }
            _ => {}
        }

        // Guards on ordinary commands skip without dispatch.
        if !cmd.conditions.is_empty()
            && !eval_conditions(&cmd.conditions, &ctx.vars, self.assets.as_ref())
        {
            self.advance();
            self.state = LoopState::Executing;
            return self.state;
        }

        self.last_sig = Some(sig);
        self.state = LoopState::Executing;

        let result = {
            let mut hctx = HandlerCtx {
                ctx,
                project: &self.project,
                assets: self.assets.as_ref(),
                audio: &mut self.audio,
                cfg: &self.playback,
                current_scene_id: &scene_id,
            };
            catch_unwind(AssertUnwindSafe(|| handle_command(&mut hctx, &cmd)))
        };

        match result {
            Ok(effect) => self.apply_effect(ctx, effect, cmd.run_async),
            Err(_) => {
                log::error!(
                    "handler panicked on {} '{}' at {}:{}, advancing past it",
                    cmd.type_tag(),
                    cmd.id,
                    scene_id,
                    pc
                );
                self.advance();
            }
        }
        self.state
    }

    /// Deliver a UI event. Everything that resumes a suspension point
    /// funnels through here.
    pub fn feed(&mut self, ctx: &mut Ctx, ev: InputEvent) {
        match ev {
            InputEvent::Advance => self.on_advance(ctx),
            InputEvent::ChoiceMade { index } => self.on_choice(ctx, index),
            InputEvent::TextSubmitted { value } => self.on_text(ctx, value),
            InputEvent::OverlayAction { overlay_id } => self.on_overlay(ctx, &overlay_id),
            InputEvent::Exit => {
                self.end_session(ctx);
            }
            // Slot traffic is the session driver's job, not the loop's.
            InputEvent::SaveRequest { .. } | InputEvent::LoadRequest { .. } => {}
        }
    }

    /// Advance wall-clock time: fires due effects and samples audio
    /// ramps. The host calls this from its single loop; patches from
    /// timers go through the same application path as handler patches.
    pub fn tick(&mut self, ctx: &mut Ctx, dt_ms: u64) {
        for action in self.scheduler.tick(dt_ms) {
            self.resolve_deferred(ctx, action);
        }
        let mut events = Vec::new();
        if let Some(patch) = self.audio.tick(dt_ms, &mut events) {
            ctx.apply(StatePatch::music(patch));
        }
        ctx.event_queue.extend(events);
    }

    pub fn snapshot(&self) -> Vec<FrameSnapshot> {
        self.call_stack
            .stack
            .iter()
            .map(|f| FrameSnapshot {
                scene_id: f.scene_id.clone(),
                pc: f.pc,
                commands: Some(f.commands.to_vec()),
            })
            .collect()
    }

    /// Rebuild the frame stack from a snapshot. Frames with no embedded
    /// command list re-derive it from the current document; frames whose
    /// scene vanished are dropped rather than failing the load.
    pub fn restore(&mut self, ctx: &mut Ctx, snaps: Vec<FrameSnapshot>) {
        self.scheduler.cancel_all();
        self.reset_transients();
        self.call_stack.clear();

        for snap in snaps {
            let commands: Arc<[Command]> = match snap.commands {
                Some(cmds) => Arc::from(cmds),
                None => match self.project.scene(&snap.scene_id) {
                    Some(scene) => Arc::from(scene.commands.as_slice()),
                    None => {
                        log::warn!(
                            "saved frame references missing scene '{}', dropping it",
                            snap.scene_id
                        );
                        continue;
                    }
                },
            };
            let mut pc = snap.pc;
            if pc > commands.len() {
                log::warn!(
                    "saved index {} out of range for scene '{}', clamping",
                    pc,
                    snap.scene_id
                );
                pc = commands.len();
            }
            self.call_stack.push(Frame::new(snap.scene_id, commands, pc));
        }

        let mut events = Vec::new();
        self.audio.restore(
            self.assets.as_ref(),
            &ctx.music.music,
            &ctx.music.ambient,
            &mut events,
        );
        ctx.event_queue.extend(events);

        self.state = if self.call_stack.is_empty() {
            LoopState::Ended
        } else {
            LoopState::Idle
        };
    }

    fn apply_effect(&mut self, ctx: &mut Ctx, effect: CommandEffect, run_async: bool) {
        ctx.apply(effect.patch);
        ctx.event_queue.extend(effect.events);
        for (delay_ms, action) in effect.timers {
            self.scheduler.schedule(delay_ms, action);
        }

        match effect.next {
            NextAction::Advance => self.advance(),
            NextAction::WaitInput => {
                if run_async {
                    // An async movie (or line) stays on stage while the
                    // story moves on.
                    self.advance();
                } else {
                    self.state = LoopState::WaitingForInput;
                }
            }
            NextAction::WaitChoice(options) => {
                self.pending_choice = Some(options);
                self.state = LoopState::WaitingForInput;
            }
            NextAction::WaitText { variable_id } => {
                self.pending_text = Some(variable_id);
                self.state = LoopState::WaitingForInput;
            }
            NextAction::Transition {
                delay_ms,
                then,
                skippable,
            } => {
                if run_async {
                    // Decoupled: the timer keeps running and applies its
                    // own later patch, but the cursor moves on now.
                    match then {
                        Deferred::Advance => {}
                        Deferred::Patch(patch) | Deferred::PatchAndAdvance(patch) => {
                            self.scheduler.schedule(delay_ms, Deferred::Patch(patch));
                        }
                    }
                    self.advance();
                } else {
                    let handle = self.scheduler.schedule(delay_ms, then);
                    if skippable {
                        self.wait_handle = Some(handle);
                    }
                    self.state = LoopState::Transitioning;
                }
            }
            NextAction::Jump(target) => {
                let resolved = navigate::resolve_entry_scene(&self.project, &target, &ctx.vars);
                self.jump_to(ctx, &resolved);
            }
            NextAction::JumpLabel(label) => self.jump_label(&label),
            NextAction::Call(target) => self.call_scene(ctx, &target),
            NextAction::Return => self.return_to_caller(ctx),
            NextAction::EndSession => {
                self.end_session(ctx);
            }
        }
    }

    fn resolve_deferred(&mut self, ctx: &mut Ctx, action: Deferred) {
        match action {
            Deferred::Advance => self.finish_transition(ctx, None),
            Deferred::Patch(patch) => ctx.apply(patch),
            Deferred::PatchAndAdvance(patch) => self.finish_transition(ctx, Some(patch)),
        }
    }

    fn finish_transition(&mut self, ctx: &mut Ctx, patch: Option<StatePatch>) {
        if let Some(patch) = patch {
            ctx.apply(patch);
        }
        if self.state == LoopState::Transitioning {
            self.wait_handle = None;
            self.advance();
            self.state = LoopState::Executing;
        } else {
            log::debug!("transition completion in state {:?}, ignoring", self.state);
        }
    }

    fn on_advance(&mut self, ctx: &mut Ctx) {
        if self.state == LoopState::Transitioning {
            if let Some(handle) = self.wait_handle.take() {
                self.scheduler.cancel(handle);
                self.advance();
                self.state = LoopState::Executing;
            }
            return;
        }
        if self.state != LoopState::WaitingForInput {
            return;
        }
        if self.pending_choice.is_some() || self.pending_text.is_some() {
            return;
        }
        if ctx.stage.movie.is_some() {
            ctx.apply(StatePatch::stage(StagePatch {
                movie: Field::Clear,
                ..Default::default()
            }));
            ctx.push(OutputEvent::StopMovie);
        }
        self.advance();
        self.state = LoopState::Executing;
    }

    fn on_choice(&mut self, ctx: &mut Ctx, index: usize) {
        if self.state != LoopState::WaitingForInput {
            return;
        }
        let Some(options) = self.pending_choice.take() else {
            return;
        };
        let Some(option) = options.get(index).cloned() else {
            log::warn!("choice index {} out of range ({})", index, options.len());
            self.pending_choice = Some(options);
            return;
        };

        ctx.apply(StatePatch {
            ui: Some(UiPatch {
                choice: Field::Clear,
                ..Default::default()
            }),
            history: vec![HistoryRecord {
                speaker: None,
                text: option.text.clone(),
                choice: true,
            }],
            ..Default::default()
        });

        self.advance();
        self.state = LoopState::Executing;

        if let Some(scene) = &option.target_scene_id {
            let resolved = navigate::resolve_entry_scene(&self.project, scene, &ctx.vars);
            self.jump_to(ctx, &resolved);
        } else if let Some(label) = &option.target_label_id {
            self.jump_label(label);
        }
    }

    fn on_text(&mut self, ctx: &mut Ctx, value: String) {
        if self.state != LoopState::WaitingForInput {
            return;
        }
        let Some(variable_id) = self.pending_text.take() else {
            return;
        };
        match self.project.variable(&variable_id) {
            Some(decl) => {
                let coerced = vars::coerce(decl.var_type, &Scalar::Str(value));
                ctx.apply(StatePatch {
                    vars: vec![(variable_id, coerced)],
                    ui: Some(UiPatch {
                        text_prompt: Field::Clear,
                        ..Default::default()
                    }),
                    ..Default::default()
                });
            }
            None => log::warn!("text input target '{}' is not declared", variable_id),
        }
        self.advance();
        self.state = LoopState::Executing;
    }

    fn on_overlay(&mut self, ctx: &mut Ctx, overlay_id: &str) {
        let Some(Overlay::Button {
            target_scene_id,
            target_label_id,
            origin_scene_id,
            ..
        }) = ctx.ui.overlays.get(overlay_id).cloned()
        else {
            log::warn!("overlay action on missing button '{}'", overlay_id);
            return;
        };

        if let Some(scene) = target_scene_id {
            let resolved = navigate::resolve_entry_scene(&self.project, &scene, &ctx.vars);
            self.jump_to(ctx, &resolved);
        } else if let Some(label) = target_label_id {
            // Labels resolve against the scene that was current when the
            // overlay appeared, which may no longer be the running one.
            if self.current_scene_id() == Some(origin_scene_id.as_str()) {
                self.jump_label(&label);
            } else {
                let Some(scene) = self.project.scene(&origin_scene_id) else {
                    log::warn!("overlay origin scene '{}' is gone", origin_scene_id);
                    return;
                };
                match navigate::resolve_label(&scene.commands, &label) {
                    Some(idx) => {
                        let commands: Arc<[Command]> = Arc::from(scene.commands.as_slice());
                        self.enter_frame(ctx, Frame::new(origin_scene_id, commands, idx));
                    }
                    None => {
                        log::warn!(
                            "label '{}' not found in overlay origin scene '{}'",
                            label,
                            origin_scene_id
                        );
                    }
                }
            }
        }
    }

    /// End-of-list policy: pop the caller if any, otherwise the next
    /// scene in declaration order, otherwise the session is over.
    fn finish_list(&mut self, ctx: &mut Ctx) -> LoopState {
        let finished = self.call_stack.pop().expect("frame");
        self.scheduler.cancel_all();
        self.wait_handle = None;
        self.last_sig = None;

        if !self.call_stack.is_empty() {
            self.state = LoopState::Executing;
            return self.state;
        }

        match navigate::next_scene(&self.project, &finished.scene_id, &ctx.vars) {
            Some(next_id) => {
                self.jump_to(ctx, &next_id);
                self.state
            }
            None => self.end_session(ctx),
        }
    }

    fn return_to_caller(&mut self, ctx: &mut Ctx) {
        let Some(finished) = self.call_stack.pop() else {
            self.end_session(ctx);
            return;
        };
        self.scheduler.cancel_all();
        self.wait_handle = None;
        self.last_sig = None;

        if self.call_stack.is_empty() {
            match navigate::next_scene(&self.project, &finished.scene_id, &ctx.vars) {
                Some(next_id) => self.jump_to(ctx, &next_id),
                None => {
                    self.end_session(ctx);
                }
            }
        } else {
            self.state = LoopState::Executing;
        }
    }

    /// Enter `scene_id` at index 0, clearing the call/return stack.
    /// The id must already be entry-resolved.
    fn jump_to(&mut self, ctx: &mut Ctx, scene_id: &str) {
        let Some(scene) = self.project.scene(scene_id) else {
            log::warn!("jump target '{}' does not exist, stepping past", scene_id);
            self.advance();
            return;
        };
        let commands: Arc<[Command]> = Arc::from(scene.commands.as_slice());
        self.call_stack.clear();
        self.enter_frame(ctx, Frame::new(scene.id.clone(), commands, 0));
    }

    /// Push a callee frame, leaving a return point after the call site.
    fn call_scene(&mut self, ctx: &mut Ctx, target: &str) {
        let resolved = navigate::resolve_entry_scene(&self.project, target, &ctx.vars);
        let Some(scene) = self.project.scene(&resolved) else {
            log::warn!("call target '{}' does not exist, stepping past", resolved);
            self.advance();
            return;
        };
        let commands: Arc<[Command]> = Arc::from(scene.commands.as_slice());
        let scene_id = scene.id.clone();
        self.advance();
        self.enter_frame_nested(ctx, Frame::new(scene_id, commands, 0));
    }

    fn jump_label(&mut self, label: &str) {
        let Some(frame) = self.call_stack.top() else {
            return;
        };
        match navigate::resolve_label(&frame.commands, label) {
            Some(idx) => {
                self.set_pc(idx);
                self.last_sig = None;
            }
            None => {
                log::warn!(
                    "label '{}' not found in scene '{}', stepping past",
                    label,
                    frame.scene_id
                );
                self.advance();
            }
        }
        self.state = LoopState::Executing;
    }

    /// Cancel-before-jump, reset the dispatch signature, clear pending
    /// input state, then make `frame` the only frame.
    fn enter_frame(&mut self, ctx: &mut Ctx, frame: Frame) {
        self.scheduler.cancel_all();
        self.reset_transients();
        self.call_stack.clear();
        self.push_with_preload(ctx, frame);
    }

    /// Like [`Self::enter_frame`] but keeps the callers below.
    fn enter_frame_nested(&mut self, ctx: &mut Ctx, frame: Frame) {
        self.scheduler.cancel_all();
        self.reset_transients();
        self.push_with_preload(ctx, frame);
    }

    fn push_with_preload(&mut self, ctx: &mut Ctx, frame: Frame) {
        let (images, audios) = Scanner::scan(
            &frame.commands,
            frame.pc,
            self.playback.preload_ahead,
            &self.project,
        );
        if !images.is_empty() || !audios.is_empty() {
            ctx.push(OutputEvent::Preload { images, audios });
        }
        self.call_stack.push(frame);
        self.state = LoopState::Idle;
    }

    fn end_session(&mut self, ctx: &mut Ctx) -> LoopState {
        self.scheduler.cancel_all();
        self.reset_transients();
        self.call_stack.clear();
        let mut events = Vec::new();
        self.audio.stop_all(&mut events);
        ctx.event_queue.extend(events);
        ctx.push(OutputEvent::ReturnToTitle);
        self.state = LoopState::Ended;
        self.state
    }

    fn reset_transients(&mut self) {
        self.last_sig = None;
        self.pending_choice = None;
        self.pending_text = None;
        self.wait_handle = None;
    }

    fn advance(&mut self) {
        if let Some(frame) = self.call_stack.top_mut() {
            frame.advance();
        }
    }

    fn set_pc(&mut self, pc: usize) {
        if let Some(frame) = self.call_stack.top_mut() {
            frame.pc = pc;
        }
    }
}
