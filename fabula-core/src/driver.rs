//! Session driver: owns the interpreter and the slot store, intercepts
//! save/load traffic, and defines the contract a presentation adapter
//! implements.

use std::sync::Arc;

use fabula_doc::Project;

use crate::event::{InputEvent, OutputEvent};
use crate::interp::{Interpreter, LoopState};
use crate::runtime::ctx::Ctx;
use crate::storager::SlotStore;

/// A presentation adapter renders one event at a time and may answer
/// with an input.
pub trait Presenter {
    fn present(&mut self, out: &OutputEvent, ctx: &Ctx) -> Option<InputEvent>;
}

pub struct SessionHandle {
    interp: Interpreter,
    store: SlotStore,
}

impl SessionHandle {
    pub fn new(ctx: &mut Ctx, project: Arc<Project>) -> Self {
        let store = SlotStore::open(project.id.clone());
        let mut interp = Interpreter::new(project);
        interp.start(ctx);
        Self { interp, store }
    }

    pub fn with_parts(interp: Interpreter, store: SlotStore) -> Self {
        Self { interp, store }
    }

    pub fn state(&self) -> LoopState {
        self.interp.state()
    }

    #[inline]
    pub fn step(&mut self, ctx: &mut Ctx) -> LoopState {
        self.interp.step(ctx)
    }

    #[inline]
    pub fn tick(&mut self, ctx: &mut Ctx, dt_ms: u64) {
        self.interp.tick(ctx, dt_ms);
    }

    pub fn feed(&mut self, ctx: &mut Ctx, ev: InputEvent) {
        match ev {
            InputEvent::SaveRequest { slot } => {
                log::info!("Save request, slot {}", slot);
                let scene_name = self
                    .interp
                    .current_scene_name()
                    .or_else(|| self.interp.current_scene_id().map(str::to_string))
                    .unwrap_or_default();
                let meta = self
                    .store
                    .save(slot, ctx, self.interp.snapshot(), scene_name);
                log::info!("Saved '{}' at {}", meta.scene_name, meta.timestamp_ms);
            }
            InputEvent::LoadRequest { slot } => {
                log::info!("Load request, slot {}", slot);
                match self.store.load(slot) {
                    Ok(Some((new_ctx, stack))) => {
                        *ctx = new_ctx;
                        self.interp.restore(ctx, stack);
                        log::info!("Load finished");
                    }
                    Ok(None) => log::info!("Slot {} is empty", slot),
                    Err(e) => log::error!("Load failed: {:?}", e),
                }
            }
            other => self.interp.feed(ctx, other),
        }
    }
}
