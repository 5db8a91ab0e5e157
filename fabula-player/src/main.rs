mod config_gen;
mod setup;
mod terminal;

use std::env;
use std::thread;
use std::time::Duration;

use fabula_core::config::{PlaybackConfig, SystemConfig};
use fabula_core::driver::{Presenter, SessionHandle};
use fabula_core::runtime::Ctx;
use fabula_core::{LoopState, ProjectManager};

use crate::terminal::TerminalPresenter;

const TICK_MS: u64 = 16;

fn main() {
    setup::init();
    log::info!(">>> Fabula Player Started <<<");

    let sys_cfg: SystemConfig = fabula_shared::config::get("system");
    let project_path = env::args().nth(1).unwrap_or(sys_cfg.project_path);

    log::info!("Loading project from: {}", project_path);

    let mut manager = ProjectManager::new();
    if let Err(e) = manager.load(&project_path) {
        log::error!("Project load failed: {:?}", e);
        eprintln!("Could not load project '{}': {}", project_path, e);
        std::process::exit(1);
    }

    let project = manager.project();
    let playback: PlaybackConfig = fabula_shared::config::get("playback");

    let mut ctx = Ctx::for_project(&project, playback.history_limit);
    let mut session = SessionHandle::new(&mut ctx, project);
    let mut presenter = TerminalPresenter;

    loop {
        let state = session.state();
        if state == LoopState::Ended && ctx.event_queue.is_empty() {
            break;
        }

        match state {
            LoopState::Idle | LoopState::Executing => {
                session.step(&mut ctx);
            }
            LoopState::Transitioning => {
                thread::sleep(Duration::from_millis(TICK_MS));
                session.tick(&mut ctx, TICK_MS);
            }
            LoopState::WaitingForInput | LoopState::Ended => {}
        }

        let events = ctx.drain();
        let mut fed = false;
        for ev in &events {
            if let Some(input) = presenter.present(ev, &ctx) {
                session.feed(&mut ctx, input);
                fed = true;
            }
        }

        // Waiting with nothing new on screen: the last prompt was
        // answered by a save/load, ask again.
        if session.state() == LoopState::WaitingForInput && !fed && events.is_empty() {
            if let Some(input) = presenter.idle_prompt() {
                session.feed(&mut ctx, input);
            }
        }
    }

    log::info!("Session ended");
}
