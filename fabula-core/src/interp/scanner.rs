//! Lookahead over the upcoming command window so the adapter can start
//! fetching assets before the cursor reaches them. Stops at the first
//! control-flow command; predicting across a branch or jump is guessing.

use fabula_doc::{Command, CommandKind, Project};

use crate::interp::handlers::sprite_asset_id;

pub struct Scanner;

impl Scanner {
    pub fn scan(
        commands: &[Command],
        start_pc: usize,
        lookahead: usize,
        project: &Project,
    ) -> (Vec<String>, Vec<String>) {
        let mut images = Vec::new();
        let mut audios = Vec::new();

        for cmd in commands.iter().skip(start_pc).take(lookahead) {
            match &cmd.kind {
                CommandKind::SetBackground {
                    asset_id: Some(asset_id),
                    ..
                } => images.push(asset_id.clone()),
                CommandKind::ShowCharacter {
                    character_id,
                    expression,
                    ..
                } => {
                    let expression = expression.clone().or_else(|| {
                        project
                            .character(character_id)
                            .and_then(|c| c.default_expression.clone())
                    });
                    images.push(sprite_asset_id(character_id, expression.as_deref()));
                }
                CommandKind::ShowImageOverlay { asset_id, .. } => images.push(asset_id.clone()),
                CommandKind::PlayMusic { asset_id, .. }
                | CommandKind::PlayAmbient { asset_id, .. }
                | CommandKind::PlaySoundEffect { asset_id, .. } => audios.push(asset_id.clone()),
                CommandKind::PlayMovie { asset_id, .. } => images.push(asset_id.clone()),
                CommandKind::Jump { .. }
                | CommandKind::JumpToLabel { .. }
                | CommandKind::CallScene { .. }
                | CommandKind::ReturnToCaller
                | CommandKind::Choice { .. }
                | CommandKind::BranchStart { .. } => break,
                _ => {}
            }
        }

        (images, audios)
    }
}
