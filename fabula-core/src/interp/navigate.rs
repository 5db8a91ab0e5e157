//! Scene and label resolution.

use fabula_doc::{Command, CommandKind, Project};

use crate::condition::eval_conditions;
use crate::vars::VarStore;

/// Fallback/next-scene chains longer than this are treated as cycles.
pub const MAX_RESOLVE_HOPS: usize = 50;

/// Resolve the scene actually entered when navigation targets
/// `target_id`: the target itself when its entry conditions hold,
/// otherwise its declared fallback, otherwise the next scene in
/// declaration order. Chains are bounded; on exhaustion the original
/// target comes back with a logged cycle warning, never an error.
pub fn resolve_entry_scene(project: &Project, target_id: &str, vars: &VarStore) -> String {
    let mut current = target_id.to_string();

    for _ in 0..MAX_RESOLVE_HOPS {
        let Some(scene) = project.scene(&current) else {
            log::warn!("navigation target '{}' does not exist", current);
            return target_id.to_string();
        };

        if eval_conditions(&scene.entry_conditions, vars, project) {
            return scene.id.clone();
        }

        if let Some(fallback) = &scene.fallback_scene_id {
            current = fallback.clone();
        } else if let Some(next) = project.scene_after(&scene.id) {
            current = next.id.clone();
        } else {
            log::warn!(
                "no admissible scene reachable from '{}', entering it anyway",
                target_id
            );
            return target_id.to_string();
        }
    }

    log::warn!(
        "navigation from '{}' exceeded {} hops, assuming a fallback cycle",
        target_id,
        MAX_RESOLVE_HOPS
    );
    target_id.to_string()
}

/// Declaration-order successor for the end-of-list policy, run through
/// the same entry resolution. `None` means the story is over.
pub fn next_scene(project: &Project, after_scene_id: &str, vars: &VarStore) -> Option<String> {
    let next = project.scene_after(after_scene_id)?;
    Some(resolve_entry_scene(project, &next.id, vars))
}

/// Linear scan of the current scene's list only; labels never resolve
/// across scenes.
pub fn resolve_label(commands: &[Command], label_id: &str) -> Option<usize> {
    commands.iter().position(
        |c| matches!(&c.kind, CommandKind::Label { label_id: l } if l == label_id),
    )
}

/// The matching end of a branch region, searched strictly after the
/// opening marker.
pub fn matching_branch_end(commands: &[Command], start: usize, branch_id: &str) -> Option<usize> {
    commands[start + 1..]
        .iter()
        .position(|c| matches!(&c.kind, CommandKind::BranchEnd { branch_id: b } if b == branch_id))
        .map(|offset| start + 1 + offset)
}
