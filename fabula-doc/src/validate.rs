//! Structural lint over a loaded project. Findings flag authoring
//! defects; none of them stop playback (the runtime is fail-open), but
//! the loader reports them so the editor can surface broken documents.

use std::collections::HashSet;

use crate::command::CommandKind;
use crate::project::{Project, Scene};

#[derive(Debug, Clone, PartialEq)]
pub struct LintIssue {
    pub scene_id: Option<String>,
    pub message: String,
}

impl LintIssue {
    fn scene(scene: &Scene, message: String) -> Self {
        Self {
            scene_id: Some(scene.id.clone()),
            message,
        }
    }
}

pub fn lint_project(project: &Project) -> Vec<LintIssue> {
    let mut issues = Vec::new();

    let mut seen_scene_ids = HashSet::new();
    for scene in &project.scenes {
        if !seen_scene_ids.insert(scene.id.as_str()) {
            issues.push(LintIssue {
                scene_id: Some(scene.id.clone()),
                message: format!("duplicate scene id '{}'", scene.id),
            });
        }
        lint_branch_pairing(scene, &mut issues);
        lint_references(project, scene, &mut issues);
    }

    if let Some(start) = &project.start_scene_id {
        if project.scene(start).is_none() {
            issues.push(LintIssue {
                scene_id: None,
                message: format!("start scene '{}' does not exist", start),
            });
        }
    }

    issues
}

/// Every branchStart must have exactly one later branchEnd with the same
/// id in the same list; branches never span scenes.
fn lint_branch_pairing(scene: &Scene, issues: &mut Vec<LintIssue>) {
    let mut open: Vec<&str> = Vec::new();
    for cmd in &scene.commands {
        match &cmd.kind {
            CommandKind::BranchStart { branch_id } => {
                if scene
                    .commands
                    .iter()
                    .filter(|c| {
                        matches!(&c.kind, CommandKind::BranchStart { branch_id: b } if b == branch_id)
                    })
                    .count()
                    > 1
                {
                    issues.push(LintIssue::scene(
                        scene,
                        format!("branch id '{}' opened more than once", branch_id),
                    ));
                }
                open.push(branch_id);
            }
            CommandKind::BranchEnd { branch_id } => {
                if let Some(pos) = open.iter().rposition(|b| b == branch_id) {
                    open.remove(pos);
                } else {
                    issues.push(LintIssue::scene(
                        scene,
                        format!("branchEnd '{}' has no earlier branchStart", branch_id),
                    ));
                }
            }
            _ => {}
        }
    }
    for branch_id in open {
        issues.push(LintIssue::scene(
            scene,
            format!("branchStart '{}' is never closed", branch_id),
        ));
    }
}

fn lint_references(project: &Project, scene: &Scene, issues: &mut Vec<LintIssue>) {
    for cmd in &scene.commands {
        let missing_scene = match &cmd.kind {
            CommandKind::Jump { target_scene_id } | CommandKind::CallScene { target_scene_id } => {
                (project.scene(target_scene_id).is_none()).then_some(target_scene_id)
            }
            _ => None,
        };
        if let Some(target) = missing_scene {
            issues.push(LintIssue::scene(
                scene,
                format!("command '{}' targets unknown scene '{}'", cmd.id, target),
            ));
        }

        if let CommandKind::SetVariable { variable_id, .. } | CommandKind::TextInput { variable_id, .. } =
            &cmd.kind
        {
            if project.variable(variable_id).is_none() {
                issues.push(LintIssue::scene(
                    scene,
                    format!("command '{}' writes undeclared variable '{}'", cmd.id, variable_id),
                ));
            }
        }

        for cond in &cmd.conditions {
            if project.variable(&cond.variable_id).is_none() {
                issues.push(LintIssue::scene(
                    scene,
                    format!(
                        "condition on '{}' reads undeclared variable '{}'",
                        cmd.id, cond.variable_id
                    ),
                ));
            }
        }
    }
}
