#![allow(dead_code)]

use std::sync::Arc;

use fabula_core::config::{AudioConfig, PlaybackConfig};
use fabula_core::runtime::Ctx;
use fabula_core::{Interpreter, LoopState};
use fabula_doc::{
    Command, CommandKind, Condition, ConditionOp, Project, Scalar, Scene, VarType, Variable,
};

pub fn dialogue(id: &str, text: &str) -> Command {
    Command::new(
        id,
        CommandKind::Dialogue {
            character_id: None,
            text: text.into(),
        },
    )
}

pub fn jump(id: &str, target: &str) -> Command {
    Command::new(
        id,
        CommandKind::Jump {
            target_scene_id: target.into(),
        },
    )
}

pub fn call_scene(id: &str, target: &str) -> Command {
    Command::new(
        id,
        CommandKind::CallScene {
            target_scene_id: target.into(),
        },
    )
}

pub fn label(id: &str, label_id: &str) -> Command {
    Command::new(
        id,
        CommandKind::Label {
            label_id: label_id.into(),
        },
    )
}

pub fn jump_label(id: &str, label_id: &str) -> Command {
    Command::new(
        id,
        CommandKind::JumpToLabel {
            label_id: label_id.into(),
        },
    )
}

pub fn wait(id: &str, duration_ms: u64, skippable: bool) -> Command {
    Command::new(
        id,
        CommandKind::Wait {
            duration_ms,
            skippable,
        },
    )
}

pub fn branch_start(id: &str, branch_id: &str, conditions: Vec<Condition>) -> Command {
    let mut cmd = Command::new(
        id,
        CommandKind::BranchStart {
            branch_id: branch_id.into(),
        },
    );
    cmd.conditions = conditions;
    cmd
}

pub fn branch_end(id: &str, branch_id: &str) -> Command {
    Command::new(
        id,
        CommandKind::BranchEnd {
            branch_id: branch_id.into(),
        },
    )
}

pub fn set_var(id: &str, variable_id: &str, operator: fabula_doc::MutationOp, value: Option<Scalar>) -> Command {
    Command::new(
        id,
        CommandKind::SetVariable {
            variable_id: variable_id.into(),
            operator,
            value,
            min: None,
            max: None,
        },
    )
}

pub fn guarded(mut cmd: Command, condition: Condition) -> Command {
    cmd.conditions.push(condition);
    cmd
}

pub fn cond(variable_id: &str, operator: ConditionOp, value: Option<Scalar>) -> Condition {
    Condition {
        variable_id: variable_id.into(),
        operator,
        value,
    }
}

pub fn num_var(id: &str, name: &str) -> Variable {
    Variable {
        id: id.into(),
        name: name.into(),
        var_type: VarType::Number,
        default: None,
    }
}

pub fn str_var(id: &str, name: &str, default: Option<&str>) -> Variable {
    Variable {
        id: id.into(),
        name: name.into(),
        var_type: VarType::String,
        default: default.map(Scalar::from),
    }
}

pub fn scene(id: &str, commands: Vec<Command>) -> Scene {
    Scene {
        id: id.into(),
        name: format!("Scene {id}"),
        commands,
        entry_conditions: vec![],
        fallback_scene_id: None,
    }
}

pub fn project(scenes: Vec<Scene>, variables: Vec<Variable>) -> Arc<Project> {
    Arc::new(Project {
        id: "proj_test".into(),
        name: "Test".into(),
        start_scene_id: scenes.first().map(|s| s.id.clone()),
        scenes,
        variables,
        characters: vec![],
        assets: vec![],
    })
}

/// A started session with default configs.
pub fn session(project: &Arc<Project>) -> (Interpreter, Ctx) {
    let mut interp = Interpreter::with_config(
        project.clone(),
        AudioConfig::default(),
        PlaybackConfig::default(),
    );
    let mut ctx = Ctx::for_project(project, 200);
    interp.start(&mut ctx);
    (interp, ctx)
}

/// Step until the loop suspends or ends.
pub fn pump(interp: &mut Interpreter, ctx: &mut Ctx) -> LoopState {
    for _ in 0..10_000 {
        match interp.step(ctx) {
            LoopState::Idle | LoopState::Executing => continue,
            settled => return settled,
        }
    }
    panic!("interpreter did not settle");
}
