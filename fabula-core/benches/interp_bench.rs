use std::sync::Arc;

use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use fabula_core::config::{AudioConfig, PlaybackConfig};
use fabula_core::event::InputEvent;
use fabula_core::runtime::Ctx;
use fabula_core::{Interpreter, LoopState};
use fabula_doc::{Command, CommandKind, MutationOp, Project, Scalar, Scene, VarType, Variable};

fn make_project(lines: usize) -> Arc<Project> {
    let mut commands = Vec::with_capacity(lines);
    for i in 0..lines {
        let id = format!("c{i}");
        let cmd = match i % 6 {
            0 => Command::new(
                id,
                CommandKind::Dialogue {
                    character_id: None,
                    text: format!("line {i}"),
                },
            ),
            1 => Command::new(
                id,
                CommandKind::SetVariable {
                    variable_id: "var_n".into(),
                    operator: MutationOp::Add,
                    value: Some(Scalar::Num(1.0)),
                    min: None,
                    max: None,
                },
            ),
            2 => Command::new(
                id,
                CommandKind::BranchStart {
                    branch_id: format!("b{i}"),
                },
            ),
            3 => Command::new(
                id,
                CommandKind::BranchEnd {
                    branch_id: format!("b{}", i - 1),
                },
            ),
            4 => Command::new(
                id,
                CommandKind::ScreenShake {
                    intensity: 0.5,
                    duration_ms: 100,
                },
            ),
            5 => Command::new(id, CommandKind::Group { name: None }),
            _ => unreachable!(),
        };
        commands.push(cmd);
    }

    Arc::new(Project {
        id: "bench".into(),
        name: "Bench".into(),
        start_scene_id: Some("s0".into()),
        scenes: vec![Scene {
            id: "s0".into(),
            name: "s0".into(),
            commands,
            entry_conditions: vec![],
            fallback_scene_id: None,
        }],
        variables: vec![Variable {
            id: "var_n".into(),
            name: "n".into(),
            var_type: VarType::Number,
            default: Some(Scalar::Num(0.0)),
        }],
        characters: vec![],
        assets: vec![],
    })
}

fn run_to_end(project: Arc<Project>) {
    let mut interp = Interpreter::with_config(
        project.clone(),
        AudioConfig::default(),
        PlaybackConfig::default(),
    );
    let mut ctx = Ctx::for_project(&project, 200);
    interp.start(&mut ctx);

    loop {
        match interp.step(&mut ctx) {
            LoopState::Idle | LoopState::Executing => {}
            LoopState::WaitingForInput => interp.feed(&mut ctx, InputEvent::Advance),
            LoopState::Transitioning => interp.tick(&mut ctx, 1_000),
            LoopState::Ended => break,
        }
        ctx.drain();
    }
}

fn bench_interpreter(c: &mut Criterion) {
    const LINES: usize = 10_000;
    let mut group = c.benchmark_group("interpreter");
    group.sample_size(10);

    let project = make_project(LINES);
    group.bench_function("run_10k_commands", |b| {
        b.iter_batched(|| project.clone(), run_to_end, BatchSize::LargeInput);
    });

    group.finish();
}

criterion_group!(benches, bench_interpreter);
criterion_main!(benches);
