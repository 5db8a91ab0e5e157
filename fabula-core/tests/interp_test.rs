mod common;

use common::*;
use fabula_core::event::{InputEvent, OutputEvent};
use fabula_core::{Interpreter, LoopState};
use fabula_doc::{ChoiceOption, Command, CommandKind, ConditionOp, MutationOp, Scalar};

#[test]
fn test_dialogue_then_jump() {
    let project = project(
        vec![
            scene("s1", vec![dialogue("c1", "Hi"), jump("c2", "s2")]),
            scene("s2", vec![dialogue("c3", "Welcome")]),
        ],
        vec![],
    );
    let (mut interp, mut ctx) = session(&project);

    assert_eq!(pump(&mut interp, &mut ctx), LoopState::WaitingForInput);
    assert_eq!(interp.current_scene_id(), Some("s1"));
    assert_eq!(interp.current_index(), Some(0));

    interp.feed(&mut ctx, InputEvent::Advance);
    assert_eq!(pump(&mut interp, &mut ctx), LoopState::WaitingForInput);

    // Jump dispatched: new scene, index 0, call stack reset to one frame.
    assert_eq!(interp.current_scene_id(), Some("s2"));
    assert_eq!(interp.current_index(), Some(0));
    assert_eq!(interp.stack_depth(), 1);
    assert_eq!(
        ctx.ui.dialogue.as_ref().map(|d| d.text.as_str()),
        Some("Welcome")
    );
}

#[test]
fn test_branch_skip_on_false_condition() {
    // X = "b": the guarded region is skipped, only index 3 runs.
    let project = project(
        vec![scene(
            "s1",
            vec![
                branch_start(
                    "c0",
                    "b1",
                    vec![cond("var_x", ConditionOp::Eq, Some(Scalar::from("a")))],
                ),
                dialogue("c1", "Only if a"),
                branch_end("c2", "b1"),
                dialogue("c3", "Always"),
            ],
        )],
        vec![str_var("var_x", "X", Some("b"))],
    );
    let (mut interp, mut ctx) = session(&project);

    assert_eq!(pump(&mut interp, &mut ctx), LoopState::WaitingForInput);
    assert_eq!(interp.current_index(), Some(3));
    assert_eq!(ctx.history.len(), 1);
    assert_eq!(ctx.history[0].text, "Always");
}

#[test]
fn test_branch_taken_on_true_condition() {
    let project = project(
        vec![scene(
            "s1",
            vec![
                branch_start(
                    "c0",
                    "b1",
                    vec![cond("var_x", ConditionOp::Eq, Some(Scalar::from("a")))],
                ),
                dialogue("c1", "Only if a"),
                branch_end("c2", "b1"),
                dialogue("c3", "Always"),
            ],
        )],
        vec![str_var("var_x", "X", Some("a"))],
    );
    let (mut interp, mut ctx) = session(&project);

    assert_eq!(pump(&mut interp, &mut ctx), LoopState::WaitingForInput);
    assert_eq!(interp.current_index(), Some(1));
    interp.feed(&mut ctx, InputEvent::Advance);
    assert_eq!(pump(&mut interp, &mut ctx), LoopState::WaitingForInput);
    assert_eq!(interp.current_index(), Some(3));
    let texts: Vec<&str> = ctx.history.iter().map(|h| h.text.as_str()).collect();
    assert_eq!(texts, vec!["Only if a", "Always"]);
}

#[test]
fn test_unmatched_branch_start_advances_one() {
    let project = project(
        vec![scene(
            "s1",
            vec![
                branch_start(
                    "c0",
                    "orphan",
                    vec![cond("missing", ConditionOp::IsTrue, None)],
                ),
                dialogue("c1", "Still reached"),
            ],
        )],
        vec![],
    );
    let (mut interp, mut ctx) = session(&project);

    assert_eq!(pump(&mut interp, &mut ctx), LoopState::WaitingForInput);
    assert_eq!(interp.current_index(), Some(1));
}

#[test]
fn test_reentrant_step_does_not_redispatch() {
    let project = project(vec![scene("s1", vec![dialogue("c1", "Once")])], vec![]);
    let (mut interp, mut ctx) = session(&project);

    for _ in 0..5 {
        interp.step(&mut ctx);
    }
    assert_eq!(ctx.history.len(), 1);
    assert_eq!(
        ctx.event_queue
            .iter()
            .filter(|e| matches!(e, OutputEvent::ShowDialogue { .. }))
            .count(),
        1
    );
}

#[test]
fn test_condition_skips_command_without_dispatch() {
    let project = project(
        vec![scene(
            "s1",
            vec![
                guarded(
                    dialogue("c1", "Hidden"),
                    cond("var_never", ConditionOp::IsTrue, None),
                ),
                dialogue("c2", "Shown"),
            ],
        )],
        vec![],
    );
    let (mut interp, mut ctx) = session(&project);

    assert_eq!(pump(&mut interp, &mut ctx), LoopState::WaitingForInput);
    assert_eq!(interp.current_index(), Some(1));
    assert_eq!(ctx.history.len(), 1);
    assert_eq!(ctx.history[0].text, "Shown");
}

#[test]
fn test_set_variable_add_on_missing_value() {
    let project = project(
        vec![scene(
            "s1",
            vec![
                set_var("c1", "var_count", MutationOp::Add, Some(Scalar::Num(5.0))),
                dialogue("c2", "done"),
            ],
        )],
        vec![num_var("var_count", "count")],
    );
    let (mut interp, mut ctx) = session(&project);

    pump(&mut interp, &mut ctx);
    assert_eq!(ctx.vars.get("var_count"), Some(&Scalar::Num(5.0)));
}

#[test]
fn test_end_of_list_advances_to_next_scene_in_order() {
    let project = project(
        vec![
            scene("s1", vec![set_var("c1", "var_n", MutationOp::Add, Some(Scalar::Num(1.0)))]),
            scene("s2", vec![dialogue("c2", "Second")]),
        ],
        vec![num_var("var_n", "n")],
    );
    let (mut interp, mut ctx) = session(&project);

    assert_eq!(pump(&mut interp, &mut ctx), LoopState::WaitingForInput);
    assert_eq!(interp.current_scene_id(), Some("s2"));
}

#[test]
fn test_session_end_signals_return_to_title() {
    let project = project(vec![scene("s1", vec![dialogue("c1", "Bye")])], vec![]);
    let (mut interp, mut ctx) = session(&project);

    pump(&mut interp, &mut ctx);
    interp.feed(&mut ctx, InputEvent::Advance);
    assert_eq!(pump(&mut interp, &mut ctx), LoopState::Ended);
    assert!(
        ctx.event_queue
            .iter()
            .any(|e| matches!(e, OutputEvent::ReturnToTitle))
    );

    // Ended is terminal and re-entrant.
    assert_eq!(interp.step(&mut ctx), LoopState::Ended);
}

#[test]
fn test_call_scene_and_return() {
    let project = project(
        vec![
            scene("s1", vec![call_scene("c1", "s_sub"), dialogue("c2", "after")]),
            scene("s_sub", vec![dialogue("c3", "sub")]),
        ],
        vec![],
    );
    let (mut interp, mut ctx) = session(&project);

    assert_eq!(pump(&mut interp, &mut ctx), LoopState::WaitingForInput);
    assert_eq!(interp.current_scene_id(), Some("s_sub"));
    assert_eq!(interp.stack_depth(), 2);

    interp.feed(&mut ctx, InputEvent::Advance);
    assert_eq!(pump(&mut interp, &mut ctx), LoopState::WaitingForInput);

    // Sub-scene exhausted: caller resumes at its saved index.
    assert_eq!(interp.current_scene_id(), Some("s1"));
    assert_eq!(interp.stack_depth(), 1);
    assert_eq!(ctx.ui.dialogue.as_ref().map(|d| d.text.as_str()), Some("after"));
}

#[test]
fn test_explicit_return_to_caller() {
    let project = project(
        vec![
            scene("s1", vec![call_scene("c1", "s_sub"), dialogue("c2", "back")]),
            scene(
                "s_sub",
                vec![
                    Command::new("c3", CommandKind::ReturnToCaller),
                    dialogue("c4", "unreachable"),
                ],
            ),
        ],
        vec![],
    );
    let (mut interp, mut ctx) = session(&project);

    assert_eq!(pump(&mut interp, &mut ctx), LoopState::WaitingForInput);
    assert_eq!(interp.current_scene_id(), Some("s1"));
    assert_eq!(ctx.ui.dialogue.as_ref().map(|d| d.text.as_str()), Some("back"));
}

#[test]
fn test_jump_to_label_within_scene() {
    let project = project(
        vec![scene(
            "s1",
            vec![
                jump_label("c1", "lbl_end"),
                dialogue("c2", "skipped"),
                label("c3", "lbl_end"),
                dialogue("c4", "landed"),
            ],
        )],
        vec![],
    );
    let (mut interp, mut ctx) = session(&project);

    assert_eq!(pump(&mut interp, &mut ctx), LoopState::WaitingForInput);
    assert_eq!(interp.current_index(), Some(3));
    assert_eq!(ctx.history[0].text, "landed");
}

#[test]
fn test_missing_label_fails_open() {
    let project = project(
        vec![scene(
            "s1",
            vec![jump_label("c1", "nowhere"), dialogue("c2", "continued")],
        )],
        vec![],
    );
    let (mut interp, mut ctx) = session(&project);

    assert_eq!(pump(&mut interp, &mut ctx), LoopState::WaitingForInput);
    assert_eq!(ctx.history[0].text, "continued");
}

#[test]
fn test_choice_selection_jumps() {
    let project = project(
        vec![
            scene(
                "s1",
                vec![Command::new(
                    "c1",
                    CommandKind::Choice {
                        prompt: Some("Pick".into()),
                        options: vec![
                            ChoiceOption {
                                text: "Stay".into(),
                                target_scene_id: None,
                                target_label_id: None,
                                conditions: vec![],
                            },
                            ChoiceOption {
                                text: "Go".into(),
                                target_scene_id: Some("s2".into()),
                                target_label_id: None,
                                conditions: vec![],
                            },
                        ],
                    },
                )],
            ),
            scene("s2", vec![dialogue("c2", "Gone")]),
        ],
        vec![],
    );
    let (mut interp, mut ctx) = session(&project);

    assert_eq!(pump(&mut interp, &mut ctx), LoopState::WaitingForInput);
    assert!(ctx.ui.choice.is_some());

    interp.feed(&mut ctx, InputEvent::ChoiceMade { index: 1 });
    assert_eq!(pump(&mut interp, &mut ctx), LoopState::WaitingForInput);
    assert_eq!(interp.current_scene_id(), Some("s2"));
    assert!(ctx.ui.choice.is_none());
    assert!(ctx.history.iter().any(|h| h.choice && h.text == "Go"));
}

#[test]
fn test_choice_options_filtered_by_conditions() {
    let project = project(
        vec![scene(
            "s1",
            vec![Command::new(
                "c1",
                CommandKind::Choice {
                    prompt: None,
                    options: vec![
                        ChoiceOption {
                            text: "Locked".into(),
                            target_scene_id: None,
                            target_label_id: None,
                            conditions: vec![cond("var_key", ConditionOp::IsTrue, None)],
                        },
                        ChoiceOption {
                            text: "Open".into(),
                            target_scene_id: None,
                            target_label_id: None,
                            conditions: vec![],
                        },
                    ],
                },
            )],
        )],
        vec![],
    );
    let (mut interp, mut ctx) = session(&project);

    pump(&mut interp, &mut ctx);
    let open = ctx.ui.choice.as_ref().expect("choice open");
    assert_eq!(open.options, vec!["Open".to_string()]);
}

#[test]
fn test_wait_timer_fires() {
    let project = project(
        vec![scene("s1", vec![wait("c1", 500, false), dialogue("c2", "after wait")])],
        vec![],
    );
    let (mut interp, mut ctx) = session(&project);

    assert_eq!(pump(&mut interp, &mut ctx), LoopState::Transitioning);
    assert_eq!(interp.current_index(), Some(0));

    interp.tick(&mut ctx, 200);
    assert_eq!(interp.state(), LoopState::Transitioning);

    interp.tick(&mut ctx, 400);
    assert_eq!(pump(&mut interp, &mut ctx), LoopState::WaitingForInput);
    assert_eq!(ctx.history[0].text, "after wait");
}

#[test]
fn test_skippable_wait_input_race() {
    let project = project(
        vec![scene("s1", vec![wait("c1", 10_000, true), dialogue("c2", "done")])],
        vec![],
    );
    let (mut interp, mut ctx) = session(&project);

    assert_eq!(pump(&mut interp, &mut ctx), LoopState::Transitioning);

    // Manual advance wins the race and cancels the timer.
    interp.feed(&mut ctx, InputEvent::Advance);
    assert_eq!(pump(&mut interp, &mut ctx), LoopState::WaitingForInput);
    assert_eq!(interp.current_index(), Some(1));
    assert_eq!(interp.pending_effects(), 0);

    // The dead timer must not advance the cursor a second time.
    interp.tick(&mut ctx, 20_000);
    assert_eq!(interp.current_index(), Some(1));
}

#[test]
fn test_non_skippable_wait_ignores_advance() {
    let project = project(
        vec![scene("s1", vec![wait("c1", 1_000, false), dialogue("c2", "done")])],
        vec![],
    );
    let (mut interp, mut ctx) = session(&project);

    assert_eq!(pump(&mut interp, &mut ctx), LoopState::Transitioning);
    interp.feed(&mut ctx, InputEvent::Advance);
    assert_eq!(interp.state(), LoopState::Transitioning);
    assert_eq!(interp.current_index(), Some(0));
}

#[test]
fn test_async_wait_does_not_block() {
    let mut cmd = wait("c1", 60_000, false);
    cmd.run_async = true;
    let project = project(vec![scene("s1", vec![cmd, dialogue("c2", "instant")])], vec![]);
    let (mut interp, mut ctx) = session(&project);

    assert_eq!(pump(&mut interp, &mut ctx), LoopState::WaitingForInput);
    assert_eq!(ctx.history[0].text, "instant");
}

#[test]
fn test_screen_shake_clears_after_duration() {
    let project = project(
        vec![scene(
            "s1",
            vec![
                Command::new(
                    "c1",
                    CommandKind::ScreenShake {
                        intensity: 0.8,
                        duration_ms: 300,
                    },
                ),
                dialogue("c2", "shaking"),
            ],
        )],
        vec![],
    );
    let (mut interp, mut ctx) = session(&project);

    assert_eq!(pump(&mut interp, &mut ctx), LoopState::WaitingForInput);
    assert!(ctx.stage.effects.shake.is_some());

    interp.tick(&mut ctx, 300);
    assert!(ctx.stage.effects.shake.is_none());
}

#[test]
fn test_scene_jump_cancels_stale_timers() {
    // The shake-clearing timer armed in s1 must not fire into s2.
    let shake = Command::new(
        "c1",
        CommandKind::ScreenShake {
            intensity: 1.0,
            duration_ms: 1_000,
        },
    );
    let project = project(
        vec![
            scene("s1", vec![shake, jump("c2", "s2")]),
            scene("s2", vec![dialogue("c3", "calm")]),
        ],
        vec![],
    );
    let (mut interp, mut ctx) = session(&project);

    assert_eq!(pump(&mut interp, &mut ctx), LoopState::WaitingForInput);
    assert_eq!(interp.current_scene_id(), Some("s2"));
    assert_eq!(interp.pending_effects(), 0);

    // Ticking past the old deadline changes nothing in the new scene.
    interp.tick(&mut ctx, 5_000);
    assert_eq!(interp.current_index(), Some(0));
}

#[test]
fn test_navigation_cycle_guard() {
    use fabula_doc::{Condition, Scene};

    let gate = |target: &str| -> Scene {
        Scene {
            id: target.into(),
            name: target.into(),
            commands: vec![dialogue(&format!("d_{target}"), target)],
            entry_conditions: vec![Condition {
                variable_id: "var_undefined".into(),
                operator: ConditionOp::IsTrue,
                value: None,
            }],
            fallback_scene_id: Some(if target == "a" { "b".into() } else { "a".into() }),
        }
    };
    let project = project(vec![gate("a"), gate("b")], vec![]);

    use fabula_core::interp::navigate;
    let ctx = fabula_core::runtime::Ctx::for_project(&project, 200);
    // Terminates after the hop bound and falls open to the original
    // target.
    assert_eq!(navigate::resolve_entry_scene(&project, "a", &ctx.vars), "a");
}

#[test]
fn test_text_input_stores_typed_value() {
    let project = project(
        vec![scene(
            "s1",
            vec![
                Command::new(
                    "c1",
                    CommandKind::TextInput {
                        variable_id: "var_name".into(),
                        prompt: Some("Your name?".into()),
                    },
                ),
                dialogue("c2", "Hello {hero}"),
            ],
        )],
        vec![str_var("var_name", "hero", None)],
    );
    let (mut interp, mut ctx) = session(&project);

    assert_eq!(pump(&mut interp, &mut ctx), LoopState::WaitingForInput);
    // A plain advance must not resume a text prompt.
    interp.feed(&mut ctx, InputEvent::Advance);
    assert_eq!(interp.state(), LoopState::WaitingForInput);

    interp.feed(&mut ctx, InputEvent::TextSubmitted { value: "Mira".into() });
    assert_eq!(pump(&mut interp, &mut ctx), LoopState::WaitingForInput);
    assert_eq!(ctx.vars.get("var_name"), Some(&Scalar::Str("Mira".into())));
    assert_eq!(
        ctx.ui.dialogue.as_ref().map(|d| d.text.as_str()),
        Some("Hello Mira")
    );
}

#[test]
fn test_restore_rederives_commands_from_document() {
    let project = project(
        vec![scene("s1", vec![dialogue("c1", "Hi"), dialogue("c2", "There")])],
        vec![],
    );
    let (mut interp, mut ctx) = session(&project);
    pump(&mut interp, &mut ctx);

    // Snapshot without an embedded list, the forward-compat path.
    let mut snaps = interp.snapshot();
    for snap in &mut snaps {
        snap.commands = None;
    }

    let mut restored = Interpreter::with_config(
        project.clone(),
        Default::default(),
        Default::default(),
    );
    restored.restore(&mut ctx, snaps);
    assert_eq!(restored.current_scene_id(), Some("s1"));
    assert_eq!(pump(&mut restored, &mut ctx), LoopState::WaitingForInput);
}
