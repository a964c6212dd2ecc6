// Compilation and persistence tests for the flat arrangement

use blockbot::arrangement::{compile, Arrangement, ArrangementError, Element};
use blockbot::blocks::{BlockRegistry, Node, Opcode, Parameterized, Program, Repeat};

const SCRIPT: &str = "\
# drive until something is close
set_motor_speed 70
repeat_forever
  forward_for 0.5
  if_obstacle_closer 15
    break
  end_if
end_repeat
turn_left_for 1.2
";

fn element(opcode: Opcode) -> Element {
    Element::new(opcode, None)
}

#[test]
fn test_compile_builds_nested_tree() {
    let registry = BlockRegistry::standard();
    let arrangement = Arrangement::from_script(SCRIPT, &registry).unwrap();
    let program = arrangement.compile().unwrap();

    assert_eq!(program.nodes.len(), 3);
    let Node::Repetition(repeat) = &program.nodes[1] else {
        panic!("expected a repetition, got {:?}", program.nodes[1]);
    };
    assert_eq!(repeat.count(), Repeat::Forever);
    assert_eq!(repeat.index, 1);
    assert_eq!(repeat.body.len(), 2);
    assert_eq!(repeat.body[1].opcode(), Opcode::IfObstacleCloser);
    assert_eq!(repeat.body[1].index(), 3);
    assert_eq!(repeat.body[1].body()[0].opcode(), Opcode::Break);
    // turn_left_for follows end_if (5) and end_repeat (6)
    assert_eq!(program.nodes[2].index(), 7);
}

#[test]
fn test_compile_rejects_stray_end() {
    let err = compile(&[element(Opcode::StopMotors), element(Opcode::EndIf)]).unwrap_err();
    assert!(matches!(err, ArrangementError::UnexpectedEnd { index: 1, .. }));
}

#[test]
fn test_compile_rejects_mismatched_end() {
    let err = compile(&[element(Opcode::IfTouched), element(Opcode::EndRepeat)]).unwrap_err();
    assert!(matches!(
        err,
        ArrangementError::MismatchedEnd {
            index: 1,
            open: "if_touched",
            found: "end_repeat"
        }
    ));
}

#[test]
fn test_compile_rejects_unclosed_block() {
    let err = compile(&[
        element(Opcode::RepeatForever),
        element(Opcode::IfTouched),
        element(Opcode::EndIf),
    ])
    .unwrap_err();
    assert!(matches!(err, ArrangementError::Unclosed { index: 0, .. }));
}

#[test]
fn test_flatten_round_trip() {
    let program = Program::new(vec![
        Node::set_motor_speed(30.0),
        Node::repeat(
            4,
            vec![
                Node::forward_for(1.0),
                Node::if_released(vec![Node::turn_right_for(0.5)]),
            ],
        ),
    ]);
    let arrangement = Arrangement::from_program(&program);
    assert_eq!(arrangement.len(), 7);
    assert_eq!(arrangement.compile().unwrap(), program);
}

#[test]
fn test_spans_cover_whole_blocks() {
    let registry = BlockRegistry::standard();
    let arrangement = Arrangement::from_script(SCRIPT, &registry).unwrap();

    assert_eq!(arrangement.span(0).unwrap(), 0..1);
    assert_eq!(arrangement.span(1).unwrap(), 1..7);
    assert_eq!(arrangement.span(3).unwrap(), 3..6);
    // An end marker maps back to its head
    assert_eq!(arrangement.span(6).unwrap(), 1..7);
    assert!(arrangement.span(8).is_err());
    assert_eq!(arrangement.depths(), vec![0, 0, 1, 1, 2, 1, 0, 0]);
}

#[test]
fn test_script_round_trip() {
    let registry = BlockRegistry::standard();
    let arrangement = Arrangement::from_script(SCRIPT, &registry).unwrap();
    let rendered = arrangement.to_script();

    assert!(rendered.contains("  if_obstacle_closer 15\n    break\n"));
    assert_eq!(Arrangement::from_script(&rendered, &registry).unwrap(), arrangement);
}

#[test]
fn test_json_round_trip_omits_missing_values() {
    let registry = BlockRegistry::standard();
    let arrangement = Arrangement::from_script(SCRIPT, &registry).unwrap();
    let json = arrangement.to_json().unwrap();

    assert!(json.contains("\"name\": \"repeat_forever\"\n"));
    assert!(json.contains("\"value\": 1.2"));
    assert_eq!(Arrangement::from_json(&json, &registry).unwrap(), arrangement);
}

#[test]
fn test_json_unknown_block_is_reported() {
    let registry = BlockRegistry::standard();
    let err = Arrangement::from_json(r#"[{"name": "fly_for", "value": 2}]"#, &registry)
        .unwrap_err();
    assert!(matches!(err, ArrangementError::Registry(_)));
}

#[test]
fn test_script_errors_carry_location() {
    let registry = BlockRegistry::standard();

    let err = Arrangement::from_script("wait_for 1\nhover 3\n", &registry).unwrap_err();
    assert!(matches!(err, ArrangementError::Script { line: 2, column: 1, .. }));

    let err = Arrangement::from_script("stop_motors 5\n", &registry).unwrap_err();
    assert!(matches!(err, ArrangementError::UnexpectedValue { .. }));

    let err = Arrangement::from_script("wait_for 1 2\n", &registry).unwrap_err();
    assert!(matches!(err, ArrangementError::Script { line: 1, .. }));
}

#[test]
fn test_palette_and_restore_origins() {
    use blockbot::blocks::Origin;

    let registry = BlockRegistry::standard();
    let palette = registry.create_blocks(Origin::Palette, "if_touched").unwrap();
    assert_eq!(palette.len(), 2);
    assert_eq!(palette[1].opcode, Opcode::EndIf);

    let restored = registry.create_blocks(Origin::Restore, "if_touched").unwrap();
    assert_eq!(restored.len(), 1);

    let fresh = registry.create_blocks(Origin::Palette, "turn_left_for").unwrap();
    assert_eq!(fresh[0].value, Some(0.5));

    assert!(!registry.palette().contains(&"end_if"));
    assert!(registry.create_blocks(Origin::Palette, "warp").is_err());
}

#[test]
fn test_action_values_scale_seconds() {
    assert_eq!(Element::new(Opcode::ForwardFor, Some(1.5)).action_value(), Some(1500));
    assert_eq!(Element::new(Opcode::SetMotorSpeed, Some(70.0)).action_value(), Some(70));
    assert_eq!(Element::new(Opcode::WaitFor, None).action_value(), Some(1000));
    assert_eq!(Element::new(Opcode::StopMotors, None).action_value(), None);
}

#[test]
fn test_json_out_of_range_value_is_rejected() {
    let registry = BlockRegistry::standard();
    let json = r#"[
        {"name": "wait_for", "value": 1},
        {"name": "repeat_times", "value": 5000000000},
        {"name": "end_repeat"}
    ]"#;
    let err = Arrangement::from_json(json, &registry).unwrap_err();
    assert!(matches!(
        err,
        ArrangementError::OutOfRange { index: 1, ref name, .. } if name == "repeat_times"
    ));

    let err = Arrangement::from_json(r#"[{"name": "forward_for", "value": -5}]"#, &registry)
        .unwrap_err();
    assert!(err.to_string().contains("forward_for"));
}

#[test]
fn test_script_out_of_range_value_is_rejected() {
    let registry = BlockRegistry::standard();
    let err = Arrangement::from_script("wait_for 1\nset_motor_speed 140\n", &registry).unwrap_err();
    match err {
        ArrangementError::Script { line, message, .. } => {
            assert_eq!(line, 2);
            assert!(message.contains("set_motor_speed"));
        }
        other => panic!("unexpected error: {other}"),
    }

    // Range bounds themselves are fine
    assert!(Arrangement::from_script("set_motor_speed 100\nwait_for 60\n", &registry).is_ok());
}

#[test]
fn test_huge_repeat_count_saturates() {
    let program = compile(&[
        Element::new(Opcode::RepeatTimes, Some(5_000_000_000.0)),
        Element::fresh(Opcode::EndRepeat),
    ])
    .unwrap();
    match &program.nodes[0] {
        Node::Repetition(block) => assert_eq!(block.count(), Repeat::Times(u32::MAX)),
        other => panic!("expected a repetition, got {other:?}"),
    }
}
