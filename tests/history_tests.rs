// Undo/redo tests for the event log and the editor

use blockbot::arrangement::{Arrangement, Element, Entry};
use blockbot::blocks::{BlockRegistry, Opcode};
use blockbot::editor::{EditError, Editor};
use blockbot::history::{apply_inverse, Event, EventLog, HistoryError};

fn sample(registry: &BlockRegistry) -> Arrangement {
    Arrangement::from_script(
        "set_motor_speed 60\n\
         repeat_times 3\n\
           forward_for 1.5\n\
           if_touched\n\
             break\n\
           end_if\n\
         end_repeat\n\
         stop_motors\n",
        registry,
    )
    .unwrap()
}

fn opcodes(arrangement: &Arrangement) -> Vec<Opcode> {
    arrangement.elements().iter().map(|e| e.opcode).collect()
}

#[test]
fn test_add_inverse_law() {
    let registry = BlockRegistry::standard();
    let original = sample(&registry);
    let mut arrangement = original.clone();
    arrangement
        .insert(1, vec![Element::fresh(Opcode::IfTouched), Element::fresh(Opcode::EndIf)])
        .unwrap();
    let after = arrangement.clone();

    let add = Event::Add { index: 1, count: 2 };
    let redo = apply_inverse(&add, &mut arrangement, &registry).unwrap();
    assert_eq!(arrangement, original);
    assert!(matches!(&redo, Event::Delete { index: 1, entries } if entries.len() == 2));

    let again = apply_inverse(&redo, &mut arrangement, &registry).unwrap();
    assert_eq!(arrangement, after);
    assert_eq!(again, add);
}

#[test]
fn test_delete_inverse_restores_values() {
    let registry = BlockRegistry::standard();
    let original = sample(&registry);
    let mut arrangement = original.clone();
    let removed = arrangement.remove(1, 6).unwrap();
    let delete = Event::Delete {
        index: 1,
        entries: removed.iter().map(Element::to_entry).collect(),
    };

    let redo = apply_inverse(&delete, &mut arrangement, &registry).unwrap();
    assert_eq!(arrangement, original);
    assert_eq!(redo, Event::Add { index: 1, count: 6 });
    assert_eq!(arrangement.get(2).unwrap().value, Some(1.5));
}

#[test]
fn test_move_inverse_law() {
    let registry = BlockRegistry::standard();
    let original = sample(&registry);
    let mut arrangement = original.clone();
    // stop_motors to the front
    arrangement.move_span(7, 1, 0).unwrap();
    let moved = arrangement.clone();
    let event = Event::Move {
        index: 0,
        count: 1,
        previous: 7,
    };

    let redo = apply_inverse(&event, &mut arrangement, &registry).unwrap();
    assert_eq!(arrangement, original);
    assert_eq!(
        redo,
        Event::Move {
            index: 7,
            count: 1,
            previous: 0
        }
    );
    apply_inverse(&redo, &mut arrangement, &registry).unwrap();
    assert_eq!(arrangement, moved);
}

#[test]
fn test_parameter_change_inverse_law() {
    let registry = BlockRegistry::standard();
    let original = sample(&registry);
    let mut arrangement = original.clone();
    arrangement.set_value(0, Some(80.0)).unwrap();

    let event = Event::ParameterChange {
        index: 0,
        old_value: Some(60.0),
    };
    let redo = apply_inverse(&event, &mut arrangement, &registry).unwrap();
    assert_eq!(arrangement, original);
    assert_eq!(
        redo,
        Event::ParameterChange {
            index: 0,
            old_value: Some(80.0)
        }
    );
}

#[test]
fn test_failed_lookup_leaves_arrangement_unmodified() {
    let registry = BlockRegistry::standard();
    let mut arrangement = sample(&registry);
    let before = arrangement.clone();
    let event = Event::Delete {
        index: 2,
        entries: vec![
            Entry::new("wait_for", Some(1.0)),
            Entry::new("teleport", None),
        ],
    };

    let err = apply_inverse(&event, &mut arrangement, &registry).unwrap_err();
    assert!(matches!(err, HistoryError::Lookup(_)));
    assert_eq!(arrangement, before);
}

#[test]
fn test_failed_undo_keeps_event_in_history() {
    let registry = BlockRegistry::standard();
    let mut arrangement = sample(&registry);
    let mut log = EventLog::new();
    log.record(Event::Delete {
        index: 0,
        entries: vec![Entry::new("teleport", None)],
    });

    assert!(log.undo(&mut arrangement, &BlockRegistry::new()).is_err());
    assert!(log.can_undo());
    assert!(!log.can_redo());
    assert_eq!(arrangement, sample(&registry));
}

#[test]
fn test_out_of_range_event_is_rejected() {
    let registry = BlockRegistry::standard();
    let mut arrangement = sample(&registry);
    let before = arrangement.clone();
    let event = Event::Add {
        index: 6,
        count: 5,
    };

    assert!(matches!(
        apply_inverse(&event, &mut arrangement, &registry),
        Err(HistoryError::Arrangement(_))
    ));
    assert_eq!(arrangement, before);
}

#[test]
fn test_editor_undo_redo_cycle() {
    let mut editor = Editor::new(BlockRegistry::standard());
    editor.add("forward_for", 0).unwrap();
    editor.add("repeat_times", 1).unwrap();
    editor.add("wait_for", 2).unwrap();
    editor.set_value(0, 2.5).unwrap();
    let finished = editor.arrangement().clone();
    assert_eq!(
        opcodes(&finished),
        vec![
            Opcode::ForwardFor,
            Opcode::RepeatTimes,
            Opcode::WaitFor,
            Opcode::EndRepeat
        ]
    );

    editor.undo().unwrap();
    assert_eq!(editor.arrangement().get(0).unwrap().value, Some(1.0));
    editor.undo().unwrap();
    assert_eq!(editor.arrangement().len(), 3);
    assert!(editor.can_redo());

    editor.redo().unwrap();
    editor.redo().unwrap();
    assert_eq!(editor.arrangement(), &finished);
    assert!(!editor.can_redo());
}

#[test]
fn test_batch_undo_stops_at_empty_history() {
    let mut editor = Editor::new(BlockRegistry::standard());
    editor.add("stop_motors", 0).unwrap();
    editor.add("if_touched", 0).unwrap();
    editor.delete(0).unwrap();

    let undone = editor.undo_batch(10).unwrap();
    assert_eq!(undone.len(), 3);
    assert!(editor.arrangement().is_empty());
    assert!(!editor.can_undo());
    assert_eq!(editor.undo().unwrap(), None);
}

#[test]
fn test_record_clears_redo() {
    let mut editor = Editor::new(BlockRegistry::standard());
    editor.add("wait_for", 0).unwrap();
    editor.add("stop_motors", 1).unwrap();
    editor.undo().unwrap();
    assert!(editor.can_redo());

    editor.add("break", 1).unwrap();
    assert!(!editor.can_redo());
    assert_eq!(editor.redo().unwrap(), None);
}

#[test]
fn test_history_limit_drops_oldest() {
    let mut editor = Editor::new(BlockRegistry::standard()).with_history_limit(2);
    for i in 0..4 {
        editor.add("wait_for", i).unwrap();
    }
    assert_eq!(editor.log().len(), 2);
    assert_eq!(editor.undo_batch(5).unwrap().len(), 2);
    assert_eq!(editor.arrangement().len(), 2);
}

#[test]
fn test_delete_and_move_whole_spans() {
    let registry = BlockRegistry::standard();
    let mut editor = Editor::new(registry);
    editor
        .load_script("wait_for 1\nif_touched\n  stop_motors\nend_if\nforward_for 2\n")
        .unwrap();

    // Move the selection block (3 elements) to the end
    editor.move_span(1, 2).unwrap();
    assert_eq!(
        opcodes(editor.arrangement()),
        vec![
            Opcode::WaitFor,
            Opcode::ForwardFor,
            Opcode::IfTouched,
            Opcode::StopMotors,
            Opcode::EndIf
        ]
    );

    editor.delete(2).unwrap();
    assert_eq!(
        opcodes(editor.arrangement()),
        vec![Opcode::WaitFor, Opcode::ForwardFor]
    );

    editor.undo_batch(2).unwrap();
    assert_eq!(
        opcodes(editor.arrangement()),
        vec![
            Opcode::WaitFor,
            Opcode::IfTouched,
            Opcode::StopMotors,
            Opcode::EndIf,
            Opcode::ForwardFor
        ]
    );
}

#[test]
fn test_end_marker_cannot_be_deleted_alone() {
    let mut editor = Editor::new(BlockRegistry::standard());
    editor.add("repeat_forever", 0).unwrap();
    assert!(matches!(
        editor.delete(1),
        Err(EditError::EndMarker { index: 1 })
    ));
    assert_eq!(editor.arrangement().len(), 2);
}

#[test]
fn test_end_marker_cannot_be_added_alone() {
    let mut editor = Editor::new(BlockRegistry::standard());
    editor.add("wait_for", 0).unwrap();
    for name in ["end_if", "end_repeat"] {
        assert!(matches!(
            editor.add(name, 1),
            Err(EditError::NotInPalette { .. })
        ));
    }
    assert_eq!(editor.arrangement().len(), 1);
    assert_eq!(editor.log().len(), 1);
    assert!(editor.program().is_ok());
}
