// Execution tests for the block interpreter

use blockbot::blocks::{Node, Opcode, Program};
use blockbot::controller::simulated::SimulatedCar;
use blockbot::controller::{Controller, ControllerError, InputDevice, MotorPort, OutputDevice};
use blockbot::interpreter::{CancelToken, ExecutionCondition, Interpreter, RunError, RunState};
use blockbot::trace::{StepKind, Trace};
use std::collections::BTreeSet;
use std::time::Duration;

fn run_on<C: Controller>(
    nodes: Vec<Node>,
    controller: &mut C,
) -> (Result<RunState, RunError>, Trace, ExecutionCondition) {
    let program = Program::new(nodes);
    let mut interpreter = Interpreter::new();
    let mut cond = ExecutionCondition::default();
    let result = interpreter.run(&program, controller, &mut cond);
    (result, interpreter.trace().clone(), cond)
}

#[test]
fn test_bounded_repetition_runs_body_count_times() {
    let mut car = SimulatedCar::new();
    let (result, trace, cond) = run_on(vec![Node::repeat(3, vec![Node::forward_for(1.0)])], &mut car);

    assert_eq!(result.unwrap(), RunState::Completed);
    assert_eq!(trace.actions(), vec![Opcode::ForwardFor; 3]);
    assert_eq!(car.snapshot().clock, Duration::from_secs(3));
    assert_eq!(cond.loop_depth(), 0);
}

#[test]
fn test_zero_count_repetition_skips_body() {
    let mut car = SimulatedCar::new();
    let (result, trace, _) = run_on(
        vec![Node::repeat(0, vec![Node::forward_for(1.0)]), Node::wait_for(0.5)],
        &mut car,
    );

    assert_eq!(result.unwrap(), RunState::Completed);
    assert_eq!(trace.actions(), vec![Opcode::WaitFor]);
    assert!(car.snapshot().commands.is_empty());
}

#[test]
fn test_break_in_selection_exits_forever_loop() {
    let mut car = SimulatedCar::new().with_touch(true);
    let program = vec![
        Node::repeat_forever(vec![
            Node::forward_for(0.5),
            Node::if_touched(vec![Node::break_loop()]),
            Node::backward_for(0.5),
        ]),
        Node::stop_motors(),
    ];
    let (result, trace, cond) = run_on(program, &mut car);

    assert_eq!(result.unwrap(), RunState::Completed);
    // The break skips the rest of the body and is consumed by the loop
    assert_eq!(trace.actions(), vec![Opcode::ForwardFor, Opcode::StopMotors]);
    assert!(trace.steps().any(|s| s.kind == StepKind::Break));
    assert!(!cond.is_break_requested());
}

#[test]
fn test_break_only_exits_innermost_loop() {
    let mut car = SimulatedCar::new();
    let program = vec![Node::repeat(
        2,
        vec![
            Node::repeat_forever(vec![Node::wait_for(0.1), Node::break_loop()]),
            Node::forward_for(0.5),
        ],
    )];
    let (result, trace, _) = run_on(program, &mut car);

    assert_eq!(result.unwrap(), RunState::Completed);
    assert_eq!(
        trace.actions(),
        vec![
            Opcode::WaitFor,
            Opcode::ForwardFor,
            Opcode::WaitFor,
            Opcode::ForwardFor
        ]
    );
}

#[test]
fn test_break_outside_loop_ends_run() {
    let mut car = SimulatedCar::new();
    let program = vec![
        Node::forward_for(1.0),
        Node::break_loop(),
        Node::backward_for(1.0),
    ];
    let (result, trace, _) = run_on(program, &mut car);

    assert_eq!(result.unwrap(), RunState::Completed);
    assert_eq!(trace.actions(), vec![Opcode::ForwardFor]);
}

#[test]
fn test_false_selection_skips_body() {
    let mut car = SimulatedCar::new().with_touch(false);
    let program = vec![
        Node::if_touched(vec![Node::forward_for(1.0)]),
        Node::wait_for(0.2),
    ];
    let (result, trace, _) = run_on(program, &mut car);

    assert_eq!(result.unwrap(), RunState::Completed);
    assert_eq!(trace.actions(), vec![Opcode::WaitFor]);
    let first = trace.get(0).unwrap();
    assert_eq!(first.kind, StepKind::Condition { result: false });
    assert_eq!(first.index, 0);
}

#[test]
fn test_absent_devices_use_sentinels() {
    let mut car = SimulatedCar::new()
        .with_inputs(Vec::<InputDevice>::new())
        .with_motors(Vec::<MotorPort>::new());
    let program = vec![
        Node::if_touched(vec![Node::wait_for(1.0)]),
        Node::if_released(vec![Node::forward_for(1.0)]),
        // -1 is below any threshold
        Node::if_obstacle_closer(20.0, vec![Node::backward_for(1.0)]),
        Node::if_darker_than(30.0, vec![Node::turn_left_for(0.5)]),
    ];
    let (result, trace, _) = run_on(program, &mut car);

    assert_eq!(result.unwrap(), RunState::Completed);
    assert_eq!(
        trace.actions(),
        vec![Opcode::ForwardFor, Opcode::BackwardFor, Opcode::TurnLeftFor]
    );
    assert!(car.snapshot().commands.is_empty());
}

#[test]
fn test_end_to_end_scenario() {
    let mut car = SimulatedCar::new().with_touch(true);
    let program = vec![
        Node::set_motor_speed(70.0),
        Node::forward_for(1.5),
        Node::if_touched(vec![Node::break_loop()]),
        Node::forward_for(2.0),
    ];
    let (result, trace, cond) = run_on(program, &mut car);

    assert_eq!(result.unwrap(), RunState::Completed);
    assert_eq!(trace.actions(), vec![Opcode::SetMotorSpeed, Opcode::ForwardFor]);
    assert_eq!(cond.speed(), 70);

    let state = car.snapshot();
    let powers: Vec<(MotorPort, i32)> = state.commands.iter().map(|c| (c.port, c.power)).collect();
    assert_eq!(
        powers,
        vec![
            (MotorPort::B, 70),
            (MotorPort::C, 70),
            (MotorPort::B, 0),
            (MotorPort::C, 0)
        ]
    );
    assert_eq!(state.commands[2].at, Duration::from_millis(1500));
    assert_eq!(state.clock, Duration::from_millis(1500));
}

#[test]
fn test_turns_drive_motors_in_opposite_directions() {
    let mut car = SimulatedCar::new();
    let program = vec![
        Node::set_motor_speed(40.0),
        Node::turn_left_for(0.5),
        Node::turn_right_for(0.5),
        Node::backward_for(0.5),
    ];
    let (result, _, _) = run_on(program, &mut car);
    assert!(result.is_ok());

    let driven: Vec<(MotorPort, i32)> = car
        .snapshot()
        .commands
        .iter()
        .filter(|c| c.power != 0)
        .map(|c| (c.port, c.power))
        .collect();
    assert_eq!(
        driven,
        vec![
            (MotorPort::B, -40),
            (MotorPort::C, 40),
            (MotorPort::B, 40),
            (MotorPort::C, -40),
            (MotorPort::B, -40),
            (MotorPort::C, -40),
        ]
    );
}

#[test]
fn test_default_values_apply_when_unset() {
    use blockbot::arrangement::{Arrangement, Element};

    // Elements without a value fall back to the catalogue defaults
    let arrangement = Arrangement::from_elements(vec![
        Element::new(Opcode::RepeatTimes, None),
        Element::new(Opcode::WaitFor, None),
        Element::new(Opcode::EndRepeat, None),
    ]);
    let program = arrangement.compile().unwrap();
    let mut car = SimulatedCar::new();
    let mut interpreter = Interpreter::new();
    let mut cond = ExecutionCondition::default();
    interpreter.run(&program, &mut car, &mut cond).unwrap();

    assert_eq!(interpreter.trace().actions(), vec![Opcode::WaitFor; 2]);
    assert_eq!(car.snapshot().clock, Duration::from_secs(2));
}

/// Cancels the run from inside the controller after a number of pauses
struct CancellingCar {
    inner: SimulatedCar,
    token: CancelToken,
    pauses_left: usize,
}

impl Controller for CancellingCar {
    fn input_devices(&self) -> BTreeSet<InputDevice> {
        self.inner.input_devices()
    }

    fn output_devices(&self) -> BTreeSet<OutputDevice> {
        self.inner.output_devices()
    }

    fn touch_pressed(&mut self) -> Result<bool, ControllerError> {
        self.inner.touch_pressed()
    }

    fn distance_cm(&mut self) -> Result<i32, ControllerError> {
        self.inner.distance_cm()
    }

    fn light_percent(&mut self) -> Result<i32, ControllerError> {
        self.inner.light_percent()
    }

    fn set_motor_power(&mut self, port: MotorPort, power: i32) -> Result<(), ControllerError> {
        self.inner.set_motor_power(port, power)
    }

    fn pause(&mut self, duration: Duration) -> Result<(), ControllerError> {
        self.pauses_left = self.pauses_left.saturating_sub(1);
        if self.pauses_left == 0 {
            self.token.cancel();
        }
        self.inner.pause(duration)
    }
}

#[test]
fn test_cancel_ends_forever_loop() {
    let token = CancelToken::new();
    let mut car = CancellingCar {
        inner: SimulatedCar::new(),
        token: token.clone(),
        pauses_left: 3,
    };
    let program = Program::new(vec![Node::repeat_forever(vec![Node::forward_for(1.0)])]);
    let mut interpreter = Interpreter::new();
    let mut cond = ExecutionCondition::new(token);

    let state = interpreter.run(&program, &mut car, &mut cond).unwrap();

    assert_eq!(state, RunState::Cancelled);
    assert_eq!(interpreter.state(), RunState::Cancelled);
    assert_eq!(interpreter.trace().actions().len(), 3);
    let snapshot = car.inner.snapshot();
    assert_eq!(snapshot.power(MotorPort::B), 0);
    assert_eq!(snapshot.power(MotorPort::C), 0);
}

#[test]
fn test_cancel_before_start_runs_nothing() {
    let token = CancelToken::new();
    token.cancel();
    let mut car = SimulatedCar::new();
    let program = Program::new(vec![Node::forward_for(1.0)]);
    let mut interpreter = Interpreter::new();
    let mut cond = ExecutionCondition::new(token);

    let state = interpreter.run(&program, &mut car, &mut cond).unwrap();
    assert_eq!(state, RunState::Cancelled);
    assert!(interpreter.trace().is_empty());
}

/// Car whose ultrasonic sensor has lost its connection
struct BrokenDistance(SimulatedCar);

impl Controller for BrokenDistance {
    fn input_devices(&self) -> BTreeSet<InputDevice> {
        self.0.input_devices()
    }

    fn output_devices(&self) -> BTreeSet<OutputDevice> {
        self.0.output_devices()
    }

    fn touch_pressed(&mut self) -> Result<bool, ControllerError> {
        self.0.touch_pressed()
    }

    fn distance_cm(&mut self) -> Result<i32, ControllerError> {
        Err(ControllerError::Disconnected)
    }

    fn light_percent(&mut self) -> Result<i32, ControllerError> {
        self.0.light_percent()
    }

    fn set_motor_power(&mut self, port: MotorPort, power: i32) -> Result<(), ControllerError> {
        self.0.set_motor_power(port, power)
    }

    fn pause(&mut self, duration: Duration) -> Result<(), ControllerError> {
        self.0.pause(duration)
    }
}

#[test]
fn test_device_failure_reports_block_and_stops_motors() {
    let mut car = BrokenDistance(SimulatedCar::new());
    let program = vec![
        Node::forward_for(1.0),
        Node::if_obstacle_closer(20.0, vec![Node::stop_motors()]),
        Node::backward_for(1.0),
    ];
    let (result, trace, _) = run_on(program, &mut car);

    let err = result.unwrap_err();
    assert_eq!(err.index, 1);
    assert_eq!(err.block, "if_obstacle_closer");
    assert!(matches!(err.source, ControllerError::Disconnected));
    assert_eq!(trace.actions(), vec![Opcode::ForwardFor]);

    // forward_for issues four commands; the failure adds a stop for each motor
    let commands = car.0.snapshot().commands;
    assert_eq!(commands.len(), 6);
    assert!(commands.iter().skip(4).all(|c| c.power == 0));
}

#[test]
fn test_injected_failure_inside_loop() {
    // set B, set C succeed; the pause fails
    let mut car = SimulatedCar::new().failing_after(2);
    let program = vec![Node::repeat(3, vec![Node::forward_for(1.0)])];
    let (result, _, cond) = run_on(program, &mut car);

    let err = result.unwrap_err();
    assert_eq!(err.index, 1);
    assert_eq!(err.block, "forward_for");
    assert_eq!(cond.loop_depth(), 0);
}

#[test]
fn test_trace_keeps_most_recent_steps() {
    let mut car = SimulatedCar::new();
    let program = Program::new(vec![Node::repeat(5, vec![Node::wait_for(0.1)])]);
    let mut interpreter = Interpreter::with_trace_limit(3);
    let mut cond = ExecutionCondition::default();
    interpreter.run(&program, &mut car, &mut cond).unwrap();

    assert_eq!(interpreter.trace().len(), 3);
    assert_eq!(interpreter.trace().total(), 10);
}

#[test]
fn test_observer_sees_every_step() {
    use std::sync::{Arc, Mutex};

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let mut interpreter = Interpreter::new();
    interpreter.set_observer(move |step| sink.lock().unwrap().push(step.index));

    let program = Program::new(vec![
        Node::wait_for(0.1),
        Node::if_touched(vec![Node::stop_motors()]),
        Node::stop_motors(),
    ]);
    let mut car = SimulatedCar::new();
    let mut cond = ExecutionCondition::default();
    interpreter.run(&program, &mut car, &mut cond).unwrap();

    // if_touched is at 1, its end marker at 3, the last block at 4
    assert_eq!(*seen.lock().unwrap(), vec![0, 1, 4]);
}

#[test]
fn test_cancel_after_last_block_still_completes() {
    let token = CancelToken::new();
    let mut car = CancellingCar {
        inner: SimulatedCar::new(),
        token: token.clone(),
        pauses_left: 1,
    };
    let program = Program::new(vec![Node::forward_for(1.0)]);
    let mut interpreter = Interpreter::new();
    let mut cond = ExecutionCondition::new(token.clone());

    let state = interpreter.run(&program, &mut car, &mut cond).unwrap();
    assert!(token.is_cancelled());
    assert_eq!(state, RunState::Completed);
    assert_eq!(interpreter.trace().actions(), vec![Opcode::ForwardFor]);
}

#[test]
fn test_take_trace_keeps_configured_limit() {
    let mut car = SimulatedCar::new();
    let program = Program::new(vec![Node::repeat(5, vec![Node::stop_motors()])]);
    let mut interpreter = Interpreter::with_trace_limit(3);
    let mut cond = ExecutionCondition::default();
    interpreter.run(&program, &mut car, &mut cond).unwrap();

    let taken = interpreter.take_trace();
    assert_eq!(taken.len(), 3);
    assert_eq!(interpreter.trace().limit(), 3);
    assert!(interpreter.trace().is_empty());
}

#[test]
fn test_simulator_command_log_is_bounded() {
    let mut car = SimulatedCar::new().with_command_limit(4);
    let (result, _, _) = run_on(vec![Node::repeat(10, vec![Node::stop_motors()])], &mut car);
    assert!(result.is_ok());

    let commands = car.snapshot().commands;
    assert_eq!(commands.len(), 4);
    assert!(commands.iter().all(|c| c.power == 0));
}
