//! In-memory car-type robot
//!
//! The sensor values and motor powers live in a [`SimState`] behind an
//! `Arc<Mutex<_>>`, so the UI can press the virtual touch sensor or watch the
//! motors while a run owns the controller on the worker thread.

use super::{
    Controller, ControllerError, DriveLayout, InputDevice, MotorPort, OutputDevice, ABSENT_READING,
};
use std::collections::{BTreeSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Motor commands kept in [`SimState::commands`] by default
pub const DEFAULT_COMMAND_LIMIT: usize = 1_000;

/// One recorded motor command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotorCommand {
    pub port: MotorPort,
    pub power: i32,
    /// Virtual time at which the command was issued
    pub at: Duration,
}

/// Observable state of the simulated robot
#[derive(Debug, Clone)]
pub struct SimState {
    pub touch: bool,
    pub distance_cm: i32,
    pub light_percent: i32,
    pub motor_power: [i32; 4],
    pub clock: Duration,
    /// Most recent motor commands, oldest first
    pub commands: VecDeque<MotorCommand>,
    pub command_limit: usize,
}

impl Default for SimState {
    fn default() -> Self {
        SimState {
            touch: false,
            distance_cm: 100,
            light_percent: 50,
            motor_power: [0; 4],
            clock: Duration::ZERO,
            commands: VecDeque::new(),
            command_limit: DEFAULT_COMMAND_LIMIT,
        }
    }
}

impl SimState {
    pub fn power(&self, port: MotorPort) -> i32 {
        self.motor_power[port as usize]
    }

    fn log_command(&mut self, command: MotorCommand) {
        while self.commands.len() >= self.command_limit.max(1) {
            self.commands.pop_front();
        }
        self.commands.push_back(command);
    }
}

/// Cloneable handle on a simulator's state
pub type SharedSimState = Arc<Mutex<SimState>>;

fn lock(state: &SharedSimState) -> MutexGuard<'_, SimState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Simulated car: two drive motors plus whatever sensors are configured.
#[derive(Debug)]
pub struct SimulatedCar {
    inputs: BTreeSet<InputDevice>,
    outputs: BTreeSet<OutputDevice>,
    state: SharedSimState,
    realtime: bool,
    /// Number of device calls left before every call fails (failure injection)
    fail_after: Option<usize>,
}

impl SimulatedCar {
    /// Car with every sensor connected and motors on the default drive ports.
    pub fn new() -> Self {
        let layout = DriveLayout::default();
        SimulatedCar {
            inputs: [
                InputDevice::TouchSensor,
                InputDevice::UltrasonicSensor,
                InputDevice::LightSensor,
            ]
            .into_iter()
            .collect(),
            outputs: [
                OutputDevice::Motor(layout.left),
                OutputDevice::Motor(layout.right),
            ]
            .into_iter()
            .collect(),
            state: Arc::new(Mutex::new(SimState::default())),
            realtime: false,
            fail_after: None,
        }
    }

    /// Replace the set of connected sensors
    pub fn with_inputs(mut self, inputs: impl IntoIterator<Item = InputDevice>) -> Self {
        self.inputs = inputs.into_iter().collect();
        self
    }

    /// Replace the set of connected motors
    pub fn with_motors(mut self, ports: impl IntoIterator<Item = MotorPort>) -> Self {
        self.outputs = ports.into_iter().map(OutputDevice::Motor).collect();
        self
    }

    /// Make [`Controller::pause`] actually sleep instead of advancing the virtual clock only
    pub fn realtime(mut self, realtime: bool) -> Self {
        self.realtime = realtime;
        self
    }

    /// Fail every device call once `calls` calls have succeeded
    pub fn failing_after(mut self, calls: usize) -> Self {
        self.fail_after = Some(calls);
        self
    }

    pub fn with_touch(self, pressed: bool) -> Self {
        lock(&self.state).touch = pressed;
        self
    }

    pub fn with_distance(self, cm: i32) -> Self {
        lock(&self.state).distance_cm = cm;
        self
    }

    pub fn with_light(self, percent: i32) -> Self {
        lock(&self.state).light_percent = percent;
        self
    }

    /// Keep at most `limit` motor commands in the log
    pub fn with_command_limit(self, limit: usize) -> Self {
        lock(&self.state).command_limit = limit;
        self
    }

    pub fn state(&self) -> SharedSimState {
        Arc::clone(&self.state)
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> SimState {
        lock(&self.state).clone()
    }

    fn device_call(&mut self) -> Result<(), ControllerError> {
        match self.fail_after {
            Some(0) => Err(ControllerError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "simulated link failure",
            ))),
            Some(ref mut left) => {
                *left -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }
}

impl Default for SimulatedCar {
    fn default() -> Self {
        Self::new()
    }
}

impl Controller for SimulatedCar {
    fn input_devices(&self) -> BTreeSet<InputDevice> {
        self.inputs.clone()
    }

    fn output_devices(&self) -> BTreeSet<OutputDevice> {
        self.outputs.clone()
    }

    fn touch_pressed(&mut self) -> Result<bool, ControllerError> {
        self.device_call()?;
        if !self.inputs.contains(&InputDevice::TouchSensor) {
            return Ok(false);
        }
        Ok(lock(&self.state).touch)
    }

    fn distance_cm(&mut self) -> Result<i32, ControllerError> {
        self.device_call()?;
        if !self.inputs.contains(&InputDevice::UltrasonicSensor) {
            return Ok(ABSENT_READING);
        }
        Ok(lock(&self.state).distance_cm)
    }

    fn light_percent(&mut self) -> Result<i32, ControllerError> {
        self.device_call()?;
        if !self.inputs.contains(&InputDevice::LightSensor) {
            return Ok(ABSENT_READING);
        }
        Ok(lock(&self.state).light_percent)
    }

    fn set_motor_power(&mut self, port: MotorPort, power: i32) -> Result<(), ControllerError> {
        self.device_call()?;
        if !self.outputs.contains(&OutputDevice::Motor(port)) {
            return Ok(());
        }
        let mut state = lock(&self.state);
        state.motor_power[port as usize] = power;
        let at = state.clock;
        state.log_command(MotorCommand { port, power, at });
        Ok(())
    }

    fn pause(&mut self, duration: Duration) -> Result<(), ControllerError> {
        self.device_call()?;
        if self.realtime {
            std::thread::sleep(duration);
        }
        lock(&self.state).clock += duration;
        Ok(())
    }
}
