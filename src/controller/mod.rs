//! Robot controller capability interface
//!
//! The interpreter and the blocks only ever talk to a [`Controller`]. Two
//! backends ship with the crate:
//! - [`simulated`]: an in-memory car-type robot (used by the TUI and tests)
//! - [`link`]: a line protocol over any `Read + Write` stream (TCP bridge)
//!
//! # Absent devices
//!
//! A program may reference a sensor or motor that is not plugged in. Reading
//! such a device returns a sentinel ([`ABSENT_READING`] for numeric sensors,
//! `false` for the touch sensor) and writing to an absent motor is a no-op.
//! Only real communication failures surface as [`ControllerError`].

pub mod link;
pub mod simulated;

use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

pub use link::LinkController;
pub use simulated::SimulatedCar;

/// Sentinel returned by numeric sensor getters when the sensor is absent
pub const ABSENT_READING: i32 = -1;

/// Motor output ports, named after the brick's labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MotorPort {
    A,
    B,
    C,
    D,
}

impl MotorPort {
    pub const ALL: [MotorPort; 4] = [MotorPort::A, MotorPort::B, MotorPort::C, MotorPort::D];

    pub fn letter(self) -> char {
        match self {
            MotorPort::A => 'A',
            MotorPort::B => 'B',
            MotorPort::C => 'C',
            MotorPort::D => 'D',
        }
    }

    pub fn from_letter(c: char) -> Option<MotorPort> {
        match c.to_ascii_uppercase() {
            'A' => Some(MotorPort::A),
            'B' => Some(MotorPort::B),
            'C' => Some(MotorPort::C),
            'D' => Some(MotorPort::D),
            _ => None,
        }
    }
}

/// Sensors a controller may report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum InputDevice {
    TouchSensor,
    UltrasonicSensor,
    LightSensor,
}

impl InputDevice {
    pub fn name(self) -> &'static str {
        match self {
            InputDevice::TouchSensor => "touch",
            InputDevice::UltrasonicSensor => "ultrasonic",
            InputDevice::LightSensor => "light",
        }
    }

    pub fn from_name(name: &str) -> Option<InputDevice> {
        match name {
            "touch" => Some(InputDevice::TouchSensor),
            "ultrasonic" => Some(InputDevice::UltrasonicSensor),
            "light" => Some(InputDevice::LightSensor),
            _ => None,
        }
    }
}

/// Actuators a controller may report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OutputDevice {
    Motor(MotorPort),
}

impl fmt::Display for OutputDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputDevice::Motor(port) => write!(f, "motor {}", port.letter()),
        }
    }
}

/// Failure to communicate with the hardware
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("i/o error talking to the robot: {0}")]
    Io(#[from] std::io::Error),

    #[error("robot rejected the request: {0}")]
    Protocol(String),

    #[error("robot disconnected")]
    Disconnected,
}

/// The contract every robot backend implements.
///
/// Getters never fail because a device is missing; they return the sentinel
/// instead. Implementations are driven from a single worker thread, so
/// methods take `&mut self`.
pub trait Controller {
    fn input_devices(&self) -> BTreeSet<InputDevice>;

    fn output_devices(&self) -> BTreeSet<OutputDevice>;

    /// Whether the touch sensor is pressed; `false` when absent
    fn touch_pressed(&mut self) -> Result<bool, ControllerError>;

    /// Distance to the nearest obstacle in centimeters; [`ABSENT_READING`] when absent
    fn distance_cm(&mut self) -> Result<i32, ControllerError>;

    /// Reflected light intensity in percent; [`ABSENT_READING`] when absent
    fn light_percent(&mut self) -> Result<i32, ControllerError>;

    /// Drive `port` with a signed power in percent. Absent motors ignore it.
    fn set_motor_power(&mut self, port: MotorPort, power: i32) -> Result<(), ControllerError>;

    /// Block the calling thread for `duration`
    fn pause(&mut self, duration: Duration) -> Result<(), ControllerError> {
        std::thread::sleep(duration);
        Ok(())
    }

    /// Set every present motor to zero power
    fn stop_all(&mut self) -> Result<(), ControllerError> {
        for device in self.output_devices() {
            match device {
                OutputDevice::Motor(port) => self.set_motor_power(port, 0)?,
            }
        }
        Ok(())
    }
}

impl<C: Controller + ?Sized> Controller for Box<C> {
    fn input_devices(&self) -> BTreeSet<InputDevice> {
        (**self).input_devices()
    }

    fn output_devices(&self) -> BTreeSet<OutputDevice> {
        (**self).output_devices()
    }

    fn touch_pressed(&mut self) -> Result<bool, ControllerError> {
        (**self).touch_pressed()
    }

    fn distance_cm(&mut self) -> Result<i32, ControllerError> {
        (**self).distance_cm()
    }

    fn light_percent(&mut self) -> Result<i32, ControllerError> {
        (**self).light_percent()
    }

    fn set_motor_power(&mut self, port: MotorPort, power: i32) -> Result<(), ControllerError> {
        (**self).set_motor_power(port, power)
    }

    fn pause(&mut self, duration: Duration) -> Result<(), ControllerError> {
        (**self).pause(duration)
    }

    fn stop_all(&mut self) -> Result<(), ControllerError> {
        (**self).stop_all()
    }
}

/// Left and right drive motors of a car-type robot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriveLayout {
    pub left: MotorPort,
    pub right: MotorPort,
}

impl Default for DriveLayout {
    fn default() -> Self {
        DriveLayout {
            left: MotorPort::B,
            right: MotorPort::C,
        }
    }
}
