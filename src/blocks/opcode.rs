//! The block catalogue.
//!
//! Every block a user can place is one [`Opcode`]. The opcode fixes the
//! block's kind, its stable persisted name and the shape of its optional
//! numeric parameter ([`ParameterSpec`]).

use crate::range::Range;
use std::fmt;

/// Structural kind of a block.
///
/// `End` only exists in the flat arrangement, where it closes the body of the
/// nearest open selection or repetition. It never appears in a program tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    Sequence,
    Selection,
    Repetition,
    End,
}

/// Display unit of a block parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Unit {
    Seconds,
    Percent,
    Centimeters,
    Times,
}

impl Unit {
    /// Suffix printed after a formatted value
    pub fn suffix(self) -> &'static str {
        match self {
            Unit::Seconds => "s",
            Unit::Percent => "%",
            Unit::Centimeters => "cm",
            Unit::Times => "×",
        }
    }

    /// Factor converting a user-facing magnitude into device units.
    ///
    /// Durations are driven in milliseconds; everything else is used as-is.
    pub fn device_scale(self) -> f64 {
        match self {
            Unit::Seconds => 1000.0,
            Unit::Percent | Unit::Centimeters | Unit::Times => 1.0,
        }
    }
}

/// Declared parameter of a block: unit, displayed precision, valid range and
/// the value a freshly placed block starts with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterSpec {
    pub unit: Unit,
    pub precision: u8,
    pub range: Range<f64>,
    pub default: f64,
}

const fn seconds(default: f64) -> ParameterSpec {
    ParameterSpec {
        unit: Unit::Seconds,
        precision: 1,
        range: DURATION_RANGE,
        default,
    }
}

// `Range` constructors are not const; build the literals directly.
const DURATION_RANGE: Range<f64> = Range::from_parts(0.0, false, 60.0, true);
const PERCENT_RANGE: Range<f64> = Range::from_parts(0.0, true, 100.0, true);
const DISTANCE_RANGE: Range<f64> = Range::from_parts(0.0, true, 255.0, true);
const REPEAT_RANGE: Range<f64> = Range::from_parts(0.0, true, 99.0, true);

/// All block types known to the editor and the interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Opcode {
    SetMotorSpeed,
    ForwardFor,
    BackwardFor,
    TurnLeftFor,
    TurnRightFor,
    WaitFor,
    StopMotors,
    Break,
    IfTouched,
    IfReleased,
    IfObstacleCloser,
    IfDarkerThan,
    RepeatTimes,
    RepeatForever,
    EndIf,
    EndRepeat,
}

impl Opcode {
    pub const ALL: [Opcode; 16] = [
        Opcode::SetMotorSpeed,
        Opcode::ForwardFor,
        Opcode::BackwardFor,
        Opcode::TurnLeftFor,
        Opcode::TurnRightFor,
        Opcode::WaitFor,
        Opcode::StopMotors,
        Opcode::Break,
        Opcode::IfTouched,
        Opcode::IfReleased,
        Opcode::IfObstacleCloser,
        Opcode::IfDarkerThan,
        Opcode::RepeatTimes,
        Opcode::RepeatForever,
        Opcode::EndIf,
        Opcode::EndRepeat,
    ];

    /// Stable identifier used by the persisted format and the registry
    pub fn name(self) -> &'static str {
        match self {
            Opcode::SetMotorSpeed => "set_motor_speed",
            Opcode::ForwardFor => "forward_for",
            Opcode::BackwardFor => "backward_for",
            Opcode::TurnLeftFor => "turn_left_for",
            Opcode::TurnRightFor => "turn_right_for",
            Opcode::WaitFor => "wait_for",
            Opcode::StopMotors => "stop_motors",
            Opcode::Break => "break",
            Opcode::IfTouched => "if_touched",
            Opcode::IfReleased => "if_released",
            Opcode::IfObstacleCloser => "if_obstacle_closer",
            Opcode::IfDarkerThan => "if_darker_than",
            Opcode::RepeatTimes => "repeat_times",
            Opcode::RepeatForever => "repeat_forever",
            Opcode::EndIf => "end_if",
            Opcode::EndRepeat => "end_repeat",
        }
    }

    /// Human-readable label shown in the editor
    pub fn label(self) -> &'static str {
        match self {
            Opcode::SetMotorSpeed => "Set motor speed",
            Opcode::ForwardFor => "Forward for",
            Opcode::BackwardFor => "Backward for",
            Opcode::TurnLeftFor => "Turn left for",
            Opcode::TurnRightFor => "Turn right for",
            Opcode::WaitFor => "Wait for",
            Opcode::StopMotors => "Stop motors",
            Opcode::Break => "Break",
            Opcode::IfTouched => "If touch sensor pressed",
            Opcode::IfReleased => "If touch sensor released",
            Opcode::IfObstacleCloser => "If obstacle closer than",
            Opcode::IfDarkerThan => "If light darker than",
            Opcode::RepeatTimes => "Repeat",
            Opcode::RepeatForever => "Repeat forever",
            Opcode::EndIf => "End if",
            Opcode::EndRepeat => "End repeat",
        }
    }

    pub fn from_name(name: &str) -> Option<Opcode> {
        Opcode::ALL.iter().copied().find(|op| op.name() == name)
    }

    pub fn kind(self) -> BlockKind {
        match self {
            Opcode::SetMotorSpeed
            | Opcode::ForwardFor
            | Opcode::BackwardFor
            | Opcode::TurnLeftFor
            | Opcode::TurnRightFor
            | Opcode::WaitFor
            | Opcode::StopMotors
            | Opcode::Break => BlockKind::Sequence,
            Opcode::IfTouched
            | Opcode::IfReleased
            | Opcode::IfObstacleCloser
            | Opcode::IfDarkerThan => BlockKind::Selection,
            Opcode::RepeatTimes | Opcode::RepeatForever => BlockKind::Repetition,
            Opcode::EndIf | Opcode::EndRepeat => BlockKind::End,
        }
    }

    /// The end marker that closes this block's body, if it has one
    pub fn closing(self) -> Option<Opcode> {
        match self.kind() {
            BlockKind::Selection => Some(Opcode::EndIf),
            BlockKind::Repetition => Some(Opcode::EndRepeat),
            BlockKind::Sequence | BlockKind::End => None,
        }
    }

    pub fn parameter(self) -> Option<ParameterSpec> {
        match self {
            Opcode::SetMotorSpeed => Some(ParameterSpec {
                unit: Unit::Percent,
                precision: 0,
                range: PERCENT_RANGE,
                default: 50.0,
            }),
            Opcode::ForwardFor | Opcode::BackwardFor | Opcode::WaitFor => Some(seconds(1.0)),
            Opcode::TurnLeftFor | Opcode::TurnRightFor => Some(seconds(0.5)),
            Opcode::IfObstacleCloser => Some(ParameterSpec {
                unit: Unit::Centimeters,
                precision: 0,
                range: DISTANCE_RANGE,
                default: 20.0,
            }),
            Opcode::IfDarkerThan => Some(ParameterSpec {
                unit: Unit::Percent,
                precision: 0,
                range: PERCENT_RANGE,
                default: 30.0,
            }),
            Opcode::RepeatTimes => Some(ParameterSpec {
                unit: Unit::Times,
                precision: 0,
                range: REPEAT_RANGE,
                default: 2.0,
            }),
            Opcode::StopMotors
            | Opcode::Break
            | Opcode::IfTouched
            | Opcode::IfReleased
            | Opcode::RepeatForever
            | Opcode::EndIf
            | Opcode::EndRepeat => None,
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
