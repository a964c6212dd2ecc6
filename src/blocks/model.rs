//! Program tree
//!
//! A [`Program`] is an ordered list of [`Node`]s. Selection and repetition
//! nodes own their bodies, so the tree can't contain cycles. Each node keeps
//! the position it occupies in the flat arrangement (`index`), which is what
//! the UI highlights and what run errors report.

use super::opcode::{BlockKind, Opcode, ParameterSpec, Unit};
use crate::arrangement::Element;
use crate::controller::{Controller, ControllerError, DriveLayout};
use crate::interpreter::condition::ExecutionCondition;
use crate::range::Range;
use std::time::Duration;

/// Access to a block's optional numeric parameter.
///
/// Implementors only provide the opcode and the raw value; everything else is
/// derived from the catalogue entry. A block declares its range but never
/// enforces it; that is the editor's job.
pub trait Parameterized {
    fn opcode(&self) -> Opcode;

    /// Raw magnitude as entered by the user
    fn value(&self) -> Option<f64>;

    fn spec(&self) -> Option<ParameterSpec> {
        self.opcode().parameter()
    }

    /// Raw value, or the catalogue default when unset
    fn effective_value(&self) -> Option<f64> {
        self.value().or_else(|| self.spec().map(|spec| spec.default))
    }

    /// Magnitude scaled to device units (seconds become milliseconds)
    fn action_value(&self) -> Option<i64> {
        let spec = self.spec()?;
        let value = self.effective_value()?;
        Some((value * spec.unit.device_scale()).round() as i64)
    }

    fn precision(&self) -> Option<u8> {
        self.spec().map(|spec| spec.precision)
    }

    fn unit(&self) -> Option<Unit> {
        self.spec().map(|spec| spec.unit)
    }

    fn range(&self) -> Option<Range<f64>> {
        self.spec().map(|spec| spec.range)
    }
}

/// A primitive action
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceBlock {
    pub(crate) opcode: Opcode,
    pub(crate) value: Option<f64>,
    pub index: usize,
}

/// A condition with a body that runs when the condition holds
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionBlock {
    pub(crate) opcode: Opcode,
    pub(crate) value: Option<f64>,
    pub body: Vec<Node>,
    pub index: usize,
}

/// A loop over a body, bounded or unbounded
#[derive(Debug, Clone, PartialEq)]
pub struct RepetitionBlock {
    pub(crate) opcode: Opcode,
    pub(crate) value: Option<f64>,
    pub body: Vec<Node>,
    pub index: usize,
}

/// Iteration count of a repetition block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repeat {
    Times(u32),
    Forever,
}

/// One node of the program tree
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Sequence(SequenceBlock),
    Selection(SelectionBlock),
    Repetition(RepetitionBlock),
}

macro_rules! impl_parameterized {
    ($($ty:ty),*) => {
        $(impl Parameterized for $ty {
            fn opcode(&self) -> Opcode {
                self.opcode
            }

            fn value(&self) -> Option<f64> {
                self.value
            }
        })*
    };
}

impl_parameterized!(SequenceBlock, SelectionBlock, RepetitionBlock);

impl Parameterized for Node {
    fn opcode(&self) -> Opcode {
        match self {
            Node::Sequence(block) => block.opcode,
            Node::Selection(block) => block.opcode,
            Node::Repetition(block) => block.opcode,
        }
    }

    fn value(&self) -> Option<f64> {
        match self {
            Node::Sequence(block) => block.value,
            Node::Selection(block) => block.value,
            Node::Repetition(block) => block.value,
        }
    }
}

fn drive<C: Controller + ?Sized>(
    controller: &mut C,
    layout: DriveLayout,
    left: i32,
    right: i32,
    millis: i64,
) -> Result<i64, ControllerError> {
    controller.set_motor_power(layout.left, left)?;
    controller.set_motor_power(layout.right, right)?;
    controller.pause(Duration::from_millis(millis.max(0) as u64))?;
    controller.set_motor_power(layout.left, 0)?;
    controller.set_motor_power(layout.right, 0)?;
    Ok(millis)
}

impl SequenceBlock {
    /// Perform this block's single device effect.
    ///
    /// Returns the elapsed units: milliseconds for timed blocks, the new
    /// speed for `set_motor_speed`, zero otherwise.
    pub fn action<C: Controller + ?Sized>(
        &self,
        controller: &mut C,
        cond: &mut ExecutionCondition,
    ) -> Result<i64, ControllerError> {
        let layout = cond.layout();
        let speed = cond.speed();
        let magnitude = self.action_value().unwrap_or(0);

        match self.opcode {
            Opcode::SetMotorSpeed => {
                let speed = magnitude.clamp(-100, 100) as i32;
                cond.set_speed(speed);
                Ok(speed as i64)
            }
            Opcode::ForwardFor => drive(controller, layout, speed, speed, magnitude),
            Opcode::BackwardFor => drive(controller, layout, -speed, -speed, magnitude),
            Opcode::TurnLeftFor => drive(controller, layout, -speed, speed, magnitude),
            Opcode::TurnRightFor => drive(controller, layout, speed, -speed, magnitude),
            Opcode::WaitFor => {
                controller.pause(Duration::from_millis(magnitude.max(0) as u64))?;
                Ok(magnitude)
            }
            Opcode::StopMotors => {
                controller.set_motor_power(layout.left, 0)?;
                controller.set_motor_power(layout.right, 0)?;
                Ok(0)
            }
            Opcode::Break => {
                cond.request_break();
                Ok(0)
            }
            // Only sequence opcodes are ever stored in a sequence block.
            _ => Ok(0),
        }
    }

    pub fn is_break(&self) -> bool {
        self.opcode == Opcode::Break
    }
}

impl SelectionBlock {
    /// Read the live sensor and decide whether the body runs.
    ///
    /// Absent sensors yield their sentinel readings, which are compared as-is.
    pub fn evaluate_condition<C: Controller + ?Sized>(
        &self,
        controller: &mut C,
    ) -> Result<bool, ControllerError> {
        let threshold = self.action_value().unwrap_or(0);
        match self.opcode {
            Opcode::IfTouched => controller.touch_pressed(),
            Opcode::IfReleased => Ok(!controller.touch_pressed()?),
            Opcode::IfObstacleCloser => Ok((controller.distance_cm()? as i64) < threshold),
            Opcode::IfDarkerThan => Ok((controller.light_percent()? as i64) < threshold),
            _ => Ok(false),
        }
    }
}

impl RepetitionBlock {
    pub fn count(&self) -> Repeat {
        match self.opcode {
            Opcode::RepeatForever => Repeat::Forever,
            _ => {
                let times = self.action_value().unwrap_or(0).max(0);
                Repeat::Times(u32::try_from(times).unwrap_or(u32::MAX))
            }
        }
    }
}

impl Node {
    /// Build a node from its catalogue entry. `body` is ignored for sequence
    /// blocks; `None` is returned for end markers.
    pub(crate) fn from_parts(opcode: Opcode, value: Option<f64>, body: Vec<Node>) -> Option<Node> {
        let index = 0;
        match opcode.kind() {
            BlockKind::Sequence => Some(Node::Sequence(SequenceBlock {
                opcode,
                value,
                index,
            })),
            BlockKind::Selection => Some(Node::Selection(SelectionBlock {
                opcode,
                value,
                body,
                index,
            })),
            BlockKind::Repetition => Some(Node::Repetition(RepetitionBlock {
                opcode,
                value,
                body,
                index,
            })),
            BlockKind::End => None,
        }
    }

    fn leaf(opcode: Opcode, value: Option<f64>) -> Node {
        Node::Sequence(SequenceBlock {
            opcode,
            value,
            index: 0,
        })
    }

    pub fn set_motor_speed(percent: f64) -> Node {
        Node::leaf(Opcode::SetMotorSpeed, Some(percent))
    }

    pub fn forward_for(seconds: f64) -> Node {
        Node::leaf(Opcode::ForwardFor, Some(seconds))
    }

    pub fn backward_for(seconds: f64) -> Node {
        Node::leaf(Opcode::BackwardFor, Some(seconds))
    }

    pub fn turn_left_for(seconds: f64) -> Node {
        Node::leaf(Opcode::TurnLeftFor, Some(seconds))
    }

    pub fn turn_right_for(seconds: f64) -> Node {
        Node::leaf(Opcode::TurnRightFor, Some(seconds))
    }

    pub fn wait_for(seconds: f64) -> Node {
        Node::leaf(Opcode::WaitFor, Some(seconds))
    }

    pub fn stop_motors() -> Node {
        Node::leaf(Opcode::StopMotors, None)
    }

    pub fn break_loop() -> Node {
        Node::leaf(Opcode::Break, None)
    }

    fn selection(opcode: Opcode, value: Option<f64>, body: Vec<Node>) -> Node {
        Node::Selection(SelectionBlock {
            opcode,
            value,
            body,
            index: 0,
        })
    }

    pub fn if_touched(body: Vec<Node>) -> Node {
        Node::selection(Opcode::IfTouched, None, body)
    }

    pub fn if_released(body: Vec<Node>) -> Node {
        Node::selection(Opcode::IfReleased, None, body)
    }

    pub fn if_obstacle_closer(cm: f64, body: Vec<Node>) -> Node {
        Node::selection(Opcode::IfObstacleCloser, Some(cm), body)
    }

    pub fn if_darker_than(percent: f64, body: Vec<Node>) -> Node {
        Node::selection(Opcode::IfDarkerThan, Some(percent), body)
    }

    pub fn repeat(times: u32, body: Vec<Node>) -> Node {
        Node::Repetition(RepetitionBlock {
            opcode: Opcode::RepeatTimes,
            value: Some(times as f64),
            body,
            index: 0,
        })
    }

    pub fn repeat_forever(body: Vec<Node>) -> Node {
        Node::Repetition(RepetitionBlock {
            opcode: Opcode::RepeatForever,
            value: None,
            body,
            index: 0,
        })
    }

    pub fn kind(&self) -> BlockKind {
        self.opcode().kind()
    }

    /// Arrangement position of this node
    pub fn index(&self) -> usize {
        match self {
            Node::Sequence(block) => block.index,
            Node::Selection(block) => block.index,
            Node::Repetition(block) => block.index,
        }
    }

    pub fn body(&self) -> &[Node] {
        match self {
            Node::Sequence(_) => &[],
            Node::Selection(block) => &block.body,
            Node::Repetition(block) => &block.body,
        }
    }

    /// Assign arrangement positions depth-first starting at `next`; returns
    /// the position after this node (and its end marker).
    fn assign_indices(&mut self, next: usize) -> usize {
        match self {
            Node::Sequence(block) => {
                block.index = next;
                next + 1
            }
            Node::Selection(SelectionBlock { index, body, .. })
            | Node::Repetition(RepetitionBlock { index, body, .. }) => {
                *index = next;
                let mut cursor = next + 1;
                for child in body.iter_mut() {
                    cursor = child.assign_indices(cursor);
                }
                cursor + 1
            }
        }
    }

    fn flatten_into(&self, out: &mut Vec<Element>) {
        out.push(Element::new(self.opcode(), self.value()));
        if let Some(closing) = self.opcode().closing() {
            for child in self.body() {
                child.flatten_into(out);
            }
            out.push(Element::new(closing, None));
        }
    }
}

/// A complete, well-nested program
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub nodes: Vec<Node>,
}

impl Program {
    /// Build a program and number its nodes by arrangement position
    pub fn new(mut nodes: Vec<Node>) -> Self {
        let mut cursor = 0;
        for node in nodes.iter_mut() {
            cursor = node.assign_indices(cursor);
        }
        Program { nodes }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The flat arrangement this program was (or would be) compiled from
    pub fn flatten(&self) -> Vec<Element> {
        let mut out = Vec::new();
        for node in &self.nodes {
            node.flatten_into(&mut out);
        }
        out
    }
}
