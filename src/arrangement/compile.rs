//! Flat arrangement → program tree
//!
//! Walks the elements once with an explicit stack of open compound blocks.
//! A selection or repetition head opens a frame, its end marker closes it and
//! hands the finished node to the enclosing body.

use super::{ArrangementError, Element};
use crate::blocks::{BlockKind, Node, Opcode, Program};

struct Frame {
    opcode: Opcode,
    value: Option<f64>,
    index: usize,
    body: Vec<Node>,
}

/// Build the program tree for `elements`.
///
/// Fails on an end marker with nothing open, an end marker of the wrong type,
/// or a compound block that is never closed.
pub fn compile(elements: &[Element]) -> Result<Program, ArrangementError> {
    let mut top: Vec<Node> = Vec::new();
    let mut frames: Vec<Frame> = Vec::new();

    for (index, element) in elements.iter().enumerate() {
        match element.opcode.kind() {
            BlockKind::Selection | BlockKind::Repetition => frames.push(Frame {
                opcode: element.opcode,
                value: element.value,
                index,
                body: Vec::new(),
            }),
            BlockKind::End => {
                let frame = frames.pop().ok_or(ArrangementError::UnexpectedEnd {
                    index,
                    name: element.opcode.name(),
                })?;
                if frame.opcode.closing() != Some(element.opcode) {
                    return Err(ArrangementError::MismatchedEnd {
                        index,
                        open: frame.opcode.name(),
                        found: element.opcode.name(),
                    });
                }
                let node = Node::from_parts(frame.opcode, frame.value, frame.body)
                    .ok_or(ArrangementError::UnexpectedEnd {
                        index: frame.index,
                        name: frame.opcode.name(),
                    })?;
                match frames.last_mut() {
                    Some(parent) => parent.body.push(node),
                    None => top.push(node),
                }
            }
            BlockKind::Sequence => {
                if let Some(node) = Node::from_parts(element.opcode, element.value, Vec::new()) {
                    match frames.last_mut() {
                        Some(parent) => parent.body.push(node),
                        None => top.push(node),
                    }
                }
            }
        }
    }

    if let Some(frame) = frames.pop() {
        return Err(ArrangementError::Unclosed {
            index: frame.index,
            name: frame.opcode.name(),
        });
    }

    // Program::new numbers nodes exactly as they were laid out here.
    Ok(Program::new(top))
}
