//! The flat block arrangement edited by the user
//!
//! The editor shows a program as a flat list of [`Element`]s: compound blocks
//! are a head element, their body, and a closing end marker. This module owns
//! that list and its formats:
//! - [`lexer`]: tokenizer for the line-oriented text script
//! - [`compile`]: flat list → [`Program`] tree
//! - [`Entry`]: the persisted `(name, value?)` shape, stored as JSON
//!
//! # Spans
//!
//! The span of an element is the range of positions it occupies together
//! with its body: one element for a sequence block, head through end marker
//! for a compound block. An end marker's span is the span of its head.
//! Editor mutations always move whole spans, which keeps the list balanced.

pub mod compile;
pub mod lexer;

use crate::blocks::{BlockKind, BlockRegistry, Opcode, Origin, Parameterized, Program, RegistryError};
use lexer::{LexError, Lexer, Token};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use thiserror::Error;

pub use compile::compile;

/// One block in the flat arrangement
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Element {
    pub opcode: Opcode,
    pub value: Option<f64>,
}

impl Element {
    pub fn new(opcode: Opcode, value: Option<f64>) -> Self {
        Element { opcode, value }
    }

    /// Element carrying its catalogue default value
    pub fn fresh(opcode: Opcode) -> Self {
        Element {
            opcode,
            value: opcode.parameter().map(|spec| spec.default),
        }
    }

    pub fn name(&self) -> &'static str {
        self.opcode.name()
    }

    pub fn to_entry(&self) -> Entry {
        Entry {
            name: self.opcode.name().to_string(),
            value: self.value,
        }
    }
}

impl Parameterized for Element {
    fn opcode(&self) -> Opcode {
        self.opcode
    }

    fn value(&self) -> Option<f64> {
        self.value
    }
}

/// Persisted form of an element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

impl Entry {
    pub fn new(name: impl Into<String>, value: Option<f64>) -> Self {
        Entry {
            name: name.into(),
            value,
        }
    }
}

/// Errors raised while loading, compiling or editing an arrangement
#[derive(Debug, Error)]
pub enum ArrangementError {
    #[error("position {index} is outside the arrangement (length {len})")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("'{name}' at position {index} closes nothing")]
    UnexpectedEnd { index: usize, name: &'static str },

    #[error("'{found}' at position {index} does not close '{open}'")]
    MismatchedEnd {
        index: usize,
        open: &'static str,
        found: &'static str,
    },

    #[error("'{name}' at position {index} is never closed")]
    Unclosed { index: usize, name: &'static str },

    #[error("block '{name}' takes no value")]
    UnexpectedValue { name: String },

    #[error("value {value} of '{name}' at position {index} is outside {range}")]
    OutOfRange {
        index: usize,
        name: String,
        value: f64,
        range: String,
    },

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("script error at line {line}, column {column}: {message}")]
    Script {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("malformed arrangement file: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<LexError> for ArrangementError {
    fn from(err: LexError) -> Self {
        ArrangementError::Script {
            line: err.location.line,
            column: err.location.column,
            message: err.message,
        }
    }
}

/// Ordered, flat list of blocks
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Arrangement {
    elements: Vec<Element>,
}

impl Arrangement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_elements(elements: Vec<Element>) -> Self {
        Arrangement { elements }
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Element> {
        self.elements.get(index)
    }

    fn check_index(&self, index: usize, len: usize) -> Result<(), ArrangementError> {
        if index >= len {
            return Err(ArrangementError::IndexOutOfBounds {
                index,
                len: self.elements.len(),
            });
        }
        Ok(())
    }

    /// Nesting depth of every element (end markers sit at their head's depth)
    pub fn depths(&self) -> Vec<usize> {
        let mut depth = 0usize;
        self.elements
            .iter()
            .map(|element| match element.opcode.kind() {
                BlockKind::Selection | BlockKind::Repetition => {
                    depth += 1;
                    depth - 1
                }
                BlockKind::End => {
                    depth = depth.saturating_sub(1);
                    depth
                }
                BlockKind::Sequence => depth,
            })
            .collect()
    }

    /// Positions covered by the element at `index` and its body
    pub fn span(&self, index: usize) -> Result<std::ops::Range<usize>, ArrangementError> {
        self.check_index(index, self.elements.len())?;
        let element = self.elements[index];

        match element.opcode.kind() {
            BlockKind::Sequence => Ok(index..index + 1),
            BlockKind::Selection | BlockKind::Repetition => {
                let mut depth = 0usize;
                for (pos, el) in self.elements.iter().enumerate().skip(index) {
                    match el.opcode.kind() {
                        BlockKind::Selection | BlockKind::Repetition => depth += 1,
                        BlockKind::End => {
                            depth -= 1;
                            if depth == 0 {
                                return Ok(index..pos + 1);
                            }
                        }
                        BlockKind::Sequence => {}
                    }
                }
                Err(ArrangementError::Unclosed {
                    index,
                    name: element.name(),
                })
            }
            BlockKind::End => {
                let mut depth = 0usize;
                for pos in (0..=index).rev() {
                    match self.elements[pos].opcode.kind() {
                        BlockKind::End => depth += 1,
                        BlockKind::Selection | BlockKind::Repetition => {
                            depth -= 1;
                            if depth == 0 {
                                return Ok(pos..index + 1);
                            }
                        }
                        BlockKind::Sequence => {}
                    }
                }
                Err(ArrangementError::UnexpectedEnd {
                    index,
                    name: element.name(),
                })
            }
        }
    }

    /// Insert `elements` so the first one ends up at `index`
    pub fn insert(&mut self, index: usize, elements: Vec<Element>) -> Result<(), ArrangementError> {
        self.check_index(index, self.elements.len() + 1)?;
        self.elements.splice(index..index, elements);
        Ok(())
    }

    /// Remove `count` elements starting at `index` and return them
    pub fn remove(&mut self, index: usize, count: usize) -> Result<Vec<Element>, ArrangementError> {
        let end = index + count;
        if end > self.elements.len() {
            return Err(ArrangementError::IndexOutOfBounds {
                index: end.saturating_sub(1),
                len: self.elements.len(),
            });
        }
        Ok(self.elements.drain(index..end).collect())
    }

    /// Move the `count` elements at `from` so that they start at `to` in the
    /// resulting list
    pub fn move_span(&mut self, from: usize, count: usize, to: usize) -> Result<(), ArrangementError> {
        let len = self.elements.len();
        if from + count > len || to + count > len {
            return Err(ArrangementError::IndexOutOfBounds {
                index: from.max(to) + count.saturating_sub(1),
                len,
            });
        }
        let moved: Vec<Element> = self.elements.drain(from..from + count).collect();
        self.elements.splice(to..to, moved);
        Ok(())
    }

    /// Replace the value at `index`, returning the previous one
    pub fn set_value(
        &mut self,
        index: usize,
        value: Option<f64>,
    ) -> Result<Option<f64>, ArrangementError> {
        self.check_index(index, self.elements.len())?;
        Ok(std::mem::replace(&mut self.elements[index].value, value))
    }

    pub fn compile(&self) -> Result<Program, ArrangementError> {
        compile(&self.elements)
    }

    pub fn from_program(program: &Program) -> Self {
        Arrangement {
            elements: program.flatten(),
        }
    }

    // ========== Persisted shape ==========

    pub fn entries(&self) -> Vec<Entry> {
        self.elements.iter().map(Element::to_entry).collect()
    }

    /// Rebuild an arrangement from persisted entries via the registry
    pub fn from_entries(entries: &[Entry], registry: &BlockRegistry) -> Result<Self, ArrangementError> {
        let mut elements = Vec::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            let element = restore_element(registry, &entry.name, entry.value)?;
            check_value(&element, index)?;
            elements.push(element);
        }
        Ok(Arrangement { elements })
    }

    pub fn to_json(&self) -> Result<String, ArrangementError> {
        Ok(serde_json::to_string_pretty(&self.entries())?)
    }

    pub fn from_json(text: &str, registry: &BlockRegistry) -> Result<Self, ArrangementError> {
        let entries: Vec<Entry> = serde_json::from_str(text)?;
        Self::from_entries(&entries, registry)
    }

    /// Render as a text script, one block per line, indented by nesting
    pub fn to_script(&self) -> String {
        let mut out = String::new();
        for (element, depth) in self.elements.iter().zip(self.depths()) {
            out.push_str(&"  ".repeat(depth));
            out.push_str(element.name());
            if let Some(value) = element.value {
                let _ = write!(out, " {}", value);
            }
            out.push('\n');
        }
        out
    }

    /// Parse a text script (`name [value]` per line, `#` comments)
    pub fn from_script(source: &str, registry: &BlockRegistry) -> Result<Self, ArrangementError> {
        let tokens = Lexer::new(source).tokenize()?;
        let mut elements = Vec::new();
        let mut iter = tokens.into_iter().peekable();

        while let Some(token) = iter.next() {
            match token {
                Token::Newline(_) => continue,
                Token::Eof(_) => break,
                Token::Ident(name, location) => {
                    let value = match iter.peek() {
                        Some(Token::Number(n, _)) => {
                            let n = *n;
                            iter.next();
                            Some(n)
                        }
                        _ => None,
                    };
                    match iter.next() {
                        Some(Token::Newline(_)) | Some(Token::Eof(_)) | None => {}
                        Some(other) => {
                            let loc = other.location();
                            return Err(ArrangementError::Script {
                                line: loc.line,
                                column: loc.column,
                                message: format!("expected end of line after '{}'", name),
                            });
                        }
                    }
                    let element = restore_element(registry, &name, value).map_err(|err| match err {
                        ArrangementError::Registry(RegistryError::UnknownBlock(_)) => {
                            ArrangementError::Script {
                                line: location.line,
                                column: location.column,
                                message: format!("unknown block '{}'", name),
                            }
                        }
                        other => other,
                    })?;
                    check_value(&element, elements.len()).map_err(|err| ArrangementError::Script {
                        line: location.line,
                        column: location.column,
                        message: err.to_string(),
                    })?;
                    elements.push(element);
                }
                Token::Number(_, location) => {
                    return Err(ArrangementError::Script {
                        line: location.line,
                        column: location.column,
                        message: "expected a block name".to_string(),
                    });
                }
            }
        }

        Ok(Arrangement { elements })
    }
}

/// Reject a loaded value outside the block's declared range
fn check_value(element: &Element, index: usize) -> Result<(), ArrangementError> {
    match (element.value, element.range()) {
        (Some(value), Some(range)) if !range.contains(value) => Err(ArrangementError::OutOfRange {
            index,
            name: element.name().to_string(),
            value,
            range: range.to_string(),
        }),
        _ => Ok(()),
    }
}

/// Build a single element by name, applying a persisted value
pub(crate) fn restore_element(
    registry: &BlockRegistry,
    name: &str,
    value: Option<f64>,
) -> Result<Element, ArrangementError> {
    let mut created = registry.create_blocks(Origin::Restore, name)?;
    let mut element = match created.len() {
        0 => return Err(RegistryError::UnknownBlock(name.to_string()).into()),
        _ => created.swap_remove(0),
    };
    match (value, element.opcode.parameter()) {
        (Some(_), None) => {
            return Err(ArrangementError::UnexpectedValue {
                name: name.to_string(),
            })
        }
        (Some(v), Some(_)) => element.value = Some(v),
        (None, _) => element.value = None,
    }
    Ok(element)
}
