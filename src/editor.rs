//! Editing session over one arrangement
//!
//! The [`Editor`] owns the arrangement, its event log and the block
//! registry. Every successful edit is recorded so it can be undone; a failed
//! edit changes nothing.

use crate::arrangement::{Arrangement, ArrangementError};
use crate::blocks::{BlockKind, BlockRegistry, Origin, Parameterized, Program, RegistryError};
use crate::decoration::{format_value, parse_value, Locale, ValidationError};
use crate::history::{Event, EventLog, HistoryError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EditError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Arrangement(#[from] ArrangementError),

    #[error(transparent)]
    History(#[from] HistoryError),

    #[error("end markers are moved and deleted with their block")]
    EndMarker { index: usize },

    #[error("'{name}' is not a palette block")]
    NotInPalette { name: String },
}

#[derive(Debug)]
pub struct Editor {
    arrangement: Arrangement,
    log: EventLog,
    registry: BlockRegistry,
    locale: Locale,
}

impl Editor {
    pub fn new(registry: BlockRegistry) -> Self {
        Editor {
            arrangement: Arrangement::new(),
            log: EventLog::new(),
            registry,
            locale: Locale::default(),
        }
    }

    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.log = EventLog::with_limit(limit);
        self
    }

    pub fn arrangement(&self) -> &Arrangement {
        &self.arrangement
    }

    pub fn registry(&self) -> &BlockRegistry {
        &self.registry
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    pub fn set_locale(&mut self, locale: Locale) {
        self.locale = locale;
    }

    /// Place the palette block `name` at `index`.
    ///
    /// Compound blocks arrive together with their end marker. Returns the
    /// number of elements inserted.
    pub fn add(&mut self, name: &str, index: usize) -> Result<usize, EditError> {
        // End markers only enter together with their head
        if self.registry.contains(name) && !self.registry.palette().iter().any(|p| *p == name) {
            return Err(EditError::NotInPalette {
                name: name.to_string(),
            });
        }
        let elements = self.registry.create_blocks(Origin::Palette, name)?;
        let count = elements.len();
        self.arrangement.insert(index, elements)?;
        self.log.record(Event::Add { index, count });
        tracing::info!(block = name, index, "block added");
        Ok(count)
    }

    /// Delete the block at `index` together with its body and end marker
    pub fn delete(&mut self, index: usize) -> Result<(), EditError> {
        let span = self.head_span(index)?;
        let removed = self.arrangement.remove(span.start, span.len())?;
        self.log.record(Event::Delete {
            index: span.start,
            entries: removed.iter().map(|e| e.to_entry()).collect(),
        });
        tracing::info!(index = span.start, count = removed.len(), "block deleted");
        Ok(())
    }

    /// Move the block at `index` (with its span) so it starts at `to` in the
    /// resulting arrangement
    pub fn move_span(&mut self, index: usize, to: usize) -> Result<(), EditError> {
        let span = self.head_span(index)?;
        let count = span.len();
        self.arrangement.move_span(span.start, count, to)?;
        if span.start != to {
            self.log.record(Event::Move {
                index: to,
                count,
                previous: span.start,
            });
        }
        tracing::info!(from = span.start, to, count, "block moved");
        Ok(())
    }

    /// Set the parameter of the block at `index`
    pub fn set_value(&mut self, index: usize, value: f64) -> Result<(), EditError> {
        let element = *self
            .arrangement
            .get(index)
            .ok_or(ArrangementError::IndexOutOfBounds {
                index,
                len: self.arrangement.len(),
            })?;
        let spec = element.spec().ok_or(ValidationError::NoParameter {
            name: element.name(),
        })?;
        if !spec.range.contains(value) {
            return Err(ValidationError::OutOfRange {
                value,
                range: spec.range.to_string(),
            }
            .into());
        }

        let old_value = self.arrangement.set_value(index, Some(value))?;
        self.log.record(Event::ParameterChange { index, old_value });
        tracing::info!(index, value, "value changed");
        Ok(())
    }

    /// Parse `text` in the editor's locale, then [`set_value`](Self::set_value)
    pub fn set_value_text(&mut self, index: usize, text: &str) -> Result<(), EditError> {
        let value = parse_value(text, self.locale)?;
        self.set_value(index, value)
    }

    /// Displayed value of the block at `index`, if it has a parameter
    pub fn display_value(&self, index: usize) -> Option<String> {
        let element = self.arrangement.get(index)?;
        let spec = element.spec()?;
        let value = element.effective_value()?;
        Some(format_value(value, spec.unit, spec.precision, self.locale))
    }

    pub fn undo(&mut self) -> Result<Option<Event>, EditError> {
        Ok(self.log.undo(&mut self.arrangement, &self.registry)?)
    }

    pub fn undo_batch(&mut self, n: usize) -> Result<Vec<Event>, EditError> {
        Ok(self
            .log
            .undo_batch(n, &mut self.arrangement, &self.registry)?)
    }

    pub fn redo(&mut self) -> Result<Option<Event>, EditError> {
        Ok(self.log.redo(&mut self.arrangement, &self.registry)?)
    }

    pub fn can_undo(&self) -> bool {
        self.log.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.log.can_redo()
    }

    /// Compile the arrangement into a runnable program
    pub fn program(&self) -> Result<Program, EditError> {
        Ok(self.arrangement.compile()?)
    }

    // ========== Loading and saving ==========

    /// Replace the arrangement with a parsed script. History is cleared.
    pub fn load_script(&mut self, source: &str) -> Result<(), EditError> {
        let arrangement = Arrangement::from_script(source, &self.registry)?;
        self.replace(arrangement);
        Ok(())
    }

    /// Replace the arrangement with a JSON document. History is cleared.
    pub fn load_json(&mut self, text: &str) -> Result<(), EditError> {
        let arrangement = Arrangement::from_json(text, &self.registry)?;
        self.replace(arrangement);
        Ok(())
    }

    pub fn to_script(&self) -> String {
        self.arrangement.to_script()
    }

    pub fn to_json(&self) -> Result<String, EditError> {
        Ok(self.arrangement.to_json()?)
    }

    fn replace(&mut self, arrangement: Arrangement) {
        tracing::info!(elements = arrangement.len(), "arrangement loaded");
        self.arrangement = arrangement;
        self.log.clear();
    }

    /// Span of the block at `index`; end markers can't be edited on their own
    fn head_span(&self, index: usize) -> Result<std::ops::Range<usize>, EditError> {
        let element = self
            .arrangement
            .get(index)
            .ok_or(ArrangementError::IndexOutOfBounds {
                index,
                len: self.arrangement.len(),
            })?;
        if element.opcode.kind() == BlockKind::End {
            return Err(EditError::EndMarker { index });
        }
        Ok(self.arrangement.span(index)?)
    }
}
