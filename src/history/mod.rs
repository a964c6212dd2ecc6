//! Undo/redo for arrangement edits
//!
//! Every edit is recorded as an [`Event`]. Undoing an event applies its
//! inverse to the arrangement and synthesizes the event that would redo it;
//! redo does the same in the other direction. Applying the inverse of the
//! inverse restores the original arrangement.

use crate::arrangement::{restore_element, Arrangement, ArrangementError, Element, Entry};
use crate::blocks::{BlockRegistry, RegistryError};
use std::collections::VecDeque;
use thiserror::Error;

/// Default number of events kept for undo
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// One reversible edit
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// `count` elements were inserted at `index`
    Add { index: usize, count: usize },
    /// `entries` were removed starting at `index`
    Delete { index: usize, entries: Vec<Entry> },
    /// `count` elements that started at `previous` now start at `index`
    Move {
        index: usize,
        count: usize,
        previous: usize,
    },
    /// The value at `index` was changed; `old_value` is what it replaced
    ParameterChange { index: usize, old_value: Option<f64> },
}

impl Event {
    /// Position the event refers to
    pub fn index(&self) -> usize {
        match self {
            Event::Add { index, .. }
            | Event::Delete { index, .. }
            | Event::Move { index, .. }
            | Event::ParameterChange { index, .. } => *index,
        }
    }

    /// Number of arrangement elements the event touches
    pub fn element_count(&self) -> usize {
        match self {
            Event::Add { count, .. } | Event::Move { count, .. } => *count,
            Event::Delete { entries, .. } => entries.len(),
            Event::ParameterChange { .. } => 1,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Event::Add { index, count } => format!("add {} at {}", count, index),
            Event::Delete { index, entries } => format!("delete {} at {}", entries.len(), index),
            Event::Move {
                index, previous, ..
            } => format!("move {} -> {}", previous, index),
            Event::ParameterChange { index, .. } => format!("change value at {}", index),
        }
    }
}

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("cannot rebuild deleted blocks: {0}")]
    Lookup(#[from] RegistryError),

    #[error("cannot apply history event: {0}")]
    Arrangement(ArrangementError),
}

impl From<ArrangementError> for HistoryError {
    fn from(err: ArrangementError) -> Self {
        match err {
            ArrangementError::Registry(e) => HistoryError::Lookup(e),
            other => HistoryError::Arrangement(other),
        }
    }
}

/// Apply the inverse of `event` and return the event that undoes that.
///
/// On error the arrangement is unchanged.
pub fn apply_inverse(
    event: &Event,
    arrangement: &mut Arrangement,
    registry: &BlockRegistry,
) -> Result<Event, HistoryError> {
    match event {
        Event::Add { index, count } => {
            let removed = arrangement.remove(*index, *count)?;
            Ok(Event::Delete {
                index: *index,
                entries: removed.iter().map(Element::to_entry).collect(),
            })
        }

        Event::Delete { index, entries } => {
            // Every lookup must succeed before the arrangement is touched.
            let restored = entries
                .iter()
                .map(|entry| restore_element(registry, &entry.name, entry.value))
                .collect::<Result<Vec<_>, _>>()?;
            let count = restored.len();
            arrangement.insert(*index, restored)?;
            Ok(Event::Add {
                index: *index,
                count,
            })
        }

        Event::Move {
            index,
            count,
            previous,
        } => {
            arrangement.move_span(*index, *count, *previous)?;
            Ok(Event::Move {
                index: *previous,
                count: *count,
                previous: *index,
            })
        }

        Event::ParameterChange { index, old_value } => {
            let replaced = arrangement.set_value(*index, *old_value)?;
            Ok(Event::ParameterChange {
                index: *index,
                old_value: replaced,
            })
        }
    }
}

/// Two-stack event log
#[derive(Debug, Clone)]
pub struct EventLog {
    history: VecDeque<Event>,
    future: Vec<Event>,
    limit: usize,
}

impl EventLog {
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_HISTORY_LIMIT)
    }

    pub fn with_limit(limit: usize) -> Self {
        EventLog {
            history: VecDeque::new(),
            future: Vec::new(),
            limit: limit.max(1),
        }
    }

    /// Record a fresh edit. Anything that could be redone is discarded.
    pub fn record(&mut self, event: Event) {
        tracing::debug!(event = %event.describe(), "recorded");
        self.history.push_back(event);
        self.future.clear();
        while self.history.len() > self.limit {
            self.history.pop_front();
        }
    }

    /// Undo the most recent event and return the synthesized redo event
    pub fn undo(
        &mut self,
        arrangement: &mut Arrangement,
        registry: &BlockRegistry,
    ) -> Result<Option<Event>, HistoryError> {
        let Some(event) = self.history.pop_back() else {
            return Ok(None);
        };
        match apply_inverse(&event, arrangement, registry) {
            Ok(inverse) => {
                tracing::debug!(event = %event.describe(), "undone");
                self.future.push(inverse.clone());
                Ok(Some(inverse))
            }
            Err(e) => {
                tracing::warn!(event = %event.describe(), error = %e, "undo failed");
                self.history.push_back(event);
                Err(e)
            }
        }
    }

    /// Undo up to `n` events, stopping early when the history runs out.
    ///
    /// Returns the synthesized redo events, most recent undo last.
    pub fn undo_batch(
        &mut self,
        n: usize,
        arrangement: &mut Arrangement,
        registry: &BlockRegistry,
    ) -> Result<Vec<Event>, HistoryError> {
        let mut undone = Vec::new();
        for _ in 0..n {
            match self.undo(arrangement, registry)? {
                Some(event) => undone.push(event),
                None => break,
            }
        }
        Ok(undone)
    }

    /// Re-apply the most recently undone event
    pub fn redo(
        &mut self,
        arrangement: &mut Arrangement,
        registry: &BlockRegistry,
    ) -> Result<Option<Event>, HistoryError> {
        let Some(event) = self.future.pop() else {
            return Ok(None);
        };
        match apply_inverse(&event, arrangement, registry) {
            Ok(inverse) => {
                tracing::debug!(event = %event.describe(), "redone");
                self.history.push_back(inverse.clone());
                Ok(Some(inverse))
            }
            Err(e) => {
                tracing::warn!(event = %event.describe(), error = %e, "redo failed");
                self.future.push(event);
                Err(e)
            }
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.history.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    /// Number of events that can be undone
    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn redo_len(&self) -> usize {
        self.future.len()
    }

    pub fn clear(&mut self) {
        self.history.clear();
        self.future.clear();
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}
