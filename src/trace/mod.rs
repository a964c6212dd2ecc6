// Run telemetry for display and replay

use crate::blocks::Opcode;
use std::collections::VecDeque;

/// What happened at one visited block
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepKind {
    /// A sequence block ran and returned its elapsed units
    Action { value: i64 },
    /// A selection block evaluated its condition
    Condition { result: bool },
    /// A repetition block started pass number `pass` (1-based)
    Iteration { pass: u32 },
    /// A break block raised the stop signal
    Break,
}

/// One telemetry record
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step {
    /// Arrangement position of the block
    pub index: usize,
    pub opcode: Opcode,
    pub kind: StepKind,
}

impl Step {
    pub fn describe(&self) -> String {
        match self.kind {
            StepKind::Action { value } => format!("#{} {} -> {}", self.index, self.opcode, value),
            StepKind::Condition { result } => {
                format!("#{} {} is {}", self.index, self.opcode, result)
            }
            StepKind::Iteration { pass } => format!("#{} {} pass {}", self.index, self.opcode, pass),
            StepKind::Break => format!("#{} break", self.index),
        }
    }
}

/// Bounded record of the steps of one run.
///
/// Unbounded loops can produce any number of steps, so only the most recent
/// `limit` are kept; [`total`](Trace::total) still counts all of them.
#[derive(Debug, Clone)]
pub struct Trace {
    steps: VecDeque<Step>,
    limit: usize,
    total: usize,
}

pub const DEFAULT_TRACE_LIMIT: usize = 10_000;

impl Trace {
    pub fn new(limit: usize) -> Self {
        Trace {
            steps: VecDeque::new(),
            limit: limit.max(1),
            total: 0,
        }
    }

    pub fn push(&mut self, step: Step) {
        if self.steps.len() == self.limit {
            self.steps.pop_front();
        }
        self.steps.push_back(step);
        self.total += 1;
    }

    /// Maximum number of steps kept
    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn clear(&mut self) {
        self.steps.clear();
        self.total = 0;
    }

    pub fn steps(&self) -> impl Iterator<Item = &Step> {
        self.steps.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Step> {
        self.steps.get(index)
    }

    /// Number of steps currently held
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Number of steps recorded since the last clear, including dropped ones
    pub fn total(&self) -> usize {
        self.total
    }

    /// Opcodes of the sequence blocks that ran, in order
    pub fn actions(&self) -> Vec<Opcode> {
        self.steps
            .iter()
            .filter(|s| matches!(s.kind, StepKind::Action { .. }))
            .map(|s| s.opcode)
            .collect()
    }
}

impl Default for Trace {
    fn default() -> Self {
        Self::new(DEFAULT_TRACE_LIMIT)
    }
}
