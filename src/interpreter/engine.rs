// Execution engine for block programs

use crate::blocks::{Node, Parameterized, Program};
use crate::controller::Controller;
use crate::interpreter::condition::ExecutionCondition;
use crate::interpreter::errors::RunError;
use crate::trace::{Step, StepKind, Trace, DEFAULT_TRACE_LIMIT};

/// Lifecycle of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Completed,
    Cancelled,
    Failed,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunState::Completed | RunState::Cancelled | RunState::Failed
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            RunState::Idle => "idle",
            RunState::Running => "running",
            RunState::Completed => "completed",
            RunState::Cancelled => "cancelled",
            RunState::Failed => "failed",
        }
    }
}

type Observer = Box<dyn FnMut(&Step) + Send>;

/// Tree-walking interpreter over a [`Program`]
pub struct Interpreter {
    /// Current lifecycle state
    state: RunState,

    /// Steps of the current (or last) run
    trace: Trace,

    /// Called with every step as it is recorded
    observer: Option<Observer>,

    /// Arrangement position of the block being executed
    current_index: Option<usize>,

    /// Set when cancellation cut the traversal short
    interrupted: bool,
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_trace_limit(DEFAULT_TRACE_LIMIT)
    }

    pub fn with_trace_limit(limit: usize) -> Self {
        Interpreter {
            state: RunState::Idle,
            trace: Trace::new(limit),
            observer: None,
            current_index: None,
            interrupted: false,
        }
    }

    /// Stream every step to `observer` in addition to recording it
    pub fn set_observer(&mut self, observer: impl FnMut(&Step) + Send + 'static) {
        self.observer = Some(Box::new(observer));
    }

    /// Run `program` to the end, to a break outside any loop, or until
    /// cancellation is observed.
    ///
    /// On a device failure the run unwinds immediately, the motors are
    /// stopped on a best-effort basis and the failing block is reported.
    pub fn run<C: Controller + ?Sized>(
        &mut self,
        program: &Program,
        controller: &mut C,
        cond: &mut ExecutionCondition,
    ) -> Result<RunState, RunError> {
        self.state = RunState::Running;
        self.trace.clear();
        self.current_index = None;
        self.interrupted = false;
        tracing::info!(blocks = program.nodes.len(), "run started");

        let result = self.execute_block_list(&program.nodes, controller, cond);
        self.current_index = None;

        match result {
            Ok(()) => {
                // A cancel that lands after the last block changes nothing
                self.state = if self.interrupted {
                    Self::release(controller);
                    RunState::Cancelled
                } else {
                    RunState::Completed
                };
                tracing::info!(
                    state = self.state.label(),
                    steps = self.trace.total(),
                    "run finished"
                );
                Ok(self.state)
            }
            Err(err) => {
                self.state = RunState::Failed;
                tracing::warn!(index = err.index, block = err.block, error = %err.source, "run failed");
                Self::release(controller);
                Err(err)
            }
        }
    }

    fn release<C: Controller + ?Sized>(controller: &mut C) {
        if let Err(e) = controller.stop_all() {
            tracing::warn!(error = %e, "could not stop motors after run");
        }
    }

    /// Execute `nodes` in order, checking the stop signal before each one
    pub(crate) fn execute_block_list<C: Controller + ?Sized>(
        &mut self,
        nodes: &[Node],
        controller: &mut C,
        cond: &mut ExecutionCondition,
    ) -> Result<(), RunError> {
        for node in nodes {
            if self.stop_requested(cond) {
                break;
            }
            self.execute_node(node, controller, cond)?;
        }
        Ok(())
    }

    /// Check the stop signal before visiting another block
    pub(crate) fn stop_requested(&mut self, cond: &ExecutionCondition) -> bool {
        if cond.is_cancelled() {
            self.interrupted = true;
        }
        cond.should_stop()
    }

    fn execute_node<C: Controller + ?Sized>(
        &mut self,
        node: &Node,
        controller: &mut C,
        cond: &mut ExecutionCondition,
    ) -> Result<(), RunError> {
        self.current_index = Some(node.index());

        match node {
            Node::Sequence(block) => {
                let value = block
                    .action(controller, cond)
                    .map_err(|e| RunError::new(block.index, block.opcode(), e))?;
                let kind = if block.is_break() {
                    StepKind::Break
                } else {
                    StepKind::Action { value }
                };
                self.record(Step {
                    index: block.index,
                    opcode: block.opcode(),
                    kind,
                });
                Ok(())
            }

            Node::Selection(block) => {
                let result = block
                    .evaluate_condition(controller)
                    .map_err(|e| RunError::new(block.index, block.opcode(), e))?;
                self.record(Step {
                    index: block.index,
                    opcode: block.opcode(),
                    kind: StepKind::Condition { result },
                });
                if result {
                    self.execute_block_list(&block.body, controller, cond)?;
                }
                Ok(())
            }

            Node::Repetition(block) => self.execute_repetition(block, controller, cond),
        }
    }

    pub(crate) fn record(&mut self, step: Step) {
        tracing::debug!(index = step.index, block = %step.opcode, kind = ?step.kind, "step");
        if let Some(observer) = self.observer.as_mut() {
            observer(&step);
        }
        self.trace.push(step);
    }

    // ========== Getter methods for UI ==========

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn trace(&self) -> &Trace {
        &self.trace
    }

    /// Take the recorded trace, leaving an empty one with the same limit
    pub fn take_trace(&mut self) -> Trace {
        let empty = Trace::new(self.trace.limit());
        std::mem::replace(&mut self.trace, empty)
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}
