//! Runs on a worker thread
//!
//! The controller is moved into the worker for the duration of the run and
//! handed back by [`RunHandle::join`]. Steps stream over a channel so the UI
//! can follow the run while staying responsive; cancellation goes through
//! the shared [`CancelToken`].

use super::condition::{CancelToken, ExecutionCondition, DEFAULT_SPEED};
use super::engine::{Interpreter, RunState};
use super::errors::{RunError, SessionError};
use crate::blocks::Program;
use crate::controller::{Controller, DriveLayout};
use crate::trace::{Step, Trace, DEFAULT_TRACE_LIMIT};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Message from the worker
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    Step(Step),
    Finished {
        state: RunState,
        /// Rendered run error when `state` is `Failed`
        error: Option<String>,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    /// Motor speed before any `set_motor_speed` block runs
    pub speed: i32,
    pub layout: DriveLayout,
    pub trace_limit: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions {
            speed: DEFAULT_SPEED,
            layout: DriveLayout::default(),
            trace_limit: DEFAULT_TRACE_LIMIT,
        }
    }
}

/// Everything a finished worker hands back
#[derive(Debug)]
pub struct RunResult<C> {
    pub outcome: Result<RunState, RunError>,
    pub controller: C,
    pub trace: Trace,
}

impl<C> RunResult<C> {
    pub fn state(&self) -> RunState {
        match self.outcome {
            Ok(state) => state,
            Err(_) => RunState::Failed,
        }
    }
}

/// Entry point for background runs
pub struct RunSession;

impl RunSession {
    /// Start `program` on a new thread named `blockbot-run`, moving
    /// `controller` into it until [`RunHandle::join`].
    pub fn start<C>(
        program: Program,
        controller: C,
        options: RunOptions,
    ) -> Result<RunHandle<C>, SessionError>
    where
        C: Controller + Send + 'static,
    {
        let cancel = CancelToken::new();
        let (tx, rx) = mpsc::channel();
        let worker_cancel = cancel.clone();

        let worker = thread::Builder::new()
            .name("blockbot-run".to_string())
            .spawn(move || {
                let mut controller = controller;
                let mut interpreter = Interpreter::with_trace_limit(options.trace_limit);
                let step_tx = tx.clone();
                interpreter.set_observer(move |step| {
                    // The receiver may already be gone; the run goes on regardless.
                    let _ = step_tx.send(RunEvent::Step(*step));
                });

                let mut cond = ExecutionCondition::new(worker_cancel)
                    .with_speed(options.speed)
                    .with_layout(options.layout);
                let outcome = interpreter.run(&program, &mut controller, &mut cond);

                let finished = match &outcome {
                    Ok(state) => RunEvent::Finished {
                        state: *state,
                        error: None,
                    },
                    Err(e) => RunEvent::Finished {
                        state: RunState::Failed,
                        error: Some(e.to_string()),
                    },
                };
                let _ = tx.send(finished);

                RunResult {
                    outcome,
                    controller,
                    trace: interpreter.take_trace(),
                }
            })?;

        Ok(RunHandle {
            cancel,
            events: rx,
            worker,
        })
    }
}

pub struct RunHandle<C> {
    cancel: CancelToken,
    events: Receiver<RunEvent>,
    worker: JoinHandle<RunResult<C>>,
}

impl<C> RunHandle<C> {
    /// Ask the run to stop at the next block boundary
    pub fn cancel(&self) {
        tracing::info!("run cancellation requested");
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Next pending event, if any
    pub fn try_recv(&self) -> Option<RunEvent> {
        match self.events.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Block until the next event; `None` once the worker is gone and the
    /// channel is drained
    pub fn recv(&self) -> Option<RunEvent> {
        self.events.recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<RunEvent> {
        match self.events.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }

    /// Wait for the worker and take back the controller
    pub fn join(self) -> Result<RunResult<C>, SessionError> {
        self.worker.join().map_err(|_| SessionError::WorkerPanicked)
    }
}
