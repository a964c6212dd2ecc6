//! Block program execution
//!
//! - [`engine`]: tree-walking interpreter and run lifecycle
//! - [`loops`]: repetition blocks and break handling
//! - [`condition`]: per-run context (stop signal, speed, drive layout)
//! - [`errors`]: run and worker error types
//! - [`session`]: runs on a worker thread with streamed steps
//!
//! # Execution Model
//!
//! The interpreter visits nodes in order and checks the stop signal before
//! every one. A break sets the signal; the innermost enclosing loop clears it
//! and exits, and a break outside any loop ends the run. Cancellation uses the
//! same check but is never cleared, so it unwinds every level.

pub mod condition;
pub mod engine;
pub mod errors;
pub mod loops;
pub mod session;

pub use condition::{CancelToken, ExecutionCondition, DEFAULT_SPEED};
pub use engine::{Interpreter, RunState};
pub use errors::{RunError, SessionError};
pub use session::{RunEvent, RunHandle, RunOptions, RunResult, RunSession};
