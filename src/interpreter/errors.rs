//! Run error type
//!
//! A run fails only when a block cannot talk to the hardware. The error
//! names the block and its arrangement position so the caller can show the
//! user where the program stopped and decide whether to retry the run.
//! Absent devices are not errors.

use crate::blocks::Opcode;
use crate::controller::ControllerError;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("block '{block}' at position {index} failed: {source}")]
pub struct RunError {
    /// Arrangement position of the failing block
    pub index: usize,
    /// Persisted name of the failing block
    pub block: &'static str,
    #[source]
    pub source: ControllerError,
}

impl RunError {
    pub fn new(index: usize, opcode: Opcode, source: ControllerError) -> Self {
        RunError {
            index,
            block: opcode.name(),
            source,
        }
    }
}

/// Failure of the run worker itself
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("could not start the run worker: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("the run worker panicked")]
    WorkerPanicked,
}
