//! Per-run execution context
//!
//! One [`ExecutionCondition`] is created for every run and passed by `&mut`
//! through the whole traversal. It carries the stop signal (a pending break
//! or an external cancellation), the loop nesting depth and the run's motor
//! speed.

use crate::controller::DriveLayout;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Motor speed in percent until a `set_motor_speed` block runs
pub const DEFAULT_SPEED: i32 = 50;

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub struct ExecutionCondition {
    cancel: CancelToken,
    break_requested: bool,
    loop_depth: usize,
    speed: i32,
    layout: DriveLayout,
}

impl ExecutionCondition {
    pub fn new(cancel: CancelToken) -> Self {
        ExecutionCondition {
            cancel,
            break_requested: false,
            loop_depth: 0,
            speed: DEFAULT_SPEED,
            layout: DriveLayout::default(),
        }
    }

    pub fn with_speed(mut self, speed: i32) -> Self {
        self.speed = speed;
        self
    }

    pub fn with_layout(mut self, layout: DriveLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn request_break(&mut self) {
        self.break_requested = true;
    }

    pub fn is_break_requested(&self) -> bool {
        self.break_requested
    }

    /// Clear a pending break and report whether there was one.
    ///
    /// Called by the innermost loop, which is the one a break exits.
    pub fn take_break(&mut self) -> bool {
        std::mem::take(&mut self.break_requested)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// True when traversal must not visit another block
    pub fn should_stop(&self) -> bool {
        self.break_requested || self.cancel.is_cancelled()
    }

    pub fn speed(&self) -> i32 {
        self.speed
    }

    pub fn set_speed(&mut self, speed: i32) {
        self.speed = speed;
    }

    pub fn layout(&self) -> DriveLayout {
        self.layout
    }

    pub fn loop_depth(&self) -> usize {
        self.loop_depth
    }

    pub(crate) fn enter_loop(&mut self) {
        self.loop_depth += 1;
    }

    pub(crate) fn exit_loop(&mut self) {
        self.loop_depth = self.loop_depth.saturating_sub(1);
    }
}

impl Default for ExecutionCondition {
    fn default() -> Self {
        Self::new(CancelToken::new())
    }
}
