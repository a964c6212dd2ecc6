//! Repetition block execution.
//!
//! Adds the `impl Interpreter` method for bounded and unbounded loops. A
//! break anywhere inside the body (including inside nested selections) sets
//! the stop signal; the body traversal stops at the next block boundary and
//! the innermost loop consumes the break and exits. Cancellation stops the
//! loop the same way but is never consumed.

use crate::blocks::{Parameterized, Repeat, RepetitionBlock};
use crate::controller::Controller;
use crate::interpreter::condition::ExecutionCondition;
use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::RunError;
use crate::trace::{Step, StepKind};

impl Interpreter {
    /// Executes a repetition block: `count` passes, or forever until a break
    /// or cancellation. A count of zero runs the body zero times.
    pub(crate) fn execute_repetition<C: Controller + ?Sized>(
        &mut self,
        block: &RepetitionBlock,
        controller: &mut C,
        cond: &mut ExecutionCondition,
    ) -> Result<(), RunError> {
        let count = block.count();
        cond.enter_loop();
        tracing::trace!(index = block.index, ?count, depth = cond.loop_depth(), "loop entered");

        let mut pass: u32 = 0;
        let result = loop {
            if let Repeat::Times(n) = count {
                if pass >= n {
                    break Ok(());
                }
            }
            if self.stop_requested(cond) {
                break Ok(());
            }

            pass += 1;
            self.record(Step {
                index: block.index,
                opcode: block.opcode(),
                kind: StepKind::Iteration { pass },
            });

            if let Err(e) = self.execute_block_list(&block.body, controller, cond) {
                break Err(e);
            }

            if cond.take_break() {
                tracing::trace!(index = block.index, pass, "loop left by break");
                break Ok(());
            }
        };

        cond.exit_loop();
        result
    }
}
