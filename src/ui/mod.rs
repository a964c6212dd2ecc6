//! Terminal user interface built on [ratatui](https://github.com/ratatui-org/ratatui).
//!
//! The UI is organized into three layers:
//!
//! - **[`app`]**: editor state, keyboard event loop, pane focus, value input
//!   mode and the run worker
//! - **[`panes`]**: stateless render functions for each visible pane
//!   (program, palette, robot, trace, status bar)
//! - **[`theme`]**: centralized color palette used by all panes
//!
//! The entry point for consumers is [`App`]: construct it with an
//! [`Editor`] and a controller and call [`App::run`] to start the event loop.
//!
//! [`Editor`]: crate::editor::Editor
//! [`App::run`]: app::App::run

pub mod app;
pub mod panes;
pub mod theme;

pub use app::{App, BoxedController};
