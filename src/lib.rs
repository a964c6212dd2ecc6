//! # Introduction
//!
//! blockbot is a block-based robot programming environment. Programs are
//! assembled from a small catalogue of blocks (drive for a while, wait, test a
//! sensor, repeat) and run against a car-type robot, either simulated or
//! reached over a line-protocol link. Editing happens in a terminal UI built
//! with [ratatui](https://docs.rs/ratatui).
//!
//! ## Pipeline
//!
//! ```text
//! Script / JSON → Arrangement → compile → Program → Interpreter → Controller
//!                     ↑                                  ↓
//!                  Editor + EventLog                   Trace → TUI
//! ```
//!
//! 1. [`arrangement`]: the flat, editable block list, its text script and JSON
//!    formats, and compilation into a tree.
//! 2. [`blocks`]: the block catalogue, the program tree and the registry that
//!    builds blocks by name.
//! 3. [`editor`] and [`history`]: validated edits with undo/redo.
//! 4. [`interpreter`]: walks the program against a [`controller::Controller`],
//!    on the calling thread or on a worker, recording a [`trace::Trace`].
//! 5. [`decoration`]: locale-aware formatting of block values.
//! 6. [`config`]: the TOML settings file.
//! 7. [`ui`]: ratatui-based TUI; not part of the stable library API.

pub mod arrangement;
pub mod blocks;
pub mod config;
pub mod controller;
pub mod decoration;
pub mod editor;
pub mod history;
pub mod interpreter;
pub mod range;
pub mod trace;
pub mod ui;
