//! Main TUI application state and logic

use crate::controller::simulated::SharedSimState;
use crate::controller::{Controller, InputDevice, OutputDevice};
use crate::editor::Editor;
use crate::interpreter::{RunEvent, RunHandle, RunOptions, RunSession, RunState};
use crate::trace::Trace;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout},
    Frame, Terminal,
};
use std::collections::BTreeSet;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

/// Controller handed back and forth between the UI and the run worker
pub type BoxedController = Box<dyn Controller + Send>;

/// Number of events undone by one batch undo
const UNDO_BATCH: usize = 5;

/// Which pane is currently focused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusedPane {
    Arrangement,
    Palette,
    Trace,
}

impl FocusedPane {
    /// Move focus to the next pane (arrangement -> palette -> trace)
    pub fn next(self) -> Self {
        match self {
            FocusedPane::Arrangement => FocusedPane::Palette,
            FocusedPane::Palette => FocusedPane::Trace,
            FocusedPane::Trace => FocusedPane::Arrangement,
        }
    }
}

/// The main application state
pub struct App {
    pub editor: Editor,

    /// Controller while no run is active
    controller: Option<BoxedController>,

    /// Live state of the simulated robot, if that is what we drive
    sim: Option<SharedSimState>,

    /// Device inventory captured at startup
    inputs: BTreeSet<InputDevice>,
    outputs: BTreeSet<OutputDevice>,

    run: Option<RunHandle<BoxedController>>,
    run_options: RunOptions,
    pub run_state: RunState,

    /// Steps of the current or last run
    pub trace: Trace,

    /// Arrangement position of the last visited block
    pub running_index: Option<usize>,

    pub focused_pane: FocusedPane,
    pub selected: usize,
    pub palette_selected: usize,
    palette: Vec<&'static str>,

    /// Per-pane scroll offsets
    pub arrangement_scroll: usize,
    pub palette_scroll: usize,
    pub trace_scroll: usize,

    /// Text being typed while editing a value
    pub input: Option<String>,

    /// Where `s` saves the arrangement
    save_path: Option<PathBuf>,

    pub should_quit: bool,
    pub status_message: String,
}

impl App {
    pub fn new(
        editor: Editor,
        controller: BoxedController,
        sim: Option<SharedSimState>,
        run_options: RunOptions,
        save_path: Option<PathBuf>,
    ) -> Self {
        let palette = editor.registry().palette();
        let inputs = controller.input_devices();
        let outputs = controller.output_devices();
        App {
            editor,
            controller: Some(controller),
            sim,
            inputs,
            outputs,
            run: None,
            run_options,
            run_state: RunState::Idle,
            trace: Trace::new(run_options.trace_limit),
            running_index: None,
            focused_pane: FocusedPane::Arrangement,
            selected: 0,
            palette_selected: 0,
            palette,
            arrangement_scroll: 0,
            palette_scroll: 0,
            trace_scroll: 0,
            input: None,
            save_path,
            should_quit: false,
            status_message: String::from("Ready!"),
        }
    }

    /// Run the TUI application
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        loop {
            self.poll_run();
            terminal.draw(|f| self.render(f))?;

            if self.should_quit {
                break;
            }

            // Poll with a timeout so run telemetry keeps flowing
            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key_event(key);
                    }
                }
            }
        }

        self.stop_run();
        Ok(())
    }

    /// Drain worker events and take the controller back once the run ended
    pub fn poll_run(&mut self) {
        let Some(handle) = self.run.as_ref() else {
            return;
        };

        let mut finished = false;
        while let Some(event) = handle.try_recv() {
            match event {
                RunEvent::Step(step) => {
                    self.running_index = Some(step.index);
                    self.trace.push(step);
                    self.trace_scroll = usize::MAX;
                }
                RunEvent::Finished { state, error } => {
                    self.run_state = state;
                    self.status_message = match error {
                        Some(message) => format!("Run failed: {}", message),
                        None => format!("Run {}", state.label()),
                    };
                    finished = true;
                }
            }
        }

        if finished || handle.is_finished() {
            self.finish_run();
        }
    }

    fn finish_run(&mut self) {
        let Some(handle) = self.run.take() else {
            return;
        };
        match handle.join() {
            Ok(result) => {
                self.run_state = result.state();
                self.controller = Some(result.controller);
            }
            Err(e) => {
                // The controller was lost with the worker.
                tracing::error!(error = %e, "run worker lost");
                self.run_state = RunState::Failed;
                self.status_message = format!("Run aborted: {}", e);
            }
        }
        self.running_index = None;
    }

    /// Cancel an active run and wait for it
    fn stop_run(&mut self) {
        if let Some(handle) = self.run.as_ref() {
            handle.cancel();
            self.finish_run();
        }
    }

    fn start_run(&mut self) {
        if self.run.is_some() {
            self.status_message = "A run is already active".to_string();
            return;
        }
        let program = match self.editor.program() {
            Ok(program) => program,
            Err(e) => {
                self.status_message = format!("Cannot run: {}", e);
                return;
            }
        };
        let Some(controller) = self.controller.take() else {
            self.status_message = "No robot available".to_string();
            return;
        };

        match RunSession::start(program, controller, self.run_options) {
            Ok(handle) => {
                self.run = Some(handle);
                self.run_state = RunState::Running;
                self.trace.clear();
                self.trace_scroll = 0;
                self.status_message = "Running...".to_string();
            }
            Err(e) => {
                // The controller moved into the failed spawn closure and is gone.
                self.status_message = format!("Cannot run: {}", e);
            }
        }
    }

    /// Render the UI
    fn render(&mut self, frame: &mut Frame) {
        let size = frame.area();

        let main_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1)])
            .split(size);

        let pane_area = main_chunks[0];
        let status_area = main_chunks[1];

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(50),
                Constraint::Percentage(20),
                Constraint::Percentage(30),
            ])
            .split(pane_area);

        // Right column: Robot (top) | Trace (bottom)
        let right_rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(9), Constraint::Min(0)])
            .split(columns[2]);

        super::panes::render_arrangement_pane(
            frame,
            columns[0],
            &self.editor,
            self.selected,
            self.running_index,
            self.focused_pane == FocusedPane::Arrangement,
            &mut self.arrangement_scroll,
        );

        super::panes::render_palette_pane(
            frame,
            columns[1],
            &self.palette,
            self.palette_selected,
            self.focused_pane == FocusedPane::Palette,
            &mut self.palette_scroll,
        );

        let sim = self.sim.as_ref().map(|state| {
            state
                .lock()
                .map(|s| s.clone())
                .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
        });
        super::panes::render_devices_pane(
            frame,
            right_rows[0],
            &self.inputs,
            &self.outputs,
            sim.as_ref(),
        );

        super::panes::render_trace_pane(
            frame,
            right_rows[1],
            &self.trace,
            self.focused_pane == FocusedPane::Trace,
            &mut self.trace_scroll,
        );

        super::panes::render_status_bar(
            frame,
            status_area,
            &self.status_message,
            self.run_state,
            self.input.as_deref(),
        );
    }

    /// Handle keyboard events
    pub fn handle_key_event(&mut self, key: KeyEvent) {
        if self.input.is_some() {
            self.handle_input_key(key);
            return;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') => {
                self.should_quit = true;
            }
            KeyCode::Tab => {
                self.focused_pane = self.focused_pane.next();
            }
            KeyCode::Up => match self.focused_pane {
                FocusedPane::Arrangement => self.selected = self.selected.saturating_sub(1),
                FocusedPane::Palette => {
                    self.palette_selected = self.palette_selected.saturating_sub(1)
                }
                FocusedPane::Trace => self.trace_scroll = self.trace_scroll.saturating_sub(1),
            },
            KeyCode::Down => match self.focused_pane {
                FocusedPane::Arrangement => {
                    if self.selected + 1 < self.editor.arrangement().len() {
                        self.selected += 1;
                    }
                }
                FocusedPane::Palette => {
                    if self.palette_selected + 1 < self.palette.len() {
                        self.palette_selected += 1;
                    }
                }
                FocusedPane::Trace => self.trace_scroll = self.trace_scroll.saturating_add(1),
            },
            KeyCode::Char(' ') | KeyCode::F(5) => self.start_run(),
            KeyCode::Char('c') | KeyCode::Esc => {
                if let Some(handle) = self.run.as_ref() {
                    handle.cancel();
                    self.status_message = "Stopping...".to_string();
                }
            }
            KeyCode::Char('t') => self.toggle_touch(),
            // Editing is locked while a run is active
            _ if self.run.is_some() => {
                self.status_message = "Stop the run before editing".to_string();
            }
            KeyCode::Enter => self.add_selected_block(),
            KeyCode::Char('d') | KeyCode::Delete => self.delete_selected(),
            KeyCode::Char('J') => self.move_selected(true),
            KeyCode::Char('K') => self.move_selected(false),
            KeyCode::Char('e') => self.begin_value_edit(),
            KeyCode::Char('u') => self.undo(1),
            KeyCode::Char('U') => self.undo(UNDO_BATCH),
            KeyCode::Char('r') => match self.editor.redo() {
                Ok(Some(_)) => {
                    self.clamp_selection();
                    self.status_message = "Redone".to_string();
                }
                Ok(None) => self.status_message = "Nothing to redo".to_string(),
                Err(e) => self.status_message = format!("Cannot redo: {}", e),
            },
            KeyCode::Char('s') => self.save(),
            _ => {}
        }
    }

    fn handle_input_key(&mut self, key: KeyEvent) {
        let Some(text) = self.input.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Esc => {
                self.input = None;
                self.status_message = "Edit cancelled".to_string();
            }
            KeyCode::Backspace => {
                text.pop();
            }
            KeyCode::Char(c) => text.push(c),
            KeyCode::Enter => {
                let text = text.clone();
                self.input = None;
                match self.editor.set_value_text(self.selected, &text) {
                    Ok(()) => self.status_message = "Value changed".to_string(),
                    Err(e) => self.status_message = format!("Rejected: {}", e),
                }
            }
            _ => {}
        }
    }

    fn add_selected_block(&mut self) {
        let Some(name) = self.palette.get(self.palette_selected).copied() else {
            return;
        };
        let index = if self.editor.arrangement().is_empty() {
            0
        } else {
            self.selected + 1
        };
        match self.editor.add(name, index) {
            Ok(_) => {
                self.selected = index;
                self.status_message = format!("Added {}", name);
            }
            Err(e) => self.status_message = format!("Cannot add: {}", e),
        }
    }

    fn delete_selected(&mut self) {
        if self.editor.arrangement().is_empty() {
            return;
        }
        match self.editor.delete(self.selected) {
            Ok(()) => {
                self.clamp_selection();
                self.status_message = "Deleted".to_string();
            }
            Err(e) => self.status_message = format!("Cannot delete: {}", e),
        }
    }

    /// Shift the selected block (with its body) one position down or up
    fn move_selected(&mut self, down: bool) {
        let span = match self.editor.arrangement().span(self.selected) {
            Ok(span) => span,
            Err(e) => {
                self.status_message = format!("Cannot move: {}", e);
                return;
            }
        };
        let to = if down {
            span.start + 1
        } else if span.start == 0 {
            return;
        } else {
            span.start - 1
        };
        match self.editor.move_span(span.start, to) {
            Ok(()) => {
                self.selected = to;
                self.status_message = "Moved".to_string();
            }
            Err(e) => self.status_message = format!("Cannot move: {}", e),
        }
    }

    fn begin_value_edit(&mut self) {
        match self.editor.display_value(self.selected) {
            Some(current) => {
                // Start from the number without its unit
                let number = current
                    .split_whitespace()
                    .next()
                    .unwrap_or_default()
                    .trim_end_matches('×')
                    .to_string();
                self.input = Some(number);
            }
            None => self.status_message = "This block has no value".to_string(),
        }
    }

    fn undo(&mut self, n: usize) {
        match self.editor.undo_batch(n) {
            Ok(events) if events.is_empty() => {
                self.status_message = "Nothing to undo".to_string()
            }
            Ok(events) => {
                self.clamp_selection();
                self.status_message = format!("Undid {} edit(s)", events.len());
            }
            Err(e) => self.status_message = format!("Cannot undo: {}", e),
        }
    }

    fn toggle_touch(&mut self) {
        let Some(state) = self.sim.as_ref() else {
            self.status_message = "Touch can only be toggled on the simulator".to_string();
            return;
        };
        let mut state = state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        state.touch = !state.touch;
        self.status_message = format!(
            "Touch sensor {}",
            if state.touch { "pressed" } else { "released" }
        );
    }

    fn save(&mut self) {
        let Some(path) = self.save_path.clone() else {
            self.status_message = "No file to save to".to_string();
            return;
        };
        let is_json = path.extension().is_some_and(|ext| ext == "json");
        let contents = if is_json {
            self.editor.to_json()
        } else {
            Ok(self.editor.to_script())
        };
        let result = contents
            .map_err(|e| e.to_string())
            .and_then(|text| std::fs::write(&path, text).map_err(|e| e.to_string()));
        match result {
            Ok(()) => {
                tracing::info!(path = %path.display(), "arrangement saved");
                self.status_message = format!("Saved {}", path.display());
            }
            Err(e) => self.status_message = format!("Cannot save: {}", e),
        }
    }

    fn clamp_selection(&mut self) {
        let len = self.editor.arrangement().len();
        self.selected = self.selected.min(len.saturating_sub(1));
    }
}
