//! Rendering logic for each TUI pane

use crate::blocks::{BlockKind, Opcode};
use crate::controller::simulated::SimState;
use crate::controller::{InputDevice, MotorPort, OutputDevice, ABSENT_READING};
use crate::editor::Editor;
use crate::interpreter::RunState;
use crate::trace::{StepKind, Trace};
use crate::ui::theme::DEFAULT_THEME;

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Padding, Paragraph},
    Frame,
};
use std::collections::BTreeSet;

fn border_style(is_focused: bool) -> Style {
    if is_focused {
        Style::default()
            .fg(DEFAULT_THEME.border_focused)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(DEFAULT_THEME.border_normal)
    }
}

fn kind_style(kind: BlockKind) -> Style {
    match kind {
        BlockKind::Sequence => Style::default().fg(DEFAULT_THEME.sequence),
        BlockKind::Selection => Style::default()
            .fg(DEFAULT_THEME.selection)
            .add_modifier(Modifier::BOLD),
        BlockKind::Repetition => Style::default()
            .fg(DEFAULT_THEME.repetition)
            .add_modifier(Modifier::BOLD),
        BlockKind::End => Style::default().fg(DEFAULT_THEME.comment),
    }
}

/// Keep `selected` inside the visible window
fn scroll_to(selected: usize, total: usize, visible_height: usize, scroll_offset: &mut usize) {
    if selected < *scroll_offset {
        *scroll_offset = selected;
    } else if selected >= *scroll_offset + visible_height {
        *scroll_offset = selected + 1 - visible_height;
    }
    if total <= visible_height {
        *scroll_offset = 0;
    }
}

/// Render the arrangement pane: one row per element, indented by nesting
pub fn render_arrangement_pane(
    frame: &mut Frame,
    area: Rect,
    editor: &Editor,
    selected: usize,
    running_index: Option<usize>,
    is_focused: bool,
    scroll_offset: &mut usize,
) {
    let block = Block::default()
        .title(" Program ")
        .borders(Borders::ALL)
        .border_style(border_style(is_focused));

    let arrangement = editor.arrangement();
    if arrangement.is_empty() {
        let paragraph = Paragraph::new("(empty: pick a block from the palette)")
            .block(block)
            .style(Style::default().fg(DEFAULT_THEME.comment));
        frame.render_widget(paragraph, area);
        return;
    }

    let visible_height = area.height.saturating_sub(2).max(1) as usize; // Account for borders, min 1
    scroll_to(selected, arrangement.len(), visible_height, scroll_offset);

    let depths = arrangement.depths();
    let lines: Vec<Line> = arrangement
        .elements()
        .iter()
        .enumerate()
        .skip(*scroll_offset)
        .take(visible_height)
        .map(|(idx, element)| {
            let is_selected = idx == selected;
            let is_running = running_index == Some(idx);

            let marker = if is_running { "▶" } else { " " };
            let num_style = if is_running {
                Style::default()
                    .fg(DEFAULT_THEME.success)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(DEFAULT_THEME.comment)
            };

            let mut spans = vec![
                Span::styled(format!("{}{:3} ", marker, idx), num_style),
                Span::raw("  ".repeat(depths[idx])),
                Span::styled(element.opcode.label(), kind_style(element.opcode.kind())),
            ];
            if let Some(value) = editor.display_value(idx) {
                spans.push(Span::raw(" "));
                spans.push(Span::styled(value, Style::default().fg(DEFAULT_THEME.value)));
            }

            if is_selected {
                for span in &mut spans {
                    span.style = span.style.bg(DEFAULT_THEME.current_line_bg);
                }
            }
            Line::from(spans)
        })
        .collect();

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Render the palette of insertable blocks
pub fn render_palette_pane(
    frame: &mut Frame,
    area: Rect,
    names: &[&'static str],
    selected: usize,
    is_focused: bool,
    scroll_offset: &mut usize,
) {
    let block = Block::default()
        .title(" Palette ")
        .borders(Borders::ALL)
        .border_style(border_style(is_focused))
        .padding(Padding::new(1, 0, 0, 0));

    let visible_height = area.height.saturating_sub(2).max(1) as usize;
    scroll_to(selected, names.len(), visible_height, scroll_offset);

    let items: Vec<ListItem> = names
        .iter()
        .enumerate()
        .skip(*scroll_offset)
        .take(visible_height)
        .map(|(idx, name)| {
            let (label, kind) = match Opcode::from_name(name) {
                Some(opcode) => (opcode.label(), opcode.kind()),
                None => (*name, BlockKind::Sequence),
            };
            let mut style = kind_style(kind);
            if idx == selected && is_focused {
                style = style.bg(DEFAULT_THEME.current_line_bg);
            }
            ListItem::new(label).style(style)
        })
        .collect();

    frame.render_widget(List::new(items).block(block), area);
}

/// Render the telemetry of the current or last run
pub fn render_trace_pane(
    frame: &mut Frame,
    area: Rect,
    trace: &Trace,
    is_focused: bool,
    scroll_offset: &mut usize,
) {
    let block = Block::default()
        .title(format!(" Trace ({} steps) ", trace.total()))
        .borders(Borders::ALL)
        .border_style(border_style(is_focused));

    if trace.is_empty() {
        let paragraph = Paragraph::new("(no run yet)")
            .block(block)
            .style(Style::default().fg(DEFAULT_THEME.comment));
        frame.render_widget(paragraph, area);
        return;
    }

    let block = block.padding(Padding::new(1, 0, 0, 0));
    let total_items = trace.len();
    let visible_height = area.height.saturating_sub(2).max(1) as usize;

    // Clamp scroll offset only if content exceeds visible area
    if total_items > visible_height {
        let max_scroll = total_items - visible_height;
        *scroll_offset = (*scroll_offset).min(max_scroll);
    } else {
        *scroll_offset = 0;
    }

    let items: Vec<ListItem> = trace
        .steps()
        .skip(*scroll_offset)
        .take(visible_height)
        .map(|step| {
            let color = match step.kind {
                StepKind::Action { .. } => DEFAULT_THEME.fg,
                StepKind::Condition { result: true } => DEFAULT_THEME.success,
                StepKind::Condition { result: false } => DEFAULT_THEME.comment,
                StepKind::Iteration { .. } => DEFAULT_THEME.repetition,
                StepKind::Break => DEFAULT_THEME.secondary,
            };
            ListItem::new(step.describe()).style(Style::default().fg(color))
        })
        .collect();

    frame.render_widget(List::new(items).block(block), area);
}

fn reading(value: i32, suffix: &str) -> String {
    if value == ABSENT_READING {
        "absent".to_string()
    } else {
        format!("{} {}", value, suffix)
    }
}

/// Render connected devices, plus live values when the robot is simulated
pub fn render_devices_pane(
    frame: &mut Frame,
    area: Rect,
    inputs: &BTreeSet<InputDevice>,
    outputs: &BTreeSet<OutputDevice>,
    sim: Option<&SimState>,
) {
    let block = Block::default()
        .title(if sim.is_some() {
            " Robot (simulated) "
        } else {
            " Robot (link) "
        })
        .borders(Borders::ALL)
        .border_style(border_style(false))
        .padding(Padding::new(1, 0, 0, 0));

    let label = Style::default().fg(DEFAULT_THEME.comment);
    let value = Style::default().fg(DEFAULT_THEME.value);
    let mut lines = Vec::new();

    for device in [
        InputDevice::TouchSensor,
        InputDevice::UltrasonicSensor,
        InputDevice::LightSensor,
    ] {
        let text = match (inputs.contains(&device), sim) {
            (false, _) => "absent".to_string(),
            (true, None) => "connected".to_string(),
            (true, Some(state)) => match device {
                InputDevice::TouchSensor => {
                    let text = if state.touch { "pressed" } else { "released" };
                    text.to_string()
                }
                InputDevice::UltrasonicSensor => reading(state.distance_cm, "cm"),
                InputDevice::LightSensor => reading(state.light_percent, "%"),
            },
        };
        lines.push(Line::from(vec![
            Span::styled(format!("{:<11}", device.name()), label),
            Span::styled(text, value),
        ]));
    }

    for port in MotorPort::ALL {
        if !outputs.contains(&OutputDevice::Motor(port)) {
            continue;
        }
        let text = match sim {
            Some(state) => format!("{:+} %", state.power(port)),
            None => "connected".to_string(),
        };
        lines.push(Line::from(vec![
            Span::styled(format!("motor {:<5}", port.letter()), label),
            Span::styled(text, value),
        ]));
    }

    if let Some(state) = sim {
        lines.push(Line::from(vec![
            Span::styled(format!("{:<11}", "clock"), label),
            Span::styled(format!("{:.1} s", state.clock.as_secs_f64()), value),
        ]));
    }

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Render the status bar at the bottom
pub fn render_status_bar(
    frame: &mut Frame,
    area: Rect,
    message: &str,
    run_state: RunState,
    input: Option<&str>,
) {
    // Split status bar into left and right
    let layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let state_bg = match run_state {
        RunState::Idle => DEFAULT_THEME.primary,
        RunState::Running => DEFAULT_THEME.secondary,
        RunState::Completed => DEFAULT_THEME.success,
        RunState::Cancelled | RunState::Failed => DEFAULT_THEME.error,
    };

    let mut left_spans = vec![
        Span::styled(
            format!(" {} ", run_state.label().to_uppercase()),
            Style::default()
                .bg(state_bg)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            " | ",
            Style::default()
                .bg(DEFAULT_THEME.current_line_bg)
                .fg(DEFAULT_THEME.comment),
        ),
    ];
    match input {
        Some(text) => left_spans.push(Span::styled(
            format!(" value: {}_ ", text),
            Style::default()
                .bg(DEFAULT_THEME.current_line_bg)
                .fg(DEFAULT_THEME.value)
                .add_modifier(Modifier::BOLD),
        )),
        None => left_spans.push(Span::styled(
            format!(" {} ", message),
            Style::default()
                .bg(DEFAULT_THEME.current_line_bg)
                .fg(DEFAULT_THEME.fg),
        )),
    }

    let left_paragraph = Paragraph::new(Line::from(left_spans))
        .style(Style::default().bg(DEFAULT_THEME.current_line_bg))
        .alignment(Alignment::Left);
    frame.render_widget(left_paragraph, layout[0]);

    // Right side: keybinds
    let key_style = Style::default().bg(DEFAULT_THEME.comment).fg(Color::Black);
    let desc_style = Style::default()
        .bg(DEFAULT_THEME.current_line_bg)
        .fg(DEFAULT_THEME.fg);
    let sep_style = Style::default()
        .bg(DEFAULT_THEME.current_line_bg)
        .fg(DEFAULT_THEME.comment);

    let bindings: &[(&str, &str)] = if input.is_some() {
        &[(" ↵ ", " apply "), (" esc ", " cancel ")]
    } else if run_state == RunState::Running {
        &[(" c ", " stop "), (" t ", " touch "), ("q", " quit ")]
    } else {
        &[
            (" ↵ ", " add "),
            (" d ", " del "),
            (" J/K ", " move "),
            (" e ", " value "),
            (" u/U/r ", " undo/redo "),
            (" ⎵ ", " run "),
            (" s ", " save "),
            ("q", " quit "),
        ]
    };

    let mut right_spans = Vec::new();
    for (i, (key, desc)) in bindings.iter().enumerate() {
        if i > 0 {
            right_spans.push(Span::styled("│", sep_style));
            right_spans.push(Span::styled(" ", desc_style));
        }
        right_spans.push(Span::styled(*key, key_style));
        right_spans.push(Span::styled(*desc, desc_style));
    }

    let right_paragraph = Paragraph::new(Line::from(right_spans))
        .style(Style::default().bg(DEFAULT_THEME.current_line_bg))
        .alignment(Alignment::Right);
    frame.render_widget(right_paragraph, layout[1]);
}
