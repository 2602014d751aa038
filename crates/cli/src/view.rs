// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rendering. The session list, the attached pane, the status/toast line,
//! and a centered modal for the active overlay — nothing here mutates
//! `AppModel`, it only reads it.

use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Frame;
use tui_term::widget::PseudoTerminal;

use kasmos_app::{AppModel, Overlay, ToastLevel};
use kasmos_core::{AgentType, InstanceStatus};

use crate::context::Terminal;

pub fn render(frame: &mut Frame, model: &AppModel, current_terminal: Option<&mut Terminal>) {
    let root = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(frame.area());

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(30), Constraint::Percentage(70)])
        .split(root[0]);

    render_session_list(frame, model, body[0]);
    render_pane(frame, model, current_terminal, body[1]);
    render_status_line(frame, model, root[1]);

    if model.overlay.is_active() {
        render_overlay(frame, model, frame.area());
    }
}

fn render_session_list(frame: &mut Frame, model: &AppModel, area: Rect) {
    let items: Vec<ListItem> = model
        .sessions
        .values()
        .map(|instance| {
            let marker = match instance.status {
                InstanceStatus::Loading => "…",
                InstanceStatus::Running => "●",
                InstanceStatus::Ready => "○",
                InstanceStatus::Paused => "⏸",
            };
            let label = if instance.is_wave_task() {
                format!("{marker} {} (W{} T{})", instance.title, instance.wave_number, instance.task_number)
            } else {
                format!("{marker} {} [{}]", instance.title, instance.agent_type)
            };
            let style = if instance.exited {
                Style::default().fg(Color::Red)
            } else if instance.agent_type == AgentType::Reviewer {
                Style::default().fg(Color::Magenta)
            } else {
                Style::default()
            };
            ListItem::new(Line::from(Span::styled(label, style)))
        })
        .collect();

    let mut state = ListState::default();
    state.select(model.selected.as_ref().and_then(|id| model.sessions.get_index_of(id)));

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title("sessions"))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    frame.render_stateful_widget(list, area, &mut state);
}

fn render_pane(frame: &mut Frame, model: &AppModel, current_terminal: Option<&mut Terminal>, area: Rect) {
    let title = model
        .selected
        .as_ref()
        .and_then(|id| model.sessions.get(id))
        .map(|i| i.title.as_str())
        .unwrap_or("-");
    let block = Block::default().borders(Borders::ALL).title(title.to_string());

    match current_terminal {
        Some(terminal) => {
            let (screen, _changed) = terminal.render();
            frame.render_widget(PseudoTerminal::new(screen).block(block), area);
        }
        None => {
            frame.render_widget(Paragraph::new("press Enter to attach").block(block), area);
        }
    }
}

fn render_status_line(frame: &mut Frame, model: &AppModel, area: Rect) {
    let (text, style) = match model.toasts.last() {
        Some((message, level)) => (message.clone(), toast_style(*level)),
        None => (String::new(), Style::default()),
    };
    frame.render_widget(Paragraph::new(text).style(style), area);
}

fn toast_style(level: ToastLevel) -> Style {
    match level {
        ToastLevel::Info => Style::default().fg(Color::Cyan),
        ToastLevel::Warning => Style::default().fg(Color::Yellow),
        ToastLevel::Error => Style::default().fg(Color::Red),
    }
}

fn render_overlay(frame: &mut Frame, model: &AppModel, area: Rect) {
    let (title, body): (&str, String) = match &model.overlay {
        Overlay::None => return,
        Overlay::PlannerFinishedConfirm { plan_file } => {
            ("start implementation?", format!("{plan_file}\n\n[y] start  [n] dismiss"))
        }
        Overlay::WaveFailed { plan_file, wave_number, failed_tasks } => (
            "wave failed",
            format!(
                "{plan_file} wave {wave_number}\nfailed tasks: {}\n\n[r] retry  [a] abort  [Esc] dismiss",
                failed_tasks.iter().map(u32::to_string).collect::<Vec<_>>().join(", ")
            ),
        ),
        Overlay::WaveComplete { plan_file, wave_number, is_final_wave } => {
            let prompt = if *is_final_wave { "push branch and start review?" } else { "advance to next wave?" };
            ("wave complete", format!("{plan_file} wave {wave_number}\n\n{prompt}\n\n[y] yes  [n] not yet"))
        }
        Overlay::CoderExitConfirm { plan_file, .. } => {
            ("agent exited", format!("{plan_file}\n\npush branch and start review?\n\n[y] yes  [n] no"))
        }
        Overlay::Permission { prompt, .. } => (
            "permission requested",
            format!("{}\n\n[y] allow  [a] allow always  [n] deny", prompt.description),
        ),
    };

    let modal = centered_rect(60, 40, area);
    frame.render_widget(Clear, modal);
    let block = Block::default().borders(Borders::ALL).title(title);
    frame.render_widget(Paragraph::new(body).block(block).alignment(Alignment::Center).wrap(Wrap { trim: true }), modal);

    let _ = model;
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
