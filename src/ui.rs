use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};
use hubchat_core::Role;

use crate::app::{App, FocusPane};

pub fn render(frame: &mut Frame, app: &mut App) {
    let [sidebar_area, main_area] =
        Layout::horizontal([Constraint::Length(30), Constraint::Min(0)]).areas(frame.area());

    render_sidebar(frame, app, sidebar_area);

    let banner_height = if app.llm_available == Some(false) { 1 } else { 0 };
    let [banner_area, chat_area, input_area, status_area] = Layout::vertical([
        Constraint::Length(banner_height),
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(main_area);

    if banner_height > 0 {
        let banner =
            Paragraph::new(" The model is not reachable. Start Ollama, then press r to check again.")
                .style(Style::default().fg(Color::Black).bg(Color::Yellow));
        frame.render_widget(banner, banner_area);
    }

    render_chat(frame, app, chat_area);
    render_input(frame, app, input_area);
    render_status(frame, app, status_area);

    if let Some(pending) = &app.confirm {
        render_confirm(frame, &pending.prompt);
    }
}

fn render_sidebar(frame: &mut Frame, app: &mut App, area: Rect) {
    let focused = app.focus == FocusPane::Sidebar;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if focused { Color::Cyan } else { Color::DarkGray }))
        .title(" Conversations ");

    let items: Vec<ListItem> = app
        .conversations
        .iter()
        .map(|c| {
            let style = if Some(c.id) == app.active {
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(Span::styled(c.title.clone(), style))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(Color::DarkGray))
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut app.sidebar_state);
}

fn render_chat(frame: &mut Frame, app: &mut App, area: Rect) {
    // Inner size for scroll calculations
    app.chat_height = area.height.saturating_sub(2);
    app.chat_width = area.width.saturating_sub(2);

    let block = Block::default().borders(Borders::ALL).title(" Counselor ");

    let text = if app.active.is_none() {
        Text::from(Span::styled(
            "Select a conversation or press 'n' to start one.",
            Style::default().fg(Color::DarkGray),
        ))
    } else if app.messages.is_empty() {
        Text::from(Span::styled(
            "Ask about colleges, essays or your application plan...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let mut lines: Vec<Line> = Vec::new();
        let last = app.messages.len() - 1;
        for (i, msg) in app.messages.iter().enumerate() {
            let (label, color) = match msg.role {
                Role::User => ("You:", Color::Cyan),
                Role::Assistant => ("Counselor:", Color::Yellow),
                Role::System => continue,
            };
            lines.push(Line::from(Span::styled(
                label,
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            )));

            if app.streaming && i == last && msg.content.is_empty() {
                let dots = ".".repeat(app.animation_frame as usize + 1);
                lines.push(Line::from(Span::styled(
                    format!("Thinking{}", dots),
                    Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
                )));
            } else {
                lines.extend(msg.content.lines().map(|l| Line::from(l.to_string())));
            }
            lines.push(Line::default());
        }
        Text::from(lines)
    };

    let chat = Paragraph::new(text)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));
    frame.render_widget(chat, area);
}

fn render_input(frame: &mut Frame, app: &App, area: Rect) {
    let focused = app.focus == FocusPane::Input;
    let (title, border) = if !app.input_enabled {
        (" Input disabled ", Color::DarkGray)
    } else if focused {
        (" Message (Enter to send, Esc for sidebar) ", Color::Yellow)
    } else {
        (" Message (Tab to focus) ", Color::DarkGray)
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .title(title);

    // Horizontal scroll keeps the cursor visible
    let inner_width = area.width.saturating_sub(2) as usize;
    let offset = (app.input_cursor + 1).saturating_sub(inner_width);
    let visible: String = app.input.chars().skip(offset).take(inner_width).collect();

    let style = if app.input_enabled {
        Style::default()
    } else {
        Style::default().fg(Color::DarkGray)
    };
    frame.render_widget(Paragraph::new(visible).style(style).block(block), area);

    if focused && app.input_enabled && app.confirm.is_none() {
        let x = area.x + 1 + app.input_cursor.saturating_sub(offset) as u16;
        frame.set_cursor_position((x, area.y + 1));
    }
}

fn render_status(frame: &mut Frame, app: &App, area: Rect) {
    let line = match &app.flash {
        Some(message) => Line::from(Span::styled(
            format!(" {}", message),
            Style::default().fg(Color::Red),
        )),
        None => Line::from(Span::styled(
            " n new  enter open  d delete  r recheck model  tab switch  pgup/pgdn scroll  q quit",
            Style::default().fg(Color::DarkGray),
        )),
    };
    frame.render_widget(Paragraph::new(line), area);
}

fn render_confirm(frame: &mut Frame, prompt: &str) {
    let area = centered(frame.area(), 40, 5);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red))
        .title(" Confirm ");
    let body = Paragraph::new(vec![
        Line::from(prompt.to_string()),
        Line::default(),
        Line::from(Span::styled("[y] yes   [n] no", Style::default().fg(Color::DarkGray))),
    ])
    .block(block);

    frame.render_widget(Clear, area);
    frame.render_widget(body, area);
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
