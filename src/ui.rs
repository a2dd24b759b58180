use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
};
use ragtech_core::Role;
use crate::app::{App, BackendStatus, FocusPane, InputMode};

/// Render `**bold**` runs in a line; unbalanced markers are left as typed.
fn parse_markdown_line(text: &str) -> Line<'static> {
    let parts: Vec<&str> = text.split("**").collect();
    if parts.len() < 3 || parts.len() % 2 == 0 {
        return Line::from(text.to_string());
    }

    let spans: Vec<Span<'static>> = parts
        .iter()
        .enumerate()
        .filter(|(_, part)| !part.is_empty())
        .map(|(i, part)| {
            if i % 2 == 1 {
                Span::styled(part.to_string(), Style::default().add_modifier(Modifier::BOLD))
            } else {
                Span::raw(part.to_string())
            }
        })
        .collect();
    Line::from(spans)
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    let [sessions_area, chat_column] = Layout::horizontal([
        Constraint::Length(30),
        Constraint::Min(0),
    ])
    .areas(body_area);

    let [chat_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(chat_column);

    render_header(app, frame, header_area);
    render_sessions(app, frame, sessions_area);
    render_chat(app, frame, chat_area);
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let (status_text, status_color) = match &app.backend_status {
        BackendStatus::Checking => ("checking backend...".to_string(), Color::Gray),
        BackendStatus::Online(status) => (status.clone(), Color::Green),
        BackendStatus::Offline => ("backend offline".to_string(), Color::Red),
    };

    let title = Line::from(vec![
        Span::styled(" RAG-Tech Assistant ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(format!("[{}] ", app.client.base_url()), Style::default().fg(Color::Gray)),
        Span::styled(status_text, Style::default().fg(status_color)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_sessions(app: &mut App, frame: &mut Frame, area: Rect) {
    let focused = app.focus == FocusPane::Sessions;
    let border_color = if focused { Color::Cyan } else { Color::DarkGray };
    let sessions = app.conversation.sessions().sessions();

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(format!(" History ({}) ", sessions.len()));

    if sessions.is_empty() {
        let empty = Paragraph::new(Span::styled("No chats yet", Style::default().fg(Color::DarkGray)))
            .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let active = app.conversation.sessions().active_id().cloned();
    let items: Vec<ListItem> = sessions
        .iter()
        .map(|session| {
            let style = if Some(session.id()) == active.as_ref() {
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(Span::styled(format!(" {}", session.title()), style))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(Color::Blue).fg(Color::White))
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut app.session_state);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    // Store chat area dimensions for scroll calculations (inner size minus borders)
    app.chat_height = area.height.saturating_sub(2);
    app.chat_width = area.width.saturating_sub(2);

    let focused = app.focus == FocusPane::Chat;
    let border_color = if focused { Color::Cyan } else { Color::DarkGray };
    let title = app
        .conversation
        .sessions()
        .active_session()
        .map(|s| format!(" {} ", s.title()))
        .unwrap_or_else(|| " Chat ".to_string());

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    let mut lines: Vec<Line> = Vec::new();
    for msg in app.conversation.active_messages() {
        match msg.role {
            Role::System => {
                lines.push(Line::from(Span::styled(
                    msg.text.clone(),
                    Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
                )));
            }
            Role::User => {
                lines.push(Line::from(Span::styled(
                    "You:",
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                )));
                for line in msg.text.lines() {
                    lines.push(Line::from(line.to_string()));
                }
            }
            Role::Assistant => {
                lines.push(Line::from(Span::styled(
                    "AI:",
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                )));
                for line in msg.text.lines() {
                    lines.push(parse_markdown_line(line));
                }
            }
        }
        lines.push(Line::default());
    }

    if app.conversation.is_awaiting_active() {
        lines.push(Line::from(Span::styled(
            "AI:",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("Thinking{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    let chat = Paragraph::new(Text::from(lines))
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Editing;
    let border_color = if editing || app.focus == FocusPane::Input {
        Color::Yellow
    } else {
        Color::DarkGray
    };

    let title = if app.conversation.voice_input().is_listening() {
        " Listening... (Ctrl+R to stop) "
    } else if app.conversation.is_awaiting_response() {
        " Thinking... "
    } else {
        " Ask something about tech (Enter to send) "
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    // Horizontal scrolling keeps the cursor visible
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = app.input_cursor;
    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    // Newlines are shown as a return glyph in the single-row box
    let visible_text: String = app
        .conversation
        .input()
        .as_str()
        .chars()
        .map(|c| if c == '\n' { '↵' } else { c })
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(block);

    frame.render_widget(input, area);

    if editing {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };
    let mode_text = match app.input_mode {
        InputMode::Normal => " NORMAL ",
        InputMode::Editing => " INSERT ",
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let mut spans = vec![Span::styled(mode_text, mode_style)];

    let voice_out = if app.conversation.voice_output().is_enabled() {
        " Voice ON "
    } else {
        " Voice OFF "
    };
    let voice_in = if app.conversation.voice_input().is_listening() {
        " Listening "
    } else {
        " Mic "
    };

    let hints: Vec<(&str, &str)> = match (app.input_mode, app.focus) {
        (InputMode::Editing, _) => vec![
            (" Enter ", " send "),
            (" Alt+Enter ", " newline "),
            (" Ctrl+R ", voice_in),
            (" Esc ", " normal "),
        ],
        (InputMode::Normal, FocusPane::Sessions) => vec![
            (" j/k ", " nav "),
            (" Enter ", " open "),
            (" d ", " delete "),
            (" n ", " new "),
            (" v ", voice_out),
            (" m ", voice_in),
            (" Tab ", " focus "),
            (" q ", " quit "),
        ],
        (InputMode::Normal, _) => vec![
            (" j/k ", " scroll "),
            (" i ", " type "),
            (" n ", " new "),
            (" v ", voice_out),
            (" m ", voice_in),
            (" Tab ", " focus "),
            (" q ", " quit "),
        ],
    };

    for (key, label) in hints {
        spans.push(Span::styled(key, key_style));
        spans.push(Span::styled(label, label_style));
    }

    if let Some(notice) = &app.notice {
        spans.push(Span::raw(" "));
        spans.push(Span::styled(notice.clone(), Style::default().fg(Color::Yellow)));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
