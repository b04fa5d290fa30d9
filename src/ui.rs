use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use unicode_width::UnicodeWidthChar;

use crate::app::{App, InputMode, Screen, SPINNER_FRAMES};
use crate::form::OutputView;

pub const APP_TITLE: &str = "Crew Assistant";
pub const APP_SUBTITLE: &str = "Calendar & Contacts Assistant";
pub const LOGIN_PROMPT: &str = "Press Enter to log in";
pub const INPUT_LABEL: &str = "What would you like to do with your calendar or contacts?";

pub const EXAMPLE_REQUESTS: [&str; 4] = [
    "Create a meeting tomorrow at 2pm with John",
    "Find contact information for Sarah",
    "Schedule a team meeting and find their contact info",
    "Search for someone with email john@company.com",
];

const INPUT_ROWS: u16 = 4;

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    match app.screen() {
        Screen::Login => render_login(app, frame, body_area),
        Screen::Assistant => render_assistant(app, frame, body_area),
    }

    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let user = match app.screen() {
        Screen::Assistant => app
            .session
            .user()
            .and_then(|u| u.display_name())
            .map(|name| format!(" [{}]", name))
            .unwrap_or_default(),
        Screen::Login => String::new(),
    };

    let title = Line::from(vec![
        Span::styled(format!(" {} ", APP_SUBTITLE), Style::default().fg(Color::Cyan).bold()),
        Span::styled(user, Style::default().fg(Color::White)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let (mode_text, mode_style) = match (app.screen(), app.input_mode) {
        (Screen::Login, _) => (" LOGIN ", Style::default().bg(Color::Magenta).fg(Color::White)),
        (Screen::Assistant, InputMode::Normal) => {
            (" NORMAL ", Style::default().bg(Color::Blue).fg(Color::White))
        }
        (Screen::Assistant, InputMode::Editing) => {
            (" EDIT ", Style::default().bg(Color::Yellow).fg(Color::Black))
        }
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let hint = |key: &'static str, label: &'static str| {
        [
            Span::styled(format!(" {} ", key), key_style),
            Span::styled(format!(" {} ", label), label_style),
        ]
    };

    let mut hints: Vec<Span> = Vec::new();
    match (app.screen(), app.input_mode) {
        (Screen::Login, _) => {
            if !app.session.is_loading() {
                hints.extend(hint("Enter", "sign in"));
            }
            hints.extend(hint("q", "quit"));
        }
        (Screen::Assistant, InputMode::Editing) => {
            hints.extend(hint("Enter", "send"));
            hints.extend(hint("Alt+Enter", "newline"));
            hints.extend(hint("Esc", "stop typing"));
        }
        (Screen::Assistant, InputMode::Normal) => {
            hints.extend(hint("i", "type"));
            hints.extend(hint("Enter", "send"));
            if app.form.response().is_some() {
                hints.extend(hint("j/k", "scroll"));
                hints.extend(hint("c", "copy"));
            }
            hints.extend(hint("L", "sign out"));
            hints.extend(hint("q", "quit"));
        }
    }

    if let Some(status) = &app.status_message {
        hints.push(Span::styled(format!(" {} ", status), Style::default().fg(Color::Green)));
    }

    let footer_content = Line::from(
        vec![
            Span::styled(mode_text, mode_style),
            Span::styled(" ", label_style),
        ]
        .into_iter()
        .chain(hints)
        .collect::<Vec<_>>(),
    );

    let footer = Paragraph::new(footer_content).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

fn render_login(app: &App, frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(area, 64, 12);
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let mut lines = vec![
        Line::from(Span::styled(
            APP_TITLE,
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(APP_SUBTITLE, Style::default().fg(Color::Gray))),
        Line::default(),
    ];

    if app.session.is_loading() {
        lines.push(Line::from(Span::styled(
            "Loading...",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::ITALIC),
        )));
        match app.session.redirect_url() {
            Some(url) => {
                lines.push(Line::from("Finish signing in with your browser. If it did not open, visit:"));
                lines.push(Line::from(Span::styled(url.to_string(), Style::default().fg(Color::Blue))));
            }
            None => lines.push(Line::from("Contacting the identity provider")),
        }
    } else {
        lines.push(Line::from(Span::styled(
            format!(" {} ", LOGIN_PROMPT),
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )));
    }

    if let Some(error) = app.session.error() {
        lines.push(Line::default());
        lines.push(Line::from(Span::styled(error.to_string(), Style::default().fg(Color::Red))));
    }

    let login = Paragraph::new(Text::from(lines))
        .block(block)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: false });
    frame.render_widget(login, popup_area);
}

fn render_assistant(app: &mut App, frame: &mut Frame, area: Rect) {
    let [input_area, output_area] = Layout::vertical([
        Constraint::Length(INPUT_ROWS + 3),
        Constraint::Min(0),
    ])
    .areas(area);

    render_input(app, frame, input_area);
    render_output(app, frame, output_area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Editing;
    let border_color = if editing { Color::Yellow } else { Color::DarkGray };

    let submit_label = if app.is_busy() {
        " Processing... "
    } else if app.form.can_submit(app.session.is_loading()) {
        " Enter: Send Request "
    } else {
        " Send Request "
    };
    let submit_style = if app.form.can_submit(app.session.is_loading()) {
        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(format!(" {} ", INPUT_LABEL))
        .title_bottom(Line::from(Span::styled(submit_label, submit_style)).right_aligned());

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let width = inner.width as usize;
    let height = inner.height as usize;

    if app.form.draft().is_empty() {
        let mut lines = vec![Line::from(Span::styled(
            "Examples:",
            Style::default().fg(Color::DarkGray),
        ))];
        lines.extend(EXAMPLE_REQUESTS.iter().map(|example| {
            Line::from(Span::styled(
                format!("  • {}", example),
                Style::default().fg(Color::DarkGray),
            ))
        }));
        frame.render_widget(Paragraph::new(lines), inner);
        if editing {
            frame.set_cursor_position((inner.x, inner.y));
        }
        return;
    }

    let (rows, (cursor_col, cursor_row)) = wrap_draft(app.form.draft(), app.form.cursor(), width);

    // Keep the cursor row visible
    let first_row = if height == 0 {
        0
    } else {
        cursor_row.saturating_sub(height - 1)
    };

    let visible: Vec<Line> = rows
        .into_iter()
        .skip(first_row)
        .take(height)
        .map(|row| Line::from(Span::styled(row, Style::default().fg(Color::Cyan))))
        .collect();

    frame.render_widget(Paragraph::new(visible), inner);

    if editing && height > 0 {
        frame.set_cursor_position((
            inner.x + cursor_col as u16,
            inner.y + (cursor_row - first_row) as u16,
        ));
    }
}

fn render_output(app: &mut App, frame: &mut Frame, area: Rect) {
    // Store output dimensions for scroll calculations (inner size minus borders)
    app.result_height = area.height.saturating_sub(2);
    app.result_width = area.width.saturating_sub(2);

    let output = app.form.output(app.session.is_loading());
    let (title, border_color) = match output {
        OutputView::Loading => (" Working ", Color::Yellow),
        OutputView::Error(_) => (" ❌ Error ", Color::Red),
        OutputView::Success(_) => (" ✅ Response ", Color::Green),
        OutputView::Empty => (" Output ", Color::DarkGray),
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    let paragraph = match output {
        OutputView::Loading => {
            let spinner = SPINNER_FRAMES[app.animation_frame as usize % SPINNER_FRAMES.len()];
            Paragraph::new(vec![
                Line::default(),
                Line::from(Span::styled(spinner, Style::default().fg(Color::Yellow))),
                Line::from(Span::styled(
                    "Processing your request...",
                    Style::default().add_modifier(Modifier::BOLD),
                )),
                Line::from(Span::styled(
                    "This may take a few seconds",
                    Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
                )),
            ])
            .alignment(Alignment::Center)
        }
        OutputView::Error(message) => Paragraph::new(Text::from(message.to_string()))
            .style(Style::default().fg(Color::Red))
            .wrap(Wrap { trim: false }),
        OutputView::Success(text) => Paragraph::new(Text::from(text.to_string()))
            .wrap(Wrap { trim: false })
            .scroll((app.result_scroll, 0)),
        OutputView::Empty => {
            let mut lines = vec![
                Line::from("👆 Enter a request above to get started"),
                Line::default(),
                Line::from(Span::styled(
                    "Try these examples:",
                    Style::default().add_modifier(Modifier::BOLD),
                )),
            ];
            lines.extend(
                EXAMPLE_REQUESTS
                    .iter()
                    .map(|example| Line::from(format!("  \"{}\"", example))),
            );
            Paragraph::new(lines).style(Style::default().fg(Color::Gray))
        }
    };

    frame.render_widget(paragraph.block(block), area);
}

/// Hard-wrap the draft at `width` terminal cells and locate the cursor as
/// `(column, row)` in the wrapped rows. Columns are display cells, so wide
/// characters take two.
pub fn wrap_draft(draft: &str, cursor: usize, width: usize) -> (Vec<String>, (usize, usize)) {
    let width = width.max(1);
    let mut rows = vec![String::new()];
    let mut col = 0;
    let mut cursor_pos = (0, 0);

    for (idx, c) in draft.chars().enumerate() {
        if c == '\n' {
            if idx == cursor {
                cursor_pos = (col, rows.len() - 1);
            }
            rows.push(String::new());
            col = 0;
            continue;
        }
        let cells = c.width().unwrap_or(0);
        if col > 0 && col + cells > width {
            rows.push(String::new());
            col = 0;
        }
        if idx == cursor {
            cursor_pos = (col, rows.len() - 1);
        }
        if let Some(row) = rows.last_mut() {
            row.push(c);
        }
        col += cells;
    }

    if cursor >= draft.chars().count() {
        // Cursor after the last character; a full row pushes it to the next one
        if col >= width {
            rows.push(String::new());
            cursor_pos = (0, rows.len() - 1);
        } else {
            cursor_pos = (col, rows.len() - 1);
        }
    }

    (rows, cursor_pos)
}

fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width.saturating_sub(width)) / 2,
        area.y + (area.height.saturating_sub(height)) / 2,
        width,
        height,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_breaks_on_newlines_and_width() {
        let (rows, cursor) = wrap_draft("abcdef\ngh", 9, 4);
        assert_eq!(rows, vec!["abcd", "ef", "gh"]);
        assert_eq!(cursor, (2, 2));
    }

    #[test]
    fn cursor_inside_wrapped_row() {
        let (_, cursor) = wrap_draft("abcdef", 4, 4);
        assert_eq!(cursor, (0, 1));

        let (_, cursor) = wrap_draft("abcdef", 2, 4);
        assert_eq!(cursor, (2, 0));
    }

    #[test]
    fn cursor_after_full_row_moves_down() {
        let (rows, cursor) = wrap_draft("abcd", 4, 4);
        assert_eq!(rows, vec!["abcd", ""]);
        assert_eq!(cursor, (0, 1));
    }

    #[test]
    fn wide_characters_wrap_by_display_width() {
        let (rows, cursor) = wrap_draft("日本語", 3, 4);
        assert_eq!(rows, vec!["日本", "語"]);
        assert_eq!(cursor, (2, 1));

        let (rows, cursor) = wrap_draft("ab😀cd", 3, 4);
        assert_eq!(rows, vec!["ab😀", "cd"]);
        assert_eq!(cursor, (0, 1));

        // A wide character that does not fit moves whole to the next row
        let (rows, cursor) = wrap_draft("abc日", 3, 4);
        assert_eq!(rows, vec!["abc", "日"]);
        assert_eq!(cursor, (0, 1));
    }

    #[test]
    fn cursor_after_trailing_newline() {
        let (rows, cursor) = wrap_draft("ab\n", 3, 10);
        assert_eq!(rows, vec!["ab", ""]);
        assert_eq!(cursor, (0, 1));
    }
}
