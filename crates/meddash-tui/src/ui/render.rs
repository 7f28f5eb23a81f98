use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use meddash_core::auth::AdminPage;

use crate::app::{App, AppState, LoginFocus};

use super::styles;
use super::tabs::{statistics, table};

/// Width of the text inside the login fields
const FIELD_WIDTH: usize = 24;

pub fn render(frame: &mut Frame, app: &App) {
    if app.state == AppState::Initializing {
        render_loading(frame);
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title bar
            Constraint::Length(2), // Tabs
            Constraint::Min(10),   // Main content
            Constraint::Length(1), // Status bar
        ])
        .split(frame.area());

    render_title_bar(frame, app, chunks[0]);
    render_tabs(frame, app, chunks[1]);
    render_main_content(frame, app, chunks[2]);
    render_status_bar(frame, app, chunks[3]);

    match app.state {
        AppState::ShowingHelp => render_help_overlay(frame),
        AppState::LoggingIn => render_login_overlay(frame, app),
        AppState::ConfirmingDelete => render_delete_overlay(frame, app),
        AppState::ConfirmingQuit => render_quit_overlay(frame),
        _ => {}
    }
}

fn render_loading(frame: &mut Frame) {
    let area = centered_rect_fixed(30, 3, frame.area());
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));
    let paragraph = Paragraph::new(Span::styled("  Checking session...", styles::muted_style()))
        .block(block);
    frame.render_widget(paragraph, area);
}

fn render_title_bar(frame: &mut Frame, app: &App, area: Rect) {
    let title = "  MedDash";
    let user = match app.user_label() {
        Some((initials, name)) => format!("[{}] {}  ", initials, name),
        None => String::new(),
    };
    let help_hint = "[?] Help";

    let padding = (area.width as usize)
        .saturating_sub(title.len() + user.chars().count() + help_hint.len() + 4);

    let title_line = Line::from(vec![
        Span::styled(title, styles::title_style()),
        Span::raw(" ".repeat(padding)),
        Span::styled(user, styles::highlight_style()),
        Span::styled(help_hint, styles::muted_style()),
    ]);

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());

    frame.render_widget(Paragraph::new(title_line).block(block), area);
}

fn render_tabs(frame: &mut Frame, app: &App, area: Rect) {
    let mut spans = vec![Span::raw(" ")];
    for (i, page) in AdminPage::ALL.iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled(" | ", styles::muted_style()));
        }
        let label = format!("[{}] {}", i + 1, page.title());
        spans.push(Span::styled(label, styles::tab_style(*page == app.current_page)));
    }

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());

    frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

fn render_main_content(frame: &mut Frame, app: &App, area: Rect) {
    match app.current_page {
        AdminPage::Statistics => statistics::render(frame, app, area),
        AdminPage::Users => table::render(frame, &app.users, "Users", area),
        AdminPage::Pharmacies => table::render(frame, &app.pharmacies, "Pharmacies", area),
    }
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let shortcuts = match app.current_page {
        AdminPage::Statistics => "[u]pdate | [L]ogout | [q]uit",
        _ => "[d]elete | [u]pdate | [L]ogout | [q]uit",
    };
    let right_text = format!(" {} ", shortcuts);

    let (left_text, left_style) = if let Some(error) = app.current_error() {
        (format!(" {} [Esc] ", error), styles::error_style())
    } else if let Some(ref msg) = app.status_message {
        (format!(" {} ", msg), styles::success_style())
    } else {
        (String::new(), styles::muted_style())
    };

    let padding = (area.width as usize)
        .saturating_sub(left_text.chars().count())
        .saturating_sub(right_text.len());

    let status_line = Line::from(vec![
        Span::styled(left_text, left_style),
        Span::raw(" ".repeat(padding)),
        Span::styled(right_text, styles::muted_style()),
    ]);
    frame.render_widget(
        Paragraph::new(status_line).style(styles::status_bar_style()),
        area,
    );
}

fn help_line(key: &'static str, desc: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("  {:<10}", key), styles::help_key_style()),
        Span::styled(desc, styles::help_desc_style()),
    ])
}

fn render_help_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(48, 22, frame.area());
    frame.render_widget(Clear, area);

    let version = env!("CARGO_PKG_VERSION");

    let help_text = vec![
        Line::from(Span::styled("  MedDash", styles::title_style())),
        Line::from(Span::styled(format!("  version {}", version), styles::muted_style())),
        Line::from(""),
        Line::from(Span::styled(" Navigation", styles::highlight_style())),
        help_line("1-3", "Switch page"),
        help_line("←/→", "Previous/next page"),
        help_line("↑/↓", "Select row"),
        help_line("[ / ]", "Previous/next table page"),
        Line::from(""),
        Line::from(Span::styled(" Tables", styles::highlight_style())),
        help_line("s", "Cycle sort column"),
        help_line("r", "Reverse sort"),
        help_line("z", "Change page size"),
        help_line("d", "Delete selected row"),
        Line::from(""),
        Line::from(Span::styled(" Actions", styles::highlight_style())),
        help_line("u", "Reload current page"),
        help_line("Esc", "Dismiss error"),
        help_line("L", "Log out"),
        help_line("q", "Quit"),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(help_text).block(block), area);
}

fn login_field<'a>(label: &'a str, value: String, focused: bool) -> Line<'a> {
    let style = if focused {
        styles::selected_style()
    } else {
        styles::list_item_style()
    };
    let cursor = if focused { "▌" } else { "" };
    Line::from(vec![
        Span::raw("  "),
        Span::styled(label, styles::muted_style()),
        Span::styled("[", styles::muted_style()),
        Span::styled(format!("{:<width$}{}", value, cursor, width = FIELD_WIDTH), style),
        Span::styled("]", styles::muted_style()),
    ])
}

fn render_login_overlay(frame: &mut Frame, app: &App) {
    let height = if app.login_error.is_some() { 11 } else { 9 };
    let area = centered_rect_fixed(46, height, frame.area());
    frame.render_widget(Clear, area);

    // Show the tail of long emails so the cursor stays visible
    let email: String = {
        let count = app.login_email.chars().count();
        app.login_email
            .chars()
            .skip(count.saturating_sub(FIELD_WIDTH))
            .collect()
    };
    let masked = "*".repeat(app.login_password.chars().count().min(FIELD_WIDTH));

    let mut lines = vec![
        Line::from(Span::styled("  Sign in to MedDash", styles::title_style())),
        Line::from(""),
        login_field("Email:    ", email, app.login_focus == LoginFocus::Email),
        login_field("Password: ", masked, app.login_focus == LoginFocus::Password),
        Line::from(""),
    ];

    let button_focused = app.login_focus == LoginFocus::Button;
    let (button_label, button_style) = if button_focused {
        (" ▶ Login ◀ ", styles::selected_style())
    } else {
        ("   Login   ", styles::list_item_style())
    };
    lines.push(Line::from(vec![
        Span::raw("              ["),
        Span::styled(button_label, button_style),
        Span::raw("]"),
    ]));

    if let Some(ref error) = app.login_error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(format!("  {}", error), styles::error_style())));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn confirm_hint(action: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::styled("  Press ", styles::muted_style()),
        Span::styled("[Y]", styles::help_key_style()),
        Span::styled(format!(" to {}, ", action), styles::muted_style()),
        Span::styled("[N]", styles::help_key_style()),
        Span::styled(" to cancel", styles::muted_style()),
    ])
}

fn render_delete_overlay(frame: &mut Frame, app: &App) {
    let Some(ref pending) = app.pending_delete else {
        return;
    };
    let area = centered_rect_fixed(50, 7, frame.area());
    frame.render_widget(Clear, area);

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            format!("  Delete {}?", pending.name),
            styles::highlight_style(),
        )),
        Line::from(""),
        confirm_hint("delete"),
    ];

    let block = Block::default()
        .title(" Confirm ")
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_quit_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(46, 7, frame.area());
    frame.render_widget(Clear, area);

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            "  Are you sure you want to quit?",
            styles::highlight_style(),
        )),
        Line::from(""),
        confirm_hint("quit"),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Create a centered rectangle with fixed dimensions
fn centered_rect_fixed(width: u16, height: u16, r: Rect) -> Rect {
    let x = r.x + (r.width.saturating_sub(width)) / 2;
    let y = r.y + (r.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(r.width), height.min(r.height))
}
