use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use meddash_core::models::DashboardStats;

use crate::app::App;
use crate::ui::styles;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let view = &app.statistics;

    let Some(stats) = view.stats() else {
        let text = if view.is_loading() {
            "Loading statistics..."
        } else {
            "No statistics available. Press [u] to reload."
        };
        let block = Block::default()
            .title(" Statistics ")
            .title_style(styles::title_style())
            .borders(Borders::ALL)
            .border_style(styles::border_style(true));
        frame.render_widget(
            Paragraph::new(Span::styled(text, styles::muted_style())).block(block),
            area,
        );
        return;
    };

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(5), Constraint::Min(3)])
        .split(area);

    let cards = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Ratio(1, 4),
            Constraint::Ratio(1, 4),
            Constraint::Ratio(1, 4),
            Constraint::Ratio(1, 4),
        ])
        .split(rows[0]);

    render_card(frame, cards[0], "Total Users", stats.total_users, styles::list_item_style());
    render_card(frame, cards[1], "Pharmacies", stats.total_pharmacies, styles::list_item_style());
    render_card(frame, cards[2], "Active", stats.active_pharmacies, styles::success_style());
    render_card(frame, cards[3], "Inactive", stats.inactive_pharmacies, styles::error_style());

    render_breakdown(frame, stats, rows[1]);
}

fn render_card(frame: &mut Frame, area: Rect, label: &str, value: usize, style: ratatui::style::Style) {
    let lines = vec![
        Line::from(Span::styled(format!(" {}", value), style)),
        Line::from(Span::styled(format!(" {}", label), styles::muted_style())),
    ];
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(false));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_breakdown(frame: &mut Frame, stats: &DashboardStats, area: Rect) {
    let width = area.width.saturating_sub(24) as usize;
    let bar = |count: usize| {
        if stats.total_pharmacies == 0 {
            String::new()
        } else {
            "█".repeat(count * width / stats.total_pharmacies)
        }
    };

    let lines = vec![
        Line::from(""),
        Line::from(vec![
            Span::styled("  Active     ", styles::muted_style()),
            Span::styled(format!("{:>4} ", stats.active_pharmacies), styles::list_item_style()),
            Span::styled(bar(stats.active_pharmacies), styles::success_style()),
        ]),
        Line::from(vec![
            Span::styled("  Inactive   ", styles::muted_style()),
            Span::styled(format!("{:>4} ", stats.inactive_pharmacies), styles::list_item_style()),
            Span::styled(bar(stats.inactive_pharmacies), styles::error_style()),
        ]),
    ];

    let block = Block::default()
        .title(" Pharmacy Status ")
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}
