use ratatui::{
    layout::{Constraint, Rect},
    text::Span,
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame,
};

use meddash_core::utils::truncate_string;
use meddash_core::views::{ListView, Resource};

use crate::ui::styles;

/// Longest cell text before truncation
const MAX_CELL_WIDTH: usize = 40;

/// Render one page of a collection as a table.
pub fn render<T: Resource>(frame: &mut Frame, view: &ListView<T>, title: &str, area: Rect) {
    let block = Block::default()
        .title(format!(" {} ({}) ", title, view.rows().len()))
        .title_style(styles::title_style())
        .title_bottom(Span::styled(page_footer(view), styles::muted_style()))
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));

    if view.rows().is_empty() {
        let text = if view.is_loading() {
            format!("Loading {}...", T::PLURAL)
        } else {
            format!("No {} found", T::PLURAL)
        };
        frame.render_widget(
            Paragraph::new(Span::styled(text, styles::muted_style())).block(block),
            area,
        );
        return;
    }

    let sort = view.sort();
    let header_cells = T::COLUMNS.iter().enumerate().map(|(i, name)| {
        let marker = match sort {
            Some(spec) if spec.column == i && spec.ascending => " ▲",
            Some(spec) if spec.column == i => " ▼",
            _ => "",
        };
        Cell::from(format!("{}{}", name, marker))
    });
    let header = Row::new(header_cells).style(styles::title_style()).height(1);

    let rows: Vec<Row> = view
        .page_rows()
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let style = if i == view.selection() {
                styles::selected_style()
            } else {
                styles::list_item_style()
            };
            let cells = (0..T::COLUMNS.len())
                .map(|col| Cell::from(truncate_string(&item.cell(col), MAX_CELL_WIDTH)));
            Row::new(cells).style(style)
        })
        .collect();

    let widths = vec![Constraint::Fill(1); T::COLUMNS.len()];

    let table = Table::new(rows, widths)
        .header(header)
        .block(block)
        .row_highlight_style(styles::selected_style());

    let mut state = TableState::default();
    state.select(Some(view.selection()));

    frame.render_stateful_widget(table, area, &mut state);
}

fn page_footer<T: Resource>(view: &ListView<T>) -> String {
    format!(
        " Page {}/{} | {} per page ",
        view.page() + 1,
        view.page_count(),
        view.page_size()
    )
}
