use ratatui::{
    layout::{Constraint, Rect},
    style::{Modifier, Style},
    widgets::{Block, Borders, Cell, Row, Table},
    Frame,
};

use crate::llm::schema::is_testing_task;
use crate::model::generated::GeneratedItem;
use crate::ui::theme::{ACCENT, LABEL, MUTED};
use crate::util::html::to_plain_text;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    Task,
    Story,
}

/// Editable generated rows; edit the selected one with `:set <column> <value>`.
pub fn render(
    f: &mut Frame,
    area: Rect,
    rows: &[GeneratedItem],
    kind: RowKind,
    selected: Option<usize>,
    title: &str,
) {
    let (header, widths) = match kind {
        RowKind::Task => (
            vec!["Title", "Hours", "Activity", "Assigned", "Description"],
            vec![
                Constraint::Percentage(30),
                Constraint::Length(6),
                Constraint::Length(12),
                Constraint::Length(14),
                Constraint::Min(10),
            ],
        ),
        RowKind::Story => (
            vec!["Title", "Points", "Iteration", "Acceptance criteria"],
            vec![
                Constraint::Percentage(35),
                Constraint::Length(7),
                Constraint::Length(14),
                Constraint::Min(10),
            ],
        ),
    };

    let table_rows: Vec<Row> = rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let cells = match kind {
                RowKind::Task => vec![
                    Cell::from(row.title.clone()),
                    Cell::from(format!("{}", row.estimate())),
                    Cell::from(row.activity.clone().unwrap_or_default()),
                    Cell::from(row.assigned_to.clone().unwrap_or_default()),
                    Cell::from(one_line(&row.description)),
                ],
                RowKind::Story => vec![
                    Cell::from(row.title.clone()),
                    Cell::from(row.story_points.map(|p| p.to_string()).unwrap_or_default()),
                    Cell::from(last_segment(row.iteration_path.as_deref())),
                    Cell::from(one_line(row.acceptance_criteria.as_deref().unwrap_or(""))),
                ],
            };
            let mut style = Style::default();
            if kind == RowKind::Task && is_testing_task(row) {
                style = style.fg(LABEL);
            }
            if selected == Some(i) {
                style = style.fg(ACCENT).add_modifier(Modifier::BOLD | Modifier::REVERSED);
            }
            Row::new(cells).style(style)
        })
        .collect();

    let table = Table::new(table_rows, widths)
        .header(Row::new(header).style(Style::default().fg(MUTED).add_modifier(Modifier::BOLD)))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(if selected.is_some() { ACCENT } else { MUTED }))
                .title(title.to_string()),
        );

    f.render_widget(table, area);
}

fn one_line(html: &str) -> String {
    to_plain_text(html).replace('\n', " ")
}

fn last_segment(path: Option<&str>) -> String {
    path.and_then(|p| p.rsplit('\\').next())
        .unwrap_or_default()
        .to_string()
}
