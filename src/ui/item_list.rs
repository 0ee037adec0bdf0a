use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem},
    Frame,
};

use crate::model::work_item::{WorkItemRecord, WorkItemType};
use crate::ui::theme::{state_color, type_color, ACCENT, MUTED};

/// Remote work items, one per line. `selected` is `None` when the list has no cursor.
pub fn render(
    f: &mut Frame,
    area: Rect,
    items: &[WorkItemRecord],
    selected: Option<usize>,
    title: &str,
) {
    let list_items: Vec<ListItem> = items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let is_selected = selected == Some(i);

            let id_span = Span::styled(
                format!("{:>7} ", item.id),
                Style::default().fg(type_color(&item.work_item_type)),
            );

            // Truncate title to fit
            let max_title = area.width.saturating_sub(30) as usize;
            let title: String = item.title.chars().take(max_title).collect();
            let title_style = if is_selected {
                Style::default()
                    .fg(ACCENT)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };

            let sprint = item
                .iteration_path
                .rsplit('\\')
                .next()
                .unwrap_or_default()
                .to_string();
            let meta = if item.work_item_type == WorkItemType::Task {
                format!(" {}h", item.original_estimate)
            } else {
                format!(" {}sp {sprint}", item.story_points)
            };

            let line = Line::from(vec![
                Span::raw(if is_selected { "▶ " } else { "  " }),
                id_span,
                Span::styled(title, title_style),
                Span::styled(meta, Style::default().fg(MUTED)),
                Span::styled(
                    format!(" [{}]", item.state),
                    Style::default().fg(state_color(&item.state)),
                ),
            ]);
            ListItem::new(line)
        })
        .collect();

    let list = List::new(list_items).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(if selected.is_some() { ACCENT } else { MUTED }))
            .title(format!("{title}({}) ", items.len())),
    );

    f.render_widget(list, area);
}
