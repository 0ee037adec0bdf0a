use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::model::work_item::WorkItemRecord;
use crate::ui::theme::{state_color, type_color, ACCENT, LABEL};
use crate::util::html::to_plain_text;

pub fn render(f: &mut Frame, area: Rect, item: Option<&WorkItemRecord>, title: &str) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(ACCENT))
        .title(title.to_string());

    let Some(item) = item else {
        let hint = Paragraph::new(Line::styled(
            "Press : and type load <id>",
            Style::default().fg(LABEL),
        ))
        .block(block);
        f.render_widget(hint, area);
        return;
    };

    let mut lines: Vec<Line> = vec![
        Line::from(vec![
            Span::styled(
                format!("{} #{} ", item.work_item_type, item.id),
                Style::default().fg(type_color(&item.work_item_type)),
            ),
            Span::styled(item.state.clone(), Style::default().fg(state_color(&item.state))),
        ]),
        Line::raw(item.title.clone()),
        Line::raw(""),
    ];

    lines.push(field("Points", format!("{}", item.story_points)));
    lines.push(field("Assigned", item.assigned_to.clone()));
    lines.push(field("Iteration", item.iteration_path.clone()));
    lines.push(field("Area", item.area_path.clone()));
    if !item.tags.is_empty() {
        lines.push(field("Tags", item.tags.join(", ")));
    }
    if !item.web_url.is_empty() {
        lines.push(Line::from(vec![
            Span::styled("URL: ", Style::default().fg(LABEL)),
            Span::styled(
                item.web_url.clone(),
                Style::default().fg(ratatui::style::Color::Blue),
            ),
        ]));
    }

    for (label, html) in [
        ("Description", &item.description),
        ("Acceptance criteria", &item.acceptance_criteria),
    ] {
        let text = to_plain_text(html);
        if text.is_empty() {
            continue;
        }
        lines.push(Line::raw(""));
        lines.push(Line::styled(format!("{label}:"), Style::default().fg(LABEL)));
        let truncated: String = text.chars().take(600).collect();
        lines.extend(truncated.lines().map(|l| Line::raw(l.to_string())));
    }

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: true });
    f.render_widget(paragraph, area);
}

fn field(label: &str, value: String) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{label}: "), Style::default().fg(LABEL)),
        Span::raw(value),
    ])
}
