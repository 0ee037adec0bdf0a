use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::app::App;
use crate::ui::theme::ACCENT;

const VERBS: [&str; 8] = [
    "load", "set", "add", "del", "say", "sprints", "replicate", "rank",
];

pub fn render(f: &mut Frame, area: Rect, app: &App) {
    if !app.input_active {
        return;
    }

    let input = &app.input_buffer;
    let cursor = app.input_cursor;

    // Highlight a recognised verb
    let mut spans = Vec::new();
    let verb = input.split_whitespace().next().unwrap_or("");
    if input.starts_with(verb) && VERBS.contains(&verb.to_ascii_lowercase().as_str()) {
        spans.push(Span::styled(verb.to_string(), Style::default().fg(ACCENT)));
        spans.push(Span::raw(input[verb.len()..].to_string()));
    } else {
        spans.push(Span::raw(input.clone()));
    }

    let title = if input.is_empty() {
        " Command — load <id> | set <column> <value> | add <title> | del | say <text> | sprints <path> | replicate | rank "
    } else {
        " Command "
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(ratatui::style::Color::Yellow))
        .title(title);

    let paragraph = Paragraph::new(Line::from(spans)).block(block);
    f.render_widget(paragraph, area);

    // Position cursor
    let x = area.x + 1 + cursor as u16;
    let y = area.y + 1;
    f.set_cursor_position((x.min(area.x + area.width - 2), y));
}
