use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::model::chat::{ChatRole, ChatTurn};

/// The conversation that `e` turns into stories; newest turns stay visible.
pub fn render(f: &mut Frame, area: Rect, turns: &[ChatTurn]) {
    let visible_height = area.height.saturating_sub(2) as usize;

    let mut all_lines: Vec<Line> = Vec::new();
    for turn in turns {
        let (who, color) = match turn.role {
            ChatRole::User => ("you", ratatui::style::Color::White),
            ChatRole::Assistant => ("ai", ratatui::style::Color::Rgb(0xCC, 0xCC, 0xCC)),
            ChatRole::System => ("system", ratatui::style::Color::Yellow),
        };
        let mut body = turn.content.lines();
        let first = body.next().unwrap_or_default();
        all_lines.push(Line::from(vec![
            Span::styled(
                format!("{who}: "),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ),
            Span::styled(first.to_string(), Style::default().fg(color)),
        ]));
        for text_line in body {
            all_lines.push(Line::styled(
                format!("  {text_line}"),
                Style::default().fg(color),
            ));
        }
    }

    // Auto-scroll to bottom
    let skip = all_lines.len().saturating_sub(visible_height);
    let visible_lines: Vec<Line> = all_lines.into_iter().skip(skip).collect();

    let paragraph = Paragraph::new(visible_lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(ratatui::style::Color::Magenta))
                .title(format!(" Conversation ({}) ", turns.len())),
        )
        .wrap(Wrap { trim: false });

    f.render_widget(paragraph, area);
}
