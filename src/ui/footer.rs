use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::app::tabs::Tab;
use crate::app::App;

pub fn render(f: &mut Frame, area: Rect, app: &App) {
    let mut spans = Vec::new();

    match app.tab {
        Tab::Tasks => {
            spans.push(hint("↑↓", "navigate"));
            spans.push(hint("⇧↑↓", "reorder"));
            spans.push(hint("g", "generate"));
            spans.push(hint("u", "upload"));
            spans.push(hint("U", "force upload"));
            spans.push(hint("d", "delete row"));
        }
        Tab::Stories => {
            spans.push(hint("↑↓", "navigate"));
            spans.push(hint("←→", "focus"));
            spans.push(hint("⇧↑↓", "reorder"));
            spans.push(hint("g", "suggest"));
            spans.push(hint("v", "review"));
            spans.push(hint("f", "details"));
            spans.push(hint("a", "apply"));
            spans.push(hint("e", "extract"));
            spans.push(hint("u", "create"));
        }
    }
    spans.push(hint("t", "dry run"));
    spans.push(hint("r", "reload"));
    spans.push(hint("tab", "switch"));
    spans.push(hint(":", "command"));
    spans.push(hint("q", "quit"));

    // Mode indicator
    let dry_run = match app.tab {
        Tab::Tasks => app.tasks.dry_run,
        Tab::Stories => app.stories.dry_run,
    };
    spans.push(Span::raw("  "));
    if dry_run {
        spans.push(Span::styled(
            " DRY RUN ",
            Style::default()
                .fg(ratatui::style::Color::Black)
                .bg(ratatui::style::Color::DarkGray),
        ));
    } else {
        spans.push(Span::styled(
            " LIVE ",
            Style::default()
                .fg(ratatui::style::Color::Black)
                .bg(ratatui::style::Color::Red),
        ));
    }

    // Flash message
    if let Some((msg, _)) = &app.flash_message {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            msg,
            Style::default().fg(ratatui::style::Color::Yellow),
        ));
    }

    let line = Line::from(spans);
    let paragraph = Paragraph::new(line);
    f.render_widget(paragraph, area);
}

fn hint(key: &str, desc: &str) -> Span<'static> {
    Span::styled(
        format!(" {key}:{desc} "),
        Style::default().fg(ratatui::style::Color::DarkGray),
    )
}
