pub mod chat_panel;
pub mod command_bar;
pub mod detail_panel;
pub mod footer;
pub mod item_list;
pub mod review_panel;
pub mod rows_table;
pub mod theme;

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::app::tabs::{StoryFocus, Tab};
use crate::app::App;

pub fn render(f: &mut Frame, app: &App) {
    let size = f.area();

    // Command bar (3) when input active, else footer (1)
    let bottom_height = if app.input_active { 3 } else { 1 };

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),             // tab bar
            Constraint::Min(6),                // main content
            Constraint::Length(bottom_height), // footer or command bar
        ])
        .split(size);

    render_tab_bar(f, vertical[0], app);

    match app.tab {
        Tab::Tasks => render_tasks(f, vertical[1], app),
        Tab::Stories => render_stories(f, vertical[1], app),
    }

    if app.input_active {
        command_bar::render(f, vertical[2], app);
    } else {
        footer::render(f, vertical[2], app);
    }
}

fn render_tab_bar(f: &mut Frame, area: Rect, app: &App) {
    let mut spans = vec![Span::styled(
        " ado-assist ",
        Style::default().add_modifier(Modifier::BOLD),
    )];
    for tab in [Tab::Tasks, Tab::Stories] {
        let style = if tab == app.tab {
            Style::default()
                .fg(ratatui::style::Color::Black)
                .bg(theme::ACCENT)
        } else {
            Style::default().fg(theme::MUTED)
        };
        spans.push(Span::raw(" "));
        spans.push(Span::styled(format!(" {} ", tab.title()), style));
    }
    if let Some(label) = &app.busy {
        spans.push(Span::styled(
            format!("  {label}..."),
            Style::default()
                .fg(ratatui::style::Color::Yellow)
                .add_modifier(Modifier::ITALIC),
        ));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_tasks(f: &mut Frame, area: Rect, app: &App) {
    let tab = &app.tasks;
    // Story (35%) + Tasks (65%)
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
        .split(area);
    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(horizontal[0]);
    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(6), Constraint::Length(9)])
        .split(horizontal[1]);

    detail_panel::render(f, left[0], tab.story.as_ref(), " Story ");
    item_list::render(f, left[1], &tab.existing, None, " Existing Tasks ");
    rows_table::render(
        f,
        right[0],
        &tab.rows,
        rows_table::RowKind::Task,
        Some(tab.selected),
        &format!(" Generated Tasks ({:.1}h) ", tab.total_hours()),
    );
    review_panel::render_tasks(f, right[1], tab);
}

fn render_stories(f: &mut Frame, area: Rect, app: &App) {
    let tab = &app.stories;
    // Feature (40%) + Planning (60%)
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(area);
    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(horizontal[0]);

    let show_chat = !tab.conversation.is_empty();
    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(40),
            Constraint::Min(6),
            Constraint::Length(if show_chat { 8 } else { 0 }),
        ])
        .split(horizontal[1]);

    detail_panel::render(f, left[0], tab.feature.as_ref(), " Feature ");
    let child_cursor = (tab.focus == StoryFocus::Children).then_some(tab.selected_child);
    item_list::render(f, left[1], &tab.children, child_cursor, " Stories (backlog order) ");

    let row_cursor = (tab.focus == StoryFocus::Suggestions).then_some(tab.selected_row);
    rows_table::render(
        f,
        right[0],
        &tab.rows,
        rows_table::RowKind::Story,
        row_cursor,
        " Suggested Stories ",
    );
    review_panel::render_stories(f, right[1], tab);
    if show_chat {
        chat_panel::render(f, right[2], &tab.conversation);
    }
}
