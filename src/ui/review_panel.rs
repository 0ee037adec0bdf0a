use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::app::tabs::{StoryTab, TaskTab};
use crate::sync::{BatchReport, BatchState, RowOutcome};
use crate::ui::theme::{outcome_color, ACCENT, LABEL};
use crate::util::html::to_plain_text;

pub fn render_tasks(f: &mut Frame, area: Rect, tab: &TaskTab) {
    let mut lines = Vec::new();

    if let Some(story) = &tab.story {
        lines.push(Line::styled(
            format!(
                "Budget: {} points x 6 = {}h, planned {:.1}h",
                story.story_points,
                story.story_points * 6.0,
                tab.total_hours()
            ),
            Style::default().fg(LABEL),
        ));
    }
    if tab.violations.is_empty() {
        if !tab.rows.is_empty() {
            lines.push(Line::styled(
                "✓ Task plan follows the hour rules",
                Style::default().fg(ratatui::style::Color::Green),
            ));
        }
    } else {
        for v in &tab.violations {
            lines.push(Line::styled(
                format!("✗ {v}"),
                Style::default().fg(ratatui::style::Color::Red),
            ));
        }
    }
    push_report(&mut lines, tab.report.as_ref());

    render_block(f, area, lines, &title(" Checks ", tab.dry_run));
}

pub fn render_stories(f: &mut Frame, area: Rect, tab: &StoryTab) {
    let mut lines = Vec::new();

    if let Some(review) = &tab.review {
        heading(&mut lines, "Plan review");
        bullets(&mut lines, &review.suggestions);
        if !review.missing_steps.is_empty() {
            lines.push(Line::styled("Missing steps:", Style::default().fg(LABEL)));
            bullets(&mut lines, &review.missing_steps);
        }
        if !review.external_dependencies.is_empty() {
            lines.push(Line::styled("External dependencies:", Style::default().fg(LABEL)));
            bullets(&mut lines, &review.external_dependencies);
        }
        if !review.iteration_analysis.is_empty() {
            lines.push(Line::styled("Iterations:", Style::default().fg(LABEL)));
            lines.push(Line::raw(review.iteration_analysis.clone()));
        }
    }

    if let Some(details) = &tab.details {
        heading(&mut lines, "Feature details (a: apply)");
        for (label, html) in [
            ("Description", &details.description),
            ("External dependencies", &details.external_dependencies),
            ("Non-functional requirements", &details.non_functional_requirements),
            ("Acceptance criteria", &details.acceptance_criteria),
        ] {
            let text = to_plain_text(html);
            if text.is_empty() {
                continue;
            }
            lines.push(Line::styled(format!("{label}:"), Style::default().fg(LABEL)));
            lines.extend(text.lines().map(|l| Line::raw(format!("  {l}"))));
        }
    }

    if !tab.sprints.is_empty() {
        heading(&mut lines, "Target sprints (:replicate)");
        let names: Vec<&str> = tab.sprints.iter().map(|s| s.name.as_str()).collect();
        lines.push(Line::raw(names.join(", ")));
    }

    push_report(&mut lines, tab.report.as_ref());

    render_block(f, area, lines, &title(" Plan ", tab.dry_run));
}

fn title(name: &str, dry_run: bool) -> String {
    if dry_run {
        format!("{name}[dry run] ")
    } else {
        format!("{name}[live] ")
    }
}

fn heading(lines: &mut Vec<Line<'static>>, text: &str) {
    if !lines.is_empty() {
        lines.push(Line::raw(""));
    }
    lines.push(Line::styled(
        text.to_string(),
        Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
    ));
}

fn bullets(lines: &mut Vec<Line<'static>>, items: &[String]) {
    lines.extend(items.iter().map(|s| Line::raw(format!("• {s}"))));
}

fn push_report(lines: &mut Vec<Line<'static>>, report: Option<&BatchReport>) {
    let Some(report) = report else {
        return;
    };
    let when = report
        .finished_at
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_default();
    let status = match report.state() {
        BatchState::Running => "running".to_string(),
        BatchState::Completed { with_errors: false } => format!("completed {when}"),
        BatchState::Completed { with_errors: true } => format!("completed with errors {when}"),
    };
    heading(lines, &format!("Last batch: {status}"));
    lines.push(Line::raw(report.summary()));
    for row in &report.rows {
        let detail = match &row.outcome {
            RowOutcome::Written(id) => format!("#{id}"),
            RowOutcome::DryRun => "dry run".to_string(),
            RowOutcome::Failed(msg) => msg.clone(),
            RowOutcome::NotAttempted => "not attempted".to_string(),
        };
        lines.push(Line::from(vec![
            Span::styled("● ", Style::default().fg(outcome_color(&row.outcome))),
            Span::raw(format!("{}: {detail}", row.label)),
        ]));
    }
}

fn render_block(f: &mut Frame, area: Rect, lines: Vec<Line<'static>>, title: &str) {
    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(ratatui::style::Color::Magenta))
                .title(title.to_string()),
        )
        .wrap(Wrap { trim: false });
    f.render_widget(paragraph, area);
}
