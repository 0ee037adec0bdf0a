use ratatui::style::Color;

use crate::model::work_item::WorkItemType;
use crate::sync::RowOutcome;

pub const ACCENT: Color = Color::Cyan;
pub const MUTED: Color = Color::DarkGray;
pub const LABEL: Color = Color::Gray;

pub fn type_color(kind: &WorkItemType) -> Color {
    match kind {
        WorkItemType::Task => Color::Rgb(0xF2, 0xCB, 0x1D),
        WorkItemType::UserStory => Color::Rgb(0x00, 0x98, 0xC7),
        WorkItemType::Feature => Color::Rgb(0x77, 0x3B, 0x93),
        WorkItemType::Bug => Color::Rgb(0xCC, 0x29, 0x3D),
        WorkItemType::Epic => Color::Rgb(0xFF, 0x7B, 0x00),
        WorkItemType::Other(_) => Color::Gray,
    }
}

pub fn state_color(state: &str) -> Color {
    match state {
        "New" => Color::Gray,
        "Active" | "In Progress" => Color::Blue,
        "Resolved" => Color::Cyan,
        "Closed" | "Done" => Color::Green,
        "Removed" => Color::DarkGray,
        _ => Color::White,
    }
}

pub fn outcome_color(outcome: &RowOutcome) -> Color {
    match outcome {
        RowOutcome::Written(_) => Color::Green,
        RowOutcome::DryRun => Color::Cyan,
        RowOutcome::Failed(_) => Color::Red,
        RowOutcome::NotAttempted => Color::DarkGray,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failures_stand_out() {
        assert_eq!(outcome_color(&RowOutcome::Failed("x".into())), Color::Red);
        assert_ne!(outcome_color(&RowOutcome::DryRun), Color::Red);
        assert_eq!(type_color(&WorkItemType::Other("Risk".into())), Color::Gray);
    }
}
