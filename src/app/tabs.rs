use crate::ado::IterationNode;
use crate::llm::schema::{check_task_plan, FeatureDetails, PlanReview, PlanViolation};
use crate::model::chat::ChatTurn;
use crate::model::generated::GeneratedItem;
use crate::model::work_item::WorkItemRecord;
use crate::sync::BatchReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Tasks,
    Stories,
}

impl Tab {
    pub fn title(self) -> &'static str {
        match self {
            Tab::Tasks => "Story → Tasks",
            Tab::Stories => "Feature → Stories",
        }
    }

    pub fn other(self) -> Self {
        match self {
            Tab::Tasks => Tab::Stories,
            Tab::Stories => Tab::Tasks,
        }
    }
}

/// Break a story into tasks, edit them, upload them.
#[derive(Debug, Clone)]
pub struct TaskTab {
    pub story: Option<WorkItemRecord>,
    pub existing: Vec<WorkItemRecord>,
    pub rows: Vec<GeneratedItem>,
    pub selected: usize,
    pub violations: Vec<PlanViolation>,
    pub dry_run: bool,
    pub report: Option<BatchReport>,
}

impl Default for TaskTab {
    fn default() -> Self {
        Self {
            story: None,
            existing: Vec::new(),
            rows: Vec::new(),
            selected: 0,
            violations: Vec::new(),
            dry_run: true,
            report: None,
        }
    }
}

impl TaskTab {
    pub fn load(&mut self, story: WorkItemRecord, existing: Vec<WorkItemRecord>) {
        *self = Self {
            story: Some(story),
            existing,
            dry_run: self.dry_run,
            ..Self::default()
        };
    }

    pub fn set_rows(&mut self, rows: Vec<GeneratedItem>) {
        self.rows = rows;
        self.selected = 0;
        self.revalidate();
    }

    /// Re-run the hour rules after any edit.
    pub fn revalidate(&mut self) {
        self.violations = match &self.story {
            Some(story) if !self.rows.is_empty() => check_task_plan(story.story_points, &self.rows),
            _ => Vec::new(),
        };
    }

    pub fn total_hours(&self) -> f64 {
        self.rows.iter().map(GeneratedItem::estimate).sum()
    }
}

/// Which list of the story tab has the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoryFocus {
    Children,
    Suggestions,
}

/// Plan a feature: suggest, review, describe, extract, replicate and rank its stories.
#[derive(Debug, Clone)]
pub struct StoryTab {
    pub feature: Option<WorkItemRecord>,
    pub children: Vec<WorkItemRecord>,
    pub rows: Vec<GeneratedItem>,
    pub focus: StoryFocus,
    pub selected_child: usize,
    pub selected_row: usize,
    pub review: Option<PlanReview>,
    pub details: Option<FeatureDetails>,
    pub conversation: Vec<ChatTurn>,
    pub sprints: Vec<IterationNode>,
    pub dry_run: bool,
    pub report: Option<BatchReport>,
}

impl Default for StoryTab {
    fn default() -> Self {
        Self {
            feature: None,
            children: Vec::new(),
            rows: Vec::new(),
            focus: StoryFocus::Children,
            selected_child: 0,
            selected_row: 0,
            review: None,
            details: None,
            conversation: Vec::new(),
            sprints: Vec::new(),
            dry_run: true,
            report: None,
        }
    }
}

impl StoryTab {
    /// A new feature keeps the conversation and sprint list; everything derived
    /// from the previous feature is dropped.
    pub fn load(&mut self, feature: WorkItemRecord, children: Vec<WorkItemRecord>) {
        let conversation = std::mem::take(&mut self.conversation);
        let sprints = std::mem::take(&mut self.sprints);
        *self = Self {
            feature: Some(feature),
            children,
            conversation,
            sprints,
            dry_run: self.dry_run,
            ..Self::default()
        };
    }

    pub fn set_rows(&mut self, rows: Vec<GeneratedItem>) {
        self.rows = rows;
        self.selected_row = 0;
        if !self.rows.is_empty() {
            self.focus = StoryFocus::Suggestions;
        }
    }

    pub fn current_child(&self) -> Option<&WorkItemRecord> {
        self.children.get(self.selected_child)
    }

    /// Swap the selected child with its neighbour; ranks are written by `rank`.
    pub fn move_child(&mut self, up: bool) {
        let i = self.selected_child;
        let j = if up {
            match i.checked_sub(1) {
                Some(j) => j,
                None => return,
            }
        } else {
            i + 1
        };
        if j < self.children.len() {
            self.children.swap(i, j);
            self.selected_child = j;
        }
    }
}

/// Clamp a cursor into `0..len`.
pub fn clamp(selected: usize, len: usize) -> usize {
    selected.min(len.saturating_sub(1))
}
