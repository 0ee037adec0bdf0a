pub mod command;
pub mod tabs;

use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Result};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::ado::WorkItemGateway;
use crate::config::AppConfig;
use crate::event::KeyAction;
use crate::llm::Assistant;
use crate::model::chat::parse_transcript;
use crate::model::generated::GeneratedItem;
use crate::model::work_item::{WorkItemRecord, WorkItemType};
use crate::sync::{self, BatchOptions, BatchReport, RowOutcome};
use command::{parse_command, Command};
use tabs::{clamp, StoryFocus, StoryTab, Tab, TaskTab};

/// Remote work started from the dashboard. Jobs are queued through the action
/// channel so the busy indicator is drawn before the call blocks the loop.
#[derive(Debug, Clone, PartialEq)]
pub enum Job {
    Load(Tab, u64),
    Generate(Tab),
    Review,
    Details,
    ApplyDetails,
    Extract,
    Upload { tab: Tab, force: bool },
    Sprints(String),
    Replicate,
    Rank,
}

impl Job {
    fn label(&self) -> String {
        match self {
            Job::Load(_, id) => format!("Loading #{id}"),
            Job::Generate(Tab::Tasks) => "Generating tasks".into(),
            Job::Generate(Tab::Stories) => "Suggesting stories".into(),
            Job::Review => "Reviewing plan".into(),
            Job::Details => "Writing feature details".into(),
            Job::ApplyDetails => "Applying feature details".into(),
            Job::Extract => "Extracting stories from conversation".into(),
            Job::Upload { tab: Tab::Tasks, .. } => "Creating tasks".into(),
            Job::Upload { tab: Tab::Stories, .. } => "Creating stories".into(),
            Job::Sprints(path) => format!("Listing sprints under {path}"),
            Job::Replicate => "Replicating story".into(),
            Job::Rank => "Writing ranks".into(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Action {
    Key(KeyAction),
    Tick,
    Run(Job),
    Quit,
}

pub struct App {
    pub tab: Tab,
    pub tasks: TaskTab,
    pub stories: StoryTab,
    pub input_active: bool,
    pub input_buffer: String,
    pub input_cursor: usize,
    pub flash_message: Option<(String, Instant)>,
    pub busy: Option<String>,
    pub should_quit: bool,
    pub action_tx: mpsc::UnboundedSender<Action>,
    gateway: Box<dyn WorkItemGateway>,
    assistant: Assistant,
    delay: Duration,
}

const FLASH_SECS: u64 = 5;

impl App {
    pub fn new(
        config: &AppConfig,
        gateway: Box<dyn WorkItemGateway>,
        assistant: Assistant,
        action_tx: mpsc::UnboundedSender<Action>,
    ) -> Self {
        Self {
            tab: Tab::Tasks,
            tasks: TaskTab::default(),
            stories: StoryTab::default(),
            input_active: false,
            input_buffer: String::new(),
            input_cursor: 0,
            flash_message: None,
            busy: None,
            should_quit: false,
            action_tx,
            gateway,
            assistant,
            delay: config.batch.delay(),
        }
    }

    pub async fn update(&mut self, action: Action) {
        if let Some((_, t)) = &self.flash_message {
            if t.elapsed().as_secs() >= FLASH_SECS {
                self.flash_message = None;
            }
        }

        match action {
            Action::Key(key) if self.input_active => self.handle_input_key(key),
            Action::Key(key) => self.handle_key(key),
            Action::Tick => {}
            Action::Run(job) => {
                info!(?job, "running");
                let result = self.run(job).await;
                self.busy = None;
                match result {
                    Ok(msg) => self.flash(msg),
                    Err(e) => {
                        warn!(error = %e, "action failed");
                        self.flash(format!("Error: {e}"));
                    }
                }
            }
            Action::Quit => {
                self.should_quit = true;
            }
        }
    }

    fn flash(&mut self, msg: impl Into<String>) {
        self.flash_message = Some((msg.into(), Instant::now()));
    }

    /// Queue a job unless one is already running.
    fn start(&mut self, job: Job) {
        if let Some(current) = &self.busy {
            self.flash(format!("Busy: {current}"));
            return;
        }
        self.busy = Some(job.label());
        if self.action_tx.send(Action::Run(job)).is_err() {
            self.busy = None;
        }
    }

    fn handle_key(&mut self, key: KeyAction) {
        match key {
            KeyAction::Char(':') => {
                self.input_active = true;
                self.input_buffer.clear();
                self.input_cursor = 0;
            }
            KeyAction::Char('q') => self.should_quit = true,
            KeyAction::Tab => self.tab = self.tab.other(),
            KeyAction::Up => self.move_cursor(false),
            KeyAction::Down => self.move_cursor(true),
            KeyAction::Left | KeyAction::Right if self.tab == Tab::Stories => {
                self.stories.focus = match self.stories.focus {
                    StoryFocus::Children => StoryFocus::Suggestions,
                    StoryFocus::Suggestions => StoryFocus::Children,
                };
            }
            KeyAction::MoveUp => self.move_row(true),
            KeyAction::MoveDown => self.move_row(false),
            KeyAction::Escape => self.flash_message = None,
            KeyAction::Char('g') => self.start(Job::Generate(self.tab)),
            KeyAction::Char('u') => self.start(Job::Upload {
                tab: self.tab,
                force: false,
            }),
            KeyAction::Char('U') => self.start(Job::Upload {
                tab: self.tab,
                force: true,
            }),
            KeyAction::Char('t') => self.toggle_dry_run(),
            KeyAction::Char('d') => self.delete_row(),
            KeyAction::Char('r') => match self.current_item_id() {
                Some(id) => self.start(Job::Load(self.tab, id)),
                None => self.flash("Nothing loaded yet (:load <id>)"),
            },
            KeyAction::Char('v') if self.tab == Tab::Stories => self.start(Job::Review),
            KeyAction::Char('f') if self.tab == Tab::Stories => self.start(Job::Details),
            KeyAction::Char('a') if self.tab == Tab::Stories => self.start(Job::ApplyDetails),
            KeyAction::Char('e') if self.tab == Tab::Stories => self.start(Job::Extract),
            _ => {}
        }
    }

    fn handle_input_key(&mut self, key: KeyAction) {
        match key {
            KeyAction::Escape => {
                self.input_active = false;
                self.input_buffer.clear();
            }
            KeyAction::Enter => {
                self.input_active = false;
                let line = std::mem::take(&mut self.input_buffer);
                match parse_command(&line) {
                    Ok(cmd) => self.apply_command(cmd),
                    Err(msg) => self.flash(msg),
                }
            }
            KeyAction::Char(c) => {
                let at = byte_index(&self.input_buffer, self.input_cursor);
                self.input_buffer.insert(at, c);
                self.input_cursor += 1;
            }
            KeyAction::Backspace if self.input_cursor > 0 => {
                self.input_cursor -= 1;
                let at = byte_index(&self.input_buffer, self.input_cursor);
                self.input_buffer.remove(at);
            }
            KeyAction::Left => self.input_cursor = self.input_cursor.saturating_sub(1),
            KeyAction::Right => {
                self.input_cursor = (self.input_cursor + 1).min(self.input_buffer.chars().count())
            }
            _ => {}
        }
    }

    fn apply_command(&mut self, cmd: Command) {
        match cmd {
            Command::Load(id) => self.start(Job::Load(self.tab, id)),
            Command::Set { column, value } => {
                let result = match self.selected_row_mut() {
                    Some(row) => column.apply(row, &value),
                    None => Err("no row selected".into()),
                };
                match result {
                    Ok(()) => {
                        self.tasks.revalidate();
                        self.flash(format!("{} updated", column.name()));
                    }
                    Err(msg) => self.flash(msg),
                }
            }
            Command::Add(title) => match self.tab {
                Tab::Tasks => {
                    self.tasks.rows.push(GeneratedItem::new(title));
                    self.tasks.selected = self.tasks.rows.len() - 1;
                    self.tasks.revalidate();
                }
                Tab::Stories => {
                    self.stories.rows.push(GeneratedItem::new(title));
                    self.stories.selected_row = self.stories.rows.len() - 1;
                    self.stories.focus = StoryFocus::Suggestions;
                }
            },
            Command::Delete => self.delete_row(),
            Command::Say(text) => {
                let turns = parse_transcript(&text);
                self.flash(format!("{} turn(s) added to the conversation", turns.len()));
                self.stories.conversation.extend(turns);
            }
            Command::Sprints(path) => self.start(Job::Sprints(path)),
            Command::Replicate => self.start(Job::Replicate),
            Command::Rank => self.start(Job::Rank),
        }
    }

    fn current_item_id(&self) -> Option<u64> {
        match self.tab {
            Tab::Tasks => self.tasks.story.as_ref().map(|s| s.id),
            Tab::Stories => self.stories.feature.as_ref().map(|f| f.id),
        }
    }

    fn selected_row_mut(&mut self) -> Option<&mut GeneratedItem> {
        match self.tab {
            Tab::Tasks => self.tasks.rows.get_mut(self.tasks.selected),
            Tab::Stories if self.stories.focus == StoryFocus::Suggestions => {
                self.stories.rows.get_mut(self.stories.selected_row)
            }
            Tab::Stories => None,
        }
    }

    fn move_cursor(&mut self, down: bool) {
        let step = |i: usize, len: usize| {
            if down {
                clamp(i + 1, len)
            } else {
                i.saturating_sub(1)
            }
        };
        match (self.tab, self.stories.focus) {
            (Tab::Tasks, _) => self.tasks.selected = step(self.tasks.selected, self.tasks.rows.len()),
            (Tab::Stories, StoryFocus::Children) => {
                self.stories.selected_child =
                    step(self.stories.selected_child, self.stories.children.len())
            }
            (Tab::Stories, StoryFocus::Suggestions) => {
                self.stories.selected_row = step(self.stories.selected_row, self.stories.rows.len())
            }
        }
    }

    fn move_row(&mut self, up: bool) {
        match (self.tab, self.stories.focus) {
            (Tab::Stories, StoryFocus::Children) => self.stories.move_child(up),
            (Tab::Tasks, _) => {
                let i = self.tasks.selected;
                let j = if up { i.checked_sub(1) } else { Some(i + 1) };
                if let Some(j) = j.filter(|j| *j < self.tasks.rows.len()) {
                    self.tasks.rows.swap(i, j);
                    self.tasks.selected = j;
                }
            }
            _ => {}
        }
    }

    fn delete_row(&mut self) {
        match self.tab {
            Tab::Tasks if self.tasks.selected < self.tasks.rows.len() => {
                self.tasks.rows.remove(self.tasks.selected);
                self.tasks.selected = clamp(self.tasks.selected, self.tasks.rows.len());
                self.tasks.revalidate();
            }
            Tab::Stories
                if self.stories.focus == StoryFocus::Suggestions
                    && self.stories.selected_row < self.stories.rows.len() =>
            {
                self.stories.rows.remove(self.stories.selected_row);
                self.stories.selected_row =
                    clamp(self.stories.selected_row, self.stories.rows.len());
            }
            _ => self.flash("No generated row selected"),
        }
    }

    fn toggle_dry_run(&mut self) {
        let dry_run = match self.tab {
            Tab::Tasks => {
                self.tasks.dry_run = !self.tasks.dry_run;
                self.tasks.dry_run
            }
            Tab::Stories => {
                self.stories.dry_run = !self.stories.dry_run;
                self.stories.dry_run
            }
        };
        self.flash(if dry_run {
            "Dry run: ON (nothing is written)"
        } else {
            "Dry run: OFF (writes go to Azure DevOps)"
        });
    }

    fn options(&self, dry_run: bool) -> BatchOptions {
        BatchOptions {
            dry_run,
            delay: self.delay,
        }
    }

    async fn run(&mut self, job: Job) -> Result<String> {
        match job {
            Job::Load(Tab::Tasks, id) => {
                let story = self.gateway.fetch_one(id).await?;
                let existing = self
                    .gateway
                    .fetch_children(&story, Some(&WorkItemType::Task))
                    .await?;
                let msg = format!(
                    "Loaded {} #{}: {} ({} existing tasks)",
                    story.work_item_type,
                    story.id,
                    story.title,
                    existing.len()
                );
                self.tasks.load(story, existing);
                Ok(msg)
            }
            Job::Load(Tab::Stories, id) => {
                let feature = self.gateway.fetch_one(id).await?;
                let children = self.load_stories(&feature).await?;
                let msg = format!(
                    "Loaded {} #{}: {} ({} stories)",
                    feature.work_item_type,
                    feature.id,
                    feature.title,
                    children.len()
                );
                self.stories.load(feature, children);
                Ok(msg)
            }
            Job::Generate(Tab::Tasks) => {
                let story = self.tasks.story.as_ref().ok_or_else(no_story)?;
                let proposal = self.assistant.generate_tasks(story).await?;
                let count = proposal.tasks.len();
                self.tasks.set_rows(proposal.tasks);
                Ok(match self.tasks.violations.len() {
                    0 => format!("{count} tasks generated"),
                    n => format!("{count} tasks generated, {n} rule violation(s) to fix"),
                })
            }
            Job::Generate(Tab::Stories) => {
                let feature = self.stories.feature.as_ref().ok_or_else(no_feature)?;
                let rows = self
                    .assistant
                    .suggest_stories(feature, &self.stories.children)
                    .await?;
                let count = rows.len();
                self.stories.set_rows(rows);
                Ok(format!("{count} stories suggested"))
            }
            Job::Review => {
                let feature = self.stories.feature.as_ref().ok_or_else(no_feature)?;
                let review = self
                    .assistant
                    .review_plan(feature, &self.stories.children)
                    .await?;
                let count = review.suggestions.len();
                self.stories.review = Some(review);
                Ok(format!("Plan reviewed: {count} suggestion(s)"))
            }
            Job::Details => {
                let feature = self.stories.feature.as_ref().ok_or_else(no_feature)?;
                let details = self
                    .assistant
                    .generate_feature_details(feature, &self.stories.children)
                    .await?;
                self.stories.details = Some(details);
                Ok("Feature details drafted; press a to apply".into())
            }
            Job::ApplyDetails => {
                let feature = self.stories.feature.as_ref().ok_or_else(no_feature)?;
                let details = self
                    .stories
                    .details
                    .as_ref()
                    .ok_or_else(|| anyhow!("Draft feature details first (f)"))?;
                let options = self.options(self.stories.dry_run);
                let report =
                    sync::apply_feature_details(self.gateway.as_ref(), feature, details, options)
                        .await;
                let msg = format!("Feature details: {}", report.summary());
                self.stories.report = Some(report);
                Ok(msg)
            }
            Job::Extract => {
                if self.stories.conversation.is_empty() {
                    bail!("The conversation is empty; add turns with :say <text>");
                }
                let rows = self
                    .assistant
                    .extract_stories_from_chat(&self.stories.conversation)
                    .await?;
                let count = rows.len();
                self.stories.set_rows(rows);
                Ok(format!("{count} stories extracted from the conversation"))
            }
            Job::Upload {
                tab: Tab::Tasks,
                force,
            } => {
                let story = self.tasks.story.as_ref().ok_or_else(no_story)?;
                if self.tasks.rows.is_empty() {
                    bail!("No task rows to upload");
                }
                let options = self.options(self.tasks.dry_run);
                let report =
                    sync::upload_tasks(self.gateway.as_ref(), story, &self.tasks.rows, force, options)
                        .await?;
                let msg = format!("Tasks: {}", report.summary());
                let story = story.clone();
                let refresh = needs_refresh(&report);
                self.tasks.report = Some(report);
                if refresh {
                    match self
                        .gateway
                        .fetch_children(&story, Some(&WorkItemType::Task))
                        .await
                    {
                        Ok(existing) => self.tasks.existing = existing,
                        Err(e) => warn!(error = %e, "task list not refreshed"),
                    }
                }
                Ok(msg)
            }
            Job::Upload {
                tab: Tab::Stories, ..
            } => {
                let feature = self.stories.feature.as_ref().ok_or_else(no_feature)?;
                if self.stories.rows.is_empty() {
                    bail!("No story rows to create");
                }
                let options = self.options(self.stories.dry_run);
                let report = sync::create_children(
                    self.gateway.as_ref(),
                    feature,
                    &self.stories.rows,
                    &WorkItemType::UserStory,
                    options,
                )
                .await;
                let msg = format!("Stories: {}", report.summary());
                let feature = feature.clone();
                self.finish_story_batch(&feature, report).await;
                Ok(msg)
            }
            Job::Sprints(path) => {
                let sprints = self.gateway.list_iteration_children(&path).await?;
                let msg = match sprints.len() {
                    0 => format!("No sprints under {path}"),
                    n => format!("{n} sprints under {path}"),
                };
                self.stories.sprints = sprints;
                Ok(msg)
            }
            Job::Replicate => {
                let feature = self.stories.feature.as_ref().ok_or_else(no_feature)?;
                let child = self
                    .stories
                    .current_child()
                    .ok_or_else(|| anyhow!("Select a story to replicate"))?;
                if self.stories.sprints.is_empty() {
                    bail!("List target sprints first with :sprints <path>");
                }
                let paths: Vec<String> = self.stories.sprints.iter().map(|s| s.path.clone()).collect();
                let template = GeneratedItem::from_record(child);
                let options = self.options(self.stories.dry_run);
                let report = sync::replicate_into_sprints(
                    self.gateway.as_ref(),
                    feature,
                    &template,
                    &child.work_item_type,
                    &paths,
                    options,
                )
                .await;
                let msg = format!("Replicated #{}: {}", child.id, report.summary());
                let feature = feature.clone();
                self.finish_story_batch(&feature, report).await;
                Ok(msg)
            }
            Job::Rank => {
                if self.stories.children.is_empty() {
                    bail!("No stories to rank");
                }
                let options = self.options(self.stories.dry_run);
                let report =
                    sync::rerank(self.gateway.as_ref(), &self.stories.children, options).await;
                for (position, row) in report.rows.iter().enumerate() {
                    if matches!(row.outcome, RowOutcome::Written(_)) {
                        if let Some(child) = self.stories.children.get_mut(position) {
                            child.rank.value = (position + 1) as f64;
                        }
                    }
                }
                let msg = format!("Ranks: {}", report.summary());
                self.stories.report = Some(report);
                Ok(msg)
            }
        }
    }

    /// Keep the report, then reload the feature's stories if the batch created
    /// any and was not stopped by an auth failure.
    async fn finish_story_batch(&mut self, feature: &WorkItemRecord, report: BatchReport) {
        let refresh = needs_refresh(&report);
        self.stories.report = Some(report);
        if refresh {
            match self.load_stories(feature).await {
                Ok(children) => self.stories.children = children,
                Err(e) => warn!(error = %e, "story list not refreshed"),
            }
        }
    }

    /// Child stories of a feature in backlog order.
    async fn load_stories(&self, feature: &WorkItemRecord) -> Result<Vec<WorkItemRecord>> {
        let mut children = self
            .gateway
            .fetch_children(feature, Some(&WorkItemType::UserStory))
            .await?;
        children.sort_by(|a, b| a.rank.value.total_cmp(&b.rank.value));
        Ok(children)
    }
}

/// No remote call follows a batch that an auth failure stopped.
fn needs_refresh(report: &BatchReport) -> bool {
    !report.aborted && !report.written_ids().is_empty()
}

fn no_story() -> anyhow::Error {
    anyhow!("Load a story first (:load <id>)")
}

fn no_feature() -> anyhow::Error {
    anyhow!("Load a feature first (:load <id>)")
}

fn byte_index(s: &str, chars: usize) -> usize {
    s.char_indices().nth(chars).map_or(s.len(), |(i, _)| i)
}
