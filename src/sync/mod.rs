use chrono::{DateTime, Local};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::ado::WorkItemGateway;
use crate::error::GatewayResult;
use crate::llm::schema::{check_task_plan, FeatureDetails, PlanViolation};
use crate::model::fields;
use crate::model::generated::GeneratedItem;
use crate::model::work_item::{WorkItemRecord, WorkItemType};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchOptions {
    /// Walk the rows without writing anything remote.
    pub dry_run: bool,
    /// Pause between remote writes.
    pub delay: Duration,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            dry_run: true,
            delay: Duration::from_millis(300),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    Written(u64),
    DryRun,
    Failed(String),
    NotAttempted,
}

impl RowOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RowOutcome::Written(_) | RowOutcome::DryRun)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowResult {
    pub label: String,
    pub outcome: RowOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    Running,
    Completed { with_errors: bool },
}

/// Per-row results of one batch, in row order.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    pub rows: Vec<RowResult>,
    /// Set when an auth failure stopped the batch early.
    pub aborted: bool,
    pub finished_at: Option<DateTime<Local>>,
}

impl BatchReport {
    fn new() -> Self {
        Self {
            rows: Vec::new(),
            aborted: false,
            finished_at: None,
        }
    }

    pub fn state(&self) -> BatchState {
        match self.finished_at {
            None => BatchState::Running,
            Some(_) => BatchState::Completed {
                with_errors: self.aborted || !self.errors().is_empty(),
            },
        }
    }

    pub fn successes(&self) -> usize {
        self.rows.iter().filter(|r| r.outcome.is_success()).count()
    }

    pub fn errors(&self) -> Vec<String> {
        self.rows
            .iter()
            .filter_map(|r| match &r.outcome {
                RowOutcome::Failed(msg) => Some(format!("{}: {msg}", r.label)),
                _ => None,
            })
            .collect()
    }

    pub fn not_attempted(&self) -> usize {
        self.rows
            .iter()
            .filter(|r| r.outcome == RowOutcome::NotAttempted)
            .count()
    }

    pub fn written_ids(&self) -> Vec<u64> {
        self.rows
            .iter()
            .filter_map(|r| match r.outcome {
                RowOutcome::Written(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn summary(&self) -> String {
        let mut text = format!(
            "{} succeeded, {} failed",
            self.successes(),
            self.errors().len()
        );
        if self.aborted {
            text.push_str(&format!(
                ", {} not attempted (authentication failed)",
                self.not_attempted()
            ));
        }
        if self.rows.iter().any(|r| r.outcome == RowOutcome::DryRun) {
            text.push_str(" (dry run)");
        }
        text
    }
}

/// Drives one batch: continue past row failures, stop at the first auth
/// failure, pace the writes.
struct BatchRun {
    options: BatchOptions,
    report: BatchReport,
    writes: usize,
}

impl BatchRun {
    fn new(options: BatchOptions) -> Self {
        Self {
            options,
            report: BatchReport::new(),
            writes: 0,
        }
    }

    /// Whether the row should be written. Rows after an abort are recorded as
    /// not attempted; dry-run rows are recorded as successes.
    async fn begin(&mut self, label: &str) -> bool {
        if self.report.aborted {
            self.push(label, RowOutcome::NotAttempted);
            return false;
        }
        if self.options.dry_run {
            debug!(row = label, "dry run");
            self.push(label, RowOutcome::DryRun);
            return false;
        }
        if self.writes > 0 && !self.options.delay.is_zero() {
            tokio::time::sleep(self.options.delay).await;
        }
        self.writes += 1;
        debug!(row = label, "in flight");
        true
    }

    fn finish_row(&mut self, label: &str, result: GatewayResult<u64>) {
        match result {
            Ok(id) => self.push(label, RowOutcome::Written(id)),
            Err(e) => {
                warn!(row = label, error = %e, "row failed");
                if e.is_auth() {
                    self.report.aborted = true;
                }
                self.push(label, RowOutcome::Failed(e.to_string()));
            }
        }
    }

    fn push(&mut self, label: &str, outcome: RowOutcome) {
        self.report.rows.push(RowResult {
            label: label.to_string(),
            outcome,
        });
    }

    fn finish(mut self) -> BatchReport {
        self.report.finished_at = Some(Local::now());
        info!(
            rows = self.report.rows.len(),
            ok = self.report.successes(),
            aborted = self.report.aborted,
            "batch finished"
        );
        self.report
    }
}

fn row_label(row: &GeneratedItem) -> String {
    if row.title.trim().is_empty() {
        "(untitled)".to_string()
    } else {
        row.title.clone()
    }
}

/// Create one child of `parent` per row, each filled with the defaults its type needs.
pub async fn create_children(
    gateway: &dyn WorkItemGateway,
    parent: &WorkItemRecord,
    rows: &[GeneratedItem],
    kind: &WorkItemType,
    options: BatchOptions,
) -> BatchReport {
    let mut run = BatchRun::new(options);
    for row in rows {
        let label = row_label(row);
        if !run.begin(&label).await {
            continue;
        }
        let prepared = row.with_defaults(kind);
        let result = gateway
            .create_child(parent, &prepared, kind)
            .await
            .map(|created| created.id);
        run.finish_row(&label, result);
    }
    run.finish()
}

#[derive(Debug, Error)]
#[error("task plan breaks the hour rules: {}", list_violations(.0))]
pub struct UploadRefused(pub Vec<PlanViolation>);

fn list_violations(violations: &[PlanViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Create task rows under a story. Refused while the rows break the task-plan
/// rules unless `force` is set.
pub async fn upload_tasks(
    gateway: &dyn WorkItemGateway,
    story: &WorkItemRecord,
    rows: &[GeneratedItem],
    force: bool,
    options: BatchOptions,
) -> Result<BatchReport, UploadRefused> {
    let violations = check_task_plan(story.story_points, rows);
    if !violations.is_empty() && !force {
        return Err(UploadRefused(violations));
    }
    Ok(create_children(gateway, story, rows, &WorkItemType::Task, options).await)
}

/// One copy of `template` under `parent` for every sprint path.
pub async fn replicate_into_sprints(
    gateway: &dyn WorkItemGateway,
    parent: &WorkItemRecord,
    template: &GeneratedItem,
    kind: &WorkItemType,
    sprints: &[String],
    options: BatchOptions,
) -> BatchReport {
    let mut run = BatchRun::new(options);
    for sprint in sprints {
        let label = format!("{} -> {sprint}", row_label(template));
        if !run.begin(&label).await {
            continue;
        }
        let copy = template.retargeted(sprint).with_defaults(kind);
        let result = gateway
            .create_child(parent, &copy, kind)
            .await
            .map(|created| created.id);
        run.finish_row(&label, result);
    }
    run.finish()
}

pub fn feature_detail_updates(details: &FeatureDetails) -> BTreeMap<String, Value> {
    let mut updates = BTreeMap::new();
    updates.insert(fields::DESCRIPTION.to_string(), json!(details.description));
    updates.insert(
        fields::EXTERNAL_DEPENDENCIES.to_string(),
        json!(details.external_dependencies),
    );
    updates.insert(
        fields::NON_FUNCTIONAL_REQUIREMENTS.to_string(),
        json!(details.non_functional_requirements),
    );
    updates.insert(
        fields::ACCEPTANCE_CRITERIA.to_string(),
        json!(details.acceptance_criteria),
    );
    updates
}

pub async fn apply_feature_details(
    gateway: &dyn WorkItemGateway,
    feature: &WorkItemRecord,
    details: &FeatureDetails,
    options: BatchOptions,
) -> BatchReport {
    let mut run = BatchRun::new(options);
    let label = format!("#{} {}", feature.id, feature.title);
    if run.begin(&label).await {
        let result = gateway
            .update_fields(feature.id, &feature_detail_updates(details))
            .await
            .map(|updated| updated.id);
        run.finish_row(&label, result);
    }
    run.finish()
}

/// Write ranks 1..N in the given order, each to the field its record was read from.
pub async fn rerank(
    gateway: &dyn WorkItemGateway,
    ordered: &[WorkItemRecord],
    options: BatchOptions,
) -> BatchReport {
    let mut run = BatchRun::new(options);
    for (index, record) in ordered.iter().enumerate() {
        let label = format!("#{} {}", record.id, record.title);
        if !run.begin(&label).await {
            continue;
        }
        let result = gateway
            .update_rank(record, (index + 1) as f64)
            .await
            .map(|updated| updated.id);
        run.finish_row(&label, result);
    }
    run.finish()
}
