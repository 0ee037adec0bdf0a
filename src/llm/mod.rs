pub mod client;
pub mod extract;
#[cfg(test)]
pub mod fake;
pub mod prompts;
pub mod schema;

use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::error::GatewayResult;
use crate::model::chat::ChatTurn;
use crate::model::generated::GeneratedItem;
use crate::model::work_item::WorkItemRecord;
use self::extract::{parse_model_json, parse_shape};
use self::schema::{check_task_plan, FeatureDetails, PlanReview, StoryList, TaskList, TaskProposal};

pub use client::SparkClient;

/// A chat-completions endpoint: turns in, raw reply text out.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn complete(&self, turns: &[ChatTurn]) -> GatewayResult<String>;
}

/// The five generation operations over a chat backend. Each sends a fixed
/// system instruction plus the work items as JSON, then extracts and
/// shape-checks the reply. Nothing is retried.
pub struct Assistant {
    backend: Box<dyn ChatBackend>,
    dump_path: Option<PathBuf>,
}

impl Assistant {
    pub fn new(backend: Box<dyn ChatBackend>) -> Self {
        Self {
            backend,
            dump_path: None,
        }
    }

    /// Also write every parsed reply, pretty-printed, to `path`.
    pub fn with_dump(mut self, path: PathBuf) -> Self {
        self.dump_path = Some(path);
        self
    }

    async fn ask(&self, system: &str, user: String) -> GatewayResult<Value> {
        let turns = [
            ChatTurn::system(prompts::system_prompt(system)),
            ChatTurn::user(user),
        ];
        let raw = self.backend.complete(&turns).await?;
        let value = parse_model_json(&raw)?;
        self.dump(&value);
        Ok(value)
    }

    fn dump(&self, value: &Value) {
        let Some(path) = &self.dump_path else {
            return;
        };
        let written = serde_json::to_string_pretty(value)
            .map_err(std::io::Error::from)
            .and_then(|text| std::fs::write(path, text));
        if let Err(e) = written {
            warn!(path = %path.display(), error = %e, "failed to write response dump");
        }
    }

    pub async fn generate_tasks(&self, story: &WorkItemRecord) -> GatewayResult<TaskProposal> {
        let value = self
            .ask(prompts::GENERATE_TASKS, prompts::tasks_request(story))
            .await?;
        let list: TaskList = parse_shape(value, "an object with a tasks array")?;
        let violations = check_task_plan(story.story_points, &list.tasks);
        info!(
            story = story.id,
            tasks = list.tasks.len(),
            violations = violations.len(),
            "generated tasks"
        );
        Ok(TaskProposal {
            tasks: list.tasks,
            violations,
        })
    }

    pub async fn suggest_stories(
        &self,
        feature: &WorkItemRecord,
        existing: &[WorkItemRecord],
    ) -> GatewayResult<Vec<GeneratedItem>> {
        let value = self
            .ask(
                prompts::SUGGEST_STORIES,
                prompts::feature_request(feature, existing),
            )
            .await?;
        let list: StoryList = parse_shape(value, "an object with a stories array")?;
        info!(feature = feature.id, stories = list.stories.len(), "suggested stories");
        Ok(list.stories)
    }

    pub async fn review_plan(
        &self,
        feature: &WorkItemRecord,
        stories: &[WorkItemRecord],
    ) -> GatewayResult<PlanReview> {
        let value = self
            .ask(prompts::REVIEW_PLAN, prompts::feature_request(feature, stories))
            .await?;
        parse_shape(value, "a plan review with suggestions")
    }

    pub async fn generate_feature_details(
        &self,
        feature: &WorkItemRecord,
        stories: &[WorkItemRecord],
    ) -> GatewayResult<FeatureDetails> {
        let value = self
            .ask(
                prompts::FEATURE_DETAILS,
                prompts::feature_request(feature, stories),
            )
            .await?;
        parse_shape(value, "feature details with a description")
    }

    pub async fn extract_stories_from_chat(
        &self,
        turns: &[ChatTurn],
    ) -> GatewayResult<Vec<GeneratedItem>> {
        let value = self
            .ask(
                prompts::EXTRACT_STORIES,
                prompts::conversation_request(turns),
            )
            .await?;
        let list: StoryList = parse_shape(value, "an object with a stories array")?;
        Ok(list.stories)
    }
}
