use serde_json::{json, Value};

use super::schema::{HOURS_PER_POINT, TESTING_HOURS, TESTING_TITLE};
use crate::model::chat::{ChatRole, ChatTurn};
use crate::model::work_item::WorkItemRecord;

const JSON_ONLY: &str = "IMPORTANT: Output ONLY valid JSON. Do not include any conversational text, markdown formatting, or explanations.";

pub const GENERATE_TASKS: &str = "You are an expert project management assistant. Your task is to analyze user stories and break them down into actionable tasks. Ensure that each task is clear, concise, and includes the necessary details. Return the tasks in a structured JSON format with the following structure: { \"tasks\": [ { \"Work Item Type\": \"Task\", \"Title\": <title>, \"Description\": <task_description>, \"Original Estimate\": <hours>, \"Activity\": <activity>, \"Assigned To\": <assigned_to> } ] }. Every story point is 6 hours: the Original Estimate values of all tasks must sum to the story points multiplied by 6. The last task must always be titled \"Testing\" with an Original Estimate of 1 hour; distribute the remaining hours across the other tasks.";

pub const SUGGEST_STORIES: &str = "You are an expert agile product owner. You receive a Feature and the User Stories that already implement it. Identify gaps in coverage and propose additional User Stories that close them, without repeating existing stories. Return JSON with the structure: { \"stories\": [ { \"Title\": <title>, \"Description\": <\"As a ..., I want ..., so that ...\" in HTML>, \"Acceptance Criteria\": [<criterion>, ...], \"Story Points\": <number> } ] }.";

pub const REVIEW_PLAN: &str = "You are an expert agile delivery lead. You receive a Feature and its User Stories with their iteration paths. Review the plan: ordering of stories, grouping by iteration, dependencies between stories and on external teams, and steps that are missing entirely. Return JSON with the structure: { \"suggestions\": [<text>], \"externalDependencies\": [<text>], \"missingSteps\": [<text>], \"iterationAnalysis\": <text> }.";

pub const FEATURE_DETAILS: &str = "You are an expert product manager. You receive a Feature and its User Stories. Write the Feature's details so they summarize what the stories deliver. Use HTML for formatting. Return JSON with the structure: { \"description\": <html>, \"externalDependencies\": <html>, \"nonFunctionalRequirements\": <html>, \"acceptanceCriteria\": <html> }.";

pub const EXTRACT_STORIES: &str = "You are an expert agile product owner. You receive a conversation in which requirements were discussed. Summarize every distinct requirement into a User Story. Return JSON with the structure: { \"stories\": [ { \"Title\": <title>, \"Description\": <\"As a ..., I want ..., so that ...\" in HTML>, \"Acceptance Criteria\": [<criterion>, ...], \"Story Points\": <number> } ] }.";

pub fn system_prompt(base: &str) -> String {
    format!("{base} {JSON_ONLY}")
}

/// The fields of a work item the model needs to see.
pub fn describe(item: &WorkItemRecord) -> Value {
    json!({
        "id": item.id,
        "workItemType": item.work_item_type.as_str(),
        "title": item.title,
        "description": item.description,
        "acceptanceCriteria": item.acceptance_criteria,
        "storyPoints": item.story_points,
        "state": item.state,
        "iterationPath": item.iteration_path,
        "assignedTo": item.assigned_to,
    })
}

pub fn tasks_request(story: &WorkItemRecord) -> String {
    let total = story.story_points * HOURS_PER_POINT;
    json!({
        "story": describe(story),
        "hourBudget": {
            "totalHours": total,
            "testingTask": { "title": TESTING_TITLE, "hours": TESTING_HOURS },
            "hoursForOtherTasks": (total - TESTING_HOURS).max(0.0),
        }
    })
    .to_string()
}

pub fn feature_request(feature: &WorkItemRecord, stories: &[WorkItemRecord]) -> String {
    json!({
        "feature": describe(feature),
        "stories": stories.iter().map(describe).collect::<Vec<_>>(),
    })
    .to_string()
}

pub fn conversation_request(turns: &[ChatTurn]) -> String {
    turns
        .iter()
        .map(|t| {
            let who = match t.role {
                ChatRole::User => "User",
                ChatRole::Assistant => "Assistant",
                ChatRole::System => "System",
            };
            format!("{who}: {}", t.content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
