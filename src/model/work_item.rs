use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::fields;
use crate::error::{GatewayError, GatewayResult};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum WorkItemType {
    Task,
    UserStory,
    Feature,
    Bug,
    Epic,
    Other(String),
}

impl WorkItemType {
    pub fn as_str(&self) -> &str {
        match self {
            WorkItemType::Task => "Task",
            WorkItemType::UserStory => "User Story",
            WorkItemType::Feature => "Feature",
            WorkItemType::Bug => "Bug",
            WorkItemType::Epic => "Epic",
            WorkItemType::Other(name) => name,
        }
    }
}

impl From<String> for WorkItemType {
    fn from(name: String) -> Self {
        match name.as_str() {
            "Task" => WorkItemType::Task,
            "User Story" => WorkItemType::UserStory,
            "Feature" => WorkItemType::Feature,
            "Bug" => WorkItemType::Bug,
            "Epic" => WorkItemType::Epic,
            _ => WorkItemType::Other(name),
        }
    }
}

impl From<WorkItemType> for String {
    fn from(kind: WorkItemType) -> Self {
        kind.as_str().to_string()
    }
}

impl std::fmt::Display for WorkItemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which remote field backs an item's ordering value.
///
/// A project exposes exactly one of the two, so the field seen on read is the
/// field written on update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RankField {
    StackRank,
    BacklogPriority,
}

impl RankField {
    pub fn field_name(self) -> &'static str {
        match self {
            RankField::StackRank => fields::STACK_RANK,
            RankField::BacklogPriority => fields::BACKLOG_PRIORITY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rank {
    pub field: RankField,
    pub value: f64,
}

impl Rank {
    fn from_fields(map: &Map<String, Value>) -> Self {
        if let Some(v) = map.get(fields::STACK_RANK) {
            return Rank {
                field: RankField::StackRank,
                value: v.as_f64().unwrap_or(0.0),
            };
        }
        Rank {
            field: RankField::BacklogPriority,
            value: map
                .get(fields::BACKLOG_PRIORITY)
                .and_then(Value::as_f64)
                .unwrap_or(0.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    #[serde(rename = "rel")]
    pub relation_type: String,
    pub url: String,
}

impl Relation {
    /// Numeric id at the end of the target URL, if any.
    pub fn target_id(&self) -> Option<u64> {
        self.url.rsplit('/').next()?.parse().ok()
    }
}

/// Normalized view of a remote work item. Every optional field resolves to a
/// default so table editing and patch building never see a missing value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkItemRecord {
    pub id: u64,
    #[serde(rename = "type")]
    pub work_item_type: WorkItemType,
    pub title: String,
    pub description: String,
    pub acceptance_criteria: String,
    pub state: String,
    pub tags: Vec<String>,
    pub story_points: f64,
    pub original_estimate: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_work: Option<f64>,
    pub rank: Rank,
    pub activity: String,
    pub area_path: String,
    pub iteration_path: String,
    pub assigned_to: String,
    pub created_by: String,
    pub changed_by: String,
    pub created_date: String,
    pub changed_date: String,
    pub relations: Vec<Relation>,
    pub url: String,
    pub web_url: String,
    pub external_dependencies: String,
    pub non_functional_requirements: String,
    pub cmdb_app_name: String,
}

impl WorkItemRecord {
    /// Build a record from the remote work item JSON (`{id, fields, relations, url, _links}`).
    pub fn from_remote(raw: &Value) -> GatewayResult<Self> {
        let id = raw
            .get("id")
            .and_then(Value::as_u64)
            .ok_or_else(|| GatewayError::UnexpectedShape {
                expected: "work item with a numeric id",
                detail: truncate(&raw.to_string(), 200),
            })?;

        let empty = Map::new();
        let map = raw.get("fields").and_then(Value::as_object).unwrap_or(&empty);

        let relations = raw
            .get("relations")
            .and_then(Value::as_array)
            .map(|rels| {
                rels.iter()
                    .filter_map(|r| serde_json::from_value::<Relation>(r.clone()).ok())
                    .collect()
            })
            .unwrap_or_default();

        let tags = text(map, fields::TAGS, "")
            .split(';')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from)
            .collect();

        Ok(WorkItemRecord {
            id,
            work_item_type: WorkItemType::from(text(map, fields::WORK_ITEM_TYPE, "")),
            title: text(map, fields::TITLE, ""),
            description: text(map, fields::DESCRIPTION, ""),
            acceptance_criteria: text(map, fields::ACCEPTANCE_CRITERIA, ""),
            state: text(map, fields::STATE, ""),
            tags,
            story_points: number(map, fields::STORY_POINTS),
            original_estimate: number(map, fields::ORIGINAL_ESTIMATE),
            remaining_work: map.get(fields::REMAINING_WORK).and_then(Value::as_f64),
            rank: Rank::from_fields(map),
            activity: text(map, fields::ACTIVITY, fields::DEFAULT_ACTIVITY),
            area_path: text(map, fields::AREA_PATH, ""),
            iteration_path: text(map, fields::ITERATION_PATH, ""),
            assigned_to: identity(map, fields::ASSIGNED_TO, fields::UNASSIGNED),
            created_by: identity(map, fields::CREATED_BY, ""),
            changed_by: identity(map, fields::CHANGED_BY, ""),
            created_date: text(map, fields::CREATED_DATE, ""),
            changed_date: text(map, fields::CHANGED_DATE, ""),
            relations,
            url: raw
                .get("url")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            web_url: raw
                .pointer("/_links/html/href")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            external_dependencies: text(map, fields::EXTERNAL_DEPENDENCIES, ""),
            non_functional_requirements: text(map, fields::NON_FUNCTIONAL_REQUIREMENTS, ""),
            cmdb_app_name: text(map, fields::CMDB_APP_NAME, ""),
        })
    }

    pub fn child_ids(&self) -> Vec<u64> {
        self.relations
            .iter()
            .filter(|r| r.relation_type == fields::LINK_CHILD)
            .filter_map(Relation::target_id)
            .collect()
    }

    pub fn parent_id(&self) -> Option<u64> {
        self.relations
            .iter()
            .find(|r| r.relation_type == fields::LINK_PARENT)
            .and_then(Relation::target_id)
    }
}

fn text(map: &Map<String, Value>, key: &str, default: &str) -> String {
    match map.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => default.to_string(),
    }
}

fn number(map: &Map<String, Value>, key: &str) -> f64 {
    map.get(key).and_then(Value::as_f64).unwrap_or(0.0)
}

/// Identity fields arrive as `{displayName, uniqueName, ...}`; older payloads use a plain string.
fn identity(map: &Map<String, Value>, key: &str, default: &str) -> String {
    match map.get(key) {
        Some(Value::Object(obj)) => obj
            .get("displayName")
            .and_then(Value::as_str)
            .unwrap_or(default)
            .to_string(),
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        _ => default.to_string(),
    }
}

fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
