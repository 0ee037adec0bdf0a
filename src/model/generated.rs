use serde::{Deserialize, Serialize};

use super::fields::DEFAULT_ACTIVITY;
use super::work_item::{WorkItemRecord, WorkItemType};
use crate::util::lenient;

/// A Task or User Story proposed by the model (or typed into the row editor)
/// before it exists remotely. Keys follow the column names the prompts ask for.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratedItem {
    #[serde(
        rename = "Title",
        alias = "title",
        default,
        deserialize_with = "lenient::text"
    )]
    pub title: String,

    #[serde(
        rename = "Description",
        alias = "description",
        default,
        deserialize_with = "lenient::text"
    )]
    pub description: String,

    #[serde(
        rename = "Work Item Type",
        alias = "workItemType",
        alias = "type",
        default,
        deserialize_with = "lenient::opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub work_item_type: Option<String>,

    #[serde(
        rename = "Original Estimate",
        alias = "originalEstimate",
        alias = "original_estimate",
        default,
        deserialize_with = "lenient::opt_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub original_estimate: Option<f64>,

    #[serde(
        rename = "Remaining Work",
        alias = "remainingWork",
        alias = "remaining_work",
        default,
        deserialize_with = "lenient::opt_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub remaining_work: Option<f64>,

    #[serde(
        rename = "Activity",
        alias = "activity",
        default,
        deserialize_with = "lenient::opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub activity: Option<String>,

    #[serde(
        rename = "Acceptance Criteria",
        alias = "acceptanceCriteria",
        alias = "acceptance_criteria",
        default,
        deserialize_with = "lenient::opt_html",
        skip_serializing_if = "Option::is_none"
    )]
    pub acceptance_criteria: Option<String>,

    #[serde(
        rename = "Story Points",
        alias = "storyPoints",
        alias = "story_points",
        default,
        deserialize_with = "lenient::opt_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub story_points: Option<f64>,

    #[serde(
        rename = "Assigned To",
        alias = "assignedTo",
        alias = "assigned_to",
        default,
        deserialize_with = "lenient::opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub assigned_to: Option<String>,

    #[serde(
        rename = "Area Path",
        alias = "areaPath",
        alias = "area_path",
        default,
        deserialize_with = "lenient::opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub area_path: Option<String>,

    #[serde(
        rename = "Iteration Path",
        alias = "iterationPath",
        alias = "iteration_path",
        default,
        deserialize_with = "lenient::opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub iteration_path: Option<String>,

    #[serde(
        rename = "CMDB App Name",
        alias = "cmdbAppName",
        alias = "cmdb_app_name",
        default,
        deserialize_with = "lenient::opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub cmdb_app_name: Option<String>,
}

impl GeneratedItem {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Copy of this row with the columns a write of `kind` requires filled in.
    /// Stories get nothing invented: their optional columns are sent only when present.
    pub fn with_defaults(&self, kind: &WorkItemType) -> Self {
        let mut row = self.clone();
        if *kind == WorkItemType::Task {
            if row.original_estimate.is_none() {
                row.original_estimate = Some(0.0);
            }
            if row.activity.as_deref().map_or(true, |a| a.trim().is_empty()) {
                row.activity = Some(DEFAULT_ACTIVITY.to_string());
            }
        }
        row
    }

    /// Copy of this row scheduled into another sprint; the template is left untouched.
    pub fn retargeted(&self, iteration_path: &str) -> Self {
        Self {
            iteration_path: Some(iteration_path.to_string()),
            ..self.clone()
        }
    }

    /// Template row for replicating an existing item elsewhere.
    pub fn from_record(record: &WorkItemRecord) -> Self {
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
        let is_story = record.work_item_type == WorkItemType::UserStory;
        let is_task = record.work_item_type == WorkItemType::Task;
        Self {
            title: record.title.clone(),
            description: record.description.clone(),
            work_item_type: Some(record.work_item_type.to_string()),
            original_estimate: is_task.then_some(record.original_estimate),
            remaining_work: record.remaining_work,
            activity: is_task.then(|| record.activity.clone()),
            acceptance_criteria: if is_story {
                non_empty(&record.acceptance_criteria)
            } else {
                None
            },
            story_points: is_story
                .then_some(record.story_points)
                .filter(|points| *points > 0.0),
            assigned_to: (record.assigned_to != super::fields::UNASSIGNED)
                .then(|| record.assigned_to.clone())
                .filter(|a| !a.is_empty()),
            area_path: non_empty(&record.area_path),
            iteration_path: non_empty(&record.iteration_path),
            cmdb_app_name: non_empty(&record.cmdb_app_name),
        }
    }

    pub fn estimate(&self) -> f64 {
        self.original_estimate.unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_display_keys_from_model_output() {
        let item: GeneratedItem = serde_json::from_value(json!({
            "Work Item Type": "Task",
            "Title": "Write Terraform",
            "Description": "Create the volume",
            "Original Estimate": "4",
            "Assigned To": "Doe, Jane",
            "State": "New",
            "Tags": ["infra"]
        }))
        .unwrap();

        assert_eq!(item.title, "Write Terraform");
        assert_eq!(item.work_item_type.as_deref(), Some("Task"));
        assert_eq!(item.original_estimate, Some(4.0));
        assert_eq!(item.assigned_to.as_deref(), Some("Doe, Jane"));
        assert_eq!(item.activity, None);
    }

    #[test]
    fn parses_camel_case_keys() {
        let item: GeneratedItem = serde_json::from_value(json!({
            "title": "Story",
            "acceptanceCriteria": ["Given x", "Then y"],
            "storyPoints": 2
        }))
        .unwrap();
        assert_eq!(item.story_points, Some(2.0));
        assert_eq!(
            item.acceptance_criteria.as_deref(),
            Some("<ul><li>Given x</li><li>Then y</li></ul>")
        );
    }

    #[test]
    fn empty_object_yields_blank_row() {
        let item: GeneratedItem = serde_json::from_value(json!({})).unwrap();
        assert_eq!(item, GeneratedItem::default());
    }

    #[test]
    fn task_defaults_fill_estimate_and_activity() {
        let row = GeneratedItem {
            activity: Some("  ".into()),
            ..GeneratedItem::new("Task")
        };
        let filled = row.with_defaults(&WorkItemType::Task);
        assert_eq!(filled.original_estimate, Some(0.0));
        assert_eq!(filled.activity.as_deref(), Some("Development"));
        // template untouched
        assert_eq!(row.original_estimate, None);
    }

    #[test]
    fn story_defaults_invent_nothing() {
        let row = GeneratedItem::new("Story");
        let filled = row.with_defaults(&WorkItemType::UserStory);
        assert_eq!(filled, row);
    }

    #[test]
    fn retargeting_leaves_template_alone() {
        let template = GeneratedItem {
            iteration_path: Some("P\\Sprint 1".into()),
            ..GeneratedItem::new("Story")
        };
        let copy = template.retargeted("P\\Sprint 2");
        assert_eq!(copy.iteration_path.as_deref(), Some("P\\Sprint 2"));
        assert_eq!(template.iteration_path.as_deref(), Some("P\\Sprint 1"));
        assert_eq!(copy.title, template.title);
    }

    #[test]
    fn template_from_story_keeps_only_points_it_has() {
        use crate::ado::fake::record;

        let unpointed = GeneratedItem::from_record(&record(5, "User Story", json!({})));
        assert_eq!(unpointed.story_points, None);
        assert_eq!(unpointed.title, "Item 5");

        let pointed = GeneratedItem::from_record(&record(
            6,
            "User Story",
            json!({ "Microsoft.VSTS.Scheduling.StoryPoints": 3 }),
        ));
        assert_eq!(pointed.story_points, Some(3.0));
    }

    #[test]
    fn serializes_with_display_keys() {
        let row = GeneratedItem {
            original_estimate: Some(1.0),
            ..GeneratedItem::new("Testing")
        };
        let value = serde_json::to_value(&row).unwrap();
        assert_eq!(value["Title"], "Testing");
        assert_eq!(value["Original Estimate"], 1.0);
        assert!(value.get("Story Points").is_none());
    }
}
