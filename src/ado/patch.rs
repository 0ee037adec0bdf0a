use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;

use crate::model::fields;
use crate::model::generated::GeneratedItem;
use crate::model::work_item::{WorkItemRecord, WorkItemType};

/// One JSON-Patch entry. `add` on an existing field replaces it, so every
/// write here is an upsert.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatchOp {
    pub op: &'static str,
    pub path: String,
    pub value: Value,
}

impl PatchOp {
    pub fn field(name: &str, value: impl Into<Value>) -> Self {
        Self {
            op: "add",
            path: format!("/fields/{name}"),
            value: value.into(),
        }
    }

    pub fn relation(rel: &str, url: &str) -> Self {
        Self {
            op: "add",
            path: "/relations/-".into(),
            value: json!({ "rel": rel, "url": url }),
        }
    }
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|s| !s.trim().is_empty())
}

/// Ordered patch creating `item` as a `kind` child of `parent`.
pub fn build_create_patch(
    parent: &WorkItemRecord,
    item: &GeneratedItem,
    kind: &WorkItemType,
) -> Vec<PatchOp> {
    let mut patch = vec![
        PatchOp::field(fields::TITLE, item.title.as_str()),
        PatchOp::field(fields::DESCRIPTION, item.description.as_str()),
        PatchOp::field(
            fields::AREA_PATH,
            non_empty(item.area_path.as_ref()).unwrap_or(parent.area_path.as_str()),
        ),
        PatchOp::field(
            fields::ITERATION_PATH,
            non_empty(item.iteration_path.as_ref()).unwrap_or(parent.iteration_path.as_str()),
        ),
        PatchOp::relation(fields::LINK_PARENT, &parent.url),
    ];

    match kind {
        WorkItemType::Task => {
            patch.push(PatchOp::field(fields::ORIGINAL_ESTIMATE, item.estimate()));
            if let Some(remaining) = item.remaining_work {
                patch.push(PatchOp::field(fields::REMAINING_WORK, remaining));
            }
            patch.push(PatchOp::field(
                fields::ACTIVITY,
                non_empty(item.activity.as_ref()).unwrap_or(fields::DEFAULT_ACTIVITY),
            ));
        }
        WorkItemType::UserStory => {
            if let Some(ac) = &item.acceptance_criteria {
                patch.push(PatchOp::field(fields::ACCEPTANCE_CRITERIA, ac.as_str()));
            }
            if let Some(points) = item.story_points {
                patch.push(PatchOp::field(fields::STORY_POINTS, points));
            }
        }
        _ => {}
    }

    if let Some(assignee) = non_empty(item.assigned_to.as_ref()) {
        patch.push(PatchOp::field(fields::ASSIGNED_TO, assignee));
    }

    let cmdb = non_empty(item.cmdb_app_name.as_ref())
        .or_else(|| Some(parent.cmdb_app_name.as_str()).filter(|s| !s.is_empty()));
    if let Some(cmdb) = cmdb {
        patch.push(PatchOp::field(fields::CMDB_APP_NAME, cmdb));
    }

    patch
}

pub fn build_update_patch(updates: &BTreeMap<String, Value>) -> Vec<PatchOp> {
    updates
        .iter()
        .map(|(name, value)| PatchOp::field(name, value.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parent() -> WorkItemRecord {
        WorkItemRecord::from_remote(&json!({
            "id": 100,
            "url": "https://dev.azure.com/org/_apis/wit/workItems/100",
            "fields": {
                "System.WorkItemType": "User Story",
                "System.Title": "Parent",
                "System.AreaPath": "Platts\\Team A",
                "System.IterationPath": "Platts\\Scrum\\26.02\\Sprint 3 (Ünïcode)",
                "Custom.CMDBAppName": "IHDC"
            }
        }))
        .unwrap()
    }

    fn find<'a>(patch: &'a [PatchOp], path: &str) -> Option<&'a PatchOp> {
        patch.iter().find(|p| p.path == path)
    }

    #[test]
    fn child_inherits_paths_byte_for_byte() {
        let parent = parent();
        let patch = build_create_patch(&parent, &GeneratedItem::new("Child"), &WorkItemType::Task);

        let iteration = find(&patch, "/fields/System.IterationPath").unwrap();
        assert_eq!(iteration.value.as_str().unwrap().as_bytes(), parent.iteration_path.as_bytes());
        let area = find(&patch, "/fields/System.AreaPath").unwrap();
        assert_eq!(area.value, json!("Platts\\Team A"));
    }

    #[test]
    fn explicit_iteration_overrides_parent() {
        let item = GeneratedItem::new("Child").retargeted("Platts\\Scrum\\26.03");
        let patch = build_create_patch(&parent(), &item, &WorkItemType::Task);
        assert_eq!(
            find(&patch, "/fields/System.IterationPath").unwrap().value,
            json!("Platts\\Scrum\\26.03")
        );
    }

    #[test]
    fn blank_override_falls_back_to_parent() {
        let item = GeneratedItem::new("Child").retargeted("");
        let patch = build_create_patch(&parent(), &item, &WorkItemType::Task);
        assert_eq!(
            find(&patch, "/fields/System.IterationPath").unwrap().value,
            json!(parent().iteration_path)
        );
    }

    #[test]
    fn always_links_back_to_parent() {
        for kind in [WorkItemType::Task, WorkItemType::UserStory, WorkItemType::Bug] {
            let patch = build_create_patch(&parent(), &GeneratedItem::new("x"), &kind);
            let link = find(&patch, "/relations/-").unwrap();
            assert_eq!(link.value["rel"], "System.LinkTypes.Hierarchy-Reverse");
            assert_eq!(link.value["url"], "https://dev.azure.com/org/_apis/wit/workItems/100");
        }
    }

    #[test]
    fn task_patch_carries_estimate_and_activity() {
        let item = GeneratedItem {
            original_estimate: Some(5.0),
            remaining_work: Some(5.0),
            ..GeneratedItem::new("Build")
        };
        let patch = build_create_patch(&parent(), &item, &WorkItemType::Task);
        let paths: Vec<&str> = patch.iter().map(|p| p.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "/fields/System.Title",
                "/fields/System.Description",
                "/fields/System.AreaPath",
                "/fields/System.IterationPath",
                "/relations/-",
                "/fields/Microsoft.VSTS.Scheduling.OriginalEstimate",
                "/fields/Microsoft.VSTS.Scheduling.RemainingWork",
                "/fields/Microsoft.VSTS.Common.Activity",
                "/fields/Custom.CMDBAppName",
            ]
        );
        assert_eq!(
            find(&patch, "/fields/Microsoft.VSTS.Common.Activity").unwrap().value,
            json!("Development")
        );
    }

    #[test]
    fn story_fields_only_when_provided() {
        let bare = build_create_patch(&parent(), &GeneratedItem::new("S"), &WorkItemType::UserStory);
        assert!(find(&bare, "/fields/Microsoft.VSTS.Common.AcceptanceCriteria").is_none());
        assert!(find(&bare, "/fields/Microsoft.VSTS.Scheduling.StoryPoints").is_none());
        assert!(find(&bare, "/fields/Microsoft.VSTS.Scheduling.OriginalEstimate").is_none());

        let full = GeneratedItem {
            acceptance_criteria: Some("<ul><li>done</li></ul>".into()),
            story_points: Some(3.0),
            ..GeneratedItem::new("S")
        };
        let patch = build_create_patch(&parent(), &full, &WorkItemType::UserStory);
        assert_eq!(
            find(&patch, "/fields/Microsoft.VSTS.Common.AcceptanceCriteria").unwrap().value,
            json!("<ul><li>done</li></ul>")
        );
        assert_eq!(
            find(&patch, "/fields/Microsoft.VSTS.Scheduling.StoryPoints").unwrap().value,
            json!(3.0)
        );
    }

    #[test]
    fn assignee_only_when_non_empty() {
        let blank = GeneratedItem {
            assigned_to: Some(String::new()),
            ..GeneratedItem::new("x")
        };
        let patch = build_create_patch(&parent(), &blank, &WorkItemType::Task);
        assert!(find(&patch, "/fields/System.AssignedTo").is_none());

        let named = GeneratedItem {
            assigned_to: Some("Doe, Jane".into()),
            ..GeneratedItem::new("x")
        };
        let patch = build_create_patch(&parent(), &named, &WorkItemType::Task);
        assert_eq!(find(&patch, "/fields/System.AssignedTo").unwrap().value, json!("Doe, Jane"));
    }

    #[test]
    fn cmdb_prefers_item_then_parent() {
        let own = GeneratedItem {
            cmdb_app_name: Some("Other".into()),
            ..GeneratedItem::new("x")
        };
        let patch = build_create_patch(&parent(), &own, &WorkItemType::Task);
        assert_eq!(find(&patch, "/fields/Custom.CMDBAppName").unwrap().value, json!("Other"));

        let mut orphan_parent = parent();
        orphan_parent.cmdb_app_name.clear();
        let patch = build_create_patch(&orphan_parent, &GeneratedItem::new("x"), &WorkItemType::Task);
        assert!(find(&patch, "/fields/Custom.CMDBAppName").is_none());
    }

    #[test]
    fn update_patch_is_one_add_per_field() {
        let mut updates = BTreeMap::new();
        updates.insert(fields::DESCRIPTION.to_string(), json!("<p>new</p>"));
        updates.insert(fields::STACK_RANK.to_string(), json!(3.0));
        let patch = build_update_patch(&updates);
        assert_eq!(patch.len(), 2);
        assert!(patch.iter().all(|p| p.op == "add"));
        assert_eq!(
            serde_json::to_value(&patch[0]).unwrap(),
            json!({ "op": "add", "path": "/fields/Microsoft.VSTS.Common.StackRank", "value": 3.0 })
        );
    }
}
