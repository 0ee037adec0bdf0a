//! In-memory gateway for exercising batch and dashboard logic without a server.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{IterationNode, WorkItemGateway};
use crate::error::{GatewayError, GatewayResult};
use crate::model::generated::GeneratedItem;
use crate::model::work_item::{WorkItemRecord, WorkItemType};

pub struct FakeGateway {
    pub items: Arc<Mutex<HashMap<u64, WorkItemRecord>>>,
    pub reads: Arc<Mutex<Vec<String>>>,
    pub writes: Arc<Mutex<Vec<String>>>,
    pub created: Arc<Mutex<Vec<GeneratedItem>>>,
    pub updates: Arc<Mutex<Vec<(u64, BTreeMap<String, Value>)>>>,
    pub sprints: Vec<IterationNode>,
    failures: HashMap<usize, fn() -> GatewayError>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self {
            items: Arc::new(Mutex::new(HashMap::new())),
            reads: Arc::new(Mutex::new(Vec::new())),
            writes: Arc::new(Mutex::new(Vec::new())),
            created: Arc::new(Mutex::new(Vec::new())),
            updates: Arc::new(Mutex::new(Vec::new())),
            sprints: Vec::new(),
            failures: HashMap::new(),
        }
    }

    pub fn with_item(self, record: WorkItemRecord) -> Self {
        self.items.lock().unwrap().insert(record.id, record);
        self
    }

    pub fn with_sprints(mut self, names: &[&str], under: &str) -> Self {
        self.sprints = names
            .iter()
            .enumerate()
            .map(|(i, name)| IterationNode {
                name: name.to_string(),
                path: format!("{under}\\{name}"),
                id: 500 + i as u64,
            })
            .collect();
        self
    }

    /// Make the n-th write (1-based) fail.
    pub fn failing_at(mut self, call: usize, err: fn() -> GatewayError) -> Self {
        self.failures.insert(call, err);
        self
    }

    fn write(&self, what: String) -> GatewayResult<u64> {
        let mut writes = self.writes.lock().unwrap();
        writes.push(what);
        let call = writes.len();
        match self.failures.get(&call) {
            Some(err) => Err(err()),
            None => Ok(1000 + call as u64),
        }
    }
}

/// A remote-shaped record; `extra` fields override the defaults.
pub fn record(id: u64, kind: &str, extra: Value) -> WorkItemRecord {
    let mut fields = json!({
        "System.WorkItemType": kind,
        "System.Title": format!("Item {id}"),
        "System.IterationPath": "Platts\\Sprint 1"
    });
    if let (Some(map), Some(more)) = (fields.as_object_mut(), extra.as_object()) {
        for (k, v) in more {
            map.insert(k.clone(), v.clone());
        }
    }
    WorkItemRecord::from_remote(&json!({
        "id": id,
        "url": format!("https://dev.azure.com/spglobal/Platts/_apis/wit/workItems/{id}"),
        "fields": fields
    }))
    .unwrap()
}

/// A record whose relations list the given children.
pub fn parent_of(id: u64, kind: &str, children: &[u64]) -> WorkItemRecord {
    let relations: Vec<Value> = children
        .iter()
        .map(|c| {
            json!({
                "rel": "System.LinkTypes.Hierarchy-Forward",
                "url": format!("https://dev.azure.com/spglobal/Platts/_apis/wit/workItems/{c}")
            })
        })
        .collect();
    WorkItemRecord::from_remote(&json!({
        "id": id,
        "url": format!("https://dev.azure.com/spglobal/Platts/_apis/wit/workItems/{id}"),
        "fields": {
            "System.WorkItemType": kind,
            "System.Title": format!("Item {id}"),
            "Microsoft.VSTS.Scheduling.StoryPoints": 2
        },
        "relations": relations
    }))
    .unwrap()
}

/// A record linked up to `parent`.
pub fn child_of(id: u64, kind: &str, parent: u64, title: &str) -> WorkItemRecord {
    WorkItemRecord::from_remote(&json!({
        "id": id,
        "fields": {
            "System.WorkItemType": kind,
            "System.Title": title,
            "System.IterationPath": "Platts\\Sprint 1"
        },
        "relations": [{
            "rel": "System.LinkTypes.Hierarchy-Reverse",
            "url": format!("https://dev.azure.com/spglobal/Platts/_apis/wit/workItems/{parent}")
        }]
    }))
    .unwrap()
}

#[async_trait]
impl WorkItemGateway for FakeGateway {
    async fn fetch_one(&self, id: u64) -> GatewayResult<WorkItemRecord> {
        self.reads.lock().unwrap().push(format!("fetch {id}"));
        self.items
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound {
                what: format!("Work item {id}"),
            })
    }

    async fn fetch_batch(&self, ids: &[u64]) -> GatewayResult<Vec<WorkItemRecord>> {
        self.reads.lock().unwrap().push(format!("batch {ids:?}"));
        let items = self.items.lock().unwrap();
        Ok(ids.iter().filter_map(|id| items.get(id).cloned()).collect())
    }

    async fn run_saved_query(&self, _query_id: &str) -> GatewayResult<Vec<u64>> {
        let mut ids: Vec<u64> = self.items.lock().unwrap().keys().copied().collect();
        ids.sort_unstable();
        Ok(ids)
    }

    async fn create_child(
        &self,
        parent: &WorkItemRecord,
        item: &GeneratedItem,
        kind: &WorkItemType,
    ) -> GatewayResult<WorkItemRecord> {
        let id = self.write(format!("create {kind} '{}' under {}", item.title, parent.id))?;
        self.created.lock().unwrap().push(item.clone());
        Ok(record(id, kind.as_str(), json!({ "System.Title": item.title })))
    }

    async fn update_fields(
        &self,
        id: u64,
        updates: &BTreeMap<String, Value>,
    ) -> GatewayResult<WorkItemRecord> {
        self.write(format!("update {id}"))?;
        self.updates.lock().unwrap().push((id, updates.clone()));
        let existing = self.items.lock().unwrap().get(&id).cloned();
        Ok(existing.unwrap_or_else(|| record(id, "Feature", json!({}))))
    }

    async fn list_iteration_children(&self, _path: &str) -> GatewayResult<Vec<IterationNode>> {
        Ok(self.sprints.clone())
    }
}
