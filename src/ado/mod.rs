pub mod client;
pub mod patch;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

use crate::error::GatewayResult;
use crate::model::generated::GeneratedItem;
use crate::model::work_item::{WorkItemRecord, WorkItemType};

pub use client::AdoClient;

/// One child of an iteration classification node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationNode {
    pub name: String,
    pub path: String,
    pub id: u64,
}

/// Remote work-item operations. Every write is a real, non-idempotent mutation;
/// nothing here retries.
#[async_trait]
pub trait WorkItemGateway: Send + Sync {
    async fn fetch_one(&self, id: u64) -> GatewayResult<WorkItemRecord>;

    /// Output order is the remote's, not the input's; index results by id.
    async fn fetch_batch(&self, ids: &[u64]) -> GatewayResult<Vec<WorkItemRecord>>;

    async fn run_saved_query(&self, query_id: &str) -> GatewayResult<Vec<u64>>;

    async fn create_child(
        &self,
        parent: &WorkItemRecord,
        item: &GeneratedItem,
        kind: &WorkItemType,
    ) -> GatewayResult<WorkItemRecord>;

    async fn update_fields(
        &self,
        id: u64,
        updates: &BTreeMap<String, Value>,
    ) -> GatewayResult<WorkItemRecord>;

    async fn list_iteration_children(&self, path: &str) -> GatewayResult<Vec<IterationNode>>;

    /// Write a new ordering value to whichever rank field the record was read from.
    async fn update_rank(
        &self,
        record: &WorkItemRecord,
        value: f64,
    ) -> GatewayResult<WorkItemRecord> {
        let mut updates = BTreeMap::new();
        updates.insert(record.rank.field.field_name().to_string(), json!(value));
        self.update_fields(record.id, &updates).await
    }

    /// Direct children of `parent`, optionally restricted to one type.
    async fn fetch_children(
        &self,
        parent: &WorkItemRecord,
        kind: Option<&WorkItemType>,
    ) -> GatewayResult<Vec<WorkItemRecord>> {
        let ids = parent.child_ids();
        let children = self.fetch_batch(&ids).await?;
        Ok(children
            .into_iter()
            .filter(|c| kind.map_or(true, |k| c.work_item_type == *k))
            .collect())
    }
}

#[cfg(test)]
pub mod fake;
