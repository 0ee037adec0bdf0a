use async_trait::async_trait;
use base64::Engine;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

use super::patch::{build_create_patch, build_update_patch};
use super::{IterationNode, WorkItemGateway};
use crate::config::{require_secret, AdoConfig, PAT_VAR};
use crate::error::{GatewayError, GatewayResult};
use crate::model::generated::GeneratedItem;
use crate::model::work_item::{WorkItemRecord, WorkItemType};

/// The batch endpoint refuses more ids than this per call.
const BATCH_LIMIT: usize = 200;

const JSON_PATCH: &str = "application/json-patch+json";

pub struct AdoClient {
    project_url: String,
    project: String,
    api_version: String,
    auth_header: String,
    client: reqwest::Client,
}

impl AdoClient {
    pub fn new(config: &AdoConfig, pat: &str) -> Self {
        // Basic auth with an empty user name and the PAT as password.
        let encoded = base64::engine::general_purpose::STANDARD.encode(format!(":{pat}"));
        Self {
            project_url: format!(
                "{}/{}/{}",
                config.base_url.trim_end_matches('/'),
                config.organization,
                config.project
            ),
            project: config.project.clone(),
            api_version: config.api_version.clone(),
            auth_header: format!("Basic {encoded}"),
            client: reqwest::Client::new(),
        }
    }

    pub fn from_env(config: &AdoConfig) -> GatewayResult<Self> {
        let pat = require_secret(PAT_VAR, |name| std::env::var(name).ok())?;
        Ok(Self::new(config, &pat))
    }

    fn url(&self, path: &str, query: &str) -> String {
        let sep = if query.is_empty() { "" } else { "&" };
        format!(
            "{}/_apis/wit/{path}?{query}{sep}api-version={}",
            self.project_url, self.api_version
        )
    }

    async fn get(&self, url: &str, what: &str) -> GatewayResult<Value> {
        debug!(%url, "GET");
        let resp = self
            .client
            .get(url)
            .header(AUTHORIZATION, &self.auth_header)
            .send()
            .await?;
        check_response(resp, what).await
    }

    fn path_relative_to_project(&self, path: &str) -> String {
        let normalized = path.replace('\\', "/");
        let trimmed = normalized.trim_matches('/');
        if trimmed == self.project {
            return String::new();
        }
        trimmed
            .strip_prefix(&format!("{}/", self.project))
            .unwrap_or(trimmed)
            .to_string()
    }
}

/// Map a response to its JSON body, or to the error taxonomy.
/// 401 is always an expired or invalid token, whatever the body says.
pub(crate) async fn check_response(resp: reqwest::Response, what: &str) -> GatewayResult<Value> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp.json().await?);
    }
    if status == StatusCode::UNAUTHORIZED {
        return Err(GatewayError::Auth);
    }
    if status == StatusCode::NOT_FOUND {
        return Err(GatewayError::NotFound {
            what: what.to_string(),
        });
    }
    let body = resp.text().await.unwrap_or_default();
    Err(GatewayError::Remote {
        status: status.as_u16(),
        body,
    })
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResult {
    work_items: Option<Vec<IdRef>>,
    work_item_relations: Option<Vec<RelationEdge>>,
}

#[derive(Deserialize)]
struct IdRef {
    id: u64,
}

#[derive(Deserialize)]
struct RelationEdge {
    source: Option<IdRef>,
    target: Option<IdRef>,
}

#[derive(Deserialize)]
struct ClassificationNode {
    #[serde(default)]
    children: Vec<ClassificationChild>,
}

#[derive(Deserialize)]
struct ClassificationChild {
    id: u64,
    name: String,
}

/// Flat queries list ids directly; tree queries are flattened to every id
/// appearing on either end of an edge, deduplicated.
fn flatten_query_ids(result: QueryResult) -> Vec<u64> {
    if let Some(items) = result.work_items {
        return items.into_iter().map(|i| i.id).collect();
    }
    let mut ids = BTreeSet::new();
    for edge in result.work_item_relations.unwrap_or_default() {
        if let Some(source) = edge.source {
            ids.insert(source.id);
        }
        if let Some(target) = edge.target {
            ids.insert(target.id);
        }
    }
    ids.into_iter().collect()
}

#[async_trait]
impl WorkItemGateway for AdoClient {
    async fn fetch_one(&self, id: u64) -> GatewayResult<WorkItemRecord> {
        let url = self.url(&format!("workitems/{id}"), "$expand=relations");
        let raw = self.get(&url, &format!("Work item {id}")).await?;
        WorkItemRecord::from_remote(&raw)
    }

    async fn fetch_batch(&self, ids: &[u64]) -> GatewayResult<Vec<WorkItemRecord>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut records = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(BATCH_LIMIT) {
            let joined = chunk
                .iter()
                .map(u64::to_string)
                .collect::<Vec<_>>()
                .join(",");
            let url = self.url("workitems", &format!("ids={joined}"));
            let data = self.get(&url, "Work items batch").await?;
            let values = data
                .get("value")
                .and_then(Value::as_array)
                .ok_or_else(|| GatewayError::UnexpectedShape {
                    expected: "batch response with a value array",
                    detail: data.to_string().chars().take(200).collect(),
                })?;
            for raw in values {
                records.push(WorkItemRecord::from_remote(raw)?);
            }
        }
        Ok(records)
    }

    async fn run_saved_query(&self, query_id: &str) -> GatewayResult<Vec<u64>> {
        let url = self.url(&format!("wiql/{}", urlencoding::encode(query_id)), "");
        let data = self.get(&url, &format!("Query {query_id}")).await?;
        let result: QueryResult =
            serde_json::from_value(data).map_err(|e| GatewayError::UnexpectedShape {
                expected: "query result",
                detail: e.to_string(),
            })?;
        Ok(flatten_query_ids(result))
    }

    async fn create_child(
        &self,
        parent: &WorkItemRecord,
        item: &GeneratedItem,
        kind: &WorkItemType,
    ) -> GatewayResult<WorkItemRecord> {
        let patch = build_create_patch(parent, item, kind);
        let url = self.url(
            &format!("workitems/${}", urlencoding::encode(kind.as_str())),
            "",
        );
        debug!(%url, parent = parent.id, "POST");

        let resp = self
            .client
            .post(&url)
            .header(AUTHORIZATION, &self.auth_header)
            .header(CONTENT_TYPE, JSON_PATCH)
            .json(&patch)
            .send()
            .await?;
        let raw = check_response(resp, &format!("Work item type {kind}")).await?;
        let created = WorkItemRecord::from_remote(&raw)?;
        info!(id = created.id, parent = parent.id, kind = %kind, "created work item");
        Ok(created)
    }

    async fn update_fields(
        &self,
        id: u64,
        updates: &BTreeMap<String, Value>,
    ) -> GatewayResult<WorkItemRecord> {
        let patch = build_update_patch(updates);
        let url = self.url(&format!("workitems/{id}"), "");
        debug!(%url, fields = updates.len(), "PATCH");

        let resp = self
            .client
            .patch(&url)
            .header(AUTHORIZATION, &self.auth_header)
            .header(CONTENT_TYPE, JSON_PATCH)
            .json(&patch)
            .send()
            .await?;
        let raw = check_response(resp, &format!("Work item {id}")).await?;
        info!(id, "updated work item");
        WorkItemRecord::from_remote(&raw)
    }

    async fn list_iteration_children(&self, path: &str) -> GatewayResult<Vec<IterationNode>> {
        let relative = self.path_relative_to_project(path);
        let node_path = if relative.is_empty() {
            "classificationnodes/Iterations".to_string()
        } else {
            let encoded: Vec<String> = relative
                .split('/')
                .map(|seg| urlencoding::encode(seg).into_owned())
                .collect();
            format!("classificationnodes/Iterations/{}", encoded.join("/"))
        };
        let url = self.url(&node_path, "$depth=1");

        let data = match self.get(&url, &format!("Iteration {path}")).await {
            Ok(data) => data,
            Err(GatewayError::NotFound { .. }) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        let node: ClassificationNode =
            serde_json::from_value(data).map_err(|e| GatewayError::UnexpectedShape {
                expected: "classification node",
                detail: e.to_string(),
            })?;

        let base = path.trim_end_matches('\\');
        Ok(node
            .children
            .into_iter()
            .map(|child| IterationNode {
                path: format!("{base}\\{}", child.name),
                name: child.name,
                id: child.id,
            })
            .collect())
    }
}
