//! HTTP client for the analytics platform.
//!
//! REST endpoints for execution lifecycle and billing, GraphQL for public
//! query search (the REST surface has no keyword search). Terminal, immutable
//! facts (query metadata, finished job states) are cached by the caller layer;
//! this client performs the raw calls.

use serde_json::{json, Map, Value};

use super::{
    BillingPeriod, CreditUsage, FetchedResult, JobState, JobStatus, QueryMetadata,
    QueryPlatform, QuerySummary, SchemaColumn,
};
use crate::analysis::TabularResult;
use crate::types::{Error, PlatformConfig, Result};

const API_KEY_HEADER: &str = "X-Dune-Api-Key";

/// Production platform client backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpPlatform {
    client: reqwest::Client,
    config: PlatformConfig,
}

impl HttpPlatform {
    pub fn new(config: PlatformConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(Error::validation(
                "platform API key is not set (QUERYDECK_API_KEY)",
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { client, config })
    }

    async fn get_json(&self, path: &str) -> Result<Value> {
        let url = format!("{}/{}", self.config.base_url.trim_end_matches('/'), path);
        let response = self
            .client
            .get(&url)
            .header(API_KEY_HEADER, &self.config.api_key)
            .send()
            .await?;
        Self::into_json(response).await
    }

    async fn post_json(&self, path: &str, body: Value) -> Result<Value> {
        let url = format!("{}/{}", self.config.base_url.trim_end_matches('/'), path);
        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.config.api_key)
            .json(&body)
            .send()
            .await?;
        Self::into_json(response).await
    }

    async fn graphql(&self, payload: Value) -> Result<Value> {
        let response = self
            .client
            .post(&self.config.graphql_url)
            .json(&payload)
            .send()
            .await?;
        Self::into_json(response).await
    }

    async fn into_json(response: reqwest::Response) -> Result<Value> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::upstream(format!(
                "platform returned {}: {}",
                status,
                body.chars().take(300).collect::<String>()
            )));
        }
        Ok(response.json().await?)
    }
}

#[async_trait::async_trait]
impl QueryPlatform for HttpPlatform {
    async fn search_queries(&self, term: &str) -> Result<Vec<QuerySummary>> {
        let payload = json!({
            "operationName": "SearchQueries",
            "variables": { "term": term },
            "query": "query SearchQueries($term: String!) { \
                queries(filters: { name: { contains: $term } }, pagination: { first: 10 }) { \
                    edges { node { id name description user { name handle } } } } }",
        });
        let data = self.graphql(payload).await?;
        Ok(parse_query_edges(&data))
    }

    async fn list_user_queries(&self, user_id: u64, limit: usize) -> Result<Vec<QuerySummary>> {
        let payload = json!({
            "operationName": "ListUserQueries",
            "variables": { "userId": user_id, "limit": limit },
            "query": "query ListUserQueries($userId: Int!, $limit: Int!) { \
                queries(filters: { userId: { equals: $userId } }, pagination: { first: $limit }) { \
                    edges { node { id name description user { name handle } } } } }",
        });
        let data = self.graphql(payload).await?;
        Ok(parse_query_edges(&data))
    }

    async fn user_id_by_handle(&self, handle: &str) -> Result<u64> {
        let payload = json!({
            "operationName": "FindUser",
            "variables": { "handle": handle },
            "query": "query FindUser($handle: String!) { \
                users(filters: { handle: { equals: $handle } }, pagination: { first: 1 }) { \
                    edges { node { id handle } } } }",
        });
        let data = self.graphql(payload).await?;
        parse_user_id(&data)
            .ok_or_else(|| Error::not_found(format!("no user with handle '{handle}'")))
    }

    async fn get_query(&self, query_id: u64) -> Result<QueryMetadata> {
        let data = self.get_json(&format!("query/{query_id}")).await?;
        parse_query_metadata(&data)
            .ok_or_else(|| Error::upstream(format!("unexpected query payload for {query_id}")))
    }

    async fn execute_query(
        &self,
        query_id: u64,
        params: &Map<String, Value>,
    ) -> Result<String> {
        let body = json!({ "query_parameters": params });
        let data = self
            .post_json(&format!("query/{query_id}/execute"), body)
            .await?;
        data.get("execution_id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| Error::upstream("execute response carried no execution_id"))
    }

    async fn job_status(&self, job_id: &str) -> Result<JobStatus> {
        let data = self.get_json(&format!("execution/{job_id}/status")).await?;
        parse_job_status(&data)
            .ok_or_else(|| Error::upstream(format!("unexpected status payload for job {job_id}")))
    }

    async fn fetch_result(&self, job_id: &str) -> Result<FetchedResult> {
        let data = self.get_json(&format!("execution/{job_id}/results")).await?;
        Ok(parse_fetched_result(&data))
    }

    async fn table_schema(&self, table: &str) -> Result<Vec<SchemaColumn>> {
        // LIMIT 0 probe: zero rows, but the platform still returns column
        // metadata (and bills the execution).
        let sql = format!("SELECT * FROM {table} LIMIT 0");
        let body = json!({ "query_sql": sql, "performance": "medium" });
        let data = self.post_json("sql/execute", body).await?;

        let columns = parse_schema_columns(&data);
        if columns.is_empty() {
            return Err(Error::upstream(format!(
                "no column metadata returned for table {table}"
            )));
        }
        Ok(columns)
    }

    async fn credit_usage(&self) -> Result<CreditUsage> {
        let data = self.get_json("auth/usage").await?;
        Ok(parse_credit_usage(&data))
    }
}

// =============================================================================
// Payload parsing (pure, unit-testable without a server)
// =============================================================================

fn parse_query_edges(data: &Value) -> Vec<QuerySummary> {
    let edges = data
        .pointer("/data/queries/edges")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    edges
        .iter()
        .filter_map(|edge| {
            let node = edge.get("node")?;
            Some(QuerySummary {
                id: node.get("id").and_then(value_as_u64)?,
                name: string_field(node, "name"),
                owner: node
                    .pointer("/user/handle")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown")
                    .to_string(),
                description: string_field(node, "description"),
            })
        })
        .collect()
}

fn parse_user_id(data: &Value) -> Option<u64> {
    data.pointer("/data/users/edges")
        .and_then(Value::as_array)?
        .first()?
        .pointer("/node/id")
        .and_then(value_as_u64)
}

fn parse_query_metadata(data: &Value) -> Option<QueryMetadata> {
    Some(QueryMetadata {
        id: data.get("query_id").or_else(|| data.get("id")).and_then(value_as_u64)?,
        name: string_field(data, "name"),
        description: string_field(data, "description"),
        sql: data
            .pointer("/query_engine/sql")
            .or_else(|| data.get("query_sql"))
            .or_else(|| data.get("sql"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        parameters: data
            .get("parameters")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default(),
    })
}

fn parse_job_status(data: &Value) -> Option<JobStatus> {
    let state = data.get("state").and_then(Value::as_str)?;
    Some(JobStatus {
        state: JobState::parse(state)?,
        error: data
            .pointer("/error/message")
            .or_else(|| data.get("error"))
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}

fn parse_fetched_result(data: &Value) -> FetchedResult {
    let rows = data.pointer("/result/rows").cloned().unwrap_or(Value::Null);
    FetchedResult {
        table: TabularResult::from_value(&rows),
        billed_credits: data
            .pointer("/result/metadata/billed_credits")
            .or_else(|| data.pointer("/result/metadata/credits_used"))
            .and_then(Value::as_f64),
    }
}

fn parse_schema_columns(data: &Value) -> Vec<SchemaColumn> {
    data.pointer("/result/metadata/columns")
        .and_then(Value::as_array)
        .map(|cols| {
            cols.iter()
                .filter_map(|col| {
                    Some(SchemaColumn {
                        name: col.get("name").and_then(Value::as_str)?.to_string(),
                        data_type: string_field(col, "type"),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

fn parse_credit_usage(data: &Value) -> CreditUsage {
    let periods = data
        .get("billing_periods")
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .map(|p| BillingPeriod {
                    start_date: string_field(p, "start_date"),
                    end_date: string_field(p, "end_date"),
                    credits_included: p
                        .get("credits_included")
                        .and_then(Value::as_f64)
                        .unwrap_or(0.0),
                    credits_used: p.get("credits_used").and_then(Value::as_f64).unwrap_or(0.0),
                })
                .collect()
        })
        .unwrap_or_default();
    CreditUsage {
        billing_periods: periods,
    }
}

fn string_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// GraphQL ids arrive as numbers or numeric strings depending on the schema.
fn value_as_u64(value: &Value) -> Option<u64> {
    value
        .as_u64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_query_edges() {
        let data = json!({
            "data": { "queries": { "edges": [
                { "node": { "id": 42, "name": "DEX volume", "description": "daily",
                            "user": { "name": "Ada", "handle": "ada" } } },
                { "node": { "id": "77", "name": "Fees", "description": null,
                            "user": {} } },
                { "node": null },
            ] } }
        });
        let summaries = parse_query_edges(&data);
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].id, 42);
        assert_eq!(summaries[0].owner, "ada");
        assert_eq!(summaries[1].id, 77);
        assert_eq!(summaries[1].owner, "unknown");
        assert_eq!(summaries[1].description, "");
    }

    #[test]
    fn test_parse_query_edges_malformed() {
        assert!(parse_query_edges(&json!({"data": null})).is_empty());
        assert!(parse_query_edges(&json!("nope")).is_empty());
    }

    #[test]
    fn test_parse_user_id() {
        let data = json!({
            "data": { "users": { "edges": [
                { "node": { "id": "3110", "handle": "ada" } },
            ] } }
        });
        assert_eq!(parse_user_id(&data), Some(3110));
        assert_eq!(parse_user_id(&json!({"data": {"users": {"edges": []}}})), None);
        assert_eq!(parse_user_id(&json!({})), None);
    }

    #[test]
    fn test_parse_query_metadata() {
        let data = json!({
            "query_id": 9, "name": "q", "description": "d",
            "query_sql": "SELECT 1", "parameters": [{"name": "p"}]
        });
        let meta = parse_query_metadata(&data).unwrap();
        assert_eq!(meta.id, 9);
        assert_eq!(meta.sql, "SELECT 1");
        assert_eq!(meta.parameters.len(), 1);
    }

    #[test]
    fn test_parse_job_status_with_error() {
        let data = json!({"state": "QUERY_STATE_FAILED", "error": "Column 'x' not found"});
        let status = parse_job_status(&data).unwrap();
        assert_eq!(status.state, JobState::Failed);
        assert_eq!(status.error.as_deref(), Some("Column 'x' not found"));
    }

    #[test]
    fn test_parse_job_status_unknown_state() {
        assert!(parse_job_status(&json!({"state": "QUERY_STATE_MYSTERY"})).is_none());
        assert!(parse_job_status(&json!({})).is_none());
    }

    #[test]
    fn test_parse_fetched_result() {
        let data = json!({
            "result": {
                "rows": [{"a": 1}, {"a": 2}],
                "metadata": { "billed_credits": 4.5 }
            }
        });
        let fetched = parse_fetched_result(&data);
        assert_eq!(fetched.table.row_count(), 2);
        assert_eq!(fetched.billed_credits, Some(4.5));
    }

    #[test]
    fn test_parse_fetched_result_missing_rows_is_empty() {
        let fetched = parse_fetched_result(&json!({"result": {}}));
        assert!(fetched.table.is_empty());
        assert!(fetched.billed_credits.is_none());
    }

    #[test]
    fn test_parse_schema_columns() {
        let data = json!({
            "result": { "metadata": { "columns": [
                {"name": "block_time", "type": "timestamp"},
                {"name": "value", "type": "double"},
            ] } }
        });
        let columns = parse_schema_columns(&data);
        assert_eq!(columns.len(), 2);
        assert_eq!(columns[0].name, "block_time");
        assert_eq!(columns[1].data_type, "double");
    }

    #[test]
    fn test_parse_credit_usage() {
        let data = json!({ "billing_periods": [{
            "start_date": "2026-08-01", "end_date": "2026-08-31",
            "credits_included": 2500.0, "credits_used": 813.5
        }] });
        let usage = parse_credit_usage(&data);
        assert_eq!(usage.billing_periods.len(), 1);
        assert!((usage.billing_periods[0].credits_used - 813.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_new_rejects_missing_api_key() {
        let config = PlatformConfig::default();
        assert!(HttpPlatform::new(config).is_err());
    }
}
