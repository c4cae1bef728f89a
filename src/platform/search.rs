//! Schema-reference search against a public code repository.
//!
//! Locates reference schema definitions (SQL models and `schema.yml` files)
//! in a configured repository through the public code-search API, and fetches
//! raw file content. Costs no platform credits, so it is never governor-gated.

use serde::Serialize;
use serde_json::Value;

use crate::types::{Error, PlatformConfig, Result};

const CODE_SEARCH_URL: &str = "https://api.github.com/search/code";
const RAW_CONTENT_URL: &str = "https://raw.githubusercontent.com";
const USER_AGENT: &str = concat!("querydeck/", env!("CARGO_PKG_VERSION"));

/// One matching reference file.
#[derive(Debug, Clone, Serialize)]
pub struct ReferenceHit {
    pub name: String,
    pub path: String,
    pub url: String,
    /// "sql_model" or "schema_definition".
    pub kind: &'static str,
}

/// Client for the schema-reference repository.
#[derive(Debug, Clone)]
pub struct ReferenceSearch {
    client: reqwest::Client,
    repo: String,
    token: Option<String>,
}

impl ReferenceSearch {
    pub fn new(config: &PlatformConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            client,
            repo: config.reference_repo.clone(),
            token: config.search_token.clone(),
        })
    }

    /// Search the repository for SQL models and schema definitions matching
    /// `keyword`. Both searches run; a failure in one degrades to the other's
    /// results rather than failing the whole lookup.
    pub async fn search_definitions(&self, keyword: &str) -> Result<Vec<ReferenceHit>> {
        let sql_query = format!("{keyword} repo:{} in:file extension:sql", self.repo);
        let yml_query = format!("{keyword} repo:{} in:file filename:schema.yml", self.repo);

        let mut hits = Vec::new();
        match self.code_search(&sql_query).await {
            Ok(items) => hits.extend(parse_search_items(&items, "sql_model")),
            Err(err) => tracing::warn!(%err, "sql model search failed"),
        }
        match self.code_search(&yml_query).await {
            Ok(items) => hits.extend(parse_search_items(&items, "schema_definition")),
            Err(err) => tracing::warn!(%err, "schema definition search failed"),
        }
        Ok(hits)
    }

    /// Raw content of a file in the repository's default branch.
    pub async fn file_content(&self, path: &str) -> Result<String> {
        let url = format!("{RAW_CONTENT_URL}/{}/main/{}", self.repo, path.trim_start_matches('/'));
        let response = self
            .client
            .get(&url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::not_found(format!("no such reference file: {path}")));
        }
        if !response.status().is_success() {
            return Err(Error::upstream(format!(
                "reference content fetch returned {}",
                response.status()
            )));
        }
        Ok(response.text().await?)
    }

    async fn code_search(&self, query: &str) -> Result<Value> {
        let url = format!("{CODE_SEARCH_URL}?q={}", urlencoding::encode(query));
        let mut request = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/vnd.github.v3+json")
            .header(reqwest::header::USER_AGENT, USER_AGENT);
        if let Some(token) = &self.token {
            request = request.header(reqwest::header::AUTHORIZATION, format!("token {token}"));
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(Error::upstream(format!(
                "code search returned {}",
                response.status()
            )));
        }
        Ok(response.json().await?)
    }
}

fn parse_search_items(data: &Value, kind: &'static str) -> Vec<ReferenceHit> {
    data.get("items")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    Some(ReferenceHit {
                        name: item.get("name").and_then(Value::as_str)?.to_string(),
                        path: item.get("path").and_then(Value::as_str)?.to_string(),
                        url: item
                            .get("html_url")
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_string(),
                        kind,
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

// =============================================================================
// Tests
// =============================================================================
