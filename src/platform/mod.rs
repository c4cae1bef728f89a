//! Remote platform collaborators.
//!
//! The analytics platform is an opaque remote service reached through a small
//! RPC-like surface; [`QueryPlatform`] is that seam. All blocking I/O lives
//! behind it — the core components never touch the network. `http` is the
//! production client, `search` the schema-reference code-search client.

pub mod http;
pub mod search;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::analysis::TabularResult;
use crate::types::Result;

pub use http::HttpPlatform;
pub use search::{ReferenceHit, ReferenceSearch};

/// One public query as returned by search/listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuerySummary {
    pub id: u64,
    pub name: String,
    pub owner: String,
    pub description: String,
}

/// Full metadata for a saved query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryMetadata {
    pub id: u64,
    pub name: String,
    pub description: String,
    pub sql: String,
    pub parameters: Vec<Value>,
}

/// Normalized execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    Pending,
    Executing,
    Completed,
    Failed,
    Cancelled,
}

impl JobState {
    /// Terminal states are immutable facts and safe to cache.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed | JobState::Cancelled)
    }

    /// Normalize a raw platform state string (`QUERY_STATE_COMPLETED`,
    /// `ExecutionState.FAILED`, plain `PENDING`, …).
    pub fn parse(raw: &str) -> Option<Self> {
        let tail = raw
            .rsplit(['_', '.'])
            .next()
            .unwrap_or(raw)
            .to_ascii_uppercase();
        match tail.as_str() {
            "PENDING" | "QUEUED" => Some(JobState::Pending),
            "EXECUTING" | "RUNNING" => Some(JobState::Executing),
            "COMPLETED" | "SUCCEEDED" => Some(JobState::Completed),
            "FAILED" => Some(JobState::Failed),
            "CANCELLED" | "CANCELED" => Some(JobState::Cancelled),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobState::Pending => "PENDING",
            JobState::Executing => "EXECUTING",
            JobState::Completed => "COMPLETED",
            JobState::Failed => "FAILED",
            JobState::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Execution status: normalized state plus the platform's failure message
/// when the job failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatus {
    pub state: JobState,
    pub error: Option<String>,
}

/// A fetched result set plus the billed cost when the platform reports one.
#[derive(Debug, Clone)]
pub struct FetchedResult {
    pub table: TabularResult,
    pub billed_credits: Option<f64>,
}

/// Column name/type pair from schema introspection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaColumn {
    pub name: String,
    pub data_type: String,
}

/// One billing period of account-level credit usage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingPeriod {
    pub start_date: String,
    pub end_date: String,
    pub credits_included: f64,
    pub credits_used: f64,
}

/// Account-level credit usage (presentation only; the session governor keeps
/// its own accounting).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreditUsage {
    pub billing_periods: Vec<BillingPeriod>,
}

/// The analytics-platform seam. One implementation speaks HTTP; tests mock it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QueryPlatform: Send + Sync {
    /// Keyword search over public queries.
    async fn search_queries(&self, term: &str) -> Result<Vec<QuerySummary>>;

    /// List queries owned by a user.
    async fn list_user_queries(&self, user_id: u64, limit: usize) -> Result<Vec<QuerySummary>>;

    /// Numeric user id for a profile handle. `NotFound` when no user carries
    /// the handle.
    async fn user_id_by_handle(&self, handle: &str) -> Result<u64>;

    /// Full metadata (including SQL) for a saved query.
    async fn get_query(&self, query_id: u64) -> Result<QueryMetadata>;

    /// Start an execution and return the opaque job id without waiting.
    async fn execute_query(
        &self,
        query_id: u64,
        params: &serde_json::Map<String, Value>,
    ) -> Result<String>;

    /// Current status of a job.
    async fn job_status(&self, job_id: &str) -> Result<JobStatus>;

    /// Full result set of a completed job.
    async fn fetch_result(&self, job_id: &str) -> Result<FetchedResult>;

    /// Column name/type pairs for a table. Billed by the platform like any
    /// execution — callers gate this through the budget governor.
    async fn table_schema(&self, table: &str) -> Result<Vec<SchemaColumn>>;

    /// Billing-period totals for the account.
    async fn credit_usage(&self) -> Result<CreditUsage>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_normalization() {
        assert_eq!(JobState::parse("QUERY_STATE_COMPLETED"), Some(JobState::Completed));
        assert_eq!(JobState::parse("ExecutionState.FAILED"), Some(JobState::Failed));
        assert_eq!(JobState::parse("pending"), Some(JobState::Pending));
        assert_eq!(JobState::parse("QUERY_STATE_CANCELED"), Some(JobState::Cancelled));
        assert_eq!(JobState::parse("QUERY_STATE_BANANAS"), None);
    }

    #[test]
    fn test_terminal_states() {
        assert!(JobState::Completed.is_terminal());
        assert!(JobState::Failed.is_terminal());
        assert!(JobState::Cancelled.is_terminal());
        assert!(!JobState::Pending.is_terminal());
        assert!(!JobState::Executing.is_terminal());
    }
}
