//! Tool operation handlers.
//!
//! One method per callable operation. Every handler runs the same shape:
//! authorize against the session budget where the action is billable, invoke
//! the platform, report back to the governor, and hand tabular payloads to
//! the analysis engine or the classifier for presentation.

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::analysis::{self, AnalysisConfig, TabularResult};
use crate::diagnose;
use crate::platform::{JobState, QueryMetadata, QueryPlatform, ReferenceSearch};
use crate::session::{ActionKind, Session, NS_QUERY, NS_STATUS};
use crate::types::{Config, Result};

/// The tool surface: session state plus collaborators.
pub struct Toolbox {
    platform: Arc<dyn QueryPlatform>,
    reference: ReferenceSearch,
    session: Session,
    analysis: AnalysisConfig,
    export_dir: PathBuf,
}

impl std::fmt::Debug for Toolbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Toolbox")
            .field("session", &self.session)
            .field("export_dir", &self.export_dir)
            .finish_non_exhaustive()
    }
}

impl Toolbox {
    pub fn new(config: &Config, platform: Arc<dyn QueryPlatform>) -> Result<Self> {
        Ok(Self {
            platform,
            reference: ReferenceSearch::new(&config.platform)?,
            session: Session::new(config),
            analysis: AnalysisConfig::default(),
            export_dir: PathBuf::from(&config.export.directory),
        })
    }

    /// Account-level billing totals. Presentation only; the session governor
    /// keeps its own accounting.
    pub async fn account_status(&self) -> Result<String> {
        let usage = self.platform.credit_usage().await?;
        let Some(period) = usage.billing_periods.first() else {
            return Ok("Account status: no billing period reported.".to_string());
        };
        let remaining = period.credits_included - period.credits_used;
        Ok(format!(
            "Account Status:\n\
             - Credits Used: {:.0}\n\
             - Credits Limit: {:.0}\n\
             - Remaining: {:.0}\n\
             - Period: {} to {}",
            period.credits_used,
            period.credits_included,
            remaining,
            period.start_date,
            period.end_date
        ))
    }

    /// Remaining session limits — the internal safety guard for this session.
    pub fn session_budget(&self) -> String {
        let status = self.session.budget.status();
        format!(
            "Session Budget:\n\
             - Queries: {:.0}/{:.0} used\n\
             - Credits: {:.1}/{:.0} used\n\
             - Schema Calls: {:.0}/{:.0} used",
            status.queries.used,
            status.queries.limit,
            status.credits.used,
            status.credits.limit,
            status.schema_calls.used,
            status.schema_calls.limit
        )
    }

    /// Keyword search over public queries. Prefer reusing an existing query
    /// over writing new SQL.
    pub async fn search_public_queries(&self, term: &str) -> Result<String> {
        let results = self.platform.search_queries(term).await?;
        if results.is_empty() {
            return Ok(format!("No public queries found matching '{term}'."));
        }
        let lines: Vec<String> = results
            .iter()
            .take(10)
            .map(|q| format!("ID: {} | Name: {} | Owner: {}", q.id, q.name, q.owner))
            .collect();
        Ok(lines.join("\n"))
    }

    /// Resolve a profile handle to its numeric user id.
    pub async fn user_id_for_handle(&self, handle: &str) -> Result<u64> {
        self.platform.user_id_by_handle(handle).await
    }

    /// List queries owned by a user.
    pub async fn list_user_queries(&self, user_id: u64, limit: usize) -> Result<String> {
        let results = self.platform.list_user_queries(user_id, limit).await?;
        if results.is_empty() {
            return Ok(format!("No queries found for user {user_id}."));
        }
        let lines: Vec<String> = results
            .iter()
            .map(|q| format!("ID: {} | Name: {} | Owner: {}", q.id, q.name, q.owner))
            .collect();
        Ok(lines.join("\n"))
    }

    /// Full SQL, description and parameters for a saved query. Metadata is
    /// immutable once fetched, so it is cached for the session.
    pub async fn query_details(&mut self, query_id: u64) -> Result<String> {
        let meta = self.fetch_query_metadata(query_id).await?;
        Ok(format!(
            "Query ID: {}\nName: {}\nDescription: {}\nParameters: {}\nSQL:\n{}",
            meta.id,
            meta.name,
            meta.description,
            serde_json::to_string(&meta.parameters)?,
            meta.sql
        ))
    }

    /// Start an execution. Checks the budget first; returns a job id to poll.
    pub async fn execute_query(
        &mut self,
        query_id: u64,
        params: Map<String, Value>,
    ) -> Result<String> {
        // True cost is unknown until the result is fetched; authorize and
        // commit at zero and reconcile via the billed-credits delta later.
        self.session.budget.authorize(ActionKind::QueryExecution, 0.0)?;
        let job_id = self.platform.execute_query(query_id, &params).await?;
        self.session.budget.commit(ActionKind::QueryExecution, 0.0);

        tracing::info!(query_id, job_id = %job_id, "execution started");
        Ok(format!(
            "Execution started. Job ID: {job_id}. Use 'get_job_status' to check progress."
        ))
    }

    /// Current state of a job. Terminal states are cached; pending states are
    /// always re-polled.
    pub async fn job_status(&mut self, job_id: &str) -> Result<String> {
        let state = self.resolve_state(job_id).await?;
        Ok(format!("Job {job_id} is {state}"))
    }

    /// Preview and summary of a completed job's results. Returns the shape
    /// and lightweight stats, not the full dataset.
    pub async fn job_results_summary(
        &mut self,
        job_id: &str,
        preview_limit: usize,
    ) -> Result<String> {
        let Some(table) = self.completed_result(job_id).await? else {
            return self.not_complete_message(job_id).await;
        };

        let summary = analysis::summarize(&table, preview_limit);
        if let Some(note) = &summary.note {
            return Ok(note.clone());
        }

        let stats: Vec<String> = summary
            .stats
            .iter()
            .map(|s| {
                format!(
                    "  {}: min {:.4}, max {:.4}, mean {:.4}",
                    s.name, s.min, s.max, s.mean
                )
            })
            .collect();
        Ok(format!(
            "Row Count: {}\nColumns: {}\nPreview (first {} rows):\n{}\nStats:\n{}\n\
             Tip: To see all data, use 'export_results_to_csv'.",
            summary.row_count,
            summary.columns.join(", "),
            summary.preview.len(),
            serde_json::to_string_pretty(&summary.preview)?,
            if stats.is_empty() {
                "  (no numeric columns)".to_string()
            } else {
                stats.join("\n")
            }
        ))
    }

    /// Outlier and trend inspection of a completed job's numeric columns.
    pub async fn analyze_job_results(&mut self, job_id: &str) -> Result<String> {
        let Some(table) = self.completed_result(job_id).await? else {
            return self.not_complete_message(job_id).await;
        };
        if table.is_empty() {
            return Ok("No data returned.".to_string());
        }

        let reports = analysis::detect_outliers_and_trend(&table, &self.analysis);
        if reports.is_empty() {
            return Ok("No numeric columns to analyze.".to_string());
        }

        let lines: Vec<String> = reports
            .iter()
            .map(|r| {
                let trend = r
                    .trend
                    .map(|t| format!(", trend {t}"))
                    .unwrap_or_default();
                let samples = if r.sample_outliers.is_empty() {
                    String::new()
                } else {
                    format!(" (e.g. {:?})", r.sample_outliers)
                };
                format!(
                    "- {}: mean {:.4}, std dev {:.4}, {} outlier(s){}{}",
                    r.name, r.mean, r.std_dev, r.outlier_count, samples, trend
                )
            })
            .collect();
        Ok(format!("Column analysis:\n{}", lines.join("\n")))
    }

    /// Classify why a job failed. When the caller names the failing query the
    /// offending SQL is included; when it names a table (and the schema-call
    /// budget allows) the diagnosis proposes the closest valid column name.
    pub async fn diagnose_job_failure(
        &mut self,
        job_id: &str,
        query_id: Option<u64>,
        table: Option<&str>,
    ) -> Result<String> {
        let status = self.platform.job_status(job_id).await?;
        if status.state != JobState::Failed {
            return Ok(format!(
                "Job {job_id} is {} — diagnosis applies to failed jobs only.",
                status.state
            ));
        }

        let error_text = status
            .error
            .unwrap_or_else(|| "unknown failure (platform reported no message)".to_string());

        let sql = match query_id {
            Some(id) => self.fetch_query_metadata(id).await.map(|m| m.sql).ok(),
            None => None,
        };
        let sql = sql.unwrap_or_default();

        let known_names = match table {
            Some(table) => self.schema_names_within_budget(table).await,
            None => Vec::new(),
        };

        let diagnosis = diagnose::classify_with_schema(&error_text, &sql, &known_names);
        let mut out = format!(
            "Job {job_id} failed.\nCategory: {}\nError: {error_text}",
            diagnosis.category
        );
        if let Some(suggestion) = diagnosis.suggestion {
            out.push_str(&format!("\nSuggestion: {suggestion}"));
        }
        Ok(out)
    }

    /// Export the full dataset of a completed job to a CSV file.
    pub async fn export_results_to_csv(&mut self, job_id: &str) -> Result<String> {
        let Some(table) = self.completed_result(job_id).await? else {
            return self.not_complete_message(job_id).await;
        };

        match analysis::write_csv(&table, &self.export_dir, job_id)? {
            Some(path) => Ok(format!("Success! Data saved to: {}", path.display())),
            None => Ok("No data to export.".to_string()),
        }
    }

    /// Column names and types for a table. Consumes platform credits, so it
    /// is gated as a schema call.
    pub async fn table_schema(&mut self, table: &str) -> Result<String> {
        self.session.budget.authorize(ActionKind::SchemaCall, 0.0)?;
        let columns = self.platform.table_schema(table).await?;
        self.session.budget.commit(ActionKind::SchemaCall, 0.0);

        let lines: Vec<String> = columns
            .iter()
            .map(|c| format!("- {} ({})", c.name, c.data_type))
            .collect();
        Ok(format!("Schema for {table}:\n{}", lines.join("\n")))
    }

    /// Search the reference repository for schema definitions and SQL models.
    pub async fn search_schema_definitions(&self, keyword: &str) -> Result<String> {
        let hits = self.reference.search_definitions(keyword).await?;
        if hits.is_empty() {
            return Ok(format!("No reference definitions found for '{keyword}'."));
        }
        let lines: Vec<String> = hits
            .iter()
            .map(|h| format!("[{}] {} — {}", h.kind, h.path, h.url))
            .collect();
        Ok(lines.join("\n"))
    }

    /// Raw content of a reference file.
    pub async fn schema_definition_file(&self, path: &str) -> Result<String> {
        self.reference.file_content(path).await
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Job state with terminal-state caching. Pending/executing states are
    /// never cached — that would starve later polls of true progress.
    async fn resolve_state(&mut self, job_id: &str) -> Result<JobState> {
        if let Some(cached) = self.session.cache.get(NS_STATUS, job_id) {
            if let Some(state) = JobState::parse(&cached) {
                return Ok(state);
            }
        }

        let status = self.platform.job_status(job_id).await?;
        if status.state.is_terminal() {
            self.session.cache.set(NS_STATUS, job_id, status.state.as_str());
        }
        Ok(status.state)
    }

    /// Fetch the result table of a job, or `None` when the job has not
    /// completed. Reconciles the governor's credit total with the billed cost
    /// the first time a job's result is seen; repeat fetches of the same job
    /// never re-apply the delta.
    async fn completed_result(&mut self, job_id: &str) -> Result<Option<TabularResult>> {
        if self.resolve_state(job_id).await? != JobState::Completed {
            return Ok(None);
        }

        let fetched = self.platform.fetch_result(job_id).await?;
        if let Some(billed) = fetched.billed_credits {
            if self.session.reconcile_billed_credits(job_id, billed) {
                tracing::debug!(job_id = %job_id, billed, "reconciled billed credits");
            }
        }
        Ok(Some(fetched.table))
    }

    async fn not_complete_message(&mut self, job_id: &str) -> Result<String> {
        let state = self.resolve_state(job_id).await?;
        Ok(format!("Job is not complete (Status: {state}). Please wait."))
    }

    async fn fetch_query_metadata(&mut self, query_id: u64) -> Result<QueryMetadata> {
        let key = query_id.to_string();
        if let Some(cached) = self.session.cache.get(NS_QUERY, &key) {
            if let Ok(meta) = serde_json::from_str(&cached) {
                return Ok(meta);
            }
        }

        let meta = self.platform.get_query(query_id).await?;
        self.session
            .cache
            .set(NS_QUERY, &key, serde_json::to_string(&meta)?);
        Ok(meta)
    }

    /// Schema names for suggestions, best effort: an exhausted schema-call
    /// budget or a failed probe degrades to no candidates rather than failing
    /// the diagnosis.
    async fn schema_names_within_budget(&mut self, table: &str) -> Vec<String> {
        if self.session.budget.authorize(ActionKind::SchemaCall, 0.0).is_err() {
            return Vec::new();
        }
        match self.platform.table_schema(table).await {
            Ok(columns) => {
                self.session.budget.commit(ActionKind::SchemaCall, 0.0);
                columns.into_iter().map(|c| c.name).collect()
            }
            Err(err) => {
                tracing::warn!(%err, table, "schema probe for diagnosis failed");
                Vec::new()
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn budget_status(&self) -> crate::session::BudgetStatus {
        self.session.budget.status()
    }
}

// =============================================================================
// Tests
// =============================================================================
