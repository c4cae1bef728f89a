//! Session budget governor.
//!
//! Gates and meters three independent consumables per session: query
//! executions, credit spend, and schema-introspection calls. Check-then-commit:
//! an authorization that would push any total past its limit is refused before
//! any counter moves.

use serde::{Deserialize, Serialize};

use crate::types::{BudgetConfig, Error, Result};

/// Billable action kinds the governor gates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    QueryExecution,
    SchemaCall,
}

/// Budget dimension named in denials and status reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetDimension {
    Queries,
    Credits,
    SchemaCalls,
}

impl std::fmt::Display for BudgetDimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BudgetDimension::Queries => write!(f, "queries"),
            BudgetDimension::Credits => write!(f, "credits"),
            BudgetDimension::SchemaCalls => write!(f, "schema calls"),
        }
    }
}

/// Usage/limit pair for one dimension.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct DimensionStatus {
    pub used: f64,
    pub limit: f64,
}

/// Read-only snapshot of all three dimensions.
#[derive(Debug, Clone, Serialize)]
pub struct BudgetStatus {
    pub queries: DimensionStatus,
    pub credits: DimensionStatus,
    pub schema_calls: DimensionStatus,
}

/// Running totals. Owned exclusively by the governor, monotonically
/// non-decreasing, reset only by process restart.
#[derive(Debug, Default, Clone, Copy)]
struct BudgetUsage {
    queries: u32,
    credits: f64,
    schema_calls: u32,
}

/// Budget governor — the session's spend guard.
///
/// NOT a separate actor - owned by the Session and called via &mut self. The
/// session lock serializes authorize/commit pairs, so a check can never be
/// interleaved with another caller's commit.
#[derive(Debug)]
pub struct BudgetManager {
    limits: BudgetConfig,
    usage: BudgetUsage,
}

impl BudgetManager {
    pub fn new(limits: BudgetConfig) -> Self {
        Self {
            limits,
            usage: BudgetUsage::default(),
        }
    }

    /// Check whether an action of `kind` with `estimated_cost` credits would
    /// fit every dimension. Denial carries the failing dimension and the total
    /// the grant would have reached. Never mutates state.
    pub fn authorize(&self, kind: ActionKind, estimated_cost: f64) -> Result<()> {
        match kind {
            ActionKind::QueryExecution => {
                let attempted = self.usage.queries + 1;
                if attempted > self.limits.max_queries {
                    return Err(Self::denial(
                        BudgetDimension::Queries,
                        attempted as f64,
                        self.limits.max_queries as f64,
                    ));
                }
            }
            ActionKind::SchemaCall => {
                let attempted = self.usage.schema_calls + 1;
                if attempted > self.limits.max_schema_calls {
                    return Err(Self::denial(
                        BudgetDimension::SchemaCalls,
                        attempted as f64,
                        self.limits.max_schema_calls as f64,
                    ));
                }
            }
        }

        let attempted_credits = self.usage.credits + estimated_cost;
        if attempted_credits > self.limits.max_credits {
            return Err(Self::denial(
                BudgetDimension::Credits,
                attempted_credits,
                self.limits.max_credits,
            ));
        }

        Ok(())
    }

    /// Record a performed action: the relevant count moves by 1, credits by
    /// `actual_cost`.
    ///
    /// `actual_cost` may be 0 when the true cost is unknown at commit time
    /// (execution just started, billed credits not yet reported); callers that
    /// learn the real cost later add it via [`commit_credits`]. Sessions that
    /// never fetch a result under-count credits — a known approximation, the
    /// billing model is external and opaque.
    ///
    /// [`commit_credits`]: BudgetManager::commit_credits
    pub fn commit(&mut self, kind: ActionKind, actual_cost: f64) {
        match kind {
            ActionKind::QueryExecution => self.usage.queries += 1,
            ActionKind::SchemaCall => self.usage.schema_calls += 1,
        }
        self.usage.credits += actual_cost;
        tracing::debug!(
            kind = ?kind,
            cost = actual_cost,
            queries = self.usage.queries,
            credits = self.usage.credits,
            "budget commit"
        );
    }

    /// Add a late-arriving credit delta (billed cost discovered after commit).
    pub fn commit_credits(&mut self, delta: f64) {
        self.usage.credits += delta;
    }

    /// Read-only snapshot of used/limit per dimension. No side effects.
    pub fn status(&self) -> BudgetStatus {
        BudgetStatus {
            queries: DimensionStatus {
                used: self.usage.queries as f64,
                limit: self.limits.max_queries as f64,
            },
            credits: DimensionStatus {
                used: self.usage.credits,
                limit: self.limits.max_credits,
            },
            schema_calls: DimensionStatus {
                used: self.usage.schema_calls as f64,
                limit: self.limits.max_schema_calls as f64,
            },
        }
    }

    fn denial(dimension: BudgetDimension, attempted: f64, limit: f64) -> Error {
        Error::BudgetExceeded {
            dimension,
            attempted,
            limit,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
