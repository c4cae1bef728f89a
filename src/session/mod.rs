//! Session state — budget governor and response cache.
//!
//! The Session owns all mutable per-session state. Subsystems (budget, cache)
//! are plain structs owned by the Session, not separate actors; the transport
//! holds the whole thing behind one lock and processes one request at a time,
//! which keeps every authorize/commit pair atomic.

pub mod budget;
pub mod cache;

pub use budget::{ActionKind, BudgetDimension, BudgetManager, BudgetStatus};
pub use cache::ResponseCache;

use std::collections::HashSet;

use crate::types::Config;

/// Cache namespace for fetched query metadata (terminal, immutable).
pub const NS_QUERY: &str = "query";
/// Cache namespace for terminal job states (never pending states).
pub const NS_STATUS: &str = "status";

/// Per-session mutable state. One instance per session; multiple sessions can
/// coexist in one host process, there is no ambient singleton.
#[derive(Debug)]
pub struct Session {
    pub budget: BudgetManager,
    pub cache: ResponseCache,
    /// Jobs whose billed cost has already been folded into the governor.
    reconciled_jobs: HashSet<String>,
}

impl Session {
    pub fn new(config: &Config) -> Self {
        Self {
            budget: BudgetManager::new(config.budget.clone()),
            cache: ResponseCache::new(config.cache.default_ttl),
            reconciled_jobs: HashSet::new(),
        }
    }

    /// Fold a job's billed cost into the governor exactly once.
    ///
    /// A job's cost is a terminal fact, but callers may fetch the same result
    /// repeatedly (summary, analysis, export); re-applying the delta on each
    /// fetch would inflate the credit total past what was actually spent.
    /// Returns whether the delta was applied.
    pub fn reconcile_billed_credits(&mut self, job_id: &str, billed: f64) -> bool {
        if !self.reconciled_jobs.insert(job_id.to_string()) {
            return false;
        }
        self.budget.commit_credits(billed);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sessions_are_independent() {
        let config = Config::default();
        let mut a = Session::new(&config);
        let b = Session::new(&config);

        a.budget.commit(ActionKind::QueryExecution, 10.0);
        assert_eq!(a.budget.status().queries.used, 1.0);
        assert_eq!(b.budget.status().queries.used, 0.0);
    }

    #[test]
    fn test_billed_credits_applied_once_per_job() {
        let mut session = Session::new(&Config::default());

        assert!(session.reconcile_billed_credits("job-1", 30.0));
        assert!(!session.reconcile_billed_credits("job-1", 30.0));
        assert!((session.budget.status().credits.used - 30.0).abs() < f64::EPSILON);

        // A different job reconciles independently.
        assert!(session.reconcile_billed_credits("job-2", 5.0));
        assert!((session.budget.status().credits.used - 35.0).abs() < f64::EPSILON);
    }
}
