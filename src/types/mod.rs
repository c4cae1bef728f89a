//! Core types for querydeck.
//!
//! This module provides foundational types used throughout the system:
//! - **Errors**: Application error types with thiserror derives
//! - **Config**: Configuration structures for budgets, cache, platform, export

mod config;
mod errors;

pub use config::{
    BudgetConfig, CacheConfig, Config, ExportConfig, LogFormat, ObservabilityConfig,
    PlatformConfig,
};
pub use errors::{Error, Result};
