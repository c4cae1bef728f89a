//! # QueryDeck - Session-Guarded Analytics Query Server
//!
//! Rust implementation of a tool server for a remote analytics-query platform,
//! providing:
//! - Session budget enforcement (query executions, credits, schema calls)
//! - TTL response caching of terminal facts (query metadata, finished jobs)
//! - Result analysis: summaries, z-score outliers, trend detection, CSV export
//! - Execution-failure diagnosis with schema-aware suggestions
//! - Schema-reference search over a public code repository
//!
//! ## Architecture
//!
//! The session owns all mutable state; the transport serializes tool calls
//! through one lock so every authorize/commit pair is atomic:
//! ```text
//!                    ┌─────────────────────────────────┐
//!   tool calls    →  │            Toolbox              │
//!                    │  ┌─────────┐ ┌─────────┐        │
//!                    │  │ Budget  │ │Response │        │
//!                    │  │Governor │ │  Cache  │        │
//!                    │  └─────────┘ └─────────┘        │
//!                    │  ┌─────────┐ ┌─────────┐        │
//!                    │  │Analysis │ │Diagnose │        │
//!                    │  │ Engine  │ │  Rules  │        │
//!                    │  └─────────┘ └─────────┘        │
//!                    └───────────┬─────────────────────┘
//!                                │ QueryPlatform (HTTP)
//!                                ▼
//!                        analytics platform
//! ```

// Enforce strict safety at compile time
#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]
#![warn(rust_2018_idioms)]

// Re-export public API
pub mod analysis;
pub mod diagnose;
pub mod observability;
pub mod platform;
pub mod session;
pub mod tools;
pub mod types;

pub use tools::Toolbox;
pub use types::{Config, Error, Result};
