//! Tool surface.
//!
//! `registry` declares the catalog and routes calls; `ops` implements the
//! handlers on [`Toolbox`]. The transport holds one `Toolbox` per session
//! behind a lock and feeds calls through [`registry::dispatch`].

pub mod ops;
pub mod registry;

pub use ops::Toolbox;
pub use registry::{dispatch, find_tool, ToolDef, ToolParam, CATALOG};
