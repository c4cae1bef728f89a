//! QueryDeck stdio tool server - main entry point.
//!
//! Speaks line-delimited JSON over stdin/stdout: one request object per line,
//! one response object per line. Requests name a tool and its arguments; the
//! reserved tool name `list_tools` returns the catalog. All tool calls for the
//! session run through one lock, which keeps budget authorize/commit pairs
//! atomic.

use std::sync::Arc;

use clap::Parser;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;

use querydeck::platform::HttpPlatform;
use querydeck::tools::{dispatch, Toolbox, CATALOG};
use querydeck::Config;

#[derive(Debug, Parser)]
#[command(name = "querydeck", about = "Session-guarded analytics-query tool server")]
struct Args {
    /// Path to an env file loaded before reading configuration.
    #[arg(long, default_value = ".env")]
    env_file: String,
}

#[derive(Debug, Deserialize)]
struct Request {
    #[serde(default)]
    id: Option<Value>,
    tool: String,
    #[serde(default)]
    args: Value,
}

#[derive(Debug, Serialize)]
struct Response {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<Value>,
    reply: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Load configuration (.env first, then the process environment; a missing
    // env file is fine, the environment may carry everything)
    let _ = dotenvy::from_filename(&args.env_file);
    let config = Config::from_env()?;

    // Initialize observability
    querydeck::observability::init_tracing(config.observability.log_format);

    // One session per process; the lock serializes tool calls
    let platform = Arc::new(HttpPlatform::new(config.platform.clone())?);
    let toolbox = Arc::new(Mutex::new(Toolbox::new(&config, platform)?));

    tracing::info!("querydeck stdio server starting");
    tracing::info!(tools = CATALOG.len(), "tool catalog loaded");

    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    let mut lines = stdin.lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<Request>(&line) {
            Ok(request) => {
                let reply = if request.tool == "list_tools" {
                    render_catalog()
                } else {
                    let mut toolbox = toolbox.lock().await;
                    dispatch(&mut toolbox, &request.tool, &request.args).await
                };
                Response {
                    id: request.id,
                    reply,
                }
            }
            Err(err) => Response {
                id: None,
                reply: format!("Error: malformed request: {err}"),
            },
        };

        let mut out = serde_json::to_string(&response)?;
        out.push('\n');
        stdout.write_all(out.as_bytes()).await?;
        stdout.flush().await?;
    }

    tracing::info!("stdin closed, shutting down");
    Ok(())
}

fn render_catalog() -> String {
    let tools: Vec<Value> = CATALOG
        .iter()
        .map(|tool| {
            serde_json::json!({
                "name": tool.name,
                "description": tool.description,
                "params": tool.params.iter().map(|p| serde_json::json!({
                    "name": p.name,
                    "type": p.kind,
                    "description": p.description,
                    "required": p.required,
                })).collect::<Vec<_>>(),
            })
        })
        .collect();
    serde_json::to_string(&tools).unwrap_or_default()
}
