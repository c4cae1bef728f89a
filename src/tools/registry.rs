//! Tool catalog and dispatch.
//!
//! The catalog is a static description of every callable operation; dispatch
//! validates arguments, routes to the matching [`Toolbox`] handler and folds
//! every failure into readable reply text. A tool call never surfaces a raw
//! error to the caller.

use serde_json::Value;

use crate::tools::Toolbox;
use crate::types::Error;

/// One declared tool argument.
#[derive(Debug, Clone, Copy)]
pub struct ToolParam {
    pub name: &'static str,
    pub description: &'static str,
    /// JSON type name: "string", "integer" or "object".
    pub kind: &'static str,
    pub required: bool,
}

/// Static description of one callable tool.
#[derive(Debug, Clone, Copy)]
pub struct ToolDef {
    pub name: &'static str,
    pub description: &'static str,
    pub params: &'static [ToolParam],
}

const fn required(name: &'static str, kind: &'static str, description: &'static str) -> ToolParam {
    ToolParam {
        name,
        description,
        kind,
        required: true,
    }
}

const fn optional(name: &'static str, kind: &'static str, description: &'static str) -> ToolParam {
    ToolParam {
        name,
        description,
        kind,
        required: false,
    }
}

/// Every tool the server exposes, in presentation order.
pub const CATALOG: &[ToolDef] = &[
    ToolDef {
        name: "get_account_status",
        description: "Account-level credit usage for the current billing period.",
        params: &[],
    },
    ToolDef {
        name: "get_session_budget",
        description: "Remaining session limits for queries, credits and schema calls.",
        params: &[],
    },
    ToolDef {
        name: "search_public_queries",
        description: "Search public queries by keyword. Prefer reusing an existing \
                      query over writing new SQL.",
        params: &[required("search_term", "string", "Keyword to search for")],
    },
    ToolDef {
        name: "list_user_queries",
        description: "List saved queries owned by a user, identified by numeric \
                      id or profile handle (one of the two is required).",
        params: &[
            optional("user_id", "integer", "Numeric user id"),
            optional("handle", "string", "Profile handle, resolved to its user id"),
            optional("limit", "integer", "Maximum results (default 10)"),
        ],
    },
    ToolDef {
        name: "get_query_details",
        description: "Full SQL, description and parameters for a saved query.",
        params: &[required("query_id", "integer", "Numeric query id")],
    },
    ToolDef {
        name: "execute_query",
        description: "Start executing a saved query. Returns a job id to poll; \
                      counts against the session query budget.",
        params: &[
            required("query_id", "integer", "Numeric query id"),
            optional("params", "object", "Query parameters by name"),
        ],
    },
    ToolDef {
        name: "get_job_status",
        description: "Current state of an execution job.",
        params: &[required("job_id", "string", "Job id from execute_query")],
    },
    ToolDef {
        name: "get_job_results_summary",
        description: "Row count, columns, preview rows and numeric stats for a \
                      completed job. Use export_results_to_csv for the full dataset.",
        params: &[
            required("job_id", "string", "Job id from execute_query"),
            optional("preview_limit", "integer", "Preview rows to include (default 5)"),
        ],
    },
    ToolDef {
        name: "analyze_job_results",
        description: "Outlier and trend analysis over the numeric columns of a \
                      completed job.",
        params: &[required("job_id", "string", "Job id from execute_query")],
    },
    ToolDef {
        name: "diagnose_job_failure",
        description: "Explain why a job failed and suggest a fix. Pass the query id \
                      and/or table name for a sharper diagnosis.",
        params: &[
            required("job_id", "string", "Job id of the failed execution"),
            optional("query_id", "integer", "Query id, to include the offending SQL"),
            optional("table", "string", "Table name, to check identifiers against its schema"),
        ],
    },
    ToolDef {
        name: "export_results_to_csv",
        description: "Write the full dataset of a completed job to a CSV file.",
        params: &[required("job_id", "string", "Job id from execute_query")],
    },
    ToolDef {
        name: "get_table_schema",
        description: "Column names and types for a table. Counts against the \
                      session schema-call budget.",
        params: &[required("table", "string", "Fully qualified table name")],
    },
    ToolDef {
        name: "search_schema_definitions",
        description: "Search the reference repository for SQL models and schema \
                      definitions matching a keyword.",
        params: &[required("keyword", "string", "Keyword to search for")],
    },
    ToolDef {
        name: "get_schema_definition_file",
        description: "Raw content of a file in the reference repository.",
        params: &[required("path", "string", "Repository-relative file path")],
    },
];

pub fn find_tool(name: &str) -> Option<&'static ToolDef> {
    CATALOG.iter().find(|tool| tool.name == name)
}

/// Route a tool call to its handler and render the outcome as reply text.
///
/// Budget denials render as an explicit refusal with the remaining budget, so
/// the caller can see exactly which limit blocked the action. All other errors
/// render as a one-line `Error:` message.
pub async fn dispatch(toolbox: &mut Toolbox, name: &str, args: &Value) -> String {
    let Some(tool) = find_tool(name) else {
        return format!("Error: unknown tool '{name}'");
    };
    if let Err(message) = check_required(tool, args) {
        return message;
    }

    let outcome = route(toolbox, name, args).await;
    match outcome {
        Ok(text) => text,
        Err(err @ Error::BudgetExceeded { .. }) => {
            format!("EXECUTION DENIED: {err}.\n{}", toolbox.session_budget())
        }
        Err(err) => format!("Error: {err}"),
    }
}

async fn route(toolbox: &mut Toolbox, name: &str, args: &Value) -> crate::types::Result<String> {
    match name {
        "get_account_status" => toolbox.account_status().await,
        "get_session_budget" => Ok(toolbox.session_budget()),
        "search_public_queries" => {
            toolbox.search_public_queries(str_arg(args, "search_term")?).await
        }
        "list_user_queries" => {
            let limit = opt_usize_arg(args, "limit")?.unwrap_or(10);
            let user_id = match opt_u64_arg(args, "user_id")? {
                Some(id) => id,
                None => match args.get("handle").and_then(Value::as_str) {
                    Some(handle) => toolbox.user_id_for_handle(handle).await?,
                    None => {
                        return Err(Error::validation(
                            "provide 'user_id' or 'handle' for list_user_queries",
                        ))
                    }
                },
            };
            toolbox.list_user_queries(user_id, limit).await
        }
        "get_query_details" => toolbox.query_details(u64_arg(args, "query_id")?).await,
        "execute_query" => {
            let query_id = u64_arg(args, "query_id")?;
            let params = args
                .get("params")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default();
            toolbox.execute_query(query_id, params).await
        }
        "get_job_status" => toolbox.job_status(str_arg(args, "job_id")?).await,
        "get_job_results_summary" => {
            let job_id = str_arg(args, "job_id")?;
            let preview_limit = opt_usize_arg(args, "preview_limit")?.unwrap_or(5);
            toolbox.job_results_summary(job_id, preview_limit).await
        }
        "analyze_job_results" => toolbox.analyze_job_results(str_arg(args, "job_id")?).await,
        "diagnose_job_failure" => {
            let job_id = str_arg(args, "job_id")?;
            let query_id = opt_u64_arg(args, "query_id")?;
            let table = args.get("table").and_then(Value::as_str);
            toolbox.diagnose_job_failure(job_id, query_id, table).await
        }
        "export_results_to_csv" => {
            toolbox.export_results_to_csv(str_arg(args, "job_id")?).await
        }
        "get_table_schema" => toolbox.table_schema(str_arg(args, "table")?).await,
        "search_schema_definitions" => {
            toolbox.search_schema_definitions(str_arg(args, "keyword")?).await
        }
        "get_schema_definition_file" => {
            toolbox.schema_definition_file(str_arg(args, "path")?).await
        }
        // find_tool already vetted the name.
        _ => Err(Error::validation(format!("unknown tool '{name}'"))),
    }
}

fn check_required(tool: &ToolDef, args: &Value) -> std::result::Result<(), String> {
    for param in tool.params.iter().filter(|p| p.required) {
        if args.get(param.name).map_or(true, Value::is_null) {
            return Err(format!(
                "Error: missing required argument '{}' for tool '{}'",
                param.name, tool.name
            ));
        }
    }
    Ok(())
}

// =============================================================================
// Argument extraction
// =============================================================================

fn str_arg<'a>(args: &'a Value, name: &str) -> crate::types::Result<&'a str> {
    args.get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| Error::validation(format!("argument '{name}' must be a string")))
}

fn u64_arg(args: &Value, name: &str) -> crate::types::Result<u64> {
    opt_u64_arg(args, name)?
        .ok_or_else(|| Error::validation(format!("argument '{name}' must be an integer")))
}

/// Integers arrive as JSON numbers or numeric strings depending on the caller.
fn opt_u64_arg(args: &Value, name: &str) -> crate::types::Result<Option<u64>> {
    match args.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .map(Some)
            .ok_or_else(|| Error::validation(format!("argument '{name}' must be a non-negative integer"))),
        Some(Value::String(s)) => s
            .parse()
            .map(Some)
            .map_err(|_| Error::validation(format!("argument '{name}' must be an integer"))),
        Some(_) => Err(Error::validation(format!(
            "argument '{name}' must be an integer"
        ))),
    }
}

fn opt_usize_arg(args: &Value, name: &str) -> crate::types::Result<Option<usize>> {
    Ok(opt_u64_arg(args, name)?.map(|n| n as usize))
}

// =============================================================================
// Tests
// =============================================================================
