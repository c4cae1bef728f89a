//! Execution-failure classification.
//!
//! Maps raw failure text plus the offending SQL to an actionable category. The
//! classifier is an ordered rule list evaluated top to bottom; the first
//! matching signature wins. It is a total function: unrecognized input yields
//! `Unclassified` with no suggestion, never an error.

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

/// Diagnostic category for a failed execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorCategory {
    UnknownColumn,
    UnknownTable,
    SyntaxError,
    PermissionDenied,
    Timeout,
    ResourceExhausted,
    Unclassified,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorCategory::UnknownColumn => "unknown-column",
            ErrorCategory::UnknownTable => "unknown-table",
            ErrorCategory::SyntaxError => "syntax-error",
            ErrorCategory::PermissionDenied => "permission-denied",
            ErrorCategory::Timeout => "timeout",
            ErrorCategory::ResourceExhausted => "resource-exhausted",
            ErrorCategory::Unclassified => "unclassified",
        };
        write!(f, "{s}")
    }
}

/// Classification outcome: a category and, where one can be offered, a
/// human-readable suggestion.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorDiagnosis {
    pub category: ErrorCategory,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

/// One failure signature: lowercase substrings, any of which matches.
struct Rule {
    category: ErrorCategory,
    needles: &'static [&'static str],
}

// Ordered: schema signatures before the generic syntax bucket, since engines
// often prefix both with the same error code.
const RULES: &[Rule] = &[
    Rule {
        category: ErrorCategory::UnknownColumn,
        needles: &["column not found", "column", "cannot be resolved"],
    },
    Rule {
        category: ErrorCategory::UnknownTable,
        needles: &["table not found", "table", "does not exist"],
    },
    Rule {
        category: ErrorCategory::SyntaxError,
        needles: &["syntax error", "mismatched input", "unexpected token", "parse error"],
    },
    Rule {
        category: ErrorCategory::PermissionDenied,
        needles: &["permission denied", "access denied", "not authorized", "forbidden"],
    },
    Rule {
        category: ErrorCategory::Timeout,
        needles: &["timeout", "timed out", "deadline exceeded"],
    },
    Rule {
        category: ErrorCategory::ResourceExhausted,
        needles: &["exceeded", "out of memory", "too large", "rate limit"],
    },
];

/// Minimum Jaro-Winkler similarity before a schema name is proposed.
const SUGGEST_SIMILARITY: f64 = 0.80;

/// Classify failure text against the fixed signature list.
///
/// `sql_text` is consulted only for suggestion wording; classification is
/// driven entirely by the error text.
pub fn classify(error_text: &str, sql_text: &str) -> ErrorDiagnosis {
    classify_with_schema(error_text, sql_text, &[])
}

/// Classify, proposing the closest valid name from `known_names` (column or
/// table names obtained from a schema lookup) for schema-related categories.
pub fn classify_with_schema(
    error_text: &str,
    sql_text: &str,
    known_names: &[String],
) -> ErrorDiagnosis {
    let lower = error_text.to_lowercase();
    let matched = RULES.iter().find(|rule| {
        rule.needles.iter().any(|needle| {
            match rule.category {
                // Schema rules need the not-found/unresolved phrasing, a bare
                // "column"/"table" mention is not enough.
                ErrorCategory::UnknownColumn | ErrorCategory::UnknownTable => {
                    lower.contains(needle)
                        && (lower.contains("not found")
                            || lower.contains("cannot be resolved")
                            || lower.contains("does not exist"))
                }
                _ => lower.contains(needle),
            }
        })
    });

    let Some(rule) = matched else {
        return ErrorDiagnosis {
            category: ErrorCategory::Unclassified,
            suggestion: None,
        };
    };

    let suggestion = suggest(rule.category, error_text, sql_text, known_names);
    ErrorDiagnosis {
        category: rule.category,
        suggestion: Some(suggestion),
    }
}

fn suggest(
    category: ErrorCategory,
    error_text: &str,
    sql_text: &str,
    known_names: &[String],
) -> String {
    match category {
        ErrorCategory::UnknownColumn | ErrorCategory::UnknownTable => {
            let noun = if category == ErrorCategory::UnknownColumn {
                "Column"
            } else {
                "Table"
            };
            match extract_identifier(error_text) {
                Some(ident) => match closest_name(&ident, known_names) {
                    Some(best) => format!(
                        "{noun} '{ident}' was not found. Did you mean '{best}'?"
                    ),
                    None => format!(
                        "{noun} '{ident}' was not found. Inspect the table schema to find \
                         the valid name before re-running."
                    ),
                },
                None => format!(
                    "{noun} reference could not be resolved. Inspect the table schema and \
                     check the identifiers used in the query."
                ),
            }
        }
        ErrorCategory::SyntaxError => {
            let location = extract_line_number(error_text)
                .map(|n| format!(" near line {n}"))
                .unwrap_or_default();
            format!("The SQL failed to parse{location}. Review the statement for typos before re-running.")
        }
        ErrorCategory::PermissionDenied => {
            "The account is not allowed to read one of the referenced datasets. Try a public \
             dataset or request access."
                .to_string()
        }
        ErrorCategory::Timeout => {
            if sql_text.to_lowercase().contains("join") {
                "Execution timed out. Reduce the scanned range or simplify joins, then retry."
                    .to_string()
            } else {
                "Execution timed out. Add a narrower time filter or LIMIT, then retry.".to_string()
            }
        }
        ErrorCategory::ResourceExhausted => {
            "The query exceeded an execution resource limit. Narrow the scanned data or \
             aggregate earlier in the query."
                .to_string()
        }
        ErrorCategory::Unclassified => String::new(),
    }
}

/// Pull the first quoted identifier out of the error text.
fn extract_identifier(error_text: &str) -> Option<String> {
    static IDENT: OnceLock<Regex> = OnceLock::new();
    let re = IDENT.get_or_init(|| {
        // 'name', "name" or `name`; dotted paths allowed.
        #[allow(clippy::unwrap_used)]
        Regex::new(r#"['"`]([A-Za-z_][A-Za-z0-9_.]*)['"`]"#).unwrap()
    });
    re.captures(error_text)
        .map(|caps| caps[1].to_string())
}

fn extract_line_number(error_text: &str) -> Option<u32> {
    static LINE: OnceLock<Regex> = OnceLock::new();
    let re = LINE.get_or_init(|| {
        #[allow(clippy::unwrap_used)]
        Regex::new(r"line[:\s]+(\d+)").unwrap()
    });
    re.captures(&error_text.to_lowercase())
        .and_then(|caps| caps[1].parse().ok())
}

/// Closest valid name by Jaro-Winkler similarity, if any is close enough.
fn closest_name(ident: &str, known_names: &[String]) -> Option<String> {
    known_names
        .iter()
        .map(|name| (strsim::jaro_winkler(&ident.to_lowercase(), &name.to_lowercase()), name))
        .filter(|(score, _)| *score >= SUGGEST_SIMILARITY)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, name)| name.clone())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_column_with_suggestion() {
        let diagnosis = classify("Column 'foo' not found", "SELECT foo FROM t");
        assert_eq!(diagnosis.category, ErrorCategory::UnknownColumn);
        let suggestion = diagnosis.suggestion.unwrap();
        assert!(!suggestion.is_empty());
        assert!(suggestion.contains("foo"));
    }

    #[test]
    fn test_unknown_column_proposes_closest_name() {
        let known = vec!["block_time".to_string(), "tx_hash".to_string()];
        let diagnosis = classify_with_schema(
            "Column 'blok_time' cannot be resolved",
            "SELECT blok_time FROM ethereum.transactions",
            &known,
        );
        assert_eq!(diagnosis.category, ErrorCategory::UnknownColumn);
        assert!(diagnosis.suggestion.unwrap().contains("block_time"));
    }

    #[test]
    fn test_no_close_name_falls_back_to_schema_advice() {
        let known = vec!["volume_usd".to_string()];
        let diagnosis =
            classify_with_schema("Column 'zzz' not found", "SELECT zzz FROM t", &known);
        assert!(diagnosis.suggestion.unwrap().contains("schema"));
    }

    #[test]
    fn test_unknown_table() {
        let diagnosis = classify(
            "Table 'ethereum.transactionz' does not exist",
            "SELECT * FROM ethereum.transactionz",
        );
        assert_eq!(diagnosis.category, ErrorCategory::UnknownTable);
        assert!(diagnosis
            .suggestion
            .unwrap()
            .contains("ethereum.transactionz"));
    }

    #[test]
    fn test_syntax_error_reports_line() {
        let diagnosis = classify("Syntax error at line 3: mismatched input", "SELECT");
        assert_eq!(diagnosis.category, ErrorCategory::SyntaxError);
        assert!(diagnosis.suggestion.unwrap().contains("line 3"));
    }

    #[test]
    fn test_permission_denied() {
        let diagnosis = classify("Access denied for dataset x", "SELECT 1");
        assert_eq!(diagnosis.category, ErrorCategory::PermissionDenied);
    }

    #[test]
    fn test_timeout_join_hint() {
        let diagnosis = classify(
            "Query timed out after 300s",
            "SELECT * FROM a JOIN b ON a.id = b.id",
        );
        assert_eq!(diagnosis.category, ErrorCategory::Timeout);
        assert!(diagnosis.suggestion.unwrap().contains("joins"));
    }

    #[test]
    fn test_resource_exhausted() {
        let diagnosis = classify("Query exceeded memory limit", "SELECT 1");
        assert_eq!(diagnosis.category, ErrorCategory::ResourceExhausted);
    }

    #[test]
    fn test_first_match_wins() {
        // Mentions both a column and a timeout; column rule sits higher.
        let diagnosis = classify("Column 'a' not found after timeout", "SELECT a");
        assert_eq!(diagnosis.category, ErrorCategory::UnknownColumn);
    }

    #[test]
    fn test_unclassified_has_no_suggestion() {
        let diagnosis = classify("something inexplicable happened", "SELECT 1");
        assert_eq!(diagnosis.category, ErrorCategory::Unclassified);
        assert!(diagnosis.suggestion.is_none());
    }

    #[test]
    fn test_bare_column_mention_is_not_enough() {
        let diagnosis = classify("column store flush in progress", "SELECT 1");
        assert_eq!(diagnosis.category, ErrorCategory::Unclassified);
    }

    #[test]
    fn test_extract_identifier_variants() {
        assert_eq!(extract_identifier("Column 'a_b' not found").as_deref(), Some("a_b"));
        assert_eq!(
            extract_identifier("Table \"eth.tx\" does not exist").as_deref(),
            Some("eth.tx")
        );
        assert_eq!(extract_identifier("no quotes here"), None);
    }
}
