//! Result summarization and statistical inspection.
//!
//! Summaries are lightweight (min/max/mean per numeric column); the deeper
//! pass flags z-score outliers and applies a first-third vs last-third trend
//! heuristic. Everything is computed fresh per call — stats are never cached.

use serde::Serialize;

use super::table::{Row, TabularResult};

/// Thresholds for outlier and trend detection (configurable, not hardcoded).
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Absolute z-score above which a value is an outlier (default: 3).
    pub outlier_z_threshold: f64,
    /// Relative change between first-third and last-third means that counts
    /// as a trend (default: 0.05).
    pub trend_change_threshold: f64,
    /// Maximum sample outliers reported per column, largest deviation first.
    pub max_sample_outliers: usize,
    /// Minimum rows before the trend heuristic is attempted.
    pub trend_min_rows: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            outlier_z_threshold: 3.0,
            trend_change_threshold: 0.05,
            max_sample_outliers: 3,
            trend_min_rows: 6,
        }
    }
}

/// Per-column min/max/mean.
#[derive(Debug, Clone, Serialize)]
pub struct ColumnSummary {
    pub name: String,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

/// Summary of a result set: shape, preview, lightweight numeric stats.
#[derive(Debug, Clone, Serialize)]
pub struct ResultSummary {
    pub row_count: usize,
    pub columns: Vec<String>,
    pub preview: Vec<Row>,
    pub stats: Vec<ColumnSummary>,
    /// Set on empty input instead of failing ("No data returned.").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Trend direction over row order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Increasing,
    Decreasing,
    Flat,
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Trend::Increasing => write!(f, "increasing"),
            Trend::Decreasing => write!(f, "decreasing"),
            Trend::Flat => write!(f, "flat"),
        }
    }
}

/// Outlier/trend report for one numeric column.
#[derive(Debug, Clone, Serialize)]
pub struct ColumnReport {
    pub name: String,
    pub mean: f64,
    pub std_dev: f64,
    pub outlier_count: usize,
    /// Up to `max_sample_outliers` values, largest deviation first.
    pub sample_outliers: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trend: Option<Trend>,
}

/// Summarize a result set: row count, header, first `preview_limit` rows and
/// min/max/mean per numeric column. Zero rows yield an explicit no-data note,
/// never an error.
pub fn summarize(result: &TabularResult, preview_limit: usize) -> ResultSummary {
    if result.is_empty() {
        return ResultSummary {
            row_count: 0,
            columns: Vec::new(),
            preview: Vec::new(),
            stats: Vec::new(),
            note: Some("No data returned.".to_string()),
        };
    }

    let stats = result
        .numeric_columns()
        .into_iter()
        .filter_map(|name| {
            let values = result.numeric_values(&name);
            if values.is_empty() {
                return None;
            }
            let min = values.iter().copied().fold(f64::INFINITY, f64::min);
            let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            Some(ColumnSummary {
                name,
                min,
                max,
                mean: mean(&values),
            })
        })
        .collect();

    ResultSummary {
        row_count: result.row_count(),
        columns: result.columns(),
        preview: result.rows().iter().take(preview_limit).cloned().collect(),
        stats,
        note: None,
    }
}

/// Inspect every numeric column for z-score outliers and a trend label.
///
/// A value is an outlier when |value − mean| / std_dev reaches the configured
/// threshold. The comparison is inclusive: with n values the largest
/// attainable z-score is sqrt(n − 1), so a strict comparison could never flag
/// the lone extreme in a ten-row column. Constant columns (std_dev 0) flag
/// nothing. The trend compares
/// the mean of the first third of values against the last third, assuming row
/// order reflects temporal or logical order — a heuristic, not a statistical
/// test.
pub fn detect_outliers_and_trend(
    result: &TabularResult,
    config: &AnalysisConfig,
) -> Vec<ColumnReport> {
    result
        .numeric_columns()
        .into_iter()
        .filter_map(|name| {
            let values = result.numeric_values(&name);
            if values.is_empty() {
                return None;
            }

            let mean = mean(&values);
            let std_dev = std_dev(&values, mean);

            let mut outliers: Vec<(f64, f64)> = Vec::new();
            if std_dev > 0.0 {
                for &v in &values {
                    let z = ((v - mean) / std_dev).abs();
                    if z >= config.outlier_z_threshold {
                        outliers.push((z, v));
                    }
                }
            }
            outliers.sort_by(|a, b| b.0.total_cmp(&a.0));

            Some(ColumnReport {
                name,
                mean,
                std_dev,
                outlier_count: outliers.len(),
                sample_outliers: outliers
                    .iter()
                    .take(config.max_sample_outliers)
                    .map(|&(_, v)| v)
                    .collect(),
                trend: trend_label(&values, config),
            })
        })
        .collect()
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
fn std_dev(values: &[f64], mean: f64) -> f64 {
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

fn trend_label(values: &[f64], config: &AnalysisConfig) -> Option<Trend> {
    if values.len() < config.trend_min_rows {
        return None;
    }
    let third = values.len() / 3;
    let first = mean(&values[..third]);
    let last = mean(&values[values.len() - third..]);

    let base = first.abs().max(f64::EPSILON);
    let change = (last - first) / base;

    Some(if change > config.trend_change_threshold {
        Trend::Increasing
    } else if change < -config.trend_change_threshold {
        Trend::Decreasing
    } else {
        Trend::Flat
    })
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn table(rows: Vec<Value>) -> TabularResult {
        TabularResult::from_value(&Value::Array(rows))
    }

    fn value_table(values: &[f64]) -> TabularResult {
        table(values.iter().map(|v| json!({"v": v})).collect())
    }

    #[test]
    fn test_summarize_empty_has_no_data_note() {
        let summary = summarize(&TabularResult::default(), 5);
        assert_eq!(summary.row_count, 0);
        assert!(summary.preview.is_empty());
        assert_eq!(summary.note.as_deref(), Some("No data returned."));
    }

    #[test]
    fn test_summarize_shape_and_stats() {
        let t = table(vec![
            json!({"day": "d1", "volume": 10.0}),
            json!({"day": "d2", "volume": 30.0}),
            json!({"day": "d3", "volume": 20.0}),
        ]);
        let summary = summarize(&t, 2);
        assert_eq!(summary.row_count, 3);
        assert_eq!(summary.columns, vec!["day", "volume"]);
        assert_eq!(summary.preview.len(), 2);
        assert!(summary.note.is_none());

        assert_eq!(summary.stats.len(), 1);
        let vol = &summary.stats[0];
        assert_eq!(vol.name, "volume");
        assert_eq!(vol.min, 10.0);
        assert_eq!(vol.max, 30.0);
        assert_eq!(vol.mean, 20.0);
    }

    #[test]
    fn test_non_numeric_columns_excluded() {
        let t = table(vec![json!({"label": "a"}), json!({"label": "b"})]);
        let summary = summarize(&t, 5);
        assert!(summary.stats.is_empty());
        assert!(detect_outliers_and_trend(&t, &AnalysisConfig::default()).is_empty());
    }

    #[test]
    fn test_single_extreme_value_flagged() {
        // Nine values clustered at 10 plus one at 1000: only 1000 is an outlier.
        let mut values = vec![10.0; 9];
        values.push(1000.0);
        let reports = detect_outliers_and_trend(&value_table(&values), &AnalysisConfig::default());

        assert_eq!(reports.len(), 1);
        let report = &reports[0];
        assert_eq!(report.outlier_count, 1);
        assert_eq!(report.sample_outliers, vec![1000.0]);
    }

    #[test]
    fn test_constant_column_flags_nothing() {
        let reports =
            detect_outliers_and_trend(&value_table(&[5.0; 10]), &AnalysisConfig::default());
        assert_eq!(reports[0].std_dev, 0.0);
        assert_eq!(reports[0].outlier_count, 0);
        assert_eq!(reports[0].trend, Some(Trend::Flat));
    }

    #[test]
    fn test_sample_outliers_largest_deviation_first() {
        let mut values = vec![10.0; 60];
        values.push(500.0);
        values.push(900.0);
        let reports = detect_outliers_and_trend(&value_table(&values), &AnalysisConfig::default());
        assert_eq!(reports[0].sample_outliers, vec![900.0, 500.0]);
    }

    #[test]
    fn test_trend_increasing() {
        let values: Vec<f64> = (1..=12).map(|i| i as f64).collect();
        let reports = detect_outliers_and_trend(&value_table(&values), &AnalysisConfig::default());
        assert_eq!(reports[0].trend, Some(Trend::Increasing));
    }

    #[test]
    fn test_trend_decreasing() {
        let values: Vec<f64> = (1..=12).rev().map(|i| i as f64).collect();
        let reports = detect_outliers_and_trend(&value_table(&values), &AnalysisConfig::default());
        assert_eq!(reports[0].trend, Some(Trend::Decreasing));
    }

    #[test]
    fn test_trend_flat_within_threshold() {
        let values = vec![100.0, 101.0, 99.0, 100.5, 99.5, 100.0, 101.0, 99.0, 100.0];
        let reports = detect_outliers_and_trend(&value_table(&values), &AnalysisConfig::default());
        assert_eq!(reports[0].trend, Some(Trend::Flat));
    }

    #[test]
    fn test_trend_skipped_for_short_columns() {
        let reports = detect_outliers_and_trend(
            &value_table(&[1.0, 2.0, 3.0]),
            &AnalysisConfig::default(),
        );
        assert_eq!(reports[0].trend, None);
    }
}
