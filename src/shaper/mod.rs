//! Result shaping: turning raw report rows into dashboard-ready values.
//!
//! Everything here is pure and synchronous. Shapers consume a `ResultSet`
//! by reference and tolerate missing columns and NULL cells; a malformed
//! result shapes to zeros or `None`, never a panic.

use crate::warehouse::{ResultSet, Value};
use chrono::NaiveDate;
use serde::Serialize;

/// Fraction of clicks assumed to turn into bookings.
const BOOKING_RATE: f64 = 0.15;
/// Fraction of bookings assumed to complete as conversions.
const CONVERSION_RATE: f64 = 0.8;

fn cell_i64(result: &ResultSet, row: usize, column: &str) -> Option<i64> {
    result.value(row, column).and_then(Value::as_i64)
}

fn cell_f64(result: &ResultSet, row: usize, column: &str) -> Option<f64> {
    result.value(row, column).and_then(Value::as_f64)
}

fn cell_date(result: &ResultSet, row: usize, column: &str) -> Option<NaiveDate> {
    result.value(row, column).and_then(Value::as_date)
}

/// Headline metrics over a search-performance result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceSummary {
    pub total_clicks: i64,
    pub total_impressions: i64,
    /// Overall CTR as a percentage: total clicks over total impressions.
    pub ctr_percentage: f64,
    pub avg_position: f64,
    pub days: usize,
    /// Week-over-week click change, see [`week_over_week_delta`].
    pub week_over_week_pct: f64,
}

/// Aggregates daily search-performance rows into one summary.
///
/// Clicks and impressions sum; CTR is the overall ratio (0 when there are
/// no impressions); position averages over the days that carry a value.
/// An empty result yields all zeros.
pub fn summarize_performance(result: &ResultSet) -> PerformanceSummary {
    let mut total_clicks = 0;
    let mut total_impressions = 0;
    let mut position_sum = 0.0;
    let mut position_days = 0;

    for row in 0..result.rows.len() {
        total_clicks += cell_i64(result, row, "total_clicks").unwrap_or(0);
        total_impressions += cell_i64(result, row, "total_impressions").unwrap_or(0);
        if let Some(position) = cell_f64(result, row, "avg_position") {
            position_sum += position;
            position_days += 1;
        }
    }

    PerformanceSummary {
        total_clicks,
        total_impressions,
        ctr_percentage: if total_impressions > 0 {
            total_clicks as f64 / total_impressions as f64 * 100.0
        } else {
            0.0
        },
        avg_position: if position_days > 0 {
            position_sum / position_days as f64
        } else {
            0.0
        },
        days: result.rows.len(),
        week_over_week_pct: week_over_week_delta(result),
    }
}

/// Week-over-week click change, as a percentage.
///
/// Expects daily rows ordered newest first, as the search-performance
/// report returns them. The recent window is the first 7 rows; the prior
/// window is the next up-to-7. Fewer than 8 rows, or a prior window with
/// zero clicks, yields 0.
pub fn week_over_week_delta(result: &ResultSet) -> f64 {
    let rows = result.rows.len();
    if rows < 8 {
        return 0.0;
    }

    let clicks = |range: std::ops::Range<usize>| -> i64 {
        range
            .map(|row| cell_i64(result, row, "total_clicks").unwrap_or(0))
            .sum()
    };

    let recent = clicks(0..7);
    let prior = clicks(7..rows.min(14));
    if prior == 0 {
        return 0.0;
    }
    (recent - prior) as f64 / prior as f64 * 100.0
}

/// One stage of the conversion funnel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunnelStage {
    pub name: &'static str,
    pub count: i64,
}

/// Shapes a conversion-funnel result into ordered stages.
///
/// The warehouse only knows impressions and clicks; bookings and
/// conversions are estimated from clicks with fixed rates and floored,
/// so 1000 clicks yield 150 bookings and 120 conversions.
pub fn shape_funnel(result: &ResultSet) -> Vec<FunnelStage> {
    let impressions = cell_i64(result, 0, "total_impressions").unwrap_or(0);
    let clicks = cell_i64(result, 0, "total_clicks").unwrap_or(0);
    let bookings = (clicks as f64 * BOOKING_RATE).floor() as i64;
    let conversions = (clicks as f64 * BOOKING_RATE * CONVERSION_RATE).floor() as i64;

    vec![
        FunnelStage {
            name: "Impressions",
            count: impressions,
        },
        FunnelStage {
            name: "Clicks",
            count: clicks,
        },
        FunnelStage {
            name: "Estimated Bookings",
            count: bookings,
        },
        FunnelStage {
            name: "Estimated Conversions",
            count: conversions,
        },
    ]
}

/// Filters rows by CTR floor and position ceiling.
///
/// Row order is preserved and the output is never larger than the input.
/// Rows whose metric cell is NULL pass the corresponding threshold; a
/// filter only rejects a row it can actually measure.
pub fn filter_rows(
    result: &ResultSet,
    ctr_column: &str,
    position_column: &str,
    min_ctr_percentage: Option<f64>,
    max_position: Option<f64>,
) -> ResultSet {
    let keep = |row: usize| -> bool {
        if let Some(floor) = min_ctr_percentage {
            if let Some(ctr) = cell_f64(result, row, ctr_column) {
                if ctr < floor {
                    return false;
                }
            }
        }
        if let Some(ceiling) = max_position {
            if let Some(position) = cell_f64(result, row, position_column) {
                if position > ceiling {
                    return false;
                }
            }
        }
        true
    };

    let rows: Vec<_> = (0..result.rows.len())
        .filter(|&row| keep(row))
        .map(|row| result.rows[row].clone())
        .collect();

    let mut filtered = ResultSet::with_data(result.columns.clone(), rows);
    filtered.execution_time = result.execution_time;
    filtered.was_truncated = result.was_truncated;
    filtered
}

/// Ranking bucket for an average position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PositionBucket {
    Top3,
    Top10,
    Top20,
    Top50,
    Beyond50,
}

impl PositionBucket {
    /// All buckets in display order.
    pub fn all() -> &'static [PositionBucket] {
        &[
            Self::Top3,
            Self::Top10,
            Self::Top20,
            Self::Top50,
            Self::Beyond50,
        ]
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Top3 => "Top 3",
            Self::Top10 => "Top 10",
            Self::Top20 => "Top 20",
            Self::Top50 => "Top 50",
            Self::Beyond50 => "Beyond 50",
        }
    }

    /// Buckets a position. Upper bounds are inclusive: exactly 10.0 is
    /// still `Top10`.
    pub fn for_position(position: f64) -> Self {
        if position <= 3.0 {
            Self::Top3
        } else if position <= 10.0 {
            Self::Top10
        } else if position <= 20.0 {
            Self::Top20
        } else if position <= 50.0 {
            Self::Top50
        } else {
            Self::Beyond50
        }
    }
}

/// Counts rows per position bucket, in display order.
///
/// Every bucket appears in the output even when empty. Rows with a NULL
/// position are skipped.
pub fn position_histogram(result: &ResultSet, position_column: &str) -> Vec<(PositionBucket, usize)> {
    let mut counts = [0usize; 5];
    for row in 0..result.rows.len() {
        if let Some(position) = cell_f64(result, row, position_column) {
            let index = PositionBucket::all()
                .iter()
                .position(|b| *b == PositionBucket::for_position(position))
                .unwrap_or(4);
            counts[index] += 1;
        }
    }
    PositionBucket::all()
        .iter()
        .copied()
        .zip(counts)
        .collect()
}

/// Shaped data-overview row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverviewSummary {
    pub total_rows: i64,
    pub earliest_date: Option<NaiveDate>,
    pub latest_date: Option<NaiveDate>,
    pub days_with_data: i64,
    pub unique_queries: i64,
    pub unique_pages: i64,
    pub unique_countries: i64,
    pub total_clicks: i64,
    pub total_impressions: i64,
    pub days_since_update: Option<i64>,
}

/// Shapes the single-row data-overview result. Returns `None` when the
/// result carries no rows.
pub fn shape_overview(result: &ResultSet) -> Option<OverviewSummary> {
    if result.rows.is_empty() {
        return None;
    }
    Some(OverviewSummary {
        total_rows: cell_i64(result, 0, "total_rows").unwrap_or(0),
        earliest_date: cell_date(result, 0, "earliest_date"),
        latest_date: cell_date(result, 0, "latest_date"),
        days_with_data: cell_i64(result, 0, "days_with_data").unwrap_or(0),
        unique_queries: cell_i64(result, 0, "unique_queries").unwrap_or(0),
        unique_pages: cell_i64(result, 0, "unique_pages").unwrap_or(0),
        unique_countries: cell_i64(result, 0, "unique_countries").unwrap_or(0),
        total_clicks: cell_i64(result, 0, "total_clicks").unwrap_or(0),
        total_impressions: cell_i64(result, 0, "total_impressions").unwrap_or(0),
        days_since_update: cell_i64(result, 0, "days_since_update"),
    })
}

/// Shaped data-quality counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QualityReport {
    pub total_rows: i64,
    pub null_queries: i64,
    pub null_pages: i64,
    pub invalid_clicks: i64,
    pub invalid_ctr: i64,
    pub invalid_position: i64,
}

impl QualityReport {
    /// Total count of rows with at least one recorded issue class hit.
    pub fn issue_count(&self) -> i64 {
        self.null_queries
            + self.null_pages
            + self.invalid_clicks
            + self.invalid_ctr
            + self.invalid_position
    }

    pub fn is_clean(&self) -> bool {
        self.issue_count() == 0
    }
}

/// Shapes the single-row data-quality result.
pub fn shape_quality(result: &ResultSet) -> Option<QualityReport> {
    if result.rows.is_empty() {
        return None;
    }
    Some(QualityReport {
        total_rows: cell_i64(result, 0, "total_rows").unwrap_or(0),
        null_queries: cell_i64(result, 0, "null_queries").unwrap_or(0),
        null_pages: cell_i64(result, 0, "null_pages").unwrap_or(0),
        invalid_clicks: cell_i64(result, 0, "invalid_clicks").unwrap_or(0),
        invalid_ctr: cell_i64(result, 0, "invalid_ctr").unwrap_or(0),
        invalid_position: cell_i64(result, 0, "invalid_position").unwrap_or(0),
    })
}

/// Whether a search query mentions the brand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum QueryCategory {
    Branded,
    NonBranded,
}

impl QueryCategory {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Branded => "Branded",
            Self::NonBranded => "Non-Branded",
        }
    }
}

/// Classifies a query string by case-insensitive substring match against
/// the configured brand terms.
pub fn classify_query(query: &str, brand_terms: &[String]) -> QueryCategory {
    let lowered = query.to_lowercase();
    if brand_terms
        .iter()
        .any(|term| lowered.contains(&term.to_lowercase()))
    {
        QueryCategory::Branded
    } else {
        QueryCategory::NonBranded
    }
}
