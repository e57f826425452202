//! Fetch-then-shape pipelines, the way a dashboard page composes them.

use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use seo_lens::catalog::{ReportCatalog, ReportKind, ReportParams};
use seo_lens::executor::ReportExecutor;
use seo_lens::shaper::{self, PositionBucket};
use seo_lens::warehouse::{ColumnInfo, MockWarehouse, ResultSet, Value};
use std::sync::Arc;

fn catalog() -> ReportCatalog {
    ReportCatalog::new("seo_data", vec!["twelve".to_string()]).unwrap()
}

fn params() -> ReportParams {
    ReportParams::new(
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
    )
    .unwrap()
}

fn daily_rows(clicks_per_day: &[i64]) -> ResultSet {
    let columns = vec![
        ColumnInfo::new("date", "date"),
        ColumnInfo::new("total_clicks", "int8"),
        ColumnInfo::new("total_impressions", "int8"),
        ColumnInfo::new("avg_ctr", "float8"),
        ColumnInfo::new("avg_position", "float8"),
    ];
    let newest = NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();
    let rows = clicks_per_day
        .iter()
        .enumerate()
        .map(|(i, clicks)| {
            vec![
                Value::Date(newest - chrono::Days::new(i as u64)),
                Value::Int(*clicks),
                Value::Int(clicks * 25),
                Value::Float(0.04),
                Value::Float(9.5),
            ]
        })
        .collect();
    ResultSet::with_data(columns, rows)
}

#[tokio::test]
async fn test_performance_page_pipeline() {
    let mut clicks = vec![120; 7];
    clicks.extend(vec![100; 7]);
    let warehouse = Arc::new(MockWarehouse::with_result(daily_rows(&clicks)));
    let executor = ReportExecutor::new(warehouse, catalog());

    let data = executor
        .fetch(ReportKind::SearchPerformance, &params())
        .await
        .unwrap();
    assert!(data.is_ok());

    let summary = shaper::summarize_performance(&data.result);
    assert_eq!(summary.total_clicks, 7 * 120 + 7 * 100);
    assert_eq!(summary.days, 14);

    let delta = shaper::week_over_week_delta(&data.result);
    assert!((delta - 20.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_funnel_page_pipeline() {
    let canned = ResultSet::with_data(
        vec![
            ColumnInfo::new("total_impressions", "int8"),
            ColumnInfo::new("total_clicks", "int8"),
        ],
        vec![vec![Value::Int(200_000), Value::Int(1000)]],
    );
    let executor = ReportExecutor::new(Arc::new(MockWarehouse::with_result(canned)), catalog());

    let data = executor
        .fetch(ReportKind::ConversionFunnel, &params())
        .await
        .unwrap();
    let stages = shaper::shape_funnel(&data.result);

    let counts: Vec<i64> = stages.iter().map(|s| s.count).collect();
    assert_eq!(counts, vec![200_000, 1000, 150, 120]);
    // stages only ever narrow
    assert!(counts.windows(2).all(|w| w[1] <= w[0]));
}

#[tokio::test]
async fn test_keyword_page_filter_then_histogram() {
    let columns = vec![
        ColumnInfo::new("keyword", "text"),
        ColumnInfo::new("avg_ctr_percentage", "float8"),
        ColumnInfo::new("avg_position", "float8"),
    ];
    let rows = vec![
        vec![Value::from("brand twelve"), Value::Float(6.0), Value::Float(1.5)],
        vec![Value::from("airport taxi"), Value::Float(2.0), Value::Float(9.0)],
        vec![Value::from("cheap transfer"), Value::Float(0.2), Value::Float(45.0)],
    ];
    let canned = ResultSet::with_data(columns, rows);
    let executor = ReportExecutor::new(Arc::new(MockWarehouse::with_result(canned)), catalog());

    let data = executor
        .fetch(ReportKind::TopKeywords, &params())
        .await
        .unwrap();

    let filtered = shaper::filter_rows(
        &data.result,
        "avg_ctr_percentage",
        "avg_position",
        Some(1.0),
        None,
    );
    assert_eq!(filtered.rows.len(), 2);

    let histogram = shaper::position_histogram(&filtered, "avg_position");
    assert_eq!(histogram[0], (PositionBucket::Top3, 1));
    assert_eq!(histogram[1], (PositionBucket::Top10, 1));
    assert_eq!(histogram[4], (PositionBucket::Beyond50, 0));
}

#[test]
fn test_branded_classification_matches_sql_category_labels() {
    let terms = vec!["twelve".to_string(), "12transfers".to_string()];
    assert_eq!(
        shaper::classify_query("book twelve transfers online", &terms).label(),
        "Branded"
    );
    assert_eq!(
        shaper::classify_query("airport taxi london", &terms).label(),
        "Non-Branded"
    );
}
