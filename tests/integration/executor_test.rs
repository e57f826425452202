//! End-to-end executor behavior against mock warehouses.

use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use seo_lens::catalog::{ReportCatalog, ReportKind, ReportParams};
use seo_lens::executor::ReportExecutor;
use seo_lens::warehouse::{
    ColumnInfo, FailingWarehouse, MockWarehouse, ResultSet, SqlParam, Value,
};
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

#[tokio::test]
async fn test_executor_sends_bound_dates_to_the_warehouse() {
    let mock = Arc::new(MockWarehouse::new());
    let executor = ReportExecutor::new(mock.clone(), catalog());

    executor
        .fetch(ReportKind::SearchPerformance, &params())
        .await
        .unwrap();

    let sent = mock.last_query().unwrap();
    assert_eq!(
        sent.params,
        vec![
            SqlParam::Date(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()),
            SqlParam::Date(NaiveDate::from_ymd_opt(2025, 1, 31).unwrap()),
        ]
    );
}

#[tokio::test]
async fn test_empty_and_failed_reports_are_distinguishable() {
    let empty = ReportExecutor::new(Arc::new(MockWarehouse::new()), catalog())
        .fetch(ReportKind::TopKeywords, &params())
        .await
        .unwrap();
    let failed = ReportExecutor::new(Arc::new(FailingWarehouse), catalog())
        .fetch(ReportKind::TopKeywords, &params())
        .await
        .unwrap();

    // Both carry zero rows; only the error marker tells them apart.
    assert_eq!(empty.result.row_count, 0);
    assert_eq!(failed.result.row_count, 0);
    assert!(empty.is_ok());
    assert!(!failed.is_ok());
}

#[tokio::test]
async fn test_one_failing_report_does_not_poison_others() {
    let canned = ResultSet::with_data(
        vec![ColumnInfo::new("device", "text")],
        vec![vec![Value::from("MOBILE")]],
    );
    let healthy = ReportExecutor::new(Arc::new(MockWarehouse::with_result(canned)), catalog());
    let broken = ReportExecutor::new(Arc::new(FailingWarehouse), catalog());

    // A dashboard renders both; the broken one degrades alone.
    let device = healthy
        .fetch(ReportKind::TrafficByDevice, &params())
        .await
        .unwrap();
    let keywords = broken
        .fetch(ReportKind::TopKeywords, &params())
        .await
        .unwrap();

    assert_eq!(device.result.row_count, 1);
    assert!(keywords.error.is_some());
}

#[tokio::test]
async fn test_all_reports_run_through_the_executor() {
    let mock = Arc::new(MockWarehouse::new());
    let executor = ReportExecutor::new(mock.clone(), catalog());
    let params = params().with_keyword("airport taxi");

    for kind in ReportKind::all() {
        let data = executor.fetch(*kind, &params).await.unwrap();
        assert!(data.is_ok(), "report {kind} failed against the mock");
    }
    assert_eq!(mock.executed().len(), ReportKind::all().len());
}
