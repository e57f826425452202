//! Catalog-wide query generation tests.

use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use seo_lens::catalog::{ReportCatalog, ReportKind, ReportParams};

fn catalog() -> ReportCatalog {
    ReportCatalog::new(
        "seo_data",
        vec!["twelve".to_string(), "12transfers".to_string()],
    )
    .unwrap()
}

fn params() -> ReportParams {
    ReportParams::new(
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
    )
    .unwrap()
    .with_keyword("airport taxi")
}

/// Extracts the output column names from a SELECT statement: the alias
/// after `AS` where one is given, the bare expression otherwise.
fn select_list_columns(text: &str) -> Vec<String> {
    let start = text.find("SELECT ").expect("no SELECT") + "SELECT ".len();
    let end = text.find("\nFROM").expect("no FROM");
    let select_list = &text[start..end];

    let mut columns = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();
    for ch in select_list.chars() {
        match ch {
            '(' => {
                depth += 1;
                current.push(ch);
            }
            ')' => {
                depth -= 1;
                current.push(ch);
            }
            ',' if depth == 0 => {
                columns.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    columns.push(current.trim().to_string());

    columns
        .into_iter()
        .map(|expr| match expr.rfind(" AS ") {
            Some(idx) => expr[idx + 4..].trim().to_string(),
            None => expr,
        })
        .collect()
}

#[test]
fn test_declared_columns_match_generated_select_list() {
    let catalog = catalog();
    let params = params();

    for kind in ReportKind::all() {
        let query = catalog.build(*kind, &params).unwrap();
        let generated = select_list_columns(&query.text);
        let declared: Vec<String> = kind
            .declared_columns()
            .iter()
            .map(|c| c.to_string())
            .collect();
        assert_eq!(generated, declared, "column mismatch for report {kind}");
    }
}

#[test]
fn test_every_placeholder_has_a_bind_and_vice_versa() {
    let catalog = catalog();
    let params = params()
        .with_domain("12transfers.com")
        .with_countries(vec!["GB".to_string(), "US".to_string()]);

    for kind in ReportKind::all() {
        let query = catalog.build(*kind, &params).unwrap();
        for n in 1..=query.params.len() {
            assert!(
                query.text.contains(&format!("${n}")),
                "report {kind}: bind ${n} never referenced"
            );
        }
        assert!(
            !query.text.contains(&format!("${}", query.params.len() + 1)),
            "report {kind}: placeholder beyond bind list"
        );
    }
}

#[test]
fn test_caller_strings_never_reach_query_text() {
    let catalog = catalog();
    let hostile = "x' OR '1'='1";
    let params = params().with_domain(hostile).with_keyword(hostile);

    for kind in ReportKind::all() {
        let query = catalog.build(*kind, &params).unwrap();
        assert!(
            !query.text.contains("OR '1'='1"),
            "report {kind}: caller input leaked into text"
        );
    }
}

#[test]
fn test_search_performance_golden_query() {
    let query = catalog()
        .build(ReportKind::SearchPerformance, &params())
        .unwrap();
    assert_eq!(
        query.text,
        "SELECT date, sum(clicks)::bigint AS total_clicks, \
         sum(impressions)::bigint AS total_impressions, \
         avg(ctr)::float8 AS avg_ctr, avg(position)::float8 AS avg_position\n\
         FROM seo_data.search_console_data\n\
         WHERE date BETWEEN $1 AND $2\n\
         GROUP BY date\n\
         ORDER BY date DESC"
    );
}

#[test]
fn test_limit_is_bound_not_interpolated() {
    let catalog = catalog();
    let params = params().with_limit(25);
    for kind in [
        ReportKind::TopKeywords,
        ReportKind::TopPages,
        ReportKind::LandingPages,
        ReportKind::TopOpportunities,
        ReportKind::TrafficByCountry,
    ] {
        let query = catalog.build(kind, &params).unwrap();
        assert!(query.text.contains("\nLIMIT $"), "report {kind} lacks bound LIMIT");
        assert!(!query.text.contains("LIMIT 25"), "report {kind} interpolated its limit");
    }
}

#[test]
fn test_different_windows_share_text_but_not_binds() {
    let catalog = catalog();
    let january = params();
    let february = ReportParams::new(
        NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
        NaiveDate::from_ymd_opt(2025, 2, 28).unwrap(),
    )
    .unwrap();

    let a = catalog.build(ReportKind::SearchPerformance, &january).unwrap();
    let b = catalog.build(ReportKind::SearchPerformance, &february).unwrap();
    assert_eq!(a.text, b.text);
    assert_ne!(a.params, b.params);
    assert_ne!(a.cache_key(), b.cache_key());
}
