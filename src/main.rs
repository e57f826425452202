//! seolens - SEO warehouse reporting from the command line.

use seo_lens::cache::ReportCache;
use seo_lens::catalog::{ReportCatalog, ReportKind};
use seo_lens::cli::{Cli, OutputFormat};
use seo_lens::config::Config;
use seo_lens::error::{LensError, Result};
use seo_lens::executor::{ReportData, ReportExecutor};
use seo_lens::shaper;
use seo_lens::warehouse::{self, MockWarehouse, ResultSet, Value, Warehouse};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    seo_lens::logging::init_stderr_logging();

    if let Err(e) = run().await {
        error!("{}: {}", e.category(), e);
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse_args();
    let format = cli.parse_output_format()?;

    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let config = Config::load_from_file(&config_path)?;

    let Some(kind) = cli.report_kind()? else {
        if cli.test_connection {
            let warehouse = open_warehouse(&cli, &config).await?;
            let catalog = ReportCatalog::from_config(&config.dashboard)?;
            return report_connectivity(&ReportExecutor::new(warehouse, catalog)).await;
        }
        print_report_list();
        return Ok(());
    };

    let params = cli.to_report_params(chrono::Local::now().date_naive(), config.dashboard.default_limit)?;
    let warehouse = open_warehouse(&cli, &config).await?;
    let catalog = ReportCatalog::from_config(&config.dashboard)?;
    let executor = ReportExecutor::new(warehouse, catalog);

    if cli.test_connection {
        return report_connectivity(&executor).await;
    }

    // One-shot CLI runs still go through the cache so the read path is
    // identical to a long-lived embedding.
    let cache = ReportCache::new(Duration::from_secs(config.dashboard.cache_ttl_secs));
    let query = executor.catalog().build(kind, &params)?;
    let data = cache
        .get_or_fetch(&query.cache_key(), || executor.run(&query))
        .await;

    let data = apply_post_filters(&cli, kind, data);
    render(
        kind,
        &data,
        format,
        executor.catalog().brand_terms(),
        params.keyword.as_deref(),
    );
    Ok(())
}

async fn report_connectivity(executor: &ReportExecutor) -> Result<()> {
    if executor.test_connection().await {
        println!("Connection OK");
        Ok(())
    } else {
        Err(LensError::connection("Warehouse connectivity check failed"))
    }
}

/// Resolves connection settings (CLI args over config file over PG*
/// environment variables) and opens the warehouse client.
async fn open_warehouse(cli: &Cli, config: &Config) -> Result<Arc<dyn Warehouse>> {
    if cli.mock {
        info!("Using mock warehouse");
        return Ok(Arc::new(MockWarehouse::new()));
    }

    let mut connection = match cli.to_connection_config()? {
        Some(conn) => conn,
        None => config.warehouse.clone(),
    };
    connection.apply_env_defaults();

    if connection.host.is_none() && connection.database.is_none() {
        return Err(LensError::config(
            "No warehouse connection configured. Pass --url, set PG* variables, or edit the config file",
        ));
    }

    info!("Connecting to: {}", connection.display_string());
    warehouse::connect(&connection).await
}

/// Applies the --min-ctr / --max-position row filters where the report's
/// columns support them.
fn apply_post_filters(cli: &Cli, kind: ReportKind, data: ReportData) -> ReportData {
    if cli.min_ctr.is_none() || data.error.is_some() {
        return data;
    }
    let columns = kind.declared_columns();
    if !columns.contains(&"avg_ctr_percentage") {
        return data;
    }
    ReportData {
        result: shaper::filter_rows(
            &data.result,
            "avg_ctr_percentage",
            "avg_position",
            cli.min_ctr,
            None,
        ),
        error: None,
    }
}

fn print_report_list() {
    println!("Available reports:");
    for kind in ReportKind::all() {
        println!("  {kind}");
    }
    println!("\nRun `seolens <report> --help` style: seolens top-keywords --start 2025-01-01");
}

fn render(
    kind: ReportKind,
    data: &ReportData,
    format: OutputFormat,
    brand_terms: &[String],
    keyword: Option<&str>,
) {
    match format {
        OutputFormat::Json => print_json(kind, data),
        OutputFormat::Text => print_text(kind, data, brand_terms, keyword),
    }
}

fn print_json(kind: ReportKind, data: &ReportData) {
    let rows: Vec<serde_json::Value> = (0..data.result.rows.len())
        .map(|row| {
            data.result
                .columns
                .iter()
                .enumerate()
                .map(|(i, col)| {
                    (
                        col.name.clone(),
                        value_to_json(&data.result.rows[row][i]),
                    )
                })
                .collect::<serde_json::Map<_, _>>()
                .into()
        })
        .collect();

    let payload = serde_json::json!({
        "report": kind.name(),
        "rows": rows,
        "row_count": data.result.row_count,
        "was_truncated": data.result.was_truncated,
        "error": data.error,
    });
    println!("{}", serde_json::to_string_pretty(&payload).unwrap_or_default());
}

fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => (*b).into(),
        Value::Int(i) => (*i).into(),
        Value::Float(f) => serde_json::json!(f),
        Value::String(s) => s.clone().into(),
        Value::Date(d) => d.to_string().into(),
    }
}

fn print_text(kind: ReportKind, data: &ReportData, brand_terms: &[String], keyword: Option<&str>) {
    if let Some(error) = &data.error {
        println!("Report '{kind}' failed: {error}");
        println!("(showing no data; the warehouse query did not complete)");
        return;
    }

    print_table(&data.result);
    if data.result.was_truncated {
        println!("(truncated to {} rows)", data.result.row_count);
    }

    match kind {
        ReportKind::SearchPerformance => {
            let summary = shaper::summarize_performance(&data.result);
            println!();
            println!(
                "Totals over {} days: {} clicks, {} impressions",
                summary.days, summary.total_clicks, summary.total_impressions
            );
            println!(
                "CTR {:.2}%, avg position {:.1}, week-over-week clicks {:+.1}%",
                summary.ctr_percentage, summary.avg_position, summary.week_over_week_pct
            );
        }
        ReportKind::ConversionFunnel => {
            println!();
            for stage in shaper::shape_funnel(&data.result) {
                println!("{:<22} {}", stage.name, stage.count);
            }
        }
        ReportKind::DataOverview => {
            if let Some(overview) = shaper::shape_overview(&data.result) {
                println!();
                if let Some(days) = overview.days_since_update {
                    println!("Last data update: {days} day(s) ago");
                }
            }
        }
        ReportKind::DataQuality => {
            if let Some(quality) = shaper::shape_quality(&data.result) {
                println!();
                if quality.is_clean() {
                    println!("No data quality issues detected");
                } else {
                    println!("{} quality issue(s) across {} rows", quality.issue_count(), quality.total_rows);
                }
            }
        }
        ReportKind::KeywordTrend => {
            if let Some(keyword) = keyword {
                let category = shaper::classify_query(keyword, brand_terms);
                println!("\nQuery category: {}", category.label());
            }
        }
        _ => {}
    }
}

/// Prints an aligned text table of the result set.
fn print_table(result: &ResultSet) {
    if result.columns.is_empty() {
        println!("(no columns)");
        return;
    }

    let mut widths: Vec<usize> = result.columns.iter().map(|c| c.name.len()).collect();
    let rendered: Vec<Vec<String>> = result
        .rows
        .iter()
        .map(|row| row.iter().map(render_cell).collect())
        .collect();
    for row in &rendered {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.len());
            }
        }
    }

    let header: Vec<String> = result
        .columns
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{:<width$}", c.name, width = widths[i]))
        .collect();
    println!("{}", header.join("  "));
    println!("{}", widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join("  "));

    for row in &rendered {
        let line: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, cell)| format!("{:<width$}", cell, width = widths.get(i).copied().unwrap_or(0)))
            .collect();
        println!("{}", line.join("  "));
    }

    if result.rows.is_empty() {
        println!("(0 rows)");
    }
}

fn render_cell(value: &Value) -> String {
    match value {
        Value::Float(f) => format!("{f:.2}"),
        other => other.to_display_string(),
    }
}
