//! Report catalog for seo-lens.
//!
//! Every dashboard report is a named, pure definition: validated
//! parameters in, a deterministic `SqlQuery` out. Two calls with identical
//! parameters produce byte-identical text and binds, which is what makes
//! result caching and golden-query tests possible.
//!
//! Caller-supplied strings (domains, keywords, brand terms) never appear
//! in query text; they are bound, and LIKE fragments are escaped.

mod builder;

pub use builder::{escape_like, is_safe_ident};

use builder::SelectBuilder;

use crate::config::DashboardConfig;
use crate::error::{LensError, Result};
use crate::warehouse::{SqlParam, SqlQuery};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Aggregate select-list fragments shared across reports.
const TOTAL_CLICKS: &str = "sum(clicks)::bigint AS total_clicks";
const TOTAL_IMPRESSIONS: &str = "sum(impressions)::bigint AS total_impressions";
const AVG_CTR: &str = "avg(ctr)::float8 AS avg_ctr";
const AVG_CTR_PCT: &str = "(avg(ctr) * 100)::float8 AS avg_ctr_percentage";
const AVG_POSITION: &str = "avg(position)::float8 AS avg_position";

/// Device segment recognized by the search console data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    Desktop,
    Mobile,
    Tablet,
}

impl Device {
    /// Returns the value as stored in the warehouse.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Desktop => "DESKTOP",
            Self::Mobile => "MOBILE",
            Self::Tablet => "TABLET",
        }
    }
}

impl FromStr for Device {
    type Err = LensError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "desktop" => Ok(Self::Desktop),
            "mobile" => Ok(Self::Mobile),
            "tablet" => Ok(Self::Tablet),
            _ => Err(LensError::validation(format!(
                "Unknown device '{s}'. Expected: desktop, mobile, or tablet"
            ))),
        }
    }
}

/// Named reports the catalog can build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReportKind {
    SearchPerformance,
    TopKeywords,
    TopPages,
    TrafficByDevice,
    TrafficByCountry,
    KeywordTrend,
    CompetitorAnalysis,
    ConversionFunnel,
    WeeklySummary,
    MonthlySummary,
    LandingPages,
    QueryCategory,
    TopOpportunities,
    PositionDistribution,
    DataOverview,
    DailyDataVolume,
    DataQuality,
}

impl ReportKind {
    /// All reports, for iteration in tests and CLI help.
    pub fn all() -> &'static [ReportKind] {
        &[
            Self::SearchPerformance,
            Self::TopKeywords,
            Self::TopPages,
            Self::TrafficByDevice,
            Self::TrafficByCountry,
            Self::KeywordTrend,
            Self::CompetitorAnalysis,
            Self::ConversionFunnel,
            Self::WeeklySummary,
            Self::MonthlySummary,
            Self::LandingPages,
            Self::QueryCategory,
            Self::TopOpportunities,
            Self::PositionDistribution,
            Self::DataOverview,
            Self::DailyDataVolume,
            Self::DataQuality,
        ]
    }

    /// Stable kebab-case name, used by the CLI and cache keys.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SearchPerformance => "search-performance",
            Self::TopKeywords => "top-keywords",
            Self::TopPages => "top-pages",
            Self::TrafficByDevice => "traffic-by-device",
            Self::TrafficByCountry => "traffic-by-country",
            Self::KeywordTrend => "keyword-trend",
            Self::CompetitorAnalysis => "competitor-analysis",
            Self::ConversionFunnel => "conversion-funnel",
            Self::WeeklySummary => "weekly-summary",
            Self::MonthlySummary => "monthly-summary",
            Self::LandingPages => "landing-pages",
            Self::QueryCategory => "query-category",
            Self::TopOpportunities => "top-opportunities",
            Self::PositionDistribution => "position-distribution",
            Self::DataOverview => "data-overview",
            Self::DailyDataVolume => "daily-data-volume",
            Self::DataQuality => "data-quality",
        }
    }

    /// The column set this report's generated query selects, in order.
    ///
    /// Kept in lockstep with the builders below; the catalog tests assert
    /// the declared set matches the generated SELECT list.
    pub fn declared_columns(&self) -> &'static [&'static str] {
        match self {
            Self::SearchPerformance => &[
                "date",
                "total_clicks",
                "total_impressions",
                "avg_ctr",
                "avg_position",
            ],
            Self::TopKeywords => &[
                "keyword",
                "total_clicks",
                "total_impressions",
                "avg_ctr_percentage",
                "avg_position",
                "days_visible",
            ],
            Self::TopPages => &[
                "page",
                "total_clicks",
                "total_impressions",
                "avg_ctr_percentage",
                "avg_position",
            ],
            Self::TrafficByDevice => &[
                "device",
                "total_clicks",
                "total_impressions",
                "avg_ctr_percentage",
                "avg_position",
            ],
            Self::TrafficByCountry => &[
                "country",
                "total_clicks",
                "total_impressions",
                "avg_ctr_percentage",
                "avg_position",
            ],
            Self::KeywordTrend => &[
                "date",
                "clicks",
                "impressions",
                "ctr_percentage",
                "position",
            ],
            Self::CompetitorAnalysis => &[
                "company_name",
                "keyword",
                "avg_position",
                "days_tracked",
                "best_position",
                "worst_position",
            ],
            Self::ConversionFunnel => &["total_impressions", "total_clicks"],
            Self::WeeklySummary => &[
                "week_start",
                "total_clicks",
                "total_impressions",
                "avg_ctr_percentage",
                "avg_position",
                "unique_keywords",
            ],
            Self::MonthlySummary => &[
                "month_start",
                "total_clicks",
                "total_impressions",
                "avg_ctr_percentage",
                "avg_position",
                "unique_keywords",
                "unique_pages",
            ],
            Self::LandingPages => &[
                "path",
                "total_clicks",
                "total_impressions",
                "avg_ctr_percentage",
                "avg_position",
                "unique_keywords",
            ],
            Self::QueryCategory => &[
                "query_type",
                "total_clicks",
                "total_impressions",
                "avg_ctr_percentage",
                "avg_position",
                "unique_queries",
            ],
            Self::TopOpportunities => &[
                "keyword",
                "total_impressions",
                "total_clicks",
                "avg_ctr_percentage",
                "avg_position",
                "opportunity_score",
            ],
            Self::PositionDistribution => &["position_range", "keyword_count"],
            Self::DataOverview => &[
                "total_rows",
                "earliest_date",
                "latest_date",
                "days_with_data",
                "unique_queries",
                "unique_pages",
                "unique_countries",
                "total_clicks",
                "total_impressions",
                "days_since_update",
            ],
            Self::DailyDataVolume => &[
                "date",
                "row_count",
                "unique_queries",
                "unique_pages",
                "total_clicks",
                "total_impressions",
            ],
            Self::DataQuality => &[
                "total_rows",
                "null_queries",
                "null_pages",
                "invalid_clicks",
                "invalid_ctr",
                "invalid_position",
            ],
        }
    }

    /// Returns true if this report needs a `keyword` parameter.
    pub fn requires_keyword(&self) -> bool {
        matches!(self, Self::KeywordTrend)
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ReportKind {
    type Err = LensError;

    fn from_str(s: &str) -> Result<Self> {
        ReportKind::all()
            .iter()
            .find(|k| k.name() == s)
            .copied()
            .ok_or_else(|| LensError::validation(format!("Unknown report '{s}'")))
    }
}

/// Validated parameters for a report query.
///
/// Constructed once, then treated as immutable; the `with_*` builders
/// consume and return the value.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportParams {
    /// Inclusive window start.
    pub start_date: NaiveDate,

    /// Inclusive window end.
    pub end_date: NaiveDate,

    /// Substring filter against URL-bearing columns. Absent means all
    /// domains: the generated query carries no domain predicate at all.
    pub domain: Option<String>,

    /// Device segments to include (empty means all).
    pub devices: Vec<Device>,

    /// ISO 3166-1 alpha-2 country codes to include (empty means all).
    pub countries: Vec<String>,

    /// Keyword literal for single-keyword reports.
    pub keyword: Option<String>,

    /// Row limit for limited reports.
    pub limit: u32,

    /// Impression floor for the opportunities report.
    pub min_impressions: i64,

    /// Position ceiling for the opportunities report.
    pub max_position: f64,
}

impl ReportParams {
    /// Creates parameters for the given inclusive window with defaults
    /// matching the dashboard's.
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Result<Self> {
        if start_date > end_date {
            return Err(LensError::validation(format!(
                "start_date {start_date} is after end_date {end_date}"
            )));
        }
        Ok(Self {
            start_date,
            end_date,
            domain: None,
            devices: Vec::new(),
            countries: Vec::new(),
            keyword: None,
            limit: 50,
            min_impressions: 1000,
            max_position: 20.0,
        })
    }

    /// Scopes results to one domain (substring match).
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Restricts device segments.
    pub fn with_devices(mut self, devices: Vec<Device>) -> Self {
        self.devices = devices;
        self
    }

    /// Restricts countries by alpha-2 code.
    pub fn with_countries(mut self, countries: Vec<String>) -> Self {
        self.countries = countries;
        self
    }

    /// Sets the keyword literal for keyword-scoped reports.
    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = Some(keyword.into());
        self
    }

    /// Sets the row limit.
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    /// Sets the opportunity thresholds.
    pub fn with_opportunity_thresholds(mut self, min_impressions: i64, max_position: f64) -> Self {
        self.min_impressions = min_impressions;
        self.max_position = max_position;
        self
    }

    /// Checks every constraint a report build relies on.
    ///
    /// Runs before query construction; nothing invalid reaches the
    /// warehouse.
    pub fn validate(&self, kind: ReportKind) -> Result<()> {
        if self.start_date > self.end_date {
            return Err(LensError::validation(format!(
                "start_date {} is after end_date {}",
                self.start_date, self.end_date
            )));
        }
        if self.limit == 0 {
            return Err(LensError::validation("limit must be positive"));
        }
        if self.min_impressions < 0 {
            return Err(LensError::validation("min_impressions must be >= 0"));
        }
        if !(self.max_position > 0.0) {
            return Err(LensError::validation("max_position must be positive"));
        }
        if let Some(domain) = &self.domain {
            if domain.is_empty() {
                return Err(LensError::validation("domain filter must not be empty"));
            }
        }
        for code in &self.countries {
            if code.len() != 2 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
                return Err(LensError::validation(format!(
                    "'{code}' is not a two-letter country code"
                )));
            }
        }
        if kind.requires_keyword() {
            match &self.keyword {
                Some(k) if !k.trim().is_empty() => {}
                _ => {
                    return Err(LensError::validation(format!(
                        "report '{kind}' requires a keyword"
                    )))
                }
            }
        }
        Ok(())
    }
}

/// Builds report queries against a configured warehouse schema.
pub struct ReportCatalog {
    dataset: String,
    brand_terms: Vec<String>,
}

impl ReportCatalog {
    /// Creates a catalog over the given schema with the given brand terms.
    pub fn new(dataset: impl Into<String>, brand_terms: Vec<String>) -> Result<Self> {
        let dataset = dataset.into();
        if !is_safe_ident(&dataset) {
            return Err(LensError::config(format!(
                "'{dataset}' is not a valid schema identifier"
            )));
        }
        Ok(Self {
            dataset,
            brand_terms,
        })
    }

    /// Creates a catalog from dashboard configuration.
    pub fn from_config(config: &DashboardConfig) -> Result<Self> {
        Self::new(config.dataset.clone(), config.brand_terms.clone())
    }

    /// Brand terms used by the query-category report.
    pub fn brand_terms(&self) -> &[String] {
        &self.brand_terms
    }

    /// Builds the query for a report. Pure and deterministic.
    pub fn build(&self, kind: ReportKind, params: &ReportParams) -> Result<SqlQuery> {
        params.validate(kind)?;

        let query = match kind {
            ReportKind::SearchPerformance => self.search_performance(params),
            ReportKind::TopKeywords => self.top_keywords(params),
            ReportKind::TopPages => self.top_pages(params),
            ReportKind::TrafficByDevice => self.traffic_by_device(params),
            ReportKind::TrafficByCountry => self.traffic_by_country(params),
            ReportKind::KeywordTrend => self.keyword_trend(params),
            ReportKind::CompetitorAnalysis => self.competitor_analysis(params),
            ReportKind::ConversionFunnel => self.conversion_funnel(params),
            ReportKind::WeeklySummary => self.periodic_summary(params, Period::Week),
            ReportKind::MonthlySummary => self.periodic_summary(params, Period::Month),
            ReportKind::LandingPages => self.landing_pages(params),
            ReportKind::QueryCategory => self.query_category(params),
            ReportKind::TopOpportunities => self.top_opportunities(params),
            ReportKind::PositionDistribution => self.position_distribution(params),
            ReportKind::DataOverview => self.data_overview(params),
            ReportKind::DailyDataVolume => self.daily_data_volume(params),
            ReportKind::DataQuality => self.data_quality(params),
        };
        Ok(query)
    }

    fn table(&self, name: &str) -> String {
        format!("{}.{name}", self.dataset)
    }

    fn console_table(&self) -> String {
        self.table("search_console_data")
    }

    /// Adds the inclusive date window predicate.
    fn date_window(b: &mut SelectBuilder, params: &ReportParams) {
        let start = b.bind(SqlParam::Date(params.start_date));
        let end = b.bind(SqlParam::Date(params.end_date));
        b.filter(format!("date BETWEEN {start} AND {end}"));
    }

    /// Adds the domain predicate only when a domain filter is present.
    fn domain_filter(b: &mut SelectBuilder, params: &ReportParams) {
        if let Some(domain) = &params.domain {
            let ph = b.bind(SqlParam::Str(escape_like(domain)));
            b.filter(format!(
                "(page LIKE '%' || {ph} || '%' ESCAPE '\\' OR url LIKE '%' || {ph} || '%' ESCAPE '\\')"
            ));
        }
    }

    fn search_performance(&self, params: &ReportParams) -> SqlQuery {
        let mut b = SelectBuilder::new(self.console_table());
        b.column("date")
            .column(TOTAL_CLICKS)
            .column(TOTAL_IMPRESSIONS)
            .column(AVG_CTR)
            .column(AVG_POSITION);
        Self::date_window(&mut b, params);
        Self::domain_filter(&mut b, params);
        b.group("date").order("date DESC");
        b.build()
    }

    fn top_keywords(&self, params: &ReportParams) -> SqlQuery {
        let mut b = SelectBuilder::new(self.console_table());
        b.column("query AS keyword")
            .column(TOTAL_CLICKS)
            .column(TOTAL_IMPRESSIONS)
            .column(AVG_CTR_PCT)
            .column(AVG_POSITION)
            .column("count(DISTINCT date) AS days_visible");
        Self::date_window(&mut b, params);
        b.filter("query IS NOT NULL").filter("query <> ''");
        Self::domain_filter(&mut b, params);
        b.group("query")
            .having("sum(clicks) > 0")
            .order("total_clicks DESC")
            .limit(params.limit);
        b.build()
    }

    fn top_pages(&self, params: &ReportParams) -> SqlQuery {
        let mut b = SelectBuilder::new(self.console_table());
        b.column("page")
            .column(TOTAL_CLICKS)
            .column(TOTAL_IMPRESSIONS)
            .column(AVG_CTR_PCT)
            .column(AVG_POSITION);
        Self::date_window(&mut b, params);
        b.filter("page IS NOT NULL");
        Self::domain_filter(&mut b, params);
        b.group("page")
            .having("sum(impressions) > 100")
            .order("total_clicks DESC")
            .limit(params.limit);
        b.build()
    }

    fn traffic_by_device(&self, params: &ReportParams) -> SqlQuery {
        let mut b = SelectBuilder::new(self.console_table());
        b.column("device")
            .column(TOTAL_CLICKS)
            .column(TOTAL_IMPRESSIONS)
            .column(AVG_CTR_PCT)
            .column(AVG_POSITION);
        Self::date_window(&mut b, params);
        b.filter("device IS NOT NULL");
        if !params.devices.is_empty() {
            let placeholders: Vec<String> = params
                .devices
                .iter()
                .map(|d| b.bind(SqlParam::Str(d.as_sql().to_string())))
                .collect();
            b.filter(format!("device IN ({})", placeholders.join(", ")));
        }
        Self::domain_filter(&mut b, params);
        b.group("device").order("total_clicks DESC");
        b.build()
    }

    fn traffic_by_country(&self, params: &ReportParams) -> SqlQuery {
        let mut b = SelectBuilder::new(self.console_table());
        b.column("country")
            .column(TOTAL_CLICKS)
            .column(TOTAL_IMPRESSIONS)
            .column(AVG_CTR_PCT)
            .column(AVG_POSITION);
        Self::date_window(&mut b, params);
        b.filter("country IS NOT NULL");
        if !params.countries.is_empty() {
            let placeholders: Vec<String> = params
                .countries
                .iter()
                .map(|c| b.bind(SqlParam::Str(c.to_uppercase())))
                .collect();
            b.filter(format!("country IN ({})", placeholders.join(", ")));
        }
        Self::domain_filter(&mut b, params);
        b.group("country")
            .order("total_clicks DESC")
            .limit(params.limit);
        b.build()
    }

    fn keyword_trend(&self, params: &ReportParams) -> SqlQuery {
        let keyword = params.keyword.as_deref().unwrap_or_default();
        let mut b = SelectBuilder::new(self.console_table());
        b.column("date")
            .column("clicks::bigint AS clicks")
            .column("impressions::bigint AS impressions")
            .column("(ctr * 100)::float8 AS ctr_percentage")
            .column("position::float8 AS position");
        Self::date_window(&mut b, params);
        let ph = b.bind(SqlParam::Str(keyword.to_string()));
        b.filter(format!("lower(query) = lower({ph})"));
        Self::domain_filter(&mut b, params);
        b.order("date DESC");
        b.build()
    }

    /// Rank tracking lives in a separate table keyed by company, so this
    /// report takes no domain filter.
    fn competitor_analysis(&self, params: &ReportParams) -> SqlQuery {
        let mut b = SelectBuilder::new(self.table("keyword_positions"));
        b.column("company_name")
            .column("keyword")
            .column("avg(position)::float8 AS avg_position")
            .column("count(DISTINCT date) AS days_tracked")
            .column("min(position)::float8 AS best_position")
            .column("max(position)::float8 AS worst_position");
        Self::date_window(&mut b, params);
        b.filter("position IS NOT NULL").filter("position > 0");
        b.group("company_name")
            .group("keyword")
            .order("company_name")
            .order("avg_position");
        b.build()
    }

    fn conversion_funnel(&self, params: &ReportParams) -> SqlQuery {
        let mut b = SelectBuilder::new(self.console_table());
        b.column(TOTAL_IMPRESSIONS).column(TOTAL_CLICKS);
        Self::date_window(&mut b, params);
        Self::domain_filter(&mut b, params);
        b.build()
    }

    fn periodic_summary(&self, params: &ReportParams, period: Period) -> SqlQuery {
        let (trunc, alias) = match period {
            Period::Week => ("week", "week_start"),
            Period::Month => ("month", "month_start"),
        };
        let mut b = SelectBuilder::new(self.console_table());
        b.column(format!("date_trunc('{trunc}', date)::date AS {alias}"))
            .column(TOTAL_CLICKS)
            .column(TOTAL_IMPRESSIONS)
            .column(AVG_CTR_PCT)
            .column(AVG_POSITION)
            .column("count(DISTINCT query) AS unique_keywords");
        if period == Period::Month {
            b.column("count(DISTINCT page) AS unique_pages");
        }
        Self::date_window(&mut b, params);
        Self::domain_filter(&mut b, params);
        b.group(alias).order(format!("{alias} DESC"));
        b.build()
    }

    fn landing_pages(&self, params: &ReportParams) -> SqlQuery {
        let mut b = SelectBuilder::new(self.console_table());
        b.column("substring(page FROM '^https?://[^/]+(/[^?]*)') AS path")
            .column(TOTAL_CLICKS)
            .column(TOTAL_IMPRESSIONS)
            .column(AVG_CTR_PCT)
            .column(AVG_POSITION)
            .column("count(DISTINCT query) AS unique_keywords");
        Self::date_window(&mut b, params);
        b.filter("page IS NOT NULL");
        Self::domain_filter(&mut b, params);
        b.group("path")
            .having("sum(impressions) > 100")
            .order("total_clicks DESC")
            .limit(params.limit);
        b.build()
    }

    fn query_category(&self, params: &ReportParams) -> SqlQuery {
        let mut b = SelectBuilder::new(self.console_table());

        // Brand terms are configuration, not trusted input: they travel
        // as lowercased, LIKE-escaped binds.
        let category = if self.brand_terms.is_empty() {
            "'Non-Branded' AS query_type".to_string()
        } else {
            let matches: Vec<String> = self
                .brand_terms
                .iter()
                .map(|term| {
                    let ph = b.bind(SqlParam::Str(escape_like(&term.to_lowercase())));
                    format!("lower(query) LIKE '%' || {ph} || '%' ESCAPE '\\'")
                })
                .collect();
            format!(
                "CASE WHEN {} THEN 'Branded' ELSE 'Non-Branded' END AS query_type",
                matches.join(" OR ")
            )
        };
        b.column(category)
            .column(TOTAL_CLICKS)
            .column(TOTAL_IMPRESSIONS)
            .column(AVG_CTR_PCT)
            .column(AVG_POSITION)
            .column("count(DISTINCT query) AS unique_queries");
        Self::date_window(&mut b, params);
        b.filter("query IS NOT NULL");
        Self::domain_filter(&mut b, params);
        b.group("query_type").order("total_clicks DESC");
        b.build()
    }

    fn top_opportunities(&self, params: &ReportParams) -> SqlQuery {
        let mut b = SelectBuilder::new(self.console_table());
        b.column("query AS keyword")
            .column(TOTAL_IMPRESSIONS)
            .column(TOTAL_CLICKS)
            .column(AVG_CTR_PCT)
            .column(AVG_POSITION)
            // Heuristic ranking, preserved exactly for compatibility with
            // the dashboard's historical scoring.
            .column("(sum(impressions) * (0.3 - avg(ctr)))::float8 AS opportunity_score");
        Self::date_window(&mut b, params);
        b.filter("query IS NOT NULL");
        Self::domain_filter(&mut b, params);
        let min_impressions = b.bind(SqlParam::Int(params.min_impressions));
        let max_position = b.bind(SqlParam::Float(params.max_position));
        b.group("query")
            .having(format!("sum(impressions) >= {min_impressions}"))
            .having(format!("avg(position) <= {max_position}"))
            .having("avg(ctr) * 100 < 3.0")
            .order("opportunity_score DESC")
            .limit(params.limit);
        b.build()
    }

    fn position_distribution(&self, params: &ReportParams) -> SqlQuery {
        let mut inner = SelectBuilder::new(self.console_table());
        inner
            .column("query")
            .column("avg(position)::float8 AS avg_position");
        Self::date_window(&mut inner, params);
        inner
            .filter("query IS NOT NULL")
            .filter("position IS NOT NULL")
            .filter("position > 0");
        Self::domain_filter(&mut inner, params);
        inner.group("query");
        let inner = inner.build();

        // Buckets use inclusive upper bounds: a position of exactly 10
        // lands in 'Top 10'.
        let text = format!(
            "SELECT CASE WHEN avg_position <= 3 THEN 'Top 3' \
             WHEN avg_position <= 10 THEN 'Top 10' \
             WHEN avg_position <= 20 THEN 'Top 20' \
             WHEN avg_position <= 50 THEN 'Top 50' \
             ELSE 'Beyond 50' END AS position_range, count(*) AS keyword_count\n\
             FROM ({}) ranked\n\
             GROUP BY position_range\n\
             ORDER BY CASE position_range WHEN 'Top 3' THEN 1 WHEN 'Top 10' THEN 2 \
             WHEN 'Top 20' THEN 3 WHEN 'Top 50' THEN 4 ELSE 5 END",
            inner.text
        );
        SqlQuery {
            text,
            params: inner.params,
        }
    }

    fn data_overview(&self, params: &ReportParams) -> SqlQuery {
        let mut b = SelectBuilder::new(self.console_table());
        b.column("count(*) AS total_rows")
            .column("min(date) AS earliest_date")
            .column("max(date) AS latest_date")
            .column("count(DISTINCT date) AS days_with_data")
            .column("count(DISTINCT query) AS unique_queries")
            .column("count(DISTINCT page) AS unique_pages")
            .column("count(DISTINCT country) AS unique_countries")
            .column(TOTAL_CLICKS)
            .column(TOTAL_IMPRESSIONS)
            .column("(CURRENT_DATE - max(date)) AS days_since_update");
        Self::date_window(&mut b, params);
        Self::domain_filter(&mut b, params);
        b.build()
    }

    fn daily_data_volume(&self, params: &ReportParams) -> SqlQuery {
        let mut b = SelectBuilder::new(self.console_table());
        b.column("date")
            .column("count(*) AS row_count")
            .column("count(DISTINCT query) AS unique_queries")
            .column("count(DISTINCT page) AS unique_pages")
            .column(TOTAL_CLICKS)
            .column(TOTAL_IMPRESSIONS);
        Self::date_window(&mut b, params);
        Self::domain_filter(&mut b, params);
        b.group("date").order("date ASC");
        b.build()
    }

    fn data_quality(&self, params: &ReportParams) -> SqlQuery {
        let mut b = SelectBuilder::new(self.console_table());
        b.column("count(*) AS total_rows")
            .column("count(*) FILTER (WHERE query IS NULL OR query = '') AS null_queries")
            .column("count(*) FILTER (WHERE page IS NULL OR page = '') AS null_pages")
            .column("count(*) FILTER (WHERE clicks > impressions) AS invalid_clicks")
            .column("count(*) FILTER (WHERE ctr > 1) AS invalid_ctr")
            .column("count(*) FILTER (WHERE position < 0 OR position > 1000) AS invalid_position");
        Self::date_window(&mut b, params);
        Self::domain_filter(&mut b, params);
        b.build()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Period {
    Week,
    Month,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn catalog() -> ReportCatalog {
        ReportCatalog::new(
            "seo_data",
            vec!["twelve".to_string(), "12transfers".to_string()],
        )
        .unwrap()
    }

    fn params() -> ReportParams {
        ReportParams::new(date(2025, 1, 1), date(2025, 1, 31)).unwrap()
    }

    #[test]
    fn test_build_is_deterministic_for_all_reports() {
        let catalog = catalog();
        let params = params().with_keyword("airport taxi");
        for kind in ReportKind::all() {
            let a = catalog.build(*kind, &params).unwrap();
            let b = catalog.build(*kind, &params).unwrap();
            assert_eq!(a, b, "report {kind} not deterministic");
        }
    }

    #[test]
    fn test_date_window_is_inclusive_between() {
        let query = catalog()
            .build(ReportKind::SearchPerformance, &params())
            .unwrap();
        assert!(query.text.contains("date BETWEEN $1 AND $2"));
        assert_eq!(query.params[0], SqlParam::Date(date(2025, 1, 1)));
        assert_eq!(query.params[1], SqlParam::Date(date(2025, 1, 31)));
    }

    #[test]
    fn test_invalid_window_rejected() {
        let result = ReportParams::new(date(2025, 2, 1), date(2025, 1, 1));
        assert!(matches!(result, Err(LensError::Validation(_))));
    }

    #[test]
    fn test_zero_limit_rejected() {
        let params = params().with_limit(0);
        let result = catalog().build(ReportKind::TopKeywords, &params);
        assert!(matches!(result, Err(LensError::Validation(_))));
    }

    #[test]
    fn test_no_domain_means_no_like_predicate() {
        let query = catalog()
            .build(ReportKind::SearchPerformance, &params())
            .unwrap();
        assert!(!query.text.contains("LIKE"));
    }

    #[test]
    fn test_domain_filter_is_bound_and_escaped() {
        let params = params().with_domain("twelve%transfers.com");
        let query = catalog()
            .build(ReportKind::SearchPerformance, &params)
            .unwrap();

        // Both URL columns match against the same single bind
        assert!(query.text.contains("page LIKE '%' || $3 || '%' ESCAPE '\\'"));
        assert!(query.text.contains("url LIKE '%' || $3 || '%' ESCAPE '\\'"));
        assert!(!query.text.contains("twelve"));
        assert_eq!(
            query.params[2],
            SqlParam::Str("twelve\\%transfers.com".to_string())
        );
    }

    #[test]
    fn test_keyword_is_bound_never_interpolated() {
        let params = params().with_keyword("'; DROP TABLE search_console_data; --");
        let query = catalog().build(ReportKind::KeywordTrend, &params).unwrap();
        assert!(!query.text.contains("DROP TABLE"));
        assert!(query.text.contains("lower(query) = lower($3)"));
        assert_eq!(
            query.params[2],
            SqlParam::Str("'; DROP TABLE search_console_data; --".to_string())
        );
    }

    #[test]
    fn test_keyword_trend_requires_keyword() {
        let result = catalog().build(ReportKind::KeywordTrend, &params());
        assert!(matches!(result, Err(LensError::Validation(_))));
    }

    #[test]
    fn test_device_set_filter() {
        let params = params().with_devices(vec![Device::Mobile, Device::Tablet]);
        let query = catalog()
            .build(ReportKind::TrafficByDevice, &params)
            .unwrap();
        assert!(query.text.contains("device IN ($3, $4)"));
        assert_eq!(query.params[2], SqlParam::Str("MOBILE".to_string()));
        assert_eq!(query.params[3], SqlParam::Str("TABLET".to_string()));
    }

    #[test]
    fn test_country_codes_validated_and_uppercased() {
        let params = params().with_countries(vec!["gb".to_string(), "US".to_string()]);
        let query = catalog()
            .build(ReportKind::TrafficByCountry, &params)
            .unwrap();
        assert_eq!(query.params[2], SqlParam::Str("GB".to_string()));
        assert_eq!(query.params[3], SqlParam::Str("US".to_string()));

        let bad = params.with_countries(vec!["GBR".to_string()]);
        let result = catalog().build(ReportKind::TrafficByCountry, &bad);
        assert!(matches!(result, Err(LensError::Validation(_))));
    }

    #[test]
    fn test_brand_terms_are_bound_lowercase() {
        let query = catalog().build(ReportKind::QueryCategory, &params()).unwrap();
        assert!(query.text.contains("THEN 'Branded' ELSE 'Non-Branded'"));
        assert!(query.text.contains("lower(query) LIKE '%' || $1 || '%'"));
        assert!(query.text.contains("lower(query) LIKE '%' || $2 || '%'"));
        assert_eq!(query.params[0], SqlParam::Str("twelve".to_string()));
        assert_eq!(query.params[1], SqlParam::Str("12transfers".to_string()));
    }

    #[test]
    fn test_no_brand_terms_yields_constant_category() {
        let catalog = ReportCatalog::new("seo_data", Vec::new()).unwrap();
        let query = catalog.build(ReportKind::QueryCategory, &params()).unwrap();
        assert!(query.text.contains("'Non-Branded' AS query_type"));
        assert!(!query.text.contains("CASE WHEN"));
    }

    #[test]
    fn test_opportunity_score_formula_preserved() {
        let params = params().with_opportunity_thresholds(1000, 20.0);
        let query = catalog()
            .build(ReportKind::TopOpportunities, &params)
            .unwrap();
        assert!(query
            .text
            .contains("(sum(impressions) * (0.3 - avg(ctr)))::float8 AS opportunity_score"));
        assert!(query.text.contains("sum(impressions) >= $3"));
        assert!(query.text.contains("avg(position) <= $4"));
        assert!(query.text.contains("avg(ctr) * 100 < 3.0"));
        assert!(query.text.contains("ORDER BY opportunity_score DESC"));
        assert_eq!(query.params[2], SqlParam::Int(1000));
        assert_eq!(query.params[3], SqlParam::Float(20.0));
    }

    #[test]
    fn test_competitor_analysis_reads_keyword_positions() {
        let query = catalog()
            .build(ReportKind::CompetitorAnalysis, &params())
            .unwrap();
        assert!(query.text.contains("FROM seo_data.keyword_positions"));
        assert!(query.text.contains("date BETWEEN $1 AND $2"));
        assert!(query.text.contains("position IS NOT NULL"));
        assert!(query.text.contains("position > 0"));
        assert!(query.text.contains("GROUP BY company_name, keyword"));
        assert!(query.text.contains("ORDER BY company_name, avg_position"));
        assert_eq!(query.params.len(), 2);
    }

    #[test]
    fn test_competitor_analysis_ignores_domain_filter() {
        let params = params().with_domain("12transfers.com");
        let query = catalog()
            .build(ReportKind::CompetitorAnalysis, &params)
            .unwrap();
        assert!(!query.text.contains("LIKE"));
        assert_eq!(query.params.len(), 2);
    }

    #[test]
    fn test_position_distribution_buckets_inclusive_upper() {
        let query = catalog()
            .build(ReportKind::PositionDistribution, &params())
            .unwrap();
        assert!(query.text.contains("avg_position <= 3 THEN 'Top 3'"));
        assert!(query.text.contains("avg_position <= 10 THEN 'Top 10'"));
        assert!(query.text.contains("avg_position <= 20 THEN 'Top 20'"));
        assert!(query.text.contains("avg_position <= 50 THEN 'Top 50'"));
        assert!(query.text.contains("ELSE 'Beyond 50'"));
    }

    #[test]
    fn test_explicit_ordering_everywhere_it_matters() {
        let catalog = catalog();
        let params = params().with_keyword("airport taxi");
        for kind in ReportKind::all() {
            let query = catalog.build(*kind, &params).unwrap();
            let single_row = matches!(
                kind,
                ReportKind::ConversionFunnel | ReportKind::DataOverview | ReportKind::DataQuality
            );
            if !single_row {
                assert!(
                    query.text.contains("ORDER BY"),
                    "report {kind} lacks an explicit ORDER BY"
                );
            }
        }
    }

    #[test]
    fn test_invalid_dataset_rejected() {
        let result = ReportCatalog::new("seo-data; DROP", Vec::new());
        assert!(matches!(result, Err(LensError::Config(_))));
    }

    #[test]
    fn test_report_kind_round_trips_through_names() {
        for kind in ReportKind::all() {
            assert_eq!(*kind, kind.name().parse::<ReportKind>().unwrap());
        }
        assert!("no-such-report".parse::<ReportKind>().is_err());
    }
}
