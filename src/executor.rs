//! Report execution against a warehouse.
//!
//! The executor is deliberately fail-soft: a warehouse failure while
//! running a report produces an empty `ResultSet` plus an error indicator,
//! not an `Err`, so one broken report never takes the whole dashboard
//! down. Only validation and query-construction problems, caught before
//! any warehouse contact, surface as hard errors.

use crate::catalog::{ReportCatalog, ReportKind, ReportParams};
use crate::error::Result;
use crate::warehouse::{ResultSet, SqlQuery, Warehouse};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Outcome of running one report.
///
/// An empty `result` with `error: None` means the warehouse genuinely
/// returned zero rows; `error: Some(..)` means the query failed and the
/// empty result is a stand-in.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportData {
    pub result: ResultSet,
    pub error: Option<String>,
}

impl ReportData {
    /// Wraps a successful result.
    pub fn ok(result: ResultSet) -> Self {
        Self {
            result,
            error: None,
        }
    }

    /// Wraps a failure as an empty result with the error message attached.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            result: ResultSet::new(),
            error: Some(message.into()),
        }
    }

    /// Returns true if the query ran without error.
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Runs catalog reports against a warehouse client.
pub struct ReportExecutor {
    warehouse: Arc<dyn Warehouse>,
    catalog: ReportCatalog,
}

impl ReportExecutor {
    pub fn new(warehouse: Arc<dyn Warehouse>, catalog: ReportCatalog) -> Self {
        Self { warehouse, catalog }
    }

    pub fn catalog(&self) -> &ReportCatalog {
        &self.catalog
    }

    /// Builds and runs one report.
    ///
    /// Returns `Err` only for invalid parameters; warehouse failures come
    /// back inside the `ReportData`.
    pub async fn fetch(&self, kind: ReportKind, params: &ReportParams) -> Result<ReportData> {
        let query = self.catalog.build(kind, params)?;
        debug!(report = %kind, query = %query.preview(), "running report");
        Ok(self.run(&query).await)
    }

    /// Runs an already-built query with fail-soft semantics.
    pub async fn run(&self, query: &SqlQuery) -> ReportData {
        match self.warehouse.execute(query).await {
            Ok(result) => {
                info!(
                    rows = result.row_count,
                    elapsed_ms = result.execution_time.as_millis() as u64,
                    "query completed"
                );
                ReportData::ok(result)
            }
            Err(e) => {
                error!(query = %query.preview(), error = %e, "query failed");
                ReportData::failed(e.to_string())
            }
        }
    }

    /// Returns true if the warehouse answers a trivial query.
    pub async fn test_connection(&self) -> bool {
        self.warehouse.execute(&SqlQuery::raw("SELECT 1")).await.is_ok()
    }
}
