//! Warehouse abstraction layer for seo-lens.
//!
//! Provides a trait-based interface for query execution, allowing the
//! production Postgres client and in-memory test doubles to be used
//! interchangeably.

mod mock;
mod postgres;
mod types;

pub use mock::{FailingWarehouse, MockWarehouse};
pub use postgres::PostgresWarehouse;
pub use types::{ColumnInfo, ResultSet, Row, SqlParam, SqlQuery, Value};

use crate::config::ConnectionConfig;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Creates a warehouse client for the given configuration.
///
/// This is the central factory function for warehouse connections. A
/// connectivity or credential failure here is fatal; there is no degraded
/// mode before a client exists.
pub async fn connect(config: &ConnectionConfig) -> Result<Arc<dyn Warehouse>> {
    let client = PostgresWarehouse::connect(config).await?;
    Ok(Arc::new(client))
}

/// Trait defining the interface for warehouse clients.
///
/// All operations are async and return Results with LensError. Failure
/// conversion to the empty-ResultSet path happens one layer up, in the
/// executor.
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Executes a parameterized query and returns the results.
    async fn execute(&self, query: &SqlQuery) -> Result<ResultSet>;

    /// Closes the warehouse connection.
    async fn close(&self) -> Result<()>;
}
