//! Mock warehouse clients for testing.
//!
//! `MockWarehouse` returns canned rows and records every query it is asked
//! to run, so tests can assert on generated SQL and binds. `FailingWarehouse`
//! simulates a warehouse that rejects every call, for exercising the
//! fail-soft path.

use super::{ResultSet, SqlQuery, Warehouse};
use crate::error::{LensError, Result};
use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

/// A mock warehouse that returns a fixed result for every query.
pub struct MockWarehouse {
    canned: ResultSet,
    executed: Mutex<Vec<SqlQuery>>,
}

impl MockWarehouse {
    /// Creates a mock that returns an empty result set.
    pub fn new() -> Self {
        Self::with_result(ResultSet::new())
    }

    /// Creates a mock that returns the given result for every query.
    pub fn with_result(result: ResultSet) -> Self {
        Self {
            canned: result,
            executed: Mutex::new(Vec::new()),
        }
    }

    /// Returns a copy of every query executed so far, in order.
    pub fn executed(&self) -> Vec<SqlQuery> {
        self.executed.lock().expect("mock lock poisoned").clone()
    }

    /// Returns the most recently executed query, if any.
    pub fn last_query(&self) -> Option<SqlQuery> {
        self.executed
            .lock()
            .expect("mock lock poisoned")
            .last()
            .cloned()
    }
}

impl Default for MockWarehouse {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Warehouse for MockWarehouse {
    async fn execute(&self, query: &SqlQuery) -> Result<ResultSet> {
        self.executed
            .lock()
            .expect("mock lock poisoned")
            .push(query.clone());

        let mut result = self.canned.clone();
        result.execution_time = Duration::from_millis(1);
        Ok(result)
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// A warehouse client whose every call fails.
pub struct FailingWarehouse;

#[async_trait]
impl Warehouse for FailingWarehouse {
    async fn execute(&self, _query: &SqlQuery) -> Result<ResultSet> {
        Err(LensError::query("simulated warehouse failure"))
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
