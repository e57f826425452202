//! seo-lens: data-access core for SEO warehouse reporting.
//!
//! The crate is organized around three layers:
//! - [`catalog`]: named report definitions that render to parameterized SQL
//! - [`executor`]: fail-soft execution against a [`warehouse::Warehouse`]
//! - [`shaper`]: pure post-processing of result sets into dashboard values
//!
//! Supporting modules cover connection/config handling ([`config`]),
//! result caching ([`cache`]), structured errors ([`error`]), and logging
//! setup ([`logging`]).

pub mod cache;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod shaper;
pub mod warehouse;

pub use error::{LensError, Result};
