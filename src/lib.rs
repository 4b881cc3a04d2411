//! Tabular-result transformation for the querier datasource.
//!
//! The workspace members do the work: [`transform`] turns engine results
//! into typed series, [`querier_sdk`] talks to the engines and [`common`]
//! loads configuration. The Grafana plugin binary lives in
//! `src/grafana-plugin/backend`.

pub use common;
pub use querier_sdk;
pub use transform;
