//! Table catalog client surface and the schema reconciler.
//!
//! The catalog itself is an external service; this crate defines the
//! operations fluxgate needs from it, an in-memory implementation for tests,
//! a REST client for real deployments, and the [`Reconciler`] that folds the
//! effective column modifiers into every table specification before it
//! reaches the catalog.

use std::borrow::Cow;

use async_trait::async_trait;
use fluxgate_core::TableSpec;
use thiserror::Error;

mod mem;
mod reconciler;
mod rest;

pub use mem::MemCatalog;
pub use reconciler::{
    ApplyAction, ApplyReport, ColumnOverride, ReconcileError, Reconciler,
};
pub use rest::RestCatalog;

/// Catalog failure taxonomy.
///
/// A missing table is a typed result, never conflated with transport
/// errors; DDL rejection carries the catalog's own detail and is reported
/// as-is, not retried.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("table {database}.{table} not found")]
    NotFound { database: String, table: String },

    #[error("catalog rejected DDL: {details}")]
    Ddl { details: Cow<'static, str> },

    #[error("catalog connection error: {details}")]
    Connect { details: Cow<'static, str> },

    #[error("catalog payload error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type CatalogResult<T> = std::result::Result<T, CatalogError>;

/// Operations required from the external table catalog.
///
/// Mutations are one logical operation per call; partial failure inside the
/// catalog (catalogs are not assumed to support transactional DDL) surfaces
/// through the returned error untouched.
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn list_databases(&self) -> CatalogResult<Vec<String>>;

    async fn list_tables(&self, database: &str) -> CatalogResult<Vec<String>>;

    /// Typed lookup: `Ok(None)` for a table that does not exist.
    async fn get_table(
        &self,
        database: &str,
        table: &str,
    ) -> CatalogResult<Option<TableSpec>>;

    async fn create_table(&self, spec: &TableSpec) -> CatalogResult<()>;

    async fn alter_table(
        &self,
        database: &str,
        table: &str,
        spec: &TableSpec,
    ) -> CatalogResult<()>;

    async fn drop_table(&self, database: &str, table: &str)
        -> CatalogResult<()>;

    async fn drop_columns(
        &self,
        database: &str,
        table: &str,
        columns: &[String],
    ) -> CatalogResult<()>;
}
