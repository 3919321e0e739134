//! Schema reconciliation: effective modifiers folded into catalog mutations.
//!
//! The reconciler holds no persistent state of its own. It is a pure
//! function of (table specification, effective modifiers) producing a
//! catalog mutation, executed against the external catalog service. The
//! modifier log and the catalog are two independent commit points: a
//! modifier committed but not yet reconciled into the catalog is an
//! accepted eventual-consistency window.

use std::sync::Arc;

use fluxgate_core::{ColumnType, ModifierKind, TableSpec};
use fluxgate_modifier_store::{ModifierStore, StoreError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use super::{Catalog, CatalogError, CatalogResult};

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Which mutation a report describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyAction {
    Create,
    Update,
}

/// A type override that was applied to one column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnOverride {
    pub column: String,
    pub declared: ColumnType,
    pub applied: ColumnType,
}

/// Structured outcome of a catalog mutation.
///
/// Returned to the caller instead of a bare acknowledgment so operators can
/// see exactly which columns the modifier log rewrote or removed, and can
/// correlate follow-up questions by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyReport {
    pub correlation_id: Uuid,
    pub database: String,
    pub table: String,
    pub action: ApplyAction,
    pub columns_applied: usize,
    pub ignored: Vec<String>,
    pub overridden: Vec<ColumnOverride>,
}

/// Bridges the modifier audit log and the table catalog.
pub struct Reconciler {
    modifiers: Arc<dyn ModifierStore>,
    catalog: Arc<dyn Catalog>,
}

impl Reconciler {
    pub fn new(
        modifiers: Arc<dyn ModifierStore>,
        catalog: Arc<dyn Catalog>,
    ) -> Self {
        Self { modifiers, catalog }
    }

    /// Resolve every column of `spec` against the effective modifiers.
    ///
    /// `Ignore` removes the column from the plan entirely; a type override
    /// replaces the declared primitive type; no modifier keeps the declared
    /// type. Column order is preserved for the surviving columns.
    pub async fn effective_spec(
        &self,
        mut spec: TableSpec,
    ) -> Result<(TableSpec, Vec<String>, Vec<ColumnOverride>), ReconcileError>
    {
        let mut ignored = Vec::new();
        let mut overridden = Vec::new();
        let mut columns = Vec::with_capacity(spec.columns.len());

        for mut column in spec.columns {
            match self
                .modifiers
                .resolve_effective(&spec.table, &column.name)
                .await?
            {
                Some(ModifierKind::Ignore) => {
                    ignored.push(column.name);
                }
                Some(ModifierKind::Override(t)) => {
                    if t != column.column_type {
                        overridden.push(ColumnOverride {
                            column: column.name.clone(),
                            declared: column.column_type,
                            applied: t,
                        });
                        column.column_type = t;
                    }
                    columns.push(column);
                }
                None => columns.push(column),
            }
        }

        spec.columns = columns;
        Ok((spec, ignored, overridden))
    }

    /// Create a table from a specification, modifiers applied.
    pub async fn create_table(
        &self,
        database: &str,
        mut spec: TableSpec,
    ) -> Result<ApplyReport, ReconcileError> {
        spec.database = database.to_string();
        let (spec, ignored, overridden) = self.effective_spec(spec).await?;

        self.catalog.create_table(&spec).await?;
        let report = report(ApplyAction::Create, &spec, ignored, overridden);
        info!(
            database = %report.database,
            table = %report.table,
            correlation_id = %report.correlation_id,
            columns = report.columns_applied,
            "table created"
        );
        Ok(report)
    }

    /// Replace a table's specification, modifiers applied.
    pub async fn update_table(
        &self,
        database: &str,
        table: &str,
        mut spec: TableSpec,
    ) -> Result<ApplyReport, ReconcileError> {
        spec.database = database.to_string();
        spec.table = table.to_string();
        let (spec, ignored, overridden) = self.effective_spec(spec).await?;

        self.catalog.alter_table(database, table, &spec).await?;
        let report = report(ApplyAction::Update, &spec, ignored, overridden);
        info!(
            database = %report.database,
            table = %report.table,
            correlation_id = %report.correlation_id,
            columns = report.columns_applied,
            "table updated"
        );
        Ok(report)
    }

    /// Unconditional column removal. An explicit operator action that does
    /// not consult the modifier log.
    pub async fn drop_columns(
        &self,
        database: &str,
        table: &str,
        columns: &[String],
    ) -> CatalogResult<()> {
        debug!(%database, %table, ?columns, "dropping columns");
        self.catalog.drop_columns(database, table, columns).await
    }

    pub async fn drop_table(
        &self,
        database: &str,
        table: &str,
    ) -> CatalogResult<()> {
        self.catalog.drop_table(database, table).await
    }

    pub async fn get_table(
        &self,
        database: &str,
        table: &str,
    ) -> CatalogResult<Option<TableSpec>> {
        self.catalog.get_table(database, table).await
    }

    pub async fn list_databases(&self) -> CatalogResult<Vec<String>> {
        self.catalog.list_databases().await
    }

    pub async fn list_tables(
        &self,
        database: &str,
    ) -> CatalogResult<Vec<String>> {
        self.catalog.list_tables(database).await
    }
}

fn report(
    action: ApplyAction,
    spec: &TableSpec,
    ignored: Vec<String>,
    overridden: Vec<ColumnOverride>,
) -> ApplyReport {
    ApplyReport {
        correlation_id: Uuid::new_v4(),
        database: spec.database.clone(),
        table: spec.table.clone(),
        action,
        columns_applied: spec.columns.len(),
        ignored,
        overridden,
    }
}
