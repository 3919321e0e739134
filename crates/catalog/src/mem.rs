use std::collections::BTreeMap;

use async_trait::async_trait;
use fluxgate_core::TableSpec;
use tokio::sync::RwLock;

use super::{Catalog, CatalogError, CatalogResult};

/// In-memory catalog for tests and local development.
///
/// `create_table` is create-or-replace: re-creating a table with the same
/// spec leaves the schema unchanged, matching the idempotence the
/// reconciler promises.
#[derive(Default)]
pub struct MemCatalog {
    // database -> table -> spec
    tables: RwLock<BTreeMap<String, BTreeMap<String, TableSpec>>>,
}

impl MemCatalog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Catalog for MemCatalog {
    async fn list_databases(&self) -> CatalogResult<Vec<String>> {
        Ok(self.tables.read().await.keys().cloned().collect())
    }

    async fn list_tables(&self, database: &str) -> CatalogResult<Vec<String>> {
        let tables = self.tables.read().await;
        Ok(tables
            .get(database)
            .map(|t| t.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn get_table(
        &self,
        database: &str,
        table: &str,
    ) -> CatalogResult<Option<TableSpec>> {
        let tables = self.tables.read().await;
        Ok(tables.get(database).and_then(|t| t.get(table)).cloned())
    }

    async fn create_table(&self, spec: &TableSpec) -> CatalogResult<()> {
        let mut tables = self.tables.write().await;
        tables
            .entry(spec.database.clone())
            .or_default()
            .insert(spec.table.clone(), spec.clone());
        Ok(())
    }

    async fn alter_table(
        &self,
        database: &str,
        table: &str,
        spec: &TableSpec,
    ) -> CatalogResult<()> {
        let mut tables = self.tables.write().await;
        let db = tables.get_mut(database).ok_or_else(|| {
            CatalogError::NotFound {
                database: database.to_string(),
                table: table.to_string(),
            }
        })?;
        if !db.contains_key(table) {
            return Err(CatalogError::NotFound {
                database: database.to_string(),
                table: table.to_string(),
            });
        }
        db.insert(table.to_string(), spec.clone());
        Ok(())
    }

    async fn drop_table(
        &self,
        database: &str,
        table: &str,
    ) -> CatalogResult<()> {
        let mut tables = self.tables.write().await;
        let removed = tables
            .get_mut(database)
            .and_then(|db| db.remove(table))
            .is_some();
        if removed {
            Ok(())
        } else {
            Err(CatalogError::NotFound {
                database: database.to_string(),
                table: table.to_string(),
            })
        }
    }

    async fn drop_columns(
        &self,
        database: &str,
        table: &str,
        columns: &[String],
    ) -> CatalogResult<()> {
        let mut tables = self.tables.write().await;
        let spec = tables
            .get_mut(database)
            .and_then(|db| db.get_mut(table))
            .ok_or_else(|| CatalogError::NotFound {
                database: database.to_string(),
                table: table.to_string(),
            })?;
        spec.columns.retain(|c| !columns.contains(&c.name));
        Ok(())
    }
}
