//! Controller implementations bridging the HTTP surface to the domain
//! components.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Bytes;
use metrics::counter;

use fluxgate_broker::{ConsumerOffsets, IngestGateway, OffsetController};
use fluxgate_catalog::{ApplyReport, Reconciler};
use fluxgate_core::{ColumnModifier, ColumnSpec, TableSpec};
use fluxgate_modifier_store::ModifierStore;
use fluxgate_rest_api::{
    ApiError, IngestController, ModifierController, ReplayController,
    SchemaController,
};

pub struct IngestApi {
    gateway: IngestGateway,
}

impl IngestApi {
    pub fn new(gateway: IngestGateway) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl IngestController for IngestApi {
    async fn ingest(&self, payload: Bytes) -> Result<String, ApiError> {
        Ok(self.gateway.ingest(payload).await?)
    }
}

pub struct ModifierApi {
    store: Arc<dyn ModifierStore>,
}

impl ModifierApi {
    pub fn new(store: Arc<dyn ModifierStore>) -> Self {
        Self { store }
    }

    async fn collect(
        &self,
        event_type: &str,
    ) -> Result<Vec<ColumnModifier>, ApiError> {
        let mut entries = Vec::new();
        for column in self.store.columns(event_type).await? {
            entries.extend(self.store.history(event_type, &column).await?);
        }
        Ok(entries)
    }
}

#[async_trait]
impl ModifierController for ModifierApi {
    async fn append(&self, modifier: ColumnModifier) -> Result<(), ApiError> {
        self.store.append(&modifier).await?;
        counter!("fluxgate_modifiers_appended_total").increment(1);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<ColumnModifier>, ApiError> {
        let mut entries = Vec::new();
        for event_type in self.store.event_types().await? {
            entries.extend(self.collect(&event_type).await?);
        }
        entries.sort_by(|a, b| b.ts_ms.cmp(&a.ts_ms));
        Ok(entries)
    }

    async fn list_for(
        &self,
        event_type: &str,
    ) -> Result<Vec<ColumnModifier>, ApiError> {
        let mut entries = self.collect(event_type).await?;
        entries.sort_by(|a, b| b.ts_ms.cmp(&a.ts_ms));
        Ok(entries)
    }
}

pub struct SchemaApi {
    reconciler: Arc<Reconciler>,
}

impl SchemaApi {
    pub fn new(reconciler: Arc<Reconciler>) -> Self {
        Self { reconciler }
    }
}

#[async_trait]
impl SchemaController for SchemaApi {
    async fn list_databases(&self) -> Result<Vec<String>, ApiError> {
        Ok(self.reconciler.list_databases().await?)
    }

    async fn list_tables(
        &self,
        database: &str,
    ) -> Result<Vec<String>, ApiError> {
        Ok(self.reconciler.list_tables(database).await?)
    }

    async fn get_table(
        &self,
        database: &str,
        table: &str,
    ) -> Result<Option<TableSpec>, ApiError> {
        Ok(self.reconciler.get_table(database, table).await?)
    }

    async fn create_table(
        &self,
        database: &str,
        table: &str,
        columns: Vec<ColumnSpec>,
    ) -> Result<ApplyReport, ApiError> {
        let spec = TableSpec::new(database, table, columns);
        let report = self.reconciler.create_table(database, spec).await?;
        counter!("fluxgate_catalog_mutations_total", "op" => "create")
            .increment(1);
        Ok(report)
    }

    async fn update_table(
        &self,
        database: &str,
        table: &str,
        columns: Vec<ColumnSpec>,
    ) -> Result<ApplyReport, ApiError> {
        let spec = TableSpec::new(database, table, columns);
        let report =
            self.reconciler.update_table(database, table, spec).await?;
        counter!("fluxgate_catalog_mutations_total", "op" => "update")
            .increment(1);
        Ok(report)
    }

    async fn drop_table(
        &self,
        database: &str,
        table: &str,
    ) -> Result<(), ApiError> {
        self.reconciler.drop_table(database, table).await?;
        counter!("fluxgate_catalog_mutations_total", "op" => "drop_table")
            .increment(1);
        Ok(())
    }

    async fn drop_columns(
        &self,
        database: &str,
        table: &str,
        columns: Vec<String>,
    ) -> Result<(), ApiError> {
        self.reconciler
            .drop_columns(database, table, &columns)
            .await?;
        counter!("fluxgate_catalog_mutations_total", "op" => "drop_columns")
            .increment(1);
        Ok(())
    }
}

pub struct ReplayApi {
    controller: OffsetController,
}

impl ReplayApi {
    pub fn new(controller: OffsetController) -> Self {
        Self { controller }
    }
}

#[async_trait]
impl ReplayController for ReplayApi {
    async fn get_offsets(&self) -> Result<ConsumerOffsets, ApiError> {
        Ok(self.controller.get_offsets().await?)
    }

    async fn set_offsets(
        &self,
        offsets: ConsumerOffsets,
    ) -> Result<(), ApiError> {
        self.controller.set_offsets(offsets).await?;
        counter!("fluxgate_offset_rewrites_total").increment(1);
        Ok(())
    }
}
