//! REST catalog client.
//!
//! Speaks a small JSON protocol against the catalog service:
//!
//! - `GET    {base}/v1/databases`                         → `{"databases": [...]}`
//! - `GET    {base}/v1/databases/{db}/tables`             → `{"tables": [...]}`
//! - `GET    {base}/v1/databases/{db}/tables/{t}`         → table spec, 404 if absent
//! - `POST   {base}/v1/databases/{db}/tables`             → create (spec body)
//! - `PUT    {base}/v1/databases/{db}/tables/{t}`         → alter (spec body)
//! - `DELETE {base}/v1/databases/{db}/tables/{t}`         → drop table
//! - `POST   {base}/v1/databases/{db}/tables/{t}/drop-columns` → `["c1", ...]`
//!
//! A 404 on lookup becomes a typed `Ok(None)`; every other non-2xx status
//! surfaces as a DDL rejection carrying the catalog's response body.

use async_trait::async_trait;
use fluxgate_core::TableSpec;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::info;

use super::{Catalog, CatalogError, CatalogResult};

#[derive(Debug, Deserialize)]
struct DatabasesResponse {
    databases: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct TablesResponse {
    tables: Vec<String>,
}

pub struct RestCatalog {
    client: Client,
    base: String,
}

impl RestCatalog {
    pub fn new(base_uri: &str) -> anyhow::Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .build()?;
        let base = base_uri.trim_end_matches('/').to_string();
        info!(catalog = %base, "catalog client configured");
        Ok(Self { client, base })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.base, path)
    }

    async fn check(&self, resp: Response) -> CatalogResult<Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(CatalogError::Ddl {
            details: format!("catalog returned {status}: {body}").into(),
        })
    }
}

fn transport(e: reqwest::Error) -> CatalogError {
    CatalogError::Connect {
        details: e.to_string().into(),
    }
}

#[async_trait]
impl Catalog for RestCatalog {
    async fn list_databases(&self) -> CatalogResult<Vec<String>> {
        let resp = self
            .client
            .get(self.url("databases"))
            .send()
            .await
            .map_err(transport)?;
        let resp = self.check(resp).await?;
        let parsed: DatabasesResponse = resp.json().await.map_err(transport)?;
        Ok(parsed.databases)
    }

    async fn list_tables(&self, database: &str) -> CatalogResult<Vec<String>> {
        let resp = self
            .client
            .get(self.url(&format!("databases/{database}/tables")))
            .send()
            .await
            .map_err(transport)?;
        let resp = self.check(resp).await?;
        let parsed: TablesResponse = resp.json().await.map_err(transport)?;
        Ok(parsed.tables)
    }

    async fn get_table(
        &self,
        database: &str,
        table: &str,
    ) -> CatalogResult<Option<TableSpec>> {
        let resp = self
            .client
            .get(self.url(&format!("databases/{database}/tables/{table}")))
            .send()
            .await
            .map_err(transport)?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resp = self.check(resp).await?;
        let spec: TableSpec = resp.json().await.map_err(transport)?;
        Ok(Some(spec))
    }

    async fn create_table(&self, spec: &TableSpec) -> CatalogResult<()> {
        let resp = self
            .client
            .post(self.url(&format!("databases/{}/tables", spec.database)))
            .json(spec)
            .send()
            .await
            .map_err(transport)?;
        self.check(resp).await.map(|_| ())
    }

    async fn alter_table(
        &self,
        database: &str,
        table: &str,
        spec: &TableSpec,
    ) -> CatalogResult<()> {
        let resp = self
            .client
            .put(self.url(&format!("databases/{database}/tables/{table}")))
            .json(spec)
            .send()
            .await
            .map_err(transport)?;
        self.check(resp).await.map(|_| ())
    }

    async fn drop_table(
        &self,
        database: &str,
        table: &str,
    ) -> CatalogResult<()> {
        let resp = self
            .client
            .delete(self.url(&format!("databases/{database}/tables/{table}")))
            .send()
            .await
            .map_err(transport)?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Err(CatalogError::NotFound {
                database: database.to_string(),
                table: table.to_string(),
            });
        }
        self.check(resp).await.map(|_| ())
    }

    async fn drop_columns(
        &self,
        database: &str,
        table: &str,
        columns: &[String],
    ) -> CatalogResult<()> {
        let resp = self
            .client
            .post(self.url(&format!(
                "databases/{database}/tables/{table}/drop-columns"
            )))
            .json(&columns)
            .send()
            .await
            .map_err(transport)?;
        self.check(resp).await.map(|_| ())
    }
}
