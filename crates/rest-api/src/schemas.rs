//! Catalog schema management endpoints.

use async_trait::async_trait;
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use fluxgate_catalog::ApplyReport;
use fluxgate_core::{ColumnSpec, TableSpec};

use crate::errors::{api_error, ApiError};

#[derive(Clone)]
pub struct SchemaState {
    pub controller: Arc<dyn SchemaController>,
}

/// Catalog mutations routed through the schema reconciler.
#[async_trait]
pub trait SchemaController: Send + Sync {
    async fn list_databases(&self) -> Result<Vec<String>, ApiError>;

    async fn list_tables(&self, database: &str)
        -> Result<Vec<String>, ApiError>;

    async fn get_table(
        &self,
        database: &str,
        table: &str,
    ) -> Result<Option<TableSpec>, ApiError>;

    async fn create_table(
        &self,
        database: &str,
        table: &str,
        columns: Vec<ColumnSpec>,
    ) -> Result<ApplyReport, ApiError>;

    async fn update_table(
        &self,
        database: &str,
        table: &str,
        columns: Vec<ColumnSpec>,
    ) -> Result<ApplyReport, ApiError>;

    async fn drop_table(
        &self,
        database: &str,
        table: &str,
    ) -> Result<(), ApiError>;

    async fn drop_columns(
        &self,
        database: &str,
        table: &str,
        columns: Vec<String>,
    ) -> Result<(), ApiError>;
}

/// Create/update body: the column list only, names come from the path.
#[derive(Debug, Serialize, Deserialize)]
pub struct TableColumnsRequest {
    pub columns: Vec<ColumnSpec>,
}

pub fn router(state: SchemaState) -> Router {
    Router::new()
        .route("/schemas", get(list_databases))
        .route("/schemas/{db}", get(list_tables))
        .route(
            "/schemas/{db}/table/{table}",
            get(get_table)
                .post(create_table)
                .put(update_table)
                .delete(drop_table),
        )
        .route(
            "/schemas/{db}/table/{table}/delete_columns",
            post(drop_columns),
        )
        .route(
            "/schemas/{db}/table/{table}/column/{column}",
            delete(drop_column),
        )
        .with_state(state)
}

type ApiResult<T> = Result<Json<T>, (StatusCode, String)>;

async fn list_databases(State(st): State<SchemaState>) -> ApiResult<Vec<String>> {
    st.controller
        .list_databases()
        .await
        .map(Json)
        .map_err(api_error)
}

async fn list_tables(
    State(st): State<SchemaState>,
    Path(db): Path<String>,
) -> ApiResult<Vec<String>> {
    st.controller
        .list_tables(&db)
        .await
        .map(Json)
        .map_err(api_error)
}

/// A missing table answers 404 with an empty JSON object body, so callers
/// probing for existence can always parse the response.
async fn get_table(
    State(st): State<SchemaState>,
    Path((db, table)): Path<(String, String)>,
) -> Result<(StatusCode, Json<serde_json::Value>), (StatusCode, String)> {
    match st.controller.get_table(&db, &table).await.map_err(api_error)? {
        Some(spec) => Ok((StatusCode::OK, Json(json!(spec)))),
        None => Ok((StatusCode::NOT_FOUND, Json(json!({})))),
    }
}

async fn create_table(
    State(st): State<SchemaState>,
    Path((db, table)): Path<(String, String)>,
    Json(req): Json<TableColumnsRequest>,
) -> ApiResult<ApplyReport> {
    st.controller
        .create_table(&db, &table, req.columns)
        .await
        .map(Json)
        .map_err(api_error)
}

async fn update_table(
    State(st): State<SchemaState>,
    Path((db, table)): Path<(String, String)>,
    Json(req): Json<TableColumnsRequest>,
) -> ApiResult<ApplyReport> {
    st.controller
        .update_table(&db, &table, req.columns)
        .await
        .map(Json)
        .map_err(api_error)
}

async fn drop_table(
    State(st): State<SchemaState>,
    Path((db, table)): Path<(String, String)>,
) -> Result<StatusCode, (StatusCode, String)> {
    st.controller
        .drop_table(&db, &table)
        .await
        .map(|_| StatusCode::NO_CONTENT)
        .map_err(api_error)
}

async fn drop_columns(
    State(st): State<SchemaState>,
    Path((db, table)): Path<(String, String)>,
    Json(columns): Json<Vec<String>>,
) -> Result<StatusCode, (StatusCode, String)> {
    st.controller
        .drop_columns(&db, &table, columns)
        .await
        .map(|_| StatusCode::NO_CONTENT)
        .map_err(api_error)
}

/// Single-column convenience over the bulk drop.
async fn drop_column(
    State(st): State<SchemaState>,
    Path((db, table, column)): Path<(String, String, String)>,
) -> Result<StatusCode, (StatusCode, String)> {
    st.controller
        .drop_columns(&db, &table, vec![column])
        .await
        .map(|_| StatusCode::NO_CONTENT)
        .map_err(api_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{Method, Request},
    };
    use fluxgate_catalog::ApplyAction;
    use fluxgate_core::ColumnType;
    use tower::ServiceExt;
    use uuid::Uuid;

    struct MockController;

    fn click_spec() -> TableSpec {
        TableSpec::new(
            "events",
            "click",
            vec![ColumnSpec::new("url", ColumnType::String)],
        )
    }

    fn report(action: ApplyAction) -> ApplyReport {
        ApplyReport {
            correlation_id: Uuid::new_v4(),
            database: "events".to_string(),
            table: "click".to_string(),
            action,
            columns_applied: 1,
            ignored: vec!["debug_blob".to_string()],
            overridden: vec![],
        }
    }

    #[async_trait]
    impl SchemaController for MockController {
        async fn list_databases(&self) -> Result<Vec<String>, ApiError> {
            Ok(vec!["events".to_string()])
        }

        async fn list_tables(
            &self,
            database: &str,
        ) -> Result<Vec<String>, ApiError> {
            if database == "events" {
                Ok(vec!["click".to_string()])
            } else {
                Ok(vec![])
            }
        }

        async fn get_table(
            &self,
            database: &str,
            table: &str,
        ) -> Result<Option<TableSpec>, ApiError> {
            if database == "events" && table == "click" {
                Ok(Some(click_spec()))
            } else {
                Ok(None)
            }
        }

        async fn create_table(
            &self,
            _database: &str,
            _table: &str,
            _columns: Vec<ColumnSpec>,
        ) -> Result<ApplyReport, ApiError> {
            Ok(report(ApplyAction::Create))
        }

        async fn update_table(
            &self,
            database: &str,
            table: &str,
            _columns: Vec<ColumnSpec>,
        ) -> Result<ApplyReport, ApiError> {
            if database == "events" && table == "click" {
                Ok(report(ApplyAction::Update))
            } else {
                Err(ApiError::NotFound(format!(
                    "table {database}.{table} not found"
                )))
            }
        }

        async fn drop_table(
            &self,
            database: &str,
            table: &str,
        ) -> Result<(), ApiError> {
            if database == "events" && table == "click" {
                Ok(())
            } else {
                Err(ApiError::NotFound(format!(
                    "table {database}.{table} not found"
                )))
            }
        }

        async fn drop_columns(
            &self,
            _database: &str,
            _table: &str,
            columns: Vec<String>,
        ) -> Result<(), ApiError> {
            if columns.is_empty() {
                Err(ApiError::ClientInput("no columns named".to_string()))
            } else if columns.iter().any(|c| c == "ghost") {
                Err(ApiError::NotFound("column ghost not found".to_string()))
            } else {
                Ok(())
            }
        }
    }

    fn app() -> Router {
        router(SchemaState {
            controller: Arc::new(MockController),
        })
    }

    async fn send(
        app: Router,
        method: Method,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, bytes::Bytes) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(v) => {
                builder = builder.header("content-type", "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        let resp = app.oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, bytes)
    }

    #[tokio::test]
    async fn listing_databases_and_tables() {
        let (status, body) =
            send(app(), Method::GET, "/schemas", None).await;
        assert_eq!(StatusCode::OK, status);
        let dbs: Vec<String> = serde_json::from_slice(&body).unwrap();
        assert_eq!(dbs, vec!["events"]);

        let (status, body) =
            send(app(), Method::GET, "/schemas/events", None).await;
        assert_eq!(StatusCode::OK, status);
        let tables: Vec<String> = serde_json::from_slice(&body).unwrap();
        assert_eq!(tables, vec!["click"]);
    }

    #[tokio::test]
    async fn get_table_returns_the_spec() {
        let (status, body) =
            send(app(), Method::GET, "/schemas/events/table/click", None)
                .await;
        assert_eq!(StatusCode::OK, status);
        let spec: TableSpec = serde_json::from_slice(&body).unwrap();
        assert_eq!(spec, click_spec());
    }

    #[tokio::test]
    async fn missing_table_is_404_with_empty_object() {
        let (status, body) =
            send(app(), Method::GET, "/schemas/events/table/ghost", None)
                .await;
        assert_eq!(StatusCode::NOT_FOUND, status);
        assert_eq!(&body[..], b"{}");
    }

    #[tokio::test]
    async fn create_returns_an_apply_report() {
        let (status, body) = send(
            app(),
            Method::POST,
            "/schemas/events/table/click",
            Some(serde_json::json!({
                "columns": [ { "name": "url", "type": "string" } ]
            })),
        )
        .await;

        assert_eq!(StatusCode::OK, status);
        let report: ApplyReport = serde_json::from_slice(&body).unwrap();
        assert_eq!(report.table, "click");
        assert_eq!(report.ignored, vec!["debug_blob"]);
    }

    #[tokio::test]
    async fn update_unknown_table_is_404() {
        let (status, _) = send(
            app(),
            Method::PUT,
            "/schemas/events/table/ghost",
            Some(serde_json::json!({ "columns": [] })),
        )
        .await;
        assert_eq!(StatusCode::NOT_FOUND, status);
    }

    #[tokio::test]
    async fn delete_columns_and_drop_table() {
        let (status, _) = send(
            app(),
            Method::POST,
            "/schemas/events/table/click/delete_columns",
            Some(serde_json::json!(["url"])),
        )
        .await;
        assert_eq!(StatusCode::NO_CONTENT, status);

        let (status, _) = send(
            app(),
            Method::DELETE,
            "/schemas/events/table/click",
            None,
        )
        .await;
        assert_eq!(StatusCode::NO_CONTENT, status);
    }

    #[tokio::test]
    async fn single_column_delete_route() {
        let (status, _) = send(
            app(),
            Method::DELETE,
            "/schemas/events/table/click/column/url",
            None,
        )
        .await;
        assert_eq!(StatusCode::NO_CONTENT, status);

        let (status, _) = send(
            app(),
            Method::DELETE,
            "/schemas/events/table/click/column/ghost",
            None,
        )
        .await;
        assert_eq!(StatusCode::NOT_FOUND, status);
    }
}
