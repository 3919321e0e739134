//! HTTP surface: ingestion, modifier directives, schema management and
//! offset replay.
//!
//! Each resource lives in its own module with a controller trait; the
//! server crate provides the implementations. Handlers stay thin, every
//! decision of substance happens behind a controller.

use axum::Router;

mod errors;
mod health;
mod ingest;
mod modifiers;
mod offsets;
mod schemas;

pub use errors::{api_error, ApiError};
pub use ingest::{IngestAck, IngestController, IngestState};
pub use modifiers::{
    BatchModifiersRequest, BatchModifiersResponse, DirectiveOutcome,
    ModifierController, ModifierDirective, ModifierState,
};
pub use offsets::{ReplayController, ReplayState};
pub use schemas::{SchemaController, SchemaState, TableColumnsRequest};

/// Build the full service router.
pub fn router(
    ingest_state: IngestState,
    modifier_state: ModifierState,
    schema_state: SchemaState,
    replay_state: ReplayState,
) -> Router {
    health::router()
        .merge(ingest::router(ingest_state))
        .merge(modifiers::router(modifier_state))
        .merge(schemas::router(schema_state))
        .merge(offsets::router(replay_state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Method, Request, StatusCode},
    };
    use tower::ServiceExt;

    #[tokio::test]
    async fn health_endpoints_need_no_state() {
        let app = health::router();

        let resp = app
            .clone()
            .oneshot(
                Request::builder()
                    .method(Method::GET)
                    .uri("/healthz")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(StatusCode::OK, resp.status());

        let resp = app
            .oneshot(
                Request::builder()
                    .method(Method::GET)
                    .uri("/readyz")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(StatusCode::OK, resp.status());
    }
}
