//! Event ingestion endpoint.

use async_trait::async_trait;
use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    routing::post,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::errors::{api_error, ApiError};

#[derive(Clone)]
pub struct IngestState {
    pub gateway: Arc<dyn IngestController>,
}

/// Queues one raw event payload, returning the extracted event type.
#[async_trait]
pub trait IngestController: Send + Sync {
    async fn ingest(&self, payload: Bytes) -> Result<String, ApiError>;
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IngestAck {
    pub status: String,
    pub event: String,
}

pub fn router(state: IngestState) -> Router {
    Router::new().route("/", post(ingest_event)).with_state(state)
}

/// 202 means queued on the broker, not delivered. Delivery outcome is
/// logged out-of-band.
async fn ingest_event(
    State(st): State<IngestState>,
    body: Bytes,
) -> Result<(StatusCode, Json<IngestAck>), (StatusCode, String)> {
    let event = st.gateway.ingest(body).await.map_err(api_error)?;
    Ok((
        StatusCode::ACCEPTED,
        Json(IngestAck {
            status: "queued".to_string(),
            event,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{Method, Request},
    };
    use tower::ServiceExt;

    struct MockGateway;

    #[async_trait]
    impl IngestController for MockGateway {
        async fn ingest(&self, payload: Bytes) -> Result<String, ApiError> {
            let value: serde_json::Value = serde_json::from_slice(&payload)
                .map_err(|e| ApiError::ClientInput(e.to_string()))?;
            match value.get("event").and_then(|v| v.as_str()) {
                Some(event) => Ok(event.to_string()),
                None => Err(ApiError::ClientInput(
                    "payload is missing the event field".to_string(),
                )),
            }
        }
    }

    fn app() -> Router {
        router(IngestState {
            gateway: Arc::new(MockGateway),
        })
    }

    #[tokio::test]
    async fn valid_payload_is_accepted() {
        let resp = app()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"event":"click","url":"/x"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(StatusCode::ACCEPTED, resp.status());
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let ack: IngestAck = serde_json::from_slice(&body).unwrap();
        assert_eq!(ack.status, "queued");
        assert_eq!(ack.event, "click");
    }

    #[tokio::test]
    async fn missing_event_field_is_a_bad_request() {
        let resp = app()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"url":"/x"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(StatusCode::BAD_REQUEST, resp.status());
    }

    #[tokio::test]
    async fn malformed_json_is_a_bad_request() {
        let resp = app()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/")
                    .body(Body::from("not json"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(StatusCode::BAD_REQUEST, resp.status());
    }
}
