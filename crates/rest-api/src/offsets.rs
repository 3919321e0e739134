//! Consumer offset replay surface.

use async_trait::async_trait;
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::get,
};
use serde_json::json;
use std::sync::Arc;

use fluxgate_broker::ConsumerOffsets;

use crate::errors::{api_error, ApiError};

#[derive(Clone)]
pub struct ReplayState {
    pub controller: Arc<dyn ReplayController>,
}

/// Read and rewrite the loader group's committed offsets.
#[async_trait]
pub trait ReplayController: Send + Sync {
    async fn get_offsets(&self) -> Result<ConsumerOffsets, ApiError>;

    /// Guarded write: any partition outside the group's assignment rejects
    /// the whole request before anything is committed.
    async fn set_offsets(
        &self,
        offsets: ConsumerOffsets,
    ) -> Result<(), ApiError>;
}

pub fn router(state: ReplayState) -> Router {
    Router::new()
        .route("/kafka/offsets", get(get_offsets).put(set_offsets))
        .with_state(state)
}

async fn get_offsets(
    State(st): State<ReplayState>,
) -> Result<Json<ConsumerOffsets>, (StatusCode, String)> {
    st.controller
        .get_offsets()
        .await
        .map(Json)
        .map_err(api_error)
}

/// 202: the commit went to the group coordinator, consumers pick the new
/// positions up on their next rebalance or restart.
async fn set_offsets(
    State(st): State<ReplayState>,
    Json(offsets): Json<ConsumerOffsets>,
) -> Result<(StatusCode, Json<serde_json::Value>), (StatusCode, String)> {
    st.controller
        .set_offsets(offsets)
        .await
        .map(|_| (StatusCode::ACCEPTED, Json(json!({ "status": "accepted" }))))
        .map_err(api_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{Method, Request},
    };
    use fluxgate_broker::{OffsetEntry, TopicPartition};
    use std::sync::Mutex;
    use tower::ServiceExt;

    struct MockReplay {
        assignment: Vec<TopicPartition>,
        committed: Mutex<ConsumerOffsets>,
    }

    #[async_trait]
    impl ReplayController for MockReplay {
        async fn get_offsets(&self) -> Result<ConsumerOffsets, ApiError> {
            Ok(self.committed.lock().unwrap().clone())
        }

        async fn set_offsets(
            &self,
            offsets: ConsumerOffsets,
        ) -> Result<(), ApiError> {
            for tp in offsets.keys() {
                if !self.assignment.contains(tp) {
                    return Err(ApiError::Conflict(format!(
                        "partition {tp} is not assigned to this group"
                    )));
                }
            }
            self.committed.lock().unwrap().extend(offsets);
            Ok(())
        }
    }

    fn app() -> Router {
        let mut committed = ConsumerOffsets::new();
        committed.insert(
            TopicPartition::new("events", 0),
            OffsetEntry::new(1200),
        );
        router(ReplayState {
            controller: Arc::new(MockReplay {
                assignment: vec![
                    TopicPartition::new("events", 0),
                    TopicPartition::new("events", 1),
                ],
                committed: Mutex::new(committed),
            }),
        })
    }

    #[tokio::test]
    async fn offsets_render_as_topic_partition_keys() {
        let resp = app()
            .oneshot(
                Request::builder()
                    .method(Method::GET)
                    .uri("/kafka/offsets")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(StatusCode::OK, resp.status());
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["events-0"]["offset"], 1200);
    }

    #[tokio::test]
    async fn rewrite_within_assignment_is_accepted() {
        let resp = app()
            .oneshot(
                Request::builder()
                    .method(Method::PUT)
                    .uri("/kafka/offsets")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        r#"{ "events-1": { "offset": 300 } }"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(StatusCode::ACCEPTED, resp.status());
    }

    #[tokio::test]
    async fn unassigned_partition_is_a_conflict() {
        let resp = app()
            .oneshot(
                Request::builder()
                    .method(Method::PUT)
                    .uri("/kafka/offsets")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        r#"{ "events-9": { "offset": 300 } }"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(StatusCode::CONFLICT, resp.status());
    }

    // axum answers 422 when the body parses as JSON but the offsets
    // mapping rejects it
    #[tokio::test]
    async fn malformed_partition_key_is_rejected() {
        let resp = app()
            .oneshot(
                Request::builder()
                    .method(Method::PUT)
                    .uri("/kafka/offsets")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        r#"{ "events": { "offset": 300 } }"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(StatusCode::UNPROCESSABLE_ENTITY, resp.status());
    }
}
