//! Modifier directives: batch submission and audit log listings.

use async_trait::async_trait;
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use fluxgate_core::{now_ms, ColumnModifier, ModifierKind};

use crate::errors::ApiError;

#[derive(Clone)]
pub struct ModifierState {
    pub controller: Arc<dyn ModifierController>,
}

#[async_trait]
pub trait ModifierController: Send + Sync {
    /// Append one directive to the audit log. One commit per call.
    async fn append(&self, modifier: ColumnModifier) -> Result<(), ApiError>;

    /// Full audit log, newest first.
    async fn list(&self) -> Result<Vec<ColumnModifier>, ApiError>;

    /// Audit log for one event type, newest first.
    async fn list_for(
        &self,
        event_type: &str,
    ) -> Result<Vec<ColumnModifier>, ApiError>;
}

#[derive(Debug, Deserialize)]
pub struct BatchModifiersRequest {
    pub modifiers: Vec<ModifierDirective>,
}

/// One inbound directive. `ts_ms` is optional; when absent the directive
/// is stamped at receive time. An explicit older timestamp backdates the
/// directive below existing entries.
#[derive(Debug, Serialize, Deserialize)]
pub struct ModifierDirective {
    pub event_type: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ts_ms: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DirectiveOutcome {
    pub event_type: String,
    pub column: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BatchModifiersResponse {
    /// The accepted directive kinds, always echoed for discoverability.
    pub types: Vec<String>,
    pub results: Vec<DirectiveOutcome>,
}

pub fn router(state: ModifierState) -> Router {
    Router::new()
        .route("/types", get(supported_types))
        .route("/batch_modifiers", post(batch_modifiers))
        .route("/deltas/event_type", get(list_modifiers))
        .route("/deltas/event_type/{name}", get(list_modifiers_for))
        .with_state(state)
}

async fn supported_types() -> Json<Vec<&'static str>> {
    Json(ModifierKind::supported_strings())
}

/// Directives commit independently: a rejected sibling never rolls back an
/// applied one. The response carries one outcome per directive in request
/// order; the status is 400 only when every directive was rejected.
async fn batch_modifiers(
    State(st): State<ModifierState>,
    Json(req): Json<BatchModifiersRequest>,
) -> (StatusCode, Json<BatchModifiersResponse>) {
    let mut results = Vec::with_capacity(req.modifiers.len());
    let mut applied = 0usize;

    for directive in req.modifiers {
        let outcome = apply_directive(&st, directive).await;
        if outcome.status == "applied" {
            applied += 1;
        }
        results.push(outcome);
    }

    let status = if results.is_empty() || applied > 0 {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };

    let types = ModifierKind::supported_strings()
        .into_iter()
        .map(String::from)
        .collect();
    (status, Json(BatchModifiersResponse { types, results }))
}

fn rejected(directive: &ModifierDirective, detail: String) -> DirectiveOutcome {
    DirectiveOutcome {
        event_type: directive.event_type.clone(),
        column: directive.name.clone(),
        status: "rejected".to_string(),
        detail: Some(detail),
    }
}

async fn apply_directive(
    st: &ModifierState,
    directive: ModifierDirective,
) -> DirectiveOutcome {
    if directive.event_type.is_empty() || directive.name.is_empty() {
        return rejected(
            &directive,
            "event_type and name must not be empty".to_string(),
        );
    }

    let Some(kind) = ModifierKind::parse(&directive.kind) else {
        return rejected(
            &directive,
            format!(
                "unknown type {:?}, supported: {}",
                directive.kind,
                ModifierKind::supported_strings().join(", ")
            ),
        );
    };

    let modifier = ColumnModifier::new(
        directive.event_type.clone(),
        directive.name.clone(),
        kind,
        directive.ts_ms.unwrap_or_else(now_ms),
    );

    match st.controller.append(modifier).await {
        Ok(()) => DirectiveOutcome {
            event_type: directive.event_type,
            column: directive.name,
            status: "applied".to_string(),
            detail: None,
        },
        Err(e) => rejected(&directive, e.to_string()),
    }
}

async fn list_modifiers(
    State(st): State<ModifierState>,
) -> Result<Json<Vec<ColumnModifier>>, (StatusCode, String)> {
    st.controller
        .list()
        .await
        .map(Json)
        .map_err(crate::errors::api_error)
}

async fn list_modifiers_for(
    State(st): State<ModifierState>,
    Path(name): Path<String>,
) -> Result<Json<Vec<ColumnModifier>>, (StatusCode, String)> {
    st.controller
        .list_for(&name)
        .await
        .map(Json)
        .map_err(crate::errors::api_error)
}
