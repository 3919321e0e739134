use axum::http::StatusCode;
use thiserror::Error;
use tracing::error;

use fluxgate_broker::{BrokerError, GatewayError};
use fluxgate_catalog::{CatalogError, ReconcileError};
use fluxgate_modifier_store::StoreError;

/// API failure surface, one variant per status class.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    ClientInput(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("upstream failure: {0}")]
    Upstream(String),

    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

pub fn api_error(err: ApiError) -> (StatusCode, String) {
    error!(error = ?err, "request failed");
    let status = match err {
        ApiError::ClientInput(_) => StatusCode::BAD_REQUEST,
        ApiError::NotFound(_) => StatusCode::NOT_FOUND,
        ApiError::Conflict(_) => StatusCode::CONFLICT,
        ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
        ApiError::Failed(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    (status, err.to_string())
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Input(e) => ApiError::ClientInput(e.to_string()),
            GatewayError::Codec(e) => ApiError::ClientInput(e.to_string()),
            GatewayError::Broker(e) => e.into(),
        }
    }
}

impl From<BrokerError> for ApiError {
    fn from(err: BrokerError) -> Self {
        match err {
            BrokerError::InvalidPartitionAssignment { .. } => {
                ApiError::Conflict(err.to_string())
            }
            BrokerError::Enqueue { .. } | BrokerError::Client { .. } => {
                ApiError::Upstream(err.to_string())
            }
            BrokerError::Other(e) => ApiError::Failed(e),
        }
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound { .. } => {
                ApiError::NotFound(err.to_string())
            }
            CatalogError::Ddl { .. } | CatalogError::Connect { .. } => {
                ApiError::Upstream(err.to_string())
            }
            CatalogError::Serialization(e) => ApiError::Failed(e.into()),
            CatalogError::Other(e) => ApiError::Failed(e),
        }
    }
}

impl From<ReconcileError> for ApiError {
    fn from(err: ReconcileError) -> Self {
        match err {
            ReconcileError::Store(e) => e.into(),
            ReconcileError::Catalog(e) => e.into(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Failed(anyhow::Error::new(err))
    }
}
