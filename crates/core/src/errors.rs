use std::borrow::Cow;
use thiserror::Error;

/// Client-input failures on the ingestion path.
///
/// These are rejected synchronously with no side effects; anything past
/// input validation (broker delivery, catalog DDL) has its own error type
/// in the crate that owns that concern.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("payload is not valid JSON: {details}")]
    MalformedJson { details: Cow<'static, str> },

    #[error("payload is missing the required \"event\" field")]
    MissingEventType,

    #[error("\"event\" must be a non-empty string")]
    InvalidEventType,
}
