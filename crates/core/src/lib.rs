//! Fluxgate Core Types
//!
//! This crate defines the domain vocabulary shared across fluxgate: the
//! primitive column types and modifier kinds operators can apply to event
//! columns, the table specifications handed to the catalog, and the wire
//! envelope that wraps an event on the broker log.

pub mod envelope;
pub mod errors;
pub mod types;

pub use envelope::{Envelope, EnvelopeError, event_type_of};
pub use errors::IngestError;
pub use types::{
    ColumnModifier, ColumnSpec, ColumnType, ModifierKind, TableSpec, now_ms,
};
