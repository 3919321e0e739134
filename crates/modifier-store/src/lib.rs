//! Append-only audit log of column-type override directives.
//!
//! Directives are never updated or deleted. The effective modifier for a
//! (event type, column) pair is resolved at read time: greatest timestamp
//! wins, append order breaks ties. Backdated corrections are therefore
//! possible: a later append with an older timestamp does not take effect.

use async_trait::async_trait;
use fluxgate_core::{ColumnModifier, ModifierKind};

mod errors;
mod mem_store;
mod sqlite_store;

pub use errors::{StoreError, StoreResult};
pub use mem_store::MemModifierStore;
pub use sqlite_store::SqliteModifierStore;

/// Modifier audit-log storage.
///
/// `append` is one atomic transaction per directive; callers submitting a
/// batch must not assume atomicity across the batch; sibling directives
/// commit independently. Appends for distinct keys proceed concurrently;
/// same-key appends serialize on the backend's writer.
#[async_trait]
pub trait ModifierStore: Send + Sync {
    /// Persist one directive. Never merges or overwrites prior entries.
    async fn append(&self, modifier: &ColumnModifier) -> StoreResult<()>;

    /// The directive that currently governs this column, if any.
    async fn resolve_effective(
        &self,
        event_type: &str,
        column: &str,
    ) -> StoreResult<Option<ModifierKind>>;

    /// Full audit trail for a column, newest first.
    async fn history(
        &self,
        event_type: &str,
        column: &str,
    ) -> StoreResult<Vec<ColumnModifier>>;

    /// Event types that have at least one directive, sorted.
    async fn event_types(&self) -> StoreResult<Vec<String>>;

    /// Columns of an event type that have at least one directive, sorted.
    async fn columns(&self, event_type: &str) -> StoreResult<Vec<String>>;
}
