use async_trait::async_trait;
use fluxgate_core::{ColumnModifier, ModifierKind};
use tokio::sync::RwLock;

use super::{ModifierStore, StoreResult};

/// In-memory modifier log for tests and embedded use.
///
/// A plain append vector: insertion order is the tiebreaker, matching the
/// rowid tiebreak of the SQLite backend.
#[derive(Default)]
pub struct MemModifierStore {
    entries: RwLock<Vec<ColumnModifier>>,
}

impl MemModifierStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ModifierStore for MemModifierStore {
    async fn append(&self, modifier: &ColumnModifier) -> StoreResult<()> {
        let mut entries = self.entries.write().await;
        entries.push(modifier.clone());
        Ok(())
    }

    async fn resolve_effective(
        &self,
        event_type: &str,
        column: &str,
    ) -> StoreResult<Option<ModifierKind>> {
        let entries = self.entries.read().await;
        // max_by_key keeps the last max, which is exactly append-order
        // tiebreaking for equal timestamps.
        Ok(entries
            .iter()
            .filter(|m| m.event_type == event_type && m.column == column)
            .max_by_key(|m| m.ts_ms)
            .map(|m| m.kind))
    }

    async fn history(
        &self,
        event_type: &str,
        column: &str,
    ) -> StoreResult<Vec<ColumnModifier>> {
        let entries = self.entries.read().await;
        let mut out: Vec<ColumnModifier> = entries
            .iter()
            .filter(|m| m.event_type == event_type && m.column == column)
            .cloned()
            .collect();
        out.reverse();
        out.sort_by(|a, b| b.ts_ms.cmp(&a.ts_ms));
        Ok(out)
    }

    async fn event_types(&self) -> StoreResult<Vec<String>> {
        let entries = self.entries.read().await;
        let mut out: Vec<String> =
            entries.iter().map(|m| m.event_type.clone()).collect();
        out.sort();
        out.dedup();
        Ok(out)
    }

    async fn columns(&self, event_type: &str) -> StoreResult<Vec<String>> {
        let entries = self.entries.read().await;
        let mut out: Vec<String> = entries
            .iter()
            .filter(|m| m.event_type == event_type)
            .map(|m| m.column.clone())
            .collect();
        out.sort();
        out.dedup();
        Ok(out)
    }
}
