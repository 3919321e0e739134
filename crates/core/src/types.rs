//! Column types, modifier kinds and table specifications.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

// ============================================================================
// Column Type
// ============================================================================

/// Primitive column type for catalog columns.
///
/// Serializes to lower-case strings; parsing is case-insensitive so operator
/// input like `"STRING"` and `"string"` mean the same thing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    String,
    Number,
    Boolean,
    Timestamp,
}

impl ColumnType {
    /// Canonical lower-case name.
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ColumnType::String => "string",
            ColumnType::Number => "number",
            ColumnType::Boolean => "boolean",
            ColumnType::Timestamp => "timestamp",
        }
    }

    /// Parse from a case-insensitive name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "string" => Some(ColumnType::String),
            "number" => Some(ColumnType::Number),
            "boolean" => Some(ColumnType::Boolean),
            "timestamp" => Some(ColumnType::Timestamp),
            _ => None,
        }
    }

    pub const fn all() -> [ColumnType; 4] {
        [
            ColumnType::String,
            ColumnType::Number,
            ColumnType::Boolean,
            ColumnType::Timestamp,
        ]
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ColumnType {
    fn serialize<S: Serializer>(
        &self,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ColumnType {
    fn deserialize<D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).ok_or_else(|| {
            serde::de::Error::unknown_variant(
                &s,
                &["string", "number", "boolean", "timestamp"],
            )
        })
    }
}

// ============================================================================
// Modifier Kind
// ============================================================================

/// Operator directive for a (event type, column) pair.
///
/// The set is closed: `ignore` drops the column from any table specification
/// sent to the catalog, and a type override replaces the declared primitive
/// type. Unrecognized input is rejected before it reaches the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModifierKind {
    Ignore,
    Override(ColumnType),
}

impl ModifierKind {
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ModifierKind::Ignore => "ignore",
            ModifierKind::Override(t) => t.as_str(),
        }
    }

    /// Parse from a case-insensitive name.
    pub fn parse(s: &str) -> Option<Self> {
        if s.eq_ignore_ascii_case("ignore") {
            return Some(ModifierKind::Ignore);
        }
        ColumnType::parse(s).map(ModifierKind::Override)
    }

    /// The names accepted by the modifier endpoints, canonical casing.
    pub fn supported_strings() -> Vec<&'static str> {
        let mut out = vec!["ignore"];
        out.extend(ColumnType::all().iter().map(|t| t.as_str()));
        out
    }
}

impl std::fmt::Display for ModifierKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ModifierKind {
    fn serialize<S: Serializer>(
        &self,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ModifierKind {
    fn deserialize<D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).ok_or_else(|| {
            serde::de::Error::custom(format!("unknown modifier kind: {s}"))
        })
    }
}

// ============================================================================
// Column Modifier (audit log entry)
// ============================================================================

/// One entry of the append-only modifier audit log.
///
/// Entries are immutable and never deleted. The effective modifier for a
/// (event type, column) pair is the entry with the greatest `ts_ms`; ties
/// fall back to append order, so a re-submitted directive with an identical
/// timestamp still wins over its predecessor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnModifier {
    pub event_type: String,
    pub column: String,
    pub kind: ModifierKind,
    pub ts_ms: i64,
}

impl ColumnModifier {
    pub fn new(
        event_type: impl Into<String>,
        column: impl Into<String>,
        kind: ModifierKind,
        ts_ms: i64,
    ) -> Self {
        Self {
            event_type: event_type.into(),
            column: column.into(),
            kind,
            ts_ms,
        }
    }

    /// Entry stamped with the current wall clock.
    pub fn now(
        event_type: impl Into<String>,
        column: impl Into<String>,
        kind: ModifierKind,
    ) -> Self {
        Self::new(event_type, column, kind, now_ms())
    }
}

// ============================================================================
// Table Specification
// ============================================================================

/// One declared or observed column of a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
}

fn default_nullable() -> bool {
    true
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullable: true,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }
}

/// The ordered column list and types a catalog table should have.
///
/// A transient, derived value: built from an inbound create/update request
/// and adjusted by the effective modifiers before it is handed to the
/// catalog. The table name doubles as the event type key when modifiers are
/// resolved, since events land in the table named after their event type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSpec {
    pub database: String,
    pub table: String,
    pub columns: Vec<ColumnSpec>,
}

impl TableSpec {
    pub fn new(
        database: impl Into<String>,
        table: impl Into<String>,
        columns: Vec<ColumnSpec>,
    ) -> Self {
        Self {
            database: database.into(),
            table: table.into(),
            columns,
        }
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn find_column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_type_parse_is_case_insensitive() {
        assert_eq!(ColumnType::parse("STRING"), Some(ColumnType::String));
        assert_eq!(ColumnType::parse("Timestamp"), Some(ColumnType::Timestamp));
        assert_eq!(ColumnType::parse("blob"), None);
    }

    #[test]
    fn modifier_kind_covers_ignore_and_overrides() {
        assert_eq!(ModifierKind::parse("IGNORE"), Some(ModifierKind::Ignore));
        assert_eq!(
            ModifierKind::parse("number"),
            Some(ModifierKind::Override(ColumnType::Number))
        );
        assert_eq!(ModifierKind::parse("uuid"), None);

        let supported = ModifierKind::supported_strings();
        assert_eq!(
            supported,
            vec!["ignore", "string", "number", "boolean", "timestamp"]
        );
    }

    #[test]
    fn modifier_kind_serializes_to_canonical_strings() {
        assert_eq!(
            serde_json::to_string(&ModifierKind::Ignore).unwrap(),
            r#""ignore""#
        );
        assert_eq!(
            serde_json::to_string(&ModifierKind::Override(ColumnType::Boolean))
                .unwrap(),
            r#""boolean""#
        );

        let parsed: ModifierKind = serde_json::from_str(r#""TIMESTAMP""#).unwrap();
        assert_eq!(parsed, ModifierKind::Override(ColumnType::Timestamp));
        assert!(serde_json::from_str::<ModifierKind>(r#""uuid""#).is_err());
    }

    #[test]
    fn table_spec_roundtrip_keeps_column_order() {
        let spec = TableSpec::new(
            "events",
            "click",
            vec![
                ColumnSpec::new("url", ColumnType::String).not_null(),
                ColumnSpec::new("at", ColumnType::Timestamp),
            ],
        );

        let json = serde_json::to_string(&spec).unwrap();
        let parsed: TableSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, spec);
        assert_eq!(parsed.column_names(), vec!["url", "at"]);
        assert!(!parsed.find_column("url").unwrap().nullable);
    }

    #[test]
    fn column_nullable_defaults_to_true() {
        let col: ColumnSpec =
            serde_json::from_str(r#"{"name":"url","type":"string"}"#).unwrap();
        assert!(col.nullable);
    }
}
