//! Typed key-value preferences on top of SQLite.
//!
//! Readers always see a whole [`Preferences`] snapshot. Writers stage
//! changes in a [`PreferenceEdit`] which [`PreferenceStore::edit`] applies
//! in one transaction, so a multi-key change is all-or-nothing.

use std::collections::BTreeMap;
use std::fmt;

use chrono::Utc;
use rusqlite::types::Value as SqlValue;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::database::Database;
use crate::error::StoreError;
use crate::row_helpers;

/// Storage kind recorded next to each value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PrefKind {
    Text,
    Int,
    Bool,
}

impl fmt::Display for PrefKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Int => write!(f, "int"),
            Self::Bool => write!(f, "bool"),
        }
    }
}

impl std::str::FromStr for PrefKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "int" => Ok(Self::Int),
            "bool" => Ok(Self::Bool),
            other => Err(format!("unknown preference kind: {other}")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum PrefValue {
    Text(String),
    Int(i64),
    Bool(bool),
}

impl PrefValue {
    pub fn kind(&self) -> PrefKind {
        match self {
            Self::Text(_) => PrefKind::Text,
            Self::Int(_) => PrefKind::Int,
            Self::Bool(_) => PrefKind::Bool,
        }
    }

    fn to_sql(&self) -> SqlValue {
        match self {
            Self::Text(s) => SqlValue::Text(s.clone()),
            Self::Int(i) => SqlValue::Integer(*i),
            Self::Bool(b) => SqlValue::Integer(i64::from(*b)),
        }
    }
}

impl From<&str> for PrefValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for PrefValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<i64> for PrefValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<bool> for PrefValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

/// Immutable snapshot of every stored preference.
///
/// Typed getters return `None` both for a missing key and for a key
/// stored under a different kind.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Preferences {
    values: BTreeMap<String, PrefValue>,
}

impl Preferences {
    pub fn get(&self, key: &str) -> Option<&PrefValue> {
        self.values.get(key)
    }

    pub fn get_text(&self, key: &str) -> Option<&str> {
        match self.values.get(key)? {
            PrefValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        match self.values.get(key)? {
            PrefValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.values.get(key)? {
            PrefValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PrefValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[derive(Clone, Debug)]
enum EditOp {
    Set(String, PrefValue),
    Remove(String),
}

/// Changes staged for one transaction, applied in insertion order.
#[derive(Clone, Debug, Default)]
pub struct PreferenceEdit {
    ops: Vec<EditOp>,
}

impl PreferenceEdit {
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<PrefValue>) -> &mut Self {
        self.ops.push(EditOp::Set(key.into(), value.into()));
        self
    }

    pub fn remove(&mut self, key: impl Into<String>) -> &mut Self {
        self.ops.push(EditOp::Remove(key.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Synchronous preference repository. Blocking; async callers go through
/// [`crate::ContactStore`].
#[derive(Clone)]
pub struct PreferenceStore {
    db: Database,
}

impl PreferenceStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Read every stored preference.
    #[instrument(skip(self))]
    pub fn load(&self) -> Result<Preferences, StoreError> {
        self.db.with_conn(load_all)
    }

    /// Stage changes with `f` and commit them in a single transaction.
    ///
    /// Returns the snapshot as of the commit. On error nothing is applied.
    #[instrument(skip(self, f))]
    pub fn edit<F>(&self, f: F) -> Result<Preferences, StoreError>
    where
        F: FnOnce(&mut PreferenceEdit),
    {
        let mut edit = PreferenceEdit::default();
        f(&mut edit);

        self.db.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            let now = Utc::now().to_rfc3339();
            for op in &edit.ops {
                match op {
                    EditOp::Set(key, value) => {
                        tx.prepare_cached(
                            "INSERT INTO preferences (key, kind, value, updated_at)
                             VALUES (?1, ?2, ?3, ?4)
                             ON CONFLICT(key) DO UPDATE SET
                                kind = excluded.kind,
                                value = excluded.value,
                                updated_at = excluded.updated_at",
                        )?
                        .execute(rusqlite::params![
                            key,
                            value.kind().to_string(),
                            value.to_sql(),
                            now
                        ])?;
                    }
                    EditOp::Remove(key) => {
                        tx.prepare_cached("DELETE FROM preferences WHERE key = ?1")?
                            .execute([key])?;
                    }
                }
            }
            let snapshot = load_all(&tx)?;
            tx.commit()?;
            debug!(ops = edit.ops.len(), "preferences committed");
            Ok(snapshot)
        })
    }
}

fn load_all(conn: &Connection) -> Result<Preferences, StoreError> {
    let mut stmt = conn.prepare_cached("SELECT key, kind, value FROM preferences ORDER BY key")?;
    let mut rows = stmt.query([])?;
    let mut values = BTreeMap::new();
    while let Some(row) = rows.next()? {
        let key: String = row_helpers::get(row, 0, "preferences", "key")?;
        let kind_raw: String = row_helpers::get(row, 1, "preferences", "kind")?;
        let kind: PrefKind = row_helpers::parse_enum(&kind_raw, "preferences", "kind")?;
        let value = match kind {
            PrefKind::Text => PrefValue::Text(row_helpers::get(row, 2, "preferences", "value")?),
            PrefKind::Int => PrefValue::Int(row_helpers::get(row, 2, "preferences", "value")?),
            PrefKind::Bool => {
                PrefValue::Bool(row_helpers::get::<i64>(row, 2, "preferences", "value")? != 0)
            }
        };
        let _ = values.insert(key, value);
    }
    Ok(Preferences { values })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store() -> PreferenceStore {
        PreferenceStore::new(Database::in_memory().unwrap())
    }

    #[test]
    fn empty_store_loads_empty_snapshot() {
        let store = test_store();
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn typed_values_round_trip() {
        let store = test_store();
        let snap = store
            .edit(|e| {
                e.set("name", "Taro").set("id", 2_i64).set("flag", false);
            })
            .unwrap();
        assert_eq!(snap.get_text("name"), Some("Taro"));
        assert_eq!(snap.get_int("id"), Some(2));
        assert_eq!(snap.get_bool("flag"), Some(false));
        assert_eq!(store.load().unwrap(), snap);
    }

    #[test]
    fn kind_mismatch_reads_as_absent() {
        let store = test_store();
        let snap = store
            .edit(|e| {
                e.set("id", "not a number");
            })
            .unwrap();
        assert_eq!(snap.get_int("id"), None);
        assert!(snap.contains("id"));
    }

    #[test]
    fn overwrite_replaces_kind() {
        let store = test_store();
        store
            .edit(|e| {
                e.set("k", 1_i64);
            })
            .unwrap();
        let snap = store
            .edit(|e| {
                e.set("k", "one");
            })
            .unwrap();
        assert_eq!(snap.get("k"), Some(&PrefValue::Text("one".into())));
        assert_eq!(snap.len(), 1);
    }

    #[test]
    fn remove_missing_key_is_fine() {
        let store = test_store();
        let snap = store
            .edit(|e| {
                e.remove("never-set");
            })
            .unwrap();
        assert!(snap.is_empty());
    }

    #[test]
    fn failed_edit_rolls_back_every_op() {
        let store = test_store();
        store
            .database()
            .with_conn(|conn| {
                conn.execute_batch(
                    "CREATE TRIGGER reject_b BEFORE INSERT ON preferences
                     WHEN NEW.key = 'b'
                     BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
                )?;
                Ok(())
            })
            .unwrap();

        let result = store.edit(|e| {
            e.set("a", 1_i64).set("b", 2_i64);
        });
        assert!(matches!(result, Err(StoreError::Database(_))));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn unknown_kind_is_corrupt() {
        let store = test_store();
        store
            .database()
            .with_conn(|conn| {
                conn.execute(
                    "INSERT INTO preferences (key, kind, value, updated_at) VALUES ('x', 'float', 1.5, 'now')",
                    [],
                )?;
                Ok(())
            })
            .unwrap();
        assert!(matches!(
            store.load(),
            Err(StoreError::CorruptRow { column: "kind", .. })
        ));
    }

    #[test]
    fn pref_value_json_shape() {
        let json = serde_json::to_string(&PrefValue::Bool(true)).unwrap();
        assert_eq!(json, r#"{"kind":"bool","value":true}"#);
    }
}
