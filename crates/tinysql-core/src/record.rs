//! Assembled rows with change tracking.
//!
//! [`RowData`] is one row of a materialized result. It keeps the values
//! loaded from the server in a base map and records later edits in an overlay
//! that shadows the base until [`RowData::accept_changes`] moves it over.
//! [`ResultTable`] is an ordered list of such rows originating from one table.

use crate::Result;
use crate::error::{Error, LookupScope, UnacceptedChangesError};
use crate::metadata::MetadataTable;
use crate::value::{FromValue, Value};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Normalize a column name into a row key.
pub fn column_key(name: &str) -> String {
    name.replace(' ', "_")
}

/// A row with an overlay of uncommitted changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowData {
    /// Originating table, when known
    #[serde(default)]
    table: Option<Arc<MetadataTable>>,
    /// Values as loaded, in column order
    values: Vec<(String, Value)>,
    /// Uncommitted values shadowing `values`
    #[serde(default)]
    changes: Vec<(String, Value)>,
}

fn position(pairs: &[(String, Value)], name: &str) -> Option<usize> {
    pairs
        .iter()
        .position(|(k, _)| k == name)
        .or_else(|| pairs.iter().position(|(k, _)| k.eq_ignore_ascii_case(name)))
}

impl RowData {
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty row linked to its metadata table.
    pub fn for_table(table: Arc<MetadataTable>) -> Self {
        Self {
            table: Some(table),
            ..Self::default()
        }
    }

    /// A new row for `table` with every column present.
    ///
    /// Non-nullable value-type columns start at their zero value, everything
    /// else at NULL. `primary_key` values are assigned to the key columns in
    /// key order.
    pub fn create(table: Arc<MetadataTable>, primary_key: &[Value]) -> Self {
        let mut row = Self::for_table(Arc::clone(&table));
        for column in &table.columns {
            let value = if column.nullable {
                Value::Null
            } else {
                column
                    .column_type
                    .sql_type
                    .default_value()
                    .unwrap_or(Value::Null)
            };
            row.load(&column.name, value);
        }
        for (name, value) in table.primary_key.iter().zip(primary_key) {
            row.load(name, value.clone());
        }
        row
    }

    /// Build a row from loaded (column, value) pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let mut row = Self::new();
        for (k, v) in pairs {
            row.load(k.as_ref(), v.into());
        }
        row
    }

    pub fn table(&self) -> Option<&Arc<MetadataTable>> {
        self.table.as_ref()
    }

    pub fn set_table(&mut self, table: Arc<MetadataTable>) {
        self.table = Some(table);
    }

    /// Schema-qualified name of the originating table.
    pub fn table_name(&self) -> Option<String> {
        self.table.as_ref().map(|t| t.full_name())
    }

    /// Primary key column names of the originating table.
    pub fn primary_key(&self) -> &[String] {
        self.table
            .as_ref()
            .map_or(&[], |t| t.primary_key.as_slice())
    }

    /// Current primary key values, in key order.
    pub fn primary_key_values(&self) -> Result<Vec<Value>> {
        self.primary_key()
            .iter()
            .map(|pk| {
                self.get(pk)
                    .cloned()
                    .ok_or_else(|| Error::unknown_column(self.table_name().as_deref(), pk, LookupScope::Row))
            })
            .collect()
    }

    /// Store a loaded value in the base map, replacing any previous one.
    pub fn load(&mut self, name: &str, value: Value) {
        let key = column_key(name);
        match position(&self.values, &key) {
            Some(i) => self.values[i].1 = value,
            None => self.values.push((key, value)),
        }
    }

    /// Current value of a column; the overlay wins over the base.
    pub fn get(&self, name: &str) -> Option<&Value> {
        let key = column_key(name);
        position(&self.changes, &key)
            .map(|i| &self.changes[i].1)
            .or_else(|| self.original(&key))
    }

    /// The loaded value, ignoring uncommitted changes.
    pub fn original(&self, name: &str) -> Option<&Value> {
        let key = column_key(name);
        position(&self.values, &key).map(|i| &self.values[i].1)
    }

    /// Typed access to the current value.
    pub fn get_as<T: FromValue>(&self, name: &str) -> Result<T> {
        let value = self.get(name).ok_or_else(|| {
            Error::unknown_column(self.table_name().as_deref(), name, LookupScope::Row)
        })?;
        T::from_value(value)
    }

    pub fn contains(&self, name: &str) -> bool {
        position(&self.values, &column_key(name)).is_some()
    }

    /// Set a column value.
    ///
    /// A column that does not exist yet is added to the base map. Otherwise the
    /// value is recorded in the overlay when it differs from the loaded one,
    /// and a pending change is dropped when the value is set back.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) {
        let value = value.into();
        let key = column_key(name);
        let Some(base) = position(&self.values, &key) else {
            self.values.push((key, value));
            return;
        };
        let pending = position(&self.changes, &key);
        if self.values[base].1 == value {
            if let Some(i) = pending {
                self.changes.remove(i);
            }
            return;
        }
        match pending {
            Some(i) => self.changes[i].1 = value,
            None => {
                let canonical = self.values[base].0.clone();
                self.changes.push((canonical, value));
            }
        }
    }

    /// Remove a column from the row, including any pending change.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let key = column_key(name);
        if let Some(i) = position(&self.changes, &key) {
            self.changes.remove(i);
        }
        position(&self.values, &key).map(|i| self.values.remove(i).1)
    }

    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    /// Pending changes in the order they were first made.
    pub fn changes(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.changes.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn changed_columns(&self) -> Vec<&str> {
        self.changes.iter().map(|(k, _)| k.as_str()).collect()
    }

    /// Move every pending change into the base map.
    ///
    /// Fails without moving anything when a changed column no longer exists
    /// in the base map.
    pub fn accept_changes(&mut self) -> Result<()> {
        let missing: Vec<String> = self
            .changes
            .iter()
            .filter(|(k, _)| position(&self.values, k).is_none())
            .map(|(k, _)| k.clone())
            .collect();
        if !missing.is_empty() {
            return Err(Error::UnacceptedChanges(UnacceptedChangesError {
                message: format!(
                    "The changes to {} could not be accepted",
                    missing.join(", ")
                ),
                columns: missing,
            }));
        }
        for (key, value) in std::mem::take(&mut self.changes) {
            if let Some(i) = position(&self.values, &key) {
                self.values[i].1 = value;
            }
        }
        Ok(())
    }

    /// Discard every pending change.
    pub fn reject_changes(&mut self) {
        self.changes.clear();
    }

    /// Column names in load order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(k, _)| k.as_str())
    }

    /// (column, current value) pairs in load order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| {
            let current = position(&self.changes, k).map_or(v, |i| &self.changes[i].1);
            (k.as_str(), current)
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Nested rows attached under `name`.
    pub fn child(&self, name: &str) -> Option<&ResultTable> {
        self.get(name).and_then(Value::as_table)
    }

    /// Attach (or replace) a nested table.
    pub fn attach(&mut self, name: &str, table: ResultTable) {
        self.load(name, Value::Table(table));
    }
}

/// Rows originating from the same table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultTable {
    /// Name the table is attached under
    pub name: String,
    #[serde(default)]
    pub table: Option<Arc<MetadataTable>>,
    pub rows: Vec<RowData>,
}

impl ResultTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: None,
            rows: Vec::new(),
        }
    }

    pub fn for_table(name: impl Into<String>, table: Arc<MetadataTable>) -> Self {
        Self {
            name: name.into(),
            table: Some(table),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: RowData) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&RowData> {
        self.rows.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RowData> {
        self.rows.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, RowData> {
        self.rows.iter_mut()
    }

    /// Rows with pending changes.
    pub fn changed_rows(&self) -> impl Iterator<Item = &RowData> {
        self.rows.iter().filter(|r| r.has_changes())
    }

    /// Serialize the table as JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl<'a> IntoIterator for &'a ResultTable {
    type Item = &'a RowData;
    type IntoIter = std::slice::Iter<'a, RowData>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

impl IntoIterator for ResultTable {
    type Item = RowData;
    type IntoIter = std::vec::IntoIter<RowData>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}
