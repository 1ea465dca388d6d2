//! Flat rows and result sets as produced by an executor.

use crate::value::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Column metadata shared across all rows in a result set.
///
/// This struct is wrapped in `Arc` so all rows from the same result set share
/// the same column information.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnInfo {
    /// Column names in order
    names: Vec<String>,
    /// Name -> index mapping for O(1) lookup
    name_to_index: HashMap<String, usize>,
}

impl ColumnInfo {
    /// Create new column info from a list of column names.
    ///
    /// A repeated name keeps the index of its first occurrence.
    pub fn new(names: Vec<String>) -> Self {
        let mut name_to_index = HashMap::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            name_to_index.entry(name.clone()).or_insert(i);
        }
        Self {
            names,
            name_to_index,
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Get the index of a column by name.
    ///
    /// Exact matches win; otherwise names compare case-insensitively, the way
    /// the server resolves identifiers.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.name_to_index.get(name).copied().or_else(|| {
            self.names
                .iter()
                .position(|n| n.eq_ignore_ascii_case(name))
        })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

/// A single flat row returned by an executor.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    values: Vec<Value>,
    columns: Arc<ColumnInfo>,
}

impl Row {
    /// Create a row with its own column metadata.
    ///
    /// For multiple rows from the same result set, prefer `with_columns`.
    pub fn new(column_names: Vec<String>, values: Vec<Value>) -> Self {
        Self {
            values,
            columns: Arc::new(ColumnInfo::new(column_names)),
        }
    }

    /// Create a row with shared column metadata.
    pub fn with_columns(columns: Arc<ColumnInfo>, values: Vec<Value>) -> Self {
        Self { values, columns }
    }

    pub fn column_info(&self) -> Arc<ColumnInfo> {
        Arc::clone(&self.columns)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        self.columns.index_of(name).and_then(|i| self.values.get(i))
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

/// One tabular result of a batch: ordered column names plus rows.
///
/// A compiled batch with sub-queries yields one result set per builder level,
/// in the order the statements appear in the batch.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSet {
    columns: Arc<ColumnInfo>,
    rows: Vec<Row>,
}

impl ResultSet {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: Arc::new(ColumnInfo::new(columns.into_iter().map(Into::into).collect())),
            rows: Vec::new(),
        }
    }

    /// Append a row; values are matched to columns by position.
    pub fn push<I, V>(&mut self, values: I)
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.rows
            .push(Row::with_columns(Arc::clone(&self.columns), values));
    }

    /// Builder-style [`push`](Self::push).
    pub fn with_row<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.push(values);
        self
    }

    pub fn columns(&self) -> &ColumnInfo {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl From<Vec<Row>> for ResultSet {
    /// Wrap executor rows; column names come from the first row.
    fn from(rows: Vec<Row>) -> Self {
        let columns = rows
            .first()
            .map(Row::column_info)
            .unwrap_or_else(|| Arc::new(ColumnInfo::new(Vec::new())));
        Self { columns, rows }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_basic_access() {
        let row = Row::new(
            vec!["AccountID".to_string(), "Name".to_string()],
            vec![Value::Int(526), Value::Text("Contoso".to_string())],
        );

        assert_eq!(row.len(), 2);
        assert_eq!(row.get(0), Some(&Value::Int(526)));
        assert_eq!(row.get(2), None);
        assert_eq!(row.get_by_name("Name"), Some(&Value::from("Contoso")));
        assert_eq!(row.get_by_name("accountid"), Some(&Value::Int(526)));
        assert_eq!(row.get_by_name("missing"), None);
    }

    #[test]
    fn test_duplicate_names_keep_first() {
        let info = ColumnInfo::new(vec!["Name".to_string(), "Name".to_string()]);
        assert_eq!(info.index_of("Name"), Some(0));
        assert_eq!(info.len(), 2);
    }

    #[test]
    fn test_result_set_shares_columns() {
        let set = ResultSet::new(["AccountID", "Name"])
            .with_row([Value::Int(1), Value::from("A")])
            .with_row([Value::Int(2), Value::from("B")]);

        assert_eq!(set.len(), 2);
        assert_eq!(set.columns().names(), ["AccountID", "Name"]);
        let rows = set.rows();
        assert!(Arc::ptr_eq(&rows[0].column_info(), &rows[1].column_info()));
        assert_eq!(rows[1].get_by_name("AccountID"), Some(&Value::Int(2)));
    }

    #[test]
    fn test_result_set_from_rows() {
        let rows = vec![Row::new(vec!["a".to_string()], vec![Value::Int(1)])];
        let set = ResultSet::from(rows);
        assert_eq!(set.columns().names(), ["a"]);
        assert!(ResultSet::from(Vec::new()).columns().is_empty());
    }
}
