//! Read-only metadata catalog.
//!
//! The catalog describes tables, columns, primary keys and foreign keys of a
//! SQL Server database. It is built by an external loader (or deserialized
//! from JSON) and shared immutably through `Arc<MetadataDatabase>`.

use crate::Result;
use crate::config::DEFAULT_SCHEMA;
use crate::types::ColumnType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Column name fragments that mark a column as the human readable title.
pub const TITLE_COLUMNS: [&str; 7] = [
    "name",
    "title",
    "description",
    "fullname",
    "navn",
    "titel",
    "beskrivelse",
];

/// A database catalog keyed by schema-qualified table name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataDatabase {
    pub name: String,
    #[serde(default)]
    pub server: Option<String>,
    #[serde(default)]
    pub version: u64,
    /// All tables, keyed by `schema.name`
    pub tables: BTreeMap<String, Arc<MetadataTable>>,
}

impl MetadataDatabase {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Parse a catalog from its JSON document form.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Add a table, keyed by its full name.
    pub fn with_table(mut self, table: MetadataTable) -> Self {
        self.insert(table);
        self
    }

    pub fn insert(&mut self, table: MetadataTable) {
        self.tables.insert(table.full_name(), Arc::new(table));
    }

    /// Get a table by its exact key.
    pub fn table(&self, key: &str) -> Option<&Arc<MetadataTable>> {
        self.tables.get(key)
    }

    /// Find a table by bare or schema-qualified name.
    ///
    /// A bare name first tries `dbo.<name>`. Then the key is matched
    /// case-insensitively, and finally a unique case-insensitive suffix
    /// match is accepted.
    pub fn find_table(&self, name: &str) -> Option<&Arc<MetadataTable>> {
        self.find_table_in(name, DEFAULT_SCHEMA)
    }

    /// Like [`find_table`](Self::find_table) with an explicit default schema.
    pub fn find_table_in(&self, name: &str, default_schema: &str) -> Option<&Arc<MetadataTable>> {
        if !name.contains('.') {
            if let Some(t) = self.tables.get(&format!("{}.{}", default_schema, name)) {
                return Some(t);
            }
        }
        if let Some(t) = self.tables.get(name) {
            return Some(t);
        }
        if let Some((_, t)) = self
            .tables
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
        {
            return Some(t);
        }
        let lower = name.to_ascii_lowercase();
        let mut candidates = self
            .tables
            .iter()
            .filter(|(key, _)| key.to_ascii_lowercase().ends_with(&lower));
        match (candidates.next(), candidates.next()) {
            (Some((_, t)), None) => Some(t),
            (Some(_), Some(_)) => {
                tracing::debug!(table = %name, "table name suffix matches several catalog entries");
                None
            }
            _ => None,
        }
    }

    /// Get all table keys.
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.keys().map(String::as_str).collect()
    }
}

/// A table in the catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataTable {
    pub schema: String,
    pub name: String,
    /// Columns in ordinal order
    pub columns: Vec<MetadataColumn>,
    /// Primary key column names in key order
    #[serde(default)]
    pub primary_key: Vec<String>,
    /// Outbound foreign keys
    #[serde(default)]
    pub foreign_keys: Vec<MetadataForeignKey>,
    /// Explicit title column, overriding the name-based guess
    #[serde(default)]
    pub title_column: Option<String>,
    /// Named column lists used by list queries
    #[serde(default)]
    pub list_definitions: BTreeMap<String, Vec<String>>,
    /// Display names keyed by culture name
    #[serde(default)]
    pub display_names: BTreeMap<String, String>,
}

impl MetadataTable {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn column(mut self, column: MetadataColumn) -> Self {
        self.columns.push(column);
        self
    }

    pub fn primary_key<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_key = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn foreign_key(mut self, key: MetadataForeignKey) -> Self {
        self.foreign_keys.push(key);
        self
    }

    pub fn list_definition<I, S>(mut self, name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.list_definitions
            .insert(name.into(), columns.into_iter().map(Into::into).collect());
        self
    }

    /// `schema.name`, or just the name when no schema is set.
    pub fn full_name(&self) -> String {
        if self.schema.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.schema, self.name)
        }
    }

    /// Get a column by name (case-insensitive).
    pub fn get_column(&self, name: &str) -> Option<&MetadataColumn> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn is_primary_key(&self, column: &str) -> bool {
        self.primary_key
            .iter()
            .any(|c| c.eq_ignore_ascii_case(column))
    }

    /// Whether any foreign key uses `column` on its local side.
    pub fn is_foreign_key(&self, column: &str) -> bool {
        self.foreign_keys
            .iter()
            .any(|fk| fk.references_column(column))
    }

    /// Primary key columns with their metadata, in key order.
    pub fn primary_key_columns(&self) -> impl Iterator<Item = &MetadataColumn> {
        self.primary_key.iter().filter_map(|c| self.get_column(c))
    }

    /// Foreign keys whose local side includes `column`, optionally restricted
    /// to those targeting `referenced_table` (compared by bare name).
    pub fn find_foreign_keys<'a>(
        &'a self,
        column: &'a str,
        referenced_table: Option<&'a str>,
    ) -> impl Iterator<Item = &'a MetadataForeignKey> + 'a {
        self.foreign_keys.iter().filter(move |fk| {
            fk.references_column(column)
                && referenced_table.is_none_or(|t| fk.referenced_table.eq_ignore_ascii_case(t))
        })
    }

    /// The column shown when a row of this table is referenced.
    pub fn guess_title_column(&self) -> Option<&str> {
        if let Some(title) = &self.title_column {
            return Some(title);
        }
        for fragment in TITLE_COLUMNS {
            if let Some(c) = self
                .columns
                .iter()
                .find(|c| c.name.to_ascii_lowercase().contains(fragment))
            {
                return Some(&c.name);
            }
        }
        self.primary_key.first().map(String::as_str)
    }

    /// The display name for a culture, falling back to the table name.
    pub fn display_name(&self, culture: &str) -> &str {
        self.display_names.get(culture).unwrap_or(&self.name)
    }
}

/// A column in a catalog table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataColumn {
    pub name: String,
    #[serde(flatten)]
    pub column_type: ColumnType,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub is_identity: bool,
    #[serde(default)]
    pub is_computed: bool,
    #[serde(default)]
    pub is_row_guid: bool,
    #[serde(default)]
    pub default: Option<String>,
    /// Columns of the referenced table pulled into joins (`Name` or `Name=Alias`)
    #[serde(default)]
    pub include_columns: Vec<String>,
    #[serde(default)]
    pub display_names: BTreeMap<String, String>,
}

impl MetadataColumn {
    pub fn new(name: impl Into<String>, column_type: impl Into<ColumnType>) -> Self {
        Self {
            name: name.into(),
            column_type: column_type.into(),
            nullable: false,
            is_identity: false,
            is_computed: false,
            is_row_guid: false,
            default: None,
            include_columns: Vec::new(),
            display_names: BTreeMap::new(),
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn identity(mut self) -> Self {
        self.is_identity = true;
        self
    }

    pub fn computed(mut self) -> Self {
        self.is_computed = true;
        self
    }

    pub fn include<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Computed, identity and rowguid columns are never written.
    pub fn read_only(&self) -> bool {
        self.is_computed || self.is_identity || self.is_row_guid
    }
}

/// A foreign key from a table to a referenced table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataForeignKey {
    pub name: String,
    pub referenced_schema: String,
    pub referenced_table: String,
    /// Column pairs in key order
    pub references: Vec<ColumnReference>,
    /// Declared in metadata only, with no constraint in the database
    #[serde(default)]
    pub is_virtual: bool,
}

impl MetadataForeignKey {
    pub fn new(
        name: impl Into<String>,
        referenced_schema: impl Into<String>,
        referenced_table: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            referenced_schema: referenced_schema.into(),
            referenced_table: referenced_table.into(),
            references: Vec::new(),
            is_virtual: false,
        }
    }

    pub fn reference(
        mut self,
        column: impl Into<String>,
        referenced_column: impl Into<String>,
    ) -> Self {
        self.references.push(ColumnReference {
            column: column.into(),
            referenced_column: referenced_column.into(),
        });
        self
    }

    /// `schema.table` of the referenced table.
    pub fn referenced_full_name(&self) -> String {
        if self.referenced_schema.is_empty() {
            self.referenced_table.clone()
        } else {
            format!("{}.{}", self.referenced_schema, self.referenced_table)
        }
    }

    pub fn references_column(&self, column: &str) -> bool {
        self.references
            .iter()
            .any(|r| r.column.eq_ignore_ascii_case(column))
    }
}

/// One column pair of a foreign key.
///
/// A local side written as a double-quoted token (`"3"`) is a constant that
/// filters the referenced table instead of matching a local column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnReference {
    pub column: String,
    pub referenced_column: String,
}

impl ColumnReference {
    /// The constant value for a literal segment.
    pub fn literal(&self) -> Option<&str> {
        if self.column.starts_with('"') {
            Some(self.column.trim_matches('"'))
        } else {
            None
        }
    }
}
