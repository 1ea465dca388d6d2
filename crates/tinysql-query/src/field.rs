//! Fields: select-list entries, condition operands and statement parameters.

use crate::table::TableId;
use tinysql_core::{ColumnType, Value};

/// Index of a [`Field`] inside the builder that owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId(pub(crate) usize);

impl FieldId {
    pub const fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// A table column, or `*`
    Column,
    /// A literal selected as a column
    Value,
    /// A `@name` parameter of an INSERT, UPDATE or procedure call
    Parameter { parameter: String, output: bool },
    /// A scalar function call such as `GETDATE()`
    Function {
        schema: Option<String>,
        args: Vec<FieldId>,
    },
    /// A literal function argument
    Constant,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub(crate) kind: FieldKind,
    pub(crate) name: String,
    pub(crate) alias: Option<String>,
    pub(crate) table: Option<TableId>,
    pub(crate) column_type: Option<ColumnType>,
    pub(crate) value: Option<Value>,
}

impl Field {
    pub(crate) fn new(kind: FieldKind, name: impl Into<String>, table: Option<TableId>) -> Self {
        Self {
            kind,
            name: name.into(),
            alias: None,
            table,
            column_type: None,
            value: None,
        }
    }

    pub(crate) fn with_alias(mut self, alias: Option<&str>) -> Self {
        self.alias = alias.filter(|a| !a.is_empty()).map(str::to_string);
        self
    }

    pub(crate) fn with_type(mut self, column_type: Option<ColumnType>) -> Self {
        self.column_type = column_type;
        self
    }

    pub(crate) fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    pub fn table(&self) -> Option<TableId> {
        self.table
    }

    /// Declared type, when set explicitly or copied from metadata.
    pub fn column_type(&self) -> Option<ColumnType> {
        self.column_type
    }

    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// Name of the column this field produces in a result set.
    pub fn output_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    pub fn is_wildcard(&self) -> bool {
        self.kind == FieldKind::Column && self.name == "*"
    }

    /// The `@name` of a parameter field.
    pub fn parameter(&self) -> Option<&str> {
        match &self.kind {
            FieldKind::Parameter { parameter, .. } => Some(parameter),
            _ => None,
        }
    }

    pub fn is_output_parameter(&self) -> bool {
        matches!(self.kind, FieldKind::Parameter { output: true, .. })
    }

    /// The declared type, falling back to one inferred from the value.
    pub fn declared_type(&self) -> ColumnType {
        self.column_type.unwrap_or_else(|| match &self.value {
            Some(value) => ColumnType::for_value(value),
            None => ColumnType::for_value(&Value::Null),
        })
    }

    /// Whether `name` refers to this field by name or alias.
    pub(crate) fn answers_to(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
            || self
                .alias
                .as_deref()
                .is_some_and(|alias| alias.eq_ignore_ascii_case(name))
    }
}

/// Parameter name for a column: `@` plus the column name with spaces
/// replaced.
pub(crate) fn parameter_name(name: &str) -> String {
    let name = name.trim_start_matches('@');
    format!("@{}", name.replace(' ', "_"))
}
