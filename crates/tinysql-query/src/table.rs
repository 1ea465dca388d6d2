//! Tables participating in a statement.

use crate::clause::OrderBy;
use crate::field::FieldId;

/// Index of a [`Table`] inside the builder that owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableId(pub(crate) usize);

impl TableId {
    pub const fn index(self) -> usize {
        self.0
    }
}

/// What role a table plays in its statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableKind {
    /// A FROM or JOIN table
    Base,
    /// The target of an INSERT
    InsertTarget,
    /// The target of an UPDATE
    UpdateTarget,
    /// A `#temp` table filled by `SELECT ... INTO`
    Temp,
    /// The `inserted` pseudo-table of an OUTPUT clause
    Parameter,
    /// Named by a condition but not part of the FROM clause: an EXISTS
    /// target or a table borrowed from an enclosing builder
    Detached,
}

impl TableKind {
    /// Whether the table is one of the statement's own tables (FROM, JOIN or
    /// DML target), as opposed to a helper table.
    pub const fn participates(self) -> bool {
        matches!(
            self,
            TableKind::Base | TableKind::InsertTarget | TableKind::UpdateTarget
        )
    }
}

/// A table in the query model.
///
/// Fields are listed by id; the [`Field`](crate::Field) records themselves
/// live in the builder's arena.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub(crate) kind: TableKind,
    pub(crate) name: String,
    pub(crate) schema: Option<String>,
    pub(crate) alias: Option<String>,
    pub(crate) fields: Vec<FieldId>,
    /// Temp tables only: select the temp table back after filling it
    pub(crate) output: bool,
    /// Temp tables only: ordering of the output select
    pub(crate) order_by: Vec<OrderBy>,
}

impl Table {
    pub(crate) fn new(
        kind: TableKind,
        name: impl Into<String>,
        alias: Option<&str>,
        schema: Option<&str>,
    ) -> Self {
        let mut name = name.into();
        if kind == TableKind::Temp {
            name = name.trim_start_matches('#').to_string();
        }
        Self {
            kind,
            name,
            schema: schema.filter(|s| !s.is_empty()).map(str::to_string),
            alias: alias.filter(|a| !a.is_empty()).map(str::to_string),
            fields: Vec::new(),
            output: false,
            order_by: Vec::new(),
        }
    }

    pub fn kind(&self) -> TableKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    /// The alias given when the table was added, if any.
    pub fn explicit_alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// `schema.name`, or the bare name without a schema.
    pub fn full_name(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", schema, self.name),
            None => self.name.clone(),
        }
    }

    /// The prefix used to qualify this table's columns.
    pub fn alias(&self) -> String {
        if self.kind == TableKind::Temp {
            return format!("#{}", self.name);
        }
        match &self.alias {
            Some(alias) => alias.clone(),
            None => self.full_name(),
        }
    }

    /// How the table is written in a FROM, JOIN or INTO clause.
    pub fn reference_name(&self) -> String {
        match self.kind {
            TableKind::Temp => format!("#{}", self.name),
            TableKind::InsertTarget => self.name.clone(),
            TableKind::Parameter => self.alias(),
            _ => match &self.alias {
                Some(alias) => format!("{} {}", self.full_name(), alias),
                None => self.full_name(),
            },
        }
    }

    pub fn fields(&self) -> &[FieldId] {
        &self.fields
    }

    /// Whether a temp table is selected back after being filled.
    pub fn is_output(&self) -> bool {
        self.output
    }

    /// Name, alias or schema-qualified name, compared case-insensitively.
    pub(crate) fn matches(&self, key: &str) -> bool {
        self.name.eq_ignore_ascii_case(key)
            || self.alias().eq_ignore_ascii_case(key)
            || self.full_name().eq_ignore_ascii_case(key)
    }

    /// A field-less copy used when a nested builder refers to this table.
    pub(crate) fn detached(&self) -> Table {
        Table {
            kind: TableKind::Detached,
            name: self.name.clone(),
            schema: self.schema.clone(),
            alias: Some(self.alias()),
            fields: Vec::new(),
            output: false,
            order_by: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_defaults_to_full_name() {
        let table = Table::new(TableKind::Base, "Account", None, Some("dbo"));
        assert_eq!(table.alias(), "dbo.Account");
        assert_eq!(table.reference_name(), "dbo.Account");

        let aliased = Table::new(TableKind::Base, "Account", Some("t0"), None);
        assert_eq!(aliased.alias(), "t0");
        assert_eq!(aliased.reference_name(), "Account t0");
    }

    #[test]
    fn test_temp_table_names() {
        let temp = Table::new(TableKind::Temp, "#tmp_Account", None, None);
        assert_eq!(temp.name(), "tmp_Account");
        assert_eq!(temp.alias(), "#tmp_Account");
        assert_eq!(temp.reference_name(), "#tmp_Account");
    }

    #[test]
    fn test_insert_target_reference_is_bare_name() {
        let target = Table::new(TableKind::InsertTarget, "Account", None, Some("dbo"));
        assert_eq!(target.reference_name(), "Account");
        assert_eq!(target.alias(), "dbo.Account");
    }

    #[test]
    fn test_matches_is_case_insensitive() {
        let table = Table::new(TableKind::Base, "Account", Some("t0"), Some("dbo"));
        assert!(table.matches("account"));
        assert!(table.matches("T0"));
        assert!(table.matches("DBO.ACCOUNT"));
        assert!(!table.matches("Contact"));
    }

    #[test]
    fn test_empty_alias_and_schema_are_ignored() {
        let table = Table::new(TableKind::Parameter, "inserted", Some(""), Some(""));
        assert_eq!(table.schema(), None);
        assert_eq!(table.alias(), "inserted");
    }
}
