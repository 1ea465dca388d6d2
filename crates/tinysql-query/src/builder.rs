//! The query model root.
//!
//! A [`Builder`] owns every table, field, condition group and join of one
//! statement in flat arenas; the ids handed out (`TableId`, `FieldId`,
//! `GroupId`, `JoinId`) are only meaningful for the builder that issued them.
//! Nested statements (sub-queries, conditional bodies) are owned builders of
//! their own.

use std::sync::Arc;

use crate::clause::OrderBy;
use crate::condition::{ConditionGroup, GroupId, GroupKind};
use crate::field::{Field, FieldId, FieldKind};
use crate::join::Join;
use crate::statement::{Conditional, OutputClause, ProcedureCall};
use crate::table::{Table, TableId, TableKind};
use tinysql_core::{
    Error, LookupScope, MetadataDatabase, MetadataTable, Result, SelectListDedup, SqlConfig, Value,
};

/// The kind of statement a builder compiles to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
    Procedure,
    Conditional,
}

impl StatementKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            StatementKind::Select => "SELECT",
            StatementKind::Insert => "INSERT",
            StatementKind::Update => "UPDATE",
            StatementKind::Delete => "DELETE",
            StatementKind::Procedure => "PROCEDURE",
            StatementKind::Conditional => "CONDITIONAL",
        }
    }

    /// Insert and update sub-statements keep their own parameter scope.
    pub const fn isolates_parameters(self) -> bool {
        matches!(self, StatementKind::Insert | StatementKind::Update)
    }
}

/// Columns that tie a sub-query's rows to its parent's rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubQueryLink {
    pub parent_column: String,
    pub child_column: String,
}

/// A statement under construction.
///
/// # Example
///
/// ```
/// use tinysql_query::{Builder, Operator};
///
/// let mut b = Builder::select();
/// let account = b.add_table("Account", None, None);
/// b.add_columns(account, &["AccountID", "Name"]);
/// b.where_("Account", "AccountID", Operator::Equal, 526).unwrap();
///
/// let sql = b.compile().unwrap();
/// assert!(sql.contains("WHERE (t0.[AccountID] = 526)"));
/// ```
#[derive(Debug, Clone)]
pub struct Builder {
    pub(crate) kind: StatementKind,
    pub(crate) name: Option<String>,
    pub(crate) config: SqlConfig,
    pub(crate) metadata: Option<Arc<MetadataDatabase>>,
    pub(crate) top: Option<u64>,
    pub(crate) distinct: bool,
    pub(crate) tables: Vec<Table>,
    pub(crate) fields: Vec<Field>,
    pub(crate) groups: Vec<ConditionGroup>,
    pub(crate) joins: Vec<Join>,
    pub(crate) order_by: Vec<OrderBy>,
    pub(crate) select_into: Option<TableId>,
    pub(crate) sub_queries: Vec<(String, Builder)>,
    pub(crate) shares_scope: bool,
    pub(crate) ancestors: Vec<Table>,
    pub(crate) procedure: Option<ProcedureCall>,
    pub(crate) conditional: Option<Conditional>,
    pub(crate) output: Option<OutputClause>,
    pub(crate) link: Option<SubQueryLink>,
}

impl Builder {
    pub(crate) fn new(kind: StatementKind) -> Self {
        Self {
            kind,
            name: None,
            config: SqlConfig::default(),
            metadata: None,
            top: None,
            distinct: false,
            tables: Vec::new(),
            fields: Vec::new(),
            groups: vec![ConditionGroup::new(GroupKind::Where)],
            joins: Vec::new(),
            order_by: Vec::new(),
            select_into: None,
            sub_queries: Vec::new(),
            shares_scope: false,
            ancestors: Vec::new(),
            procedure: None,
            conditional: None,
            output: None,
            link: None,
        }
    }

    /// Start a `SELECT`.
    pub fn select() -> Self {
        Self::new(StatementKind::Select)
    }

    /// Start a `SELECT [DISTINCT] [TOP n]`.
    pub fn select_with(top: Option<u64>, distinct: bool) -> Self {
        let mut b = Self::new(StatementKind::Select);
        b.top = top;
        b.distinct = distinct;
        b
    }

    pub fn insert() -> Self {
        Self::new(StatementKind::Insert)
    }

    pub fn update() -> Self {
        Self::new(StatementKind::Update)
    }

    pub fn delete() -> Self {
        Self::new(StatementKind::Delete)
    }

    /// Attach a metadata catalog used to type columns and resolve joins.
    pub fn with_metadata(mut self, metadata: Arc<MetadataDatabase>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_config(mut self, config: SqlConfig) -> Self {
        self.config = config;
        self
    }

    /// Name the builder. A named sub-query attaches its rows under this name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// A builder of `kind` that inherits this builder's configuration and
    /// catalog.
    pub(crate) fn child(&self, kind: StatementKind) -> Builder {
        let mut child = Builder::new(kind);
        child.config = self.config.clone();
        child.metadata = self.metadata.clone();
        child
    }

    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn config(&self) -> &SqlConfig {
        &self.config
    }

    pub fn metadata(&self) -> Option<&Arc<MetadataDatabase>> {
        self.metadata.as_ref()
    }

    pub fn link(&self) -> Option<&SubQueryLink> {
        self.link.as_ref()
    }

    pub fn table(&self, id: TableId) -> &Table {
        &self.tables[id.0]
    }

    pub fn field(&self, id: FieldId) -> &Field {
        &self.fields[id.0]
    }

    /// The statement's own tables in the order they were added.
    pub fn tables(&self) -> impl Iterator<Item = (TableId, &Table)> {
        self.tables
            .iter()
            .enumerate()
            .filter(|(_, t)| t.kind.participates())
            .map(|(i, t)| (TableId(i), t))
    }

    /// The first table added: FROM table, INSERT or UPDATE target.
    pub fn base_table(&self) -> Option<TableId> {
        self.tables().next().map(|(id, _)| id)
    }

    /// Find one of the statement's own tables by name, alias or full name.
    pub fn find_table(&self, key: &str) -> Option<TableId> {
        self.tables().find(|(_, t)| t.matches(key)).map(|(id, _)| id)
    }

    pub(crate) fn expect_kind(&self, operation: &'static str, expected: StatementKind) -> Result<()> {
        if self.kind == expected {
            Ok(())
        } else {
            Err(Error::kind_mismatch(
                operation,
                expected.as_str(),
                self.kind.as_str(),
            ))
        }
    }

    pub(crate) fn push_table(&mut self, table: Table) -> TableId {
        self.tables.push(table);
        TableId(self.tables.len() - 1)
    }

    pub(crate) fn push_field(&mut self, field: Field) -> FieldId {
        self.fields.push(field);
        FieldId(self.fields.len() - 1)
    }

    /// Push a field and list it on its table.
    pub(crate) fn attach_field(&mut self, table: TableId, field: Field) -> FieldId {
        let id = self.push_field(field);
        self.tables[table.0].fields.push(id);
        id
    }

    pub(crate) fn is_join_target(&self, table: TableId) -> bool {
        self.joins.iter().any(|j| j.to == table)
    }

    /// Add a FROM table, or return the table already known by that name or
    /// alias.
    ///
    /// A table matched only by name is not reused when it is already the
    /// target of a join, so the same table can be joined twice. New tables
    /// get the positional alias `t<N>` unless `alias` is given.
    pub fn add_table(&mut self, name: &str, alias: Option<&str>, schema: Option<&str>) -> TableId {
        let key = alias.filter(|a| !a.is_empty()).unwrap_or(name);
        let existing = self.tables().find_map(|(id, t)| {
            let by_alias = t.alias.as_deref().is_some_and(|a| a.eq_ignore_ascii_case(key));
            let by_name = t.name.eq_ignore_ascii_case(key) && !self.is_join_target(id);
            (by_alias || by_name).then_some(id)
        });
        if let Some(id) = existing {
            return id;
        }
        let positional = format!("t{}", self.tables().count());
        let alias = alias.filter(|a| !a.is_empty()).unwrap_or(&positional);
        let id = self.push_table(Table::new(TableKind::Base, name, Some(alias), schema));
        tracing::trace!(table = name, alias, "added table");
        id
    }

    /// Resolve a table named by a condition: the statement's own tables
    /// first, then tables this builder already borrowed, then the tables of
    /// enclosing builders.
    pub(crate) fn resolve_table(&mut self, key: &str) -> Result<TableId> {
        if let Some(id) = self.find_table(key) {
            return Ok(id);
        }
        if let Some(i) = self
            .tables
            .iter()
            .position(|t| t.kind == TableKind::Detached && t.matches(key))
        {
            return Ok(TableId(i));
        }
        match self.ancestors.iter().find(|t| t.matches(key)) {
            Some(table) => {
                let borrowed = table.clone();
                Ok(self.push_table(borrowed))
            }
            None => Err(Error::unknown_table(key, LookupScope::QueryModel)),
        }
    }

    /// Catalog entry for a table, when a catalog is attached and knows it.
    pub(crate) fn table_metadata(&self, table: TableId) -> Option<Arc<MetadataTable>> {
        let metadata = self.metadata.as_ref()?;
        let key = self.tables[table.0].full_name();
        metadata
            .find_table_in(&key, &self.config.default_schema)
            .cloned()
    }

    /// Catalog entry for the base table.
    pub fn base_metadata(&self) -> Option<Arc<MetadataTable>> {
        self.base_table().and_then(|id| self.table_metadata(id))
    }

    pub(crate) fn find_field(&self, table: TableId, name: &str) -> Option<FieldId> {
        self.tables[table.0]
            .fields
            .iter()
            .copied()
            .find(|f| self.fields[f.0].answers_to(name))
    }

    pub(crate) fn has_wildcard(&self, table: TableId) -> bool {
        self.tables[table.0]
            .fields
            .iter()
            .any(|f| self.fields[f.0].is_wildcard())
    }

    /// A column of `table` used as an operand: the listed field when there is
    /// one, otherwise an unlisted field typed from the catalog.
    pub(crate) fn reference_field(&mut self, table: TableId, column: &str) -> FieldId {
        if let Some(id) = self.find_field(table, column) {
            return id;
        }
        let field = self.metadata_column(table, column);
        self.push_field(field)
    }

    /// A column field with canonical name and type copied from the catalog.
    fn metadata_column(&self, table: TableId, column: &str) -> Field {
        let meta = self
            .table_metadata(table)
            .and_then(|m| m.get_column(column).map(|c| (c.name.clone(), c.column_type)));
        match meta {
            Some((name, column_type)) => {
                Field::new(FieldKind::Column, name, Some(table)).with_type(Some(column_type))
            }
            None => Field::new(FieldKind::Column, column, Some(table)),
        }
    }

    /// Add a column to the select list of `table`.
    ///
    /// Adding a column that is already listed under the same name (or the
    /// same alias) returns the existing field.
    pub fn add_column(&mut self, table: TableId, name: &str, alias: Option<&str>) -> FieldId {
        let alias = alias.filter(|a| !a.is_empty());
        let existing = self.tables[table.0].fields.iter().copied().find(|id| {
            let f = &self.fields[id.0];
            f.kind == FieldKind::Column
                && match alias {
                    Some(a) => f.alias.as_deref().is_some_and(|fa| fa.eq_ignore_ascii_case(a)),
                    None => f.alias.is_none() && f.name.eq_ignore_ascii_case(name),
                }
        });
        if let Some(id) = existing {
            return id;
        }
        let field = self.metadata_column(table, name).with_alias(alias);
        self.attach_field(table, field)
    }

    pub fn add_columns(&mut self, table: TableId, names: &[&str]) -> Vec<FieldId> {
        names
            .iter()
            .map(|name| self.add_column(table, name, None))
            .collect()
    }

    /// Select every column of `table`.
    ///
    /// Expands to the catalog's column list unless `wildcard` is set or no
    /// catalog is attached, in which case `*` is selected.
    pub fn all_columns(&mut self, table: TableId, wildcard: bool) -> Result<&mut Self> {
        if wildcard || self.metadata.is_none() {
            self.add_column(table, "*", None);
            return Ok(self);
        }
        let Some(meta) = self.table_metadata(table) else {
            return Err(Error::config(format!(
                "The table {} cannot be resolved with metadata. Must use wildcard",
                self.tables[table.0].full_name()
            )));
        };
        for column in &meta.columns {
            self.add_column(table, &column.name, None);
        }
        Ok(self)
    }

    /// Select a literal as a column.
    pub fn add_value_column(
        &mut self,
        table: TableId,
        value: impl Into<Value>,
        alias: Option<&str>,
    ) -> FieldId {
        let value = value.into();
        let field = Field::new(FieldKind::Value, alias.unwrap_or_default(), Some(table))
            .with_alias(alias)
            .with_value(value);
        self.attach_field(table, field)
    }

    /// A literal function argument.
    pub fn constant(&mut self, value: impl Into<Value>) -> FieldId {
        let field = Field::new(FieldKind::Constant, "", None).with_value(value.into());
        self.push_field(field)
    }

    /// A column of `table` used as a function argument; not selected.
    pub fn column_ref(&mut self, table: TableId, column: &str) -> FieldId {
        let field = self.metadata_column(table, column);
        self.push_field(field)
    }

    /// Select a scalar function call `schema.NAME(args)`.
    pub fn add_function(
        &mut self,
        table: TableId,
        schema: Option<&str>,
        name: &str,
        args: Vec<FieldId>,
        alias: Option<&str>,
    ) -> FieldId {
        let kind = FieldKind::Function {
            schema: schema.filter(|s| !s.is_empty()).map(str::to_string),
            args,
        };
        let field = Field::new(kind, name.to_uppercase(), Some(table)).with_alias(alias);
        self.attach_field(table, field)
    }

    /// Select `GETDATE()`.
    pub fn get_date(&mut self, table: TableId, alias: Option<&str>) -> FieldId {
        self.add_function(table, None, "GETDATE", Vec::new(), alias)
    }

    /// Select `CONCAT(args)`.
    pub fn concat(&mut self, table: TableId, args: Vec<FieldId>, alias: Option<&str>) -> FieldId {
        self.add_function(table, None, "CONCAT", args, alias)
    }

    /// Select several columns of `table` joined by `separator` as one column,
    /// `first + 'sep' + [t].second ...`.
    pub fn concat_columns(
        &mut self,
        table: TableId,
        alias: &str,
        separator: &str,
        columns: &[&str],
    ) -> Option<FieldId> {
        let (first, rest) = columns.split_first()?;
        let prefix = self.tables[table.0].alias();
        let separator = separator.replace('\'', "''");
        let mut name = (*first).to_string();
        for column in rest {
            name.push_str(&format!(" + '{}' + [{}].{}", separator, prefix, column));
        }
        let field = Field::new(FieldKind::Column, name, Some(table)).with_alias(Some(alias));
        Some(self.attach_field(table, field))
    }

    /// Fill a temp table with this SELECT (`INTO #name`).
    ///
    /// Only the first call creates the temp table; later calls return it.
    /// With `output` set the temp table is selected back after it is filled.
    pub fn select_into(&mut self, name: &str, output: bool) -> Result<TableId> {
        self.expect_kind("select_into", StatementKind::Select)?;
        if let Some(id) = self.select_into {
            return Ok(id);
        }
        let mut temp = Table::new(TableKind::Temp, name, None, None);
        temp.output = output;
        let id = self.push_table(temp);
        self.attach_field(id, Field::new(FieldKind::Column, "*", Some(id)));
        self.select_into = Some(id);
        Ok(id)
    }

    pub fn select_into_table(&self) -> Option<TableId> {
        self.select_into
    }

    /// Register a nested statement under `key`.
    ///
    /// The child shares this builder's parameter declarations unless it is an
    /// INSERT or UPDATE, and can refer to this builder's tables in its
    /// conditions. Registering an existing key replaces that child in place.
    pub fn add_sub_query(&mut self, key: impl Into<String>, mut builder: Builder) -> &mut Builder {
        let key = key.into();
        builder.shares_scope = !builder.kind.isolates_parameters();
        if builder.metadata.is_none() {
            builder.metadata = self.metadata.clone();
        }
        builder.adopt(self.scope_tables());
        let index = match self.sub_queries.iter().position(|(k, _)| *k == key) {
            Some(i) => {
                self.sub_queries[i].1 = builder;
                i
            }
            None => {
                self.sub_queries.push((key, builder));
                self.sub_queries.len() - 1
            }
        };
        &mut self.sub_queries[index].1
    }

    pub fn sub_query(&self, key: &str) -> Option<&Builder> {
        self.sub_queries.iter().find(|(k, _)| k == key).map(|(_, b)| b)
    }

    pub fn sub_query_mut(&mut self, key: &str) -> Option<&mut Builder> {
        self.sub_queries
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, b)| b)
    }

    /// Sub-queries in declaration order.
    pub fn sub_queries(&self) -> impl Iterator<Item = (&str, &Builder)> {
        self.sub_queries.iter().map(|(k, b)| (k.as_str(), b))
    }

    /// Tables a nested builder may refer to: this builder's own tables, then
    /// everything this builder could see itself.
    pub(crate) fn scope_tables(&self) -> Vec<Table> {
        let mut scope: Vec<Table> = self.tables().map(|(_, t)| t.detached()).collect();
        scope.extend(self.ancestors.iter().cloned());
        scope
    }

    /// Record the enclosing scope and pass it on to nested builders.
    pub(crate) fn adopt(&mut self, ancestors: Vec<Table>) {
        self.ancestors = ancestors;
        let scope = self.scope_tables();
        for (_, sub) in &mut self.sub_queries {
            sub.adopt(scope.clone());
        }
        if let Some(conditional) = &mut self.conditional {
            if let Some(body) = &mut conditional.body {
                body.adopt(scope.clone());
            }
            for branch in &mut conditional.branches {
                branch.adopt(scope.clone());
            }
        }
    }

    /// Output names that collide with an earlier select-list entry, with the
    /// replacement alias for each (`None` when the entry is dropped).
    ///
    /// A replacement `<table>_<column>` that is itself taken by another entry
    /// gets a numeric suffix, `<table>_<column>_2` and so on.
    pub(crate) fn select_list_collisions(&self, mode: SelectListDedup) -> Vec<(FieldId, Option<String>)> {
        let selected = || {
            self.tables().flat_map(move |(_, table)| {
                table.fields.iter().map(move |&id| (table, id, &self.fields[id.0]))
            })
        };
        let listed: Vec<&str> = selected()
            .filter(|(_, _, f)| !f.is_wildcard())
            .map(|(_, _, f)| f.output_name())
            .collect();
        let mut seen: Vec<String> = Vec::new();
        let mut collisions = Vec::new();
        for (table, id, field) in selected() {
            if field.is_wildcard() || field.output_name().is_empty() {
                continue;
            }
            let output = field.output_name().to_string();
            if !seen.contains(&output) {
                seen.push(output);
                continue;
            }
            match mode {
                SelectListDedup::Remove => collisions.push((id, None)),
                SelectListDedup::Rename => {
                    let base = format!("{}_{}", table.name, field.name);
                    let mut alias = base.clone();
                    let mut suffix = 2;
                    while seen.contains(&alias) || listed.contains(&alias.as_str()) {
                        alias = format!("{base}_{suffix}");
                        suffix += 1;
                    }
                    seen.push(alias.clone());
                    collisions.push((id, Some(alias)));
                }
            }
        }
        collisions
    }

    /// Resolve duplicate output names in the select list in place: rename
    /// them to `<table>_<column>`, or drop them when `remove` is set.
    ///
    /// The compiler applies the configured policy on its own; this makes the
    /// result part of the model.
    pub fn clean_select_list(&mut self, remove: bool) -> &mut Self {
        let mode = if remove {
            SelectListDedup::Remove
        } else {
            SelectListDedup::Rename
        };
        for (id, alias) in self.select_list_collisions(mode) {
            match alias {
                Some(alias) => self.fields[id.0].alias = Some(alias),
                None => {
                    for table in &mut self.tables {
                        table.fields.retain(|f| *f != id);
                    }
                }
            }
        }
        self
    }

    pub(crate) fn group_mut(&mut self, id: GroupId) -> &mut ConditionGroup {
        &mut self.groups[id.0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tinysql_core::{ColumnType, MetadataColumn, SqlType};

    fn catalog() -> Arc<MetadataDatabase> {
        let account = MetadataTable::new("dbo", "Account")
            .column(MetadataColumn::new("AccountID", SqlType::Int))
            .column(MetadataColumn::new(
                "Name",
                ColumnType::new(SqlType::NVarChar).with_length(160),
            ))
            .primary_key(["AccountID"]);
        Arc::new(MetadataDatabase::new("crm").with_table(account))
    }

    #[test]
    fn test_add_table_assigns_positional_aliases() {
        let mut b = Builder::select();
        let a = b.add_table("Account", None, None);
        let c = b.add_table("Contact", None, None);
        assert_eq!(b.table(a).alias(), "t0");
        assert_eq!(b.table(c).alias(), "t1");
        assert_eq!(b.add_table("Account", None, None), a);
        assert_eq!(b.add_table("t1", None, None), c);
    }

    #[test]
    fn test_add_column_is_idempotent_unless_aliased() {
        let mut b = Builder::select();
        let t = b.add_table("Account", None, None);
        let first = b.add_column(t, "Name", None);
        assert_eq!(b.add_column(t, "name", None), first);
        let aliased = b.add_column(t, "Name", Some("AccountName"));
        assert_ne!(aliased, first);
        assert_eq!(b.table(t).fields().len(), 2);
    }

    #[test]
    fn test_add_column_copies_metadata() {
        let mut b = Builder::select().with_metadata(catalog());
        let t = b.add_table("Account", None, None);
        let f = b.add_column(t, "name", None);
        assert_eq!(b.field(f).name(), "Name");
        assert_eq!(
            b.field(f).column_type().map(|c| c.sql_type),
            Some(SqlType::NVarChar)
        );
    }

    #[test]
    fn test_all_columns_expands_metadata() {
        let mut b = Builder::select().with_metadata(catalog());
        let t = b.add_table("Account", None, None);
        b.all_columns(t, false).unwrap();
        let names: Vec<&str> = b.table(t).fields().iter().map(|f| b.field(*f).name()).collect();
        assert_eq!(names, ["AccountID", "Name"]);

        let missing = b.add_table("Invoice", None, None);
        let err = b.all_columns(missing, false).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_select_into_requires_select() {
        let mut b = Builder::delete();
        let err = b.select_into("tmp", true).unwrap_err();
        assert!(matches!(err, Error::StatementKindMismatch(_)));
    }

    #[test]
    fn test_sub_query_replaces_existing_key() {
        let mut b = Builder::select();
        b.add_table("Account", None, None);
        b.add_sub_query("contacts", Builder::select().named("first"));
        b.add_sub_query("contacts", Builder::select().named("second"));
        assert_eq!(b.sub_queries().count(), 1);
        assert_eq!(b.sub_query("contacts").and_then(Builder::name), Some("second"));
    }

    #[test]
    fn test_sub_query_scope_flags() {
        let mut b = Builder::select();
        b.add_table("Account", None, None);
        assert!(b.add_sub_query("s", Builder::select()).shares_scope);
        assert!(!b.add_sub_query("u", Builder::update()).shares_scope);
        assert!(!b.add_sub_query("i", Builder::insert()).shares_scope);
    }

    #[test]
    fn test_resolve_table_falls_through_to_parent() {
        let mut parent = Builder::select();
        parent.add_table("Account", None, None);
        let child = parent.add_sub_query("child", Builder::select());
        child.add_table("Contact", None, None);
        let borrowed = child.resolve_table("Account").unwrap();
        assert_eq!(child.table(borrowed).kind(), TableKind::Detached);
        assert_eq!(child.table(borrowed).alias(), "t0");
        assert!(child.resolve_table("Invoice").is_err());
    }

    #[test]
    fn test_clean_select_list() {
        let mut b = Builder::select();
        let a = b.add_table("Account", None, None);
        let c = b.add_table("Contact", None, None);
        b.add_column(a, "Name", None);
        let dup = b.add_column(c, "Name", None);
        b.clean_select_list(false);
        assert_eq!(b.field(dup).alias(), Some("Contact_Name"));

        let mut r = Builder::select();
        let a = r.add_table("Account", None, None);
        let c = r.add_table("Contact", None, None);
        r.add_column(a, "Name", None);
        r.add_column(c, "Name", None);
        r.clean_select_list(true);
        assert!(r.table(c).fields().is_empty());
    }

    #[test]
    fn test_renamed_duplicates_avoid_existing_aliases() {
        let mut b = Builder::select();
        let a = b.add_table("Account", None, None);
        let c = b.add_table("Contact", None, None);
        b.add_column(a, "Name", None);
        b.add_column(a, "PrimaryContactName", Some("Contact_Name"));
        let dup = b.add_column(c, "Name", None);
        b.clean_select_list(false);
        assert_eq!(b.field(dup).alias(), Some("Contact_Name_2"));
    }

    #[test]
    fn test_concat_columns_name() {
        let mut b = Builder::select();
        let t = b.add_table("Contact", None, None);
        let f = b
            .concat_columns(t, "FullName", " ", &["FirstName", "LastName"])
            .unwrap();
        assert_eq!(b.field(f).name(), "FirstName + ' ' + [t0].LastName");
        assert!(b.concat_columns(t, "Empty", ",", &[]).is_none());
    }
}
