//! Statements driven by catalog metadata and assembled rows.
//!
//! These helpers build common statements without spelling out columns: an
//! UPDATE from the pending changes of a [`RowData`], a list query from a
//! table's list definition, and a lookup query listing the rows a foreign key
//! column may point to.

use std::sync::Arc;

use crate::builder::{Builder, StatementKind};
use crate::condition::{Link, Operator};
use crate::resolve::{literal_segment, relationship_error};
use tinysql_core::{
    Error, LookupScope, MetadataColumn, MetadataDatabase, MetadataTable, RelationshipErrorKind,
    Result, RowData, column_key,
};

/// Options for [`Builder::update_from_row`].
#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateOptions<'a> {
    /// Assign only the row's pending changes instead of every writable column.
    pub only_changes: bool,
    /// Output the primary key of the updated row.
    pub output_primary_key: bool,
    /// Further columns to output.
    pub output_columns: &'a [&'a str],
}

/// Catalog column for a row key, which has spaces replaced by `_`.
fn row_column<'a>(table: &'a MetadataTable, key: &str) -> Option<&'a MetadataColumn> {
    table
        .get_column(key)
        .or_else(|| table.columns.iter().find(|c| column_key(&c.name).eq_ignore_ascii_case(key)))
}

fn row_table(row: &RowData) -> Result<&Arc<MetadataTable>> {
    row.table()
        .ok_or_else(|| Error::config("The row is not linked to a metadata table"))
}

impl Builder {
    /// Schema argument for a catalog table: `None` for the default schema.
    fn catalog_schema<'a>(&self, table: &'a MetadataTable) -> Option<&'a str> {
        if table.schema.is_empty() || self.config.is_default_schema(&table.schema) {
            None
        } else {
            Some(table.schema.as_str())
        }
    }

    /// UPDATE statement writing `row` back to its table.
    ///
    /// Returns `None` when only changes are requested and the row has none.
    /// Read-only columns are skipped when every column is written; a pending
    /// change to a read-only or unknown column is an error.
    #[tracing::instrument(level = "debug", skip(row, options))]
    pub fn update_from_row(row: &RowData, options: &UpdateOptions<'_>) -> Result<Option<Builder>> {
        if options.only_changes && !row.has_changes() {
            return Ok(None);
        }
        let meta = Arc::clone(row_table(row)?);
        let mut builder = Builder::update();
        let schema = builder.catalog_schema(&meta);
        builder.update_table(&meta.name, schema)?;

        if options.only_changes {
            for (key, value) in row.changes() {
                let column = row_column(&meta, key)
                    .filter(|c| !c.read_only())
                    .ok_or_else(|| {
                        Error::config(format!("Cannot update the changed column {} in {}", key, meta.full_name()))
                    })?;
                builder.set_typed(&column.name, value.clone(), column.column_type)?;
            }
        } else {
            for (key, value) in row.iter() {
                if let Some(column) = row_column(&meta, key).filter(|c| !c.read_only()) {
                    builder.set_typed(&column.name, value.clone(), column.column_type)?;
                }
            }
        }

        if options.output_primary_key {
            for column in meta.primary_key_columns() {
                builder.output_column(&column.name, Some(column.column_type))?;
            }
        }
        builder.output_row_columns(&meta, options.output_columns)?;
        builder.where_primary_key(row)?;
        Ok(Some(builder))
    }

    /// Add an UPDATE of `row`'s pending changes to this UPDATE builder.
    ///
    /// A row without changes leaves the builder untouched.
    pub fn update_row(&mut self, row: &RowData, output: &[&str]) -> Result<&mut Self> {
        self.expect_kind("update_row", StatementKind::Update)?;
        if !row.has_changes() {
            return Ok(self);
        }
        let meta = Arc::clone(row_table(row)?);
        let schema = self.catalog_schema(&meta);
        self.update_table(&meta.name, schema)?;
        for (key, value) in row.changes() {
            let column = row_column(&meta, key).ok_or_else(|| {
                Error::unknown_column(Some(&meta.full_name()), key, LookupScope::Catalog)
            })?;
            self.set_typed(&column.name, value.clone(), column.column_type)?;
        }
        self.output_row_columns(&meta, output)?;
        self.where_primary_key(row)?;
        Ok(self)
    }

    fn output_row_columns(&mut self, meta: &MetadataTable, columns: &[&str]) -> Result<()> {
        for &name in columns {
            let column = row_column(meta, name).ok_or_else(|| {
                Error::unknown_column(Some(&meta.full_name()), name, LookupScope::Catalog)
            })?;
            self.output_column(&column.name, Some(column.column_type))?;
        }
        Ok(())
    }

    /// Restrict the base table to the row's primary key.
    ///
    /// The conditions are ANDed onto the existing WHERE root and compare the
    /// values the row was loaded with, so a pending change to a key column
    /// still addresses the stored row.
    pub fn where_primary_key(&mut self, row: &RowData) -> Result<&mut Self> {
        let meta = Arc::clone(row_table(row)?);
        if meta.primary_key.is_empty() {
            return Err(Error::config(format!("The table {} has no primary key", meta.full_name())));
        }
        let table = self
            .base_table()
            .ok_or_else(|| Error::config("The statement has no table to filter"))?;
        let key = self.tables[table.0].alias();
        for column in &meta.primary_key {
            let value = row.original(column).cloned().ok_or_else(|| {
                Error::unknown_column(Some(&meta.full_name()), column, LookupScope::Row)
            })?;
            self.add_condition(self.root(), Link::And, &key, column, Operator::Equal, value)?;
        }
        Ok(self)
    }

    /// SELECT of the primary key and the columns of the list definition
    /// `list`, auto-joining every foreign key column in the list.
    ///
    /// Without a definition of that name, every column that is neither part
    /// of the primary key nor a rowguid is listed.
    #[tracing::instrument(level = "debug", skip(metadata))]
    pub fn list_query(metadata: Arc<MetadataDatabase>, table: &str, list: &str) -> Result<Builder> {
        let mut builder = Builder::select().with_metadata(metadata);
        let meta = builder.catalog_table(table)?;

        let listed: Vec<&MetadataColumn> = match meta.list_definitions.get(list) {
            Some(definition) => meta
                .columns
                .iter()
                .filter(|c| definition.iter().any(|d| d.eq_ignore_ascii_case(&c.name)))
                .collect(),
            None => {
                tracing::debug!(table = %meta.full_name(), list, "no list definition, listing all columns");
                meta.columns
                    .iter()
                    .filter(|c| !c.is_row_guid && !meta.is_primary_key(&c.name))
                    .collect()
            }
        };

        let schema = builder.catalog_schema(&meta);
        let base = builder.add_table(&meta.name, None, schema);
        for column in listed.iter().filter(|c| meta.is_foreign_key(&c.name)) {
            builder.auto_join(base, &column.name)?;
        }
        for column in meta.primary_key.iter().chain(listed.iter().map(|c| &c.name)) {
            if builder.find_field(base, column).is_none() {
                builder.add_column(base, column, None);
            }
        }
        Ok(builder)
    }

    /// [`Builder::list_query`] for the table of `row`, restricted to its
    /// primary key.
    pub fn select_for_row(metadata: Arc<MetadataDatabase>, row: &RowData, list: &str) -> Result<Builder> {
        let table = row_table(row)?.full_name();
        let mut builder = Self::list_query(metadata, &table, list)?;
        builder.where_primary_key(row)?;
        Ok(builder)
    }

    /// SELECT of the candidate rows for the foreign key column `column` of
    /// `table`: the referenced table's title column and referenced columns.
    ///
    /// Literal segments of the key become WHERE filters.
    #[tracing::instrument(level = "debug", skip(metadata))]
    pub fn lookup_query(metadata: Arc<MetadataDatabase>, table: &str, column: &str) -> Result<Builder> {
        let mut builder = Builder::select().with_metadata(Arc::clone(&metadata));
        let source = builder.catalog_table(table)?;
        let keys: Vec<_> = source.find_foreign_keys(column, None).collect();
        let key = match keys.as_slice() {
            [key] => *key,
            [] => {
                return Err(relationship_error(
                    RelationshipErrorKind::NotAKey,
                    &source,
                    column,
                    None,
                    0,
                    format!("The column {} in the table {} is not a foreign key", column, source.full_name()),
                ));
            }
            _ => {
                return Err(relationship_error(
                    RelationshipErrorKind::MultipleCandidates,
                    &source,
                    column,
                    None,
                    keys.len(),
                    format!("The Field {} points to more than one table", column),
                ));
            }
        };

        let target = builder.catalog_table(&key.referenced_full_name())?;
        let title = target.guess_title_column().map(str::to_string).ok_or_else(|| {
            Error::config(format!("The table {} has no title column or primary key", target.full_name()))
        })?;

        let schema = builder.catalog_schema(&target);
        let base = builder.add_table(&target.name, None, schema);
        builder.add_column(base, &title, None);
        for reference in key.references.iter().filter(|r| r.literal().is_none()) {
            if builder.find_field(base, &reference.referenced_column).is_none() {
                builder.add_column(base, &reference.referenced_column, None);
            }
        }
        let alias = builder.tables[base.0].alias();
        for reference in &key.references {
            if let Some(literal) = reference.literal() {
                builder.add_condition(
                    builder.root(),
                    Link::And,
                    &alias,
                    &reference.referenced_column,
                    Operator::Equal,
                    literal_segment(literal),
                )?;
            }
        }
        Ok(builder)
    }

    fn catalog_table(&self, name: &str) -> Result<Arc<MetadataTable>> {
        self.require_metadata()?
            .find_table_in(name, &self.config.default_schema)
            .cloned()
            .ok_or_else(|| Error::unknown_table(name, LookupScope::Catalog))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use tinysql_core::{ColumnType, MetadataForeignKey, SqlType, Value};

    fn catalog() -> Arc<MetadataDatabase> {
        let account = MetadataTable::new("dbo", "Account")
            .column(MetadataColumn::new("AccountID", SqlType::Int).identity())
            .column(MetadataColumn::new("Name", ColumnType::new(SqlType::NVarChar).with_length(160)))
            .column(MetadataColumn::new("Revenue", ColumnType::new(SqlType::Decimal).with_precision(18, 2)).nullable())
            .column(MetadataColumn::new("OwningUserID", SqlType::Int))
            .column(MetadataColumn::new("StatusCode", SqlType::Int).nullable())
            .column(MetadataColumn::new("FullText", SqlType::NVarChar).computed())
            .primary_key(["AccountID"])
            .foreign_key(
                MetadataForeignKey::new("FK_Account_Owner", "dbo", "SystemUser")
                    .reference("OwningUserID", "SystemUserID"),
            )
            .foreign_key(
                MetadataForeignKey::new("FK_Account_Status", "dbo", "StringMap")
                    .reference("StatusCode", "Value")
                    .reference("\"1\"", "ObjectTypeCode")
                    .reference("\"statuscode\"", "AttributeName"),
            )
            .list_definition("Short", ["Name", "OwningUserID"]);
        let user = MetadataTable::new("dbo", "SystemUser")
            .column(MetadataColumn::new("SystemUserID", SqlType::Int))
            .column(MetadataColumn::new("FullName", SqlType::NVarChar))
            .primary_key(["SystemUserID"]);
        let map = MetadataTable::new("dbo", "StringMap")
            .column(MetadataColumn::new("Value", SqlType::Int))
            .column(MetadataColumn::new("ObjectTypeCode", SqlType::Int))
            .column(MetadataColumn::new("AttributeName", SqlType::NVarChar))
            .primary_key(["Value"]);
        Arc::new(
            MetadataDatabase::new("crm")
                .with_table(account)
                .with_table(user)
                .with_table(map),
        )
    }

    fn account_row() -> RowData {
        let db = catalog();
        let meta = Arc::clone(db.find_table("Account").unwrap());
        let mut row = RowData::for_table(meta);
        row.load("AccountID", Value::Int(526));
        row.load("Name", Value::from("Contoso"));
        row.load("Revenue", Value::Null);
        row.load("OwningUserID", Value::Int(3));
        row.load("FullText", Value::from("Contoso 526"));
        row
    }

    #[test]
    fn test_update_only_changes_with_key_output() {
        let mut row = account_row();
        row.set("Name", "Fabrikam");
        row.set("Revenue", Decimal::new(1050, 2));
        let options = UpdateOptions {
            only_changes: true,
            output_primary_key: true,
            ..UpdateOptions::default()
        };
        let builder = Builder::update_from_row(&row, &options).unwrap().unwrap();
        let sql = builder.compile().unwrap();

        assert!(sql.contains("DECLARE @Name NVarChar(160)\r\n"));
        assert!(sql.contains("DECLARE @outputAccount TABLE(AccountID Int)\r\n"));
        assert!(sql.contains("   SET  Name = @Name, Revenue = @Revenue\r\n"));
        assert!(sql.contains("OUTPUT  inserted.AccountID INTO @outputAccount \r\n"));
        assert!(sql.contains("WHERE (Account.[AccountID] = 526)\r\n"));
        assert!(sql.contains("SELECT  * FROM @outputAccount\r\n"));
    }

    #[test]
    fn test_update_without_output_has_no_trailing_select() {
        let mut row = account_row();
        row.set("Name", "Fabrikam");
        let options = UpdateOptions {
            only_changes: true,
            ..UpdateOptions::default()
        };
        let sql = Builder::update_from_row(&row, &options)
            .unwrap()
            .unwrap()
            .compile()
            .unwrap();
        assert!(!sql.contains("OUTPUT"));
        assert!(!sql.contains("SELECT"));
    }

    #[test]
    fn test_update_only_changes_without_changes() {
        let options = UpdateOptions {
            only_changes: true,
            ..UpdateOptions::default()
        };
        assert!(Builder::update_from_row(&account_row(), &options).unwrap().is_none());
    }

    #[test]
    fn test_update_all_columns_skips_read_only() {
        let builder = Builder::update_from_row(&account_row(), &UpdateOptions::default())
            .unwrap()
            .unwrap();
        let sql = builder.compile().unwrap();
        assert!(sql.contains("   SET  Name = @Name, Revenue = @Revenue, OwningUserID = @OwningUserID\r\n"));
        assert!(!sql.contains("@FullText"));
        assert!(!sql.contains("@AccountID"));
    }

    #[test]
    fn test_update_of_read_only_change_fails() {
        let mut row = account_row();
        row.set("FullText", "edited");
        let options = UpdateOptions {
            only_changes: true,
            ..UpdateOptions::default()
        };
        let err = Builder::update_from_row(&row, &options).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_update_row_on_existing_builder() {
        let mut b = Builder::update();
        b.update_row(&account_row(), &[]).unwrap();
        assert!(b.base_table().is_none());

        let mut row = account_row();
        row.set("OwningUserID", 4);
        b.update_row(&row, &["Name"]).unwrap();
        let sql = b.compile().unwrap();
        assert!(sql.contains("   SET  OwningUserID = @OwningUserID\r\n"));
        assert!(sql.contains("OUTPUT  inserted.Name INTO @outputAccount"));

        assert!(Builder::select().update_row(&row, &[]).is_err());
    }

    #[test]
    fn test_where_primary_key_uses_loaded_values() {
        let mut row = account_row();
        row.set("AccountID", 999);
        let mut b = Builder::select();
        let t = b.add_table("Account", None, None);
        b.add_column(t, "Name", None);
        b.where_("Account", "StatusCode", Operator::Equal, 1).unwrap();
        b.where_primary_key(&row).unwrap();
        assert!(
            b.compile()
                .unwrap()
                .contains("WHERE (t0.[StatusCode] = 1 AND t0.[AccountID] = 526)\r\n")
        );
    }

    #[test]
    fn test_where_primary_key_needs_a_table() {
        assert!(Builder::select().where_primary_key(&account_row()).is_err());
        assert!(Builder::select().where_primary_key(&RowData::new()).is_err());
    }

    #[test]
    fn test_list_query_from_definition() {
        let b = Builder::list_query(catalog(), "Account", "Short").unwrap();
        let sql = b.compile().unwrap();
        assert!(sql.starts_with("SELECT    t0.AccountID, t0.Name, t0.OwningUserID\r\n"));
        assert!(sql.contains("INNER JOIN SystemUser t1 ON (t0.[OwningUserID] = t1.[SystemUserID])"));
    }

    #[test]
    fn test_list_query_without_definition() {
        let b = Builder::list_query(catalog(), "Account", "Missing").unwrap();
        let sql = b.compile().unwrap();
        assert!(sql.starts_with("SELECT    t0.AccountID, t0.Name, t0.Revenue, t0.OwningUserID, t0.StatusCode, t0.FullText\r\n"));
        assert!(sql.contains("LEFT OUTER JOIN StringMap"));
    }

    #[test]
    fn test_select_for_row() {
        let b = Builder::select_for_row(catalog(), &account_row(), "Short").unwrap();
        assert!(b.compile().unwrap().contains("WHERE (t0.[AccountID] = 526)"));
    }

    #[test]
    fn test_lookup_query_applies_literal_segments() {
        let b = Builder::lookup_query(catalog(), "Account", "StatusCode").unwrap();
        assert_eq!(
            b.compile().unwrap(),
            concat!(
                "SELECT    t0.AttributeName, t0.Value\r\n",
                "  FROM  StringMap t0\r\n",
                "WHERE (t0.[ObjectTypeCode] = 1 AND t0.[AttributeName] = N'statuscode')\r\n",
                "\r\n",
            )
        );
    }

    #[test]
    fn test_lookup_query_title_fallback_and_errors() {
        let b = Builder::lookup_query(catalog(), "Account", "OwningUserID").unwrap();
        assert!(b.compile().unwrap().starts_with("SELECT    t0.FullName, t0.SystemUserID\r\n"));

        let err = Builder::lookup_query(catalog(), "Account", "Name").unwrap_err();
        assert!(err.is_relationship_error());
        let err = Builder::lookup_query(catalog(), "Nope", "Name").unwrap_err();
        assert!(matches!(err, Error::UnknownTable(_)));
    }
}
