//! Correlated sub-selects.
//!
//! A sub-select materializes the parent rows into a temp table, selects the
//! child rows whose link column appears in that temp table into a second temp
//! table, and outputs both ordered by their link columns. The assembler later
//! distributes the child rows over the parents using the recorded link.

use crate::builder::{Builder, StatementKind, SubQueryLink};
use crate::clause::OrderDirection;
use crate::condition::Operator;
use crate::resolve::{count_kind, relationship_error};
use crate::table::TableId;
use tinysql_core::{Error, LookupScope, MetadataForeignKey, Result};

/// Parameters of [`Builder::sub_select`].
#[derive(Debug, Clone, Copy)]
pub struct SubSelect<'a> {
    table: &'a str,
    from_column: &'a str,
    to_column: &'a str,
    schema: Option<&'a str>,
    alias: Option<&'a str>,
    name: Option<&'a str>,
}

impl<'a> SubSelect<'a> {
    /// Select rows of `table` whose `to_column` equals the parent's
    /// `from_column`.
    pub fn new(table: &'a str, from_column: &'a str, to_column: &'a str) -> Self {
        Self {
            table,
            from_column,
            to_column,
            schema: None,
            alias: None,
            name: None,
        }
    }

    pub fn schema(mut self, schema: &'a str) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn alias(mut self, alias: &'a str) -> Self {
        self.alias = Some(alias);
        self
    }

    /// Name the child rows are attached under.
    pub fn name(mut self, name: &'a str) -> Self {
        self.name = Some(name);
        self
    }

    fn key(&self, parent_alias: &str) -> String {
        let target = match (self.alias, self.schema) {
            (Some(alias), _) => alias.to_string(),
            (None, Some(schema)) => format!("{}.{}", schema, self.table),
            (None, None) => self.table.to_string(),
        };
        format!("{}.{}:{}.{}", parent_alias, self.from_column, target, self.to_column)
    }
}

fn temp_name(table: &str) -> String {
    table
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}

impl Builder {
    /// Register a correlated sub-select of `parent` and return the child
    /// builder, ready for more columns and conditions.
    ///
    /// Calling it again with the same parent, table and columns returns the
    /// existing child.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn sub_select(&mut self, parent: TableId, spec: SubSelect<'_>) -> Result<&mut Builder> {
        self.expect_kind("sub_select", StatementKind::Select)?;
        let key = spec.key(&self.tables[parent.0].alias());
        if let Some(i) = self.sub_queries.iter().position(|(k, _)| *k == key) {
            return Ok(&mut self.sub_queries[i].1);
        }

        let parent_temp = match self.select_into {
            Some(id) => id,
            None => {
                let name = format!("tmp_{}", temp_name(&self.tables[parent.0].name));
                self.select_into(&name, true)?
            }
        };
        if !self.has_wildcard(parent) && self.find_field(parent, spec.from_column).is_none() {
            self.add_column(parent, spec.from_column, None);
        }
        self.order_by(parent_temp, spec.from_column, OrderDirection::Asc)?;
        let parent_temp_name = self.tables[parent_temp.0].name.clone();

        let mut child = self.child(StatementKind::Select);
        let table = child.add_table(spec.table, spec.alias, spec.schema);
        child.add_column(table, spec.to_column, None);
        let child_temp = child.select_into(
            &format!("{}_{}", parent_temp_name, self.sub_queries.len() + 1),
            true,
        )?;
        let exists = child.where_exists(&format!("#{}", parent_temp_name), None)?;
        child.exists_and_field(exists, spec.from_column, Operator::Equal, spec.to_column)?;
        child.order_by(child_temp, spec.to_column, OrderDirection::Asc)?;
        child.name = spec.name.map(str::to_string);
        child.link = Some(SubQueryLink {
            parent_column: spec.from_column.to_string(),
            child_column: spec.to_column.to_string(),
        });

        tracing::debug!(key = %key, "registered sub-select");
        Ok(self.add_sub_query(key, child))
    }

    /// Sub-select the rows of `table` that reference `parent` through its
    /// single foreign key to it.
    pub fn sub_select_related(&mut self, parent: TableId, table: &str) -> Result<&mut Builder> {
        let metadata = self.require_metadata()?;
        let source = self.table_metadata(parent).ok_or_else(|| {
            Error::config(format!(
                "Metadata for the table {} could not be found",
                self.tables[parent.0].full_name()
            ))
        })?;
        let target = metadata
            .find_table_in(table, &self.config.default_schema)
            .cloned()
            .ok_or_else(|| Error::unknown_table(table, LookupScope::Catalog))?;

        let keys: Vec<&MetadataForeignKey> = target
            .foreign_keys
            .iter()
            .filter(|fk| {
                fk.referenced_table.eq_ignore_ascii_case(&source.name)
                    && fk.referenced_schema.eq_ignore_ascii_case(&source.schema)
            })
            .collect();
        if keys.len() != 1 {
            return Err(relationship_error(
                count_kind(keys.len()),
                &source,
                source.primary_key.first().map_or("", String::as_str),
                Some(target.full_name()),
                keys.len(),
                format!(
                    "Extended one relationship to the table {}. Found {}.",
                    target.full_name(),
                    keys.len()
                ),
            ));
        }
        let from_column = source
            .primary_key
            .first()
            .cloned()
            .ok_or_else(|| Error::config(format!("The table {} has no primary key", source.full_name())))?;
        let to_column = keys[0]
            .references
            .first()
            .map(|r| r.column.clone())
            .ok_or_else(|| Error::config(format!("The foreign key {} has no columns", keys[0].name)))?;

        let mut spec = SubSelect::new(&target.name, &from_column, &to_column);
        if !target.schema.is_empty() && !self.config.is_default_schema(&target.schema) {
            spec = spec.schema(&target.schema);
        }
        self.sub_select(parent, spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tinysql_core::{MetadataColumn, MetadataDatabase, MetadataTable, SqlType};

    fn catalog() -> Arc<MetadataDatabase> {
        let account = MetadataTable::new("dbo", "Account")
            .column(MetadataColumn::new("AccountID", SqlType::Int))
            .column(MetadataColumn::new("Name", SqlType::NVarChar))
            .primary_key(["AccountID"]);
        let contact = MetadataTable::new("dbo", "Contact")
            .column(MetadataColumn::new("ContactID", SqlType::Int))
            .column(MetadataColumn::new("ParentCustomerID", SqlType::Int))
            .primary_key(["ContactID"])
            .foreign_key(
                MetadataForeignKey::new("FK_Contact_Account", "dbo", "Account")
                    .reference("ParentCustomerID", "AccountID"),
            );
        Arc::new(MetadataDatabase::new("crm").with_table(account).with_table(contact))
    }

    fn account() -> (Builder, TableId) {
        let mut b = Builder::select();
        let t = b.add_table("Account", None, None);
        b.add_columns(t, &["AccountID", "Name"]);
        (b, t)
    }

    #[test]
    fn test_sub_select_sql() {
        let (mut b, t) = account();
        let child = b
            .sub_select(t, SubSelect::new("Contact", "AccountID", "ParentCustomerID"))
            .unwrap();
        let base = child.base_table().unwrap();
        child.add_column(base, "ContactID", None);

        assert_eq!(
            b.compile().unwrap(),
            concat!(
                "SELECT    t0.AccountID, t0.Name\r\n",
                "  INTO  #tmp_Account\r\n",
                "  FROM  Account t0\r\n",
                "SELECT  #tmp_Account.* FROM #tmp_Account\r\n",
                " ORDER  BY #tmp_Account.[AccountID] ASC\r\n",
                "\r\n-- Sub Query\r\n",
                "SELECT    t0.ParentCustomerID, t0.ContactID\r\n",
                "  INTO  #tmp_Account_1\r\n",
                "  FROM  Contact t0\r\n",
                "WHERE (EXISTS(SELECT 1 FROM #tmp_Account WHERE (#tmp_Account.[AccountID] = t0.[ParentCustomerID])))\r\n",
                "SELECT  #tmp_Account_1.* FROM #tmp_Account_1\r\n",
                " ORDER  BY #tmp_Account_1.[ParentCustomerID] ASC\r\n",
                "\r\n\r\n\r\n",
            )
        );
    }

    #[test]
    fn test_same_key_reuses_child() {
        let (mut b, t) = account();
        b.sub_select(t, SubSelect::new("Contact", "AccountID", "ParentCustomerID"))
            .unwrap();
        b.sub_select(t, SubSelect::new("Contact", "AccountID", "ParentCustomerID"))
            .unwrap();
        assert_eq!(b.sub_queries().count(), 1);
        let (key, child) = b.sub_queries().next().unwrap();
        assert_eq!(key, "t0.AccountID:Contact.ParentCustomerID");
        assert_eq!(
            child.link(),
            Some(&SubQueryLink {
                parent_column: "AccountID".to_string(),
                child_column: "ParentCustomerID".to_string(),
            })
        );
    }

    #[test]
    fn test_missing_link_column_is_selected() {
        let mut b = Builder::select();
        let t = b.add_table("Account", None, None);
        b.add_column(t, "Name", None);
        b.sub_select(t, SubSelect::new("Contact", "AccountID", "ParentCustomerID").name("Contacts"))
            .unwrap();
        let names: Vec<&str> = b.table(t).fields().iter().map(|f| b.field(*f).name()).collect();
        assert_eq!(names, ["Name", "AccountID"]);
        assert_eq!(b.sub_queries().next().and_then(|(_, c)| c.name()), Some("Contacts"));
    }

    #[test]
    fn test_second_sub_select_gets_next_temp_table() {
        let (mut b, t) = account();
        b.sub_select(t, SubSelect::new("Contact", "AccountID", "ParentCustomerID"))
            .unwrap();
        b.sub_select(t, SubSelect::new("Lead", "AccountID", "AccountID"))
            .unwrap();
        let sql = b.compile().unwrap();
        assert!(sql.contains("  INTO  #tmp_Account_2\r\n"));
    }

    #[test]
    fn test_sub_select_related_infers_columns() {
        let mut b = Builder::select().with_metadata(catalog());
        let t = b.add_table("Account", None, None);
        b.add_column(t, "Name", None);
        b.sub_select_related(t, "Contact").unwrap();
        let (key, _) = b.sub_queries().next().unwrap();
        assert_eq!(key, "t0.AccountID:Contact.ParentCustomerID");
    }

    #[test]
    fn test_sub_select_related_without_key_fails() {
        let mut b = Builder::select().with_metadata(catalog());
        let t = b.add_table("Contact", None, None);
        let err = b.sub_select_related(t, "Account").unwrap_err();
        assert!(err.is_relationship_error());
        assert!(err.to_string().contains("Extended one relationship to the table dbo.Account. Found 0."));
    }
}
