//! ORDER BY clause.

use crate::builder::Builder;
use crate::field::{Field, FieldId, FieldKind};
use crate::table::{TableId, TableKind};
use tinysql_core::{Error, LookupScope, Result};

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OrderDirection {
    #[default]
    Asc,
    Desc,
}

impl OrderDirection {
    pub const fn as_str(self) -> &'static str {
        match self {
            OrderDirection::Asc => "ASC",
            OrderDirection::Desc => "DESC",
        }
    }
}

/// One ORDER BY entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderBy {
    pub(crate) field: FieldId,
    pub(crate) direction: OrderDirection,
}

impl OrderBy {
    pub fn field(&self) -> FieldId {
        self.field
    }

    pub fn direction(&self) -> OrderDirection {
        self.direction
    }
}

impl Builder {
    /// Order by a column of `table`.
    ///
    /// The column must be in the table's select list unless the table
    /// selects `*`. Ordering a temp table orders its output select instead of
    /// the statement, and ignores a column that is already ordered.
    pub fn order_by(
        &mut self,
        table: TableId,
        column: &str,
        direction: OrderDirection,
    ) -> Result<&mut Self> {
        let field = match self.find_field(table, column) {
            Some(field) => field,
            None if self.has_wildcard(table) => {
                let canonical = self
                    .table_metadata(table)
                    .and_then(|meta| meta.get_column(column).map(|c| c.name.clone()))
                    .unwrap_or_else(|| column.to_string());
                self.push_field(Field::new(FieldKind::Column, canonical, Some(table)))
            }
            None => {
                let name = self.tables[table.0].name.clone();
                return Err(Error::unknown_column(
                    Some(&name),
                    column,
                    LookupScope::QueryModel,
                ));
            }
        };
        let entry = OrderBy { field, direction };

        if self.tables[table.0].kind == TableKind::Temp {
            let reference = self.field_reference(field);
            let present = self.tables[table.0]
                .order_by
                .iter()
                .any(|o| self.field_reference(o.field) == reference);
            if !present {
                self.tables[table.0].order_by.push(entry);
            }
        } else {
            self.order_by.push(entry);
        }
        Ok(self)
    }

    pub fn order_by_entries(&self) -> &[OrderBy] {
        &self.order_by
    }

    /// `alias.[name] ASC|DESC`
    pub(crate) fn render_order_by(&self, entry: &OrderBy) -> String {
        format!(
            "{} {}",
            self.field_declaration(entry.field),
            entry.direction.as_str()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_by_renders_declaration() {
        let mut b = Builder::select();
        let t = b.add_table("Account", None, None);
        b.add_column(t, "Name", None);
        b.order_by(t, "Name", OrderDirection::Desc).unwrap();
        let entry = b.order_by_entries()[0];
        assert_eq!(b.render_order_by(&entry), "t0.[Name] DESC");
    }

    #[test]
    fn test_order_by_unknown_column_fails() {
        let mut b = Builder::select();
        let t = b.add_table("Account", None, None);
        b.add_column(t, "Name", None);
        let err = b.order_by(t, "Missing", OrderDirection::Asc).unwrap_err();
        assert!(matches!(err, Error::UnknownColumn(_)));
        assert_eq!(err.column(), Some("Missing"));
    }

    #[test]
    fn test_order_by_wildcard_table_accepts_any_column() {
        let mut b = Builder::select();
        let t = b.add_table("Account", None, None);
        b.all_columns(t, true).unwrap();
        b.order_by(t, "CreatedOn", OrderDirection::Asc).unwrap();
        let entry = b.order_by_entries()[0];
        assert_eq!(b.render_order_by(&entry), "t0.[CreatedOn] ASC");
    }

    #[test]
    fn test_temp_table_order_by_skips_duplicates() {
        let mut b = Builder::select();
        let t = b.add_table("Account", None, None);
        b.add_column(t, "AccountID", None);
        let temp = b.select_into("tmp_Account", true).unwrap();
        b.order_by(temp, "AccountID", OrderDirection::Asc).unwrap();
        b.order_by(temp, "AccountID", OrderDirection::Asc).unwrap();
        assert_eq!(b.table(temp).order_by.len(), 1);
        assert!(b.order_by_entries().is_empty());
    }
}
