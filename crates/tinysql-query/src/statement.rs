//! INSERT, UPDATE, procedure and IF statement shaping.

use crate::builder::{Builder, StatementKind};
use crate::condition::{ConditionGroup, GroupKind};
use crate::field::{Field, FieldId, FieldKind, parameter_name};
use crate::table::{Table, TableId, TableKind};
use tinysql_core::{ColumnType, Error, LookupScope, Result, Value};

/// `OUTPUT inserted.cols INTO @parameter` of an INSERT or UPDATE.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputClause {
    pub(crate) parameter: String,
    /// The `inserted` table listing the output columns
    pub(crate) table: TableId,
}

impl OutputClause {
    pub fn parameter(&self) -> &str {
        &self.parameter
    }

    pub fn table(&self) -> TableId {
        self.table
    }
}

/// An `EXEC` call.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcedureCall {
    pub(crate) name: String,
    pub(crate) schema: Option<String>,
    pub(crate) parameters: Vec<FieldId>,
}

impl ProcedureCall {
    /// `schema.name`, or the bare name.
    pub fn full_name(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", schema, self.name),
            None => self.name.clone(),
        }
    }

    pub fn parameters(&self) -> &[FieldId] {
        &self.parameters
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    If,
    ElseIf,
    Else,
}

/// Body and branches of an IF statement.
#[derive(Debug, Clone)]
pub struct Conditional {
    pub(crate) branch: Branch,
    pub(crate) body: Option<Box<Builder>>,
    pub(crate) branches: Vec<Builder>,
}

impl Conditional {
    fn new(branch: Branch) -> Self {
        Self {
            branch,
            body: None,
            branches: Vec::new(),
        }
    }

    pub fn branch(&self) -> Branch {
        self.branch
    }

    pub fn body(&self) -> Option<&Builder> {
        self.body.as_deref()
    }

    pub fn branches(&self) -> &[Builder] {
        &self.branches
    }
}

impl Builder {
    /// Start an `EXEC schema.name` call.
    pub fn procedure(name: &str, schema: Option<&str>) -> Self {
        let mut b = Self::new(StatementKind::Procedure);
        b.procedure = Some(ProcedureCall {
            name: name.to_string(),
            schema: schema.filter(|s| !s.is_empty()).map(str::to_string),
            parameters: Vec::new(),
        });
        b
    }

    /// Start an `IF` statement. Its condition is the WHERE group.
    pub fn conditional() -> Self {
        let mut b = Self::new(StatementKind::Conditional);
        b.groups[0] = ConditionGroup::new(GroupKind::Conditional);
        b.conditional = Some(Conditional::new(Branch::If));
        b
    }

    pub fn procedure_call(&self) -> Option<&ProcedureCall> {
        self.procedure.as_ref()
    }

    pub fn conditional_parts(&self) -> Option<&Conditional> {
        self.conditional.as_ref()
    }

    pub fn output_clause(&self) -> Option<&OutputClause> {
        self.output.as_ref()
    }

    /// The base table when it has the given kind.
    fn target(&self, kind: TableKind, hint: &'static str) -> Result<TableId> {
        match self.base_table() {
            Some(id) if self.tables[id.0].kind == kind => Ok(id),
            _ => Err(Error::config(hint)),
        }
    }

    /// Set the INSERT target. A builder has one target; later calls return it.
    pub fn into_table(&mut self, name: &str, schema: Option<&str>) -> Result<TableId> {
        self.expect_kind("into_table", StatementKind::Insert)?;
        if let Ok(id) = self.target(TableKind::InsertTarget, "") {
            return Ok(id);
        }
        Ok(self.push_table(Table::new(TableKind::InsertTarget, name, None, schema)))
    }

    /// Set the UPDATE target. A builder has one target; later calls return it.
    pub fn update_table(&mut self, name: &str, schema: Option<&str>) -> Result<TableId> {
        self.expect_kind("update_table", StatementKind::Update)?;
        if let Ok(id) = self.target(TableKind::UpdateTarget, "") {
            return Ok(id);
        }
        Ok(self.push_table(Table::new(TableKind::UpdateTarget, name, None, schema)))
    }

    /// Bind a column of the target to a `@column` parameter.
    ///
    /// The parameter type comes from `declared`, then from the catalog, then
    /// from the value itself. Binding a column twice replaces the value.
    fn bind_parameter(
        &mut self,
        table: TableId,
        column: &str,
        value: Value,
        declared: Option<ColumnType>,
    ) -> FieldId {
        let meta = self
            .table_metadata(table)
            .and_then(|m| m.get_column(column).map(|c| (c.name.clone(), c.column_type)));
        let (name, column_type) = match meta {
            Some((name, ty)) => (name, declared.or(Some(ty))),
            None => (column.to_string(), declared),
        };
        let column_type = column_type.unwrap_or_else(|| ColumnType::for_value(&value));

        if let Some(existing) = self.tables[table.0]
            .fields
            .iter()
            .copied()
            .find(|f| self.fields[f.0].name.eq_ignore_ascii_case(&name))
        {
            let field = &mut self.fields[existing.0];
            field.value = Some(value);
            field.column_type = Some(column_type);
            return existing;
        }
        let kind = FieldKind::Parameter {
            parameter: parameter_name(&name),
            output: false,
        };
        let field = Field::new(kind, name, Some(table))
            .with_type(Some(column_type))
            .with_value(value);
        self.attach_field(table, field)
    }

    /// Insert `value` into `column`.
    pub fn value(&mut self, column: &str, value: impl Into<Value>) -> Result<&mut Self> {
        self.expect_kind("value", StatementKind::Insert)?;
        let table = self.target(TableKind::InsertTarget, "The INSERT statement has no target table")?;
        self.bind_parameter(table, column, value.into(), None);
        Ok(self)
    }

    pub fn value_typed(
        &mut self,
        column: &str,
        value: impl Into<Value>,
        column_type: ColumnType,
    ) -> Result<&mut Self> {
        self.expect_kind("value", StatementKind::Insert)?;
        let table = self.target(TableKind::InsertTarget, "The INSERT statement has no target table")?;
        self.bind_parameter(table, column, value.into(), Some(column_type));
        Ok(self)
    }

    /// Assign `value` to `column`.
    pub fn set(&mut self, column: &str, value: impl Into<Value>) -> Result<&mut Self> {
        self.expect_kind("set", StatementKind::Update)?;
        let table = self.target(TableKind::UpdateTarget, "The UPDATE statement has no target table")?;
        self.bind_parameter(table, column, value.into(), None);
        Ok(self)
    }

    pub fn set_typed(
        &mut self,
        column: &str,
        value: impl Into<Value>,
        column_type: ColumnType,
    ) -> Result<&mut Self> {
        self.expect_kind("set", StatementKind::Update)?;
        let table = self.target(TableKind::UpdateTarget, "The UPDATE statement has no target table")?;
        self.bind_parameter(table, column, value.into(), Some(column_type));
        Ok(self)
    }

    /// Capture affected rows into a table variable and select it afterwards.
    ///
    /// The variable defaults to `@output<Table>`. Only one output clause is
    /// kept; later calls return the existing one.
    pub fn output(&mut self, parameter: Option<&str>) -> Result<&mut Self> {
        let target = match self.kind {
            StatementKind::Insert => {
                self.target(TableKind::InsertTarget, "The INSERT statement has no target table")?
            }
            StatementKind::Update => {
                self.target(TableKind::UpdateTarget, "The UPDATE statement has no target table")?
            }
            other => {
                return Err(Error::kind_mismatch("output", "INSERT or UPDATE", other.as_str()));
            }
        };
        if self.output.is_some() {
            return Ok(self);
        }
        let parameter = match parameter {
            Some(p) => parameter_name(p),
            None => parameter_name(&format!("output{}", self.tables[target.0].name.replace('.', ""))),
        };
        let table = self.push_table(Table::new(TableKind::Parameter, "inserted", None, None));
        self.output = Some(OutputClause { parameter, table });
        Ok(self)
    }

    /// Add a column to the output clause, creating the clause if needed.
    ///
    /// The type comes from `declared` or from the catalog.
    pub fn output_column(&mut self, column: &str, declared: Option<ColumnType>) -> Result<&mut Self> {
        self.output(None)?;
        let (target, table) = match (self.base_table(), &self.output) {
            (Some(target), Some(out)) => (target, out.table),
            _ => return Err(Error::config("The statement has no output clause")),
        };
        let meta = self
            .table_metadata(target)
            .and_then(|m| m.get_column(column).map(|c| (c.name.clone(), c.column_type)));
        let (name, column_type) = match (meta, declared) {
            (Some((name, ty)), declared) => (name, declared.unwrap_or(ty)),
            (None, Some(ty)) => (column.to_string(), ty),
            (None, None) => {
                let target_name = self.tables[target.0].full_name();
                return Err(Error::unknown_column(Some(&target_name), column, LookupScope::Catalog));
            }
        };
        if self.find_field(table, &name).is_none() {
            let field = Field::new(FieldKind::Column, name, Some(table)).with_type(Some(column_type));
            self.attach_field(table, field);
        }
        Ok(self)
    }

    /// Output the target's primary key columns.
    pub fn output_primary_key(&mut self) -> Result<&mut Self> {
        self.output(None)?;
        let target = self
            .base_table()
            .ok_or_else(|| Error::config("The statement has no target table"))?;
        let Some(meta) = self.table_metadata(target) else {
            return Err(Error::config(format!(
                "Metadata for the table {} could not be loaded",
                self.tables[target.0].full_name()
            )));
        };
        for column in meta.primary_key_columns() {
            self.output_column(&column.name, Some(column.column_type))?;
        }
        Ok(self)
    }

    fn push_procedure_parameter(&mut self, field: Field) -> Result<&mut Self> {
        self.expect_kind("parameter", StatementKind::Procedure)?;
        let id = self.push_field(field);
        if let Some(call) = &mut self.procedure {
            call.parameters.push(id);
        }
        Ok(self)
    }

    /// Pass `value` as `@name`.
    pub fn parameter(
        &mut self,
        name: &str,
        value: impl Into<Value>,
        declared: Option<ColumnType>,
    ) -> Result<&mut Self> {
        let value = value.into();
        let column_type = declared.unwrap_or_else(|| ColumnType::for_value(&value));
        let kind = FieldKind::Parameter {
            parameter: parameter_name(name),
            output: false,
        };
        let field = Field::new(kind, name.trim_start_matches('@'), None)
            .with_type(Some(column_type))
            .with_value(value);
        self.push_procedure_parameter(field)
    }

    /// Pass `@name OUT`; its value is selected after the call.
    pub fn output_parameter(&mut self, name: &str, declared: ColumnType) -> Result<&mut Self> {
        let kind = FieldKind::Parameter {
            parameter: parameter_name(name),
            output: true,
        };
        let field = Field::new(kind, name.trim_start_matches('@'), None).with_type(Some(declared));
        self.push_procedure_parameter(field)
    }

    /// Pass `value` as `@name`, typed like `table.column` in the catalog.
    pub fn parameter_from_column(
        &mut self,
        name: &str,
        table: &str,
        column: &str,
        value: impl Into<Value>,
    ) -> Result<&mut Self> {
        let metadata = self
            .metadata
            .clone()
            .ok_or_else(|| Error::config("No metadata has been attached to the builder"))?;
        let meta = metadata
            .find_table_in(table, &self.config.default_schema)
            .ok_or_else(|| Error::unknown_table(table, LookupScope::Catalog))?;
        let column_type = meta
            .get_column(column)
            .map(|c| c.column_type)
            .ok_or_else(|| Error::unknown_column(Some(table), column, LookupScope::Catalog))?;
        self.parameter(name, value, Some(column_type))
    }

    /// Set the statement run when the condition holds, and return it.
    ///
    /// The body shares this statement's parameter declarations. Calling
    /// `begin` again with the same kind returns the existing body; a
    /// different kind fails with `StatementKindMismatch`.
    pub fn begin(&mut self, kind: StatementKind) -> Result<&mut Builder> {
        self.expect_kind("begin", StatementKind::Conditional)?;
        if kind == StatementKind::Procedure {
            return Err(Error::config(
                "A procedure call cannot be opened as an IF body; build it with Builder::procedure",
            ));
        }
        let existing = self
            .conditional
            .as_ref()
            .and_then(|c| c.body.as_ref())
            .map(|body| body.kind);
        if let Some(existing) = existing {
            if existing != kind {
                return Err(Error::kind_mismatch("begin", existing.as_str(), kind.as_str()));
            }
        }
        let mut body = if kind == StatementKind::Conditional {
            let mut nested = Builder::conditional();
            nested.config = self.config.clone();
            nested.metadata = self.metadata.clone();
            nested
        } else {
            self.child(kind)
        };
        body.shares_scope = true;
        body.adopt(self.scope_tables());
        let conditional = self
            .conditional
            .as_mut()
            .ok_or_else(|| Error::config("The IF statement has no branch data"))?;
        Ok(conditional.body.get_or_insert_with(|| Box::new(body)).as_mut())
    }

    fn push_branch(&mut self, branch: Branch, operation: &'static str) -> Result<&mut Builder> {
        self.expect_kind(operation, StatementKind::Conditional)?;
        let mut next = Builder::conditional();
        next.config = self.config.clone();
        next.metadata = self.metadata.clone();
        next.shares_scope = true;
        next.adopt(self.scope_tables());
        if let Some(c) = &mut next.conditional {
            c.branch = branch;
        }
        let conditional = self
            .conditional
            .as_mut()
            .ok_or_else(|| Error::config("The IF statement has no branch data"))?;
        if conditional.branch == Branch::Else {
            return Err(Error::config("An ELSE branch cannot have further branches"));
        }
        conditional.branches.push(next);
        let index = conditional.branches.len() - 1;
        Ok(&mut conditional.branches[index])
    }

    /// Add an `ELSE IF` branch and return it. Its condition is its WHERE
    /// group; its statement is opened with [`Builder::begin`].
    pub fn else_if(&mut self) -> Result<&mut Builder> {
        self.push_branch(Branch::ElseIf, "else_if")
    }

    /// Add an `ELSE` branch and return it.
    pub fn else_branch(&mut self) -> Result<&mut Builder> {
        self.push_branch(Branch::Else, "else_branch")
    }
}
