//! T-SQL compiler.
//!
//! Compilation is a pure walk over the model: the same builder always
//! produces byte-identical text. Lines end in `\r\n`. Parameter declarations
//! are hoisted to the top builder of a scope and written once each, in the
//! order they were first declared.

use std::fmt::Display;

use crate::builder::{Builder, StatementKind};
use crate::condition::{FieldCondition, GroupId, GroupKind, Operand, Operator};
use crate::field::{Field, FieldId, FieldKind};
use crate::join::{Join, JoinType};
use crate::literal::{literal, render_value};
use crate::statement::Branch;
use crate::table::{TableId, TableKind};
use tinysql_core::{Error, Result, Value};

const CRLF: &str = "\r\n";

/// Parameter declarations of one scope; the first declaration of a name wins.
#[derive(Debug, Default)]
pub(crate) struct Declarations {
    entries: Vec<(String, String)>,
}

impl Declarations {
    fn declare(&mut self, name: &str, declaration: String) {
        if !self.entries.iter().any(|(n, _)| n.eq_ignore_ascii_case(name)) {
            self.entries.push((name.to_string(), declaration));
        }
    }

    fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(_, d)| d.as_str())
    }
}

/// Rendered output clause: the table variable and its column list.
struct OutputParts {
    parameter: String,
    columns: String,
}

impl Builder {
    /// Compile the statement, its sub-queries and its hoisted declarations.
    #[tracing::instrument(level = "debug", skip(self), fields(kind = self.kind.as_str()))]
    pub fn compile(&self) -> Result<String> {
        let sql = self.render(None)?;
        tracing::trace!(sql = %sql, "compiled statement");
        Ok(sql)
    }

    /// Compile, then substitute positional `{n}` placeholders with `args`.
    ///
    /// `{{` and `}}` are literal braces. Without arguments the text is
    /// returned unchanged.
    pub fn compile_with(&self, args: &[&dyn Display]) -> Result<String> {
        let sql = self.compile()?;
        if args.is_empty() {
            return Ok(sql);
        }
        apply_format(&sql, args)
    }

    /// Render this builder. `scope` is the declaration set of the enclosing
    /// builder when this one shares it; `None` makes this builder the top of
    /// its own scope.
    pub(crate) fn render(&self, scope: Option<&mut Declarations>) -> Result<String> {
        let mut own = Declarations::default();
        let top = scope.is_none();
        let decls = match scope {
            Some(d) => d,
            None => &mut own,
        };
        let statement = match self.kind {
            StatementKind::Select => self.render_select(decls)?,
            StatementKind::Insert => self.render_insert(decls)?,
            StatementKind::Update => self.render_update(decls)?,
            StatementKind::Delete => self.render_delete()?,
            StatementKind::Procedure => self.render_procedure(decls)?,
            StatementKind::Conditional => self.render_conditional(decls)?,
        };

        let mut out = String::new();
        if top {
            for declaration in decls.iter() {
                out.push_str(declaration);
                out.push_str(CRLF);
            }
        }
        if self.kind == StatementKind::Conditional {
            out.push_str(CRLF);
            out.push_str(CRLF);
            out.push_str(&statement);
        } else {
            out.push_str(&statement);
            out.push_str(CRLF);
        }
        Ok(out)
    }

    fn render_nested(&self, sub: &Builder, decls: &mut Declarations) -> Result<String> {
        if sub.shares_scope {
            sub.render(Some(decls))
        } else {
            sub.render(None)
        }
    }

    /// Qualifier of a field: its table's alias.
    fn field_prefix(&self, field: &Field) -> Option<String> {
        field.table.map(|t| self.tables[t.0].alias())
    }

    /// `alias.[name]`, the left side of a condition.
    pub(crate) fn field_declaration(&self, id: FieldId) -> String {
        let field = &self.fields[id.0];
        match self.field_prefix(field) {
            Some(prefix) => format!("{}.[{}]", prefix, field.name),
            None => format!("[{}]", field.name),
        }
    }

    /// `alias.[alias or name]`, how other clauses refer to a field.
    pub(crate) fn field_reference(&self, id: FieldId) -> String {
        let field = &self.fields[id.0];
        match self.field_prefix(field) {
            Some(prefix) => format!("{}.[{}]", prefix, field.output_name()),
            None => format!("[{}]", field.output_name()),
        }
    }

    /// A select-list entry or function argument.
    fn render_field(&self, id: FieldId, alias_override: Option<&str>) -> Result<String> {
        let field = &self.fields[id.0];
        let alias = alias_override.or(field.alias.as_deref());
        let culture = &self.config.culture;
        let sql = match &field.kind {
            FieldKind::Column => {
                let mut sql = match self.field_prefix(field) {
                    Some(prefix) => format!("{}.{}", prefix, field.name),
                    None => field.name.clone(),
                };
                if let (Some(alias), None) = (alias, &field.value) {
                    sql.push_str(&format!(" AS [{}]", alias));
                }
                sql
            }
            FieldKind::Value | FieldKind::Constant => {
                let value = field.value.as_ref().unwrap_or(&Value::Null);
                let text = literal(value, field.column_type, culture)?;
                match alias {
                    Some(alias) => format!("{} [{}]", text, alias),
                    None => text,
                }
            }
            FieldKind::Parameter { parameter, .. } => parameter.clone(),
            FieldKind::Function { schema, args } => {
                let args = args
                    .iter()
                    .map(|arg| self.render_field(*arg, None))
                    .collect::<Result<Vec<_>>>()?;
                let name = match schema {
                    Some(schema) => format!("{}.{}", schema, field.name),
                    None => field.name.clone(),
                };
                let call = format!("{}({})", name, args.join(", "));
                match alias {
                    Some(alias) => format!("{} [{}]", call, alias),
                    None => call,
                }
            }
        };
        Ok(sql)
    }

    /// The select list contributed by one table.
    fn render_field_list(
        &self,
        table: TableId,
        collisions: &[(FieldId, Option<String>)],
    ) -> Result<String> {
        let mut parts = Vec::new();
        for &id in &self.tables[table.0].fields {
            match collisions.iter().find(|(f, _)| *f == id) {
                Some((_, None)) => {}
                Some((_, Some(alias))) => parts.push(self.render_field(id, Some(alias))?),
                None => parts.push(self.render_field(id, None)?),
            }
        }
        Ok(parts.join(", "))
    }

    fn render_condition(&self, condition: &FieldCondition) -> Result<String> {
        let decl = self.field_declaration(condition.left);
        let left = &self.fields[condition.left.0];
        let culture = &self.config.culture;
        let op = condition.op;
        let body = match (&condition.rhs, op) {
            (_, Operator::IsNull) => format!("{} IS NULL", decl),
            (_, Operator::IsNotNull) => format!("{} IS NOT NULL", decl),
            (Operand::Field(right), _) => {
                format!("{} {} {}", decl, op.as_str(), self.field_reference(*right))
            }
            (Operand::Value(value), Operator::In | Operator::NotIn) => {
                let list = match value {
                    Value::List(_) => render_value(value, culture)?,
                    single => render_value(&Value::List(vec![single.clone()]), culture)?,
                };
                format!("{} {} ({})", decl, op.as_str(), list)
            }
            (Operand::Value(value), Operator::StartsWith) => {
                format!("{} LIKE '{}%'", decl, render_value(value, culture)?)
            }
            (Operand::Value(value), Operator::EndsWith) => {
                format!("{} LIKE '%{}'", decl, render_value(value, culture)?)
            }
            (Operand::Value(value), Operator::Contains) => {
                format!("{} LIKE '%{}%'", decl, render_value(value, culture)?)
            }
            (Operand::Value(value), _) => format!(
                "{} {} {}",
                decl,
                op.as_str(),
                literal(value, left.column_type, culture)?
            ),
            (Operand::None, _) => {
                return Err(Error::config(format!(
                    "The condition on {} has no operand",
                    decl
                )));
            }
        };
        Ok(format!("{}{}", condition.link.prefix(), body))
    }

    /// Render a condition group. A group without any condition renders empty.
    pub(crate) fn render_group(&self, id: GroupId) -> Result<String> {
        let group = &self.groups[id.0];
        let mut inner = String::new();
        for condition in &group.conditions {
            inner.push_str(&self.render_condition(condition)?);
        }
        for child in &group.children {
            inner.push_str(&self.render_group(*child)?);
        }
        let prefix = group.link.prefix();
        let sql = match group.kind {
            GroupKind::Exists {
                in_table, negated, ..
            } => {
                let not = if negated { "NOT " } else { "" };
                let from = self.tables[in_table.0].alias();
                if inner.is_empty() {
                    format!("{}{}EXISTS(SELECT 1 FROM {})", prefix, not, from)
                } else {
                    format!("{}{}EXISTS(SELECT 1 FROM {} WHERE ({}))", prefix, not, from, inner)
                }
            }
            _ if inner.is_empty() => String::new(),
            _ => format!("{}({})", prefix, inner),
        };
        Ok(sql)
    }

    fn render_join(&self, join: &Join) -> Result<String> {
        let keyword = join.join_type.as_str();
        let target = self.tables[join.to.0].reference_name();
        if join.join_type == JoinType::Cross {
            return Ok(format!("{} {}", keyword, target));
        }
        let on = self.render_group(join.group)?;
        if on.is_empty() {
            return Err(Error::config(format!(
                "The {} to {} has no ON condition",
                keyword, target
            )));
        }
        Ok(format!("{} {} ON {}", keyword, target, on))
    }

    fn push_joins(&self, sql: &mut String) -> Result<()> {
        for join in &self.joins {
            sql.push_str(&self.render_join(join)?);
            sql.push_str(CRLF);
        }
        Ok(())
    }

    fn push_where(&self, sql: &mut String) -> Result<()> {
        let conditions = self.render_group(self.root())?;
        if !conditions.is_empty() && conditions != "()" {
            sql.push_str(&format!("WHERE {}{}", conditions, CRLF));
        }
        Ok(())
    }

    fn render_select(&self, decls: &mut Declarations) -> Result<String> {
        let base = self
            .base_table()
            .ok_or_else(|| Error::config("The SELECT statement has no FROM table"))?;
        let collisions = self.select_list_collisions(self.config.select_list_dedup);
        let mut list = self.render_field_list(base, &collisions)?;
        for (id, _) in self.tables().skip(1) {
            let fields = self.render_field_list(id, &collisions)?;
            if !fields.is_empty() {
                list.push_str(", ");
                list.push_str(&fields);
            }
        }

        let distinct = if self.distinct { "DISTINCT" } else { "" };
        let top = self.top.map(|n| format!("TOP {}", n)).unwrap_or_default();
        let mut sql = format!("SELECT {} {}  {}{}", distinct, top, list, CRLF);
        if let Some(temp) = self.select_into {
            sql.push_str(&format!("  INTO  {}{}", self.tables[temp.0].reference_name(), CRLF));
        }
        sql.push_str(&format!("  FROM  {}{}", self.tables[base.0].reference_name(), CRLF));
        self.push_joins(&mut sql)?;
        self.push_where(&mut sql)?;
        if !self.order_by.is_empty() {
            let entries: Vec<String> = self.order_by.iter().map(|o| self.render_order_by(o)).collect();
            sql.push_str(&format!(" ORDER  BY {}{}", entries.join(", "), CRLF));
        }

        if let Some(id) = self.select_into {
            let temp = &self.tables[id.0];
            if temp.output {
                let fields = self.render_field_list(id, &[])?;
                sql.push_str(&format!("SELECT  {} FROM {}{}", fields, temp.reference_name(), CRLF));
                if !temp.order_by.is_empty() {
                    let entries: Vec<String> = temp.order_by.iter().map(|o| self.render_order_by(o)).collect();
                    sql.push_str(&format!(" ORDER  BY {}{}", entries.join(", "), CRLF));
                }
            }
        }

        for (_, sub) in &self.sub_queries {
            let text = self.render_nested(sub, decls)?;
            sql.push_str(&format!("{}-- Sub Query{}{}{}", CRLF, CRLF, text, CRLF));
        }
        Ok(sql)
    }

    /// `DECLARE @p TYPE` for a parameter field.
    fn declare_parameter(&self, field: &Field, decls: &mut Declarations) {
        if let Some(parameter) = field.parameter() {
            let declaration = format!(
                "DECLARE {} {}",
                parameter,
                field.declared_type().declaration(field.value.as_ref())
            );
            decls.declare(parameter, declaration);
        }
    }

    /// `SET @p = value`; a missing or NULL value is written `SET  @p = NULL`.
    fn set_parameter(&self, field: &Field) -> Result<String> {
        let parameter = field.parameter().unwrap_or(field.name.as_str());
        match &field.value {
            None | Some(Value::Null) => Ok(format!("SET  {} = NULL", parameter)),
            Some(value) => Ok(format!(
                "SET {} = {}",
                parameter,
                literal(value, field.column_type, &self.config.culture)?
            )),
        }
    }

    /// Declare the output table variable and render its column list.
    fn declare_output(&self, decls: &mut Declarations) -> Result<Option<OutputParts>> {
        let Some(output) = &self.output else {
            return Ok(None);
        };
        let table = &self.tables[output.table.0];
        let columns: Vec<String> = table
            .fields
            .iter()
            .map(|id| {
                let field = &self.fields[id.0];
                format!("{} {}", field.name, field.declared_type().declaration(None))
            })
            .collect();
        decls.declare(
            &output.parameter,
            format!("DECLARE {} TABLE({})", output.parameter, columns.join(",")),
        );
        Ok(Some(OutputParts {
            parameter: output.parameter.clone(),
            columns: self.render_field_list(output.table, &[])?,
        }))
    }

    /// The base table's parameter fields, declared and rendered as a SET block.
    fn parameter_block(
        &self,
        kind: TableKind,
        decls: &mut Declarations,
    ) -> Result<(TableId, Vec<&Field>, String)> {
        let statement = self.kind.as_str();
        let table = match self.base_table() {
            Some(id) if self.tables[id.0].kind == kind => id,
            _ => {
                return Err(Error::config(format!(
                    "The {} statement has no target table",
                    statement
                )));
            }
        };
        let params: Vec<&Field> = self.tables[table.0]
            .fields
            .iter()
            .map(|id| &self.fields[id.0])
            .filter(|f| f.parameter().is_some())
            .collect();
        if params.is_empty() {
            return Err(Error::config(format!(
                "The {} statement on {} has no values",
                statement,
                self.tables[table.0].full_name()
            )));
        }
        let mut set = String::new();
        for field in &params {
            self.declare_parameter(field, decls);
            set.push_str(&self.set_parameter(field)?);
            set.push_str(CRLF);
        }
        Ok((table, params, set))
    }

    fn render_insert(&self, decls: &mut Declarations) -> Result<String> {
        let (table, params, set) = self.parameter_block(TableKind::InsertTarget, decls)?;
        let output = self.declare_output(decls)?;
        let columns: Vec<&str> = params.iter().map(|f| f.output_name()).collect();
        let values: Vec<&str> = params.iter().filter_map(|f| f.parameter()).collect();

        let mut sql = set;
        sql.push_str(CRLF);
        sql.push_str(&format!(
            " INSERT  INTO {}({}){}",
            self.tables[table.0].alias(),
            columns.join(", "),
            CRLF
        ));
        if let Some(out) = &output {
            sql.push_str(&format!("OUTPUT  {} INTO {} {}{}", out.columns, out.parameter, CRLF, CRLF));
        }
        sql.push_str(&format!("VALUES({}){}", values.join(", "), CRLF));
        if let Some(out) = &output {
            sql.push_str(&format!("SELECT  * FROM {}{}{}", out.parameter, CRLF, CRLF));
        }
        Ok(sql)
    }

    fn render_update(&self, decls: &mut Declarations) -> Result<String> {
        let (table, params, set) = self.parameter_block(TableKind::UpdateTarget, decls)?;
        let output = self.declare_output(decls)?;
        let assignments: Vec<String> = params
            .iter()
            .map(|f| format!("{} = {}", f.output_name(), f.parameter().unwrap_or_default()))
            .collect();
        let target = &self.tables[table.0];

        let mut sql = String::from(CRLF);
        sql.push_str(&set);
        sql.push_str(CRLF);
        sql.push_str(&format!("UPDATE  {}{}", target.name, CRLF));
        sql.push_str(&format!("   SET  {}{}", assignments.join(", "), CRLF));
        if let Some(out) = &output {
            sql.push_str(&format!("OUTPUT  {} INTO {} {}{}", out.columns, out.parameter, CRLF, CRLF));
        }
        sql.push_str(&format!("  FROM  {}{}", target.reference_name(), CRLF));
        self.push_joins(&mut sql)?;
        self.push_where(&mut sql)?;
        if let Some(out) = &output {
            sql.push_str(&format!("SELECT  * FROM {}{}{}", out.parameter, CRLF, CRLF));
        }
        Ok(sql)
    }

    fn render_delete(&self) -> Result<String> {
        let base = self
            .base_table()
            .ok_or_else(|| Error::config("The DELETE statement has no FROM table"))?;
        let table = &self.tables[base.0];
        let mut sql = format!(
            "DELETE  {}{}  FROM  {}{}",
            table.alias(),
            CRLF,
            table.reference_name(),
            CRLF
        );
        self.push_joins(&mut sql)?;
        self.push_where(&mut sql)?;
        Ok(sql)
    }

    fn render_procedure(&self, decls: &mut Declarations) -> Result<String> {
        let call = self
            .procedure
            .as_ref()
            .ok_or_else(|| Error::config("The procedure statement has no procedure name"))?;
        let mut set = String::new();
        let mut arguments = Vec::new();
        let mut outputs = Vec::new();
        for id in &call.parameters {
            let field = &self.fields[id.0];
            let Some(parameter) = field.parameter() else {
                continue;
            };
            self.declare_parameter(field, decls);
            set.push_str(&self.set_parameter(field)?);
            set.push_str(CRLF);
            if field.is_output_parameter() {
                arguments.push(format!("{} OUT", parameter));
                outputs.push(parameter);
            } else {
                arguments.push(parameter.to_string());
            }
        }

        let mut sql = format!("-- Stored procedure{}{}{}", CRLF, set, CRLF);
        sql.push_str(&format!("EXEC {} {}{}", call.full_name(), arguments.join(", "), CRLF));
        if !outputs.is_empty() {
            sql.push_str(&format!("SELECT  {}{}", outputs.join(", "), CRLF));
        }
        Ok(sql)
    }

    fn render_conditional(&self, decls: &mut Declarations) -> Result<String> {
        let parts = self
            .conditional
            .as_ref()
            .ok_or_else(|| Error::config("The IF statement has no branch data"))?;
        let mut sql = match parts.branch {
            Branch::Else => format!("ELSE{}BEGIN{}", CRLF, CRLF),
            branch => {
                let condition = self.render_group(self.root())?;
                if condition.is_empty() {
                    return Err(Error::config("The IF statement has no condition"));
                }
                let keyword = if branch == Branch::If { "IF " } else { "ELSE IF " };
                format!("{} {}{}BEGIN{}", keyword, condition, CRLF, CRLF)
            }
        };
        if let Some(body) = &parts.body {
            sql.push_str(&body.render(Some(decls))?);
        }
        sql.push_str(CRLF);
        sql.push_str("END");
        sql.push_str(CRLF);
        for branch in &parts.branches {
            sql.push_str(&branch.render(Some(decls))?);
            sql.push_str(CRLF);
        }
        Ok(sql)
    }
}

/// Substitute `{n}` placeholders.
fn apply_format(sql: &str, args: &[&dyn Display]) -> Result<String> {
    let mut out = String::with_capacity(sql.len());
    let mut chars = sql.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut digits = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(d) if d.is_ascii_digit() => digits.push(d),
                        _ => return Err(Error::config("Invalid format placeholder in the SQL text")),
                    }
                }
                let index: usize = digits
                    .parse()
                    .map_err(|_| Error::config("Invalid format placeholder in the SQL text"))?;
                let arg = args.get(index).ok_or_else(|| {
                    Error::config(format!(
                        "Format placeholder {{{}}} has no argument; {} given",
                        index,
                        args.len()
                    ))
                })?;
                out.push_str(&arg.to_string());
            }
            '}' => return Err(Error::config("Unmatched '}' in the SQL text")),
            other => out.push(other),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::Link;
    use tinysql_core::{ColumnType, SqlType};

    fn account() -> (Builder, TableId) {
        let mut b = Builder::select();
        let t = b.add_table("Account", None, None);
        b.add_columns(t, &["AccountID", "Name"]);
        (b, t)
    }

    #[test]
    fn test_simple_select() {
        let (b, _) = account();
        assert_eq!(
            b.compile().unwrap(),
            "SELECT    t0.AccountID, t0.Name\r\n  FROM  Account t0\r\n\r\n"
        );
    }

    #[test]
    fn test_top_and_distinct() {
        let mut b = Builder::select_with(Some(10), true);
        let t = b.add_table("Account", None, None);
        b.add_column(t, "Name", None);
        assert!(b.compile().unwrap().starts_with("SELECT DISTINCT TOP 10  t0.Name\r\n"));
    }

    #[test]
    fn test_where_and_order_by() {
        let (mut b, t) = account();
        b.where_("Account", "AccountID", Operator::Equal, 526).unwrap();
        b.order_by(t, "Name", crate::clause::OrderDirection::Asc).unwrap();
        assert_eq!(
            b.compile().unwrap(),
            "SELECT    t0.AccountID, t0.Name\r\n  FROM  Account t0\r\nWHERE (t0.[AccountID] = 526)\r\n ORDER  BY t0.[Name] ASC\r\n\r\n"
        );
    }

    #[test]
    fn test_every_operator_renders() {
        let cases: [(Operator, Value, &str); 13] = [
            (Operator::Equal, Value::Int(1), "(t0.[AccountID] = 1)"),
            (Operator::NotEqual, Value::Int(1), "(t0.[AccountID] != 1)"),
            (Operator::GreaterThan, Value::Int(1), "(t0.[AccountID] > 1)"),
            (Operator::GreaterThanOrEqual, Value::Int(1), "(t0.[AccountID] >= 1)"),
            (Operator::LessThan, Value::Int(1), "(t0.[AccountID] < 1)"),
            (Operator::LessThanOrEqual, Value::Int(1), "(t0.[AccountID] <= 1)"),
            (Operator::IsNull, Value::Null, "(t0.[AccountID] IS NULL)"),
            (Operator::IsNotNull, Value::Null, "(t0.[AccountID] IS NOT NULL)"),
            (Operator::StartsWith, Value::from("ab"), "(t0.[AccountID] LIKE 'ab%')"),
            (Operator::EndsWith, Value::from("ab"), "(t0.[AccountID] LIKE '%ab')"),
            (Operator::Contains, Value::from("ab"), "(t0.[AccountID] LIKE '%ab%')"),
            (Operator::In, Value::list([1, 2]), "(t0.[AccountID] IN (1,2))"),
            (Operator::NotIn, Value::list(["a"]), "(t0.[AccountID] NOT IN ('a'))"),
        ];
        for (op, value, expected) in cases {
            let (mut b, _) = account();
            b.where_("Account", "AccountID", op, value).unwrap();
            assert_eq!(b.render_group(b.root()).unwrap(), expected, "{:?}", op);
        }
    }

    #[test]
    fn test_text_condition_is_n_quoted() {
        let (mut b, _) = account();
        b.where_("Account", "Name", Operator::Equal, "O'Hara").unwrap();
        assert_eq!(b.render_group(b.root()).unwrap(), "(t0.[Name] = N'O''Hara')");
    }

    #[test]
    fn test_nested_groups() {
        let (mut b, _) = account();
        b.where_("Account", "AccountID", Operator::GreaterThan, 1).unwrap();
        let g = b.or_group(b.root());
        b.add_condition(g, Link::And, "Account", "Name", Operator::Equal, "a").unwrap();
        b.add_condition(g, Link::Or, "Account", "Name", Operator::Equal, "b").unwrap();
        assert_eq!(
            b.render_group(b.root()).unwrap(),
            "(t0.[AccountID] > 1 OR (t0.[Name] = N'a' OR t0.[Name] = N'b'))"
        );
    }

    #[test]
    fn test_empty_where_is_omitted() {
        let (mut b, _) = account();
        b.and_group(b.root());
        assert!(!b.compile().unwrap().contains("WHERE"));
    }

    #[test]
    fn test_exists_renders_correlated_subselect() {
        let (mut b, _) = account();
        let g = b.where_not_exists("Contact", None).unwrap();
        b.exists_and_field(g, "ParentCustomerID", Operator::Equal, "AccountID").unwrap();
        assert_eq!(
            b.render_group(b.root()).unwrap(),
            "(NOT EXISTS(SELECT 1 FROM Contact WHERE (Contact.[ParentCustomerID] = t0.[AccountID])))"
        );
    }

    #[test]
    fn test_joins() {
        let (mut b, a) = account();
        let j = b.inner_join(a, "SystemUser");
        b.on(j, "OwningUserID", Operator::Equal, "SystemUserID");
        let target = b.join_target(j);
        b.add_column(target, "Name", None);
        b.cross_join(a, "Currency");
        let sql = b.compile().unwrap();
        assert_eq!(
            sql,
            "SELECT    t0.AccountID, t0.Name, t1.Name AS [SystemUser_Name]\r\n  FROM  Account t0\r\nINNER JOIN SystemUser t1 ON (t0.[OwningUserID] = t1.[SystemUserID])\r\nCROSS JOIN Currency t2\r\n\r\n"
        );
    }

    #[test]
    fn test_join_without_condition_is_rejected() {
        let (mut b, a) = account();
        b.left_join(a, "SystemUser");
        assert!(matches!(b.compile(), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_remove_mode_drops_duplicate_names() {
        let (b, a) = account();
        let mut b = b.with_config(
            tinysql_core::SqlConfig::new().select_list_dedup(tinysql_core::SelectListDedup::Remove),
        );
        let j = b.inner_join(a, "SystemUser");
        b.on(j, "OwningUserID", Operator::Equal, "SystemUserID");
        let target = b.join_target(j);
        b.add_column(target, "Name", None);
        b.add_column(target, "DomainName", None);
        assert!(b.compile().unwrap().starts_with("SELECT    t0.AccountID, t0.Name, t1.DomainName\r\n"));
    }

    #[test]
    fn test_compile_is_deterministic() {
        let (mut b, _) = account();
        b.where_("Account", "Name", Operator::Contains, "x").unwrap();
        assert_eq!(b.compile().unwrap(), b.compile().unwrap());
    }

    #[test]
    fn test_functions_and_values() {
        let mut b = Builder::select();
        let t = b.add_table("Account", None, None);
        b.get_date(t, Some("Now"));
        let first = b.column_ref(t, "FirstName");
        let space = b.constant(" ");
        let last = b.column_ref(t, "LastName");
        b.concat(t, vec![first, space, last], Some("FullName"));
        b.add_value_column(t, "fixed", Some("Kind"));
        b.add_function(t, Some("dbo"), "fnRank", vec![], None);
        assert!(b.compile().unwrap().starts_with(
            "SELECT    GETDATE() [Now], CONCAT(t0.FirstName, N' ', t0.LastName) [FullName], N'fixed' [Kind], dbo.FNRANK()\r\n"
        ));
    }

    #[test]
    fn test_insert() {
        let mut b = Builder::insert();
        b.into_table("Account", None).unwrap();
        b.value("Name", "Contoso").unwrap();
        b.value_typed("Revenue", 5, ColumnType::new(SqlType::Decimal).with_precision(18, 2))
            .unwrap();
        assert_eq!(
            b.compile().unwrap(),
            "DECLARE @Name NVarChar(MAX)\r\nDECLARE @Revenue Decimal(18, 2)\r\nSET @Name = N'Contoso'\r\nSET @Revenue = 5\r\n\r\n INSERT  INTO Account(Name, Revenue)\r\nVALUES(@Name, @Revenue)\r\n\r\n"
        );
    }

    #[test]
    fn test_insert_with_output() {
        let mut b = Builder::insert();
        b.into_table("Account", None).unwrap();
        b.value("Name", "Contoso").unwrap();
        b.output_column("AccountID", Some(ColumnType::new(SqlType::Int))).unwrap();
        assert_eq!(
            b.compile().unwrap(),
            "DECLARE @Name NVarChar(MAX)\r\nDECLARE @outputAccount TABLE(AccountID Int)\r\nSET @Name = N'Contoso'\r\n\r\n INSERT  INTO Account(Name)\r\nOUTPUT  inserted.AccountID INTO @outputAccount \r\n\r\nVALUES(@Name)\r\nSELECT  * FROM @outputAccount\r\n\r\n\r\n"
        );
    }

    #[test]
    fn test_update() {
        let mut b = Builder::update();
        b.update_table("Account", None).unwrap();
        b.set("Name", "Contoso").unwrap();
        b.set("Revenue", Value::Null).unwrap();
        b.where_("Account", "AccountID", Operator::Equal, 7).unwrap();
        assert_eq!(
            b.compile().unwrap(),
            "DECLARE @Name NVarChar(MAX)\r\nDECLARE @Revenue NVarChar(MAX)\r\n\r\nSET @Name = N'Contoso'\r\nSET  @Revenue = NULL\r\n\r\nUPDATE  Account\r\n   SET  Name = @Name, Revenue = @Revenue\r\n  FROM  Account\r\nWHERE (Account.[AccountID] = 7)\r\n\r\n"
        );
    }

    #[test]
    fn test_update_without_values_is_rejected() {
        let mut b = Builder::update();
        b.update_table("Account", None).unwrap();
        assert!(matches!(b.compile(), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_delete() {
        let mut b = Builder::delete();
        b.add_table("Account", None, None);
        b.where_("Account", "StateCode", Operator::Equal, 1).unwrap();
        assert_eq!(
            b.compile().unwrap(),
            "DELETE  t0\r\n  FROM  Account t0\r\nWHERE (t0.[StateCode] = 1)\r\n\r\n"
        );
    }

    #[test]
    fn test_procedure() {
        let mut b = Builder::procedure("GetAccount", Some("dbo"));
        b.parameter("AccountID", 5, None).unwrap();
        b.output_parameter("Total", ColumnType::new(SqlType::Int)).unwrap();
        assert_eq!(
            b.compile().unwrap(),
            "DECLARE @AccountID Int\r\nDECLARE @Total Int\r\n-- Stored procedure\r\nSET @AccountID = 5\r\nSET  @Total = NULL\r\n\r\nEXEC dbo.GetAccount @AccountID, @Total OUT\r\nSELECT  @Total\r\n\r\n"
        );
    }

    #[test]
    fn test_conditional_with_branches() {
        let mut b = Builder::conditional();
        let g = b.where_exists("Account", None).unwrap();
        b.add_condition(g, Link::And, "Account", "AccountID", Operator::Equal, 1).unwrap();
        {
            let body = b.begin(StatementKind::Update).unwrap();
            body.update_table("Account", None).unwrap();
            body.set("Name", "x").unwrap();
        }
        {
            let otherwise = b.else_branch().unwrap();
            let body = otherwise.begin(StatementKind::Delete).unwrap();
            body.add_table("Account", None, None);
        }
        assert_eq!(
            b.compile().unwrap(),
            "DECLARE @Name NVarChar(MAX)\r\n\r\n\r\nIF  (EXISTS(SELECT 1 FROM Account WHERE (Account.[AccountID] = 1)))\r\nBEGIN\r\n\r\nSET @Name = N'x'\r\n\r\nUPDATE  Account\r\n   SET  Name = @Name\r\n  FROM  Account\r\n\r\n\r\nEND\r\n\r\n\r\nELSE\r\nBEGIN\r\nDELETE  t0\r\n  FROM  Account t0\r\n\r\n\r\nEND\r\n\r\n"
        );
    }

    #[test]
    fn test_conditional_requires_condition() {
        let mut b = Builder::conditional();
        b.begin(StatementKind::Select).unwrap();
        assert!(matches!(b.compile(), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_sub_query_declarations_are_hoisted_once() {
        let (mut b, _) = account();
        let mut inner = Builder::conditional();
        inner.where_exists("Contact", None).unwrap();
        {
            let body = inner.begin(StatementKind::Update).unwrap();
            body.update_table("Contact", None).unwrap();
            body.set("Name", "a").unwrap();
        }
        b.add_sub_query("first", inner.clone());
        b.add_sub_query("second", inner);
        let sql = b.compile().unwrap();
        assert_eq!(sql.matches("DECLARE @Name").count(), 1);
        assert!(sql.starts_with("DECLARE @Name NVarChar(MAX)\r\nSELECT "));
        assert_eq!(sql.matches("-- Sub Query").count(), 2);
    }

    #[test]
    fn test_update_sub_query_keeps_own_declarations() {
        let (mut b, _) = account();
        let mut update = Builder::update();
        update.update_table("Account", None).unwrap();
        update.set("Name", "a").unwrap();
        b.add_sub_query("touch", update);
        let sql = b.compile().unwrap();
        assert!(sql.starts_with("SELECT "));
        assert!(sql.contains("-- Sub Query\r\nDECLARE @Name NVarChar(MAX)\r\n"));
    }

    #[test]
    fn test_compile_with_format_arguments() {
        let (mut b, _) = account();
        b.where_("Account", "Name", Operator::Equal, "{0}").unwrap();
        let sql = b.compile_with(&[&"Contoso"]).unwrap();
        assert!(sql.contains("t0.[Name] = N'Contoso'"));
        assert!(matches!(b.compile_with(&[]), Ok(_)));
        assert!(apply_format("{1}", &[&1]).is_err());
        assert_eq!(apply_format("{{x}} {0}", &[&7]).unwrap(), "{x} 7");
    }
}
