//! WHERE, ON and EXISTS condition trees.

use crate::builder::Builder;
use crate::field::{Field, FieldId, FieldKind};
use crate::table::{Table, TableId, TableKind};
use tinysql_core::{Error, Result, Value};

/// Index of a [`ConditionGroup`] inside the builder that owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId(pub(crate) usize);

impl GroupId {
    pub const fn index(self) -> usize {
        self.0
    }
}

/// How a condition or group attaches to the sibling before it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Link {
    /// First entry of its group
    #[default]
    None,
    And,
    Or,
}

impl Link {
    /// Prefix written before a linked condition.
    pub(crate) const fn prefix(self) -> &'static str {
        match self {
            Link::None => "",
            Link::And => " AND ",
            Link::Or => " OR ",
        }
    }
}

/// Condition operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Equal,
    NotEqual,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    IsNull,
    IsNotNull,
    /// `LIKE 'v%'`
    StartsWith,
    /// `LIKE '%v'`
    EndsWith,
    /// `LIKE '%v%'`
    Contains,
    In,
    NotIn,
}

impl Operator {
    pub const fn as_str(self) -> &'static str {
        match self {
            Operator::Equal => "=",
            Operator::NotEqual => "!=",
            Operator::GreaterThan => ">",
            Operator::GreaterThanOrEqual => ">=",
            Operator::LessThan => "<",
            Operator::LessThanOrEqual => "<=",
            Operator::IsNull => "IS NULL",
            Operator::IsNotNull => "IS NOT NULL",
            Operator::StartsWith | Operator::EndsWith | Operator::Contains => "LIKE",
            Operator::In => "IN",
            Operator::NotIn => "NOT IN",
        }
    }

    /// Null checks take no operand.
    pub const fn is_null_check(self) -> bool {
        matches!(self, Operator::IsNull | Operator::IsNotNull)
    }
}

/// Right-hand side of a condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    None,
    Field(FieldId),
    Value(Value),
}

/// One comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldCondition {
    pub(crate) link: Link,
    pub(crate) left: FieldId,
    pub(crate) op: Operator,
    pub(crate) rhs: Operand,
}

impl FieldCondition {
    pub fn link(&self) -> Link {
        self.link
    }

    pub fn left(&self) -> FieldId {
        self.left
    }

    pub fn operator(&self) -> Operator {
        self.op
    }

    pub fn operand(&self) -> &Operand {
        &self.rhs
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKind {
    Where,
    Join,
    /// `[NOT] EXISTS(SELECT 1 FROM in_table WHERE ...)`
    Exists {
        in_table: TableId,
        /// Outer table that correlated conditions compare against
        from_table: Option<TableId>,
        negated: bool,
    },
    /// Condition of an IF or ELSE IF branch
    Conditional,
}

/// A parenthesized list of conditions followed by nested groups.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionGroup {
    pub(crate) link: Link,
    pub(crate) kind: GroupKind,
    pub(crate) conditions: Vec<FieldCondition>,
    pub(crate) children: Vec<GroupId>,
}

impl ConditionGroup {
    pub(crate) fn new(kind: GroupKind) -> Self {
        Self {
            link: Link::None,
            kind,
            conditions: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn link(&self) -> Link {
        self.link
    }

    pub fn kind(&self) -> GroupKind {
        self.kind
    }

    pub fn conditions(&self) -> &[FieldCondition] {
        &self.conditions
    }

    pub fn children(&self) -> &[GroupId] {
        &self.children
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty() && self.children.is_empty()
    }
}

impl Builder {
    /// The WHERE group.
    pub fn root(&self) -> GroupId {
        GroupId(0)
    }

    pub fn group(&self, id: GroupId) -> &ConditionGroup {
        &self.groups[id.0]
    }

    pub(crate) fn push_group(&mut self, group: ConditionGroup) -> GroupId {
        self.groups.push(group);
        GroupId(self.groups.len() - 1)
    }

    /// Append a condition to a group.
    ///
    /// The first condition of a group is never linked; later ones take
    /// `link` (an unlinked one is treated as AND). A nested group written
    /// after the conditions is linked with AND once a condition precedes it.
    pub(crate) fn push_condition(&mut self, group: GroupId, mut condition: FieldCondition) {
        let first_child = {
            let g = self.group_mut(group);
            if g.conditions.is_empty() {
                condition.link = Link::None;
            } else if condition.link == Link::None {
                condition.link = Link::And;
            }
            g.conditions.push(condition);
            g.children.first().copied()
        };
        if let Some(child) = first_child {
            let child = self.group_mut(child);
            if child.link == Link::None {
                child.link = Link::And;
            }
        }
    }

    /// Open a nested group under `parent`.
    pub(crate) fn push_child_group(&mut self, parent: GroupId, link: Link, kind: GroupKind) -> GroupId {
        let mut group = ConditionGroup::new(kind);
        group.link = if self.groups[parent.0].is_empty() {
            Link::None
        } else if link == Link::None {
            Link::And
        } else {
            link
        };
        let id = self.push_group(group);
        self.group_mut(parent).children.push(id);
        id
    }

    /// Table named by a condition in `group`. EXISTS groups see their
    /// target table first.
    fn condition_table(&mut self, group: GroupId, table: &str) -> Result<TableId> {
        if let GroupKind::Exists { in_table, .. } = self.groups[group.0].kind {
            if self.tables[in_table.0].matches(table) {
                return Ok(in_table);
            }
        }
        self.resolve_table(table)
    }

    /// Compare a column with a literal.
    ///
    /// Null checks ignore `value`; `In`/`NotIn` expect a [`Value::List`].
    pub fn add_condition(
        &mut self,
        group: GroupId,
        link: Link,
        table: &str,
        column: &str,
        op: Operator,
        value: impl Into<Value>,
    ) -> Result<&mut Self> {
        let table = self.condition_table(group, table)?;
        let left = self.reference_field(table, column);
        let rhs = if op.is_null_check() {
            Operand::None
        } else {
            Operand::Value(value.into())
        };
        self.push_condition(group, FieldCondition { link, left, op, rhs });
        Ok(self)
    }

    /// Compare two columns.
    #[allow(clippy::too_many_arguments)]
    pub fn add_field_condition(
        &mut self,
        group: GroupId,
        link: Link,
        table: &str,
        column: &str,
        op: Operator,
        other_table: &str,
        other_column: &str,
    ) -> Result<&mut Self> {
        let left_table = self.condition_table(group, table)?;
        let right_table = self.condition_table(group, other_table)?;
        let left = self.reference_field(left_table, column);
        let right = self.reference_field(right_table, other_column);
        self.push_condition(
            group,
            FieldCondition {
                link,
                left,
                op,
                rhs: Operand::Field(right),
            },
        );
        Ok(self)
    }

    /// Add a WHERE condition.
    pub fn where_(
        &mut self,
        table: &str,
        column: &str,
        op: Operator,
        value: impl Into<Value>,
    ) -> Result<&mut Self> {
        self.add_condition(self.root(), Link::And, table, column, op, value)
    }

    /// Add a WHERE condition linked with AND.
    pub fn and(
        &mut self,
        table: &str,
        column: &str,
        op: Operator,
        value: impl Into<Value>,
    ) -> Result<&mut Self> {
        self.add_condition(self.root(), Link::And, table, column, op, value)
    }

    /// Add a WHERE condition linked with OR.
    pub fn or(
        &mut self,
        table: &str,
        column: &str,
        op: Operator,
        value: impl Into<Value>,
    ) -> Result<&mut Self> {
        self.add_condition(self.root(), Link::Or, table, column, op, value)
    }

    /// Add a WHERE condition comparing two columns, linked with AND.
    pub fn and_field(
        &mut self,
        table: &str,
        column: &str,
        op: Operator,
        other_table: &str,
        other_column: &str,
    ) -> Result<&mut Self> {
        self.add_field_condition(
            self.root(),
            Link::And,
            table,
            column,
            op,
            other_table,
            other_column,
        )
    }

    /// Open a nested group linked with AND.
    pub fn and_group(&mut self, parent: GroupId) -> GroupId {
        let kind = self.nested_kind(parent);
        self.push_child_group(parent, Link::And, kind)
    }

    /// Open a nested group linked with OR.
    pub fn or_group(&mut self, parent: GroupId) -> GroupId {
        let kind = self.nested_kind(parent);
        self.push_child_group(parent, Link::Or, kind)
    }

    /// Plain groups nested in an EXISTS behave like WHERE groups.
    fn nested_kind(&self, parent: GroupId) -> GroupKind {
        match self.groups[parent.0].kind {
            GroupKind::Exists { .. } => GroupKind::Where,
            kind => kind,
        }
    }

    /// Add `EXISTS(SELECT 1 FROM in_table WHERE ...)` to the WHERE clause.
    ///
    /// Correlated conditions added with [`Builder::exists_and_field`]
    /// compare against `from_table`, the base table when `None`.
    pub fn where_exists(&mut self, in_table: &str, from_table: Option<&str>) -> Result<GroupId> {
        self.add_exists(self.root(), Link::And, in_table, from_table, false)
    }

    /// Add `NOT EXISTS(...)` to the WHERE clause.
    pub fn where_not_exists(&mut self, in_table: &str, from_table: Option<&str>) -> Result<GroupId> {
        self.add_exists(self.root(), Link::And, in_table, from_table, true)
    }

    pub fn add_exists(
        &mut self,
        parent: GroupId,
        link: Link,
        in_table: &str,
        from_table: Option<&str>,
        negated: bool,
    ) -> Result<GroupId> {
        let from_table = match from_table {
            Some(name) => Some(self.resolve_table(name)?),
            None => self.base_table(),
        };
        let in_table = self.push_table(Table::new(TableKind::Detached, in_table, None, None));
        let kind = GroupKind::Exists {
            in_table,
            from_table,
            negated,
        };
        Ok(self.push_child_group(parent, link, kind))
    }

    /// Correlate an EXISTS target column with a column of the outer table:
    /// `in_table.[in_column] op from_table.[outer_column]`.
    pub fn exists_and_field(
        &mut self,
        group: GroupId,
        in_column: &str,
        op: Operator,
        outer_column: &str,
    ) -> Result<&mut Self> {
        let GroupKind::Exists {
            in_table,
            from_table,
            ..
        } = self.groups[group.0].kind
        else {
            return Err(Error::config("The condition group is not an EXISTS group"));
        };
        let Some(from_table) = from_table else {
            return Err(Error::config(
                "The EXISTS group has no outer table to correlate with",
            ));
        };
        let left = self.push_field(Field::new(FieldKind::Column, in_column, Some(in_table)));
        let right = self.reference_field(from_table, outer_column);
        self.push_condition(
            group,
            FieldCondition {
                link: Link::And,
                left,
                op,
                rhs: Operand::Field(right),
            },
        );
        Ok(self)
    }
}
