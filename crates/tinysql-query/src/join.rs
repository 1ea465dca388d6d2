//! JOIN clause types.

use crate::builder::Builder;
use crate::condition::{ConditionGroup, FieldCondition, GroupId, GroupKind, Link, Operand, Operator};
use crate::table::TableId;
use tinysql_core::Value;

/// Index of a [`Join`] inside the builder that owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JoinId(pub(crate) usize);

impl JoinId {
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Types of SQL joins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinType {
    Inner,
    LeftOuter,
    RightOuter,
    Cross,
}

impl JoinType {
    /// Get the SQL keyword for this join type.
    pub const fn as_str(&self) -> &'static str {
        match self {
            JoinType::Inner => "INNER JOIN",
            JoinType::LeftOuter => "LEFT OUTER JOIN",
            JoinType::RightOuter => "RIGHT OUTER JOIN",
            JoinType::Cross => "CROSS JOIN",
        }
    }
}

/// A JOIN clause.
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub(crate) join_type: JoinType,
    pub(crate) from: TableId,
    pub(crate) to: TableId,
    pub(crate) group: GroupId,
}

impl Join {
    pub fn join_type(&self) -> JoinType {
        self.join_type
    }

    pub fn from(&self) -> TableId {
        self.from
    }

    pub fn to(&self) -> TableId {
        self.to
    }

    pub fn group(&self) -> GroupId {
        self.group
    }
}

impl Builder {
    /// Join `table` to `from`.
    ///
    /// The target is reused when it is already in the statement and not yet
    /// joined; otherwise it is added like [`Builder::add_table`].
    pub fn add_join(
        &mut self,
        join_type: JoinType,
        from: TableId,
        table: &str,
        alias: Option<&str>,
        schema: Option<&str>,
    ) -> JoinId {
        let to = self.add_table(table, alias, schema);
        let group = self.push_group(ConditionGroup::new(GroupKind::Join));
        self.joins.push(Join {
            join_type,
            from,
            to,
            group,
        });
        JoinId(self.joins.len() - 1)
    }

    pub fn inner_join(&mut self, from: TableId, table: &str) -> JoinId {
        self.add_join(JoinType::Inner, from, table, None, None)
    }

    pub fn left_join(&mut self, from: TableId, table: &str) -> JoinId {
        self.add_join(JoinType::LeftOuter, from, table, None, None)
    }

    pub fn right_join(&mut self, from: TableId, table: &str) -> JoinId {
        self.add_join(JoinType::RightOuter, from, table, None, None)
    }

    pub fn cross_join(&mut self, from: TableId, table: &str) -> JoinId {
        self.add_join(JoinType::Cross, from, table, None, None)
    }

    pub fn join(&self, id: JoinId) -> &Join {
        &self.joins[id.0]
    }

    pub fn joins(&self) -> &[Join] {
        &self.joins
    }

    pub fn join_target(&self, id: JoinId) -> TableId {
        self.joins[id.0].to
    }

    pub fn join_group(&self, id: JoinId) -> GroupId {
        self.joins[id.0].group
    }

    fn join_condition(
        &mut self,
        id: JoinId,
        link: Link,
        from_column: &str,
        op: Operator,
        to_column: &str,
    ) -> &mut Self {
        let Join { from, to, group, .. } = self.joins[id.0];
        let left = self.reference_field(from, from_column);
        let right = self.reference_field(to, to_column);
        self.push_condition(
            group,
            FieldCondition {
                link,
                left,
                op,
                rhs: Operand::Field(right),
            },
        );
        self
    }

    /// `ON from.[from_column] op to.[to_column]`
    pub fn on(&mut self, id: JoinId, from_column: &str, op: Operator, to_column: &str) -> &mut Self {
        self.join_condition(id, Link::None, from_column, op, to_column)
    }

    pub fn and_on(&mut self, id: JoinId, from_column: &str, op: Operator, to_column: &str) -> &mut Self {
        self.join_condition(id, Link::And, from_column, op, to_column)
    }

    pub fn or_on(&mut self, id: JoinId, from_column: &str, op: Operator, to_column: &str) -> &mut Self {
        self.join_condition(id, Link::Or, from_column, op, to_column)
    }

    /// Compare a column of the join target with a literal, linked with AND.
    pub fn join_value(
        &mut self,
        id: JoinId,
        column: &str,
        op: Operator,
        value: impl Into<Value>,
    ) -> &mut Self {
        let to = self.joins[id.0].to;
        self.join_value_on(id, to, column, op, value.into())
    }

    /// Compare a column of either side of a join with a literal, linked with
    /// AND.
    pub(crate) fn join_value_on(
        &mut self,
        id: JoinId,
        table: TableId,
        column: &str,
        op: Operator,
        value: Value,
    ) -> &mut Self {
        let group = self.joins[id.0].group;
        let left = self.reference_field(table, column);
        let rhs = if op.is_null_check() {
            Operand::None
        } else {
            Operand::Value(value)
        };
        self.push_condition(
            group,
            FieldCondition {
                link: Link::And,
                left,
                op,
                rhs,
            },
        );
        self
    }
}
