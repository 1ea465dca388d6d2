//! Foreign-key join resolution.
//!
//! Joins are inferred from the attached catalog: a primary key column is
//! joined through the single foreign key on the target that references it,
//! a foreign key column through its own single foreign key. Anything else is
//! ambiguous and rejected; the caller has to write the join by hand.

use std::str::FromStr;
use std::sync::Arc;

use rust_decimal::Decimal;

use crate::builder::Builder;
use crate::condition::Operator;
use crate::join::{JoinId, JoinType};
use crate::table::TableId;
use tinysql_core::{
    Error, LookupScope, MetadataDatabase, MetadataForeignKey, MetadataTable, RelationshipError,
    RelationshipErrorKind, Result, Value,
};

/// The value of a literal foreign key segment: a decimal when it parses as a
/// number, text otherwise.
pub(crate) fn literal_segment(text: &str) -> Value {
    match Decimal::from_str(text) {
        Ok(d) => Value::Decimal(d),
        Err(_) => Value::Text(text.to_string()),
    }
}

pub(crate) fn relationship_error(
    kind: RelationshipErrorKind,
    source: &MetadataTable,
    column: &str,
    target: Option<String>,
    candidates: usize,
    message: String,
) -> Error {
    tracing::debug!(
        table = %source.full_name(),
        column,
        candidates,
        "join resolution failed"
    );
    Error::AmbiguousRelationship(RelationshipError {
        kind,
        table: source.full_name(),
        column: column.to_string(),
        target,
        candidates,
        message,
    })
}

pub(crate) fn count_kind(count: usize) -> RelationshipErrorKind {
    if count == 0 {
        RelationshipErrorKind::NoCandidate
    } else {
        RelationshipErrorKind::MultipleCandidates
    }
}

impl Builder {
    pub(crate) fn require_metadata(&self) -> Result<Arc<MetadataDatabase>> {
        self.metadata
            .clone()
            .ok_or_else(|| Error::config("No metadata has been attached to the builder"))
    }

    /// Catalog entry of a table in this builder, or `UnknownTable`.
    pub(crate) fn require_table_metadata(&self, table: TableId) -> Result<Arc<MetadataTable>> {
        self.require_metadata()?;
        self.table_metadata(table).ok_or_else(|| {
            Error::unknown_table(self.tables[table.0].full_name(), LookupScope::Catalog)
        })
    }

    /// Join `table` to `from` through the foreign key on `table` that
    /// references the primary key of `from`.
    ///
    /// `from` must have a single-column primary key.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn join_table(
        &mut self,
        from: TableId,
        table: &str,
        schema: Option<&str>,
        join_type: JoinType,
    ) -> Result<JoinId> {
        let metadata = self.require_metadata()?;
        let source = self.require_table_metadata(from)?;
        if source.primary_key.len() != 1 {
            return Err(relationship_error(
                RelationshipErrorKind::CompositeKey,
                &source,
                &source.primary_key.join(","),
                Some(table.to_string()),
                0,
                "Only tables with one primary key field is supported".to_string(),
            ));
        }
        let column = source.primary_key[0].clone();
        let key = format!("{}.{}", schema.unwrap_or(&self.config.default_schema), table);
        let target = metadata
            .find_table_in(&key, &self.config.default_schema)
            .cloned()
            .ok_or_else(|| Error::unknown_table(key.clone(), LookupScope::Catalog))?;
        self.link_tables(from, &source, &target, &column, join_type, false)
    }

    /// Join the table referenced by the foreign key column `column` of `from`.
    ///
    /// The column's include columns are added to the joined table's select
    /// list.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn join_column(&mut self, from: TableId, column: &str, join_type: JoinType) -> Result<JoinId> {
        let metadata = self.require_metadata()?;
        let source = self.require_table_metadata(from)?;
        let from_column = source.get_column(column).cloned().ok_or_else(|| {
            Error::unknown_column(Some(&source.full_name()), column, LookupScope::Catalog)
        })?;

        let keys: Vec<&MetadataForeignKey> = source.find_foreign_keys(&from_column.name, None).collect();
        if keys.len() != 1 {
            let (kind, message) = match keys.len() {
                0 if !source.is_primary_key(&from_column.name) => (
                    RelationshipErrorKind::NotAKey,
                    format!(
                        "The Column '{}' in the table '{}' must be a foreign key or primary key",
                        from_column.name,
                        source.full_name()
                    ),
                ),
                0 => (
                    RelationshipErrorKind::NoCandidate,
                    format!("The Field {} does not point to any table", from_column.name),
                ),
                _ => (
                    RelationshipErrorKind::MultipleCandidates,
                    format!("The Field {} points to more than one table", from_column.name),
                ),
            };
            return Err(relationship_error(kind, &source, &from_column.name, None, keys.len(), message));
        }

        let referenced = keys[0].referenced_full_name();
        let target = metadata
            .find_table_in(&referenced, &self.config.default_schema)
            .cloned()
            .ok_or_else(|| Error::unknown_table(referenced.clone(), LookupScope::Catalog))?;
        let join = self.link_tables(from, &source, &target, &from_column.name, join_type, true)?;

        let to = self.join_target(join);
        for include in &from_column.include_columns {
            let (name, alias) = match include.split_once('=') {
                Some((name, alias)) if !name.is_empty() => (name.to_string(), alias.to_string()),
                _ => (include.clone(), format!("{}_{}", from_column.name, include)),
            };
            self.add_column(to, &name, Some(&alias));
        }
        Ok(join)
    }

    /// Join through `column`: LEFT OUTER when it is nullable, INNER otherwise.
    pub fn auto_join(&mut self, from: TableId, column: &str) -> Result<JoinId> {
        let source = self.require_table_metadata(from)?;
        let nullable = source
            .get_column(column)
            .map(|c| c.nullable)
            .ok_or_else(|| Error::unknown_column(Some(&source.full_name()), column, LookupScope::Catalog))?;
        let join_type = if nullable {
            JoinType::LeftOuter
        } else {
            JoinType::Inner
        };
        self.join_column(from, column, join_type)
    }

    fn link_tables(
        &mut self,
        from: TableId,
        source: &MetadataTable,
        target: &MetadataTable,
        column: &str,
        join_type: JoinType,
        prefer_foreign_key: bool,
    ) -> Result<JoinId> {
        let is_pk = source.is_primary_key(column);
        let is_fk = source.is_foreign_key(column);
        let target_name = target.full_name();

        if is_pk && (!is_fk || !prefer_foreign_key) {
            let candidates: Vec<&MetadataForeignKey> = target
                .foreign_keys
                .iter()
                .filter(|fk| {
                    fk.referenced_table.eq_ignore_ascii_case(&source.name)
                        && fk.referenced_schema.eq_ignore_ascii_case(&source.schema)
                        && fk
                            .references
                            .iter()
                            .any(|r| r.referenced_column.eq_ignore_ascii_case(column))
                })
                .collect();
            if candidates.len() != 1 {
                return Err(relationship_error(
                    count_kind(candidates.len()),
                    source,
                    column,
                    Some(target_name.clone()),
                    candidates.len(),
                    format!(
                        "The column '{}' is referenced by {} keys in the table {}. Expected 1. Make the join manually",
                        column,
                        candidates.len(),
                        target_name
                    ),
                ));
            }
            let references = candidates[0].references.clone();
            let join = self.add_resolved_join(join_type, from, target);
            for reference in &references {
                match reference.literal() {
                    Some(literal) => {
                        self.join_value_on(
                            join,
                            from,
                            &reference.referenced_column,
                            Operator::Equal,
                            literal_segment(literal),
                        );
                    }
                    None => {
                        self.and_on(join, &reference.referenced_column, Operator::Equal, &reference.column);
                    }
                }
            }
            tracing::debug!(
                table = %source.full_name(),
                column,
                target = %target_name,
                conditions = references.len(),
                "joined on referencing key"
            );
            return Ok(join);
        }

        if is_fk {
            let candidates: Vec<&MetadataForeignKey> =
                source.find_foreign_keys(column, Some(&target.name)).collect();
            if candidates.len() != 1 {
                return Err(relationship_error(
                    count_kind(candidates.len()),
                    source,
                    column,
                    Some(target_name.clone()),
                    candidates.len(),
                    format!(
                        "The column '{}' resolves to {} keys in the table {}. Expected 1. Make the join manually",
                        column,
                        candidates.len(),
                        target_name
                    ),
                ));
            }
            let references = candidates[0].references.clone();
            let join = self.add_resolved_join(join_type, from, target);
            for reference in &references {
                match reference.literal() {
                    Some(literal) => {
                        self.join_value(join, &reference.referenced_column, Operator::Equal, literal_segment(literal));
                    }
                    None => {
                        self.and_on(join, &reference.column, Operator::Equal, &reference.referenced_column);
                    }
                }
            }
            tracing::debug!(
                table = %source.full_name(),
                column,
                target = %target_name,
                conditions = references.len(),
                "joined on foreign key"
            );
            return Ok(join);
        }

        Err(relationship_error(
            RelationshipErrorKind::NotAKey,
            source,
            column,
            Some(target_name),
            0,
            format!(
                "The Column '{}' in the table '{}' must be a foreign key or primary key",
                column,
                source.full_name()
            ),
        ))
    }

    /// Add the target of a resolved join under a fresh positional alias. The
    /// schema is omitted when it is the default one.
    fn add_resolved_join(&mut self, join_type: JoinType, from: TableId, target: &MetadataTable) -> JoinId {
        let alias = format!("t{}", self.tables().count());
        let schema = (!target.schema.is_empty() && !self.config.is_default_schema(&target.schema))
            .then_some(target.schema.as_str());
        self.add_join(join_type, from, &target.name, Some(&alias), schema)
    }
}
