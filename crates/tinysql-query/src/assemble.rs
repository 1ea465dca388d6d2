//! Result assembly.
//!
//! A compiled batch returns one flat result set per builder, in pre-order:
//! the root first, then each sub-query followed by its own sub-queries. The
//! assembler turns those sets back into a tree of [`ResultTable`]s, handing
//! each child row to the one parent row whose key it matches.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::builder::Builder;
use crate::literal::SORTABLE_DATE;
use tinysql_core::{
    DateHandling, Error, MetadataTable, Result, ResultSet, ResultTable, RowData, SqlConfig, Value,
};

/// Apply the configured date policy to one value.
fn convert_value(value: Value, config: &SqlConfig) -> Value {
    if config.date_handling == DateHandling::Raw {
        return value;
    }
    let Some(datetime) = value.as_datetime() else {
        return value;
    };
    match config.date_handling {
        DateHandling::Raw => value,
        DateHandling::ToString => Value::Text(datetime.format(SORTABLE_DATE).to_string()),
        DateHandling::Localized => Value::Text(config.culture.format_general_date(&datetime)),
    }
}

fn materialize(set: ResultSet, table: Option<&Arc<MetadataTable>>, config: &SqlConfig) -> Vec<RowData> {
    set.into_rows()
        .into_iter()
        .map(|row| {
            let mut data = match table {
                Some(meta) => RowData::for_table(Arc::clone(meta)),
                None => RowData::new(),
            };
            let columns = row.column_info();
            for (name, value) in columns.names().iter().zip(row.into_values()) {
                data.load(name, convert_value(value, config));
            }
            data
        })
        .collect()
}

fn compare_rows(a: &RowData, b: &RowData, columns: &[String]) -> Ordering {
    for column in columns {
        let ordering = match (a.get(column), b.get(column)) {
            (Some(x), Some(y)) => x.sql_cmp(y).unwrap_or(Ordering::Equal),
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// Name a child table is attached under.
fn child_name(builder: &Builder, meta: Option<&Arc<MetadataTable>>) -> String {
    let name = match (&builder.name, meta) {
        (Some(name), _) => name.clone(),
        (None, Some(meta)) => format!("{}List", meta.name),
        (None, None) => {
            let table = builder
                .base_table()
                .map(|id| builder.table(id).name().to_string())
                .unwrap_or_default();
            format!("{}List", table)
        }
    };
    name.replace(['.', ' ', '-'], "")
}

impl Builder {
    /// Number of result sets the compiled batch produces.
    pub fn result_set_count(&self) -> usize {
        1 + self
            .sub_queries
            .iter()
            .map(|(_, sub)| sub.result_set_count())
            .sum::<usize>()
    }

    /// Assemble the result sets of this builder's batch into a row tree.
    pub fn assemble(&self, sets: Vec<ResultSet>) -> Result<ResultTable> {
        self.assemble_with(sets, None)
    }

    /// Like [`Builder::assemble`], ordering child rows by `hierarchy_field`
    /// instead of their primary key.
    #[tracing::instrument(level = "debug", skip(self, sets), fields(sets = sets.len()))]
    pub fn assemble_with(&self, sets: Vec<ResultSet>, hierarchy_field: Option<&str>) -> Result<ResultTable> {
        let expected = self.result_set_count();
        if sets.len() != expected {
            return Err(Error::config(format!(
                "The query produces {} result sets but {} were returned",
                expected,
                sets.len()
            )));
        }
        let mut sets = sets.into_iter();
        let Some(first) = sets.next() else {
            return Err(Error::config("No result sets were returned"));
        };

        let meta = self.base_metadata();
        let name = match &self.name {
            Some(name) => name.clone(),
            None => self
                .base_table()
                .map(|id| self.table(id).name().to_string())
                .unwrap_or_default(),
        };
        let mut root = ResultTable::new(name);
        root.table = meta.clone();
        root.rows = materialize(first, meta.as_ref(), &self.config);
        tracing::debug!(rows = root.rows.len(), "materialized root rows");

        let mut parents: Vec<&mut RowData> = root.rows.iter_mut().collect();
        self.attach_children(&mut parents, meta.as_ref(), &mut sets, hierarchy_field)?;
        Ok(root)
    }

    fn attach_children(
        &self,
        parents: &mut [&mut RowData],
        parent_meta: Option<&Arc<MetadataTable>>,
        sets: &mut std::vec::IntoIter<ResultSet>,
        hierarchy_field: Option<&str>,
    ) -> Result<()> {
        for (_, child) in &self.sub_queries {
            let set = sets
                .next()
                .ok_or_else(|| Error::config("Fewer result sets were returned than the query produces"))?;
            let child_meta = child.base_metadata();
            let (parent_columns, child_columns) = match &child.link {
                Some(link) => (vec![link.parent_column.clone()], vec![link.child_column.clone()]),
                None => {
                    let meta = parent_meta.ok_or_else(|| {
                        Error::config("The query contains sub-queries but no metadata has been specified")
                    })?;
                    (meta.primary_key.clone(), meta.primary_key.clone())
                }
            };
            if parent_columns.is_empty() {
                return Err(Error::config(
                    "The parent table has no primary key to match sub-query rows on",
                ));
            }
            let sort_columns: Vec<String> = match (hierarchy_field, &child_meta) {
                (Some(field), _) => vec![field.to_string()],
                (None, Some(meta)) if !meta.primary_key.is_empty() => meta.primary_key.clone(),
                _ => child_columns.clone(),
            };
            let name = child_name(child, child_meta.as_ref());

            let mut pool: Vec<Option<RowData>> = materialize(set, child_meta.as_ref(), &self.config)
                .into_iter()
                .map(Some)
                .collect();
            let total = pool.len();

            let mut groups: Vec<Vec<RowData>> = Vec::with_capacity(parents.len());
            for parent in parents.iter() {
                let key: Vec<&Value> = parent_columns
                    .iter()
                    .filter_map(|c| parent.get(c))
                    .filter(|v| !v.is_null())
                    .collect();
                let mut matched = Vec::new();
                if key.len() == parent_columns.len() {
                    for slot in pool.iter_mut() {
                        let hit = slot.as_ref().is_some_and(|row| {
                            child_columns.iter().zip(&key).all(|(column, expected)| {
                                row.get(column)
                                    .is_some_and(|v| !v.is_null() && v.sql_eq(expected))
                            })
                        });
                        if hit {
                            matched.extend(slot.take());
                        }
                    }
                }
                matched.sort_by(|a, b| compare_rows(a, b, &sort_columns));
                groups.push(matched);
            }

            let dropped = pool.iter().filter(|slot| slot.is_some()).count();
            if dropped > 0 {
                tracing::debug!(child = %name, dropped, total, "child rows matched no parent");
            }

            {
                let mut rows: Vec<&mut RowData> = groups.iter_mut().flat_map(|g| g.iter_mut()).collect();
                child.attach_children(&mut rows, child_meta.as_ref(), sets, hierarchy_field)?;
            }

            for (parent, rows) in parents.iter_mut().zip(groups) {
                let mut table = ResultTable::new(name.as_str());
                table.table = child_meta.clone();
                table.rows = rows;
                parent.attach(&name, table);
            }
        }
        Ok(())
    }
}
