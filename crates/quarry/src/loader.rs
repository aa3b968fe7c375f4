//! Follow-up queries that load relations, relation ids and relation counts
//! for a whole batch of owners at once.
//!
//! Every loader selects the owner side of the relation under synthetic
//! `owner_<n>` columns and groups the result rows by them, so one query
//! serves all owners of a batch.

mod count;
pub(crate) use count::{load_relation_counts, RelationCounts};

mod id;
pub(crate) use id::{load_relation_ids, RelationIds};

mod value;
pub(crate) use value::ValueLoader;

use crate::{
    driver::Row,
    schema::{ColumnMetadata, EntityMetadata, RelationMetadata},
    Entity, Error, Key, Record, Registry, Result, Serializer, Value,
};

use std::collections::HashSet;

/// A table holding one row per (owner, related) pair.
struct PairTable<'a> {
    entity: &'a EntityMetadata,

    /// Columns of the table identifying the owner
    owner_side: Vec<&'a ColumnMetadata>,

    /// Columns of the table identifying the related entity
    target_side: Vec<&'a ColumnMetadata>,

    /// Owner columns matched by `owner_side`, in the same order
    owner_columns: Vec<&'a ColumnMetadata>,
}

impl<'a> PairTable<'a> {
    /// The junction of a many-to-many relation, the target table of an
    /// inverse relation or the owner's own table for an owning to-one
    /// relation.
    fn new(registry: &'a Registry, relation: &'a RelationMetadata) -> Result<PairTable<'a>> {
        if relation.is_many_to_many() {
            let entity = registry.junction(relation).ok_or_else(|| {
                Error::invalid_statement(format!(
                    "many-to-many relation `{}` has no junction table",
                    relation.property_path
                ))
            })?;
            let owner_side: Vec<_> = relation
                .join_columns
                .iter()
                .map(|id| registry.column(*id))
                .collect();

            return Ok(PairTable {
                entity,
                owner_columns: referenced_columns(registry, &owner_side)?,
                owner_side,
                target_side: relation
                    .inverse_join_columns
                    .iter()
                    .map(|id| registry.column(*id))
                    .collect(),
            });
        }

        if relation.is_owning_to_one() {
            let entity = registry.entity(relation.id.entity);
            let primary: Vec<_> = entity.primary_columns().collect();

            return Ok(PairTable {
                entity,
                owner_side: primary.clone(),
                target_side: registry.owning_join_columns(relation),
                owner_columns: primary,
            });
        }

        let inverse = inverse_of(registry, relation)?;
        let owner_side = registry.owning_join_columns(inverse);

        Ok(PairTable {
            entity: registry.entity(relation.target),
            owner_columns: referenced_columns(registry, &owner_side)?,
            owner_side,
            target_side: registry.entity(relation.target).primary_columns().collect(),
        })
    }
}

fn inverse_of<'a>(
    registry: &'a Registry,
    relation: &RelationMetadata,
) -> Result<&'a RelationMetadata> {
    registry.inverse(relation).ok_or_else(|| {
        Error::invalid_statement(format!(
            "relation `{}` has no owning side to load through",
            relation.property_path
        ))
    })
}

fn referenced_columns<'a>(
    registry: &'a Registry,
    columns: &[&ColumnMetadata],
) -> Result<Vec<&'a ColumnMetadata>> {
    columns
        .iter()
        .map(|column| {
            registry.referenced_column(column).ok_or_else(|| {
                Error::invalid_statement(format!(
                    "join column `{}` does not reference another column",
                    column.database_name
                ))
            })
        })
        .collect()
}

/// Name of the synthetic column carrying the `index`th owner key component.
fn owner_column(index: usize) -> String {
    format!("owner_{index}")
}

/// Restricts `alias` to rows whose `paths` match one of `keys`.
///
/// A single column becomes `IN (:...owners)`; composite keys become an OR of
/// AND-ed equalities, one per key.
fn key_filter(alias: &str, paths: &[&str], keys: &[Vec<Value>]) -> (String, Record) {
    let mut params = Record::new();

    if let [path] = paths {
        let values = keys.iter().map(|key| key[0].clone()).collect();
        params.insert("owners".to_string(), Value::List(values));
        return (format!("{alias}.{path} IN (:...owners)"), params);
    }

    let mut ors = Vec::with_capacity(keys.len());
    for (i, key) in keys.iter().enumerate() {
        let mut ands = Vec::with_capacity(paths.len());
        for (j, (path, value)) in paths.iter().zip(key).enumerate() {
            let name = format!("owners_{i}_{j}");
            ands.push(format!("{alias}.{path} = :{name}"));
            params.insert(name, value.clone());
        }
        ors.push(format!("({})", ands.join(" AND ")));
    }

    (ors.join(" OR "), params)
}

/// Distinct key tuples in first-seen order. A tuple with a null component
/// can never match and is dropped.
fn distinct_keys(tuples: impl IntoIterator<Item = Vec<Value>>) -> Vec<Vec<Value>> {
    let mut seen = HashSet::new();

    tuples
        .into_iter()
        .filter(|tuple| {
            let key = Key::new(tuple);
            !key.has_null() && seen.insert(key)
        })
        .collect()
}

/// The owner key of a loader result row.
fn row_key(row: &Row, len: usize) -> Result<Key> {
    let values = (0..len)
        .map(|index| {
            let name = owner_column(index);
            row.get(&name).ok_or_else(|| {
                Error::invalid_result(format!("loader row is missing column `{name}`"))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Key::new(values))
}

/// Values of `columns` for `alias` in a row of the primary query, or `None`
/// if the row does not carry all of them.
fn row_values(
    serializer: &Serializer<'_>,
    row: &Row,
    alias: &str,
    columns: &[&ColumnMetadata],
) -> Option<Vec<Value>> {
    columns
        .iter()
        .map(|column| {
            row.get(&serializer.column_alias(alias, &column.database_name))
                .cloned()
        })
        .collect()
}

/// Values of `columns` in a materialized entity, converted back to their
/// stored form.
fn entity_values(entity: &Entity, columns: &[&ColumnMetadata]) -> Result<Vec<Value>> {
    columns
        .iter()
        .map(|column| {
            let value = entity
                .get_path(&column.property_path)
                .cloned()
                .unwrap_or_default();

            match &column.transformer {
                Some(transformer) if !value.is_null() => transformer.to_db(value),
                _ => Ok(value),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_column_keys_spread_one_parameter() {
        let keys = vec![vec![Value::I64(1)], vec![Value::I64(2)]];
        let (sql, params) = key_filter("post", &["authorId"], &keys);

        assert_eq!(sql, "post.authorId IN (:...owners)");
        assert_eq!(
            params.get("owners"),
            Some(&Value::List(vec![Value::I64(1), Value::I64(2)]))
        );
    }

    #[test]
    fn composite_keys_or_their_equalities() {
        let keys = vec![
            vec![Value::I64(1), Value::from("a")],
            vec![Value::I64(2), Value::from("b")],
        ];
        let (sql, params) = key_filter("m", &["org", "seat"], &keys);

        assert_eq!(
            sql,
            "(m.org = :owners_0_0 AND m.seat = :owners_0_1) OR (m.org = :owners_1_0 AND m.seat = :owners_1_1)"
        );
        assert_eq!(params.len(), 4);
        assert_eq!(params.get("owners_1_1"), Some(&Value::from("b")));
    }

    #[test]
    fn duplicate_and_null_keys_are_dropped() {
        let keys = distinct_keys(vec![
            vec![Value::I64(1)],
            vec![Value::Null],
            vec![Value::I32(1)],
            vec![Value::I64(2)],
        ]);

        assert_eq!(keys, vec![vec![Value::I64(1)], vec![Value::I64(2)]]);
    }

    #[test]
    fn loader_rows_must_carry_their_owner() {
        let mut row = Row::new();
        row.insert("owner_0".to_string(), Value::I64(7));

        assert_eq!(row_key(&row, 1).unwrap(), Key::single(&Value::I64(7)));
        assert!(row_key(&row, 2).unwrap_err().is_invalid_result());
    }
}
