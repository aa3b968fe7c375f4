use super::{distinct_keys, key_filter, owner_column, row_key, row_values, PairTable};
use crate::{
    driver::Rows,
    schema::{ColumnId, ColumnMetadata},
    stmt::RelationIdAttribute,
    Db, Error, Key, Record, Result, Value,
};

use std::collections::HashMap;

/// Ids related to each owner of a `load_relation_id_and_map` attribute.
#[derive(Debug)]
pub(crate) struct RelationIds {
    pub(crate) attribute: RelationIdAttribute,

    /// Columns of the owning alias forming the keys of `ids`
    pub(crate) owner_columns: Vec<ColumnId>,

    pub(crate) ids: HashMap<Key, Vec<Value>>,
}

const ALIAS: &str = "relation_ids";

fn id_column(index: usize) -> String {
    format!("id_{index}")
}

/// Collects the related ids of every owner in the primary query's rows.
///
/// Foreign keys selected by the primary query are read from its rows
/// directly; anything else takes one follow-up query.
pub(crate) async fn load_relation_ids(
    db: &Db,
    attribute: &RelationIdAttribute,
    rows: &Rows,
) -> Result<RelationIds> {
    let registry = db.registry();
    let serializer = db.serializer();
    let relation = registry.relation(attribute.relation);
    let table = PairTable::new(registry, relation)?;
    let parent = attribute.parent_alias.as_str();

    // Related ids are keyed by the property they reference
    let id_names: Vec<&str> = table
        .target_side
        .iter()
        .map(|column| {
            registry
                .referenced_column(column)
                .unwrap_or(*column)
                .property_path
                .as_str()
        })
        .collect();

    let mut ids: HashMap<Key, Vec<Value>> = HashMap::new();

    let in_rows = relation.is_owning_to_one()
        && rows
            .first()
            .map_or(true, |row| row_values(&serializer, row, parent, &table.target_side).is_some());

    if in_rows {
        for row in rows {
            let (Some(owner), Some(values)) = (
                row_values(&serializer, row, parent, &table.owner_columns),
                row_values(&serializer, row, parent, &table.target_side),
            ) else {
                continue;
            };

            if let Some(id) = id_value(&id_names, values) {
                ids.entry(Key::new(&owner)).or_insert_with(|| vec![id]);
            }
        }
    } else {
        let keys = distinct_keys(
            rows.iter()
                .filter_map(|row| row_values(&serializer, row, parent, &table.owner_columns)),
        );

        if !keys.is_empty() {
            let owner_paths = paths(&table.owner_side);
            let mut select = db.select().from(&table.entity.name, ALIAS);

            for (index, path) in owner_paths.iter().enumerate() {
                select = select.add_select_as(format!("{ALIAS}.{path}"), owner_column(index));
            }
            for (index, path) in paths(&table.target_side).iter().enumerate() {
                select = select.add_select_as(format!("{ALIAS}.{path}"), id_column(index));
            }

            let (filter, params) = key_filter(ALIAS, &owner_paths, &keys);
            let query = select.where_(filter).set_parameters(params).build()?;

            for row in db.raw_rows(&query).await? {
                let owner = row_key(&row, owner_paths.len())?;
                let values = (0..id_names.len())
                    .map(|index| {
                        let name = id_column(index);
                        row.get(&name).cloned().ok_or_else(|| {
                            Error::invalid_result(format!("relation id row is missing `{name}`"))
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;

                if let Some(id) = id_value(&id_names, values) {
                    ids.entry(owner).or_default().push(id);
                }
            }
        }
    }

    tracing::trace!(
        alias = parent,
        relation = %relation.property_path,
        owners = ids.len(),
        "loaded relation ids"
    );

    Ok(RelationIds {
        attribute: attribute.clone(),
        owner_columns: table.owner_columns.iter().map(|column| column.id).collect(),
        ids,
    })
}

fn paths<'a>(columns: &[&'a ColumnMetadata]) -> Vec<&'a str> {
    columns.iter().map(|column| column.property_path.as_str()).collect()
}

/// A single id column yields its value; composite ids become a record.
/// Ids with a null component do not exist.
fn id_value(names: &[&str], values: Vec<Value>) -> Option<Value> {
    if values.iter().any(Value::is_null) {
        return None;
    }

    if let [value] = &values[..] {
        return Some(value.clone());
    }

    Some(Value::Record(
        names
            .iter()
            .map(|name| name.to_string())
            .zip(values)
            .collect::<Record>(),
    ))
}
