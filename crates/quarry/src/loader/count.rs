use super::{distinct_keys, key_filter, owner_column, row_key, row_values, PairTable};
use crate::{
    driver::Rows,
    schema::ColumnId,
    stmt::RelationCountAttribute,
    Db, Error, Key, Result, Value,
};

use std::collections::HashMap;

/// Number of related rows of each owner of a `load_relation_count_and_map`
/// attribute. Owners missing from `counts` have none.
#[derive(Debug)]
pub(crate) struct RelationCounts {
    pub(crate) attribute: RelationCountAttribute,

    /// Columns of the owning alias forming the keys of `counts`
    pub(crate) owner_columns: Vec<ColumnId>,

    pub(crate) counts: HashMap<Key, i64>,
}

const ALIAS: &str = "relation_counts";

pub(crate) async fn load_relation_counts(
    db: &Db,
    attribute: &RelationCountAttribute,
    rows: &Rows,
) -> Result<RelationCounts> {
    let registry = db.registry();
    let serializer = db.serializer();
    let relation = registry.relation(attribute.relation);
    let table = PairTable::new(registry, relation)?;
    let parent = attribute.parent_alias.as_str();

    let keys = distinct_keys(
        rows.iter()
            .filter_map(|row| row_values(&serializer, row, parent, &table.owner_columns)),
    );
    let mut counts: HashMap<Key, i64> = HashMap::new();

    if !keys.is_empty() {
        let paths: Vec<&str> = table
            .owner_side
            .iter()
            .map(|column| column.property_path.as_str())
            .collect();

        let mut select = db.select().from(&table.entity.name, ALIAS);
        for (index, path) in paths.iter().enumerate() {
            select = select
                .add_select_as(format!("{ALIAS}.{path}"), owner_column(index))
                .add_group_by(format!("{ALIAS}.{path}"));
        }

        let (filter, params) = key_filter(ALIAS, &paths, &keys);
        let query = select
            .add_select_as("COUNT(*)", "cnt")
            .where_(filter)
            .set_parameters(params)
            .build()?;

        for row in db.raw_rows(&query).await? {
            let owner = row_key(&row, paths.len())?;
            let count = row.get("cnt").and_then(Value::as_i64).ok_or_else(|| {
                Error::invalid_result("relation count row is missing a numeric `cnt`")
            })?;

            *counts.entry(owner).or_default() += count;
        }
    }

    tracing::trace!(
        alias = parent,
        relation = %relation.property_path,
        owners = counts.len(),
        "loaded relation counts"
    );

    Ok(RelationCounts {
        attribute: attribute.clone(),
        owner_columns: table.owner_columns.iter().map(|column| column.id).collect(),
        counts,
    })
}

