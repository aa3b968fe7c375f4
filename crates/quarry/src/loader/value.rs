use super::{
    distinct_keys, entity_values, inverse_of, key_filter, owner_column, referenced_columns, row_key,
};
use crate::{
    driver::Rows,
    schema::{ColumnMetadata, RelationId, RelationMetadata},
    stmt::SelectBuilder,
    Db, Entity, Error, Key, Materializer, Result, Value,
};

use std::collections::HashMap;

/// Loads the related entities of a batch of owners with a single query.
pub(crate) struct ValueLoader<'a> {
    db: &'a Db,
    relation: &'a RelationMetadata,
}

/// The query selecting related rows, before owners are filtered in.
struct Plan<'a> {
    select: SelectBuilder<'a>,

    /// Alias the owner keys are matched against
    key_alias: String,

    /// Property paths under `key_alias` holding the owner key
    key_paths: Vec<&'a str>,

    /// Owner properties holding the key, in `key_paths` order
    owner_columns: Vec<&'a ColumnMetadata>,
}

impl<'a> ValueLoader<'a> {
    pub(crate) fn new(db: &'a Db, relation: RelationId) -> ValueLoader<'a> {
        ValueLoader {
            db,
            relation: db.registry().relation(relation),
        }
    }

    /// Returns one value per owner, in owner order: the related entity or
    /// null for to-one relations, a list of entities for to-many ones.
    pub(crate) async fn load(&self, owners: &[Entity]) -> Result<Vec<Value>> {
        let Plan {
            mut select,
            key_alias,
            key_paths,
            owner_columns,
        } = self.plan()?;

        let owner_keys = owners
            .iter()
            .map(|owner| entity_values(owner, &owner_columns))
            .collect::<Result<Vec<_>>>()?;
        let keys = distinct_keys(owner_keys.iter().cloned());

        if keys.is_empty() {
            return Ok(owners.iter().map(|_| self.collect(vec![])).collect());
        }

        for (index, path) in key_paths.iter().enumerate() {
            select = select.add_select_as(format!("{key_alias}.{path}"), owner_column(index));
        }

        let (filter, params) = key_filter(&key_alias, &key_paths, &keys);
        let expr = select.where_(filter).set_parameters(params).build()?;
        let rows = self.db.raw_rows(&expr).await?;

        tracing::trace!(
            relation = %self.relation.property_path,
            owners = owners.len(),
            rows = rows.len(),
            "loaded relation"
        );

        let mut groups: HashMap<Key, Rows> = HashMap::new();
        for row in rows {
            groups.entry(row_key(&row, key_paths.len())?).or_default().push(row);
        }

        let serializer = self.db.serializer();
        let materializer = Materializer::new(&serializer, &expr);
        let alias = expr.main_alias()?;

        owner_keys
            .iter()
            .map(|key| {
                let entities = match groups.get(&Key::new(key)) {
                    Some(rows) => materializer.transform(rows, alias)?,
                    None => vec![],
                };
                Ok(self.collect(entities))
            })
            .collect()
    }

    fn collect(&self, entities: Vec<Entity>) -> Value {
        if self.relation.is_to_one() {
            entities.into_iter().next().map(Value::from).unwrap_or(Value::Null)
        } else {
            Value::List(entities.into_iter().map(Value::from).collect())
        }
    }

    fn plan(&self) -> Result<Plan<'a>> {
        let registry = self.db.registry();
        let relation = self.relation;
        let target = registry.entity(relation.target);
        let alias = relation.property_name.as_str();
        let select = self.db.select().select(alias).from(&target.name, alias);

        // Related rows reach their owner through the junction
        if relation.is_many_to_many() {
            let junction = registry.junction(relation).ok_or_else(|| {
                Error::invalid_statement(format!(
                    "many-to-many relation `{}` has no junction table",
                    relation.property_path
                ))
            })?;
            let junction_alias = format!("{alias}_junction");

            let target_side: Vec<_> = relation
                .inverse_join_columns
                .iter()
                .map(|id| registry.column(*id))
                .collect();
            let on = target_side
                .iter()
                .zip(referenced_columns(registry, &target_side)?)
                .map(|(column, referenced)| {
                    format!(
                        "{junction_alias}.{} = {alias}.{}",
                        column.property_path, referenced.property_path
                    )
                })
                .collect::<Vec<_>>()
                .join(" AND ");

            let owner_side: Vec<_> = relation
                .join_columns
                .iter()
                .map(|id| registry.column(*id))
                .collect();

            return Ok(Plan {
                select: select.inner_join_on(&junction.name, &junction_alias, on),
                key_paths: owner_side.iter().map(|c| c.property_path.as_str()).collect(),
                owner_columns: referenced_columns(registry, &owner_side)?,
                key_alias: junction_alias,
            });
        }

        // The foreign key lives on the owner, so the owner table is joined
        // back in to learn which owner each target belongs to
        if relation.is_owning_to_one() {
            let owner = registry.entity(relation.id.entity);
            let owner_alias = format!("{alias}_owner");
            let foreign_keys = registry.owning_join_columns(relation);

            let on = foreign_keys
                .iter()
                .zip(referenced_columns(registry, &foreign_keys)?)
                .map(|(column, referenced)| {
                    format!(
                        "{owner_alias}.{} = {alias}.{}",
                        column.property_path, referenced.property_path
                    )
                })
                .collect::<Vec<_>>()
                .join(" AND ");

            let primary: Vec<_> = owner.primary_columns().collect();
            if primary.is_empty() {
                return Err(Error::invalid_statement(format!(
                    "`{}` has no primary key to correlate `{}` with",
                    owner.name, relation.property_path
                )));
            }

            return Ok(Plan {
                select: select.inner_join_on(&owner.name, &owner_alias, on),
                key_paths: primary.iter().map(|c| c.property_path.as_str()).collect(),
                owner_columns: primary,
                key_alias: owner_alias,
            });
        }

        let foreign_keys = registry.owning_join_columns(inverse_of(registry, relation)?);

        Ok(Plan {
            select,
            key_alias: alias.to_string(),
            key_paths: foreign_keys.iter().map(|c| c.property_path.as_str()).collect(),
            owner_columns: referenced_columns(registry, &foreign_keys)?,
        })
    }
}
