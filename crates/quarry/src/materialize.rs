//! Turns the flat rows of a select into entities.

use crate::{
    driver::Row,
    loader::{RelationCounts, RelationIds},
    schema::{ColumnId, EntityMetadata},
    stmt::{Alias, QueryExpression},
    Entity, Error, Key, LazyRelation, Registry, Result, Serializer, Value,
};

use indexmap::IndexMap;
use std::cmp::Reverse;

/// Builds entities for an alias of a query from the rows the query
/// returned.
///
/// Rows are grouped by the primary key of the alias, so joined to-many
/// relations that repeat the owner row collapse into one entity holding a
/// list.
pub struct Materializer<'a> {
    serializer: &'a Serializer<'a>,
    expr: &'a QueryExpression,
    relation_ids: &'a [RelationIds],
    relation_counts: &'a [RelationCounts],
}

impl<'a> Materializer<'a> {
    /// `serializer` must be the one that compiled `expr`; it knows the
    /// result column names.
    pub fn new(serializer: &'a Serializer<'a>, expr: &'a QueryExpression) -> Materializer<'a> {
        Materializer {
            serializer,
            expr,
            relation_ids: &[],
            relation_counts: &[],
        }
    }

    pub(crate) fn relation_ids(mut self, relation_ids: &'a [RelationIds]) -> Self {
        self.relation_ids = relation_ids;
        self
    }

    pub(crate) fn relation_counts(mut self, relation_counts: &'a [RelationCounts]) -> Self {
        self.relation_counts = relation_counts;
        self
    }

    pub fn transform(&self, rows: &[Row], alias: &Alias) -> Result<Vec<Entity>> {
        let rows: Vec<&Row> = rows.iter().collect();
        self.transform_rows(&rows, alias)
    }

    fn registry(&self) -> &'a Registry {
        self.serializer.registry()
    }

    fn transform_rows(&self, rows: &[&Row], alias: &Alias) -> Result<Vec<Entity>> {
        let entity = alias.entity().ok_or_else(|| {
            Error::invalid_statement(format!(
                "alias `{}` is not bound to an entity and cannot be materialized",
                alias.name
            ))
        })?;
        let metadata = self.registry().entity(entity);

        let groups = self.group(rows, alias, metadata);
        let mut entities = Vec::with_capacity(groups.len());

        for group in groups.values() {
            if let Some(entity) = self.transform_group(group, alias, metadata)? {
                entities.push(entity);
            }
        }

        tracing::trace!(
            alias = %alias.name,
            rows = rows.len(),
            groups = groups.len(),
            entities = entities.len(),
            "materialized rows"
        );

        Ok(entities)
    }

    /// Groups rows by the primary key of the alias, in first-seen order.
    /// Views have no key of their own and group by every column. Rows where
    /// the whole key is null belong to no entity.
    fn group<'r>(
        &self,
        rows: &[&'r Row],
        alias: &Alias,
        metadata: &EntityMetadata,
    ) -> IndexMap<Key, Vec<&'r Row>> {
        let mut columns: Vec<_> = metadata.primary_columns().collect();
        if metadata.is_view() || columns.is_empty() {
            columns = metadata.columns.iter().collect();
        }

        let names: Vec<String> = columns
            .iter()
            .map(|column| self.column_alias(alias, &column.database_name))
            .collect();

        let mut groups: IndexMap<Key, Vec<&Row>> = IndexMap::new();

        for &row in rows {
            let values: Vec<&Value> = names
                .iter()
                .map(|name| row.get(name).unwrap_or(&Value::Null))
                .collect();

            if values.iter().all(|value| value.is_null()) {
                continue;
            }

            groups.entry(Key::new(values)).or_default().push(row);
        }

        groups
    }

    fn transform_group(
        &self,
        rows: &[&Row],
        alias: &Alias,
        metadata: &'a EntityMetadata,
    ) -> Result<Option<Entity>> {
        let metadata = self.resolve_subtype(rows[0], alias, metadata);
        let mut entity = Entity::new(metadata.id);

        let has_columns = self.hydrate_columns(&mut entity, rows[0], alias, metadata)?;
        let has_joins = self.hydrate_joins(&mut entity, rows, alias, metadata)?;
        let has_ids = self.hydrate_relation_ids(&mut entity, rows[0], alias, metadata);
        let has_counts = self.hydrate_relation_counts(&mut entity, rows[0], alias, metadata);

        let has_relations = has_joins || has_ids || has_counts;
        if !has_columns && !(has_relations && metadata.has_only_virtual_primary_columns()) {
            return Ok(None);
        }

        for relation in metadata.relations.iter().filter(|relation| relation.lazy) {
            if entity.get_path(&relation.property_path).is_none() {
                entity.set_path(
                    &relation.property_path,
                    Value::Lazy(LazyRelation::new(relation.id)),
                );
            }
        }

        Ok(Some(entity))
    }

    /// Picks the subtype named by the row's discriminator value. Unknown
    /// values keep the queried type.
    fn resolve_subtype(
        &self,
        row: &Row,
        alias: &Alias,
        metadata: &'a EntityMetadata,
    ) -> &'a EntityMetadata {
        let Some(column) = metadata.discriminator_column() else {
            return metadata;
        };

        match row.get(&self.column_alias(alias, &column.database_name)) {
            Some(value) if !value.is_null() => self
                .find_subtype(metadata, &value.to_key_string())
                .unwrap_or(metadata),
            _ => metadata,
        }
    }

    fn find_subtype(
        &self,
        metadata: &'a EntityMetadata,
        value: &str,
    ) -> Option<&'a EntityMetadata> {
        if metadata.discriminator_value.as_deref() == Some(value) {
            return Some(metadata);
        }

        metadata
            .children
            .iter()
            .find_map(|child| self.find_subtype(self.registry().entity(*child), value))
    }

    /// Returns `true` if any hydrated column holds a non-null value.
    fn hydrate_columns(
        &self,
        entity: &mut Entity,
        row: &Row,
        alias: &Alias,
        metadata: &EntityMetadata,
    ) -> Result<bool> {
        let registry = self.registry();
        let mut has_data = false;

        for column in metadata.hydrated_columns() {
            // Table-wide copies of subtype columns
            if !registry.inherits_from(metadata.id, column.declared_by) {
                continue;
            }

            if !self.expr.is_property_selected(&alias.name, &column.property_path) {
                continue;
            }

            let Some(value) = row.get(&self.column_alias(alias, &column.database_name)) else {
                continue;
            };

            let value = match &column.transformer {
                Some(transformer) if !value.is_null() => transformer.from_db(value.clone())?,
                _ => value.clone(),
            };

            has_data |= !value.is_null();
            entity.set_path(&column.property_path, value);
        }

        // Innermost first, so an outer object whose children all became
        // null becomes null too
        let mut embeddeds: Vec<_> = metadata.embeddeds.iter().collect();
        embeddeds.sort_by_key(|embedded| Reverse(embedded.property_path.matches('.').count()));

        for embedded in embeddeds {
            if entity
                .get_path(&embedded.property_path)
                .is_some_and(|value| matches!(value, Value::Record(_)) && value.is_empty_record())
            {
                entity.set_path(&embedded.property_path, Value::Null);
            }
        }

        Ok(has_data)
    }

    fn hydrate_joins(
        &self,
        entity: &mut Entity,
        rows: &[&Row],
        alias: &Alias,
        metadata: &EntityMetadata,
    ) -> Result<bool> {
        let registry = self.registry();
        let mut has_data = false;

        for join in &self.expr.joins {
            if !join.selected || join.parent_alias.as_deref() != Some(alias.name.as_str()) {
                continue;
            }

            let relation = join.relation.map(|id| registry.relation(id));

            // A relation of a sibling subtype
            let sibling = relation
                .is_some_and(|relation| !registry.inherits_from(metadata.id, relation.id.entity));
            if sibling {
                continue;
            }

            let (property, many) = match (&join.map_to_property, relation) {
                (Some(property), _) => (property.as_str(), join.map_many),
                (None, Some(relation)) => (relation.property_path.as_str(), relation.is_to_many()),
                (None, None) => continue,
            };

            let targets = self.transform_rows(rows, &join.alias)?;
            let value = if many {
                Value::List(targets.into_iter().map(Value::from).collect())
            } else {
                targets.into_iter().next().map(Value::from).unwrap_or(Value::Null)
            };

            has_data |= !value.is_null();
            entity.set_path(property, value);
        }

        Ok(has_data)
    }

    fn hydrate_relation_ids(
        &self,
        entity: &mut Entity,
        row: &Row,
        alias: &Alias,
        metadata: &EntityMetadata,
    ) -> bool {
        let registry = self.registry();
        let mut has_data = false;

        for loaded in self.relation_ids {
            let relation = registry.relation(loaded.attribute.relation);

            if loaded.attribute.parent_alias != alias.name
                || !registry.inherits_from(metadata.id, relation.id.entity)
            {
                continue;
            }

            let ids = self
                .owner_key(row, alias, &loaded.owner_columns)
                .and_then(|key| loaded.ids.get(&key))
                .cloned()
                .unwrap_or_default();

            let value = if relation.is_to_one() {
                ids.into_iter().next().unwrap_or(Value::Null)
            } else {
                Value::List(ids)
            };

            entity.set_path(&loaded.attribute.property, value);
            has_data = true;
        }

        has_data
    }

    fn hydrate_relation_counts(
        &self,
        entity: &mut Entity,
        row: &Row,
        alias: &Alias,
        metadata: &EntityMetadata,
    ) -> bool {
        let registry = self.registry();
        let mut has_data = false;

        for loaded in self.relation_counts {
            let relation = registry.relation(loaded.attribute.relation);

            if loaded.attribute.parent_alias != alias.name
                || !registry.inherits_from(metadata.id, relation.id.entity)
            {
                continue;
            }

            let count = self
                .owner_key(row, alias, &loaded.owner_columns)
                .and_then(|key| loaded.counts.get(&key))
                .copied()
                .unwrap_or(0);

            entity.set_path(&loaded.attribute.property, Value::I64(count));
            has_data = true;
        }

        has_data
    }

    /// The key a loader result is correlated with, read from the row.
    fn owner_key(&self, row: &Row, alias: &Alias, columns: &[ColumnId]) -> Option<Key> {
        let values = columns
            .iter()
            .map(|id| {
                let column = self.registry().column(*id);
                row.get(&self.column_alias(alias, &column.database_name))
            })
            .collect::<Option<Vec<_>>>()?;

        Some(Key::new(values))
    }

    fn column_alias(&self, alias: &Alias, column: &str) -> String {
        self.serializer.column_alias(&alias.name, column)
    }
}
