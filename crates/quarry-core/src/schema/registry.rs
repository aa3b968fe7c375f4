use super::{
    ColumnId, ColumnMetadata, EmbeddedMetadata, EntityId, EntityMetadata, RelationId,
    RelationMetadata,
};
use crate::{Error, Result};

use indexmap::IndexMap;

/// All entity metadata known to the application.
///
/// Built once, before any query runs, then shared read-only.
#[derive(Debug, Default)]
pub struct Registry {
    pub(super) entities: Vec<EntityMetadata>,

    /// Maps entity names to identifiers
    pub(super) names: IndexMap<String, EntityId>,
}

impl Registry {
    pub fn builder() -> super::Builder {
        super::Builder::new()
    }

    pub fn entity(&self, id: impl Into<EntityId>) -> &EntityMetadata {
        &self.entities[id.into().0]
    }

    pub fn entities(&self) -> impl ExactSizeIterator<Item = &EntityMetadata> + '_ {
        self.entities.iter()
    }

    /// Resolves an entity by name.
    pub fn resolve(&self, name: &str) -> Result<&EntityMetadata> {
        self.names
            .get(name)
            .map(|id| self.entity(*id))
            .ok_or_else(|| Error::entity_not_found(name))
    }

    pub fn column(&self, id: ColumnId) -> &ColumnMetadata {
        self.entity(id.entity).column(id)
    }

    pub fn relation(&self, id: RelationId) -> &RelationMetadata {
        self.entity(id.entity).relation(id.index)
    }

    /// The relation on the other side, if the pair was declared.
    pub fn inverse(&self, relation: &RelationMetadata) -> Option<&RelationMetadata> {
        relation.inverse.map(|id| self.relation(id))
    }

    pub fn referenced_column(&self, column: &ColumnMetadata) -> Option<&ColumnMetadata> {
        column.referenced_column.map(|id| self.column(id))
    }

    pub fn junction(&self, relation: &RelationMetadata) -> Option<&EntityMetadata> {
        relation.junction.map(|id| self.entity(id))
    }

    pub fn find_relation_by_property_path(
        &self,
        entity: impl Into<EntityId>,
        path: &str,
    ) -> Option<&RelationMetadata> {
        self.entity(entity).relation_by_property_path(path)
    }

    pub fn find_column_by_property_path(
        &self,
        entity: impl Into<EntityId>,
        path: &str,
    ) -> Option<&ColumnMetadata> {
        self.entity(entity).column_by_property_path(path)
    }

    pub fn find_embedded_by_property_path(
        &self,
        entity: impl Into<EntityId>,
        path: &str,
    ) -> Option<&EmbeddedMetadata> {
        self.entity(entity).embedded_by_property_path(path)
    }

    /// Returns the columns a property path stands for.
    ///
    /// A column path yields that column; a relation path yields its join
    /// columns, several for a composite key; `relation.referencedProperty`
    /// yields the join column referencing that property.
    pub fn find_columns_by_property_path(
        &self,
        entity: impl Into<EntityId>,
        path: &str,
    ) -> Result<Vec<&ColumnMetadata>> {
        let entity = self.entity(entity);

        if let Some(column) = entity.column_by_property_path(path) {
            return Ok(vec![column]);
        }

        if let Some(relation) = entity.relation_by_property_path(path) {
            let columns = self.owning_join_columns(relation);
            if !columns.is_empty() {
                return Ok(columns);
            }
        }

        if let Some((relation_path, referenced)) = path.rsplit_once('.') {
            if let Some(relation) = entity.relation_by_property_path(relation_path) {
                let found = self
                    .owning_join_columns(relation)
                    .into_iter()
                    .find(|column| {
                        self.referenced_column(column)
                            .is_some_and(|referenced_column| {
                                referenced_column.property_path == referenced
                            })
                    });

                if let Some(column) = found {
                    return Ok(vec![column]);
                }
            }
        }

        Err(Error::property_not_found(&entity.name, path))
    }

    /// Join columns physically stored on `relation`'s own entity.
    ///
    /// Empty for many-to-many relations, whose join columns belong to the
    /// junction, and for the non-owning side of direct relations.
    pub fn owning_join_columns(&self, relation: &RelationMetadata) -> Vec<&ColumnMetadata> {
        if !relation.is_owning_to_one() {
            return vec![];
        }

        relation
            .join_columns
            .iter()
            .map(|id| self.column(*id))
            .collect()
    }

    /// The discriminator values matched by queries against `entity`: its own
    /// value followed by those of all its descendants.
    pub fn discriminator_values(&self, entity: impl Into<EntityId>) -> Vec<String> {
        let entity = self.entity(entity);
        let mut values = vec![];

        if let Some(value) = &entity.discriminator_value {
            values.push(value.clone());
        }

        for child in &entity.children {
            values.extend(self.discriminator_values(*child));
        }

        values
    }

    /// Returns `true` if `entity` is `ancestor` or inherits from it.
    pub fn inherits_from(&self, entity: EntityId, ancestor: EntityId) -> bool {
        let mut current = Some(entity);

        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.entity(id).parent;
        }

        false
    }
}
