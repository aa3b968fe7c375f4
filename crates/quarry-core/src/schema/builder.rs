mod def;
pub use def::{ColumnDef, EmbeddedDef, EntityDef, JoinColumnDef, JoinTableDef, RelationDef};

use super::{
    ColumnId, ColumnMetadata, DefaultNamingStrategy, EmbeddedMetadata, EntityId, EntityKind,
    EntityMetadata, NamingStrategy, Registry, RelationId, RelationKind, RelationMetadata,
    TablePath,
};
use crate::{Error, Result};

use indexmap::IndexMap;
use std::sync::Arc;

/// Turns entity definitions into a [`Registry`].
#[derive(Debug)]
pub struct Builder {
    entities: Vec<EntityDef>,
    naming: Arc<dyn NamingStrategy>,
}

/// Used to track state during the build process
struct BuildRegistry<'a> {
    naming: &'a dyn NamingStrategy,

    defs: &'a [EntityDef],

    /// Maps entity names to identifiers. Identifiers are reserved before the
    /// metadata is filled in.
    names: IndexMap<String, EntityId>,

    /// Metadata as it is built. Indices match `defs`; junctions follow.
    entities: Vec<EntityMetadata>,

    /// Relation definitions in effect for each entity, inherited ones first.
    /// Positions match the entity's relation list.
    relation_defs: Vec<Vec<RelationSource<'a>>>,
}

#[derive(Clone)]
struct RelationSource<'a> {
    def: &'a RelationDef,
    declared_by: EntityId,
    embedded: Option<usize>,
    path_prefix: String,
}

impl Builder {
    pub fn new() -> Self {
        Self {
            entities: vec![],
            naming: Arc::new(DefaultNamingStrategy),
        }
    }

    pub fn naming(&mut self, naming: impl NamingStrategy + 'static) -> &mut Self {
        self.naming = Arc::new(naming);
        self
    }

    pub fn entity(&mut self, def: EntityDef) -> &mut Self {
        self.entities.push(def);
        self
    }

    pub fn build(&self) -> Result<Registry> {
        let mut cx = BuildRegistry {
            naming: &*self.naming,
            defs: &self.entities,
            names: IndexMap::new(),
            entities: vec![],
            relation_defs: vec![],
        };

        cx.reserve_entities()?;

        // Parents are built before their children so that inherited columns
        // and relations can be copied down.
        let order = cx.inheritance_order()?;

        for id in &order {
            cx.build_columns(*id)?;
        }

        for id in &order {
            cx.build_relations(*id)?;
        }

        cx.pair_inverse_relations()?;
        cx.copy_columns_to_ancestors();

        Ok(cx.finish())
    }
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> BuildRegistry<'a> {
    fn reserve_entities(&mut self) -> Result<()> {
        for (index, def) in self.defs.iter().enumerate() {
            let id = EntityId(index);

            if self.names.insert(def.name.clone(), id).is_some() {
                return Err(Error::invalid_schema(format!(
                    "entity `{}` is defined more than once",
                    def.name
                )));
            }

            self.entities.push(EntityMetadata {
                id,
                name: def.name.clone(),
                table: TablePath::new(String::new()),
                kind: if def.view {
                    EntityKind::View
                } else {
                    EntityKind::Regular
                },
                columns: vec![],
                relations: vec![],
                embeddeds: vec![],
                primary_columns: vec![],
                discriminator_column: None,
                discriminator_value: None,
                delete_date_column: None,
                parent: None,
                children: vec![],
            });
            self.relation_defs.push(vec![]);
        }

        for (index, def) in self.defs.iter().enumerate() {
            if let Some(parent) = &def.parent {
                let parent = self.lookup(parent)?;
                self.entities[index].parent = Some(parent);
                self.entities[parent.0].children.push(EntityId(index));
            }
        }

        Ok(())
    }

    fn inheritance_order(&self) -> Result<Vec<EntityId>> {
        let mut depths = Vec::with_capacity(self.defs.len());

        for index in 0..self.defs.len() {
            let mut depth = 0;
            let mut current = self.entities[index].parent;

            while let Some(parent) = current {
                depth += 1;
                if depth > self.defs.len() {
                    return Err(Error::invalid_schema(format!(
                        "entity `{}` inherits from itself",
                        self.defs[index].name
                    )));
                }
                current = self.entities[parent.0].parent;
            }

            depths.push((depth, EntityId(index)));
        }

        depths.sort_by_key(|(depth, _)| *depth);
        Ok(depths.into_iter().map(|(_, id)| id).collect())
    }

    fn build_columns(&mut self, id: EntityId) -> Result<()> {
        let def = &self.defs[id.0];

        let parent = self.entities[id.0].parent;
        let (table, mut columns, mut embeddeds, mut relation_defs) = match parent {
            Some(parent) => {
                let parent_meta = &self.entities[parent.0];
                let columns = parent_meta
                    .columns
                    .iter()
                    .enumerate()
                    .map(|(index, column)| ColumnMetadata {
                        id: id.column(index),
                        ..column.clone()
                    })
                    .collect();

                (
                    parent_meta.table.clone(),
                    columns,
                    parent_meta.embeddeds.clone(),
                    self.relation_defs[parent.0].clone(),
                )
            }
            None => (
                TablePath {
                    database: def.database.clone(),
                    schema: def.schema.clone(),
                    name: self.naming.table_name(&def.name, def.table.as_deref()),
                },
                vec![],
                vec![],
                vec![],
            ),
        };

        if let Some(discriminator) = &def.discriminator {
            self.push_column(id, &mut columns, discriminator, None, &[], "");
            if let Some(column) = columns.last_mut() {
                column.is_discriminator = true;
            }
        }

        for column in &def.columns {
            self.push_column(id, &mut columns, column, None, &[], "");
        }

        for embedded in &def.embeddeds {
            self.push_embedded(
                id,
                &mut columns,
                &mut embeddeds,
                &mut relation_defs,
                embedded,
                None,
                &[],
                "",
            );
        }

        for relation in &def.relations {
            relation_defs.push(RelationSource {
                def: relation,
                declared_by: id,
                embedded: None,
                path_prefix: String::new(),
            });
        }

        for (index, column) in columns.iter().enumerate() {
            if column.is_virtual {
                continue;
            }

            let duplicate = columns[..index]
                .iter()
                .any(|other| !other.is_virtual && other.property_path == column.property_path);

            if duplicate {
                return Err(Error::invalid_schema(format!(
                    "property `{}` is mapped more than once in `{}`",
                    column.property_path, def.name
                )));
            }
        }

        let has_discriminator = columns.iter().any(|column| column.is_discriminator);

        let entity = &mut self.entities[id.0];
        entity.table = table;
        entity.columns = columns;
        entity.embeddeds = embeddeds;
        if has_discriminator {
            entity.discriminator_value = Some(
                def.discriminator_value
                    .clone()
                    .unwrap_or_else(|| def.name.clone()),
            );
        }
        self.relation_defs[id.0] = relation_defs;

        Ok(())
    }

    fn push_column(
        &self,
        entity: EntityId,
        columns: &mut Vec<ColumnMetadata>,
        def: &ColumnDef,
        embedded: Option<usize>,
        prefixes: &[String],
        path_prefix: &str,
    ) {
        let prefixes: Vec<&str> = prefixes.iter().map(String::as_str).collect();
        let database_name = self
            .naming
            .column_name(&def.property, def.name.as_deref(), &prefixes);

        columns.push(ColumnMetadata {
            id: entity.column(columns.len()),
            declared_by: entity,
            property_name: def.property.clone(),
            property_path: join_path(path_prefix, &def.property),
            database_name,
            ty: def.ty,
            nullable: def.nullable,
            primary: def.primary,
            generation: def.generation,
            is_virtual: false,
            is_discriminator: false,
            is_delete_date: def.delete_date,
            embedded,
            relation: None,
            referenced_column: None,
            transformer: def.transformer.clone(),
        });
    }

    #[allow(clippy::too_many_arguments)]
    fn push_embedded(
        &self,
        entity: EntityId,
        columns: &mut Vec<ColumnMetadata>,
        embeddeds: &mut Vec<EmbeddedMetadata>,
        relation_defs: &mut Vec<RelationSource<'a>>,
        def: &'a EmbeddedDef,
        parent: Option<usize>,
        prefixes: &[String],
        path_prefix: &str,
    ) {
        let path = join_path(path_prefix, &def.property);
        let prefix = match def.prefix.as_deref() {
            None => Some(def.property.clone()),
            Some("") => None,
            Some(prefix) => Some(prefix.to_string()),
        };

        let index = embeddeds.len();
        embeddeds.push(EmbeddedMetadata {
            property_name: def.property.clone(),
            property_path: path.clone(),
            prefix: prefix.clone(),
            parent,
        });

        let mut prefixes = prefixes.to_vec();
        prefixes.extend(prefix);

        for column in &def.columns {
            self.push_column(entity, columns, column, Some(index), &prefixes, &path);
        }

        for relation in &def.relations {
            relation_defs.push(RelationSource {
                def: relation,
                declared_by: entity,
                embedded: Some(index),
                path_prefix: path.clone(),
            });
        }

        for nested in &def.embeddeds {
            self.push_embedded(
                entity,
                columns,
                embeddeds,
                relation_defs,
                nested,
                Some(index),
                &prefixes,
                &path,
            );
        }
    }

    fn build_relations(&mut self, id: EntityId) -> Result<()> {
        let sources = self.relation_defs[id.0].clone();

        for source in &sources {
            let def = source.def;
            let target = self.lookup(&def.target)?;
            let index = self.entities[id.0].relations.len();

            let mut relation = RelationMetadata {
                id: RelationId { entity: id, index },
                property_name: def.property.clone(),
                property_path: join_path(&source.path_prefix, &def.property),
                kind: def.kind,
                target,
                owning: def.is_owning(),
                join_columns: vec![],
                inverse_join_columns: vec![],
                inverse: None,
                junction: None,
                embedded: source.embedded,
                nullable: def.nullable,
                lazy: def.lazy,
            };

            if relation.is_owning_to_one() {
                relation.join_columns = self.build_join_columns(id, &relation, source)?;
            } else if relation.is_many_to_many() && relation.owning {
                match self.inherited_relation(source, &relation.property_path) {
                    // Children share the parent's link table
                    Some(inherited) => {
                        relation.junction = inherited.junction;
                        relation.join_columns = inherited.join_columns.clone();
                        relation.inverse_join_columns = inherited.inverse_join_columns.clone();
                    }
                    None => {
                        let (junction, join_columns, inverse_join_columns) =
                            self.build_junction(id, &relation, def)?;
                        relation.junction = Some(junction);
                        relation.join_columns = join_columns;
                        relation.inverse_join_columns = inverse_join_columns;
                    }
                }
            }

            self.entities[id.0].relations.push(relation);
        }

        Ok(())
    }

    fn inherited_relation(
        &self,
        source: &RelationSource<'_>,
        path: &str,
    ) -> Option<&RelationMetadata> {
        self.entities[source.declared_by.0].relation_by_property_path(path)
    }

    fn build_join_columns(
        &mut self,
        id: EntityId,
        relation: &RelationMetadata,
        source: &RelationSource<'_>,
    ) -> Result<Vec<ColumnId>> {
        let def = source.def;
        let target = &self.entities[relation.target.0];

        let mut referenced = vec![];

        match def.join_columns.as_deref() {
            Some(join_columns) if !join_columns.is_empty() => {
                let primary: Vec<_> = target.columns.iter().filter(|c| c.primary).collect();

                for join_column in join_columns {
                    let column = match &join_column.referenced {
                        Some(path) => target.column_by_property_path(path),
                        None if primary.len() == 1 => Some(primary[0]),
                        None => None,
                    };

                    let Some(column) = column else {
                        return Err(Error::invalid_schema(format!(
                            "join column of `{}.{}` does not reference a property of `{}`",
                            self.entities[id.0].name, relation.property_path, target.name
                        )));
                    };

                    referenced.push((join_column.name.clone(), column.clone()));
                }
            }
            _ => {
                for column in target.columns.iter().filter(|c| c.primary) {
                    referenced.push((None, column.clone()));
                }
            }
        }

        if referenced.is_empty() {
            return Err(Error::invalid_schema(format!(
                "relation `{}.{}` targets `{}`, which has no primary key",
                self.entities[id.0].name, relation.property_path, target.name
            )));
        }

        let mut ids = vec![];

        for (name, referenced) in referenced {
            let database_name = name.unwrap_or_else(|| {
                self.naming
                    .join_column_name(&relation.property_name, &referenced.property_name)
            });

            let columns = &mut self.entities[id.0].columns;

            if let Some(existing) = columns
                .iter_mut()
                .find(|column| column.database_name == database_name)
            {
                existing.relation = Some(relation.id.index);
                existing.referenced_column = Some(referenced.id);
                existing.primary |= def.primary;
                ids.push(existing.id);
                continue;
            }

            let column_id = id.column(columns.len());
            columns.push(ColumnMetadata {
                id: column_id,
                declared_by: source.declared_by,
                property_name: referenced.property_name.clone(),
                property_path: format!("{}.{}", relation.property_path, referenced.property_path),
                database_name,
                ty: referenced.ty,
                nullable: relation.nullable,
                primary: def.primary,
                generation: None,
                is_virtual: true,
                is_discriminator: false,
                is_delete_date: false,
                embedded: source.embedded,
                relation: Some(relation.id.index),
                referenced_column: Some(referenced.id),
                transformer: None,
            });
            ids.push(column_id);
        }

        Ok(ids)
    }

    fn build_junction(
        &mut self,
        id: EntityId,
        relation: &RelationMetadata,
        def: &RelationDef,
    ) -> Result<(EntityId, Vec<ColumnId>, Vec<ColumnId>)> {
        let owner = &self.entities[id.0];
        let target = &self.entities[relation.target.0];
        let join_table = def.join_table.clone().unwrap_or_default();

        let name = join_table.name.clone().unwrap_or_else(|| {
            self.naming
                .join_table_name(&owner.table.name, &target.table.name, &relation.property_path)
        });

        let junction_id = EntityId(self.entities.len());
        if self.names.insert(name.clone(), junction_id).is_some() {
            return Err(Error::invalid_schema(format!(
                "junction table `{name}` collides with another entity"
            )));
        }

        let mut columns: Vec<ColumnMetadata> = vec![];

        let sides = [
            (owner, &join_table.join_columns),
            (target, &join_table.inverse_join_columns),
        ];

        let mut split = 0;
        for (side, (entity, overrides)) in sides.into_iter().enumerate() {
            for (index, referenced) in entity.columns.iter().filter(|c| c.primary).enumerate() {
                let mut column_name = overrides
                    .get(index)
                    .and_then(|column| column.name.clone())
                    .unwrap_or_else(|| {
                        self.naming.join_table_column_name(
                            &entity.table.name,
                            &referenced.property_name,
                            Some(&referenced.database_name),
                        )
                    });

                // Self-referencing relations produce the same name twice
                if columns.iter().any(|c| c.database_name == column_name) {
                    column_name.push_str("_2");
                }

                columns.push(ColumnMetadata {
                    id: junction_id.column(columns.len()),
                    declared_by: junction_id,
                    property_name: column_name.clone(),
                    property_path: column_name.clone(),
                    database_name: column_name,
                    ty: referenced.ty,
                    nullable: false,
                    primary: true,
                    generation: None,
                    is_virtual: false,
                    is_discriminator: false,
                    is_delete_date: false,
                    embedded: None,
                    relation: None,
                    referenced_column: Some(referenced.id),
                    transformer: None,
                });
            }

            if side == 0 {
                split = columns.len();
            }
        }

        if split == 0 || split == columns.len() {
            return Err(Error::invalid_schema(format!(
                "many-to-many relation `{}.{}` requires primary keys on both sides",
                owner.name, relation.property_path
            )));
        }

        let join_columns = columns[..split].iter().map(|c| c.id).collect();
        let inverse_join_columns = columns[split..].iter().map(|c| c.id).collect();

        let table = TablePath {
            database: owner.table.database.clone(),
            schema: owner.table.schema.clone(),
            name: name.clone(),
        };

        self.entities.push(EntityMetadata {
            id: junction_id,
            name,
            table,
            kind: EntityKind::Junction,
            columns,
            relations: vec![],
            embeddeds: vec![],
            primary_columns: vec![],
            discriminator_column: None,
            discriminator_value: None,
            delete_date_column: None,
            parent: None,
            children: vec![],
        });
        self.relation_defs.push(vec![]);

        Ok((junction_id, join_columns, inverse_join_columns))
    }

    fn pair_inverse_relations(&mut self) -> Result<()> {
        for entity_index in 0..self.defs.len() {
            let entity_id = EntityId(entity_index);
            let sources = self.relation_defs[entity_index].clone();

            for (index, source) in sources.iter().enumerate() {
                let relation = self.entities[entity_index].relations[index].clone();

                let Some(inverse_side) = &source.def.inverse_side else {
                    if !relation.owning {
                        return Err(Error::invalid_schema(format!(
                            "relation `{}.{}` does not own its foreign key and must declare an inverse side",
                            self.entities[entity_index].name, relation.property_path
                        )));
                    }
                    continue;
                };

                let target = &self.entities[relation.target.0];
                let Some(inverse) = target.relation_by_property_path(inverse_side) else {
                    return Err(Error::invalid_schema(format!(
                        "relation `{}.{}` declares inverse side `{}`, which `{}` does not have",
                        self.entities[entity_index].name,
                        relation.property_path,
                        inverse_side,
                        target.name
                    )));
                };

                let points_back = self.inherits(entity_id, inverse.target)
                    || self.inherits(inverse.target, entity_id);

                let back_side = self.relation_defs[target.id.0]
                    .get(inverse.id.index)
                    .and_then(|source| source.def.inverse_side.as_deref());

                let kinds_match = matches!(
                    (relation.kind, inverse.kind),
                    (RelationKind::ManyToOne, RelationKind::OneToMany)
                        | (RelationKind::OneToMany, RelationKind::ManyToOne)
                        | (RelationKind::OneToOne, RelationKind::OneToOne)
                        | (RelationKind::ManyToMany, RelationKind::ManyToMany)
                );

                if !points_back
                    || !kinds_match
                    || back_side.is_some_and(|back| back != relation.property_path)
                {
                    return Err(Error::invalid_schema(format!(
                        "relation `{}.{}` and `{}.{}` are not inverse sides of each other",
                        self.entities[entity_index].name,
                        relation.property_path,
                        target.name,
                        inverse.property_path
                    )));
                }

                if relation.kind != RelationKind::ManyToOne
                    && relation.kind != RelationKind::OneToMany
                    && relation.owning == inverse.owning
                {
                    return Err(Error::invalid_schema(format!(
                        "exactly one of `{}.{}` and `{}.{}` must own the relation",
                        self.entities[entity_index].name,
                        relation.property_path,
                        target.name,
                        inverse.property_path
                    )));
                }

                let inverse_id = inverse.id;
                self.entities[entity_index].relations[index].inverse = Some(inverse_id);

                let paired = &mut self.entities[inverse_id.entity.0].relations[inverse_id.index];
                if paired.inverse.is_none() {
                    paired.inverse = Some(relation.id);
                }
            }
        }

        // The non-owning side of a many-to-many relation reads the owner's
        // link table from its own point of view.
        for entity_index in 0..self.defs.len() {
            for index in 0..self.entities[entity_index].relations.len() {
                let relation = &self.entities[entity_index].relations[index];
                if !relation.is_many_to_many() || relation.owning {
                    continue;
                }

                let Some(owner_id) = relation.inverse else {
                    continue;
                };

                let owner = &self.entities[owner_id.entity.0].relations[owner_id.index];
                let junction = owner.junction;
                let join_columns = owner.inverse_join_columns.clone();
                let inverse_join_columns = owner.join_columns.clone();

                let relation = &mut self.entities[entity_index].relations[index];
                relation.junction = junction;
                relation.join_columns = join_columns;
                relation.inverse_join_columns = inverse_join_columns;
            }
        }

        Ok(())
    }

    /// Every column a child declares also exists in the shared table, so
    /// ancestors carry copies of them.
    fn copy_columns_to_ancestors(&mut self) {
        for index in 0..self.entities.len() {
            let entity_id = EntityId(index);
            let Some(mut ancestor) = self.entities[index].parent else {
                continue;
            };

            let own: Vec<ColumnMetadata> = self.entities[index]
                .columns
                .iter()
                .filter(|column| column.declared_by == entity_id)
                .cloned()
                .collect();

            loop {
                let columns = &mut self.entities[ancestor.0].columns;
                for column in &own {
                    // Siblings may store different properties in one column
                    if columns
                        .iter()
                        .any(|existing| existing.database_name == column.database_name)
                    {
                        continue;
                    }

                    columns.push(ColumnMetadata {
                        id: ancestor.column(columns.len()),
                        nullable: true,
                        embedded: None,
                        relation: None,
                        ..column.clone()
                    });
                }

                match self.entities[ancestor.0].parent {
                    Some(next) => ancestor = next,
                    None => break,
                }
            }
        }
    }

    fn finish(self) -> Registry {
        let mut entities = self.entities;

        for index in 0..entities.len() {
            let id = EntityId(index);
            let mut primary_columns = vec![];
            let mut discriminator_column = None;
            let mut delete_date_column = None;

            for column in &entities[index].columns {
                // Columns copied up from descendants never identify an ancestor
                if column.declared_by != id && descends_from(&entities, column.declared_by, id) {
                    continue;
                }
                if column.primary {
                    primary_columns.push(column.id);
                }
                if column.is_discriminator {
                    discriminator_column.get_or_insert(column.id);
                }
                if column.is_delete_date {
                    delete_date_column.get_or_insert(column.id);
                }
            }

            let entity = &mut entities[index];
            entity.primary_columns = primary_columns;
            entity.discriminator_column = discriminator_column;
            entity.delete_date_column = delete_date_column;
        }

        Registry {
            entities,
            names: self.names,
        }
    }

    fn lookup(&self, name: &str) -> Result<EntityId> {
        self.names.get(name).copied().ok_or_else(|| {
            Error::invalid_schema(format!("relation or parent targets unknown entity `{name}`"))
        })
    }

    fn inherits(&self, entity: EntityId, ancestor: EntityId) -> bool {
        descends_from(&self.entities, entity, ancestor)
    }
}

fn descends_from(entities: &[EntityMetadata], entity: EntityId, ancestor: EntityId) -> bool {
    let mut current = Some(entity);
    while let Some(id) = current {
        if id == ancestor {
            return true;
        }
        current = entities[id.0].parent;
    }
    false
}

fn join_path(prefix: &str, property: &str) -> String {
    if prefix.is_empty() {
        property.to_string()
    } else {
        format!("{prefix}.{property}")
    }
}
