//! Declarative entity definitions, as produced by the annotation layer.

use crate::schema::{ColumnType, Generation, RelationKind, ValueTransformer};

use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct EntityDef {
    pub name: String,
    pub table: Option<String>,
    pub schema: Option<String>,
    pub database: Option<String>,
    pub view: bool,
    pub columns: Vec<ColumnDef>,
    pub embeddeds: Vec<EmbeddedDef>,
    pub relations: Vec<RelationDef>,

    /// Discriminator column declared by a single-table inheritance root
    pub discriminator: Option<ColumnDef>,

    /// Value identifying this entity's rows. Defaults to the entity name
    /// when the hierarchy has a discriminator.
    pub discriminator_value: Option<String>,

    /// Single-table inheritance parent, by entity name
    pub parent: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ColumnDef {
    pub property: String,
    pub name: Option<String>,
    pub ty: ColumnType,
    pub nullable: bool,
    pub primary: bool,
    pub generation: Option<Generation>,
    pub delete_date: bool,
    pub transformer: Option<Arc<dyn ValueTransformer>>,
}

#[derive(Debug, Clone)]
pub struct EmbeddedDef {
    pub property: String,

    /// Column name prefix. `None` uses the property name, `Some("")`
    /// disables prefixing.
    pub prefix: Option<String>,
    pub columns: Vec<ColumnDef>,
    pub embeddeds: Vec<EmbeddedDef>,
    pub relations: Vec<RelationDef>,
}

#[derive(Debug, Clone)]
pub struct RelationDef {
    pub property: String,
    pub kind: RelationKind,

    /// Target entity, by name
    pub target: String,

    /// Property of the target pointing back at this relation
    pub inverse_side: Option<String>,

    /// Foreign key columns. Declaring any makes a one-to-one relation the
    /// owning side.
    pub join_columns: Option<Vec<JoinColumnDef>>,

    /// Declaring a join table makes a many-to-many relation the owning side.
    pub join_table: Option<JoinTableDef>,

    pub nullable: bool,
    pub lazy: bool,

    /// The foreign key columns are part of the primary key
    pub primary: bool,
}

#[derive(Debug, Clone, Default)]
pub struct JoinColumnDef {
    pub name: Option<String>,

    /// Referenced property of the target. Defaults to its primary columns.
    pub referenced: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct JoinTableDef {
    pub name: Option<String>,
    pub join_columns: Vec<JoinColumnDef>,
    pub inverse_join_columns: Vec<JoinColumnDef>,
}

impl EntityDef {
    pub fn new(name: impl Into<String>) -> EntityDef {
        EntityDef {
            name: name.into(),
            table: None,
            schema: None,
            database: None,
            view: false,
            columns: vec![],
            embeddeds: vec![],
            relations: vec![],
            discriminator: None,
            discriminator_value: None,
            parent: None,
        }
    }

    pub fn table(mut self, name: impl Into<String>) -> Self {
        self.table = Some(name.into());
        self
    }

    pub fn schema(mut self, name: impl Into<String>) -> Self {
        self.schema = Some(name.into());
        self
    }

    pub fn database(mut self, name: impl Into<String>) -> Self {
        self.database = Some(name.into());
        self
    }

    pub fn view(mut self) -> Self {
        self.view = true;
        self
    }

    pub fn column(mut self, column: ColumnDef) -> Self {
        self.columns.push(column);
        self
    }

    pub fn embedded(mut self, embedded: EmbeddedDef) -> Self {
        self.embeddeds.push(embedded);
        self
    }

    pub fn relation(mut self, relation: RelationDef) -> Self {
        self.relations.push(relation);
        self
    }

    pub fn discriminator(mut self, column: ColumnDef) -> Self {
        self.discriminator = Some(column);
        self
    }

    pub fn discriminator_value(mut self, value: impl Into<String>) -> Self {
        self.discriminator_value = Some(value.into());
        self
    }

    pub fn extends(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }
}

impl ColumnDef {
    pub fn new(property: impl Into<String>, ty: ColumnType) -> ColumnDef {
        ColumnDef {
            property: property.into(),
            name: None,
            ty,
            nullable: false,
            primary: false,
            generation: None,
            delete_date: false,
            transformer: None,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn primary(mut self) -> Self {
        self.primary = true;
        self
    }

    pub fn generated(mut self, generation: Generation) -> Self {
        self.generation = Some(generation);
        self
    }

    /// Marks the soft-delete column. Implies nullable.
    pub fn delete_date(mut self) -> Self {
        self.delete_date = true;
        self.nullable = true;
        self
    }

    pub fn transformer(mut self, transformer: impl ValueTransformer + 'static) -> Self {
        self.transformer = Some(Arc::new(transformer));
        self
    }
}

impl EmbeddedDef {
    pub fn new(property: impl Into<String>) -> EmbeddedDef {
        EmbeddedDef {
            property: property.into(),
            prefix: None,
            columns: vec![],
            embeddeds: vec![],
            relations: vec![],
        }
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn no_prefix(mut self) -> Self {
        self.prefix = Some(String::new());
        self
    }

    pub fn column(mut self, column: ColumnDef) -> Self {
        self.columns.push(column);
        self
    }

    pub fn embedded(mut self, embedded: EmbeddedDef) -> Self {
        self.embeddeds.push(embedded);
        self
    }

    pub fn relation(mut self, relation: RelationDef) -> Self {
        self.relations.push(relation);
        self
    }
}

impl RelationDef {
    fn new(property: impl Into<String>, kind: RelationKind, target: impl Into<String>) -> Self {
        RelationDef {
            property: property.into(),
            kind,
            target: target.into(),
            inverse_side: None,
            join_columns: None,
            join_table: None,
            nullable: kind.is_to_one(),
            lazy: false,
            primary: false,
        }
    }

    pub fn many_to_one(property: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(property, RelationKind::ManyToOne, target)
    }

    pub fn one_to_many(
        property: impl Into<String>,
        target: impl Into<String>,
        inverse_side: impl Into<String>,
    ) -> Self {
        Self::new(property, RelationKind::OneToMany, target).inverse_side(inverse_side)
    }

    pub fn one_to_one(property: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(property, RelationKind::OneToOne, target)
    }

    pub fn many_to_many(property: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(property, RelationKind::ManyToMany, target)
    }

    pub fn inverse_side(mut self, property: impl Into<String>) -> Self {
        self.inverse_side = Some(property.into());
        self
    }

    pub fn join_column(mut self, column: JoinColumnDef) -> Self {
        self.join_columns.get_or_insert_with(Vec::new).push(column);
        self
    }

    pub fn join_table(mut self, table: JoinTableDef) -> Self {
        self.join_table = Some(table);
        self
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn lazy(mut self) -> Self {
        self.lazy = true;
        self
    }

    pub fn primary(mut self) -> Self {
        self.primary = true;
        self.nullable = false;
        self
    }

    pub(crate) fn is_owning(&self) -> bool {
        match self.kind {
            RelationKind::ManyToOne => true,
            RelationKind::OneToMany => false,
            RelationKind::OneToOne => self.join_columns.is_some(),
            RelationKind::ManyToMany => self.join_table.is_some() || self.inverse_side.is_none(),
        }
    }
}

impl JoinColumnDef {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn referenced(mut self, property: impl Into<String>) -> Self {
        self.referenced = Some(property.into());
        self
    }
}

impl JoinTableDef {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn join_column(mut self, column: JoinColumnDef) -> Self {
        self.join_columns.push(column);
        self
    }

    pub fn inverse_join_column(mut self, column: JoinColumnDef) -> Self {
        self.inverse_join_columns.push(column);
        self
    }
}
