use super::{ColumnId, ColumnMetadata, EmbeddedMetadata, RelationMetadata};

use std::fmt;

#[derive(Debug)]
pub struct EntityMetadata {
    /// Uniquely identifies the entity within the registry
    pub id: EntityId,

    /// Name of the mapped type
    pub name: String,

    /// Where the rows live
    pub table: TablePath,

    pub kind: EntityKind,

    /// Own, embedded and inherited columns, in declaration order
    pub columns: Vec<ColumnMetadata>,

    /// Own, embedded and inherited relations
    pub relations: Vec<RelationMetadata>,

    pub embeddeds: Vec<EmbeddedMetadata>,

    pub primary_columns: Vec<ColumnId>,

    /// Column distinguishing subtypes stored in one table
    pub discriminator_column: Option<ColumnId>,

    /// Value of the discriminator column identifying this entity's rows
    pub discriminator_value: Option<String>,

    /// Column marking a row as soft-deleted when not null
    pub delete_date_column: Option<ColumnId>,

    /// Single-table inheritance parent
    pub parent: Option<EntityId>,

    /// Single-table inheritance children
    pub children: Vec<EntityId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    /// Backed by a regular table
    Regular,

    /// Backed by a view. Rows have no reliable primary key.
    View,

    /// Link table of a many-to-many relation
    Junction,
}

/// Qualified location of a table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TablePath {
    pub database: Option<String>,
    pub schema: Option<String>,
    pub name: String,
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub usize);

impl EntityMetadata {
    pub fn column(&self, id: impl Into<ColumnId>) -> &ColumnMetadata {
        let id = id.into();
        assert_eq!(self.id, id.entity);
        &self.columns[id.index]
    }

    pub fn relation(&self, index: usize) -> &RelationMetadata {
        &self.relations[index]
    }

    pub fn is_view(&self) -> bool {
        self.kind == EntityKind::View
    }

    pub fn is_junction(&self) -> bool {
        self.kind == EntityKind::Junction
    }

    pub fn primary_columns(&self) -> impl ExactSizeIterator<Item = &ColumnMetadata> + '_ {
        self.primary_columns.iter().map(|id| &self.columns[id.index])
    }

    pub fn has_only_virtual_primary_columns(&self) -> bool {
        self.primary_columns().all(|column| column.is_virtual)
    }

    pub fn discriminator_column(&self) -> Option<&ColumnMetadata> {
        self.discriminator_column.map(|id| self.column(id))
    }

    pub fn delete_date_column(&self) -> Option<&ColumnMetadata> {
        self.delete_date_column.map(|id| self.column(id))
    }

    /// Finds a non-virtual column by its exact property path.
    pub fn column_by_property_path(&self, path: &str) -> Option<&ColumnMetadata> {
        self.columns
            .iter()
            .find(|column| !column.is_virtual && column.property_path == path)
    }

    pub fn column_by_database_name(&self, name: &str) -> Option<&ColumnMetadata> {
        self.columns.iter().find(|column| column.database_name == name)
    }

    pub fn relation_by_property_path(&self, path: &str) -> Option<&RelationMetadata> {
        self.relations
            .iter()
            .find(|relation| relation.property_path == path)
    }

    pub fn embedded_by_property_path(&self, path: &str) -> Option<&EmbeddedMetadata> {
        self.embeddeds
            .iter()
            .find(|embedded| embedded.property_path == path)
    }

    /// Columns whose value is hydrated into entities of this metadata.
    /// Excludes relation-backed virtual columns.
    pub fn hydrated_columns(&self) -> impl Iterator<Item = &ColumnMetadata> + '_ {
        self.columns.iter().filter(|column| !column.is_virtual)
    }

    /// Full table path rendered with `.` separators, unquoted.
    pub fn table_path(&self) -> String {
        self.table.to_string()
    }
}

impl TablePath {
    pub fn new(name: impl Into<String>) -> TablePath {
        TablePath {
            database: None,
            schema: None,
            name: name.into(),
        }
    }

    /// Iterates the non-empty path segments, outermost first.
    pub fn segments(&self) -> impl Iterator<Item = &str> + '_ {
        self.database
            .as_deref()
            .into_iter()
            .chain(self.schema.as_deref())
            .chain(Some(self.name.as_str()))
    }
}

impl fmt::Display for TablePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = "";
        for segment in self.segments() {
            write!(f, "{s}{segment}")?;
            s = ".";
        }
        Ok(())
    }
}

impl EntityId {
    /// Create a `ColumnId` representing the current entity's column at index
    /// `index`.
    pub const fn column(self, index: usize) -> ColumnId {
        ColumnId {
            entity: self,
            index,
        }
    }
}

impl From<&EntityMetadata> for EntityId {
    fn from(value: &EntityMetadata) -> Self {
        value.id
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "EntityId({})", self.0)
    }
}
