use super::{EntityId, ValueTransformer};

use std::{fmt, sync::Arc};

#[derive(Debug, Clone)]
pub struct ColumnMetadata {
    /// Uniquely identifies the column in the registry
    pub id: ColumnId,

    /// Entity that declared the column. Differs from `id.entity` for columns
    /// inherited from a single-table inheritance parent or declared by a
    /// child and copied into its parent.
    pub declared_by: EntityId,

    /// Last segment of the property path
    pub property_name: String,

    /// Dotted path from the entity root, through embedded objects
    pub property_path: String,

    /// Name of the column in the database
    pub database_name: String,

    pub ty: ColumnType,

    pub nullable: bool,

    /// True if the column is part of the primary key
    pub primary: bool,

    pub generation: Option<Generation>,

    /// Virtual columns exist in the table but have no property of their own;
    /// their value lives behind a relation.
    pub is_virtual: bool,

    pub is_discriminator: bool,

    pub is_delete_date: bool,

    /// Index of the embedded object holding the column
    pub embedded: Option<usize>,

    /// Index of the relation this column is a join column of
    pub relation: Option<usize>,

    /// Column on the other side of a foreign key
    pub referenced_column: Option<ColumnId>,

    pub transformer: Option<Arc<dyn ValueTransformer>>,
}

#[derive(PartialEq, Eq, Clone, Copy, Hash)]
pub struct ColumnId {
    pub entity: EntityId,
    pub index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Boolean,
    Integer,
    BigInt,
    Float,
    Text,
    Varchar(u32),
    Blob,
    Json,
    Uuid,
    Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Generation {
    /// Database assigned, auto incrementing integer
    Increment,

    /// Random UUID assigned when the row is inserted
    Uuid,
}

impl ColumnMetadata {
    pub fn is_generated_increment(&self) -> bool {
        self.generation == Some(Generation::Increment)
    }
}

impl From<&ColumnMetadata> for ColumnId {
    fn from(value: &ColumnMetadata) -> Self {
        value.id
    }
}

impl fmt::Debug for ColumnId {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "ColumnId({}/{})", self.entity.0, self.index)
    }
}
