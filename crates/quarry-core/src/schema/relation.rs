use super::{ColumnId, EntityId};

use std::fmt;

#[derive(Debug, Clone)]
pub struct RelationMetadata {
    /// Uniquely identifies the relation in the registry
    pub id: RelationId,

    pub property_name: String,

    /// Dotted path from the entity root, through embedded objects
    pub property_path: String,

    pub kind: RelationKind,

    /// Entity on the other side of the relation
    pub target: EntityId,

    /// True if this side physically holds the foreign key, or owns the
    /// junction table of a many-to-many relation.
    pub owning: bool,

    /// For owning to-one relations, the foreign key columns of this entity.
    /// For many-to-many relations, the junction columns referencing this
    /// entity. Empty for the non-owning side of a direct relation.
    pub join_columns: Vec<ColumnId>,

    /// For many-to-many relations, the junction columns referencing the
    /// target entity.
    pub inverse_join_columns: Vec<ColumnId>,

    /// The relation on the target pointing back at this one
    pub inverse: Option<RelationId>,

    /// Link table of a many-to-many relation
    pub junction: Option<EntityId>,

    /// Index of the embedded object holding the relation
    pub embedded: Option<usize>,

    pub nullable: bool,

    /// Lazily loaded relations materialize as loader handles
    pub lazy: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    OneToOne,
    ManyToOne,
    OneToMany,
    ManyToMany,
}

#[derive(PartialEq, Eq, Clone, Copy, Hash)]
pub struct RelationId {
    pub entity: EntityId,
    pub index: usize,
}

impl RelationMetadata {
    pub fn is_to_one(&self) -> bool {
        self.kind.is_to_one()
    }

    pub fn is_to_many(&self) -> bool {
        !self.kind.is_to_one()
    }

    pub fn is_many_to_many(&self) -> bool {
        self.kind == RelationKind::ManyToMany
    }

    /// Many-to-one, or one-to-one holding the foreign key.
    pub fn is_owning_to_one(&self) -> bool {
        match self.kind {
            RelationKind::ManyToOne => true,
            RelationKind::OneToOne => self.owning,
            _ => false,
        }
    }

    /// One-to-many, or one-to-one whose foreign key lives on the target.
    pub fn is_inverse_direct(&self) -> bool {
        match self.kind {
            RelationKind::OneToMany => true,
            RelationKind::OneToOne => !self.owning,
            _ => false,
        }
    }
}

impl RelationKind {
    pub fn is_to_one(self) -> bool {
        matches!(self, RelationKind::OneToOne | RelationKind::ManyToOne)
    }
}

impl fmt::Debug for RelationId {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "RelationId({}/{})", self.entity.0, self.index)
    }
}
