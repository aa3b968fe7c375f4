//! Entity metadata: the read-only description of mapped types, their
//! columns, relations and embedded objects.
//!
//! Metadata is built once with a [`Builder`] and handed to the query
//! builders, the compiler and the materializer as a shared [`Registry`].

mod builder;
pub use builder::{
    Builder, ColumnDef, EmbeddedDef, EntityDef, JoinColumnDef, JoinTableDef, RelationDef,
};

mod column;
pub use column::{ColumnId, ColumnMetadata, ColumnType, Generation};

mod embedded;
pub use embedded::EmbeddedMetadata;

mod entity;
pub use entity::{EntityId, EntityKind, EntityMetadata, TablePath};

mod naming;
pub use naming::{DefaultNamingStrategy, NamingStrategy, SnakeNamingStrategy};

mod registry;
pub use registry::Registry;

mod relation;
pub use relation::{RelationId, RelationKind, RelationMetadata};

mod transformer;
pub use transformer::ValueTransformer;
