use super::QueryExpression;
use crate::schema::{EntityId, TablePath};

/// A name bound to the thing it selects from within one query.
#[derive(Debug, Clone)]
pub struct Alias {
    pub name: String,
    pub source: AliasSource,
}

#[derive(Debug, Clone)]
pub enum AliasSource {
    /// A mapped entity; property paths resolve through its metadata.
    Entity(EntityId),

    /// A table that has no metadata. Property paths are used verbatim.
    Table(TablePath),

    /// A derived table. Its parameters are merged into the outer query.
    SubQuery(Box<QueryExpression>),
}

impl Alias {
    pub fn new(name: impl Into<String>, source: AliasSource) -> Alias {
        Alias {
            name: name.into(),
            source,
        }
    }

    /// The entity behind this alias, if any.
    pub fn entity(&self) -> Option<EntityId> {
        match self.source {
            AliasSource::Entity(id) => Some(id),
            _ => None,
        }
    }
}
