use super::{Alias, Condition, Cte, Record, WhereClause};
use crate::{
    schema::{EntityId, RelationId},
    Error, Result,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Select,
    Insert,
    Update,
    Delete,
    SoftDelete,
    Restore,
}

/// Everything a builder collected for one statement.
///
/// The compiler reads it; the materializer and the loaders read the parts
/// describing aliases, joins and relation attributes.
#[derive(Debug, Clone)]
pub struct QueryExpression {
    pub kind: QueryKind,

    /// Name of the alias the statement is rooted at.
    pub main_alias: Option<String>,

    /// Aliases listed in FROM, the main alias first.
    pub aliases: Vec<Alias>,

    pub selects: Vec<SelectItem>,
    pub distinct: bool,
    pub joins: Vec<Join>,
    pub wheres: Vec<WhereClause>,
    pub havings: Vec<WhereClause>,
    pub group_bys: Vec<String>,
    pub order_bys: Vec<OrderBy>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,

    /// Named parameter values referenced as `:name` from the statement.
    pub parameters: Record,

    pub ctes: Vec<Cte>,

    /// Include soft-deleted rows.
    pub with_deleted: bool,

    pub relation_ids: Vec<RelationIdAttribute>,
    pub relation_counts: Vec<RelationCountAttribute>,

    /// Relations of the main alias loaded by follow-up queries instead of
    /// joins. Dotted paths load nested relations level by level.
    pub relation_loads: Vec<String>,

    /// Rows to insert, or the single record of assignments for an update.
    pub values: Vec<Record>,

    /// Emit identifiers without quoting.
    pub disable_escaping: bool,

    /// Columns are rendered as `alias.column`. Disabled for statements that
    /// target a single table.
    pub alias_prefixing: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectItem {
    /// An alias name, an `alias.property` path or an SQL expression.
    pub selection: String,

    /// Name of the result column for expression selections.
    pub alias: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinDirection {
    Inner,
    Left,
}

#[derive(Debug, Clone)]
pub struct Join {
    pub direction: JoinDirection,

    /// The alias introduced by the join.
    pub alias: Alias,

    /// For relation joins, the alias owning the relation.
    pub parent_alias: Option<String>,

    /// For relation joins, the relation being followed.
    pub relation: Option<RelationId>,

    /// Extra ON condition, written by the caller.
    pub condition: Option<Condition>,

    /// The joined columns are part of the result.
    pub selected: bool,

    /// Hydrate the joined rows into `alias.property` instead of the relation
    /// property.
    pub map_to_property: Option<String>,

    /// With `map_to_property`, whether the target holds a list.
    pub map_many: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nulls {
    First,
    Last,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    /// An `alias.property` path, a selection alias or an SQL expression.
    pub expr: String,
    pub order: Order,
    pub nulls: Option<Nulls>,
}

/// Maps the identifiers of a relation's targets into a property.
#[derive(Debug, Clone)]
pub struct RelationIdAttribute {
    /// Alias whose entities receive the ids.
    pub parent_alias: String,

    /// Property path that receives the ids.
    pub property: String,

    pub relation: RelationId,
}

/// Maps the number of a relation's targets into a property.
#[derive(Debug, Clone)]
pub struct RelationCountAttribute {
    pub parent_alias: String,
    pub property: String,
    pub relation: RelationId,
}

impl QueryExpression {
    pub fn new(kind: QueryKind) -> QueryExpression {
        QueryExpression {
            kind,
            main_alias: None,
            aliases: vec![],
            selects: vec![],
            distinct: false,
            joins: vec![],
            wheres: vec![],
            havings: vec![],
            group_bys: vec![],
            order_bys: vec![],
            limit: None,
            offset: None,
            parameters: Record::new(),
            ctes: vec![],
            with_deleted: false,
            relation_ids: vec![],
            relation_counts: vec![],
            relation_loads: vec![],
            values: vec![],
            disable_escaping: false,
            alias_prefixing: matches!(kind, QueryKind::Select),
        }
    }

    pub fn main_alias(&self) -> Result<&Alias> {
        let name = self.main_alias.as_deref().ok_or_else(Error::missing_main_alias)?;
        self.find_alias(name).ok_or_else(Error::missing_main_alias)
    }

    /// The entity the statement is rooted at.
    pub fn main_entity(&self) -> Result<EntityId> {
        self.main_alias()?
            .entity()
            .ok_or_else(|| Error::invalid_statement("the main alias is not bound to an entity"))
    }

    /// Finds an alias introduced by FROM or by a join.
    pub fn find_alias(&self, name: &str) -> Option<&Alias> {
        self.aliases
            .iter()
            .chain(self.joins.iter().map(|join| &join.alias))
            .find(|alias| alias.name == name)
    }

    pub fn find_join(&self, alias: &str) -> Option<&Join> {
        self.joins.iter().find(|join| join.alias.name == alias)
    }

    /// Returns `true` if the whole alias was selected.
    pub fn is_alias_selected(&self, alias: &str) -> bool {
        self.entity_selects().any(|item| item.selection == alias)
    }

    /// Returns `true` if the property of the alias is part of the result,
    /// either on its own or because the whole alias was selected.
    pub fn is_property_selected(&self, alias: &str, path: &str) -> bool {
        self.is_alias_selected(alias)
            || self.entity_selects().any(|item| {
                item.selection
                    .strip_prefix(alias)
                    .and_then(|rest| rest.strip_prefix('.'))
                    .is_some_and(|rest| rest == path)
            })
    }

    /// Selections that feed entities. A selection given its own result name
    /// is a plain expression, even if it names a column.
    fn entity_selects(&self) -> impl Iterator<Item = &SelectItem> + '_ {
        self.selects.iter().filter(|item| item.alias.is_none())
    }
}

impl SelectItem {
    pub fn new(selection: impl Into<String>) -> SelectItem {
        SelectItem {
            selection: selection.into(),
            alias: None,
        }
    }
}

/// Name of the alias under which a many-to-many join reaches the link table.
pub fn junction_alias(parent_alias: &str, alias: &str, owning: bool) -> String {
    if owning {
        format!("{parent_alias}_{alias}")
    } else {
        format!("{alias}_{parent_alias}")
    }
}
