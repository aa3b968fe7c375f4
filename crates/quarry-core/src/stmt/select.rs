use super::state::State;
use super::{
    Alias, AliasSource, Condition, Cte, CteBody, Join, JoinDirection, Nulls, Order, OrderBy,
    QueryExpression, QueryKind, RelationCountAttribute, RelationIdAttribute, SelectItem,
    WhereClause, WhereKind,
};
use crate::{
    schema::{RelationId, TablePath},
    Error, Registry, Result,
};

/// Builds a SELECT statement.
///
/// ```ignore
/// let expr = SelectBuilder::new(&registry)
///     .select("post")
///     .from("Post", "post")
///     .left_join_and_select("post.author", "author")
///     .where_("post.title = :title")
///     .set_parameter("title", "hello")
///     .build()?;
/// ```
#[derive(Debug)]
pub struct SelectBuilder<'a> {
    state: State<'a>,
}

where_methods!(SelectBuilder);

impl<'a> SelectBuilder<'a> {
    pub fn new(registry: &'a Registry) -> SelectBuilder<'a> {
        SelectBuilder {
            state: State::new(registry, QueryKind::Select),
        }
    }

    /// Replaces the selection. Accepts alias names, `alias.property` paths
    /// and SQL expressions.
    pub fn select(mut self, selection: impl Into<String>) -> Self {
        self.state.expr.selects = vec![SelectItem::new(selection)];
        self
    }

    pub fn add_select(mut self, selection: impl Into<String>) -> Self {
        self.state.expr.selects.push(SelectItem::new(selection));
        self
    }

    /// Selects an SQL expression under a result column name.
    pub fn add_select_as(mut self, selection: impl Into<String>, alias: impl Into<String>) -> Self {
        self.state.expr.selects.push(SelectItem {
            selection: selection.into(),
            alias: Some(alias.into()),
        });
        self
    }

    pub fn distinct(mut self) -> Self {
        self.state.expr.distinct = true;
        self
    }

    /// Selects from an entity resolved by name. The first FROM becomes the
    /// main alias.
    pub fn from(mut self, entity: &str, alias: &str) -> Self {
        self.state.attempt(|state| {
            let metadata = state.registry.resolve(entity)?;
            state.add_from(Alias::new(alias, AliasSource::Entity(metadata.id)))
        });
        self
    }

    /// Selects from a table that has no metadata.
    pub fn from_table(mut self, table: TablePath, alias: &str) -> Self {
        self.state
            .attempt(|state| state.add_from(Alias::new(alias, AliasSource::Table(table))));
        self
    }

    /// Selects from a derived table built by another select builder.
    pub fn from_subquery(mut self, subquery: SelectBuilder<'_>, alias: &str) -> Self {
        let subquery = subquery.build();
        self.state.attempt(|state| {
            let subquery = subquery?;
            state.add_from(Alias::new(alias, AliasSource::SubQuery(Box::new(subquery))))
        });
        self
    }

    pub fn inner_join(self, entity_or_property: &str, alias: &str) -> Self {
        self.join(JoinDirection::Inner, entity_or_property, alias, None, false, None)
    }

    pub fn inner_join_on(
        self,
        entity_or_property: &str,
        alias: &str,
        condition: impl Into<String>,
    ) -> Self {
        let condition = Some(condition.into());
        self.join(JoinDirection::Inner, entity_or_property, alias, condition, false, None)
    }

    pub fn left_join(self, entity_or_property: &str, alias: &str) -> Self {
        self.join(JoinDirection::Left, entity_or_property, alias, None, false, None)
    }

    pub fn left_join_on(
        self,
        entity_or_property: &str,
        alias: &str,
        condition: impl Into<String>,
    ) -> Self {
        let condition = Some(condition.into());
        self.join(JoinDirection::Left, entity_or_property, alias, condition, false, None)
    }

    pub fn inner_join_and_select(self, entity_or_property: &str, alias: &str) -> Self {
        self.join(JoinDirection::Inner, entity_or_property, alias, None, true, None)
    }

    pub fn left_join_and_select(self, entity_or_property: &str, alias: &str) -> Self {
        self.join(JoinDirection::Left, entity_or_property, alias, None, true, None)
    }

    /// Joins and hydrates the first joined row into `map_to_property`
    /// (`alias.property`).
    pub fn left_join_and_map_one(
        self,
        map_to_property: &str,
        entity_or_property: &str,
        alias: &str,
        condition: Option<&str>,
    ) -> Self {
        let map = Some((map_to_property.to_string(), false));
        let condition = condition.map(str::to_string);
        self.join(JoinDirection::Left, entity_or_property, alias, condition, true, map)
    }

    /// Joins and hydrates every joined row into the list at
    /// `map_to_property`.
    pub fn left_join_and_map_many(
        self,
        map_to_property: &str,
        entity_or_property: &str,
        alias: &str,
        condition: Option<&str>,
    ) -> Self {
        let map = Some((map_to_property.to_string(), true));
        let condition = condition.map(str::to_string);
        self.join(JoinDirection::Left, entity_or_property, alias, condition, true, map)
    }

    fn join(
        mut self,
        direction: JoinDirection,
        entity_or_property: &str,
        alias: &str,
        condition: Option<String>,
        selected: bool,
        map: Option<(String, bool)>,
    ) -> Self {
        self.state.attempt(|state| {
            state.check_alias_free(alias)?;

            let (parent_alias, relation, source) =
                match state.resolve_relation_path(entity_or_property)? {
                    Some((parent, relation)) => {
                        let target = state.registry.relation(relation).target;
                        (Some(parent), Some(relation), AliasSource::Entity(target))
                    }
                    None => match state.registry.resolve(entity_or_property) {
                        Ok(metadata) => (None, None, AliasSource::Entity(metadata.id)),
                        Err(_) => {
                            let table = TablePath::new(entity_or_property);
                            (None, None, AliasSource::Table(table))
                        }
                    },
                };

            if relation.is_none() && condition.is_none() {
                return Err(Error::invalid_statement(format!(
                    "joining `{entity_or_property}` as `{alias}` requires an ON condition"
                )));
            }

            let mut parent_alias = parent_alias;
            let (map_to_property, map_many) = match map {
                Some((target, many)) => {
                    let (owner, property) = state.owned_property(&target)?;

                    if parent_alias.as_ref().is_some_and(|parent| *parent != owner) {
                        return Err(Error::invalid_statement(format!(
                            "`{target}` must belong to the alias owning `{entity_or_property}`"
                        )));
                    }
                    parent_alias = Some(owner);
                    (Some(property), many)
                }
                None => (None, false),
            };

            state.expr.joins.push(Join {
                direction,
                alias: Alias::new(alias, source),
                parent_alias,
                relation,
                condition: condition.map(Condition::Raw),
                selected,
                map_to_property,
                map_many,
            });

            if selected {
                state.expr.selects.push(SelectItem::new(alias));
            }

            Ok(())
        });
        self
    }

    pub fn order_by(mut self, expr: impl Into<String>, order: Order) -> Self {
        self.state.expr.order_bys = vec![OrderBy {
            expr: expr.into(),
            order,
            nulls: None,
        }];
        self
    }

    pub fn add_order_by(mut self, expr: impl Into<String>, order: Order) -> Self {
        self.state.expr.order_bys.push(OrderBy {
            expr: expr.into(),
            order,
            nulls: None,
        });
        self
    }

    pub fn add_order_by_nulls(
        mut self,
        expr: impl Into<String>,
        order: Order,
        nulls: Nulls,
    ) -> Self {
        self.state.expr.order_bys.push(OrderBy {
            expr: expr.into(),
            order,
            nulls: Some(nulls),
        });
        self
    }

    pub fn group_by(mut self, expr: impl Into<String>) -> Self {
        self.state.expr.group_bys = vec![expr.into()];
        self
    }

    pub fn add_group_by(mut self, expr: impl Into<String>) -> Self {
        self.state.expr.group_bys.push(expr.into());
        self
    }

    /// Replaces the HAVING clauses.
    pub fn having(mut self, condition: impl Into<String>) -> Self {
        self.state.expr.havings = vec![WhereClause::new(
            WhereKind::Simple,
            Condition::Raw(condition.into()),
        )];
        self
    }

    pub fn and_having(mut self, condition: impl Into<String>) -> Self {
        self.state
            .expr
            .havings
            .push(WhereClause::new(WhereKind::And, Condition::Raw(condition.into())));
        self
    }

    pub fn or_having(mut self, condition: impl Into<String>) -> Self {
        self.state
            .expr
            .havings
            .push(WhereClause::new(WhereKind::Or, Condition::Raw(condition.into())));
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.state.expr.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.state.expr.offset = Some(offset);
        self
    }

    /// Include soft-deleted rows.
    pub fn with_deleted(mut self) -> Self {
        self.state.expr.with_deleted = true;
        self
    }

    pub fn disable_escaping(mut self) -> Self {
        self.state.expr.disable_escaping = true;
        self
    }

    pub fn add_common_table_expression(mut self, cte: Cte) -> Self {
        self.state.attempt(|state| {
            if let CteBody::Query(body) = &cte.body {
                state.merge_parameters(body)?;
            }
            state.expr.ctes.push(cte);
            Ok(())
        });
        self
    }

    /// Loads the ids of `relation` (`alias.relation`) into
    /// `map_to_property` (`alias.property`).
    pub fn load_relation_id_and_map(mut self, map_to_property: &str, relation: &str) -> Self {
        self.state.attempt(|state| {
            let (parent_alias, property, relation) =
                state.mapped_relation(map_to_property, relation)?;
            state.expr.relation_ids.push(RelationIdAttribute {
                parent_alias,
                property,
                relation,
            });
            Ok(())
        });
        self
    }

    /// Loads the number of targets of `relation` into `map_to_property`.
    pub fn load_relation_count_and_map(mut self, map_to_property: &str, relation: &str) -> Self {
        self.state.attempt(|state| {
            let (parent_alias, property, relation) =
                state.mapped_relation(map_to_property, relation)?;

            let metadata = state.registry.relation(relation);
            if !metadata.is_to_many() {
                return Err(Error::invalid_statement(format!(
                    "only to-many relations can be counted, `{}` holds a single value",
                    metadata.property_path
                )));
            }

            state.expr.relation_counts.push(RelationCountAttribute {
                parent_alias,
                property,
                relation,
            });
            Ok(())
        });
        self
    }

    /// Loads a relation of the main alias with a follow-up query instead of
    /// a join. Dotted paths (`author.profile`) load each level in turn.
    pub fn load_relation_by_query(mut self, path: &str) -> Self {
        self.state.attempt(|state| {
            let mut entity = state.expr.main_entity()?;
            let mut walked = String::new();

            for segment in path.split('.') {
                walked = super::state::join_path(&walked, segment);
                let relation = state
                    .registry
                    .find_relation_by_property_path(entity, segment)
                    .ok_or_else(|| {
                        Error::relation_not_found(
                            state.expr.main_alias.clone().unwrap_or_default(),
                            walked.clone(),
                        )
                    })?;
                entity = relation.target;
            }

            if !state.expr.relation_loads.iter().any(|load| load == path) {
                state.expr.relation_loads.push(path.to_string());
            }
            Ok(())
        });
        self
    }

    /// Produces an expression with the same state without consuming the
    /// builder.
    pub fn expression(&self) -> Result<QueryExpression> {
        self.state.snapshot()
    }
}

impl<'a> State<'a> {
    fn add_from(&mut self, alias: Alias) -> Result<()> {
        if self.expr.main_alias.is_none() {
            return self.set_main_alias(alias);
        }

        self.check_alias_free(&alias.name)?;
        if let AliasSource::SubQuery(subquery) = &alias.source {
            self.merge_parameters(subquery)?;
        }
        self.expr.aliases.push(alias);
        Ok(())
    }

    /// Splits `alias.relation.path` into an existing alias and a relation of
    /// its entity. Returns `None` if the text does not start with an alias.
    fn resolve_relation_path(&self, text: &str) -> Result<Option<(String, RelationId)>> {
        let Some((alias_name, path)) = text.split_once('.') else {
            return Ok(None);
        };

        let Some(alias) = self.expr.find_alias(alias_name) else {
            return Ok(None);
        };

        let Some(entity) = alias.entity() else {
            return Err(Error::relation_not_found(alias_name, path));
        };

        let relation = self
            .registry
            .find_relation_by_property_path(entity, path)
            .ok_or_else(|| Error::relation_not_found(alias_name, path))?;

        Ok(Some((alias_name.to_string(), relation.id)))
    }

    /// Splits `alias.property` into an existing alias and a property path.
    fn owned_property(&self, text: &str) -> Result<(String, String)> {
        let (alias, property) = text.split_once('.').ok_or_else(|| {
            Error::invalid_statement(format!("`{text}` must have the form `alias.property`"))
        })?;

        if self.expr.find_alias(alias).is_none() {
            return Err(Error::invalid_statement(format!(
                "`{text}` refers to unknown alias `{alias}`"
            )));
        }

        Ok((alias.to_string(), property.to_string()))
    }

    fn mapped_relation(
        &self,
        map_to_property: &str,
        relation: &str,
    ) -> Result<(String, String, RelationId)> {
        let (map_alias, property) = self.owned_property(map_to_property)?;

        let Some((parent_alias, relation)) = self.resolve_relation_path(relation)? else {
            return Err(Error::relation_not_found(map_alias, relation));
        };

        if parent_alias != map_alias {
            return Err(Error::invalid_statement(format!(
                "`{map_to_property}` must belong to alias `{parent_alias}`"
            )));
        }

        Ok((parent_alias, property, relation))
    }
}
