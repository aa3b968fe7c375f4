mod builder;
pub use builder::Builder;

mod options;
pub use options::{Options, RelationLoadStrategy};

use crate::{
    driver::Rows,
    loader::{self, ValueLoader},
    schema::RelationId,
    stmt::{DeleteBuilder, InsertBuilder, QueryExpression, QueryKind, SelectBuilder, UpdateBuilder},
    Capability, Entity, Error, Executor, Materializer, Registry, Result, Serializer, Value,
};

use futures::future::{BoxFuture, FutureExt};
use indexmap::IndexMap;
use std::{collections::HashSet, sync::Arc};

/// A handle to the registry and executor queries run against.
///
/// Cloning is cheap; clones share the same registry, executor and options.
#[derive(Clone, Debug)]
pub struct Db {
    shared: Arc<Shared>,
}

#[derive(Debug)]
struct Shared {
    registry: Arc<Registry>,
    executor: Arc<dyn Executor>,

    /// Executor capability with the configured overrides applied
    capability: Capability,
    options: Options,
}

/// Anything that produces a query expression: a finished expression or one
/// of the statement builders.
pub trait IntoExpression {
    fn into_expression(self) -> Result<QueryExpression>;
}

impl Db {
    pub fn builder() -> Builder {
        Builder::default()
    }

    pub fn registry(&self) -> &Registry {
        &self.shared.registry
    }

    pub fn options(&self) -> &Options {
        &self.shared.options
    }

    pub fn capability(&self) -> &Capability {
        &self.shared.capability
    }

    /// A compiler configured for this database.
    pub fn serializer(&self) -> Serializer<'_> {
        Serializer::new(self.registry(), self.capability().clone())
            .max_alias_length(self.options().max_alias_length)
    }

    pub fn select(&self) -> SelectBuilder<'_> {
        SelectBuilder::new(self.registry())
    }

    pub fn insert(&self) -> InsertBuilder<'_> {
        InsertBuilder::new(self.registry())
    }

    pub fn update(&self) -> UpdateBuilder<'_> {
        UpdateBuilder::new(self.registry())
    }

    pub fn delete(&self) -> DeleteBuilder<'_> {
        DeleteBuilder::new(self.registry())
    }

    /// Selects `entity` as `alias` together with the given relation paths,
    /// loaded as configured by [`Options::relation_load_strategy`].
    ///
    /// Joined relations are aliased `<parent>__<property>`.
    pub fn find(&self, entity: &str, alias: &str, relations: &[&str]) -> SelectBuilder<'_> {
        let mut builder = self.select().select(alias).from(entity, alias);

        match self.options().relation_load_strategy {
            RelationLoadStrategy::Join => {
                let mut joined = HashSet::new();

                for path in relations {
                    let mut parent = alias.to_string();

                    for segment in path.split('.') {
                        let child = format!("{parent}__{segment}");

                        if joined.insert(child.clone()) {
                            let property = format!("{parent}.{segment}");
                            builder = builder.left_join_and_select(&property, &child);
                        }
                        parent = child;
                    }
                }
            }
            RelationLoadStrategy::Query => {
                for path in relations {
                    builder = builder.load_relation_by_query(path);
                }
            }
        }

        builder
    }

    pub fn compile(&self, expr: &QueryExpression) -> Result<(String, Vec<Value>)> {
        self.serializer().compile(expr)
    }

    /// Runs SQL on the executor.
    pub async fn query(&self, sql: &str, params: Vec<Value>) -> Result<Rows> {
        tracing::debug!(sql, params = params.len(), "executing statement");
        self.shared.executor.query(sql, params).await
    }

    /// Compiles and runs a statement of any kind.
    pub async fn execute(&self, query: impl IntoExpression) -> Result<Rows> {
        let expr = query.into_expression()?;
        self.run(&expr).await
    }

    /// Runs a select and returns its rows without materializing them.
    pub async fn get_raw_many(&self, query: impl IntoExpression) -> Result<Rows> {
        let expr = query.into_expression()?;
        self.raw_rows(&expr).await
    }

    pub async fn get_many(&self, query: impl IntoExpression) -> Result<Vec<Entity>> {
        let expr = query.into_expression()?;
        let rows = self.raw_rows(&expr).await?;

        let mut relation_ids = Vec::with_capacity(expr.relation_ids.len());
        for attribute in &expr.relation_ids {
            relation_ids.push(loader::load_relation_ids(self, attribute, &rows).await?);
        }

        let mut relation_counts = Vec::with_capacity(expr.relation_counts.len());
        for attribute in &expr.relation_counts {
            relation_counts.push(loader::load_relation_counts(self, attribute, &rows).await?);
        }

        let mut entities = {
            let serializer = self.serializer();
            Materializer::new(&serializer, &expr)
                .relation_ids(&relation_ids)
                .relation_counts(&relation_counts)
                .transform(&rows, expr.main_alias()?)?
        };

        for path in &expr.relation_loads {
            self.load_path(&mut entities, path).await?;
        }

        Ok(entities)
    }

    pub async fn get_one(&self, query: impl IntoExpression) -> Result<Option<Entity>> {
        Ok(self.get_many(query).await?.into_iter().next())
    }

    /// Resolves a relation of an entity.
    ///
    /// A lazy relation is loaded once: concurrent calls share the in-flight
    /// query and later calls return the cached value. Relations that were
    /// already hydrated are returned as is, and relations that were never
    /// selected are queried.
    pub async fn load(&self, entity: &Entity, property: &str) -> Result<Value> {
        match entity.get_path(property) {
            Some(Value::Lazy(handle)) => {
                let db = self.clone();
                let owner = entity.clone();
                let relation = handle.relation();

                handle
                    .load_with(move || async move { db.load_one(owner, relation).await })
                    .await
            }
            Some(value) => Ok(value.clone()),
            None => {
                let relation = self.relation_of(entity, property)?;
                self.load_one(entity.clone(), relation).await
            }
        }
    }

    /// Loads `property` of every entity with one query per relation and
    /// stores the result in the entities. Dotted paths load each level in
    /// turn.
    pub async fn load_relation(&self, entities: &mut [Entity], property: &str) -> Result<()> {
        self.load_path(entities, property).await
    }

    async fn run(&self, expr: &QueryExpression) -> Result<Rows> {
        let (sql, params) = self.compile(expr)?;
        self.query(&sql, params).await
    }

    pub(crate) async fn raw_rows(&self, expr: &QueryExpression) -> Result<Rows> {
        if expr.kind != QueryKind::Select {
            return Err(Error::invalid_statement(format!(
                "expected a select statement, got {:?}",
                expr.kind
            )));
        }

        self.run(expr).await
    }

    async fn load_one(&self, owner: Entity, relation: RelationId) -> Result<Value> {
        let mut values = ValueLoader::new(self, relation)
            .load(std::slice::from_ref(&owner))
            .await?;
        Ok(values.pop().unwrap_or(Value::Null))
    }

    fn relation_of(&self, entity: &Entity, property: &str) -> Result<RelationId> {
        let metadata = self.registry().entity(entity.target);

        metadata
            .relation_by_property_path(property)
            .map(|relation| relation.id)
            .ok_or_else(|| Error::relation_not_found(&metadata.name, property))
    }

    fn load_path<'a>(
        &'a self,
        entities: &'a mut [Entity],
        path: &'a str,
    ) -> BoxFuture<'a, Result<()>> {
        async move {
            if entities.is_empty() {
                return Ok(());
            }

            let (head, rest) = match path.split_once('.') {
                Some((head, rest)) => (head, Some(rest)),
                None => (path, None),
            };

            // Entities of sibling subtypes may each declare the relation
            let mut owners: IndexMap<RelationId, Vec<usize>> = IndexMap::new();
            for (index, entity) in entities.iter().enumerate() {
                let metadata = self.registry().entity(entity.target);
                if let Some(relation) = metadata.relation_by_property_path(head) {
                    owners.entry(relation.id).or_default().push(index);
                }
            }

            if owners.is_empty() {
                let metadata = self.registry().entity(entities[0].target);
                return Err(Error::relation_not_found(&metadata.name, head));
            }

            for (relation, indices) in owners {
                let batch: Vec<Entity> = indices.iter().map(|&i| entities[i].clone()).collect();
                let values = ValueLoader::new(self, relation).load(&batch).await?;

                for (&index, value) in indices.iter().zip(values) {
                    entities[index].set_path(head, value);
                }
            }

            if let Some(rest) = rest {
                self.load_nested(entities, head, rest).await?;
            }

            Ok(())
        }
        .boxed()
    }

    /// Moves the entities loaded into `head` out of their owners, loads
    /// `rest` on all of them at once and puts them back.
    async fn load_nested(&self, entities: &mut [Entity], head: &str, rest: &str) -> Result<()> {
        enum Slot {
            Missing,
            One,
            Many(usize),
            Other(Value),
        }

        let mut slots = Vec::with_capacity(entities.len());
        let mut nested = vec![];

        for entity in entities.iter_mut() {
            let Some(value) = entity.get_mut(head).map(std::mem::take) else {
                slots.push(Slot::Missing);
                continue;
            };

            slots.push(match value {
                Value::Entity(target) => {
                    nested.push(*target);
                    Slot::One
                }
                Value::List(items) if items.iter().all(|item| item.as_entity().is_some()) => {
                    let len = items.len();
                    nested.extend(items.into_iter().filter_map(|item| match item {
                        Value::Entity(target) => Some(*target),
                        _ => None,
                    }));
                    Slot::Many(len)
                }
                other => Slot::Other(other),
            });
        }

        self.load_path(&mut nested, rest).await?;

        let mut nested = nested.into_iter();
        for (entity, slot) in entities.iter_mut().zip(slots) {
            let value = match slot {
                Slot::Missing => continue,
                Slot::One => nested
                    .next()
                    .map(Value::from)
                    .unwrap_or(Value::Null),
                Slot::Many(len) => {
                    Value::List(nested.by_ref().take(len).map(Value::from).collect())
                }
                Slot::Other(value) => value,
            };
            entity.set(head, value);
        }

        Ok(())
    }
}

impl IntoExpression for QueryExpression {
    fn into_expression(self) -> Result<QueryExpression> {
        Ok(self)
    }
}

impl IntoExpression for SelectBuilder<'_> {
    fn into_expression(self) -> Result<QueryExpression> {
        self.build()
    }
}

impl IntoExpression for InsertBuilder<'_> {
    fn into_expression(self) -> Result<QueryExpression> {
        self.build()
    }
}

impl IntoExpression for UpdateBuilder<'_> {
    fn into_expression(self) -> Result<QueryExpression> {
        self.build()
    }
}

impl IntoExpression for DeleteBuilder<'_> {
    fn into_expression(self) -> Result<QueryExpression> {
        self.build()
    }
}
