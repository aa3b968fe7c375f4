#![allow(dead_code)]

use quarry::{
    async_trait,
    driver::{Row, Rows},
    schema::{ColumnDef, ColumnType, EmbeddedDef, EntityDef, Generation, RelationDef},
    Capability, Db, Executor, Record, Registry, Result, Value,
};

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

/// Records every statement it receives and answers with queued row sets.
/// Statements without a queued answer return no rows.
#[derive(Debug, Clone)]
pub struct MockExecutor {
    capability: Capability,
    state: Arc<Mutex<State>>,
}

#[derive(Debug, Default)]
struct State {
    log: Vec<(String, Vec<Value>)>,
    results: VecDeque<Rows>,
}

impl MockExecutor {
    pub fn new(capability: &Capability) -> MockExecutor {
        MockExecutor {
            capability: capability.clone(),
            state: Arc::default(),
        }
    }

    pub fn sqlite() -> MockExecutor {
        MockExecutor::new(&Capability::SQLITE)
    }

    /// Queues the rows returned by the next statement.
    pub fn push(&self, rows: Rows) -> &Self {
        self.state.lock().unwrap().results.push_back(rows);
        self
    }

    pub fn log(&self) -> Vec<(String, Vec<Value>)> {
        self.state.lock().unwrap().log.clone()
    }

    pub fn statements(&self) -> Vec<String> {
        self.log().into_iter().map(|(sql, _)| sql).collect()
    }
}

#[async_trait]
impl Executor for MockExecutor {
    fn capability(&self) -> &Capability {
        &self.capability
    }

    async fn query(&self, sql: &str, params: Vec<Value>) -> Result<Rows> {
        let mut state = self.state.lock().unwrap();
        state.log.push((sql.to_string(), params));
        Ok(state.results.pop_front().unwrap_or_default())
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Users write posts and edit them; posts carry soft-delete, embedded
/// counters and categories; animals share one table; memberships have a
/// composite key.
pub fn registry() -> Registry {
    Registry::builder()
        .entity(
            EntityDef::new("User")
                .column(ColumnDef::new("id", ColumnType::Integer).primary().generated(Generation::Increment))
                .column(ColumnDef::new("name", ColumnType::Text))
                .relation(RelationDef::one_to_many("posts", "Post", "author")),
        )
        .entity(
            EntityDef::new("Post")
                .column(ColumnDef::new("id", ColumnType::Integer).primary().generated(Generation::Increment))
                .column(ColumnDef::new("title", ColumnType::Text))
                .column(ColumnDef::new("deletedAt", ColumnType::Timestamp).delete_date())
                .embedded(
                    EmbeddedDef::new("counters")
                        .column(ColumnDef::new("likes", ColumnType::Integer))
                        .column(ColumnDef::new("views", ColumnType::Integer)),
                )
                .relation(RelationDef::many_to_one("author", "User").inverse_side("posts"))
                .relation(RelationDef::many_to_one("editor", "User").lazy())
                .relation(RelationDef::many_to_many("categories", "Category")),
        )
        .entity(
            EntityDef::new("Category")
                .column(ColumnDef::new("id", ColumnType::Integer).primary().generated(Generation::Increment))
                .column(ColumnDef::new("name", ColumnType::Text)),
        )
        .entity(
            EntityDef::new("Animal")
                .discriminator(ColumnDef::new("type", ColumnType::Text))
                .column(ColumnDef::new("id", ColumnType::Integer).primary())
                .column(ColumnDef::new("name", ColumnType::Text)),
        )
        .entity(
            EntityDef::new("Cat")
                .extends("Animal")
                .discriminator_value("cat")
                .column(ColumnDef::new("lives", ColumnType::Integer)),
        )
        .entity(
            EntityDef::new("Dog")
                .extends("Animal")
                .discriminator_value("dog")
                .column(ColumnDef::new("breed", ColumnType::Text)),
        )
        .entity(
            EntityDef::new("Account")
                .column(ColumnDef::new("id", ColumnType::Integer).primary())
                .relation(RelationDef::one_to_many("memberships", "Membership", "account")),
        )
        .entity(
            EntityDef::new("Membership")
                .column(ColumnDef::new("org", ColumnType::Integer).primary())
                .column(ColumnDef::new("seat", ColumnType::Text).primary())
                .column(ColumnDef::new("role", ColumnType::Text))
                .relation(RelationDef::many_to_one("account", "Account").inverse_side("memberships")),
        )
        .entity(
            EntityDef::new("Article")
                .column(ColumnDef::new("title", ColumnType::Text).primary())
                .column(ColumnDef::new("contents", ColumnType::Text))
                .column(ColumnDef::new("author", ColumnType::Text).nullable()),
        )
        .build()
        .expect("fixture registry")
}

pub fn db(executor: &MockExecutor) -> Db {
    Db::builder()
        .registry(registry())
        .executor(executor.clone())
        .build()
        .expect("db")
}

pub fn record<const N: usize>(fields: [(&str, Value); N]) -> Record {
    fields
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
}

pub fn row<const N: usize>(fields: [(&str, Value); N]) -> Row {
    record(fields)
}
