#![allow(dead_code)]

use quarry_core::{
    schema::{ColumnDef, ColumnType, EmbeddedDef, EntityDef, Generation, RelationDef},
    stmt::{QueryExpression, Record, Value},
    Registry,
};
use quarry_sql::Serializer;

/// Users write posts; posts carry soft-delete, embedded counters and
/// categories; animals are stored in one table.
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
                .column(ColumnDef::new("status", ColumnType::Text))
                .column(ColumnDef::new("deletedAt", ColumnType::Timestamp).delete_date())
                .embedded(
                    EmbeddedDef::new("counters")
                        .column(ColumnDef::new("likes", ColumnType::Integer))
                        .column(ColumnDef::new("views", ColumnType::Integer)),
                )
                .relation(RelationDef::many_to_one("author", "User").inverse_side("posts"))
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
            EntityDef::new("Tick")
                .column(ColumnDef::new("id", ColumnType::Integer).primary().generated(Generation::Increment)),
        )
        .build()
        .expect("fixture registry")
}

pub fn sqlite(registry: &Registry, expr: &QueryExpression) -> (String, Vec<Value>) {
    Serializer::sqlite(registry).compile(expr).expect("compile")
}

pub fn postgresql(registry: &Registry, expr: &QueryExpression) -> (String, Vec<Value>) {
    Serializer::postgresql(registry).compile(expr).expect("compile")
}

pub fn mysql(registry: &Registry, expr: &QueryExpression) -> (String, Vec<Value>) {
    Serializer::mysql(registry).compile(expr).expect("compile")
}

pub fn record<const N: usize>(fields: [(&str, Value); N]) -> Record {
    fields
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
}
