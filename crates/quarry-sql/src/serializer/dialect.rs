use super::Serializer;

use quarry_core::{driver::Capability, Registry};

impl<'a> Serializer<'a> {
    pub fn sqlite(registry: &'a Registry) -> Serializer<'a> {
        Serializer::new(registry, Capability::SQLITE)
    }

    pub fn postgresql(registry: &'a Registry) -> Serializer<'a> {
        Serializer::new(registry, Capability::POSTGRESQL)
    }

    pub fn mysql(registry: &'a Registry) -> Serializer<'a> {
        Serializer::new(registry, Capability::MYSQL)
    }
}
