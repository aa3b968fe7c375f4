use super::state::State;
use super::{QueryKind, Record};
use crate::Registry;

/// Builds an UPDATE statement. Assignments are keyed by property path.
#[derive(Debug)]
pub struct UpdateBuilder<'a> {
    state: State<'a>,
}

where_methods!(UpdateBuilder);

impl<'a> UpdateBuilder<'a> {
    pub fn new(registry: &'a Registry) -> UpdateBuilder<'a> {
        UpdateBuilder {
            state: State::new(registry, QueryKind::Update),
        }
    }

    pub fn update(mut self, entity: &str) -> Self {
        self.state.set_main_entity(entity, None);
        self
    }

    /// Replaces the assignments.
    pub fn set(mut self, values: Record) -> Self {
        self.state.expr.values = vec![values];
        self
    }
}
