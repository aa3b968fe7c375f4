use super::state::State;
use super::QueryKind;
use crate::Registry;

/// Builds a DELETE statement, or the UPDATE that soft-deletes or restores
/// rows through the entity's delete date column.
#[derive(Debug)]
pub struct DeleteBuilder<'a> {
    state: State<'a>,
}

where_methods!(DeleteBuilder);

impl<'a> DeleteBuilder<'a> {
    pub fn new(registry: &'a Registry) -> DeleteBuilder<'a> {
        DeleteBuilder {
            state: State::new(registry, QueryKind::Delete),
        }
    }

    pub fn from(mut self, entity: &str) -> Self {
        self.state.set_main_entity(entity, None);
        self
    }

    /// Marks rows deleted instead of removing them.
    pub fn soft(mut self) -> Self {
        self.state.expr.kind = QueryKind::SoftDelete;
        self
    }

    /// Clears the delete date of soft-deleted rows.
    pub fn restore(mut self) -> Self {
        self.state.expr.kind = QueryKind::Restore;
        self
    }
}
