use super::state::State;
use super::{record_path, set_record_path, QueryExpression, QueryKind, Record, Value};
use crate::{schema::Generation, Registry, Result};

/// Builds an INSERT statement from records keyed by property path.
///
/// Embedded objects are nested records and to-one relations hold the
/// related entity, or a record of its key properties.
#[derive(Debug)]
pub struct InsertBuilder<'a> {
    state: State<'a>,
}

impl<'a> InsertBuilder<'a> {
    pub fn new(registry: &'a Registry) -> InsertBuilder<'a> {
        InsertBuilder {
            state: State::new(registry, QueryKind::Insert),
        }
    }

    pub fn into(mut self, entity: &str) -> Self {
        self.state.set_main_entity(entity, None);
        self
    }

    pub fn value(self, row: Record) -> Self {
        self.values([row])
    }

    /// Adds rows to insert. Primary columns generated as UUIDs are filled in
    /// when missing.
    pub fn values(mut self, rows: impl IntoIterator<Item = Record>) -> Self {
        let rows: Vec<Record> = rows.into_iter().collect();

        self.state.attempt(|state| {
            let metadata = state.registry.entity(state.expr.main_entity()?);

            for mut row in rows {
                for column in metadata.hydrated_columns() {
                    if column.generation != Some(Generation::Uuid) {
                        continue;
                    }

                    let missing = record_path(&row, &column.property_path)
                        .map_or(true, Value::is_null);

                    if missing {
                        let id = uuid::Uuid::new_v4().to_string();
                        set_record_path(&mut row, &column.property_path, id.into());
                    }
                }

                state.expr.values.push(row);
            }

            Ok(())
        });
        self
    }

    pub fn build(self) -> Result<QueryExpression> {
        self.state.finish()
    }
}
