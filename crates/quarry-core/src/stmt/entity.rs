use super::{Record, Value};
use crate::schema::EntityId;

/// A materialized entity: the metadata it was built from and its property
/// values, keyed by property name. Embedded objects are nested records,
/// relations hold entities, lists of entities or lazy handles.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub target: EntityId,
    pub fields: Record,
}

impl Entity {
    pub fn new(target: EntityId) -> Entity {
        Entity {
            target,
            fields: Record::new(),
        }
    }

    pub fn get(&self, property: &str) -> Option<&Value> {
        self.fields.get(property)
    }

    pub fn get_mut(&mut self, property: &str) -> Option<&mut Value> {
        self.fields.get_mut(property)
    }

    /// Reads a value by dotted property path, descending through embedded
    /// records and to-one relations.
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        super::record_path(&self.fields, path)
    }

    /// Writes a value by dotted property path, creating intermediate records
    /// for embedded segments as needed.
    pub fn set_path(&mut self, path: &str, value: Value) {
        set_record_path(&mut self.fields, path, value);
    }

    pub fn set(&mut self, property: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(property.into(), value.into());
    }
}

pub(crate) fn set_record_path(record: &mut Record, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            record.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let slot = record
                .entry(head.to_string())
                .or_insert_with(|| Value::Record(Record::new()));

            match slot {
                Value::Record(nested) => set_record_path(nested, rest, value),
                Value::Entity(entity) => set_record_path(&mut entity.fields, rest, value),
                other => {
                    let mut nested = Record::new();
                    set_record_path(&mut nested, rest, value);
                    *other = Value::Record(nested);
                }
            }
        }
    }
}
