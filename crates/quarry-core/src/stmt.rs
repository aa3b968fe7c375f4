//! The per-query expression model and the builders that assemble it.
//!
//! Builders borrow the [`Registry`](crate::Registry) so property paths,
//! relations and entity names are resolved while the query is put together.
//! The resulting [`QueryExpression`] is plain data handed to the compiler.

#[macro_use]
mod state;

mod alias;
pub use alias::{Alias, AliasSource};

mod condition;
pub use condition::{CompareOp, Condition, Operand, WhereClause, WhereKind};

mod cte;
pub use cte::{Cte, CteBody};

mod delete;
pub use delete::DeleteBuilder;

mod entity;
pub use entity::Entity;

mod expr;
pub use expr::{
    junction_alias,
    Join, JoinDirection, Nulls, Order, OrderBy, QueryExpression, QueryKind,
    RelationCountAttribute, RelationIdAttribute, SelectItem,
};

mod find_operator;
pub use find_operator::{FindOperator, RawSql};

mod insert;
pub use insert::InsertBuilder;

mod key;
pub use key::Key;

mod lazy;
pub use lazy::LazyRelation;

mod select;
pub use select::SelectBuilder;

mod update;
pub use update::UpdateBuilder;

mod value;
pub use value::Value;

mod where_input;
pub use where_input::{Brackets, FindWhere, WhereInput, WhereValue};

use indexmap::IndexMap;

/// Property values keyed by name, in declaration order.
pub type Record = IndexMap<String, Value>;

/// Reads a value by dotted property path, descending through nested records
/// and entities.
pub fn record_path<'a>(record: &'a Record, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = record.get(segments.next()?)?;

    for segment in segments {
        current = match current {
            Value::Record(record) => record.get(segment)?,
            Value::Entity(entity) => entity.fields.get(segment)?,
            _ => return None,
        };
    }

    Some(current)
}

/// Writes a value by dotted property path, creating intermediate records as
/// needed.
pub fn set_record_path(record: &mut Record, path: &str, value: Value) {
    entity::set_record_path(record, path, value)
}
