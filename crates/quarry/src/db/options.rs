use crate::{Dialect, Result};

use serde::Deserialize;

/// Runtime settings of a [`Db`](super::Db).
///
/// Every field has a default, so a partial JSON document is enough:
///
/// ```ignore
/// let options = Options::from_json(
///     r#"{ "dialect": "postgresql", "relation_load_strategy": "query" }"#,
/// )?;
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Compile for this dialect instead of the one the executor reports.
    pub dialect: Option<Dialect>,

    /// Wrap every where clause in parentheses.
    pub isolate_where_statements: bool,

    /// How [`Db::find`](super::Db::find) loads the relations it is asked for.
    pub relation_load_strategy: RelationLoadStrategy,

    /// Synthetic column aliases longer than this are shortened.
    pub max_alias_length: Option<usize>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationLoadStrategy {
    /// Join the relation into the primary query.
    #[default]
    Join,

    /// Load the relation with one follow-up query per relation.
    Query,
}

impl Options {
    pub fn from_json(src: &str) -> Result<Options> {
        Ok(serde_json::from_str(src)?)
    }
}
