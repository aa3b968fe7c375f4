mod capability;
pub use capability::{Capability, Dialect, PlaceholderStyle};

use crate::{async_trait, stmt::Record, stmt::Value};

use std::fmt::Debug;

/// One result row, keyed by the column aliases the compiler emitted.
pub type Row = Record;

pub type Rows = Vec<Row>;

/// Runs compiled SQL against a database.
///
/// Connection pooling, transactions and retries are the implementor's
/// concern. Errors should be reported with [`Error::driver`].
///
/// [`Error::driver`]: crate::Error::driver
#[async_trait]
pub trait Executor: Debug + Send + Sync + 'static {
    /// Describes the dialect, which informs the compiler.
    fn capability(&self) -> &Capability;

    /// Execute a statement and return every row it produced. Statements
    /// without a result set return no rows.
    async fn query(&self, sql: &str, params: Vec<Value>) -> crate::Result<Rows>;
}
