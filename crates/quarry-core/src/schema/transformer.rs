use crate::{stmt::Value, Result};

use std::fmt::Debug;

/// Converts property values to and from their stored representation.
///
/// `to_db` runs on values bound as parameters (WHERE objects, INSERT and
/// UPDATE values), `from_db` on values read from result rows.
pub trait ValueTransformer: Debug + Send + Sync {
    fn to_db(&self, value: Value) -> Result<Value>;

    fn from_db(&self, value: Value) -> Result<Value>;
}
