use super::Error;

/// Error when a scalar id is given for an entity whose primary key spans
/// several columns.
///
/// Raised before any query executes.
#[derive(Debug)]
pub(super) struct AmbiguousPrimaryKey {
    entity: Box<str>,
    columns: usize,
}

impl std::error::Error for AmbiguousPrimaryKey {}

impl core::fmt::Display for AmbiguousPrimaryKey {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "entity \"{}\" has a composite primary key of {} columns; a scalar id cannot address it",
            self.entity, self.columns
        )
    }
}

impl Error {
    /// Creates an ambiguous primary key error.
    pub fn ambiguous_primary_key(entity: impl Into<String>, columns: usize) -> Error {
        Error::from(super::ErrorKind::AmbiguousPrimaryKey(AmbiguousPrimaryKey {
            entity: entity.into().into(),
            columns,
        }))
    }

    /// Returns `true` if this error is an ambiguous primary key error.
    pub fn is_ambiguous_primary_key(&self) -> bool {
        matches!(self.kind(), super::ErrorKind::AmbiguousPrimaryKey(_))
    }
}
