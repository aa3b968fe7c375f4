use super::Error;

/// Error when a soft delete targets an entity without a delete date column.
#[derive(Debug)]
pub(super) struct MissingDeleteDateColumn {
    entity: Box<str>,
}

impl std::error::Error for MissingDeleteDateColumn {}

impl core::fmt::Display for MissingDeleteDateColumn {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "entity \"{}\" does not declare a delete date column",
            self.entity
        )
    }
}

impl Error {
    /// Creates a missing delete date column error.
    pub fn missing_delete_date_column(entity: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::MissingDeleteDateColumn(
            MissingDeleteDateColumn {
                entity: entity.into().into(),
            },
        ))
    }

    /// Returns `true` if this error is a missing delete date column error.
    pub fn is_missing_delete_date_column(&self) -> bool {
        matches!(self.kind(), super::ErrorKind::MissingDeleteDateColumn(_))
    }
}
