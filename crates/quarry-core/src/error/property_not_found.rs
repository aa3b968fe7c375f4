use super::Error;

/// Error when a property path matches no column, relation or embedded
/// object of an entity.
#[derive(Debug)]
pub(super) struct PropertyNotFound {
    entity: Box<str>,
    path: Box<str>,
}

impl std::error::Error for PropertyNotFound {}

impl core::fmt::Display for PropertyNotFound {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "property \"{}\" was not found in \"{}\"",
            self.path, self.entity
        )
    }
}

impl Error {
    /// Creates a property not found error.
    pub fn property_not_found(entity: impl Into<String>, path: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::PropertyNotFound(PropertyNotFound {
            entity: entity.into().into(),
            path: path.into().into(),
        }))
    }

    /// Returns `true` if this error is a property not found error.
    pub fn is_property_not_found(&self) -> bool {
        matches!(self.kind(), super::ErrorKind::PropertyNotFound(_))
    }
}
