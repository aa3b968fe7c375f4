use super::Error;

/// Error when a target name does not resolve to registered entity metadata.
#[derive(Debug)]
pub(super) struct EntityNotFound {
    target: Box<str>,
}

impl std::error::Error for EntityNotFound {}

impl core::fmt::Display for EntityNotFound {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "no metadata registered for \"{}\"", self.target)
    }
}

impl Error {
    /// Creates an entity not found error.
    pub fn entity_not_found(target: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::EntityNotFound(EntityNotFound {
            target: target.into().into(),
        }))
    }

    /// Returns `true` if this error is an entity not found error.
    pub fn is_entity_not_found(&self) -> bool {
        matches!(self.kind(), super::ErrorKind::EntityNotFound(_))
    }
}
