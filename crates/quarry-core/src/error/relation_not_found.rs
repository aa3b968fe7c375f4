use super::Error;

/// Error when a join or loader path does not name a relation of its alias.
#[derive(Debug)]
pub(super) struct RelationNotFound {
    alias: Box<str>,
    path: Box<str>,
}

impl std::error::Error for RelationNotFound {}

impl core::fmt::Display for RelationNotFound {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "relation \"{}\" was not found on alias \"{}\"",
            self.path, self.alias
        )
    }
}

impl Error {
    /// Creates a relation not found error.
    pub fn relation_not_found(alias: impl Into<String>, path: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::RelationNotFound(RelationNotFound {
            alias: alias.into().into(),
            path: path.into().into(),
        }))
    }

    /// Returns `true` if this error is a relation not found error.
    pub fn is_relation_not_found(&self) -> bool {
        matches!(self.kind(), super::ErrorKind::RelationNotFound(_))
    }
}
