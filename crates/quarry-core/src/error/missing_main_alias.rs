use super::Error;

/// Error when a statement is compiled before its main alias was set.
#[derive(Debug)]
pub(super) struct MissingMainAlias;

impl std::error::Error for MissingMainAlias {}

impl core::fmt::Display for MissingMainAlias {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.write_str("main alias is not set; call `from` before building the query")
    }
}

impl Error {
    /// Creates a missing main alias error.
    pub fn missing_main_alias() -> Error {
        Error::from(super::ErrorKind::MissingMainAlias(MissingMainAlias))
    }

    /// Returns `true` if this error is a missing main alias error.
    pub fn is_missing_main_alias(&self) -> bool {
        matches!(self.kind(), super::ErrorKind::MissingMainAlias(_))
    }
}
