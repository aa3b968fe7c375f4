use super::Error;

/// Error reported by the executor while running a statement.
///
/// Quarry does not translate these; they are passed through to the caller
/// unchanged.
#[derive(Debug)]
pub(super) struct DriverError {
    inner: anyhow::Error,
}

impl std::error::Error for DriverError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.inner.source()
    }
}

impl core::fmt::Display for DriverError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "driver error: {}", self.inner)
    }
}

impl Error {
    /// Wraps an error originating in the executor.
    pub fn driver(err: impl Into<anyhow::Error>) -> Error {
        Error::from(super::ErrorKind::Driver(DriverError { inner: err.into() }))
    }

    /// Returns `true` if this error originated in the executor.
    pub fn is_driver(&self) -> bool {
        matches!(self.kind(), super::ErrorKind::Driver(_))
    }
}
