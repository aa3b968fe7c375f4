mod adhoc;
mod ambiguous_primary_key;
mod driver;
mod entity_not_found;
mod invalid_result;
mod invalid_schema;
mod invalid_statement;
mod missing_delete_date_column;
mod missing_main_alias;
mod property_not_found;
mod relation_not_found;
mod unsupported_feature;
mod values_missing;

use adhoc::AdhocError;
use ambiguous_primary_key::AmbiguousPrimaryKey;
use driver::DriverError;
use entity_not_found::EntityNotFound;
use invalid_result::InvalidResult;
use invalid_schema::InvalidSchema;
use invalid_statement::InvalidStatement;
use missing_delete_date_column::MissingDeleteDateColumn;
use missing_main_alias::MissingMainAlias;
use property_not_found::PropertyNotFound;
use relation_not_found::RelationNotFound;
use std::sync::Arc;
use unsupported_feature::UnsupportedFeature;
use values_missing::ValuesMissing;

/// Returns early with an ad-hoc error built from format arguments.
#[macro_export]
macro_rules! bail {
    ($($arg:tt)*) => {
        return Err($crate::Error::from_args(format_args!($($arg)*)))
    };
}

/// Creates an ad-hoc error from format arguments.
#[macro_export]
macro_rules! err {
    ($($arg:tt)*) => {
        $crate::Error::from_args(format_args!($($arg)*))
    };
}

/// An error that can occur while building, compiling or materializing a
/// query.
#[derive(Clone)]
pub struct Error {
    inner: Option<Arc<ErrorInner>>,
}

#[derive(Debug)]
struct ErrorInner {
    kind: ErrorKind,
    cause: Option<Error>,
}

impl Error {
    /// Adds context to this error.
    ///
    /// Context is displayed in reverse order: the most recently added context
    /// is shown first, followed by earlier context, ending with the root cause.
    #[inline(always)]
    pub fn context(self, consequent: impl IntoError) -> Error {
        self.context_impl(consequent.into_error())
    }

    #[inline(never)]
    #[cold]
    fn context_impl(self, consequent: Error) -> Error {
        let kind = match consequent.inner {
            Some(inner) => match Arc::try_unwrap(inner) {
                Ok(inner) => inner.kind,
                Err(shared) => ErrorKind::Adhoc(AdhocError::new(shared.kind.to_string())),
            },
            None => ErrorKind::Unknown,
        };

        Error {
            inner: Some(Arc::new(ErrorInner {
                kind,
                cause: Some(self),
            })),
        }
    }

    fn chain(&self) -> impl Iterator<Item = &Error> {
        let mut err = self;
        core::iter::once(err).chain(core::iter::from_fn(move || {
            err = err.inner.as_ref().and_then(|inner| inner.cause.as_ref())?;
            Some(err)
        }))
    }

    fn kind(&self) -> &ErrorKind {
        self.inner
            .as_ref()
            .map(|inner| &inner.kind)
            .unwrap_or(&ErrorKind::Unknown)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self.kind() {
            ErrorKind::Driver(err) => Some(err),
            ErrorKind::Anyhow(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        let mut it = self.chain().peekable();
        while let Some(err) = it.next() {
            core::fmt::Display::fmt(err.kind(), f)?;
            if it.peek().is_some() {
                f.write_str(": ")?;
            }
        }
        Ok(())
    }
}

impl core::fmt::Debug for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        if !f.alternate() {
            core::fmt::Display::fmt(self, f)
        } else {
            let Some(ref inner) = self.inner else {
                return f.debug_struct("Error").field("kind", &"None").finish();
            };
            f.debug_struct("Error")
                .field("kind", &inner.kind)
                .field("cause", &inner.cause)
                .finish()
        }
    }
}

#[derive(Debug)]
enum ErrorKind {
    Anyhow(anyhow::Error),
    Adhoc(AdhocError),
    AmbiguousPrimaryKey(AmbiguousPrimaryKey),
    Driver(DriverError),
    EntityNotFound(EntityNotFound),
    InvalidResult(InvalidResult),
    InvalidSchema(InvalidSchema),
    InvalidStatement(InvalidStatement),
    MissingDeleteDateColumn(MissingDeleteDateColumn),
    MissingMainAlias(MissingMainAlias),
    PropertyNotFound(PropertyNotFound),
    RelationNotFound(RelationNotFound),
    UnsupportedFeature(UnsupportedFeature),
    ValuesMissing(ValuesMissing),
    Unknown,
}

impl core::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        use self::ErrorKind::*;

        match self {
            Anyhow(err) => core::fmt::Display::fmt(err, f),
            Adhoc(err) => core::fmt::Display::fmt(err, f),
            AmbiguousPrimaryKey(err) => core::fmt::Display::fmt(err, f),
            Driver(err) => core::fmt::Display::fmt(err, f),
            EntityNotFound(err) => core::fmt::Display::fmt(err, f),
            InvalidResult(err) => core::fmt::Display::fmt(err, f),
            InvalidSchema(err) => core::fmt::Display::fmt(err, f),
            InvalidStatement(err) => core::fmt::Display::fmt(err, f),
            MissingDeleteDateColumn(err) => core::fmt::Display::fmt(err, f),
            MissingMainAlias(err) => core::fmt::Display::fmt(err, f),
            PropertyNotFound(err) => core::fmt::Display::fmt(err, f),
            RelationNotFound(err) => core::fmt::Display::fmt(err, f),
            UnsupportedFeature(err) => core::fmt::Display::fmt(err, f),
            ValuesMissing(err) => core::fmt::Display::fmt(err, f),
            Unknown => f.write_str("unknown quarry error"),
        }
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Error {
        Error {
            inner: Some(Arc::new(ErrorInner { kind, cause: None })),
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Error {
        Error::from(ErrorKind::Anyhow(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Error {
        Error::from(anyhow::Error::from(err))
    }
}

/// Trait for types that can be converted into an Error.
pub trait IntoError {
    /// Converts this type into an Error.
    fn into_error(self) -> Error;
}

impl IntoError for Error {
    #[inline(always)]
    fn into_error(self) -> Error {
        self
    }
}

impl IntoError for &str {
    fn into_error(self) -> Error {
        Error::from_args(format_args!("{self}"))
    }
}

impl IntoError for String {
    fn into_error(self) -> Error {
        Error::from(ErrorKind::Adhoc(AdhocError::new(self)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_size() {
        // Ensure Error stays at one word (size of pointer/Arc)
        let expected_size = core::mem::size_of::<usize>();
        assert_eq!(expected_size, core::mem::size_of::<Error>());
    }

    #[test]
    fn error_from_args() {
        let err = Error::from_args(format_args!("test error: {}", 42));
        assert_eq!(err.to_string(), "test error: 42");
    }

    #[test]
    fn error_chain_display() {
        let root = Error::property_not_found("Post", "titel");
        let chained = root.context("while compiling query");
        assert_eq!(
            chained.to_string(),
            "while compiling query: property \"titel\" was not found in \"Post\""
        );
    }

    #[test]
    fn anyhow_bridge() {
        let anyhow_err = anyhow::anyhow!("connection reset");
        let our_err: Error = anyhow_err.into();
        assert_eq!(our_err.to_string(), "connection reset");
    }

    #[test]
    fn predicates_distinguish_kinds() {
        let not_found = Error::property_not_found("Post", "nope");
        assert!(not_found.is_property_not_found());
        assert!(!not_found.is_invalid_statement());

        let malformed = Error::invalid_statement("to-many relation in where object");
        assert!(malformed.is_invalid_statement());
        assert!(!malformed.is_property_not_found());
    }

    #[test]
    fn clones_share_the_same_message() {
        let err = Error::missing_main_alias();
        let copy = err.clone();
        assert_eq!(err.to_string(), copy.to_string());
        assert!(copy.is_missing_main_alias());
    }
}
