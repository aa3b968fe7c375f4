use super::Error;

/// Error when an INSERT or UPDATE is compiled without any values.
#[derive(Debug)]
pub(super) struct ValuesMissing {
    statement: Statement,
}

#[derive(Debug, PartialEq)]
enum Statement {
    Insert,
    Update,
}

impl std::error::Error for ValuesMissing {}

impl core::fmt::Display for ValuesMissing {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match self.statement {
            Statement::Insert => {
                f.write_str("cannot perform insert query because values are not defined")
            }
            Statement::Update => {
                f.write_str("cannot perform update query because update values are not defined")
            }
        }
    }
}

impl Error {
    /// Creates an insert values missing error.
    pub fn insert_values_missing() -> Error {
        Error::from(super::ErrorKind::ValuesMissing(ValuesMissing {
            statement: Statement::Insert,
        }))
    }

    /// Creates an update values missing error.
    pub fn update_values_missing() -> Error {
        Error::from(super::ErrorKind::ValuesMissing(ValuesMissing {
            statement: Statement::Update,
        }))
    }

    /// Returns `true` if an INSERT was compiled without values.
    pub fn is_insert_values_missing(&self) -> bool {
        matches!(
            self.kind(),
            super::ErrorKind::ValuesMissing(err) if err.statement == Statement::Insert
        )
    }

    /// Returns `true` if an UPDATE was compiled without values.
    pub fn is_update_values_missing(&self) -> bool {
        matches!(
            self.kind(),
            super::ErrorKind::ValuesMissing(err) if err.statement == Statement::Update
        )
    }
}
