use std::fmt;

use sled::transaction::{ConflictableTransactionError, TransactionError};

pub type Result<T> = std::result::Result<T, Error>;

/// The kind of record a [`Error::NotFound`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    User,
    Film,
    Genre,
    Mpa,
    Like,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Entity::User => "user",
            Entity::Film => "film",
            Entity::Genre => "genre",
            Entity::Mpa => "MPA rating",
            Entity::Like => "like",
        };
        f.write_str(name)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{0} not found: {1}")]
    NotFound(Entity, String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),
    #[error("corrupt record: {0}")]
    Codec(#[from] bincode::Error),
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl Error {
    pub fn not_found(entity: Entity, id: impl fmt::Display) -> Self {
        Error::NotFound(entity, id.to_string())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(..))
    }
}

impl From<TransactionError<Error>> for Error {
    fn from(err: TransactionError<Error>) -> Self {
        match err {
            TransactionError::Abort(err) => err,
            TransactionError::Storage(err) => Error::Storage(err),
        }
    }
}

/// Aborts the surrounding sled transaction with a domain error.
pub(crate) fn abort<E: Into<Error>>(err: E) -> ConflictableTransactionError<Error> {
    ConflictableTransactionError::Abort(err.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_names_the_entity() {
        let err = Error::not_found(Entity::Mpa, 9);
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "MPA rating not found: 9");
    }

    #[test]
    fn aborted_transaction_unwraps_to_domain_error() {
        let err: Error = TransactionError::Abort(Error::Conflict("taken".to_owned())).into();
        assert!(matches!(err, Error::Conflict(msg) if msg == "taken"));
    }
}
