//! Error types for the persistence service.
//!
//! Two families exist. [`StartupError`] is fatal: the service never starts
//! consuming requests. [`Failure`] is scoped to a single request and travels
//! back to the caller over the bus, tagged with a stable [`ErrorCode`].

use std::fmt;
use std::path::PathBuf;

use serde::{Serialize, Serializer};

/// Machine-readable discriminant attached to every request failure.
///
/// Callers must match on the code, never on the message text. On the wire
/// the code is its ordinal.
///
/// | Code | Variant               |
/// |------|-----------------------|
/// | 0    | `NoActionSpecified`   |
/// | 1    | `BadAction`           |
/// | 2    | `DatabaseError`       |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// The request carried no `action` header.
    NoActionSpecified,
    /// The action is unknown or its payload is malformed.
    BadAction,
    /// The statement failed in the database or the pool.
    DatabaseError,
}

impl ErrorCode {
    /// Returns the numeric code sent on the wire.
    #[must_use]
    pub const fn ordinal(self) -> u32 {
        match self {
            Self::NoActionSpecified => 0,
            Self::BadAction => 1,
            Self::DatabaseError => 2,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NoActionSpecified => "NO_ACTION_SPECIFIED",
            Self::BadAction => "BAD_ACTION",
            Self::DatabaseError => "DB_ERROR",
        };
        write!(f, "{name}")
    }
}

impl Serialize for ErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.ordinal())
    }
}

/// A typed request failure: stable code plus human-readable message.
///
/// Serializes as:
/// ```json
/// { "code": 1, "message": "Bad action: frobnicate" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("[{code}] {message}")]
pub struct Failure {
    /// Stable discriminant.
    pub code: ErrorCode,
    /// Human-readable explanation. Not part of the stable contract.
    pub message: String,
}

impl Failure {
    /// Creates a failure with the given code and message.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Failure for a request without an `action` header.
    #[must_use]
    pub fn no_action() -> Self {
        Self::new(ErrorCode::NoActionSpecified, "No action header specified")
    }

    /// Failure for an unrecognized action name.
    #[must_use]
    pub fn bad_action(action: &str) -> Self {
        Self::new(ErrorCode::BadAction, format!("Bad action: {action}"))
    }

    /// Failure for a known action whose body could not be decoded.
    #[must_use]
    pub fn bad_payload(action: &str, reason: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::BadAction,
            format!("Bad payload for action {action}: {reason}"),
        )
    }
}

impl From<QueryError> for Failure {
    fn from(err: QueryError) -> Self {
        Self::new(ErrorCode::DatabaseError, err.to_string())
    }
}

/// Failure raised while running a single statement.
///
/// Only the message crosses the request boundary, as a
/// [`ErrorCode::DatabaseError`] [`Failure`].
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// Driver, connection, constraint, or decode error.
    #[error("{0}")]
    Sqlx(#[from] sqlx::Error),

    /// The statement did not complete within the configured timeout.
    #[error("query timed out after {0} ms")]
    Timeout(u128),
}

/// Fatal error raised while the service is starting.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// The query catalog source could not be opened or read.
    #[error("cannot read sql queries from {}: {source}", path.display())]
    CatalogRead {
        /// Path of the override resource.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A required query key is absent or maps to empty text.
    #[error("missing sql query `{0}`")]
    MissingQuery(&'static str),

    /// The pool could not open its first connection.
    #[error("could not open a database connection: {0}")]
    Connect(#[source] sqlx::Error),

    /// The create-table statement failed.
    #[error("database preparation error: {0}")]
    Prepare(#[source] QueryError),

    /// The inbound address could not be registered on the bus.
    #[error("bus registration failed: {0}")]
    Bus(#[from] BusError),
}

/// Invalid or incomplete configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A required key was not set.
    #[error("missing required configuration key `{0}`")]
    Missing(&'static str),

    /// A key was set to a value that cannot be parsed.
    #[error("invalid value `{value}` for configuration key `{key}`")]
    Invalid {
        /// Offending key.
        key: &'static str,
        /// Raw value as found.
        value: String,
    },
}

/// Error returned by [`crate::bus::MessageBus`] operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BusError {
    /// No consumer is registered for the address.
    #[error("no handlers for address {0}")]
    NoHandlers(String),

    /// A consumer is already registered for the address.
    #[error("address {0} already has a consumer")]
    AddressInUse(String),

    /// The consumer dropped the message without answering it.
    #[error("message to {0} was dropped without a reply")]
    NoReply(String),

    /// The consumer answered with a typed failure.
    #[error("request failed: {0}")]
    Failed(Failure),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinals_are_stable() {
        assert_eq!(ErrorCode::NoActionSpecified.ordinal(), 0);
        assert_eq!(ErrorCode::BadAction.ordinal(), 1);
        assert_eq!(ErrorCode::DatabaseError.ordinal(), 2);
    }

    #[test]
    fn failure_serializes_code_as_ordinal() {
        let json = serde_json::to_value(Failure::bad_action("frobnicate")).ok();
        assert_eq!(
            json,
            Some(serde_json::json!({ "code": 1, "message": "Bad action: frobnicate" }))
        );
    }

    #[test]
    fn timeout_becomes_database_error() {
        let failure = Failure::from(QueryError::Timeout(2000));
        assert_eq!(failure.code, ErrorCode::DatabaseError);
        assert_eq!(failure.message, "query timed out after 2000 ms");
    }
}
