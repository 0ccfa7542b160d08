/// datalink Error Module
///
/// This module defines the stable error taxonomy that callers of the
/// connection layer depend on. Low-level driver errors are translated into
/// these variants at the single `execute` boundary; no other layer
/// re-interprets raw driver error codes.
use thiserror::Error;

/// Error taxonomy for the connection and dependency layer.
///
/// The classification variants (`LostConnection` through `UnknownAttribute`)
/// are a contract surface: the delete/populate machinery built on top keys
/// its retry and reporting policy off these kinds, not off driver codes.
#[derive(Error, Debug)]
pub enum DataLinkError {
    /// Initial connection attempt failed. Fatal, never retried.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The connection dropped mid-session. Retried automatically only
    /// outside an open transaction.
    #[error("Lost connection: {0}")]
    LostConnection(String),

    /// Insufficient privileges for the attempted statement.
    #[error("Access error: {0} while executing: {1}")]
    Access(String, String),

    /// Duplicate-key constraint violation.
    #[error("Duplicate entry: {0}")]
    Duplicate(String),

    /// Foreign-key constraint violation.
    #[error("Integrity error: {0}")]
    Integrity(String),

    /// SQL syntax error, with the offending query attached for diagnostics.
    #[error("Query syntax error: {0} while executing: {1}")]
    QuerySyntax(String, String),

    /// The query referenced a table that does not exist.
    #[error("Missing table: {0} while executing: {1}")]
    MissingTable(String, String),

    /// A column required by a constraint was not supplied.
    #[error("Missing attribute: {0}")]
    MissingAttribute(String),

    /// The query referenced an unknown column.
    #[error("Unknown attribute: {0}")]
    UnknownAttribute(String),

    /// Transaction protocol violations (e.g. nested transactions).
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Schema-structure violations: cyclic foreign keys, unknown tables in
    /// structural queries, unsupported schema layouts.
    #[error("Schema error: {0}")]
    Schema(String),

    /// Embedded-engine errors that stay backend-specific (pass-through).
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Server errors with no entry in the classification table (pass-through).
    #[error("Server error: {0}")]
    Server(#[from] mysql::Error),

    /// Configuration loading and validation errors.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DataLinkError {
    /// Returns true for errors that indicate a dropped connection and are
    /// eligible for the reconnect-and-retry path.
    pub fn is_lost_connection(&self) -> bool {
        matches!(self, DataLinkError::LostConnection(_))
    }
}

/// Type alias for Result to use DataLinkError as the error type.
pub type Result<T> = std::result::Result<T, DataLinkError>;
