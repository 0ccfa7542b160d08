/// Database Module
///
/// This module provides the connectivity layer of datalink, organized into
/// focused submodules:
/// - **Backends** (`backend.rs`): the two physical drivers (MySQL server,
///   embedded SQLite file) behind a single capability trait
/// - **Cursors** (`cursor.rs`): driver-neutral values, rows, and result cursors
/// - **Connection Management** (`connection.rs`): the logical connection with
///   error classification, transactions, and reconnect policy
/// - **Dependencies** (`dependencies.rs`): the foreign-key dependency graph
///
/// All database operations use the crate-wide `DataLinkError` type for
/// consistent error propagation.
pub mod backend;
pub mod connection;
pub mod cursor;
pub mod dependencies;

pub use connection::*;
pub use cursor::*;
pub use dependencies::*;
