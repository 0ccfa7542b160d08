// Core infrastructure modules
pub mod config;
pub mod core;

// Re-export the primary entry points at the crate root
pub use crate::core::db::connection::{Connection, Port, QueryOptions, Schema, TlsPolicy};
pub use crate::core::db::cursor::{Cursor, Row, SqlValue};
pub use crate::core::db::dependencies::{Dependencies, ForeignKey, Node};
pub use crate::core::{DataLinkError, Result};
