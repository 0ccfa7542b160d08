/// Core Module for datalink
///
/// This module contains the fundamental components that form the backbone of
/// the datalink crate. It provides shared infrastructure for database
/// connectivity, error handling, and the dependency graph derived from
/// foreign keys.

pub mod db;
pub mod error;

// Re-export commonly used types for convenience
pub use error::{DataLinkError, Result};
