/// Connection Management Module
///
/// This module provides the logical database connection: construction against
/// either backend, query execution with error classification and reconnect
/// policy, transaction lifecycle management, and schema registration for the
/// dependency graph.
use crate::config::Settings;
use crate::core::db::backend::{Backend, MySqlBackend, SqliteBackend};
use crate::core::db::cursor::{Cursor, SqlValue};
use crate::core::db::dependencies::Dependencies;
use crate::core::{DataLinkError, Result};
use std::collections::BTreeMap;
use std::fmt;

pub use crate::core::db::backend::TlsPolicy;

/// Port specification: a TCP port for the networked backend, or the reserved
/// sentinel selecting the embedded-file backend (in which case the host value
/// is interpreted as a file path).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Port {
    Tcp(u16),
    Embedded,
}

/// Registration handle for a schema.
///
/// The connection only indexes schemas by name so dependency introspection
/// knows which schemas to scan; it never inspects schema internals.
#[derive(Debug, Clone)]
pub struct Schema {
    pub database: String,
}

impl Schema {
    pub fn new(database: impl Into<String>) -> Self {
        Schema {
            database: database.into(),
        }
    }
}

/// Options for a single `execute` call.
#[derive(Debug, Clone)]
pub struct QueryOptions {
    /// Return rows as column-name-keyed maps instead of positional tuples.
    pub as_dict: bool,
    /// Swallow driver-level warnings instead of logging them.
    pub suppress_warnings: bool,
    /// Reconnect on a lost connection: explicit true/false, or `None` to use
    /// the configured default.
    pub reconnect: Option<bool>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        QueryOptions {
            as_dict: false,
            suppress_warnings: true,
            reconnect: None,
        }
    }
}

/// Connection parameters. The password never appears in Debug output or logs.
#[derive(Clone, PartialEq, Eq)]
struct ConnInfo {
    host: String,
    port: Option<u16>,
    user: String,
    password: String,
}

impl ConnInfo {
    fn endpoint(&self) -> String {
        match self.port {
            Some(port) => format!("{}:{}", self.host, port),
            None => self.host.clone(),
        }
    }
}

impl fmt::Debug for ConnInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnInfo")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"****")
            .finish()
    }
}

/// A logical connection to one database backend.
///
/// Owns exactly one physical driver handle at a time (`connect` replaces it
/// wholesale), the transaction bracket state, the registered schemas, and the
/// foreign-key dependency graph derived from them.
pub struct Connection {
    conn_info: ConnInfo,
    backend: Box<dyn Backend>,
    settings: Settings,
    session_id: Option<u64>,
    in_transaction: bool,
    schemas: BTreeMap<String, Schema>,
    dependencies: Dependencies,
}

impl Connection {
    /// Connects with default settings. See [`Connection::with_settings`].
    pub fn new(
        host: &str,
        user: &str,
        password: &str,
        port: Option<Port>,
        init_command: Option<String>,
        tls: TlsPolicy,
    ) -> Result<Connection> {
        Connection::with_settings(host, user, password, port, init_command, tls, Settings::default())
    }

    /// Establishes a connection.
    ///
    /// * `host` - server host name, which may embed a port as `host:port`
    ///   (overriding the `port` argument); with `Port::Embedded` it is the
    ///   database file path instead.
    /// * `port` - TCP port, the embedded sentinel, or `None` to use
    ///   `settings.default_port`.
    /// * `init_command` - SQL run by the server backend at connect time.
    /// * `tls` - TLS policy for the server backend; ignored by the embedded
    ///   backend.
    ///
    /// Fails with `DataLinkError::Connection` if the resulting handle does
    /// not report connected. That failure is fatal and not retried.
    pub fn with_settings(
        host: &str,
        user: &str,
        password: &str,
        port: Option<Port>,
        init_command: Option<String>,
        tls: TlsPolicy,
        settings: Settings,
    ) -> Result<Connection> {
        let (backend, conn_info): (Box<dyn Backend>, ConnInfo) = match port {
            Some(Port::Embedded) => (
                Box::new(SqliteBackend::new(host.to_string())),
                ConnInfo {
                    host: host.to_string(),
                    port: None,
                    user: user.to_string(),
                    password: password.to_string(),
                },
            ),
            _ => {
                // A port embedded in the host string overrides the argument
                let (host, port) = match host.split_once(':') {
                    Some((name, embedded)) => (
                        name.to_string(),
                        embedded.parse::<u16>().map_err(|_| {
                            DataLinkError::Connection(format!(
                                "invalid port in host specification '{}'",
                                host
                            ))
                        })?,
                    ),
                    None => (
                        host.to_string(),
                        match port {
                            Some(Port::Tcp(p)) => p,
                            _ => settings.default_port,
                        },
                    ),
                };
                let backend = MySqlBackend::new(
                    host.clone(),
                    port,
                    user.to_string(),
                    password.to_string(),
                    init_command,
                    settings.charset.clone(),
                    tls,
                );
                (
                    Box::new(backend),
                    ConnInfo {
                        host,
                        port: Some(port),
                        user: user.to_string(),
                        password: password.to_string(),
                    },
                )
            }
        };

        let mut connection = Connection {
            conn_info,
            backend,
            settings,
            session_id: None,
            in_transaction: false,
            schemas: BTreeMap::new(),
            dependencies: Dependencies::new(),
        };

        tracing::info!(
            "connecting {}@{}",
            connection.conn_info.user,
            connection.conn_info.endpoint()
        );
        connection.backend.connect()?;
        if !connection.backend.ping() {
            return Err(DataLinkError::Connection("connection failed".to_string()));
        }
        connection.session_id = connection.backend.session_id()?;
        tracing::info!(
            "connected {}@{}",
            connection.conn_info.user,
            connection.conn_info.endpoint()
        );
        Ok(connection)
    }

    /// Executes a statement with positional `?` placeholders and returns a
    /// cursor positioned for sequential row fetch.
    ///
    /// On a recoverable connection-loss error with reconnect resolved true,
    /// the physical handle is replaced and the statement re-executed exactly
    /// once. A connection lost inside an open transaction is never silently
    /// retried: the transaction is rolled back and `LostConnection` surfaces.
    pub fn execute(&mut self, sql: &str, args: &[SqlValue], options: QueryOptions) -> Result<Cursor> {
        let reconnect = options.reconnect.unwrap_or(self.settings.reconnect);
        let preview: String = sql.chars().take(300).collect();
        tracing::debug!("executing SQL: {}", preview);

        match self
            .backend
            .execute(sql, args, options.as_dict, options.suppress_warnings)
        {
            Err(err) if err.is_lost_connection() && reconnect => {
                tracing::warn!("connection lost; reconnecting to the server");
                self.backend.connect()?;
                if self.in_transaction {
                    self.cancel_transaction()?;
                    return Err(DataLinkError::LostConnection(
                        "connection was lost during a transaction".to_string(),
                    ));
                }
                tracing::debug!("re-executing");
                self.backend
                    .execute(sql, args, options.as_dict, options.suppress_warnings)
            }
            other => other,
        }
    }

    /// Convenience wrapper over [`Connection::execute`] with default options.
    pub fn query(&mut self, sql: &str) -> Result<Cursor> {
        self.execute(sql, &[], QueryOptions::default())
    }

    /// True if the connection responds to a no-reconnect ping. The embedded
    /// backend is considered connected as long as the file is open.
    pub fn is_connected(&mut self) -> bool {
        self.backend.ping()
    }

    /// Drops the physical handle.
    pub fn close(&mut self) {
        self.backend.disconnect();
    }

    /// Session identifier assigned by the server backend, if any.
    pub fn session_id(&self) -> Option<u64> {
        self.session_id
    }

    /// The user name as authenticated by the backend.
    pub fn user(&mut self) -> Result<String> {
        match self.backend.current_user_sql() {
            Some(sql) => {
                let mut cursor = self.execute(sql, &[], QueryOptions::default())?;
                cursor
                    .fetch_one()
                    .and_then(|row| row.get(0).and_then(|v| v.as_str().map(String::from)))
                    .ok_or_else(|| {
                        DataLinkError::Connection("server did not report a user".to_string())
                    })
            }
            None => Ok(self.conn_info.user.clone()),
        }
    }

    /// Stores a back-reference to a schema so dependency introspection knows
    /// which schemas to scan.
    pub fn register(&mut self, schema: Schema) {
        self.schemas.insert(schema.database.clone(), schema);
    }

    /// Names of all registered schemas, sorted.
    pub fn schema_names(&self) -> Vec<String> {
        self.schemas.keys().cloned().collect()
    }

    pub(crate) fn primary_key_query(&self) -> Result<String> {
        self.backend.primary_key_query(&self.schema_names())
    }

    pub(crate) fn foreign_key_query(&self) -> Result<String> {
        self.backend.foreign_key_query(&self.schema_names())
    }

    /// Rebuilds the owned dependency graph from live schema introspection.
    pub fn load_dependencies(&mut self) -> Result<()> {
        let mut graph = std::mem::take(&mut self.dependencies);
        let result = graph.load(self);
        self.dependencies = graph;
        result
    }

    /// The owned dependency graph. Empty until `load_dependencies` is called.
    pub fn dependencies(&self) -> &Dependencies {
        &self.dependencies
    }

    // ---------- transaction processing

    /// True while a transaction bracket is open.
    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    /// Opens a transaction. Nested transactions are not supported.
    pub fn start_transaction(&mut self) -> Result<()> {
        if self.in_transaction {
            return Err(DataLinkError::Transaction(
                "nested transactions are not supported".to_string(),
            ));
        }
        let sql = self.backend.start_transaction_sql();
        self.execute(sql, &[], QueryOptions::default())?;
        self.in_transaction = true;
        tracing::info!("transaction started");
        Ok(())
    }

    /// Rolls back the current transaction and marks the bracket closed.
    pub fn cancel_transaction(&mut self) -> Result<()> {
        self.end_transaction("ROLLBACK")?;
        tracing::info!("transaction cancelled, rolling back");
        Ok(())
    }

    /// Commits the current transaction and marks the bracket closed.
    pub fn commit_transaction(&mut self) -> Result<()> {
        self.end_transaction("COMMIT")?;
        tracing::info!("transaction committed and closed");
        Ok(())
    }

    fn end_transaction(&mut self, sql: &'static str) -> Result<()> {
        let result = self.execute(sql, &[], QueryOptions::default());
        // The bracket is closed no matter how the statement fared
        self.in_transaction = false;
        match result {
            Ok(_) => Ok(()),
            // The embedded engine may have ended the transaction on its own
            Err(err) if self.backend.is_transaction_autoclosed(&err) => Ok(()),
            Err(err) => Err(err),
        }
    }

    /// Scoped transaction: opens a transaction, runs `f`, commits on success
    /// and rolls back on error. The bracket is closed on every exit path.
    pub fn transaction<T>(&mut self, f: impl FnOnce(&mut Connection) -> Result<T>) -> Result<T> {
        self.start_transaction()?;
        match f(self) {
            Ok(value) => {
                self.commit_transaction()?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = self.cancel_transaction() {
                    tracing::warn!("rollback after failed transaction unit: {}", rollback_err);
                }
                Err(err)
            }
        }
    }
}

impl PartialEq for Connection {
    fn eq(&self, other: &Self) -> bool {
        self.conn_info == other.conn_info
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("conn_info", &self.conn_info)
            .field("session_id", &self.session_id)
            .field("in_transaction", &self.in_transaction)
            .finish()
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "datalink connection ({}) {}@{}",
            if self.backend.is_open() {
                "connected"
            } else {
                "disconnected"
            },
            self.conn_info.user,
            self.conn_info.endpoint()
        )
    }
}
