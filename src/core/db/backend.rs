/// Backend Module
///
/// The two physical drivers behind a logical connection: a networked MySQL
/// server and an embedded SQLite file. Each backend owns its driver handle
/// and its driver-error translation; everything above this trait sees only
/// `Cursor` results and `DataLinkError` values.
use crate::core::db::cursor::{Cursor, SqlValue};
use crate::core::{DataLinkError, Result};
use std::process::Command;

/// Strict SQL mode flags applied to every server session (reject zero dates,
/// division by zero, silent engine substitution).
const SQL_MODE: &str = "NO_ZERO_DATE,NO_ZERO_IN_DATE,ERROR_FOR_DIVISION_BY_ZERO,\
                        STRICT_ALL_TABLES,NO_ENGINE_SUBSTITUTION";

/// TLS negotiation policy for the networked backend.
#[derive(Debug, Clone, Default)]
pub enum TlsPolicy {
    /// Use TLS when the server supports it; fall back to plaintext when the
    /// option set is rejected.
    #[default]
    Preferred,
    /// TLS must be negotiated; connection errors are not retried without it.
    Required,
    /// Never negotiate TLS.
    Disabled,
    /// Explicit driver TLS options, passed through unmodified.
    Custom(mysql::SslOpts),
}

impl TlsPolicy {
    fn explicit(&self) -> bool {
        !matches!(self, TlsPolicy::Preferred)
    }
}

/// Capability provided by each physical driver.
///
/// The connection manager depends only on this trait; there are no backend
/// identity checks above it.
pub(crate) trait Backend {
    /// Opens a fresh driver handle, replacing any existing one wholesale.
    fn connect(&mut self) -> Result<()>;

    /// Drops the driver handle.
    fn disconnect(&mut self);

    /// True while a driver handle exists.
    fn is_open(&self) -> bool;

    /// Runs one statement with positional arguments and buffers the result.
    fn execute(
        &mut self,
        sql: &str,
        args: &[SqlValue],
        as_dict: bool,
        suppress_warnings: bool,
    ) -> Result<Cursor>;

    /// Liveness probe without reconnecting.
    fn ping(&mut self) -> bool;

    /// Backend-assigned session identifier, when the backend has one.
    fn session_id(&mut self) -> Result<Option<u64>>;

    /// Statement that opens a transaction on this backend.
    fn start_transaction_sql(&self) -> &'static str;

    /// Statement returning the authenticated user, when the backend tracks one.
    fn current_user_sql(&self) -> Option<&'static str> {
        None
    }

    /// True when `err` only means the engine already closed the transaction
    /// on its own, so COMMIT/ROLLBACK may treat it as a no-op.
    fn is_transaction_autoclosed(&self, _err: &DataLinkError) -> bool {
        false
    }

    /// Introspection query listing `(qualified_table, primary_key_column)`
    /// rows for the registered schemas.
    fn primary_key_query(&self, schemas: &[String]) -> Result<String>;

    /// Introspection query listing `(constraint, referencing_table,
    /// referenced_table, referencing_column, referenced_column)` rows in
    /// declaration order.
    fn foreign_key_query(&self, schemas: &[String]) -> Result<String>;
}

// ---------------------------------------------------------------------------
// Networked backend
// ---------------------------------------------------------------------------

/// Networked MySQL backend.
pub(crate) struct MySqlBackend {
    host: String,
    port: u16,
    user: String,
    password: String,
    init_command: Option<String>,
    charset: String,
    tls: TlsPolicy,
    conn: Option<mysql::Conn>,
}

impl MySqlBackend {
    pub(crate) fn new(
        host: String,
        port: u16,
        user: String,
        password: String,
        init_command: Option<String>,
        charset: String,
        tls: TlsPolicy,
    ) -> Self {
        MySqlBackend {
            host,
            port,
            user,
            password,
            init_command,
            charset,
            tls,
            conn: None,
        }
    }

    fn build_opts(&self, with_tls: bool) -> mysql::Opts {
        let mut init = vec![
            format!("SET SESSION sql_mode='{}'", SQL_MODE),
            format!("SET NAMES {}", self.charset),
        ];
        if let Some(cmd) = &self.init_command {
            init.push(cmd.clone());
        }
        let mut builder = mysql::OptsBuilder::new()
            .ip_or_hostname(Some(self.host.clone()))
            .tcp_port(self.port)
            .user(Some(self.user.clone()))
            .pass(Some(self.password.clone()))
            .init(init);
        if with_tls {
            builder = match &self.tls {
                TlsPolicy::Disabled => builder,
                TlsPolicy::Preferred | TlsPolicy::Required => {
                    builder.ssl_opts(Some(mysql::SslOpts::default()))
                }
                TlsPolicy::Custom(opts) => builder.ssl_opts(Some(opts.clone())),
            };
        }
        mysql::Opts::from(builder)
    }

    fn conn_mut(&mut self) -> Result<&mut mysql::Conn> {
        self.conn
            .as_mut()
            .ok_or_else(|| DataLinkError::Connection("no open server connection".to_string()))
    }
}

impl Backend for MySqlBackend {
    fn connect(&mut self) -> Result<()> {
        let conn = match mysql::Conn::new(self.build_opts(true)) {
            Ok(conn) => conn,
            Err(err) if !self.tls.explicit() && tls_negotiation_failure(&err) => {
                // Older servers reject the TLS option set outright; with no
                // explicit TLS request, negotiation is best-effort only.
                tracing::debug!("retrying connection without TLS options: {}", err);
                mysql::Conn::new(self.build_opts(false))
                    .map_err(|e| translate_server_error(e, "connect"))?
            }
            Err(err) => return Err(translate_server_error(err, "connect")),
        };
        self.conn = Some(conn);
        self.execute("SET autocommit=1", &[], false, true)?;
        Ok(())
    }

    fn disconnect(&mut self) {
        self.conn = None;
    }

    fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    fn execute(
        &mut self,
        sql: &str,
        args: &[SqlValue],
        as_dict: bool,
        suppress_warnings: bool,
    ) -> Result<Cursor> {
        use mysql::prelude::Queryable;

        let conn = self.conn_mut()?;
        // Text protocol for plain statements: transaction control verbs
        // cannot go through the prepared-statement protocol.
        if args.is_empty() {
            let result = conn
                .query_iter(sql)
                .map_err(|e| translate_server_error(e, sql))?;
            buffer_result(result, sql, as_dict, suppress_warnings)
        } else {
            let params =
                mysql::Params::Positional(args.iter().map(mysql::Value::from).collect());
            let result = conn
                .exec_iter(sql, params)
                .map_err(|e| translate_server_error(e, sql))?;
            buffer_result(result, sql, as_dict, suppress_warnings)
        }
    }

    fn ping(&mut self) -> bool {
        match self.conn.as_mut() {
            Some(conn) => conn.ping(),
            None => false,
        }
    }

    fn session_id(&mut self) -> Result<Option<u64>> {
        let mut cursor = self.execute("SELECT connection_id()", &[], false, true)?;
        Ok(cursor
            .fetch_one()
            .and_then(|row| row.get(0).and_then(|v| v.as_i64()))
            .map(|id| id as u64))
    }

    fn start_transaction_sql(&self) -> &'static str {
        "START TRANSACTION WITH CONSISTENT SNAPSHOT"
    }

    fn current_user_sql(&self) -> Option<&'static str> {
        Some("SELECT user()")
    }

    fn primary_key_query(&self, schemas: &[String]) -> Result<String> {
        let schemas = schema_list(schemas)?;
        Ok(format!(
            "SELECT concat('`', table_schema, '`.`', table_name, '`') AS tab, column_name \
             FROM information_schema.key_column_usage \
             WHERE table_name NOT LIKE '~%' AND table_schema IN ('{schemas}') \
               AND constraint_name = 'PRIMARY' \
             ORDER BY table_schema, table_name, ordinal_position"
        ))
    }

    fn foreign_key_query(&self, schemas: &[String]) -> Result<String> {
        let schemas = schema_list(schemas)?;
        Ok(format!(
            "SELECT constraint_name, \
                    concat('`', table_schema, '`.`', table_name, '`') AS referencing_table, \
                    concat('`', referenced_table_schema, '`.`', referenced_table_name, '`') \
                        AS referenced_table, \
                    column_name, referenced_column_name \
             FROM information_schema.key_column_usage \
             WHERE referenced_table_name NOT LIKE '~%' \
               AND (referenced_table_schema IN ('{schemas}') OR \
                    referenced_table_schema IS NOT NULL AND table_schema IN ('{schemas}')) \
             ORDER BY constraint_name, table_schema, table_name, ordinal_position"
        ))
    }
}

/// A server-reported error means the handshake itself went through, so
/// retrying without TLS cannot change the outcome (a bad password stays a
/// bad password). Only transport-level failures warrant the plaintext retry.
fn tls_negotiation_failure(err: &mysql::Error) -> bool {
    !matches!(err, mysql::Error::MySqlError(_))
}

/// Buffers a server result set into a driver-neutral cursor.
fn buffer_result<P: mysql::prelude::Protocol>(
    mut result: mysql::QueryResult<'_, '_, '_, P>,
    sql: &str,
    as_dict: bool,
    suppress_warnings: bool,
) -> Result<Cursor> {
    let columns: Vec<String> = result
        .columns()
        .as_ref()
        .iter()
        .map(|c| c.name_str().into_owned())
        .collect();
    let mut values = Vec::new();
    for row in result.by_ref() {
        let row = row.map_err(|e| translate_server_error(e, sql))?;
        values.push(row.unwrap().into_iter().map(SqlValue::from).collect());
    }
    if !suppress_warnings && result.warnings() > 0 {
        tracing::warn!("statement produced {} server warning(s)", result.warnings());
    }
    Ok(Cursor::from_values(columns, values, as_dict))
}

fn schema_list(schemas: &[String]) -> Result<String> {
    if schemas.is_empty() {
        return Err(DataLinkError::Schema(
            "no schema registered; register a schema before loading dependencies".to_string(),
        ));
    }
    Ok(schemas.join("','"))
}

/// Maps server error codes to the stable taxonomy. This table is the
/// contract surface callers depend on; codes without an entry pass through
/// unchanged.
pub(crate) fn translate_server_error(err: mysql::Error, query: &str) -> DataLinkError {
    match err {
        mysql::Error::MySqlError(e) => {
            let message = e.message.clone();
            match e.code {
                2006 => DataLinkError::LostConnection("connection timed out".to_string()),
                2013 => DataLinkError::LostConnection("server connection lost".to_string()),
                1044 | 1142 => DataLinkError::Access(message, query.to_string()),
                1062 => DataLinkError::Duplicate(message),
                1452 => DataLinkError::Integrity(message),
                1064 => DataLinkError::QuerySyntax(message, query.to_string()),
                1146 => DataLinkError::MissingTable(message, query.to_string()),
                1364 => DataLinkError::MissingAttribute(message),
                1054 => DataLinkError::UnknownAttribute(message),
                _ => DataLinkError::Server(mysql::Error::MySqlError(e)),
            }
        }
        // Interface-level failures carry no server detail at all
        mysql::Error::IoError(_) => DataLinkError::LostConnection(
            "server connection lost due to an interface error".to_string(),
        ),
        other => DataLinkError::Server(other),
    }
}

// ---------------------------------------------------------------------------
// Embedded backend
// ---------------------------------------------------------------------------

/// Embedded SQLite backend; the "host" is a file path.
pub(crate) struct SqliteBackend {
    path: String,
    conn: Option<rusqlite::Connection>,
}

impl SqliteBackend {
    pub(crate) fn new(path: String) -> Self {
        SqliteBackend { path, conn: None }
    }

    fn conn_ref(&self) -> Result<&rusqlite::Connection> {
        self.conn
            .as_ref()
            .ok_or_else(|| DataLinkError::Connection("no open database file".to_string()))
    }
}

impl Backend for SqliteBackend {
    fn connect(&mut self) -> Result<()> {
        // Best-effort flush of the file-server cache so the file is opened in
        // a consistent on-disk state; a failure only means opening it as-is.
        let _ = Command::new("fs").args(["flush", &self.path]).output();

        let conn = rusqlite::Connection::open(&self.path)?;
        // The driver leaves transaction control manual; only foreign-key
        // enforcement needs to be switched on (off by default in SQLite).
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        self.conn = Some(conn);
        Ok(())
    }

    fn disconnect(&mut self) {
        self.conn = None;
    }

    fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    fn execute(
        &mut self,
        sql: &str,
        args: &[SqlValue],
        as_dict: bool,
        _suppress_warnings: bool,
    ) -> Result<Cursor> {
        let conn = self.conn_ref()?;
        let mut stmt = conn.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
        let column_count = stmt.column_count();

        let mut rows = stmt.query(rusqlite::params_from_iter(args.iter()))?;
        let mut values = Vec::new();
        while let Some(row) = rows.next()? {
            let mut record = Vec::with_capacity(column_count);
            for i in 0..column_count {
                record.push(SqlValue::from(row.get_ref(i)?));
            }
            values.push(record);
        }
        Ok(Cursor::from_values(columns, values, as_dict))
    }

    fn ping(&mut self) -> bool {
        // File handles do not expire the way network sockets do.
        self.conn.is_some()
    }

    fn session_id(&mut self) -> Result<Option<u64>> {
        Ok(None)
    }

    fn start_transaction_sql(&self) -> &'static str {
        "BEGIN TRANSACTION"
    }

    fn is_transaction_autoclosed(&self, err: &DataLinkError) -> bool {
        // The embedded engine sometimes closes a transaction on its own;
        // COMMIT/ROLLBACK after that fails with this specific complaint.
        matches!(
            err,
            DataLinkError::Sqlite(rusqlite::Error::SqliteFailure(_, Some(message)))
                if message.contains("no transaction is active")
        )
    }

    fn primary_key_query(&self, schemas: &[String]) -> Result<String> {
        let schema = single_schema(schemas)?;
        Ok(format!(
            "SELECT '`{schema}`.`' || m.name || '`' AS tab, p.name \
             FROM sqlite_master m JOIN pragma_table_info(m.name) p \
             WHERE m.type = 'table' AND m.name NOT LIKE '~%' AND p.pk > 0 \
             ORDER BY m.name, p.pk"
        ))
    }

    fn foreign_key_query(&self, schemas: &[String]) -> Result<String> {
        let schema = single_schema(schemas)?;
        Ok(format!(
            "SELECT m.name || '[' || p.id || ']' AS constraint_name, \
                    '`{schema}`.`' || m.name || '`' AS referencing_table, \
                    '`{schema}`.`' || p.\"table\" || '`' AS referenced_table, \
                    p.\"from\" AS column_name, p.\"to\" AS referenced_column_name \
             FROM sqlite_master m JOIN pragma_foreign_key_list(m.name) p \
             WHERE m.type = 'table' AND m.name NOT LIKE '~%' \
             ORDER BY m.name, p.id, p.seq"
        ))
    }
}

fn single_schema(schemas: &[String]) -> Result<&String> {
    match schemas {
        [schema] => Ok(schema),
        [] => Err(DataLinkError::Schema(
            "no schema registered; register a schema before loading dependencies".to_string(),
        )),
        _ => Err(DataLinkError::Schema(
            "the embedded backend supports exactly one registered schema".to_string(),
        )),
    }
}
