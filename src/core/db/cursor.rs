/// Cursor Module
///
/// Driver-neutral result handling for the connection layer. Both backends
/// (the MySQL server and the embedded SQLite engine) produce the same
/// `Cursor` shape, so everything above the `execute` boundary is free of
/// backend-specific row types.
use std::collections::{HashMap, VecDeque};

/// A single SQL value, independent of the producing driver.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl SqlValue {
    /// Returns the contained text, if this value is textual.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the contained integer, if this value is numeric.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Integer(i) => Some(*i),
            _ => None,
        }
    }
}

impl From<rusqlite::types::ValueRef<'_>> for SqlValue {
    fn from(value: rusqlite::types::ValueRef<'_>) -> Self {
        use rusqlite::types::ValueRef;
        match value {
            ValueRef::Null => SqlValue::Null,
            ValueRef::Integer(i) => SqlValue::Integer(i),
            ValueRef::Real(f) => SqlValue::Real(f),
            ValueRef::Text(t) => SqlValue::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => SqlValue::Blob(b.to_vec()),
        }
    }
}

impl rusqlite::types::ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
        use rusqlite::types::{ToSqlOutput, Value, ValueRef};
        Ok(match self {
            SqlValue::Null => ToSqlOutput::Owned(Value::Null),
            SqlValue::Integer(i) => ToSqlOutput::Owned(Value::Integer(*i)),
            SqlValue::Real(f) => ToSqlOutput::Owned(Value::Real(*f)),
            SqlValue::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            SqlValue::Blob(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
        })
    }
}

impl From<mysql::Value> for SqlValue {
    fn from(value: mysql::Value) -> Self {
        use mysql::Value;
        match value {
            Value::NULL => SqlValue::Null,
            Value::Int(i) => SqlValue::Integer(i),
            Value::UInt(u) => SqlValue::Integer(u as i64),
            Value::Float(f) => SqlValue::Real(f as f64),
            Value::Double(d) => SqlValue::Real(d),
            Value::Bytes(b) => match String::from_utf8(b) {
                Ok(s) => SqlValue::Text(s),
                Err(e) => SqlValue::Blob(e.into_bytes()),
            },
            Value::Date(y, mo, d, h, mi, s, _us) => SqlValue::Text(format!(
                "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
                y, mo, d, h, mi, s
            )),
            Value::Time(neg, d, h, mi, s, _us) => SqlValue::Text(format!(
                "{}{:02}:{:02}:{:02}",
                if neg { "-" } else { "" },
                u32::from(d) * 24 + u32::from(h),
                mi,
                s
            )),
        }
    }
}

impl From<&SqlValue> for mysql::Value {
    fn from(value: &SqlValue) -> Self {
        use mysql::Value;
        match value {
            SqlValue::Null => Value::NULL,
            SqlValue::Integer(i) => Value::Int(*i),
            SqlValue::Real(f) => Value::Double(*f),
            SqlValue::Text(s) => Value::Bytes(s.clone().into_bytes()),
            SqlValue::Blob(b) => Value::Bytes(b.clone()),
        }
    }
}

/// One result row, shaped according to the `as_dict` query option.
#[derive(Debug, Clone, PartialEq)]
pub enum Row {
    /// Positional values in column order.
    Tuple(Vec<SqlValue>),
    /// Values keyed by column name.
    Map(HashMap<String, SqlValue>),
}

impl Row {
    /// Returns the value at a positional index (tuple rows only).
    pub fn get(&self, index: usize) -> Option<&SqlValue> {
        match self {
            Row::Tuple(values) => values.get(index),
            Row::Map(_) => None,
        }
    }

    /// Returns the value for a column name (map rows only).
    pub fn get_named(&self, name: &str) -> Option<&SqlValue> {
        match self {
            Row::Tuple(_) => None,
            Row::Map(values) => values.get(name),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Row::Tuple(values) => values.len(),
            Row::Map(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Buffered result cursor positioned for sequential row fetch.
///
/// Rows are fully materialized when the statement runs, so a cursor stays
/// valid after the connection reconnects (the statement that produced it does
/// not).
#[derive(Debug, Default)]
pub struct Cursor {
    columns: Vec<String>,
    rows: VecDeque<Row>,
}

impl Cursor {
    /// Builds a cursor from positional value rows, shaping each row per
    /// `as_dict`.
    pub fn from_values(columns: Vec<String>, values: Vec<Vec<SqlValue>>, as_dict: bool) -> Self {
        let rows = values
            .into_iter()
            .map(|row| {
                if as_dict {
                    Row::Map(columns.iter().cloned().zip(row).collect())
                } else {
                    Row::Tuple(row)
                }
            })
            .collect();
        Cursor {
            columns,
            rows,
        }
    }

    /// Column names of the result set, in declaration order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Fetches the next row, advancing the cursor.
    pub fn fetch_one(&mut self) -> Option<Row> {
        self.rows.pop_front()
    }

    /// Drains all remaining rows.
    pub fn fetch_all(&mut self) -> Vec<Row> {
        self.rows.drain(..).collect()
    }

    /// Number of rows not yet fetched.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

impl Iterator for Cursor {
    type Item = Row;

    fn next(&mut self) -> Option<Row> {
        self.fetch_one()
    }
}
