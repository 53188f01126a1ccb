//! SQLite backend via rusqlite.

use crate::client::{Connection, Row};
use crate::error::OrmResult;
use crate::value::Value;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Borrowed(ValueRef::Null),
            Value::Integer(i) => ToSqlOutput::Borrowed(ValueRef::Integer(*i)),
            Value::Real(r) => ToSqlOutput::Borrowed(ValueRef::Real(*r)),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Value::Blob(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
        })
    }
}

impl FromSql for Value {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        Ok(match value {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::Integer(i),
            ValueRef::Real(r) => Value::Real(r),
            ValueRef::Text(t) => Value::Text(
                String::from_utf8(t.to_vec()).map_err(|e| FromSqlError::Other(Box::new(e)))?,
            ),
            ValueRef::Blob(b) => Value::Blob(b.to_vec()),
        })
    }
}

/// Run a query on a raw rusqlite connection using the statement cache.
pub(crate) fn query_rows(
    conn: &rusqlite::Connection,
    sql: &str,
    params: &[Value],
) -> OrmResult<Vec<Row>> {
    let mut stmt = conn.prepare_cached(sql)?;
    let width = stmt.column_count();
    let rows = stmt
        .query_map(rusqlite::params_from_iter(params.iter()), |row| {
            (0..width).map(|i| row.get::<_, Value>(i)).collect()
        })?
        .collect::<Result<Vec<Row>, _>>()?;
    Ok(rows)
}

pub(crate) fn execute_statement(
    conn: &rusqlite::Connection,
    sql: &str,
    params: &[Value],
) -> OrmResult<u64> {
    let mut stmt = conn.prepare_cached(sql)?;
    let affected = stmt.execute(rusqlite::params_from_iter(params.iter()))?;
    Ok(affected as u64)
}

impl Connection for rusqlite::Connection {
    fn query(&self, sql: &str, params: &[Value]) -> OrmResult<Vec<Row>> {
        query_rows(self, sql, params)
    }

    fn execute(&self, sql: &str, params: &[Value]) -> OrmResult<u64> {
        execute_statement(self, sql, params)
    }

    fn last_insert_id(&self) -> OrmResult<Value> {
        Ok(Value::Integer(self.last_insert_rowid()))
    }
}
