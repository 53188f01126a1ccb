//! A configured SQLite connection with statement logging.

use crate::client::{Connection, Row};
use crate::config::Config;
use crate::error::{OrmError, OrmResult};
use crate::meta::Registry;
use crate::sqlite::{execute_statement, query_rows};
use crate::value::Value;
use std::sync::Arc;
use std::time::Instant;

const ENCODINGS: [&str; 4] = ["UTF-8", "UTF-16", "UTF-16le", "UTF-16be"];

fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}

/// Statement logging on target `lorm.sql`.
///
/// A successful statement is a DEBUG event; a failed one is a WARN event that
/// carries the error. SQL longer than `max_sql_length` bytes is cut at a char
/// boundary and marked with `...`.
#[derive(Debug, Clone)]
pub struct SqlLog {
    pub max_sql_length: Option<usize>,
}

impl Default for SqlLog {
    fn default() -> Self {
        Self {
            max_sql_length: Some(200),
        }
    }
}

impl SqlLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_sql_length(mut self, len: usize) -> Self {
        self.max_sql_length = Some(len);
        self
    }

    pub fn no_truncate(mut self) -> Self {
        self.max_sql_length = None;
        self
    }

    fn truncate_sql(&self, sql: &str) -> String {
        match self.max_sql_length {
            Some(max) if sql.len() > max => format!("{}...", truncate_sql_bytes(sql, max)),
            _ => sql.to_string(),
        }
    }

    /// Run `statement`, then log it with its timing and outcome.
    fn observe<T>(
        &self,
        sql: &str,
        params: &[Value],
        statement: impl FnOnce() -> OrmResult<T>,
    ) -> OrmResult<T> {
        let start = Instant::now();
        let result = statement();
        let elapsed_us = start.elapsed().as_micros() as u64;
        let sql = self.truncate_sql(sql);
        match &result {
            Ok(_) => tracing::debug!(
                target: "lorm.sql",
                param_count = params.len(),
                elapsed_us,
                sql = %sql,
            ),
            Err(err) => tracing::warn!(
                target: "lorm.sql",
                param_count = params.len(),
                elapsed_us,
                sql = %sql,
                error = %err,
                "statement failed",
            ),
        }
        result
    }
}

/// A SQLite connection bound to a [`Config`].
///
/// The configured table prefix applies to every query run through it.
/// `[Entity.field]` references resolve through [`Registry::global`] unless a
/// registry is supplied with [`Database::with_registry`].
#[derive(Debug)]
pub struct Database {
    conn: rusqlite::Connection,
    config: Config,
    registry: Option<Arc<Registry>>,
    log: SqlLog,
}

impl Database {
    /// Open the database named by `config.database.name`.
    pub fn open(config: Config) -> OrmResult<Self> {
        let name = config.database.name.as_str();
        let conn = if name == ":memory:" {
            rusqlite::Connection::open_in_memory()
        } else {
            rusqlite::Connection::open(name)
        }
        .map_err(|e| OrmError::Connection(format!("failed to open {name}: {e}")))?;

        let charset = config.database.charset.as_str();
        let encoding = ENCODINGS
            .iter()
            .find(|e| e.eq_ignore_ascii_case(charset))
            .ok_or_else(|| OrmError::config(format!("unsupported charset: {charset}")))?;
        conn.pragma_update(None, "encoding", *encoding)?;

        tracing::debug!(
            target: "lorm",
            database = %config.database.name,
            table_prefix = %config.table_prefix,
            "opened database",
        );

        Ok(Self {
            conn,
            config,
            registry: None,
            log: SqlLog::default(),
        })
    }

    /// Open with [`Config::load`].
    pub fn connect() -> OrmResult<Self> {
        Self::open(Config::load()?)
    }

    pub fn open_in_memory() -> OrmResult<Self> {
        Self::open(Config::default())
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.table_prefix = prefix.into();
        self
    }

    /// Resolve entities through `registry` instead of the global one.
    pub fn with_registry(mut self, registry: Arc<Registry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn with_sql_log(mut self, log: SqlLog) -> Self {
        self.log = log;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The underlying rusqlite connection.
    pub fn raw(&self) -> &rusqlite::Connection {
        &self.conn
    }

    /// Run several `;`-separated statements without parameters (schema setup).
    pub fn execute_batch(&self, sql: &str) -> OrmResult<()> {
        self.log
            .observe(sql, &[], || self.conn.execute_batch(sql).map_err(OrmError::from))
    }
}

impl Connection for Database {
    fn query(&self, sql: &str, params: &[Value]) -> OrmResult<Vec<Row>> {
        self.log
            .observe(sql, params, || query_rows(&self.conn, sql, params))
    }

    fn execute(&self, sql: &str, params: &[Value]) -> OrmResult<u64> {
        self.log
            .observe(sql, params, || execute_statement(&self.conn, sql, params))
    }

    fn last_insert_id(&self) -> OrmResult<Value> {
        Ok(Value::Integer(self.conn.last_insert_rowid()))
    }

    fn table_prefix(&self) -> &str {
        &self.config.table_prefix
    }

    fn registry(&self) -> &Registry {
        match &self.registry {
            Some(registry) => registry,
            None => Registry::global(),
        }
    }
}
