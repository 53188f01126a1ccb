//! Database access trait.

use crate::error::OrmResult;
use crate::meta::Registry;
use crate::value::Value;

/// A row as positional column values, in SELECT-list order.
pub type Row = Vec<Value>;

/// A trait that unifies database handles used by the query builder.
///
/// Implementations prepare (and may cache) each statement, bind `params` to its
/// positional `?` placeholders in left-to-right order, and execute it. Every call is
/// blocking and runs as its own autocommit statement.
pub trait Connection {
    /// Execute a query and return all rows.
    fn query(&self, sql: &str, params: &[Value]) -> OrmResult<Vec<Row>>;

    /// Execute a statement and return the number of affected rows.
    fn execute(&self, sql: &str, params: &[Value]) -> OrmResult<u64>;

    /// Identifier generated by the most recent successful INSERT.
    fn last_insert_id(&self) -> OrmResult<Value>;

    /// Prefix prepended to every physical table name.
    fn table_prefix(&self) -> &str {
        ""
    }

    /// Registry used to resolve `[Entity.field]` references and relation targets.
    fn registry(&self) -> &Registry {
        Registry::global()
    }
}

impl<C: Connection + ?Sized> Connection for &C {
    fn query(&self, sql: &str, params: &[Value]) -> OrmResult<Vec<Row>> {
        (**self).query(sql, params)
    }

    fn execute(&self, sql: &str, params: &[Value]) -> OrmResult<u64> {
        (**self).execute(sql, params)
    }

    fn last_insert_id(&self) -> OrmResult<Value> {
        (**self).last_insert_id()
    }

    fn table_prefix(&self) -> &str {
        (**self).table_prefix()
    }

    fn registry(&self) -> &Registry {
        (**self).registry()
    }
}
