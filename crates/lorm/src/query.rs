//! Fluent query builder over a single entity.
//!
//! Clause fragments are stored as written and substituted when SQL is built, so
//! the table prefix and registry of the executing connection apply.
//!
//! # Example
//!
//! ```ignore
//! use lorm::prelude::*;
//!
//! let admins: Vec<Person> = Person::filter("[active] = ?", true)
//!     .join("role")
//!     .filter("[Role.title] = ?", "admin")
//!     .order_asc("name")
//!     .all(&db)?;
//! ```

use crate::client::Connection;
use crate::error::{OrmError, OrmResult};
use crate::materialize::SelectPlan;
use crate::meta::EntityDescriptor;
use crate::record::{FromRecord, Record};
use crate::subst::{Qualify, SqlContext, substitute, substitute_with};
use crate::value::{Args, Value};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Sort direction of an ORDER BY term.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Asc => f.write_str("ASC"),
            Self::Desc => f.write_str("DESC"),
        }
    }
}

/// Composed SQL and its bound parameters, in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltQuery {
    pub sql: String,
    pub params: Vec<Value>,
}

/// One WHERE term.
#[derive(Debug, Clone)]
enum Clause {
    /// A fragment with field references, substituted when SQL is built.
    Fragment(String),
    /// `[field] IN (...)`; only the field is substituted, the literals never are.
    InList { field: String, literals: String },
}

/// Accumulated filters, ordering and joins for one entity.
///
/// Chain methods consume the builder; terminals borrow it and run exactly one
/// statement.
pub struct Query<E> {
    descriptor: Arc<EntityDescriptor>,
    where_clause: Vec<Clause>,
    where_args: Vec<Value>,
    order: Vec<(Direction, String)>,
    joins: Vec<String>,
    /// First field named by a chain method that the entity does not map.
    unmapped: Option<String>,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for Query<E> {
    fn clone(&self) -> Self {
        Self {
            descriptor: Arc::clone(&self.descriptor),
            where_clause: self.where_clause.clone(),
            where_args: self.where_args.clone(),
            order: self.order.clone(),
            joins: self.joins.clone(),
            unmapped: self.unmapped.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E> fmt::Debug for Query<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("entity", &self.descriptor.name())
            .field("where_clause", &self.where_clause)
            .field("where_args", &self.where_args)
            .field("order", &self.order)
            .field("joins", &self.joins)
            .finish()
    }
}

impl Query<Record> {
    /// Untyped query returning [`Record`]s.
    pub fn with_descriptor(descriptor: Arc<EntityDescriptor>) -> Self {
        Self::new(descriptor)
    }
}

impl<E: FromRecord> Query<E> {
    pub fn new(descriptor: Arc<EntityDescriptor>) -> Self {
        Self {
            descriptor,
            where_clause: Vec::new(),
            where_args: Vec::new(),
            order: Vec::new(),
            joins: Vec::new(),
            unmapped: None,
            _entity: PhantomData,
        }
    }

    pub fn descriptor(&self) -> &Arc<EntityDescriptor> {
        &self.descriptor
    }

    /// Bound WHERE arguments so far, in placeholder order.
    pub fn args(&self) -> &[Value] {
        &self.where_args
    }

    fn check_field(&mut self, field: &str) {
        if self.unmapped.is_none() && !self.descriptor.has_field(field) {
            self.unmapped = Some(field.to_string());
        }
    }

    // ==================== WHERE ====================

    /// Add a constraint, joined to earlier ones with `AND`.
    ///
    /// `constraint` may use `[field]` and `[Entity.field]` references and `?`
    /// placeholders; `args` supplies one value per placeholder.
    pub fn filter(mut self, constraint: impl Into<String>, args: impl Into<Args>) -> Self {
        self.where_clause.push(Clause::Fragment(constraint.into()));
        self.where_args.extend(args.into().into_vec());
        self
    }

    /// Match the primary key.
    pub fn find(self, id: impl Into<Value>) -> Self {
        let pk = self.descriptor.primary_key_field().to_string();
        self.find_by(&pk, id)
    }

    /// Match one field by equality.
    pub fn find_by(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.check_field(field);
        let value: Value = value.into();
        self.filter(format!("[{field}] = ?"), value)
    }

    /// Match every `(field, value)` pair, left to right.
    pub fn find_fields<F, V>(self, pairs: impl IntoIterator<Item = (F, V)>) -> Self
    where
        F: AsRef<str>,
        V: Into<Value>,
    {
        pairs
            .into_iter()
            .fold(self, |q, (field, value)| q.find_by(field.as_ref(), value))
    }

    /// `[field] LIKE '%value%'`, bound as a parameter.
    ///
    /// `%` and `_` inside `value` keep their wildcard meaning.
    pub fn like(mut self, field: &str, value: &str) -> Self {
        self.check_field(field);
        self.filter(format!("[{field}] LIKE ?"), format!("%{value}%"))
    }

    /// `[field] IN (...)` with the values written into the SQL as literals.
    ///
    /// Values are not bound. Text is single-quoted with embedded quotes doubled,
    /// which is not a substitute for binding untrusted input.
    pub fn in_list<V: Into<Value>>(
        mut self,
        field: &str,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.check_field(field);
        let literals: Vec<String> = values
            .into_iter()
            .map(|v| v.into().to_sql_literal())
            .collect();
        self.where_clause.push(Clause::InList {
            field: field.to_string(),
            literals: literals.join(","),
        });
        self
    }

    // ==================== ORDER BY ====================

    /// Append an ORDER BY term; `expression` may use field references.
    pub fn order(mut self, direction: Direction, expression: impl Into<String>) -> Self {
        self.order.push((direction, expression.into()));
        self
    }

    pub fn order_asc(mut self, field: &str) -> Self {
        self.check_field(field);
        self.order(Direction::Asc, format!("[{field}]"))
    }

    pub fn order_desc(mut self, field: &str) -> Self {
        self.check_field(field);
        self.order(Direction::Desc, format!("[{field}]"))
    }

    // ==================== JOIN ====================

    /// LEFT JOIN a declared relation. Joining the same relation twice is a no-op.
    pub fn join(mut self, relation: impl Into<String>) -> Self {
        let relation = relation.into();
        if !self.joins.contains(&relation) {
            self.joins.push(relation);
        }
        self
    }

    // ==================== SQL ====================

    fn validate(&self) -> OrmResult<()> {
        match &self.unmapped {
            Some(field) => Err(OrmError::mapping(self.descriptor.name(), field)),
            None => Ok(()),
        }
    }

    fn where_sql(&self, ctx: &SqlContext<'_>) -> OrmResult<String> {
        if self.where_clause.is_empty() {
            return Ok(String::new());
        }
        let parts = self
            .where_clause
            .iter()
            .map(|clause| match clause {
                Clause::Fragment(c) => {
                    substitute(c, &self.descriptor, ctx).map(|c| format!("({c})"))
                }
                Clause::InList { field, literals } => self
                    .descriptor
                    .qualified_column(ctx.prefix, field)
                    .map(|column| format!("({column} IN ({literals}))")),
            })
            .collect::<OrmResult<Vec<_>>>()?;
        Ok(format!(" WHERE {}", parts.join(" AND ")))
    }

    fn order_sql(&self, ctx: &SqlContext<'_>) -> OrmResult<String> {
        if self.order.is_empty() {
            return Ok(String::new());
        }
        let terms = self
            .order
            .iter()
            .map(|(dir, expr)| {
                substitute(expr, &self.descriptor, ctx).map(|e| format!("{e} {dir}"))
            })
            .collect::<OrmResult<Vec<_>>>()?;
        Ok(format!(" ORDER BY {}", terms.join(", ")))
    }

    fn select_with_plan(
        &self,
        ctx: &SqlContext<'_>,
        limit: Option<(u64, u64)>,
    ) -> OrmResult<(SelectPlan, BuiltQuery)> {
        self.validate()?;
        let plan = SelectPlan::resolve(&self.descriptor, &self.joins, ctx)?;
        let mut sql = format!(
            "SELECT {} FROM {}",
            plan.field_list(ctx.prefix).join(", "),
            plan.from_clause(ctx)?
        );
        sql.push_str(&self.where_sql(ctx)?);
        sql.push_str(&self.order_sql(ctx)?);
        if let Some((count, offset)) = limit {
            sql.push_str(&format!(" LIMIT {count}"));
            if offset > 0 {
                sql.push_str(&format!(" OFFSET {offset}"));
            }
        }
        Ok((
            plan,
            BuiltQuery {
                sql,
                params: self.where_args.clone(),
            },
        ))
    }

    /// The SELECT `all` would run.
    pub fn select_sql(&self, ctx: &SqlContext<'_>) -> OrmResult<BuiltQuery> {
        self.select_with_plan(ctx, None).map(|(_, q)| q)
    }

    /// The SELECT `all` would run on `conn`.
    pub fn to_sql<C: Connection + ?Sized>(&self, conn: &C) -> OrmResult<BuiltQuery> {
        self.select_sql(&SqlContext::of(conn))
    }

    /// `SELECT COUNT(*)` over the WHERE clause only.
    pub fn count_sql(&self, ctx: &SqlContext<'_>) -> OrmResult<BuiltQuery> {
        self.validate()?;
        let mut sql = format!(
            "SELECT COUNT(*) FROM {}",
            self.descriptor.table_name(ctx.prefix)
        );
        sql.push_str(&self.where_sql(ctx)?);
        Ok(BuiltQuery {
            sql,
            params: self.where_args.clone(),
        })
    }

    pub fn delete_sql(&self, ctx: &SqlContext<'_>) -> OrmResult<BuiltQuery> {
        self.validate()?;
        let mut sql = format!("DELETE FROM {}", self.descriptor.table_name(ctx.prefix));
        sql.push_str(&self.where_sql(ctx)?);
        Ok(BuiltQuery {
            sql,
            params: self.where_args.clone(),
        })
    }

    /// `UPDATE` with `set_expr` arguments bound before the WHERE arguments.
    pub fn update_sql(
        &self,
        ctx: &SqlContext<'_>,
        set_expr: &str,
        args: impl Into<Args>,
    ) -> OrmResult<BuiltQuery> {
        self.validate()?;
        let set = substitute_with(set_expr, &self.descriptor, ctx, Qualify::Bare)?;
        let mut sql = format!(
            "UPDATE {} SET {set}",
            self.descriptor.table_name(ctx.prefix)
        );
        sql.push_str(&self.where_sql(ctx)?);
        let mut params = args.into().into_vec();
        params.extend(self.where_args.iter().cloned());
        Ok(BuiltQuery { sql, params })
    }

    // ==================== Terminals ====================

    fn fetch<C: Connection + ?Sized>(
        &self,
        conn: &C,
        limit: Option<(u64, u64)>,
    ) -> OrmResult<Vec<E>> {
        let (plan, built) = self.select_with_plan(&SqlContext::of(conn), limit)?;
        conn.query(&built.sql, &built.params)?
            .into_iter()
            .map(|row| plan.decode(row).and_then(E::from_record))
            .collect()
    }

    /// The first matching entity, if any.
    pub fn first<C: Connection + ?Sized>(&self, conn: &C) -> OrmResult<Option<E>> {
        Ok(self.fetch(conn, Some((1, 0)))?.into_iter().next())
    }

    pub fn all<C: Connection + ?Sized>(&self, conn: &C) -> OrmResult<Vec<E>> {
        self.fetch(conn, None)
    }

    /// At most `count` entities after skipping `offset`.
    pub fn range<C: Connection + ?Sized>(
        &self,
        conn: &C,
        offset: u64,
        count: u64,
    ) -> OrmResult<Vec<E>> {
        self.fetch(conn, Some((count, offset)))
    }

    /// Number of matching rows. Joins and ordering are ignored.
    pub fn count<C: Connection + ?Sized>(&self, conn: &C) -> OrmResult<u64> {
        let built = self.count_sql(&SqlContext::of(conn))?;
        let rows = conn.query(&built.sql, &built.params)?;
        match rows.first().and_then(|row| row.first()) {
            Some(Value::Integer(n)) => Ok(*n as u64),
            other => Err(OrmError::decode(
                "COUNT(*)",
                format!("expected an integer, got {other:?}"),
            )),
        }
    }

    pub fn exists<C: Connection + ?Sized>(&self, conn: &C) -> OrmResult<bool> {
        Ok(self.count(conn)? > 0)
    }

    /// Delete matching rows and return how many were removed.
    ///
    /// Without any constraint this deletes every row of the table.
    pub fn delete<C: Connection + ?Sized>(&self, conn: &C) -> OrmResult<u64> {
        let built = self.delete_sql(&SqlContext::of(conn))?;
        conn.execute(&built.sql, &built.params)
    }

    /// Apply `set_expr` (e.g. `"[name] = ?"`) to matching rows.
    pub fn update<C: Connection + ?Sized>(
        &self,
        conn: &C,
        set_expr: &str,
        args: impl Into<Args>,
    ) -> OrmResult<u64> {
        let built = self.update_sql(&SqlContext::of(conn), set_expr, args)?;
        conn.execute(&built.sql, &built.params)
    }
}

#[cfg(test)]
mod tests;
