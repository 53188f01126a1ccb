//! Positional result decoding for SELECTs with joined relations.
//!
//! Rows carry no column tags: a value is identified only by its position. The
//! SELECT field list and the row decoder therefore walk the same
//! [`SelectPlan::segments`] sequence: the primary entity's mapping first, then
//! each joined relation's mapping in join order.

use crate::client::Row;
use crate::error::{OrmError, OrmResult};
use crate::meta::EntityDescriptor;
use crate::record::Record;
use crate::subst::{SqlContext, substitute};
use std::sync::Arc;

/// A relation resolved against the registry.
#[derive(Debug, Clone)]
pub struct JoinedRelation {
    pub name: String,
    pub descriptor: Arc<EntityDescriptor>,
    /// ON template, unsubstituted.
    pub on: String,
}

/// The column layout of a SELECT: primary entity followed by joined relations.
#[derive(Debug, Clone)]
pub struct SelectPlan {
    primary: Arc<EntityDescriptor>,
    joins: Vec<JoinedRelation>,
}

impl SelectPlan {
    /// Resolve `joins` (relation names, in join order) on `primary`.
    pub fn resolve(
        primary: &Arc<EntityDescriptor>,
        joins: &[String],
        ctx: &SqlContext<'_>,
    ) -> OrmResult<Self> {
        let mut resolved = Vec::with_capacity(joins.len());
        for name in joins {
            let relation = primary.relation_def(name)?;
            resolved.push(JoinedRelation {
                name: relation.name.clone(),
                descriptor: ctx.resolve(&relation.entity, primary)?,
                on: relation.on.clone(),
            });
        }
        Ok(Self {
            primary: Arc::clone(primary),
            joins: resolved,
        })
    }

    pub fn primary(&self) -> &Arc<EntityDescriptor> {
        &self.primary
    }

    pub fn joins(&self) -> &[JoinedRelation] {
        &self.joins
    }

    /// The decode order: `(None, primary)` then `(Some(relation), related)` per join.
    pub fn segments(&self) -> impl Iterator<Item = (Option<&str>, &EntityDescriptor)> {
        std::iter::once((None, self.primary.as_ref())).chain(
            self.joins
                .iter()
                .map(|j| (Some(j.name.as_str()), j.descriptor.as_ref())),
        )
    }

    /// Number of columns a row of this plan has.
    pub fn width(&self) -> usize {
        self.segments().map(|(_, d)| d.fields().len()).sum()
    }

    /// Fully qualified SELECT columns, in decode order.
    pub fn field_list(&self, prefix: &str) -> Vec<String> {
        let mut cols = Vec::with_capacity(self.width());
        for (_, descriptor) in self.segments() {
            let table = descriptor.table_name(prefix);
            for field in descriptor.fields() {
                cols.push(format!("{table}.{}", field.column));
            }
        }
        cols
    }

    /// `FROM` target plus one `LEFT JOIN` per relation, ON clauses substituted.
    pub fn from_clause(&self, ctx: &SqlContext<'_>) -> OrmResult<String> {
        let mut sql = self.primary.table_name(ctx.prefix);
        for join in &self.joins {
            let on = substitute(&join.on, &self.primary, ctx)?;
            sql.push_str(" LEFT JOIN ");
            sql.push_str(&join.descriptor.table_name(ctx.prefix));
            sql.push_str(" ON (");
            sql.push_str(&on);
            sql.push(')');
        }
        Ok(sql)
    }

    /// Decode one row into the primary record with nested joined records.
    pub fn decode(&self, row: Row) -> OrmResult<Record> {
        let width = self.width();
        if row.len() != width {
            return Err(OrmError::decode(
                self.primary.name(),
                format!("row has {} columns, expected {width}", row.len()),
            ));
        }

        let mut values = row.into_iter();
        let mut primary: Option<Record> = None;
        for (relation, descriptor) in self.segments() {
            let mut record = Record::with_capacity(descriptor.name(), descriptor.fields().len());
            for (field, value) in descriptor.fields().iter().zip(values.by_ref()) {
                record.push(&field.name, value);
            }
            match relation {
                None => primary = Some(record),
                Some(name) => primary
                    .as_mut()
                    .ok_or_else(missing_primary)?
                    .attach(name, record),
            }
        }

        primary.ok_or_else(missing_primary)
    }
}

fn missing_primary() -> OrmError {
    OrmError::Other("select plan has no primary segment".to_string())
}
