//! The `Entity` trait: typed persistence and query factories.
//!
//! Usually implemented with `#[derive(Entity)]`:
//!
//! ```ignore
//! use lorm::prelude::*;
//!
//! #[derive(Debug, Clone, Default, Entity)]
//! #[orm(table = "person", relation(name = "role", entity = "Role", on = "[role_id] = [Role.id]"))]
//! struct Person {
//!     #[orm(id, column = "p_id")]
//!     id: Option<i64>,
//!     #[orm(column = "p_name")]
//!     name: String,
//!     #[orm(column = "p_role")]
//!     role_id: Option<i64>,
//!     #[orm(joined)]
//!     joined: Joined,
//! }
//!
//! let mut alice = Person { name: "Alice".into(), ..Default::default() };
//! alice.save(&db)?;
//! let again = Person::get(&db, alice.id)?;
//! ```

use crate::changeset::ValidationErrors;
use crate::client::Connection;
use crate::error::OrmResult;
use crate::meta::EntityDescriptor;
use crate::persist;
use crate::query::Query;
use crate::record::{FieldMap, FromRecord, Record};
use crate::validate::Validator;
use crate::value::{Args, Value};
use std::sync::Arc;

/// A mapped entity type.
pub trait Entity: FromRecord {
    /// Shared metadata for this type.
    fn descriptor() -> Arc<EntityDescriptor>;

    /// Current field values, in mapping order.
    fn to_record(&self) -> Record;

    /// Assign one mapped field. Unknown fields are a mapping error.
    fn set_field(&mut self, field: &str, value: Value) -> OrmResult<()>;

    /// Errors from the last [`Entity::validate`] run.
    fn errors(&self) -> &ValidationErrors {
        ValidationErrors::none()
    }

    /// Store validation errors. Types without an errors field drop them.
    fn set_errors(&mut self, errors: ValidationErrors) {
        if !errors.is_empty() {
            let descriptor = Self::descriptor();
            tracing::debug!(
                target: "lorm",
                entity = descriptor.name(),
                errors = ?errors.messages(),
                "no errors field, dropping validation errors",
            );
        }
    }

    // ==================== Factories ====================

    fn query() -> Query<Self> {
        Query::new(Self::descriptor())
    }

    fn find(id: impl Into<Value>) -> Query<Self> {
        Self::query().find(id)
    }

    fn find_by(field: &str, value: impl Into<Value>) -> Query<Self> {
        Self::query().find_by(field, value)
    }

    fn find_fields<F, V>(pairs: impl IntoIterator<Item = (F, V)>) -> Query<Self>
    where
        F: AsRef<str>,
        V: Into<Value>,
    {
        Self::query().find_fields(pairs)
    }

    fn filter(constraint: impl Into<String>, args: impl Into<Args>) -> Query<Self> {
        Self::query().filter(constraint, args)
    }

    /// Look up by primary key.
    fn get<C: Connection + ?Sized>(conn: &C, id: impl Into<Value>) -> OrmResult<Option<Self>> {
        Self::find(id).first(conn)
    }

    /// Delete every row matching `constraint`.
    fn delete_all<C: Connection + ?Sized>(
        conn: &C,
        constraint: &str,
        args: impl Into<Args>,
    ) -> OrmResult<u64> {
        Self::filter(constraint, args).delete(conn)
    }

    // ==================== Fields ====================

    fn primary_key_value(&self) -> Value {
        let descriptor = Self::descriptor();
        self.to_record()
            .take(descriptor.primary_key_field())
            .unwrap_or(Value::Null)
    }

    /// Mass-assign mapped, unprotected fields from `values`; other keys are
    /// ignored. Returns how many fields were assigned.
    fn assign(&mut self, values: &FieldMap) -> OrmResult<usize> {
        let descriptor = Self::descriptor();
        let mut assigned = 0;
        for (field, value) in values {
            if descriptor.has_field(field) && !descriptor.is_protected(field) {
                self.set_field(field, value.clone())?;
                assigned += 1;
            }
        }
        Ok(assigned)
    }

    // ==================== Persistence ====================

    /// Insert or replace this entity.
    ///
    /// Returns the primary key on success and `None` when the database rejected
    /// the statement. A generated key is written back into the entity.
    fn save<C: Connection + ?Sized>(&mut self, conn: &C) -> OrmResult<Option<Value>> {
        let descriptor = Self::descriptor();
        let mut record = self.to_record();
        let saved = persist::save(conn, &descriptor, &mut record)?;
        if let Some(pk) = &saved {
            self.set_field(descriptor.primary_key_field(), pk.clone())?;
        }
        Ok(saved)
    }

    /// Delete this entity's row. Field values are left as they are.
    fn delete<C: Connection + ?Sized>(&self, conn: &C) -> OrmResult<u64> {
        persist::delete(conn, &Self::descriptor(), &self.primary_key_value())
    }

    // ==================== Validation ====================

    /// Run the rules that apply to `tag` (`None` runs all of them).
    fn validate(&mut self, tag: Option<&str>) -> bool {
        let descriptor = Self::descriptor();
        let mut validator = Validator::for_tag(descriptor.validation_rules(), tag);
        let valid = validator.run(&self.to_record());
        self.set_errors(validator.into_errors());
        valid
    }

    /// [`Entity::save`] only when [`Entity::validate`] passes.
    fn validate_save<C: Connection + ?Sized>(
        &mut self,
        conn: &C,
        tag: Option<&str>,
    ) -> OrmResult<Option<Value>> {
        if !self.validate(tag) {
            let descriptor = Self::descriptor();
            tracing::debug!(
                target: "lorm.sql",
                entity = descriptor.name(),
                errors = self.errors().len(),
                "validation failed, not saving",
            );
            return Ok(None);
        }
        self.save(conn)
    }
}
