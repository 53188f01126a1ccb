//! # lorm
//!
//! A lightweight ORM with a fluent query builder over SQLite.
//!
//! ## Features
//!
//! - **Symbolic SQL**: fragments reference `[field]` and `[Entity.field]`, rewritten to
//!   prefixed, qualified columns when the statement is built
//! - **Fluent queries**: `filter` / `find` / `join` / `order_*` chains with `first`,
//!   `all`, `range`, `count`, `update` and `delete` terminals
//! - **Joined records**: each relation is decoded into its own nested record
//! - **Entities**: `#[derive(Entity)]` for save, delete, lookup and validation
//! - **Statement logging**: every statement run through [`Database`] is a `tracing`
//!   event with target `lorm.sql`
//!
//! ## Example
//!
//! ```ignore
//! use lorm::prelude::*;
//!
//! let db = Database::open_in_memory()?.with_prefix("app_");
//!
//! let alice = Person::find_by("name", "Alice").first(&db)?;
//!
//! let staff: Vec<Person> = Person::query()
//!     .join("role")
//!     .filter("[Role.title] = ?", "staff")
//!     .order_asc("name")
//!     .all(&db)?;
//!
//! Person::filter("[id] > ?", 100).update(&db, "[active] = ?", false)?;
//! ```

extern crate self as lorm;

pub mod changeset;
pub mod client;
pub mod config;
pub mod database;
pub mod entity;
pub mod error;
pub mod global;
pub mod materialize;
pub mod meta;
pub mod persist;
pub mod prelude;
pub mod query;
pub mod record;
mod sqlite;
pub mod subst;
pub mod validate;
pub mod value;

pub use changeset::{ValidationCode, ValidationError, ValidationErrors};
pub use client::{Connection, Row};
pub use config::{Config, DatabaseConfig};
pub use database::{Database, SqlLog};
pub use entity::Entity;
pub use error::{OrmError, OrmResult};
pub use materialize::SelectPlan;
pub use meta::{EntityDescriptor, EntityRegistration, FieldDef, Registry, RelationDef};
pub use query::{BuiltQuery, Direction, Query};
pub use record::{FieldMap, FromRecord, Joined, Record};
pub use subst::{Qualify, SqlContext, substitute, substitute_with};
pub use validate::{Check, Rule, Validator};
pub use value::{Args, FromValue, ToValue, Value};

#[cfg(feature = "derive")]
pub use lorm_derive::Entity;

// Re-export inventory for use by derive macros
pub use inventory;
