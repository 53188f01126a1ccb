//! Convenient imports for typical `lorm` usage.
//!
//! ```ignore
//! use lorm::prelude::*;
//! ```

pub use crate::{
    Args, Config, Connection, Database, Direction, Entity, FieldMap, FromRecord, Joined,
    OrmError, OrmResult, Query, Record, ValidationErrors, Value,
};
pub use crate::validate::{Check, Rule};
