//! Error types for lorm

use rusqlite::ErrorCode;
use rusqlite::ffi;
use thiserror::Error;

/// Result type alias for lorm operations
pub type OrmResult<T> = Result<T, OrmError>;

/// Error types for metadata resolution and database operations
#[derive(Debug, Error)]
pub enum OrmError {
    /// A symbolic reference or assignment named a field the entity does not map
    #[error("Mapping error: entity '{entity}' has no field '{field}'")]
    Mapping { entity: String, field: String },

    /// An `[Entity.field]` reference or relation targets an unregistered entity
    #[error("Unknown entity: {0}")]
    UnknownEntity(String),

    /// `join` named a relation that is not declared on the entity
    #[error("Unknown relation '{relation}' on entity '{entity}'")]
    UnknownRelation { entity: String, relation: String },

    /// Bound argument count does not match the statement's placeholders
    #[error("Parameter count mismatch: statement expects {expected}, got {given}")]
    ParameterCount { expected: usize, given: usize },

    /// Database connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Statement execution error
    #[error("Query error: {0}")]
    Query(#[source] rusqlite::Error),

    /// Unique or primary key constraint violation
    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    /// Foreign key constraint violation
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// Check / NOT NULL constraint violation
    #[error("Check constraint violation: {0}")]
    CheckViolation(String),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl OrmError {
    /// Create a mapping error for `entity.field`
    pub fn mapping(entity: impl Into<String>, field: impl Into<String>) -> Self {
        Self::Mapping {
            entity: entity.into(),
            field: field.into(),
        }
    }

    /// Create an unknown relation error
    pub fn unknown_relation(entity: impl Into<String>, relation: impl Into<String>) -> Self {
        Self::UnknownRelation {
            entity: entity.into(),
            relation: relation.into(),
        }
    }

    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Check if this is a unique violation error
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::UniqueViolation(_))
    }

    /// Whether the database rejected or failed a statement.
    ///
    /// These are the failures `save` reports as `Ok(None)` instead of `Err`.
    pub fn is_statement_error(&self) -> bool {
        matches!(
            self,
            Self::Query(_)
                | Self::ParameterCount { .. }
                | Self::UniqueViolation(_)
                | Self::ForeignKeyViolation(_)
                | Self::CheckViolation(_)
        )
    }

    /// Parse a rusqlite error into a more specific OrmError
    pub fn from_db_error(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(code, message) = &err {
            if code.code == ErrorCode::ConstraintViolation {
                let message = message
                    .clone()
                    .unwrap_or_else(|| "constraint failed".to_string());
                match code.extended_code {
                    ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                        return Self::UniqueViolation(message);
                    }
                    ffi::SQLITE_CONSTRAINT_FOREIGNKEY => {
                        return Self::ForeignKeyViolation(message);
                    }
                    ffi::SQLITE_CONSTRAINT_CHECK | ffi::SQLITE_CONSTRAINT_NOTNULL => {
                        return Self::CheckViolation(message);
                    }
                    _ => {}
                }
            }
        }

        match err {
            rusqlite::Error::InvalidParameterCount(given, expected) => {
                Self::ParameterCount { expected, given }
            }
            other => Self::Query(other),
        }
    }
}

impl From<rusqlite::Error> for OrmError {
    fn from(err: rusqlite::Error) -> Self {
        Self::from_db_error(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parameter_count_is_translated() {
        let err = OrmError::from(rusqlite::Error::InvalidParameterCount(1, 2));
        assert!(matches!(
            err,
            OrmError::ParameterCount {
                expected: 2,
                given: 1
            }
        ));
        assert!(err.is_statement_error());
    }

    #[test]
    fn mapping_error_is_not_a_statement_error() {
        let err = OrmError::mapping("Person", "nickname");
        assert!(!err.is_statement_error());
        assert_eq!(
            err.to_string(),
            "Mapping error: entity 'Person' has no field 'nickname'"
        );
    }

    #[test]
    fn unique_violation_is_classified() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY, v TEXT UNIQUE); INSERT INTO t (v) VALUES ('a');")
            .unwrap();
        let err = conn
            .execute("INSERT INTO t (v) VALUES ('a')", [])
            .map_err(OrmError::from)
            .unwrap_err();
        assert!(err.is_unique_violation(), "{err:?}");
    }
}
