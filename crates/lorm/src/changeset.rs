//! Structured validation failures.
//!
//! Produced by [`Validator`](crate::validate::Validator) and stored on entities by
//! `Entity::validate`. Serializes to a JSON array for form error responses.

use serde::Serialize;
use std::collections::BTreeMap;

/// Which check failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationCode {
    Required,
    Len,
    Range,
    Email,
    Regex,
    Url,
    Uuid,
    Integer,
    OneOf,
}

impl ValidationCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Required => "required",
            Self::Len => "len",
            Self::Range => "range",
            Self::Email => "email",
            Self::Regex => "regex",
            Self::Url => "url",
            Self::Uuid => "uuid",
            Self::Integer => "integer",
            Self::OneOf => "one_of",
        }
    }
}

/// One failed rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationError {
    pub field: String,
    pub code: ValidationCode,
    pub message: String,
    /// Limits of the failed check (`min`, `max`), when it has any.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, code: ValidationCode, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            code,
            message: message.into(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Failures of one validation run, in rule order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<ValidationError>);

static NO_ERRORS: ValidationErrors = ValidationErrors(Vec::new());

impl ValidationErrors {
    /// Shared empty list, returned by entities that do not store errors.
    pub fn none() -> &'static ValidationErrors {
        &NO_ERRORS
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn push(&mut self, err: ValidationError) {
        self.0.push(err);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ValidationError> {
        self.0.iter()
    }

    /// Messages keyed by field, the shape form helpers render.
    pub fn messages(&self) -> BTreeMap<&str, Vec<&str>> {
        let mut out: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for err in &self.0 {
            out.entry(&err.field).or_default().push(&err.message);
        }
        out
    }
}

impl<'a> IntoIterator for &'a ValidationErrors {
    type Item = &'a ValidationError;
    type IntoIter = std::slice::Iter<'a, ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
