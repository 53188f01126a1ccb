//! Decoded entity instances.

use crate::error::{OrmError, OrmResult};
use crate::value::Value;
use serde::Serialize;
use std::collections::BTreeMap;

/// Field name to value input for mass assignment.
pub type FieldMap = BTreeMap<String, Value>;

/// One entity instance as field/value pairs in mapping order, plus nested records
/// for joined relations.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Record {
    entity: String,
    values: Vec<(String, Value)>,
    #[serde(skip_serializing_if = "Joined::is_empty")]
    joined: Joined,
}

impl Record {
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            values: Vec::new(),
            joined: Joined::default(),
        }
    }

    pub(crate) fn with_capacity(entity: &str, capacity: usize) -> Self {
        Self {
            entity: entity.to_string(),
            values: Vec::with_capacity(capacity),
            joined: Joined::default(),
        }
    }

    /// Builder-style [`Record::set`].
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    /// Name of the entity this record belongs to.
    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.iter().find(|(f, _)| f == field).map(|(_, v)| v)
    }

    /// Set a field, keeping its position when it already exists.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        let field = field.into();
        let value = value.into();
        match self.values.iter_mut().find(|(f, _)| *f == field) {
            Some(slot) => slot.1 = value,
            None => self.values.push((field, value)),
        }
    }

    /// Remove and return a field's value.
    pub fn take(&mut self, field: &str) -> Option<Value> {
        let pos = self.values.iter().position(|(f, _)| f == field)?;
        Some(self.values.remove(pos).1)
    }

    /// Field/value pairs in order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(f, v)| (f.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// True when every field is NULL (an unmatched LEFT JOIN).
    pub fn is_all_null(&self) -> bool {
        self.values.iter().all(|(_, v)| v.is_null())
    }

    /// Attach a nested record under a relation name.
    pub fn attach(&mut self, relation: impl Into<String>, record: Record) {
        self.joined.insert(relation.into(), record);
    }

    pub fn joined(&self) -> &Joined {
        &self.joined
    }

    /// Move the nested records out, leaving none behind.
    pub fn take_joined(&mut self) -> Joined {
        std::mem::take(&mut self.joined)
    }

    pub(crate) fn push(&mut self, field: &str, value: Value) {
        self.values.push((field.to_string(), value));
    }
}

/// Conversion from a decoded [`Record`].
///
/// `#[derive(Entity)]` implements this for entity structs; [`Record`] implements it
/// as the identity so queries can return untyped records.
pub trait FromRecord: Sized {
    fn from_record(record: Record) -> OrmResult<Self>;
}

impl FromRecord for Record {
    fn from_record(record: Record) -> OrmResult<Self> {
        Ok(record)
    }
}

/// Nested records of joined relations, in join order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Joined {
    records: Vec<(String, Record)>,
}

impl Joined {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    fn insert(&mut self, relation: String, record: Record) {
        match self.records.iter_mut().find(|(r, _)| *r == relation) {
            Some(slot) => slot.1 = record,
            None => self.records.push((relation, record)),
        }
    }

    /// Raw nested record for `relation`.
    pub fn record(&self, relation: &str) -> Option<&Record> {
        self.records
            .iter()
            .find(|(r, _)| r == relation)
            .map(|(_, rec)| rec)
    }

    /// Relation names in join order.
    pub fn relations(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|(r, _)| r.as_str())
    }

    /// Decode the nested record for `relation`.
    ///
    /// Fails with [`OrmError::UnknownRelation`] when the relation was not joined.
    pub fn get<R: FromRecord>(&self, relation: &str) -> OrmResult<R> {
        let record = self.record(relation).ok_or_else(|| {
            OrmError::unknown_relation("<joined>", relation)
        })?;
        R::from_record(record.clone())
    }

    /// Like [`Joined::get`], but `None` when the LEFT JOIN matched no row.
    pub fn get_opt<R: FromRecord>(&self, relation: &str) -> OrmResult<Option<R>> {
        match self.record(relation) {
            Some(record) if record.is_all_null() => Ok(None),
            Some(record) => R::from_record(record.clone()).map(Some),
            None => Err(OrmError::unknown_relation("<joined>", relation)),
        }
    }
}
