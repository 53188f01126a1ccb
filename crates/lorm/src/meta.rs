//! Entity metadata: descriptors and the registry that resolves them by name.
//!
//! An [`EntityDescriptor`] is built once per entity type and shared as an
//! `Arc`. `#[derive(Entity)]` generates the descriptor and submits an
//! [`EntityRegistration`] so that [`Registry::global`] can resolve
//! `[Entity.field]` references and relation targets without reflection.
//!
//! ```ignore
//! use lorm::EntityDescriptor;
//!
//! let person = EntityDescriptor::new("Person", "person")
//!     .primary_key("id")
//!     .field("id", "p_id")
//!     .field("name", "p_name")
//!     .relation("role", "Role", "[role_id] = [Role.id]");
//! ```

use crate::error::{OrmError, OrmResult};
use crate::validate::Rule;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

/// One persisted field and the column it is stored in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub name: String,
    pub column: String,
}

/// A joinable association and its ON-clause template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationDef {
    /// Relation name used by `join` and as the nested record key.
    pub name: String,
    /// Name of the related entity in the registry.
    pub entity: String,
    /// ON-clause template; may contain `[field]` / `[Entity.field]` references.
    pub on: String,
}

/// Immutable metadata for one entity type.
#[derive(Debug, Clone)]
pub struct EntityDescriptor {
    name: String,
    table: String,
    primary_key: String,
    fields: Vec<FieldDef>,
    relations: Vec<RelationDef>,
    rules: Vec<Rule>,
    protected: Vec<String>,
}

impl EntityDescriptor {
    /// Start a descriptor for entity `name` stored in `table` (before prefix).
    ///
    /// The primary key defaults to `id`.
    pub fn new(name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            primary_key: "id".to_string(),
            fields: Vec::new(),
            relations: Vec::new(),
            rules: Vec::new(),
            protected: Vec::new(),
        }
    }

    /// Set the primary key field.
    pub fn primary_key(mut self, field: impl Into<String>) -> Self {
        self.primary_key = field.into();
        self
    }

    /// Append a mapped field. Order is significant.
    pub fn field(mut self, name: impl Into<String>, column: impl Into<String>) -> Self {
        self.fields.push(FieldDef {
            name: name.into(),
            column: column.into(),
        });
        self
    }

    /// Declare a joinable relation.
    pub fn relation(
        mut self,
        name: impl Into<String>,
        entity: impl Into<String>,
        on: impl Into<String>,
    ) -> Self {
        self.relations.push(RelationDef {
            name: name.into(),
            entity: entity.into(),
            on: on.into(),
        });
        self
    }

    /// Attach validation rules.
    pub fn rules(mut self, rules: impl IntoIterator<Item = Rule>) -> Self {
        self.rules.extend(rules);
        self
    }

    /// Exclude a field from mass assignment.
    pub fn protect(mut self, field: impl Into<String>) -> Self {
        self.protected.push(field.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Physical table name with the given prefix.
    pub fn table_name(&self, prefix: &str) -> String {
        format!("{prefix}{}", self.table)
    }

    pub fn primary_key_field(&self) -> &str {
        &self.primary_key
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn relations(&self) -> &[RelationDef] {
        &self.relations
    }

    pub fn validation_rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn protected(&self) -> &[String] {
        &self.protected
    }

    pub fn is_protected(&self, field: &str) -> bool {
        self.protected.iter().any(|p| p == field)
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f.name == field)
    }

    /// Column name for `field`, or a mapping error.
    pub fn column(&self, field: &str) -> OrmResult<&str> {
        self.fields
            .iter()
            .find(|f| f.name == field)
            .map(|f| f.column.as_str())
            .ok_or_else(|| OrmError::mapping(&self.name, field))
    }

    /// `prefix + table + "." + column` for `field`.
    pub fn qualified_column(&self, prefix: &str, field: &str) -> OrmResult<String> {
        let column = self.column(field)?;
        Ok(format!("{prefix}{}.{column}", self.table))
    }

    /// Column of the primary key field.
    pub fn primary_key_column(&self) -> OrmResult<&str> {
        self.column(&self.primary_key)
    }

    /// Mapped fields other than the primary key, in mapping order.
    pub fn non_key_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter().filter(|f| f.name != self.primary_key)
    }

    pub fn relation_def(&self, name: &str) -> OrmResult<&RelationDef> {
        self.relations
            .iter()
            .find(|r| r.name == name)
            .ok_or_else(|| OrmError::unknown_relation(&self.name, name))
    }
}

/// Registration entry submitted by `#[derive(Entity)]`.
pub struct EntityRegistration {
    /// Returns the entity's shared descriptor.
    pub descriptor: fn() -> Arc<EntityDescriptor>,
}

inventory::collect!(EntityRegistration);

/// Maps entity names to their descriptors.
#[derive(Debug, Default)]
pub struct Registry {
    entities: RwLock<HashMap<String, Arc<EntityDescriptor>>>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry, seeded with every derived entity.
    pub fn global() -> &'static Registry {
        static GLOBAL: OnceLock<Registry> = OnceLock::new();
        GLOBAL.get_or_init(|| {
            let registry = Registry::new();
            for registration in inventory::iter::<EntityRegistration> {
                registry.insert((registration.descriptor)());
            }
            registry
        })
    }

    /// Register a descriptor, replacing any previous entry with the same name.
    pub fn register(&self, descriptor: EntityDescriptor) -> Arc<EntityDescriptor> {
        let descriptor = Arc::new(descriptor);
        self.insert(Arc::clone(&descriptor));
        descriptor
    }

    /// Register an already shared descriptor.
    pub fn insert(&self, descriptor: Arc<EntityDescriptor>) {
        let mut entities = self
            .entities
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        entities.insert(descriptor.name().to_string(), descriptor);
    }

    /// Look up a descriptor by entity name.
    pub fn get(&self, name: &str) -> OrmResult<Arc<EntityDescriptor>> {
        let entities = self.entities.read().unwrap_or_else(PoisonError::into_inner);
        entities
            .get(name)
            .cloned()
            .ok_or_else(|| OrmError::UnknownEntity(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        let entities = self.entities.read().unwrap_or_else(PoisonError::into_inner);
        entities.contains_key(name)
    }

    pub fn len(&self) -> usize {
        let entities = self.entities.read().unwrap_or_else(PoisonError::into_inner);
        entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
