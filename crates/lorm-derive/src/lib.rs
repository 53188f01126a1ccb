//! Derive macros for lorm
//!
//! Provides `#[derive(Entity)]`.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod entity;

/// Derive `FromRecord` and `Entity` for a struct, and register its descriptor.
///
/// # Example
///
/// ```ignore
/// use lorm::prelude::*;
///
/// #[derive(Debug, Clone, Default, Entity)]
/// #[orm(table = "person", rules = "person_rules")]
/// #[orm(relation(name = "role", entity = "Role", on = "[role_id] = [Role.id]"))]
/// struct Person {
///     #[orm(id, column = "p_id", protected)]
///     id: Option<i64>,
///     #[orm(column = "p_name")]
///     name: String,
///     #[orm(column = "p_role")]
///     role_id: Option<i64>,
///     #[orm(joined)]
///     joined: Joined,
///     #[orm(errors)]
///     errors: ValidationErrors,
/// }
/// ```
///
/// # Struct attributes
///
/// - `#[orm(table = "name")]` - Table name before prefixing (default: snake_case of the struct name)
/// - `#[orm(name = "Name")]` - Entity name used in `[Entity.field]` references (default: struct name)
/// - `#[orm(rules = "path")]` - Function returning `Vec<lorm::validate::Rule>`
/// - `#[orm(relation(name = "...", entity = "...", on = "..."))]` - Joinable relation (repeatable)
///
/// # Field attributes
///
/// - `#[orm(id)]` - Primary key (default: the field named `id`); must be `Option<_>`,
///   `None` meaning not yet saved
/// - `#[orm(column = "name")]` - Map field to a different column name
/// - `#[orm(protected)]` - Exclude from mass assignment
/// - `#[orm(joined)]` - `Joined` field receiving nested records of joined relations
/// - `#[orm(errors)]` - `ValidationErrors` field written by `validate`; without one,
///   `errors()` is always empty and failures are only logged
/// - `#[orm(skip)]` - Not persisted; `Default` on decode
#[proc_macro_derive(Entity, attributes(orm))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    entity::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
