//! Symbolic field substitution.
//!
//! SQL fragments passed to the query builder may reference fields symbolically:
//!
//! - `[field]` resolves against the fragment's default entity
//! - `[Entity.field]` resolves `Entity` through the registry
//!
//! Each reference is replaced by `prefix + table + "." + column`. Replacement text is
//! never scanned again. Bracketed text that is not an identifier reference is kept
//! verbatim.

use crate::client::Connection;
use crate::error::OrmResult;
use crate::meta::{EntityDescriptor, Registry};
use regex::Regex;
use std::sync::{Arc, OnceLock};

/// Where SQL is being generated: the table prefix and the registry for `[Entity.field]`.
#[derive(Debug, Clone, Copy)]
pub struct SqlContext<'a> {
    pub prefix: &'a str,
    pub registry: &'a Registry,
}

impl<'a> SqlContext<'a> {
    pub fn new(prefix: &'a str, registry: &'a Registry) -> Self {
        Self { prefix, registry }
    }

    /// Context of a connection: its configured prefix and registry.
    pub fn of<C: Connection + ?Sized>(conn: &'a C) -> Self {
        Self {
            prefix: conn.table_prefix(),
            registry: conn.registry(),
        }
    }

    /// Resolve an entity, preferring `default` when the names match.
    pub(crate) fn resolve(
        &self,
        name: &str,
        default: &Arc<EntityDescriptor>,
    ) -> OrmResult<Arc<EntityDescriptor>> {
        if name == default.name() {
            Ok(Arc::clone(default))
        } else {
            self.registry.get(name)
        }
    }
}

/// How a resolved reference is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Qualify {
    /// `prefix_table.column`
    Table,
    /// `column` only; SQLite rejects qualified UPDATE assignment targets.
    Bare,
}

fn reference_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\[([A-Za-z_][A-Za-z0-9_]*)(?:\.([A-Za-z_][A-Za-z0-9_]*))?\]")
            .expect("invalid built-in reference regex")
    })
}

/// Replace every symbolic reference in `fragment` with its qualified column.
pub fn substitute(
    fragment: &str,
    default: &Arc<EntityDescriptor>,
    ctx: &SqlContext<'_>,
) -> OrmResult<String> {
    substitute_with(fragment, default, ctx, Qualify::Table)
}

/// [`substitute`] with an explicit rendering mode.
pub fn substitute_with(
    fragment: &str,
    default: &Arc<EntityDescriptor>,
    ctx: &SqlContext<'_>,
    qualify: Qualify,
) -> OrmResult<String> {
    let mut out = String::with_capacity(fragment.len() + 16);
    let mut last = 0;

    for caps in reference_pattern().captures_iter(fragment) {
        let whole = caps.get(0).expect("group 0 always matches");
        out.push_str(&fragment[last..whole.start()]);

        let (entity, field) = match caps.get(2) {
            Some(field) => (ctx.resolve(&caps[1], default)?, field.as_str()),
            None => (Arc::clone(default), &caps[1]),
        };

        match qualify {
            Qualify::Table => out.push_str(&entity.qualified_column(ctx.prefix, field)?),
            Qualify::Bare => out.push_str(entity.column(field)?),
        }
        last = whole.end();
    }

    out.push_str(&fragment[last..]);
    Ok(out)
}
