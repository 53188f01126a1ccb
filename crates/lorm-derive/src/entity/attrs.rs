//! Attribute parsing for the Entity derive macro.
//!
//! Handles struct-level and field-level `#[orm(...)]` attributes.

use proc_macro2::Span;
use syn::Result;

pub(super) struct RelationAttr {
    pub(super) name: String,
    pub(super) entity: String,
    pub(super) on: String,
}

#[derive(Default)]
pub(super) struct StructAttrs {
    pub(super) table: Option<String>,
    pub(super) name: Option<String>,
    pub(super) rules: Option<syn::Path>,
    pub(super) relations: Vec<RelationAttr>,
}

impl StructAttrs {
    fn merge(&mut self, other: StructAttrs) {
        if other.table.is_some() {
            self.table = other.table;
        }
        if other.name.is_some() {
            self.name = other.name;
        }
        if other.rules.is_some() {
            self.rules = other.rules;
        }
        self.relations.extend(other.relations);
    }
}

fn parse_relation(input: syn::parse::ParseStream) -> Result<RelationAttr> {
    let content;
    syn::parenthesized!(content in input);

    let mut name = None;
    let mut entity = None;
    let mut on = None;
    while !content.is_empty() {
        let key: syn::Ident = content.parse()?;
        let _: syn::Token![=] = content.parse()?;
        let value: syn::LitStr = content.parse()?;
        match key.to_string().as_str() {
            "name" => name = Some(value.value()),
            "entity" => entity = Some(value.value()),
            "on" => on = Some(value.value()),
            other => {
                return Err(syn::Error::new(
                    key.span(),
                    format!("unknown relation key `{other}`"),
                ));
            }
        }
        if content.peek(syn::Token![,]) {
            let _: syn::Token![,] = content.parse()?;
        }
    }

    let missing = |what: &str| syn::Error::new(Span::call_site(), format!("relation requires `{what}`"));
    Ok(RelationAttr {
        name: name.ok_or_else(|| missing("name"))?,
        entity: entity.ok_or_else(|| missing("entity"))?,
        on: on.ok_or_else(|| missing("on"))?,
    })
}

impl syn::parse::Parse for StructAttrs {
    fn parse(input: syn::parse::ParseStream) -> Result<Self> {
        let mut attrs = StructAttrs::default();

        while !input.is_empty() {
            let ident: syn::Ident = input.parse()?;
            let key = ident.to_string();

            if key == "relation" {
                if !input.peek(syn::token::Paren) {
                    return Err(syn::Error::new(
                        ident.span(),
                        "expected relation(name = \"...\", entity = \"...\", on = \"...\")",
                    ));
                }
                attrs.relations.push(parse_relation(input)?);
            } else {
                let _: syn::Token![=] = input.parse()?;
                let value: syn::LitStr = input.parse()?;
                match key.as_str() {
                    "table" => attrs.table = Some(value.value()),
                    "name" => attrs.name = Some(value.value()),
                    "rules" => {
                        let path: syn::Path = syn::parse_str(&value.value()).map_err(|e| {
                            syn::Error::new(value.span(), format!("invalid rules path: {e}"))
                        })?;
                        attrs.rules = Some(path);
                    }
                    _ => {
                        return Err(syn::Error::new(
                            ident.span(),
                            format!("unknown struct attribute `{key}`"),
                        ));
                    }
                }
            }

            if input.peek(syn::Token![,]) {
                let _: syn::Token![,] = input.parse()?;
            } else {
                break;
            }
        }

        Ok(attrs)
    }
}

/// Collect every struct-level `#[orm(...)]` attribute.
pub(super) fn get_struct_attrs(input: &syn::DeriveInput) -> Result<StructAttrs> {
    let mut attrs = StructAttrs::default();
    for attr in &input.attrs {
        if attr.path().is_ident("orm") {
            attrs.merge(attr.parse_args::<StructAttrs>()?);
        }
    }
    Ok(attrs)
}

/// Role of a field in the generated impls.
#[derive(Clone, Copy, PartialEq, Eq)]
pub(super) enum FieldKind {
    /// Persisted column.
    Column,
    /// Receives nested records of joined relations.
    Joined,
    /// Stores validation errors.
    Errors,
    /// Not persisted; defaulted on decode.
    Skip,
}

pub(super) struct FieldAttr {
    pub(super) is_id: bool,
    pub(super) protected: bool,
    pub(super) column: Option<String>,
    pub(super) kind: FieldKind,
}

impl Default for FieldAttr {
    fn default() -> Self {
        Self {
            is_id: false,
            protected: false,
            column: None,
            kind: FieldKind::Column,
        }
    }
}

impl syn::parse::Parse for FieldAttr {
    fn parse(input: syn::parse::ParseStream) -> Result<Self> {
        let mut attr = FieldAttr::default();

        while !input.is_empty() {
            let ident: syn::Ident = input.parse()?;
            let key = ident.to_string();

            if input.peek(syn::Token![=]) {
                let _: syn::Token![=] = input.parse()?;
                let value: syn::LitStr = input.parse()?;
                if key == "column" {
                    attr.column = Some(value.value());
                } else {
                    return Err(syn::Error::new(
                        ident.span(),
                        format!("unknown field attribute `{key}`"),
                    ));
                }
            } else {
                match key.as_str() {
                    "id" => attr.is_id = true,
                    "protected" => attr.protected = true,
                    "joined" => attr.kind = FieldKind::Joined,
                    "errors" => attr.kind = FieldKind::Errors,
                    "skip" => attr.kind = FieldKind::Skip,
                    _ => {
                        return Err(syn::Error::new(
                            ident.span(),
                            format!("unknown field attribute `{key}`"),
                        ));
                    }
                }
            }

            if input.peek(syn::Token![,]) {
                let _: syn::Token![,] = input.parse()?;
            } else {
                break;
            }
        }

        Ok(attr)
    }
}

pub(super) fn get_field_attr(field: &syn::Field) -> Result<FieldAttr> {
    let mut merged = FieldAttr::default();
    for attr in &field.attrs {
        if !attr.path().is_ident("orm") {
            continue;
        }
        let parsed = attr.parse_args::<FieldAttr>()?;
        merged.is_id |= parsed.is_id;
        merged.protected |= parsed.protected;
        if parsed.column.is_some() {
            merged.column = parsed.column;
        }
        if parsed.kind != FieldKind::Column {
            merged.kind = parsed.kind;
        }
    }
    Ok(merged)
}
