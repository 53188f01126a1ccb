//! Entity derive macro implementation
//!
//! ## Module Structure
//!
//! - `attrs`: struct and field `#[orm(...)]` attribute parsing

mod attrs;

use attrs::{FieldKind, get_field_attr, get_struct_attrs};
use heck::ToSnakeCase;
use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, Result};

struct ColumnField {
    ident: syn::Ident,
    ty: syn::Type,
    name: String,
    column: String,
}

/// Whether `ty` is spelled `Option<_>` (any path ending in `Option`).
fn is_option(ty: &syn::Type) -> bool {
    let syn::Type::Path(type_path) = ty else {
        return false;
    };
    type_path.qself.is_none()
        && type_path.path.segments.last().is_some_and(|seg| {
            let syn::PathArguments::AngleBracketed(args) = &seg.arguments else {
                return false;
            };
            seg.ident == "Option" && args.args.len() == 1
        })
}

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let ident = &input.ident;

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Entity cannot be derived for generic structs",
        ));
    }

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "Entity can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "Entity can only be derived for structs",
            ));
        }
    };

    let struct_attrs = get_struct_attrs(&input)?;
    let entity_name = struct_attrs
        .name
        .clone()
        .unwrap_or_else(|| ident.to_string());
    let table = struct_attrs
        .table
        .clone()
        .unwrap_or_else(|| ident.to_string().to_snake_case());

    let mut columns: Vec<ColumnField> = Vec::with_capacity(fields.len());
    let mut id_field: Option<String> = None;
    let mut protected: Vec<String> = Vec::new();
    let mut joined_field: Option<syn::Ident> = None;
    let mut errors_field: Option<syn::Ident> = None;
    let mut skipped: Vec<syn::Ident> = Vec::new();

    for field in fields {
        let Some(field_ident) = field.ident.clone() else {
            continue;
        };
        let attr = get_field_attr(field)?;
        let name = field_ident.to_string();

        match attr.kind {
            FieldKind::Column => {}
            FieldKind::Joined => {
                if joined_field.replace(field_ident).is_some() {
                    return Err(syn::Error::new_spanned(
                        field,
                        "only one #[orm(joined)] field is allowed",
                    ));
                }
                continue;
            }
            FieldKind::Errors => {
                if errors_field.replace(field_ident).is_some() {
                    return Err(syn::Error::new_spanned(
                        field,
                        "only one #[orm(errors)] field is allowed",
                    ));
                }
                continue;
            }
            FieldKind::Skip => {
                skipped.push(field_ident);
                continue;
            }
        }

        if attr.is_id {
            if id_field.is_some() {
                return Err(syn::Error::new_spanned(
                    field,
                    "only one #[orm(id)] field is allowed",
                ));
            }
            id_field = Some(name.clone());
        }
        if attr.protected {
            protected.push(name.clone());
        }
        columns.push(ColumnField {
            ident: field_ident,
            ty: field.ty.clone(),
            column: attr.column.unwrap_or_else(|| name.clone()),
            name,
        });
    }

    if columns.is_empty() {
        return Err(syn::Error::new_spanned(
            &input,
            "Entity requires at least one persisted field",
        ));
    }
    // Without #[orm(id)] the key is the field named `id`.
    let id_field = id_field.unwrap_or_else(|| "id".to_string());
    let Some(id_column) = columns.iter().find(|c| c.name == id_field) else {
        return Err(syn::Error::new_spanned(
            &input,
            "Entity requires an #[orm(id)] field or a field named `id`",
        ));
    };
    // `None` is what makes `save` insert and adopt the generated key.
    if !is_option(&id_column.ty) {
        return Err(syn::Error::new_spanned(
            &id_column.ty,
            "Entity primary key must be an Option<_> so an unsaved entity has no key",
        ));
    }

    // ==================== descriptor ====================

    let field_calls = columns.iter().map(|c| {
        let name = &c.name;
        let column = &c.column;
        quote! { .field(#name, #column) }
    });
    let relation_calls = struct_attrs.relations.iter().map(|r| {
        let name = &r.name;
        let entity = &r.entity;
        let on = &r.on;
        quote! { .relation(#name, #entity, #on) }
    });
    let protect_calls = protected.iter().map(|p| quote! { .protect(#p) });
    let rules_call = struct_attrs
        .rules
        .as_ref()
        .map(|path| quote! { .rules(#path()) });

    // ==================== FromRecord ====================

    let decode_fields = columns.iter().map(|c| {
        let field_ident = &c.ident;
        let name = &c.name;
        let column_label = format!("{entity_name}.{name}");
        quote! {
            #field_ident: lorm::FromValue::from_value(
                record.take(#name).unwrap_or(lorm::Value::Null),
            )
            .map_err(|e| lorm::OrmError::decode(#column_label, e))?
        }
    });
    let decode_joined = joined_field
        .as_ref()
        .map(|f| quote! { #f: record.take_joined(), });
    let decode_errors = errors_field
        .as_ref()
        .map(|f| quote! { #f: ::core::default::Default::default(), });
    let decode_skipped = skipped
        .iter()
        .map(|f| quote! { #f: ::core::default::Default::default(), });

    // ==================== Entity ====================

    let to_record_fields = columns.iter().map(|c| {
        let field_ident = &c.ident;
        let name = &c.name;
        quote! { .with(#name, lorm::ToValue::to_value(&self.#field_ident)) }
    });
    let set_field_arms = columns.iter().map(|c| {
        let field_ident = &c.ident;
        let name = &c.name;
        let column_label = format!("{entity_name}.{name}");
        quote! {
            #name => {
                self.#field_ident = lorm::FromValue::from_value(value)
                    .map_err(|e| lorm::OrmError::decode(#column_label, e))?;
            }
        }
    });
    let errors_impl = errors_field.as_ref().map(|f| {
        quote! {
            fn errors(&self) -> &lorm::ValidationErrors {
                &self.#f
            }

            fn set_errors(&mut self, errors: lorm::ValidationErrors) {
                self.#f = errors;
            }
        }
    });

    Ok(quote! {
        impl lorm::FromRecord for #ident {
            fn from_record(mut record: lorm::Record) -> lorm::OrmResult<Self> {
                Ok(Self {
                    #(#decode_fields,)*
                    #decode_joined
                    #decode_errors
                    #(#decode_skipped)*
                })
            }
        }

        impl lorm::Entity for #ident {
            fn descriptor() -> ::std::sync::Arc<lorm::EntityDescriptor> {
                static DESCRIPTOR: ::std::sync::OnceLock<::std::sync::Arc<lorm::EntityDescriptor>> =
                    ::std::sync::OnceLock::new();
                ::std::sync::Arc::clone(DESCRIPTOR.get_or_init(|| {
                    ::std::sync::Arc::new(
                        lorm::EntityDescriptor::new(#entity_name, #table)
                            .primary_key(#id_field)
                            #(#field_calls)*
                            #(#relation_calls)*
                            #(#protect_calls)*
                            #rules_call
                    )
                }))
            }

            fn to_record(&self) -> lorm::Record {
                lorm::Record::new(#entity_name)
                    #(#to_record_fields)*
            }

            fn set_field(&mut self, field: &str, value: lorm::Value) -> lorm::OrmResult<()> {
                match field {
                    #(#set_field_arms)*
                    _ => return Err(lorm::OrmError::mapping(#entity_name, field)),
                }
                Ok(())
            }

            #errors_impl
        }

        lorm::inventory::submit! {
            lorm::EntityRegistration {
                descriptor: <#ident as lorm::Entity>::descriptor,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    fn expand_err(input: DeriveInput) -> String {
        match expand(input) {
            Ok(_) => panic!("expected the derive to fail"),
            Err(e) => e.to_string(),
        }
    }

    #[test]
    fn test_is_option() {
        let ty: syn::Type = parse_quote!(Option<i64>);
        assert!(is_option(&ty));
        let ty: syn::Type = parse_quote!(::std::option::Option<String>);
        assert!(is_option(&ty));
        let ty: syn::Type = parse_quote!(i64);
        assert!(!is_option(&ty));
        let ty: syn::Type = parse_quote!(Vec<i64>);
        assert!(!is_option(&ty));
    }

    #[test]
    fn non_option_key_is_rejected() {
        let err = expand_err(parse_quote! {
            struct Tag {
                id: i64,
                label: String,
            }
        });
        assert!(err.contains("must be an Option<_>"), "{err}");

        let err = expand_err(parse_quote! {
            struct Tag {
                #[orm(id, column = "t_id")]
                key: u32,
                label: String,
            }
        });
        assert!(err.contains("must be an Option<_>"), "{err}");
    }

    #[test]
    fn option_key_expands() {
        let input: DeriveInput = parse_quote! {
            #[orm(table = "tag")]
            struct Tag {
                #[orm(column = "t_id")]
                id: Option<i64>,
                label: String,
            }
        };
        let tokens = expand(input).unwrap().to_string();
        assert!(tokens.contains("impl lorm :: Entity for Tag"), "{tokens}");
        assert!(tokens.contains("\"t_id\""));
    }

    #[test]
    fn missing_key_is_rejected() {
        let err = expand_err(parse_quote! {
            struct Tag {
                label: String,
            }
        });
        assert!(err.contains("field named `id`"), "{err}");
    }
}
