//! ParameterObject derive macro implementation

use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, Result};

/// Parsed field-level `#[trace(...)]` attribute.
#[derive(Default)]
struct FieldAttr {
    rename: Option<String>,
    skip: bool,
    nested: bool,
}

impl syn::parse::Parse for FieldAttr {
    fn parse(input: syn::parse::ParseStream) -> Result<Self> {
        let mut attr = FieldAttr::default();

        while !input.is_empty() {
            let ident: syn::Ident = input.parse()?;
            if ident == "skip" {
                attr.skip = true;
            } else if ident == "nested" {
                attr.nested = true;
            } else if ident == "rename" {
                let _: syn::Token![=] = input.parse()?;
                let value: syn::LitStr = input.parse()?;
                attr.rename = Some(value.value());
            } else {
                return Err(syn::Error::new_spanned(
                    &ident,
                    "expected `rename = \"...\"`, `skip` or `nested`",
                ));
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

fn field_attr(field: &syn::Field) -> Result<FieldAttr> {
    let mut merged = FieldAttr::default();
    for attr in &field.attrs {
        if attr.path().is_ident("trace") {
            let parsed: FieldAttr = attr.parse_args()?;
            merged.skip |= parsed.skip;
            merged.nested |= parsed.nested;
            if parsed.rename.is_some() {
                merged.rename = parsed.rename;
            }
        }
    }
    Ok(merged)
}

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    let generics = &input.generics;
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "ParameterObject can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "ParameterObject can only be derived for structs",
            ));
        }
    };

    let mut direct_arms = Vec::new();
    let mut nested_arms = Vec::new();

    for field in fields {
        let attr = field_attr(field)?;
        if attr.skip {
            continue;
        }
        let Some(field_name) = field.ident.as_ref() else {
            continue;
        };
        let property = attr.rename.unwrap_or_else(|| field_name.to_string());

        if attr.nested {
            nested_arms.push(quote! {
                ::core::option::Option::Some((#property, rest)) => {
                    ::calltrace::ParameterObject::property(&self.#field_name, rest)
                }
            });
        } else {
            direct_arms.push(quote! {
                #property => ::core::option::Option::Some(
                    ::calltrace::ToSqlValue::to_sql_value(&self.#field_name)
                )
            });
        }
    }

    Ok(quote! {
        impl #impl_generics ::calltrace::ParameterObject for #name #ty_generics #where_clause {
            fn property(&self, name: &str) -> ::core::option::Option<::calltrace::SqlValue> {
                match name {
                    #(#direct_arms,)*
                    _ => match name.split_once('.') {
                        #(#nested_arms,)*
                        _ => ::core::option::Option::None,
                    },
                }
            }
        }
    })
}
