//! Derive macros for calltrace
//!
//! Provides `#[derive(ParameterObject)]`.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod parameter_object;

/// Derive `ParameterObject` for a struct, so it can be bound to a statement.
///
/// # Example
///
/// ```ignore
/// use calltrace::ParameterObject;
///
/// #[derive(ParameterObject)]
/// struct Order {
///     id: i64,
///     #[trace(rename = "customerName")]
///     customer: String,
///     #[trace(nested)]
///     address: Address,
///     #[trace(skip)]
///     password_hash: String,
/// }
/// ```
///
/// # Attributes
///
/// - `#[trace(rename = "name")]` - Resolve the field under a different property name
/// - `#[trace(skip)]` - Never resolve the field
/// - `#[trace(nested)]` - Resolve dotted paths (`address.city`) through the field,
///   which must itself implement `ParameterObject`
///
/// Other fields must implement `ToSqlValue`.
#[proc_macro_derive(ParameterObject, attributes(trace))]
pub fn derive_parameter_object(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    parameter_object::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
