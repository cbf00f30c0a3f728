use proc_macro::TokenStream;
use syn::{DeriveInput, ItemImpl, parse_macro_input};

mod endpoint;
mod injectable;
mod params;

/// Marks an inherent `impl` block as a handler type.
///
/// Verb markers go either on the block (`#[endpoint(get)]`) or on one
/// method (`#[get]`, `#[post]`, ...). Parameters accept `#[body]`,
/// `#[body(default = expr)]`, `#[param(default = expr)]` and
/// `#[meta(key = "value")]`. Extra attributes on the block itself must come
/// after `#[endpoint]`.
#[proc_macro_attribute]
pub fn endpoint(attr: TokenStream, item: TokenStream) -> TokenStream {
    let markers = match endpoint::parse_type_markers(attr.into()) {
        Ok(markers) => markers,
        Err(e) => return e.to_compile_error().into(),
    };
    let item = parse_macro_input!(item as ItemImpl);

    endpoint::expand(markers, item)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

/// Implements `Injectable` by resolving every field from the scope.
///
/// Fields marked `#[inject(default)]` are filled with `Default::default()`.
#[proc_macro_derive(Injectable, attributes(inject))]
pub fn derive_injectable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    injectable::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
