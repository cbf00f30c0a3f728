//! `#[endpoint]` expansion.
//!
//! The annotated `impl` block is emitted unchanged apart from the inert
//! marker attributes, followed by a second `impl` block holding
//! `__waymark_handler_type()` and an `inventory` registration pointing at it.

use proc_macro2::{Span, TokenStream};
use quote::{format_ident, quote};
use syn::parse::Parser;
use syn::punctuated::Punctuated;
use syn::{
    Attribute, Expr, ExprLit, FnArg, Ident, ImplItem, ImplItemFn, ItemImpl, Lit, Meta, ReturnType,
    Token, Type,
};

use crate::params::{Param, parse_meta};

const VERBS: [(&str, &str); 7] = [
    ("get", "Get"),
    ("post", "Post"),
    ("put", "Put"),
    ("delete", "Delete"),
    ("patch", "Patch"),
    ("options", "Options"),
    ("head", "Head"),
];

const ASYNC_SUFFIX: &str = "_async";

fn verb_variant(name: &str) -> Option<Ident> {
    VERBS
        .iter()
        .find(|(marker, _)| *marker == name)
        .map(|(_, variant)| Ident::new(variant, Span::call_site()))
}

/// Parses `get`, `get, post`, ... from `#[endpoint(...)]`.
pub fn parse_type_markers(attr: TokenStream) -> syn::Result<Vec<Ident>> {
    let idents = Punctuated::<Ident, Token![,]>::parse_terminated.parse2(attr)?;
    idents
        .into_iter()
        .map(|ident| {
            verb_variant(&ident.to_string())
                .ok_or_else(|| syn::Error::new_spanned(&ident, "expected an HTTP verb marker"))
        })
        .collect()
}

/// Markers and annotations pulled off an item's attributes.
#[derive(Default)]
struct Declared {
    verbs: Vec<Ident>,
    body: bool,
    annotations: Vec<TokenStream>,
}

impl Declared {
    fn take(attrs: &mut Vec<Attribute>) -> syn::Result<Self> {
        let mut declared = Declared::default();
        let mut kept = Vec::with_capacity(attrs.len());

        for attr in attrs.drain(..) {
            let name = attr.path().get_ident().map(ToString::to_string);
            match name.as_deref() {
                Some(marker) if verb_variant(marker).is_some() => {
                    require_bare(&attr)?;
                    declared.verbs.extend(verb_variant(marker));
                }
                Some("body") => {
                    require_bare(&attr)?;
                    declared.body = true;
                }
                Some("meta") => {
                    for (key, value) in parse_meta(&attr)? {
                        declared.annotations.push(quote! { .annotation(#key, #value) });
                    }
                }
                Some("doc") => {
                    if let Some(doc) = doc_text(&attr) {
                        declared.annotations.push(quote! { .annotation("doc", #doc) });
                    }
                    kept.push(attr);
                }
                _ => kept.push(attr),
            }
        }

        *attrs = kept;
        Ok(declared)
    }
}

fn require_bare(attr: &Attribute) -> syn::Result<()> {
    match attr.meta {
        Meta::Path(_) => Ok(()),
        _ => Err(syn::Error::new_spanned(attr, "marker attributes take no arguments")),
    }
}

fn doc_text(attr: &Attribute) -> Option<String> {
    let Meta::NameValue(nv) = &attr.meta else {
        return None;
    };
    let Expr::Lit(ExprLit { lit: Lit::Str(doc), .. }) = &nv.value else {
        return None;
    };
    let doc = doc.value().trim().to_string();
    (!doc.is_empty()).then_some(doc)
}

pub fn expand(type_markers: Vec<Ident>, mut item: ItemImpl) -> syn::Result<TokenStream> {
    if item.trait_.is_some() {
        return Err(syn::Error::new_spanned(
            &item.self_ty,
            "#[endpoint] goes on an inherent impl block",
        ));
    }
    if !item.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &item.generics,
            "handler types cannot be generic",
        ));
    }

    let declared = Declared::take(&mut item.attrs)?;
    if declared.body {
        return Err(syn::Error::new_spanned(
            &item.self_ty,
            "#[body] goes on a method or a parameter",
        ));
    }
    let type_verbs = type_markers.iter().chain(&declared.verbs);
    let type_annotations = &declared.annotations;

    let mut functions = Vec::new();
    for impl_item in &mut item.items {
        if let ImplItem::Fn(method) = impl_item {
            if let Some(function) = handler_function(method)? {
                functions.push(function);
            }
        }
    }

    let self_ty = &item.self_ty;

    Ok(quote! {
        #item

        impl #self_ty {
            #[doc(hidden)]
            pub fn __waymark_handler_type() -> ::waymark::handler::HandlerType {
                ::waymark::handler::HandlerType::of::<Self>(::waymark::handler::SourceLocation {
                    file: ::std::file!(),
                    module_path: ::std::module_path!(),
                    manifest_dir: ::std::env!("CARGO_MANIFEST_DIR"),
                })
                #(.marker(::waymark::marker::Verb::#type_verbs))*
                #(#type_annotations)*
                #(.function(#functions))*
            }
        }

        const _: () = {
            ::waymark::__private::inventory::submit! {
                ::waymark::discovery::HandlerTypeRegistration::new(<#self_ty>::__waymark_handler_type)
            }
        };
    })
}

/// The `HandlerFunction` builder for one method, or `None` when the method
/// is neither marked nor an async action.
fn handler_function(method: &mut ImplItemFn) -> syn::Result<Option<TokenStream>> {
    let declared = Declared::take(&mut method.attrs)?;
    let name = method.sig.ident.to_string();
    let has_param_markers = method.sig.inputs.iter().any(|arg| match arg {
        FnArg::Typed(arg) => arg
            .attrs
            .iter()
            .any(|a| ["body", "param", "meta"].iter().any(|name| a.path().is_ident(name))),
        FnArg::Receiver(_) => false,
    });

    if declared.verbs.is_empty() && !name.ends_with(ASYNC_SUFFIX) {
        if declared.body || has_param_markers {
            return Err(syn::Error::new_spanned(
                &method.sig.ident,
                "parameter markers need a verb marker or an `_async` action",
            ));
        }
        return Ok(None);
    }

    let ident = &method.sig.ident;
    let mut receiver = false;
    let mut params = Vec::new();
    for arg in &mut method.sig.inputs {
        match arg {
            FnArg::Receiver(recv) => {
                if recv.reference.is_none() || recv.mutability.is_some() {
                    return Err(syn::Error::new_spanned(
                        recv,
                        "handler methods take `&self`",
                    ));
                }
                receiver = true;
            }
            FnArg::Typed(arg) => params.push(Param::from_arg(arg, declared.body)?),
        }
    }

    let bindings: Vec<Ident> = (0..params.len()).map(|i| format_ident!("__arg{}", i)).collect();
    let types = params.iter().map(|p| &p.ty);
    let specs = params.iter().map(Param::spec);

    let call = if receiver {
        quote! { this.#ident(#(#bindings),*) }
    } else {
        quote! { Self::#ident(#(#bindings),*) }
    };
    let call = if method.sig.asyncness.is_some() {
        quote! { #call.await }
    } else {
        call
    };
    let this = receiver.then(|| quote! { let this = scope.resolve::<Self>()?; });

    let returns = match &method.sig.output {
        ReturnType::Default => Some(quote! { .returns::<()>() }),
        ReturnType::Type(_, ty) if matches!(**ty, Type::ImplTrait(_)) => None,
        ReturnType::Type(_, ty) => Some(quote! { .returns::<#ty>() }),
    };
    let verbs = &declared.verbs;
    let body = declared.body.then(|| quote! { .body_source() });
    let annotations = &declared.annotations;

    Ok(Some(quote! {
        ::waymark::handler::HandlerFunction::new(
            #name,
            |invocation: ::waymark::handler::Invocation| async move {
                #[allow(unused_mut, unused_variables)]
                let (scope, mut args) = invocation.into_parts();
                #this
                #(let #bindings = args.take::<#types>()?;)*
                let output = #call;
                ::std::result::Result::Ok::<_, ::waymark::error::Error>(
                    ::waymark::response::IntoResponse::into_response(output),
                )
            },
        )
        #(.marker(::waymark::marker::Verb::#verbs))*
        #body
        #returns
        #(#annotations)*
        #(.param(#specs))*
    }))
}

#[cfg(test)]
mod tests {
    use syn::parse_quote;

    use super::*;

    fn expand_str(markers: TokenStream, item: ItemImpl) -> String {
        expand(parse_type_markers(markers).unwrap(), item)
            .unwrap()
            .to_string()
    }

    #[test]
    fn test_type_markers() {
        let markers = parse_type_markers(quote!(get, post)).unwrap();
        assert_eq!(markers, ["Get", "Post"]);
        assert!(parse_type_markers(quote!(fetch)).is_err());
    }

    #[test]
    fn test_method_markers_are_stripped() {
        let item: ItemImpl = parse_quote! {
            impl ListProducts {
                /// Lists products.
                #[get]
                async fn handle(&self, #[param(default = 20)] limit: u32) -> String {
                    String::new()
                }

                fn helper(&self) {}
            }
        };
        let output = expand_str(quote!(), item);

        assert!(!output.contains("# [get]"));
        assert!(!output.contains("# [param"));
        assert!(output.contains("Verb :: Get"));
        assert!(output.contains(". annotation (\"doc\" , \"Lists products.\")"));
        assert!(output.contains("ParamKind :: Integer"));
        assert!(!output.contains("\"helper\""));
        assert!(output.contains("inventory :: submit !"));
    }

    #[test]
    fn test_async_actions_are_recorded_without_markers() {
        let item: ItemImpl = parse_quote! {
            impl CreateOrder {
                async fn handle_async(&self) -> ActionResult {
                    ActionResult::no_content()
                }
            }
        };
        let output = expand_str(quote!(post), item);

        assert!(output.contains("\"handle_async\""));
        assert!(output.contains(". returns :: < ActionResult > ()"));
    }

    #[test]
    fn test_legacy_body_marker() {
        let item: ItemImpl = parse_quote! {
            impl Submit {
                #[post]
                #[body]
                async fn submit(&self, order: NewOrder, catalog: Arc<Catalog>) {}
            }
        };
        let output = expand_str(quote!(), item);

        assert!(output.contains(". body_source ()"));
        assert!(output.contains("ParamKind :: Structured"));
        assert!(output.contains("ParameterSpec :: service :: < Arc < Catalog > >"));
    }

    #[test]
    fn test_param_marker_without_verb_is_rejected() {
        let item: ItemImpl = parse_quote! {
            impl Helper {
                fn parse(&self, #[body] input: String) {}
            }
        };
        assert!(expand(Vec::new(), item).is_err());
    }

    #[test]
    fn test_method_meta_reaches_expansion() {
        let item: ItemImpl = parse_quote! {
            impl ListProducts {
                #[get]
                #[meta(tag = "catalog", owner = "inventory")]
                async fn handle(&self) -> String {
                    String::new()
                }
            }
        };
        let output = expand_str(quote!(), item);

        assert!(!output.contains("# [meta"));
        assert!(output.contains(". annotation (\"tag\" , \"catalog\")"));
        assert!(output.contains(". annotation (\"owner\" , \"inventory\")"));
    }

    #[test]
    fn test_meta_on_helper_parameter_is_rejected() {
        let item: ItemImpl = parse_quote! {
            impl Helper {
                fn parse(&self, #[meta(doc = "raw input")] input: String) {}
            }
        };
        assert!(expand(Vec::new(), item).is_err());
    }

    #[test]
    fn test_trait_impl_is_rejected() {
        let item: ItemImpl = parse_quote! {
            impl Default for Handler {
                fn default() -> Self { Handler }
            }
        };
        assert!(expand(Vec::new(), item).is_err());
    }
}
