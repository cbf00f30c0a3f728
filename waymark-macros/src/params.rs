//! Parameter classification and parameter attributes.

use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{Attribute, Expr, GenericArgument, LitStr, PatType, PathArguments, Type};

/// Binding kind, mirrored from `waymark::params::ParamKind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Text,
    Boolean,
    TextList,
    Integer,
    Number,
    List,
    Structured,
    Context,
    Service,
}

impl Kind {
    fn variant(self) -> proc_macro2::Ident {
        format_ident!("{}", format!("{self:?}"))
    }

    fn is_value(self) -> bool {
        !matches!(self, Kind::Context | Kind::Service)
    }
}

const CONTEXT_TYPES: &[&str] = &["RequestContext", "HeaderMap", "Method", "Uri"];
const SERVICE_TYPES: &[&str] = &["Arc", "Inject"];
const INTEGER_TYPES: &[&str] = &[
    "i8", "i16", "i32", "i64", "i128", "isize", "u8", "u16", "u32", "u64", "u128", "usize",
];
const NUMBER_TYPES: &[&str] = &["f32", "f64", "Decimal"];
const LIST_TYPES: &[&str] = &["Vec", "VecDeque", "HashSet", "BTreeSet"];
const STRUCTURED_TYPES: &[&str] = &["Json", "Value"];

/// Decides the kind from the declared type. `body` is whether the
/// parameter is read from the body, either on its own or via the legacy
/// method marker; it turns otherwise unknown types into `Structured`.
pub fn classify(ty: &Type, body: bool) -> Kind {
    match ty {
        Type::Paren(paren) => classify(&paren.elem, body),
        Type::Group(group) => classify(&group.elem, body),
        Type::Slice(_) | Type::Array(_) => Kind::List,
        Type::Path(path) if path.qself.is_none() => {
            let Some(last) = path.path.segments.last() else {
                return Kind::Service;
            };
            let name = last.ident.to_string();
            let name = name.as_str();

            if name == "Option" {
                return match first_type_arg(&last.arguments) {
                    Some(inner) => classify(inner, body),
                    None => Kind::Structured,
                };
            }
            if CONTEXT_TYPES.contains(&name) {
                return Kind::Context;
            }
            if SERVICE_TYPES.contains(&name) {
                return Kind::Service;
            }
            match name {
                "String" => Kind::Text,
                "bool" => Kind::Boolean,
                _ if INTEGER_TYPES.contains(&name) => Kind::Integer,
                _ if NUMBER_TYPES.contains(&name) => Kind::Number,
                "Vec" if first_type_arg(&last.arguments).is_some_and(is_string) => Kind::TextList,
                _ if LIST_TYPES.contains(&name) => Kind::List,
                _ if STRUCTURED_TYPES.contains(&name) => Kind::Structured,
                _ if body => Kind::Structured,
                _ => Kind::Service,
            }
        }
        _ if body => Kind::Structured,
        _ => Kind::Service,
    }
}

fn first_type_arg(arguments: &PathArguments) -> Option<&Type> {
    let PathArguments::AngleBracketed(args) = arguments else {
        return None;
    };
    args.args.iter().find_map(|arg| match arg {
        GenericArgument::Type(ty) => Some(ty),
        _ => None,
    })
}

fn is_string(ty: &Type) -> bool {
    matches!(ty, Type::Path(path) if path.path.is_ident("String"))
}

/// Attributes accepted on a handler parameter.
#[derive(Default)]
pub struct ParamAttrs {
    pub body: bool,
    pub default: Option<Expr>,
    pub annotations: Vec<(String, LitStr)>,
}

impl ParamAttrs {
    /// Parses and removes `#[body]`, `#[param]` and `#[meta]`.
    pub fn take(attrs: &mut Vec<Attribute>) -> syn::Result<Self> {
        let mut parsed = ParamAttrs::default();
        let mut kept = Vec::with_capacity(attrs.len());

        for attr in attrs.drain(..) {
            if attr.path().is_ident("body") {
                parsed.body = true;
                parsed.parse_default(&attr)?;
            } else if attr.path().is_ident("param") {
                parsed.parse_default(&attr)?;
            } else if attr.path().is_ident("meta") {
                parsed.annotations.extend(parse_meta(&attr)?);
            } else {
                kept.push(attr);
            }
        }

        *attrs = kept;
        Ok(parsed)
    }

    fn parse_default(&mut self, attr: &Attribute) -> syn::Result<()> {
        if matches!(attr.meta, syn::Meta::Path(_)) {
            return Ok(());
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("default") {
                self.default = Some(meta.value()?.parse()?);
                Ok(())
            } else {
                Err(meta.error("expected `default = <expr>`"))
            }
        })
    }
}

/// Parses `#[meta(key = "value", ...)]`.
pub fn parse_meta(attr: &Attribute) -> syn::Result<Vec<(String, LitStr)>> {
    let mut pairs = Vec::new();
    attr.parse_nested_meta(|meta| {
        let key = meta
            .path
            .get_ident()
            .map(ToString::to_string)
            .ok_or_else(|| meta.error("expected an identifier key"))?;
        let value: LitStr = meta.value()?.parse()?;
        pairs.push((key, value));
        Ok(())
    })?;
    Ok(pairs)
}

/// One handler parameter, ready to be turned into a `ParameterSpec`.
pub struct Param {
    pub name: String,
    pub ty: Type,
    pub kind: Kind,
    pub attrs: ParamAttrs,
}

impl Param {
    /// Classifies a typed argument and strips its parameter attributes.
    pub fn from_arg(arg: &mut PatType, legacy_body: bool) -> syn::Result<Self> {
        let attrs = ParamAttrs::take(&mut arg.attrs)?;
        let syn::Pat::Ident(pat) = &*arg.pat else {
            return Err(syn::Error::new_spanned(
                &arg.pat,
                "handler parameters must be plain identifiers",
            ));
        };
        if let Type::Reference(_) = &*arg.ty {
            return Err(syn::Error::new_spanned(
                &arg.ty,
                "handler parameters must be owned types",
            ));
        }
        let name = pat.ident.to_string();
        let name = name.strip_prefix("r#").unwrap_or(&name).to_string();
        let ty = (*arg.ty).clone();
        let kind = classify(&ty, attrs.body || legacy_body);

        if attrs.body && !kind.is_value() {
            return Err(syn::Error::new_spanned(
                &arg.ty,
                "#[body] cannot be used on a context or service parameter",
            ));
        }

        Ok(Self { name, ty, kind, attrs })
    }

    /// The `ParameterSpec` builder expression.
    pub fn spec(&self) -> TokenStream {
        let name = &self.name;
        let ty = &self.ty;

        let mut spec = match self.kind {
            Kind::Context => quote! { ::waymark::params::ParameterSpec::context::<#ty>(#name) },
            Kind::Service => quote! { ::waymark::params::ParameterSpec::service::<#ty>(#name) },
            kind => {
                let variant = kind.variant();
                quote! {
                    ::waymark::params::ParameterSpec::value::<#ty>(
                        #name,
                        ::waymark::params::ParamKind::#variant,
                    )
                }
            }
        };

        if self.attrs.body {
            spec = quote! { #spec.body() };
        }
        if let Some(default) = &self.attrs.default {
            spec = quote! { #spec.with_default(#default) };
        }
        for (key, value) in &self.attrs.annotations {
            spec = quote! { #spec.annotation(#key, #value) };
        }
        spec
    }
}
