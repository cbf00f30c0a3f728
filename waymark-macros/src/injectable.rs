use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Field, Fields, Meta};

pub fn expand(input: DeriveInput) -> syn::Result<TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "Injectable can only be derived for structs",
        ));
    };

    let body = match &data.fields {
        Fields::Named(fields) => {
            let inits = fields
                .named
                .iter()
                .map(|field| {
                    let ident = &field.ident;
                    let value = field_value(field)?;
                    Ok(quote! { #ident: #value })
                })
                .collect::<syn::Result<Vec<_>>>()?;
            quote! { Self { #(#inits,)* } }
        }
        Fields::Unnamed(fields) => {
            let values = fields
                .unnamed
                .iter()
                .map(field_value)
                .collect::<syn::Result<Vec<_>>>()?;
            quote! { Self(#(#values,)*) }
        }
        Fields::Unit => quote! { Self },
    };

    Ok(quote! {
        impl #impl_generics ::waymark::di::Injectable for #name #ty_generics #where_clause {
            fn create(
                scope: &::waymark::di::Scope,
            ) -> ::std::result::Result<Self, ::waymark::error::ContainerError> {
                let _ = scope;
                ::std::result::Result::Ok(#body)
            }
        }
    })
}

fn field_value(field: &Field) -> syn::Result<TokenStream> {
    let ty = &field.ty;
    if wants_default(field)? {
        Ok(quote! { ::std::default::Default::default() })
    } else {
        Ok(quote! { <#ty as ::waymark::di::Resolve>::resolve(scope)? })
    }
}

fn wants_default(field: &Field) -> syn::Result<bool> {
    for attr in &field.attrs {
        if !attr.path().is_ident("inject") {
            continue;
        }
        let Meta::List(list) = &attr.meta else {
            return Err(syn::Error::new_spanned(attr, "expected #[inject(default)]"));
        };
        let arg: syn::Ident = list.parse_args()?;
        if arg != "default" {
            return Err(syn::Error::new_spanned(arg, "expected #[inject(default)]"));
        }
        return Ok(true);
    }
    Ok(false)
}
