//! Derive macro for error types.
//!
//! Every enum variant (or the struct itself) declares its message with
//! `#[error("...")]`. Named fields are bound by name and picked up by the
//! format string's inline captures; positional fields are referred to as
//! `{0}`, `{1}`, ...
//!
//! ```ignore
//! use imp_derive::Error;
//!
//! #[derive(Debug, Error)]
//! pub enum LoadError {
//!     #[error("file not found: {0}")]
//!     NotFound(String),
//!     #[error("expected {expected} bytes, got {actual}")]
//!     Short { expected: usize, actual: usize },
//!     #[error("empty file")]
//!     Empty,
//! }
//! ```

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{ToTokens, format_ident, quote};
use syn::{Attribute, Data, DeriveInput, Fields, LitStr, parse_macro_input};

pub fn derive_error(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let body = match &input.data {
        Data::Enum(data) => {
            let arms = data
                .variants
                .iter()
                .map(|variant| {
                    let message = message(&variant.attrs, variant)?;
                    let ident = &variant.ident;
                    let pattern = bind_fields(&variant.fields);
                    Ok(quote! { Self::#ident #pattern => write!(f, #message), })
                })
                .collect::<syn::Result<Vec<_>>>()?;
            quote! {
                match self {
                    #(#arms)*
                }
            }
        }
        Data::Struct(data) => {
            let message = message(&input.attrs, &input.ident)?;
            let pattern = bind_fields(&data.fields);
            quote! {
                let Self #pattern = self;
                write!(f, #message)
            }
        }
        Data::Union(_) => {
            return Err(syn::Error::new_spanned(
                input,
                "Error derive does not support unions",
            ));
        }
    };

    Ok(quote! {
        impl #impl_generics ::std::fmt::Display for #name #ty_generics #where_clause {
            #[allow(unused_variables)]
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                #body
            }
        }

        impl #impl_generics ::std::error::Error for #name #ty_generics #where_clause {}
    })
}

/// Destructuring pattern binding every field: `{ a, b }`, `(_0, _1)` or nothing.
fn bind_fields(fields: &Fields) -> TokenStream2 {
    match fields {
        Fields::Unit => TokenStream2::new(),
        Fields::Named(named) => {
            let idents = named.named.iter().map(|field| &field.ident);
            quote! { { #(#idents),* } }
        }
        Fields::Unnamed(unnamed) => {
            let idents = (0..unnamed.unnamed.len()).map(|i| format_ident!("_{}", i));
            quote! { ( #(#idents),* ) }
        }
    }
}

/// Reads the `#[error("...")]` message and rewrites `{N}` / `{N:...}` to `{_N}`.
fn message<T: ToTokens>(attrs: &[Attribute], target: &T) -> syn::Result<LitStr> {
    let attr = attrs
        .iter()
        .find(|attr| attr.path().is_ident("error"))
        .ok_or_else(|| {
            syn::Error::new_spanned(target, "missing #[error(\"...\")] attribute")
        })?;
    let lit: LitStr = attr.parse_args()?;
    Ok(LitStr::new(&rename_positional(&lit.value()), lit.span()))
}

fn rename_positional(format: &str) -> String {
    let mut out = String::with_capacity(format.len());
    let mut chars = format.chars().peekable();
    while let Some(c) = chars.next() {
        out.push(c);
        if c != '{' {
            continue;
        }
        if chars.peek() == Some(&'{') {
            // escaped brace
            out.push('{');
            chars.next();
            continue;
        }
        if chars.peek().is_some_and(|d| d.is_ascii_digit()) {
            out.push('_');
        }
    }
    out
}
