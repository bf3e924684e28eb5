//! Derive macro for fixed-layout binary records.
//!
//! Fields are encoded in declaration order with the field types' own
//! `Encode` / `Decode` impls, so a struct of `u8`s and byte arrays maps
//! one-to-one onto an on-disk header. Only structs are supported.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Data, DeriveInput, Fields, Index, parse_macro_input};

pub fn derive_binary_codec(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            input,
            "BinaryCodec derive only supports structs",
        ));
    };

    let (encode_fields, construct) = match &data.fields {
        Fields::Named(fields) => {
            let names: Vec<_> = fields.named.iter().map(|f| &f.ident).collect();
            let encode = quote! {
                #( crate::types::encoding::Encode::encode(&self.#names, out); )*
            };
            let construct = quote! {
                Self { #( #names: crate::types::encoding::Decode::decode(input)?, )* }
            };
            (encode, construct)
        }
        Fields::Unnamed(fields) => {
            let indices: Vec<_> = (0..fields.unnamed.len()).map(Index::from).collect();
            let decoders = indices
                .iter()
                .map(|_| quote! { crate::types::encoding::Decode::decode(input)? });
            let encode = quote! {
                #( crate::types::encoding::Encode::encode(&self.#indices, out); )*
            };
            (encode, quote! { Self( #(#decoders),* ) })
        }
        Fields::Unit => (TokenStream2::new(), quote! { Self }),
    };

    Ok(quote! {
        impl #impl_generics crate::types::encoding::Encode for #name #ty_generics #where_clause {
            fn encode<S: crate::types::encoding::EncodeSink>(&self, out: &mut S) {
                #encode_fields
            }
        }

        impl #impl_generics crate::types::encoding::Decode for #name #ty_generics #where_clause {
            fn decode(
                input: &mut &[u8],
            ) -> ::std::result::Result<Self, crate::types::encoding::DecodeError> {
                Ok(#construct)
            }
        }
    })
}
