//! Derive macro for automatic binary serialization.
//!
//! Generates `Encode` and `Decode` implementations for structs. Fields are
//! serialized in declaration order using the crate's codec primitives
//! (little-endian fixed-width integers, length-prefixed containers), so the
//! output is deterministic and suitable for cryptographic hashing.
//!
//! Named structs (`struct Record { nonce: u64 }`) and tuple structs
//! (`struct Hash([u8; 32])`) share one impl emitter; only the field
//! accessors and the constructor shape differ between them. Enums, unions,
//! and unit structs are rejected - the ledger never persists them.

use proc_macro::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, parse_macro_input};

/// Derives `Encode` and `Decode` for a struct.
///
/// # Example
///
/// ```ignore
/// use ledger_derive::BinaryCodec;
///
/// #[derive(BinaryCodec)]
/// pub struct Record {
///     pub nonce: u64,
///     pub balance: u64,
/// }
/// ```
pub fn derive_binary_codec(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let expanded = match &input.data {
        Data::Struct(data_struct) => codec_impls(&input, &data_struct.fields),
        Data::Enum(_) | Data::Union(_) => {
            syn::Error::new_spanned(&input, "BinaryCodec derive only supports structs")
                .to_compile_error()
        }
    };

    TokenStream::from(expanded)
}

/// Emits the paired `Encode`/`Decode` impls for one struct.
///
/// Both impls are driven by the same field walk: encoding visits one
/// accessor expression per field in declaration order, and decoding reads
/// the identical sequence back through whichever constructor shape the
/// struct flavor requires.
fn codec_impls(input: &DeriveInput, fields: &Fields) -> proc_macro2::TokenStream {
    let read_field = quote! { crate::types::encoding::Decode::decode(input)? };

    let (accessors, constructor): (Vec<proc_macro2::TokenStream>, proc_macro2::TokenStream) =
        match fields {
            Fields::Named(fields) => {
                let names: Vec<_> = fields.named.iter().map(|field| &field.ident).collect();
                let inits = names.iter().map(|name| quote! { #name: #read_field });
                (
                    names.iter().map(|name| quote! { self.#name }).collect(),
                    quote! { Ok(Self { #(#inits),* }) },
                )
            }
            Fields::Unnamed(fields) => {
                let indices: Vec<syn::Index> =
                    (0..fields.unnamed.len()).map(syn::Index::from).collect();
                let reads = indices.iter().map(|_| read_field.clone());
                (
                    indices.iter().map(|index| quote! { self.#index }).collect(),
                    quote! { Ok(Self(#(#reads),*)) },
                )
            }
            Fields::Unit => {
                return syn::Error::new_spanned(
                    input,
                    "BinaryCodec derive does not support unit structs; there is nothing to encode",
                )
                .to_compile_error();
            }
        };

    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let encode_calls = accessors
        .iter()
        .map(|field| quote! { crate::types::encoding::Encode::encode(&#field, out); });

    quote! {
        impl #impl_generics crate::types::encoding::Encode for #name #ty_generics #where_clause {
            fn encode<S: crate::types::encoding::EncodeSink>(&self, out: &mut S) {
                #(#encode_calls)*
            }
        }

        impl #impl_generics crate::types::encoding::Decode for #name #ty_generics #where_clause {
            fn decode(input: &mut &[u8]) -> ::std::result::Result<Self, crate::types::encoding::DecodeError> {
                #constructor
            }
        }
    }
}
