//! Derive macro for error enums.
//!
//! Generates `std::fmt::Display` and `std::error::Error` implementations.
//! Replacement for the `thiserror` crate, trimmed to enums - every error
//! type in the ledger is an enum.
//!
//! # Usage
//!
//! ```ignore
//! use ledger_derive::Error;
//!
//! #[derive(Debug, Error)]
//! pub enum StorageError {
//!     #[error("storage backend fault: {0}")]
//!     Backend(String),
//!
//!     #[error("expected {expected} bytes, got {actual}")]
//!     BadLength { expected: usize, actual: usize },
//!
//!     #[error("unknown error")]
//!     Unknown,
//! }
//! ```
//!
//! Tuple fields are referenced positionally (`{0}`, `{1}`); named fields by
//! name (`{expected}`). The message string is handed to `write!` untouched.

use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::{Data, DeriveInput, Fields, Meta, parse_macro_input};

/// Derives `Display` and `Error` for an enum.
///
/// Every variant must carry an `#[error("...")]` attribute with its display
/// message.
pub fn derive_error(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match expand_error_derive(&input) {
        Ok(tokens) => TokenStream::from(tokens),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand_error_derive(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let Data::Enum(data_enum) = &input.data else {
        return Err(syn::Error::new_spanned(
            input,
            "Error derive only supports enums",
        ));
    };

    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let display_arms = data_enum
        .variants
        .iter()
        .map(display_arm)
        .collect::<syn::Result<Vec<_>>>()?;

    Ok(quote! {
        impl #impl_generics ::std::fmt::Display for #name #ty_generics #where_clause {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                match self {
                    #(#display_arms)*
                }
            }
        }

        impl #impl_generics ::std::error::Error for #name #ty_generics #where_clause {}
    })
}

/// Builds the `match` arm mapping one variant to its `write!` call.
///
/// Tuple fields are bound as `arg0, arg1, ...` and passed to `write!` in
/// order, so positional placeholders resolve against the argument list and
/// the message never needs rewriting. Named fields are destructured into
/// scope, where the format machinery captures them by name.
fn display_arm(variant: &syn::Variant) -> syn::Result<proc_macro2::TokenStream> {
    let ident = &variant.ident;
    let message = message_for(variant)?;

    Ok(match &variant.fields {
        Fields::Unit => quote! {
            Self::#ident => write!(f, #message),
        },
        Fields::Unnamed(fields) => {
            let bindings: Vec<_> = (0..fields.unnamed.len())
                .map(|i| format_ident!("arg{}", i))
                .collect();
            quote! {
                Self::#ident(#(#bindings),*) => write!(f, #message, #(#bindings),*),
            }
        }
        Fields::Named(fields) => {
            let names: Vec<_> = fields.named.iter().map(|field| &field.ident).collect();
            quote! {
                Self::#ident { #(#names),* } => write!(f, #message),
            }
        }
    })
}

/// Pulls the display message out of a variant's `#[error("...")]` attribute.
fn message_for(variant: &syn::Variant) -> syn::Result<String> {
    let attr = variant
        .attrs
        .iter()
        .find(|attr| attr.path().is_ident("error"))
        .ok_or_else(|| {
            syn::Error::new_spanned(
                variant,
                format!(
                    "variant `{}` declares no display message; add #[error(\"...\")]",
                    variant.ident
                ),
            )
        })?;

    if let Meta::List(list) = &attr.meta
        && let Ok(lit) = syn::parse2::<syn::LitStr>(list.tokens.clone())
    {
        return Ok(lit.value());
    }

    Err(syn::Error::new_spanned(
        &attr.meta,
        "#[error] takes one string literal, e.g. #[error(\"corrupt record: {0}\")]",
    ))
}
