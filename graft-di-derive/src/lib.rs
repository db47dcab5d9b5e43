use crate::injectable::{expand_implements, expand_injectable};
use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput, Error, Item};

mod attributes;
mod injectable;

#[proc_macro_derive(Injectable, attributes(inject, injectable))]
pub fn generate_injectable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_injectable(&input)
        .unwrap_or_else(Error::into_compile_error)
        .into()
}

/// Declares the annotated trait implementation as a possible binding target for the trait, by
/// implementing `Implements<dyn Trait>`. The trait must be `Send + Sync`.
#[proc_macro_attribute]
pub fn implements(attr: TokenStream, item: TokenStream) -> TokenStream {
    if !attr.is_empty() {
        return Error::new(
            proc_macro2::Span::call_site(),
            "The implements attribute takes no arguments!",
        )
        .into_compile_error()
        .into();
    }

    let item = parse_macro_input!(item as Item);
    expand_implements(&item)
        .unwrap_or_else(Error::into_compile_error)
        .into()
}
