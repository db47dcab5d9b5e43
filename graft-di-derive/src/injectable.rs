use crate::attributes::{DefaultDefinition, FieldAttributes, InjectableAttributes};
use itertools::Itertools;
use proc_macro2::{Span, TokenStream};
use quote::{quote, ToTokens};
use std::ops::Deref;
use syn::spanned::Spanned;
use syn::{Data, DataStruct, DeriveInput, Error, Field, Fields, Index, Item, Result, Type};

enum FieldKind {
    Dependency,
    Default(TokenStream),
    Member,
    Supertype(TokenStream),
}

struct InjectedField<'a> {
    field: &'a Field,
    access: TokenStream,
    name: String,
    attributes: FieldAttributes,
    kind: FieldKind,
}

impl<'a> InjectedField<'a> {
    fn new(index: usize, field: &'a Field) -> Result<Self> {
        let attributes = FieldAttributes::from_attributes(&field.attrs)?;
        let (access, name) = match &field.ident {
            Some(ident) => (ident.to_token_stream(), ident.to_string()),
            None => (Index::from(index).to_token_stream(), index.to_string()),
        };

        let default = attributes.default.as_ref().map(|default| match default {
            DefaultDefinition::Expr(path) => quote!(#path()),
            DefaultDefinition::Default => quote!(std::default::Default::default()),
        });

        let kind = if attributes.member {
            FieldKind::Member
        } else if attributes.supertype {
            FieldKind::Supertype(
                default.unwrap_or_else(|| quote!(std::default::Default::default())),
            )
        } else if let Some(default) = default {
            FieldKind::Default(default)
        } else {
            FieldKind::Dependency
        };

        Ok(Self {
            field,
            access,
            name,
            attributes,
            kind,
        })
    }

    fn target(&self, dependency: &TokenStream) -> TokenStream {
        let named = self
            .attributes
            .named
            .as_ref()
            .map(|name| quote!(.named(#name)));
        let nullable = self.attributes.nullable.then(|| quote!(.nullable()));

        quote! {
            graft_di::injection_target::InjectionTarget::of::<#dependency>()#named #nullable
        }
    }

    fn initialization(&self) -> TokenStream {
        let ty = &self.field.ty;
        match &self.kind {
            FieldKind::Dependency => quote!(arguments.next::<#ty>()?),
            FieldKind::Default(default) | FieldKind::Supertype(default) => default.clone(),
            FieldKind::Member => quote!(std::default::Default::default()),
        }
    }
}

fn make_construction(fields: &Fields, injected: &[InjectedField]) -> TokenStream {
    match fields {
        Fields::Named(_) => {
            let initializers = injected.iter().map(|field| {
                let access = &field.access;
                let initialization = field.initialization();
                quote!(#access: #initialization)
            });

            quote!(Ok(Self { #(#initializers),* }))
        }
        Fields::Unnamed(_) => {
            let initializers = injected.iter().map(InjectedField::initialization);
            quote!(Ok(Self(#(#initializers),*)))
        }
        Fields::Unit => quote!(Ok(Self)),
    }
}

fn make_custom_construction(constructor: &syn::ExprPath, injected: &[InjectedField]) -> TokenStream {
    let arguments = injected
        .iter()
        .filter(|field| matches!(field.kind, FieldKind::Dependency))
        .map(InjectedField::initialization);

    quote!(#constructor(#(#arguments),*))
}

pub fn expand_injectable(input: &DeriveInput) -> Result<TokenStream> {
    let Data::Struct(DataStruct { fields, .. }) = &input.data else {
        return Err(Error::new(
            input.span(),
            "Can only derive Injectable on structs!",
        ));
    };

    if !input.generics.params.is_empty() {
        return Err(Error::new(
            input.generics.span(),
            "Deriving Injectable for generic structs is not supported!",
        ));
    }

    let ident = &input.ident;
    let attributes = InjectableAttributes::from_attributes(&input.attrs)?;
    let injected: Vec<_> = fields
        .iter()
        .enumerate()
        .map(|(index, field)| InjectedField::new(index, field))
        .try_collect()?;

    let supertypes = injected
        .iter()
        .filter(|field| matches!(field.kind, FieldKind::Supertype(_)))
        .collect_vec();
    if supertypes.len() > 1 {
        return Err(Error::new(
            supertypes[1].field.span(),
            "Only a single supertype field is supported!",
        ));
    }

    let construction = match &attributes.constructor {
        Some(constructor) => make_custom_construction(constructor, &injected),
        None => make_construction(fields, &injected),
    };

    let constructor_targets = injected
        .iter()
        .filter(|field| matches!(field.kind, FieldKind::Dependency))
        .map(|field| field.target(&field.field.ty.to_token_stream()));

    let members = injected
        .iter()
        .filter(|field| matches!(field.kind, FieldKind::Member))
        .map(|field| {
            let ty = &field.field.ty;
            let access = &field.access;
            let name = &field.name;
            let value = quote!(<#ty as graft_di::injection_point::Member>::Value);
            let target = field.target(&value);

            quote! {
                .field::<#value, _>(#name, #target, |object: &#ident, value| {
                    graft_di::injection_point::Member::inject(&object.#access, value)
                })
            }
        });

    let (projection, supertype) = match supertypes.first() {
        Some(field) => {
            let ty = &field.field.ty;
            let access = &field.access;
            (
                quote! {
                    fn project_supertype(object: &#ident) -> &#ty {
                        &object.#access
                    }
                },
                quote!(.supertype::<#ty>(project_supertype)),
            )
        }
        None => (TokenStream::new(), TokenStream::new()),
    };

    let scope = attributes.scope.as_ref().map(|scope| quote!(.scope(#scope)));

    Ok(quote! {
        #[automatically_derived]
        impl graft_di::injectable::Injectable for #ident {
            fn descriptor() -> graft_di::injectable::TypeDescriptor {
                #projection

                graft_di::injectable::TypeDescriptor::builder::<#ident>()
                    .inject_constructor(
                        vec![#(#constructor_targets),*],
                        |#[allow(unused_variables)] arguments| #construction,
                    )
                    #(#members)*
                    #supertype
                    #scope
                    .build()
            }
        }

        const _: () = {
            fn register() -> graft_di::injectable::TypeDescriptor {
                <#ident as graft_di::injectable::Injectable>::descriptor()
            }

            graft_di::injectable::internal::submit! {
                graft_di::injectable::internal::DescriptorRegisterer {
                    register
                }
            };
        };
    })
}

pub fn expand_implements(item: &Item) -> Result<TokenStream> {
    let Item::Impl(item_impl) = item else {
        return Err(Error::new(
            item.span(),
            "Declaring implemented traits is possible only on trait implementations!",
        ));
    };

    let trait_type = item_impl
        .trait_
        .as_ref()
        .map(|(_, path, ..)| path)
        .ok_or_else(|| Error::new(item.span(), "Missing trait identifier!"))?;

    let target_type = match item_impl.self_ty.deref() {
        Type::Path(path) if item_impl.generics.params.is_empty() => &path.path,
        _ => {
            return Err(Error::new(
                Span::call_site(),
                "Declaring implemented traits is only available for non-generic named types!",
            ))
        }
    };

    Ok(quote! {
        #item

        #[automatically_derived]
        impl graft_di::instance::Implements<dyn #trait_type> for #target_type {
            #[inline]
            fn upcast(
                self: graft_di::instance::InstancePtr<Self>,
            ) -> graft_di::instance::InstancePtr<dyn #trait_type> {
                self
            }
        }
    })
}
