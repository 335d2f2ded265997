//! Model derive macro implementation
//!
//! Generates the registered schema of a record struct together with its
//! conversions to and from `Record`, so the schema and the typed struct can never
//! drift apart.

use heck::ToLowerCamelCase;
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Data, DeriveInput, Fields, Ident, Type, parse_macro_input};

use crate::attributes::{MemberAttrs, parse_container_attrs, parse_member_attrs};

/// Implementation of the Model derive macro
pub fn derive_model_impl(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// One named struct field with its parsed options
struct ModelFieldDef<'a> {
    ident: &'a Ident,
    ty:    &'a Type,
    attrs: MemberAttrs,
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = &input.ident;

    let Data::Struct(data_struct) = &input.data else {
        return Err(syn::Error::new_spanned(
            struct_name,
            "Model can only be derived for structs",
        ));
    };
    let Fields::Named(named) = &data_struct.fields else {
        return Err(syn::Error::new_spanned(
            struct_name,
            "Model requires named fields",
        ));
    };

    let container = parse_container_attrs(&input.attrs)?;
    let type_name = container
        .name
        .clone()
        .unwrap_or_else(|| struct_name.to_string());

    let mut fields = Vec::new();
    for field in &named.named {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let attrs = parse_member_attrs(&field.attrs)?;
        if attrs.unknown {
            return Err(syn::Error::new_spanned(
                ident,
                "`unknown` is only valid on enum variants",
            ));
        }
        fields.push(ModelFieldDef {
            ident,
            ty: &field.ty,
            attrs,
        });
    }

    if fields.iter().filter(|field| field.attrs.parent).count() > 1 {
        return Err(syn::Error::new_spanned(
            struct_name,
            "Model supports at most one `#[model(parent)]` field",
        ));
    }

    let schema_body = schema_tokens(&container, &fields);
    let write_body = write_tokens(&fields);
    let read_body = read_tokens(&fields);

    let descriptor = if container.polymorphic {
        quote! { ::vcd_sdk::schema::TypeDescriptor::polymorphic(Self::TYPE_NAME) }
    } else {
        quote! { ::vcd_sdk::schema::TypeDescriptor::named(Self::TYPE_NAME) }
    };

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::vcd_sdk::model::Model for #struct_name #ty_generics #where_clause {
            const TYPE_NAME: &'static str = #type_name;

            fn schema() -> ::vcd_sdk::schema::SchemaEntry {
                #schema_body
            }

            fn write_fields(&self, fields: &mut ::vcd_sdk::model::Fields) {
                #write_body
            }

            fn read_fields(fields: &::vcd_sdk::model::Fields) -> ::vcd_sdk::error::Result<Self> {
                #read_body
            }
        }

        impl #impl_generics ::vcd_sdk::model::ModelField for #struct_name #ty_generics #where_clause {
            fn descriptor() -> ::vcd_sdk::schema::TypeDescriptor {
                #descriptor
            }

            fn to_model_value(&self) -> ::vcd_sdk::model::ModelValue {
                ::vcd_sdk::model::ModelValue::Record(
                    <Self as ::vcd_sdk::model::Model>::to_record(self),
                )
            }

            fn from_model_value(
                value: ::vcd_sdk::model::ModelValue,
            ) -> ::vcd_sdk::error::Result<Self> {
                let record = ::vcd_sdk::model::expect_record(
                    value,
                    <Self as ::vcd_sdk::model::Model>::TYPE_NAME,
                )?;
                <Self as ::vcd_sdk::model::Model>::from_record(&record)
            }
        }
    })
}

fn schema_tokens(
    container: &crate::attributes::ContainerAttrs,
    fields: &[ModelFieldDef<'_>],
) -> TokenStream2 {
    let mut builder = quote! {
        ::vcd_sdk::schema::SchemaEntry::builder(
            <Self as ::vcd_sdk::model::Model>::TYPE_NAME,
        )
    };

    for field in fields.iter().filter(|field| field.attrs.parent) {
        let ty = field.ty;
        builder = quote! {
            #builder.parent(<#ty as ::vcd_sdk::model::Model>::TYPE_NAME)
        };
    }

    if container.polymorphic {
        builder = quote! { #builder.polymorphic() };
    }
    if let Some(discriminator) = &container.discriminator {
        builder = quote! { #builder.discriminator(#discriminator) };
    }
    if let Some(media_type) = &container.media_type {
        builder = quote! { #builder.media_type(#media_type) };
    }

    for field in fields
        .iter()
        .filter(|field| !field.attrs.parent && !field.attrs.skip)
    {
        let ty = field.ty;
        let name = field.ident.to_string();
        let wire = field
            .attrs
            .wire
            .clone()
            .unwrap_or_else(|| name.to_lower_camel_case());

        let mut descriptor = quote! { <#ty as ::vcd_sdk::model::ModelField>::descriptor() };
        if let Some(named) = &field.attrs.named {
            descriptor = quote! {
                #descriptor.with_leaf(::vcd_sdk::schema::TypeDescriptor::named(#named))
            };
        }
        match &field.attrs.polymorphic {
            Some(Some(base)) => {
                descriptor = quote! {
                    #descriptor.with_leaf(::vcd_sdk::schema::TypeDescriptor::polymorphic(#base))
                };
            }
            Some(None) => {
                descriptor = quote! { #descriptor.into_polymorphic() };
            }
            None => {}
        }

        let nullable = if field.attrs.nullable {
            quote! { let spec = spec.nullable(); }
        } else {
            quote! {}
        };

        builder = quote! {
            #builder.field(#name, {
                let spec = ::vcd_sdk::schema::FieldSpec::new(#wire, #descriptor);
                let spec = if <#ty as ::vcd_sdk::model::ModelField>::absent().is_none() {
                    spec.required()
                } else {
                    spec
                };
                #nullable
                spec
            })
        };
    }

    quote! { #builder.build() }
}

fn write_tokens(fields: &[ModelFieldDef<'_>]) -> TokenStream2 {
    // Parent fields go first so inherited keys keep their position on the wire
    let parent = fields.iter().filter(|field| field.attrs.parent).map(|field| {
        let ident = field.ident;
        let ty = field.ty;
        quote! { <#ty as ::vcd_sdk::model::Model>::write_fields(&self.#ident, fields); }
    });

    let own = fields
        .iter()
        .filter(|field| !field.attrs.parent && !field.attrs.skip)
        .map(|field| {
            let ident = field.ident;
            let name = ident.to_string();
            quote! { ::vcd_sdk::model::write_field(fields, #name, &self.#ident); }
        });

    quote! {
        #(#parent)*
        #(#own)*
    }
}

fn read_tokens(fields: &[ModelFieldDef<'_>]) -> TokenStream2 {
    let inits = fields.iter().map(|field| {
        let ident = field.ident;
        let ty = field.ty;
        let name = ident.to_string();
        if field.attrs.parent {
            quote! { #ident: <#ty as ::vcd_sdk::model::Model>::read_fields(fields)? }
        } else if field.attrs.skip {
            quote! { #ident: ::core::default::Default::default() }
        } else {
            quote! {
                #ident: ::vcd_sdk::model::read_field(
                    fields,
                    <Self as ::vcd_sdk::model::Model>::TYPE_NAME,
                    #name,
                )?
            }
        }
    });

    quote! {
        Ok(Self {
            #(#inits,)*
        })
    }
}
