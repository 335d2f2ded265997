//! ModelEnum derive macro implementation

use heck::ToLowerCamelCase;
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Data, DeriveInput, Fields, parse_macro_input};

use crate::attributes::{parse_container_attrs, parse_member_attrs};

/// Implementation of the ModelEnum derive macro
pub fn derive_model_enum_impl(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let enum_name = &input.ident;

    let Data::Enum(data_enum) = &input.data else {
        return Err(syn::Error::new_spanned(
            enum_name,
            "ModelEnum can only be derived for enums",
        ));
    };

    let container = parse_container_attrs(&input.attrs)?;
    if container.polymorphic || container.discriminator.is_some() || container.media_type.is_some()
    {
        return Err(syn::Error::new_spanned(
            enum_name,
            "ModelEnum only supports the `name` attribute",
        ));
    }
    let type_name = container
        .name
        .clone()
        .unwrap_or_else(|| enum_name.to_string());

    let mut entry_values = Vec::new();
    let mut to_arms = Vec::new();
    let mut from_arms = Vec::new();
    let mut unknown_variant = None;

    for variant in &data_enum.variants {
        let ident = &variant.ident;
        let attrs = parse_member_attrs(&variant.attrs)?;

        if attrs.unknown {
            let Fields::Unnamed(unnamed) = &variant.fields else {
                return Err(syn::Error::new_spanned(
                    ident,
                    "`unknown` variant must be a tuple variant holding a String",
                ));
            };
            if unnamed.unnamed.len() != 1 || unknown_variant.is_some() {
                return Err(syn::Error::new_spanned(
                    ident,
                    "ModelEnum supports one `unknown` variant with a single String",
                ));
            }
            unknown_variant = Some(ident);
            continue;
        }

        if !matches!(variant.fields, Fields::Unit) {
            return Err(syn::Error::new_spanned(
                ident,
                "ModelEnum variants must be unit variants",
            ));
        }

        let constant = ident.to_string();
        let wire = attrs
            .wire
            .unwrap_or_else(|| constant.to_lower_camel_case());

        entry_values.push(quote! { .value(#wire, #constant) });
        to_arms.push(quote! {
            Self::#ident => ::vcd_sdk::model::EnumValue::known(
                <Self as ::vcd_sdk::model::ModelEnum>::TYPE_NAME,
                #constant,
            )
        });
        from_arms.push(quote! { #constant => Ok(Self::#ident) });
    }

    if let Some(ident) = unknown_variant {
        to_arms.push(quote! {
            Self::#ident(raw) => ::vcd_sdk::model::EnumValue::unknown(
                <Self as ::vcd_sdk::model::ModelEnum>::TYPE_NAME,
                raw.clone(),
            )
        });
    }

    let unknown_arm = unknown_variant.map_or_else(
        || {
            quote! {
                ::vcd_sdk::model::EnumConstant::Unknown(raw) => Err(
                    ::vcd_sdk::model::unmapped_constant(
                        <Self as ::vcd_sdk::model::ModelEnum>::TYPE_NAME,
                        raw,
                    ),
                )
            }
        },
        |ident| {
            quote! {
                ::vcd_sdk::model::EnumConstant::Unknown(raw) => Ok(Self::#ident(raw.clone()))
            }
        },
    );

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::vcd_sdk::model::ModelEnum for #enum_name #ty_generics #where_clause {
            const TYPE_NAME: &'static str = #type_name;

            fn entry() -> ::vcd_sdk::schema::EnumEntry {
                ::vcd_sdk::schema::EnumEntry::new(
                    <Self as ::vcd_sdk::model::ModelEnum>::TYPE_NAME,
                )
                #(#entry_values)*
            }

            fn to_enum_value(&self) -> ::vcd_sdk::model::EnumValue {
                match self {
                    #(#to_arms,)*
                }
            }

            fn from_enum_value(
                value: &::vcd_sdk::model::EnumValue,
            ) -> ::vcd_sdk::error::Result<Self> {
                match &value.constant {
                    ::vcd_sdk::model::EnumConstant::Known(constant) => match constant.as_str() {
                        #(#from_arms,)*
                        other => Err(::vcd_sdk::model::unmapped_constant(
                            <Self as ::vcd_sdk::model::ModelEnum>::TYPE_NAME,
                            other,
                        )),
                    },
                    #unknown_arm,
                }
            }
        }

        impl #impl_generics ::vcd_sdk::model::ModelField for #enum_name #ty_generics #where_clause {
            fn descriptor() -> ::vcd_sdk::schema::TypeDescriptor {
                ::vcd_sdk::schema::TypeDescriptor::named(
                    <Self as ::vcd_sdk::model::ModelEnum>::TYPE_NAME,
                )
            }

            fn to_model_value(&self) -> ::vcd_sdk::model::ModelValue {
                ::vcd_sdk::model::ModelValue::Enum(
                    <Self as ::vcd_sdk::model::ModelEnum>::to_enum_value(self),
                )
            }

            fn from_model_value(
                value: ::vcd_sdk::model::ModelValue,
            ) -> ::vcd_sdk::error::Result<Self> {
                let value = ::vcd_sdk::model::expect_enum(
                    value,
                    <Self as ::vcd_sdk::model::ModelEnum>::TYPE_NAME,
                )?;
                <Self as ::vcd_sdk::model::ModelEnum>::from_enum_value(&value)
            }
        }
    })
}
