//! Shared `#[model(...)]` attribute parsing

use syn::{Attribute, LitStr};

const MODEL_ATTR: &str = "model";

/// Struct or enum level options
#[derive(Default)]
pub struct ContainerAttrs {
    pub name:          Option<String>,
    pub polymorphic:   bool,
    pub discriminator: Option<String>,
    pub media_type:    Option<String>,
}

/// Field or variant level options
#[derive(Default)]
pub struct MemberAttrs {
    pub wire:        Option<String>,
    pub named:       Option<String>,
    pub polymorphic: Option<Option<String>>,
    pub nullable:    bool,
    pub parent:      bool,
    pub skip:        bool,
    pub unknown:     bool,
}

/// Parse every `#[model(...)]` on a struct or enum
pub fn parse_container_attrs(attrs: &[Attribute]) -> syn::Result<ContainerAttrs> {
    let mut parsed = ContainerAttrs::default();

    for attr in attrs.iter().filter(|attr| attr.path().is_ident(MODEL_ATTR)) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                parsed.name = Some(meta.value()?.parse::<LitStr>()?.value());
                Ok(())
            } else if meta.path.is_ident("polymorphic") {
                parsed.polymorphic = true;
                Ok(())
            } else if meta.path.is_ident("discriminator") {
                parsed.discriminator = Some(meta.value()?.parse::<LitStr>()?.value());
                Ok(())
            } else if meta.path.is_ident("media_type") {
                parsed.media_type = Some(meta.value()?.parse::<LitStr>()?.value());
                Ok(())
            } else {
                Err(meta.error("unsupported model attribute"))
            }
        })?;
    }

    Ok(parsed)
}

/// Parse every `#[model(...)]` on a field or variant
pub fn parse_member_attrs(attrs: &[Attribute]) -> syn::Result<MemberAttrs> {
    let mut parsed = MemberAttrs::default();

    for attr in attrs.iter().filter(|attr| attr.path().is_ident(MODEL_ATTR)) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("wire") {
                parsed.wire = Some(meta.value()?.parse::<LitStr>()?.value());
                Ok(())
            } else if meta.path.is_ident("named") {
                parsed.named = Some(meta.value()?.parse::<LitStr>()?.value());
                Ok(())
            } else if meta.path.is_ident("polymorphic") {
                // `polymorphic` alone keeps the field type's own name
                let base = if meta.input.peek(syn::Token![=]) {
                    Some(meta.value()?.parse::<LitStr>()?.value())
                } else {
                    None
                };
                parsed.polymorphic = Some(base);
                Ok(())
            } else if meta.path.is_ident("nullable") {
                parsed.nullable = true;
                Ok(())
            } else if meta.path.is_ident("parent") {
                parsed.parent = true;
                Ok(())
            } else if meta.path.is_ident("skip") {
                parsed.skip = true;
                Ok(())
            } else if meta.path.is_ident("unknown") {
                parsed.unknown = true;
                Ok(())
            } else {
                Err(meta.error("unsupported model attribute"))
            }
        })?;
    }

    Ok(parsed)
}
