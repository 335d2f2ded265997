//! Procedural macros for `vcd_sdk`

mod attributes;
mod model;
mod model_enum;

use proc_macro::TokenStream;

/// Derives `Model` and `ModelField` for a record struct.
///
/// # Example
///
/// ```ignore
/// #[derive(Model)]
/// #[model(name = "AdminOrg", media_type = "application/vnd.vmware.admin.organization+json")]
/// pub struct AdminOrgType {
///     #[model(parent)]
///     pub org: OrgType,
///
///     #[model(wire = "isEnabled")]
///     pub enabled: Option<bool>,
/// }
/// ```
///
/// This will generate:
/// - `Model::schema()` with `Org` as parent and `enabled` on the wire key `isEnabled`
/// - `write_fields` / `read_fields` delegating to the parent first
/// - `ModelField` so the struct can be used as a field of other models
///
/// Struct attributes: `name`, `polymorphic`, `discriminator`, `media_type`.
/// Field attributes: `wire`, `named`, `polymorphic`, `nullable`, `parent`, `skip`.
/// Wire keys default to the field name in lowerCamelCase.
#[proc_macro_derive(Model, attributes(model))]
pub fn derive_model(input: TokenStream) -> TokenStream {
    model::derive_model_impl(input)
}

/// Derives `ModelEnum` and `ModelField` for a fieldless enum.
///
/// # Example
///
/// ```ignore
/// #[derive(ModelEnum)]
/// #[model(name = "TaskStatus")]
/// pub enum TaskStatus {
///     Queued,
///     #[model(wire = "preRunning")]
///     PreRunning,
///     #[model(unknown)]
///     Unknown(String),
/// }
/// ```
///
/// Wire values default to the variant name in lowerCamelCase. A single
/// `#[model(unknown)]` tuple variant holding a `String` receives wire values the
/// registry does not map; without one those values are rejected.
#[proc_macro_derive(ModelEnum, attributes(model))]
pub fn derive_model_enum(input: TokenStream) -> TokenStream {
    model_enum::derive_model_enum_impl(input)
}
