//! Schema registry: type names, descriptors, schema entries and the registry itself

mod descriptor;
mod entry;
mod registry;
mod target_type;
mod type_name;

pub use descriptor::{PrimitiveKind, TypeDescriptor};
pub use entry::{EnumEntry, FieldSpec, SchemaEntry, SchemaEntryBuilder};
pub use registry::{RegistryBuilder, RegistryEntry, SchemaRegistry};
pub use target_type::TargetType;
pub use type_name::TypeName;
