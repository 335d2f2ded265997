//! In-memory model values, records and typed model traits

pub mod builtin;
mod record;
mod typed;
mod value;

pub use builtin::{
    AdminOrgType, EntityType, ErrorType, LinkType, OrgType, OwnerType, ReferenceType,
    ResourceType, TaskStatus, TaskType, TasksInProgressType,
};
pub use record::{Record, RecordBuilder};
pub use typed::{
    Binary, Fields, Model, ModelEnum, ModelField, expect_enum, expect_record, read_field,
    unmapped_constant, write_field,
};
pub use value::{EnumConstant, EnumValue, ModelValue};
pub use vcd_sdk_macros::{Model, ModelEnum};
