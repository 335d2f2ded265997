//! Models the core itself consumes
//!
//! The dispatcher reads links and tasks out of decoded responses and decodes vCD
//! error bodies, so these shapes are always registered. `Org` / `AdminOrg` are the
//! smallest polymorphic pair on the legacy API and double as the reference for how
//! application models inherit.

use chrono::{DateTime, FixedOffset};

use super::{Model, ModelEnum};
use crate::error::Result;
use crate::schema::RegistryBuilder;

/// Navigation link advertising a related resource or action
#[derive(Debug, Clone, PartialEq, Eq, Default, Model)]
#[model(name = "Link")]
pub struct LinkType {
    pub href:       String,
    pub rel:        Option<String>,
    #[model(wire = "type")]
    pub media_type: Option<String>,
    pub name:       Option<String>,
    pub id:         Option<String>,
    pub model:      Option<String>,
}

/// Reference to another entity
#[derive(Debug, Clone, PartialEq, Eq, Default, Model)]
#[model(name = "Reference")]
pub struct ReferenceType {
    pub href:       String,
    pub id:         Option<String>,
    #[model(wire = "type")]
    pub media_type: Option<String>,
    pub name:       Option<String>,
}

/// Base of every addressable resource
#[derive(Debug, Clone, PartialEq, Eq, Default, Model)]
#[model(name = "Resource")]
pub struct ResourceType {
    pub href:       Option<String>,
    #[model(wire = "type")]
    pub media_type: Option<String>,
    pub link:       Vec<LinkType>,
}

/// A named resource that can carry in-progress tasks
#[derive(Debug, Clone, PartialEq, Default, Model)]
#[model(name = "Entity")]
pub struct EntityType {
    #[model(parent)]
    pub resource:      ResourceType,
    pub name:          Option<String>,
    pub description:   Option<String>,
    pub id:            Option<String>,
    pub operation_key: Option<String>,
    pub tasks:         Option<TasksInProgressType>,
}

/// Organization; responses name the concrete subtype through `_type`
#[derive(Debug, Clone, PartialEq, Default, Model)]
#[model(name = "Org", polymorphic)]
pub struct OrgType {
    #[model(parent)]
    pub entity:    EntityType,
    pub full_name: Option<String>,
}

/// Organization as seen through the admin API
#[derive(Debug, Clone, PartialEq, Default, Model)]
#[model(
    name = "AdminOrg",
    media_type = "application/vnd.vmware.admin.organization+json"
)]
pub struct AdminOrgType {
    #[model(parent)]
    pub org:     OrgType,
    #[model(wire = "isEnabled")]
    pub enabled: Option<bool>,
}

/// Lifecycle states of a server-side task
#[derive(Debug, Clone, PartialEq, Eq, Hash, ModelEnum)]
#[model(name = "TaskStatus")]
pub enum TaskStatus {
    Queued,
    PreRunning,
    Running,
    Success,
    Error,
    Canceled,
    Aborted,
    /// Status added by a newer server
    #[model(unknown)]
    Unknown(String),
}

impl TaskStatus {
    /// Whether the task has stopped and will not change again
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Success | Self::Error | Self::Canceled | Self::Aborted
        )
    }
}

/// Server-side asynchronous operation
#[derive(Debug, Clone, PartialEq, Default, Model)]
#[model(name = "Task", media_type = "application/vnd.vmware.vcloud.task+json")]
pub struct TaskType {
    #[model(parent)]
    pub entity:           EntityType,
    pub status:           Option<TaskStatus>,
    pub operation:        Option<String>,
    pub operation_name:   Option<String>,
    pub start_time:       Option<DateTime<FixedOffset>>,
    pub end_time:         Option<DateTime<FixedOffset>>,
    pub expiry_time:      Option<DateTime<FixedOffset>>,
    pub progress:         Option<i32>,
    pub cancel_requested: Option<bool>,
    pub details:          Option<String>,
    pub owner:            Option<ReferenceType>,
    pub user:             Option<ReferenceType>,
    pub organization:     Option<ReferenceType>,
    pub error:            Option<ErrorType>,
}

impl TaskType {
    /// The task's own href
    pub fn href(&self) -> Option<&str> {
        self.entity.resource.href.as_deref()
    }
}

/// Tasks running against an entity
#[derive(Debug, Clone, PartialEq, Default, Model)]
#[model(name = "TasksInProgress")]
pub struct TasksInProgressType {
    pub task: Vec<TaskType>,
}

/// Owner of an entity
#[derive(Debug, Clone, PartialEq, Eq, Default, Model)]
#[model(name = "Owner")]
pub struct OwnerType {
    #[model(parent)]
    pub resource: ResourceType,
    pub user:     Option<ReferenceType>,
}

/// Error body returned with non-success statuses
#[derive(Debug, Clone, PartialEq, Eq, Default, Model)]
#[model(name = "Error")]
pub struct ErrorType {
    pub message:                    Option<String>,
    pub major_error_code:           Option<i32>,
    pub minor_error_code:           Option<String>,
    pub stack_trace:                Option<String>,
    pub vendor_specific_error_code: Option<String>,
}

/// Register every built-in model
pub(crate) fn register_builtin_models(builder: RegistryBuilder) -> Result<RegistryBuilder> {
    builder
        .register_enum::<TaskStatus>()?
        .register_model::<LinkType>()?
        .register_model::<ReferenceType>()?
        .register_model::<ResourceType>()?
        .register_model::<EntityType>()?
        .register_model::<OrgType>()?
        .register_model::<AdminOrgType>()?
        .register_model::<TaskType>()?
        .register_model::<TasksInProgressType>()?
        .register_model::<OwnerType>()?
        .register_model::<ErrorType>()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{EnumValue, ModelField, ModelValue};
    use crate::schema::{SchemaRegistry, TypeDescriptor, TypeName};

    #[test]
    fn test_admin_org_schema_inherits_org() {
        let schema = AdminOrgType::schema();
        assert_eq!(schema.parents, vec![TypeName::from("Org")]);
        assert_eq!(schema.fields["enabled"].wire_key, "isEnabled");
        assert!(!schema.fields["enabled"].required);
        assert_eq!(
            schema.media_type.as_deref(),
            Some("application/vnd.vmware.admin.organization+json")
        );
    }

    #[test]
    fn test_org_fields_are_polymorphic() {
        assert!(OrgType::schema().polymorphic);
        assert_eq!(OrgType::descriptor(), TypeDescriptor::polymorphic("Org"));
    }

    #[test]
    fn test_default_wire_keys_are_camel_case() {
        let schema = TaskType::schema();
        assert_eq!(schema.fields["operation_name"].wire_key, "operationName");
        assert_eq!(schema.fields["cancel_requested"].wire_key, "cancelRequested");
        assert!(LinkType::schema().fields["href"].required);
    }

    #[test]
    fn test_typed_round_trip_through_record() {
        let org = AdminOrgType {
            org:     OrgType {
                entity:    EntityType {
                    name: Some("acme".to_string()),
                    ..EntityType::default()
                },
                full_name: None,
            },
            enabled: Some(true),
        };

        let record = org.to_record();
        assert_eq!(record.type_name(), "AdminOrg");
        assert_eq!(record.get_str("name"), Some("acme"));
        assert_eq!(record.get_bool("enabled"), Some(true));
        assert!(!record.is_set("full_name"));
        assert!(!record.is_set("link"));

        assert_eq!(AdminOrgType::from_record(&record).unwrap(), org);
    }

    #[test]
    fn test_task_status_unknown_is_kept() {
        let value = EnumValue::unknown("TaskStatus", "hibernating");
        let status = TaskStatus::from_enum_value(&value).unwrap();
        assert_eq!(status, TaskStatus::Unknown("hibernating".to_string()));
        assert!(!status.is_terminal());
        assert_eq!(status.to_enum_value(), value);

        let wire = TaskStatus::entry();
        assert_eq!(wire.constant_for("preRunning"), Some("PreRunning"));
    }

    #[test]
    fn test_enum_field_rejects_records() {
        let report =
            TaskStatus::from_model_value(ModelValue::from("success")).unwrap_err();
        assert!(report.current_context().is_malformed());
    }

    #[test]
    fn test_builtin_models_validate() {
        let registry = SchemaRegistry::with_builtin_models().unwrap();
        let fields = registry.resolved_fields("AdminOrg").unwrap();
        let wire: Vec<&str> = fields.values().map(|spec| spec.wire_key.as_str()).collect();
        assert_eq!(wire[..3], ["href", "type", "link"]);
        assert_eq!(wire.last(), Some(&"isEnabled"));
    }
}
