#![allow(clippy::unwrap_used)]

use chrono::{DateTime, FixedOffset};
use indexmap::IndexMap;
use serde_json::json;

use super::{Deserializer, Serializer, decode_datetime};
use crate::model::{
    AdminOrgType, Model, ModelEnum, ModelField, ModelValue, Record, TaskStatus, TaskType,
};
use crate::schema::{
    FieldSpec, PrimitiveKind, RegistryBuilder, SchemaEntry, SchemaRegistry, TargetType,
    TypeDescriptor,
};

/// Ordered firewall rules, the motivating case for list order preservation
#[derive(Debug, Clone, PartialEq, Model)]
#[model(name = "FirewallRule")]
struct FirewallRule {
    name:        String,
    #[model(wire = "ruleId")]
    id:          Option<i64>,
    enabled:     Option<bool>,
    created:     Option<DateTime<FixedOffset>>,
    ports:       Vec<i32>,
    labels:      IndexMap<String, String>,
    #[model(nullable)]
    description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Model)]
#[model(name = "FirewallRules")]
struct FirewallRules {
    rules: Vec<FirewallRule>,
}

fn registry() -> SchemaRegistry {
    RegistryBuilder::new()
        .with_builtin_models()
        .unwrap()
        .register_model::<FirewallRule>()
        .unwrap()
        .register_model::<FirewallRules>()
        .unwrap()
        .register_schema(
            SchemaEntry::builder("Event")
                .primitive_field("when", PrimitiveKind::DateTime)
                .field(
                    "subject",
                    FieldSpec::new("subject", TypeDescriptor::polymorphic("Org")),
                )
                .build(),
        )
        .unwrap()
        .build()
        .unwrap()
}

fn rule(name: &str) -> FirewallRule {
    FirewallRule {
        name:        name.to_string(),
        id:          Some(7),
        enabled:     Some(false),
        created:     Some(decode_datetime("2024-03-05T10:20:30.5+01:00").unwrap()),
        ports:       vec![443, 22],
        labels:      [("zone".to_string(), "dmz".to_string())].into_iter().collect(),
        description: None,
    }
}

fn decode(registry: &SchemaRegistry, json: &serde_json::Value, expression: &str) -> ModelValue {
    Deserializer::new(registry)
        .deserialize_as(json, expression)
        .unwrap()
        .unwrap()
}

#[test]
fn test_round_trip_keeps_present_fields_and_absence() {
    let registry = registry();
    let original = rule("allow-https");

    let json = Serializer::new(&registry)
        .serialize(&original.to_model_value())
        .unwrap();
    assert!(json.get("description").is_none());
    assert_eq!(json["ruleId"], json!(7));
    assert_eq!(json["enabled"], json!(false));

    let decoded = decode(&registry, &json, "FirewallRule");
    let record = decoded.as_record().unwrap();
    assert!(!record.is_set("description"));
    assert_eq!(FirewallRule::from_record(record).unwrap(), original);
}

#[test]
fn test_unset_optional_fields_are_never_emitted() {
    let registry = registry();
    let schema = registry.schema("FirewallRule").unwrap();
    let minimal = Record::builder("FirewallRule").field("name", "deny-all").build();

    let json = Serializer::new(&registry).serialize(&minimal.into()).unwrap();
    let object = json.as_object().unwrap();
    for spec in schema.fields.values().filter(|spec| !spec.required) {
        assert!(!object.contains_key(&spec.wire_key), "{}", spec.wire_key);
    }
    assert_eq!(json, json!({"name": "deny-all"}));
}

#[test]
fn test_explicit_null_survives_for_nullable_fields() {
    let registry = registry();
    let decoded = decode(
        &registry,
        &json!({"name": "r", "description": null, "enabled": null}),
        "FirewallRule",
    );
    let record = decoded.as_record().unwrap();
    assert_eq!(record.get("description"), Some(&ModelValue::Null));
    assert!(!record.is_set("enabled"));

    let json = Serializer::new(&registry).serialize(&decoded).unwrap();
    assert_eq!(json, json!({"name": "r", "description": null}));
}

#[test]
fn test_polymorphic_dispatch_to_concrete_type() {
    let registry = registry();
    let payload = json!({
        "_type": "AdminOrg",
        "name": "acme",
        "isEnabled": true,
        "href": "https://h/api/admin/org/1"
    });

    let decoded = decode(&registry, &payload, "Org");
    let record = decoded.as_record().unwrap();
    assert_eq!(record.type_name(), "AdminOrg");
    assert_eq!(record.get_bool("enabled"), Some(true));

    let admin = AdminOrgType::from_record(record).unwrap();
    assert_eq!(admin.org.entity.name.as_deref(), Some("acme"));
}

#[test]
fn test_polymorphic_field_inside_record() {
    let registry = registry();
    let payload = json!({
        "when": "2024-03-05T10:20:30Z",
        "subject": {"_type": "AdminOrg", "name": "acme", "isEnabled": false}
    });
    let decoded = decode(&registry, &payload, "Event");
    let subject = decoded.as_record().unwrap().get_record("subject").unwrap();
    assert_eq!(subject.type_name(), "AdminOrg");
}

#[test]
fn test_subtype_in_base_field_round_trips() {
    let registry = registry();
    let mut admin = AdminOrgType::default();
    admin.org.entity.name = Some("acme".to_string());
    admin.enabled = Some(true);
    let event = Record::builder("Event")
        .field("subject", admin.to_record())
        .build();

    let json = Serializer::new(&registry).serialize(&event.into()).unwrap();
    assert_eq!(
        json,
        json!({"subject": {"name": "acme", "isEnabled": true, "_type": "AdminOrg"}})
    );

    let decoded = decode(&registry, &json, "Event");
    let subject = decoded.as_record().unwrap().get_record("subject").unwrap();
    assert_eq!(subject.type_name(), "AdminOrg");
    assert_eq!(AdminOrgType::from_record(subject).unwrap(), admin);
}

#[test]
fn test_base_record_in_base_field_has_no_discriminator() {
    let registry = registry();
    let event = Record::builder("Event")
        .field("subject", Record::builder("Org").field("name", "acme").build())
        .build();

    let json = Serializer::new(&registry).serialize(&event.into()).unwrap();
    assert_eq!(json, json!({"subject": {"name": "acme"}}));
}

#[test]
fn test_polymorphic_without_discriminator_uses_requested_type() {
    let registry = registry();
    let decoded = decode(&registry, &json!({"name": "acme"}), "Org");
    assert_eq!(decoded.as_record().unwrap().type_name(), "Org");
}

#[test]
fn test_unknown_discriminator_is_fatal() {
    let registry = registry();
    let report = Deserializer::new(&registry)
        .deserialize_as(&json!({"_type": "Gateway", "name": "edge"}), "Org")
        .unwrap_err();
    assert!(report.current_context().is_fatal());

    let report = Deserializer::new(&registry)
        .deserialize_as(&json!({"_type": "Task", "name": "edge"}), "Org")
        .unwrap_err();
    assert!(report.current_context().is_fatal());
}

#[test]
fn test_list_order_preserved() {
    let registry = registry();
    let wire = json!(["a", "b", "c"]);
    let decoded = decode(&registry, &wire, "list[string]");
    assert_eq!(
        decoded,
        ModelValue::List(vec!["a".into(), "b".into(), "c".into()])
    );
    assert_eq!(Serializer::new(&registry).serialize(&decoded).unwrap(), wire);
}

#[test]
fn test_nested_collections_of_records() {
    let registry = registry();
    let rules = FirewallRules {
        rules: vec![rule("third"), rule("first"), rule("second")],
    };
    let json = Serializer::new(&registry)
        .serialize(&rules.to_model_value())
        .unwrap();
    let names: Vec<&str> = json["rules"]
        .as_array()
        .unwrap()
        .iter()
        .map(|rule| rule["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["third", "first", "second"]);

    let decoded = decode(&registry, &json, "FirewallRules");
    let typed = FirewallRules::from_record(decoded.as_record().unwrap()).unwrap();
    assert_eq!(typed, rules);

    let by_name = decode(
        &registry,
        &json!({"a": {"name": "a"}, "b": null}),
        "map(string, FirewallRule)",
    );
    let map = by_name.as_map().unwrap();
    assert_eq!(map["b"], ModelValue::Null);
    assert_eq!(map["a"].as_record().unwrap().get_str("name"), Some("a"));
}

#[test]
fn test_unknown_wire_keys_are_ignored() {
    let registry = registry();
    let decoded = decode(
        &registry,
        &json!({"name": "r", "colour": "red", "vCloudExtension": []}),
        "FirewallRule",
    );
    let record = decoded.as_record().unwrap();
    assert_eq!(record.fields().len(), 1);
    assert_eq!(record.get_str("name"), Some("r"));
}

#[test]
fn test_malformed_datetime_aborts_decoding() {
    let registry = registry();
    let result = Deserializer::new(&registry).deserialize_as(&json!({"when": "not-a-date"}), "Event");
    let report = result.unwrap_err();
    assert!(report.current_context().is_malformed());
    assert!(!report.current_context().is_fatal());
    assert!(format!("{report:?}").contains("Event.when"));
}

#[test]
fn test_malformed_known_field_versus_unknown_field() {
    let registry = registry();
    let deserializer = Deserializer::new(&registry);

    assert!(
        deserializer
            .deserialize_as(&json!({"name": "r", "ports": "all"}), "FirewallRule")
            .is_err()
    );
    assert!(
        deserializer
            .deserialize_as(&json!({"name": "r", "portz": "all"}), "FirewallRule")
            .is_ok()
    );
}

#[test]
fn test_null_payload_is_absent_for_any_target() {
    let registry = registry();
    let deserializer = Deserializer::new(&registry);
    for expression in ["Task", "list[Task]", "int", "map(string, Link)"] {
        assert_eq!(
            deserializer
                .deserialize_as(&serde_json::Value::Null, expression)
                .unwrap(),
            None
        );
    }
}

#[test]
fn test_unregistered_target_is_fatal() {
    let registry = registry();
    let report = Deserializer::new(&registry)
        .deserialize_as(&json!({}), "list[Gateway]")
        .unwrap_err();
    assert!(report.current_context().is_fatal());

    let report = Deserializer::new(&registry)
        .deserialize(&json!({}), &TargetType::File)
        .unwrap_err();
    assert!(report.current_context().is_fatal());
}

#[test]
fn test_task_decodes_with_enum_and_unknown_status() {
    let registry = registry();
    let payload = json!({
        "href": "https://h/api/task/9",
        "name": "task",
        "status": "running",
        "operationName": "vdcCreateVapp",
        "progress": 40,
        "owner": {"href": "https://h/api/vApp/1", "name": "web"}
    });
    let decoded = decode(&registry, &payload, "Task");
    let task = TaskType::from_record(decoded.as_record().unwrap()).unwrap();
    assert_eq!(task.status, Some(TaskStatus::Running));
    assert_eq!(task.progress, Some(40));
    assert_eq!(task.href(), Some("https://h/api/task/9"));

    let newer = decode(&registry, &json!({"status": "hibernating"}), "Task");
    let task = TaskType::from_record(newer.as_record().unwrap()).unwrap();
    assert_eq!(task.status, Some(TaskStatus::Unknown("hibernating".to_string())));
    assert_eq!(
        Serializer::new(&registry)
            .serialize(&task.to_model_value())
            .unwrap(),
        json!({"status": "hibernating"})
    );
    assert_eq!(TaskStatus::TYPE_NAME, "TaskStatus");
}
