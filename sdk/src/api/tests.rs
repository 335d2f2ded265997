#![allow(clippy::unwrap_used)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use error_stack::Report;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use serde_json::{Value, json};

use super::*;
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::model::{AdminOrgType, Record, TaskStatus};
use crate::schema::SchemaRegistry;

const HOST: &str = "https://vcd.example.com";

/// Replays canned responses and records every request it was given
#[derive(Default)]
struct ScriptedTransport {
    responses: RefCell<VecDeque<HttpResponse>>,
    requests:  RefCell<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    fn new(responses: Vec<HttpResponse>) -> Self {
        Self {
            responses: RefCell::new(responses.into()),
            requests:  RefCell::new(Vec::new()),
        }
    }

    fn request(&self, index: usize) -> HttpRequest {
        self.requests.borrow()[index].clone()
    }

    fn sent(&self) -> usize {
        self.requests.borrow().len()
    }
}

impl Transport for ScriptedTransport {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.requests.borrow_mut().push(request);
        self.responses
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| Report::new(Error::failed_to("send request", "script exhausted")))
    }
}

fn response(status: u16, body: &Value, headers: &[(&str, &str)]) -> HttpResponse {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        map.append(
            HeaderName::from_bytes(name.as_bytes()).unwrap(),
            HeaderValue::from_str(value).unwrap(),
        );
    }
    HttpResponse {
        status,
        headers: map,
        body: if body.is_null() {
            Vec::new()
        } else {
            serde_json::to_vec(body).unwrap()
        },
    }
}

fn dispatcher(transport: &ScriptedTransport) -> Dispatcher<&ScriptedTransport> {
    Dispatcher::new(
        transport,
        Arc::new(SchemaRegistry::with_builtin_models().unwrap()),
        ClientConfig::default(),
    )
}

fn header<'a>(request: &'a HttpRequest, name: &str) -> &'a str {
    request.headers.get(name).unwrap().to_str().unwrap()
}

fn body_json(request: &HttpRequest) -> Value {
    serde_json::from_slice(request.body.as_deref().unwrap()).unwrap()
}

#[test]
fn test_post_admin_org_and_follow_links() {
    let created = json!({
        "_type": "AdminOrg",
        "href": format!("{HOST}/api/admin/org/1"),
        "name": "acme",
        "isEnabled": true,
        "link": [
            {
                "href": format!("{HOST}/api/admin/org/1"),
                "rel": "edit",
                "type": "application/vnd.vmware.admin.organization+json"
            },
            {
                "href": format!("{HOST}/api/org/1"),
                "rel": "alternate",
                "type": "application/vnd.vmware.vcloud.org+json"
            }
        ]
    });
    let transport = ScriptedTransport::new(vec![response(201, &created, &[])]);
    let dispatcher = dispatcher(&transport);

    let body = Record::builder("AdminOrg")
        .field("name", "acme")
        .field("enabled", true)
        .build();
    let envelope = dispatcher
        .call(
            CallRequest::post(format!("{HOST}/api/admin/orgs"))
                .body(body)
                .response_type("Org"),
        )
        .unwrap();

    let request = transport.request(0);
    assert_eq!(request.method, HttpMethod::Post);
    assert_eq!(body_json(&request), json!({"name": "acme", "isEnabled": true}));
    assert_eq!(
        header(&request, "content-type"),
        "application/vnd.vmware.admin.organization+json;version=36.0"
    );
    assert_eq!(header(&request, "accept"), "application/*+json;version=36.0");

    assert_eq!(envelope.status, 201);
    assert_eq!(envelope.record().unwrap().type_name(), "AdminOrg");
    let admin: AdminOrgType = envelope.decode().unwrap();
    assert_eq!(admin.enabled, Some(true));

    let edit = envelope.find_first_link("edit", &[]).unwrap();
    assert_eq!(edit.href, format!("{HOST}/api/admin/org/1"));
    assert!(
        envelope
            .find_first_link("edit", &[("type", "application/vnd.vmware.vcloud.org+json")])
            .is_none()
    );
    assert!(envelope.find_first_link("remove", &[]).is_none());
    assert!(envelope.task.is_none());
}

#[test]
fn test_typed_model_body_uses_schema_media_type() {
    let transport = ScriptedTransport::new(vec![response(200, &json!({"name": "acme"}), &[])]);
    let dispatcher = dispatcher(&transport);

    let mut admin = AdminOrgType::default();
    admin.org.entity.name = Some("acme".to_string());
    admin.enabled = Some(false);
    dispatcher
        .put_model(&format!("{HOST}/api/admin/org/1"), &admin, "AdminOrg")
        .unwrap();

    let request = transport.request(0);
    assert_eq!(request.method, HttpMethod::Put);
    assert_eq!(body_json(&request), json!({"name": "acme", "isEnabled": false}));
    assert!(header(&request, "content-type").starts_with("application/vnd.vmware.admin.organization+json"));
}

#[test]
fn test_cloudapi_link_header_and_location_task() {
    let link_header = format!(
        r#"<{HOST}/cloudapi/1.0.0/edgeGateways/urn:gw:1>; rel="edit"; type="application/json", <{HOST}/cloudapi/1.0.0/edgeGateways>; rel=up"#
    );
    let task_href = format!("{HOST}/api/task/42");
    let transport = ScriptedTransport::new(vec![
        response(
            202,
            &Value::Null,
            &[("link", link_header.as_str()), ("location", task_href.as_str())],
        ),
        response(
            200,
            &json!({"href": task_href, "name": "task", "status": "running"}),
            &[],
        ),
    ]);
    let dispatcher = dispatcher(&transport);

    let envelope = dispatcher
        .call(
            CallRequest::post(format!("{HOST}/cloudapi/1.0.0/edgeGateways"))
                .json_body(json!({"name": "edge"})),
        )
        .unwrap();

    let create = transport.request(0);
    assert_eq!(header(&create, "content-type"), "application/json;version=36.0");
    assert_eq!(header(&create, "accept"), "application/json;version=36.0");
    assert_eq!(body_json(&create), json!({"name": "edge"}));

    let follow_up = transport.request(1);
    assert_eq!(follow_up.method, HttpMethod::Get);
    assert_eq!(follow_up.url.as_str(), task_href);
    assert_eq!(header(&follow_up, "accept"), "application/*+json;version=36.0");

    assert_eq!(envelope.output, CallOutput::None);
    assert_eq!(envelope.links.len(), 2);
    assert_eq!(envelope.links[0].rel, ["edit"]);
    assert!(envelope.find_first_link("up", &[]).is_some());

    let task = envelope.task.as_ref().unwrap();
    assert_eq!(task.href(), task_href);
    assert_eq!(task.status(), Some(TaskStatus::Running));
}

#[test]
fn test_malformed_link_header_yields_no_links() {
    let transport = ScriptedTransport::new(vec![response(
        200,
        &json!({"values": []}),
        &[("link", "not a link header")],
    )]);
    let envelope = dispatcher(&transport)
        .call(CallRequest::get(format!("{HOST}/cloudapi/1.0.0/orgs")))
        .unwrap();
    assert!(envelope.links.is_empty());
    assert_eq!(envelope.raw().unwrap(), &json!({"values": []}));
}

#[test]
fn test_task_from_tasks_in_progress() {
    let vdc = json!({
        "name": "dev",
        "tasks": {
            "task": [
                {"href": format!("{HOST}/api/task/7"), "status": "queued"},
                {"href": format!("{HOST}/api/task/8"), "status": "running"}
            ]
        }
    });
    let transport = ScriptedTransport::new(vec![response(200, &vdc, &[])]);
    let envelope = dispatcher(&transport)
        .get(&format!("{HOST}/api/vdc/1"), "Entity")
        .unwrap();

    let task = envelope.task.unwrap();
    assert_eq!(task.href(), format!("{HOST}/api/task/7"));
    assert_eq!(task.status(), Some(TaskStatus::Queued));
}

#[test]
fn test_task_body_is_the_task() {
    let task = json!({
        "href": format!("{HOST}/api/task/9"),
        "operationName": "vappDeploy",
        "status": "preRunning"
    });
    let transport = ScriptedTransport::new(vec![response(202, &task, &[])]);
    let envelope = dispatcher(&transport)
        .call(
            CallRequest::post(format!("{HOST}/api/vApp/vapp-1/action/deploy"))
                .response_type("Task"),
        )
        .unwrap();

    assert!(transport.request(0).body.is_none());
    let task = envelope.task.unwrap();
    assert_eq!(task.status(), Some(TaskStatus::PreRunning));
    assert_eq!(
        task.typed().unwrap().operation_name.as_deref(),
        Some("vappDeploy")
    );
}

#[test]
fn test_raw_output_still_yields_links_and_tasks() {
    let body = json!({
        "name": "dev",
        "link": [{"href": format!("{HOST}/api/vdc/1/vApps"), "rel": "down", "model": "VApp"}],
        "tasks": [{"href": format!("{HOST}/api/task/3"), "status": "running"}]
    });
    let transport = ScriptedTransport::new(vec![response(200, &body, &[])]);
    let envelope = dispatcher(&transport)
        .call(CallRequest::get(format!("{HOST}/api/vdc/1")))
        .unwrap();

    assert_eq!(envelope.raw().unwrap(), &body);
    let down = envelope.find_first_link("down", &[("model", "VApp")]).unwrap();
    assert_eq!(down.href, format!("{HOST}/api/vdc/1/vApps"));
    assert_eq!(envelope.task.unwrap().href(), format!("{HOST}/api/task/3"));
}

#[test]
fn test_undecodable_raw_task_does_not_fail_the_call() {
    let body = json!({
        "name": "dev",
        "tasks": [{"href": format!("{HOST}/api/task/3"), "startTime": "yesterday"}]
    });
    let transport = ScriptedTransport::new(vec![response(200, &body, &[])]);
    let envelope = dispatcher(&transport)
        .call(CallRequest::get(format!("{HOST}/api/vdc/1")))
        .unwrap();

    assert!(envelope.is_success());
    assert_eq!(envelope.raw().unwrap(), &body);
    assert!(envelope.task.is_none());
}

#[test]
fn test_query_parameters_are_encoded_on_the_url() {
    let transport = ScriptedTransport::new(vec![response(200, &json!({"record": []}), &[])]);
    let params = QueryParamsBuilder::new()
        .query_type("adminOrgVdc")
        .filter("name==dev*")
        .page_size(10)
        .build();
    dispatcher(&transport)
        .call(CallRequest::get(format!("{HOST}/api/query")).query(params))
        .unwrap();

    let url = transport.request(0).url;
    let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    assert_eq!(
        pairs,
        [
            ("type".to_string(), "adminOrgVdc".to_string()),
            ("filter".to_string(), "name==dev*".to_string()),
            ("pageSize".to_string(), "10".to_string()),
            ("filterEncoded".to_string(), "true".to_string()),
        ]
    );
    assert!(url.as_str().contains("filter=name%3D%3Ddev*"));
}

#[test]
fn test_file_download_is_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let transport = ScriptedTransport::new(vec![HttpResponse {
        status:  200,
        headers: HeaderMap::new(),
        body:    b"\x00\x01ovf-bytes".to_vec(),
    }]);
    let dispatcher = Dispatcher::new(
        &transport,
        Arc::new(SchemaRegistry::with_builtin_models().unwrap()),
        ClientConfig::default().with_download_dir(dir.path()),
    );

    let envelope = dispatcher
        .call(CallRequest::get(format!("{HOST}/api/transfer/1/descriptor.ovf")).response_type("file"))
        .unwrap();

    let path = envelope.file_path().unwrap();
    assert!(path.starts_with(dir.path()));
    assert_eq!(std::fs::read(path).unwrap(), b"\x00\x01ovf-bytes");
}

#[test]
fn test_configuration_errors_fail_before_sending() {
    let transport = ScriptedTransport::default();
    let dispatcher = dispatcher(&transport);

    let unregistered = dispatcher
        .get(&format!("{HOST}/api/gateway/1"), "list[Gateway]")
        .unwrap_err();
    assert!(unregistered.current_context().is_fatal());

    let no_dialect = dispatcher
        .call(CallRequest::get(format!("{HOST}/oauth/token")))
        .unwrap_err();
    assert!(no_dialect.current_context().is_fatal());

    let undeclared = dispatcher
        .call(
            CallRequest::post(format!("{HOST}/api/admin/orgs"))
                .body(Record::builder("AdminOrg").field("colour", "red").build()),
        )
        .unwrap_err();
    assert!(undeclared.current_context().is_fatal());

    assert_eq!(transport.sent(), 0);
}

#[test]
fn test_non_success_keeps_raw_body() {
    let error = json!({
        "message": "[ 1f2e ] Org acme already exists",
        "majorErrorCode": 400,
        "minorErrorCode": "DUPLICATE_NAME"
    });
    let transport = ScriptedTransport::new(vec![response(400, &error, &[])]);
    let envelope = dispatcher(&transport)
        .call(CallRequest::post(format!("{HOST}/api/admin/orgs")).response_type("AdminOrg"))
        .unwrap();

    assert!(!envelope.is_success());
    assert_eq!(envelope.raw().unwrap(), &error);

    let report = envelope.error_for_status().unwrap_err();
    assert_eq!(
        report.current_context().to_string(),
        "HTTP 400: [ 1f2e ] Org acme already exists"
    );
}

#[test]
fn test_malformed_typed_body_is_an_error() {
    let transport = ScriptedTransport::new(vec![HttpResponse {
        status:  200,
        headers: HeaderMap::new(),
        body:    b"<html>maintenance</html>".to_vec(),
    }]);
    let report = dispatcher(&transport)
        .get(&format!("{HOST}/api/org/1"), "Org")
        .unwrap_err();
    assert!(report.current_context().is_malformed());
}

#[test]
fn test_session_credentials_are_sent() {
    let transport = ScriptedTransport::new(vec![
        response(200, &json!({}), &[]),
        response(200, &json!({}), &[]),
    ]);
    let mut dispatcher = dispatcher(&transport).with_session(Session::Bearer("jwt".to_string()));
    dispatcher
        .call(CallRequest::get(format!("{HOST}/cloudapi/1.0.0/orgs")))
        .unwrap();
    assert_eq!(header(&transport.request(0), "authorization"), "Bearer jwt");

    dispatcher.set_session(None);
    dispatcher
        .call(CallRequest::get(format!("{HOST}/cloudapi/1.0.0/orgs")))
        .unwrap();
    assert!(transport.request(1).headers.get(AUTHORIZATION).is_none());
}

#[test]
fn test_each_call_gets_a_fresh_envelope() {
    let with_links = json!({"link": [{"href": format!("{HOST}/api/org/1"), "rel": "down"}]});
    let transport = ScriptedTransport::new(vec![
        response(200, &with_links, &[]),
        response(204, &Value::Null, &[]),
    ]);
    let dispatcher = dispatcher(&transport);

    let first = dispatcher.get(&format!("{HOST}/api/org"), "Resource").unwrap();
    let second = dispatcher.delete(&format!("{HOST}/api/org/1")).unwrap();

    assert_eq!(first.links.len(), 1);
    assert!(second.links.is_empty());
    assert_eq!(second.output, CallOutput::None);
}

#[test]
fn test_wait_for_envelope_task() {
    let task_href = format!("{HOST}/api/task/5");
    let transport = ScriptedTransport::new(vec![
        response(202, &json!({"href": task_href, "status": "running"}), &[]),
        response(200, &json!({"href": task_href, "status": "running"}), &[]),
        response(200, &json!({"href": task_href, "status": "success"}), &[]),
    ]);
    let dispatcher = dispatcher(&transport);
    let monitor = PollingTaskMonitor::new(Duration::ZERO, Duration::from_secs(5));

    let envelope = dispatcher
        .call(CallRequest::post(format!("{HOST}/api/vApp/vapp-1/power/action/powerOn")).response_type("Task"))
        .unwrap();
    let done = dispatcher
        .wait_for_envelope_task(&envelope, &monitor)
        .unwrap()
        .unwrap();

    assert_eq!(done.status(), Some(TaskStatus::Success));
    assert_eq!(transport.sent(), 3);
    assert_eq!(transport.request(2).url.as_str(), task_href);
}

#[test]
fn test_failed_task_surfaces_server_message() {
    let task_href = format!("{HOST}/api/task/6");
    let transport = ScriptedTransport::new(vec![response(
        200,
        &json!({
            "href": task_href,
            "status": "error",
            "error": {"message": "Not enough storage", "majorErrorCode": 500}
        }),
        &[],
    )]);
    let dispatcher = dispatcher(&transport);
    let running = TaskRef::new(
        task_href.clone(),
        Record::builder("Task").field("href", task_href.as_str()).build(),
    );

    let report = dispatcher
        .wait_for_task(&running, &PollingTaskMonitor::new(Duration::ZERO, Duration::from_secs(5)))
        .unwrap_err();
    assert!(report.to_string().contains("Not enough storage"));
}
