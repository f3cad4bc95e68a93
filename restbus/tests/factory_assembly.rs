//! Factory assembly: configuration in, wired controllers out.

use std::sync::{Arc, Mutex};

use serde_json::{json, Value};

use restbus::testing::{FieldsInputFilter, RecordingHook, StaticIdentity, TestHypermedia};
use restbus::{
    Action, ControllerFactory, Operation, Outcome, Phase, ResourceError, ResourceEvent,
    ResourceListener, RestConfig, SharedHandlers, SharedLifecycleHooks,
};

mod common;
use common::{bind, widget_store};

fn config(value: Value) -> RestConfig {
    serde_json::from_value(value).unwrap()
}

fn factory(value: Value) -> ControllerFactory {
    ControllerFactory::new(config(value), Arc::new(TestHypermedia::new()))
}

#[derive(Clone)]
struct QuerySpy {
    keys: Arc<Mutex<Vec<String>>>,
    identity: Arc<Mutex<Option<String>>>,
}

impl QuerySpy {
    fn new() -> Self {
        Self {
            keys: Arc::new(Mutex::new(Vec::new())),
            identity: Arc::new(Mutex::new(None)),
        }
    }
}

impl ResourceListener for QuerySpy {
    fn fetch_all(&self, event: &ResourceEvent) -> Result<Outcome, ResourceError> {
        *self.keys.lock().unwrap() = event.query_params().keys().cloned().collect();
        *self.identity.lock().unwrap() =
            event.identity().map(|identity| identity.id().to_string());
        Ok(json!([{ "id": "1", "type": "blue" }]).into())
    }
}

#[test]
fn test_the_whitelist_narrows_the_query_and_decorates_the_collection() {
    let factory = factory(json!({
        "api.widgets.rest": {
            "listener": "Widgets",
            "route_name": "api.widgets",
            "collection_query_whitelist": ["type"]
        }
    }));
    let spy = QuerySpy::new();
    let mut controller = factory.build("api.widgets.rest", spy.clone()).unwrap();
    controller.set_input_filter(Arc::new(FieldsInputFilter::new(["status"])));
    controller.set_identity(Arc::new(StaticIdentity::new("user-7")));

    bind(
        &mut controller,
        &[],
        &[
            ("type", json!("blue")),
            ("status", json!("new")),
            ("secret", json!("x")),
            ("page", json!("2")),
        ],
    );
    let response = controller.get_list().unwrap();
    let collection = response.as_collection().expect("expected a collection");

    // The listener saw only whitelisted and filter-declared parameters.
    assert_eq!(*spy.keys.lock().unwrap(), ["type", "status"]);
    assert_eq!(spy.identity.lock().unwrap().as_deref(), Some("user-7"));

    // Pagination still reads the page from the unfiltered controller bag.
    assert_eq!(collection.page(), 2);

    // The surviving parameters ride on the collection and its self link.
    let expected = json!({ "type": "blue", "status": "new" });
    assert_eq!(
        collection.collection_route_options().get("query"),
        Some(&expected)
    );
    let link = collection
        .links()
        .get("self")
        .expect("prepared collections get a self link");
    assert_eq!(link.route_options().get("query"), Some(&expected));
}

#[test]
fn test_shared_registries_reach_built_controllers() {
    let shared_handlers = SharedHandlers::new();
    shared_handlers.attach(
        "shared.widgets",
        Operation::FetchAll,
        Arc::new(|_: &ResourceEvent| Ok(json!([{ "id": "shared" }]).into())),
    );

    let shared_hooks = SharedLifecycleHooks::new();
    let recorder = RecordingHook::new();
    shared_hooks.attach(
        "api.widgets.rest",
        Action::GetList,
        Phase::Pre,
        Arc::new(recorder.clone()),
    );

    let factory = factory(json!({
        "api.widgets.rest": {
            "listener": "Widgets",
            "route_name": "api.widgets",
            "resource_identifiers": "shared.widgets"
        }
    }))
    .with_shared_handlers(shared_handlers)
    .with_shared_hooks(shared_hooks);

    let mut controller = factory.build("api.widgets.rest", QuerySpy::new()).unwrap();
    bind(&mut controller, &[], &[]);

    let response = controller.get_list().unwrap();
    let collection = response.as_collection().unwrap();
    assert_eq!(
        collection.items(),
        &json!([{ "id": "shared" }]),
        "the shared handler runs after the listener, so its result wins"
    );
    assert_eq!(recorder.names(), ["getList.pre"]);
}

#[test]
fn test_configured_identifiers_select_the_shared_hooks() {
    let shared_hooks = SharedLifecycleHooks::new();
    let by_name = RecordingHook::new();
    let by_identifier = RecordingHook::new();
    shared_hooks.attach(
        "api.widgets.rest",
        Action::Get,
        Phase::Pre,
        Arc::new(by_name.clone()),
    );
    shared_hooks.attach(
        "widgets.events",
        Action::Get,
        Phase::Pre,
        Arc::new(by_identifier.clone()),
    );

    let factory = factory(json!({
        "api.widgets.rest": {
            "listener": "Widgets",
            "route_name": "api.widgets",
            "identifier": "widgets.events"
        }
    }))
    .with_shared_hooks(shared_hooks);

    let mut controller = factory.build("api.widgets.rest", widget_store()).unwrap();
    controller.get(json!("1")).unwrap();

    assert_eq!(
        by_identifier.count(),
        1,
        "hooks under the configured identifier fire"
    );
    assert_eq!(
        by_name.count(),
        0,
        "the controller name is unused once identifiers are configured"
    );
}

#[test]
fn test_assembly_failures_name_the_controller() {
    let factory = factory(json!({
        "api.partial.rest": { "listener": "Widgets" }
    }));

    assert!(!factory.can_create("api.partial.rest"));
    assert!(!factory.can_create("api.unknown.rest"));

    let err = factory
        .build("api.partial.rest", QuerySpy::new())
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "invalid controller configuration: controller \"api.partial.rest\" \
         requires both \"listener\" and \"route_name\""
    );

    let err = factory
        .build("api.unknown.rest", QuerySpy::new())
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "invalid controller configuration: no configuration for controller \"api.unknown.rest\""
    );
}

#[test]
fn test_configured_pagination_applies_to_list_requests() {
    let factory = factory(json!({
        "api.widgets.rest": {
            "listener": "Widgets",
            "route_name": "api.widgets",
            "page_size": 2,
            "max_page_size": 4,
            "page_size_param": "pageSize"
        }
    }));
    let mut controller = factory.build("api.widgets.rest", widget_store()).unwrap();

    bind(&mut controller, &[], &[("pageSize", json!("9"))]);
    let response = controller.get_list().unwrap();
    let problem = response.as_problem().unwrap();
    assert_eq!(problem.status(), 416);
    assert_eq!(
        problem.detail(),
        "Page size is out of range, maximum page size is 4"
    );

    bind(&mut controller, &[], &[]);
    let response = controller.get_list().unwrap();
    assert_eq!(response.as_collection().unwrap().page_size(), 2);
}
