//! Dispatch behavior of the event-emitting resource.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::json;

use restbus::testing::{FieldsInputFilter, StaticIdentity};
use restbus::{
    Operation, Outcome, Parameters, Request, Resource, ResourceEvent, SharedHandlers,
};

mod common;
use common::widget_store;

#[test]
fn test_all_nine_operations_have_defaults() {
    let resource = Resource::new();

    // Mutations echo the (coerced) input back.
    match resource.create(json!({ "name": "anvil" })).unwrap() {
        Outcome::Value(value) => assert_eq!(value, json!({ "name": "anvil" })),
        other => panic!("unexpected outcome {other:?}"),
    }
    match resource.update(json!("1"), json!({ "name": "b" })).unwrap() {
        Outcome::Value(value) => assert_eq!(value, json!({ "name": "b" })),
        other => panic!("unexpected outcome {other:?}"),
    }
    match resource.replace_list(json!([{ "id": "1" }])).unwrap() {
        Outcome::Value(value) => assert_eq!(value, json!([{ "id": "1" }])),
        other => panic!("unexpected outcome {other:?}"),
    }
    match resource.patch(json!("1"), json!({ "name": "c" })).unwrap() {
        Outcome::Value(value) => assert_eq!(value, json!({ "name": "c" })),
        other => panic!("unexpected outcome {other:?}"),
    }
    match resource.patch_list(json!([{ "id": "1" }])).unwrap() {
        Outcome::Value(value) => assert_eq!(value, json!([{ "id": "1" }])),
        other => panic!("unexpected outcome {other:?}"),
    }

    // Deletes and single fetches report "nothing happened" as false.
    assert!(matches!(
        resource.delete(json!("1")).unwrap(),
        Outcome::Bool(false)
    ));
    assert!(matches!(
        resource.delete_list(None).unwrap(),
        Outcome::Bool(false)
    ));
    assert!(matches!(
        resource.fetch(json!("1")).unwrap(),
        Outcome::Bool(false)
    ));

    // A collection fetch falls back to an empty list.
    match resource.fetch_all().unwrap() {
        Outcome::Value(value) => assert_eq!(value, json!([])),
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[test]
fn test_payload_coercion_rejects_bad_shapes_before_dispatch() {
    static CALLS: AtomicUsize = AtomicUsize::new(0);

    let mut resource = Resource::new();
    for operation in Operation::ALL {
        resource.on(operation, |_| {
            CALLS.fetch_add(1, Ordering::SeqCst);
            Ok(Outcome::Pass)
        });
    }

    let err = resource.create(json!("anvil")).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Data provided to create must be either an array or object; received \"string\""
    );
    assert_eq!(err.status(), Some(400));

    let err = resource.update(json!("1"), json!(7)).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Data provided to update must be either an array or object; received \"number\""
    );

    let err = resource.replace_list(json!({ "id": "1" })).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Data provided to replaceList must be either a multi-dimensional array \
         or array of objects; received \"object\""
    );

    let err = resource.patch_list(json!([{ "id": "1" }, true])).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Data provided to patchList must contain only arrays or objects; received \"boolean\""
    );

    let err = resource.delete_list(Some(json!("all"))).unwrap_err();
    assert_eq!(
        err.to_string(),
        "deleteList expects null or an array of items and/or ids; received \"string\""
    );

    assert_eq!(CALLS.load(Ordering::SeqCst), 0, "no handler should have run");
}

#[test]
fn test_pair_arrays_fold_into_records() {
    let resource = Resource::new();
    let payload = json!([["name", "anvil"], ["type", "blue"]]);

    match resource.create(payload).unwrap() {
        Outcome::Value(value) => {
            assert_eq!(value, json!({ "name": "anvil", "type": "blue" }));
        }
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[test]
fn test_shared_listeners_run_after_own_handlers() {
    let shared = SharedHandlers::new();
    shared.attach_listener("audit.widgets", Arc::new(widget_store()));

    let mut resource = Resource::new();
    resource.on(Operation::Fetch, |_| Ok(json!({ "from": "own" }).into()));
    resource.set_shared(shared);
    resource.add_identifier("audit.widgets");

    // The shared listener runs last, so its record wins.
    match resource.fetch(json!("2")).unwrap() {
        Outcome::Value(value) => assert_eq!(value["name"], "sprocket"),
        other => panic!("unexpected outcome {other:?}"),
    }

    // Identifiers the registry does not know leave the own result in place.
    let mut lone = Resource::new();
    lone.on(Operation::Fetch, |_| Ok(json!({ "from": "own" }).into()));
    lone.set_shared(SharedHandlers::new());
    lone.add_identifier("audit.widgets");
    match lone.fetch(json!("2")).unwrap() {
        Outcome::Value(value) => assert_eq!(value, json!({ "from": "own" })),
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[test]
fn test_prepared_responses_bypass_normalization() {
    let mut resource = Resource::new();
    resource.on(Operation::Create, |_| {
        let mut response = restbus::Response::new(b"queued".to_vec());
        *response.status_mut() = http::StatusCode::ACCEPTED;
        Ok(Outcome::Response(response))
    });

    match resource.create(json!({ "name": "anvil" })).unwrap() {
        Outcome::Response(response) => {
            assert_eq!(response.status(), http::StatusCode::ACCEPTED);
            assert_eq!(response.body(), b"queued");
        }
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[test]
fn test_events_expose_the_full_request_context() {
    let mut resource = Resource::new();
    resource.set_query_params(Parameters::from_iter([("type", json!("blue"))]));
    resource.set_route_match(Parameters::from_iter([("id", json!("9"))]));
    resource.set_identity(Arc::new(StaticIdentity::new("user-31")));
    resource.set_input_filter(Arc::new(FieldsInputFilter::new(["name"])));
    resource.set_request(Arc::new(Request::new(Vec::new())));

    resource.on(Operation::Fetch, |event: &ResourceEvent| {
        assert_eq!(event.query_param("type"), Some(&json!("blue")));
        assert_eq!(event.route_param("id"), Some(&json!("9")));
        assert_eq!(event.identity().map(|identity| identity.id()), Some("user-31"));
        let fields = event.input_filter().map(|filter| filter.field_names());
        assert_eq!(fields, Some(vec!["name".to_string()]));
        assert!(event.request().is_some(), "the raw request should ride along");
        Ok(json!({ "id": event.id().cloned() }).into())
    });

    match resource.fetch(json!("9")).unwrap() {
        Outcome::Value(value) => assert_eq!(value, json!({ "id": "9" })),
        other => panic!("unexpected outcome {other:?}"),
    }
}
