use std::sync::Arc;

use serde_json::{json, Value};

use restbus::testing::{InMemoryListener, TestHypermedia};
use restbus::{Parameters, Request, Resource, ResourceListener, RestController};

// ============================================================================
// Parameter bags
// ============================================================================

pub fn params(pairs: &[(&str, Value)]) -> Parameters {
    pairs
        .iter()
        .map(|(name, value)| (*name, value.clone()))
        .collect()
}

// ============================================================================
// Controller assembly
// ============================================================================

pub fn controller_for<L>(listener: L) -> RestController
where
    L: ResourceListener + 'static,
{
    controller_with(Arc::new(TestHypermedia::new()), listener)
}

pub fn controller_with<L>(hypermedia: Arc<TestHypermedia>, listener: L) -> RestController
where
    L: ResourceListener + 'static,
{
    let mut resource = Resource::new();
    resource.attach(Arc::new(listener));

    let mut controller = RestController::new(hypermedia);
    controller.set_resource(resource);
    controller.set_route("api.widgets");
    controller
}

pub fn bind(controller: &mut RestController, route: &[(&str, Value)], query: &[(&str, Value)]) {
    controller.bind(Request::new(Vec::new()), params(route), params(query));
}

// ============================================================================
// Canonical records
// ============================================================================

pub fn widget_store() -> InMemoryListener {
    InMemoryListener::with_records(vec![
        json!({ "id": "1", "name": "anvil", "type": "blue" }),
        json!({ "id": "2", "name": "sprocket", "type": "red" }),
        json!({ "id": "3", "name": "gear", "type": "blue" }),
    ])
}
