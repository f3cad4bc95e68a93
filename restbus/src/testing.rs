//! Testing utilities.
//!
//! Test doubles for the collaborators a host framework normally supplies.
//!
//! # Features
//!
//! - [`TestHypermedia`]: a deterministic hypermedia builder with a fixed URL
//!   scheme
//! - [`InMemoryListener`]: a vector-backed listener covering all nine
//!   operations
//! - [`RecordingHook`]: a lifecycle hook that records the events it sees
//! - [`StaticIdentity`]: a canned authenticated identity
//! - [`FieldsInputFilter`]: an input filter declaring a fixed field list

use std::sync::{Arc, Mutex};

use serde_json::{Map, Value};

use restbus_core::{
    Collection, Entity, HypermediaError, HypermediaBuilder, Identity, InputFilter, Link, LinkSet,
    Outcome, RenderedLink, ResourceError, ResourceEvent, ResourceListener,
};

use crate::lifecycle::{HookResult, LifecycleEvent, LifecycleHook};

// ============================================================================
// Hypermedia builder
// ============================================================================

/// A hypermedia builder with a deterministic URL scheme.
///
/// Routes render as path segments (`api.widgets` becomes `/api/widgets`),
/// route parameter values append as further segments in insertion order, and
/// a `query` route option renders as a query string. Entities get a
/// route-based self link carrying the identifier found under the configured
/// identifier field.
///
/// # Example
///
/// ```rust,ignore
/// let builder = TestHypermedia::new();
/// let entity = builder.create_entity(json!({ "id": 7 }), "api.widgets", "id");
/// assert!(entity.links().has("self"));
/// ```
pub struct TestHypermedia {
    link_props: Map<String, Value>,
}

impl TestHypermedia {
    /// Create a builder that attaches no extra link properties.
    pub fn new() -> Self {
        Self {
            link_props: Map::new(),
        }
    }

    /// Attach extra presentation properties to every generated self link.
    pub fn with_link_props(mut self, props: Map<String, Value>) -> Self {
        self.link_props = props;
        self
    }

    fn decorate(&self, mut link: Link) -> Link {
        for (name, value) in &self.link_props {
            link = link.prop(name.clone(), value.clone());
        }
        link
    }
}

impl Default for TestHypermedia {
    fn default() -> Self {
        Self::new()
    }
}

impl HypermediaBuilder for TestHypermedia {
    fn create_entity(&self, value: Value, route: &str, route_identifier_name: &str) -> Entity {
        let id = value.get(route_identifier_name).map(value_text);
        match id {
            Some(id) => {
                let link = self.decorate(
                    Link::with_route("self", route).param(route_identifier_name, id.clone()),
                );
                let mut entity = Entity::with_id(value, id);
                entity.links_mut().add(link);
                entity
            }
            None => Entity::new(value),
        }
    }

    fn create_collection(&self, items: Value, _route: &str) -> Collection {
        Collection::new(items)
    }

    fn inject_self_link(&self, links: &mut LinkSet, route: &str) {
        links.add(self.decorate(Link::with_route("self", route)));
    }

    fn from_link(&self, link: &Link) -> Result<RenderedLink, HypermediaError> {
        if let Some(href) = link.href() {
            return Ok(RenderedLink {
                href: href.to_string(),
                props: link.props().clone(),
            });
        }
        let Some(route) = link.route() else {
            return Err(HypermediaError::IncompleteLink(link.rel().to_string()));
        };

        let mut href = format!("/{}", route.replace('.', "/"));
        for (_, value) in link.route_params().iter() {
            href.push('/');
            href.push_str(&value_text(value));
        }
        if let Some(Value::Object(query)) = link.route_options().get("query") {
            let pairs: Vec<String> = query
                .iter()
                .map(|(name, value)| format!("{name}={}", value_text(value)))
                .collect();
            if !pairs.is_empty() {
                href.push('?');
                href.push_str(&pairs.join("&"));
            }
        }

        Ok(RenderedLink {
            href,
            props: link.props().clone(),
        })
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

// ============================================================================
// In-memory listener
// ============================================================================

/// A vector-backed listener implementing all nine operations.
///
/// Records are JSON objects matched by their `id` field. Mutation results
/// mirror what a database-backed listener would return: the stored record
/// for single-entity operations, booleans for deletes, the full record set
/// for list operations.
///
/// # Example
///
/// ```rust,ignore
/// let listener = InMemoryListener::with_records(vec![
///     json!({ "id": "1", "name": "widget" }),
/// ]);
/// let store = listener.clone();
///
/// // Attach to a resource, drive a controller...
///
/// assert_eq!(store.records().len(), 1);
/// ```
pub struct InMemoryListener {
    records: Arc<Mutex<Vec<Value>>>,
}

impl InMemoryListener {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            records: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a store seeded with records.
    pub fn with_records(records: Vec<Value>) -> Self {
        Self {
            records: Arc::new(Mutex::new(records)),
        }
    }

    /// A snapshot of the stored records.
    pub fn records(&self) -> Vec<Value> {
        self.records.lock().unwrap().clone()
    }

    fn position(&self, id: &Value) -> Option<usize> {
        let wanted = value_text(id);
        self.records
            .lock()
            .unwrap()
            .iter()
            .position(|record| record.get("id").map(value_text).as_deref() == Some(wanted.as_str()))
    }
}

impl Default for InMemoryListener {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for InMemoryListener {
    fn clone(&self) -> Self {
        Self {
            records: self.records.clone(),
        }
    }
}

impl ResourceListener for InMemoryListener {
    fn create(&self, data: &Value, _event: &ResourceEvent) -> Result<Outcome, ResourceError> {
        self.records.lock().unwrap().push(data.clone());
        Ok(data.clone().into())
    }

    fn update(
        &self,
        id: &Value,
        data: &Value,
        _event: &ResourceEvent,
    ) -> Result<Outcome, ResourceError> {
        let Some(index) = self.position(id) else {
            return Err(ResourceError::update("no such record").with_status(404));
        };
        let mut records = self.records.lock().unwrap();
        records[index] = data.clone();
        Ok(data.clone().into())
    }

    fn replace_list(&self, data: &Value, _event: &ResourceEvent) -> Result<Outcome, ResourceError> {
        let incoming = data.as_array().cloned().unwrap_or_default();
        *self.records.lock().unwrap() = incoming.clone();
        Ok(Value::Array(incoming).into())
    }

    fn patch(
        &self,
        id: &Value,
        data: &Value,
        _event: &ResourceEvent,
    ) -> Result<Outcome, ResourceError> {
        let Some(index) = self.position(id) else {
            return Err(ResourceError::patch("no such record").with_status(404));
        };
        let mut records = self.records.lock().unwrap();
        if let (Value::Object(record), Value::Object(changes)) = (&mut records[index], data) {
            for (name, value) in changes {
                record.insert(name.clone(), value.clone());
            }
        }
        Ok(records[index].clone().into())
    }

    fn patch_list(&self, data: &Value, _event: &ResourceEvent) -> Result<Outcome, ResourceError> {
        if let Some(changesets) = data.as_array() {
            for changes in changesets {
                let Some(id) = changes.get("id") else { continue };
                if let Some(index) = self.position(id) {
                    let mut records = self.records.lock().unwrap();
                    if let (Value::Object(record), Value::Object(changes)) =
                        (&mut records[index], changes)
                    {
                        for (name, value) in changes {
                            record.insert(name.clone(), value.clone());
                        }
                    }
                }
            }
        }
        Ok(Value::Array(self.records()).into())
    }

    fn delete(&self, id: &Value, _event: &ResourceEvent) -> Result<Outcome, ResourceError> {
        match self.position(id) {
            Some(index) => {
                self.records.lock().unwrap().remove(index);
                Ok(true.into())
            }
            None => Ok(false.into()),
        }
    }

    fn delete_list(&self, _data: &Value, _event: &ResourceEvent) -> Result<Outcome, ResourceError> {
        self.records.lock().unwrap().clear();
        Ok(true.into())
    }

    fn fetch(&self, id: &Value, _event: &ResourceEvent) -> Result<Outcome, ResourceError> {
        match self.position(id) {
            Some(index) => Ok(self.records.lock().unwrap()[index].clone().into()),
            None => Ok(false.into()),
        }
    }

    fn fetch_all(&self, _event: &ResourceEvent) -> Result<Outcome, ResourceError> {
        Ok(Value::Array(self.records()).into())
    }
}

// ============================================================================
// Recording hook
// ============================================================================

/// A lifecycle hook that records the names of the events it sees.
///
/// # Example
///
/// ```rust,ignore
/// let recorder = RecordingHook::new();
/// controller.events_mut().attach(Action::Get, Phase::Pre, Arc::new(recorder.clone()));
///
/// controller.get(json!("1")).unwrap();
/// assert_eq!(recorder.names(), ["get.pre"]);
/// ```
pub struct RecordingHook {
    seen: Arc<Mutex<Vec<String>>>,
}

impl RecordingHook {
    /// Create a hook with an empty record.
    pub fn new() -> Self {
        Self {
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// The recorded event names, in order.
    pub fn names(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }

    /// The number of events seen.
    pub fn count(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

impl Default for RecordingHook {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for RecordingHook {
    fn clone(&self) -> Self {
        Self {
            seen: self.seen.clone(),
        }
    }
}

impl LifecycleHook for RecordingHook {
    fn on_event(&self, event: &mut LifecycleEvent<'_>) -> HookResult {
        self.seen.lock().unwrap().push(event.name());
        HookResult::Next
    }
}

// ============================================================================
// Identity and input filter
// ============================================================================

/// A canned authenticated identity.
#[derive(Debug, Clone)]
pub struct StaticIdentity {
    id: String,
}

impl StaticIdentity {
    /// Create an identity with the given id.
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl Identity for StaticIdentity {
    fn id(&self) -> &str {
        &self.id
    }
}

/// An input filter declaring a fixed list of field names.
#[derive(Debug, Clone, Default)]
pub struct FieldsInputFilter {
    fields: Vec<String>,
}

impl FieldsInputFilter {
    /// Create a filter over the given field names.
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }
}

impl InputFilter for FieldsInputFilter {
    fn field_names(&self) -> Vec<String> {
        self.fields.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_hypermedia_renders_routes_params_and_query() {
        let builder = TestHypermedia::new();
        let link = Link::with_route("self", "api.widgets").param("id", "7");
        let rendered = builder.from_link(&link).unwrap();
        assert_eq!(rendered.href, "/api/widgets/7");

        let mut link = Link::with_route("self", "api.widgets");
        link.route_options_mut()
            .insert("query", json!({ "type": "blue", "page": 2 }));
        let rendered = builder.from_link(&link).unwrap();
        assert_eq!(rendered.href, "/api/widgets?type=blue&page=2");
    }

    #[test]
    fn in_memory_listener_round_trips_records() {
        let listener = InMemoryListener::with_records(vec![json!({ "id": "1", "name": "a" })]);
        let event = ResourceEvent::new(restbus_core::Operation::Fetch);

        match listener.fetch(&json!("1"), &event).unwrap() {
            Outcome::Value(value) => assert_eq!(value["name"], "a"),
            other => panic!("unexpected outcome {other:?}"),
        }
        match listener.fetch(&json!("2"), &event).unwrap() {
            Outcome::Bool(found) => assert!(!found),
            other => panic!("unexpected outcome {other:?}"),
        }

        listener
            .patch(&json!("1"), &json!({ "name": "b" }), &event)
            .unwrap();
        assert_eq!(listener.records()[0]["name"], "b");
    }
}
