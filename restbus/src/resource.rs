//! The event-emitting resource core.
//!
//! [`Resource`] translates typed CRUD-style calls into events, runs every
//! attached handler in registration order, and normalizes the last result
//! into a well-defined return shape. Business logic attaches either as a
//! whole [`ResourceListener`] or as per-operation handlers; cross-cutting
//! listeners attach through [`SharedHandlers`] keyed by resource identifier.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;

use restbus_core::{
    check_delete_list, coerce_record, coerce_record_list, Identity, InputFilter, Operation,
    Outcome, Parameters, Request, ResourceError, ResourceEvent, ResourceHandler, ResourceListener,
};

type HandlerMap = HashMap<Operation, Vec<Arc<dyn ResourceHandler>>>;

// ============================================================================
// Shared handler registry
// ============================================================================

/// Cross-cutting handlers shared between resources, keyed by identifier.
///
/// A resource carries a list of identifiers (its listener's type name plus
/// any configured aliases); at dispatch time the handlers registered under
/// each identifier run after the resource's own, in identifier order.
#[derive(Clone, Default)]
pub struct SharedHandlers {
    inner: Arc<Mutex<HashMap<String, HandlerMap>>>,
}

impl SharedHandlers {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn locked(&self) -> MutexGuard<'_, HashMap<String, HandlerMap>> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Register a handler for one operation under an identifier.
    pub fn attach(
        &self,
        identifier: impl Into<String>,
        operation: Operation,
        handler: Arc<dyn ResourceHandler>,
    ) {
        self.locked()
            .entry(identifier.into())
            .or_default()
            .entry(operation)
            .or_default()
            .push(handler);
    }

    /// Register a whole listener under an identifier, covering all nine
    /// operations.
    pub fn attach_listener(&self, identifier: impl Into<String>, listener: Arc<dyn ResourceListener>) {
        let identifier = identifier.into();
        for operation in Operation::ALL {
            let listener = Arc::clone(&listener);
            self.attach(
                identifier.clone(),
                operation,
                Arc::new(move |event: &ResourceEvent| listener.dispatch(event)),
            );
        }
    }

    fn handlers_for(&self, identifiers: &[String], operation: Operation) -> Vec<Arc<dyn ResourceHandler>> {
        let registry = self.locked();
        let mut handlers = Vec::new();
        for identifier in identifiers {
            if let Some(per_op) = registry.get(identifier) {
                if let Some(chain) = per_op.get(&operation) {
                    handlers.extend(chain.iter().cloned());
                }
            }
        }
        handlers
    }
}

impl fmt::Debug for SharedHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.locked();
        f.debug_struct("SharedHandlers")
            .field("identifiers", &registry.keys().collect::<Vec<_>>())
            .finish()
    }
}

// ============================================================================
// Resource
// ============================================================================

/// The event-emitting core of the dispatch layer.
///
/// Each operation method validates its input, fires the corresponding event
/// to every attached handler in registration order, and normalizes the final
/// result. A terminal [`Outcome`] (problem or prepared response) from any
/// handler short-circuits the chain and is returned untouched; otherwise the
/// last handler's return value is the one considered.
pub struct Resource {
    handlers: HandlerMap,
    shared: Option<SharedHandlers>,
    identifiers: Vec<String>,
    query_params: Parameters,
    route_match: Parameters,
    event_params: Parameters,
    identity: Option<Arc<dyn Identity>>,
    input_filter: Option<Arc<dyn InputFilter>>,
    request: Option<Arc<Request>>,
}

impl Resource {
    /// Create a resource with nothing attached.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            shared: None,
            identifiers: Vec::new(),
            query_params: Parameters::new(),
            route_match: Parameters::new(),
            event_params: Parameters::new(),
            identity: None,
            input_filter: None,
            request: None,
        }
    }

    // ------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------

    /// Attach a listener for all nine operations.
    pub fn attach(&mut self, listener: Arc<dyn ResourceListener>) {
        for operation in Operation::ALL {
            let listener = Arc::clone(&listener);
            self.attach_handler(
                operation,
                Arc::new(move |event: &ResourceEvent| listener.dispatch(event)),
            );
        }
    }

    /// Attach a handler for a single operation.
    pub fn attach_handler(&mut self, operation: Operation, handler: Arc<dyn ResourceHandler>) {
        self.handlers.entry(operation).or_default().push(handler);
    }

    /// Attach a closure for a single operation.
    pub fn on<F>(&mut self, operation: Operation, handler: F)
    where
        F: Fn(&ResourceEvent) -> Result<Outcome, ResourceError> + Send + Sync + 'static,
    {
        self.attach_handler(operation, Arc::new(handler));
    }

    /// Number of handlers attached directly for an operation.
    pub fn handler_count(&self, operation: Operation) -> usize {
        self.handlers.get(&operation).map_or(0, Vec::len)
    }

    /// Wire up the shared registry this resource consults at dispatch time.
    pub fn set_shared(&mut self, shared: SharedHandlers) {
        self.shared = Some(shared);
    }

    /// Identifiers under which shared handlers apply to this resource.
    pub fn identifiers(&self) -> &[String] {
        &self.identifiers
    }

    /// Append a shared-registry identifier.
    pub fn add_identifier(&mut self, identifier: impl Into<String>) {
        self.identifiers.push(identifier.into());
    }

    // ------------------------------------------------------------------
    // Dispatch context
    // ------------------------------------------------------------------

    /// The query-parameter bag copied onto each event.
    pub fn query_params(&self) -> &Parameters {
        &self.query_params
    }

    /// Mutable access to the query-parameter bag.
    pub fn query_params_mut(&mut self) -> &mut Parameters {
        &mut self.query_params
    }

    /// Replace the query-parameter bag.
    pub fn set_query_params(&mut self, params: Parameters) {
        self.query_params = params;
    }

    /// The route-match bag copied onto each event.
    pub fn route_match(&self) -> &Parameters {
        &self.route_match
    }

    /// Replace the route-match bag.
    pub fn set_route_match(&mut self, params: Parameters) {
        self.route_match = params;
    }

    /// Pre-seeded extra event parameters, merged under each operation's own.
    pub fn event_params(&self) -> &Parameters {
        &self.event_params
    }

    /// Seed one extra event parameter.
    pub fn set_event_param(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.event_params.insert(name, value);
    }

    /// Replace the pre-seeded event parameters.
    pub fn set_event_params(&mut self, params: Parameters) {
        self.event_params = params;
    }

    /// The identity attached to dispatched events, if any.
    pub fn identity(&self) -> Option<&Arc<dyn Identity>> {
        self.identity.as_ref()
    }

    /// Attach an identity.
    pub fn set_identity(&mut self, identity: Arc<dyn Identity>) {
        self.identity = Some(identity);
    }

    /// The input filter attached to dispatched events, if any.
    pub fn input_filter(&self) -> Option<&Arc<dyn InputFilter>> {
        self.input_filter.as_ref()
    }

    /// Attach an input filter.
    pub fn set_input_filter(&mut self, filter: Arc<dyn InputFilter>) {
        self.input_filter = Some(filter);
    }

    /// The raw request attached to dispatched events, if any.
    pub fn request(&self) -> Option<&Arc<Request>> {
        self.request.as_ref()
    }

    /// Attach the raw request.
    pub fn set_request(&mut self, request: Arc<Request>) {
        self.request = Some(request);
    }

    // ------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------

    /// Create a new entity.
    pub fn create(&self, data: Value) -> Result<Outcome, ResourceError> {
        let data = coerce_record(Operation::Create, data)?;
        let args = Parameters::from_iter([("data", data.clone())]);
        let outcome = self.trigger(Operation::Create, args)?;
        Ok(keep_record_shaped(outcome, data))
    }

    /// Replace the entity identified by `id`.
    pub fn update(&self, id: Value, data: Value) -> Result<Outcome, ResourceError> {
        let data = coerce_record(Operation::Update, data)?;
        let args = Parameters::from_iter([("id", id), ("data", data.clone())]);
        let outcome = self.trigger(Operation::Update, args)?;
        Ok(keep_record_shaped(outcome, data))
    }

    /// Replace the whole collection.
    pub fn replace_list(&self, data: Value) -> Result<Outcome, ResourceError> {
        let data = coerce_record_list(Operation::ReplaceList, data)?;
        let args = Parameters::from_iter([("data", data.clone())]);
        let outcome = self.trigger(Operation::ReplaceList, args)?;
        Ok(keep_record_shaped(outcome, data))
    }

    /// Apply a partial update to the entity identified by `id`.
    pub fn patch(&self, id: Value, data: Value) -> Result<Outcome, ResourceError> {
        let data = coerce_record(Operation::Patch, data)?;
        let args = Parameters::from_iter([("id", id), ("data", data.clone())]);
        let outcome = self.trigger(Operation::Patch, args)?;
        Ok(keep_record_shaped(outcome, data))
    }

    /// Apply partial updates to several entities at once.
    pub fn patch_list(&self, data: Value) -> Result<Outcome, ResourceError> {
        let data = coerce_record_list(Operation::PatchList, data)?;
        let args = Parameters::from_iter([("data", data.clone())]);
        let outcome = self.trigger(Operation::PatchList, args)?;
        Ok(keep_record_shaped(outcome, data))
    }

    /// Delete the entity identified by `id`.
    pub fn delete(&self, id: Value) -> Result<Outcome, ResourceError> {
        let args = Parameters::from_iter([("id", id)]);
        let outcome = self.trigger(Operation::Delete, args)?;
        Ok(keep_bool(outcome))
    }

    /// Delete the collection, or the items/ids listed in `data`.
    pub fn delete_list(&self, data: Option<Value>) -> Result<Outcome, ResourceError> {
        let data = check_delete_list(data)?;
        let args = Parameters::from_iter([("data", data.unwrap_or(Value::Null))]);
        let outcome = self.trigger(Operation::DeleteList, args)?;
        Ok(keep_bool(outcome))
    }

    /// Fetch the entity identified by `id`.
    pub fn fetch(&self, id: Value) -> Result<Outcome, ResourceError> {
        let args = Parameters::from_iter([("id", id)]);
        let outcome = self.trigger(Operation::Fetch, args)?;
        Ok(keep_entity_shaped(outcome))
    }

    /// Fetch the collection; query parameters ride on the event.
    pub fn fetch_all(&self) -> Result<Outcome, ResourceError> {
        let outcome = self.trigger(Operation::FetchAll, Parameters::new())?;
        Ok(keep_collection_shaped(outcome))
    }

    // ------------------------------------------------------------------
    // Dispatch mechanics
    // ------------------------------------------------------------------

    fn prepare_event(&self, operation: Operation, args: Parameters) -> ResourceEvent {
        let mut params = self.event_params.clone();
        params.merge(&args);
        let mut event = ResourceEvent::new(operation).with_params(params);
        event.set_query_params(self.query_params.clone());
        event.set_route_match(self.route_match.clone());
        if let Some(identity) = &self.identity {
            event.set_identity(Arc::clone(identity));
        }
        if let Some(filter) = &self.input_filter {
            event.set_input_filter(Arc::clone(filter));
        }
        if let Some(request) = &self.request {
            event.set_request(Arc::clone(request));
        }
        event
    }

    fn trigger(&self, operation: Operation, args: Parameters) -> Result<Outcome, ResourceError> {
        let event = self.prepare_event(operation, args);

        let mut chain: Vec<Arc<dyn ResourceHandler>> = self
            .handlers
            .get(&operation)
            .map(|handlers| handlers.to_vec())
            .unwrap_or_default();
        if let Some(shared) = &self.shared {
            chain.extend(shared.handlers_for(&self.identifiers, operation));
        }

        tracing::debug!(
            operation = event.name(),
            handlers = chain.len(),
            "dispatching resource event"
        );

        let mut last = Outcome::Pass;
        for handler in chain {
            let outcome = handler.handle(&event)?;
            if outcome.is_terminal() {
                tracing::debug!(
                    operation = event.name(),
                    outcome = outcome.kind(),
                    "dispatch short-circuited"
                );
                return Ok(outcome);
            }
            last = outcome;
        }
        Ok(last)
    }
}

impl Default for Resource {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let attached: usize = self.handlers.values().map(Vec::len).sum();
        f.debug_struct("Resource")
            .field("identifiers", &self.identifiers)
            .field("handlers", &attached)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Result normalization
// ============================================================================

fn keep_record_shaped(outcome: Outcome, fallback: Value) -> Outcome {
    match outcome {
        Outcome::Problem(_) | Outcome::Response(_) => outcome,
        Outcome::Entity(_) | Outcome::Collection(_) => outcome,
        Outcome::Value(value) if value.is_object() || value.is_array() => Outcome::Value(value),
        _ => Outcome::Value(fallback),
    }
}

fn keep_bool(outcome: Outcome) -> Outcome {
    match outcome {
        Outcome::Problem(_) | Outcome::Response(_) | Outcome::Bool(_) => outcome,
        _ => Outcome::Bool(false),
    }
}

fn keep_entity_shaped(outcome: Outcome) -> Outcome {
    match outcome {
        Outcome::Problem(_) | Outcome::Response(_) => outcome,
        Outcome::Entity(_) | Outcome::Collection(_) => outcome,
        Outcome::Value(value) if value.is_object() || value.is_array() => Outcome::Value(value),
        _ => Outcome::Bool(false),
    }
}

fn keep_collection_shaped(outcome: Outcome) -> Outcome {
    match outcome {
        Outcome::Problem(_) | Outcome::Response(_) => outcome,
        Outcome::Entity(_) | Outcome::Collection(_) => outcome,
        Outcome::Value(value) if value.is_object() || value.is_array() => Outcome::Value(value),
        _ => Outcome::Value(Value::Array(Vec::new())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use restbus_core::Problem;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn no_handlers_yields_the_documented_defaults() {
        let resource = Resource::new();

        match resource.create(json!({"name": "a"})).unwrap() {
            Outcome::Value(value) => assert_eq!(value, json!({"name": "a"})),
            other => panic!("unexpected outcome {other:?}"),
        }
        match resource.delete(json!(1)).unwrap() {
            Outcome::Bool(flag) => assert!(!flag),
            other => panic!("unexpected outcome {other:?}"),
        }
        match resource.fetch(json!(1)).unwrap() {
            Outcome::Bool(flag) => assert!(!flag),
            other => panic!("unexpected outcome {other:?}"),
        }
        match resource.fetch_all().unwrap() {
            Outcome::Value(value) => assert_eq!(value, json!([])),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn last_attached_handler_wins() {
        let mut resource = Resource::new();
        resource.on(Operation::Fetch, |_| Ok(json!({"from": "first"}).into()));
        resource.on(Operation::Fetch, |_| Ok(json!({"from": "second"}).into()));

        match resource.fetch(json!(1)).unwrap() {
            Outcome::Value(value) => assert_eq!(value, json!({"from": "second"})),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn terminal_outcome_stops_the_chain() {
        static CALLS: AtomicUsize = AtomicUsize::new(0);

        let mut resource = Resource::new();
        resource.on(Operation::Fetch, |_| {
            Ok(Problem::not_found("Entity not found.").into())
        });
        resource.on(Operation::Fetch, |_| {
            CALLS.fetch_add(1, Ordering::SeqCst);
            Ok(json!({"never": "seen"}).into())
        });

        match resource.fetch(json!(1)).unwrap() {
            Outcome::Problem(problem) => assert_eq!(problem.status(), 404),
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(CALLS.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn shared_handlers_run_after_own() {
        let shared = SharedHandlers::new();
        shared.attach(
            "widgets",
            Operation::Fetch,
            Arc::new(|_: &ResourceEvent| Ok(json!({"from": "shared"}).into())),
        );

        let mut resource = Resource::new();
        resource.on(Operation::Fetch, |_| Ok(json!({"from": "own"}).into()));
        resource.set_shared(shared);
        resource.add_identifier("widgets");

        match resource.fetch(json!(1)).unwrap() {
            Outcome::Value(value) => assert_eq!(value, json!({"from": "shared"})),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn events_carry_the_dispatch_context() {
        let mut resource = Resource::new();
        resource.set_query_params(Parameters::from_iter([("type", json!("widget"))]));
        resource.set_event_param("tenant", json!("acme"));
        resource.on(Operation::FetchAll, |event| {
            assert_eq!(event.query_param("type"), Some(&json!("widget")));
            assert_eq!(event.param("tenant"), Some(&json!("acme")));
            Ok(json!([{"id": 1}]).into())
        });

        match resource.fetch_all().unwrap() {
            Outcome::Value(value) => assert_eq!(value, json!([{"id": 1}])),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn invalid_payloads_error_before_dispatch() {
        static CALLS: AtomicUsize = AtomicUsize::new(0);

        let mut resource = Resource::new();
        resource.on(Operation::Create, |_| {
            CALLS.fetch_add(1, Ordering::SeqCst);
            Ok(Outcome::Pass)
        });

        let err = resource.create(json!("scalar")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Data provided to create must be either an array or object; received \"string\""
        );
        assert_eq!(CALLS.load(Ordering::SeqCst), 0);
    }
}
