//! The event handed to resource listeners.

use std::sync::Arc;

use serde_json::Value;

use crate::context::{Identity, InputFilter, Request};
use crate::operation::Operation;
use crate::params::Parameters;

static NULL: Value = Value::Null;

/// Everything a resource listener may consult while handling an operation.
///
/// The operation arguments (`data`, `id`) travel in [`params`](Self::params);
/// request context captured by the dispatcher (query string, route match,
/// authenticated identity, input filter, raw request) rides alongside so
/// listeners can reach it without holding framework state themselves.
#[derive(Debug, Clone)]
pub struct ResourceEvent {
    operation: Operation,
    params: Parameters,
    query_params: Parameters,
    route_match: Parameters,
    identity: Option<Arc<dyn Identity>>,
    input_filter: Option<Arc<dyn InputFilter>>,
    request: Option<Arc<Request>>,
}

impl ResourceEvent {
    /// Create an event for an operation with no arguments yet.
    pub fn new(operation: Operation) -> Self {
        Self {
            operation,
            params: Parameters::new(),
            query_params: Parameters::new(),
            route_match: Parameters::new(),
            identity: None,
            input_filter: None,
            request: None,
        }
    }

    /// Attach operation arguments, replacing any already present.
    pub fn with_params(mut self, params: Parameters) -> Self {
        self.params = params;
        self
    }

    /// The operation being dispatched.
    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// The operation's wire name.
    pub fn name(&self) -> &'static str {
        self.operation.as_str()
    }

    /// The operation arguments.
    pub fn params(&self) -> &Parameters {
        &self.params
    }

    /// Mutable access to the operation arguments.
    pub fn params_mut(&mut self) -> &mut Parameters {
        &mut self.params
    }

    /// Look up an operation argument.
    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    /// Look up an operation argument, yielding JSON null when absent.
    pub fn param_or_null(&self, name: &str) -> &Value {
        self.params.get(name).unwrap_or(&NULL)
    }

    /// The `id` argument, when the operation carries one.
    pub fn id(&self) -> Option<&Value> {
        self.params.get("id")
    }

    /// The `data` argument, JSON null when absent.
    pub fn data(&self) -> &Value {
        self.param_or_null("data")
    }

    /// Query-string parameters captured from the request.
    pub fn query_params(&self) -> &Parameters {
        &self.query_params
    }

    /// Replace the query-string parameters.
    pub fn set_query_params(&mut self, params: Parameters) {
        self.query_params = params;
    }

    /// Look up a single query parameter.
    pub fn query_param(&self, name: &str) -> Option<&Value> {
        self.query_params.get(name)
    }

    /// Parameters matched from the route.
    pub fn route_match(&self) -> &Parameters {
        &self.route_match
    }

    /// Replace the route-match parameters.
    pub fn set_route_match(&mut self, params: Parameters) {
        self.route_match = params;
    }

    /// Look up a single route-match parameter.
    pub fn route_param(&self, name: &str) -> Option<&Value> {
        self.route_match.get(name)
    }

    /// The authenticated identity, if the dispatcher attached one.
    pub fn identity(&self) -> Option<&Arc<dyn Identity>> {
        self.identity.as_ref()
    }

    /// Attach an authenticated identity.
    pub fn set_identity(&mut self, identity: Arc<dyn Identity>) {
        self.identity = Some(identity);
    }

    /// The input filter that validated the payload, if any.
    pub fn input_filter(&self) -> Option<&Arc<dyn InputFilter>> {
        self.input_filter.as_ref()
    }

    /// Attach an input filter.
    pub fn set_input_filter(&mut self, filter: Arc<dyn InputFilter>) {
        self.input_filter = Some(filter);
    }

    /// The raw request being served, if the dispatcher attached it.
    pub fn request(&self) -> Option<&Arc<Request>> {
        self.request.as_ref()
    }

    /// Attach the raw request.
    pub fn set_request(&mut self, request: Arc<Request>) {
        self.request = Some(request);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn params_fall_back_to_null() {
        let event = ResourceEvent::new(Operation::Fetch)
            .with_params(Parameters::from_iter([("id", json!(7))]));
        assert_eq!(event.id(), Some(&json!(7)));
        assert_eq!(event.data(), &Value::Null);
        assert_eq!(event.param_or_null("missing"), &Value::Null);
    }

    #[test]
    fn context_rides_alongside_arguments() {
        let mut event = ResourceEvent::new(Operation::FetchAll);
        event.set_query_params(Parameters::from_iter([("type", json!("widget"))]));
        event.set_route_match(Parameters::from_iter([("id", json!("42"))]));

        assert_eq!(event.query_param("type"), Some(&json!("widget")));
        assert_eq!(event.route_param("id"), Some(&json!("42")));
        assert_eq!(event.name(), "fetchAll");
    }
}
