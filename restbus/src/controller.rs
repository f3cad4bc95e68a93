//! The HTTP-facing orchestration layer.
//!
//! [`RestController`] drives one request through a fixed sequence: pre-flight
//! configuration checks, the `<action>.pre` lifecycle event, the resource
//! call (with panic capture), result normalization into an entity, collection,
//! problem or raw response, and the `<action>.post` lifecycle event.
//!
//! # Failure handling
//!
//! Configuration failures (no resource, no route) surface as [`DomainError`]
//! and abort the action. Everything that goes wrong during the resource call,
//! panics included, converts to a [`Problem`] carrying the error's status
//! code when it lies in [100, 600), else 500. Pagination violations become
//! 400/416 problems before any hypermedia wrapping happens.
//!
//! # Response shapes
//!
//! Actions return [`RestResponse`]: a wrapped entity or collection plus
//! status and headers, a problem for the host's problem pipeline, or a raw
//! response relayed untouched. Rendering is the host framework's job.

use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use http::header::{HeaderValue, ALLOW, CONTENT_LOCATION, LOCATION};
use http::{HeaderMap, Method, StatusCode};
use serde_json::Value;

use restbus_core::{
    Collection, DomainError, Entity, HypermediaBuilder, Identity, InputFilter, Outcome,
    Parameters, Problem, Request, ResourceError, Response,
};

use crate::lifecycle::{Action, EventSlots, HookResult, LifecycleEvent, LifecycleEvents, Phase};
use crate::methods::MethodSet;
use crate::resource::Resource;

/// What a controller action hands back to the host framework.
#[derive(Debug)]
pub enum RestResponse {
    /// A wrapped entity plus response metadata.
    Entity {
        /// The hypermedia-wrapped entity.
        entity: Entity,
        /// Response status (201 on create with a self link, else 200).
        status: StatusCode,
        /// Extra headers (`Location`/`Content-Location` on create).
        headers: HeaderMap,
    },
    /// A wrapped collection plus response metadata.
    Collection {
        /// The hypermedia-wrapped collection.
        collection: Collection,
        /// Response status.
        status: StatusCode,
        /// Extra headers.
        headers: HeaderMap,
    },
    /// A problem for the host's problem-detail pipeline.
    Problem(Problem),
    /// A raw response relayed untouched.
    Response(Response),
}

impl RestResponse {
    /// The HTTP status this response will carry.
    pub fn status(&self) -> StatusCode {
        match self {
            RestResponse::Entity { status, .. } | RestResponse::Collection { status, .. } => *status,
            RestResponse::Problem(problem) => StatusCode::from_u16(problem.status())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            RestResponse::Response(response) => response.status(),
        }
    }

    /// The wrapped entity, when this is an entity response.
    pub fn as_entity(&self) -> Option<&Entity> {
        match self {
            RestResponse::Entity { entity, .. } => Some(entity),
            _ => None,
        }
    }

    /// The wrapped collection, when this is a collection response.
    pub fn as_collection(&self) -> Option<&Collection> {
        match self {
            RestResponse::Collection { collection, .. } => Some(collection),
            _ => None,
        }
    }

    /// The problem, when this is a problem response.
    pub fn as_problem(&self) -> Option<&Problem> {
        match self {
            RestResponse::Problem(problem) => Some(problem),
            _ => None,
        }
    }

    /// The raw response, when one is being relayed.
    pub fn as_response(&self) -> Option<&Response> {
        match self {
            RestResponse::Response(response) => Some(response),
            _ => None,
        }
    }

    /// Response headers, when this shape carries any.
    pub fn headers(&self) -> Option<&HeaderMap> {
        match self {
            RestResponse::Entity { headers, .. } | RestResponse::Collection { headers, .. } => {
                Some(headers)
            }
            RestResponse::Response(response) => Some(response.headers()),
            RestResponse::Problem(_) => None,
        }
    }
}

/// The per-resource REST orchestrator.
///
/// One controller serves one resource type. Configure it once at assembly
/// time (route, method sets, pagination policy), bind it to a request, then
/// invoke the action matching the HTTP verb.
pub struct RestController {
    resource: Option<Resource>,
    route: Option<String>,
    route_identifier_name: String,
    collection_name: String,
    collection_http_methods: MethodSet,
    entity_http_methods: MethodSet,
    page_size: i64,
    min_page_size: Option<i64>,
    max_page_size: Option<i64>,
    page_size_param: Option<String>,
    hypermedia: Arc<dyn HypermediaBuilder>,
    events: LifecycleEvents,
    query_params: Parameters,
    route_params: Parameters,
    identity: Option<Arc<dyn Identity>>,
    input_filter: Option<Arc<dyn InputFilter>>,
    request: Option<Arc<Request>>,
}

impl RestController {
    /// Create a controller with default configuration.
    pub fn new(hypermedia: Arc<dyn HypermediaBuilder>) -> Self {
        Self {
            resource: None,
            route: None,
            route_identifier_name: "id".to_string(),
            collection_name: "items".to_string(),
            collection_http_methods: MethodSet::collection_default(),
            entity_http_methods: MethodSet::entity_default(),
            page_size: 30,
            min_page_size: None,
            max_page_size: None,
            page_size_param: None,
            hypermedia,
            events: LifecycleEvents::new(),
            query_params: Parameters::new(),
            route_params: Parameters::new(),
            identity: None,
            input_filter: None,
            request: None,
        }
    }

    // ------------------------------------------------------------------
    // Assembly-time configuration
    // ------------------------------------------------------------------

    /// Compose the resource this controller dispatches through.
    pub fn set_resource(&mut self, resource: Resource) {
        self.resource = Some(resource);
    }

    /// The composed resource, if any.
    pub fn resource(&self) -> Option<&Resource> {
        self.resource.as_ref()
    }

    /// Mutable access to the composed resource.
    pub fn resource_mut(&mut self) -> Option<&mut Resource> {
        self.resource.as_mut()
    }

    /// Set the route name used when generating links.
    pub fn set_route(&mut self, route: impl Into<String>) {
        self.route = Some(route.into());
    }

    /// The composed route name, if any.
    pub fn route(&self) -> Option<&str> {
        self.route.as_deref()
    }

    /// Set the route parameter treated as the entity identifier.
    pub fn set_route_identifier_name(&mut self, name: impl Into<String>) {
        self.route_identifier_name = name.into();
    }

    /// The route parameter treated as the entity identifier.
    pub fn route_identifier_name(&self) -> &str {
        &self.route_identifier_name
    }

    /// Set the label for the embedded collection.
    pub fn set_collection_name(&mut self, name: impl Into<String>) {
        self.collection_name = name.into();
    }

    /// Set the allowed methods for collection routes.
    pub fn set_collection_http_methods(&mut self, methods: MethodSet) {
        self.collection_http_methods = methods;
    }

    /// The allowed methods for collection routes.
    pub fn collection_http_methods(&self) -> MethodSet {
        self.collection_http_methods
    }

    /// Set the allowed methods for entity routes.
    pub fn set_entity_http_methods(&mut self, methods: MethodSet) {
        self.entity_http_methods = methods;
    }

    /// The allowed methods for entity routes.
    pub fn entity_http_methods(&self) -> MethodSet {
        self.entity_http_methods
    }

    /// Set the default page size.
    pub fn set_page_size(&mut self, size: i64) {
        self.page_size = size;
    }

    /// The current page size (may have been overwritten from the query).
    pub fn page_size(&self) -> i64 {
        self.page_size
    }

    /// Set the minimum page size a client may request.
    pub fn set_min_page_size(&mut self, size: i64) {
        self.min_page_size = Some(size);
    }

    /// Set the maximum page size a client may request.
    pub fn set_max_page_size(&mut self, size: i64) {
        self.max_page_size = Some(size);
    }

    /// Set the query parameter that overrides the page size.
    pub fn set_page_size_param(&mut self, param: impl Into<String>) {
        self.page_size_param = Some(param.into());
    }

    /// The lifecycle hook registry.
    pub fn events(&self) -> &LifecycleEvents {
        &self.events
    }

    /// Mutable access to the lifecycle hook registry.
    pub fn events_mut(&mut self) -> &mut LifecycleEvents {
        &mut self.events
    }

    // ------------------------------------------------------------------
    // Per-request binding
    // ------------------------------------------------------------------

    /// Bind the controller to a request.
    ///
    /// Stores the request, route-match and query bags, and seeds the
    /// resource's dispatch context with them immediately.
    pub fn bind(&mut self, request: Request, route_params: Parameters, query_params: Parameters) {
        let request = Arc::new(request);
        if let Some(resource) = self.resource.as_mut() {
            resource.set_route_match(route_params.clone());
            resource.set_query_params(query_params.clone());
            resource.set_request(Arc::clone(&request));
        }
        self.request = Some(request);
        self.route_params = route_params;
        self.query_params = query_params;
    }

    /// Attach the authenticated identity for this request.
    pub fn set_identity(&mut self, identity: Arc<dyn Identity>) {
        self.identity = Some(identity);
    }

    /// Attach the input filter that validated this request's payload.
    pub fn set_input_filter(&mut self, filter: Arc<dyn InputFilter>) {
        self.input_filter = Some(filter);
    }

    /// The identifier resolved from the route-match parameters.
    ///
    /// Only the route match is consulted, never the query string; a missing
    /// or null parameter reads as absent.
    pub fn identifier(&self) -> Option<&Value> {
        match self.route_params.get(&self.route_identifier_name) {
            Some(Value::Null) | None => None,
            id => id,
        }
    }

    /// Check a request verb against the applicable allow-list.
    ///
    /// HEAD and OPTIONS are always available; any other verb outside the
    /// entity or collection set (picked by whether the route resolved an
    /// identifier) yields a 405 problem.
    pub fn verify_request_method(&self, method: &Method) -> Option<Problem> {
        if *method == Method::HEAD || *method == Method::OPTIONS {
            return None;
        }
        let allowed = if self.identifier().is_some() {
            self.entity_http_methods
        } else {
            self.collection_http_methods
        };
        if allowed.allows(method) {
            None
        } else {
            Some(Problem::method_not_allowed("Method Not Allowed"))
        }
    }

    // ------------------------------------------------------------------
    // Actions
    // ------------------------------------------------------------------

    /// Create a new entity (POST on the collection route).
    pub fn create(&mut self, data: Value) -> Result<RestResponse, DomainError> {
        self.ensure_ready()?;
        let slots = EventSlots {
            data: Some(&data),
            ..EventSlots::default()
        };
        if let Some(stop) = self.fire(Action::Create, Phase::Pre, slots) {
            return Ok(stop);
        }

        let value = match self.call(|resource| resource.create(data.clone()))? {
            Ok(outcome) => outcome,
            Err(error) => return Ok(RestResponse::Problem(problem_from_error(error))),
        };

        match value {
            Outcome::Problem(problem) => Ok(RestResponse::Problem(problem)),
            Outcome::Response(response) => Ok(RestResponse::Response(response)),
            Outcome::Collection(collection) => {
                let mut collection = match self.prepare_collection(collection) {
                    Ok(collection) => collection,
                    Err(problem) => return Ok(RestResponse::Problem(problem)),
                };
                let slots = EventSlots {
                    data: Some(&data),
                    collection: Some(&mut collection),
                    ..EventSlots::default()
                };
                self.fire(Action::Create, Phase::Post, slots);
                Ok(RestResponse::Collection {
                    collection,
                    status: StatusCode::OK,
                    headers: HeaderMap::new(),
                })
            }
            outcome => {
                let mut entity = self.wrap_entity(outcome);
                let mut status = StatusCode::OK;
                let mut headers = HeaderMap::new();

                if let Some(link) = entity.links().get("self") {
                    let rendered = match self.hypermedia.from_link(link) {
                        Ok(rendered) => rendered,
                        Err(error) => {
                            tracing::warn!(error = %error, "could not render the self link");
                            return Ok(RestResponse::Problem(Problem::internal_error(
                                error.to_string(),
                            )));
                        }
                    };
                    status = StatusCode::CREATED;
                    // Only the href goes into the headers; link props never leak.
                    if let Ok(value) = HeaderValue::from_str(&rendered.href) {
                        headers.insert(LOCATION, value.clone());
                        headers.insert(CONTENT_LOCATION, value);
                    }
                }

                let slots = EventSlots {
                    data: Some(&data),
                    entity: Some(&mut entity),
                    ..EventSlots::default()
                };
                self.fire(Action::Create, Phase::Post, slots);
                Ok(RestResponse::Entity {
                    entity,
                    status,
                    headers,
                })
            }
        }
    }

    /// Delete an entity (DELETE on the entity route).
    pub fn delete(&mut self, id: Value) -> Result<RestResponse, DomainError> {
        self.ensure_ready()?;
        let slots = EventSlots {
            id: Some(&id),
            ..EventSlots::default()
        };
        if let Some(stop) = self.fire(Action::Delete, Phase::Pre, slots) {
            return Ok(stop);
        }

        let result = match self.call(|resource| resource.delete(id.clone()))? {
            Ok(outcome) => outcome,
            Err(error) => return Ok(RestResponse::Problem(problem_from_error(error))),
        };

        match result {
            Outcome::Problem(problem) => Ok(RestResponse::Problem(problem)),
            Outcome::Response(response) => Ok(RestResponse::Response(response)),
            Outcome::Bool(false) => Ok(RestResponse::Problem(Problem::unprocessable_entity(
                "Unable to delete entity.",
            ))),
            _ => {
                let slots = EventSlots {
                    id: Some(&id),
                    ..EventSlots::default()
                };
                self.fire(Action::Delete, Phase::Post, slots);
                Ok(RestResponse::Response(empty_response(StatusCode::NO_CONTENT)))
            }
        }
    }

    /// Delete a collection, or the items/ids named in `data` (DELETE on the
    /// collection route).
    pub fn delete_list(&mut self, data: Option<Value>) -> Result<RestResponse, DomainError> {
        self.ensure_ready()?;
        if let Some(stop) = self.fire(Action::DeleteList, Phase::Pre, EventSlots::default()) {
            return Ok(stop);
        }

        let result = match self.call(|resource| resource.delete_list(data.clone()))? {
            Ok(outcome) => outcome,
            Err(error) => return Ok(RestResponse::Problem(problem_from_error(error))),
        };

        match result {
            Outcome::Problem(problem) => Ok(RestResponse::Problem(problem)),
            Outcome::Response(response) => Ok(RestResponse::Response(response)),
            Outcome::Bool(false) => Ok(RestResponse::Problem(Problem::unprocessable_entity(
                "Unable to delete collection.",
            ))),
            _ => {
                self.fire(Action::DeleteList, Phase::Post, EventSlots::default());
                Ok(RestResponse::Response(empty_response(StatusCode::NO_CONTENT)))
            }
        }
    }

    /// Fetch a single entity (GET on the entity route).
    pub fn get(&mut self, id: Value) -> Result<RestResponse, DomainError> {
        self.ensure_ready()?;
        let slots = EventSlots {
            id: Some(&id),
            ..EventSlots::default()
        };
        if let Some(stop) = self.fire(Action::Get, Phase::Pre, slots) {
            return Ok(stop);
        }

        let outcome = match self.call(|resource| resource.fetch(id.clone()))? {
            Ok(outcome) => outcome,
            Err(error) => return Ok(RestResponse::Problem(problem_from_error(error))),
        };

        let outcome = match outcome {
            Outcome::Problem(problem) => return Ok(RestResponse::Problem(problem)),
            Outcome::Response(response) => return Ok(RestResponse::Response(response)),
            Outcome::Bool(_) => {
                return Ok(RestResponse::Problem(Problem::not_found("Entity not found.")));
            }
            outcome => outcome,
        };

        let mut entity = self.wrap_entity(outcome);
        let slots = EventSlots {
            id: Some(&id),
            entity: Some(&mut entity),
            ..EventSlots::default()
        };
        self.fire(Action::Get, Phase::Post, slots);
        Ok(RestResponse::Entity {
            entity,
            status: StatusCode::OK,
            headers: HeaderMap::new(),
        })
    }

    /// Fetch the collection (GET on the collection route).
    pub fn get_list(&mut self) -> Result<RestResponse, DomainError> {
        self.ensure_ready()?;
        if let Some(stop) = self.fire(Action::GetList, Phase::Pre, EventSlots::default()) {
            return Ok(stop);
        }

        let outcome = match self.call(|resource| resource.fetch_all())? {
            Ok(outcome) => outcome,
            Err(error) => return Ok(RestResponse::Problem(problem_from_error(error))),
        };

        let outcome = match outcome {
            Outcome::Problem(problem) => return Ok(RestResponse::Problem(problem)),
            Outcome::Response(response) => return Ok(RestResponse::Response(response)),
            // An entity-shaped list result wraps as a single entity.
            Outcome::Entity(_) => {
                let mut entity = self.wrap_entity(outcome);
                let slots = EventSlots {
                    entity: Some(&mut entity),
                    ..EventSlots::default()
                };
                self.fire(Action::GetList, Phase::Post, slots);
                return Ok(RestResponse::Entity {
                    entity,
                    status: StatusCode::OK,
                    headers: HeaderMap::new(),
                });
            }
            Outcome::Value(value) if value.is_object() => {
                let mut entity = self.wrap_entity(Outcome::Value(value));
                let slots = EventSlots {
                    entity: Some(&mut entity),
                    ..EventSlots::default()
                };
                self.fire(Action::GetList, Phase::Post, slots);
                return Ok(RestResponse::Entity {
                    entity,
                    status: StatusCode::OK,
                    headers: HeaderMap::new(),
                });
            }
            outcome => outcome,
        };

        if let Some(problem) = self.resolve_page_size() {
            return Ok(problem);
        }

        let mut collection = match self.wrap_collection(outcome) {
            Ok(collection) => collection,
            Err(problem) => return Ok(RestResponse::Problem(problem)),
        };
        let slots = EventSlots {
            collection: Some(&mut collection),
            ..EventSlots::default()
        };
        self.fire(Action::GetList, Phase::Post, slots);
        Ok(RestResponse::Collection {
            collection,
            status: StatusCode::OK,
            headers: HeaderMap::new(),
        })
    }

    /// HEAD metadata for an entity or the collection.
    ///
    /// Delegates to [`get`](Self::get) or [`get_list`](Self::get_list);
    /// stripping the body is the host's job.
    pub fn head(&mut self, id: Option<Value>) -> Result<RestResponse, DomainError> {
        match id {
            Some(id) => self.get(id),
            None => self.get_list(),
        }
    }

    /// Report the allowed methods (OPTIONS on either route).
    pub fn options(&mut self) -> Result<RestResponse, DomainError> {
        self.ensure_ready()?;
        let methods = if self.identifier().is_some() {
            self.entity_http_methods
        } else {
            self.collection_http_methods
        };

        let slots = EventSlots {
            methods: Some(&methods),
            ..EventSlots::default()
        };
        if let Some(stop) = self.fire(Action::Options, Phase::Pre, slots) {
            return Ok(stop);
        }

        let mut response = empty_response(StatusCode::NO_CONTENT);
        if let Ok(value) = HeaderValue::from_str(&methods.allow_header()) {
            response.headers_mut().insert(ALLOW, value);
        }

        let slots = EventSlots {
            methods: Some(&methods),
            ..EventSlots::default()
        };
        self.fire(Action::Options, Phase::Post, slots);
        Ok(RestResponse::Response(response))
    }

    /// Partially update an entity (PATCH on the entity route).
    pub fn patch(&mut self, id: Value, data: Value) -> Result<RestResponse, DomainError> {
        self.ensure_ready()?;
        let slots = EventSlots {
            id: Some(&id),
            data: Some(&data),
            ..EventSlots::default()
        };
        if let Some(stop) = self.fire(Action::Patch, Phase::Pre, slots) {
            return Ok(stop);
        }

        let outcome = match self.call(|resource| resource.patch(id.clone(), data.clone()))? {
            Ok(outcome) => outcome,
            Err(error) => return Ok(RestResponse::Problem(problem_from_error(error))),
        };

        match outcome {
            Outcome::Problem(problem) => Ok(RestResponse::Problem(problem)),
            Outcome::Response(response) => Ok(RestResponse::Response(response)),
            outcome => {
                let mut entity = self.wrap_entity(outcome);
                let slots = EventSlots {
                    id: Some(&id),
                    data: Some(&data),
                    entity: Some(&mut entity),
                    ..EventSlots::default()
                };
                self.fire(Action::Patch, Phase::Post, slots);
                Ok(RestResponse::Entity {
                    entity,
                    status: StatusCode::OK,
                    headers: HeaderMap::new(),
                })
            }
        }
    }

    /// Partially update several entities at once (PATCH on the collection
    /// route).
    pub fn patch_list(&mut self, data: Value) -> Result<RestResponse, DomainError> {
        self.ensure_ready()?;
        let slots = EventSlots {
            data: Some(&data),
            ..EventSlots::default()
        };
        if let Some(stop) = self.fire(Action::PatchList, Phase::Pre, slots) {
            return Ok(stop);
        }

        let outcome = match self.call(|resource| resource.patch_list(data.clone()))? {
            Ok(outcome) => outcome,
            Err(error) => return Ok(RestResponse::Problem(problem_from_error(error))),
        };

        self.finish_collection_action(Action::PatchList, &data, outcome)
    }

    /// Replace an entity (PUT on the entity route).
    pub fn update(&mut self, id: Value, data: Value) -> Result<RestResponse, DomainError> {
        self.ensure_ready()?;
        let slots = EventSlots {
            id: Some(&id),
            data: Some(&data),
            ..EventSlots::default()
        };
        if let Some(stop) = self.fire(Action::Update, Phase::Pre, slots) {
            return Ok(stop);
        }

        let outcome = match self.call(|resource| resource.update(id.clone(), data.clone()))? {
            Ok(outcome) => outcome,
            Err(error) => return Ok(RestResponse::Problem(problem_from_error(error))),
        };

        match outcome {
            Outcome::Problem(problem) => Ok(RestResponse::Problem(problem)),
            Outcome::Response(response) => Ok(RestResponse::Response(response)),
            outcome => {
                let mut entity = self.wrap_entity(outcome);
                let slots = EventSlots {
                    id: Some(&id),
                    data: Some(&data),
                    entity: Some(&mut entity),
                    ..EventSlots::default()
                };
                self.fire(Action::Update, Phase::Post, slots);
                Ok(RestResponse::Entity {
                    entity,
                    status: StatusCode::OK,
                    headers: HeaderMap::new(),
                })
            }
        }
    }

    /// Replace the whole collection (PUT on the collection route).
    pub fn replace_list(&mut self, data: Value) -> Result<RestResponse, DomainError> {
        self.ensure_ready()?;
        let slots = EventSlots {
            data: Some(&data),
            ..EventSlots::default()
        };
        if let Some(stop) = self.fire(Action::ReplaceList, Phase::Pre, slots) {
            return Ok(stop);
        }

        let outcome = match self.call(|resource| resource.replace_list(data.clone()))? {
            Ok(outcome) => outcome,
            Err(error) => return Ok(RestResponse::Problem(problem_from_error(error))),
        };

        self.finish_collection_action(Action::ReplaceList, &data, outcome)
    }

    // ------------------------------------------------------------------
    // Plumbing
    // ------------------------------------------------------------------

    fn ensure_ready(&mut self) -> Result<(), DomainError> {
        if self.resource.is_none() {
            return Err(DomainError::MissingResource);
        }
        if self.route.is_none() {
            return Err(DomainError::MissingRoute);
        }
        let Some(resource) = self.resource.as_mut() else {
            return Err(DomainError::MissingResource);
        };
        if resource.identity().is_none() {
            if let Some(identity) = &self.identity {
                resource.set_identity(Arc::clone(identity));
            }
        }
        if resource.input_filter().is_none() {
            if let Some(filter) = &self.input_filter {
                resource.set_input_filter(Arc::clone(filter));
            }
        }
        if let Some(request) = &self.request {
            resource.set_request(Arc::clone(request));
        }
        Ok(())
    }

    fn call<F>(&self, call: F) -> Result<Result<Outcome, ResourceError>, DomainError>
    where
        F: FnOnce(&Resource) -> Result<Outcome, ResourceError>,
    {
        let Some(resource) = self.resource.as_ref() else {
            return Err(DomainError::MissingResource);
        };
        Ok(catch_panics(|| call(resource)))
    }

    fn fire(&mut self, action: Action, phase: Phase, slots: EventSlots<'_>) -> Option<RestResponse> {
        let hooks = self.events.hooks_for(action, phase);
        if hooks.is_empty() {
            return None;
        }
        let resource = self.resource.as_mut()?;
        let mut event = LifecycleEvent::new(action, phase, slots, resource, &self.query_params);
        for hook in hooks {
            match hook.on_event(&mut event) {
                HookResult::Next => {}
                HookResult::Stop(outcome) if phase == Phase::Pre => {
                    tracing::debug!(
                        action = action.as_str(),
                        outcome = outcome.kind(),
                        "lifecycle hook short-circuited the action"
                    );
                    match outcome {
                        Outcome::Problem(problem) => return Some(RestResponse::Problem(problem)),
                        Outcome::Response(response) => {
                            return Some(RestResponse::Response(response));
                        }
                        _ => {}
                    }
                }
                HookResult::Stop(_) => {}
            }
        }
        None
    }

    fn finish_collection_action(
        &mut self,
        action: Action,
        data: &Value,
        outcome: Outcome,
    ) -> Result<RestResponse, DomainError> {
        match outcome {
            Outcome::Problem(problem) => Ok(RestResponse::Problem(problem)),
            Outcome::Response(response) => Ok(RestResponse::Response(response)),
            outcome => {
                let mut collection = match self.wrap_collection(outcome) {
                    Ok(collection) => collection,
                    Err(problem) => return Ok(RestResponse::Problem(problem)),
                };
                let slots = EventSlots {
                    data: Some(data),
                    collection: Some(&mut collection),
                    ..EventSlots::default()
                };
                self.fire(action, Phase::Post, slots);
                Ok(RestResponse::Collection {
                    collection,
                    status: StatusCode::OK,
                    headers: HeaderMap::new(),
                })
            }
        }
    }

    fn route_str(&self) -> &str {
        self.route.as_deref().unwrap_or("")
    }

    fn wrap_entity(&self, outcome: Outcome) -> Entity {
        let route = self.route_str();
        match outcome {
            Outcome::Entity(entity) if entity.links().has("self") || entity.id().is_none() => {
                entity
            }
            Outcome::Entity(entity) => self.hypermedia.create_entity(
                entity.into_value(),
                route,
                &self.route_identifier_name,
            ),
            Outcome::Collection(collection) => self.hypermedia.create_entity(
                collection.into_items(),
                route,
                &self.route_identifier_name,
            ),
            Outcome::Value(value) => {
                self.hypermedia
                    .create_entity(value, route, &self.route_identifier_name)
            }
            Outcome::Bool(flag) => self.hypermedia.create_entity(
                Value::Bool(flag),
                route,
                &self.route_identifier_name,
            ),
            Outcome::Pass | Outcome::Problem(_) | Outcome::Response(_) => {
                self.hypermedia
                    .create_entity(Value::Null, route, &self.route_identifier_name)
            }
        }
    }

    fn wrap_collection(&self, outcome: Outcome) -> Result<Collection, Problem> {
        let route = self.route_str();
        let collection = match outcome {
            Outcome::Collection(collection) => collection,
            Outcome::Value(value) => self.hypermedia.create_collection(value, route),
            Outcome::Entity(entity) => {
                self.hypermedia.create_collection(entity.into_value(), route)
            }
            Outcome::Bool(flag) => self.hypermedia.create_collection(Value::Bool(flag), route),
            Outcome::Pass | Outcome::Problem(_) | Outcome::Response(_) => {
                self.hypermedia.create_collection(Value::Null, route)
            }
        };
        self.prepare_collection(collection)
    }

    /// Stamp route, identifier, naming and pagination metadata onto a
    /// collection. Page and page-size violations surface as 400 problems.
    fn prepare_collection(&self, mut collection: Collection) -> Result<Collection, Problem> {
        let route = self.route_str();
        if !collection.links().has("self") {
            self.hypermedia.inject_self_link(collection.links_mut(), route);
        }

        collection.set_collection_route(route);
        collection.set_route_identifier_name(self.route_identifier_name.clone());
        collection.set_entity_route(route);
        collection.set_collection_name(self.collection_name.clone());

        if let Err(error) = collection.set_page_size(self.page_size) {
            return Err(Problem::bad_request(error.to_string()));
        }
        let page = self
            .query_params
            .get("page")
            .cloned()
            .unwrap_or_else(|| Value::from(1));
        if let Err(error) = collection.set_page(&page) {
            return Err(Problem::bad_request(error.to_string()));
        }

        Ok(collection)
    }

    /// Resolve the effective page size and enforce the [min, max] bounds.
    ///
    /// The resolved size is persisted on the controller so collection
    /// preparation picks it up. Non-numeric query values coerce to zero and
    /// are rejected by the collection setter with a 400.
    fn resolve_page_size(&mut self) -> Option<RestResponse> {
        let requested = match &self.page_size_param {
            Some(param) => match self.query_params.get(param) {
                Some(value) => parse_size(value),
                None => Some(self.page_size),
            },
            None => Some(self.page_size),
        };

        match requested {
            Some(size) => {
                if let Some(min) = self.min_page_size {
                    if size < min {
                        return Some(RestResponse::Problem(Problem::range_not_satisfiable(
                            format!("Page size is out of range, minimum page size is {min}"),
                        )));
                    }
                }
                if let Some(max) = self.max_page_size {
                    if size > max {
                        return Some(RestResponse::Problem(Problem::range_not_satisfiable(
                            format!("Page size is out of range, maximum page size is {max}"),
                        )));
                    }
                }
                self.page_size = size;
            }
            None => {
                self.page_size = 0;
            }
        }
        None
    }
}

impl fmt::Debug for RestController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestController")
            .field("route", &self.route)
            .field("resource", &self.resource)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Free helpers
// ============================================================================

fn empty_response(status: StatusCode) -> Response {
    let mut response = Response::new(Vec::new());
    *response.status_mut() = status;
    response
}

fn parse_size(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn problem_from_error(error: ResourceError) -> Problem {
    let status = match error.status() {
        Some(code) if (100..600).contains(&code) => code,
        _ => 500,
    };
    if matches!(error, ResourceError::Panic(_)) {
        tracing::error!(error = %error, "resource call panicked");
    } else {
        tracing::warn!(error = %error, status, "resource call failed");
    }
    Problem::new(status, error.to_string())
}

fn catch_panics<F>(call: F) -> Result<Outcome, ResourceError>
where
    F: FnOnce() -> Result<Outcome, ResourceError>,
{
    match catch_unwind(AssertUnwindSafe(call)) {
        Ok(result) => result,
        Err(payload) => Err(ResourceError::Panic(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "opaque panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use restbus_core::{HypermediaError, Link, LinkSet, Operation, RenderedLink};
    use serde_json::{json, Map};

    struct NullHypermedia;

    impl HypermediaBuilder for NullHypermedia {
        fn create_entity(&self, value: Value, _route: &str, _identifier: &str) -> Entity {
            Entity::new(value)
        }

        fn create_collection(&self, items: Value, _route: &str) -> Collection {
            Collection::new(items)
        }

        fn inject_self_link(&self, links: &mut LinkSet, route: &str) {
            links.add(Link::with_route("self", route));
        }

        fn from_link(&self, link: &Link) -> Result<RenderedLink, HypermediaError> {
            Ok(RenderedLink {
                href: format!("/{}", link.route().unwrap_or("")),
                props: Map::new(),
            })
        }
    }

    fn controller() -> RestController {
        let mut controller = RestController::new(Arc::new(NullHypermedia));
        controller.set_resource(Resource::new());
        controller.set_route("api.widgets");
        controller
    }

    #[test]
    fn missing_resource_is_a_domain_error() {
        let mut controller = RestController::new(Arc::new(NullHypermedia));
        controller.set_route("api.widgets");
        let err = controller.get(json!(1)).unwrap_err();
        assert_eq!(err.to_string(), "no resource has been set");
    }

    #[test]
    fn error_status_codes_map_into_problems() {
        let problem = problem_from_error(ResourceError::failure(409, "conflict"));
        assert_eq!(problem.status(), 409);

        let problem = problem_from_error(ResourceError::failure(999, "weird"));
        assert_eq!(problem.status(), 500);

        let problem = problem_from_error(ResourceError::invalid_argument("bad shape"));
        assert_eq!(problem.status(), 400);

        let problem = problem_from_error(ResourceError::other("boom"));
        assert_eq!(problem.status(), 500);
    }

    #[test]
    fn panics_during_dispatch_become_500_problems() {
        let mut controller = controller();
        if let Some(resource) = controller.resource_mut() {
            resource.on(Operation::Fetch, |_| panic!("listener exploded"));
        }

        let response = controller.get(json!(1)).unwrap();
        let problem = response.as_problem().unwrap();
        assert_eq!(problem.status(), 500);
        assert!(problem.detail().contains("listener exploded"));
    }

    #[test]
    fn identifier_ignores_the_query_string() {
        let mut controller = controller();
        controller.bind(
            Request::new(Vec::new()),
            Parameters::from_iter([("id", json!("7"))]),
            Parameters::from_iter([("id", json!("9"))]),
        );
        assert_eq!(controller.identifier(), Some(&json!("7")));

        controller.bind(
            Request::new(Vec::new()),
            Parameters::new(),
            Parameters::from_iter([("id", json!("9"))]),
        );
        assert_eq!(controller.identifier(), None);
    }

    #[test]
    fn head_and_options_verbs_are_always_allowed() {
        let controller = controller();
        assert!(controller.verify_request_method(&Method::HEAD).is_none());
        assert!(controller.verify_request_method(&Method::OPTIONS).is_none());
        // No identifier bound: the collection set (GET, POST) applies.
        assert!(controller.verify_request_method(&Method::GET).is_none());
        let problem = controller.verify_request_method(&Method::PUT).unwrap();
        assert_eq!(problem.status(), 405);
    }
}
