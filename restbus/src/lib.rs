//! # restbus - Event-Driven REST Resource Dispatch
//!
//! `restbus` decouples RESTful controllers from persistence code by routing
//! the nine CRUD-style REST operations through an event dispatch layer.
//! Controllers never call a data layer directly: they trigger named
//! operations on a [`Resource`], listeners answer them, and the controller
//! normalizes whatever comes back into an entity, a collection, a problem
//! detail or a raw response.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use restbus::{ControllerConfig, ControllerFactory, RestConfig};
//! use restbus::{Outcome, ResourceError, ResourceEvent, ResourceListener};
//!
//! struct Widgets;
//!
//! impl ResourceListener for Widgets {
//!     fn fetch(&self, id: &Value, _event: &ResourceEvent) -> Result<Outcome, ResourceError> {
//!         Ok(json!({ "id": id, "name": "widget" }).into())
//!     }
//! }
//!
//! // Assemble a controller from configuration.
//! let mut config = RestConfig::new();
//! config.insert("api.widgets.rest", ControllerConfig::new("widgets", "api.widgets"));
//! let factory = ControllerFactory::new(config, hypermedia);
//! let mut controller = factory.build("api.widgets.rest", Widgets)?;
//!
//! // Per request: bind context, invoke the action matching the verb.
//! controller.bind(request, route_params, query_params);
//! let response = controller.get(json!("1"))?;
//! ```
//!
//! Unsupported operations answer `405 Method Not Allowed` out of the box;
//! listeners override only the verbs their resource supports.

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

mod config;
mod controller;
mod factory;
mod lifecycle;
mod methods;
mod resource;

pub mod testing;

pub use restbus_core::{
    // Problem output
    APPLICATION_PROBLEM_JSON,
    // Error types
    BoxError,
    // Hypermedia
    Collection,
    DomainError,
    Entity,
    HypermediaBuilder,
    HypermediaError,
    // Request context
    Identity,
    InputFilter,
    Link,
    LinkSet,
    // Operations
    Operation,
    Outcome,
    Parameters,
    ParseOperationError,
    Problem,
    RenderedLink,
    Request,
    ResourceError,
    // Events and listeners
    ResourceEvent,
    ResourceHandler,
    ResourceListener,
    Response,
};

pub use config::{ControllerConfig, OneOrMany, RestConfig};
pub use controller::{RestController, RestResponse};
pub use factory::ControllerFactory;
pub use lifecycle::{
    Action, HookResult, LifecycleEvent, LifecycleEvents, LifecycleHook, Phase,
    SharedLifecycleHooks,
};
pub use methods::MethodSet;
pub use resource::{Resource, SharedHandlers};

/// Prelude module - common imports for Restbus.
///
/// # Usage
///
/// ```rust,ignore
/// use restbus::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        // Lifecycle
        Action,
        Collection,
        ControllerFactory,
        Entity,
        HookResult,
        // Hypermedia
        HypermediaBuilder,
        LifecycleEvent,
        LifecycleHook,
        MethodSet,
        // Dispatch
        Operation,
        Outcome,
        Parameters,
        Phase,
        Problem,
        Resource,
        ResourceError,
        ResourceEvent,
        ResourceHandler,
        ResourceListener,
        // Orchestration
        RestController,
        RestResponse,
    };
}
