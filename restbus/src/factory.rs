//! Controller assembly from configuration.
//!
//! [`ControllerFactory`] turns a configuration section plus a concrete
//! listener into a fully wired [`RestController`]: resource identifiers,
//! shared registries, method sets, pagination policy and the collection
//! query whitelist hooks.

use std::any::type_name;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;

use restbus_core::{DomainError, HypermediaBuilder, Parameters, ResourceListener};

use crate::config::{ControllerConfig, RestConfig};
use crate::controller::RestController;
use crate::lifecycle::{Action, HookResult, LifecycleEvent, Phase, SharedLifecycleHooks};
use crate::methods::MethodSet;
use crate::resource::{Resource, SharedHandlers};

/// Builds configured controllers.
///
/// The factory owns the configuration map and the hypermedia builder every
/// controller shares. Shared handler and hook registries are optional; when
/// present they are wired into every controller built here.
pub struct ControllerFactory {
    config: RestConfig,
    hypermedia: Arc<dyn HypermediaBuilder>,
    shared_handlers: Option<SharedHandlers>,
    shared_hooks: Option<SharedLifecycleHooks>,
    lookup_cache: Mutex<HashMap<String, bool>>,
}

impl ControllerFactory {
    /// Create a factory over a configuration map.
    pub fn new(config: RestConfig, hypermedia: Arc<dyn HypermediaBuilder>) -> Self {
        Self {
            config,
            hypermedia,
            shared_handlers: None,
            shared_hooks: None,
            lookup_cache: Mutex::new(HashMap::new()),
        }
    }

    /// Wire a shared handler registry into every controller built here.
    pub fn with_shared_handlers(mut self, shared: SharedHandlers) -> Self {
        self.shared_handlers = Some(shared);
        self
    }

    /// Wire a shared lifecycle hook registry into every controller built
    /// here.
    pub fn with_shared_hooks(mut self, shared: SharedLifecycleHooks) -> Self {
        self.shared_hooks = Some(shared);
        self
    }

    fn cache(&self) -> MutexGuard<'_, HashMap<String, bool>> {
        match self.lookup_cache.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Whether a controller can be built under this name.
    ///
    /// True iff a configuration section exists carrying both `listener` and
    /// `route_name`. Lookups are memoized for the factory's lifetime.
    pub fn can_create(&self, name: &str) -> bool {
        if let Some(known) = self.cache().get(name) {
            return *known;
        }
        let known = self
            .config
            .controller(name)
            .map(ControllerConfig::is_complete)
            .unwrap_or(false);
        self.cache().insert(name.to_string(), known);
        known
    }

    /// Build the controller configured under `name`, dispatching to
    /// `listener`.
    ///
    /// The concrete listener type name leads the resource's identifier list
    /// so shared handlers can target it; configured `resource_identifiers`
    /// follow. Configuration problems (missing section, missing required
    /// keys, unknown HTTP verbs) are [`DomainError::InvalidConfig`].
    pub fn build<L>(&self, name: &str, listener: L) -> Result<RestController, DomainError>
    where
        L: ResourceListener + 'static,
    {
        let Some(config) = self.config.controller(name) else {
            return Err(DomainError::InvalidConfig(format!(
                "no configuration for controller \"{name}\""
            )));
        };
        if !config.is_complete() {
            return Err(DomainError::InvalidConfig(format!(
                "controller \"{name}\" requires both \"listener\" and \"route_name\""
            )));
        }

        let mut resource = Resource::new();
        resource.add_identifier(type_name::<L>());
        if let Some(identifiers) = &config.resource_identifiers {
            for identifier in identifiers.iter() {
                resource.add_identifier(identifier);
            }
        }
        resource.attach(Arc::new(listener));
        if let Some(shared) = &self.shared_handlers {
            resource.set_shared(shared.clone());
        }

        let mut controller = RestController::new(Arc::clone(&self.hypermedia));
        match &config.identifier {
            Some(identifiers) => {
                for identifier in identifiers.iter() {
                    controller.events_mut().add_identifier(identifier);
                }
            }
            None => controller.events_mut().add_identifier(name),
        }
        if let Some(shared) = &self.shared_hooks {
            controller.events_mut().set_shared(shared.clone());
        }

        controller.set_resource(resource);
        apply_options(config, &mut controller)?;

        tracing::debug!(controller = name, "assembled REST controller");
        Ok(controller)
    }
}

impl fmt::Debug for ControllerFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerFactory")
            .field("controllers", &self.config.controllers.len())
            .finish_non_exhaustive()
    }
}

fn apply_options(
    config: &ControllerConfig,
    controller: &mut RestController,
) -> Result<(), DomainError> {
    if let Some(route) = &config.route_name {
        controller.set_route(route.clone());
    }
    controller.set_route_identifier_name(config.route_identifier_name.clone());
    controller.set_collection_name(config.collection_name.clone());
    controller.set_collection_http_methods(MethodSet::from_verbs(&config.collection_http_methods)?);
    controller.set_entity_http_methods(MethodSet::from_verbs(&config.entity_http_methods)?);
    controller.set_page_size(config.page_size);
    if let Some(min) = config.min_page_size {
        controller.set_min_page_size(min);
    }
    if let Some(max) = config.max_page_size {
        controller.set_max_page_size(max);
    }
    if let Some(param) = &config.page_size_param {
        controller.set_page_size_param(param.clone());
    }

    let whitelist = config.collection_query_whitelist.clone().into_vec();
    if !whitelist.is_empty() {
        attach_whitelist_hooks(controller, whitelist);
    }
    Ok(())
}

/// Wire the collection query whitelist around the list fetch.
///
/// Before the fetch, the resource's query bag is narrowed to the whitelist
/// (widened by any field names a composed input filter declares). After it,
/// the surviving parameters are copied into the collection's route options
/// under `query`, and merged into a route-based self link, so pagination
/// links keep the filtered query string.
fn attach_whitelist_hooks(controller: &mut RestController, whitelist: Vec<String>) {
    let allowed_base = whitelist;

    controller
        .events_mut()
        .on(Action::GetList, Phase::Pre, move |event: &mut LifecycleEvent<'_>| {
            let mut allowed = allowed_base.clone();
            if let Some(filter) = event.resource().input_filter() {
                for field in filter.field_names() {
                    if !allowed.contains(&field) {
                        allowed.push(field);
                    }
                }
            }

            let mut params = Parameters::new();
            for (key, value) in event.query().iter() {
                if allowed.iter().any(|name| name == key) {
                    params.insert(key.clone(), value.clone());
                }
            }
            event.resource_mut().set_query_params(params);
            HookResult::Next
        });

    controller
        .events_mut()
        .on(Action::GetList, Phase::Post, move |event: &mut LifecycleEvent<'_>| {
            // The pre hook already narrowed the resource's bag.
            let params = event.resource().query_params().clone();
            let Some(collection) = event.collection_mut() else {
                return HookResult::Next;
            };

            let mut options = Parameters::new();
            options.insert("query", Value::Object(params.clone().into_map()));
            collection.set_collection_route_options(options);

            let Some(self_link) = collection.links_mut().get_mut("self") else {
                return HookResult::Next;
            };
            if self_link.route().is_none() {
                return HookResult::Next;
            }
            self_link
                .route_options_mut()
                .insert("query", Value::Object(params.into_map()));
            HookResult::Next
        });
}
