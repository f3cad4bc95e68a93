//! Assembly-time configuration shapes.
//!
//! Configuration is a map of controller service names to per-controller
//! sections. A section names the resource listener component and the route,
//! and optionally overrides method sets, naming, pagination policy and event
//! identifiers. Unknown keys are ignored so the map can live inside a larger
//! application config document.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One name or several.
///
/// Accepts both `"name"` and `["name", "other"]` in configuration documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    /// A single name.
    One(String),
    /// A list of names.
    Many(Vec<String>),
}

impl OneOrMany {
    /// Whether no names are present.
    pub fn is_empty(&self) -> bool {
        match self {
            OneOrMany::One(_) => false,
            OneOrMany::Many(names) => names.is_empty(),
        }
    }

    /// Iterate over the names.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        let names: Vec<&str> = match self {
            OneOrMany::One(name) => vec![name.as_str()],
            OneOrMany::Many(names) => names.iter().map(String::as_str).collect(),
        };
        names.into_iter()
    }

    /// Flatten into an owned list.
    pub fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::One(name) => vec![name],
            OneOrMany::Many(names) => names,
        }
    }
}

impl Default for OneOrMany {
    fn default() -> Self {
        OneOrMany::Many(Vec::new())
    }
}

impl From<&str> for OneOrMany {
    fn from(name: &str) -> Self {
        OneOrMany::One(name.to_string())
    }
}

impl From<Vec<String>> for OneOrMany {
    fn from(names: Vec<String>) -> Self {
        OneOrMany::Many(names)
    }
}

/// The per-controller configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Name of the resource listener component. Required for assembly.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listener: Option<String>,

    /// Route composed on the controller for link generation. Required for
    /// assembly.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route_name: Option<String>,

    /// Route parameter holding the entity identifier.
    #[serde(default = "default_route_identifier_name")]
    pub route_identifier_name: String,

    /// Label of the embedded collection in rendered output.
    #[serde(default = "default_collection_name")]
    pub collection_name: String,

    /// Verbs accepted on the collection route.
    #[serde(default = "default_collection_http_methods")]
    pub collection_http_methods: Vec<String>,

    /// Verbs accepted on the entity route.
    #[serde(default = "default_entity_http_methods")]
    pub entity_http_methods: Vec<String>,

    /// Query parameters forwarded to list fetches and pagination links.
    #[serde(default, skip_serializing_if = "OneOrMany::is_empty")]
    pub collection_query_whitelist: OneOrMany,

    /// Default page size for collections.
    #[serde(default = "default_page_size")]
    pub page_size: i64,

    /// Smallest page size a client may request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_page_size: Option<i64>,

    /// Largest page size a client may request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_page_size: Option<i64>,

    /// Query parameter that overrides the page size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size_param: Option<String>,

    /// Identifiers under which the controller receives shared lifecycle
    /// hooks. Defaults to the controller service name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<OneOrMany>,

    /// Extra identifiers under which the resource receives shared handlers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_identifiers: Option<OneOrMany>,

    /// Entity type rendered by this controller. Metadata only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_class: Option<String>,

    /// Collection type rendered by this controller. Metadata only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_class: Option<String>,

    /// Controller implementation override. Metadata only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller_class: Option<String>,
}

impl ControllerConfig {
    /// A minimal section: listener and route set, everything else default.
    pub fn new(listener: impl Into<String>, route_name: impl Into<String>) -> Self {
        Self {
            listener: Some(listener.into()),
            route_name: Some(route_name.into()),
            ..Self::default()
        }
    }

    /// Whether the section carries both required keys.
    pub fn is_complete(&self) -> bool {
        self.listener.is_some() && self.route_name.is_some()
    }
}

// The in-memory defaults must match the deserialization defaults, so this
// cannot be derived.
impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            listener: None,
            route_name: None,
            route_identifier_name: default_route_identifier_name(),
            collection_name: default_collection_name(),
            collection_http_methods: default_collection_http_methods(),
            entity_http_methods: default_entity_http_methods(),
            collection_query_whitelist: OneOrMany::default(),
            page_size: default_page_size(),
            min_page_size: None,
            max_page_size: None,
            page_size_param: None,
            identifier: None,
            resource_identifiers: None,
            entity_class: None,
            collection_class: None,
            controller_class: None,
        }
    }
}

/// Map of controller service names to their configuration sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RestConfig {
    /// Per-controller sections.
    #[serde(flatten)]
    pub controllers: HashMap<String, ControllerConfig>,
}

impl RestConfig {
    /// An empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a controller's section.
    pub fn controller(&self, name: &str) -> Option<&ControllerConfig> {
        self.controllers.get(name)
    }

    /// Add or replace a controller's section.
    pub fn insert(&mut self, name: impl Into<String>, config: ControllerConfig) {
        self.controllers.insert(name.into(), config);
    }
}

fn default_route_identifier_name() -> String {
    "id".to_string()
}

fn default_collection_name() -> String {
    "items".to_string()
}

fn default_collection_http_methods() -> Vec<String> {
    vec!["GET".to_string(), "POST".to_string()]
}

fn default_entity_http_methods() -> Vec<String> {
    vec![
        "DELETE".to_string(),
        "GET".to_string(),
        "PATCH".to_string(),
        "PUT".to_string(),
    ]
}

fn default_page_size() -> i64 {
    30
}
