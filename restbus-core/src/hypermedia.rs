//! Hypermedia representation shapes and the builder contract.
//!
//! Entities and collections returned by the controller are wrapped with
//! navigational links and pagination metadata. The *shapes* live here so the
//! orchestration code can inject routes, identifier names and page metadata;
//! URL generation itself stays behind [`HypermediaBuilder`], supplied by the
//! host framework.

use serde_json::{Map, Value};

use crate::error::{HypermediaError, ResourceError};
use crate::params::Parameters;
use crate::payload::json_type_name;

/// A navigational link.
///
/// A link either carries an explicit `href` or references a named route plus
/// parameters/options for the host's URL assembler. `route_options` may hold
/// a `query` entry: query-string pairs the assembler appends when rendering,
/// which is how pagination links preserve a filtered query string. Extra
/// `props` are presentation metadata and never participate in URL rendering.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Link {
    rel: String,
    href: Option<String>,
    route: Option<String>,
    route_params: Parameters,
    route_options: Parameters,
    props: Map<String, Value>,
}

impl Link {
    /// Create a link with an explicit href.
    pub fn with_href(rel: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            rel: rel.into(),
            href: Some(href.into()),
            ..Self::default()
        }
    }

    /// Create a link referencing a named route.
    pub fn with_route(rel: impl Into<String>, route: impl Into<String>) -> Self {
        Self {
            rel: rel.into(),
            route: Some(route.into()),
            ..Self::default()
        }
    }

    /// Add a route parameter.
    pub fn param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.route_params.insert(name, value);
        self
    }

    /// Add a route option.
    pub fn option(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.route_options.insert(name, value);
        self
    }

    /// Attach a presentation property.
    pub fn prop(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.props.insert(name.into(), value.into());
        self
    }

    /// The link relation.
    pub fn rel(&self) -> &str {
        &self.rel
    }

    /// The explicit href, if any.
    pub fn href(&self) -> Option<&str> {
        self.href.as_deref()
    }

    /// The referenced route name, if any.
    pub fn route(&self) -> Option<&str> {
        self.route.as_deref()
    }

    /// Route parameters used when assembling the URL.
    pub fn route_params(&self) -> &Parameters {
        &self.route_params
    }

    /// Mutable access to the route parameters.
    pub fn route_params_mut(&mut self) -> &mut Parameters {
        &mut self.route_params
    }

    /// Route options used when assembling the URL.
    pub fn route_options(&self) -> &Parameters {
        &self.route_options
    }

    /// Mutable access to the route options.
    pub fn route_options_mut(&mut self) -> &mut Parameters {
        &mut self.route_options
    }

    /// Presentation properties.
    pub fn props(&self) -> &Map<String, Value> {
        &self.props
    }
}

/// An ordered set of links, unique by relation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkSet {
    links: Vec<Link>,
}

impl LinkSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the set holds no links.
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Number of links in the set.
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Whether a link with the given relation exists.
    pub fn has(&self, rel: &str) -> bool {
        self.links.iter().any(|link| link.rel == rel)
    }

    /// Look up a link by relation.
    pub fn get(&self, rel: &str) -> Option<&Link> {
        self.links.iter().find(|link| link.rel == rel)
    }

    /// Mutable lookup by relation.
    pub fn get_mut(&mut self, rel: &str) -> Option<&mut Link> {
        self.links.iter_mut().find(|link| link.rel == rel)
    }

    /// Add a link, replacing any existing link with the same relation.
    pub fn add(&mut self, link: Link) {
        match self.links.iter_mut().find(|have| have.rel == link.rel) {
            Some(slot) => *slot = link,
            None => self.links.push(link),
        }
    }

    /// Remove a link by relation.
    pub fn remove(&mut self, rel: &str) -> Option<Link> {
        let index = self.links.iter().position(|link| link.rel == rel)?;
        Some(self.links.remove(index))
    }

    /// Iterate over the links in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Link> {
        self.links.iter()
    }
}

/// A single entity wrapped for hypermedia output.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    value: Value,
    id: Option<String>,
    links: LinkSet,
}

impl Entity {
    /// Wrap a raw value with no identifier and no links.
    pub fn new(value: Value) -> Self {
        Self {
            value,
            id: None,
            links: LinkSet::new(),
        }
    }

    /// Wrap a raw value with a known identifier.
    pub fn with_id(value: Value, id: impl Into<String>) -> Self {
        Self {
            value,
            id: Some(id.into()),
            links: LinkSet::new(),
        }
    }

    /// The wrapped value.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Mutable access to the wrapped value.
    pub fn value_mut(&mut self) -> &mut Value {
        &mut self.value
    }

    /// Consume the wrapper, yielding the raw value.
    pub fn into_value(self) -> Value {
        self.value
    }

    /// The entity identifier, when known.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// The entity's links.
    pub fn links(&self) -> &LinkSet {
        &self.links
    }

    /// Mutable access to the entity's links.
    pub fn links_mut(&mut self) -> &mut LinkSet {
        &mut self.links
    }
}

/// A collection wrapped for hypermedia output, with pagination metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Collection {
    items: Value,
    links: LinkSet,
    collection_route: Option<String>,
    collection_route_options: Parameters,
    entity_route: Option<String>,
    route_identifier_name: String,
    collection_name: String,
    page: i64,
    page_size: i64,
}

impl Collection {
    /// Wrap raw items with default metadata.
    pub fn new(items: Value) -> Self {
        Self {
            items,
            links: LinkSet::new(),
            collection_route: None,
            collection_route_options: Parameters::new(),
            entity_route: None,
            route_identifier_name: "id".to_string(),
            collection_name: "items".to_string(),
            page: 1,
            page_size: 30,
        }
    }

    /// The wrapped items.
    pub fn items(&self) -> &Value {
        &self.items
    }

    /// Mutable access to the wrapped items.
    pub fn items_mut(&mut self) -> &mut Value {
        &mut self.items
    }

    /// Consume the wrapper, yielding the raw items.
    pub fn into_items(self) -> Value {
        self.items
    }

    /// The collection's links.
    pub fn links(&self) -> &LinkSet {
        &self.links
    }

    /// Mutable access to the collection's links.
    pub fn links_mut(&mut self) -> &mut LinkSet {
        &mut self.links
    }

    /// Route used when generating collection (pagination) links.
    pub fn collection_route(&self) -> Option<&str> {
        self.collection_route.as_deref()
    }

    /// Set the collection route.
    pub fn set_collection_route(&mut self, route: impl Into<String>) {
        self.collection_route = Some(route.into());
    }

    /// Options merged into collection route generation (e.g. `query`).
    pub fn collection_route_options(&self) -> &Parameters {
        &self.collection_route_options
    }

    /// Mutable access to the collection route options.
    pub fn collection_route_options_mut(&mut self) -> &mut Parameters {
        &mut self.collection_route_options
    }

    /// Replace the collection route options.
    pub fn set_collection_route_options(&mut self, options: Parameters) {
        self.collection_route_options = options;
    }

    /// Route used when generating per-entity links.
    pub fn entity_route(&self) -> Option<&str> {
        self.entity_route.as_deref()
    }

    /// Set the entity route.
    pub fn set_entity_route(&mut self, route: impl Into<String>) {
        self.entity_route = Some(route.into());
    }

    /// Name of the route parameter holding the entity identifier.
    pub fn route_identifier_name(&self) -> &str {
        &self.route_identifier_name
    }

    /// Set the route identifier name.
    pub fn set_route_identifier_name(&mut self, name: impl Into<String>) {
        self.route_identifier_name = name.into();
    }

    /// Label of the embedded collection in rendered output.
    pub fn collection_name(&self) -> &str {
        &self.collection_name
    }

    /// Set the collection name.
    pub fn set_collection_name(&mut self, name: impl Into<String>) {
        self.collection_name = name.into();
    }

    /// The current page.
    pub fn page(&self) -> i64 {
        self.page
    }

    /// Set the current page from a loosely typed value.
    ///
    /// Accepts integers and integer strings; anything else is rejected, as is
    /// any page below 1.
    pub fn set_page(&mut self, page: &Value) -> Result<(), ResourceError> {
        let number = match page {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        };
        let Some(number) = number else {
            return Err(ResourceError::invalid_argument(format!(
                "Page must be an integer; received \"{}\"",
                json_type_name(page)
            )));
        };
        if number < 1 {
            return Err(ResourceError::invalid_argument(format!(
                "Page must be a positive integer; received \"{number}\""
            )));
        }
        self.page = number;
        Ok(())
    }

    /// The page size; -1 disables pagination.
    pub fn page_size(&self) -> i64 {
        self.page_size
    }

    /// Set the page size.
    ///
    /// Only positive sizes and the sentinel -1 (pagination disabled) are
    /// accepted.
    pub fn set_page_size(&mut self, size: i64) -> Result<(), ResourceError> {
        if size < 1 && size != -1 {
            return Err(ResourceError::invalid_argument(format!(
                "size must be a positive integer or -1 (to disable pagination); \
                 received \"{size}\""
            )));
        }
        self.page_size = size;
        Ok(())
    }
}

/// A link rendered to its URL.
///
/// `props` carries any presentation metadata of the source link; consumers
/// deciding on header values must use `href` only.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedLink {
    /// The assembled URL.
    pub href: String,
    /// Presentation properties carried over from the link.
    pub props: Map<String, Value>,
}

/// The external hypermedia builder.
///
/// Implementations live in the host framework, next to its router: they know
/// how to turn route names into URLs and how to pick identifiers out of raw
/// values.
#[diagnostic::on_unimplemented(
    message = "`{Self}` cannot build hypermedia representations",
    label = "the trait `HypermediaBuilder` is not implemented",
    note = "the host framework supplies this, typically next to its router"
)]
pub trait HypermediaBuilder: Send + Sync {
    /// Wrap a raw value as an entity with a route-based self link.
    fn create_entity(&self, value: Value, route: &str, route_identifier_name: &str) -> Entity;

    /// Wrap raw items as a collection associated with a route.
    fn create_collection(&self, items: Value, route: &str) -> Collection;

    /// Add a route-based self link to a link set that lacks one.
    fn inject_self_link(&self, links: &mut LinkSet, route: &str);

    /// Render a link to its URL.
    fn from_link(&self, link: &Link) -> Result<RenderedLink, HypermediaError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn link_set_replaces_on_same_rel() {
        let mut links = LinkSet::new();
        links.add(Link::with_href("self", "/widgets/1"));
        links.add(Link::with_href("up", "/widgets"));
        links.add(Link::with_href("self", "/widgets/2"));
        assert_eq!(links.len(), 2);
        assert_eq!(links.get("self").and_then(Link::href), Some("/widgets/2"));
    }

    #[test]
    fn page_rejects_non_integers_with_type_name() {
        let mut collection = Collection::new(json!([]));
        let err = collection.set_page(&json!("1/")).unwrap_err();
        assert_eq!(err.to_string(), "Page must be an integer; received \"string\"");

        let err = collection.set_page(&json!(0)).unwrap_err();
        assert_eq!(err.to_string(), "Page must be a positive integer; received \"0\"");

        collection.set_page(&json!("3")).unwrap();
        assert_eq!(collection.page(), 3);
    }

    #[test]
    fn page_size_allows_minus_one_only_below_one() {
        let mut collection = Collection::new(json!([]));
        collection.set_page_size(-1).unwrap();
        assert_eq!(collection.page_size(), -1);

        let err = collection.set_page_size(0).unwrap_err();
        assert_eq!(
            err.to_string(),
            "size must be a positive integer or -1 (to disable pagination); received \"0\""
        );
    }
}
