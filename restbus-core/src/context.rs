//! Request-scoped collaborator contracts.
//!
//! Identity and input-filter instances are created by outer layers
//! (authentication, content validation) and only *propagated* through the
//! dispatch. The traits here are the narrow views this layer needs.

use std::fmt;

/// The originating HTTP request, made available to listeners that need raw
/// headers or body bytes.
pub type Request = http::Request<Vec<u8>>;

/// A prepared HTTP response; terminal results of this shape bypass all
/// hypermedia wrapping.
pub type Response = http::Response<Vec<u8>>;

/// Opaque reference to the authenticated principal of the current request.
pub trait Identity: fmt::Debug + Send + Sync {
    /// Stable identifier of the principal.
    fn id(&self) -> &str;
}

/// Validation-rule descriptor composed by an external validation layer.
///
/// The dispatch layer never runs validation itself; it only consults the
/// declared field names when building query-parameter whitelists.
pub trait InputFilter: fmt::Debug + Send + Sync {
    /// Names of the fields this filter declares.
    fn field_names(&self) -> Vec<String>;
}
