//! Error types for the dispatch layer.
//!
//! Failures split into two families with very different handling:
//!
//! - [`ResourceError`]: anything raised while an operation runs. The
//!   controller converts these into problem results, using the error's
//!   status code when it is a valid HTTP status.
//! - [`DomainError`]: configuration mistakes (missing resource, missing
//!   route, bad assembly input). These are programmer errors and are never
//!   converted into problem results.

use thiserror::Error;

/// Boxed error type used at trait object boundaries.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure raised while executing a resource operation.
///
/// Listeners signal business failures through the `Creation`/`Update`/
/// `Patch` variants (optionally carrying an HTTP status), or through
/// [`ResourceError::failure`] for any other status-bearing error. Input
/// shape violations use `InvalidArgument` and always map to HTTP 400.
#[derive(Debug, Error)]
pub enum ResourceError {
    /// The payload failed the shape check for the operation.
    #[error("{0}")]
    InvalidArgument(String),

    /// A listener could not create the entity.
    #[error("{message}")]
    Creation {
        /// Human-readable description of the failure.
        message: String,
        /// HTTP status to report, when the listener chose one.
        status: Option<u16>,
    },

    /// A listener could not update the entity.
    #[error("{message}")]
    Update {
        /// Human-readable description of the failure.
        message: String,
        /// HTTP status to report, when the listener chose one.
        status: Option<u16>,
    },

    /// A listener could not patch the entity.
    #[error("{message}")]
    Patch {
        /// Human-readable description of the failure.
        message: String,
        /// HTTP status to report, when the listener chose one.
        status: Option<u16>,
    },

    /// Any other failure carrying an explicit HTTP status.
    #[error("{message}")]
    Failure {
        /// Human-readable description of the failure.
        message: String,
        /// HTTP status to report.
        status: Option<u16>,
    },

    /// A listener panicked; the payload is the captured panic message.
    #[error("resource listener panicked: {0}")]
    Panic(String),

    /// An opaque error from a listener with no status information.
    #[error("{0}")]
    Other(BoxError),
}

impl ResourceError {
    /// Shape-check failure; reports as HTTP 400.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        ResourceError::InvalidArgument(message.into())
    }

    /// Failure to create an entity.
    pub fn creation(message: impl Into<String>) -> Self {
        ResourceError::Creation {
            message: message.into(),
            status: None,
        }
    }

    /// Failure to update an entity.
    pub fn update(message: impl Into<String>) -> Self {
        ResourceError::Update {
            message: message.into(),
            status: None,
        }
    }

    /// Failure to patch an entity.
    pub fn patch(message: impl Into<String>) -> Self {
        ResourceError::Patch {
            message: message.into(),
            status: None,
        }
    }

    /// Generic failure with an explicit HTTP status.
    pub fn failure(status: u16, message: impl Into<String>) -> Self {
        ResourceError::Failure {
            message: message.into(),
            status: Some(status),
        }
    }

    /// Wrap an opaque error; reports as HTTP 500.
    pub fn other(err: impl Into<BoxError>) -> Self {
        ResourceError::Other(err.into())
    }

    /// Attach an HTTP status to a business failure.
    ///
    /// Has no effect on variants that derive their status structurally
    /// (`InvalidArgument`, `Panic`, `Other`).
    pub fn with_status(mut self, code: u16) -> Self {
        match &mut self {
            ResourceError::Creation { status, .. }
            | ResourceError::Update { status, .. }
            | ResourceError::Patch { status, .. }
            | ResourceError::Failure { status, .. } => *status = Some(code),
            _ => {}
        }
        self
    }

    /// The HTTP status associated with this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ResourceError::InvalidArgument(_) => Some(400),
            ResourceError::Creation { status, .. }
            | ResourceError::Update { status, .. }
            | ResourceError::Patch { status, .. }
            | ResourceError::Failure { status, .. } => *status,
            ResourceError::Panic(_) | ResourceError::Other(_) => None,
        }
    }
}

/// Configuration error raised at assembly or pre-flight time.
///
/// These indicate a wiring mistake and must surface as hard failures, never
/// as problem results.
#[derive(Debug, Error)]
pub enum DomainError {
    /// The controller has no composed resource.
    #[error("no resource has been set")]
    MissingResource,

    /// The controller has no composed route name.
    #[error("no route name has been set")]
    MissingRoute,

    /// The assembly configuration is unusable.
    #[error("invalid controller configuration: {0}")]
    InvalidConfig(String),
}

/// Failure while rendering a hypermedia link.
#[derive(Debug, Error)]
pub enum HypermediaError {
    /// The link carries neither an explicit href nor a route reference.
    #[error("link \"{0}\" has neither an href nor a route")]
    IncompleteLink(String),

    /// The link's route could not be assembled into a URL.
    #[error("unable to assemble url for route \"{0}\"")]
    RouteAssembly(String),

    /// Any other rendering failure.
    #[error("{0}")]
    Other(BoxError),
}
