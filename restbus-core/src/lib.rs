//! # restbus-core
//!
//! Core contracts for the Restbus REST dispatch framework.
//!
//! This crate has minimal dependencies and is designed to be imported by
//! resource implementations and host-framework adapters that don't need the
//! full `restbus` orchestration layer.
//!
//! # Dispatch Model
//!
//! Restbus turns the nine CRUD-style REST operations into events and lets
//! listeners answer them, so persistence code never sees HTTP:
//!
//! ## Operations ([`Operation`])
//!
//! A closed set of nine operation names: entity create/update/patch/delete/
//! fetch plus their collection counterparts. Everything else in the crate is
//! keyed by this enum.
//!
//! ## Events ([`ResourceEvent`])
//!
//! The unit handed to listeners. Carries the operation, its arguments
//! (`data`, `id`) and the request context the dispatcher captured: query
//! string, route match, identity, input filter, raw request.
//!
//! ## Listeners ([`ResourceListener`], [`ResourceHandler`])
//!
//! [`ResourceListener`] is the rich contract: one method per operation, each
//! defaulting to a `405 Method Not Allowed` problem so implementations only
//! write the verbs they support. [`ResourceHandler`] is the object-safe
//! single-operation form; closures implement it automatically.
//!
//! ## Outcomes ([`Outcome`])
//!
//! What a listener hands back: a raw value, a wrapped [`Entity`] or
//! [`Collection`], a boolean, or a terminal [`Problem`]/response that stops
//! dispatch cold.
//!
//! ## Hypermedia ([`Entity`], [`Collection`], [`HypermediaBuilder`])
//!
//! Representation wrappers carrying links and pagination metadata. URL
//! assembly stays behind [`HypermediaBuilder`], implemented by the host
//! framework next to its router.
//!
//! # Error Types
//!
//! - [`ResourceError`] - Listener and payload-validation failures
//! - [`DomainError`] - Controller misconfiguration
//! - [`HypermediaError`] - Link rendering failures

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

mod context;
mod error;
mod event;
mod hypermedia;
mod listener;
mod operation;
mod outcome;
mod params;
mod payload;
mod problem;

// Re-exports
pub use context::{Identity, InputFilter, Request, Response};
pub use error::{BoxError, DomainError, HypermediaError, ResourceError};
pub use event::ResourceEvent;
pub use hypermedia::{Collection, Entity, HypermediaBuilder, Link, LinkSet, RenderedLink};
pub use listener::{ResourceHandler, ResourceListener};
pub use operation::{Operation, ParseOperationError};
pub use outcome::Outcome;
pub use params::Parameters;
pub use payload::{check_delete_list, coerce_record, coerce_record_list, json_type_name};
pub use problem::{Problem, APPLICATION_PROBLEM_JSON};
