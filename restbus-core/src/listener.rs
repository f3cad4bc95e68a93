//! The listener contract resources implement.

use serde_json::Value;

use crate::error::ResourceError;
use crate::event::ResourceEvent;
use crate::operation::Operation;
use crate::outcome::Outcome;
use crate::problem::Problem;

/// A persistence-facing listener covering the full operation set.
///
/// Every method has a default body answering `405 Method Not Allowed`, so an
/// implementation only overrides the operations it supports. The wording of
/// each default distinguishes entity from collection routes, which is what a
/// client sees when it probes an unsupported verb.
///
/// # Example
///
/// ```rust,ignore
/// struct Widgets;
///
/// impl ResourceListener for Widgets {
///     fn fetch(&self, id: &Value, _event: &ResourceEvent) -> Result<Outcome, ResourceError> {
///         Ok(json!({ "id": id, "name": "widget" }).into())
///     }
/// }
/// ```
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a resource listener",
    label = "the trait `ResourceListener` is not implemented",
    note = "implement the operations the resource supports; the rest answer 405"
)]
pub trait ResourceListener: Send + Sync {
    /// Create a new entity from `data`.
    fn create(&self, _data: &Value, _event: &ResourceEvent) -> Result<Outcome, ResourceError> {
        Ok(Problem::method_not_allowed("The POST method has not been defined").into())
    }

    /// Replace the entity identified by `id` with `data`.
    fn update(
        &self,
        _id: &Value,
        _data: &Value,
        _event: &ResourceEvent,
    ) -> Result<Outcome, ResourceError> {
        Ok(
            Problem::method_not_allowed("The PUT method has not been defined for individual resources")
                .into(),
        )
    }

    /// Replace the whole collection with `data`.
    fn replace_list(&self, _data: &Value, _event: &ResourceEvent) -> Result<Outcome, ResourceError> {
        Ok(Problem::method_not_allowed("The PUT method has not been defined for collections").into())
    }

    /// Apply a partial update to the entity identified by `id`.
    fn patch(
        &self,
        _id: &Value,
        _data: &Value,
        _event: &ResourceEvent,
    ) -> Result<Outcome, ResourceError> {
        Ok(
            Problem::method_not_allowed(
                "The PATCH method has not been defined for individual resources",
            )
            .into(),
        )
    }

    /// Apply partial updates to several entities at once.
    fn patch_list(&self, _data: &Value, _event: &ResourceEvent) -> Result<Outcome, ResourceError> {
        Ok(
            Problem::method_not_allowed("The PATCH method has not been defined for collections")
                .into(),
        )
    }

    /// Delete the entity identified by `id`.
    fn delete(&self, _id: &Value, _event: &ResourceEvent) -> Result<Outcome, ResourceError> {
        Ok(
            Problem::method_not_allowed(
                "The DELETE method has not been defined for individual resources",
            )
            .into(),
        )
    }

    /// Delete the collection, or the items/ids listed in `data`.
    fn delete_list(&self, _data: &Value, _event: &ResourceEvent) -> Result<Outcome, ResourceError> {
        Ok(
            Problem::method_not_allowed("The DELETE method has not been defined for collections")
                .into(),
        )
    }

    /// Fetch the entity identified by `id`.
    fn fetch(&self, _id: &Value, _event: &ResourceEvent) -> Result<Outcome, ResourceError> {
        Ok(
            Problem::method_not_allowed(
                "The GET method has not been defined for individual resources",
            )
            .into(),
        )
    }

    /// Fetch the collection; query parameters ride on the event.
    fn fetch_all(&self, _event: &ResourceEvent) -> Result<Outcome, ResourceError> {
        Ok(Problem::method_not_allowed("The GET method has not been defined for collections").into())
    }

    /// Route an event to the operation method it names.
    fn dispatch(&self, event: &ResourceEvent) -> Result<Outcome, ResourceError> {
        match event.operation() {
            Operation::Create => self.create(event.data(), event),
            Operation::Update => self.update(event.param_or_null("id"), event.data(), event),
            Operation::ReplaceList => self.replace_list(event.data(), event),
            Operation::Patch => self.patch(event.param_or_null("id"), event.data(), event),
            Operation::PatchList => self.patch_list(event.data(), event),
            Operation::Delete => self.delete(event.param_or_null("id"), event),
            Operation::DeleteList => self.delete_list(event.data(), event),
            Operation::Fetch => self.fetch(event.param_or_null("id"), event),
            Operation::FetchAll => self.fetch_all(event),
        }
    }
}

/// An object-safe handler for a single operation.
///
/// Closures over [`ResourceEvent`] implement this automatically, which is
/// what per-operation registration uses.
pub trait ResourceHandler: Send + Sync {
    /// Handle the event.
    fn handle(&self, event: &ResourceEvent) -> Result<Outcome, ResourceError>;
}

impl<F> ResourceHandler for F
where
    F: Fn(&ResourceEvent) -> Result<Outcome, ResourceError> + Send + Sync,
{
    fn handle(&self, event: &ResourceEvent) -> Result<Outcome, ResourceError> {
        self(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::Parameters;
    use serde_json::json;

    struct FetchOnly;

    impl ResourceListener for FetchOnly {
        fn fetch(&self, id: &Value, _event: &ResourceEvent) -> Result<Outcome, ResourceError> {
            Ok(json!({ "id": id.clone() }).into())
        }
    }

    #[test]
    fn dispatch_routes_to_the_named_operation() {
        let listener = FetchOnly;
        let event = ResourceEvent::new(Operation::Fetch)
            .with_params(Parameters::from_iter([("id", json!(5))]));
        let outcome = listener.dispatch(&event).unwrap();
        match outcome {
            Outcome::Value(value) => assert_eq!(value, json!({ "id": 5 })),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn unimplemented_operations_answer_405() {
        let listener = FetchOnly;
        let event = ResourceEvent::new(Operation::Create)
            .with_params(Parameters::from_iter([("data", json!({}))]));
        match listener.dispatch(&event).unwrap() {
            Outcome::Problem(problem) => {
                assert_eq!(problem.status(), 405);
                assert_eq!(problem.detail(), "The POST method has not been defined");
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn closures_are_handlers() {
        let handler = |event: &ResourceEvent| -> Result<Outcome, ResourceError> {
            Ok(json!({ "op": event.name() }).into())
        };
        let event = ResourceEvent::new(Operation::FetchAll);
        match handler.handle(&event).unwrap() {
            Outcome::Value(value) => assert_eq!(value, json!({ "op": "fetchAll" })),
            other => panic!("unexpected outcome {other:?}"),
        }
    }
}
