//! What a resource listener hands back.

use serde_json::Value;

use crate::context::Response;
use crate::hypermedia::{Collection, Entity};
use crate::problem::Problem;

/// The result of asking a listener to handle an operation.
///
/// `Pass` means the listener declined and dispatch moves on to the next one.
/// `Problem` and `Response` are terminal: dispatch stops immediately and the
/// caller relays them untouched, skipping any remaining listeners and all
/// post-processing.
#[derive(Debug)]
pub enum Outcome {
    /// The listener declined to handle the operation.
    Pass,
    /// A raw value (entity payload, collection payload, or scalar).
    Value(Value),
    /// An already wrapped entity.
    Entity(Entity),
    /// An already wrapped collection.
    Collection(Collection),
    /// A success/failure flag, used by the delete operations.
    Bool(bool),
    /// An API problem to relay as-is.
    Problem(Problem),
    /// A fully formed response to relay as-is.
    Response(Response),
}

impl Outcome {
    /// Whether this outcome stops dispatch and bypasses post-processing.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Outcome::Problem(_) | Outcome::Response(_))
    }

    /// Whether the listener declined to handle the operation.
    pub fn is_pass(&self) -> bool {
        matches!(self, Outcome::Pass)
    }

    /// A short label for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Outcome::Pass => "pass",
            Outcome::Value(_) => "value",
            Outcome::Entity(_) => "entity",
            Outcome::Collection(_) => "collection",
            Outcome::Bool(_) => "bool",
            Outcome::Problem(_) => "problem",
            Outcome::Response(_) => "response",
        }
    }
}

impl From<Value> for Outcome {
    fn from(value: Value) -> Self {
        Outcome::Value(value)
    }
}

impl From<Entity> for Outcome {
    fn from(entity: Entity) -> Self {
        Outcome::Entity(entity)
    }
}

impl From<Collection> for Outcome {
    fn from(collection: Collection) -> Self {
        Outcome::Collection(collection)
    }
}

impl From<bool> for Outcome {
    fn from(flag: bool) -> Self {
        Outcome::Bool(flag)
    }
}

impl From<Problem> for Outcome {
    fn from(problem: Problem) -> Self {
        Outcome::Problem(problem)
    }
}

impl From<Response> for Outcome {
    fn from(response: Response) -> Self {
        Outcome::Response(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn only_problem_and_response_are_terminal() {
        assert!(Outcome::from(Problem::not_found("Entity not found.")).is_terminal());
        let response = http::Response::builder()
            .status(204)
            .body(Vec::new())
            .unwrap();
        assert!(Outcome::from(response).is_terminal());

        assert!(!Outcome::Pass.is_terminal());
        assert!(!Outcome::from(json!({"id": 1})).is_terminal());
        assert!(!Outcome::from(true).is_terminal());
    }
}
