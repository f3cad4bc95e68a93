//! Problem results: structured error representations.
//!
//! A [`Problem`] carries the status/title/detail triple of an RFC 7807
//! problem document plus optional extension members. Rendering to a wire
//! format is the host framework's job; this type only models the data.

use serde::Serialize;
use serde_json::{Map, Value};

/// Media type for rendered problem documents.
pub const APPLICATION_PROBLEM_JSON: &str = "application/problem+json";

/// A structured error representation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Problem {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    type_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    status: u16,
    detail: String,
    #[serde(flatten)]
    extensions: Map<String, Value>,
}

impl Problem {
    /// Create a problem from a status code and detail message.
    pub fn new(status: u16, detail: impl Into<String>) -> Self {
        Self {
            type_uri: None,
            title: None,
            status,
            detail: detail.into(),
            extensions: Map::new(),
        }
    }

    /// 400 Bad Request.
    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(400, detail)
    }

    /// 404 Not Found.
    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::new(404, detail)
    }

    /// 405 Method Not Allowed.
    pub fn method_not_allowed(detail: impl Into<String>) -> Self {
        Self::new(405, detail)
    }

    /// 416 Range Not Satisfiable.
    pub fn range_not_satisfiable(detail: impl Into<String>) -> Self {
        Self::new(416, detail)
    }

    /// 422 Unprocessable Entity.
    pub fn unprocessable_entity(detail: impl Into<String>) -> Self {
        Self::new(422, detail)
    }

    /// 500 Internal Server Error.
    pub fn internal_error(detail: impl Into<String>) -> Self {
        Self::new(500, detail)
    }

    /// Set an explicit title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the problem type URI.
    pub fn with_type(mut self, type_uri: impl Into<String>) -> Self {
        self.type_uri = Some(type_uri.into());
        self
    }

    /// Attach an extension member.
    pub fn with_extension(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extensions.insert(name.into(), value.into());
        self
    }

    /// The HTTP status of the problem.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// The detail message.
    pub fn detail(&self) -> &str {
        &self.detail
    }

    /// The title: explicit if set, otherwise the canonical reason phrase of
    /// the status, otherwise "Unknown Error".
    pub fn title(&self) -> &str {
        if let Some(title) = &self.title {
            return title;
        }
        http::StatusCode::from_u16(self.status)
            .ok()
            .and_then(|status| status.canonical_reason())
            .unwrap_or("Unknown Error")
    }

    /// The problem type URI, if set.
    pub fn type_uri(&self) -> Option<&str> {
        self.type_uri.as_deref()
    }

    /// Extension members.
    pub fn extensions(&self) -> &Map<String, Value> {
        &self.extensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn title_falls_back_to_canonical_reason() {
        let problem = Problem::new(404, "Entity not found.");
        assert_eq!(problem.title(), "Not Found");

        let titled = Problem::new(404, "gone").with_title("Missing Thing");
        assert_eq!(titled.title(), "Missing Thing");

        let odd = Problem::new(299, "weird");
        assert_eq!(odd.title(), "Unknown Error");
    }

    #[test]
    fn serializes_with_extensions_flattened() {
        let problem = Problem::unprocessable_entity("Unable to delete entity.")
            .with_extension("resource", "widgets");
        let rendered = serde_json::to_value(&problem).unwrap();
        assert_eq!(
            rendered,
            json!({
                "status": 422,
                "detail": "Unable to delete entity.",
                "resource": "widgets",
            })
        );
    }
}
