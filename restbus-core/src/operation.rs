//! The closed set of resource operations.
//!
//! Every dispatch is keyed by one of these nine operations. The set is a
//! protocol constant: wire names use the camelCase identifiers
//! (`replaceList`, `fetchAll`, ...) while Rust code works with the enum.

use std::fmt;
use std::str::FromStr;

/// Identifier of a resource operation.
///
/// The enumeration is total: there is no way to dispatch an operation outside
/// this set, so "unknown operation" is not an error the dispatch path needs
/// to model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Create a new entity from a payload.
    Create,
    /// Replace the entity identified by `id` with a full payload.
    Update,
    /// Replace an entire collection with the given sequence of records.
    ReplaceList,
    /// Partially update the entity identified by `id`.
    Patch,
    /// Partially update and/or create multiple entities at once.
    PatchList,
    /// Delete the entity identified by `id`.
    Delete,
    /// Delete a collection, optionally scoped by a payload of items/ids.
    DeleteList,
    /// Retrieve a single entity by `id`.
    Fetch,
    /// Retrieve a collection.
    FetchAll,
}

impl Operation {
    /// All nine operations, in canonical order.
    pub const ALL: [Operation; 9] = [
        Operation::Create,
        Operation::Update,
        Operation::ReplaceList,
        Operation::Patch,
        Operation::PatchList,
        Operation::Delete,
        Operation::DeleteList,
        Operation::Fetch,
        Operation::FetchAll,
    ];

    /// The wire name of the operation.
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::ReplaceList => "replaceList",
            Operation::Patch => "patch",
            Operation::PatchList => "patchList",
            Operation::Delete => "delete",
            Operation::DeleteList => "deleteList",
            Operation::Fetch => "fetch",
            Operation::FetchAll => "fetchAll",
        }
    }

    /// Whether the operation addresses a collection rather than a single
    /// entity.
    pub fn is_collection(self) -> bool {
        matches!(
            self,
            Operation::ReplaceList
                | Operation::PatchList
                | Operation::DeleteList
                | Operation::FetchAll
        )
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an operation name fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized operation name \"{0}\"")]
pub struct ParseOperationError(pub String);

impl FromStr for Operation {
    type Err = ParseOperationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::ALL
            .iter()
            .copied()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| ParseOperationError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_round_trip() {
        for op in Operation::ALL {
            assert_eq!(op.as_str().parse::<Operation>(), Ok(op));
        }
    }

    #[test]
    fn unknown_name_is_rejected() {
        let err = "fetchEverything".parse::<Operation>().unwrap_err();
        assert_eq!(err.0, "fetchEverything");
    }

    #[test]
    fn collection_scope() {
        assert!(Operation::FetchAll.is_collection());
        assert!(Operation::DeleteList.is_collection());
        assert!(!Operation::Fetch.is_collection());
        assert!(!Operation::Create.is_collection());
    }
}
