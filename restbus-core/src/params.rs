//! Ordered name/value parameter bags.
//!
//! Operation parameters, query parameters and route-match parameters all
//! share this shape: an insertion-ordered mapping from string names to
//! loosely typed values.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An insertion-ordered mapping from parameter names to values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Parameters {
    inner: Map<String, Value>,
}

impl Parameters {
    /// Create an empty bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of parameters in the bag.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether the bag holds no parameters.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Look up a parameter by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.inner.get(name)
    }

    /// Look up a parameter and view it as a string, when it is one.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.inner.get(name).and_then(Value::as_str)
    }

    /// Whether a parameter with the given name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.inner.contains_key(name)
    }

    /// Insert a parameter, returning any previous value for the name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.inner.insert(name.into(), value.into())
    }

    /// Remove a parameter by name.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.inner.shift_remove(name)
    }

    /// Keep only the parameters for which the predicate returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(&str, &Value) -> bool) {
        self.inner.retain(|name, value| keep(name, value));
    }

    /// Iterate over parameters in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.inner.iter()
    }

    /// Iterate over parameter names in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.inner.keys()
    }

    /// Merge another bag into this one; names in `other` win on clash.
    pub fn merge(&mut self, other: &Parameters) {
        for (name, value) in other.iter() {
            self.inner.insert(name.clone(), value.clone());
        }
    }

    /// Borrow the underlying ordered map.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.inner
    }

    /// Consume the bag, yielding the underlying ordered map.
    pub fn into_map(self) -> Map<String, Value> {
        self.inner
    }
}

impl From<Map<String, Value>> for Parameters {
    fn from(inner: Map<String, Value>) -> Self {
        Self { inner }
    }
}

impl<N: Into<String>, V: Into<Value>> FromIterator<(N, V)> for Parameters {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut bag = Parameters::new();
        for (name, value) in iter {
            bag.insert(name, value);
        }
        bag
    }
}

impl<N: Into<String>, V: Into<Value>> Extend<(N, V)> for Parameters {
    fn extend<I: IntoIterator<Item = (N, V)>>(&mut self, iter: I) {
        for (name, value) in iter {
            self.insert(name, value);
        }
    }
}

impl IntoIterator for Parameters {
    type Item = (String, Value);
    type IntoIter = serde_json::map::IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn preserves_insertion_order() {
        let bag: Parameters = [("zebra", 1), ("apple", 2), ("mango", 3)]
            .into_iter()
            .collect();
        let keys: Vec<_> = bag.keys().map(String::as_str).collect();
        assert_eq!(keys, ["zebra", "apple", "mango"]);
    }

    #[test]
    fn merge_overrides_on_clash() {
        let mut bag: Parameters = [("a", json!(1)), ("b", json!(2))].into_iter().collect();
        let other: Parameters = [("b", json!(20)), ("c", json!(30))].into_iter().collect();
        bag.merge(&other);
        assert_eq!(bag.get("a"), Some(&json!(1)));
        assert_eq!(bag.get("b"), Some(&json!(20)));
        assert_eq!(bag.get("c"), Some(&json!(30)));
    }

    #[test]
    fn retain_filters_by_name() {
        let mut bag: Parameters = [("keep", 1), ("drop", 2)].into_iter().collect();
        bag.retain(|name, _| name == "keep");
        assert!(bag.contains("keep"));
        assert!(!bag.contains("drop"));
        assert_eq!(bag.len(), 1);
    }
}
