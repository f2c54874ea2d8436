use std::collections::hash_map;
use std::collections::HashMap;

use super::Value;

/// Working memory: fact names mapped to [`Value`]s.
///
/// Lookups accept dotted names. `get("user.age")` returns the fact stored
/// under the exact key `user.age` if there is one, and otherwise walks into a
/// [`Value::Map`] stored under `user`.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Facts {
    data: HashMap<String, Value>,
}

impl Facts {
    /// Create an empty fact set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a fact, consuming and returning `self`.
    #[must_use]
    pub fn set(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.insert(name, value.into());
        self
    }

    /// Insert or overwrite a fact. Returns the previous value, if any.
    pub fn insert(&mut self, name: &str, value: Value) -> Option<Value> {
        self.data.insert(name.to_owned(), value)
    }

    /// Look up a fact by name, walking nested maps for dotted names.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        if let Some(value) = self.data.get(name) {
            return Some(value);
        }
        let mut segments = name.split('.');
        let mut current = self.data.get(segments.next()?)?;
        for segment in segments {
            current = current.get(segment)?;
        }
        Some(current)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Whether a fact is stored under exactly `name`, without walking
    /// nested maps.
    #[must_use]
    pub fn contains_key(&self, name: &str) -> bool {
        self.data.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.data.remove(name)
    }

    /// Drop every fact while keeping the allocation.
    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Copy every fact of `other` into `self`, overwriting on conflict.
    pub fn extend_from(&mut self, other: &Facts) {
        self.data
            .extend(other.data.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Top-level fact names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(String::as_str)
    }

    pub fn iter(&self) -> hash_map::Iter<'_, String, Value> {
        self.data.iter()
    }
}

impl<'a> IntoIterator for &'a Facts {
    type Item = (&'a String, &'a Value);
    type IntoIter = hash_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.iter()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Facts {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            data: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl From<HashMap<String, Value>> for Facts {
    fn from(data: HashMap<String, Value>) -> Self {
        Self { data }
    }
}
