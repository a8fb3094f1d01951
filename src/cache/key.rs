//! Normalized request identity.

use std::collections::BTreeMap;
use std::fmt;

use url::form_urlencoded;

/// Identity of a fetchable resource: an endpoint plus its query parameters.
///
/// Parameters live in a sorted map, so two keys built from the same pairs in
/// any order are equal, hash the same, and display the same. The display
/// form (`/businesses/search?limit=20&page=1&q=cafe`) is stable and
/// suitable for logs and metric labels.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestKey {
    endpoint: String,
    params: BTreeMap<String, String>,
}

impl RequestKey {
    /// Key for `endpoint` with no parameters.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            params: BTreeMap::new(),
        }
    }

    /// Key for `endpoint` with the given parameters. Later duplicates
    /// overwrite earlier ones.
    pub fn with_params<K, V, I>(endpoint: impl Into<String>, params: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut key = Self::new(endpoint);
        for (k, v) in params {
            key.params.insert(k.into(), v.into());
        }
        key
    }

    /// Add (or replace) one parameter.
    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Parameters in normalized (sorted) order.
    pub fn params(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Value of one parameter.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.endpoint)?;
        if !self.params.is_empty() {
            let query = form_urlencoded::Serializer::new(String::new())
                .extend_pairs(self.params.iter())
                .finish();
            write!(f, "?{query}")?;
        }
        Ok(())
    }
}
