//! Ordered header multimap.

use std::fmt;

use axum::http::header::{HeaderMap, HeaderName, HeaderValue, SET_COOKIE};
use thiserror::Error;

/// Rejected header name or value.
#[derive(Debug, Error)]
pub enum HeaderError {
    #[error("invalid header name: {0:?}")]
    Name(String),

    #[error("invalid value for header {name}")]
    Value { name: String },
}

/// Case-insensitive, ordered multimap of header names to values.
///
/// A name may carry several values (e.g. repeated `Set-Cookie`); each value
/// is kept as its own entry and emitted as its own header line.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Headers {
    inner: HeaderMap,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value, keeping any existing values for the same name.
    pub fn append(&mut self, name: &str, value: &str) -> Result<(), HeaderError> {
        let (name, value) = parse(name, value)?;
        self.inner.append(name, value);
        Ok(())
    }

    /// Replace all values for `name` with a single value.
    pub fn set(&mut self, name: &str, value: &str) -> Result<(), HeaderError> {
        let (name, value) = parse(name, value)?;
        self.inner.insert(name, value);
        Ok(())
    }

    /// All values for `name` joined with `", "`.
    pub fn get(&self, name: &str) -> Option<String> {
        let values = self.get_all(name);
        if values.is_empty() {
            None
        } else {
            Some(values.join(", "))
        }
    }

    /// Every value for `name`, in insertion order.
    pub fn get_all(&self, name: &str) -> Vec<String> {
        self.inner
            .get_all(name)
            .iter()
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
            .collect()
    }

    /// `Set-Cookie` values, never joined.
    pub fn get_set_cookie(&self) -> Vec<String> {
        self.get_all(SET_COOKIE.as_str())
    }

    pub fn has(&self, name: &str) -> bool {
        self.inner.contains_key(name)
    }

    /// Remove every value for `name`.
    pub fn delete(&mut self, name: &str) {
        self.inner.remove(name);
    }

    /// Iterate `(name, value)` pairs; names are lowercase.
    pub fn iter(&self) -> impl Iterator<Item = (&str, String)> {
        self.inner
            .iter()
            .map(|(k, v)| (k.as_str(), String::from_utf8_lossy(v.as_bytes()).into_owned()))
    }

    /// Number of entries, counting each value of a multi-valued name.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn as_header_map(&self) -> &HeaderMap {
        &self.inner
    }

    pub fn as_header_map_mut(&mut self) -> &mut HeaderMap {
        &mut self.inner
    }

    pub fn into_header_map(self) -> HeaderMap {
        self.inner
    }
}

fn parse(name: &str, value: &str) -> Result<(HeaderName, HeaderValue), HeaderError> {
    let header_name =
        HeaderName::from_bytes(name.as_bytes()).map_err(|_| HeaderError::Name(name.to_string()))?;
    let header_value = HeaderValue::from_str(value).map_err(|_| HeaderError::Value {
        name: name.to_string(),
    })?;
    Ok((header_name, header_value))
}

impl From<HeaderMap> for Headers {
    fn from(inner: HeaderMap) -> Self {
        Self { inner }
    }
}

impl From<Headers> for HeaderMap {
    fn from(headers: Headers) -> Self {
        headers.inner
    }
}

impl<'a> TryFrom<&[(&'a str, &'a str)]> for Headers {
    type Error = HeaderError;

    fn try_from(pairs: &[(&'a str, &'a str)]) -> Result<Self, Self::Error> {
        let mut headers = Headers::new();
        for (name, value) in pairs {
            headers.append(name, value)?;
        }
        Ok(headers)
    }
}

impl FromIterator<(HeaderName, HeaderValue)> for Headers {
    fn from_iter<I: IntoIterator<Item = (HeaderName, HeaderValue)>>(iter: I) -> Self {
        let mut inner = HeaderMap::new();
        for (name, value) in iter {
            inner.append(name, value);
        }
        Self { inner }
    }
}

impl fmt::Debug for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
