#![forbid(unsafe_code)]

//! Opaque flow identity tokens.

use std::fmt;
use std::sync::Arc;

/// Identity of a flow node.
///
/// Equality and hashing go through the underlying string. Fresh identifiers
/// are random (UUID v4); explicit ones can be supplied for stable naming in
/// tests and diagnostics. Uniqueness is only required within a single
/// navigation stack.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FlowId(Arc<str>);

impl FlowId {
    /// Generate a fresh random identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Arc::from(uuid::Uuid::new_v4().to_string()))
    }

    /// Use an explicit identifier.
    #[must_use]
    pub fn named(value: impl AsRef<str>) -> Self {
        Self(Arc::from(value.as_ref()))
    }

    /// The underlying string value.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for FlowId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FlowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FlowId").field(&&*self.0).finish()
    }
}

impl fmt::Display for FlowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FlowId {
    fn from(value: &str) -> Self {
        Self::named(value)
    }
}

impl From<String> for FlowId {
    fn from(value: String) -> Self {
        Self(Arc::from(value))
    }
}

impl AsRef<str> for FlowId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}
