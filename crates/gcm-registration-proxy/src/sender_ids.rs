//! Canonical sender id sets.

use crate::error::ProxyError;
use std::collections::BTreeSet;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// A sorted, deduplicated set of sender ids.
///
/// Equality is set equality, so `"b,a"` and `"a, b ,a"` parse to equal sets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SenderIdSet(BTreeSet<String>);

impl SenderIdSet {
    /// Parse a comma-separated list.
    ///
    /// Segments are trimmed and empty segments are dropped. An input with no
    /// usable segment yields an empty set; callers decide whether that is an
    /// error.
    pub fn parse(raw: &str) -> Self {
        Self(
            raw.split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(String::from)
                .collect(),
        )
    }

    /// Render the canonical comma-separated form.
    pub fn format(&self) -> String {
        self.0
            .iter()
            .map(|id| id.trim())
            .filter(|id| !id.is_empty())
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Check that the set can be used for registration.
    pub fn validate(&self) -> Result<(), ProxyError> {
        if self.0.is_empty() {
            return Err(ProxyError::Precondition("empty sender id set".into()));
        }
        if self.0.iter().any(|id| id.trim().is_empty()) {
            return Err(ProxyError::Precondition(
                "blank sender id included".into(),
            ));
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, sender_id: &str) -> bool {
        self.0.contains(sender_id)
    }

    /// Iterate in canonical (ascending) order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl fmt::Display for SenderIdSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format())
    }
}

impl FromStr for SenderIdSet {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

/// Collects members verbatim; use [`SenderIdSet::validate`] before registering.
impl<S: Into<String>> FromIterator<S> for SenderIdSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}
