//! Capability tags
//!
//! A capability tag is an opaque label for a kind of work. Tags are only used
//! to filter candidate agents; they never influence bid scoring.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Ordered set of capability tags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilitySet(BTreeSet<String>);

impl CapabilitySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a tag (builder style). Empty or whitespace-only tags are ignored.
    pub fn with(mut self, tag: impl Into<String>) -> Self {
        self.insert(tag);
        self
    }

    pub fn insert(&mut self, tag: impl Into<String>) -> bool {
        let tag = tag.into();
        let tag = tag.trim();
        if tag.is_empty() {
            return false;
        }
        self.0.insert(tag.to_string())
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.contains(tag)
    }

    /// True if at least one tag is shared.
    pub fn intersects(&self, other: &CapabilitySet) -> bool {
        self.0.iter().any(|t| other.0.contains(t))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::new();
        for tag in iter {
            set.insert(tag);
        }
        set
    }
}

impl std::fmt::Display for CapabilitySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.iter().collect::<Vec<_>>().join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intersects() {
        let agent: CapabilitySet = ["research", "web_search"].into_iter().collect();
        let hint: CapabilitySet = ["booking", "research"].into_iter().collect();
        let other: CapabilitySet = ["voice_call"].into_iter().collect();

        assert!(agent.intersects(&hint));
        assert!(!agent.intersects(&other));
        assert!(!agent.intersects(&CapabilitySet::new()));
    }

    #[test]
    fn test_blank_tags_are_ignored() {
        let set = CapabilitySet::new().with("  ").with(" research ");
        assert_eq!(set.len(), 1);
        assert!(set.contains("research"));
    }

    #[test]
    fn test_display_is_sorted() {
        let set: CapabilitySet = ["web_search", "booking"].into_iter().collect();
        assert_eq!(set.to_string(), "booking, web_search");
    }
}
