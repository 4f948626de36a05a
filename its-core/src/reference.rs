//! Name to id reference tables
//!
//! Trackers identify users, priorities and versions by numeric id while
//! callers refer to them by name. A [`ReferenceTable`] is the cached mapping,
//! built once from a full listing.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Cached mapping from a display name to the tracker's numeric id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceTable {
    entries: HashMap<String, u64>,
}

impl ReferenceTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the id for a name
    pub fn resolve(&self, name: &str) -> Option<u64> {
        self.entries.get(name).copied()
    }

    /// Add or replace an entry
    pub fn insert(&mut self, name: impl Into<String>, id: u64) {
        self.entries.insert(name.into(), id);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Known names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl<S: Into<String>> FromIterator<(S, u64)> for ReferenceTable {
    /// Later entries replace earlier ones with the same name
    fn from_iter<I: IntoIterator<Item = (S, u64)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (name, id) in iter {
            table.insert(name, id);
        }
        table
    }
}

/// What to do when a name in an update request is missing from its table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownNamePolicy {
    /// Write an empty reference, clearing the tracker value
    #[default]
    Clear,
    /// Refuse the whole update
    Reject,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_found_and_missing() {
        let table: ReferenceTable = [("Yamada Taro", 5), ("Suzuki Hanako", 9)]
            .into_iter()
            .collect();

        assert_eq!(table.resolve("Yamada Taro"), Some(5));
        assert_eq!(table.resolve("Nobody"), None);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_duplicate_name_last_wins() {
        let table: ReferenceTable = [("Normal", 2), ("Normal", 3)].into_iter().collect();
        assert_eq!(table.resolve("Normal"), Some(3));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_names_sorted() {
        let table: ReferenceTable = [("b", 2), ("a", 1)].into_iter().collect();
        assert_eq!(table.names(), vec!["a", "b"]);
    }

    #[test]
    fn test_policy_parse() {
        #[derive(Deserialize)]
        struct Wrapper {
            policy: UnknownNamePolicy,
        }
        let w: Wrapper = toml::from_str(r#"policy = "reject""#).unwrap();
        assert_eq!(w.policy, UnknownNamePolicy::Reject);
        assert_eq!(UnknownNamePolicy::default(), UnknownNamePolicy::Clear);
    }
}
