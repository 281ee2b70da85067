//! Common types shared across modules

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Harvested Records
// ============================================================================

/// One catalog entry: an API link listed under a category
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CategoryApiRecord {
    /// Category name as listed by the categories endpoint
    pub category: String,
    /// API URL taken from the entry's `Link` field
    pub api: String,
}

impl CategoryApiRecord {
    /// Create a new record
    pub fn new(category: impl Into<String>, api: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            api: api.into(),
        }
    }
}

impl fmt::Display for CategoryApiRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.category, self.api)
    }
}

// ============================================================================
// Retry Exhaustion Policy
// ============================================================================

/// What pagination does when the fetcher runs out of attempts on a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExhaustionPolicy {
    /// Surface `Error::RetriesExhausted` and abort the walk
    #[default]
    Fail,
    /// Treat the page as end-of-data for that level and keep going
    EndOfData,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_display() {
        let record = CategoryApiRecord::new("tools", "http://a");
        assert_eq!(record.to_string(), "tools -> http://a");
    }

    #[test]
    fn test_exhaustion_policy_serde() {
        let policy: ExhaustionPolicy = serde_json::from_str("\"end_of_data\"").unwrap();
        assert_eq!(policy, ExhaustionPolicy::EndOfData);
        assert_eq!(ExhaustionPolicy::default(), ExhaustionPolicy::Fail);
    }
}
