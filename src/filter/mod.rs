//! Listing filters derived from URL query parameters.
//!
//! Both backends interpret these the same way: `search` is a case-insensitive
//! substring match on the event name, `sport_type` an exact match.

use serde::{Deserialize, Serialize};

/// Sport types offered by the listing filter. "All Sports" clears the filter.
pub const SPORT_TYPES: &[&str] = &[
    "Soccer",
    "Basketball",
    "Tennis",
    "Baseball",
    "Football",
    "Volleyball",
    "Swimming",
    "Track & Field",
    "Other",
];

pub const ALL_SPORTS: &str = "All Sports";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventFilter {
    pub search: Option<String>,
    pub sport_type: Option<String>,
}

impl EventFilter {
    pub fn new(search: Option<String>, sport_type: Option<String>) -> Self {
        Self { search, sport_type }.normalized()
    }

    /// Trim values and drop the ones that do not constrain anything
    pub fn normalized(self) -> Self {
        let search = non_blank(self.search);
        let sport_type = non_blank(self.sport_type).filter(|s| s != ALL_SPORTS);
        Self { search, sport_type }
    }

    pub fn is_empty(&self) -> bool {
        self.search.is_none() && self.sport_type.is_none()
    }

    /// In-process equivalent of the SQL predicate
    pub fn matches(&self, name: &str, sport_type: &str) -> bool {
        let search_ok = self
            .search
            .as_deref()
            .map_or(true, |needle| contains_ignore_case(name, needle));
        let sport_ok = self.sport_type.as_deref().map_or(true, |s| s == sport_type);
        search_ok && sport_ok
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Build an ILIKE pattern for a substring search, escaping LIKE wildcards in
/// user input. Postgres' default escape character is the backslash.
pub fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}
