//! Case-insensitive substring filter shared by every node of the flow tree.

use std::fmt;

/// A filter value normalized to upper case once, at construction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Filter(String);

impl Filter {
    /// Normalize raw user input. `None` and `""` both mean "match everything".
    pub fn new(raw: Option<&str>) -> Self {
        Self(raw.map(str::to_uppercase).unwrap_or_default())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn matches(&self, candidate: &str) -> bool {
        self.0.is_empty() || candidate.to_uppercase().contains(&self.0)
    }

    /// Decoration appended to category labels while the filter is active.
    pub fn label_suffix(&self) -> String {
        if self.0.is_empty() {
            String::new()
        } else {
            format!(" (FILTER: {})", self.0)
        }
    }
}

impl From<&str> for Filter {
    fn from(value: &str) -> Self {
        Self::new(Some(value))
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
