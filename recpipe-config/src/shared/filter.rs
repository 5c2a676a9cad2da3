use serde::{Deserialize, Serialize};

/// Optional match condition applied by receivers.
///
/// When no filter is set, a run only counts records and terminates at end of input or at
/// the deadline.
#[derive(Clone, Debug, Default, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct FilterConfig {
    /// Exact `primaryTitle` value that stops the run once found.
    #[serde(default)]
    pub primary_title: Option<String>,
}

impl FilterConfig {
    /// Returns the primary title filter, treating an empty string as no filter.
    pub fn primary_title(&self) -> Option<&str> {
        self.primary_title
            .as_deref()
            .filter(|title| !title.is_empty())
    }
}
