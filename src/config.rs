//! Iterator configuration and TOML loading.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::{Result, SearchError};

/// How a metadata iterator answers a membership check.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataContains {
    /// Re-run the metadata predicate restricted to the candidate's identifier.
    #[default]
    Verify,
    /// Accept every candidate without consulting the backend.
    Trust,
}

/// Configuration shared by every iterator built from a [`crate::SearchStore`].
///
/// All fields are optional in TOML; missing keys take the defaults below.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IteratorOptions {
    /// Index holding the quad and node documents.
    pub index: String,
    /// Hits requested per scroll page.
    pub page_size: usize,
    /// How long the backend keeps a scroll context alive between pages, in seconds.
    pub scroll_keep_alive_secs: u64,
    /// Field the scroll is sorted on; `None` leaves ordering to the backend.
    pub sort_field: Option<String>,
    /// Separator between the lower and upper bound of a date range filter.
    pub range_delimiter: String,
    /// Membership policy for metadata iterators.
    pub metadata_contains: MetadataContains,
    /// Whether `reset` also forgets the cached size.
    pub reset_clears_size: bool,
}

impl Default for IteratorOptions {
    fn default() -> Self {
        Self {
            index: "cayley".to_owned(),
            page_size: 10,
            scroll_keep_alive_secs: 300,
            sort_field: Some("_id".to_owned()),
            range_delimiter: "=>".to_owned(),
            metadata_contains: MetadataContains::Verify,
            reset_clears_size: false,
        }
    }
}

impl IteratorOptions {
    /// Parses options from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let opts: IteratorOptions =
            toml::from_str(text).map_err(|err| SearchError::Config(err.to_string()))?;
        opts.validate()?;
        Ok(opts)
    }

    /// Reads and parses a TOML options file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|err| SearchError::Config(format!("{}: {err}", path.display())))?;
        Self::from_toml_str(&text)
    }

    fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(SearchError::Config("page_size must be at least 1".into()));
        }
        if self.range_delimiter.is_empty() {
            return Err(SearchError::Config("range_delimiter cannot be empty".into()));
        }
        if self.index.is_empty() {
            return Err(SearchError::Config("index cannot be empty".into()));
        }
        Ok(())
    }

    /// Scroll keep-alive as a duration.
    pub fn scroll_keep_alive(&self) -> Duration {
        Duration::from_secs(self.scroll_keep_alive_secs)
    }

    /// Sets the index name.
    pub fn index(mut self, index: impl Into<String>) -> Self {
        self.index = index.into();
        self
    }

    /// Sets the scroll page size; zero is clamped to one.
    pub fn page_size(mut self, size: usize) -> Self {
        self.page_size = size.max(1);
        self
    }

    /// Sets the scroll keep-alive.
    pub fn keep_alive(mut self, keep_alive: Duration) -> Self {
        self.scroll_keep_alive_secs = keep_alive.as_secs();
        self
    }

    /// Sets or clears the sort field.
    pub fn sort_field(mut self, field: Option<&str>) -> Self {
        self.sort_field = field.map(str::to_owned);
        self
    }

    /// Sets the date range delimiter.
    pub fn range_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.range_delimiter = delimiter.into();
        self
    }

    /// Sets the metadata membership policy.
    pub fn metadata_contains(mut self, policy: MetadataContains) -> Self {
        self.metadata_contains = policy;
        self
    }

    /// Chooses whether `reset` invalidates the cached size.
    pub fn reset_clears_size(mut self, clear: bool) -> Self {
        self.reset_clears_size = clear;
        self
    }
}
