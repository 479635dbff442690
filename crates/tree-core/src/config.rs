//! Engine configuration.

use crate::error::TreeResult;
use crate::selection::SelectionConfig;
use serde::{Deserialize, Serialize};

/// Where filtering happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterMode {
    /// The engine matches nodes against the query.
    #[default]
    Client,
    /// The data source already filtered; every eligible node counts as a match.
    Server,
}

/// What happens to selected nodes that a filter hides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// Hidden nodes stay selected.
    #[default]
    Keep,
    /// Hidden nodes are deselected when the filter is applied.
    ClearHidden,
}

/// Filtering behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct FilteringConfig {
    /// Client or server filtering.
    pub mode: FilterMode,
    /// Keep ancestors of matches visible.
    pub show_parents_of_matches: bool,
    /// Keep placeholder rows visible while a query is active.
    pub keep_placeholders_visible: bool,
    /// Expand every ancestor of a match when the filter is applied.
    pub auto_expand_matches: bool,
    /// Selection handling for hidden nodes.
    pub selection_policy: SelectionPolicy,
}

impl Default for FilteringConfig {
    fn default() -> Self {
        Self {
            mode: FilterMode::Client,
            show_parents_of_matches: true,
            keep_placeholders_visible: false,
            auto_expand_matches: false,
            selection_policy: SelectionPolicy::Keep,
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Selection behaviour.
    pub selection: SelectionConfig,
    /// Filtering behaviour.
    pub filtering: FilteringConfig,
    /// Icon used when the adapter provides none.
    pub default_icon: Option<String>,
    /// Label of placeholder rows.
    pub placeholder_label: String,
    /// Label of placeholder rows whose page failed to load.
    pub page_error_label: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            selection: SelectionConfig::default(),
            filtering: FilteringConfig::default(),
            default_icon: None,
            placeholder_label: "Loading...".to_string(),
            page_error_label: "Failed to load page".to_string(),
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> TreeResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Builder: set the selection behaviour.
    pub fn with_selection(mut self, selection: SelectionConfig) -> Self {
        self.selection = selection;
        self
    }

    /// Builder: set the filtering behaviour.
    pub fn with_filtering(mut self, filtering: FilteringConfig) -> Self {
        self.filtering = filtering;
        self
    }

    /// Builder: set the default icon.
    pub fn with_default_icon(mut self, icon: impl Into<String>) -> Self {
        self.default_icon = Some(icon.into());
        self
    }

    /// Serialized configuration used as a cache key.
    pub fn fingerprint(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{self:?}"))
    }
}
