//! Runtime Configuration

use serde::Deserialize;

use crate::Result;

/// Runtime configuration options
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Attribute marking a container of rendered views; its value is the
    /// schema (item type) URL whose authoritative items are rendered
    pub container_attribute: String,

    /// Base URI used for `@id` instead of the document's own
    pub base_url: Option<String>,

    /// Tag for synthesized property elements when no prototype exists
    pub default_element: String,

    /// Keep template containers in sync
    pub sync_templates: bool,
}

impl Config {
    /// Parse a JSON configuration; absent keys keep their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            container_attribute: "data-itemtype".to_string(),
            base_url: None,
            default_element: "span".to_string(),
            sync_templates: true,
        }
    }
}
