//! Error types

use livemd_dom::{DomError, NodeId};

/// Result alias used throughout the crate
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Microdata errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An item was requested for an element without `itemscope`
    #[error("element {0} is not an item scope")]
    InvalidItem(NodeId),

    /// Validation was requested for an item without `itemtype`
    #[error("item {0} has no itemtype")]
    Untyped(NodeId),

    /// A template has no root element to render from
    #[error("template {0} has no root element")]
    EmptyTemplate(NodeId),

    /// A text value was written to a property that holds a nested item
    #[error("property `{name}` holds a nested item and cannot take a text value")]
    NestedValue { name: String },

    /// A resource could not be loaded
    #[error("failed to load {url}: {message}")]
    Load { url: String, message: String },

    /// A resource was loaded but could not be understood
    #[error("invalid {what} at {url}: {message}")]
    Invalid { what: &'static str, url: String, message: String },

    #[error("configuration error: {0}")]
    Config(#[from] serde_json::Error),

    #[error(transparent)]
    Dom(#[from] DomError),

    #[error(transparent)]
    Parse(#[from] livemd_html::ParseError),
}

impl Error {
    /// Shorthand for a load failure
    pub fn load(url: &str, message: impl std::fmt::Display) -> Self {
        Self::Load {
            url: url.to_string(),
            message: message.to_string(),
        }
    }

    /// Copy of a load outcome handed to every request that shared the load
    pub(crate) fn replay(&self, url: &str) -> Self {
        match self {
            Self::Load { url, message } => Self::Load {
                url: url.clone(),
                message: message.clone(),
            },
            Self::Invalid { what, url, message } => Self::Invalid {
                what: *what,
                url: url.clone(),
                message: message.clone(),
            },
            other => Self::load(url, other),
        }
    }
}
