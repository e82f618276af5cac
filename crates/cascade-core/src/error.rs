//! Error types for scene loading.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for scene operations.
pub type Result<T> = std::result::Result<T, SceneError>;

/// Errors that can occur while loading or building a scene.
#[derive(Error, Debug)]
pub enum SceneError {
    /// The scene file could not be read.
    #[error("failed to read scene file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The scene file is not valid TOML for the scene schema.
    #[error("failed to parse scene: {0}")]
    Parse(#[from] toml::de::Error),

    /// Default item values could not be encoded as a TOML table.
    #[error("failed to encode default item values: {0}")]
    Encode(#[from] toml::ser::Error),

    /// The merged profile and overrides of an item are not valid item values.
    #[error("invalid values for item {item}: {source}")]
    InvalidValues {
        item: String,
        #[source]
        source: toml::de::Error,
    },

    /// An item references a profile that is not declared.
    #[error("item {item} references unknown profile {profile}")]
    UnknownProfile { item: String, profile: String },

    /// A core root state references an item that is not declared.
    #[error("root {root} state {state} references unknown item {item}")]
    UnknownItem {
        root: String,
        state: String,
        item: String,
    },

    /// Two items share a name.
    #[error("duplicate item name: {0}")]
    DuplicateItem(String),
}
