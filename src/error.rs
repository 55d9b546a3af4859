//! Error types for inventory processing

use std::path::PathBuf;

use thiserror::Error;

/// Result type for inventory operations
pub type Result<T> = std::result::Result<T, InventoryError>;

/// Fatal load errors. Per-asset data-quality problems are not errors at
/// this level; they accumulate on each asset's `ValidationResult` instead.
#[derive(Error, Debug)]
pub enum InventoryError {
    #[error("Duplicate asset id '{id}': first defined in {}, duplicated in {}", .first.display(), .duplicate.display())]
    DuplicateId {
        id: String,
        first: PathBuf,
        duplicate: PathBuf,
    },

    #[error("Record without an 'id' field in {}", .file.display())]
    MissingId { file: PathBuf },

    #[error("Invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Rule table error: {0}")]
    RuleTable(#[from] toml::de::Error),
}
