//! Configuration management
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (assets.toml)
//! - Environment variables (ASSETS_*)
//!
//! ## Example config file (assets.toml):
//! ```toml
//! [inventory]
//! paths = ["inventory/"]
//!
//! [rules]
//! path = "rules.toml"
//!
//! [output]
//! dir = "asset_inventory"
//! theme = "dark"
//! format = "pretty"
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::rules::RuleTable;

/// Main configuration for the inventory mapper
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MapperConfig {
    /// Inventory sources
    #[serde(default)]
    pub inventory: InventoryConfig,

    /// Rule table settings
    #[serde(default)]
    pub rules: RulesConfig,

    /// Export settings
    #[serde(default)]
    pub output: OutputConfig,
}

/// Inventory source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryConfig {
    /// Files or directories holding inventory YAML
    #[serde(default = "default_inventory_paths")]
    pub paths: Vec<PathBuf>,

    /// Title override for maps and report indexes
    #[serde(default)]
    pub title: Option<String>,
}

/// Rule table configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RulesConfig {
    /// TOML rule table replacing the builtin policy
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl RulesConfig {
    /// The configured rule table, or the builtin one
    pub fn load_table(&self) -> crate::Result<RuleTable> {
        match &self.path {
            Some(path) => RuleTable::from_path(path),
            None => Ok(RuleTable::builtin()),
        }
    }
}

/// Export configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Output folder
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,

    /// Map color theme, "light" or "dark"
    #[serde(default = "default_theme")]
    pub theme: String,

    /// JSON output format
    #[serde(default)]
    pub format: OutputFormat,
}

/// Output format for JSON documents
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Pretty,
    Compact,
}

fn default_inventory_paths() -> Vec<PathBuf> {
    vec![PathBuf::from("assets")]
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("asset_inventory")
}

fn default_theme() -> String {
    "light".to_string()
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            paths: default_inventory_paths(),
            title: None,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            theme: default_theme(),
            format: OutputFormat::Pretty,
        }
    }
}

impl MapperConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration from a specific file
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = ["assets.toml", ".assets.toml", "config/assets.toml"];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // XDG config directory
        if let Some(config_dir) =
            directories::ProjectDirs::from("dev", "assetmap", "assets")
        {
            let xdg_config = config_dir.config_dir().join("assets.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("ASSETS")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }
}
