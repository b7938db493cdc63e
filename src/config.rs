//! Configuration management for shapecheck
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (shapecheck.toml)
//! - Environment variables (SHAPECHECK__*)
//!
//! ## Example config file (shapecheck.toml):
//! ```toml
//! [declarations]
//! root = "./schemas"
//! extension = "decl"
//!
//! [validation]
//! return_mode = "all"
//! fail_fast = false
//!
//! [custom_types]
//! User = "User"
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::registry::CustomTypes;
use crate::schema::ReturnMode;
use crate::source::{FsSource, DEFAULT_EXTENSION};
use crate::value::Marker;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShapeConfig {
    /// Where declaration files live
    #[serde(default)]
    pub declarations: DeclarationConfig,

    /// How instances are checked
    #[serde(default)]
    pub validation: ValidationConfig,

    /// Extra type names, each mapped to a class marker of the given name
    #[serde(default)]
    pub custom_types: BTreeMap<String, String>,
}

/// Declaration lookup settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeclarationConfig {
    /// Directory relative declaration paths are resolved against
    #[serde(default)]
    pub root: Option<PathBuf>,

    /// Extension appended to declaration paths that lack it
    #[serde(default = "default_extension")]
    pub extension: String,
}

/// Validation settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Output shape for each checked instance
    #[serde(default)]
    pub return_mode: ReturnMode,

    /// Stop at the first invalid instance
    #[serde(default)]
    pub fail_fast: bool,
}

fn default_extension() -> String {
    DEFAULT_EXTENSION.to_string()
}

impl Default for DeclarationConfig {
    fn default() -> Self {
        Self {
            root: None,
            extension: default_extension(),
        }
    }
}

impl ShapeConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration from a specific file
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        // Load from default locations
        let config_locations = ["shapecheck.toml", ".shapecheck.toml", "config/shapecheck.toml"];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // Load from XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("dev", "shapecheck", "shapecheck") {
            let xdg_config = config_dir.config_dir().join("shapecheck.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        // Load from specified path
        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Load from environment variables (SHAPECHECK__*)
        builder = builder.add_source(
            Environment::with_prefix("SHAPECHECK")
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

    /// A filesystem source honouring the declaration settings
    pub fn source(&self) -> FsSource {
        let source = FsSource::new().with_extension(self.declarations.extension.clone());
        match &self.declarations.root {
            Some(root) => source.with_root(root.clone()),
            None => source,
        }
    }

    /// Configured custom type names
    pub fn custom_types(&self) -> CustomTypes {
        self.custom_types
            .iter()
            .map(|(name, class)| (name.clone(), Marker::new(class.clone())))
            .collect()
    }
}
