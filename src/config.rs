use std::error::Error;
use std::fmt;
use std::path::Path;

use serde::Deserialize;

use crate::fonts::StaticFontCatalog;

/// Default config file name, looked up inside the catalog directory. Tidy's
/// stray-file sweep spares this name; a custom `--config` inside the catalog
/// directory should either use it or live outside the directory.
pub const CONFIG_FILE_NAME: &str = "pricebook.toml";

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "config I/O error: {}", err),
            ConfigError::Parse(err) => write!(f, "invalid config file: {}", err),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ConfigError::Io(err) => Some(err),
            ConfigError::Parse(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        ConfigError::Io(value)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        ConfigError::Parse(value)
    }
}

/// `pricebook.toml`:
///
/// ```toml
/// [fonts]
/// families = ["Arial", "DejaVu Sans"]
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub fonts: FontsConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FontsConfig {
    #[serde(default)]
    pub families: Vec<String>,
}

impl Config {
    /// Missing file is not an error; it means defaults.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }

    pub fn font_catalog(&self) -> StaticFontCatalog {
        if self.fonts.families.is_empty() {
            StaticFontCatalog::default()
        } else {
            StaticFontCatalog::new(self.fonts.families.iter().cloned())
        }
    }
}
