//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;
pub use validation::{validate_connection, validate_export, validate_import};

use crate::error::Result;
use std::path::Path;

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    ///
    /// Required fields are checked later by the run-specific validators,
    /// after command line overrides have been applied.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }
}

impl ConnectionConfig {
    /// Firebird data source in `host/port:path` form.
    pub fn data_source(&self) -> String {
        format!("{}/{}:{}", self.host, self.port, self.database)
    }

    /// Charset for an export connection.
    ///
    /// An unset charset becomes `WIN1252` when legacy decoding is forced and
    /// `NONE` otherwise.
    pub fn export_charset(&self, force_legacy: bool) -> String {
        match self.charset.as_deref().map(str::trim) {
            Some(cs) if !cs.is_empty() => cs.to_ascii_uppercase(),
            _ if force_legacy => "WIN1252".to_string(),
            _ => "NONE".to_string(),
        }
    }
}
