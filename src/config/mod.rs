//! Configuration module for sigcond-rs
//!
//! A network file describes a complete filter network: the input
//! terminals, the filter nodes wired between them, and the STA/LTA
//! detectors watching individual terminals.
//!
//! # Formats
//!
//! - `.toml` files are read and written as TOML
//! - anything else is JSON
//!
//! # Example
//!
//! ```ignore
//! use sigcond_rs::config::NetworkConfig;
//!
//! let config = NetworkConfig::load("current_meter.toml")?;
//! let mut network = config.build()?;
//! network.put("east", 0.12)?;
//! println!("speed = {:?}", network.output("speed"));
//! ```

pub mod network;

pub use network::*;

use crate::error::{Result, SigCondError};
use std::path::Path;

/// Network file extension for TOML
pub const TOML_EXTENSION: &str = "toml";

/// On-disk encoding of a network file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    /// Pick the format from the file extension
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        match path.as_ref().extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case(TOML_EXTENSION) => ConfigFormat::Toml,
            _ => ConfigFormat::Json,
        }
    }
}

impl NetworkConfig {
    /// Parse a network description
    pub fn parse(content: &str, format: ConfigFormat) -> Result<Self> {
        match format {
            ConfigFormat::Toml => toml::from_str(content)
                .map_err(|e| SigCondError::Configuration(format!("Invalid TOML network: {}", e))),
            ConfigFormat::Json => serde_json::from_str(content)
                .map_err(|e| SigCondError::Configuration(format!("Invalid JSON network: {}", e))),
        }
    }

    /// Render the network description
    pub fn render(&self, format: ConfigFormat) -> Result<String> {
        match format {
            ConfigFormat::Toml => toml::to_string_pretty(self).map_err(|e| {
                SigCondError::Serialization(format!("Failed to serialize network: {}", e))
            }),
            ConfigFormat::Json => serde_json::to_string_pretty(self).map_err(|e| {
                SigCondError::Serialization(format!("Failed to serialize network: {}", e))
            }),
        }
    }

    /// Load a network file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            SigCondError::Configuration(format!("Failed to read network file {:?}: {}", path, e))
        })?;

        Self::parse(&content, ConfigFormat::from_path(path)).map_err(|e| {
            SigCondError::Configuration(format!("Failed to parse network file {:?}: {}", path, e))
        })
    }

    /// Save the network file to disk
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                SigCondError::Configuration(format!("Failed to create network directory: {}", e))
            })?;
        }

        let content = self.render(ConfigFormat::from_path(path))?;

        std::fs::write(path, content).map_err(|e| {
            SigCondError::Configuration(format!("Failed to write network file {:?}: {}", path, e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{FallbackPolicy, RangeRegion, RangeValidatorConfig};

    #[test]
    fn test_format_from_path() {
        assert_eq!(ConfigFormat::from_path("net.toml"), ConfigFormat::Toml);
        assert_eq!(ConfigFormat::from_path("net.TOML"), ConfigFormat::Toml);
        assert_eq!(ConfigFormat::from_path("net.json"), ConfigFormat::Json);
        assert_eq!(ConfigFormat::from_path("net"), ConfigFormat::Json);
    }

    #[test]
    fn test_parse_toml() {
        let text = r#"
            name = "turbidity"

            [[terminals]]
            name = "ntu"
            weight = 0.5
            trigger = "on_change"

            [[filters]]
            name = "clean"
            inputs = ["ntu"]
            kind = { type = "range", validator = { lower = 0.0, upper = 4000.0, policy = "use_last_valid" } }

            [[detectors]]
            name = "plume"
            source = "ntu"
            trigger_ratio = 3.0
            de_trigger_ratio = 1.5
            sta_width = 3
            lta_width = 30
            max_triggered_samples = 100
        "#;
        let config = NetworkConfig::parse(text, ConfigFormat::Toml).unwrap();
        assert_eq!(config.version, NETWORK_FORMAT_VERSION);
        assert_eq!(config.terminals[0].weight, 0.5);
        assert_eq!(
            config.filters[0].kind,
            FilterKind::Range {
                validator: RangeValidatorConfig::new(RangeRegion::Inside, 0.0, 4000.0)
                    .with_policy(FallbackPolicy::UseLastValid)
            }
        );
        assert!(config.build().is_ok());
    }

    #[test]
    fn test_json_round_trip() {
        let config = NetworkConfig::sample();
        let text = config.render(ConfigFormat::Json).unwrap();
        let parsed = NetworkConfig::parse(&text, ConfigFormat::Json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_parse_error_is_configuration() {
        let err = NetworkConfig::parse("{", ConfigFormat::Json).unwrap_err();
        assert!(matches!(err, SigCondError::Configuration(_)));
    }
}
