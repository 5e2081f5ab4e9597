//! # Network Configuration
//!
//! ```toml
//! max_endpoints_per_container = 16
//! max_pci_slot = 32
//! ```
//!
//! Missing keys fall back to [`NetworkConfig::default`].

use crate::error::{NetworkError, NetworkResult};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Network subsystem configuration
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NetworkConfig {
    /// Maximum endpoints (scopes joined) per container
    pub max_endpoints_per_container: usize,
    /// Highest PCI slot number an endpoint may be given
    pub max_pci_slot: i32,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            max_endpoints_per_container: 16,
            max_pci_slot: 32,
        }
    }
}

impl NetworkConfig {
    /// Testing config with smaller limits
    #[cfg(test)]
    pub fn for_testing() -> Self {
        Self {
            max_endpoints_per_container: 3,
            max_pci_slot: 8,
        }
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> NetworkResult<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| NetworkError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::Config`] if the file cannot be read, parsed,
    /// or fails validation.
    pub fn load<P: AsRef<Path>>(path: P) -> NetworkResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            NetworkError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;

        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> NetworkResult<()> {
        if self.max_endpoints_per_container == 0 {
            return Err(NetworkError::Config(
                "max_endpoints_per_container must be at least 1".into(),
            ));
        }
        if self.max_pci_slot <= 0 {
            return Err(NetworkError::Config(format!(
                "max_pci_slot must be positive, got {}",
                self.max_pci_slot
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_is_valid() {
        assert!(NetworkConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = NetworkConfig::from_toml_str("max_pci_slot = 12").unwrap();
        assert_eq!(config.max_pci_slot, 12);
        assert_eq!(config.max_endpoints_per_container, 16);
    }

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(
            NetworkConfig::from_toml_str("").unwrap(),
            NetworkConfig::default()
        );
    }

    #[test]
    fn test_invalid_values_rejected() {
        let zero_limit = NetworkConfig::from_toml_str("max_endpoints_per_container = 0");
        assert!(matches!(zero_limit, Err(NetworkError::Config(_))));

        let bad_slot = NetworkConfig::from_toml_str("max_pci_slot = 0");
        assert!(matches!(bad_slot, Err(NetworkError::Config(_))));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let result = NetworkConfig::from_toml_str("max_scopes = 4");
        assert!(matches!(result, Err(NetworkError::Config(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_endpoints_per_container = 4").unwrap();
        writeln!(file, "max_pci_slot = 24").unwrap();

        let config = NetworkConfig::load(file.path()).unwrap();
        assert_eq!(config.max_endpoints_per_container, 4);
        assert_eq!(config.max_pci_slot, 24);
    }

    #[test]
    fn test_load_missing_file() {
        let result = NetworkConfig::load("/nonexistent/portlayer-network.toml");
        assert!(matches!(result, Err(NetworkError::Config(_))));
    }
}
