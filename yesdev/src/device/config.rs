//! Device configuration.

use serde::{Deserialize, Serialize};

use crate::cache::DEFAULT_MINIMUM_SIZE;
use crate::error::ConfigError;

/// Device configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Device name (default: "yes").
    pub name: String,

    /// Minimum exploded buffer size per session (default: 8192).
    pub minimum_size: usize,

    /// Bytes per item yielded by a chunk stream (default: 8192).
    pub chunk_size: usize,
}

impl DeviceConfig {
    /// Check that all values are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::Invalid {
                message: "name must not be empty".to_string(),
            });
        }
        if self.minimum_size == 0 {
            return Err(ConfigError::Invalid {
                message: "minimum_size must be greater than zero".to_string(),
            });
        }
        if self.chunk_size == 0 {
            return Err(ConfigError::Invalid {
                message: "chunk_size must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name: "yes".to_string(),
            minimum_size: DEFAULT_MINIMUM_SIZE,
            chunk_size: DEFAULT_MINIMUM_SIZE,
        }
    }
}
