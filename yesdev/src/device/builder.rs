//! Builder for creating devices.

use super::YesDevice;
use super::config::DeviceConfig;
use crate::error::Result;

/// Builder for constructing a [`YesDevice`].
///
/// # Example
///
/// ```rust
/// use yesdev::DeviceBuilder;
///
/// # fn example() -> Result<(), yesdev::Error> {
/// let device = DeviceBuilder::new("yes")
///     .minimum_size(4096)
///     .build()?;
/// assert_eq!(device.readable(), 4096);
/// # Ok(())
/// # }
/// # example().unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct DeviceBuilder {
    config: DeviceConfig,
}

impl DeviceBuilder {
    /// Create a new builder for a device called `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            config: DeviceConfig {
                name: name.into(),
                ..Default::default()
            },
        }
    }

    /// Start from an existing configuration.
    pub fn from_config(config: DeviceConfig) -> Self {
        Self { config }
    }

    /// Set the minimum exploded buffer size (default: 8192).
    pub fn minimum_size(mut self, minimum_size: usize) -> Self {
        self.config.minimum_size = minimum_size;
        self
    }

    /// Set the chunk size used by chunk streams (default: 8192).
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.config.chunk_size = chunk_size;
        self
    }

    /// Validate the configuration and build the device.
    pub fn build(self) -> Result<YesDevice> {
        YesDevice::new(self.config)
    }
}
