//! Device facade over the session registry.
//!
//! `YesDevice` is what a host binding talks to: it opens and closes handles
//! and routes reads, writes and seeks to the session behind each handle.
//! [`DeviceFile`] wraps one handle as a `std::io` / `tokio::io` object.

mod builder;
pub mod config;
mod file;
mod stream;

pub use builder::DeviceBuilder;
pub use config::DeviceConfig;
pub use file::DeviceFile;
pub use stream::ChunkStream;

use std::io::SeekFrom;
use std::sync::Arc;

use bytes::Bytes;
use log::{debug, trace};

use crate::cache::{ByteSink, ByteSource, PatternCache};
use crate::error::Result;
use crate::session::{SessionHandle, SessionRegistry};

/// A `/dev/yes`-style endpoint.
///
/// Cloning is cheap; clones share the same registry.
#[derive(Debug, Clone)]
pub struct YesDevice {
    inner: Arc<DeviceInner>,
}

#[derive(Debug)]
struct DeviceInner {
    config: DeviceConfig,
    registry: SessionRegistry,
}

impl YesDevice {
    /// Create a device from a validated configuration.
    pub fn new(config: DeviceConfig) -> Result<Self> {
        config.validate()?;
        let registry = SessionRegistry::new(config.minimum_size);
        Ok(Self {
            inner: Arc::new(DeviceInner { config, registry }),
        })
    }

    /// Create a device with default configuration.
    pub fn with_defaults() -> Self {
        Self {
            inner: Arc::new(DeviceInner {
                registry: SessionRegistry::default(),
                config: DeviceConfig::default(),
            }),
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &DeviceConfig {
        &self.inner.config
    }

    /// Device name, used to tell devices apart in log output.
    pub fn name(&self) -> &str {
        &self.inner.config.name
    }

    /// Get the session registry.
    pub fn registry(&self) -> &SessionRegistry {
        &self.inner.registry
    }

    /// Open a new handle. Its session is created on first access.
    pub fn open(&self) -> SessionHandle {
        let handle = self.inner.registry.open();
        debug!("{}: opened {}", self.name(), handle);
        handle
    }

    /// Open a new handle wrapped as a file that closes itself on drop.
    pub fn open_file(&self) -> DeviceFile {
        DeviceFile::new(self.clone(), self.open())
    }

    /// Close a handle and release its session.
    pub fn close(&self, handle: SessionHandle) -> Result<()> {
        self.inner.registry.destroy(handle)?;
        debug!("{}: closed {}", self.name(), handle);
        Ok(())
    }

    /// Read `count` bytes from the handle's cyclic stream.
    pub fn read(&self, handle: SessionHandle, count: usize) -> Result<Bytes> {
        let data = self.session(handle)?.read(count)?;
        trace!("{}: read {} bytes from {}", self.name(), data.len(), handle);
        Ok(data)
    }

    /// Read up to `count` bytes into `sink`, returning how many were delivered.
    pub fn read_into<K: ByteSink + ?Sized>(
        &self,
        handle: SessionHandle,
        count: usize,
        sink: &mut K,
    ) -> Result<usize> {
        Ok(self.session(handle)?.read_into(count, sink)?)
    }

    /// Append `bytes` to the handle's pattern.
    pub fn write(&self, handle: SessionHandle, bytes: &[u8]) -> Result<usize> {
        let written = self.session(handle)?.write(bytes)?;
        trace!("{}: wrote {} bytes to {}", self.name(), written, handle);
        Ok(written)
    }

    /// Append everything `source` supplies to the handle's pattern.
    pub fn write_from<S: ByteSource + ?Sized>(
        &self,
        handle: SessionHandle,
        source: &mut S,
    ) -> Result<usize> {
        Ok(self.session(handle)?.write_from(source)?)
    }

    /// Reposition the handle's cursor.
    pub fn seek(&self, handle: SessionHandle, pos: SeekFrom) -> Result<u64> {
        Ok(self.session(handle)?.seek(pos)?)
    }

    /// Hint for how many bytes a reader should ask for at once.
    ///
    /// This is the configured minimum buffer size, not a measure of what is
    /// currently built; a read of any size succeeds.
    pub fn readable(&self) -> usize {
        self.inner.config.minimum_size
    }

    fn session(&self, handle: SessionHandle) -> Result<Arc<PatternCache>> {
        Ok(self.inner.registry.get_or_create(handle)?)
    }
}

impl Default for YesDevice {
    fn default() -> Self {
        Self::with_defaults()
    }
}
