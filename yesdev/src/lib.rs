//! # yesdev
//!
//! Session-scoped `/dev/yes` endpoint.
//!
//! Every open handle reads an endless repetition of a small pattern, `"y\n"`
//! until something is written. Writes append to the handle's pattern. The
//! repetition is materialized once into a buffer of at least two pages and
//! served from there until the next write, so reads are plain memory copies.
//!
//! ## Features
//!
//! - Lazily built, write-invalidated pattern buffer per handle
//! - Concurrent readers on one handle share the buffer and never block each other
//! - Race-free session creation on first access
//! - `std::io` and `tokio::io` handles, plus an endless chunk `Stream`
//!
//! ## Quick Start
//!
//! ```rust
//! use std::io::{Read, Write};
//!
//! use yesdev::YesDevice;
//!
//! fn main() -> std::io::Result<()> {
//!     let device = YesDevice::with_defaults();
//!     let mut file = device.open_file();
//!
//!     let mut buf = [0u8; 4];
//!     file.read_exact(&mut buf)?;
//!     assert_eq!(&buf, b"y\ny\n");
//!
//!     file.write_all(b"no\n")?;
//!     file.read_exact(&mut buf)?;
//!     assert_eq!(&buf, b"o\nno");
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod device;
pub mod error;
pub mod session;

// Re-export main types for convenience
pub use cache::{ByteSink, ByteSource, PatternCache, SliceSink};
pub use device::{ChunkStream, DeviceBuilder, DeviceConfig, DeviceFile, YesDevice};
pub use error::{CacheError, ConfigError, Error, Result, SessionError};
pub use session::{SessionHandle, SessionRegistry};
