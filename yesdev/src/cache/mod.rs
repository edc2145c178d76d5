//! Pattern cache layer.
//!
//! This module owns the per-session pattern, the exploded buffer built from
//! it, and the read cursor, along with the sizing arithmetic and the
//! sink/source traits used to move bytes in and out.

mod explode;
mod pattern;
mod transfer;

pub use explode::{DEFAULT_MINIMUM_SIZE, DEFAULT_PATTERN, effective_pattern, exploded_size};
pub use pattern::PatternCache;
pub use transfer::{ByteSink, ByteSource, SliceSink};
