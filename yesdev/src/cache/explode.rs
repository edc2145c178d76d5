//! Sizing and fill arithmetic for the exploded buffer.

use crate::error::CacheError;

/// Pattern served before anything has been written.
pub const DEFAULT_PATTERN: &[u8] = b"y\n";

/// Smallest exploded buffer, two 4 KiB pages.
pub const DEFAULT_MINIMUM_SIZE: usize = 8192;

/// The pattern actually repeated: the written bytes, or the default when
/// nothing has been written yet.
pub fn effective_pattern(written: &[u8]) -> &[u8] {
    if written.is_empty() {
        DEFAULT_PATTERN
    } else {
        written
    }
}

/// Round `minimum_size` up to the next multiple of `period`.
///
/// Returns `None` when the rounded size does not fit in `usize`.
pub fn exploded_size(minimum_size: usize, period: usize) -> Option<usize> {
    let period = period.max(1);
    match minimum_size % period {
        0 => Some(minimum_size),
        rem => minimum_size.checked_add(period - rem),
    }
}

/// Build the exploded buffer for `written` with at least `minimum_size` bytes.
///
/// The buffer holds whole copies of the effective pattern; the last copy is
/// truncated only when it has to be to reach the exact size.
pub(crate) fn explode(written: &[u8], minimum_size: usize) -> Result<Box<[u8]>, CacheError> {
    let pattern = effective_pattern(written);
    let size = exploded_size(minimum_size, pattern.len())
        .ok_or(CacheError::OutOfMemory { requested: usize::MAX })?;

    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(size)
        .map_err(|_| CacheError::OutOfMemory { requested: size })?;

    while buffer.len() < size {
        let to_copy = (size - buffer.len()).min(pattern.len());
        buffer.extend_from_slice(&pattern[..to_copy]);
    }

    Ok(buffer.into_boxed_slice())
}
