//! Per-session pattern cache.
//!
//! Reads are served from an exploded buffer: the pattern repeated until it
//! fills at least the configured minimum size. The buffer is built on the
//! first read after a write and reused until the next write, so a read only
//! costs a memory copy.
//!
//! Locking: one reader-writer lock guards the pattern and the exploded
//! buffer. Readers hold it shared while copying out, which lets any number
//! of them run at once. A reader that finds no buffer releases, takes the
//! lock exclusively, checks again, builds, and downgrades back to shared.
//! Writers hold it exclusively for the whole append.

use std::fmt;
use std::io::SeekFrom;
use std::sync::atomic::{AtomicUsize, Ordering};

use bytes::Bytes;
use log::{debug, trace};
use parking_lot::{MappedRwLockReadGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::explode::{DEFAULT_MINIMUM_SIZE, effective_pattern, explode};
use super::transfer::{ByteSink, ByteSource};
use crate::error::CacheError;

struct CacheState {
    /// Bytes written so far; empty means the default pattern.
    written: Vec<u8>,

    /// Materialized repetition of the pattern, `None` until the next read.
    exploded: Option<Box<[u8]>>,
}

/// Lazily materialized, cyclically consumed pattern buffer.
pub struct PatternCache {
    state: RwLock<CacheState>,

    /// Read position. Only moved while a guard on `state` is held.
    cursor: AtomicUsize,

    minimum_size: usize,
}

impl PatternCache {
    /// Create an empty cache whose buffer holds at least `minimum_size` bytes.
    pub fn new(minimum_size: usize) -> Self {
        Self {
            state: RwLock::new(CacheState {
                written: Vec::new(),
                exploded: None,
            }),
            cursor: AtomicUsize::new(0),
            minimum_size: minimum_size.max(1),
        }
    }

    /// Create a cache with the default two-page minimum.
    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_MINIMUM_SIZE)
    }

    /// Minimum exploded buffer size.
    pub fn minimum_size(&self) -> usize {
        self.minimum_size
    }

    /// Append `bytes` to the pattern and drop the exploded buffer.
    pub fn write(&self, bytes: &[u8]) -> Result<usize, CacheError> {
        let mut source = bytes;
        self.write_from(&mut source)
    }

    /// Append everything `source` announces to the pattern.
    ///
    /// On a short source the append is rolled back and the pattern is left
    /// as it was.
    pub fn write_from<S: ByteSource + ?Sized>(&self, source: &mut S) -> Result<usize, CacheError> {
        let count = source.remaining();
        let mut state = self.state.write();

        let old_len = state.written.len();
        let new_len = old_len
            .checked_add(count)
            .ok_or(CacheError::OutOfMemory { requested: usize::MAX })?;
        state
            .written
            .try_reserve_exact(count)
            .map_err(|_| CacheError::OutOfMemory { requested: new_len })?;
        state.written.resize(new_len, 0);

        let mut supplied = 0;
        while supplied < count {
            let n = source.supply(&mut state.written[old_len + supplied..]);
            if n == 0 {
                state.written.truncate(old_len);
                return Err(CacheError::TransferFault { delivered: supplied });
            }
            supplied += n;
        }

        if state.exploded.take().is_some() {
            trace!("cache: invalidated exploded buffer, pattern now {} bytes", new_len);
        }

        Ok(count)
    }

    /// Read `count` bytes into a fresh buffer.
    pub fn read(&self, count: usize) -> Result<Bytes, CacheError> {
        let mut out = Vec::new();
        out.try_reserve_exact(count)
            .map_err(|_| CacheError::OutOfMemory { requested: count })?;
        self.read_into(count, &mut out)?;
        Ok(Bytes::from(out))
    }

    /// Copy `count` bytes of the cyclic stream into `sink`.
    ///
    /// Returns the number of bytes delivered, which is `count` unless the
    /// sink refused some. A sink that refuses the very first byte yields
    /// [`CacheError::TransferFault`].
    pub fn read_into<K: ByteSink + ?Sized>(
        &self,
        count: usize,
        sink: &mut K,
    ) -> Result<usize, CacheError> {
        if count == 0 {
            return Ok(0);
        }

        let buffer = self.materialize()?;
        let size = buffer.len();
        if size == 0 {
            return Ok(0);
        }

        // Claim [start, start + count) so concurrent readers get disjoint ranges
        let advance = count % size;
        let previous = match self
            .cursor
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |cursor| {
                Some((cursor % size + advance) % size)
            }) {
            Ok(previous) | Err(previous) => previous,
        };
        let start = previous % size;

        let mut delivered = 0;
        let mut position = start;
        while delivered < count {
            let to_copy = (count - delivered).min(size - position);
            let copied = sink
                .accept(&buffer[position..position + to_copy])
                .min(to_copy);
            delivered += copied;
            position = (position + copied) % size;

            if copied < to_copy {
                // Hand back the undelivered part of the claim unless another
                // reader has claimed past it already, in which case those
                // bytes are skipped. Readers that claim exactly one full cycle
                // in between leave the cursor on `claimed_end` again and get
                // rewound over; that race is accepted.
                let claimed_end = (start + advance) % size;
                if self
                    .cursor
                    .compare_exchange(claimed_end, position, Ordering::AcqRel, Ordering::Acquire)
                    .is_err()
                {
                    trace!(
                        "cache: cursor moved on, skipping {} undelivered bytes",
                        count - delivered
                    );
                }
                if delivered == 0 {
                    return Err(CacheError::TransferFault { delivered });
                }
                return Ok(delivered);
            }
        }

        Ok(delivered)
    }

    /// Move the cursor.
    ///
    /// The stored offset may exceed the buffer; the next read reduces it
    /// modulo the buffer size.
    pub fn seek(&self, pos: SeekFrom) -> Result<u64, CacheError> {
        let _state = self.state.read();

        let target = match pos {
            SeekFrom::Start(offset) => i128::from(offset),
            SeekFrom::Current(delta) => {
                self.cursor.load(Ordering::Acquire) as i128 + i128::from(delta)
            }
            SeekFrom::End(_) => return Err(CacheError::SeekUnsupported),
        };

        let cursor =
            usize::try_from(target).map_err(|_| CacheError::InvalidSeek { offset: target })?;
        self.cursor.store(cursor, Ordering::Release);
        Ok(cursor as u64)
    }

    /// Current cursor value.
    pub fn position(&self) -> usize {
        self.cursor.load(Ordering::Acquire)
    }

    /// The pattern being repeated (the default if nothing was written).
    pub fn pattern(&self) -> Vec<u8> {
        effective_pattern(&self.state.read().written).to_vec()
    }

    /// Size of the exploded buffer, if it is currently built.
    pub fn buffer_len(&self) -> Option<usize> {
        self.state.read().exploded.as_ref().map(|buffer| buffer.len())
    }

    /// Whether the exploded buffer is currently built.
    pub fn is_materialized(&self) -> bool {
        self.state.read().exploded.is_some()
    }

    /// Shared guard over a built exploded buffer.
    fn materialize(&self) -> Result<MappedRwLockReadGuard<'_, [u8]>, CacheError> {
        let state = self.state.read();
        if state.exploded.is_some() {
            return Ok(RwLockReadGuard::map(state, exploded_slice));
        }
        drop(state);

        let mut state = self.state.write();
        // Another reader may have built it between the two acquisitions
        if state.exploded.is_none() {
            let buffer = explode(&state.written, self.minimum_size)?;
            debug!(
                "cache: materialized {} byte buffer from {} byte pattern",
                buffer.len(),
                effective_pattern(&state.written).len()
            );
            state.exploded = Some(buffer);
        }

        Ok(RwLockReadGuard::map(
            RwLockWriteGuard::downgrade(state),
            exploded_slice,
        ))
    }
}

fn exploded_slice(state: &CacheState) -> &[u8] {
    state.exploded.as_deref().unwrap_or(&[])
}

impl Default for PatternCache {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl fmt::Debug for PatternCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("PatternCache")
            .field("written_len", &state.written.len())
            .field(
                "exploded_len",
                &state.exploded.as_ref().map(|buffer| buffer.len()),
            )
            .field("cursor", &self.cursor.load(Ordering::Relaxed))
            .field("minimum_size", &self.minimum_size)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::Barrier;
    use std::thread;

    use super::*;
    use crate::cache::SliceSink;

    fn cyclic(pattern: &[u8], start: usize, count: usize) -> Vec<u8> {
        (0..count)
            .map(|i| pattern[(start + i) % pattern.len()])
            .collect()
    }

    #[test]
    fn test_default_pattern() {
        let cache = PatternCache::with_defaults();
        assert_eq!(cache.read(3).unwrap(), &b"y\ny"[..]);
        assert_eq!(cache.read(3).unwrap(), &b"\ny\n"[..]);
    }

    #[test]
    fn test_default_pattern_larger_than_buffer() {
        let cache = PatternCache::new(16);
        let data = cache.read(1000).unwrap();
        assert_eq!(data.len(), 1000);
        assert_eq!(&data[..], &cyclic(b"y\n", 0, 1000)[..]);
    }

    #[test]
    fn test_write_then_read_rounds_buffer_up() {
        let cache = PatternCache::new(8);
        assert_eq!(cache.write(b"ab").unwrap(), 2);
        assert_eq!(cache.read(5).unwrap(), &b"ababa"[..]);
        assert_eq!(cache.buffer_len(), Some(8));
    }

    #[test]
    fn test_read_pattern_length_returns_pattern() {
        let cache = PatternCache::with_defaults();
        cache.write(b"hello\n").unwrap();
        assert_eq!(cache.read(6).unwrap(), &b"hello\n"[..]);
        assert_eq!(cache.buffer_len(), Some(8196));

        let many = cache.read(6 * 3000).unwrap();
        assert_eq!(&many[..], b"hello\n".repeat(3000).as_slice());
    }

    #[test]
    fn test_writes_append() {
        let cache = PatternCache::new(8);
        cache.write(b"ab").unwrap();
        cache.write(b"c").unwrap();
        assert_eq!(cache.pattern(), b"abc");
        assert_eq!(cache.read(9).unwrap(), &b"abcabcabc"[..]);
    }

    #[test]
    fn test_concatenation_law() {
        let split = PatternCache::new(10);
        let whole = PatternCache::new(10);
        split.write(b"xyz").unwrap();
        whole.write(b"xyz").unwrap();

        let mut joined = split.read(7).unwrap().to_vec();
        joined.extend_from_slice(&split.read(7).unwrap());
        assert_eq!(joined, whole.read(14).unwrap().to_vec());
    }

    #[test]
    fn test_write_invalidates_without_resetting_cursor() {
        let cache = PatternCache::new(8);
        assert_eq!(cache.read(3).unwrap(), &b"y\ny"[..]);
        assert!(cache.is_materialized());

        cache.write(b"abcd").unwrap();
        assert!(!cache.is_materialized());
        assert_eq!(cache.position(), 3);

        // Cursor 3 carries over into the rebuilt "abcdabcd" buffer
        assert_eq!(cache.read(4).unwrap(), &b"dabc"[..]);
    }

    #[test]
    fn test_empty_write_still_invalidates() {
        let cache = PatternCache::new(8);
        cache.read(1).unwrap();
        assert_eq!(cache.write(b"").unwrap(), 0);
        assert!(!cache.is_materialized());
        assert_eq!(cache.pattern(), b"y\n");
    }

    #[test]
    fn test_read_zero() {
        let cache = PatternCache::new(8);
        assert!(cache.read(0).unwrap().is_empty());
        assert!(!cache.is_materialized());
    }

    #[test]
    fn test_partial_sink_reports_delivered() {
        let cache = PatternCache::new(8);
        cache.write(b"abcd").unwrap();

        let mut buf = [0u8; 3];
        let mut sink = SliceSink::new(&mut buf);
        assert_eq!(cache.read_into(10, &mut sink).unwrap(), 3);
        assert_eq!(&buf, b"abc");

        // Cursor reflects exactly what was delivered
        assert_eq!(cache.position(), 3);
        assert_eq!(cache.read(2).unwrap(), &b"da"[..]);
    }

    #[test]
    fn test_refused_sink_is_fault() {
        let cache = PatternCache::new(8);
        let mut buf = [0u8; 0];
        let mut sink = SliceSink::new(&mut buf);
        let err = cache.read_into(4, &mut sink).unwrap_err();
        assert_eq!(err, CacheError::TransferFault { delivered: 0 });
        assert_eq!(cache.position(), 0);
    }

    struct ShortSource {
        announced: usize,
        data: &'static [u8],
    }

    impl ByteSource for ShortSource {
        fn remaining(&self) -> usize {
            self.announced
        }

        fn supply(&mut self, dst: &mut [u8]) -> usize {
            let n = dst.len().min(self.data.len());
            dst[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            n
        }
    }

    #[test]
    fn test_short_source_rolls_back() {
        let cache = PatternCache::new(8);
        cache.write(b"ab").unwrap();
        cache.read(1).unwrap();

        let mut source = ShortSource {
            announced: 5,
            data: b"xyz",
        };
        let err = cache.write_from(&mut source).unwrap_err();
        assert_eq!(err, CacheError::TransferFault { delivered: 3 });
        assert_eq!(cache.pattern(), b"ab");
        assert!(cache.is_materialized());
    }

    struct InterleavingSink<'a> {
        cache: &'a PatternCache,
        interleaved: Option<Bytes>,
        accepted: Vec<u8>,
    }

    impl ByteSink for InterleavingSink<'_> {
        fn accept(&mut self, chunk: &[u8]) -> usize {
            // Another reader claims while this read is still copying out
            if self.interleaved.is_none() {
                self.interleaved = Some(self.cache.read(2).unwrap());
            }
            let n = chunk.len().min(1);
            self.accepted.extend_from_slice(&chunk[..n]);
            n
        }
    }

    #[test]
    fn test_short_sink_skips_when_cursor_moved_on() {
        let cache = PatternCache::new(8);
        cache.write(b"abcd").unwrap();

        let mut sink = InterleavingSink {
            cache: &cache,
            interleaved: None,
            accepted: Vec::new(),
        };
        assert_eq!(cache.read_into(4, &mut sink).unwrap(), 1);
        assert_eq!(sink.accepted, b"a");
        assert_eq!(sink.interleaved.unwrap(), &b"ab"[..]);

        // The later claim stands; "bcd" of the first claim is not handed back
        assert_eq!(cache.position(), 6);
        assert_eq!(cache.read(1).unwrap(), &b"c"[..]);
    }

    #[test]
    fn test_failed_build_leaves_cache_empty() {
        let cache = PatternCache::new(usize::MAX);
        cache.write(b"ab").unwrap();

        let err = cache.read(1).unwrap_err();
        assert!(matches!(err, CacheError::OutOfMemory { .. }));
        assert!(!cache.is_materialized());
        assert_eq!(cache.position(), 0);

        assert_eq!(cache.write(b"c").unwrap(), 1);
        assert_eq!(cache.pattern(), b"abc");
    }

    struct EndlessSource;

    impl ByteSource for EndlessSource {
        fn remaining(&self) -> usize {
            usize::MAX
        }

        fn supply(&mut self, dst: &mut [u8]) -> usize {
            dst.fill(b'z');
            dst.len()
        }
    }

    #[test]
    fn test_oversized_write_leaves_cache_untouched() {
        let cache = PatternCache::new(8);
        cache.write(b"ab").unwrap();
        cache.read(1).unwrap();

        let err = cache.write_from(&mut EndlessSource).unwrap_err();
        assert!(matches!(err, CacheError::OutOfMemory { .. }));
        assert_eq!(cache.pattern(), b"ab");
        assert!(cache.is_materialized());
        assert_eq!(cache.read(3).unwrap(), &b"bab"[..]);
    }

    #[test]
    fn test_seek() {
        let cache = PatternCache::new(8);
        cache.write(b"abcd").unwrap();

        assert_eq!(cache.seek(SeekFrom::Start(2)).unwrap(), 2);
        assert_eq!(cache.read(2).unwrap(), &b"cd"[..]);

        assert_eq!(cache.seek(SeekFrom::Current(-3)).unwrap(), 1);
        assert_eq!(cache.read(1).unwrap(), &b"b"[..]);

        // Offsets past the buffer wrap on the next read
        cache.seek(SeekFrom::Start(8 * 5 + 3)).unwrap();
        assert_eq!(cache.read(1).unwrap(), &b"d"[..]);
    }

    #[test]
    fn test_seek_errors() {
        let cache = PatternCache::new(8);
        assert_eq!(
            cache.seek(SeekFrom::End(0)).unwrap_err(),
            CacheError::SeekUnsupported
        );
        assert_eq!(
            cache.seek(SeekFrom::Current(-1)).unwrap_err(),
            CacheError::InvalidSeek { offset: -1 }
        );
        assert_eq!(cache.position(), 0);
    }

    #[test]
    fn test_seek_before_first_read_does_not_materialize() {
        let cache = PatternCache::new(8);
        cache.seek(SeekFrom::Start(1)).unwrap();
        assert!(!cache.is_materialized());
        assert_eq!(cache.read(2).unwrap(), &b"\ny"[..]);
    }

    #[test]
    fn test_concurrent_reads_tile() {
        const THREADS: usize = 8;
        const READS: usize = 200;
        const COUNT: usize = 7;

        let cache = Arc::new(PatternCache::new(64));
        cache.write(b"0123456789").unwrap();
        let barrier = Barrier::new(THREADS);

        let firsts = thread::scope(|scope| {
            let handles: Vec<_> = (0..THREADS)
                .map(|_| {
                    let cache = &cache;
                    let barrier = &barrier;
                    scope.spawn(move || {
                        barrier.wait();
                        let mut starts = Vec::with_capacity(READS);
                        for _ in 0..READS {
                            let data = cache.read(COUNT).unwrap();
                            let first = (data[0] - b'0') as usize;
                            // Every slice is an unbroken run of the pattern
                            assert_eq!(&data[..], &cyclic(b"0123456789", first, COUNT)[..]);
                            starts.push(first);
                        }
                        starts
                    })
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|handle| handle.join().unwrap())
                .collect::<Vec<_>>()
        });

        // Total consumption equals one sequential read of the same length
        let total = THREADS * READS * COUNT;
        assert_eq!(cache.position(), total % 70);

        // Stepping by 7 through a 70 byte cycle visits each digit equally often
        let mut seen = [0usize; 10];
        for first in firsts {
            seen[first] += 1;
        }
        assert!(seen.iter().all(|&n| n == THREADS * READS / 10));
    }

    #[test]
    fn test_concurrent_first_read_builds_once() {
        let cache = PatternCache::new(4096);
        cache.write(b"abc").unwrap();

        thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    let data = cache.read(3).unwrap();
                    assert_eq!(data.len(), 3);
                });
            }
        });

        assert_eq!(cache.buffer_len(), Some(4098));
        assert_eq!(cache.position(), 24 % 4098);
    }

    #[test]
    fn test_reads_never_mix_patterns() {
        const WRITES: usize = 40;

        let cache = PatternCache::new(16);
        cache.write(b"ab").unwrap();

        thread::scope(|scope| {
            scope.spawn(|| {
                for _ in 0..WRITES {
                    cache.write(b"b").unwrap();
                }
            });
            scope.spawn(|| {
                for _ in 0..500 {
                    // Pattern is one 'a' followed by some 'b's, so within one
                    // buffer the 'a's are exactly one pattern length apart
                    let data = cache.read(150).unwrap();
                    let marks: Vec<usize> = data
                        .iter()
                        .enumerate()
                        .filter(|(_, byte)| **byte == b'a')
                        .map(|(i, _)| i)
                        .collect();
                    assert!(marks.len() >= 3);
                    let gaps: Vec<usize> = marks.windows(2).map(|w| w[1] - w[0]).collect();
                    assert!(gaps.iter().all(|&gap| gap == gaps[0]), "mixed read: {:?}", gaps);
                }
            });
        });

        let mut expected = b"a".to_vec();
        expected.extend(std::iter::repeat_n(b'b', WRITES + 1));
        assert_eq!(cache.pattern(), expected);
    }
}
