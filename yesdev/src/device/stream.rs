//! Endless chunked stream over a device file.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures_core::Stream;

use super::file::DeviceFile;
use crate::error::Result;

/// Stream yielding fixed-size chunks of a file's cyclic output.
///
/// Never terminates; each item is one read of `chunk_size` bytes. An item
/// is an error only if the read failed, and the stream keeps going after it.
///
/// # Example
///
/// ```rust
/// use futures_util::StreamExt;
/// use yesdev::YesDevice;
///
/// # tokio_test::block_on(async {
/// let device = YesDevice::with_defaults();
/// let file = device.open_file();
/// let chunks: Vec<_> = file.chunks_of(4).take(2).collect().await;
/// assert_eq!(chunks[0].as_ref().unwrap(), &b"y\ny\n"[..]);
/// # });
/// ```
#[derive(Debug)]
pub struct ChunkStream<'a> {
    file: &'a DeviceFile,
    chunk_size: usize,
}

impl<'a> ChunkStream<'a> {
    pub(crate) fn new(file: &'a DeviceFile, chunk_size: usize) -> Self {
        Self {
            file,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Bytes per item.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }
}

impl Stream for ChunkStream<'_> {
    type Item = Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let file = self.file;
        Poll::Ready(Some(file.device().read(file.handle(), self.chunk_size)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (usize::MAX, None)
    }
}
