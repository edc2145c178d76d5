//! File-like handle on a device.

use std::io::{self, Read, Seek, SeekFrom, Write};
use std::pin::Pin;
use std::task::{Context, Poll};

use log::warn;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use super::YesDevice;
use super::stream::ChunkStream;
use crate::cache::SliceSink;
use crate::error::Result;
use crate::session::SessionHandle;

/// One open handle on a [`YesDevice`].
///
/// Implements the blocking and async I/O traits. Reads fill the whole
/// buffer and never hit end of file; async operations are always ready.
/// The handle is closed when the file is dropped.
#[derive(Debug)]
pub struct DeviceFile {
    device: YesDevice,
    handle: SessionHandle,
    closed: bool,
}

impl DeviceFile {
    pub(crate) fn new(device: YesDevice, handle: SessionHandle) -> Self {
        Self {
            device,
            handle,
            closed: false,
        }
    }

    /// The underlying handle.
    pub fn handle(&self) -> SessionHandle {
        self.handle
    }

    /// The device this file was opened on.
    pub fn device(&self) -> &YesDevice {
        &self.device
    }

    /// Stream the cyclic output in chunks of the configured size.
    pub fn chunks(&self) -> ChunkStream<'_> {
        ChunkStream::new(self, self.device.config().chunk_size)
    }

    /// Stream the cyclic output in chunks of `chunk_size` bytes.
    pub fn chunks_of(&self, chunk_size: usize) -> ChunkStream<'_> {
        ChunkStream::new(self, chunk_size)
    }

    /// Close the handle, reporting any error.
    pub fn close(mut self) -> Result<()> {
        self.closed = true;
        self.device.close(self.handle)
    }

    fn fill(&self, buf: &mut [u8]) -> io::Result<usize> {
        let count = buf.len();
        let mut sink = SliceSink::new(buf);
        Ok(self.device.read_into(self.handle, count, &mut sink)?)
    }
}

impl Read for DeviceFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.fill(buf)
    }
}

impl Write for DeviceFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(self.device.write(self.handle, buf)?)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for DeviceFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        Ok(self.device.seek(self.handle, pos)?)
    }
}

impl AsyncRead for DeviceFile {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let filled = match self.fill(buf.initialize_unfilled()) {
            Ok(filled) => filled,
            Err(e) => return Poll::Ready(Err(e)),
        };
        buf.advance(filled);
        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for DeviceFile {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Poll::Ready(
            self.device
                .write(self.handle, buf)
                .map_err(io::Error::from),
        )
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

impl Drop for DeviceFile {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(e) = self.device.close(self.handle) {
            warn!("DeviceFile {} dropped after its handle was closed: {}", self.handle, e);
        }
    }
}
