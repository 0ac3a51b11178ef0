use std::io::{ErrorKind, Write};

use bytes::{BufMut, BytesMut};

use crate::codec::{encode_block, END_OF_STREAM};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Wraps payloads as delimited, escaped blocks on any `Write` sink.
///
/// Each [`write_block`](Self::write_block) call produces exactly one
/// block; [`finish`](Self::finish) emits the end-of-stream marker and
/// must be called exactly once, after the last block.
pub struct BlockWriter<W> {
    inner: W,
    buf: BytesMut,
}

impl<W: Write> BlockWriter<W> {
    /// Create a block writer over a sink.
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
        }
    }

    /// Encode one payload as a block and write it out in full (blocking).
    ///
    /// Returns the unescaped payload length, so the caller's count of
    /// bytes consumed matches what it handed in rather than the expanded
    /// wire size.
    pub fn write_block(&mut self, payload: &[u8]) -> Result<usize> {
        self.buf.clear();
        encode_block(payload, &mut self.buf);
        self.write_buffered()?;
        self.flush()?;
        Ok(payload.len())
    }

    /// Emit the single unescaped end-of-stream marker and flush.
    ///
    /// The marker sits outside any block and is recognizable even as the
    /// first byte of a session.
    pub fn finish(&mut self) -> Result<()> {
        self.buf.clear();
        self.buf.put_u8(END_OF_STREAM);
        self.write_buffered()?;
        self.flush()
    }

    fn write_buffered(&mut self) -> Result<()> {
        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(FrameError::SinkClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
        Ok(())
    }

    /// Flush the underlying sink.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Borrow the underlying sink.
    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Mutably borrow the underlying sink.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }

    /// Consume the writer and return the inner sink.
    pub fn into_inner(self) -> W {
        self.inner
    }
}
