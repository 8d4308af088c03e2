// SPDX-License-Identifier: Apache-2.0

//! Pull-one-byte access to a response body.
//!
//! [`ChunkedSource`] hides the body framing from everything above it. Bytes are
//! copied from the transport into a fixed [`ChunkWindow`] whose capacity is
//! independent of the announced chunk sizes, so a chunk larger than local memory
//! is drained over several refills.

use crate::line_reader::read_full_line;
use crate::{int_parser, Error, Transport, DEFAULT_WINDOW};

/// Capacity for a chunk-size line, extensions included.
const CHUNK_LINE_CAPACITY: usize = 16;

/// A source of body bytes, pulled one at a time.
pub trait ByteSource {
    /// Return the next byte, waiting up to `timeout_ms` for it to arrive.
    ///
    /// [`Error::EndOfBody`] marks the regular end of the body; any other error is
    /// a transport failure or a framing problem.
    fn next_byte(&mut self, timeout_ms: u32) -> Result<u8, Error>;
}

impl<S: ByteSource + ?Sized> ByteSource for &mut S {
    fn next_byte(&mut self, timeout_ms: u32) -> Result<u8, Error> {
        (**self).next_byte(timeout_ms)
    }
}

/// How the end of the body is determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// `Transfer-Encoding: chunked`, terminated by a zero-size chunk.
    Chunked,
    /// Exactly `Content-Length` bytes.
    Length,
    /// No framing information; the body ends when the peer disconnects.
    UntilClose,
}

/// Fixed-capacity holding area for the most recently read body segment.
#[derive(Debug)]
pub struct ChunkWindow<const W: usize> {
    bytes: [u8; W],
    cursor: usize,
    filled: usize,
}

impl<const W: usize> ChunkWindow<W> {
    /// An empty window.
    pub const fn new() -> Self {
        Self {
            bytes: [0; W],
            cursor: 0,
            filled: 0,
        }
    }

    /// Total capacity in bytes.
    pub const fn capacity(&self) -> usize {
        W
    }

    /// Bytes read from the transport but not yet handed out.
    pub fn pending(&self) -> usize {
        self.filled.saturating_sub(self.cursor)
    }

    /// True once every filled byte has been handed out.
    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.filled
    }

    fn take(&mut self) -> Option<u8> {
        if self.is_exhausted() {
            return None;
        }
        let byte = self.bytes.get(self.cursor).copied()?;
        self.cursor += 1;
        Some(byte)
    }

    fn fill_slice(&mut self, max: usize) -> &mut [u8] {
        self.bytes.get_mut(..max.min(W)).unwrap_or_default()
    }

    fn mark_filled(&mut self, bytes_read: usize) {
        self.filled = bytes_read.min(W);
        self.cursor = 0;
    }

    fn clear(&mut self) {
        self.filled = 0;
        self.cursor = 0;
    }
}

impl<const W: usize> Default for ChunkWindow<W> {
    fn default() -> Self {
        Self::new()
    }
}

/// A [`ByteSource`] over a transport positioned at the start of a response body.
pub struct ChunkedSource<T: Transport, const W: usize = DEFAULT_WINDOW> {
    transport: T,
    window: ChunkWindow<W>,
    framing: Framing,
    /// Body bytes still owed by the current chunk (or the whole `Length` body)
    remaining: usize,
    /// The size line of the current chunk was consumed by whoever positioned us
    size_line_consumed: bool,
    finished: bool,
}

impl<T: Transport, const W: usize> ChunkedSource<T, W> {
    /// Wrap a transport whose body framing is not known yet.
    ///
    /// Until [`begin_body`](Self::begin_body) is called the body is read until the
    /// peer disconnects.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            window: ChunkWindow::new(),
            framing: Framing::UntilClose,
            remaining: 0,
            size_line_consumed: false,
            finished: false,
        }
    }

    /// A chunked body whose first size line has already been read.
    pub fn chunked(transport: T, first_chunk_size: usize) -> Self {
        let mut source = Self::new(transport);
        source.begin_body(Framing::Chunked, first_chunk_size);
        source
    }

    /// A body of exactly `length` bytes.
    pub fn with_length(transport: T, length: usize) -> Self {
        let mut source = Self::new(transport);
        source.begin_body(Framing::Length, length);
        source
    }

    /// Start reading a body. For [`Framing::Chunked`], `announced` is the size
    /// of the first chunk, whose size line the caller has already consumed.
    pub fn begin_body(&mut self, framing: Framing, announced: usize) {
        self.framing = framing;
        self.remaining = announced;
        self.size_line_consumed = framing == Framing::Chunked;
        self.finished = false;
        self.window.clear();
    }

    /// The body framing in use.
    pub fn framing(&self) -> Framing {
        self.framing
    }

    /// True once the end of the body was reached.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Shared access to the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Direct access to the transport, used for the header block.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Give the transport back.
    pub fn into_transport(self) -> T {
        self.transport
    }

    fn finish(&mut self) -> Error {
        self.finished = true;
        Error::EndOfBody
    }

    fn await_data(&mut self, timeout_ms: u32) -> Result<(), Error> {
        if self.transport.wait_available(timeout_ms) {
            Ok(())
        } else if self.transport.connected() {
            Err(Error::Timeout)
        } else {
            Err(Error::TransportClosed)
        }
    }

    /// Skip the CRLF closing the previous chunk and parse the next size line.
    fn next_chunk_size(&mut self, timeout_ms: u32) -> Result<usize, Error> {
        let mut line = [0u8; CHUNK_LINE_CAPACITY];
        let closed = Error::TransportClosed;
        // The CRLF after the previous chunk's data
        read_full_line(&mut self.transport, &mut line, timeout_ms, closed)?;
        let len = read_full_line(&mut self.transport, &mut line, timeout_ms, closed)?;
        let size = int_parser::parse_chunk_size(line.get(..len).unwrap_or_default())?;
        log::debug!("Next chunk: {size} bytes");
        Ok(size)
    }

    fn refill(&mut self, timeout_ms: u32) -> Result<(), Error> {
        if self.remaining == 0 {
            match self.framing {
                Framing::Chunked => {
                    if !core::mem::take(&mut self.size_line_consumed) {
                        self.remaining = self.next_chunk_size(timeout_ms)?;
                    }
                    if self.remaining == 0 {
                        return Err(self.finish());
                    }
                }
                Framing::Length => return Err(self.finish()),
                Framing::UntilClose => {}
            }
        }
        self.size_line_consumed = false;

        match self.await_data(timeout_ms) {
            Err(Error::TransportClosed) if self.framing == Framing::UntilClose => {
                return Err(self.finish());
            }
            other => other?,
        }

        let capacity = self.window.capacity();
        let want = match self.framing {
            Framing::UntilClose => capacity,
            Framing::Chunked | Framing::Length => self.remaining.min(capacity),
        };
        let got = self
            .transport
            .read(self.window.fill_slice(want))
            .map_err(|_| Error::Transport)?;
        if got == 0 {
            return Err(Error::TransportClosed);
        }
        self.window.mark_filled(got);
        if self.framing != Framing::UntilClose {
            self.remaining = self.remaining.saturating_sub(got);
        }
        log::trace!(
            "Window refill: {} of {want} bytes pending, {} still owed",
            self.window.pending(),
            self.remaining
        );
        Ok(())
    }
}

impl<T: Transport, const W: usize> ByteSource for ChunkedSource<T, W> {
    fn next_byte(&mut self, timeout_ms: u32) -> Result<u8, Error> {
        if self.finished {
            return Err(Error::EndOfBody);
        }
        if self.window.is_exhausted() {
            self.refill(timeout_ms)?;
        }
        self.window.take().ok_or(Error::EndOfBody)
    }
}
