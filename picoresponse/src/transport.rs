// SPDX-License-Identifier: Apache-2.0

//! The byte-stream connection a response is read from.
//!
//! [`Transport`] mirrors the small surface exposed by embedded network clients:
//! a connection flag, a count of bytes that can be read without blocking, single
//! byte reads and bulk reads. [`SliceTransport`] serves a response from memory and
//! can trickle it out in small pieces to exercise the streaming paths.

/// A byte-stream connection.
pub trait Transport {
    /// The error type returned by bulk reads
    type Error;

    /// Whether the peer is still connected.
    fn connected(&self) -> bool;

    /// Number of bytes that can be read right now without blocking.
    fn available(&mut self) -> usize;

    /// Read a single byte, or `None` if nothing is available.
    fn read_byte(&mut self) -> Option<u8>;

    /// Read up to `buf.len()` bytes. Returns the number of bytes obtained.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;

    /// Sleep for roughly `ms` milliseconds. The default does nothing.
    fn delay_ms(&mut self, _ms: u32) {}

    /// Block until bytes are available or `timeout_ms` has passed.
    ///
    /// Returns `true` when data can be read. The default polls [`available`]
    /// once per millisecond and gives up early if the peer disconnected.
    ///
    /// [`available`]: Transport::available
    fn wait_available(&mut self, timeout_ms: u32) -> bool {
        let mut waited = 0u32;
        loop {
            if self.available() > 0 {
                return true;
            }
            if waited >= timeout_ms || !self.connected() {
                return false;
            }
            self.delay_ms(1);
            waited = waited.saturating_add(1);
        }
    }
}

impl<T: Transport + ?Sized> Transport for &mut T {
    type Error = T::Error;

    fn connected(&self) -> bool {
        (**self).connected()
    }

    fn available(&mut self) -> usize {
        (**self).available()
    }

    fn read_byte(&mut self) -> Option<u8> {
        (**self).read_byte()
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        (**self).read(buf)
    }

    fn delay_ms(&mut self, ms: u32) {
        (**self).delay_ms(ms)
    }

    fn wait_available(&mut self, timeout_ms: u32) -> bool {
        (**self).wait_available(timeout_ms)
    }
}

/// A [`Transport`] that serves a byte slice, optionally in fixed-size pieces.
///
/// # Example
///
/// ```rust
/// use picoresponse::{SliceTransport, Transport};
///
/// let mut transport = SliceTransport::new(b"hello world", 4);
/// let mut buf = [0u8; 16];
/// assert_eq!(transport.read(&mut buf), Ok(4));
/// assert_eq!(&buf[..4], b"hell");
/// ```
#[derive(Debug)]
pub struct SliceTransport<'a> {
    data: &'a [u8],
    pos: usize,
    piece_size: usize,
    hold_open: bool,
    waited_ms: u64,
    /// Bytes that arrive per millisecond of delay; `None` means all at once
    trickle: Option<usize>,
    arrived: usize,
}

impl<'a> SliceTransport<'a> {
    /// Serve `data`, returning at most `piece_size` bytes per bulk read.
    pub fn new(data: &'a [u8], piece_size: usize) -> Self {
        Self {
            data,
            pos: 0,
            piece_size: piece_size.max(1),
            hold_open: false,
            waited_ms: 0,
            trickle: None,
            arrived: 0,
        }
    }

    /// Serve `data` with no limit on bulk reads.
    pub fn full_slice(data: &'a [u8]) -> Self {
        Self::new(data, usize::MAX)
    }

    /// Keep reporting a live connection after the data ran out, like a
    /// server that stalls mid-response.
    pub fn hold_open(mut self) -> Self {
        self.hold_open = true;
        self
    }

    /// Make only `bytes_per_ms` bytes visible up front and the same amount
    /// more for every millisecond spent in [`Transport::delay_ms`], like a slow
    /// link where lines arrive in pieces.
    pub fn trickle(mut self, bytes_per_ms: usize) -> Self {
        let step = bytes_per_ms.max(1);
        self.trickle = Some(step);
        self.arrived = step;
        self
    }

    /// End of the data that has arrived so far.
    fn arrived_end(&self) -> usize {
        match self.trickle {
            Some(_) => self.arrived.min(self.data.len()),
            None => self.data.len(),
        }
    }

    /// Bytes not yet handed out.
    pub fn remaining(&self) -> &'a [u8] {
        self.data.get(self.pos..).unwrap_or_default()
    }

    /// Total milliseconds spent in [`Transport::delay_ms`].
    pub fn waited_ms(&self) -> u64 {
        self.waited_ms
    }
}

impl Transport for SliceTransport<'_> {
    type Error = ();

    fn connected(&self) -> bool {
        self.hold_open || self.pos < self.data.len()
    }

    fn available(&mut self) -> usize {
        self.arrived_end().saturating_sub(self.pos)
    }

    fn read_byte(&mut self) -> Option<u8> {
        if self.pos >= self.arrived_end() {
            return None;
        }
        let byte = self.data.get(self.pos).copied()?;
        self.pos = self.pos.saturating_add(1);
        Some(byte)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let remaining = self.remaining();
        let to_copy = self
            .available()
            .min(buf.len())
            .min(self.piece_size);
        if let (Some(dest), Some(src)) = (buf.get_mut(..to_copy), remaining.get(..to_copy)) {
            dest.copy_from_slice(src);
            self.pos = self.pos.saturating_add(to_copy);
            Ok(to_copy)
        } else {
            Ok(0)
        }
    }

    fn delay_ms(&mut self, ms: u32) {
        self.waited_ms = self.waited_ms.saturating_add(u64::from(ms));
        if let Some(step) = self.trickle {
            let more = step.saturating_mul(usize::try_from(ms).unwrap_or(usize::MAX));
            self.arrived = self.arrived.saturating_add(more);
        }
    }
}
