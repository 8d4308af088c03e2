// SPDX-License-Identifier: Apache-2.0

//! The response envelope: header scan, result iteration and field access.

#[cfg(feature = "alloc")]
use alloc::vec;
#[cfg(feature = "alloc")]
use alloc::vec::Vec;

use crate::extractor::extract;
use crate::headers::scan_headers;
use crate::{
    ByteSource, ChunkedSource, Config, Error, FieldLookup, FlatFields, JsonInt, ResponseHead,
    Transport, DEFAULT_WINDOW,
};

/// Literal prefix of the body that holds the array of interest.
const RESULTS_ANCHOR: &[u8] = br#"{"results":["#;

/// Capacity of the scratch area behind [`Response::get_string`].
const STRING_SCRATCH_CAPACITY: usize = 64;

/// Number of elements in the results array, as far as it is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultCount {
    /// Not computed yet.
    Unknown,
    /// The response could not be read up to the results array.
    Failed,
    /// The body does not start with the results anchor.
    Malformed,
    /// The array holds no element that could be extracted.
    Empty,
    /// Estimated from the size of the first element; always at least 1.
    ///
    /// The estimate can be off when elements differ in size. Iterate with
    /// [`Response::next_object`] until it returns `false` for the real count.
    Estimated(usize),
}

impl ResultCount {
    /// The integer form: `-1` for unknown or failed, `0` for empty, else the estimate.
    pub fn as_raw(self) -> i32 {
        match self {
            ResultCount::Unknown | ResultCount::Failed | ResultCount::Malformed => -1,
            ResultCount::Empty => 0,
            ResultCount::Estimated(n) => i32::try_from(n).unwrap_or(i32::MAX),
        }
    }

    /// True when there is at least one element to iterate.
    pub fn has_results(self) -> bool {
        matches!(self, ResultCount::Estimated(_))
    }
}

/// Estimate the element count from the announced body size and the serialized
/// size of the first element. Chunked bodies are doubled to correct for the
/// announced size covering only the first chunk.
pub(crate) fn estimate_count(announced: usize, first_len: usize, chunked: bool) -> usize {
    let mut estimate = announced.checked_div(first_len).unwrap_or(0);
    if chunked {
        estimate = estimate.saturating_mul(2);
    }
    estimate.max(1)
}

/// The buffer fragments are written into.
#[derive(Debug, Default)]
pub enum OutputBuffer<'b> {
    /// No buffer yet.
    #[default]
    Unset,
    /// Supplied by the caller and never released by the response.
    Borrowed(&'b mut [u8]),
    /// Allocated by the response and released with it.
    #[cfg(feature = "alloc")]
    Owned(Vec<u8>),
}

impl OutputBuffer<'_> {
    /// The whole buffer.
    pub fn as_slice(&self) -> &[u8] {
        let slice: &[u8] = match self {
            OutputBuffer::Unset => &[],
            OutputBuffer::Borrowed(buf) => &buf[..],
            #[cfg(feature = "alloc")]
            OutputBuffer::Owned(buf) => buf.as_slice(),
        };
        slice
    }

    /// The whole buffer, writable.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        let slice: &mut [u8] = match self {
            OutputBuffer::Unset => &mut [],
            OutputBuffer::Borrowed(buf) => &mut buf[..],
            #[cfg(feature = "alloc")]
            OutputBuffer::Owned(buf) => buf.as_mut_slice(),
        };
        slice
    }

    /// True if a buffer of any kind is installed.
    pub fn is_set(&self) -> bool {
        !matches!(self, OutputBuffer::Unset)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Nothing past the headers has been consumed.
    Fresh,
    /// The whole body was copied into the buffer.
    BodyRead,
    /// The results array is being walked.
    Iterating,
}

/// A response being decoded from a [`Transport`].
///
/// Use [`count`](Self::count) and [`next_object`](Self::next_object) to walk a
/// `{"results":[...]}` body one element at a time, or the field accessors
/// directly for a single-object body. Each request needs its own `Response`.
///
/// `W` is the capacity of the chunk window, `F` the field lookup.
pub struct Response<'b, T: Transport, F: FieldLookup = FlatFields, const W: usize = DEFAULT_WINDOW>
{
    source: ChunkedSource<T, W>,
    lookup: F,
    config: Config,
    buffer: OutputBuffer<'b>,
    fragment_len: usize,
    scratch: [u8; STRING_SCRATCH_CAPACITY],
    head: Option<ResponseHead>,
    result_count: ResultCount,
    first_pending: bool,
    phase: Phase,
}

impl<'b, T: Transport> Response<'b, T> {
    /// Decode the response arriving on `transport` with default settings.
    pub fn new(transport: T) -> Self {
        Self::with_lookup(transport, Config::default(), FlatFields)
    }

    /// Decode with custom settings.
    pub fn with_config(transport: T, config: Config) -> Self {
        Self::with_lookup(transport, config, FlatFields)
    }
}

impl<'b, T: Transport, F: FieldLookup, const W: usize> Response<'b, T, F, W> {
    /// Decode with custom settings and a custom field lookup.
    pub fn with_lookup(transport: T, config: Config, lookup: F) -> Self {
        Self {
            source: ChunkedSource::new(transport),
            lookup,
            config,
            buffer: OutputBuffer::Unset,
            fragment_len: 0,
            scratch: [0; STRING_SCRATCH_CAPACITY],
            head: None,
            result_count: ResultCount::Unknown,
            first_pending: false,
            phase: Phase::Fresh,
        }
    }

    /// Use a caller-owned output buffer. Ignored if `buffer` is empty.
    ///
    /// The buffer is zeroed. It must hold the largest expected element (or the
    /// whole body when using the field accessors without iterating); longer
    /// fragments are truncated.
    pub fn set_buffer(&mut self, buffer: &'b mut [u8]) {
        if buffer.is_empty() {
            return;
        }
        buffer.fill(0);
        self.buffer = OutputBuffer::Borrowed(buffer);
        self.fragment_len = 0;
    }

    /// Release an internally allocated buffer and clear the string scratch.
    /// A caller-owned buffer stays installed.
    pub fn close(&mut self) {
        #[cfg(feature = "alloc")]
        if matches!(self.buffer, OutputBuffer::Owned(_)) {
            self.buffer = OutputBuffer::Unset;
            self.fragment_len = 0;
        }
        self.scratch.fill(0);
    }

    /// The configuration in use.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The header summary, once the header block has been read.
    pub fn head(&self) -> Option<&ResponseHead> {
        self.head.as_ref()
    }

    /// Whether the status line was the configured success line. `false` until
    /// the headers have been read.
    pub fn is_ok(&self) -> bool {
        self.head.is_some_and(|head| head.ok)
    }

    /// Number of bytes the transport can deliver without waiting.
    pub fn available(&mut self) -> usize {
        self.source.transport_mut().available()
    }

    /// The fragment currently held in the output buffer.
    pub fn fragment(&self) -> &[u8] {
        self.buffer
            .as_slice()
            .get(..self.fragment_len)
            .unwrap_or_default()
    }

    fn ensure_buffer(&mut self) {
        if self.buffer.is_set() {
            return;
        }
        #[cfg(feature = "alloc")]
        {
            self.buffer = OutputBuffer::Owned(vec![0; self.config.buffer_size]);
        }
        #[cfg(not(feature = "alloc"))]
        log::debug!("No output buffer installed; fragments will be empty");
    }

    fn ensure_head(&mut self) -> Result<ResponseHead, Error> {
        if let Some(head) = self.head {
            return Ok(head);
        }
        let head = scan_headers(self.source.transport_mut(), &self.config)?;
        self.source
            .begin_body(head.framing(), head.announced_length());
        self.head = Some(head);
        Ok(head)
    }

    /// Consume the results anchor one byte at a time.
    fn seek_results_anchor(&mut self) -> Result<(), Error> {
        for &expected in RESULTS_ANCHOR {
            let byte = self.source.next_byte(self.config.query_timeout_ms)?;
            if byte != expected {
                return Err(Error::MissingResultsAnchor);
            }
        }
        Ok(())
    }

    fn establish_count(&mut self) -> ResultCount {
        if self.phase == Phase::BodyRead {
            log::debug!("Body already consumed; cannot iterate results");
            return ResultCount::Failed;
        }
        let head = match self.ensure_head() {
            Ok(head) => head,
            Err(e) => {
                log::debug!("Header scan failed: {e}");
                return ResultCount::Failed;
            }
        };
        self.phase = Phase::Iterating;

        match self.seek_results_anchor() {
            Ok(()) => {}
            Err(Error::MissingResultsAnchor) => {
                log::debug!("Malformed response!");
                return ResultCount::Malformed;
            }
            Err(e) => {
                log::debug!("Results anchor not reached: {e}");
                return ResultCount::Failed;
            }
        }

        self.ensure_buffer();
        let timeout_ms = self.config.query_timeout_ms;
        match extract(&mut self.source, self.buffer.as_mut_slice(), timeout_ms) {
            Ok(len) => {
                self.fragment_len = len;
                self.first_pending = true;
                let estimate = estimate_count(head.announced_length(), len, head.chunked);
                log::debug!("Estimated {estimate} results from first element of {len} bytes");
                ResultCount::Estimated(estimate)
            }
            Err(e) => {
                self.fragment_len = 0;
                log::debug!("No results: {e}");
                ResultCount::Empty
            }
        }
    }

    /// Establish the number of elements in the results array.
    ///
    /// The first call reads the headers, the results anchor and the first
    /// element, which stays buffered for the first [`next_object`] call. Later
    /// calls return the cached value.
    ///
    /// [`next_object`]: Self::next_object
    pub fn count(&mut self) -> ResultCount {
        if self.result_count == ResultCount::Unknown {
            self.result_count = self.establish_count();
        }
        self.result_count
    }

    /// Advance to the next element of the results array.
    ///
    /// Returns `false` once the array is exhausted or the response failed. After
    /// a `true` return the field accessors read the current element. Iteration
    /// only moves forward.
    pub fn next_object(&mut self) -> bool {
        if !self.count().has_results() {
            return false;
        }
        if core::mem::take(&mut self.first_pending) {
            return true;
        }
        let timeout_ms = self.config.query_timeout_ms;
        match extract(&mut self.source, self.buffer.as_mut_slice(), timeout_ms) {
            Ok(len) => {
                self.fragment_len = len;
                true
            }
            Err(e) => {
                self.fragment_len = 0;
                if e.is_transport() {
                    log::debug!("Results cut short: {e}");
                } else {
                    log::trace!("End of results: {e}");
                }
                false
            }
        }
    }

    /// Read the whole body into the output buffer.
    ///
    /// For responses that are a single object rather than a results array. Runs
    /// once, and not at all after iteration has started. Carriage returns are
    /// dropped; bytes beyond the buffer capacity are read and discarded.
    pub fn read_body(&mut self) {
        if self.phase != Phase::Fresh {
            return;
        }
        self.phase = Phase::BodyRead;
        if let Err(e) = self.ensure_head() {
            log::debug!("Header scan failed: {e}");
            return;
        }
        self.ensure_buffer();

        let timeout_ms = self.config.query_timeout_ms;
        let buffer = self.buffer.as_mut_slice();
        buffer.fill(0);
        let mut len = 0usize;
        loop {
            match self.source.next_byte(timeout_ms) {
                Ok(b'\r') => {}
                Ok(byte) => {
                    if let Some(slot) = buffer.get_mut(len) {
                        *slot = byte;
                        len += 1;
                    }
                }
                Err(Error::EndOfBody) => break,
                Err(e) => {
                    log::debug!("Body read ended early: {e}");
                    break;
                }
            }
        }
        self.fragment_len = len;
    }

    /// Wait up to `max_secs` seconds for the response to start, then read the
    /// whole body.
    pub fn read_with_timeout(&mut self, max_secs: u32) {
        let transport = self.source.transport_mut();
        let mut remaining = max_secs;
        while transport.available() == 0 && remaining > 0 {
            transport.delay_ms(1000);
            remaining -= 1;
        }
        self.read_body();
    }

    /// The whole body, reading it first if needed.
    pub fn json_body(&mut self) -> &[u8] {
        self.read_body();
        self.fragment()
    }

    /// Before iteration starts, the accessors look at the whole body.
    fn prepare_fragment(&mut self) {
        if self.phase == Phase::Fresh {
            self.read_body();
        }
    }

    /// String value of `key` in the current fragment, or `""`.
    ///
    /// The value lives in a small scratch area that the next call overwrites;
    /// longer values are truncated.
    pub fn get_string(&mut self, key: &str) -> &str {
        self.prepare_fragment();
        let fragment = self
            .buffer
            .as_slice()
            .get(..self.fragment_len)
            .unwrap_or_default();
        let len = self.lookup.get_string(fragment, key, &mut self.scratch);
        self.scratch
            .get(..len)
            .and_then(|bytes| core::str::from_utf8(bytes).ok())
            .unwrap_or("")
    }

    /// Integer value of `key` in the current fragment, or 0.
    pub fn get_int(&mut self, key: &str) -> JsonInt {
        self.prepare_fragment();
        self.lookup.get_int(self.fragment(), key)
    }

    /// Floating point value of `key` in the current fragment, or 0.0.
    #[cfg(feature = "float")]
    pub fn get_double(&mut self, key: &str) -> f64 {
        self.prepare_fragment();
        self.lookup.get_float(self.fragment(), key)
    }

    /// Boolean value of `key` in the current fragment, or `false`.
    pub fn get_boolean(&mut self, key: &str) -> bool {
        self.prepare_fragment();
        self.lookup.get_boolean(self.fragment(), key)
    }

    /// The backend's `code` field, present on error responses.
    pub fn error_code(&mut self) -> JsonInt {
        self.get_int("code")
    }

    /// Give the transport back, dropping any owned buffer.
    pub fn into_transport(self) -> T {
        self.source.into_transport()
    }
}
