// SPDX-License-Identifier: Apache-2.0

//! Bounded extraction of a single JSON object or array.
//!
//! The extractor is a strict scanner for a known, well-formed producer. It copies
//! bytes from a [`ByteSource`] into a flat output slice until the delimiter that
//! closes the value it started on. Nesting is handled by recursion: each nested
//! level receives the part of the slice after its parent's write position and
//! reports how many bytes it wrote, so no parse stack is allocated and no level can
//! write into a region it does not own.
//!
//! Strings may be delimited by `"` or `'`; escape sequences are not interpreted.
//! When the output slice fills up the remaining bytes are dropped, not rejected.
//! Nesting that starts after the slice is full is skipped with a depth counter
//! instead of recursion, so stack use is bounded by the slice length, not by the
//! input.

use crate::{ByteSource, Error};

/// The kind of container a nesting level was opened with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    /// `{ ... }`
    Object,
    /// `[ ... ]`
    Array,
}

impl Delimiter {
    /// The delimiter opened by `byte`, if it is `{` or `[`.
    pub fn from_opener(byte: u8) -> Option<Self> {
        match byte {
            b'{' => Some(Delimiter::Object),
            b'[' => Some(Delimiter::Array),
            _ => None,
        }
    }

    /// The byte that closes this delimiter.
    pub fn closer(self) -> u8 {
        match self {
            Delimiter::Object => b'}',
            Delimiter::Array => b']',
        }
    }
}

/// Write cursor over one level's share of the output.
struct Fragment<'a> {
    buf: &'a mut [u8],
    len: usize,
}

impl<'a> Fragment<'a> {
    fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, len: 0 }
    }

    /// Store `byte` if there is room; otherwise drop it.
    fn push(&mut self, byte: u8) {
        if let Some(slot) = self.buf.get_mut(self.len) {
            *slot = byte;
            self.len += 1;
        }
    }

    /// The unwritten tail, handed to a nested level.
    fn rest(&mut self) -> &mut [u8] {
        self.buf.get_mut(self.len..).unwrap_or_default()
    }

    fn is_full(&self) -> bool {
        self.len >= self.buf.len()
    }

    fn advance(&mut self, written: usize) {
        self.len = self.len.saturating_add(written).min(self.buf.len());
    }
}

/// Extract the next JSON object or array from `source` into `out`.
///
/// Bytes before the opening delimiter are copied as well, except commas, which
/// lets consecutive array elements be read with repeated calls. `out` is zeroed
/// first. Returns the number of bytes written, which never exceeds `out.len()`;
/// an undersized `out` truncates the fragment without failing.
///
/// Fails if the source ends or errors before the closing delimiter, if a closer
/// appears before any opener, or if a closer does not match its opener.
///
/// # Example
///
/// ```rust
/// use picoresponse::{extract, ChunkedSource, SliceTransport};
///
/// let body = br#"{"a":{"b":1},"c":[1,2]}"#;
/// let mut source: ChunkedSource<_> =
///     ChunkedSource::with_length(SliceTransport::full_slice(body), body.len());
/// let mut out = [0u8; 64];
/// let len = extract(&mut source, &mut out, 100).unwrap();
/// assert_eq!(&out[..len], body);
/// ```
pub fn extract<S: ByteSource + ?Sized>(
    source: &mut S,
    out: &mut [u8],
    timeout_ms: u32,
) -> Result<usize, Error> {
    out.fill(0);
    let result = extract_level(source, out, None, timeout_ms);
    if let Err(e) = &result {
        log::debug!("Extraction failed: {e}");
    }
    result
}

/// One nesting level. `started` is the opener already consumed by the parent, if
/// any. Returns the bytes written into `out`, closing delimiter included.
fn extract_level<S: ByteSource + ?Sized>(
    source: &mut S,
    out: &mut [u8],
    mut started: Option<Delimiter>,
    timeout_ms: u32,
) -> Result<usize, Error> {
    let mut fragment = Fragment::new(out);
    let mut quote: Option<u8> = None;

    loop {
        let byte = source.next_byte(timeout_ms)?;

        if let Some(open_quote) = quote {
            if byte == open_quote {
                quote = None;
            }
            fragment.push(byte);
            continue;
        }

        match byte {
            b'"' | b'\'' => {
                quote = Some(byte);
                fragment.push(byte);
            }
            // Stray separator before this level's value
            b',' if started.is_none() => {}
            b'{' | b'[' => {
                fragment.push(byte);
                if started.is_none() {
                    started = Delimiter::from_opener(byte);
                } else if fragment.is_full() {
                    skip_nested(source, timeout_ms)?;
                } else {
                    let nested = extract_level(
                        source,
                        fragment.rest(),
                        Delimiter::from_opener(byte),
                        timeout_ms,
                    )?;
                    fragment.advance(nested);
                }
            }
            b'}' | b']' => {
                let opener = started.ok_or(Error::UnexpectedCloser)?;
                if opener.closer() != byte {
                    return Err(Error::MismatchedDelimiter);
                }
                fragment.push(byte);
                return Ok(fragment.len);
            }
            _ => fragment.push(byte),
        }
    }
}

/// Consume a nested value whose opener was already read, up to its closing
/// delimiter. Closer kinds are not checked here; nothing of it is kept.
fn skip_nested<S: ByteSource + ?Sized>(source: &mut S, timeout_ms: u32) -> Result<(), Error> {
    let mut depth = 1usize;
    let mut quote: Option<u8> = None;

    loop {
        let byte = source.next_byte(timeout_ms)?;
        if let Some(open_quote) = quote {
            if byte == open_quote {
                quote = None;
            }
            continue;
        }
        match byte {
            b'"' | b'\'' => quote = Some(byte),
            b'{' | b'[' => depth = depth.saturating_add(1),
            b'}' | b']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Ok(());
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    /// Byte source over an in-memory slice.
    struct Bytes<'a> {
        data: &'a [u8],
        pos: usize,
    }

    impl<'a> Bytes<'a> {
        fn new(data: &'a [u8]) -> Self {
            Self { data, pos: 0 }
        }
    }

    impl ByteSource for Bytes<'_> {
        fn next_byte(&mut self, _timeout_ms: u32) -> Result<u8, Error> {
            let byte = self.data.get(self.pos).copied().ok_or(Error::EndOfBody)?;
            self.pos += 1;
            Ok(byte)
        }
    }

    fn extract_str(input: &[u8], capacity: usize) -> (Result<usize, Error>, Vec<u8>) {
        let mut out = vec![0u8; capacity];
        let result = extract(&mut Bytes::new(input), &mut out, 0);
        let len = *result.as_ref().unwrap_or(&0);
        out.truncate(len);
        (result, out)
    }

    #[test]
    fn test_flat_object() {
        let (result, out) = extract_str(br#"{"name":"abc","n":12}"#, 64);
        assert_eq!(result, Ok(21));
        assert_eq!(out, br#"{"name":"abc","n":12}"#);
    }

    #[test]
    fn test_nested_values_byte_identical() {
        let input = br#"{"a":{"b":1},"c":[1,2]}"#;
        let (result, out) = extract_str(input, 64);
        assert_eq!(result, Ok(input.len()));
        assert_eq!(out, input);
    }

    #[test]
    fn test_deep_nesting() {
        let input = br#"[[[{"x":[{"y":{}}]}]]]"#;
        let (result, out) = extract_str(input, 64);
        assert_eq!(result, Ok(input.len()));
        assert_eq!(out, input);
    }

    #[test]
    fn test_leading_comma_dropped() {
        let (result, out) = extract_str(br#",{"n":2}"#, 64);
        assert_eq!(result, Ok(7));
        assert_eq!(out, br#"{"n":2}"#);
    }

    #[test]
    fn test_stops_at_matching_closer() {
        let mut source = Bytes::new(br#"{"n":1},{"n":2}]}"#);
        let mut out = [0u8; 32];

        let len = extract(&mut source, &mut out, 0).unwrap();
        assert_eq!(&out[..len], br#"{"n":1}"#);
        let len = extract(&mut source, &mut out, 0).unwrap();
        assert_eq!(&out[..len], br#"{"n":2}"#);
        assert_eq!(
            extract(&mut source, &mut out, 0),
            Err(Error::UnexpectedCloser)
        );
    }

    #[test]
    fn test_structural_bytes_inside_strings() {
        let input = br#"{"s":"a,}]{[","t":'q"}'}"#;
        let (result, out) = extract_str(input, 64);
        assert_eq!(result, Ok(input.len()));
        assert_eq!(out, input);
    }

    #[test]
    fn test_mismatched_delimiter() {
        let (result, _) = extract_str(br#"{"a":[1,2}"#, 64);
        assert_eq!(result, Err(Error::MismatchedDelimiter));
    }

    #[test]
    fn test_closer_before_opener() {
        let (result, _) = extract_str(b"]", 64);
        assert_eq!(result, Err(Error::UnexpectedCloser));
    }

    #[test]
    fn test_end_of_body_inside_value() {
        let (result, _) = extract_str(br#"{"a":{"b":1"#, 64);
        assert_eq!(result, Err(Error::EndOfBody));
    }

    #[test]
    fn test_truncation_is_success() {
        let input = br#"{"name":"a long value","n":[1,2,3]}"#;
        let (result, out) = extract_str(input, 10);
        assert_eq!(result, Ok(10));
        assert_eq!(out, &input[..10]);
    }

    #[test]
    fn test_truncation_inside_nested_level() {
        let input = br#"{"a":{"bbbbbbbb":1},"c":2}"#;
        let (result, out) = extract_str(input, 8);
        assert_eq!(result, Ok(8));
        assert_eq!(out, &input[..8]);
    }

    #[test]
    fn test_deep_nesting_past_capacity() {
        let depth = 2_000_000;
        let mut input = vec![b'['; depth];
        input.extend(core::iter::repeat(b']').take(depth));
        input.extend_from_slice(b",{}");

        let mut source = Bytes::new(&input);
        let mut out = [0u8; 32];
        assert_eq!(extract(&mut source, &mut out, 0), Ok(32));
        assert_eq!(out, [b'['; 32]);
        // The whole value was consumed; the next one is intact.
        let len = extract(&mut source, &mut out, 0).unwrap();
        assert_eq!(&out[..len], b"{}");
    }

    #[test]
    fn test_skipped_nesting_respects_strings() {
        let input = br#"{"a":{"b":"}]","c":['{']},"d":1}tail"#;
        let mut source = Bytes::new(input);
        let mut out = [0u8; 5];
        assert_eq!(extract(&mut source, &mut out, 0), Ok(5));
        assert_eq!(&out, br#"{"a":"#);
        assert_eq!(&source.data[source.pos..], b"tail");
    }

    #[test]
    fn test_zero_capacity() {
        let mut source = Bytes::new(br#"{"a":[1]}tail"#);
        let mut out = [0u8; 0];
        assert_eq!(extract(&mut source, &mut out, 0), Ok(0));
        assert_eq!(source.pos, 9);
    }

    #[test]
    fn test_output_zeroed_first() {
        let mut out = [0xAAu8; 8];
        let len = extract(&mut Bytes::new(b"{}"), &mut out, 0).unwrap();
        assert_eq!(len, 2);
        assert_eq!(out, *b"{}\0\0\0\0\0\0");
    }

    #[test]
    fn test_delimiter_helpers() {
        assert_eq!(Delimiter::from_opener(b'{'), Some(Delimiter::Object));
        assert_eq!(Delimiter::from_opener(b'['), Some(Delimiter::Array));
        assert_eq!(Delimiter::from_opener(b'}'), None);
        assert_eq!(Delimiter::Object.closer(), b'}');
        assert_eq!(Delimiter::Array.closer(), b']');
    }
}
