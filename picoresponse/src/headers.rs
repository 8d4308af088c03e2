// SPDX-License-Identifier: Apache-2.0

use crate::int_parser::{self, from_ascii_usize, parse_chunk_size, prefix_while};
use crate::line_reader::read_full_line;
use crate::{Config, Error, Framing, Transport};

/// Capacity for one status or header line; longer lines are truncated.
const HEADER_LINE_CAPACITY: usize = 128;

/// What the header block of a response announced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResponseHead {
    /// The status line matched the configured success line.
    pub ok: bool,
    /// `Transfer-Encoding: chunked` was present.
    pub chunked: bool,
    /// Value of `Content-Length`, if present and numeric.
    pub content_length: Option<usize>,
    /// Size of the first chunk, read right after the header block.
    pub first_chunk_size: Option<usize>,
}

impl ResponseHead {
    /// Body framing implied by the headers.
    pub fn framing(&self) -> Framing {
        if self.chunked {
            Framing::Chunked
        } else if self.content_length.is_some() {
            Framing::Length
        } else {
            Framing::UntilClose
        }
    }

    /// Body size used for the element count estimate: the first chunk's size for
    /// chunked bodies, the content length otherwise, or 0 if neither is known.
    pub fn announced_length(&self) -> usize {
        if self.chunked {
            self.first_chunk_size.unwrap_or(0)
        } else {
            self.content_length.unwrap_or(0)
        }
    }
}

#[derive(Debug, PartialEq)]
enum HeaderLine {
    Blank,
    ChunkedEncoding,
    ContentLength(usize),
    Other,
}

fn split_header(line: &[u8]) -> Option<(&[u8], &[u8])> {
    let colon = line.iter().position(|b| *b == b':')?;
    let name = line.get(..colon)?;
    let value = int_parser::trim_start(line.get(colon + 1..)?);
    Some((name, value))
}

fn contains_ignore_case(haystack: &[u8], needle: &[u8]) -> bool {
    haystack
        .windows(needle.len())
        .any(|window| window.eq_ignore_ascii_case(needle))
}

fn classify(line: &[u8]) -> HeaderLine {
    if line.is_empty() {
        return HeaderLine::Blank;
    }
    let Some((name, value)) = split_header(line) else {
        return HeaderLine::Other;
    };
    if name.eq_ignore_ascii_case(b"transfer-encoding") && contains_ignore_case(value, b"chunked")
    {
        HeaderLine::ChunkedEncoding
    } else if name.eq_ignore_ascii_case(b"content-length") {
        match from_ascii_usize(prefix_while(value, |b| b.is_ascii_digit())) {
            Ok(length) => HeaderLine::ContentLength(length),
            Err(e) => {
                log::debug!("Ignoring Content-Length: {e:?}");
                HeaderLine::Other
            }
        }
    } else {
        HeaderLine::Other
    }
}

/// Read the status line and headers up to the blank line. For chunked
/// responses the first chunk-size line is consumed as well, leaving the
/// transport at the first body byte.
pub(crate) fn scan_headers<T: Transport + ?Sized>(
    transport: &mut T,
    config: &Config,
) -> Result<ResponseHead, Error> {
    let mut head = ResponseHead::default();
    let mut line = [0u8; HEADER_LINE_CAPACITY];
    let mut first_line = true;

    loop {
        let len = read_full_line(
            transport,
            &mut line,
            config.query_timeout_ms,
            Error::MissingHeaders,
        )?;
        let text = line.get(..len).unwrap_or_default();
        log::debug!(
            "H-> {}",
            core::str::from_utf8(text).unwrap_or("<binary>")
        );

        if first_line {
            head.ok = text == config.ok_status_line.as_bytes();
            first_line = false;
        }
        match classify(text) {
            HeaderLine::Blank => break,
            HeaderLine::ChunkedEncoding => head.chunked = true,
            HeaderLine::ContentLength(length) => head.content_length = Some(length),
            HeaderLine::Other => {}
        }
    }

    if head.chunked {
        let len = read_full_line(
            transport,
            &mut line,
            config.query_timeout_ms,
            Error::MissingHeaders,
        )?;
        let size = parse_chunk_size(line.get(..len).unwrap_or_default())?;
        log::debug!("First chunk: {size} bytes");
        head.first_chunk_size = Some(size);
    }

    log::debug!(
        "Ok: {} Length: {} Chunked: {}",
        head.ok,
        head.announced_length(),
        head.chunked
    );
    Ok(head)
}
