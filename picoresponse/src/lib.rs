// SPDX-License-Identifier: Apache-2.0

//! Bounded-memory decoding of HTTP responses that carry large JSON result arrays.
//!
//! The crate reads a raw HTTP/1.1 response from a byte-at-a-time [`Transport`],
//! hides chunked transfer framing behind a [`ByteSource`], and copies one JSON
//! object at a time into a fixed output buffer. A [`Response`] walks a body of the
//! shape `{"results":[ ... ]}` element by element without ever holding more than
//! one element in memory.
//!
//! ```rust
//! use picoresponse::{Response, ResultCount, SliceTransport};
//!
//! let raw = b"HTTP/1.1 200 OK\r\nContent-Length: 37\r\n\r\n\
//!             {\"results\":[{\"n\":1},{\"n\":2},{\"n\":3}]}";
//! let mut response = Response::new(SliceTransport::full_slice(raw));
//!
//! assert!(matches!(response.count(), ResultCount::Estimated(_)));
//! let mut seen = 0;
//! while response.next_object() {
//!     seen += 1;
//!     assert_eq!(response.get_int("n"), seen);
//! }
//! assert_eq!(seen, 3);
//! ```

#![cfg_attr(not(test), no_std)]

#[cfg(feature = "alloc")]
extern crate alloc;

// Compile-time configuration validation
mod config_check;

mod config;
pub use config::{Config, DEFAULT_WINDOW};

mod error;
pub use error::Error;

mod int_parser;
pub use int_parser::ConstParseIntegerError;

mod transport;
pub use transport::{SliceTransport, Transport};

mod line_reader;
pub use line_reader::read_line;

mod chunked_source;
pub use chunked_source::{ByteSource, ChunkWindow, ChunkedSource, Framing};

mod extractor;
pub use extractor::{extract, Delimiter};

mod headers;
pub use headers::ResponseHead;

mod field_lookup;
pub use field_lookup::{FieldLookup, FlatFields};

mod response;
pub use response::{OutputBuffer, Response, ResultCount};

/// Integer type returned by the integer field accessors.
#[cfg(feature = "int64")]
pub type JsonInt = i64;
/// Integer type returned by the integer field accessors.
#[cfg(feature = "int32")]
pub type JsonInt = i32;
