// SPDX-License-Identifier: Apache-2.0

use crate::int_parser::ConstParseIntegerError;

/// Errors that can occur while decoding a response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The transport reported a failure on a bulk read.
    Transport,
    /// A bulk read returned no bytes although data was announced.
    TransportClosed,
    /// No bytes arrived within the allowed time.
    Timeout,
    /// The body ended (zero-size chunk, exhausted length or closed connection).
    EndOfBody,
    /// A closing `}` or `]` appeared before any opening delimiter.
    UnexpectedCloser,
    /// A closing delimiter did not match the opener of its level.
    MismatchedDelimiter,
    /// The body did not start with the expected results anchor.
    MissingResultsAnchor,
    /// The connection ended before the header block was complete.
    MissingHeaders,
    /// A chunk size or length field was not a number.
    InvalidNumber(ConstParseIntegerError),
}

impl Error {
    /// True for failures caused by the transport rather than by the payload.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::Transport | Error::TransportClosed | Error::Timeout
        )
    }
}

impl From<ConstParseIntegerError> for Error {
    fn from(err: ConstParseIntegerError) -> Self {
        Error::InvalidNumber(err)
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Transport => write!(f, "transport read failed"),
            Error::TransportClosed => write!(f, "transport returned no data"),
            Error::Timeout => write!(f, "timed out waiting for data"),
            Error::EndOfBody => write!(f, "end of body"),
            Error::UnexpectedCloser => write!(f, "closing delimiter before any opener"),
            Error::MismatchedDelimiter => write!(f, "closing delimiter does not match opener"),
            Error::MissingResultsAnchor => write!(f, "body does not start with the results array"),
            Error::MissingHeaders => write!(f, "connection ended inside the header block"),
            Error::InvalidNumber(e) => write!(f, "invalid number: {e:?}"),
        }
    }
}
