// SPDX-License-Identifier: Apache-2.0

/// Default capacity of the chunk window, in bytes.
pub const DEFAULT_WINDOW: usize = 1024;

/// Runtime settings for a [`Response`](crate::Response).
///
/// Buffer capacities that must live on the stack (chunk window, header line,
/// string scratch) are compile-time constants instead; see [`DEFAULT_WINDOW`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// How long a single byte fetch may wait for the transport, in milliseconds.
    pub query_timeout_ms: u32,
    /// Size of the output buffer allocated when the caller did not supply one.
    pub buffer_size: usize,
    /// Status line that marks a successful response.
    pub ok_status_line: &'static str,
}

impl Config {
    /// Set the per-byte timeout.
    pub fn with_timeout_ms(mut self, timeout_ms: u32) -> Self {
        self.query_timeout_ms = timeout_ms;
        self
    }

    /// Set the size of the internally allocated output buffer.
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            query_timeout_ms: 5000,
            buffer_size: 256,
            ok_status_line: "HTTP/1.1 200 OK",
        }
    }
}
