// SPDX-License-Identifier: Apache-2.0

use crate::{Error, Transport};

/// Where appending to a line stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineEnd {
    /// A terminator was consumed.
    Terminated,
    /// A CR was consumed but its pair has not arrived yet.
    AfterCr,
    /// The transport ran dry inside the line.
    Pending,
}

/// Append available bytes to the line in `buf`, which already holds `stored`
/// bytes. Never waits.
fn append_line<T: Transport + ?Sized>(
    transport: &mut T,
    buf: &mut [u8],
    stored: &mut usize,
) -> LineEnd {
    let limit = buf.len().saturating_sub(1);

    while transport.available() > 0 {
        let Some(byte) = transport.read_byte() else {
            break;
        };
        match byte {
            b'\r' => {
                if transport.available() == 0 {
                    return LineEnd::AfterCr;
                }
                let _ = transport.read_byte();
                return LineEnd::Terminated;
            }
            b'\n' => return LineEnd::Terminated,
            _ => {
                if *stored < limit {
                    if let Some(slot) = buf.get_mut(*stored) {
                        *slot = byte;
                        *stored += 1;
                    }
                }
            }
        }
    }
    LineEnd::Pending
}

fn trace_line(buf: &[u8], stored: usize) {
    log::trace!(
        "line: {:?}",
        core::str::from_utf8(buf.get(..stored).unwrap_or_default()).unwrap_or("<binary>")
    );
}

/// Read one line of header or chunk-size text from `transport` into `buf`.
///
/// Reading stops at a line terminator or when the transport has nothing more
/// available right now; this never waits. A CR ends the line and the byte after
/// it, if already available, is consumed as its LF pair. A bare LF also ends the
/// line. Terminators are not stored.
///
/// At most `buf.len() - 1` bytes are stored and the rest of `buf` is zeroed, so
/// the stored text is always zero-terminated. Longer lines are truncated without
/// notice. Returns the number of bytes stored.
pub fn read_line<T: Transport + ?Sized>(transport: &mut T, buf: &mut [u8]) -> usize {
    buf.fill(0);
    let mut stored = 0usize;
    append_line(transport, buf, &mut stored);
    trace_line(buf, stored);
    stored
}

fn await_data<T: Transport + ?Sized>(
    transport: &mut T,
    timeout_ms: u32,
    on_close: Error,
) -> Result<(), Error> {
    if transport.wait_available(timeout_ms) {
        Ok(())
    } else if transport.connected() {
        Err(Error::Timeout)
    } else {
        Err(on_close)
    }
}

/// Like [`read_line`], but keeps waiting until the terminator has arrived, so a
/// line delivered in several pieces is returned whole. The LF after a CR is
/// waited for as well.
///
/// Each wait is bounded by `timeout_ms` and fails with [`Error::Timeout`]; a
/// peer that disconnects first yields `on_close`.
pub(crate) fn read_full_line<T: Transport + ?Sized>(
    transport: &mut T,
    buf: &mut [u8],
    timeout_ms: u32,
    on_close: Error,
) -> Result<usize, Error> {
    buf.fill(0);
    let mut stored = 0usize;
    loop {
        await_data(transport, timeout_ms, on_close)?;
        match append_line(transport, buf, &mut stored) {
            LineEnd::Terminated => break,
            LineEnd::AfterCr => {
                await_data(transport, timeout_ms, on_close)?;
                let _ = transport.read_byte();
                break;
            }
            LineEnd::Pending => {}
        }
    }
    trace_line(buf, stored);
    Ok(stored)
}
