// SPDX-License-Identifier: Apache-2.0

//! Scalar lookup by key inside an extracted fragment.
//!
//! The response hands its current fragment to a [`FieldLookup`] whenever a field
//! accessor is called. [`FlatFields`] is the built-in implementation; it looks only
//! at the keys of the outermost object and never allocates.

use crate::int_parser::parse_int_prefix;
use crate::JsonInt;

/// Decodes top-level fields of a flat JSON fragment.
///
/// Missing keys and undecodable values yield the sentinels documented on each
/// method rather than errors.
pub trait FieldLookup {
    /// Copy the value of `key` into `out`, without quotes if it is a string.
    /// Returns the number of bytes copied, 0 if the key is missing. Values
    /// longer than `out` are truncated.
    fn get_string(&self, fragment: &[u8], key: &str, out: &mut [u8]) -> usize;

    /// Integer value of `key`, or 0.
    fn get_int(&self, fragment: &[u8], key: &str) -> JsonInt;

    /// Floating point value of `key`, or 0.0.
    #[cfg(feature = "float")]
    fn get_float(&self, fragment: &[u8], key: &str) -> f64;

    /// True only if `key` holds the literal `true`.
    fn get_boolean(&self, fragment: &[u8], key: &str) -> bool;
}

/// The default [`FieldLookup`]: a single forward scan over the fragment.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatFields;

/// Index of the quote closing the string that opens at `start`.
fn closing_quote(fragment: &[u8], start: usize) -> Option<usize> {
    let quote = *fragment.get(start)?;
    let body = fragment.get(start + 1..)?;
    body.iter()
        .position(|b| *b == quote)
        .map(|offset| start + 1 + offset)
}

/// Index of the delimiter closing the container that opens at `start`.
fn closing_delimiter(fragment: &[u8], start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = start;
    while let Some(&byte) = fragment.get(i) {
        match byte {
            b'"' | b'\'' => i = closing_quote(fragment, i)?,
            b'{' | b'[' => depth += 1,
            b'}' | b']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

fn skip_whitespace(fragment: &[u8], from: usize) -> usize {
    fragment
        .get(from..)
        .and_then(|rest| rest.iter().position(|b| !b.is_ascii_whitespace()))
        .map_or(fragment.len(), |offset| from + offset)
}

/// The raw token starting at `start`: a quoted string with its quotes, a whole
/// nested container, or a bare literal up to the next separator.
fn value_token(fragment: &[u8], start: usize) -> &[u8] {
    let end = match fragment.get(start) {
        Some(b'"' | b'\'') => closing_quote(fragment, start).map(|i| i + 1),
        Some(b'{' | b'[') => closing_delimiter(fragment, start).map(|i| i + 1),
        Some(_) => Some(
            fragment
                .get(start..)
                .and_then(|rest| {
                    rest.iter().position(|b| {
                        matches!(*b, b',' | b'}' | b']') || b.is_ascii_whitespace()
                    })
                })
                .map_or(fragment.len(), |offset| start + offset),
        ),
        None => None,
    };
    end.and_then(|end| fragment.get(start..end))
        .unwrap_or_default()
}

/// Locate the value of `key` among the keys of the outermost object.
fn find_value<'f>(fragment: &'f [u8], key: &[u8]) -> Option<&'f [u8]> {
    let mut depth = 0usize;
    let mut in_object = false;
    let mut expect_key = false;
    let mut i = 0usize;

    while let Some(&byte) = fragment.get(i) {
        match byte {
            b'"' | b'\'' => {
                let end = closing_quote(fragment, i)?;
                if depth == 1 && in_object && expect_key {
                    let colon = skip_whitespace(fragment, end + 1);
                    if fragment.get(colon) == Some(&b':') {
                        expect_key = false;
                        if fragment.get(i + 1..end) == Some(key) {
                            let start = skip_whitespace(fragment, colon + 1);
                            return Some(value_token(fragment, start));
                        }
                        i = colon;
                    }
                }
                if i < end {
                    i = end;
                }
            }
            b'{' | b'[' => {
                depth += 1;
                if depth == 1 {
                    in_object = byte == b'{';
                    expect_key = in_object;
                }
            }
            b'}' | b']' => depth = depth.saturating_sub(1),
            b',' if depth == 1 => expect_key = in_object,
            _ => {}
        }
        i += 1;
    }
    None
}

fn unquote(token: &[u8]) -> &[u8] {
    match token {
        [b'"', inner @ .., b'"'] | [b'\'', inner @ .., b'\''] => inner,
        _ => token,
    }
}

impl FieldLookup for FlatFields {
    fn get_string(&self, fragment: &[u8], key: &str, out: &mut [u8]) -> usize {
        out.fill(0);
        let Some(token) = find_value(fragment, key.as_bytes()) else {
            return 0;
        };
        let value = unquote(token);
        let len = value.len().min(out.len());
        match (out.get_mut(..len), value.get(..len)) {
            (Some(dest), Some(src)) => {
                dest.copy_from_slice(src);
                len
            }
            _ => 0,
        }
    }

    fn get_int(&self, fragment: &[u8], key: &str) -> JsonInt {
        find_value(fragment, key.as_bytes())
            .and_then(|token| parse_int_prefix(unquote(token)).ok())
            .unwrap_or(0)
    }

    #[cfg(feature = "float")]
    fn get_float(&self, fragment: &[u8], key: &str) -> f64 {
        find_value(fragment, key.as_bytes())
            .and_then(|token| core::str::from_utf8(unquote(token)).ok())
            .and_then(|text| text.parse::<f64>().ok())
            .unwrap_or(0.0)
    }

    fn get_boolean(&self, fragment: &[u8], key: &str) -> bool {
        find_value(fragment, key.as_bytes()) == Some(b"true".as_slice())
    }
}
