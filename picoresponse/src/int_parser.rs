// SPDX-License-Identifier: Apache-2.0

// Panic-free integer parsing for header fields, chunk sizes and field values.

/// A custom error type for const integer parsing.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ConstParseIntegerError {
    /// The input byte slice was empty.
    Empty,
    /// The input consisted only of a sign character (`+` or `-`).
    SignOnly,
    /// An invalid character was found that was not a digit of the radix.
    InvalidDigit,
    /// The number overflowed or underflowed the target integer type.
    Overflow,
}

/// Creates a panic-free, const-stable, base-10 parser for a specific integer type.
macro_rules! define_const_parser {
    ($fn_name:ident, $int_ty:ty) => {
        /// Parses a byte slice into a(n) `
        #[doc = stringify!($int_ty)]
        /// ` in a `const` context.
        ///
        /// This function is guaranteed not to panic.
        pub const fn $fn_name(src: &[u8]) -> Result<$int_ty, ConstParseIntegerError> {
            let (is_negative, mut digits) = match src {
                [] => return Err(ConstParseIntegerError::Empty),
                [b'+', rest @ ..] => (false, rest),
                [b'-', rest @ ..] => (true, rest),
                _ => (false, src),
            };

            if digits.is_empty() {
                return Err(ConstParseIntegerError::SignOnly);
            }

            let mut result: $int_ty = 0;

            while let Some((&byte, rest)) = digits.split_first() {
                let digit = match byte {
                    b'0'..=b'9' => (byte - b'0') as $int_ty,
                    _ => return Err(ConstParseIntegerError::InvalidDigit),
                };

                result = match result.checked_mul(10) {
                    Some(val) => val,
                    None => return Err(ConstParseIntegerError::Overflow),
                };

                // Building the number negatively from the start correctly handles MIN.
                if is_negative {
                    result = match result.checked_sub(digit) {
                        Some(val) => val,
                        None => return Err(ConstParseIntegerError::Overflow),
                    }
                } else {
                    result = match result.checked_add(digit) {
                        Some(val) => val,
                        None => return Err(ConstParseIntegerError::Overflow),
                    }
                }

                digits = rest;
            }

            Ok(result)
        }
    };
}

define_const_parser!(from_ascii_usize, usize);
#[cfg(feature = "int32")]
define_const_parser!(from_ascii_i32, i32);
#[cfg(feature = "int64")]
define_const_parser!(from_ascii_i64, i64);

/// Parses a decimal integer of the accessor width.
#[cfg(feature = "int64")]
pub const fn from_ascii_int(src: &[u8]) -> Result<crate::JsonInt, ConstParseIntegerError> {
    from_ascii_i64(src)
}

/// Parses a decimal integer of the accessor width.
#[cfg(feature = "int32")]
pub const fn from_ascii_int(src: &[u8]) -> Result<crate::JsonInt, ConstParseIntegerError> {
    from_ascii_i32(src)
}

/// Parses base-16 digits into a `usize`. Upper and lower case are accepted.
pub const fn from_ascii_hex(src: &[u8]) -> Result<usize, ConstParseIntegerError> {
    if src.is_empty() {
        return Err(ConstParseIntegerError::Empty);
    }
    let mut digits = src;
    let mut result: usize = 0;
    while let Some((&byte, rest)) = digits.split_first() {
        let digit = match byte {
            b'0'..=b'9' => byte - b'0',
            b'a'..=b'f' => byte - b'a' + 10,
            b'A'..=b'F' => byte - b'A' + 10,
            _ => return Err(ConstParseIntegerError::InvalidDigit),
        };
        result = match result.checked_mul(16) {
            Some(val) => val,
            None => return Err(ConstParseIntegerError::Overflow),
        };
        result = match result.checked_add(digit as usize) {
            Some(val) => val,
            None => return Err(ConstParseIntegerError::Overflow),
        };
        digits = rest;
    }
    Ok(result)
}

/// Strips leading spaces and tabs.
pub fn trim_start(src: &[u8]) -> &[u8] {
    let start = src
        .iter()
        .position(|b| *b != b' ' && *b != b'\t')
        .unwrap_or(src.len());
    src.get(start..).unwrap_or_default()
}

/// The longest prefix of `src` made of bytes accepted by `accept`.
pub fn prefix_while(src: &[u8], accept: impl Fn(u8) -> bool) -> &[u8] {
    let end = src.iter().position(|b| !accept(*b)).unwrap_or(src.len());
    src.get(..end).unwrap_or_default()
}

/// Leading hex digits of a chunk-size line; extensions after them are ignored.
pub fn parse_chunk_size(line: &[u8]) -> Result<usize, ConstParseIntegerError> {
    from_ascii_hex(prefix_while(trim_start(line), |b| b.is_ascii_hexdigit()))
}

/// Leading decimal integer with an optional sign, `strtol` style.
pub fn parse_int_prefix(src: &[u8]) -> Result<crate::JsonInt, ConstParseIntegerError> {
    let src = trim_start(src);
    let sign_len = usize::from(matches!(src.first(), Some(b'+' | b'-')));
    let digits = prefix_while(src.get(sign_len..).unwrap_or_default(), |b| {
        b.is_ascii_digit()
    });
    from_ascii_int(src.get(..sign_len + digits.len()).unwrap_or_default())
}
