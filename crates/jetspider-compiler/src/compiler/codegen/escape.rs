// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! String literal decoding.
//!
//! The front end hands string literals over as quoted source text. This
//! module turns that text into the string value.
//!
//! | Escape | Meaning |
//! |--------|---------|
//! | `\n` `\r` `\t` `\b` `\f` `\v` | Control characters |
//! | `\0` | Null (when not followed by a digit) |
//! | `\1`..`\377` | Legacy octal escape |
//! | `\xNN` | Hex escape |
//! | `\uNNNN` | UTF-16 code unit; surrogate pairs are combined, lone surrogates rejected |
//! | `\` + line terminator | Line continuation (produces nothing) |
//! | `\` + other | The character itself |

use std::iter::Peekable;
use std::str::Chars;

use crate::error::{CompileError, Result};

/// Decodes a quoted string literal (`'...'` or `"..."`) into its value.
pub fn decode_string_literal(raw: &str) -> Result<String> {
    let body = strip_quotes(raw).ok_or_else(|| malformed(raw, "missing or mismatched quotes"))?;

    let mut value = String::with_capacity(body.len());
    // UTF-16 code units from \u escapes, flushed when a non-\u char follows
    let mut units: Vec<u16> = Vec::new();
    let mut chars = body.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            flush_units(&mut units, &mut value, raw)?;
            value.push(ch);
            continue;
        }

        let escaped = chars
            .next()
            .ok_or_else(|| malformed(raw, "trailing backslash"))?;

        if escaped == 'u' {
            let unit = read_hex(&mut chars, 4).ok_or_else(|| malformed(raw, "bad \\u escape"))?;
            units.push(unit as u16);
            continue;
        }
        flush_units(&mut units, &mut value, raw)?;

        match escaped {
            'n' => value.push('\n'),
            'r' => value.push('\r'),
            '\r' => {
                // \ CR LF is a single line continuation
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
            }
            '\n' | '\u{2028}' | '\u{2029}' => {}
            't' => value.push('\t'),
            'b' => value.push('\u{8}'),
            'f' => value.push('\u{c}'),
            'v' => value.push('\u{b}'),
            'x' => {
                let code = read_hex(&mut chars, 2).ok_or_else(|| malformed(raw, "bad \\x escape"))?;
                // Two hex digits always form a valid scalar value
                value.push(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER));
            }
            '0'..='7' => {
                let code = read_octal(escaped, &mut chars);
                value.push(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER));
            }
            other => value.push(other),
        }
    }
    flush_units(&mut units, &mut value, raw)?;

    Ok(value)
}

fn strip_quotes(raw: &str) -> Option<&str> {
    let quote = raw.chars().next().filter(|c| *c == '\'' || *c == '"')?;
    if raw.len() < 2 || !raw.ends_with(quote) {
        return None;
    }
    Some(&raw[1..raw.len() - 1])
}

fn read_hex(chars: &mut Peekable<Chars<'_>>, digits: usize) -> Option<u32> {
    let mut code = 0;
    for _ in 0..digits {
        let digit = chars.next()?.to_digit(16)?;
        code = code * 16 + digit;
    }
    Some(code)
}

/// Reads up to three octal digits, the first already consumed, keeping the
/// value within `\377`.
fn read_octal(first: char, chars: &mut Peekable<Chars<'_>>) -> u32 {
    let mut code = first.to_digit(8).unwrap_or(0);
    let max_digits = if first <= '3' { 3 } else { 2 };
    for _ in 1..max_digits {
        match chars.peek().and_then(|c| c.to_digit(8)) {
            Some(digit) => {
                code = code * 8 + digit;
                chars.next();
            }
            None => break,
        }
    }
    code
}

/// Appends the pending `\u` code units. A surrogate without its other half
/// has no string value and is an error.
fn flush_units(units: &mut Vec<u16>, value: &mut String, raw: &str) -> Result<()> {
    for decoded in char::decode_utf16(units.drain(..)) {
        let ch = decoded.map_err(|e| {
            malformed(
                raw,
                &format!("unpaired surrogate \\u{:04x}", e.unpaired_surrogate()),
            )
        })?;
        value.push(ch);
    }
    Ok(())
}

fn malformed(raw: &str, reason: &str) -> CompileError {
    CompileError::MalformedString {
        literal: raw.to_string(),
        reason: reason.to_string(),
    }
}
