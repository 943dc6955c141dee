//! `Range` header parsing.
//!
//! Accepts one byte-range-spec of the forms `N-M`, `N-`, and `-N`, with
//! optional whitespace around the numeric tokens. Two header shapes are
//! deliberately re-interpreted instead of rejected, mirroring deployed S3
//! behavior:
//!
//! - a whitespace-only header value is treated as absent;
//! - a multi-range value (any comma after the `=`) yields the full object,
//!   served with `200 OK` rather than `206 Partial Content`.
//!
//! Everything else that deviates from the grammar is an error, as is a
//! normalized range that starts at or past the end of the object.

use stripegate_model::S3ErrorKind;

/// A normalized inclusive byte range within an object.
///
/// Invariant: `0 <= first <= last <= content_length - 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    /// First byte offset, inclusive.
    pub first: u64,
    /// Last byte offset, inclusive.
    pub last: u64,
}

/// A malformed or unsatisfiable `Range` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("malformed or unsatisfiable byte range")]
pub struct RangeError;

impl From<RangeError> for S3ErrorKind {
    fn from(_: RangeError) -> Self {
        Self::InvalidRange
    }
}

/// Parse a `Range` header against an object of `content_length` bytes.
///
/// Returns `Ok(None)` when the whole object should be served with `200 OK`
/// (header absent, whitespace-only, or multi-range) and `Ok(Some(range))`
/// for a single satisfiable range served with `206 Partial Content`.
///
/// # Errors
///
/// Returns [`RangeError`] for every malformed or unsatisfiable value; the
/// caller maps this to an `InvalidRange` response.
pub fn parse_range(header: Option<&str>, content_length: u64) -> Result<Option<ByteRange>, RangeError> {
    let Some(value) = header else {
        return Ok(None);
    };
    // A header of blanks is treated the same as no header at all.
    if value.trim().is_empty() {
        return Ok(None);
    }
    if content_length == 0 {
        return Err(RangeError);
    }

    let (unit, spec) = value.split_once('=').ok_or(RangeError)?;
    if unit.trim() != "bytes" {
        return Err(RangeError);
    }
    if spec.is_empty() {
        return Err(RangeError);
    }
    // Multi-range: serve the full object instead of rejecting.
    if spec.contains(',') {
        return Ok(None);
    }

    let (first_token, last_token) = spec.split_once('-').ok_or(RangeError)?;
    let first_token = first_token.trim();
    let last_token = last_token.trim();

    if first_token.is_empty() && last_token.is_empty() {
        return Err(RangeError);
    }

    let (first, mut last) = if first_token.is_empty() {
        // -N: the last N bytes.
        let suffix_len = parse_offset(last_token)?;
        let first = content_length.checked_sub(suffix_len).ok_or(RangeError)?;
        (first, content_length - 1)
    } else if last_token.is_empty() {
        // N-: from N through the end.
        (parse_offset(first_token)?, content_length - 1)
    } else {
        // N-M.
        (parse_offset(first_token)?, parse_offset(last_token)?)
    };

    // A last offset past the end is clamped, not rejected.
    if last > content_length - 1 {
        last = content_length - 1;
    }
    if first >= content_length || first > last {
        return Err(RangeError);
    }

    Ok(Some(ByteRange { first, last }))
}

/// Parse a byte offset token: digits only, no sign, no other characters.
fn parse_offset(token: &str) -> Result<u64, RangeError> {
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(RangeError);
    }
    token.parse::<u64>().map_err(|_| RangeError)
}
