//! Parsing utilities for the `Byte-Range` header grammar.
//!
//! The header carries `first-last/total` where `last` and `total` may be
//! the literal `*` when unknown at send time. Parsing never fails: any
//! malformed or wildcard component comes back as `None`, which the
//! decoder treats as the unknown-size sentinel requiring a boundary scan.

use std::fmt;

/// Parsed `Byte-Range` header value. Byte positions are 1-based as on the
/// wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ByteRange {
    /// Position of the first byte in this chunk.
    pub first: Option<u64>,
    /// Position of the last byte in this chunk, `None` for `*`.
    pub last: Option<u64>,
    /// Total message size, `None` for `*`.
    pub total: Option<u64>,
}

impl ByteRange {
    /// Fully known range, as written on outbound SEND and REPORT frames.
    #[must_use]
    pub const fn known(first: u64, last: u64, total: u64) -> Self {
        Self {
            first: Some(first),
            last: Some(last),
            total: Some(total),
        }
    }

    /// Parse a header value, mapping wildcard or malformed components to
    /// `None`.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        let (range, total) = match value.split_once('/') {
            Some((range, total)) => (range, parse_component(total)),
            None => (value, None),
        };
        let (first, last) = match range.split_once('-') {
            Some((first, last)) => (parse_component(first), parse_component(last)),
            None => (None, None),
        };
        Self { first, last, total }
    }

    /// Size of the chunk this range describes, or `None` when any
    /// component is unknown and the body must be boundary-scanned.
    #[must_use]
    pub fn chunk_size(&self) -> Option<u64> {
        let (first, last, _total) = (self.first?, self.last?, self.total?);
        last.checked_sub(first).map(|d| d + 1)
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let component = |v: Option<u64>| v.map_or_else(|| "*".to_owned(), |n| n.to_string());
        write!(
            f,
            "{}-{}/{}",
            component(self.first),
            component(self.last),
            component(self.total)
        )
    }
}

fn parse_component(text: &str) -> Option<u64> {
    let text = text.trim();
    if text == "*" {
        return None;
    }
    text.parse().ok()
}

/// Chunk size derived from a raw header value, unknown-size sentinel as
/// `None`.
#[must_use]
pub fn chunk_size_of(value: &str) -> Option<u64> { ByteRange::parse(value).chunk_size() }

/// Total message size from a raw header value, `None` when `*` or
/// malformed.
#[must_use]
pub fn total_size_of(value: &str) -> Option<u64> { ByteRange::parse(value).total }

/// Last byte position from a raw header value, used when consuming
/// REPORT ranges.
#[must_use]
pub fn last_byte_of(value: &str) -> Option<u64> { ByteRange::parse(value).last }
