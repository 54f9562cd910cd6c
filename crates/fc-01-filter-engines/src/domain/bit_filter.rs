//! Bit-pattern filters over tag identifiers
//!
//! A [`BitFilter`] places a pattern over `0`, `1` and `x` (don't care) at a
//! bit offset from the start of an identifier and stores it as a pair of
//! byte-aligned vectors so that matching is a byte-wise OR/XOR.
//!
//! ```text
//! pattern "0011" at offset 2
//!
//!   bit:      0 1 2 3 4 5 6 7
//!   filter:   1 1 0 0 1 1 1 1     padding and wildcards are 1
//!   mask:     1 1 0 0 0 0 1 1     mask 0 = bit must equal filter
//! ```
//!
//! INVARIANTS:
//! - `byte_size == ceil((offset % 8 + size) / 8)`
//! - Bits outside `[offset, offset + size)` are `1` in both filter and mask,
//!   so padding never causes a mismatch.
//! - A filter never matches an identifier that is too short to cover its
//!   byte range.

use crate::error::FilterError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Don't-care character in filter patterns.
pub const WILDCARD: char = 'x';

/// Byte-aligned encoding of a bit pattern at a bit offset
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitFilter {
    pattern: String,
    offset: usize,
    byte_offset: usize,
    byte_filter: Vec<u8>,
    byte_mask: Vec<u8>,
}

impl BitFilter {
    /// Encode `pattern` at bit `offset`.
    ///
    /// Any character other than `0` or `1` is treated as a wildcard. Callers
    /// that accept untrusted patterns should use [`BitFilter::parse`].
    pub fn new(pattern: impl Into<String>, offset: usize) -> Self {
        let pattern = pattern.into();
        let lead = offset % 8;
        let byte_size = (lead + pattern.len()).div_ceil(8);

        let mut byte_filter = vec![0xFF; byte_size];
        let mut byte_mask = vec![0xFF; byte_size];

        for (i, c) in pattern.bytes().enumerate() {
            let position = lead + i;
            let bit = 0x80u8 >> (position % 8);
            match c {
                b'0' => {
                    byte_filter[position / 8] &= !bit;
                    byte_mask[position / 8] &= !bit;
                }
                b'1' => byte_mask[position / 8] &= !bit,
                _ => {}
            }
        }

        Self {
            pattern,
            offset,
            byte_offset: offset / 8,
            byte_filter,
            byte_mask,
        }
    }

    /// Validate `pattern` over `{0, 1, x}` and encode it.
    pub fn parse(pattern: &str, offset: usize) -> Result<Self, FilterError> {
        validate_pattern(pattern, true)?;
        Ok(Self::new(pattern, offset))
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Pattern length in bits
    pub fn size(&self) -> usize {
        self.pattern.len()
    }

    /// Bit offset of the first pattern bit
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Bit offset just past the last pattern bit
    pub fn end_offset(&self) -> usize {
        self.offset + self.size()
    }

    pub fn byte_offset(&self) -> usize {
        self.byte_offset
    }

    pub fn byte_size(&self) -> usize {
        self.byte_filter.len()
    }

    /// Byte index just past the filter's byte range
    pub fn byte_end(&self) -> usize {
        self.byte_offset + self.byte_size()
    }

    pub fn byte_filter(&self) -> &[u8] {
        &self.byte_filter
    }

    pub fn byte_mask(&self) -> &[u8] {
        &self.byte_mask
    }

    /// Check the filter against an identifier.
    ///
    /// Returns `false` when `id` ends before the filter's byte range does.
    pub fn matches(&self, id: &[u8]) -> bool {
        let Some(window) = id.get(self.byte_offset..self.byte_end()) else {
            return false;
        };

        window
            .iter()
            .zip(&self.byte_filter)
            .zip(&self.byte_mask)
            .all(|((byte, filter), mask)| (byte | mask) ^ filter == 0)
    }

    /// Whether the filter covers the absolute byte index `byte_offset`
    pub fn has_byte_at(&self, byte_offset: usize) -> bool {
        byte_offset >= self.byte_offset && byte_offset < self.byte_end()
    }

    /// Filter and mask bytes at the absolute byte index `byte_offset`
    pub fn byte_at(&self, byte_offset: usize) -> Option<(u8, u8)> {
        if !self.has_byte_at(byte_offset) {
            return None;
        }
        let i = byte_offset - self.byte_offset;
        Some((self.byte_filter[i], self.byte_mask[i]))
    }

    /// True when the filter imposes no constraint at all
    pub fn is_transparent(&self) -> bool {
        self.byte_mask.iter().all(|&mask| mask == 0xFF)
    }
}

impl fmt::Display for BitFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({} {})", self.pattern, self.offset, self.size())
    }
}

/// Reject patterns containing characters outside `{0, 1}` (plus `x` when
/// `wildcards` is set).
pub fn validate_pattern(pattern: &str, wildcards: bool) -> Result<(), FilterError> {
    let invalid = pattern
        .chars()
        .enumerate()
        .find(|&(_, c)| !(c == '0' || c == '1' || (wildcards && c == WILDCARD)));

    match invalid {
        Some((position, found)) => Err(FilterError::InvalidPattern {
            pattern: pattern.to_string(),
            found,
            position,
        }),
        None => Ok(()),
    }
}

/// Bit of `id` at absolute bit `position`, `None` past the end
pub fn bit_at(id: &[u8], position: usize) -> Option<bool> {
    id.get(position / 8)
        .map(|byte| byte & (0x80 >> (position % 8)) != 0)
}

/// Longest common prefix of two bit strings
pub fn common_prefix<'a>(a: &'a str, b: &str) -> &'a str {
    let len = a
        .bytes()
        .zip(b.bytes())
        .take_while(|(x, y)| x == y)
        .count();
    &a[..len]
}

/// Longest common prefix of a set of bit strings.
///
/// Only the lexicographic minimum and maximum need comparing.
pub fn longest_common_prefix<'a, I>(patterns: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut iter = patterns.into_iter();
    let Some(first) = iter.next() else {
        return String::new();
    };
    let (min, max) = iter.fold((first, first), |(min, max), p| (min.min(p), max.max(p)));
    common_prefix(min, max).to_string()
}
