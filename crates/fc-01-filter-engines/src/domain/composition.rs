//! Composite filters
//!
//! Factors a group of overlapping [`BitFilter`]s into one composite filter
//! holding the bits they all constrain identically, plus one residue per
//! input holding whatever the composite does not already check.
//!
//! ```text
//!   0011xxxx ─┐                        ┌─ residue 0011xxxx
//!             ├─→ composite 001xxxxx ──┤
//!   0010xxxx ─┘                        └─ residue 0010xxxx
//! ```
//!
//! INVARIANT: for every input `f` and every id `x`,
//! `f.matches(x) == composite.matches(x) && residue(f).matches(x)`.

use super::bit_filter::BitFilter;
use crate::error::FilterError;
use std::collections::BTreeMap;

/// A composite filter and the per-pattern residues it leaves behind
#[derive(Clone, Debug)]
pub struct Composition {
    filter: BitFilter,
    residues: BTreeMap<String, BitFilter>,
}

impl Composition {
    /// Factor a set of filters whose byte ranges overlap.
    ///
    /// Bits that any filter leaves as wildcard, or on which any two filters
    /// disagree, become wildcards in the composite. The exclusive mask is
    /// accumulated against the first filter: a bit differs between some pair
    /// exactly when it differs between the first filter and some other one.
    pub fn compose(filters: &[BitFilter]) -> Result<Self, FilterError> {
        let first = filters.first().ok_or(FilterError::EmptyFilterSet)?;

        let head = filters
            .iter()
            .map(BitFilter::byte_offset)
            .fold(first.byte_offset(), usize::max);
        let tail = filters
            .iter()
            .map(BitFilter::byte_end)
            .fold(first.byte_end(), usize::min);
        if tail <= head {
            return Err(FilterError::NoOverlap { head, tail });
        }

        let width = tail - head;
        let (first_bits, _) = window(first, head, width);
        let mut disjunct_bits = vec![0u8; width];
        let mut disjunct_mask = vec![0u8; width];
        let mut exclusive_mask = vec![0u8; width];

        for f in filters {
            let (bits, mask) = window(f, head, width);
            for i in 0..width {
                disjunct_bits[i] |= bits[i];
                disjunct_mask[i] |= mask[i];
                exclusive_mask[i] |= first_bits[i] ^ bits[i];
            }
        }

        let mut pattern = String::with_capacity(width * 8);
        for i in 0..width {
            push_byte(
                &mut pattern,
                disjunct_bits[i],
                disjunct_mask[i] | exclusive_mask[i],
            );
        }
        let filter = BitFilter::new(pattern, head * 8);

        let residues = filters
            .iter()
            .map(|f| (f.pattern().to_string(), residue(f, &filter)))
            .collect();

        Ok(Self { filter, residues })
    }

    /// The shared composite filter
    pub fn filter(&self) -> &BitFilter {
        &self.filter
    }

    pub fn residues(&self) -> &BTreeMap<String, BitFilter> {
        &self.residues
    }

    /// Residue of the input filter with the given pattern
    pub fn residue(&self, pattern: &str) -> Option<&BitFilter> {
        self.residues.get(pattern)
    }

    /// Match `id` against the composite and the residue of `pattern`.
    ///
    /// Returns `None` if `pattern` was not part of the composition.
    pub fn matches(&self, pattern: &str, id: &[u8]) -> Option<bool> {
        self.residue(pattern)
            .map(|residue| self.filter.matches(id) && residue.matches(id))
    }

    /// A composite that checks nothing saves no work
    pub fn is_degenerate(&self) -> bool {
        self.filter.is_transparent()
    }
}

/// Filter and mask bytes of `f` over `[head, head + width)`
fn window(f: &BitFilter, head: usize, width: usize) -> (&[u8], &[u8]) {
    let start = head - f.byte_offset();
    (
        &f.byte_filter()[start..start + width],
        &f.byte_mask()[start..start + width],
    )
}

/// Residual filter for `f` once `composite` has been checked.
///
/// The residue spans the same bytes as `f`; bytes the composite already
/// checks identically become `xxxxxxxx`.
fn residue(f: &BitFilter, composite: &BitFilter) -> BitFilter {
    let mut pattern = String::with_capacity(f.byte_size() * 8);
    for (i, (&bits, &mask)) in f.byte_filter().iter().zip(f.byte_mask()).enumerate() {
        if composite.byte_at(f.byte_offset() + i) == Some((bits, mask)) {
            pattern.push_str("xxxxxxxx");
        } else {
            push_byte(&mut pattern, bits, mask);
        }
    }
    BitFilter::new(pattern, f.byte_offset() * 8)
}

fn push_byte(pattern: &mut String, bits: u8, mask: u8) {
    for shift in (0..8).rev() {
        let c = if (mask >> shift) & 1 == 1 {
            'x'
        } else if (bits >> shift) & 1 == 1 {
            '1'
        } else {
            '0'
        };
        pattern.push(c);
    }
}
