//! Blocks: axis-aligned non-zero regions of a tensor-train core.
//!
//! A core of a block-sparse train has index space
//! `(left rank, mode dim, slot, right rank)`. Only the entries covered by the
//! core's blocks may be non-zero. Each block is a box given by one half-open
//! range per axis.
//!
//! # Examples
//!
//! ```rust
//! use bstt_core::Block;
//!
//! // block[0, 1, 2] in index notation: a single entry
//! let single = Block::new(0, 1, 2);
//! assert_eq!(single.size(), 1);
//!
//! // ranges mix freely with indices
//! let wide = Block::new(0..2, 1, 2..5);
//! assert_eq!(wide.shape(), [2, 1, 1, 3]);
//! assert!(single.overlaps(&wide));
//! ```

use std::fmt;
use std::ops::Range;

/// Anything that selects a contiguous run of indices along one axis.
pub trait AxisSlice {
    fn into_range(self) -> Range<usize>;
}

impl AxisSlice for usize {
    fn into_range(self) -> Range<usize> {
        self..self + 1
    }
}

impl AxisSlice for Range<usize> {
    fn into_range(self) -> Range<usize> {
        self
    }
}

impl AxisSlice for &Range<usize> {
    fn into_range(self) -> Range<usize> {
        self.clone()
    }
}

/// Axis-aligned box inside a core's `(left, mode, slot, right)` index space.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Block {
    ranges: [Range<usize>; 4],
}

impl Block {
    /// Block of a scalar core; the slot range is `0..1`.
    pub fn new(left: impl AxisSlice, mode: impl AxisSlice, right: impl AxisSlice) -> Self {
        Self::with_slot(left, mode, 0, right)
    }

    /// Block spanning an explicit slot range, for coupled systems.
    pub fn with_slot(
        left: impl AxisSlice,
        mode: impl AxisSlice,
        slot: impl AxisSlice,
        right: impl AxisSlice,
    ) -> Self {
        Self {
            ranges: [
                left.into_range(),
                mode.into_range(),
                slot.into_range(),
                right.into_range(),
            ],
        }
    }

    pub fn left(&self) -> Range<usize> {
        self.ranges[0].clone()
    }

    pub fn mode(&self) -> Range<usize> {
        self.ranges[1].clone()
    }

    pub fn slot(&self) -> Range<usize> {
        self.ranges[2].clone()
    }

    pub fn right(&self) -> Range<usize> {
        self.ranges[3].clone()
    }

    pub fn ranges(&self) -> &[Range<usize>; 4] {
        &self.ranges
    }

    /// Extent along each axis.
    pub fn shape(&self) -> [usize; 4] {
        let mut shape = [0; 4];
        for (extent, range) in shape.iter_mut().zip(&self.ranges) {
            *extent = range.end.saturating_sub(range.start);
        }
        shape
    }

    /// Number of coefficients inside the block.
    pub fn size(&self) -> usize {
        self.shape().iter().product()
    }

    /// True if some axis has an empty range.
    pub fn is_empty(&self) -> bool {
        self.ranges.iter().any(|r| r.start >= r.end)
    }

    /// True if the block lies inside an array of the given shape.
    pub fn fits(&self, shape: [usize; 4]) -> bool {
        self.ranges.iter().zip(shape).all(|(r, n)| r.end <= n)
    }

    pub fn contains(&self, index: [usize; 4]) -> bool {
        self.ranges.iter().zip(index).all(|(r, i)| r.contains(&i))
    }

    pub fn overlaps(&self, other: &Block) -> bool {
        self.ranges
            .iter()
            .zip(&other.ranges)
            .all(|(a, b)| a.start < b.end && b.start < a.end)
    }

    /// Indices of the block in row-major order over `(left, mode, slot, right)`.
    pub fn indices(&self) -> impl Iterator<Item = [usize; 4]> + '_ {
        let [l, e, s, r] = &self.ranges;
        l.clone().flat_map(move |i| {
            e.clone().flat_map(move |j| {
                s.clone()
                    .flat_map(move |k| r.clone().map(move |m| [i, j, k, m]))
            })
        })
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [l, e, s, r] = &self.ranges;
        write!(
            f,
            "block[{}:{}, {}:{}, {}:{}, {}:{}]",
            l.start, l.end, e.start, e.end, s.start, s.end, r.start, r.end
        )
    }
}

/// Merge ranges that share at least one index into maximal groups.
///
/// Touching but disjoint ranges (`0..2`, `2..3`) stay separate. The result is
/// sorted by start index.
pub fn merge_ranges(ranges: impl IntoIterator<Item = Range<usize>>) -> Vec<Range<usize>> {
    let mut sorted: Vec<Range<usize>> = ranges.into_iter().filter(|r| r.start < r.end).collect();
    sorted.sort_by_key(|r| (r.start, r.end));

    let mut merged: Vec<Range<usize>> = Vec::with_capacity(sorted.len());
    for range in sorted {
        match merged.last_mut() {
            Some(last) if range.start < last.end => last.end = last.end.max(range.end),
            _ => merged.push(range),
        }
    }
    merged
}
