/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

use std::fmt;

use itertools::izip;
use serde::Deserialize;
use serde::Serialize;

use crate::layout::row_major_strides;
use crate::LayoutError;

/// The type of error for selection construction and coordinate
/// expansion.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SelectionError {
    #[error("empty range {start}..{end} (step {step}) in dimension {dim}")]
    EmptyRange {
        start: usize,
        end: usize,
        step: usize,
        dim: usize,
    },

    #[error("zero stride in dimension {dim}")]
    ZeroStride { dim: usize },

    #[error(transparent)]
    Layout(#[from] LayoutError),
}

/// A range of indices with a stride: `start`, optional exclusive
/// `end`, and `step`. An absent end resolves to the extent of the
/// dimension the range is applied to. Ranges are convertible from
/// native Rust ranges.
///
/// Deriving `Eq`, `Ord` and `Hash` is sound because all fields are
/// `Ord` and comparison is purely structural over `(start, end,
/// step)`.
#[derive(
    Debug,
    Clone,
    Copy,
    Eq,
    Hash,
    PartialEq,
    Serialize,
    Deserialize,
    PartialOrd,
    Ord
)]
pub struct Range(pub usize, pub Option<usize>, pub usize);

impl Range {
    /// The range selecting `count` elements from `start` with the
    /// given step.
    pub fn with_count(start: usize, step: usize, count: usize) -> Self {
        Range(start, Some(start + step * count.saturating_sub(1) + 1), step)
    }

    pub(crate) fn resolve(&self, extent: usize) -> (usize, usize, usize) {
        match self {
            Range(start, Some(end), step) => (*start, std::cmp::min(extent, *end), *step),
            Range(start, None, step) => (*start, extent, *step),
        }
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Range(start, None, step) => write!(f, "{}::{}", start, step),
            Range(start, Some(end), step) => write!(f, "{}:{}:{}", start, end, step),
        }
    }
}

impl From<std::ops::Range<usize>> for Range {
    fn from(r: std::ops::Range<usize>) -> Self {
        Self(r.start, Some(r.end), 1)
    }
}

impl From<std::ops::RangeInclusive<usize>> for Range {
    fn from(r: std::ops::RangeInclusive<usize>) -> Self {
        Self(*r.start(), Some(*r.end() + 1), 1)
    }
}

impl From<std::ops::RangeFrom<usize>> for Range {
    fn from(r: std::ops::RangeFrom<usize>) -> Self {
        Self(r.start, None, 1)
    }
}

impl From<std::ops::RangeFull> for Range {
    fn from(_: std::ops::RangeFull) -> Self {
        Self(0, None, 1)
    }
}

impl From<(usize, usize, usize)> for Range {
    fn from((start, end, step): (usize, usize, usize)) -> Self {
        Self(start, Some(end), step)
    }
}

/// One per-dimension entry of a selection request.
///
/// The distinction between the two constructors is load-bearing: a
/// single `Index` collapses its dimension out of the selection's
/// effective shape, while a `Slice` retains the dimension even when it
/// selects exactly one element.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum AxisSpec {
    /// Fix the dimension to a single index, dropping it from the
    /// effective shape.
    Index(usize),
    /// Keep the dimension, restricted to the given range.
    Slice(Range),
}

impl From<usize> for AxisSpec {
    fn from(index: usize) -> Self {
        AxisSpec::Index(index)
    }
}

impl From<Range> for AxisSpec {
    fn from(range: Range) -> Self {
        AxisSpec::Slice(range)
    }
}

impl From<std::ops::Range<usize>> for AxisSpec {
    fn from(r: std::ops::Range<usize>) -> Self {
        AxisSpec::Slice(r.into())
    }
}

impl From<std::ops::RangeInclusive<usize>> for AxisSpec {
    fn from(r: std::ops::RangeInclusive<usize>) -> Self {
        AxisSpec::Slice(r.into())
    }
}

impl From<std::ops::RangeFrom<usize>> for AxisSpec {
    fn from(r: std::ops::RangeFrom<usize>) -> Self {
        AxisSpec::Slice(r.into())
    }
}

impl From<std::ops::RangeFull> for AxisSpec {
    fn from(r: std::ops::RangeFull) -> Self {
        AxisSpec::Slice(r.into())
    }
}

impl From<(usize, usize, usize)> for AxisSpec {
    fn from(triple: (usize, usize, usize)) -> Self {
        AxisSpec::Slice(triple.into())
    }
}

/// Build a `[AxisSpec; N]` from a mix of indices and ranges.
///
/// ```
/// use ndlayout::{axes, AxisSpec, Range};
///
/// let specs = axes![1, 0..3, ..];
/// assert_eq!(specs[0], AxisSpec::Index(1));
/// assert_eq!(specs[1], AxisSpec::Slice(Range(0, Some(3), 1)));
/// assert_eq!(specs[2], AxisSpec::Slice(Range(0, None, 1)));
/// ```
#[macro_export]
macro_rules! axes {
    ( $( $spec:expr ),* $(,)? ) => {
        [ $( $crate::AxisSpec::from($spec) ),* ]
    };
}

/// A rectangular, possibly strided sub-region of an N-dimensional
/// extent box. Selections are pure value objects: they describe which
/// coordinates of a source array are addressed, and own no element
/// data.
///
/// Each source dimension carries `(extent, offset, stride, count)`
/// plus a flag recording whether the dimension was collapsed by an
/// [`AxisSpec::Index`]. The effective shape consists of the counts of
/// the retained dimensions; `count = ⌈(end - start) / step⌉` with the
/// end bound clamped to the extent.
///
/// ```
/// use ndlayout::{axes, Selection};
///
/// let sel = Selection::new(&[10, 20], &axes![(1, 10, 3), (2, 20, 2)]).unwrap();
/// assert_eq!(sel.shape(), &[3, 9]);
/// assert_eq!(sel.expand(&[1, 3]).unwrap(), vec![4, 8]);
/// ```
#[derive(Serialize, Deserialize, Clone, Default, Eq, PartialEq, Hash, Debug)]
pub struct Selection {
    extents: Vec<usize>,
    offsets: Vec<usize>,
    strides: Vec<usize>,
    counts: Vec<usize>,
    collapsed: Vec<bool>,
    shape: Vec<usize>,
}

impl Selection {
    /// Resolve one spec per source dimension against the source
    /// extents.
    pub fn new(extents: &[usize], specs: &[AxisSpec]) -> Result<Self, SelectionError> {
        if specs.len() != extents.len() {
            return Err(LayoutError::RankMismatch {
                expected: extents.len(),
                got: specs.len(),
            }
            .into());
        }

        let rank = extents.len();
        let mut offsets = Vec::with_capacity(rank);
        let mut strides = Vec::with_capacity(rank);
        let mut counts = Vec::with_capacity(rank);
        let mut collapsed = Vec::with_capacity(rank);

        for (dim, (&extent, spec)) in extents.iter().zip(specs).enumerate() {
            match *spec {
                AxisSpec::Index(index) => {
                    if index >= extent {
                        return Err(LayoutError::IndexOutOfRange { index, extent, dim }.into());
                    }
                    offsets.push(index);
                    strides.push(1);
                    counts.push(1);
                    collapsed.push(true);
                }
                AxisSpec::Slice(range) => {
                    let (start, end, step) = range.resolve(extent);
                    if step == 0 {
                        return Err(SelectionError::ZeroStride { dim });
                    }
                    if start >= extent {
                        return Err(LayoutError::IndexOutOfRange {
                            index: start,
                            extent,
                            dim,
                        }
                        .into());
                    }
                    if end <= start {
                        return Err(SelectionError::EmptyRange {
                            start,
                            end,
                            step,
                            dim,
                        });
                    }
                    offsets.push(start);
                    strides.push(step);
                    counts.push((end - start).div_ceil(step));
                    collapsed.push(false);
                }
            }
        }

        let shape = counts
            .iter()
            .zip(&collapsed)
            .filter(|&(_, &dropped)| !dropped)
            .map(|(&count, _)| count)
            .collect();

        Ok(Self {
            extents: extents.to_vec(),
            offsets,
            strides,
            counts,
            collapsed,
            shape,
        })
    }

    /// The selection covering all of `extents`.
    pub fn all(extents: &[usize]) -> Result<Self, SelectionError> {
        let specs: Vec<AxisSpec> = extents.iter().map(|_| AxisSpec::from(..)).collect();
        Self::new(extents, &specs)
    }

    /// The effective shape: per-dimension counts with collapsed
    /// dimensions dropped.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// The number of retained dimensions.
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// The number of selected elements. The default (empty) selection
    /// has size 0; a selection that collapses every dimension of a
    /// non-empty source addresses exactly one element.
    pub fn size(&self) -> usize {
        if self.extents.is_empty() {
            0
        } else {
            self.shape.iter().product()
        }
    }

    /// The rank of the source extent box.
    pub fn source_rank(&self) -> usize {
        self.extents.len()
    }

    /// The extents of the source this selection was resolved against.
    pub fn source_extents(&self) -> &[usize] {
        &self.extents
    }

    /// Per-source-dimension selected counts, including the 1-entries
    /// of collapsed dimensions.
    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    /// Per-source-dimension starting offsets.
    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// Per-source-dimension selection strides (in index units of the
    /// source dimension, not storage units).
    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    /// The storage offset of the first selected element, assuming the
    /// source is laid out in row-major order.
    pub fn base_offset(&self) -> usize {
        let mut offset = 0;
        let mut stride = 1;
        for (&start, &extent) in self.offsets.iter().zip(&self.extents).rev() {
            offset += start * stride;
            stride *= extent;
        }
        offset
    }

    /// Storage strides of the retained dimensions: the distance in
    /// storage units between neighbors along each effective dimension.
    pub fn composed_strides(&self) -> Vec<usize> {
        let base = row_major_strides(&self.extents);
        izip!(&self.strides, &base, &self.collapsed)
            .filter(|&(_, _, &dropped)| !dropped)
            .map(|(&step, &stride, _)| step * stride)
            .collect()
    }

    /// Whether the selected elements occupy one unbroken run of the
    /// source's row-major storage.
    ///
    /// Scanning from the fastest-varying dimension, single-element
    /// dimensions are skipped; every other dimension's storage stride
    /// must equal the size of the block selected so far. The first
    /// dimension that selects a strict, strided, or offset subset
    /// therefore forces all slower dimensions down to one element.
    pub fn is_contiguous(&self) -> bool {
        let base = row_major_strides(&self.extents);
        let mut expected = 1;
        for dim in (0..self.extents.len()).rev() {
            if self.counts[dim] == 1 {
                continue;
            }
            if self.strides[dim] * base[dim] != expected {
                return false;
            }
            expected *= self.counts[dim];
        }
        true
    }

    /// Expand a coordinate in the selection's effective (compressed)
    /// rank into a coordinate in the source's full rank, re-inserting
    /// the fixed offsets at collapsed dimensions.
    ///
    /// For every valid effective coordinate `e`, the row-major offset
    /// of `expand(e)` equals `base_offset() + ∑ eₖ ×
    /// composed_strides()[k]`.
    pub fn expand(&self, effective: &[usize]) -> Result<Vec<usize>, SelectionError> {
        if effective.len() != self.rank() {
            return Err(LayoutError::RankMismatch {
                expected: self.rank(),
                got: effective.len(),
            }
            .into());
        }
        let mut source = Vec::with_capacity(self.extents.len());
        let mut next = 0;
        for dim in 0..self.extents.len() {
            if self.collapsed[dim] {
                source.push(self.offsets[dim]);
            } else {
                let index = effective[next];
                next += 1;
                if index >= self.counts[dim] {
                    return Err(LayoutError::IndexOutOfRange {
                        index,
                        extent: self.counts[dim],
                        dim,
                    }
                    .into());
                }
                source.push(self.offsets[dim] + index * self.strides[dim]);
            }
        }
        Ok(source)
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "source dimensions:")?;
        for (dim, (extent, start, stride)) in
            izip!(&self.extents, &self.offsets, &self.strides).enumerate()
        {
            writeln!(f, "{}:\t{}\t{}\t{}", dim, extent, start, stride)?;
        }
        write!(f, "effective shape: ( ")?;
        for count in &self.shape {
            write!(f, "{} ", count)?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_empty() {
        let sel = Selection::default();
        assert_eq!(sel.rank(), 0);
        assert_eq!(sel.size(), 0);
        assert_eq!(sel.shape(), &[] as &[usize]);
    }

    #[test]
    fn test_length_one_slice_retains_dimension() {
        // An index collapses a dimension; a slice of one element keeps it.
        let indexed = Selection::new(&[1, 100, 100], &axes![0, .., ..]).unwrap();
        assert_eq!(indexed.rank(), 2);
        assert_eq!(indexed.shape(), &[100, 100]);
        assert_eq!(indexed.size(), 100 * 100);

        let sliced = Selection::new(&[1, 100, 100], &axes![0..1, .., ..]).unwrap();
        assert_eq!(sliced.rank(), 3);
        assert_eq!(sliced.shape(), &[1, 100, 100]);
    }

    #[test]
    fn test_strided_shape() {
        let sel = Selection::new(&[10, 20], &axes![(1, 10, 3), (2, 20, 2)]).unwrap();
        assert_eq!(sel.shape(), &[3, 9]);
        assert_eq!(sel.rank(), 2);
        assert_eq!(sel.size(), 27);
        assert_eq!(sel.offsets(), &[1, 2]);
        assert_eq!(sel.strides(), &[3, 2]);
    }

    #[test]
    fn test_expand() {
        let sel = Selection::new(&[10, 20], &axes![(1, 10, 3), (2, 20, 2)]).unwrap();
        assert_eq!(sel.expand(&[1, 3]).unwrap(), vec![4, 8]);

        // With a collapsed middle dimension, the fixed offset is
        // re-inserted.
        let sel = Selection::new(&[10, 3, 20], &axes![(1, 10, 3), 1, (2, 20, 2)]).unwrap();
        assert_eq!(sel.expand(&[1, 3]).unwrap(), vec![4, 1, 8]);

        assert!(matches!(
            sel.expand(&[1, 2, 3]),
            Err(SelectionError::Layout(LayoutError::RankMismatch {
                expected: 2,
                got: 3
            }))
        ));
        assert!(sel.expand(&[3, 0]).is_err());
    }

    #[test]
    fn test_expand_composition() {
        let extents = [10, 3, 20];
        let sel = Selection::new(&extents, &axes![(1, 10, 3), 1, (2, 20, 2)]).unwrap();
        let strides = crate::layout::row_major_strides(&extents);
        let composed = sel.composed_strides();
        for e0 in 0..sel.shape()[0] {
            for e1 in 0..sel.shape()[1] {
                let source = sel.expand(&[e0, e1]).unwrap();
                let direct: usize = source.iter().zip(&strides).map(|(i, s)| i * s).sum();
                assert_eq!(
                    direct,
                    sel.base_offset() + e0 * composed[0] + e1 * composed[1]
                );
            }
        }
    }

    #[test]
    fn test_contiguity() {
        // The whole array is one run.
        let whole = Selection::new(&[4, 3], &axes![.., ..]).unwrap();
        assert!(whole.is_contiguous());

        // A single column out of three is not.
        let column = Selection::new(&[4, 3], &axes![.., 1..2]).unwrap();
        assert!(!column.is_contiguous());

        // A single full row is.
        let row = Selection::new(&[4, 3], &axes![1..2, ..]).unwrap();
        assert!(row.is_contiguous());

        // A strided selection along the fast dimension is not.
        let strided = Selection::new(&[4, 6], &axes![1, (0, 6, 2)]).unwrap();
        assert!(!strided.is_contiguous());

        // Fixing the slow dimension by index leaves a full fast run.
        let plane = Selection::new(&[4, 3], &axes![2, ..]).unwrap();
        assert!(plane.is_contiguous());
        assert_eq!(plane.base_offset(), 6);
    }

    #[test]
    fn test_end_clamped_and_ceil_count() {
        // End bounds beyond the extent clamp; counts round up.
        let sel = Selection::new(&[10], &axes![(3, 100, 4)]).unwrap();
        assert_eq!(sel.shape(), &[2]); // indices 3, 7
        assert_eq!(sel.expand(&[1]).unwrap(), vec![7]);
    }

    #[test]
    fn test_rejections() {
        assert!(matches!(
            Selection::new(&[4, 3], &axes![..]),
            Err(SelectionError::Layout(LayoutError::RankMismatch {
                expected: 2,
                got: 1
            }))
        ));
        assert!(matches!(
            Selection::new(&[4], &axes![4]),
            Err(SelectionError::Layout(LayoutError::IndexOutOfRange {
                index: 4,
                extent: 4,
                dim: 0
            }))
        ));
        assert!(matches!(
            Selection::new(&[4], &axes![2..2]),
            Err(SelectionError::EmptyRange {
                start: 2,
                end: 2,
                step: 1,
                dim: 0
            })
        ));
        assert!(matches!(
            Selection::new(&[4], &axes![(0, 4, 0)]),
            Err(SelectionError::ZeroStride { dim: 0 })
        ));
    }

    #[test]
    fn test_all() {
        let sel = Selection::all(&[2, 5]).unwrap();
        assert_eq!(sel.shape(), &[2, 5]);
        assert_eq!(sel.size(), 10);
        assert!(sel.is_contiguous());
        assert_eq!(sel.base_offset(), 0);
    }

    #[test]
    fn test_with_count() {
        let range = Range::with_count(1, 3, 4);
        let sel = Selection::new(&[20], &[AxisSpec::Slice(range)]).unwrap();
        assert_eq!(sel.shape(), &[4]); // indices 1, 4, 7, 10
        assert_eq!(sel.expand(&[3]).unwrap(), vec![10]);
    }

    #[test]
    fn test_display() {
        let sel = Selection::new(&[10, 20], &axes![(1, 10, 3), (2, 20, 2)]).unwrap();
        let text = sel.to_string();
        assert!(text.starts_with("source dimensions:"));
        assert!(text.ends_with("effective shape: ( 3 9 )"));
    }

    #[test]
    fn test_value_semantics() {
        let sel = Selection::new(&[4, 3], &axes![.., 1]).unwrap();
        let copy = sel.clone();
        assert_eq!(sel, copy);
    }
}
