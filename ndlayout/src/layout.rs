/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

use serde::Deserialize;
use serde::Serialize;

/// The type of error for layout operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum LayoutError {
    #[error("rank mismatch: expected {expected}, got {got}")]
    RankMismatch { expected: usize, got: usize },

    #[error("size mismatch: expected {expected} elements, got {got}")]
    SizeMismatch { expected: usize, got: usize },

    #[error("extent mismatch in dimension {dim}: expected {expected}, got {got}")]
    ShapeMismatch {
        dim: usize,
        expected: usize,
        got: usize,
    },

    #[error("index {index} out of range {extent} in dimension {dim}")]
    IndexOutOfRange {
        index: usize,
        extent: usize,
        dim: usize,
    },

    #[error("offset {offset} out of range {size}")]
    OffsetOutOfRange { offset: usize, size: usize },
}

/// Row-major strides for the given extents: the last dimension varies
/// fastest and has stride 1.
pub fn row_major_strides(extents: &[usize]) -> Vec<usize> {
    // "flip it and reverse it" --Missy Elliott
    let mut strides: Vec<usize> = extents.to_vec();
    let _ = strides.iter_mut().rev().fold(1, |acc, n| {
        let next = *n * acc;
        *n = acc;
        next
    });
    strides
}

/// Decompose a linear row-major offset into a coordinate for the given
/// extents. Returns `None` when the offset lies outside the extents'
/// element count.
pub fn row_major_coord(extents: &[usize], offset: usize) -> Option<Vec<usize>> {
    if offset >= extents.iter().product() {
        return None;
    }
    let mut coord = vec![0; extents.len()];
    let mut rest = offset;
    for (i, extent) in extents.iter().enumerate().rev() {
        coord[i] = rest % extent;
        rest /= extent;
    }
    Some(coord)
}

mod sealed {
    // Private trait -- only layout variants in this crate implement it.
    pub trait Sealed {}
}

/// A map between multidimensional coordinates (in `ℕⁿ`) and linear
/// storage offsets (`ℕ¹`), in row-major ("C") order.
///
/// The forward direction is the affine form
///
/// ```text
/// offset(x) = ∑ xₖ × strideₖ,   strideₖ = ∏(extents[j] for j > k)
/// ```
///
/// and [`LayoutMap::coord_of`] is its exact inverse: for every offset
/// `o < size()`, `offset(coord_of(o)) == o`.
///
/// Two variants implement the contract: [`DynLayout`], whose rank is
/// chosen at runtime and which may be reshaped, and [`FixedLayout`],
/// whose rank is part of the type. Selection between them happens at
/// the type level, never by a runtime branch inside the map.
pub trait LayoutMap: sealed::Sealed {
    /// The number of elements along each dimension.
    fn extents(&self) -> &[usize];

    /// The number of dimensions in the domain of the map.
    fn rank(&self) -> usize {
        self.extents().len()
    }

    /// The total number of addressable elements. A rank-0 map addresses
    /// a single scalar.
    fn size(&self) -> usize {
        self.extents().iter().product()
    }

    /// Map a coordinate to its linear offset without validation. The
    /// caller must guarantee `coord` has matching rank and in-range
    /// components; out-of-range input yields a meaningless offset.
    fn offset_unchecked(&self, coord: &[usize]) -> usize {
        let mut offset = 0;
        let mut stride = 1;
        for (index, extent) in coord.iter().zip(self.extents()).rev() {
            offset += index * stride;
            stride *= extent;
        }
        offset
    }

    /// Map a coordinate to its linear offset, validating rank and
    /// per-dimension bounds.
    fn offset(&self, coord: &[usize]) -> Result<usize, LayoutError> {
        if coord.len() != self.rank() {
            return Err(LayoutError::RankMismatch {
                expected: self.rank(),
                got: coord.len(),
            });
        }
        for (dim, (&index, &extent)) in coord.iter().zip(self.extents()).enumerate() {
            if index >= extent {
                return Err(LayoutError::IndexOutOfRange { index, extent, dim });
            }
        }
        Ok(self.offset_unchecked(coord))
    }

    /// The coordinate whose offset is `offset`; the exact inverse of
    /// [`LayoutMap::offset`] for all offsets below `size()`.
    fn coord_of(&self, offset: usize) -> Result<Vec<usize>, LayoutError> {
        row_major_coord(self.extents(), offset).ok_or(LayoutError::OffsetOutOfRange {
            offset,
            size: self.size(),
        })
    }
}

/// A layout whose rank and extents are chosen at runtime.
///
/// ```
/// use ndlayout::{DynLayout, LayoutMap};
///
/// let map = DynLayout::new(vec![4, 3]);
/// assert_eq!(map.offset(&[2, 1]).unwrap(), 7);
/// assert_eq!(map.coord_of(7).unwrap(), vec![2, 1]);
/// ```
#[derive(Serialize, Deserialize, Clone, Default, Eq, PartialEq, Hash, Debug)]
pub struct DynLayout {
    extents: Vec<usize>,
}

impl DynLayout {
    /// Create a layout for the given extents. Any rank is accepted.
    pub fn new(extents: impl Into<Vec<usize>>) -> Self {
        Self {
            extents: extents.into(),
        }
    }

    /// Replace the extents with a new set covering the same number of
    /// elements. Offsets computed against the old extents are
    /// meaningless afterwards.
    pub fn reshape(&mut self, extents: impl Into<Vec<usize>>) -> Result<(), LayoutError> {
        let extents = extents.into();
        let got = extents.iter().product();
        if got != self.size() {
            return Err(LayoutError::SizeMismatch {
                expected: self.size(),
                got,
            });
        }
        self.extents = extents;
        Ok(())
    }
}

impl sealed::Sealed for DynLayout {}

impl LayoutMap for DynLayout {
    fn extents(&self) -> &[usize] {
        &self.extents
    }
}

/// A layout whose rank is fixed by the type. Extents are set at
/// construction and immutable afterwards.
///
/// ```
/// use ndlayout::{FixedLayout, LayoutMap};
///
/// let image: FixedLayout<2> = FixedLayout::new([1024, 768]);
/// assert_eq!(image.rank(), 2);
/// assert!(FixedLayout::<2>::from_extents(&[4, 3, 2]).is_err());
/// ```
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct FixedLayout<const R: usize> {
    extents: [usize; R],
}

impl<const R: usize> FixedLayout<R> {
    /// Create a layout from exactly `R` extents.
    pub fn new(extents: [usize; R]) -> Self {
        Self { extents }
    }

    /// Create a layout from a runtime-sized extent list, rejecting any
    /// list whose rank does not match `R`.
    pub fn from_extents(extents: &[usize]) -> Result<Self, LayoutError> {
        if extents.len() != R {
            return Err(LayoutError::RankMismatch {
                expected: R,
                got: extents.len(),
            });
        }
        let mut fixed = [0; R];
        fixed.copy_from_slice(extents);
        Ok(Self { extents: fixed })
    }

    /// Create a layout for `expected`, validating that `supplied`
    /// matches it dimension by dimension. This carries the contract of
    /// a map whose extents are part of its declaration: a rank
    /// disagreement is a rank mismatch, a value disagreement is a
    /// shape mismatch.
    pub fn matching(expected: [usize; R], supplied: &[usize]) -> Result<Self, LayoutError> {
        if supplied.len() != R {
            return Err(LayoutError::RankMismatch {
                expected: R,
                got: supplied.len(),
            });
        }
        for (dim, (&want, &got)) in expected.iter().zip(supplied).enumerate() {
            if want != got {
                return Err(LayoutError::ShapeMismatch {
                    dim,
                    expected: want,
                    got,
                });
            }
        }
        Ok(Self { extents: expected })
    }
}

impl<const R: usize> sealed::Sealed for FixedLayout<R> {}

impl<const R: usize> LayoutMap for FixedLayout<R> {
    fn extents(&self) -> &[usize] {
        &self.extents
    }
}

/// Iterates over all coordinates of an N-dimensional extent box in
/// row-major order (last dimension varies fastest).
///
/// ```
/// use ndlayout::CoordIterator;
///
/// let coords: Vec<_> = CoordIterator::new(vec![2, 3]).collect();
/// assert_eq!(coords, vec![
///     vec![0, 0], vec![0, 1], vec![0, 2],
///     vec![1, 0], vec![1, 1], vec![1, 2],
/// ]);
/// ```
pub struct CoordIterator {
    extents: Vec<usize>,
    index: usize,
    total: usize,
}

impl CoordIterator {
    pub fn new(extents: impl Into<Vec<usize>>) -> Self {
        let extents = extents.into();
        let total = extents.iter().product();
        CoordIterator {
            extents,
            index: 0,
            total,
        }
    }
}

impl Iterator for CoordIterator {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.total {
            return None;
        }
        let mut coord = vec![0; self.extents.len()];
        let mut rest = self.index;
        for (i, extent) in self.extents.iter().enumerate().rev() {
            coord[i] = rest % extent;
            rest /= extent;
        }
        self.index += 1;
        Some(coord)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let rest = self.total - self.index;
        (rest, Some(rest))
    }
}

impl ExactSizeIterator for CoordIterator {}
