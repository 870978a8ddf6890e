/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

use std::fmt;
use std::ops;

use ndlayout::AxisSpec;
use ndlayout::DynLayout;
use ndlayout::FixedLayout;
use ndlayout::LayoutError;
use ndlayout::LayoutMap;
use ndlayout::Selection;
use ndlayout::SelectionError;
use num_traits::NumCast;
use num_traits::ToPrimitive;
use num_traits::Zero;

use crate::view::ArrayView;
use crate::view::ArrayViewMut;

/// The type of error for array operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ArrayError {
    #[error("shape mismatch: left {left:?}, right {right:?}")]
    ShapeMismatch {
        left: Vec<usize>,
        right: Vec<usize>,
    },

    #[error("size mismatch: expected {expected} elements, got {got}")]
    SizeMismatch { expected: usize, got: usize },

    #[error("non-contiguous view: the selection does not address one linear run")]
    NonContiguousView,

    #[error("value {value} cannot be represented in the target element type")]
    TypeConversion { value: String },

    #[error("failed to allocate storage for {elements} elements")]
    MemoryAllocation { elements: usize },

    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error(transparent)]
    Selection(#[from] SelectionError),
}

/// Allocate storage for `elements` copies of `elem`, reporting
/// exhaustion as an error instead of aborting.
fn alloc_elems<T: Clone>(elements: usize, elem: T) -> Result<Vec<T>, ArrayError> {
    tracing::trace!(elements, "allocating dense storage");
    let mut data = Vec::new();
    data.try_reserve_exact(elements)
        .map_err(|_| ArrayError::MemoryAllocation { elements })?;
    data.resize(elements, elem);
    Ok(data)
}

/// A dense multidimensional array owning an index map and a linear
/// storage buffer, with the invariant `layout.size() == data.len()`
/// maintained by every constructor and mutator.
///
/// The layout parameter selects the index-map variant at the type
/// level: [`DynArray`] for runtime-ranked arrays, [`FixedArray`] for
/// arrays whose rank is part of the type.
///
/// ```
/// use ndtensor::DynArray;
///
/// let mut a = DynArray::from_vec(&[2, 3], vec![1, 2, 3, 4, 5, 6]).unwrap();
/// assert_eq!(a[&[1, 2][..]], 6);
/// a[&[1, 2][..]] = 9;
/// assert_eq!(*a.at(5).unwrap(), 9);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Array<T, L = DynLayout> {
    pub(crate) layout: L,
    pub(crate) data: Vec<T>,
}

/// A dense array with runtime-chosen rank.
pub type DynArray<T> = Array<T, DynLayout>;

/// A dense array whose rank is fixed by the type.
pub type FixedArray<T, const R: usize> = Array<T, FixedLayout<R>>;

impl<T, L: LayoutMap> Array<T, L> {
    /// Assemble an array from an index map and storage, validating the
    /// size invariant.
    pub fn from_parts(layout: L, data: Vec<T>) -> Result<Self, ArrayError> {
        if layout.size() != data.len() {
            return Err(ArrayError::SizeMismatch {
                expected: layout.size(),
                got: data.len(),
            });
        }
        Ok(Self { layout, data })
    }

    /// Release the index map and storage.
    pub fn into_parts(self) -> (L, Vec<T>) {
        (self.layout, self.data)
    }

    /// The number of elements along each dimension.
    pub fn shape(&self) -> &[usize] {
        self.layout.extents()
    }

    /// The number of dimensions.
    pub fn rank(&self) -> usize {
        self.layout.rank()
    }

    /// The total number of elements.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// The index map.
    pub fn layout(&self) -> &L {
        &self.layout
    }

    /// The contiguous row-major storage.
    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// Mutable access to the contiguous row-major storage.
    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Checked linear element access.
    pub fn at(&self, index: usize) -> Result<&T, ArrayError> {
        let size = self.data.len();
        self.data
            .get(index)
            .ok_or(ArrayError::Layout(LayoutError::OffsetOutOfRange {
                offset: index,
                size,
            }))
    }

    /// Checked mutable linear element access.
    pub fn at_mut(&mut self, index: usize) -> Result<&mut T, ArrayError> {
        let size = self.data.len();
        self.data
            .get_mut(index)
            .ok_or(ArrayError::Layout(LayoutError::OffsetOutOfRange {
                offset: index,
                size,
            }))
    }

    /// Checked multidimensional element access.
    pub fn get(&self, coord: &[usize]) -> Result<&T, ArrayError> {
        let offset = self.layout.offset(coord)?;
        Ok(&self.data[offset])
    }

    /// Checked mutable multidimensional element access.
    pub fn get_mut(&mut self, coord: &[usize]) -> Result<&mut T, ArrayError> {
        let offset = self.layout.offset(coord)?;
        Ok(&mut self.data[offset])
    }

    /// Iterate over the elements in row-major order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.data.iter()
    }

    /// Iterate mutably over the elements in row-major order.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.data.iter_mut()
    }

    /// Select a sub-region, producing a non-owning view. Dimensions
    /// given a single [`AxisSpec::Index`] are collapsed out of the
    /// view's shape; sliced dimensions are retained.
    pub fn slice(&self, specs: &[AxisSpec]) -> Result<ArrayView<'_, T, L>, ArrayError> {
        let selection = Selection::new(self.shape(), specs)?;
        ArrayView::new(self, selection)
    }

    /// Select a sub-region for writing.
    pub fn slice_mut(&mut self, specs: &[AxisSpec]) -> Result<ArrayViewMut<'_, T, L>, ArrayError> {
        let selection = Selection::new(self.shape(), specs)?;
        ArrayViewMut::new(self, selection)
    }

    /// Overwrite every element from a flat row-major slice of the same
    /// length.
    pub fn assign_from_slice(&mut self, src: &[T]) -> Result<(), ArrayError>
    where
        T: Clone,
    {
        if src.len() != self.data.len() {
            return Err(ArrayError::SizeMismatch {
                expected: self.data.len(),
                got: src.len(),
            });
        }
        self.data.clone_from_slice(src);
        Ok(())
    }

    /// Overwrite every element from another array, converting element
    /// types with a per-element representability check. A value the
    /// target type cannot hold fails the whole assignment; nothing is
    /// silently truncated. Shapes must agree dimension by dimension
    /// even when the total counts match.
    pub fn assign_convert<U, M>(&mut self, src: &Array<U, M>) -> Result<(), ArrayError>
    where
        U: ToPrimitive + Copy + fmt::Display,
        M: LayoutMap,
        T: NumCast,
    {
        if self.shape() != src.shape() {
            return Err(ArrayError::ShapeMismatch {
                left: self.shape().to_vec(),
                right: src.shape().to_vec(),
            });
        }
        for (dst, &s) in self.data.iter_mut().zip(&src.data) {
            *dst = T::from(s).ok_or_else(|| ArrayError::TypeConversion {
                value: s.to_string(),
            })?;
        }
        Ok(())
    }

    /// Set every element to `elem`.
    pub fn fill(&mut self, elem: T)
    where
        T: Clone,
    {
        self.data.fill(elem);
    }
}

impl<T> Array<T, DynLayout> {
    /// An array of zeros with the given shape.
    pub fn zeros(shape: &[usize]) -> Result<Self, ArrayError>
    where
        T: Zero + Clone,
    {
        Self::from_elem(shape, T::zero())
    }

    /// An array filled with `elem`.
    pub fn from_elem(shape: &[usize], elem: T) -> Result<Self, ArrayError>
    where
        T: Clone,
    {
        let layout = DynLayout::new(shape);
        let data = alloc_elems(layout.size(), elem)?;
        Ok(Self { layout, data })
    }

    /// An array over existing row-major data.
    pub fn from_vec(shape: &[usize], data: Vec<T>) -> Result<Self, ArrayError> {
        Self::from_parts(DynLayout::new(shape), data)
    }

    /// An array copy-converted from another array's elements, with the
    /// same per-element representability check as
    /// [`Array::assign_convert`].
    pub fn converted_from<U, M>(src: &Array<U, M>) -> Result<Self, ArrayError>
    where
        U: ToPrimitive + Copy + fmt::Display,
        M: LayoutMap,
        T: NumCast,
    {
        let layout = DynLayout::new(src.shape());
        let mut data = Vec::new();
        data.try_reserve_exact(src.size())
            .map_err(|_| ArrayError::MemoryAllocation {
                elements: src.size(),
            })?;
        for &s in &src.data {
            data.push(T::from(s).ok_or_else(|| ArrayError::TypeConversion {
                value: s.to_string(),
            })?);
        }
        Ok(Self { layout, data })
    }

    /// Exchange the shape for another covering the same number of
    /// elements. The storage is untouched; only the index map changes.
    pub fn reshape(&mut self, shape: &[usize]) -> Result<(), ArrayError> {
        self.layout.reshape(shape)?;
        Ok(())
    }
}

impl<T, const R: usize> Array<T, FixedLayout<R>> {
    /// A fixed-rank array of zeros.
    pub fn zeros(extents: [usize; R]) -> Result<Self, ArrayError>
    where
        T: Zero + Clone,
    {
        Self::from_elem(extents, T::zero())
    }

    /// A fixed-rank array filled with `elem`.
    pub fn from_elem(extents: [usize; R], elem: T) -> Result<Self, ArrayError>
    where
        T: Clone,
    {
        let layout = FixedLayout::new(extents);
        let data = alloc_elems(layout.size(), elem)?;
        Ok(Self { layout, data })
    }

    /// A fixed-rank array over existing row-major data.
    pub fn from_vec(extents: [usize; R], data: Vec<T>) -> Result<Self, ArrayError> {
        Self::from_parts(FixedLayout::new(extents), data)
    }
}

impl<T, L: LayoutMap> ops::Index<usize> for Array<T, L> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.data[index]
    }
}

impl<T, L: LayoutMap> ops::IndexMut<usize> for Array<T, L> {
    fn index_mut(&mut self, index: usize) -> &mut T {
        &mut self.data[index]
    }
}

impl<T, L: LayoutMap> ops::Index<&[usize]> for Array<T, L> {
    type Output = T;

    fn index(&self, coord: &[usize]) -> &T {
        match self.layout.offset(coord) {
            Ok(offset) => &self.data[offset],
            Err(err) => panic!("{}", err),
        }
    }
}

impl<T, L: LayoutMap> ops::IndexMut<&[usize]> for Array<T, L> {
    fn index_mut(&mut self, coord: &[usize]) -> &mut T {
        match self.layout.offset(coord) {
            Ok(offset) => &mut self.data[offset],
            Err(err) => panic!("{}", err),
        }
    }
}

impl<'a, T, L: LayoutMap> IntoIterator for &'a Array<T, L> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.iter()
    }
}

impl<T: fmt::Display, L: LayoutMap> fmt::Display for Array<T, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn block<T: fmt::Display>(
            f: &mut fmt::Formatter<'_>,
            extents: &[usize],
            data: &[T],
        ) -> fmt::Result {
            match extents.split_first() {
                None => write!(f, "{}", data[0]),
                Some((&outer, rest)) => {
                    write!(f, "[")?;
                    let chunk = rest.iter().product::<usize>().max(1);
                    for i in 0..outer {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        if rest.is_empty() {
                            write!(f, "{}", data[i])?;
                        } else {
                            block(f, rest, &data[i * chunk..(i + 1) * chunk])?;
                        }
                    }
                    write!(f, "]")
                }
            }
        }
        if self.data.is_empty() {
            return write!(f, "[]");
        }
        block(f, self.shape(), &self.data)
    }
}
