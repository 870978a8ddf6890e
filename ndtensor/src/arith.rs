/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! In-place element-wise arithmetic.
//!
//! The checked `try_*_assign` methods accept any [`Operand`] — arrays,
//! views, or unevaluated expressions — and reject per-dimension shape
//! disagreements. The operator sugar (`+=` and friends) delegates to
//! the checked path and panics on violation. A rayon-backed policy
//! (behind the `parallel` feature) fans disjoint element ranges out
//! across worker threads.

use std::ops;

use ndlayout::LayoutMap;

use crate::array::Array;
use crate::array::ArrayError;
use crate::expr::BinOp;
use crate::expr::Operand;
use crate::view::ArrayView;

impl<T, L: LayoutMap> Array<T, L> {
    fn try_apply_assign<R, O>(&mut self, rhs: &R) -> Result<(), ArrayError>
    where
        T: Copy,
        R: Operand<Elem = T>,
        O: BinOp<T>,
    {
        if rhs.rank() != 0 && rhs.shape() != self.shape() {
            return Err(ArrayError::ShapeMismatch {
                left: self.shape().to_vec(),
                right: rhs.shape(),
            });
        }
        for (index, elem) in self.data.iter_mut().enumerate() {
            *elem = O::apply(*elem, rhs.eval(index));
        }
        Ok(())
    }
}

impl<T, L: LayoutMap> Array<T, L> {
    /// Element-wise `self += rhs` for any array-like or expression of
    /// matching shape.
    pub fn try_add_assign<R>(&mut self, rhs: &R) -> Result<(), ArrayError>
    where
        T: Copy + ops::Add<Output = T>,
        R: Operand<Elem = T>,
    {
        self.try_apply_assign::<R, crate::expr::AddOp>(rhs)
    }

    /// Element-wise `self -= rhs`.
    pub fn try_sub_assign<R>(&mut self, rhs: &R) -> Result<(), ArrayError>
    where
        T: Copy + ops::Sub<Output = T>,
        R: Operand<Elem = T>,
    {
        self.try_apply_assign::<R, crate::expr::SubOp>(rhs)
    }

    /// Element-wise `self *= rhs`.
    pub fn try_mul_assign<R>(&mut self, rhs: &R) -> Result<(), ArrayError>
    where
        T: Copy + ops::Mul<Output = T>,
        R: Operand<Elem = T>,
    {
        self.try_apply_assign::<R, crate::expr::MulOp>(rhs)
    }

    /// Element-wise `self /= rhs`.
    pub fn try_div_assign<R>(&mut self, rhs: &R) -> Result<(), ArrayError>
    where
        T: Copy + ops::Div<Output = T>,
        R: Operand<Elem = T>,
    {
        self.try_apply_assign::<R, crate::expr::DivOp>(rhs)
    }
}

impl<T, L> ops::AddAssign<T> for Array<T, L>
where
    T: Copy + ops::Add<Output = T>,
    L: LayoutMap,
{
    fn add_assign(&mut self, rhs: T) {
        for elem in self.data.iter_mut() {
            *elem = *elem + rhs;
        }
    }
}

impl<T, L> ops::SubAssign<T> for Array<T, L>
where
    T: Copy + ops::Sub<Output = T>,
    L: LayoutMap,
{
    fn sub_assign(&mut self, rhs: T) {
        for elem in self.data.iter_mut() {
            *elem = *elem - rhs;
        }
    }
}

impl<T, L> ops::MulAssign<T> for Array<T, L>
where
    T: Copy + ops::Mul<Output = T>,
    L: LayoutMap,
{
    fn mul_assign(&mut self, rhs: T) {
        for elem in self.data.iter_mut() {
            *elem = *elem * rhs;
        }
    }
}

impl<T, L> ops::DivAssign<T> for Array<T, L>
where
    T: Copy + ops::Div<Output = T>,
    L: LayoutMap,
{
    fn div_assign(&mut self, rhs: T) {
        for elem in self.data.iter_mut() {
            *elem = *elem / rhs;
        }
    }
}

impl<T, L1, L2> ops::AddAssign<&Array<T, L2>> for Array<T, L1>
where
    T: Copy + ops::Add<Output = T>,
    L1: LayoutMap,
    L2: LayoutMap,
{
    fn add_assign(&mut self, rhs: &Array<T, L2>) {
        if let Err(err) = self.try_add_assign(&rhs) {
            panic!("{}", err);
        }
    }
}

impl<T, L1, L2> ops::SubAssign<&Array<T, L2>> for Array<T, L1>
where
    T: Copy + ops::Sub<Output = T>,
    L1: LayoutMap,
    L2: LayoutMap,
{
    fn sub_assign(&mut self, rhs: &Array<T, L2>) {
        if let Err(err) = self.try_sub_assign(&rhs) {
            panic!("{}", err);
        }
    }
}

impl<T, L1, L2> ops::MulAssign<&Array<T, L2>> for Array<T, L1>
where
    T: Copy + ops::Mul<Output = T>,
    L1: LayoutMap,
    L2: LayoutMap,
{
    fn mul_assign(&mut self, rhs: &Array<T, L2>) {
        if let Err(err) = self.try_mul_assign(&rhs) {
            panic!("{}", err);
        }
    }
}

impl<T, L1, L2> ops::DivAssign<&Array<T, L2>> for Array<T, L1>
where
    T: Copy + ops::Div<Output = T>,
    L1: LayoutMap,
    L2: LayoutMap,
{
    fn div_assign(&mut self, rhs: &Array<T, L2>) {
        if let Err(err) = self.try_div_assign(&rhs) {
            panic!("{}", err);
        }
    }
}

impl<T, L1, L2> ops::AddAssign<&ArrayView<'_, T, L2>> for Array<T, L1>
where
    T: Copy + ops::Add<Output = T>,
    L1: LayoutMap,
    L2: LayoutMap,
{
    fn add_assign(&mut self, rhs: &ArrayView<'_, T, L2>) {
        if let Err(err) = self.try_add_assign(&rhs) {
            panic!("{}", err);
        }
    }
}

impl<T, L1, L2> ops::SubAssign<&ArrayView<'_, T, L2>> for Array<T, L1>
where
    T: Copy + ops::Sub<Output = T>,
    L1: LayoutMap,
    L2: LayoutMap,
{
    fn sub_assign(&mut self, rhs: &ArrayView<'_, T, L2>) {
        if let Err(err) = self.try_sub_assign(&rhs) {
            panic!("{}", err);
        }
    }
}

#[cfg(feature = "parallel")]
impl<T, L: LayoutMap> Array<T, L>
where
    T: Send,
{
    /// Apply `f` to every element, fanning disjoint element ranges out
    /// across rayon workers. Safe because each worker owns its range
    /// exclusively and nothing else mutates the array concurrently.
    pub fn par_apply<F>(&mut self, f: F)
    where
        F: Fn(&mut T) + Send + Sync,
    {
        use rayon::prelude::*;

        let elements = self.data.len();
        let chunk = elements
            .div_ceil(rayon::current_num_threads().max(1))
            .max(1);
        tracing::debug!(elements, chunk, "parallel in-place apply");
        self.data
            .par_chunks_mut(chunk)
            .for_each(|range| range.iter_mut().for_each(&f));
    }

    /// Parallel element-wise `self += rhs` for a scalar.
    pub fn par_add_assign(&mut self, rhs: T)
    where
        T: Copy + ops::Add<Output = T> + Sync,
    {
        self.par_apply(move |elem| *elem = *elem + rhs);
    }

    /// Parallel element-wise `self -= rhs` for a scalar.
    pub fn par_sub_assign(&mut self, rhs: T)
    where
        T: Copy + ops::Sub<Output = T> + Sync,
    {
        self.par_apply(move |elem| *elem = *elem - rhs);
    }

    /// Parallel element-wise `self *= rhs` for a scalar.
    pub fn par_mul_assign(&mut self, rhs: T)
    where
        T: Copy + ops::Mul<Output = T> + Sync,
    {
        self.par_apply(move |elem| *elem = *elem * rhs);
    }

    /// Parallel element-wise `self /= rhs` for a scalar.
    pub fn par_div_assign(&mut self, rhs: T)
    where
        T: Copy + ops::Div<Output = T> + Sync,
    {
        self.par_apply(move |elem| *elem = *elem / rhs);
    }
}

#[cfg(test)]
mod tests {
    use ndlayout::axes;

    use crate::array::ArrayError;
    use crate::array::DynArray;

    #[test]
    fn test_scalar_inplace() {
        let mut a = DynArray::from_vec(&[2, 2], vec![1, 2, 3, 4]).unwrap();
        a += 10;
        assert_eq!(a.data(), &[11, 12, 13, 14]);
        a -= 1;
        assert_eq!(a.data(), &[10, 11, 12, 13]);
        a *= 2;
        assert_eq!(a.data(), &[20, 22, 24, 26]);
        a /= 2;
        assert_eq!(a.data(), &[10, 11, 12, 13]);
    }

    #[test]
    fn test_array_inplace() {
        let mut a = DynArray::from_vec(&[3], vec![1.0, 2.0, 3.0]).unwrap();
        let b = DynArray::from_vec(&[3], vec![0.5, 0.5, 0.5]).unwrap();
        a += &b;
        assert_eq!(a.data(), &[1.5, 2.5, 3.5]);
        a -= &b;
        assert_eq!(a.data(), &[1.0, 2.0, 3.0]);
        a.try_mul_assign(&&b).unwrap();
        assert_eq!(a.data(), &[0.5, 1.0, 1.5]);
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let mut a = DynArray::from_vec(&[2, 3], vec![1, 2, 3, 4, 5, 6]).unwrap();
        let b = DynArray::from_vec(&[3, 2], vec![1, 2, 3, 4, 5, 6]).unwrap();
        // Same total size, different shape.
        assert!(matches!(
            a.try_add_assign(&&b),
            Err(ArrayError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_view_inplace() {
        let src = DynArray::from_vec(&[4, 3], (0..12i64).collect()).unwrap();
        let row = src.slice(&axes![2, ..]).unwrap();
        let mut a = DynArray::from_vec(&[3], vec![1, 1, 1]).unwrap();
        a += &row;
        assert_eq!(a.data(), &[7, 8, 9]);
    }

    #[test]
    fn test_expression_inplace() {
        let mut a = DynArray::from_vec(&[3], vec![1, 2, 3]).unwrap();
        let b = DynArray::from_vec(&[3], vec![10, 20, 30]).unwrap();
        let c = DynArray::from_vec(&[3], vec![1, 1, 1]).unwrap();
        a.try_add_assign(&(&b + &c)).unwrap();
        assert_eq!(a.data(), &[12, 23, 34]);
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_parallel_matches_serial() {
        let mut serial = DynArray::from_vec(&[100], (0..100i64).collect()).unwrap();
        let mut parallel = serial.clone();
        serial += 7;
        parallel.par_add_assign(7);
        assert_eq!(serial.data(), parallel.data());

        serial *= 3;
        parallel.par_mul_assign(3);
        assert_eq!(serial.data(), parallel.data());
    }
}
