/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Dense multidimensional arrays over the `ndlayout` coordinate core.
//!
//! Provides [`Array`], an owning container pairing an index map with
//! contiguous row-major storage; [`ArrayView`] and [`ArrayViewMut`],
//! zero-copy aliases over strided selections of an array; lazy
//! element-wise arithmetic through [`Expr`] nodes built by the
//! standard binary operators; and [`Value`], a runtime-typed scalar
//! for heterogeneous metadata.
//!
//! ```
//! use ndlayout::axes;
//! use ndtensor::DynArray;
//!
//! let a = DynArray::from_vec(&[2, 3], vec![1, 2, 3, 4, 5, 6]).unwrap();
//! let b = DynArray::from_vec(&[2, 3], vec![6, 5, 4, 3, 2, 1]).unwrap();
//!
//! // Arithmetic is lazy; nothing is computed until materialization.
//! let sum = DynArray::from_expr(&(&a + &b)).unwrap();
//! assert!(sum.iter().all(|&x| x == 7));
//!
//! // Slicing produces zero-copy views.
//! let row = a.slice(&axes![1, ..]).unwrap();
//! assert_eq!(row.data().unwrap(), &[4, 5, 6]);
//! ```

mod array;
pub use array::Array;
pub use array::ArrayError;
pub use array::DynArray;
pub use array::FixedArray;

/// Zero-copy views over array selections.
pub mod view;
pub use view::ArrayView;
pub use view::ArrayViewMut;
pub use view::ViewIter;

/// Lazy element-wise arithmetic expressions.
pub mod expr;
pub use expr::BinOp;
pub use expr::Expr;
pub use expr::ExprIter;
pub use expr::Operand;
pub use expr::Scalar;

mod arith;

/// Runtime-typed scalar values.
pub mod value;
pub use value::ScalarKind;
pub use value::ScalarRepr;
pub use value::TypeId;
pub use value::Value;
pub use value::ValueError;
