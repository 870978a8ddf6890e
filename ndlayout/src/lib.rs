/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Index-mapping and selection core for dense multidimensional arrays.
//!
//! Provides [`LayoutMap`], the bidirectional mapping between
//! multidimensional coordinates and linear storage offsets in
//! row-major order, with a runtime-ranked ([`DynLayout`]) and a
//! type-ranked ([`FixedLayout`]) variant, and [`Selection`], a value
//! object describing a rectangular, possibly strided sub-region of an
//! extent box together with its effective shape, contiguity, and
//! coordinate expansion.
//!
//! The crate holds coordinate math only — no element storage — so it
//! can be reused by containers, views, and I/O layers alike.

mod layout;
pub use layout::row_major_coord;
pub use layout::row_major_strides;
pub use layout::CoordIterator;
pub use layout::DynLayout;
pub use layout::FixedLayout;
pub use layout::LayoutError;
pub use layout::LayoutMap;

/// Selection descriptors for strided sub-regions.
pub mod selection;
pub use selection::AxisSpec;
pub use selection::Range;
pub use selection::Selection;
pub use selection::SelectionError;

/// Property-based generators for randomized test input.
#[cfg(test)]
pub mod strategy;
