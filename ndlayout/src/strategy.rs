/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Property-based generators for layouts and selections.
//!
//! These strategies are used in `proptest`-based tests to construct
//! randomized extent boxes and selection requests for testing the
//! offset/coordinate round trip and the expansion composition law.
//!
//! This module is only included in test builds (`#[cfg(test)]`).

use proptest::prelude::*;

use crate::AxisSpec;
use crate::DynLayout;
use crate::Range;
use crate::Selection;

/// Generates extents with up to `max_rank` dimensions, each between 1
/// and `max_extent` (inclusive).
pub fn gen_extents(max_rank: usize, max_extent: usize) -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(1..=max_extent, 1..=max_rank)
}

/// Generates a random [`DynLayout`] via [`gen_extents`].
pub fn gen_layout(max_rank: usize, max_extent: usize) -> impl Strategy<Value = DynLayout> {
    gen_extents(max_rank, max_extent).prop_map(DynLayout::new)
}

/// One raw per-dimension draw, folded into a valid [`AxisSpec`]
/// against a concrete extent: either a single index or a nonempty
/// strided range.
fn spec_from_draw(extent: usize, (index, start, len, step): (bool, usize, usize, usize)) -> AxisSpec {
    let start = start % extent;
    if index {
        AxisSpec::Index(start)
    } else {
        let end = start + 1 + len % (extent - start);
        AxisSpec::Slice(Range(start, Some(end), 1 + step % 3))
    }
}

/// Generates a pair `(extents, selection)` where the selection is a
/// valid resolution of random axis specs against the extents.
pub fn gen_selection(
    max_rank: usize,
    max_extent: usize,
) -> impl Strategy<Value = (Vec<usize>, Selection)> {
    gen_extents(max_rank, max_extent).prop_flat_map(|extents| {
        let rank = extents.len();
        (
            Just(extents),
            prop::collection::vec(
                (any::<bool>(), any::<usize>(), any::<usize>(), any::<usize>()),
                rank,
            ),
        )
            .prop_map(|(extents, draws)| {
                let specs: Vec<AxisSpec> = extents
                    .iter()
                    .zip(draws)
                    .map(|(&extent, draw)| spec_from_draw(extent, draw))
                    .collect();
                let selection = Selection::new(&extents, &specs)
                    .expect("generated specs are valid for their extents");
                (extents, selection)
            })
    })
}
