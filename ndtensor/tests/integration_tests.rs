/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! End-to-end behavior across arrays, views, expressions, and values.

use anyhow::Result;
use ndlayout::axes;
use ndlayout::AxisSpec;
use ndlayout::Selection;
use ndtensor::ArrayError;
use ndtensor::DynArray;
use ndtensor::FixedArray;
use ndtensor::TypeId;
use ndtensor::Value;
use proptest::prelude::*;
use rand::rngs::SmallRng;
use rand::Rng;
use rand::SeedableRng;

fn iota(shape: &[usize]) -> DynArray<i64> {
    let size: usize = shape.iter().product();
    DynArray::from_vec(shape, (0..size as i64).collect()).unwrap()
}

#[test]
fn view_aliasing_round_trip() -> Result<()> {
    // Writing through a view mutates the source; reading the source
    // back through the view observes the write.
    let mut a = iota(&[4, 3]);
    {
        let mut v = a.slice_mut(&axes![1..3, 1..3])?;
        *v.get_mut(&[0, 0])? = 100;
        *v.get_mut(&[1, 1])? = 200;
    }
    assert_eq!(a[&[1, 1][..]], 100);
    assert_eq!(a[&[2, 2][..]], 200);

    let v = a.slice(&axes![1..3, 1..3])?;
    assert_eq!(*v.get(&[0, 0])?, 100);
    assert_eq!(*v.get(&[1, 1])?, 200);
    Ok(())
}

#[test]
fn materialization_is_a_deep_copy() -> Result<()> {
    let mut a = iota(&[3, 4]);
    let b = {
        let v = a.slice(&axes![.., (0, 4, 2)])?;
        let b = v.to_array();
        // Element-for-element equal in view order at copy time.
        let through: Vec<i64> = v.iter().copied().collect();
        assert_eq!(b.data(), &through[..]);
        b
    };
    a += 1000;
    // The copy must not follow the source.
    assert_eq!(b.data(), &[0, 2, 4, 6, 8, 10]);
    Ok(())
}

#[test]
fn slicing_composes_with_arithmetic() -> Result<()> {
    let a = iota(&[4, 3]);
    let top = a.slice(&axes![0..2, ..])?;
    let bottom = a.slice(&axes![2..4, ..])?;

    let folded = DynArray::from_expr(&(&top + &bottom))?;
    assert_eq!(folded.shape(), &[2, 3]);
    assert_eq!(folded.data(), &[6, 8, 10, 12, 14, 16]);

    // The same fold, shifted lazily by a scalar on either side.
    let shifted = DynArray::from_expr(&(1 + (&top + &bottom)))?;
    assert_eq!(shifted.data(), &[7, 9, 11, 13, 15, 17]);
    Ok(())
}

#[test]
fn expression_laziness() -> Result<()> {
    let a: DynArray<i32> = DynArray::from_vec(&[3], vec![1, 2, 3])?;
    let b: DynArray<i32> = DynArray::from_vec(&[3], vec![10, 20, 30])?;
    // A single element evaluates without a temporary array.
    assert_eq!((&a + &b).eval(1), 22);
    assert_eq!((&a + 5).eval(2), 8);
    Ok(())
}

#[test]
fn fixed_and_dyn_arrays_interoperate() -> Result<()> {
    let fixed = FixedArray::from_vec([2, 3], vec![1, 2, 3, 4, 5, 6])?;
    let dynamic = iota(&[2, 3]);
    let sum = DynArray::from_expr(&(&fixed + &dynamic))?;
    assert_eq!(sum.data(), &[1, 3, 5, 7, 9, 11]);

    let mut acc: DynArray<i64> = DynArray::zeros(&[2, 3])?;
    acc.try_add_assign(&&fixed)?;
    acc += &dynamic;
    assert_eq!(sum, acc);
    Ok(())
}

#[test]
fn contiguity_governs_raw_access() -> Result<()> {
    let a = iota(&[4, 3]);

    let whole = a.slice(&axes![.., ..])?;
    assert_eq!(whole.data()?.len(), 12);

    let row = a.slice(&axes![1..2, ..])?;
    assert_eq!(row.data()?, &[3, 4, 5]);

    let column = a.slice(&axes![.., 1..2])?;
    assert!(matches!(column.data(), Err(ArrayError::NonContiguousView)));
    Ok(())
}

#[test]
fn shape_mismatch_beats_size_match() -> Result<()> {
    let mut dst: DynArray<i32> = DynArray::zeros(&[2, 3])?;
    let src = DynArray::from_vec(&[3, 2], vec![1, 2, 3, 4, 5, 6])?;
    assert!(matches!(
        dst.assign_convert(&src),
        Err(ArrayError::ShapeMismatch { .. })
    ));
    assert!(matches!(
        dst.try_add_assign(&&src),
        Err(ArrayError::ShapeMismatch { .. })
    ));
    Ok(())
}

#[test]
fn values_carry_array_metadata() -> Result<()> {
    // A heterogeneous parameter set of the kind an I/O collaborator
    // produces.
    let params: Vec<(&str, Value)> = vec![
        ("exposure", Value::new(0.25f64)),
        ("frames", Value::new(128u32)),
        ("detector", Value::new("pilatus".to_string())),
    ];
    assert_eq!(params[0].1.type_id()?, TypeId::Float64);
    assert_eq!(params[1].1.as_::<u64>()?, 128);
    assert_eq!(params[2].1.format()?, "pilatus");
    assert!(params[2].1.as_::<f64>().is_err());
    Ok(())
}

#[test]
fn selection_reuse_across_arrays() -> Result<()> {
    // A selection is a value object; the same one binds to any array
    // of the matching shape.
    let sel = Selection::new(&[4, 3], &axes![1..3, 1])?;
    let a = iota(&[4, 3]);
    let b = iota(&[3, 4]);

    let view = ndtensor::ArrayView::new(&a, sel.clone())?;
    assert_eq!(view.shape(), &[2]);

    assert!(matches!(
        ndtensor::ArrayView::new(&b, sel),
        Err(ArrayError::ShapeMismatch { .. })
    ));
    Ok(())
}

#[cfg(feature = "parallel")]
#[test]
fn parallel_policy_agrees_with_serial() {
    let mut rng = SmallRng::seed_from_u64(7);
    let data: Vec<i64> = (0..1000).map(|_| rng.gen_range(-100..100)).collect();
    let mut serial = DynArray::from_vec(&[10, 100], data).unwrap();
    let mut parallel = serial.clone();

    serial += 3;
    serial *= 2;
    parallel.par_add_assign(3);
    parallel.par_mul_assign(2);
    assert_eq!(serial, parallel);
}

proptest! {
    /// Materializing any slice of any array equals reading the array
    /// through the view, element for element, in view order.
    #[test]
    fn materialized_views_match_lazy_reads(
        (extents, specs) in prop::collection::vec(1..5usize, 1..4)
            .prop_flat_map(|extents| {
                let rank = extents.len();
                (
                    Just(extents),
                    prop::collection::vec(
                        (any::<bool>(), any::<usize>(), any::<usize>()),
                        rank,
                    ),
                )
                    .prop_map(|(extents, draws)| {
                        let specs: Vec<AxisSpec> = extents
                            .iter()
                            .zip(draws)
                            .map(|(&e, (index, a, b))| {
                                let start = a % e;
                                if index {
                                    AxisSpec::Index(start)
                                } else {
                                    AxisSpec::from(start..start + 1 + b % (e - start))
                                }
                            })
                            .collect();
                        (extents, specs)
                    })
            })
    ) {
        let size: usize = extents.iter().product();
        let a = DynArray::from_vec(&extents, (0..size as i64).collect()).unwrap();
        let view = a.slice(&specs).unwrap();
        let copied = view.to_array();
        prop_assert_eq!(copied.shape(), view.shape());
        for (index, elem) in copied.iter().enumerate() {
            prop_assert_eq!(elem, view.at(index).unwrap());
        }
    }
}
