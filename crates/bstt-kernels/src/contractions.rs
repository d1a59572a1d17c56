//! Stack contractions for alternating sweeps over tensor trains.
//!
//! During a sweep the cores left and right of the active core are frozen, so
//! their contraction with the sample measurements can be cached as *stacks*.
//! This module provides the kernels that extend a stack by one core.
//!
//! # Layout
//!
//! Cores are 4-index arrays `(left rank, mode dim, slot, right rank)`. The
//! slot axis has extent one for scalar trains; coupled systems use it to give
//! each equation its own slice of the core.
//!
//! Sample stacks are 3-index arrays `(samples, channels, rank)`. Each channel
//! reads the core at one slot and pairs it with one measurement matrix of
//! shape `(samples, mode dim)`:
//!
//! ```text
//! left'[n, c, r]  = Σ_{l,e} left[n, c, l] · meas_c[n, e] · core[l, e, slot_c, r]
//! right'[n, c, l] = Σ_{e,r} core[l, e, slot_c, r] · meas_c[n, e] · right[n, c, r]
//! ```
//!
//! Gramian stacks are `(rank × rank)` matrices and sum over every slot:
//!
//! ```text
//! GL'[k, n] = Σ core[i, j, s, k] · core[l, m, s, n] · G[j, m] · GL[i, l]
//! GR'[i, l] = Σ core[i, j, s, k] · core[l, m, s, n] · G[j, m] · GR[k, n]
//! ```
//!
//! # Examples
//!
//! ```rust
//! use scirs2_core::ndarray_ext::{Array2, Array3, Array4};
//! use bstt_kernels::contractions::contract_left;
//!
//! let core = Array4::<f64>::ones((1, 3, 1, 2));
//! let meas = Array2::<f64>::ones((5, 3));
//! let left = Array3::<f64>::ones((5, 1, 1));
//!
//! let next = contract_left(&core.view(), &[meas.view()], &[0], &left.view()).unwrap();
//! assert_eq!(next.shape(), &[5, 1, 2]);
//! assert!((next[[0, 0, 0]] - 3.0).abs() < 1e-12);
//! ```

use crate::error::{KernelError, KernelResult};
use scirs2_core::ndarray_ext::{s, Array2, Array3, ArrayView2, ArrayView3, ArrayView4, Axis};

fn reshape_error(operation: &str, what: &str, err: impl std::fmt::Display) -> KernelError {
    KernelError::operation_error(operation, format!("Failed to reshape {}: {}", what, err))
}

/// Validate that measurements, slots and a sample stack agree with a core.
///
/// `stack_rank` is the rank the stack must carry on the side it is contracted
/// with (left rank for left stacks, right rank for right stacks).
fn check_channels(
    operation: &str,
    core: &ArrayView4<f64>,
    measurements: &[ArrayView2<f64>],
    slots: &[usize],
    stack: &ArrayView3<f64>,
    stack_rank: usize,
) -> KernelResult<()> {
    let (_, dim, num_slots, _) = core.dim();
    let (num_samples, num_channels, rank) = stack.dim();

    if measurements.is_empty() {
        return Err(KernelError::empty_input(operation, "measurements"));
    }
    if measurements.len() != num_channels || slots.len() != num_channels {
        return Err(KernelError::dimension_mismatch(
            operation,
            vec![num_channels, num_channels],
            vec![measurements.len(), slots.len()],
            "one measurement matrix and one slot per channel",
        ));
    }
    if rank != stack_rank {
        return Err(KernelError::dimension_mismatch(
            operation,
            vec![num_samples, num_channels, stack_rank],
            vec![num_samples, num_channels, rank],
            "stack rank must match the contracted core rank",
        ));
    }
    for (meas, &slot) in measurements.iter().zip(slots) {
        if meas.dim() != (num_samples, dim) {
            return Err(KernelError::dimension_mismatch(
                operation,
                vec![num_samples, dim],
                vec![meas.nrows(), meas.ncols()],
                "measurement matrix must be (samples × mode dimension)",
            ));
        }
        if slot >= num_slots {
            return Err(KernelError::invalid_slot(operation, slot, num_slots));
        }
    }
    Ok(())
}

/// Extend a left stack by one core.
///
/// Returns the stack entry `(samples, channels, right rank)` for the core
/// following `core`.
pub fn contract_left(
    core: &ArrayView4<f64>,
    measurements: &[ArrayView2<f64>],
    slots: &[usize],
    left: &ArrayView3<f64>,
) -> KernelResult<Array3<f64>> {
    let (l, e, _, r) = core.dim();
    check_channels("contract_left", core, measurements, slots, left, l)?;
    let (n, c, _) = left.dim();

    let mut out = Array3::<f64>::zeros((n, c, r));
    for (ch, (meas, &slot)) in measurements.iter().zip(slots).enumerate() {
        let mat = core
            .slice(s![.., .., slot, ..])
            .to_shape((l * e, r))
            .map_err(|err| reshape_error("contract_left", "core slice", err))?
            .to_owned();

        let mut weights = Array2::<f64>::zeros((n, l * e));
        for i in 0..n {
            for a in 0..l {
                let lv = left[[i, ch, a]];
                if lv == 0.0 {
                    continue;
                }
                for b in 0..e {
                    weights[[i, a * e + b]] = lv * meas[[i, b]];
                }
            }
        }

        out.slice_mut(s![.., ch, ..]).assign(&weights.dot(&mat));
    }
    Ok(out)
}

/// Extend a right stack by one core.
///
/// Returns the stack entry `(samples, channels, left rank)` for the core
/// preceding `core`.
pub fn contract_right(
    core: &ArrayView4<f64>,
    measurements: &[ArrayView2<f64>],
    slots: &[usize],
    right: &ArrayView3<f64>,
) -> KernelResult<Array3<f64>> {
    let (l, e, _, r) = core.dim();
    check_channels("contract_right", core, measurements, slots, right, r)?;
    let (n, c, _) = right.dim();

    let mut out = Array3::<f64>::zeros((n, c, l));
    for (ch, (meas, &slot)) in measurements.iter().zip(slots).enumerate() {
        let mat = core
            .slice(s![.., .., slot, ..])
            .to_shape((l, e * r))
            .map_err(|err| reshape_error("contract_right", "core slice", err))?
            .to_owned();

        let mut weights = Array2::<f64>::zeros((n, e * r));
        for i in 0..n {
            for b in 0..e {
                let mv = meas[[i, b]];
                if mv == 0.0 {
                    continue;
                }
                for k in 0..r {
                    weights[[i, b * r + k]] = mv * right[[i, ch, k]];
                }
            }
        }

        out.slice_mut(s![.., ch, ..]).assign(&weights.dot(&mat.t()));
    }
    Ok(out)
}

/// Contract a core with both adjacent stacks, giving one prediction per
/// sample and channel.
pub fn contract_local(
    core: &ArrayView4<f64>,
    measurements: &[ArrayView2<f64>],
    slots: &[usize],
    left: &ArrayView3<f64>,
    right: &ArrayView3<f64>,
) -> KernelResult<Array2<f64>> {
    let (_, _, _, r) = core.dim();
    let extended = contract_left(core, measurements, slots, left)?;
    if right.dim() != (extended.shape()[0], extended.shape()[1], r) {
        return Err(KernelError::dimension_mismatch(
            "contract_local",
            extended.shape().to_vec(),
            right.shape().to_vec(),
            "left and right stacks must agree on samples and channels",
        ));
    }
    Ok((&extended * right).sum_axis(Axis(2)))
}

fn check_gramian(
    operation: &str,
    core: &ArrayView4<f64>,
    gram: &ArrayView2<f64>,
    stack: &ArrayView2<f64>,
    stack_rank: usize,
) -> KernelResult<()> {
    let dim = core.shape()[1];
    if gram.dim() != (dim, dim) {
        return Err(KernelError::dimension_mismatch(
            operation,
            vec![dim, dim],
            vec![gram.nrows(), gram.ncols()],
            "Gramian must be square in the mode dimension",
        ));
    }
    if stack.dim() != (stack_rank, stack_rank) {
        return Err(KernelError::dimension_mismatch(
            operation,
            vec![stack_rank, stack_rank],
            vec![stack.nrows(), stack.ncols()],
            "Gramian stack must be square in the contracted rank",
        ));
    }
    Ok(())
}

/// Extend a left Gramian stack by one core, giving a `(right rank × right rank)`
/// matrix.
pub fn gramian_left(
    core: &ArrayView4<f64>,
    gram: &ArrayView2<f64>,
    left: &ArrayView2<f64>,
) -> KernelResult<Array2<f64>> {
    let (l, e, num_slots, r) = core.dim();
    check_gramian("gramian_left", core, gram, left, l)?;

    let mut out = Array2::<f64>::zeros((r, r));
    for slot in 0..num_slots {
        let a2 = core
            .slice(s![.., .., slot, ..])
            .to_shape((l, e * r))
            .map_err(|err| reshape_error("gramian_left", "core slice", err))?
            .to_owned();

        // X[l', j, k] = Σ_i GL[i, l'] A[i, j, k]
        let x = left.t().dot(&a2);
        // Y[l', m, k] = Σ_j G[j, m] X[l', j, k]
        let mut y = Array2::<f64>::zeros((l * e, r));
        for row in 0..l {
            let xi = x
                .row(row)
                .to_shape((e, r))
                .map_err(|err| reshape_error("gramian_left", "partial contraction", err))?
                .to_owned();
            y.slice_mut(s![row * e..(row + 1) * e, ..])
                .assign(&gram.t().dot(&xi));
        }
        let a_rows = a2
            .to_shape((l * e, r))
            .map_err(|err| reshape_error("gramian_left", "core slice", err))?
            .to_owned();
        out += &y.t().dot(&a_rows);
    }
    Ok(out)
}

/// Extend a right Gramian stack by one core, giving a `(left rank × left rank)`
/// matrix.
pub fn gramian_right(
    core: &ArrayView4<f64>,
    gram: &ArrayView2<f64>,
    right: &ArrayView2<f64>,
) -> KernelResult<Array2<f64>> {
    let (l, e, num_slots, r) = core.dim();
    check_gramian("gramian_right", core, gram, right, r)?;

    let mut out = Array2::<f64>::zeros((l, l));
    for slot in 0..num_slots {
        let a_rows = core
            .slice(s![.., .., slot, ..])
            .to_shape((l * e, r))
            .map_err(|err| reshape_error("gramian_right", "core slice", err))?
            .to_owned();

        // X[i, j, n] = Σ_k A[i, j, k] GR[k, n]
        let x = a_rows.dot(right);
        // Y[i, m, n] = Σ_j G[j, m] X[i, j, n]
        let mut y = Array2::<f64>::zeros((l, e * r));
        for row in 0..l {
            let xi = x.slice(s![row * e..(row + 1) * e, ..]);
            let yi = gram.t().dot(&xi);
            for m in 0..e {
                for k in 0..r {
                    y[[row, m * r + k]] = yi[[m, k]];
                }
            }
        }
        let a2 = a_rows
            .to_shape((l, e * r))
            .map_err(|err| reshape_error("gramian_right", "core slice", err))?
            .to_owned();
        out += &y.dot(&a2.t());
    }
    Ok(out)
}

/// Squared Gramian-weighted norm of a train whose frozen parts are summarised
/// by the Gramian stacks `left` and `right`.
pub fn gramian_norm_squared(
    core: &ArrayView4<f64>,
    gram: &ArrayView2<f64>,
    left: &ArrayView2<f64>,
    right: &ArrayView2<f64>,
) -> KernelResult<f64> {
    let extended = gramian_left(core, gram, left)?;
    if extended.dim() != right.dim() {
        return Err(KernelError::dimension_mismatch(
            "gramian_norm_squared",
            extended.shape().to_vec(),
            right.shape().to_vec(),
            "right Gramian stack must match the core's right rank",
        ));
    }
    Ok((&extended * right).sum())
}

#[cfg(test)]
mod tests {
    use super::*;
    use scirs2_core::ndarray_ext::{Array2, Array3, Array4};

    fn sample_core() -> Array4<f64> {
        Array4::from_shape_fn((2, 3, 1, 2), |(l, e, _, r)| {
            (l as f64 + 1.0) * 0.5 + e as f64 - 0.25 * r as f64
        })
    }

    fn naive_left(
        core: &Array4<f64>,
        meas: &Array2<f64>,
        slot: usize,
        left: &Array2<f64>,
    ) -> Array2<f64> {
        let (l, e, _, r) = core.dim();
        let n = meas.nrows();
        Array2::from_shape_fn((n, r), |(i, k)| {
            let mut acc = 0.0;
            for a in 0..l {
                for b in 0..e {
                    acc += left[[i, a]] * meas[[i, b]] * core[[a, b, slot, k]];
                }
            }
            acc
        })
    }

    #[test]
    fn test_contract_left_matches_naive() {
        let core = sample_core();
        let meas = Array2::from_shape_fn((4, 3), |(n, e)| (n * 3 + e) as f64 * 0.1);
        let left = Array3::from_shape_fn((4, 1, 2), |(n, _, l)| 1.0 + n as f64 - l as f64);

        let result = contract_left(&core.view(), &[meas.view()], &[0], &left.view()).unwrap();
        let left2 = left.slice(s![.., 0, ..]).to_owned();
        let expected = naive_left(&core, &meas, 0, &left2);

        assert_eq!(result.shape(), &[4, 1, 2]);
        for i in 0..4 {
            for k in 0..2 {
                assert!((result[[i, 0, k]] - expected[[i, k]]).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_contract_right_matches_naive() {
        let core = sample_core();
        let meas = Array2::from_shape_fn((3, 3), |(n, e)| 1.0 + (n + e) as f64);
        let right = Array3::from_shape_fn((3, 1, 2), |(n, _, r)| 0.5 * n as f64 + r as f64);

        let result = contract_right(&core.view(), &[meas.view()], &[0], &right.view()).unwrap();

        for i in 0..3 {
            for a in 0..2 {
                let mut expected = 0.0;
                for b in 0..3 {
                    for k in 0..2 {
                        expected += core[[a, b, 0, k]] * meas[[i, b]] * right[[i, 0, k]];
                    }
                }
                assert!((result[[i, 0, a]] - expected).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_channels_use_their_slot() {
        let mut core = Array4::<f64>::zeros((1, 2, 2, 1));
        core[[0, 0, 0, 0]] = 1.0;
        core[[0, 1, 1, 0]] = 2.0;
        let meas = Array2::from_elem((1, 2), 1.0);
        let left = Array3::<f64>::ones((1, 2, 1));

        let result = contract_left(
            &core.view(),
            &[meas.view(), meas.view()],
            &[0, 1],
            &left.view(),
        )
        .unwrap();

        assert_eq!(result[[0, 0, 0]], 1.0);
        assert_eq!(result[[0, 1, 0]], 2.0);
    }

    #[test]
    fn test_contract_local_is_consistent() {
        let core = sample_core();
        let meas = Array2::from_shape_fn((3, 3), |(n, e)| ((n + 2 * e) % 4) as f64);
        let left = Array3::from_shape_fn((3, 1, 2), |(n, _, l)| 1.0 + (n * l) as f64);
        let right = Array3::from_shape_fn((3, 1, 2), |(n, _, r)| 2.0 - (n + r) as f64);

        let local = contract_local(
            &core.view(),
            &[meas.view()],
            &[0],
            &left.view(),
            &right.view(),
        )
        .unwrap();
        let via_right = contract_right(&core.view(), &[meas.view()], &[0], &right.view()).unwrap();

        for i in 0..3 {
            let expected: f64 = (0..2).map(|l| left[[i, 0, l]] * via_right[[i, 0, l]]).sum();
            assert!((local[[i, 0]] - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn test_rank_mismatch_is_rejected() {
        let core = sample_core();
        let meas = Array2::<f64>::ones((2, 3));
        let left = Array3::<f64>::ones((2, 1, 3));

        let result = contract_left(&core.view(), &[meas.view()], &[0], &left.view());
        assert!(matches!(result, Err(KernelError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_slot_out_of_range_is_rejected() {
        let core = sample_core();
        let meas = Array2::<f64>::ones((2, 3));
        let left = Array3::<f64>::ones((2, 1, 2));

        let result = contract_left(&core.view(), &[meas.view()], &[1], &left.view());
        assert!(matches!(result, Err(KernelError::InvalidSlot { .. })));
    }

    #[test]
    fn test_gramian_stacks_match_naive() {
        let core = Array4::from_shape_fn((2, 3, 2, 2), |(l, e, s, r)| {
            ((l + 2 * e + 3 * s + 5 * r) % 7) as f64 - 3.0
        });
        let gram = Array2::from_shape_fn((3, 3), |(i, j)| if i == j { 2.0 } else { 0.5 });
        let stack = Array2::from_shape_fn((2, 2), |(i, j)| 1.0 + (i + j) as f64);

        let left = gramian_left(&core.view(), &gram.view(), &stack.view()).unwrap();
        let right = gramian_right(&core.view(), &gram.view(), &stack.view()).unwrap();

        let mut expected_left = Array2::<f64>::zeros((2, 2));
        let mut expected_right = Array2::<f64>::zeros((2, 2));
        for i in 0..2 {
            for j in 0..3 {
                for s_ in 0..2 {
                    for k in 0..2 {
                        for l in 0..2 {
                            for m in 0..3 {
                                for n in 0..2 {
                                    let w = core[[i, j, s_, k]] * core[[l, m, s_, n]] * gram[[j, m]];
                                    expected_left[[k, n]] += w * stack[[i, l]];
                                    expected_right[[i, l]] += w * stack[[k, n]];
                                }
                            }
                        }
                    }
                }
            }
        }

        for a in 0..2 {
            for b in 0..2 {
                assert!((left[[a, b]] - expected_left[[a, b]]).abs() < 1e-10);
                assert!((right[[a, b]] - expected_right[[a, b]]).abs() < 1e-10);
            }
        }
    }

    #[test]
    fn test_gramian_norm_of_single_core() {
        // One core with boundary ranks: the norm reduces to vᵀ G v.
        let mut core = Array4::<f64>::zeros((1, 2, 1, 1));
        core[[0, 0, 0, 0]] = 3.0;
        core[[0, 1, 0, 0]] = 4.0;
        let gram = Array2::<f64>::eye(2);
        let one = Array2::<f64>::ones((1, 1));

        let norm_sq =
            gramian_norm_squared(&core.view(), &gram.view(), &one.view(), &one.view()).unwrap();
        assert!((norm_sq - 25.0).abs() < 1e-12);
    }
}
