//! Symmetric positive semi-definite checks for Gramian matrices.

use crate::error::{KernelError, KernelResult};
use scirs2_core::ndarray_ext::ArrayView2;
use scirs2_linalg::eigh;

/// Eigenvalues down to `-PSD_ROUNDOFF · max|λ|` are accepted as zero.
pub const PSD_ROUNDOFF: f64 = 1e-12;

/// Check that `matrix` is square, symmetric and positive semi-definite.
///
/// Symmetry uses the elementwise test `|aᵢⱼ - aⱼᵢ| ≤ atol + rtol · |aⱼᵢ|`.
/// Definiteness is decided on the eigenvalues of the symmetric part.
pub fn check_symmetric_psd(matrix: &ArrayView2<f64>, atol: f64, rtol: f64) -> KernelResult<()> {
    let (rows, cols) = matrix.dim();
    if rows != cols {
        return Err(KernelError::dimension_mismatch(
            "check_symmetric_psd",
            vec![rows, rows],
            vec![rows, cols],
            "matrix must be square",
        ));
    }
    if rows == 0 {
        return Ok(());
    }

    let mut max_deviation = 0.0_f64;
    let mut symmetric = true;
    for i in 0..rows {
        for j in 0..i {
            let (a, b) = (matrix[[i, j]], matrix[[j, i]]);
            let diff = (a - b).abs();
            max_deviation = max_deviation.max(diff);
            if !(diff <= atol + rtol * b.abs()) || !(diff <= atol + rtol * a.abs()) {
                symmetric = false;
            }
        }
    }
    if !symmetric {
        return Err(KernelError::not_symmetric(
            "check_symmetric_psd",
            max_deviation,
        ));
    }

    let sym = (&matrix.view() + &matrix.t()) * 0.5;
    let (eigenvalues, _) = eigh(&sym.view(), None)
        .map_err(|e| KernelError::factorization_failed("check_symmetric_psd", e))?;

    let scale = eigenvalues.iter().fold(0.0_f64, |acc, &x| acc.max(x.abs()));
    let min_eigenvalue = eigenvalues.iter().copied().fold(f64::INFINITY, f64::min);
    if min_eigenvalue.is_nan() || min_eigenvalue < -PSD_ROUNDOFF * scale {
        return Err(KernelError::not_positive_semidefinite(
            "check_symmetric_psd",
            min_eigenvalue,
        ));
    }
    Ok(())
}
