//! Orthogonal factorizations used when moving the core of a tensor train.
//!
//! [`orthogonal_factor`] splits a matrix `M = Q · R` with orthonormal columns
//! in `Q`; [`orthogonal_factor_rows`] is the mirrored `M = L · Q` split with
//! orthonormal rows. Both return the thin factors (`k = min(rows, cols)`), so
//! they work for tall and wide matrices alike.
//!
//! # SciRS2 Integration
//!
//! Tall matrices are factored with `scirs2_linalg::qr`. Wide matrices have no
//! thin QR, so the SVD of the transpose is used instead:
//! `Mᵀ = U Σ Vᵀ` gives `M = V · (Σ Uᵀ)`.

use crate::error::{KernelError, KernelResult};
use scirs2_core::ndarray_ext::{s, Array2, ArrayView2};
use scirs2_linalg::{qr, svd};

/// Thin factorization `M = Q · R` where `Q` has orthonormal columns.
///
/// Returns `(Q, R)` with shapes `(rows × k)` and `(k × cols)`,
/// `k = min(rows, cols)`. Empty inputs produce empty factors.
///
/// # Examples
///
/// ```rust
/// use scirs2_core::ndarray_ext::array;
/// use bstt_kernels::factorize::orthogonal_factor;
///
/// let m = array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]];
/// let (q, r) = orthogonal_factor(&m.view()).unwrap();
/// assert_eq!(q.shape(), &[3, 2]);
/// assert_eq!(r.shape(), &[2, 2]);
/// let back = q.dot(&r);
/// assert!((back[[2, 1]] - 6.0).abs() < 1e-10);
/// ```
pub fn orthogonal_factor(matrix: &ArrayView2<f64>) -> KernelResult<(Array2<f64>, Array2<f64>)> {
    let (rows, cols) = matrix.dim();
    let k = rows.min(cols);
    if k == 0 {
        return Ok((Array2::zeros((rows, 0)), Array2::zeros((0, cols))));
    }

    if rows >= cols {
        let (q_full, r_full) = qr(matrix, None)
            .map_err(|e| KernelError::factorization_failed("orthogonal_factor", e))?;
        if q_full.ncols() < k || r_full.nrows() < k {
            return Err(KernelError::dimension_mismatch(
                "orthogonal_factor",
                vec![rows, k],
                vec![q_full.nrows(), q_full.ncols()],
                "QR returned fewer columns than the matrix rank bound",
            ));
        }
        let q = q_full.slice(s![.., ..k]).to_owned();
        let r = r_full.slice(s![..k, ..]).to_owned();
        Ok((q, r))
    } else {
        // Mᵀ is tall: Mᵀ = U Σ Vᵀ, hence M = V (Σ Uᵀ).
        let transposed = matrix.t().to_owned();
        let (u, sigma, vt) = svd(&transposed.view(), false, None)
            .map_err(|e| KernelError::factorization_failed("orthogonal_factor", e))?;
        if u.ncols() < k || sigma.len() < k || vt.nrows() < k {
            return Err(KernelError::dimension_mismatch(
                "orthogonal_factor",
                vec![cols, k],
                vec![u.nrows(), u.ncols()],
                "SVD returned fewer singular triplets than expected",
            ));
        }
        let q = vt.slice(s![..k, ..]).t().to_owned();
        let mut r = u.slice(s![.., ..k]).t().to_owned();
        for (mut row, &sv) in r.rows_mut().into_iter().zip(sigma.iter().take(k)) {
            row *= sv;
        }
        Ok((q, r))
    }
}

/// Thin factorization `M = L · Q` where `Q` has orthonormal rows.
///
/// Returns `(L, Q)` with shapes `(rows × k)` and `(k × cols)`.
pub fn orthogonal_factor_rows(
    matrix: &ArrayView2<f64>,
) -> KernelResult<(Array2<f64>, Array2<f64>)> {
    let transposed = matrix.t().to_owned();
    let (q, r) = orthogonal_factor(&transposed.view())?;
    Ok((r.t().to_owned(), q.t().to_owned()))
}
