//! Minimum-norm least squares.
//!
//! Local ALS problems are frequently rank deficient or underdetermined (few
//! samples, many block coefficients). [`min_norm_lstsq`] always returns the
//! Moore–Penrose solution `x = A⁺ b`, computed from a truncated SVD with the
//! usual cutoff `σ > ε · max(m, n) · σ_max`.

use crate::error::{KernelError, KernelResult};
use scirs2_core::ndarray_ext::{s, Array1, Array2, ArrayView1, ArrayView2, Axis};
use scirs2_linalg::svd;

/// Singular values below `rcond · σ_max` are treated as zero.
pub fn default_rcond(rows: usize, cols: usize) -> f64 {
    f64::EPSILON * rows.max(cols) as f64
}

/// Solve `A X ≈ B` in the least-squares sense, returning the solution of
/// minimal Frobenius norm.
///
/// `A` is `(m × n)`, `B` is `(m × k)`; the result is `(n × k)`.
pub fn min_norm_lstsq(a: &ArrayView2<f64>, b: &ArrayView2<f64>) -> KernelResult<Array2<f64>> {
    let (m, n) = a.dim();
    if b.nrows() != m {
        return Err(KernelError::dimension_mismatch(
            "min_norm_lstsq",
            vec![m, b.ncols()],
            vec![b.nrows(), b.ncols()],
            "right-hand side must have one row per equation",
        ));
    }
    let nrhs = b.ncols();
    if m == 0 || n == 0 {
        return Ok(Array2::zeros((n, nrhs)));
    }

    // Factor the tall orientation so the SVD only ever sees m ≥ n.
    // A = U Σ Vᵀ, stored as (u: m×k, sigma: k, v: n×k)
    let (u, sigma, v) = if m >= n {
        let (u, sigma, vt) = svd(a, false, None)
            .map_err(|e| KernelError::factorization_failed("min_norm_lstsq", e))?;
        (u, sigma, vt.t().to_owned())
    } else {
        let transposed = a.t().to_owned();
        let (u, sigma, vt) = svd(&transposed.view(), false, None)
            .map_err(|e| KernelError::factorization_failed("min_norm_lstsq", e))?;
        (vt.t().to_owned(), sigma, u)
    };

    let k = m.min(n).min(sigma.len()).min(u.ncols()).min(v.ncols());
    let sigma_max = sigma.iter().take(k).fold(0.0_f64, |acc, &x| acc.max(x.abs()));
    let cutoff = default_rcond(m, n) * sigma_max;

    let mut x = Array2::<f64>::zeros((n, nrhs));
    for i in 0..k {
        let sv = sigma[i];
        if sv <= cutoff {
            continue;
        }
        // x += v_i (u_iᵀ B) / σ_i
        let coeff = u.column(i).dot(b) / sv;
        let vi = v.slice(s![.., i]).insert_axis(Axis(1));
        let contribution = vi.dot(&coeff.insert_axis(Axis(0)));
        x += &contribution;
    }
    Ok(x)
}

/// Vector right-hand side variant of [`min_norm_lstsq`].
pub fn min_norm_lstsq_vec(a: &ArrayView2<f64>, b: &ArrayView1<f64>) -> KernelResult<Array1<f64>> {
    let rhs = b.view().insert_axis(Axis(1));
    let x = min_norm_lstsq(a, &rhs)?;
    Ok(x.column(0).to_owned())
}
