//! Basis function evaluations at sample points.
//!
//! Every generator takes a `(num_samples × order)` matrix of points and
//! returns [`Measurements`] with `degree + 1` basis functions per mode.
//!
//! | generator | basis |
//! |-----------|-------|
//! | [`monomial_measures`] | `1, x, x², …` |
//! | [`legendre_measures`] | `√(2k+1)·P_k`, orthonormal w.r.t. `dx/2` on `[a, b]` mapped to `[-1, 1]` |
//! | [`legendre_measures_with_derivatives`] | the above and their `x`-derivatives |
//! | [`hermite_measures`] | probabilists' Hermite `He_k / √(√(2π)·k!)` |
//! | [`sine_cosine_measures`] | `1, sin x, cos x, sin 2x, cos 2x, …` |

use crate::error::{BasisError, BasisResult};
use bstt_core::Measurements;
use scirs2_core::ndarray_ext::{Array1, Array2, ArrayView2};

fn check_interval(a: f64, b: f64) -> BasisResult<()> {
    if !(a < b) || !a.is_finite() || !b.is_finite() {
        return Err(BasisError::InvalidInterval { a, b });
    }
    Ok(())
}

fn check_points(points: &ArrayView2<f64>) -> BasisResult<()> {
    if points.ncols() == 0 {
        return Err(BasisError::ShapeMismatch(
            "points need at least one coordinate".to_string(),
        ));
    }
    Ok(())
}

/// Apply a univariate basis to every coordinate of every point.
fn per_mode<F>(points: &ArrayView2<f64>, dim: usize, mut basis: F) -> BasisResult<Measurements>
where
    F: FnMut(f64, &mut [f64]),
{
    check_points(points)?;
    let (num_samples, order) = points.dim();
    let mut modes = Vec::with_capacity(order);
    let mut buffer = vec![0.0; dim];
    for k in 0..order {
        let mut mode = Array2::<f64>::zeros((num_samples, dim));
        for n in 0..num_samples {
            basis(points[[n, k]], &mut buffer);
            for (e, &v) in buffer.iter().enumerate() {
                mode[[n, e]] = v;
            }
        }
        modes.push(mode);
    }
    Ok(Measurements::from_modes(modes)?)
}

/// Legendre polynomials `P_0..P_{len-1}` at `t` and their `t`-derivatives.
pub(crate) fn legendre_values(t: f64, values: &mut [f64], derivatives: &mut [f64]) {
    let len = values.len();
    if len == 0 {
        return;
    }
    values[0] = 1.0;
    derivatives[0] = 0.0;
    if len > 1 {
        values[1] = t;
        derivatives[1] = 1.0;
    }
    for n in 1..len.saturating_sub(1) {
        let nf = n as f64;
        values[n + 1] = ((2.0 * nf + 1.0) * t * values[n] - nf * values[n - 1]) / (nf + 1.0);
        derivatives[n + 1] = derivatives[n - 1] + (2.0 * nf + 1.0) * values[n];
    }
}

/// Monomials `x^0..x^degree`.
pub fn monomial_measures(points: &ArrayView2<f64>, degree: usize) -> BasisResult<Measurements> {
    per_mode(points, degree + 1, |x, out| {
        let mut acc = 1.0;
        for v in out.iter_mut() {
            *v = acc;
            acc *= x;
        }
    })
}

/// Normalized Legendre polynomials on `[a, b]`.
pub fn legendre_measures(
    points: &ArrayView2<f64>,
    degree: usize,
    a: f64,
    b: f64,
) -> BasisResult<Measurements> {
    check_interval(a, b)?;
    let dim = degree + 1;
    let mut derivatives = vec![0.0; dim];
    per_mode(points, dim, |x, out| {
        let t = 2.0 / (b - a) * (x - a) - 1.0;
        legendre_values(t, out, &mut derivatives);
        for (k, v) in out.iter_mut().enumerate() {
            *v *= (2.0 * k as f64 + 1.0).sqrt();
        }
    })
}

/// Normalized Legendre polynomials on `[a, b]` together with their
/// derivatives in `x`.
///
/// Returns `(values, derivatives)`; mode `k` of `derivatives` holds
/// `d/dx_k` of mode `k` of `values`.
pub fn legendre_measures_with_derivatives(
    points: &ArrayView2<f64>,
    degree: usize,
    a: f64,
    b: f64,
) -> BasisResult<(Measurements, Measurements)> {
    check_interval(a, b)?;
    check_points(points)?;
    let dim = degree + 1;
    let scale = 2.0 / (b - a);
    let factors = Array1::from_shape_fn(dim, |k| (2.0 * k as f64 + 1.0).sqrt());
    let (num_samples, order) = points.dim();

    let mut values = Vec::with_capacity(order);
    let mut derivatives = Vec::with_capacity(order);
    let mut p = vec![0.0; dim];
    let mut dp = vec![0.0; dim];
    for k in 0..order {
        let mut mode = Array2::<f64>::zeros((num_samples, dim));
        let mut mode_der = Array2::<f64>::zeros((num_samples, dim));
        for n in 0..num_samples {
            let t = scale * (points[[n, k]] - a) - 1.0;
            legendre_values(t, &mut p, &mut dp);
            for e in 0..dim {
                mode[[n, e]] = factors[e] * p[e];
                mode_der[[n, e]] = factors[e] * scale * dp[e];
            }
        }
        values.push(mode);
        derivatives.push(mode_der);
    }
    Ok((
        Measurements::from_modes(values)?,
        Measurements::from_modes(derivatives)?,
    ))
}

/// Monomials `1, x, …, x^degree` together with their derivatives
/// `0, 1, …, degree·x^(degree-1)`.
pub fn monomial_measures_with_derivatives(
    points: &ArrayView2<f64>,
    degree: usize,
) -> BasisResult<(Measurements, Measurements)> {
    check_points(points)?;
    let dim = degree + 1;
    let (num_samples, order) = points.dim();

    let mut values = Vec::with_capacity(order);
    let mut derivatives = Vec::with_capacity(order);
    for k in 0..order {
        let mut mode = Array2::<f64>::zeros((num_samples, dim));
        let mut mode_der = Array2::<f64>::zeros((num_samples, dim));
        for n in 0..num_samples {
            let x = points[[n, k]];
            let mut power = 1.0;
            for e in 0..dim {
                mode[[n, e]] = power;
                if e + 1 < dim {
                    mode_der[[n, e + 1]] = (e + 1) as f64 * power;
                }
                power *= x;
            }
        }
        values.push(mode);
        derivatives.push(mode_der);
    }
    Ok((
        Measurements::from_modes(values)?,
        Measurements::from_modes(derivatives)?,
    ))
}

/// Probabilists' Hermite polynomials, normalized w.r.t. the unnormalized
/// Gaussian weight `exp(-x²/2)`.
pub fn hermite_measures(points: &ArrayView2<f64>, degree: usize) -> BasisResult<Measurements> {
    let dim = degree + 1;
    let root = (2.0 * std::f64::consts::PI).sqrt();
    let mut factors = Vec::with_capacity(dim);
    let mut factorial = 1.0;
    for k in 0..dim {
        if k > 0 {
            factorial *= k as f64;
        }
        factors.push(1.0 / (root * factorial).sqrt());
    }
    per_mode(points, dim, |x, out| {
        let mut prev = 0.0;
        let mut curr = 1.0;
        for (k, v) in out.iter_mut().enumerate() {
            *v = factors[k] * curr;
            let next = x * curr - k as f64 * prev;
            prev = curr;
            curr = next;
        }
    })
}

/// Trigonometric basis `1, sin x, cos x, sin 2x, …` with `dim` functions.
pub fn sine_cosine_measures(points: &ArrayView2<f64>, dim: usize) -> BasisResult<Measurements> {
    if dim == 0 {
        return Err(BasisError::InvalidDegree(
            "trigonometric basis needs at least one function".to_string(),
        ));
    }
    per_mode(points, dim, |x, out| {
        out[0] = 1.0;
        for (i, v) in out.iter_mut().enumerate().skip(1) {
            let freq = ((i + 1) / 2) as f64;
            *v = if i % 2 == 1 {
                (freq * x).sin()
            } else {
                (freq * x).cos()
            };
        }
    })
}
