//! Sobolev Gramians of the normalized Legendre basis.
//!
//! [`legendre_gramian`] returns the matrix of `H^k` inner products
//!
//! ```text
//! G[i, j] = Σ_{t=0..k} c^{2t} ∫_{-1}^{1} p_i^{(t)}(s) p_j^{(t)}(s) ds,   c = 2 / (b - a)
//! ```
//!
//! of the basis `p_i = √(2i+1)·P_i` used by
//! [`legendre_measures`](crate::measures::legendre_measures). The factor `c`
//! is the chain-rule factor of the map `[a, b] → [-1, 1]`. Integrals are
//! computed exactly with Gauss–Legendre quadrature.

use crate::error::{BasisError, BasisResult};
use crate::measures::legendre_values;
use scirs2_core::ndarray_ext::Array2;

/// Gauss–Legendre nodes and weights on `[-1, 1]`.
pub fn gauss_legendre(num_nodes: usize) -> (Vec<f64>, Vec<f64>) {
    let mut nodes = Vec::with_capacity(num_nodes);
    let mut weights = Vec::with_capacity(num_nodes);
    let mut p = vec![0.0; num_nodes + 1];
    let mut dp = vec![0.0; num_nodes + 1];
    let n = num_nodes as f64;

    for i in 0..num_nodes {
        let mut x = (std::f64::consts::PI * (i as f64 + 0.75) / (n + 0.5)).cos();
        for _ in 0..100 {
            legendre_values(x, &mut p, &mut dp);
            let step = p[num_nodes] / dp[num_nodes];
            x -= step;
            if step.abs() < 1e-15 {
                break;
            }
        }
        legendre_values(x, &mut p, &mut dp);
        nodes.push(x);
        weights.push(2.0 / ((1.0 - x * x) * dp[num_nodes] * dp[num_nodes]));
    }
    (nodes, weights)
}

/// Monomial coefficients of `√(2i+1)·P_i` for `i < dim`.
fn normalized_legendre_coefficients(dim: usize) -> Vec<Vec<f64>> {
    let mut raw: Vec<Vec<f64>> = Vec::with_capacity(dim);
    for i in 0..dim {
        let coeffs = match i {
            0 => vec![1.0],
            1 => vec![0.0, 1.0],
            _ => {
                let n = (i - 1) as f64;
                let mut next = vec![0.0; i + 1];
                for (power, &c) in raw[i - 1].iter().enumerate() {
                    next[power + 1] += (2.0 * n + 1.0) * c / (n + 1.0);
                }
                for (power, &c) in raw[i - 2].iter().enumerate() {
                    next[power] -= n * c / (n + 1.0);
                }
                next
            }
        };
        raw.push(coeffs);
    }
    raw.into_iter()
        .enumerate()
        .map(|(i, coeffs)| {
            let factor = (2.0 * i as f64 + 1.0).sqrt();
            coeffs.into_iter().map(|c| c * factor).collect()
        })
        .collect()
}

fn differentiate(coeffs: &[f64]) -> Vec<f64> {
    coeffs
        .iter()
        .enumerate()
        .skip(1)
        .map(|(power, &c)| power as f64 * c)
        .collect()
}

fn horner(coeffs: &[f64], x: f64) -> f64 {
    coeffs.iter().rev().fold(0.0, |acc, &c| acc * x + c)
}

/// `H^k` Gramian of the first `dim` normalized Legendre polynomials on `[a, b]`.
///
/// `sobolev_order = 0` gives the `L²([-1, 1])` Gramian `2·I`.
pub fn legendre_gramian(dim: usize, sobolev_order: usize, a: f64, b: f64) -> BasisResult<Array2<f64>> {
    if !(a < b) || !a.is_finite() || !b.is_finite() {
        return Err(BasisError::InvalidInterval { a, b });
    }
    let scale = 2.0 / (b - a);
    let (nodes, weights) = gauss_legendre(dim + 1);

    let mut polys = normalized_legendre_coefficients(dim);
    let mut gram = Array2::<f64>::zeros((dim, dim));
    let mut factor = 1.0;
    for _ in 0..=sobolev_order {
        let values: Vec<Vec<f64>> = polys
            .iter()
            .map(|coeffs| nodes.iter().map(|&x| horner(coeffs, x)).collect())
            .collect();
        for i in 0..dim {
            for j in 0..=i {
                let integral: f64 = weights
                    .iter()
                    .zip(values[i].iter().zip(&values[j]))
                    .map(|(w, (vi, vj))| w * vi * vj)
                    .sum();
                gram[[i, j]] += factor * integral;
                if i != j {
                    gram[[j, i]] += factor * integral;
                }
            }
        }
        polys = polys.iter().map(|c| differentiate(c)).collect();
        factor *= scale * scale;
    }
    Ok(gram)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quadrature_integrates_polynomials() {
        let (nodes, weights) = gauss_legendre(4);
        // ∫ x⁶ dx over [-1, 1] = 2/7, exact for 4 nodes
        let integral: f64 = nodes.iter().zip(&weights).map(|(x, w)| w * x.powi(6)).sum();
        assert!((integral - 2.0 / 7.0).abs() < 1e-13);
        let total: f64 = weights.iter().sum();
        assert!((total - 2.0).abs() < 1e-13);
    }

    #[test]
    fn test_l2_gramian_is_twice_identity() {
        let gram = legendre_gramian(5, 0, -1.0, 1.0).unwrap();
        for i in 0..5 {
            for j in 0..5 {
                let expected = if i == j { 2.0 } else { 0.0 };
                assert!((gram[[i, j]] - expected).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_h1_gramian_first_entries() {
        // p_1 = √3·s, p_1' = √3: H¹ norm = 2 + 3·2 = 8 on [-1, 1]
        let gram = legendre_gramian(3, 1, -1.0, 1.0).unwrap();
        assert!((gram[[0, 0]] - 2.0).abs() < 1e-12);
        assert!((gram[[1, 1]] - 8.0).abs() < 1e-12);
        assert!(gram[[0, 1]].abs() < 1e-12);
    }

    #[test]
    fn test_interval_scales_derivative_terms() {
        // On [0, 4] the chain-rule factor is 1/2, so the derivative term of
        // p_1 shrinks from 6 to 6/4.
        let gram = legendre_gramian(2, 1, 0.0, 4.0).unwrap();
        assert!((gram[[1, 1]] - (2.0 + 1.5)).abs() < 1e-12);
    }

    #[test]
    fn test_gramian_is_symmetric_with_positive_diagonal() {
        let gram = legendre_gramian(6, 2, -1.0, 2.0).unwrap();
        for i in 0..6 {
            assert!(gram[[i, i]] > 0.0);
            for j in 0..6 {
                assert_eq!(gram[[i, j]], gram[[j, i]]);
            }
        }
    }
}
