//! Per-mode basis evaluations at a batch of samples.

use crate::error::{TtError, TtResult};
use scirs2_core::ndarray_ext::{Array2, Array3, ArrayView2, Axis};

/// Evaluations of the basis functions of every mode at the same samples.
///
/// Mode `k` is a `(num_samples × dim_k)` matrix; all modes share the sample
/// count.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurements {
    modes: Vec<Array2<f64>>,
}

impl Measurements {
    pub fn from_modes(modes: Vec<Array2<f64>>) -> TtResult<Self> {
        let Some(first) = modes.first() else {
            return Err(TtError::ShapeMismatch(
                "measurements need at least one mode".to_string(),
            ));
        };
        let num_samples = first.nrows();
        if let Some(k) = modes.iter().position(|m| m.nrows() != num_samples) {
            return Err(TtError::ShapeMismatch(format!(
                "mode {} has {} samples, mode 0 has {}",
                k,
                modes[k].nrows(),
                num_samples
            )));
        }
        Ok(Self { modes })
    }

    /// Split an `(order, num_samples, dim)` array into its modes.
    pub fn from_array3(array: &Array3<f64>) -> TtResult<Self> {
        Self::from_modes(
            array
                .axis_iter(Axis(0))
                .map(|mode| mode.to_owned())
                .collect(),
        )
    }

    /// Append a mode whose basis functions are all one.
    pub fn with_constant_mode(mut self, dim: usize) -> Self {
        let num_samples = self.num_samples();
        self.modes.push(Array2::ones((num_samples, dim)));
        self
    }

    /// Replace mode `k`, keeping the sample count.
    pub fn with_mode(mut self, k: usize, mode: Array2<f64>) -> TtResult<Self> {
        if k >= self.modes.len() {
            return Err(TtError::InvalidArgument(format!(
                "mode {} out of range for {} modes",
                k,
                self.modes.len()
            )));
        }
        if mode.nrows() != self.num_samples() {
            return Err(TtError::ShapeMismatch(format!(
                "replacement mode has {} samples, expected {}",
                mode.nrows(),
                self.num_samples()
            )));
        }
        self.modes[k] = mode;
        Ok(self)
    }

    pub fn order(&self) -> usize {
        self.modes.len()
    }

    pub fn num_samples(&self) -> usize {
        self.modes[0].nrows()
    }

    pub fn dimensions(&self) -> Vec<usize> {
        self.modes.iter().map(|m| m.ncols()).collect()
    }

    pub fn mode(&self, k: usize) -> ArrayView2<'_, f64> {
        self.modes[k].view()
    }

    pub fn modes(&self) -> &[Array2<f64>] {
        &self.modes
    }
}
