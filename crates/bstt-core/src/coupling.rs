//! How the slot axis of each core is read.

use crate::error::{TtError, TtResult};
use scirs2_core::ndarray_ext::Array2;

/// Coupling between the equations of a train and the slots of its cores.
///
/// A scalar train represents one function; each core has a single slot. A
/// coupled system represents `q` functions that share ranks and blocks:
/// equation `i` reads slot `selection[[i, k]]` of core `k`.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Coupling {
    #[default]
    Scalar,
    System { selection: Array2<usize> },
}

impl Coupling {
    /// Build a system coupling, checking the selection against the slot counts
    /// of every core.
    pub fn system(selection: Array2<usize>, slots: &[usize]) -> TtResult<Self> {
        let coupling = Coupling::System { selection };
        coupling.validate(slots)?;
        Ok(coupling)
    }

    pub fn num_equations(&self) -> usize {
        match self {
            Coupling::Scalar => 1,
            Coupling::System { selection } => selection.nrows(),
        }
    }

    /// Slot of core `mode` read by `equation`.
    pub fn slot(&self, equation: usize, mode: usize) -> usize {
        match self {
            Coupling::Scalar => 0,
            Coupling::System { selection } => selection[[equation, mode]],
        }
    }

    /// Slots of core `mode` for every equation, in equation order.
    pub fn slots_for_mode(&self, mode: usize) -> Vec<usize> {
        (0..self.num_equations())
            .map(|equation| self.slot(equation, mode))
            .collect()
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, Coupling::Scalar)
    }

    pub(crate) fn validate(&self, slots: &[usize]) -> TtResult<()> {
        match self {
            Coupling::Scalar => {
                if let Some(k) = slots.iter().position(|&s| s != 1) {
                    return Err(TtError::InvalidSelection(format!(
                        "scalar train needs one slot per core, core {} has {}",
                        k, slots[k]
                    )));
                }
            }
            Coupling::System { selection } => {
                if selection.nrows() == 0 {
                    return Err(TtError::InvalidSelection(
                        "selection must name at least one equation".to_string(),
                    ));
                }
                if selection.ncols() != slots.len() {
                    return Err(TtError::InvalidSelection(format!(
                        "selection has {} columns for {} cores",
                        selection.ncols(),
                        slots.len()
                    )));
                }
                for ((equation, mode), &slot) in selection.indexed_iter() {
                    if slot >= slots[mode] {
                        return Err(TtError::InvalidSelection(format!(
                            "equation {} selects slot {} of core {} which has {} slots",
                            equation, slot, mode, slots[mode]
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}
