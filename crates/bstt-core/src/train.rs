//! Block-sparse tensor trains with a movable orthogonality center.
//!
//! A [`BlockSparseTT`] is a chain of cores `C₀, C₁, …, C_{d-1}` where core `k`
//! has shape `(r_{k-1}, n_k, s_k, r_k)` with `r_{-1} = r_{d-1} = 1`, and only
//! the entries inside its [`Block`]s may be non-zero. For scalar trains
//! `s_k = 1` and the represented function is
//!
//! ```text
//! f(x) = Σ C₀[1, :, 0, :]·φ₀(x₀) · C₁[:, :, 0, :]·φ₁(x₁) ⋯ C_{d-1}[:, :, 0, 1]·φ_{d-1}(x_{d-1})
//! ```
//!
//! # Core movement
//!
//! The train keeps a cursor, the *core position*. Moving it one step
//! orthogonalizes the vacated core and pushes the non-orthogonal factor into
//! the neighbour, without changing ranks or the represented function.
//!
//! To keep the block structure intact, the factorization is done per *group*:
//! the rank indices of a bond are partitioned into maximal runs addressed
//! together by the blocks on either side. Construction checks that every
//! block's range on a bond is exactly one group, so a `QR` (or `LQ`) of the
//! rows supported in a group, followed by a `|g| × |g|` update of the
//! neighbour, never writes outside the blocks.
//!
//! # Examples
//!
//! ```rust
//! use bstt_core::{Block, BlockSparseTT, Direction};
//! use scirs2_core::random::{rngs::StdRng, SeedableRng};
//!
//! let blocks = vec![
//!     vec![Block::new(0, 0..2, 0..2)],
//!     vec![Block::new(0..2, 0..2, 0)],
//! ];
//! let mut rng = StdRng::seed_from_u64(7);
//! let mut tt = BlockSparseTT::random(&[2, 2], &[2], blocks, &mut rng).unwrap();
//! assert_eq!(tt.core_position(), 0);
//!
//! tt.move_core(Direction::Right).unwrap();
//! assert_eq!(tt.core_position(), 1);
//! ```

use crate::block::{merge_ranges, Block};
use crate::block_sparse::{validate_blocks, BlockSparseTensor};
use crate::coupling::Coupling;
use crate::error::{TtError, TtResult};
use crate::measurements::Measurements;
use bstt_kernels::{contract_left, orthogonal_factor, orthogonal_factor_rows};
use scirs2_core::ndarray_ext::{s, Array1, Array2, Array3, Array4, ArrayView3, ArrayView4, Axis};
use scirs2_core::random::{Distribution, RandNormal as Normal, Rng};
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

/// Direction of a single core move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Left,
    Right,
}

impl FromStr for Direction {
    type Err = TtError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "left" => Ok(Direction::Left),
            "right" => Ok(Direction::Right),
            other => Err(TtError::InvalidArgument(format!(
                "unknown direction '{}', expected 'left' or 'right'",
                other
            ))),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Left => write!(f, "left"),
            Direction::Right => write!(f, "right"),
        }
    }
}

/// Block-sparse tensor train.
#[derive(Debug, Clone)]
pub struct BlockSparseTT {
    components: Vec<Array4<f64>>,
    blocks: Vec<Vec<Block>>,
    /// Rank groups of every bond, `groups[k]` between cores `k` and `k + 1`.
    groups: Vec<Vec<Range<usize>>>,
    core_position: usize,
    coupling: Coupling,
}

fn full_ranks(order: usize, ranks: &[usize]) -> TtResult<Vec<usize>> {
    if order == 0 {
        return Err(TtError::InvalidRanks(
            "a tensor train needs at least one core".to_string(),
        ));
    }
    if ranks.len() + 1 != order {
        return Err(TtError::InvalidRanks(format!(
            "{} inner ranks given for {} cores",
            ranks.len(),
            order
        )));
    }
    if let Some(k) = ranks.iter().position(|&r| r == 0) {
        return Err(TtError::InvalidRanks(format!("rank {} is zero", k)));
    }
    let mut full = Vec::with_capacity(order + 1);
    full.push(1);
    full.extend_from_slice(ranks);
    full.push(1);
    Ok(full)
}

fn compute_groups(bond: usize, left_core: &[Block], right_core: &[Block]) -> TtResult<Vec<Range<usize>>> {
    let ranges: Vec<Range<usize>> = left_core
        .iter()
        .map(Block::right)
        .chain(right_core.iter().map(Block::left))
        .collect();
    let groups = merge_ranges(ranges.iter().cloned());
    for range in &ranges {
        let group = groups
            .iter()
            .find(|g| g.contains(&range.start))
            .ok_or_else(|| TtError::IncompatibleBlocks {
                bond,
                reason: format!("range {:?} belongs to no group", range),
            })?;
        if group != range {
            return Err(TtError::IncompatibleBlocks {
                bond,
                reason: format!(
                    "range {:?} only partially covers the rank group {:?}",
                    range, group
                ),
            });
        }
    }
    Ok(groups)
}

impl BlockSparseTT {
    /// Build a train from explicit cores.
    ///
    /// The core position is assumed to be 0; the cores are not
    /// orthogonalized. Use [`BlockSparseTT::canonicalize`] if the
    /// orthogonality invariant is needed.
    pub fn new(
        components: Vec<Array4<f64>>,
        blocks: Vec<Vec<Block>>,
        coupling: Coupling,
    ) -> TtResult<Self> {
        let order = components.len();
        if order == 0 {
            return Err(TtError::InvalidRanks(
                "a tensor train needs at least one core".to_string(),
            ));
        }
        if blocks.len() != order {
            return Err(TtError::ShapeMismatch(format!(
                "{} block lists given for {} cores",
                blocks.len(),
                order
            )));
        }
        if components[0].shape()[0] != 1 || components[order - 1].shape()[3] != 1 {
            return Err(TtError::InvalidRanks(
                "boundary ranks must be 1".to_string(),
            ));
        }
        for k in 0..order.saturating_sub(1) {
            let (left, right) = (components[k].shape()[3], components[k + 1].shape()[0]);
            if left != right {
                return Err(TtError::InvalidRanks(format!(
                    "core {} has right rank {} but core {} has left rank {}",
                    k,
                    left,
                    k + 1,
                    right
                )));
            }
        }
        if let Some(k) = components.iter().position(|c| c.shape()[1] == 0 || c.shape()[2] == 0) {
            return Err(TtError::ShapeMismatch(format!(
                "core {} has an empty mode or slot axis",
                k
            )));
        }

        for (k, (core, core_blocks)) in components.iter().zip(&blocks).enumerate() {
            let (a, b, c, d) = core.dim();
            validate_blocks(k, core_blocks, [a, b, c, d])?;
            for (index, &value) in core.indexed_iter() {
                let index = [index.0, index.1, index.2, index.3];
                if value != 0.0 && !core_blocks.iter().any(|blk| blk.contains(index)) {
                    return Err(TtError::CoefficientOutsideBlocks { core: k, index });
                }
            }
        }

        let slots: Vec<usize> = components.iter().map(|c| c.shape()[2]).collect();
        coupling.validate(&slots)?;

        let groups = (0..order - 1)
            .map(|bond| compute_groups(bond, &blocks[bond], &blocks[bond + 1]))
            .collect::<TtResult<Vec<_>>>()?;

        Ok(Self {
            components,
            blocks,
            groups,
            core_position: 0,
            coupling,
        })
    }

    /// Scalar train of zeros with the given mode dimensions and inner ranks.
    pub fn zeros(dimensions: &[usize], ranks: &[usize], blocks: Vec<Vec<Block>>) -> TtResult<Self> {
        let slots = vec![1; dimensions.len()];
        Self::zeros_system(dimensions, ranks, &slots, blocks, Coupling::Scalar)
    }

    /// Train of zeros with explicit slot counts and coupling.
    pub fn zeros_system(
        dimensions: &[usize],
        ranks: &[usize],
        slots: &[usize],
        blocks: Vec<Vec<Block>>,
        coupling: Coupling,
    ) -> TtResult<Self> {
        let full = full_ranks(dimensions.len(), ranks)?;
        if slots.len() != dimensions.len() {
            return Err(TtError::ShapeMismatch(format!(
                "{} slot counts given for {} cores",
                slots.len(),
                dimensions.len()
            )));
        }
        let components = dimensions
            .iter()
            .zip(slots)
            .enumerate()
            .map(|(k, (&n, &s))| Array4::zeros((full[k], n, s, full[k + 1])))
            .collect();
        Self::new(components, blocks, coupling)
    }

    /// Scalar train with standard normal coefficients inside the blocks,
    /// right-canonicalized with its core at position 0.
    pub fn random<R: Rng + ?Sized>(
        dimensions: &[usize],
        ranks: &[usize],
        blocks: Vec<Vec<Block>>,
        rng: &mut R,
    ) -> TtResult<Self> {
        let slots = vec![1; dimensions.len()];
        Self::random_system(dimensions, ranks, &slots, blocks, Coupling::Scalar, rng)
    }

    /// Random train with explicit slot counts and coupling.
    pub fn random_system<R: Rng + ?Sized>(
        dimensions: &[usize],
        ranks: &[usize],
        slots: &[usize],
        blocks: Vec<Vec<Block>>,
        coupling: Coupling,
        rng: &mut R,
    ) -> TtResult<Self> {
        let mut tt = Self::zeros_system(dimensions, ranks, slots, blocks, coupling)?;
        let normal = Normal::new(0.0, 1.0)
            .map_err(|e| TtError::InvalidArgument(format!("normal distribution: {}", e)))?;
        for (core, core_blocks) in tt.components.iter_mut().zip(&tt.blocks) {
            for block in core_blocks {
                for index in block.indices() {
                    core[index] = normal.sample(rng);
                }
            }
        }
        tt.canonicalize(0)?;
        Ok(tt)
    }

    /// Orthogonalize every core around `position` and place the cursor there.
    pub fn canonicalize(&mut self, position: usize) -> TtResult<()> {
        if position >= self.order() {
            return Err(TtError::InvalidArgument(format!(
                "core position {} out of range for order {}",
                position,
                self.order()
            )));
        }
        self.core_position = self.order() - 1;
        while self.core_position > 0 {
            self.move_core(Direction::Left)?;
        }
        while self.core_position < position {
            self.move_core(Direction::Right)?;
        }
        Ok(())
    }

    pub fn order(&self) -> usize {
        self.components.len()
    }

    pub fn dimensions(&self) -> Vec<usize> {
        self.components.iter().map(|c| c.shape()[1]).collect()
    }

    /// Inner ranks `r_0, …, r_{d-2}`.
    pub fn ranks(&self) -> Vec<usize> {
        self.components[..self.order() - 1]
            .iter()
            .map(|c| c.shape()[3])
            .collect()
    }

    /// Slot count of every core.
    pub fn slots(&self) -> Vec<usize> {
        self.components.iter().map(|c| c.shape()[2]).collect()
    }

    pub fn core_position(&self) -> usize {
        self.core_position
    }

    pub fn coupling(&self) -> &Coupling {
        &self.coupling
    }

    pub fn num_equations(&self) -> usize {
        self.coupling.num_equations()
    }

    pub fn components(&self) -> &[Array4<f64>] {
        &self.components
    }

    pub fn component(&self, position: usize) -> ArrayView4<'_, f64> {
        self.components[position].view()
    }

    /// 3-index view `(left, mode, right)` of a core with a single slot.
    pub fn core3(&self, position: usize) -> TtResult<ArrayView3<'_, f64>> {
        let core = &self.components[position];
        if core.shape()[2] != 1 {
            return Err(TtError::InvalidArgument(format!(
                "core {} has {} slots, a 3-index view needs exactly one",
                position,
                core.shape()[2]
            )));
        }
        Ok(core.index_axis(Axis(2), 0))
    }

    pub fn blocks(&self, position: usize) -> &[Block] {
        &self.blocks[position]
    }

    /// Rank groups of the bond between cores `bond` and `bond + 1`.
    pub fn bond_groups(&self, bond: usize) -> &[Range<usize>] {
        &self.groups[bond]
    }

    /// Number of free coefficients over all cores.
    pub fn dofs(&self) -> usize {
        self.blocks
            .iter()
            .flat_map(|core_blocks| core_blocks.iter().map(Block::size))
            .sum()
    }

    /// In-block coefficients of one core, in block order.
    pub fn block_coefficients(&self, position: usize) -> TtResult<BlockSparseTensor> {
        BlockSparseTensor::from_array(
            &self.components[position].view(),
            self.blocks[position].clone(),
        )
    }

    /// Overwrite one core from its in-block coefficients.
    pub fn set_block_coefficients(&mut self, position: usize, coefficients: Array1<f64>) -> TtResult<()> {
        self.check_position(position)?;
        let core = &self.components[position];
        let (a, b, c, d) = core.dim();
        let tensor =
            BlockSparseTensor::new(coefficients, self.blocks[position].clone(), [a, b, c, d])?;
        self.components[position] = tensor.to_array();
        Ok(())
    }

    /// Replace a core by a dense array of the same shape that vanishes outside
    /// the blocks.
    pub fn set_component(&mut self, position: usize, component: Array4<f64>) -> TtResult<()> {
        self.check_position(position)?;
        if component.shape() != self.components[position].shape() {
            return Err(TtError::ShapeMismatch(format!(
                "core {} has shape {:?}, replacement has {:?}",
                position,
                self.components[position].shape(),
                component.shape()
            )));
        }
        for (index, &value) in component.indexed_iter() {
            let index = [index.0, index.1, index.2, index.3];
            if value != 0.0 && !self.blocks[position].iter().any(|b| b.contains(index)) {
                return Err(TtError::CoefficientOutsideBlocks {
                    core: position,
                    index,
                });
            }
        }
        self.components[position] = component;
        Ok(())
    }

    /// Multiply one core by a scalar.
    pub fn scale_component(&mut self, position: usize, factor: f64) -> TtResult<()> {
        self.check_position(position)?;
        self.components[position] *= factor;
        Ok(())
    }

    /// Set the core position without orthogonalizing anything.
    ///
    /// The caller asserts that the orthogonality invariant already holds for
    /// `position` (or does not care, e.g. right before a full canonicalization).
    pub fn assume_core_position(&mut self, position: usize) -> TtResult<()> {
        self.check_position(position)?;
        self.core_position = position;
        Ok(())
    }

    fn check_position(&self, position: usize) -> TtResult<()> {
        if position >= self.order() {
            return Err(TtError::InvalidArgument(format!(
                "core position {} out of range for order {}",
                position,
                self.order()
            )));
        }
        Ok(())
    }

    /// Move the core position one step, keeping the represented function.
    pub fn move_core(&mut self, direction: Direction) -> TtResult<()> {
        match direction {
            Direction::Right => {
                if self.core_position + 1 >= self.order() {
                    return Err(TtError::InvalidArgument(format!(
                        "cannot move right from core {} of {}",
                        self.core_position,
                        self.order()
                    )));
                }
                self.move_right()?;
                self.core_position += 1;
            }
            Direction::Left => {
                if self.core_position == 0 {
                    return Err(TtError::InvalidArgument(
                        "cannot move left from core 0".to_string(),
                    ));
                }
                self.move_left()?;
                self.core_position -= 1;
            }
        }
        tracing::trace!(position = self.core_position, %direction, "moved core");
        Ok(())
    }

    /// Unfolded rows `(l, e, s)` of core `k` whose blocks end in `group`.
    fn row_support(&self, k: usize, group: &Range<usize>) -> Vec<usize> {
        let (_, n, s, _) = self.components[k].dim();
        let mut rows: Vec<usize> = self.blocks[k]
            .iter()
            .filter(|b| &b.right() == group)
            .flat_map(|b| {
                let (mode, slot) = (b.mode(), b.slot());
                b.left().flat_map(move |l| {
                    let slot = slot.clone();
                    mode.clone()
                        .flat_map(move |e| slot.clone().map(move |sl| (l * n + e) * s + sl))
                })
            })
            .collect();
        rows.sort_unstable();
        rows.dedup();
        rows
    }

    /// Unfolded columns `(e, s, r)` of core `k` whose blocks start in `group`.
    fn column_support(&self, k: usize, group: &Range<usize>) -> Vec<usize> {
        let (_, _, s, r) = self.components[k].dim();
        let mut cols: Vec<usize> = self.blocks[k]
            .iter()
            .filter(|b| &b.left() == group)
            .flat_map(|b| {
                let (slot, right) = (b.slot(), b.right());
                b.mode().flat_map(move |e| {
                    let right = right.clone();
                    slot.clone()
                        .flat_map(move |sl| right.clone().map(move |rr| (e * s + sl) * r + rr))
                })
            })
            .collect();
        cols.sort_unstable();
        cols.dedup();
        cols
    }

    fn move_right(&mut self) -> TtResult<()> {
        let k = self.core_position;
        let (l, n, s, r) = self.components[k].dim();
        let (_, n2, s2, r2) = self.components[k + 1].dim();

        let current = unfold(&self.components[k], (l * n * s, r))?;
        let next = unfold(&self.components[k + 1], (r, n2 * s2 * r2))?;
        let mut new_current = Array2::<f64>::zeros((l * n * s, r));
        let mut new_next = next.clone();

        for group in &self.groups[k] {
            let width = group.len();
            let rows = self.row_support(k, group);
            if rows.is_empty() {
                new_next.slice_mut(s![group.clone(), ..]).fill(0.0);
                continue;
            }
            let local = current
                .select(Axis(0), &rows)
                .slice(s![.., group.clone()])
                .to_owned();
            let (q, factor) = orthogonal_factor(&local.view())?;
            let rank = q.ncols();

            for (i, &row) in rows.iter().enumerate() {
                for j in 0..rank {
                    new_current[[row, group.start + j]] = q[[i, j]];
                }
            }
            let mut square = Array2::<f64>::zeros((width, width));
            square.slice_mut(s![..rank, ..]).assign(&factor);
            let updated = square.dot(&next.slice(s![group.clone(), ..]));
            new_next.slice_mut(s![group.clone(), ..]).assign(&updated);
        }

        self.components[k] = fold(new_current, (l, n, s, r))?;
        self.components[k + 1] = fold(new_next, (r, n2, s2, r2))?;
        Ok(())
    }

    fn move_left(&mut self) -> TtResult<()> {
        let k = self.core_position;
        let (l, n, s, r) = self.components[k].dim();
        let (l0, n0, s0, _) = self.components[k - 1].dim();

        let current = unfold(&self.components[k], (l, n * s * r))?;
        let prev = unfold(&self.components[k - 1], (l0 * n0 * s0, l))?;
        let mut new_current = Array2::<f64>::zeros((l, n * s * r));
        let mut new_prev = prev.clone();

        for group in &self.groups[k - 1] {
            let width = group.len();
            let cols = self.column_support(k, group);
            if cols.is_empty() {
                new_prev.slice_mut(s![.., group.clone()]).fill(0.0);
                continue;
            }
            let local = current
                .select(Axis(1), &cols)
                .slice(s![group.clone(), ..])
                .to_owned();
            let (factor, q) = orthogonal_factor_rows(&local.view())?;
            let rank = q.nrows();

            for (j, &col) in cols.iter().enumerate() {
                for i in 0..rank {
                    new_current[[group.start + i, col]] = q[[i, j]];
                }
            }
            let mut square = Array2::<f64>::zeros((width, width));
            square.slice_mut(s![.., ..rank]).assign(&factor);
            let updated = prev.slice(s![.., group.clone()]).dot(&square);
            new_prev.slice_mut(s![.., group.clone()]).assign(&updated);
        }

        self.components[k] = fold(new_current, (l, n, s, r))?;
        self.components[k - 1] = fold(new_prev, (l0, n0, s0, l))?;
        Ok(())
    }

    /// Evaluate every equation at every sample.
    ///
    /// Returns a `(num_samples × num_equations)` matrix.
    pub fn evaluate(&self, measurements: &Measurements) -> TtResult<Array2<f64>> {
        if measurements.dimensions() != self.dimensions() {
            return Err(TtError::ShapeMismatch(format!(
                "measurement dimensions {:?} do not match train dimensions {:?}",
                measurements.dimensions(),
                self.dimensions()
            )));
        }
        let num_samples = measurements.num_samples();
        let equations = self.num_equations();

        let mut stack = Array3::<f64>::ones((num_samples, equations, 1));
        for (k, core) in self.components.iter().enumerate() {
            let meas = vec![measurements.mode(k); equations];
            let slots = self.coupling.slots_for_mode(k);
            stack = contract_left(&core.view(), &meas, &slots, &stack.view())?;
        }
        Ok(stack.index_axis_move(Axis(2), 0))
    }

    /// Evaluate a scalar train, one value per sample.
    pub fn evaluate_scalar(&self, measurements: &Measurements) -> TtResult<Array1<f64>> {
        if !self.coupling.is_scalar() {
            return Err(TtError::InvalidArgument(
                "evaluate_scalar needs a scalar train".to_string(),
            ));
        }
        Ok(self.evaluate(measurements)?.index_axis_move(Axis(1), 0))
    }

    /// Frobenius norm of the full coefficient tensor.
    ///
    /// Exact when the train is canonicalized, since all cores other than the
    /// current one are orthogonal.
    pub fn core_norm(&self) -> f64 {
        self.components[self.core_position]
            .iter()
            .map(|v| v * v)
            .sum::<f64>()
            .sqrt()
    }
}

fn unfold(core: &Array4<f64>, shape: (usize, usize)) -> TtResult<Array2<f64>> {
    Ok(core
        .to_shape(shape)
        .map_err(|e| TtError::ShapeMismatch(format!("failed to unfold core: {}", e)))?
        .to_owned())
}

fn fold(matrix: Array2<f64>, shape: (usize, usize, usize, usize)) -> TtResult<Array4<f64>> {
    Ok(matrix
        .to_shape(shape)
        .map_err(|e| TtError::ShapeMismatch(format!("failed to fold core: {}", e)))?
        .to_owned())
}

impl fmt::Display for BlockSparseTT {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BlockSparseTT(order={}, dimensions={:?}, ranks={:?}, dofs={}, core_position={})",
            self.order(),
            self.dimensions(),
            self.ranks(),
            self.dofs(),
            self.core_position
        )
    }
}
