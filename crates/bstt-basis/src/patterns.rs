//! Sparsity patterns for polynomial tensor trains.
//!
//! With a basis whose `e`-th function has degree `e`, a rank index can carry
//! the degree of the partial product built so far. A block `(l, e, r)` with
//! `r = l + e` then adds degree `e` in the current variable. The patterns
//! below enumerate such blocks:
//!
//! - [`polynomial_pattern`] - all polynomials up to a total degree
//! - [`homogeneous_polynomial_pattern`] - exactly one total degree, one rank
//!   index per degree
//! - [`grouped_homogeneous_polynomial_pattern`] - exactly one total degree,
//!   with a *group* of rank indices per degree whose size is bounded by
//!   [`group_size`]
//! - [`homogeneous_polynomial_sum_pattern`] - like the grouped pattern, plus
//!   an extra mode selecting the degree, so one train holds all degrees
//! - [`homogeneous_polynomial_sum_system_pattern`] - the sum pattern with
//!   several slots per input core, for coupled systems
//! - [`full_pattern`] / [`full_system_pattern`] - one dense block per core
//!
//! Every pattern produces a [`Pattern`] that can be instantiated with zeros
//! or random coefficients.

use crate::error::{BasisError, BasisResult};
use bstt_core::{Block, BlockSparseTT, Coupling};
use scirs2_core::ndarray_ext::Array2;
use scirs2_core::random::Rng;

/// Dimensions, ranks, slots and blocks of a block-sparse train.
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    pub dimensions: Vec<usize>,
    /// Inner ranks, one per bond.
    pub ranks: Vec<usize>,
    pub slots: Vec<usize>,
    pub blocks: Vec<Vec<Block>>,
}

impl Pattern {
    fn scalar(dimensions: Vec<usize>, ranks: Vec<usize>, blocks: Vec<Vec<Block>>) -> Self {
        let slots = vec![1; dimensions.len()];
        Self {
            dimensions,
            ranks,
            slots,
            blocks,
        }
    }

    pub fn dofs(&self) -> usize {
        self.blocks.iter().flatten().map(Block::size).sum()
    }

    pub fn zeros(&self) -> BasisResult<BlockSparseTT> {
        Ok(BlockSparseTT::zeros_system(
            &self.dimensions,
            &self.ranks,
            &self.slots,
            self.blocks.clone(),
            Coupling::Scalar,
        )?)
    }

    pub fn random<R: Rng + ?Sized>(&self, rng: &mut R) -> BasisResult<BlockSparseTT> {
        Ok(BlockSparseTT::random(
            &self.dimensions,
            &self.ranks,
            self.blocks.clone(),
            rng,
        )?)
    }

    /// Random train whose equations read the slots given by `selection`.
    pub fn random_system<R: Rng + ?Sized>(
        &self,
        selection: Array2<usize>,
        rng: &mut R,
    ) -> BasisResult<BlockSparseTT> {
        let coupling = Coupling::system(selection, &self.slots)?;
        Ok(BlockSparseTT::random_system(
            &self.dimensions,
            &self.ranks,
            &self.slots,
            self.blocks.clone(),
            coupling,
            rng,
        )?)
    }
}

pub(crate) fn binomial(n: usize, k: usize) -> usize {
    if k > n {
        return 0;
    }
    let k = k.min(n - k);
    let mut acc: u128 = 1;
    for i in 0..k {
        acc = acc * (n - i) as u128 / (i + 1) as u128;
        if acc > usize::MAX as u128 {
            return usize::MAX;
        }
    }
    acc as usize
}

/// Upper bound on the number of linearly independent partial polynomials of
/// degree `degree` after `position + 1` cores, given that `total_degree`
/// must still be reachable with the remaining `remaining` cores.
fn max_size(degree: usize, position: usize, total_degree: usize, remaining: usize) -> usize {
    binomial(position + degree, position).min(binomial(
        remaining + (total_degree - degree),
        remaining,
    ))
}

fn check_order(degrees: &[usize], minimum: usize) -> BasisResult<()> {
    if degrees.len() < minimum {
        return Err(BasisError::InvalidPattern(format!(
            "pattern needs at least {} modes, got {}",
            minimum,
            degrees.len()
        )));
    }
    Ok(())
}

fn check_homogeneous(degrees: &[usize], total_degree: usize) -> BasisResult<()> {
    if let Some(k) = degrees.iter().position(|&d| d < total_degree) {
        return Err(BasisError::InvalidDegree(format!(
            "mode {} has degree {} below the total degree {}",
            k, degrees[k], total_degree
        )));
    }
    Ok(())
}

fn prefix_sums(sizes: &[usize]) -> Vec<usize> {
    let mut slices = Vec::with_capacity(sizes.len() + 1);
    slices.push(0);
    for &size in sizes {
        let last = slices[slices.len() - 1];
        slices.push(last + size);
    }
    slices
}

/// One dense block per core with ranks capped by their theoretical maximum.
pub fn full_pattern(degrees: &[usize], rank: usize) -> BasisResult<Pattern> {
    let slots = vec![1; degrees.len()];
    full_system_pattern(degrees, &slots, rank)
}

/// Dense pattern whose cores carry `slots[k]` slots each.
pub fn full_system_pattern(degrees: &[usize], slots: &[usize], rank: usize) -> BasisResult<Pattern> {
    check_order(degrees, 1)?;
    if slots.len() != degrees.len() {
        return Err(BasisError::ShapeMismatch(format!(
            "{} slot counts for {} modes",
            slots.len(),
            degrees.len()
        )));
    }
    if rank == 0 || slots.contains(&0) {
        return Err(BasisError::InvalidPattern(
            "ranks and slot counts must be positive".to_string(),
        ));
    }
    let order = degrees.len();
    let dimensions: Vec<usize> = degrees.iter().map(|d| d + 1).collect();

    let mut ranks = Vec::with_capacity(order.saturating_sub(1));
    for k in 0..order - 1 {
        let left: usize = dimensions[..=k]
            .iter()
            .fold(1usize, |acc, &d| acc.saturating_mul(d));
        let right: usize = dimensions[k + 1..]
            .iter()
            .fold(1usize, |acc, &d| acc.saturating_mul(d));
        ranks.push(left.min(right).min(rank));
    }

    let mut full = vec![1];
    full.extend(&ranks);
    full.push(1);
    let blocks = (0..order)
        .map(|k| {
            vec![Block::with_slot(
                0..full[k],
                0..dimensions[k],
                0..slots[k],
                0..full[k + 1],
            )]
        })
        .collect();

    Ok(Pattern {
        dimensions,
        ranks,
        slots: slots.to_vec(),
        blocks,
    })
}

/// Polynomials of total degree at most `max_total_degree`.
///
/// Requires `max_total_degree ≥ max(degrees)`.
pub fn polynomial_pattern(degrees: &[usize], max_total_degree: usize) -> BasisResult<Pattern> {
    check_order(degrees, 2)?;
    if let Some(&max) = degrees.iter().max() {
        if max_total_degree < max {
            return Err(BasisError::InvalidDegree(format!(
                "total degree {} is below the largest univariate degree {}",
                max_total_degree, max
            )));
        }
    }
    let order = degrees.len();
    let dimensions: Vec<usize> = degrees.iter().map(|d| d + 1).collect();

    let mut ranks = vec![dimensions[0]];
    let mut blocks = vec![(0..dimensions[0])
        .filter(|&l| l <= max_total_degree)
        .map(|l| Block::new(0, l, l))
        .collect::<Vec<_>>()];
    for m in 1..order - 1 {
        let left = ranks[ranks.len() - 1];
        let mut core = Vec::new();
        for k in 0..left {
            for l in 0..dimensions[m] {
                if k + l <= max_total_degree {
                    core.push(Block::new(k, l, k + l));
                }
            }
        }
        blocks.push(core);
        ranks.push((left - 1 + dimensions[m] - 1).min(max_total_degree) + 1);
    }
    let left = ranks[ranks.len() - 1];
    let mut last = Vec::new();
    for k in 0..left {
        for l in 0..dimensions[order - 1] {
            if k + l <= max_total_degree {
                last.push(Block::new(k, l, 0));
            }
        }
    }
    blocks.push(last);

    Ok(Pattern::scalar(dimensions, ranks, blocks))
}

/// Homogeneous polynomials of degree `total_degree`, one rank index per
/// partial degree.
pub fn homogeneous_polynomial_pattern(degrees: &[usize], total_degree: usize) -> BasisResult<Pattern> {
    check_order(degrees, 2)?;
    check_homogeneous(degrees, total_degree)?;
    let order = degrees.len();
    let dimensions: Vec<usize> = degrees.iter().map(|d| d + 1).collect();
    let ranks = vec![total_degree + 1; order - 1];

    let mut blocks = vec![(0..=total_degree).map(|l| Block::new(0, l, l)).collect()];
    for _ in 1..order - 1 {
        blocks.push(
            (0..=total_degree)
                .flat_map(|k| (0..=total_degree - k).map(move |l| Block::new(k, l, k + l)))
                .collect(),
        );
    }
    blocks.push(
        (0..=total_degree)
            .map(|k| Block::new(k, total_degree - k, 0))
            .collect(),
    );

    Ok(Pattern::scalar(dimensions, ranks, blocks))
}

/// Blocks of a middle core mapping degree groups `l` to `r ≥ l`, each
/// spanning slots `0..slots`.
fn grouped_core(
    total_degree: usize,
    left_sizes: &[usize],
    right_sizes: &[usize],
    slots: usize,
) -> Vec<Block> {
    let left_slices = prefix_sums(left_sizes);
    let right_slices = prefix_sums(right_sizes);
    let mut core = Vec::new();
    for l in 0..=total_degree {
        for r in l..=total_degree {
            core.push(Block::with_slot(
                left_slices[l]..left_slices[l + 1],
                r - l,
                0..slots,
                right_slices[r]..right_slices[r + 1],
            ));
        }
    }
    core
}

/// Homogeneous polynomials of degree `total_degree` with rank groups of at
/// most `max_group_size` indices per partial degree.
pub fn grouped_homogeneous_polynomial_pattern(
    degrees: &[usize],
    total_degree: usize,
    max_group_size: usize,
) -> BasisResult<Pattern> {
    check_order(degrees, 2)?;
    check_homogeneous(degrees, total_degree)?;
    if max_group_size == 0 {
        return Err(BasisError::InvalidPattern(
            "group size must be positive".to_string(),
        ));
    }
    let order = degrees.len();
    let dimensions: Vec<usize> = degrees.iter().map(|d| d + 1).collect();
    let size = |r: usize, k: usize| max_size(r, k, total_degree, order - k - 2).min(max_group_size);

    let mut blocks = vec![(0..=total_degree).map(|l| Block::new(0, l, l)).collect()];
    let mut ranks = Vec::with_capacity(order - 1);
    for k in 1..order - 1 {
        let left_sizes: Vec<usize> = (0..=total_degree).map(|l| size(l, k - 1)).collect();
        let right_sizes: Vec<usize> = (0..=total_degree).map(|r| size(r, k)).collect();
        ranks.push(left_sizes.iter().sum());
        blocks.push(grouped_core(total_degree, &left_sizes, &right_sizes, 1));
    }
    ranks.push(total_degree + 1);
    blocks.push(
        (0..=total_degree)
            .map(|l| Block::new(l, total_degree - l, 0))
            .collect(),
    );

    Ok(Pattern::scalar(dimensions, ranks, blocks))
}

/// Sum of homogeneous polynomials of every degree up to `total_degree`.
///
/// An extra last mode of dimension `total_degree + 1` selects the degree;
/// evaluate with measurements extended by a constant mode of ones
/// ([`Measurements::with_constant_mode`](bstt_core::Measurements::with_constant_mode)).
/// `max_group_sizes` gives the group bound per input mode.
pub fn homogeneous_polynomial_sum_pattern(
    degrees: &[usize],
    total_degree: usize,
    max_group_sizes: &[usize],
) -> BasisResult<Pattern> {
    check_order(degrees, 1)?;
    check_homogeneous(degrees, total_degree)?;
    let order = degrees.len();
    if max_group_sizes.len() != order {
        return Err(BasisError::ShapeMismatch(format!(
            "{} group sizes for {} modes",
            max_group_sizes.len(),
            order
        )));
    }
    if max_group_sizes.contains(&0) {
        return Err(BasisError::InvalidPattern(
            "group sizes must be positive".to_string(),
        ));
    }
    let mut dimensions: Vec<usize> = degrees.iter().map(|d| d + 1).collect();
    dimensions.push(total_degree + 1);
    let size = |r: usize, k: usize| {
        max_size(r, k, total_degree, order - k - 1).min(max_group_sizes[k])
    };

    let mut blocks = vec![(0..=total_degree).map(|l| Block::new(0, l, l)).collect()];
    let mut ranks = Vec::with_capacity(order);
    for k in 1..order {
        let left_sizes: Vec<usize> = (0..=total_degree).map(|l| size(l, k - 1)).collect();
        let right_sizes: Vec<usize> = (0..=total_degree).map(|r| size(r, k)).collect();
        ranks.push(left_sizes.iter().sum());
        blocks.push(grouped_core(total_degree, &left_sizes, &right_sizes, 1));
    }
    ranks.push(total_degree + 1);
    blocks.push((0..=total_degree).map(|d| Block::new(d, d, 0)).collect());

    Ok(Pattern::scalar(dimensions, ranks, blocks))
}

/// Coupled system of sums of homogeneous polynomials up to `total_degree`.
///
/// Core `k` of the input modes carries `interaction_ranges[k]` slots and
/// every block spans all of them; the extra degree mode has a single slot.
/// Groups are bounded by `max_group_size` on every bond.
pub fn homogeneous_polynomial_sum_system_pattern(
    degrees: &[usize],
    interaction_ranges: &[usize],
    total_degree: usize,
    max_group_size: usize,
) -> BasisResult<Pattern> {
    check_order(degrees, 1)?;
    check_homogeneous(degrees, total_degree)?;
    let order = degrees.len();
    if interaction_ranges.len() != order {
        return Err(BasisError::ShapeMismatch(format!(
            "{} interaction ranges for {} modes",
            interaction_ranges.len(),
            order
        )));
    }
    if max_group_size == 0 || interaction_ranges.contains(&0) {
        return Err(BasisError::InvalidPattern(
            "group size and interaction ranges must be positive".to_string(),
        ));
    }
    let mut dimensions: Vec<usize> = degrees.iter().map(|d| d + 1).collect();
    dimensions.push(total_degree + 1);
    let mut slots = interaction_ranges.to_vec();
    slots.push(1);
    let size = |r: usize, k: usize| max_size(r, k, total_degree, order - k - 1).min(max_group_size);

    let mut blocks = vec![(0..=total_degree)
        .map(|l| Block::with_slot(0, l, 0..interaction_ranges[0], l))
        .collect()];
    let mut ranks = Vec::with_capacity(order);
    for k in 1..order {
        let left_sizes: Vec<usize> = (0..=total_degree).map(|l| size(l, k - 1)).collect();
        let right_sizes: Vec<usize> = (0..=total_degree).map(|r| size(r, k)).collect();
        ranks.push(left_sizes.iter().sum());
        blocks.push(grouped_core(
            total_degree,
            &left_sizes,
            &right_sizes,
            interaction_ranges[k],
        ));
    }
    ranks.push(total_degree + 1);
    blocks.push((0..=total_degree).map(|d| Block::new(d, d, 0)).collect());

    Ok(Pattern {
        dimensions,
        ranks,
        slots,
        blocks,
    })
}

/// Largest group size that [`grouped_homogeneous_polynomial_pattern`] can
/// use for the given order and degree; larger bounds change nothing.
pub fn group_size(order: usize, degree: usize) -> usize {
    if order < 3 {
        return 1;
    }
    (1..order - 1)
        .flat_map(|position| {
            (0..=degree).map(move |d| max_size(d, position - 1, degree, order - position - 1))
        })
        .max()
        .unwrap_or(1)
        .max(1)
}

/// Random train with the [`full_pattern`].
pub fn random_full<R: Rng + ?Sized>(degrees: &[usize], rank: usize, rng: &mut R) -> BasisResult<BlockSparseTT> {
    full_pattern(degrees, rank)?.random(rng)
}

/// Random coupled system with the [`full_system_pattern`].
pub fn random_full_system<R: Rng + ?Sized>(
    degrees: &[usize],
    slots: &[usize],
    rank: usize,
    selection: Array2<usize>,
    rng: &mut R,
) -> BasisResult<BlockSparseTT> {
    full_system_pattern(degrees, slots, rank)?.random_system(selection, rng)
}

/// Random train with the [`polynomial_pattern`].
pub fn random_polynomial<R: Rng + ?Sized>(
    degrees: &[usize],
    max_total_degree: usize,
    rng: &mut R,
) -> BasisResult<BlockSparseTT> {
    polynomial_pattern(degrees, max_total_degree)?.random(rng)
}

/// Random train with the [`homogeneous_polynomial_pattern`].
pub fn random_homogeneous_polynomial<R: Rng + ?Sized>(
    degrees: &[usize],
    total_degree: usize,
    rng: &mut R,
) -> BasisResult<BlockSparseTT> {
    homogeneous_polynomial_pattern(degrees, total_degree)?.random(rng)
}

/// Random train with the [`grouped_homogeneous_polynomial_pattern`].
pub fn random_grouped_homogeneous_polynomial<R: Rng + ?Sized>(
    degrees: &[usize],
    total_degree: usize,
    max_group_size: usize,
    rng: &mut R,
) -> BasisResult<BlockSparseTT> {
    grouped_homogeneous_polynomial_pattern(degrees, total_degree, max_group_size)?.random(rng)
}

/// Random train with the [`homogeneous_polynomial_sum_pattern`].
pub fn random_homogeneous_polynomial_sum<R: Rng + ?Sized>(
    degrees: &[usize],
    total_degree: usize,
    max_group_sizes: &[usize],
    rng: &mut R,
) -> BasisResult<BlockSparseTT> {
    homogeneous_polynomial_sum_pattern(degrees, total_degree, max_group_sizes)?.random(rng)
}

/// Random coupled system with the [`homogeneous_polynomial_sum_system_pattern`].
///
/// `selection` has one row per equation and `degrees.len() + 1` columns; the
/// last column reads the single slot of the degree mode and must be 0.
pub fn random_homogeneous_polynomial_sum_system<R: Rng + ?Sized>(
    degrees: &[usize],
    interaction_ranges: &[usize],
    total_degree: usize,
    max_group_size: usize,
    selection: Array2<usize>,
    rng: &mut R,
) -> BasisResult<BlockSparseTT> {
    homogeneous_polynomial_sum_system_pattern(degrees, interaction_ranges, total_degree, max_group_size)?
        .random_system(selection, rng)
}
