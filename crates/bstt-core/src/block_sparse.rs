//! Dense cores from block-local coefficients and back.
//!
//! A [`BlockSparseTensor`] stores only the coefficients inside its blocks, in
//! block declaration order and row-major order within each block. This is
//! the coefficient layout of the local least-squares problem, so a solution
//! vector can be scattered straight into a dense core.

use crate::block::Block;
use crate::error::{TtError, TtResult};
use scirs2_core::ndarray_ext::{s, Array1, Array4, ArrayView4};

/// Check a list of blocks against a core shape.
///
/// Blocks must be non-empty, lie inside `shape` and be pairwise disjoint.
/// `core` is only used for error messages.
pub fn validate_blocks(core: usize, blocks: &[Block], shape: [usize; 4]) -> TtResult<()> {
    for (i, block) in blocks.iter().enumerate() {
        if block.is_empty() {
            return Err(TtError::InvalidBlock(format!(
                "{} of core {} has an empty range",
                block, core
            )));
        }
        if !block.fits(shape) {
            return Err(TtError::BlockOutOfBounds {
                core,
                block: i,
                shape,
            });
        }
    }
    for i in 0..blocks.len() {
        for j in (i + 1)..blocks.len() {
            if blocks[i].overlaps(&blocks[j]) {
                return Err(TtError::OverlappingBlocks {
                    core,
                    first: i,
                    second: j,
                });
            }
        }
    }
    Ok(())
}

/// Block-sparse 4-index tensor stored as its in-block coefficients.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockSparseTensor {
    coefficients: Array1<f64>,
    blocks: Vec<Block>,
    shape: [usize; 4],
}

impl BlockSparseTensor {
    /// Wrap a coefficient vector; its length must equal the total block size.
    pub fn new(coefficients: Array1<f64>, blocks: Vec<Block>, shape: [usize; 4]) -> TtResult<Self> {
        validate_blocks(0, &blocks, shape)?;
        let expected: usize = blocks.iter().map(Block::size).sum();
        if coefficients.len() != expected {
            return Err(TtError::ShapeMismatch(format!(
                "{} coefficients given for blocks holding {}",
                coefficients.len(),
                expected
            )));
        }
        Ok(Self {
            coefficients,
            blocks,
            shape,
        })
    }

    /// Gather the in-block entries of a dense array.
    ///
    /// Entries outside the blocks are ignored.
    pub fn from_array(array: &ArrayView4<f64>, blocks: Vec<Block>) -> TtResult<Self> {
        let (a, b, c, d) = array.dim();
        let shape = [a, b, c, d];
        validate_blocks(0, &blocks, shape)?;

        let mut coefficients = Vec::with_capacity(blocks.iter().map(Block::size).sum());
        for block in &blocks {
            let [l, e, sl, r] = block.ranges().clone();
            coefficients.extend(array.slice(s![l, e, sl, r]).iter().copied());
        }
        Ok(Self {
            coefficients: Array1::from(coefficients),
            blocks,
            shape,
        })
    }

    /// Scatter the coefficients into a dense array, zero outside the blocks.
    pub fn to_array(&self) -> Array4<f64> {
        let mut dense = Array4::<f64>::zeros(self.shape);
        let mut offset = 0;
        for block in &self.blocks {
            let size = block.size();
            let [l, e, sl, r] = block.ranges().clone();
            let mut target = dense.slice_mut(s![l, e, sl, r]);
            for (dst, &src) in target
                .iter_mut()
                .zip(self.coefficients.slice(s![offset..offset + size]).iter())
            {
                *dst = src;
            }
            offset += size;
        }
        dense
    }

    pub fn coefficients(&self) -> &Array1<f64> {
        &self.coefficients
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn shape(&self) -> [usize; 4] {
        self.shape
    }

    /// Number of free coefficients.
    pub fn dofs(&self) -> usize {
        self.coefficients.len()
    }
}
