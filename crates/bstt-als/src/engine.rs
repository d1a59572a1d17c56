//! Alternating least squares over a block-sparse tensor train.
//!
//! The engine borrows a [`BlockSparseTT`] mutably for its whole lifetime and
//! fits it to target values at sample points, one core at a time. For the
//! active core at position `k` it keeps
//!
//! - a *left stack*: the contractions of cores `0..k` with the measurements,
//!   one `(samples, channels, rank)` array per position up to `k`,
//! - a *right stack*: the same for cores `k+1..order`, built from the right,
//! - left and right *Gramian stacks*: `(rank × rank)` contractions of the
//!   fixed cores with the per-mode Gramians.
//!
//! so that `left.len() + right.len() == order + 1` at all times and a move
//! or a local solve only touches one core.
//!
//! # Channels
//!
//! Every sample contributes one least-squares row per *channel*:
//!
//! | targets | channels | channel `c` reads |
//! |---------|----------|-------------------|
//! | plain values | 1 | slot 0, plain measurements |
//! | system values `(samples × q)` | `q` | slot `selection[c, k]` of core `k` |
//! | values and `d` partial derivatives | `1 + d` | derivative measurements at mode `c - 1`, plain elsewhere |
//!
//! # Sweeps
//!
//! A sweep solves and moves right from the current position to the last
//! core, then solves and moves left back to core 0. [`Als::run`] repeats
//! sweeps until one of the [`AlsConfig`] stopping rules fires.

use crate::config::AlsConfig;
use crate::error::{AlsError, AlsResult};
use crate::observer::{
    AlsObserver, InitializedEvent, MicrostepEvent, MoveEvent, SweepEvent, TracingObserver,
};
use crate::report::{SweepReport, Termination};
use bstt_core::{Block, BlockSparseTT, Direction, Measurements};
use bstt_kernels::{
    check_symmetric_psd, contract_left, contract_local, contract_right, gramian_left,
    gramian_norm_squared, gramian_right, min_norm_lstsq_vec,
};
use scirs2_core::ndarray_ext::{Array1, Array2, Array3, ArrayView1, ArrayView2, Axis};

/// Absolute and relative symmetry tolerance for user Gramians.
const GRAMIAN_SYMMETRY_TOLERANCE: f64 = 1e-14;

/// Builder for [`Als`] engines.
///
/// Exactly one of [`values`](Self::values) and
/// [`system_values`](Self::system_values) must be given.
pub struct AlsBuilder<'a, O = TracingObserver> {
    tt: &'a mut BlockSparseTT,
    measurements: &'a Measurements,
    values: Option<Array1<f64>>,
    system_values: Option<Array2<f64>>,
    gradients: Option<(&'a Measurements, Array2<f64>)>,
    gramians: Option<Vec<Array2<f64>>>,
    config: AlsConfig,
    observer: O,
}

impl<'a, O: AlsObserver> AlsBuilder<'a, O> {
    /// One target value per sample.
    pub fn values(mut self, values: &ArrayView1<f64>) -> Self {
        self.values = Some(values.to_owned());
        self
    }

    /// `(samples × equations)` targets for a coupled system.
    pub fn system_values(mut self, values: &ArrayView2<f64>) -> Self {
        self.system_values = Some(values.to_owned());
        self
    }

    /// Fit partial derivatives as well.
    ///
    /// `derivatives` holds the derivative of every basis function, mode by
    /// mode; column `p` of `gradients` is `∂f/∂x_p` at every sample. Fewer
    /// columns than modes fit only the leading partial derivatives.
    pub fn gradients(mut self, derivatives: &'a Measurements, gradients: &ArrayView2<f64>) -> Self {
        self.gradients = Some((derivatives, gradients.to_owned()));
        self
    }

    /// Per-mode Gramians for the weighted norm. Defaults to identities.
    pub fn gramians(mut self, gramians: Vec<Array2<f64>>) -> Self {
        self.gramians = Some(gramians);
        self
    }

    pub fn config(mut self, config: AlsConfig) -> Self {
        self.config = config;
        self
    }

    pub fn observer<P: AlsObserver>(self, observer: P) -> AlsBuilder<'a, P> {
        AlsBuilder {
            tt: self.tt,
            measurements: self.measurements,
            values: self.values,
            system_values: self.system_values,
            gradients: self.gradients,
            gramians: self.gramians,
            config: self.config,
            observer,
        }
    }

    /// Validate every input, then move the core to position 0 while
    /// building the stacks.
    ///
    /// The train is only modified once all checks have passed.
    pub fn build(self) -> AlsResult<Als<'a, O>> {
        let AlsBuilder {
            tt,
            measurements,
            values,
            system_values,
            gradients,
            gramians,
            config,
            observer,
        } = self;

        config.validate()?;
        check_measurements(tt, measurements)?;
        let (targets, derivatives) =
            assemble_targets(tt, measurements, values, system_values, gradients)?;
        let gramians = check_gramians(tt, gramians)?;
        let (channel_measurements, channel_slots) =
            channel_layout(tt, measurements, derivatives, targets.ncols());

        Als::initialize(
            tt,
            channel_measurements,
            channel_slots,
            targets,
            gramians,
            config,
            observer,
        )
    }
}

impl<'a> AlsBuilder<'a, TracingObserver> {
    /// Verbosity of the default [`TracingObserver`].
    pub fn verbosity(mut self, verbosity: u8) -> Self {
        self.observer = TracingObserver::new(verbosity);
        self
    }
}

/// ALS engine. See the [module documentation](self).
pub struct Als<'a, O = TracingObserver> {
    tt: &'a mut BlockSparseTT,
    channel_measurements: Vec<Vec<ArrayView2<'a, f64>>>,
    channel_slots: Vec<Vec<usize>>,
    targets: Array2<f64>,
    flat_targets: Array1<f64>,
    target_norm: f64,
    gramians: Vec<Array2<f64>>,
    left_stack: Vec<Array3<f64>>,
    right_stack: Vec<Array3<f64>>,
    left_gramian_stack: Vec<Array2<f64>>,
    right_gramian_stack: Vec<Array2<f64>>,
    config: AlsConfig,
    completed_sweeps: usize,
    observer: O,
}

impl<'a> Als<'a, TracingObserver> {
    /// Engine fitting plain target values with the default configuration.
    pub fn new(
        tt: &'a mut BlockSparseTT,
        measurements: &'a Measurements,
        values: &ArrayView1<f64>,
    ) -> AlsResult<Self> {
        Self::builder(tt, measurements).values(values).build()
    }

    pub fn builder(
        tt: &'a mut BlockSparseTT,
        measurements: &'a Measurements,
    ) -> AlsBuilder<'a, TracingObserver> {
        AlsBuilder {
            tt,
            measurements,
            values: None,
            system_values: None,
            gradients: None,
            gramians: None,
            config: AlsConfig::default(),
            observer: TracingObserver::default(),
        }
    }
}

impl<'a, O: AlsObserver> Als<'a, O> {
    fn initialize(
        tt: &'a mut BlockSparseTT,
        channel_measurements: Vec<Vec<ArrayView2<'a, f64>>>,
        channel_slots: Vec<Vec<usize>>,
        targets: Array2<f64>,
        gramians: Vec<Array2<f64>>,
        config: AlsConfig,
        observer: O,
    ) -> AlsResult<Self> {
        let (num_samples, num_channels) = targets.dim();
        let order = tt.order();
        let flat_targets: Array1<f64> = targets.iter().copied().collect();
        let target_norm = flat_targets.dot(&flat_targets).sqrt();

        tt.assume_core_position(order - 1)?;
        let mut als = Self {
            tt,
            channel_measurements,
            channel_slots,
            targets,
            flat_targets,
            target_norm,
            gramians,
            left_stack: vec![Array3::ones((num_samples, num_channels, 1))],
            right_stack: vec![Array3::ones((num_samples, num_channels, 1))],
            left_gramian_stack: vec![Array2::ones((1, 1))],
            right_gramian_stack: vec![Array2::ones((1, 1))],
            config,
            completed_sweeps: 0,
            observer,
        };

        // Only the right stacks are valid while walking to core 0.
        while als.tt.core_position() > 0 {
            let from = als.tt.core_position();
            als.tt.move_core(Direction::Left)?;
            als.push_right(from)?;
            als.observer.on_move(&MoveEvent {
                from,
                to: from - 1,
                residuals: None,
            });
        }

        let event = InitializedEvent {
            order,
            num_samples,
            num_channels,
            dofs: als.tt.dofs(),
        };
        als.observer.on_initialized(&event);
        Ok(als)
    }

    fn left_top(&self) -> &Array3<f64> {
        &self.left_stack[self.left_stack.len() - 1]
    }

    fn right_top(&self) -> &Array3<f64> {
        &self.right_stack[self.right_stack.len() - 1]
    }

    /// Extend the left stacks by core `core`.
    fn push_left(&mut self, core: usize) -> AlsResult<()> {
        let component = self.tt.component(core);
        let stack = contract_left(
            &component,
            &self.channel_measurements[core],
            &self.channel_slots[core],
            &self.left_top().view(),
        )?;
        let gram = gramian_left(
            &component,
            &self.gramians[core].view(),
            &self.left_gramian_stack[self.left_gramian_stack.len() - 1].view(),
        )?;
        self.left_stack.push(stack);
        self.left_gramian_stack.push(gram);
        Ok(())
    }

    /// Extend the right stacks by core `core`.
    fn push_right(&mut self, core: usize) -> AlsResult<()> {
        let component = self.tt.component(core);
        let stack = contract_right(
            &component,
            &self.channel_measurements[core],
            &self.channel_slots[core],
            &self.right_top().view(),
        )?;
        let gram = gramian_right(
            &component,
            &self.gramians[core].view(),
            &self.right_gramian_stack[self.right_gramian_stack.len() - 1].view(),
        )?;
        self.right_stack.push(stack);
        self.right_gramian_stack.push(gram);
        Ok(())
    }

    /// Move the core one step and update the stacks.
    ///
    /// Moving past either end of the train is an invalid argument and leaves
    /// everything unchanged.
    pub fn move_core(&mut self, direction: Direction) -> AlsResult<()> {
        let order = self.tt.order();
        let from = self.tt.core_position();
        let to = match direction {
            Direction::Left if from > 0 => from - 1,
            Direction::Right if from + 1 < order => from + 1,
            _ => {
                return Err(AlsError::InvalidArgument(format!(
                    "cannot move {} from core {} of a train of order {}",
                    direction, from, order
                )))
            }
        };
        debug_assert_eq!(self.left_stack.len() + self.right_stack.len(), order + 1);
        debug_assert_eq!(
            self.left_gramian_stack.len() + self.right_gramian_stack.len(),
            order + 1
        );

        let before = if self.observer.wants_step_residuals() {
            Some(self.residual()?)
        } else {
            None
        };

        self.tt.move_core(direction)?;
        match direction {
            Direction::Left => {
                self.left_stack.pop();
                self.left_gramian_stack.pop();
                self.push_right(from)?;
            }
            Direction::Right => {
                self.right_stack.pop();
                self.right_gramian_stack.pop();
                self.push_left(from)?;
            }
        }

        let residuals = match before {
            Some(before) => Some((before, self.residual()?)),
            None => None,
        };
        self.observer.on_move(&MoveEvent { from, to, residuals });
        Ok(())
    }

    /// Local least-squares operator of the active core.
    ///
    /// Row `n * channels + c` belongs to sample `n` and channel `c`; columns
    /// follow the free coefficients block by block, each block in row-major
    /// `(left, mode, slot, right)` order.
    fn local_operator(&self, position: usize) -> Array2<f64> {
        let left = self.left_top();
        let right = self.right_top();
        let (num_samples, num_channels, _) = left.dim();
        let measurements = &self.channel_measurements[position];
        let slots = &self.channel_slots[position];
        let blocks = self.tt.blocks(position);
        let dofs: usize = blocks.iter().map(Block::size).sum();

        let mut op = Array2::<f64>::zeros((num_samples * num_channels, dofs));
        let mut column = 0;
        for block in blocks {
            for [l, e, s, r] in block.indices() {
                for (c, meas) in measurements.iter().enumerate() {
                    if slots[c] != s {
                        continue;
                    }
                    for n in 0..num_samples {
                        op[[n * num_channels + c, column]] =
                            left[[n, c, l]] * meas[[n, e]] * right[[n, c, r]];
                    }
                }
                column += 1;
            }
        }
        op
    }

    /// Refit the active core by minimum-norm least squares.
    ///
    /// Underdetermined and rank-deficient local problems are not errors;
    /// the pseudo-inverse solution is used. A core without free
    /// coefficients is left as it is.
    pub fn microstep(&mut self) -> AlsResult<()> {
        let position = self.tt.core_position();
        let before = if self.observer.wants_step_residuals() {
            Some(self.residual()?)
        } else {
            None
        };

        let op = self.local_operator(position);
        let dofs = op.ncols();
        if dofs > 0 {
            let coefficients = min_norm_lstsq_vec(&op.view(), &self.flat_targets.view())?;
            self.tt.set_block_coefficients(position, coefficients)?;
        }

        let residuals = match before {
            Some(before) => Some((before, self.residual()?)),
            None => None,
        };
        self.observer.on_microstep(&MicrostepEvent {
            position,
            dofs,
            residuals,
        });
        Ok(())
    }

    /// Predictions of the train at every sample and channel, `(samples ×
    /// channels)`, computed from the active core and the stacks.
    pub fn prediction(&self) -> AlsResult<Array2<f64>> {
        let position = self.tt.core_position();
        Ok(contract_local(
            &self.tt.component(position),
            &self.channel_measurements[position],
            &self.channel_slots[position],
            &self.left_top().view(),
            &self.right_top().view(),
        )?)
    }

    /// `‖prediction − targets‖ / ‖targets‖`, or the absolute error when the
    /// targets vanish.
    pub fn residual(&self) -> AlsResult<f64> {
        let prediction = self.prediction()?;
        let error = (&prediction - &self.targets)
            .iter()
            .map(|v| v * v)
            .sum::<f64>()
            .sqrt();
        if self.target_norm > 0.0 {
            Ok(error / self.target_norm)
        } else {
            Ok(error)
        }
    }

    /// Norm of the represented function in the product of the per-mode
    /// Gramian inner products.
    pub fn gramian_norm(&self) -> AlsResult<f64> {
        let position = self.tt.core_position();
        let squared = gramian_norm_squared(
            &self.tt.component(position),
            &self.gramians[position].view(),
            &self.left_gramian_stack[self.left_gramian_stack.len() - 1].view(),
            &self.right_gramian_stack[self.right_gramian_stack.len() - 1].view(),
        )?;
        Ok(squared.max(0.0).sqrt())
    }

    /// One right pass and one left pass, returning the residual afterwards.
    ///
    /// A train of order one is solved by a single microstep.
    pub fn sweep(&mut self) -> AlsResult<f64> {
        let order = self.tt.order();
        if order == 1 {
            self.microstep()?;
        } else {
            while self.tt.core_position() < order - 1 {
                self.microstep()?;
                self.move_core(Direction::Right)?;
            }
            while self.tt.core_position() > 0 {
                self.microstep()?;
                self.move_core(Direction::Left)?;
            }
        }

        let residual = self.residual()?;
        let event = SweepEvent {
            sweep: self.completed_sweeps,
            residual,
            gramian_norm: self.gramian_norm()?,
        };
        self.completed_sweeps += 1;
        self.observer.on_sweep(&event);
        Ok(residual)
    }

    /// Sweep until a stopping rule fires.
    ///
    /// After every sweep the first matching rule wins: residual below
    /// target, residual increased, decrease below `min_decrease` times the
    /// residual, sweep budget exhausted. Not converging is reported through
    /// [`Termination`], not as an error.
    pub fn run(&mut self) -> AlsResult<SweepReport> {
        let initial_residual = self.residual()?;
        let mut previous = initial_residual;
        let mut sweeps = 0;

        let (termination, final_residual) = loop {
            let residual = self.sweep()?;
            sweeps += 1;
            if let Some(termination) = decide(previous, residual, sweeps, &self.config) {
                break (termination, residual);
            }
            previous = residual;
        };

        let report = SweepReport {
            sweeps,
            initial_residual,
            final_residual,
            termination,
        };
        self.observer.on_terminated(&report);
        Ok(report)
    }

    pub fn config(&self) -> &AlsConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: AlsConfig) -> AlsResult<()> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    pub fn train(&self) -> &BlockSparseTT {
        self.tt
    }

    pub fn core_position(&self) -> usize {
        self.tt.core_position()
    }

    pub fn num_samples(&self) -> usize {
        self.targets.nrows()
    }

    pub fn num_channels(&self) -> usize {
        self.targets.ncols()
    }

    /// `(samples × channels)` right-hand sides.
    pub fn targets(&self) -> &Array2<f64> {
        &self.targets
    }

    pub fn left_stack(&self) -> &[Array3<f64>] {
        &self.left_stack
    }

    pub fn right_stack(&self) -> &[Array3<f64>] {
        &self.right_stack
    }

    pub fn left_gramian_stack(&self) -> &[Array2<f64>] {
        &self.left_gramian_stack
    }

    pub fn right_gramian_stack(&self) -> &[Array2<f64>] {
        &self.right_gramian_stack
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }

    /// Release the train and return the observer.
    pub fn into_observer(self) -> O {
        self.observer
    }
}

fn check_measurements(tt: &BlockSparseTT, measurements: &Measurements) -> AlsResult<()> {
    if measurements.order() != tt.order() {
        return Err(AlsError::ShapeMismatch(format!(
            "{} measurement modes for a train of order {}",
            measurements.order(),
            tt.order()
        )));
    }
    if measurements.dimensions() != tt.dimensions() {
        return Err(AlsError::ShapeMismatch(format!(
            "measurement dimensions {:?} do not match train dimensions {:?}",
            measurements.dimensions(),
            tt.dimensions()
        )));
    }
    if measurements.num_samples() == 0 {
        return Err(AlsError::ShapeMismatch(
            "measurements need at least one sample".to_string(),
        ));
    }
    Ok(())
}

/// Collect the right-hand sides as a `(samples × channels)` matrix.
fn assemble_targets<'a>(
    tt: &BlockSparseTT,
    measurements: &Measurements,
    values: Option<Array1<f64>>,
    system_values: Option<Array2<f64>>,
    gradients: Option<(&'a Measurements, Array2<f64>)>,
) -> AlsResult<(Array2<f64>, Option<&'a Measurements>)> {
    let num_samples = measurements.num_samples();
    let num_equations = tt.num_equations();

    match (values, system_values) {
        (Some(_), Some(_)) => Err(AlsError::InvalidArgument(
            "give either plain or system values, not both".to_string(),
        )),
        (None, None) => Err(AlsError::InvalidArgument(
            "no target values given".to_string(),
        )),
        (None, Some(system)) => {
            if gradients.is_some() {
                return Err(AlsError::InvalidGradients(
                    "gradients can only be fitted together with plain values".to_string(),
                ));
            }
            if system.dim() != (num_samples, num_equations) {
                return Err(AlsError::ShapeMismatch(format!(
                    "system values have shape {:?}, expected ({}, {})",
                    system.dim(),
                    num_samples,
                    num_equations
                )));
            }
            Ok((system, None))
        }
        (Some(values), None) => {
            if values.len() != num_samples {
                return Err(AlsError::ShapeMismatch(format!(
                    "{} values for {} samples",
                    values.len(),
                    num_samples
                )));
            }
            if num_equations != 1 {
                return Err(AlsError::ShapeMismatch(format!(
                    "the train couples {} equations; give system values",
                    num_equations
                )));
            }
            let Some((derivatives, gradients)) = gradients else {
                return Ok((values.insert_axis(Axis(1)), None));
            };

            if !tt.coupling().is_scalar() {
                return Err(AlsError::InvalidGradients(
                    "gradients need a scalar train".to_string(),
                ));
            }
            if derivatives.dimensions() != measurements.dimensions()
                || derivatives.num_samples() != num_samples
            {
                return Err(AlsError::InvalidGradients(format!(
                    "derivative measurements have {} samples and dimensions {:?}, expected {} and {:?}",
                    derivatives.num_samples(),
                    derivatives.dimensions(),
                    num_samples,
                    measurements.dimensions()
                )));
            }
            let (rows, num_partials) = gradients.dim();
            if rows != num_samples || num_partials > tt.order() {
                return Err(AlsError::InvalidGradients(format!(
                    "gradients have shape ({}, {}), expected {} rows and at most {} columns",
                    rows,
                    num_partials,
                    num_samples,
                    tt.order()
                )));
            }

            let mut targets = Array2::<f64>::zeros((num_samples, 1 + num_partials));
            targets.column_mut(0).assign(&values);
            for p in 0..num_partials {
                targets.column_mut(1 + p).assign(&gradients.column(p));
            }
            Ok((targets, Some(derivatives)))
        }
    }
}

fn check_gramians(
    tt: &BlockSparseTT,
    gramians: Option<Vec<Array2<f64>>>,
) -> AlsResult<Vec<Array2<f64>>> {
    let dimensions = tt.dimensions();
    let Some(gramians) = gramians else {
        return Ok(dimensions.iter().map(|&d| Array2::eye(d)).collect());
    };

    if gramians.len() != dimensions.len() {
        return Err(AlsError::ShapeMismatch(format!(
            "{} Gramians for a train of order {}",
            gramians.len(),
            dimensions.len()
        )));
    }
    for (mode, (gram, &dim)) in gramians.iter().zip(&dimensions).enumerate() {
        if gram.dim() != (dim, dim) {
            return Err(AlsError::ShapeMismatch(format!(
                "Gramian {} has shape {:?}, expected ({}, {})",
                mode,
                gram.dim(),
                dim,
                dim
            )));
        }
        check_symmetric_psd(
            &gram.view(),
            GRAMIAN_SYMMETRY_TOLERANCE,
            GRAMIAN_SYMMETRY_TOLERANCE,
        )
        .map_err(|source| AlsError::InvalidGramian { mode, source })?;
    }
    Ok(gramians)
}

/// Measurement matrix and slot of every channel, per mode.
type ChannelLayout<'a> = (Vec<Vec<ArrayView2<'a, f64>>>, Vec<Vec<usize>>);

fn channel_layout<'a>(
    tt: &BlockSparseTT,
    measurements: &'a Measurements,
    derivatives: Option<&'a Measurements>,
    num_channels: usize,
) -> ChannelLayout<'a> {
    let order = tt.order();
    match derivatives {
        Some(derivatives) => {
            let channel_measurements = (0..order)
                .map(|k| {
                    (0..num_channels)
                        .map(|c| {
                            if c == k + 1 {
                                derivatives.mode(k)
                            } else {
                                measurements.mode(k)
                            }
                        })
                        .collect()
                })
                .collect();
            (channel_measurements, vec![vec![0; num_channels]; order])
        }
        None => {
            let channel_measurements = (0..order)
                .map(|k| vec![measurements.mode(k); num_channels])
                .collect();
            let channel_slots = (0..order)
                .map(|k| tt.coupling().slots_for_mode(k))
                .collect();
            (channel_measurements, channel_slots)
        }
    }
}

/// Stopping rule applied after sweep number `sweeps`, given the residual
/// before and after it.
///
/// The first rule that holds wins: residual below target, residual
/// increased, decrease below `min_decrease` times the residual, sweep
/// budget exhausted. `None` means keep sweeping.
pub(crate) fn decide(
    previous: f64,
    residual: f64,
    sweeps: usize,
    config: &AlsConfig,
) -> Option<Termination> {
    if residual < config.target_residual {
        Some(Termination::Converged)
    } else if residual > previous {
        Some(Termination::Diverged)
    } else if previous - residual < config.min_decrease * residual {
        Some(Termination::Stalled)
    } else if sweeps >= config.max_sweeps {
        Some(Termination::MaxSweeps)
    } else {
        None
    }
}
