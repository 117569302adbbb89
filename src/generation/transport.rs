//! Semi-discrete optimal transport by gradient ascent on site weights
//!
//! Site positions stay fixed. Each iteration rebuilds the power diagram of
//! the current weights over the source field, measures the mass fraction
//! captured by every cell and moves each weight along
//! `target fraction - current fraction`: under-massed cells grow, over-massed
//! cells shrink.

use std::time::Instant;

use glam::DVec2;
use log::{debug, info};

use crate::config::{check_step_size, TransportConfig, WeightPolicy};
use crate::error::{Result, TransportError};
use crate::field::DensityField;
use crate::raster;
use crate::sink::{ConvergenceRecord, ConvergenceSink, FrameSink};
use crate::site::WeightedSiteSet;

/// Allowed drift of `Σ target_fractions` from 1
pub const FRACTION_SUM_TOLERANCE: f64 = 1e-6;

/// Options for the transport solver
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransportOptions {
    /// Gradient step applied to the weights
    pub step_size: f64,
    /// Fixed number of iterations; there is no early exit
    pub iterations: usize,
    /// Render frames every `frame_period` iterations (0 disables)
    pub frame_period: usize,
    /// Interpolation steps per rendering
    pub frame_count: usize,
    /// Projection applied to weights after each step
    pub weight_policy: WeightPolicy,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            step_size: 1.0,
            iterations: 100,
            frame_period: 0,
            frame_count: 10,
            weight_policy: WeightPolicy::Unclamped,
        }
    }
}

impl From<&TransportConfig> for TransportOptions {
    fn from(config: &TransportConfig) -> Self {
        Self {
            step_size: config.step_size,
            iterations: config.transport_iterations,
            frame_period: config.frame_period,
            frame_count: config.frame_count,
            weight_policy: config.weight_policy,
        }
    }
}

/// Final weights and the per-iteration convergence log
#[derive(Debug, Clone, PartialEq)]
pub struct TransportOutcome {
    /// Weights after the last iteration, ordered by site id
    pub weights: Vec<f64>,
    /// One record per iteration
    pub log: Vec<ConvergenceRecord>,
}

impl TransportOutcome {
    /// Mean squared error of the last iteration
    pub fn final_mse(&self) -> Option<f64> {
        self.log.last().map(|r| r.mse)
    }

    /// Weighted site set combining `positions` with the solved weights
    pub fn sites(&self, positions: &[DVec2]) -> WeightedSiteSet {
        WeightedSiteSet::new(positions, &self.weights)
    }
}

/// Ascent direction and mean squared error for one iteration
///
/// `gradient[i] = target[i] - current[i]`, `mse = Σ gradient[i]² / N`.
pub fn fraction_gradient(target: &[f64], current: &[f64]) -> (Vec<f64>, f64) {
    let n = target.len().max(1) as f64;
    let gradient: Vec<f64> = target
        .iter()
        .zip(current.iter())
        .map(|(t, c)| t - c)
        .collect();
    let mse = gradient.iter().map(|g| g * g / n).sum();
    (gradient, mse)
}

/// Solve for weights whose power cells capture `target_fractions` of `source`
///
/// # Arguments
///
/// * `source` - Field whose mass is redistributed
/// * `positions` - Fixed site positions
/// * `initial_weights` - Starting weights, usually uniform
/// * `target_fractions` - Mass fraction each site should capture
/// * `options` - Step size, iteration count, frame schedule and weight policy
/// * `frames` - Receives interpolation frames
/// * `log` - Receives one convergence record per iteration
///
/// # Errors
///
/// Input problems are reported before anything is written to the sinks:
/// - `InvalidConfig` on mismatched lengths, no sites, a step that is not
///   finite and positive, negative or non-finite targets, targets not summing
///   to 1, or frame rendering with a zero frame count
/// - `InvalidDensityField` if the source has no mass
///
/// Diagram or sink errors during the iterations abort the run.
pub fn solve_transport<F, L>(
    source: &DensityField,
    positions: &[DVec2],
    initial_weights: &[f64],
    target_fractions: &[f64],
    options: TransportOptions,
    mut frames: F,
    mut log: L,
) -> Result<TransportOutcome>
where
    F: FrameSink,
    L: ConvergenceSink,
{
    let n = positions.len();
    validate(n, initial_weights, target_fractions, &options)?;
    let total_mass = source.ensure_positive_mass()?;

    let total_start = Instant::now();
    info!(
        "[Transport] Starting: {} sites, {} iterations, step {}",
        n, options.iterations, options.step_size
    );

    let mut weights = initial_weights.to_vec();
    let mut records = Vec::with_capacity(options.iterations);

    for iteration in 0..options.iterations {
        let iter_start = Instant::now();

        let sites = WeightedSiteSet::new(positions, &weights);
        let current = raster::measure(&sites, source, |value| value)?.fractions(total_mass);
        let (gradient, mse) = fraction_gradient(target_fractions, &current);

        for (weight, g) in weights.iter_mut().zip(gradient.iter()) {
            *weight = options.weight_policy.apply(*weight + options.step_size * g);
        }

        let record = ConvergenceRecord { iteration, mse };
        log.record(record)?;
        records.push(record);

        debug!(
            "[Transport] Iter {}: mse={:.6e}, total={:?}",
            iteration, mse, iter_start.elapsed()
        );

        if options.frame_period > 0 && (iteration + 1) % options.frame_period == 0 {
            render_interpolation(source, positions, &weights, iteration, options.frame_count, &mut frames)?;
        }
    }

    info!(
        "[Transport] Finished: {} iterations, final mse={:?}, total={:?}",
        options.iterations,
        records.last().map(|r| r.mse),
        total_start.elapsed()
    );

    Ok(TransportOutcome {
        weights,
        log: records,
    })
}

/// Emit frames `t = 1..frame_count` with weights scaled by `t / frame_count`
///
/// `t → 0` approaches the unweighted diagram, `t = frame_count` is the
/// current transport map. Each frame paints every pixel with the mean
/// source density of its cell.
pub fn render_interpolation<F>(
    source: &DensityField,
    positions: &[DVec2],
    weights: &[f64],
    iteration: usize,
    frame_count: usize,
    frames: &mut F,
) -> Result<()>
where
    F: FrameSink,
{
    let sites = WeightedSiteSet::new(positions, weights);
    for step in 1..frame_count {
        let factor = step as f64 / frame_count as f64;
        let table = raster::measure(&sites.scaled(factor), source, |value| value)?;
        let frame = table.cell_average_field()?;
        frames.emit(iteration, step, &frame)?;
    }
    debug!(
        "[Transport] Iter {}: emitted {} frames",
        iteration,
        frame_count.saturating_sub(1)
    );
    Ok(())
}

fn validate(
    n: usize,
    initial_weights: &[f64],
    target_fractions: &[f64],
    options: &TransportOptions,
) -> Result<()> {
    if n == 0 {
        return Err(TransportError::InvalidConfig(
            "transport needs at least one site".to_string(),
        ));
    }
    if initial_weights.len() != n || target_fractions.len() != n {
        return Err(TransportError::InvalidConfig(format!(
            "expected {} weights and targets, got {} and {}",
            n,
            initial_weights.len(),
            target_fractions.len()
        )));
    }
    check_step_size(options.step_size)?;
    if target_fractions.iter().any(|t| !t.is_finite() || *t < 0.0) {
        return Err(TransportError::InvalidConfig(
            "target fractions must be finite and nonnegative".to_string(),
        ));
    }
    let target_sum: f64 = target_fractions.iter().sum();
    if (target_sum - 1.0).abs() > FRACTION_SUM_TOLERANCE {
        return Err(TransportError::InvalidConfig(format!(
            "target fractions must sum to 1 (got {})",
            target_sum
        )));
    }
    if options.frame_period > 0 && options.frame_count == 0 {
        return Err(TransportError::InvalidConfig(
            "frame count must be positive when frames are rendered".to_string(),
        ));
    }
    Ok(())
}
