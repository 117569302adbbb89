//! Site relaxation and transport solving
//!
//! Relaxes sites on the target field with Lloyd's algorithm, then solves for
//! the weights that make their power cells capture the same mass fractions
//! of the source field.

mod lloyd;
mod sampling;
mod transport;

pub use lloyd::{lloyd_relaxation, relax_sites, LloydOptions, LloydOutput, UNIT_WEIGHT};
pub use sampling::sample_sites;
pub use transport::{
    fraction_gradient, render_interpolation, solve_transport, TransportOptions, TransportOutcome,
    FRACTION_SUM_TOLERANCE,
};

use glam::DVec2;
use log::info;

use crate::config::TransportConfig;
use crate::error::Result;
use crate::field::DensityField;
use crate::sink::{ConvergenceSink, FrameSink};

/// Everything produced by one relaxation + transport run
#[derive(Debug, Clone, PartialEq)]
pub struct TransportRun {
    /// Relaxed site positions, ordered by site id
    pub positions: Vec<DVec2>,
    /// Fraction of the target field's mass assigned to each site
    pub target_fractions: Vec<f64>,
    /// Solved weights and convergence log
    pub outcome: TransportOutcome,
}

/// Run the full pipeline from configuration
///
/// Both fields are validated before any computation or sink output: they
/// must share dimensions and carry positive mass.
///
/// # Example
///
/// ```rust
/// use power_transport::*;
/// use power_transport::generation::generate_transport;
///
/// let source = DensityField::from_fn(16, 16, |x, _| x as f64 / 16.0).unwrap();
/// let target = DensityField::from_fn(16, 16, |_, y| y as f64 / 16.0).unwrap();
/// let config = TransportConfigBuilder::new()
///     .seed(3)
///     .site_count(8)
///     .unwrap()
///     .lloyd_iterations(2)
///     .transport_iterations(5)
///     .build();
///
/// let run = generate_transport(&source, &target, &config, NullSink, NullSink).unwrap();
/// assert_eq!(run.outcome.weights.len(), 8);
/// assert_eq!(run.outcome.log.len(), 5);
/// ```
pub fn generate_transport<F, L>(
    source: &DensityField,
    target: &DensityField,
    config: &TransportConfig,
    frames: F,
    log: L,
) -> Result<TransportRun>
where
    F: FrameSink,
    L: ConvergenceSink,
{
    source.ensure_same_shape(target)?;
    source.ensure_positive_mass()?;
    let target_mass = target.ensure_positive_mass()?;

    info!(
        "[Pipeline] {}x{} fields, {} sites, seed {}",
        source.width(),
        source.height(),
        config.site_count,
        config.seed
    );

    // Step 1: Sites and target masses from the target field
    let lloyd = lloyd_relaxation(
        target,
        config.site_count,
        LloydOptions {
            iterations: config.lloyd_iterations,
            seed: config.seed,
        },
    )?;
    let target_fractions = lloyd.target_fractions(target_mass);

    // Step 2: Weights reproducing those fractions on the source field
    let initial_weights = vec![config.initial_weight; lloyd.positions.len()];
    let outcome = solve_transport(
        source,
        &lloyd.positions,
        &initial_weights,
        &target_fractions,
        TransportOptions::from(config),
        frames,
        log,
    )?;

    Ok(TransportRun {
        positions: lloyd.positions,
        target_fractions,
        outcome,
    })
}
