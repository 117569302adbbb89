//! Density-weighted Lloyd relaxation
//!
//! Lloyd relaxation iteratively moves each site to the centroid of its cell,
//! weighted by the inverted density of the target field. Cells come from an
//! unweighted power diagram, i.e. an ordinary Voronoi diagram. The diagram
//! of the last iteration also measures each site's target mass on the
//! uninverted field, before the sites move.

use std::time::Instant;

use glam::DVec2;
use log::{debug, info, warn};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::error::Result;
use crate::field::DensityField;
use crate::diagram::PowerDiagram;
use crate::raster::{self, CellMassTable};
use crate::site::WeightedSiteSet;

use super::sampling::sample_sites;

/// Weight shared by every site of an unweighted diagram
pub const UNIT_WEIGHT: f64 = 1.0;

/// Options for Lloyd's relaxation algorithm
#[derive(Debug, Clone, Copy)]
pub struct LloydOptions {
    /// Number of iterations to run; there is no early termination
    pub iterations: usize,
    /// Seed for the rejection sampler placing the initial sites
    pub seed: u64,
}

impl Default for LloydOptions {
    fn default() -> Self {
        Self {
            iterations: 5,
            seed: 0,
        }
    }
}

/// Relaxed sites and the mass each one captures on the target field
#[derive(Debug, Clone, PartialEq)]
pub struct LloydOutput {
    /// Relaxed positions, ordered by site id
    pub positions: Vec<DVec2>,
    /// Raw mass of each site's cell on the uninverted field
    pub target_masses: Vec<f64>,
}

impl LloydOutput {
    /// Target masses divided by `total_mass`
    pub fn target_fractions(&self, total_mass: f64) -> Vec<f64> {
        self.target_masses.iter().map(|m| m / total_mass).collect()
    }
}

/// Sample `site_count` sites on `field` and relax them
///
/// # Errors
///
/// - `SamplingExhaustion` if the field has too few pixels with positive inverted density
/// - any diagram construction error from the relaxation iterations
pub fn lloyd_relaxation(
    field: &DensityField,
    site_count: usize,
    options: LloydOptions,
) -> Result<LloydOutput> {
    let mut rng = ChaCha8Rng::seed_from_u64(options.seed);
    let positions = sample_sites(field, site_count, &mut rng)?;
    relax_sites(field, positions, options.iterations)
}

/// Apply `iterations` Lloyd steps to the given positions
///
/// # Algorithm
///
/// For each iteration:
/// 1. Build an unweighted power diagram at the current positions
/// 2. Rasterize the inverted density `ρ'` against it
/// 3. On the last iteration, rasterize the uninverted field `ρ` against the
///    same diagram to obtain target masses
/// 4. Move each site to `Σ p·ρ'(p) / Σ ρ'(p)` over its pixels
///
/// Sites whose cell has no pixels (or no inverted mass) stay where they are.
/// With zero iterations the target masses come from the diagram of the
/// initial positions.
pub fn relax_sites(
    field: &DensityField,
    mut positions: Vec<DVec2>,
    iterations: usize,
) -> Result<LloydOutput> {
    let total_start = Instant::now();

    info!(
        "[Lloyd] Starting: {} sites, {} iterations, {}x{} field",
        positions.len(),
        iterations,
        field.width(),
        field.height()
    );

    let mut target_masses = None;

    for iteration in 0..iterations {
        let iter_start = Instant::now();

        let sites = WeightedSiteSet::uniform(&positions, UNIT_WEIGHT);
        let diagram = PowerDiagram::build(&sites, field.bounds())?;
        let table = raster::rasterize_with(&diagram, field, DensityField::invert);

        if iteration + 1 == iterations {
            target_masses = Some(raster::rasterize(&diagram, field).masses().to_vec());
        }

        let (new_positions, max_displacement, degenerate) = weighted_centroids(&positions, &table, field);
        positions = new_positions;

        if degenerate > 0 {
            warn!(
                "[Lloyd] Iter {}: {} sites kept their position (empty cell)",
                iteration + 1,
                degenerate
            );
        }
        debug!(
            "[Lloyd] Iter {}: max_disp={:.4}, total={:?}",
            iteration + 1,
            max_displacement,
            iter_start.elapsed()
        );
    }

    let target_masses = match target_masses {
        Some(masses) => masses,
        None => {
            let sites = WeightedSiteSet::uniform(&positions, UNIT_WEIGHT);
            raster::measure(&sites, field, |value| value)?.masses().to_vec()
        }
    };

    info!(
        "[Lloyd] Finished: {} iterations, total={:?}",
        iterations,
        total_start.elapsed()
    );

    Ok(LloydOutput {
        positions,
        target_masses,
    })
}

/// Compute inverted-density centroids, the largest move and the number of degenerate cells
fn weighted_centroids(
    positions: &[DVec2],
    table: &CellMassTable,
    field: &DensityField,
) -> (Vec<DVec2>, f64, usize) {
    let mut max_displacement: f64 = 0.0;
    let mut degenerate = 0;

    let new_positions = positions
        .iter()
        .enumerate()
        .map(|(site, &old)| {
            let (weighted_sum, mass) = table.members(site).iter().fold(
                (DVec2::ZERO, 0.0),
                |(sum, mass), pixel| {
                    let density = DensityField::invert(field.value(*pixel));
                    (sum + pixel.position() * density, mass + density)
                },
            );

            if mass <= 0.0 {
                degenerate += 1;
                return old;
            }

            let centroid = weighted_sum / mass;
            max_displacement = max_displacement.max(centroid.distance(old));
            centroid
        })
        .collect();

    (new_positions, max_displacement, degenerate)
}
