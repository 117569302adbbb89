//! Rejection sampling of initial sites
//!
//! Sites are drawn from the inverted density `ρ' = 1 - ρ`, so dark regions
//! of the target image receive more sites than bright ones.
//!
//! # Algorithm
//!
//! 1. Normalize `ρ'` by its sum over all pixels
//! 2. Draw a uniform pixel `p` and a uniform `u ∈ [0, 1)`
//! 3. Accept `p` if `u <= ρ'(p) / Σρ'` and `p` was not accepted before
//! 4. Repeat until `count` distinct pixels are accepted

use std::collections::HashSet;

use glam::DVec2;
use log::debug;
use rand::Rng;

use crate::error::{Result, TransportError};
use crate::field::{DensityField, Pixel};

/// Draw `count` distinct pixel positions proportionally to the inverted density
///
/// # Errors
///
/// Returns `SamplingExhaustion` when fewer than `count` pixels have a
/// positive inverted density; the check runs before any draw, so the
/// sampler never spins on an impossible request.
///
/// # Example
///
/// ```rust
/// use power_transport::*;
/// use power_transport::generation::sample_sites;
/// use rand::SeedableRng;
/// use rand_chacha::ChaCha8Rng;
///
/// let field = DensityField::uniform(8, 8, 0.5).unwrap();
/// let mut rng = ChaCha8Rng::seed_from_u64(42);
/// let sites = sample_sites(&field, 10, &mut rng).unwrap();
/// assert_eq!(sites.len(), 10);
/// ```
pub fn sample_sites<R>(field: &DensityField, count: usize, rng: &mut R) -> Result<Vec<DVec2>>
where
    R: Rng + ?Sized,
{
    let inverted = field.inverted();
    let eligible = inverted.values().iter().filter(|&&v| v > 0.0).count();
    if count > eligible {
        return Err(TransportError::SamplingExhaustion {
            requested: count,
            eligible,
        });
    }

    let normalization = inverted.total_mass();
    let mut accepted: HashSet<Pixel> = HashSet::with_capacity(count);
    let mut positions = Vec::with_capacity(count);
    let mut draws: u64 = 0;

    while positions.len() < count {
        let pixel = Pixel::new(
            rng.gen_range(0..field.width()),
            rng.gen_range(0..field.height()),
        );
        let u: f64 = rng.gen();
        draws += 1;

        let density = inverted.value(pixel);
        if density > 0.0 && u <= density / normalization && accepted.insert(pixel) {
            positions.push(pixel.position());
        }
    }

    debug!(
        "[Sampling] accepted {} of {} eligible pixels after {} draws",
        count, eligible, draws
    );

    Ok(positions)
}
