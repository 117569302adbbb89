//! Mass assignment of a density field onto a power diagram
//!
//! Every pixel is located in the diagram; its (optionally transformed)
//! density is added to the owning site's mass and the pixel joins that
//! site's membership list. Pixels whose location query fails are skipped
//! and counted separately, so that
//! `assigned mass + skipped mass == total mass` always holds.

use glam::DVec3;
use log::{debug, warn};

use crate::diagram::PowerDiagram;
use crate::error::Result;
use crate::field::{DensityField, Pixel};
use crate::site::WeightedSiteSet;

/// Owner of one grid cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelAssignment {
    /// Owning site id, `None` when the location query failed
    pub owner: Option<usize>,
    /// Pixel position relative to the owning lifted site
    pub local: DVec3,
}

/// Per-site mass and membership derived from one diagram and one field
///
/// Recomputed every iteration; never carried across diagram rebuilds.
#[derive(Debug, Clone)]
pub struct CellMassTable {
    width: usize,
    height: usize,
    masses: Vec<f64>,
    members: Vec<Vec<Pixel>>,
    assignments: Vec<PixelAssignment>,
    skipped_mass: f64,
    skipped_pixels: usize,
}

impl CellMassTable {
    /// Accumulated mass of each site, ordered by site id
    #[inline]
    pub fn masses(&self) -> &[f64] {
        &self.masses
    }

    #[inline]
    pub fn mass(&self, site: usize) -> Option<f64> {
        self.masses.get(site).copied()
    }

    /// Pixels owned by a site; empty for unknown ids
    pub fn members(&self, site: usize) -> &[Pixel] {
        self.members.get(site).map(Vec::as_slice).unwrap_or(&[])
    }

    #[inline]
    pub fn site_count(&self) -> usize {
        self.masses.len()
    }

    /// Assignment of the pixel at `(x, y)`
    pub fn assignment(&self, x: usize, y: usize) -> Option<&PixelAssignment> {
        if x < self.width && y < self.height {
            self.assignments.get(y * self.width + x)
        } else {
            None
        }
    }

    /// All assignments, row-major
    #[inline]
    pub fn assignments(&self) -> &[PixelAssignment] {
        &self.assignments
    }

    /// Mass of pixels that could not be located
    #[inline]
    pub fn skipped_mass(&self) -> f64 {
        self.skipped_mass
    }

    #[inline]
    pub fn skipped_pixels(&self) -> usize {
        self.skipped_pixels
    }

    /// Sum of the per-site masses
    pub fn assigned_mass(&self) -> f64 {
        self.masses.iter().sum()
    }

    /// Each site's mass divided by `total`
    pub fn fractions(&self, total: f64) -> Vec<f64> {
        self.masses.iter().map(|m| m / total).collect()
    }

    /// Field where every pixel carries the mean mass of its owning cell
    ///
    /// Skipped pixels and pixels of empty cells are zero. Used to render
    /// interpolation frames.
    pub fn cell_average_field(&self) -> Result<DensityField> {
        let averages: Vec<f64> = self
            .masses
            .iter()
            .zip(self.members.iter())
            .map(|(&mass, members)| {
                if members.is_empty() {
                    0.0
                } else {
                    (mass / members.len() as f64).max(0.0)
                }
            })
            .collect();

        let values = self
            .assignments
            .iter()
            .map(|a| a.owner.map_or(0.0, |site| averages[site]))
            .collect();

        DensityField::new(self.width, self.height, values)
    }
}

/// Rasterize `field` against `diagram` using raw densities
pub fn rasterize(diagram: &PowerDiagram, field: &DensityField) -> CellMassTable {
    rasterize_with(diagram, field, |value| value)
}

/// Rasterize `field` against `diagram`, transforming each density by `weight_fn`
///
/// Location failures never abort the pass: the pixel is skipped, its mass is
/// counted in `skipped_mass` and the occurrence is logged.
pub fn rasterize_with<F>(diagram: &PowerDiagram, field: &DensityField, weight_fn: F) -> CellMassTable
where
    F: Fn(f64) -> f64,
{
    let site_count = diagram.site_count();
    let mut masses = vec![0.0; site_count];
    let mut members: Vec<Vec<Pixel>> = vec![Vec::new(); site_count];
    let mut assignments = Vec::with_capacity(field.len());
    let mut skipped_mass = 0.0;
    let mut skipped_pixels = 0;

    for (pixel, value) in field.pixels() {
        let mass = weight_fn(value);
        match diagram.locate(pixel.position()) {
            Ok(location) => {
                masses[location.site] += mass;
                members[location.site].push(pixel);
                assignments.push(PixelAssignment {
                    owner: Some(location.site),
                    local: location.local,
                });
            }
            Err(err) => {
                debug!("[Raster] skipping pixel ({}, {}): {}", pixel.x, pixel.y, err);
                skipped_mass += mass;
                skipped_pixels += 1;
                assignments.push(PixelAssignment {
                    owner: None,
                    local: DVec3::ZERO,
                });
            }
        }
    }

    if skipped_pixels > 0 {
        warn!(
            "[Raster] {} of {} pixels could not be located (skipped mass {:.6})",
            skipped_pixels,
            field.len(),
            skipped_mass
        );
    }

    CellMassTable {
        width: field.width(),
        height: field.height(),
        masses,
        members,
        assignments,
        skipped_mass,
        skipped_pixels,
    }
}

/// Build the diagram of `sites` over the field's rectangle and rasterize
///
/// The diagram lives only for the duration of this call, so at most one
/// diagram exists at a time in the relaxation and transport loops.
pub fn measure<F>(sites: &WeightedSiteSet, field: &DensityField, weight_fn: F) -> Result<CellMassTable>
where
    F: Fn(f64) -> f64,
{
    let diagram = PowerDiagram::build(sites, field.bounds())?;
    Ok(rasterize_with(&diagram, field, weight_fn))
}
