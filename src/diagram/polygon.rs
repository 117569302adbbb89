//! Planar power cell polygons
//!
//! The cell of site `i` is the intersection of the bounding rectangle with
//! every half-plane `|p - s_i|² - w_i <= |p - s_j|² - w_j`. Each condition is
//! linear in `p`, so the rectangle is clipped edge by edge
//! (Sutherland–Hodgman). This is the exact z = 0 cross-section of the lifted
//! 3D cell, used for visualization only.

use glam::DVec2;

use crate::field::Bounds;
use crate::site::{Site, WeightedSiteSet};

/// Planar cell of one site, clipped to the bounding rectangle
#[derive(Debug, Clone, PartialEq)]
pub struct PowerCell {
    /// Owning site id
    pub site: usize,
    /// Vertices ordered counter-clockwise; empty for an empty cell
    pub vertices: Vec<DVec2>,
}

impl PowerCell {
    /// Check whether the cell has no area
    pub fn is_empty(&self) -> bool {
        self.vertices.len() < 3
    }

    /// Signed area by the shoelace formula (positive for counter-clockwise)
    pub fn area(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        let n = self.vertices.len();
        let twice: f64 = (0..n)
            .map(|i| self.vertices[i].perp_dot(self.vertices[(i + 1) % n]))
            .sum();
        twice * 0.5
    }

    /// Area centroid, `None` for degenerate cells
    pub fn centroid(&self) -> Option<DVec2> {
        let area = self.area();
        if area.abs() <= f64::EPSILON {
            return None;
        }
        let n = self.vertices.len();
        let sum = (0..n).fold(DVec2::ZERO, |acc, i| {
            let a = self.vertices[i];
            let b = self.vertices[(i + 1) % n];
            acc + (a + b) * a.perp_dot(b)
        });
        Some(sum / (6.0 * area))
    }
}

/// Clip the bounding rectangle down to the power cell of `site`
pub(crate) fn clip_cell(site: &Site, sites: &WeightedSiteSet, bounds: Bounds) -> PowerCell {
    let mut vertices: Vec<DVec2> = bounds.corners().to_vec();

    for other in sites.iter().filter(|o| o.id != site.id) {
        // f(p) = 2 p·(s_j - s_i) - (|s_j|² - |s_i|² - w_j + w_i), inside when f <= 0
        let normal = 2.0 * (other.position - site.position);
        let offset = other.position.length_squared() - site.position.length_squared()
            - other.weight
            + site.weight;
        vertices = clip_half_plane(&vertices, |p| normal.dot(p) - offset);
        if vertices.is_empty() {
            break;
        }
    }

    dedup_vertices(&mut vertices);
    if vertices.len() < 3 {
        vertices.clear();
    }

    PowerCell {
        site: site.id,
        vertices,
    }
}

fn clip_half_plane<F>(polygon: &[DVec2], f: F) -> Vec<DVec2>
where
    F: Fn(DVec2) -> f64,
{
    let mut clipped = Vec::with_capacity(polygon.len() + 1);
    let n = polygon.len();

    for i in 0..n {
        let a = polygon[i];
        let b = polygon[(i + 1) % n];
        let fa = f(a);
        let fb = f(b);

        if fa <= 0.0 {
            clipped.push(a);
        }
        if (fa < 0.0 && fb > 0.0) || (fa > 0.0 && fb < 0.0) {
            let t = fa / (fa - fb);
            clipped.push(a + (b - a) * t);
        }
    }

    clipped
}

fn dedup_vertices(vertices: &mut Vec<DVec2>) {
    const TOLERANCE: f64 = 1e-12;
    vertices.dedup_by(|a, b| a.distance_squared(*b) <= TOLERANCE);
    while vertices.len() > 1 {
        let (first, last) = (vertices[0], vertices[vertices.len() - 1]);
        if first.distance_squared(last) <= TOLERANCE {
            vertices.pop();
        } else {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_single_site_owns_rectangle() {
        let sites = WeightedSiteSet::uniform(&[DVec2::new(1.0, 1.0)], 1.0);
        let cell = clip_cell(&sites.sites()[0], &sites, Bounds::new(4.0, 2.0));
        assert_eq!(cell.vertices.len(), 4);
        assert_relative_eq!(cell.area(), 8.0);
        let centroid = cell.centroid().unwrap();
        assert_relative_eq!(centroid.x, 2.0);
        assert_relative_eq!(centroid.y, 1.0);
    }

    #[test]
    fn test_bisector_split() {
        let sites = WeightedSiteSet::uniform(&[DVec2::new(1.0, 1.0), DVec2::new(3.0, 1.0)], 1.0);
        let bounds = Bounds::new(4.0, 2.0);
        let left = clip_cell(&sites.sites()[0], &sites, bounds);
        let right = clip_cell(&sites.sites()[1], &sites, bounds);
        assert_relative_eq!(left.area(), 4.0, epsilon = 1e-9);
        assert_relative_eq!(right.area(), 4.0, epsilon = 1e-9);
        assert!(left.vertices.iter().all(|v| v.x <= 2.0 + 1e-9));
    }

    #[test]
    fn test_weight_shifts_boundary() {
        // Bisector moves to x = 2 + (w0 - w1) / (2 * 2) = 2.5
        let sites = WeightedSiteSet::new(&[DVec2::new(1.0, 1.0), DVec2::new(3.0, 1.0)], &[2.0, 0.0]);
        let bounds = Bounds::new(4.0, 2.0);
        let left = clip_cell(&sites.sites()[0], &sites, bounds);
        assert_relative_eq!(left.area(), 5.0, epsilon = 1e-9);
    }

    #[test]
    fn test_dominated_site_is_empty() {
        let sites = WeightedSiteSet::new(&[DVec2::new(1.0, 1.0), DVec2::new(1.0, 1.0)], &[1.0, 3.0]);
        let cell = clip_cell(&sites.sites()[0], &sites, Bounds::new(2.0, 2.0));
        assert!(cell.is_empty());
        assert_eq!(cell.area(), 0.0);
        assert!(cell.centroid().is_none());
    }
}
