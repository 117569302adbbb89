//! Weighted sites
//!
//! A site is a 2D point carrying a scalar weight. Sites are kept in an ordered
//! set whose index is the site id; diagrams, mass tables and solvers all refer
//! to sites by that id.

use glam::DVec2;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A single weighted site
///
/// In a power diagram, a point `p` belongs to the site minimizing
/// `|p - position|² - weight`. A larger weight grows the site's cell.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Site {
    /// Identifier, equal to the index in the owning set
    pub id: usize,
    /// Planar position
    pub position: DVec2,
    /// Power weight
    pub weight: f64,
}

impl Site {
    pub fn new(id: usize, position: DVec2, weight: f64) -> Self {
        Self {
            id,
            position,
            weight,
        }
    }

    /// Power distance `|p - position|² - weight`
    #[inline]
    pub fn power(&self, point: DVec2) -> f64 {
        self.position.distance_squared(point) - self.weight
    }
}

/// Ordered collection of weighted sites (order = site id)
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeightedSiteSet {
    sites: Vec<Site>,
}

impl WeightedSiteSet {
    /// Create a set from positions and weights of equal length
    ///
    /// Extra entries of the longer slice are ignored.
    pub fn new(positions: &[DVec2], weights: &[f64]) -> Self {
        let sites = positions
            .iter()
            .zip(weights.iter())
            .enumerate()
            .map(|(id, (&position, &weight))| Site::new(id, position, weight))
            .collect();
        Self { sites }
    }

    /// Create a set where every site carries the same weight
    ///
    /// With equal weights the power diagram is the ordinary Voronoi diagram.
    pub fn uniform(positions: &[DVec2], weight: f64) -> Self {
        let sites = positions
            .iter()
            .enumerate()
            .map(|(id, &position)| Site::new(id, position, weight))
            .collect();
        Self { sites }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.sites.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    #[inline]
    pub fn get(&self, id: usize) -> Option<&Site> {
        self.sites.get(id)
    }

    #[inline]
    pub fn sites(&self) -> &[Site] {
        &self.sites
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Site> {
        self.sites.iter()
    }

    pub fn positions(&self) -> Vec<DVec2> {
        self.sites.iter().map(|s| s.position).collect()
    }

    pub fn weights(&self) -> Vec<f64> {
        self.sites.iter().map(|s| s.weight).collect()
    }

    /// Largest weight in the set, `None` when empty
    pub fn max_weight(&self) -> Option<f64> {
        self.sites.iter().map(|s| s.weight).reduce(f64::max)
    }

    /// Copy of this set with every weight multiplied by `factor`
    pub fn scaled(&self, factor: f64) -> WeightedSiteSet {
        let sites = self
            .sites
            .iter()
            .map(|s| Site::new(s.id, s.position, s.weight * factor))
            .collect();
        Self { sites }
    }

    /// Site with the smallest power distance to `point`
    ///
    /// Exhaustive scan; ties resolve to the lowest id.
    pub fn nearest_by_power(&self, point: DVec2) -> Option<&Site> {
        self.sites.iter().fold(None, |best: Option<&Site>, site| match best {
            Some(b) if b.power(point) <= site.power(point) => Some(b),
            _ => Some(site),
        })
    }
}

impl<'a> IntoIterator for &'a WeightedSiteSet {
    type Item = &'a Site;
    type IntoIter = std::slice::Iter<'a, Site>;

    fn into_iter(self) -> Self::IntoIter {
        self.sites.iter()
    }
}
