//! Power diagram construction by lifting
//!
//! A weighted site `(x, y, w)` is lifted to the 3D point `(x, y, sqrt(C - w))`
//! with lifting constant `C = 4 * max(w)`. For a planar point `p` the squared
//! distance from `(p.x, p.y, 0)` to a lifted site is `|p - s|² + C - w`, so
//! the nearest lifted site is exactly the site minimizing the power distance
//! `|p - s|² - w`. The z = 0 cross-section of the 3D Voronoi diagram of the
//! lifted points is therefore the 2D power diagram of the weighted sites.

mod polygon;

pub use polygon::PowerCell;

use glam::{DVec2, DVec3};
use log::debug;

use crate::error::{Result, TransportError};
use crate::field::Bounds;
use crate::site::WeightedSiteSet;
use crate::spatial::LiftedIndex;

/// Result of a successful point-location query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
    /// Id of the site whose cell contains the point
    pub site: usize,
    /// Query point relative to the owning lifted site
    pub local: DVec3,
}

/// Power diagram snapshot of one weighted site set over one rectangle
///
/// Built fresh for every iteration of the relaxation and transport loops
/// and dropped as soon as its mass table has been computed.
#[derive(Debug, Clone)]
pub struct PowerDiagram {
    sites: WeightedSiteSet,
    bounds: Bounds,
    lifting_constant: f64,
    index: LiftedIndex,
}

impl PowerDiagram {
    /// Build the diagram of `sites` inside `bounds`
    ///
    /// # Errors
    ///
    /// - `InvalidConfig` if the site set is empty
    /// - `SiteOutOfBounds` if a site position is not finite or lies outside `bounds`
    /// - `InvalidWeightConfiguration` if a weight is not finite or exceeds `4 * max(weight)`
    ///
    /// # Example
    ///
    /// ```
    /// use power_transport::*;
    /// use glam::DVec2;
    ///
    /// let sites = WeightedSiteSet::uniform(&[DVec2::new(0.0, 0.0), DVec2::new(3.0, 0.0)], 1.0);
    /// let diagram = PowerDiagram::build(&sites, Bounds::new(4.0, 1.0)).unwrap();
    /// assert_eq!(diagram.locate(DVec2::new(1.0, 0.0)).unwrap().site, 0);
    /// assert_eq!(diagram.locate(DVec2::new(2.0, 0.0)).unwrap().site, 1);
    /// ```
    pub fn build(sites: &WeightedSiteSet, bounds: Bounds) -> Result<Self> {
        let max_weight = sites.max_weight().ok_or_else(|| {
            TransportError::InvalidConfig("power diagram needs at least one site".to_string())
        })?;

        for site in sites {
            let p = site.position;
            if !p.is_finite() || !bounds.contains(p) {
                return Err(TransportError::SiteOutOfBounds {
                    site: site.id,
                    x: p.x,
                    y: p.y,
                });
            }
        }

        let lifting_constant = 4.0 * max_weight;
        let lifted: Vec<DVec3> = sites
            .iter()
            .map(|site| {
                if !site.weight.is_finite() || site.weight > lifting_constant {
                    return Err(TransportError::InvalidWeightConfiguration {
                        site: site.id,
                        weight: site.weight,
                        lifting_constant,
                    });
                }
                Ok(site.position.extend((lifting_constant - site.weight).sqrt()))
            })
            .collect::<Result<_>>()?;

        debug!(
            "[PowerDiagram] {} sites, lifting constant {:.4}, domain {}x{}x{:.4}",
            sites.len(),
            lifting_constant,
            bounds.width,
            bounds.height,
            lifting_constant.sqrt()
        );

        Ok(Self {
            sites: sites.clone(),
            bounds,
            lifting_constant,
            index: LiftedIndex::new(&lifted),
        })
    }

    /// Locate the power cell containing `point`
    ///
    /// # Errors
    ///
    /// Returns `GeometryQueryFailure` if the point is not finite, lies
    /// outside the bounding rectangle, or the lifted index has no answer.
    pub fn locate(&self, point: DVec2) -> Result<Location> {
        let failure = || TransportError::GeometryQueryFailure {
            x: point.x,
            y: point.y,
        };

        if !point.is_finite() || !self.bounds.contains(point) {
            return Err(failure());
        }

        let query = point.extend(0.0);
        let (site, _) = self.index.nearest(query).ok_or_else(failure)?;
        let lifted = self.index.point(site).ok_or_else(failure)?;

        Ok(Location {
            site,
            local: query - lifted,
        })
    }

    /// Planar polygon of a site's cell, `None` for unknown ids
    pub fn cell_polygon(&self, site_id: usize) -> Option<PowerCell> {
        let site = self.sites.get(site_id)?;
        Some(polygon::clip_cell(site, &self.sites, self.bounds))
    }

    /// Planar polygons of every cell, ordered by site id
    pub fn cell_polygons(&self) -> Vec<PowerCell> {
        self.sites
            .iter()
            .map(|site| polygon::clip_cell(site, &self.sites, self.bounds))
            .collect()
    }

    #[inline]
    pub fn lifting_constant(&self) -> f64 {
        self.lifting_constant
    }

    #[inline]
    pub fn site_count(&self) -> usize {
        self.sites.len()
    }

    #[inline]
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    #[inline]
    pub fn sites(&self) -> &WeightedSiteSet {
        &self.sites
    }

    /// Lifted 3D position of a site
    #[inline]
    pub fn lifted_site(&self, site_id: usize) -> Option<DVec3> {
        self.index.point(site_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn two_sites(weights: [f64; 2]) -> WeightedSiteSet {
        WeightedSiteSet::new(&[DVec2::new(1.0, 1.0), DVec2::new(5.0, 1.0)], &weights)
    }

    #[test]
    fn test_lifting_heights() {
        let diagram = PowerDiagram::build(&two_sites([1.0, 2.0]), Bounds::new(6.0, 2.0)).unwrap();
        assert_relative_eq!(diagram.lifting_constant(), 8.0);
        assert_relative_eq!(diagram.lifted_site(0).unwrap().z, 7.0_f64.sqrt());
        assert_relative_eq!(diagram.lifted_site(1).unwrap().z, 6.0_f64.sqrt());
    }

    #[test]
    fn test_locate_matches_power_distance() {
        let sites = WeightedSiteSet::new(
            &[
                DVec2::new(1.0, 1.0),
                DVec2::new(6.0, 2.0),
                DVec2::new(3.0, 5.0),
                DVec2::new(7.0, 7.0),
            ],
            &[1.0, 4.0, 2.5, 0.5],
        );
        let diagram = PowerDiagram::build(&sites, Bounds::new(8.0, 8.0)).unwrap();

        for y in 0..8 {
            for x in 0..8 {
                let p = DVec2::new(x as f64 + 0.3, y as f64 + 0.7);
                let expected = sites.nearest_by_power(p).unwrap().id;
                assert_eq!(diagram.locate(p).unwrap().site, expected, "point {:?}", p);
            }
        }
    }

    #[test]
    fn test_local_coordinates() {
        let diagram = PowerDiagram::build(&two_sites([1.0, 1.0]), Bounds::new(6.0, 2.0)).unwrap();
        let location = diagram.locate(DVec2::new(2.0, 0.5)).unwrap();
        assert_eq!(location.site, 0);
        assert_relative_eq!(location.local.x, 1.0);
        assert_relative_eq!(location.local.y, -0.5);
        assert_relative_eq!(location.local.z, -(3.0_f64.sqrt()));
    }

    #[test]
    fn test_weight_above_lifting_constant_rejected() {
        // max weight is negative, so 4 * max < max
        let result = PowerDiagram::build(&two_sites([-1.0, -2.0]), Bounds::new(6.0, 2.0));
        assert!(matches!(
            result,
            Err(TransportError::InvalidWeightConfiguration { site: 0, .. })
        ));
    }

    #[test]
    fn test_non_finite_weight_rejected() {
        let result = PowerDiagram::build(&two_sites([1.0, f64::NAN]), Bounds::new(6.0, 2.0));
        assert!(matches!(
            result,
            Err(TransportError::InvalidWeightConfiguration { .. })
        ));
    }

    #[test]
    fn test_empty_and_out_of_bounds_sites_rejected() {
        let empty = PowerDiagram::build(&WeightedSiteSet::default(), Bounds::new(1.0, 1.0));
        assert!(matches!(empty, Err(TransportError::InvalidConfig(_))));

        let outside = PowerDiagram::build(&two_sites([1.0, 1.0]), Bounds::new(4.0, 2.0));
        assert!(matches!(
            outside,
            Err(TransportError::SiteOutOfBounds { site: 1, .. })
        ));
    }

    #[test]
    fn test_locate_outside_domain_fails() {
        let diagram = PowerDiagram::build(&two_sites([1.0, 1.0]), Bounds::new(6.0, 2.0)).unwrap();
        for p in [
            DVec2::new(-0.5, 1.0),
            DVec2::new(1.0, 2.5),
            DVec2::new(f64::NAN, 1.0),
        ] {
            let err = diagram.locate(p).unwrap_err();
            assert!(matches!(err, TransportError::GeometryQueryFailure { .. }));
            assert!(!err.is_fatal());
        }
    }

    #[test]
    fn test_polygons_tile_rectangle() {
        let sites = WeightedSiteSet::new(
            &[
                DVec2::new(1.0, 1.0),
                DVec2::new(4.0, 1.5),
                DVec2::new(2.0, 4.0),
            ],
            &[1.0, 2.0, 0.5],
        );
        let bounds = Bounds::new(5.0, 5.0);
        let diagram = PowerDiagram::build(&sites, bounds).unwrap();

        let total: f64 = diagram.cell_polygons().iter().map(|c| c.area()).sum();
        assert_relative_eq!(total, bounds.area(), epsilon = 1e-9);
        assert!(diagram.cell_polygon(3).is_none());
    }

    #[test]
    fn test_polygon_centroid_is_owned() {
        let sites = WeightedSiteSet::uniform(
            &[DVec2::new(1.0, 1.0), DVec2::new(4.0, 4.0), DVec2::new(4.0, 1.0)],
            1.0,
        );
        let diagram = PowerDiagram::build(&sites, Bounds::new(5.0, 5.0)).unwrap();
        for cell in diagram.cell_polygons() {
            let centroid = cell.centroid().unwrap();
            assert_eq!(diagram.locate(centroid).unwrap().site, cell.site);
        }
    }
}
