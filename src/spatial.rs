//! Spatial indexing for lifted point location
//!
//! Weighted 2D sites are lifted to 3D points; locating the power cell of a
//! planar point is then a plain nearest-neighbour query from `(x, y, 0)`.
//! With the `spatial-index` feature the query runs on a KD-tree, otherwise
//! it falls back to an exhaustive scan with identical results.

use glam::DVec3;

#[cfg(feature = "spatial-index")]
use kiddo::immutable::float::kdtree::ImmutableKdTree;
#[cfg(feature = "spatial-index")]
use kiddo::SquaredEuclidean;

/// Nearest-neighbour index over lifted sites
///
/// # Performance
///
/// - Construction: O(n log n) with `spatial-index`, O(n) otherwise
/// - Query: O(log n) with `spatial-index`, O(n) otherwise
#[derive(Clone)]
pub struct LiftedIndex {
    points: Vec<DVec3>,
    #[cfg(feature = "spatial-index")]
    tree: Option<ImmutableKdTree<f64, usize, 3, 32>>,
}

impl LiftedIndex {
    /// Build the index from lifted site positions
    ///
    /// Item ids are the slice indices, i.e. the site ids.
    pub fn new(points: &[DVec3]) -> Self {
        #[cfg(feature = "spatial-index")]
        let tree = if points.is_empty() {
            None
        } else {
            let coords: Vec<[f64; 3]> = points.iter().map(|p| [p.x, p.y, p.z]).collect();
            Some(ImmutableKdTree::new_from_slice(&coords))
        };

        Self {
            points: points.to_vec(),
            #[cfg(feature = "spatial-index")]
            tree,
        }
    }

    /// Number of indexed points
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Lifted point with the given id
    #[inline]
    pub fn point(&self, id: usize) -> Option<DVec3> {
        self.points.get(id).copied()
    }

    /// Find the nearest indexed point
    ///
    /// Returns the id and squared Euclidean distance, `None` when the index
    /// is empty.
    #[cfg(feature = "spatial-index")]
    pub fn nearest(&self, query: DVec3) -> Option<(usize, f64)> {
        let tree = self.tree.as_ref()?;
        let result = tree.nearest_one::<SquaredEuclidean>(&[query.x, query.y, query.z]);
        Some((result.item, result.distance))
    }

    /// Find the nearest indexed point
    ///
    /// Returns the id and squared Euclidean distance, `None` when the index
    /// is empty. Ties resolve to the lowest id.
    #[cfg(not(feature = "spatial-index"))]
    pub fn nearest(&self, query: DVec3) -> Option<(usize, f64)> {
        self.points
            .iter()
            .enumerate()
            .map(|(id, p)| (id, p.distance_squared(query)))
            .fold(None, |best, candidate| match best {
                Some((_, d)) if d <= candidate.1 => best,
                _ => Some(candidate),
            })
    }
}

impl std::fmt::Debug for LiftedIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiftedIndex")
            .field("points", &self.points.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nearest_basic() {
        let points = vec![
            DVec3::new(1.0, 0.0, 0.0),
            DVec3::new(0.0, 1.0, 0.0),
            DVec3::new(0.0, 0.0, 1.0),
            DVec3::new(-1.0, 0.0, 0.0),
        ];
        let index = LiftedIndex::new(&points);

        assert_eq!(index.nearest(DVec3::new(0.9, 0.1, 0.0)).unwrap().0, 0);
        assert_eq!(index.nearest(DVec3::new(0.0, 0.95, 0.0)).unwrap().0, 1);
        assert_eq!(index.nearest(DVec3::new(0.0, 0.1, 0.9)).unwrap().0, 2);
        assert_eq!(index.nearest(DVec3::new(-0.8, 0.0, 0.0)).unwrap().0, 3);
    }

    #[test]
    fn test_nearest_reports_squared_distance() {
        let points = vec![DVec3::new(0.0, 0.0, 2.0), DVec3::new(10.0, 0.0, 0.0)];
        let index = LiftedIndex::new(&points);

        let (id, distance) = index.nearest(DVec3::new(1.0, 0.0, 0.0)).unwrap();
        assert_eq!(id, 0);
        assert!((distance - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_many_points_on_one_plane() {
        // Unweighted diagrams lift every site to the same height
        let points: Vec<DVec3> = (0..200)
            .map(|i| DVec3::new((i % 20) as f64, (i / 20) as f64, 1.0))
            .collect();
        let index = LiftedIndex::new(&points);

        for (id, p) in points.iter().enumerate() {
            let query = DVec3::new(p.x + 0.1, p.y - 0.1, 0.0);
            assert_eq!(index.nearest(query).unwrap().0, id);
        }
    }

    #[test]
    fn test_empty_index() {
        let index = LiftedIndex::new(&[]);
        assert!(index.is_empty());
        assert!(index.nearest(DVec3::ZERO).is_none());
    }
}
