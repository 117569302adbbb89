//! Density fields
//!
//! A density field is an immutable W×H grid of nonnegative reals, usually the
//! luminance of an image. It is treated as an unnormalized mass distribution.
//! Pixel `(x, y)` sits at the planar point `(x, y)` and the field covers the
//! bounding rectangle `[0, W] × [0, H]`.

use glam::DVec2;

use crate::error::{Result, TransportError};

/// Axis-aligned bounding rectangle `[0, width] × [0, height]`
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    /// Create a rectangle anchored at the origin
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Check whether a point lies inside the rectangle (boundary included)
    #[inline]
    pub fn contains(&self, point: DVec2) -> bool {
        point.x >= 0.0 && point.y >= 0.0 && point.x <= self.width && point.y <= self.height
    }

    /// Area of the rectangle
    #[inline]
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Corners in counter-clockwise order, starting at the origin
    pub fn corners(&self) -> [DVec2; 4] {
        [
            DVec2::new(0.0, 0.0),
            DVec2::new(self.width, 0.0),
            DVec2::new(self.width, self.height),
            DVec2::new(0.0, self.height),
        ]
    }
}

/// Grid coordinates of a pixel
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pixel {
    pub x: usize,
    pub y: usize,
}

impl Pixel {
    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    /// Planar position of the pixel
    #[inline]
    pub fn position(&self) -> DVec2 {
        DVec2::new(self.x as f64, self.y as f64)
    }
}

/// Immutable W×H grid of nonnegative densities, stored row-major
#[derive(Debug, Clone, PartialEq)]
pub struct DensityField {
    width: usize,
    height: usize,
    values: Vec<f64>,
}

impl DensityField {
    /// Create a field from row-major values
    ///
    /// # Errors
    ///
    /// Returns `InvalidDensityField` if either dimension is zero, the value
    /// count does not match `width * height`, or any value is negative or
    /// not finite.
    pub fn new(width: usize, height: usize, values: Vec<f64>) -> Result<Self> {
        let invalid = |reason: String| TransportError::InvalidDensityField {
            width,
            height,
            reason,
        };

        let len = pixel_count(width, height)?;
        if values.len() != len {
            return Err(invalid(format!(
                "expected {} values, got {}",
                len,
                values.len()
            )));
        }
        if let Some(index) = values.iter().position(|v| !v.is_finite() || *v < 0.0) {
            return Err(invalid(format!(
                "value {} at index {} is not a finite nonnegative number",
                values[index], index
            )));
        }

        Ok(Self {
            width,
            height,
            values,
        })
    }

    /// Create a field by evaluating `f(x, y)` at every pixel
    pub fn from_fn<F>(width: usize, height: usize, mut f: F) -> Result<Self>
    where
        F: FnMut(usize, usize) -> f64,
    {
        let mut values = Vec::with_capacity(pixel_count(width, height)?);
        for y in 0..height {
            for x in 0..width {
                values.push(f(x, y));
            }
        }
        Self::new(width, height, values)
    }

    /// Create a field where every pixel has the same density
    pub fn uniform(width: usize, height: usize, value: f64) -> Result<Self> {
        Self::new(width, height, vec![value; pixel_count(width, height)?])
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of pixels in the grid
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Bounding rectangle covering every pixel position
    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.width as f64, self.height as f64)
    }

    /// Density at pixel `(x, y)`, `None` outside the grid
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Option<f64> {
        if x < self.width && y < self.height {
            Some(self.values[y * self.width + x])
        } else {
            None
        }
    }

    /// Density at a pixel known to be inside the grid
    #[inline]
    pub fn value(&self, pixel: Pixel) -> f64 {
        self.values[pixel.y * self.width + pixel.x]
    }

    /// Row-major density values
    #[inline]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Sum of all densities
    pub fn total_mass(&self) -> f64 {
        self.values.iter().sum()
    }

    /// Iterate over every pixel with its density, row by row
    pub fn pixels(&self) -> impl Iterator<Item = (Pixel, f64)> + '_ {
        self.values
            .iter()
            .enumerate()
            .map(move |(index, &value)| (Pixel::new(index % self.width, index / self.width), value))
    }

    /// Inverted density `1 - ρ`, floored at zero
    ///
    /// Bright regions of the source image become sparse, which is where
    /// Lloyd relaxation places fewer sites.
    #[inline]
    pub fn invert(value: f64) -> f64 {
        (1.0 - value).max(0.0)
    }

    /// Field of inverted densities
    pub fn inverted(&self) -> DensityField {
        DensityField {
            width: self.width,
            height: self.height,
            values: self.values.iter().map(|&v| Self::invert(v)).collect(),
        }
    }

    /// Check that another field covers the same grid
    pub fn ensure_same_shape(&self, other: &DensityField) -> Result<()> {
        if self.width != other.width || self.height != other.height {
            return Err(TransportError::InvalidDensityField {
                width: other.width,
                height: other.height,
                reason: format!(
                    "dimensions differ from the {}x{} reference field",
                    self.width, self.height
                ),
            });
        }
        Ok(())
    }

    /// Check that the field carries mass to distribute
    pub fn ensure_positive_mass(&self) -> Result<f64> {
        let total = self.total_mass();
        if total > 0.0 {
            Ok(total)
        } else {
            Err(TransportError::InvalidDensityField {
                width: self.width,
                height: self.height,
                reason: "total mass is zero".to_string(),
            })
        }
    }
}

/// Number of pixels in a `width x height` grid, rejecting empty or overflowing sizes
fn pixel_count(width: usize, height: usize) -> Result<usize> {
    let invalid = |reason: &str| TransportError::InvalidDensityField {
        width,
        height,
        reason: reason.to_string(),
    };
    if width == 0 || height == 0 {
        return Err(invalid("dimensions must be nonzero"));
    }
    width
        .checked_mul(height)
        .ok_or_else(|| invalid("pixel count overflows usize"))
}
