//! Error types for power diagram construction and transport solving

use thiserror::Error;

/// Errors that can occur while building diagrams, relaxing sites or solving
#[derive(Debug, Error)]
pub enum TransportError {
    /// A site weight exceeds the lifting constant `4 * max(weight)`
    #[error("invalid weight configuration: site {site} has weight {weight} above lifting constant {lifting_constant}")]
    InvalidWeightConfiguration {
        site: usize,
        weight: f64,
        lifting_constant: f64,
    },

    /// Point location failed for a single query point
    #[error("geometry query failed at ({x}, {y})")]
    GeometryQueryFailure { x: f64, y: f64 },

    /// The density field has unusable dimensions or values
    #[error("invalid density field ({width}x{height}): {reason}")]
    InvalidDensityField {
        width: usize,
        height: usize,
        reason: String,
    },

    /// Rejection sampling cannot find enough distinct eligible pixels
    #[error("sampling exhausted: requested {requested} sites but only {eligible} pixels are eligible")]
    SamplingExhaustion { requested: usize, eligible: usize },

    /// A site lies outside the diagram's bounding rectangle
    #[error("site {site} at ({x}, {y}) lies outside the bounding rectangle")]
    SiteOutOfBounds { site: usize, x: f64, y: f64 },

    /// Configuration validation failed
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A frame or convergence sink failed to accept output
    #[error("sink failed: {0}")]
    Sink(#[from] std::io::Error),
}

impl TransportError {
    /// Whether the error aborts a run, as opposed to being absorbed per pixel
    pub fn is_fatal(&self) -> bool {
        !matches!(self, TransportError::GeometryQueryFailure { .. })
    }
}

/// Result type alias for transport operations
pub type Result<T> = std::result::Result<T, TransportError>;
