//! Transport Configuration and Builder
//!
//! Every knob of a texture-transport run is an explicit field here; nothing
//! is compiled in.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Result, TransportError};

/// What happens to a site weight after each gradient step
///
/// The lifting constant is recomputed every iteration as `4 * max(weight)`,
/// so the policy affects which weight vectors remain buildable.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum WeightPolicy {
    /// Weights follow the gradient without projection (default)
    #[default]
    Unclamped,
    /// Weights are floored at the given positive value
    Floor(f64),
}

impl WeightPolicy {
    /// Apply the policy to one updated weight
    #[inline]
    pub fn apply(self, weight: f64) -> f64 {
        match self {
            WeightPolicy::Unclamped => weight,
            WeightPolicy::Floor(min) => weight.max(min),
        }
    }
}

/// Configuration for one relaxation + transport run
///
/// The same configuration applied to the same fields always produces the
/// same sites, weights and convergence log.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransportConfig {
    /// Seed for rejection sampling of the initial sites
    pub seed: u64,

    /// Number of sites (Dirac masses) sampling the target field
    pub site_count: usize,

    /// Number of Lloyd iterations on the target field
    ///
    /// - 0: keep the rejection-sampled positions
    /// - 5: default
    pub lloyd_iterations: usize,

    /// Number of gradient-ascent iterations on the source field
    pub transport_iterations: usize,

    /// Gradient step applied to the weights each iteration
    pub step_size: f64,

    /// Weight given to every site before the first transport iteration
    pub initial_weight: f64,

    /// Render interpolation frames every `frame_period` iterations (0 disables)
    pub frame_period: usize,

    /// Number of interpolation steps per rendering; frames `1..frame_count` are emitted
    pub frame_count: usize,

    /// Projection applied to weights after each step
    pub weight_policy: WeightPolicy,
}

impl Default for TransportConfig {
    fn default() -> Self {
        TransportConfigBuilder::new().seed(0).build()
    }
}

/// Builder for creating TransportConfig with validation
///
/// # Example
///
/// ```rust
/// use power_transport::*;
///
/// let config = TransportConfigBuilder::new()
///     .seed(7)
///     .site_count(64)
///     .unwrap()
///     .lloyd_iterations(3)
///     .transport_iterations(50)
///     .step_size(0.5)
///     .unwrap()
///     .build();
///
/// assert_eq!(config.site_count, 64);
/// assert_eq!(config.weight_policy, WeightPolicy::Unclamped);
/// ```
#[derive(Debug, Clone)]
pub struct TransportConfigBuilder {
    seed: Option<u64>,
    site_count: usize,
    lloyd_iterations: usize,
    transport_iterations: usize,
    step_size: f64,
    initial_weight: f64,
    frame_period: usize,
    frame_count: usize,
    weight_policy: WeightPolicy,
}

impl TransportConfigBuilder {
    /// Create a new builder with default values
    ///
    /// Defaults:
    /// - seed: Random
    /// - site_count: 128
    /// - lloyd_iterations: 5
    /// - transport_iterations: 100
    /// - step_size: 1.0
    /// - initial_weight: 1.0
    /// - frame_period: 0 (no frames)
    /// - frame_count: 10
    /// - weight_policy: Unclamped
    pub fn new() -> Self {
        Self {
            seed: None,
            site_count: 128,
            lloyd_iterations: 5,
            transport_iterations: 100,
            step_size: 1.0,
            initial_weight: 1.0,
            frame_period: 0,
            frame_count: 10,
            weight_policy: WeightPolicy::Unclamped,
        }
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the number of sites
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if `count` is zero
    pub fn site_count(mut self, count: usize) -> Result<Self> {
        if count == 0 {
            return Err(TransportError::InvalidConfig(
                "site count must be positive".to_string(),
            ));
        }
        self.site_count = count;
        Ok(self)
    }

    pub fn lloyd_iterations(mut self, iterations: usize) -> Self {
        self.lloyd_iterations = iterations;
        self
    }

    pub fn transport_iterations(mut self, iterations: usize) -> Self {
        self.transport_iterations = iterations;
        self
    }

    /// Set the gradient step
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if `step` is not a finite positive number
    pub fn step_size(mut self, step: f64) -> Result<Self> {
        self.step_size = check_step_size(step)?;
        Ok(self)
    }

    /// Set the uniform starting weight
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if `weight` is not finite and positive; a
    /// non-positive maximum weight makes the lifting constant unusable.
    pub fn initial_weight(mut self, weight: f64) -> Result<Self> {
        if !weight.is_finite() || weight <= 0.0 {
            return Err(TransportError::InvalidConfig(format!(
                "initial weight must be finite and positive (got {})",
                weight
            )));
        }
        self.initial_weight = weight;
        Ok(self)
    }

    pub fn frame_period(mut self, period: usize) -> Self {
        self.frame_period = period;
        self
    }

    /// Set the number of interpolation steps per rendering
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if `count` is zero
    pub fn frame_count(mut self, count: usize) -> Result<Self> {
        if count == 0 {
            return Err(TransportError::InvalidConfig(
                "frame count must be positive".to_string(),
            ));
        }
        self.frame_count = count;
        Ok(self)
    }

    /// Set the weight projection policy
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` for a floor that is not finite and positive
    pub fn weight_policy(mut self, policy: WeightPolicy) -> Result<Self> {
        if let WeightPolicy::Floor(min) = policy {
            if !min.is_finite() || min <= 0.0 {
                return Err(TransportError::InvalidConfig(format!(
                    "weight floor must be finite and positive (got {})",
                    min
                )));
            }
        }
        self.weight_policy = policy;
        Ok(self)
    }

    /// Build the configuration
    ///
    /// If no seed was provided, a random one is drawn.
    pub fn build(self) -> TransportConfig {
        TransportConfig {
            seed: self.seed.unwrap_or_else(rand::random),
            site_count: self.site_count,
            lloyd_iterations: self.lloyd_iterations,
            transport_iterations: self.transport_iterations,
            step_size: self.step_size,
            initial_weight: self.initial_weight,
            frame_period: self.frame_period,
            frame_count: self.frame_count,
            weight_policy: self.weight_policy,
        }
    }
}

impl Default for TransportConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Gradient steps must be finite and positive
pub(crate) fn check_step_size(step: f64) -> Result<f64> {
    if !step.is_finite() || step <= 0.0 {
        return Err(TransportError::InvalidConfig(format!(
            "step size must be finite and positive (got {})",
            step
        )));
    }
    Ok(step)
}
