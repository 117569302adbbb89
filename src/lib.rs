//! Semi-discrete optimal transport between density fields
//!
//! Synthesizes interpolated textures by relaxing weighted sites so that each
//! site's power (Laguerre) cell captures a prescribed fraction of a target
//! measure.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use power_transport::*;
//! use power_transport::generation::generate_transport;
//!
//! let source = DensityField::from_fn(64, 64, |x, _| x as f64 / 64.0).unwrap();
//! let target = DensityField::from_fn(64, 64, |_, y| y as f64 / 64.0).unwrap();
//!
//! let config = TransportConfigBuilder::new()
//!     .seed(42)
//!     .site_count(32).unwrap()
//!     .transport_iterations(50)
//!     .frame_period(10)
//!     .build();
//!
//! let mut frames = FrameCollector::new();
//! let mut log = WriterLog::new(std::io::stdout());
//! let run = generate_transport(&source, &target, &config, &mut frames, &mut log).unwrap();
//! println!("final mse {:?}, {} frames", run.outcome.final_mse(), frames.frames().len());
//! ```
//!
//! # Features
//!
//! - `spatial-index` (default): O(log n) point location using a KD-tree over lifted sites
//! - `serde`: Enables serialization support for configuration and sites

// Modules
pub mod error;
pub mod config;
pub mod field;
pub mod site;
pub mod spatial;
pub mod diagram;
pub mod raster;
pub mod generation;
pub mod sink;

// Re-export core types for convenience
pub use error::{TransportError, Result};
pub use config::{TransportConfig, TransportConfigBuilder, WeightPolicy};
pub use field::{Bounds, DensityField, Pixel};
pub use site::{Site, WeightedSiteSet};
pub use diagram::{Location, PowerCell, PowerDiagram};
pub use raster::{rasterize, rasterize_with, measure, CellMassTable, PixelAssignment};
pub use generation::{LloydOptions, LloydOutput, TransportOptions, TransportOutcome, TransportRun};
pub use sink::{ConvergenceRecord, ConvergenceSink, Frame, FrameCollector, FrameSink, NullSink, WriterLog};

// Re-export glam vectors for convenience
pub use glam::{DVec2, DVec3};
