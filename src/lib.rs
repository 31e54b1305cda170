//! C2RCC-style neural-net inversion of ocean-colour TOA reflectance into
//! water-leaving reflectance, inherent optical properties and Kd.

pub mod ancillary;
pub mod batch;
pub mod config;
pub mod net_set;
pub mod nn;
pub mod pipeline;
pub mod sensor;

pub use ancillary::{AncillaryProvider, AncillaryResolver, ConstantAncillary};
pub use batch::{BatchProcessor, BatchSummary, Observation};
pub use config::PipelineConfig;
pub use net_set::{NetRole, NetSet, NetSetId};
pub use nn::NeuralNet;
pub use pipeline::{Flag, InversionPipeline, PixelInput, PixelResult, QualityFlags};
pub use sensor::Sensor;
