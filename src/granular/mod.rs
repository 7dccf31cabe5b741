//! Granular resynthesis
//!
//! - Grain quality scoring
//! - Grain extraction with analysis-guided placement
//! - Tape-speed pitch shifting
//! - Cloud synthesis

pub mod cloud;
pub mod extractor;
pub mod pitch;
pub mod quality;

pub use cloud::{synthesize, CloudParams};
pub use extractor::{Grain, GrainExtractionParams, GrainExtractor, Placement, PlacementStrategy};
pub use quality::GrainQualityScorer;
