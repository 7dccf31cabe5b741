//! Output description and curation
//!
//! - Metadata (levels, brightness, pitch, loop seam)
//! - A/B/F grading

pub mod grading;
pub mod metadata;

pub use grading::{grade, Grade, GradingThresholds};
pub use metadata::{compute_metadata, Brightness, OutputMetadata, TextureKind};
