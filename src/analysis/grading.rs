//! Coarse A/B/F grading of rendered textures

use serde::{Deserialize, Serialize};

use super::metadata::OutputMetadata;

/// How far above the RMS floor an A grade must sit (dB)
const A_HEADROOM_DB: f32 = 15.0;
/// Fraction of the crest limit an A grade must stay under
const A_CREST_FRACTION: f32 = 0.6;
/// Seam error an A grade must beat (dB)
const A_MAX_SEAM_DB: f32 = -30.0;

/// Curation grade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Grade {
    /// Comfortably inside every bound
    A,
    /// Usable
    B,
    /// Too quiet, clipping, or too spiky
    F,
}

/// Thresholds for [`grade`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradingThresholds {
    /// Quietest acceptable RMS (dB)
    pub min_rms_db: f32,
    /// Peaks at or above `1 - clipping_tolerance` fail
    pub clipping_tolerance: f32,
    /// Largest acceptable crest factor
    pub max_crest_factor: f32,
}

impl Default for GradingThresholds {
    fn default() -> Self {
        Self {
            min_rms_db: -60.0,
            clipping_tolerance: 0.0,
            max_crest_factor: 30.0,
        }
    }
}

/// Grade a buffer from its metadata
///
/// F when quieter than `min_rms_db`, peaking at or above
/// `1 - clipping_tolerance`, or spikier than `max_crest_factor`; A when at
/// least 15 dB above the floor, under 60 % of the crest limit, and looping
/// cleanly (seam below −30 dB, or not measured); B otherwise.
pub fn grade(metadata: &OutputMetadata, thresholds: &GradingThresholds) -> Grade {
    if metadata.rms_db < thresholds.min_rms_db
        || metadata.peak >= 1.0 - thresholds.clipping_tolerance
        || metadata.crest_factor > thresholds.max_crest_factor
    {
        return Grade::F;
    }

    let loud_enough = metadata.rms_db > thresholds.min_rms_db + A_HEADROOM_DB;
    let smooth = metadata.crest_factor < thresholds.max_crest_factor * A_CREST_FRACTION;
    let seamless = metadata.loop_error_db.map_or(true, |e| e < A_MAX_SEAM_DB);
    if loud_enough && smooth && seamless {
        Grade::A
    } else {
        Grade::B
    }
}
