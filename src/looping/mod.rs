//! Seamless loops: crossfade curves and phase-aligned trimming

pub mod crossfade;
pub mod optimizer;

pub use crossfade::{crossfade, FadeCurve};
pub use optimizer::{find_best_trim, loop_seam_error_db, make_loopable, plan_loop, LoopCandidate};
