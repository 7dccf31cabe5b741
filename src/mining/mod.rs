//! Sustained pad mining

pub mod segment_miner;

pub use segment_miner::{MiningGates, SegmentCandidate, SegmentMiner};
