//! Rational beat positions and tempo mapping

pub mod beat;
pub mod bpm;

pub use beat::BeatTime;
pub use bpm::{BpmList, BpmSegment};
