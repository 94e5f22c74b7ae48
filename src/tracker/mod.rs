pub mod hold;

pub use hold::{poses_are_similar, HoldConfig, HoldDetector, StabilityWindow};
