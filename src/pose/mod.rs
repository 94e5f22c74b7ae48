pub mod keypoint;
pub mod source;

pub use keypoint::{Joint, JointName, Pose, UnknownJoint};
pub use source::{from_fn, FromFn, PoseFeed, PoseSource};
