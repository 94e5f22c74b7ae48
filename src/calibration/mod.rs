pub mod countdown;
pub mod rom;
pub mod sequencer;

pub use countdown::{Countdown, CountdownEvent, CountdownHandle};
pub use rom::{JointDisplacement, RangeOfMotion};
pub use sequencer::{
    CalibrationSequencer, CalibrationState, CapturePhase, Instruction, ReferencePosePair,
    SequencerConfig, SequencerEvent,
};
