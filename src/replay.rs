//! Recorded pose streams (JSON lines) for driving the calibration offline.
//!
//! One frame per line:
//! `{"t": 0.5, "joints": {"left_wrist": [0.5, 0.5, 0.9]}}`
//! where each joint is `[x, y, confidence]` and `t` is seconds from the
//! start of the recording. `"joints": null` marks a frame without a pose.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::time::{Duration, Instant};

use crate::calibration::{CalibrationSequencer, SequencerEvent};
use crate::pose::{Joint, JointName, Pose};

#[derive(Debug, Deserialize)]
struct FrameRecord {
    t: f64,
    #[serde(default)]
    joints: Option<BTreeMap<String, [f32; 3]>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReplayFrame {
    pub at: Instant,
    pub pose: Option<Pose>,
}

#[derive(thiserror::Error, Debug)]
pub enum ReplayError {
    #[error("line {line}: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("line {line}: unknown joint `{name}`")]
    UnknownJoint { line: usize, name: String },
    #[error("line {line}: invalid timestamp {t}")]
    InvalidTimestamp { line: usize, t: f64 },
    #[error("line {line}: timestamp {t} is earlier than the previous frame")]
    OutOfOrder { line: usize, t: f64 },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Parses frames, anchoring `t = 0` at `base`. Blank lines are skipped.
pub fn parse_frames<R: BufRead>(reader: R, base: Instant) -> std::result::Result<Vec<ReplayFrame>, ReplayError> {
    let mut frames = Vec::new();
    let mut last_t = 0.0f64;

    for (index, line) in reader.lines().enumerate() {
        let line_no = index + 1;
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let record: FrameRecord = serde_json::from_str(&line)
            .map_err(|source| ReplayError::Json { line: line_no, source })?;
        if !record.t.is_finite() || record.t < 0.0 {
            return Err(ReplayError::InvalidTimestamp { line: line_no, t: record.t });
        }
        if record.t < last_t {
            return Err(ReplayError::OutOfOrder { line: line_no, t: record.t });
        }
        last_t = record.t;

        let at = Duration::try_from_secs_f64(record.t)
            .ok()
            .and_then(|offset| base.checked_add(offset))
            .ok_or(ReplayError::InvalidTimestamp { line: line_no, t: record.t })?;
        let pose = match record.joints {
            Some(joints) => {
                let mut pose = Pose::new(at);
                for (name, [x, y, confidence]) in joints {
                    let joint: JointName = name
                        .parse()
                        .map_err(|_| ReplayError::UnknownJoint { line: line_no, name: name.clone() })?;
                    pose.insert(joint, Joint::new(x, y, confidence));
                }
                Some(pose)
            }
            None => None,
        };
        frames.push(ReplayFrame { at, pose });
    }

    Ok(frames)
}

pub fn load_frames<P: AsRef<Path>>(path: P, base: Instant) -> Result<Vec<ReplayFrame>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let frames = parse_frames(BufReader::new(file), base)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(frames)
}

/// Starts the sequencer at `base` and ticks it once per frame.
///
/// Events are returned with the instant of the tick that produced them.
/// Stops early once the sequencer is no longer running.
pub fn run(
    sequencer: &mut CalibrationSequencer,
    frames: &[ReplayFrame],
    base: Instant,
) -> Vec<(Instant, SequencerEvent)> {
    let mut out: Vec<(Instant, SequencerEvent)> = sequencer
        .begin(base)
        .into_iter()
        .map(|e| (base, e))
        .collect();

    for frame in frames {
        let mut source = frame.pose.clone();
        out.extend(sequencer.tick(&mut source, frame.at).into_iter().map(|e| (frame.at, e)));
        if !sequencer.is_running() {
            break;
        }
    }
    out
}
