use std::fmt;
use std::time::{Duration, Instant};

use super::countdown::{Countdown, CountdownEvent};
use super::rom::RangeOfMotion;
use crate::config::Config;
use crate::pose::{Pose, PoseSource};
use crate::tracker::{HoldConfig, HoldDetector};

// --- 状態・出力 ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CalibrationState {
    AwaitingStart,
    HoldingStart,
    PerformingExercise,
    HoldingEnd,
    Complete,
}

impl CalibrationState {
    /// この状態に入ったときに表示する指示
    pub fn instruction(&self) -> Instruction {
        match self {
            Self::AwaitingStart => Instruction::GetIntoStartPosition,
            Self::HoldingStart => Instruction::HoldStartPosition,
            Self::PerformingExercise => Instruction::PerformOneRep,
            Self::HoldingEnd => Instruction::HoldEndPosition,
            Self::Complete => Instruction::CalibrationSuccessful,
        }
    }

    pub fn is_holding(&self) -> bool {
        matches!(self, Self::HoldingStart | Self::HoldingEnd)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Instruction {
    GetIntoStartPosition,
    HoldStartPosition,
    PerformOneRep,
    HoldEndPosition,
    CalibrationSuccessful,
}

impl Instruction {
    pub fn text(&self) -> &'static str {
        match self {
            Self::GetIntoStartPosition => "Please get into the start position of the exercise.",
            Self::HoldStartPosition => "Hold the start position...",
            Self::PerformOneRep => "Now, perform one rep of the exercise.",
            Self::HoldEndPosition => "Hold your end position...",
            Self::CalibrationSuccessful => "Calibration successful! Ready to start the exercise.",
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapturePhase {
    Start,
    End,
}

/// キャリブレーションで取得した開始・終了の基準姿勢
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferencePosePair {
    pub start: Option<Pose>,
    pub end: Option<Pose>,
}

impl ReferencePosePair {
    pub fn is_complete(&self) -> bool {
        self.start.is_some() && self.end.is_some()
    }

    /// 両方揃っていれば可動域を計算
    pub fn range_of_motion(&self, cutoff: f32) -> Option<RangeOfMotion> {
        match (&self.start, &self.end) {
            (Some(start), Some(end)) => Some(RangeOfMotion::between(start, end, cutoff)),
            _ => None,
        }
    }
}

/// `begin` / `tick` / `cancel` が返すイベント（発生順）
#[derive(Debug, Clone, PartialEq)]
pub enum SequencerEvent {
    Instruction(Instruction),
    Countdown { remaining: u32 },
    StateChanged { from: CalibrationState, to: CalibrationState },
    Captured { phase: CapturePhase, pose: Pose },
    /// ホールド待ち中に姿勢が取れなくなった
    PoseSignalLost,
    PoseSignalRestored,
    Completed(ReferencePosePair),
    Cancelled,
}

// --- 設定 ---

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SequencerConfig {
    pub hold: HoldConfig,
    pub start_countdown_secs: u32,
    pub exercise_countdown_secs: u32,
    pub tick_interval: Duration,
}

impl SequencerConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            hold: HoldConfig::from_config(&config.hold),
            start_countdown_secs: config.calibration.start_countdown_secs,
            exercise_countdown_secs: config.calibration.exercise_countdown_secs,
            tick_interval: Duration::from_millis(config.calibration.tick_interval_ms),
        }
    }
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

// --- シーケンサ ---

/// 開始姿勢・終了姿勢を順に取得するキャリブレーション状態機械
///
/// 呼び出し元は1つのループから `tick` を周期的に呼ぶ。
/// カウントダウンもホールド判定も `tick` の中でのみ進む。
pub struct CalibrationSequencer {
    config: SequencerConfig,
    state: CalibrationState,
    running: bool,
    detector: HoldDetector,
    countdown: Countdown,
    reference: ReferencePosePair,
    awaiting_pose: bool,
}

impl CalibrationSequencer {
    pub fn new(config: SequencerConfig) -> Self {
        Self {
            config,
            state: CalibrationState::AwaitingStart,
            running: false,
            detector: HoldDetector::new(config.hold),
            countdown: Countdown::new(config.tick_interval),
            reference: ReferencePosePair::default(),
            awaiting_pose: false,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(SequencerConfig::from_config(config))
    }

    /// キャリブレーションを開始（実行中なら最初からやり直す）
    pub fn begin(&mut self, now: Instant) -> Vec<SequencerEvent> {
        let mut events = Vec::new();
        self.detector.reset();
        self.reference = ReferencePosePair::default();
        self.awaiting_pose = false;
        self.running = true;
        log::info!("calibration started");
        self.enter(CalibrationState::AwaitingStart, now, &mut events);
        events
    }

    pub fn tick<S: PoseSource + ?Sized>(&mut self, source: &mut S, now: Instant) -> Vec<SequencerEvent> {
        let mut events = Vec::new();
        if !self.running {
            log::trace!("tick ignored: calibration not running");
            return events;
        }

        for event in self.countdown.poll(now) {
            match event {
                CountdownEvent::Tick { remaining, .. } => {
                    log::debug!("{:?}: {} left", self.state, remaining);
                    events.push(SequencerEvent::Countdown { remaining });
                }
                CountdownEvent::Expired { .. } => match self.state {
                    CalibrationState::AwaitingStart => {
                        self.enter(CalibrationState::HoldingStart, now, &mut events);
                    }
                    CalibrationState::PerformingExercise => {
                        self.enter(CalibrationState::HoldingEnd, now, &mut events);
                    }
                    state => log::trace!("countdown expired in {:?}; ignored", state),
                },
            }
        }

        if self.state.is_holding() {
            self.poll_hold(source, now, &mut events);
        }
        events
    }

    /// 途中で中止する。取得済みの基準姿勢は `take_reference` で取り出せる
    pub fn cancel(&mut self) -> Vec<SequencerEvent> {
        let mut events = Vec::new();
        if !self.running {
            return events;
        }
        self.countdown.cancel();
        self.detector.reset();
        self.running = false;
        self.awaiting_pose = false;
        log::info!("calibration cancelled in {:?}", self.state);
        let from = self.state;
        self.state = CalibrationState::AwaitingStart;
        if from != self.state {
            events.push(SequencerEvent::StateChanged { from, to: self.state });
        }
        events.push(SequencerEvent::Cancelled);
        events
    }

    pub fn state(&self) -> CalibrationState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn reference(&self) -> &ReferencePosePair {
        &self.reference
    }

    pub fn take_reference(&mut self) -> ReferencePosePair {
        std::mem::take(&mut self.reference)
    }

    /// ホールド待ちで姿勢が取れていない状態か
    pub fn awaiting_pose(&self) -> bool {
        self.awaiting_pose
    }

    /// 動作中カウントダウンの残りティック数
    pub fn countdown_remaining(&self) -> Option<u32> {
        self.countdown.remaining()
    }

    /// ホールド待ち中の静止継続時間
    pub fn hold_progress(&self, now: Instant) -> Option<Duration> {
        if self.running && self.state.is_holding() {
            Some(self.detector.held_for(now))
        } else {
            None
        }
    }

    pub fn config(&self) -> &SequencerConfig {
        &self.config
    }

    fn poll_hold<S: PoseSource + ?Sized>(&mut self, source: &mut S, now: Instant, events: &mut Vec<SequencerEvent>) {
        let pose = match source.current_pose() {
            Some(pose) => pose,
            None => {
                if !self.awaiting_pose {
                    self.awaiting_pose = true;
                    log::debug!("{:?}: no pose available", self.state);
                    events.push(SequencerEvent::PoseSignalLost);
                }
                return;
            }
        };

        if self.awaiting_pose {
            self.awaiting_pose = false;
            log::debug!("{:?}: pose available again", self.state);
            events.push(SequencerEvent::PoseSignalRestored);
        }

        if !self.detector.observe(&pose, now) {
            return;
        }

        let (phase, next) = match self.state {
            CalibrationState::HoldingStart => {
                self.reference.start = Some(pose.clone());
                (CapturePhase::Start, CalibrationState::PerformingExercise)
            }
            _ => {
                self.reference.end = Some(pose.clone());
                (CapturePhase::End, CalibrationState::Complete)
            }
        };
        log::info!("{:?} pose captured ({} joints)", phase, pose.len());
        events.push(SequencerEvent::Captured { phase, pose });
        self.enter(next, now, events);
    }

    fn enter(&mut self, to: CalibrationState, now: Instant, events: &mut Vec<SequencerEvent>) {
        let from = self.state;
        self.state = to;
        if from != to {
            log::info!("calibration {:?} -> {:?}", from, to);
            events.push(SequencerEvent::StateChanged { from, to });
        }
        events.push(SequencerEvent::Instruction(to.instruction()));

        match to {
            CalibrationState::AwaitingStart => {
                self.start_countdown(self.config.start_countdown_secs, now, events);
            }
            CalibrationState::PerformingExercise => {
                self.start_countdown(self.config.exercise_countdown_secs, now, events);
            }
            CalibrationState::HoldingStart | CalibrationState::HoldingEnd => {
                self.detector.reset();
                self.awaiting_pose = false;
            }
            CalibrationState::Complete => {
                self.countdown.cancel();
                self.running = false;
                events.push(SequencerEvent::Completed(self.reference.clone()));
            }
        }
    }

    fn start_countdown(&mut self, secs: u32, now: Instant, events: &mut Vec<SequencerEvent>) {
        self.countdown.start(secs, now);
        events.push(SequencerEvent::Countdown { remaining: secs });
    }
}

impl Default for CalibrationSequencer {
    fn default() -> Self {
        Self::new(SequencerConfig::default())
    }
}
