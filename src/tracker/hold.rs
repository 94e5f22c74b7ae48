use std::time::{Duration, Instant};

use crate::config::HoldSection;
use crate::pose::Pose;

/// ホールド判定のパラメータ
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoldConfig {
    pub hold_duration: Duration,
    pub similarity_threshold: f32,
    pub confidence_cutoff: f32,
    pub min_shared_joints: usize,
}

impl HoldConfig {
    pub fn from_config(config: &HoldSection) -> Self {
        Self {
            hold_duration: Duration::from_secs_f32(config.duration_secs),
            similarity_threshold: config.similarity_threshold,
            confidence_cutoff: config.confidence_cutoff,
            min_shared_joints: config.min_shared_joints,
        }
    }
}

impl Default for HoldConfig {
    fn default() -> Self {
        Self::from_config(&HoldSection::default())
    }
}

/// 直前の姿勢と、類似姿勢が続いている区間の開始時刻
#[derive(Debug, Clone, Default)]
pub struct StabilityWindow {
    previous: Option<(Pose, Instant)>,
    hold_start: Option<Instant>,
}

impl StabilityWindow {
    fn clear(&mut self) {
        self.previous = None;
        self.hold_start = None;
    }
}

/// 姿勢が一定時間静止しているかを判定する
///
/// `observe` はホールド1回につき、継続時間を超えた瞬間に一度だけ `true` を返す。
/// 成立後はウィンドウを空にするので、次のホールドは一から積み直しになる。
pub struct HoldDetector {
    config: HoldConfig,
    window: StabilityWindow,
}

impl HoldDetector {
    pub fn new(config: HoldConfig) -> Self {
        Self {
            config,
            window: StabilityWindow::default(),
        }
    }

    pub fn config(&self) -> &HoldConfig {
        &self.config
    }

    pub fn observe(&mut self, pose: &Pose, now: Instant) -> bool {
        let (previous, previous_at) = match &self.window.previous {
            Some((previous, at)) => (previous, *at),
            None => {
                self.window.previous = Some((pose.clone(), now));
                return false;
            }
        };

        if self.poses_are_similar(previous, pose) {
            match self.window.hold_start {
                None => {
                    // 類似区間は直前の姿勢から始まっている
                    self.window.hold_start = Some(previous_at);
                }
                Some(start) => {
                    let held = now.saturating_duration_since(start);
                    if held >= self.config.hold_duration {
                        log::debug!("hold confirmed after {:.2}s", held.as_secs_f32());
                        self.window.clear();
                        return true;
                    }
                }
            }
        } else {
            if self.window.hold_start.is_some() {
                log::trace!("hold broken");
            }
            self.window.clear();
        }

        self.window.previous = Some((pose.clone(), now));
        false
    }

    pub fn reset(&mut self) {
        self.window.clear();
    }

    pub fn poses_are_similar(&self, a: &Pose, b: &Pose) -> bool {
        poses_are_similar(
            a,
            b,
            self.config.similarity_threshold,
            self.config.confidence_cutoff,
            self.config.min_shared_joints,
        )
    }

    /// 比較対象となる直前の姿勢を保持しているか
    pub fn is_tracking(&self) -> bool {
        self.window.previous.is_some()
    }

    pub fn hold_started_at(&self) -> Option<Instant> {
        self.window.hold_start
    }

    /// 現在の類似区間の経過時間。区間がなければ0
    pub fn held_for(&self, now: Instant) -> Duration {
        self.window
            .hold_start
            .map(|start| now.saturating_duration_since(start))
            .unwrap_or(Duration::ZERO)
    }
}

impl Default for HoldDetector {
    fn default() -> Self {
        Self::new(HoldConfig::default())
    }
}

/// 両方の姿勢で信頼できる関節だけを比べる部分一致
///
/// 片方にしかない関節は無視する。共通関節が `min_shared` 未満なら非類似。
/// `min_shared == 0` では共通関節ゼロでも類似になる。
pub fn poses_are_similar(a: &Pose, b: &Pose, threshold: f32, cutoff: f32, min_shared: usize) -> bool {
    let mut shared = 0usize;
    for (name, ja) in a.confident_joints(cutoff) {
        let Some(jb) = b.get(name).filter(|j| j.is_confident(cutoff)) else {
            continue;
        };
        if ja.distance(jb) > threshold {
            return false;
        }
        shared += 1;
    }
    shared >= min_shared
}
