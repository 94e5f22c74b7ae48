use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub hold: HoldSection,
    #[serde(default)]
    pub calibration: CalibrationSection,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HoldSection {
    /// ホールド成立に必要な継続時間（秒）
    #[serde(default = "default_duration_secs")]
    pub duration_secs: f32,
    /// 同一姿勢とみなす関節移動量の上限（正規化座標）
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,
    /// 関節を採用する信頼度の下限（これを超えたもののみ採用）
    #[serde(default = "default_confidence_cutoff")]
    pub confidence_cutoff: f32,
    /// 類似判定に必要な共通関節数。0なら共通関節なしでも類似扱い
    #[serde(default)]
    pub min_shared_joints: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CalibrationSection {
    /// 開始姿勢に入るまでのカウントダウン（秒）
    #[serde(default = "default_start_countdown_secs")]
    pub start_countdown_secs: u32,
    /// 1レップ実施のカウントダウン（秒）
    #[serde(default = "default_exercise_countdown_secs")]
    pub exercise_countdown_secs: u32,
    /// カウントダウンの1ティック（ミリ秒）
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

fn default_duration_secs() -> f32 { 2.0 }
fn default_similarity_threshold() -> f32 { 0.05 }
fn default_confidence_cutoff() -> f32 { 0.5 }
fn default_start_countdown_secs() -> u32 { 5 }
fn default_exercise_countdown_secs() -> u32 { 10 }
fn default_tick_interval_ms() -> u64 { 1000 }

impl Default for HoldSection {
    fn default() -> Self {
        Self {
            duration_secs: default_duration_secs(),
            similarity_threshold: default_similarity_threshold(),
            confidence_cutoff: default_confidence_cutoff(),
            min_shared_joints: 0,
        }
    }
}

impl Default for CalibrationSection {
    fn default() -> Self {
        Self {
            start_countdown_secs: default_start_countdown_secs(),
            exercise_countdown_secs: default_exercise_countdown_secs(),
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

/// 設定値の検証エラー
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("hold.duration_secs must be positive and finite (got {0})")]
    InvalidHoldDuration(f32),
    #[error("hold.similarity_threshold must be non-negative and finite (got {0})")]
    InvalidSimilarityThreshold(f32),
    #[error("hold.confidence_cutoff must be within [0, 1] (got {0})")]
    InvalidConfidenceCutoff(f32),
    #[error("calibration.tick_interval_ms must be positive")]
    ZeroTickInterval,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// 読み込みに失敗したらデフォルト値を使う
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("{:#}; using defaults", e);
                Self::default()
            }
        }
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        let hold = &self.hold;
        // Duration に変換できない値も不可
        if hold.duration_secs <= 0.0 || Duration::try_from_secs_f32(hold.duration_secs).is_err() {
            return Err(ConfigError::InvalidHoldDuration(hold.duration_secs));
        }
        if !hold.similarity_threshold.is_finite() || hold.similarity_threshold < 0.0 {
            return Err(ConfigError::InvalidSimilarityThreshold(hold.similarity_threshold));
        }
        if !(0.0..=1.0).contains(&hold.confidence_cutoff) {
            return Err(ConfigError::InvalidConfidenceCutoff(hold.confidence_cutoff));
        }
        if self.calibration.tick_interval_ms == 0 {
            return Err(ConfigError::ZeroTickInterval);
        }
        Ok(())
    }
}
