use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Instant;

/// 姿勢推定器が返す19関節
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum JointName {
    Nose,
    LeftEye,
    RightEye,
    LeftEar,
    RightEar,
    Neck,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    Root,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
}

impl JointName {
    pub const COUNT: usize = 19;

    pub const ALL: [JointName; Self::COUNT] = [
        Self::Nose,
        Self::LeftEye,
        Self::RightEye,
        Self::LeftEar,
        Self::RightEar,
        Self::Neck,
        Self::LeftShoulder,
        Self::RightShoulder,
        Self::LeftElbow,
        Self::RightElbow,
        Self::LeftWrist,
        Self::RightWrist,
        Self::Root,
        Self::LeftHip,
        Self::RightHip,
        Self::LeftKnee,
        Self::RightKnee,
        Self::LeftAnkle,
        Self::RightAnkle,
    ];

    /// リプレイファイル等で使う snake_case 名
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nose => "nose",
            Self::LeftEye => "left_eye",
            Self::RightEye => "right_eye",
            Self::LeftEar => "left_ear",
            Self::RightEar => "right_ear",
            Self::Neck => "neck",
            Self::LeftShoulder => "left_shoulder",
            Self::RightShoulder => "right_shoulder",
            Self::LeftElbow => "left_elbow",
            Self::RightElbow => "right_elbow",
            Self::LeftWrist => "left_wrist",
            Self::RightWrist => "right_wrist",
            Self::Root => "root",
            Self::LeftHip => "left_hip",
            Self::RightHip => "right_hip",
            Self::LeftKnee => "left_knee",
            Self::RightKnee => "right_knee",
            Self::LeftAnkle => "left_ankle",
            Self::RightAnkle => "right_ankle",
        }
    }
}

impl fmt::Display for JointName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// 未知の関節名
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown joint name: {0}")]
pub struct UnknownJoint(pub String);

impl FromStr for JointName {
    type Err = UnknownJoint;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|j| j.as_str() == s)
            .ok_or_else(|| UnknownJoint(s.to_string()))
    }
}

/// 単一関節のサンプル
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Joint {
    /// 正規化されたX座標 (0.0〜1.0)
    pub x: f32,
    /// 正規化されたY座標 (0.0〜1.0)
    pub y: f32,
    /// 信頼度スコア (0.0〜1.0)
    pub confidence: f32,
}

impl Joint {
    pub fn new(x: f32, y: f32, confidence: f32) -> Self {
        Self { x, y, confidence }
    }

    /// 信頼度が閾値を超えているか（閾値ちょうどは不採用）
    pub fn is_confident(&self, cutoff: f32) -> bool {
        self.confidence > cutoff
    }

    /// 正規化座標上のユークリッド距離
    pub fn distance(&self, other: &Joint) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// 1フレーム・1人分の姿勢
#[derive(Debug, Clone, PartialEq)]
pub struct Pose {
    joints: BTreeMap<JointName, Joint>,
    timestamp: Instant,
}

impl Pose {
    pub fn new(timestamp: Instant) -> Self {
        Self {
            joints: BTreeMap::new(),
            timestamp,
        }
    }

    /// ビルダー形式で関節を追加
    pub fn with_joint(mut self, name: JointName, joint: Joint) -> Self {
        self.insert(name, joint);
        self
    }

    /// 関節を追加。同名の関節は上書きされる
    pub fn insert(&mut self, name: JointName, joint: Joint) -> Option<Joint> {
        self.joints.insert(name, joint)
    }

    pub fn get(&self, name: JointName) -> Option<&Joint> {
        self.joints.get(&name)
    }

    pub fn len(&self) -> usize {
        self.joints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }

    /// フレームのタイムスタンプ
    pub fn timestamp(&self) -> Instant {
        self.timestamp
    }

    pub fn joints(&self) -> impl Iterator<Item = (JointName, &Joint)> + '_ {
        self.joints.iter().map(|(name, joint)| (*name, joint))
    }

    /// 信頼度が cutoff を超える関節のみ
    pub fn confident_joints(&self, cutoff: f32) -> impl Iterator<Item = (JointName, &Joint)> + '_ {
        self.joints()
            .filter(move |(_, joint)| joint.is_confident(cutoff))
    }

    /// 関節の平均信頼度。関節がなければ0
    pub fn average_confidence(&self) -> f32 {
        if self.joints.is_empty() {
            return 0.0;
        }
        let sum: f32 = self.joints.values().map(|j| j.confidence).sum();
        sum / self.joints.len() as f32
    }
}
