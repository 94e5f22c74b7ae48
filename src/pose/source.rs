use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use super::keypoint::Pose;

/// 現在の姿勢を取り出す外部コラボレータ
///
/// 推定に失敗したフレームや人物が映っていないフレームでは `None` を返す。
pub trait PoseSource {
    fn current_pose(&mut self) -> Option<Pose>;
}

/// 一度だけ姿勢を渡す
impl PoseSource for Option<Pose> {
    fn current_pose(&mut self) -> Option<Pose> {
        self.take()
    }
}

/// クロージャを姿勢ソースとして使う
pub struct FromFn<F>(F);

pub fn from_fn<F>(f: F) -> FromFn<F>
where
    F: FnMut() -> Option<Pose>,
{
    FromFn(f)
}

impl<F> PoseSource for FromFn<F>
where
    F: FnMut() -> Option<Pose>,
{
    fn current_pose(&mut self) -> Option<Pose> {
        (self.0)()
    }
}

/// 推定スレッドから最新の姿勢を受け渡すスロット
///
/// `publish` は推定スレッド、`latest` はティックループから呼ぶ。
/// 姿勢は次の publish まで保持されるので何度でも取得可能。
#[derive(Clone, Default)]
pub struct PoseFeed {
    latest: Arc<Mutex<Option<Pose>>>,
    frame_id: Arc<AtomicU64>,
}

impl PoseFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// 新フレームの推定結果を書き込む。`None` は推定失敗
    pub fn publish(&self, pose: Option<Pose>) {
        // ロック中にIDを進めて、IDと姿勢の順序を揃える
        let mut guard = match self.latest.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = pose;
        self.frame_id.fetch_add(1, Ordering::Release);
    }

    /// publish のたびにインクリメントされるフレームID
    pub fn frame_id(&self) -> u64 {
        self.frame_id.load(Ordering::Acquire)
    }

    /// 最新の姿勢。初回 publish 前と推定失敗フレームでは `None`
    pub fn latest(&self) -> Option<Pose> {
        let guard = match self.latest.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.clone()
    }
}

impl PoseSource for PoseFeed {
    fn current_pose(&mut self) -> Option<Pose> {
        self.latest()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use crate::pose::{Joint, JointName};
    use std::thread;
    use std::time::Instant;

    fn pose_at(x: f32) -> Pose {
        Pose::new(Instant::now()).with_joint(JointName::Nose, Joint::new(x, 0.5, 0.9))
    }

    #[test]
    fn test_option_source_yields_once() {
        let mut source = Some(pose_at(0.1));
        assert!(source.current_pose().is_some());
        assert!(source.current_pose().is_none());
    }

    #[test]
    fn test_closure_source() {
        let mut calls = 0;
        {
            let mut source = from_fn(|| {
                calls += 1;
                None
            });
            assert!(source.current_pose().is_none());
            assert!(source.current_pose().is_none());
        }
        assert_eq!(calls, 2);
    }

    #[test]
    fn test_feed_empty_before_publish() {
        let feed = PoseFeed::new();
        assert_eq!(feed.frame_id(), 0);
        assert!(feed.latest().is_none());
    }

    #[test]
    fn test_feed_retains_latest() {
        let mut feed = PoseFeed::new();
        feed.publish(Some(pose_at(0.1)));
        feed.publish(Some(pose_at(0.2)));
        assert_eq!(feed.frame_id(), 2);

        let x = |p: Option<Pose>| p.and_then(|p| p.get(JointName::Nose).map(|j| j.x));
        assert_eq!(x(feed.current_pose()), Some(0.2));
        // 保持されるので再取得できる
        assert_eq!(x(feed.current_pose()), Some(0.2));

        feed.publish(None);
        assert!(feed.current_pose().is_none());
        assert_eq!(feed.frame_id(), 3);
    }

    #[test]
    fn test_feed_across_threads() {
        let feed = PoseFeed::new();
        let writer = feed.clone();
        let handle = thread::spawn(move || {
            for i in 0..10 {
                writer.publish(Some(pose_at(i as f32 / 10.0)));
            }
        });
        handle.join().unwrap();

        assert_eq!(feed.frame_id(), 10);
        let nose = feed.latest().and_then(|p| p.get(JointName::Nose).copied());
        assert_abs_diff_eq!(nose.unwrap().x, 0.9, epsilon = 1e-6);
    }
}
