use crate::pose::{JointName, Pose};

/// 開始姿勢→終了姿勢の関節変位
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointDisplacement {
    pub joint: JointName,
    pub dx: f32,
    pub dy: f32,
    pub distance: f32,
}

/// 可動域。両姿勢で信頼できる関節のみ
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RangeOfMotion {
    displacements: Vec<JointDisplacement>,
}

impl RangeOfMotion {
    pub fn between(start: &Pose, end: &Pose, cutoff: f32) -> Self {
        let displacements = start
            .confident_joints(cutoff)
            .filter_map(|(joint, s)| {
                let e = end.get(joint).filter(|e| e.is_confident(cutoff))?;
                Some(JointDisplacement {
                    joint,
                    dx: e.x - s.x,
                    dy: e.y - s.y,
                    distance: s.distance(e),
                })
            })
            .collect();
        Self { displacements }
    }

    pub fn get(&self, joint: JointName) -> Option<&JointDisplacement> {
        self.displacements.iter().find(|d| d.joint == joint)
    }

    /// 最も大きく動いた関節
    pub fn largest(&self) -> Option<&JointDisplacement> {
        self.displacements
            .iter()
            .max_by(|a, b| a.distance.total_cmp(&b.distance))
    }

    pub fn iter(&self) -> impl Iterator<Item = &JointDisplacement> {
        self.displacements.iter()
    }

    pub fn len(&self) -> usize {
        self.displacements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.displacements.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::Joint;
    use approx::assert_abs_diff_eq;
    use std::time::Instant;

    #[test]
    fn test_displacement_of_shared_joints() {
        let t = Instant::now();
        let start = Pose::new(t)
            .with_joint(JointName::RightWrist, Joint::new(0.5, 0.8, 0.9))
            .with_joint(JointName::RightShoulder, Joint::new(0.5, 0.4, 0.9))
            .with_joint(JointName::Nose, Joint::new(0.5, 0.2, 0.9));
        let end = Pose::new(t)
            .with_joint(JointName::RightWrist, Joint::new(0.8, 0.4, 0.9))
            .with_joint(JointName::RightShoulder, Joint::new(0.5, 0.41, 0.9))
            .with_joint(JointName::Nose, Joint::new(0.5, 0.2, 0.3));

        let rom = RangeOfMotion::between(&start, &end, 0.5);
        assert_eq!(rom.len(), 2);
        assert!(rom.get(JointName::Nose).is_none());

        let wrist = rom.get(JointName::RightWrist).unwrap();
        assert_abs_diff_eq!(wrist.dx, 0.3, epsilon = 1e-6);
        assert_abs_diff_eq!(wrist.dy, -0.4, epsilon = 1e-6);
        assert_abs_diff_eq!(wrist.distance, 0.5, epsilon = 1e-6);

        assert_eq!(rom.largest().map(|d| d.joint), Some(JointName::RightWrist));
    }

    #[test]
    fn test_no_shared_joints() {
        let t = Instant::now();
        let start = Pose::new(t).with_joint(JointName::LeftKnee, Joint::new(0.4, 0.7, 0.9));
        let end = Pose::new(t).with_joint(JointName::RightKnee, Joint::new(0.6, 0.7, 0.9));
        let rom = RangeOfMotion::between(&start, &end, 0.5);
        assert!(rom.is_empty());
        assert!(rom.largest().is_none());
    }
}
