/// COCO 17 キーポイントインデックス
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum KeypointIndex {
    Nose = 0,
    LeftEye = 1,
    RightEye = 2,
    LeftEar = 3,
    RightEar = 4,
    LeftShoulder = 5,
    RightShoulder = 6,
    LeftElbow = 7,
    RightElbow = 8,
    LeftWrist = 9,
    RightWrist = 10,
    LeftHip = 11,
    RightHip = 12,
    LeftKnee = 13,
    RightKnee = 14,
    LeftAnkle = 15,
    RightAnkle = 16,
}

impl KeypointIndex {
    pub const COUNT: usize = 17;

    pub const ALL: [KeypointIndex; Self::COUNT] = [
        Self::Nose,
        Self::LeftEye,
        Self::RightEye,
        Self::LeftEar,
        Self::RightEar,
        Self::LeftShoulder,
        Self::RightShoulder,
        Self::LeftElbow,
        Self::RightElbow,
        Self::LeftWrist,
        Self::RightWrist,
        Self::LeftHip,
        Self::RightHip,
        Self::LeftKnee,
        Self::RightKnee,
        Self::LeftAnkle,
        Self::RightAnkle,
    ];
}

/// 単一キーポイント（表示画像のピクセル座標）
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    /// 信頼度 (0.0〜1.0)
    pub confidence: f32,
}

impl Keypoint {
    pub fn new(x: f32, y: f32, confidence: f32) -> Self {
        Self { x, y, confidence }
    }

    /// 平滑化の入力として採用するか（閾値ちょうどを含む）
    pub fn is_detected(&self, threshold: f32) -> bool {
        self.confidence >= threshold
    }

    /// 描画に使えるか（閾値ちょうどは含まない）
    pub fn is_visible(&self, threshold: f32) -> bool {
        self.confidence > threshold
    }

    pub fn position(&self) -> (f32, f32) {
        (self.x, self.y)
    }
}

/// 17キーポイントからなる姿勢。座標と信頼度は常に同数
#[derive(Debug, Clone, PartialEq)]
pub struct Pose {
    pub keypoints: [Keypoint; KeypointIndex::COUNT],
}

impl Pose {
    pub fn new(keypoints: [Keypoint; KeypointIndex::COUNT]) -> Self {
        Self { keypoints }
    }

    /// 座標配列と信頼度配列から作る。信頼度は [0, 1] にクランプ
    pub fn from_arrays(
        xy: &[[f32; 2]; KeypointIndex::COUNT],
        confidences: &[f32; KeypointIndex::COUNT],
    ) -> Self {
        let mut keypoints = [Keypoint::default(); KeypointIndex::COUNT];
        for (i, kp) in keypoints.iter_mut().enumerate() {
            *kp = Keypoint::new(xy[i][0], xy[i][1], confidences[i].clamp(0.0, 1.0));
        }
        Self { keypoints }
    }

    pub fn get(&self, index: KeypointIndex) -> &Keypoint {
        &self.keypoints[index as usize]
    }

    pub fn get_mut(&mut self, index: KeypointIndex) -> &mut Keypoint {
        &mut self.keypoints[index as usize]
    }

    /// 2点とも可視か
    pub fn both_visible(&self, a: KeypointIndex, b: KeypointIndex, threshold: f32) -> bool {
        self.get(a).is_visible(threshold) && self.get(b).is_visible(threshold)
    }

    /// 2点間の距離
    pub fn span(&self, a: KeypointIndex, b: KeypointIndex) -> f32 {
        let (pa, pb) = (self.get(a), self.get(b));
        (pb.x - pa.x).hypot(pb.y - pa.y)
    }

    pub fn midpoint(&self, a: KeypointIndex, b: KeypointIndex) -> (f32, f32) {
        let (pa, pb) = (self.get(a), self.get(b));
        ((pa.x + pb.x) / 2.0, (pa.y + pb.y) / 2.0)
    }

    /// 閾値以上のキーポイント数
    pub fn detected_count(&self, threshold: f32) -> usize {
        self.keypoints.iter().filter(|k| k.is_detected(threshold)).count()
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            keypoints: [Keypoint::default(); KeypointIndex::COUNT],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_matches_discriminants() {
        for (i, idx) in KeypointIndex::ALL.iter().enumerate() {
            assert_eq!(*idx as usize, i);
        }
    }

    #[test]
    fn test_detected_vs_visible_boundary() {
        let kp = Keypoint::new(0.0, 0.0, 0.5);
        assert!(kp.is_detected(0.5));
        assert!(!kp.is_visible(0.5));
        assert!(Keypoint::new(0.0, 0.0, 0.51).is_visible(0.5));
    }

    #[test]
    fn test_from_arrays_clamps_confidence() {
        let mut xy = [[0.0; 2]; KeypointIndex::COUNT];
        let mut conf = [0.9; KeypointIndex::COUNT];
        xy[0] = [12.0, 34.0];
        conf[1] = 1.7;
        conf[2] = -0.2;
        let pose = Pose::from_arrays(&xy, &conf);
        assert_eq!(pose.get(KeypointIndex::Nose).position(), (12.0, 34.0));
        assert_eq!(pose.get(KeypointIndex::LeftEye).confidence, 1.0);
        assert_eq!(pose.get(KeypointIndex::RightEye).confidence, 0.0);
    }

    #[test]
    fn test_span_and_midpoint() {
        let mut pose = Pose::default();
        *pose.get_mut(KeypointIndex::LeftShoulder) = Keypoint::new(100.0, 50.0, 0.9);
        *pose.get_mut(KeypointIndex::RightShoulder) = Keypoint::new(200.0, 50.0, 0.9);
        assert_eq!(pose.span(KeypointIndex::LeftShoulder, KeypointIndex::RightShoulder), 100.0);
        assert_eq!(
            pose.midpoint(KeypointIndex::LeftShoulder, KeypointIndex::RightShoulder),
            (150.0, 50.0)
        );
        assert!(pose.both_visible(KeypointIndex::LeftShoulder, KeypointIndex::RightShoulder, 0.5));
        assert!(!pose.both_visible(KeypointIndex::LeftShoulder, KeypointIndex::LeftHip, 0.5));
    }

    #[test]
    fn test_detected_count() {
        let keypoints = [Keypoint::new(0.0, 0.0, 0.5); KeypointIndex::COUNT];
        let pose = Pose::new(keypoints);
        assert_eq!(pose.detected_count(0.5), KeypointIndex::COUNT);
        assert_eq!(pose.detected_count(0.6), 0);
    }
}
