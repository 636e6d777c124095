use super::smooth::KeypointSmoother;
use crate::config::SmoothConfig;
use crate::pose::Pose;

/// 配置計算に必要な表示ジオメトリ
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameGeometry {
    /// 変換後フレームのサイズ（キーポイント座標系）
    pub display_size: (u32, u32),
    pub window: (u32, u32),
    /// キャリブレーションのオフセット
    pub offset: (i32, i32),
}

/// 検出点の平均x位置がウィンドウ内の同じ割合の位置に来るようにリグを水平移動する
///
/// 検出点がなければ表示画像の中央を基準にする（= 中央配置）。
pub fn placement_anchor(pose: &Pose, threshold: f32, geometry: &FrameGeometry) -> (i32, i32) {
    let (disp_w, disp_h) = geometry.display_size;
    let (win_w, win_h) = geometry.window;
    let disp_w = disp_w.max(1) as f32;

    let (sum, count) = pose
        .keypoints
        .iter()
        .filter(|kp| kp.is_detected(threshold))
        .fold((0.0f32, 0usize), |(s, c), kp| (s + kp.x, c + 1));
    let cx = if count > 0 { sum / count as f32 } else { disp_w / 2.0 };

    let pct = cx / disp_w;
    let x = (pct * win_w as f32 - cx).round() as i32 + geometry.offset.0;
    let y = (win_h as i32 - disp_h as i32).div_euclid(2) + geometry.offset.1;
    (x, y)
}

/// 1人分の追跡スロット
pub struct TrackedSubject {
    smoother: KeypointSmoother,
    /// 表示画像座標 → ウィンドウ座標へのずらし量
    pub anchor: (i32, i32),
    /// 平滑化済みの姿勢
    pub pose: Pose,
}

impl TrackedSubject {
    fn new(smoother: KeypointSmoother) -> Self {
        Self {
            smoother,
            anchor: (0, 0),
            pose: Pose::default(),
        }
    }
}

/// 検出順で並ぶ追跡スロットの固定容量アリーナ。スロット0が主人物
///
/// 同一人物の対応付けは行わない。検出数が減ったら末尾のスロットを捨てる。
pub struct SubjectArena {
    slots: Vec<TrackedSubject>,
    capacity: usize,
    alpha: f32,
    threshold: f32,
}

impl SubjectArena {
    pub fn new(capacity: usize, alpha: f32, threshold: f32) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            capacity,
            alpha,
            threshold,
        }
    }

    pub fn from_config(config: &SmoothConfig) -> Self {
        Self::new(config.max_subjects, config.alpha, config.confidence_threshold)
    }

    /// 1フレーム分の検出を取り込む。空なら何もしない（前の状態を保持）
    pub fn observe(&mut self, detections: &[Pose], geometry: &FrameGeometry) {
        if detections.is_empty() {
            return;
        }
        let count = detections.len().min(self.capacity);
        self.sync_count(count);
        for (i, raw) in detections.iter().take(count).enumerate() {
            self.update(i, raw, geometry);
        }
    }

    /// index番目のスロットを更新して平滑化済み姿勢を返す。容量外なら None
    pub fn update(&mut self, index: usize, raw: &Pose, geometry: &FrameGeometry) -> Option<&Pose> {
        if index >= self.capacity {
            return None;
        }
        while self.slots.len() <= index {
            let smoother = KeypointSmoother::new(self.alpha, self.threshold);
            self.slots.push(TrackedSubject::new(smoother));
        }

        let threshold = self.threshold;
        let slot = &mut self.slots[index];
        slot.pose = slot.smoother.apply(raw);
        slot.anchor = placement_anchor(&slot.pose, threshold, geometry);
        Some(&slot.pose)
    }

    /// スロット数を count 以下に切り詰める
    pub fn sync_count(&mut self, count: usize) {
        self.slots.truncate(count);
    }

    pub fn primary(&self) -> Option<&TrackedSubject> {
        self.slots.first()
    }

    pub fn subjects(&self) -> &[TrackedSubject] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::{Keypoint, KeypointIndex};

    const GEOM: FrameGeometry = FrameGeometry {
        display_size: (640, 480),
        window: (1280, 720),
        offset: (0, 0),
    };

    fn pose_at(x: f32, conf: f32) -> Pose {
        Pose::new([Keypoint::new(x, 100.0, conf); KeypointIndex::COUNT])
    }

    #[test]
    fn test_anchor_recenters_horizontally() {
        // cx=160 → 25% → ウィンドウ上 320 → 320-160 = 160
        let anchor = placement_anchor(&pose_at(160.0, 0.9), 0.5, &GEOM);
        assert_eq!(anchor, (160, 120));
    }

    #[test]
    fn test_anchor_without_detections_is_centered() {
        let anchor = placement_anchor(&pose_at(10.0, 0.1), 0.5, &GEOM);
        // cx = 320 → 50% → 640 - 320 = 320 = (1280-640)/2
        assert_eq!(anchor, (320, 120));
    }

    #[test]
    fn test_anchor_includes_offsets() {
        let geometry = FrameGeometry {
            offset: (-30, 45),
            ..GEOM
        };
        assert_eq!(placement_anchor(&pose_at(160.0, 0.9), 0.5, &geometry), (130, 165));
    }

    #[test]
    fn test_anchor_uses_only_detected_points() {
        let mut pose = pose_at(160.0, 0.9);
        *pose.get_mut(KeypointIndex::Nose) = Keypoint::new(600.0, 0.0, 0.3);
        assert_eq!(placement_anchor(&pose, 0.5, &GEOM).0, 160);
    }

    #[test]
    fn test_observe_creates_slots_in_detection_order() {
        let mut arena = SubjectArena::new(4, 1.0, 0.5);
        arena.observe(&[pose_at(100.0, 0.9), pose_at(300.0, 0.9)], &GEOM);
        assert_eq!(arena.len(), 2);
        assert_eq!(arena.primary().unwrap().pose.keypoints[0].x, 100.0);
        assert_eq!(arena.subjects()[1].pose.keypoints[0].x, 300.0);
    }

    #[test]
    fn test_shrinking_count_drops_trailing_slots() {
        let mut arena = SubjectArena::new(4, 0.5, 0.5);
        arena.observe(&[pose_at(100.0, 0.9), pose_at(300.0, 0.9), pose_at(500.0, 0.9)], &GEOM);
        arena.observe(&[pose_at(120.0, 0.9)], &GEOM);
        assert_eq!(arena.len(), 1);
        // スロット0は前フレームの状態を引き継ぐ
        assert_eq!(arena.primary().unwrap().pose.keypoints[0].x, 110.0);

        // 再出現したスロット1は新規に種付けされる
        arena.observe(&[pose_at(120.0, 0.9), pose_at(400.0, 0.9)], &GEOM);
        assert_eq!(arena.subjects()[1].pose.keypoints[0].x, 400.0);
    }

    #[test]
    fn test_empty_detections_are_noop() {
        let mut arena = SubjectArena::new(4, 0.5, 0.5);
        arena.observe(&[pose_at(100.0, 0.9), pose_at(300.0, 0.9)], &GEOM);
        let anchor = arena.primary().unwrap().anchor;
        arena.observe(&[], &GEOM);
        assert_eq!(arena.len(), 2);
        assert_eq!(arena.primary().unwrap().anchor, anchor);
        assert_eq!(arena.primary().unwrap().pose.keypoints[0].x, 100.0);
    }

    #[test]
    fn test_capacity_limits_slots() {
        let mut arena = SubjectArena::new(2, 1.0, 0.5);
        let detections: Vec<Pose> = (0..5).map(|i| pose_at(i as f32 * 10.0, 0.9)).collect();
        arena.observe(&detections, &GEOM);
        assert_eq!(arena.len(), 2);
        assert!(arena.update(2, &detections[2], &GEOM).is_none());
    }
}
