use super::bones::{Bone, SpriteKind, SpriteSizes, LIMB_SEGMENTS};
use crate::config::RigConfig;
use crate::geometry::{rotated_extent, Rect};
use crate::pose::{KeypointIndex, Pose};

use KeypointIndex::{LeftEar, LeftHip, LeftShoulder, Nose, RightEar, RightHip, RightShoulder};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigParams {
    /// この信頼度を「超えた」点のみ使う
    pub visibility_threshold: f32,
    pub head_scale: f32,
    pub head_fallback_lift: f32,
    /// 0以下なら肩幅が取れないとき頭を置かない
    pub head_fallback_size: f32,
}

impl Default for RigParams {
    fn default() -> Self {
        Self::from_config(&RigConfig::default())
    }
}

impl RigParams {
    pub fn from_config(config: &RigConfig) -> Self {
        Self {
            visibility_threshold: config.visibility_threshold,
            head_scale: config.head_scale,
            head_fallback_lift: config.head_fallback_lift,
            head_fallback_size: config.head_fallback_size,
        }
    }
}

/// 配置済みの部位
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacedBone {
    pub bone: Bone,
    /// ウィンドウ座標の中心
    pub center: (f32, f32),
    /// 回転前の拡縮後サイズ
    pub size: (u32, u32),
    /// 反時計回り正（y下向き画面で見た向き）
    pub rotation_deg: f32,
    /// 回転後の外接矩形
    pub bounds: Rect,
}

impl PlacedBone {
    fn new(bone: Bone, center: (f32, f32), size: (u32, u32), rotation_deg: f32) -> Self {
        let rounded = (center.0.round() as i32, center.1.round() as i32);
        Self {
            bone,
            center,
            size,
            rotation_deg,
            bounds: Rect::from_center(rounded, rotated_extent(size, rotation_deg)),
        }
    }
}

/// 1フレーム分のリグ。描画順（手足 → 頭 → 胴）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rig {
    pub bones: Vec<PlacedBone>,
}

impl Rig {
    pub fn get(&self, bone: Bone) -> Option<&PlacedBone> {
        self.bones.iter().find(|b| b.bone == bone)
    }

    pub fn head(&self) -> Option<&PlacedBone> {
        self.get(Bone::Head)
    }

    /// 当たり判定用の頭の矩形
    pub fn head_bounds(&self) -> Option<Rect> {
        self.head().map(|h| h.bounds)
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }
}

/// 平滑化済み姿勢からリグを組み立てる
///
/// `anchor` は表示画像座標に足すウィンドウ上のずらし量。
pub fn build_rig(pose: &Pose, anchor: (i32, i32), sprites: &SpriteSizes, params: &RigParams) -> Rig {
    let mut bones = Vec::with_capacity(10);
    let offset = (anchor.0 as f32, anchor.1 as f32);

    for &(bone, from, to) in LIMB_SEGMENTS.iter() {
        if let Some(placed) = place_limb(pose, bone, from, to, offset, sprites, params) {
            bones.push(placed);
        }
    }
    if let Some(head) = place_head(pose, offset, sprites, params) {
        bones.push(head);
    }
    if let Some(torso) = place_torso(pose, offset, params) {
        bones.push(torso);
    }

    Rig { bones }
}

fn place_limb(
    pose: &Pose,
    bone: Bone,
    from: KeypointIndex,
    to: KeypointIndex,
    offset: (f32, f32),
    sprites: &SpriteSizes,
    params: &RigParams,
) -> Option<PlacedBone> {
    if !pose.both_visible(from, to, params.visibility_threshold) {
        return None;
    }
    let (p1, p2) = (pose.get(from), pose.get(to));
    let dx = p2.x - p1.x;
    let dy = p2.y - p1.y;
    let length = dx.hypot(dy).max(1.0);
    let angle = dy.atan2(dx).to_degrees();

    // 幅（x方向）を骨の長さに合わせて縦横同じ倍率で拡縮
    let (sw, sh) = sprites.get(bone.sprite());
    let factor = length / sw as f32;
    let size = (
        (sw as f32 * factor).max(1.0) as u32,
        (sh as f32 * factor).max(1.0) as u32,
    );

    let (mx, my) = pose.midpoint(from, to);
    Some(PlacedBone::new(bone, (mx + offset.0, my + offset.1), size, -angle))
}

fn place_torso(pose: &Pose, offset: (f32, f32), params: &RigParams) -> Option<PlacedBone> {
    let t = params.visibility_threshold;
    if !(pose.both_visible(LeftHip, RightHip, t) && pose.both_visible(LeftShoulder, RightShoulder, t)) {
        return None;
    }

    let hip_span = pose.span(LeftHip, RightHip);
    let shoulder_span = pose.span(LeftShoulder, RightShoulder);
    let (_, hip_mid_y) = pose.midpoint(LeftHip, RightHip);
    let (_, shoulder_mid_y) = pose.midpoint(LeftShoulder, RightShoulder);

    let width = hip_span.max(shoulder_span).max(1.0) as u32;
    let height = (hip_mid_y - shoulder_mid_y).abs().max(1.0) as u32;

    let cx = [LeftHip, RightHip, LeftShoulder, RightShoulder]
        .iter()
        .map(|&k| pose.get(k).x)
        .sum::<f32>()
        / 4.0;
    let cy = (hip_mid_y + shoulder_mid_y) / 2.0;

    Some(PlacedBone::new(
        Bone::Torso,
        (cx + offset.0, cy + offset.1),
        (width, height),
        0.0,
    ))
}

/// 頭の中心（表示画像座標）。顔の点の平均、なければ肩中点の少し上
pub fn head_center(pose: &Pose, params: &RigParams) -> Option<(f32, f32)> {
    let t = params.visibility_threshold;
    let face: Vec<(f32, f32)> = [Nose, LeftEar, RightEar]
        .iter()
        .map(|&k| pose.get(k))
        .filter(|kp| kp.is_visible(t))
        .map(|kp| kp.position())
        .collect();

    if !face.is_empty() {
        let n = face.len() as f32;
        let sx: f32 = face.iter().map(|p| p.0).sum();
        let sy: f32 = face.iter().map(|p| p.1).sum();
        return Some((sx / n, sy / n));
    }

    if pose.both_visible(LeftShoulder, RightShoulder, t) {
        let (x, y) = pose.midpoint(LeftShoulder, RightShoulder);
        return Some((x, y - params.head_fallback_lift));
    }
    None
}

fn place_head(
    pose: &Pose,
    offset: (f32, f32),
    sprites: &SpriteSizes,
    params: &RigParams,
) -> Option<PlacedBone> {
    let (cx, cy) = head_center(pose, params)?;

    let width = if pose.both_visible(LeftShoulder, RightShoulder, params.visibility_threshold) {
        params.head_scale * pose.span(LeftShoulder, RightShoulder)
    } else {
        params.head_fallback_size
    };
    if !(width > 0.0) {
        return None;
    }

    let (sw, sh) = sprites.get(SpriteKind::Head);
    let height = width * sh as f32 / sw as f32;
    let size = (width.max(1.0) as u32, height.max(1.0) as u32);

    Some(PlacedBone::new(Bone::Head, (cx + offset.0, cy + offset.1), size, 0.0))
}
