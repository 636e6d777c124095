use super::canvas::Canvas;
use super::sprites::SpriteSet;
use crate::pose::Pose;
use crate::rig::Rig;

/// キーポイントの色 (RGB)
pub const KEYPOINT_COLOR: u32 = 0xFF0000; // 赤

pub const KEYPOINT_RADIUS: i32 = 8;

/// リグの各部位にスプライトを貼る（`Rig::bones` の順）
pub fn draw_rig<C: Canvas + ?Sized>(canvas: &mut C, rig: &Rig, sprites: &SpriteSet) {
    for placed in rig.bones.iter() {
        let sprite = sprites.get(placed.bone.sprite());
        canvas.blit_sprite(sprite, placed.center, placed.size, placed.rotation_deg);
    }
}

/// 可視キーポイントを点で描く（デバッグ用）
pub fn draw_keypoints<C: Canvas + ?Sized>(canvas: &mut C, pose: &Pose, anchor: (i32, i32), threshold: f32) {
    for kp in pose.keypoints.iter().filter(|kp| kp.is_visible(threshold)) {
        let x = anchor.0 + kp.x.round() as i32;
        let y = anchor.1 + kp.y.round() as i32;
        canvas.fill_circle(x, y, KEYPOINT_RADIUS, KEYPOINT_COLOR);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::{Keypoint, KeypointIndex};
    use crate::render::FrameBuffer;
    use crate::rig::{build_rig, RigParams};

    #[test]
    fn test_draw_keypoints_only_visible() {
        let mut fb = FrameBuffer::new(100, 100);
        let mut pose = Pose::default();
        *pose.get_mut(KeypointIndex::Nose) = Keypoint::new(10.0, 10.0, 0.9);
        *pose.get_mut(KeypointIndex::LeftEye) = Keypoint::new(60.0, 60.0, 0.5);
        draw_keypoints(&mut fb, &pose, (5, 5), 0.5);
        assert_eq!(fb.pixel(15, 15), Some(KEYPOINT_COLOR));
        assert_eq!(fb.pixel(65, 65), Some(0));
    }

    #[test]
    fn test_draw_rig_paints_torso() {
        let mut pose = Pose::default();
        *pose.get_mut(KeypointIndex::LeftShoulder) = Keypoint::new(40.0, 20.0, 0.9);
        *pose.get_mut(KeypointIndex::RightShoulder) = Keypoint::new(80.0, 20.0, 0.9);
        *pose.get_mut(KeypointIndex::LeftHip) = Keypoint::new(45.0, 80.0, 0.9);
        *pose.get_mut(KeypointIndex::RightHip) = Keypoint::new(75.0, 80.0, 0.9);

        let sprites = SpriteSet::placeholders();
        let rig = build_rig(&pose, (0, 0), &sprites.sizes(), &RigParams::default());
        let mut fb = FrameBuffer::new(120, 120);
        draw_rig(&mut fb, &rig, &sprites);
        // 胴の中心 (60, 50) は塗られている
        assert_ne!(fb.pixel(60, 50), Some(0));
        assert_eq!(fb.pixel(5, 115), Some(0));
    }
}
