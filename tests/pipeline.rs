use anyhow::Result;
use image::{Rgb, RgbImage};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

use mocap_puppet::calibration::CalibrationParams;
use mocap_puppet::frame::FrameSlot;
use mocap_puppet::geometry::Rect;
use mocap_puppet::pipeline::{FramePipeline, StepOutcome};
use mocap_puppet::pose::{InferenceWorker, Keypoint, KeypointIndex, Pose};
use mocap_puppet::render::{FrameBuffer, SpriteSet};
use mocap_puppet::rig::{Bone, RigParams, SpriteSizes};
use mocap_puppet::tracker::SubjectArena;

const WINDOW: (u32, u32) = (400, 300);

fn upper_body(conf: f32) -> Pose {
    let mut pose = Pose::default();
    let points = [
        (KeypointIndex::Nose, 100.0, 20.0),
        (KeypointIndex::LeftShoulder, 80.0, 40.0),
        (KeypointIndex::RightShoulder, 120.0, 40.0),
        (KeypointIndex::LeftHip, 85.0, 80.0),
        (KeypointIndex::RightHip, 115.0, 80.0),
    ];
    for (k, x, y) in points {
        *pose.get_mut(k) = Keypoint::new(x, y, conf);
    }
    pose
}

/// 呼ばれるたびに用意した検出結果を順に返すワーカー
fn scripted_worker(script: Vec<Vec<Pose>>) -> InferenceWorker {
    let mut script: VecDeque<Vec<Pose>> = script.into();
    let source = move |image: &RgbImage| -> Result<Vec<Pose>> {
        assert_eq!(image.dimensions(), (200, 100));
        Ok(script.pop_front().unwrap_or_default())
    };
    InferenceWorker::spawn(source, Duration::from_secs(5))
}

fn pipeline() -> FramePipeline {
    FramePipeline::new(
        CalibrationParams::default(),
        WINDOW,
        false,
        SubjectArena::new(4, 0.5, 0.5),
        RigParams::default(),
        SpriteSizes::default(),
    )
}

fn camera_frame() -> RgbImage {
    RgbImage::from_pixel(200, 100, Rgb([90, 90, 90]))
}

#[test]
fn test_frame_to_hitbox() {
    let slot = FrameSlot::new();
    let mut worker = scripted_worker(vec![
        vec![upper_body(0.9)],
        vec![],
        vec![upper_body(0.2)],
    ]);
    let mut pipeline = pipeline();

    assert!(matches!(pipeline.step(&slot, &mut worker).unwrap(), StepOutcome::NoFrame));
    assert_eq!(pipeline.hitbox(), None);

    slot.offer(camera_frame());
    match pipeline.step(&slot, &mut worker).unwrap() {
        StepOutcome::Processed { detected } => assert_eq!(detected, 1),
        other => panic!("unexpected outcome: {:?}", other),
    }
    // フレームは処理後に解放される
    assert!(!slot.is_claimed());

    // 検出点の平均x=100 → 50% → 400×0.5 - 100 = 100、y = (300-100)/2
    let subject = pipeline.arena().primary().unwrap();
    assert_eq!(subject.anchor, (100, 100));

    let rig = &pipeline.rigs()[0];
    let torso = rig.get(Bone::Torso).unwrap();
    assert_eq!(torso.center, (200.0, 160.0));
    assert_eq!(torso.size, (40, 40));

    let expected_head = Rect::new(170, 90, 60, 60);
    assert_eq!(rig.head_bounds(), Some(expected_head));
    assert_eq!(pipeline.hitbox(), Some(expected_head));

    // 検出なし: 何も変わらない
    slot.offer(camera_frame());
    assert!(matches!(
        pipeline.step(&slot, &mut worker).unwrap(),
        StepOutcome::Processed { detected: 0 }
    ));
    assert_eq!(pipeline.arena().len(), 1);
    assert_eq!(pipeline.rigs()[0].head_bounds(), Some(expected_head));

    // 全点が低信頼度: 頭は置けないが当たり判定は前の値のまま
    slot.offer(camera_frame());
    pipeline.step(&slot, &mut worker).unwrap();
    assert!(pipeline.rigs()[0].head().is_none());
    assert_eq!(pipeline.hitbox(), Some(expected_head));

    let mut fb = FrameBuffer::new(WINDOW.0, WINDOW.1);
    pipeline.draw(&mut fb, &SpriteSet::placeholders(), true);
}

#[test]
fn test_subjects_follow_detection_count() {
    let slot = FrameSlot::new();
    let mut second = upper_body(0.9);
    for kp in second.keypoints.iter_mut() {
        kp.x += 50.0;
    }
    let mut worker = scripted_worker(vec![
        vec![upper_body(0.9), second],
        vec![upper_body(0.9)],
    ]);
    let mut pipeline = pipeline();

    slot.offer(camera_frame());
    pipeline.step(&slot, &mut worker).unwrap();
    assert_eq!(pipeline.rigs().len(), 2);
    assert!(pipeline.rigs()[1].get(Bone::Torso).is_some());

    slot.offer(camera_frame());
    pipeline.step(&slot, &mut worker).unwrap();
    assert_eq!(pipeline.rigs().len(), 1);
    assert_eq!(pipeline.arena().len(), 1);
}

#[test]
fn test_crop_and_scale_reach_the_keypoint_source() {
    let slot = FrameSlot::new();
    let source = |image: &RgbImage| -> Result<Vec<Pose>> {
        // 400px の中央半分を切り出し、0.5倍 → 100x50
        assert_eq!(image.dimensions(), (100, 50));
        Ok(vec![])
    };
    let mut worker = InferenceWorker::spawn(source, Duration::from_secs(5));
    let calibration = CalibrationParams {
        scale: 0.5,
        offset_x: 0,
        offset_y: 0,
        crop_left: 0.25,
        crop_right: 0.75,
    };
    let mut pipeline = FramePipeline::new(
        calibration,
        WINDOW,
        true,
        SubjectArena::new(4, 0.5, 0.5),
        RigParams::default(),
        SpriteSizes::default(),
    );

    slot.offer(RgbImage::new(400, 100));
    assert!(matches!(
        pipeline.step(&slot, &mut worker).unwrap(),
        StepOutcome::Processed { detected: 0 }
    ));
    assert!(pipeline.rigs().is_empty());
}

#[test]
fn test_no_frame_is_claimed_while_inference_is_outstanding() {
    let slot = FrameSlot::new();
    let mut calls = 0;
    let source = move |_: &RgbImage| -> Result<Vec<Pose>> {
        calls += 1;
        if calls == 1 {
            std::thread::sleep(Duration::from_millis(300));
        }
        Ok(vec![upper_body(0.9)])
    };
    let mut worker = InferenceWorker::spawn(source, Duration::from_millis(50));
    let mut pipeline = pipeline();

    slot.offer(camera_frame());
    assert!(matches!(pipeline.step(&slot, &mut worker).unwrap(), StepOutcome::TimedOut));
    assert!(!slot.has_frame());

    // 遅れている推論が終わるまで次のフレームは確保されずに残る
    slot.offer(camera_frame());
    assert!(matches!(pipeline.step(&slot, &mut worker).unwrap(), StepOutcome::InferenceBusy));
    assert!(slot.has_frame());
    assert!(!slot.is_claimed());
    assert!(pipeline.rigs().is_empty());

    let deadline = Instant::now() + Duration::from_secs(5);
    let outcome = loop {
        match pipeline.step(&slot, &mut worker).unwrap() {
            StepOutcome::InferenceBusy if Instant::now() < deadline => {
                std::thread::sleep(Duration::from_millis(10));
            }
            other => break other,
        }
    };
    // 遅れた結果は捨てられ、残っていたフレームが処理される
    assert!(matches!(outcome, StepOutcome::Processed { detected: 1 }));
    assert!(!slot.has_frame());
    assert_eq!(pipeline.arena().len(), 1);
}
