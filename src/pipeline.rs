use anyhow::Result;

use crate::calibration::CalibrationParams;
use crate::config::Config;
use crate::frame::{transform, FrameSlot};
use crate::geometry::Rect;
use crate::pose::{InferenceOutcome, InferenceWorker};
use crate::render::{draw_keypoints, draw_rig, Canvas, SpriteSet};
use crate::rig::{build_rig, HitboxTracker, Rig, RigParams, SpriteSizes};
use crate::tracker::{FrameGeometry, SubjectArena};

/// 1ステップの結果
#[derive(Debug)]
pub enum StepOutcome {
    /// 推論まで完了。検出人数（0なら前の状態を保持）
    Processed { detected: usize },
    /// 推論がタイムアウトした。検出なし扱い
    TimedOut,
    /// 推論が失敗した。検出なし扱い
    Failed(anyhow::Error),
    /// 新しいフレームがない
    NoFrame,
    /// 前の推論がまだ終わっていないのでフレームを取らなかった
    InferenceBusy,
}

/// フレーム取得 → 変換 → 推論 → 平滑化 → リグ → 当たり判定
pub struct FramePipeline {
    calibration: CalibrationParams,
    window: (u32, u32),
    mirror: bool,
    arena: SubjectArena,
    rig_params: RigParams,
    sprite_sizes: SpriteSizes,
    rigs: Vec<Rig>,
    hitbox: HitboxTracker,
}

impl FramePipeline {
    pub fn new(
        calibration: CalibrationParams,
        window: (u32, u32),
        mirror: bool,
        arena: SubjectArena,
        rig_params: RigParams,
        sprite_sizes: SpriteSizes,
    ) -> Self {
        Self {
            calibration,
            window,
            mirror,
            arena,
            rig_params,
            sprite_sizes,
            rigs: Vec::new(),
            hitbox: HitboxTracker::new(),
        }
    }

    pub fn from_config(config: &Config, calibration: CalibrationParams, sprite_sizes: SpriteSizes) -> Self {
        Self::new(
            calibration,
            (config.app.window_width, config.app.window_height),
            config.app.mirror,
            SubjectArena::from_config(&config.smooth),
            RigParams::from_config(&config.rig),
            sprite_sizes,
        )
    }

    /// 1フレーム処理する。フレームは処理が終わるまで確保したまま
    pub fn step(&mut self, slot: &FrameSlot, worker: &mut InferenceWorker) -> Result<StepOutcome> {
        if !worker.is_idle() {
            return Ok(StepOutcome::InferenceBusy);
        }
        let Some(claimed) = slot.claim() else {
            return Ok(StepOutcome::NoFrame);
        };

        let display = transform(claimed.image(), &self.calibration, self.window, self.mirror);
        let geometry = FrameGeometry {
            display_size: display.size,
            window: self.window,
            offset: self.calibration.offset(),
        };

        let outcome = match worker.infer(display.image)? {
            InferenceOutcome::Detected(poses) => {
                self.arena.observe(&poses, &geometry);
                StepOutcome::Processed { detected: poses.len() }
            }
            InferenceOutcome::TimedOut => StepOutcome::TimedOut,
            InferenceOutcome::Failed(e) => StepOutcome::Failed(e),
            InferenceOutcome::Busy => StepOutcome::InferenceBusy,
        };

        self.rebuild_rigs();
        drop(claimed);
        Ok(outcome)
    }

    fn rebuild_rigs(&mut self) {
        self.rigs = self
            .arena
            .subjects()
            .iter()
            .map(|s| build_rig(&s.pose, s.anchor, &self.sprite_sizes, &self.rig_params))
            .collect();
        if let Some(primary) = self.rigs.first() {
            self.hitbox.update(primary);
        }
    }

    pub fn rigs(&self) -> &[Rig] {
        &self.rigs
    }

    pub fn arena(&self) -> &SubjectArena {
        &self.arena
    }

    /// 主人物の頭の当たり判定（隠れている間は最後の値）
    pub fn hitbox(&self) -> Option<Rect> {
        self.hitbox.current()
    }

    pub fn calibration(&self) -> &CalibrationParams {
        &self.calibration
    }

    pub fn draw<C: Canvas + ?Sized>(&self, canvas: &mut C, sprites: &SpriteSet, debug_keypoints: bool) {
        for rig in self.rigs.iter() {
            draw_rig(canvas, rig, sprites);
        }
        if debug_keypoints {
            for subject in self.arena.subjects() {
                draw_keypoints(canvas, &subject.pose, subject.anchor, self.rig_params.visibility_threshold);
            }
        }
    }
}
