use anyhow::{Context, Result};
use image::imageops::{self, FilterType};
use image::RgbImage;
use ndarray::Array4;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use std::path::Path;

use super::keypoint::{KeypointIndex, Pose};
use super::source::KeypointSource;
use crate::config::ModelConfig;

/// box(4) + person score(1) + 17 × (x, y, conf)
const POSE_FEATURES: usize = 4 + 1 + KeypointIndex::COUNT * 3;

/// レターボックスの余白色 (114/255)
const PAD_VALUE: f32 = 114.0 / 255.0;

/// YOLO-pose (Ultralytics形式) のONNXモデルを使ったキーポイント検出
pub struct YoloPoseSource {
    session: Session,
    input_size: u32,
    score_threshold: f32,
    iou_threshold: f32,
}

impl YoloPoseSource {
    pub fn new<P: AsRef<Path>>(model_path: P, config: &ModelConfig) -> Result<Self> {
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .commit_from_file(model_path.as_ref())
            .context("Failed to load ONNX model")?;

        Ok(Self {
            session,
            input_size: config.input_size,
            score_threshold: config.score_threshold,
            iou_threshold: config.iou_threshold,
        })
    }
}

impl KeypointSource for YoloPoseSource {
    fn detect(&mut self, image: &RgbImage) -> Result<Vec<Pose>> {
        let (input, letterbox) = letterbox(image, self.input_size);
        let (score_threshold, iou_threshold) = (self.score_threshold, self.iou_threshold);

        let input_tensor = Tensor::from_array(input)?;
        let outputs = self
            .session
            .run(ort::inputs!["images" => input_tensor])
            .context("Inference failed")?;

        // 出力は [1, 56, N]
        let (shape, data) = outputs["output0"]
            .try_extract_tensor::<f32>()
            .context("Failed to extract output tensor")?;
        let shape: Vec<usize> = shape.iter().map(|&d| d as usize).collect();

        Ok(decode_poses(data, &shape, &letterbox, score_threshold, iou_threshold))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub scale: f32,
    pub pad_x: f32,
    pub pad_y: f32,
}

impl Letterbox {
    /// モデル入力座標 → 元画像座標
    pub fn unmap(&self, x: f32, y: f32) -> (f32, f32) {
        ((x - self.pad_x) / self.scale, (y - self.pad_y) / self.scale)
    }
}

/// アスペクト比を保ったまま size×size に収め、[1, 3, size, size] (0.0-1.0) にする
pub fn letterbox(image: &RgbImage, size: u32) -> (Array4<f32>, Letterbox) {
    let (w, h) = image.dimensions();
    let scale = (size as f32 / w.max(1) as f32).min(size as f32 / h.max(1) as f32);
    let new_w = ((w as f32 * scale).round() as u32).clamp(1, size);
    let new_h = ((h as f32 * scale).round() as u32).clamp(1, size);
    let pad_x = (size - new_w) / 2;
    let pad_y = (size - new_h) / 2;

    let resized = imageops::resize(image, new_w, new_h, FilterType::Triangle);

    let s = size as usize;
    let mut tensor = Array4::<f32>::from_elem((1, 3, s, s), PAD_VALUE);
    for (x, y, pixel) in resized.enumerate_pixels() {
        let ty = (y + pad_y) as usize;
        let tx = (x + pad_x) as usize;
        for c in 0..3 {
            tensor[[0, c, ty, tx]] = pixel[c] as f32 / 255.0;
        }
    }

    (
        tensor,
        Letterbox {
            scale,
            pad_x: pad_x as f32,
            pad_y: pad_y as f32,
        },
    )
}

struct Candidate {
    score: f32,
    bbox: [f32; 4],
    pose: Pose,
}

/// 生出力から人物ごとのPoseを取り出す。スコア降順（= 検出順）
pub fn decode_poses(
    output: &[f32],
    shape: &[usize],
    letterbox: &Letterbox,
    score_threshold: f32,
    iou_threshold: f32,
) -> Vec<Pose> {
    if shape.len() != 3 || output.is_empty() {
        return Vec::new();
    }
    // [1, features, N] と [1, N, features] の両方を受け付ける
    let features_first =
        shape[1] >= POSE_FEATURES && (shape[2] < POSE_FEATURES || shape[1] <= shape[2]);
    let (features, count, transposed) = if features_first {
        (shape[1], shape[2], false)
    } else {
        (shape[2], shape[1], true)
    };
    if features < POSE_FEATURES || output.len() < features * count {
        return Vec::new();
    }
    let at = |f: usize, i: usize| {
        if transposed {
            output[i * features + f]
        } else {
            output[f * count + i]
        }
    };

    let mut candidates = Vec::new();
    for i in 0..count {
        let score = at(4, i);
        if !(score > score_threshold) {
            continue;
        }
        let (cx, cy, bw, bh) = (at(0, i), at(1, i), at(2, i), at(3, i));
        let (x1, y1) = letterbox.unmap(cx - bw / 2.0, cy - bh / 2.0);
        let (x2, y2) = letterbox.unmap(cx + bw / 2.0, cy + bh / 2.0);

        let mut xy = [[0.0; 2]; KeypointIndex::COUNT];
        let mut confidences = [0.0; KeypointIndex::COUNT];
        for k in 0..KeypointIndex::COUNT {
            let base = 5 + k * 3;
            let (x, y) = letterbox.unmap(at(base, i), at(base + 1, i));
            xy[k] = [x, y];
            confidences[k] = at(base + 2, i);
        }

        candidates.push(Candidate {
            score,
            bbox: [x1, y1, x2, y2],
            pose: Pose::from_arrays(&xy, &confidences),
        });
    }

    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut kept: Vec<Candidate> = Vec::new();
    for cand in candidates {
        if kept.iter().all(|k| iou(&k.bbox, &cand.bbox) <= iou_threshold) {
            kept.push(cand);
        }
    }
    kept.into_iter().map(|c| c.pose).collect()
}

fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let ix = (a[2].min(b[2]) - a[0].max(b[0])).max(0.0);
    let iy = (a[3].min(b[3]) - a[1].max(b[1])).max(0.0);
    let inter = ix * iy;
    let area_a = (a[2] - a[0]).max(0.0) * (a[3] - a[1]).max(0.0);
    let area_b = (b[2] - b[0]).max(0.0) * (b[3] - b[1]).max(0.0);
    let union = area_a + area_b - inter;
    if union > 0.0 {
        inter / union
    } else {
        0.0
    }
}
