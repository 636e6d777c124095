use anyhow::Result;
use image::RgbImage;

use super::keypoint::Pose;

/// 姿勢推定モデルの出力契約
///
/// 入力画像と同じ座標系で、検出された人物ごとの17点を検出順に返す。
/// 空のVecは「検出なし」。
pub trait KeypointSource: Send {
    fn detect(&mut self, image: &RgbImage) -> Result<Vec<Pose>>;
}

impl<F> KeypointSource for F
where
    F: FnMut(&RgbImage) -> Result<Vec<Pose>> + Send,
{
    fn detect(&mut self, image: &RgbImage) -> Result<Vec<Pose>> {
        self(image)
    }
}
