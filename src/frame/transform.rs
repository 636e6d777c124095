use image::imageops::{self, FilterType};
use image::RgbImage;

use crate::calibration::CalibrationParams;

/// これ以下の幅になるクロップは無視する（ピクセル）
pub const MIN_CROP_WIDTH: u32 = 10;

/// 推論・描画に使う変換済みフレーム
#[derive(Debug, Clone)]
pub struct DisplayFrame {
    pub image: RgbImage,
    /// ウィンドウ内の左上位置
    pub origin: (i32, i32),
    pub size: (u32, u32),
}

/// 横方向クロップの範囲 [left, right)。幅が MIN_CROP_WIDTH 以下なら None
pub fn crop_band(width: u32, crop_left: f32, crop_right: f32) -> Option<(u32, u32)> {
    let left = (crop_left * width as f32) as u32;
    let right = ((crop_right * width as f32) as u32).min(width);
    if right > left && right - left > MIN_CROP_WIDTH {
        Some((left, right))
    } else {
        None
    }
}

/// 横帯を切り出す。範囲が不正なら元画像のまま
pub fn crop_horizontal(image: &RgbImage, crop_left: f32, crop_right: f32) -> RgbImage {
    match crop_band(image.width(), crop_left, crop_right) {
        Some((left, right)) => {
            imageops::crop_imm(image, left, 0, right - left, image.height()).to_image()
        }
        None => image.clone(),
    }
}

/// round(size × scale)、最小1ピクセル
pub fn display_size(source: (u32, u32), scale: f32) -> (u32, u32) {
    let w = (source.0 as f32 * scale).round().max(1.0) as u32;
    let h = (source.1 as f32 * scale).round().max(1.0) as u32;
    (w, h)
}

/// ウィンドウ中央に置いたときの左上 + オフセット
pub fn centered_origin(window: (u32, u32), size: (u32, u32), offset: (i32, i32)) -> (i32, i32) {
    let x = (window.0 as i32 - size.0 as i32).div_euclid(2) + offset.0;
    let y = (window.1 as i32 - size.1 as i32).div_euclid(2) + offset.1;
    (x, y)
}

/// クロップ → 拡縮 → 反転 → 配置
pub fn transform(
    raw: &RgbImage,
    calib: &CalibrationParams,
    window: (u32, u32),
    mirror: bool,
) -> DisplayFrame {
    let cropped = crop_horizontal(raw, calib.crop_left, calib.crop_right);
    let size = display_size(cropped.dimensions(), calib.scale);

    let mut image = if size == cropped.dimensions() {
        cropped
    } else {
        imageops::resize(&cropped, size.0, size.1, FilterType::Triangle)
    };
    if mirror {
        imageops::flip_horizontal_in_place(&mut image);
    }

    DisplayFrame {
        image,
        origin: centered_origin(window, size, calib.offset()),
        size,
    }
}
