//! Calibration store: the operator-tuned scale / offset / crop values, in both
//! slider space (t ∈ [0, 1]) and real units.

pub mod ui;

pub use ui::{CalibrationState, CalibrationUi, PointerEvent};

use crate::config::CalibrationConfig;

pub const SCALE_MIN: f32 = 0.2;
pub const SCALE_MAX: f32 = 3.0;
/// cropRight - cropLeft の最小幅
pub const MIN_CROP_SPAN: f32 = 0.05;

/// 確定済みのキャリブレーション値（実単位）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationParams {
    pub scale: f32,
    /// ピクセル
    pub offset_x: i32,
    /// ピクセル
    pub offset_y: i32,
    pub crop_left: f32,
    pub crop_right: f32,
}

impl Default for CalibrationParams {
    fn default() -> Self {
        Self {
            scale: 1.0,
            offset_x: 0,
            offset_y: 0,
            crop_left: 0.0,
            crop_right: 1.0,
        }
    }
}

impl CalibrationParams {
    /// 設定ファイルの初期値。範囲外やクロップ幅不足は丸める
    pub fn from_config(config: &CalibrationConfig) -> Self {
        let crop_left = config.crop_left.clamp(0.0, 1.0 - MIN_CROP_SPAN);
        let crop_right = config.crop_right.max(crop_left + MIN_CROP_SPAN).min(1.0);
        Self {
            scale: config.scale.clamp(SCALE_MIN, SCALE_MAX),
            offset_x: config.offset_x,
            offset_y: config.offset_y,
            crop_left,
            crop_right,
        }
    }

    pub fn offset(&self) -> (i32, i32) {
        (self.offset_x, self.offset_y)
    }
}

/// スライダーの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Scale,
    OffsetX,
    OffsetY,
    CropLeft,
    CropRight,
}

impl Control {
    pub const ALL: [Control; 5] = [
        Control::Scale,
        Control::OffsetX,
        Control::OffsetY,
        Control::CropLeft,
        Control::CropRight,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Control::Scale => "Scale",
            Control::OffsetX => "Offset X",
            Control::OffsetY => "Offset Y",
            Control::CropLeft => "Crop Left",
            Control::CropRight => "Crop Right",
        }
    }
}

/// 編集中のスライダー値。すべて [0, 1]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SliderValues {
    pub scale: f32,
    pub offset_x: f32,
    pub offset_y: f32,
    pub crop_left: f32,
    pub crop_right: f32,
}

impl SliderValues {
    /// half_window: オフセットの最大値（ウィンドウの半分、整数）
    pub fn from_params(params: &CalibrationParams, half_window: (i32, i32)) -> Self {
        Self {
            scale: ((params.scale - SCALE_MIN) / (SCALE_MAX - SCALE_MIN)).clamp(0.0, 1.0),
            offset_x: offset_to_t(params.offset_x, half_window.0),
            offset_y: offset_to_t(params.offset_y, half_window.1),
            crop_left: params.crop_left,
            crop_right: params.crop_right,
        }
    }

    pub fn to_params(&self, half_window: (i32, i32)) -> CalibrationParams {
        CalibrationParams {
            scale: self.scale_value(),
            offset_x: t_to_offset(self.offset_x, half_window.0),
            offset_y: t_to_offset(self.offset_y, half_window.1),
            crop_left: self.crop_left,
            crop_right: self.crop_right,
        }
    }

    pub fn scale_value(&self) -> f32 {
        SCALE_MIN + self.scale * (SCALE_MAX - SCALE_MIN)
    }

    pub fn get(&self, control: Control) -> f32 {
        match control {
            Control::Scale => self.scale,
            Control::OffsetX => self.offset_x,
            Control::OffsetY => self.offset_y,
            Control::CropLeft => self.crop_left,
            Control::CropRight => self.crop_right,
        }
    }

    /// 1つのスライダーを更新する。クロップは編集時点で最小幅を保つ
    pub fn set(&mut self, control: Control, t: f32) {
        let t = t.clamp(0.0, 1.0);
        match control {
            Control::Scale => self.scale = t,
            Control::OffsetX => self.offset_x = t,
            Control::OffsetY => self.offset_y = t,
            Control::CropLeft => self.crop_left = t.min(self.crop_right - MIN_CROP_SPAN),
            Control::CropRight => self.crop_right = t.max(self.crop_left + MIN_CROP_SPAN),
        }
    }
}

fn offset_to_t(offset: i32, max: i32) -> f32 {
    if max == 0 {
        return 0.5;
    }
    ((offset + max) as f32 / (2 * max) as f32).clamp(0.0, 1.0)
}

fn t_to_offset(t: f32, max: i32) -> i32 {
    (t * 2.0 * max as f32 - max as f32).round() as i32
}
