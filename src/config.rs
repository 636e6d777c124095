use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub ingress: IngressConfig,
    #[serde(default)]
    pub smooth: SmoothConfig,
    #[serde(default)]
    pub rig: RigConfig,
    #[serde(default)]
    pub calibration: CalibrationConfig,
    #[serde(default)]
    pub hitbox: HitboxConfig,
    #[serde(default)]
    pub model: ModelConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// ウィンドウ幅（ピクセル）
    #[serde(default = "default_window_width")]
    pub window_width: u32,
    /// ウィンドウ高さ（ピクセル）
    #[serde(default = "default_window_height")]
    pub window_height: u32,
    /// 推論前に画像を左右反転する（自撮りカメラ向け）
    #[serde(default = "default_mirror")]
    pub mirror: bool,
    #[serde(default = "default_target_fps")]
    pub target_fps: usize,
    /// ログ出力ディレクトリ
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
    /// 背景画像（未指定なら単色）
    #[serde(default)]
    pub background: Option<String>,
    /// 可視キーポイントを点で重ね描きする
    #[serde(default)]
    pub debug_keypoints: bool,
    /// キャリブレーション画面の文字に使う TTF/OTF（未指定ならシステムから探す）
    #[serde(default)]
    pub font: Option<String>,
}

fn default_window_width() -> u32 { 1920 }
fn default_window_height() -> u32 { 1080 }
fn default_mirror() -> bool { true }
fn default_target_fps() -> usize { 60 }
fn default_log_dir() -> String { "logs".to_string() }

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            window_width: default_window_width(),
            window_height: default_window_height(),
            mirror: default_mirror(),
            target_fps: default_target_fps(),
            log_dir: default_log_dir(),
            background: None,
            debug_keypoints: false,
            font: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngressConfig {
    /// HTTP待ち受けアドレス
    #[serde(default = "default_ingress_addr")]
    pub addr: String,
    /// 1フレームの最大バイト数
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_ingress_addr() -> String { "0.0.0.0:5000".to_string() }
fn default_max_body_bytes() -> usize { 16 * 1024 * 1024 }

impl Default for IngressConfig {
    fn default() -> Self {
        Self {
            addr: default_ingress_addr(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SmoothConfig {
    /// EMA係数 (1.0 = 平滑化なし)
    #[serde(default = "default_alpha")]
    pub alpha: f32,
    /// この信頼度以上のキーポイントを「検出」とみなす
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,
    /// 追跡スロット数の上限
    #[serde(default = "default_max_subjects")]
    pub max_subjects: usize,
}

fn default_alpha() -> f32 { 0.5 }
fn default_confidence_threshold() -> f32 { 0.5 }
fn default_max_subjects() -> usize { 4 }

impl Default for SmoothConfig {
    fn default() -> Self {
        Self {
            alpha: default_alpha(),
            confidence_threshold: default_confidence_threshold(),
            max_subjects: default_max_subjects(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RigConfig {
    /// この信頼度を超えたキーポイントのみ描画に使う
    #[serde(default = "default_visibility_threshold")]
    pub visibility_threshold: f32,
    /// 頭の幅 = 肩幅 × head_scale
    #[serde(default = "default_head_scale")]
    pub head_scale: f32,
    /// 顔が見えないとき肩中点から持ち上げる量（ピクセル）
    #[serde(default = "default_head_fallback_lift")]
    pub head_fallback_lift: f32,
    /// 肩幅が取れないときの頭の幅。0以下なら頭を描かない
    #[serde(default = "default_head_fallback_size")]
    pub head_fallback_size: f32,
    /// スプライト画像ディレクトリ
    #[serde(default = "default_sprite_dir")]
    pub sprite_dir: String,
}

fn default_visibility_threshold() -> f32 { 0.5 }
fn default_head_scale() -> f32 { 1.5 }
fn default_head_fallback_lift() -> f32 { 40.0 }
fn default_head_fallback_size() -> f32 { 120.0 }
fn default_sprite_dir() -> String { "sprites".to_string() }

impl Default for RigConfig {
    fn default() -> Self {
        Self {
            visibility_threshold: default_visibility_threshold(),
            head_scale: default_head_scale(),
            head_fallback_lift: default_head_fallback_lift(),
            head_fallback_size: default_head_fallback_size(),
            sprite_dir: default_sprite_dir(),
        }
    }
}

/// キャリブレーション画面の初期値
#[derive(Debug, Deserialize, Clone)]
pub struct CalibrationConfig {
    #[serde(default = "default_scale")]
    pub scale: f32,
    #[serde(default)]
    pub offset_x: i32,
    #[serde(default)]
    pub offset_y: i32,
    #[serde(default)]
    pub crop_left: f32,
    #[serde(default = "default_crop_right")]
    pub crop_right: f32,
    /// trueなら画面を出さずに初期値をそのまま使う
    #[serde(default)]
    pub skip: bool,
}

fn default_scale() -> f32 { 1.0 }
fn default_crop_right() -> f32 { 1.0 }

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            scale: default_scale(),
            offset_x: 0,
            offset_y: 0,
            crop_left: 0.0,
            crop_right: default_crop_right(),
            skip: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct HitboxConfig {
    /// OSC送信先 (例: "127.0.0.1:39571")。未指定なら送信しない
    #[serde(default)]
    pub osc_target: Option<String>,
    #[serde(default = "default_osc_address")]
    pub osc_address: String,
}

fn default_osc_address() -> String { "/Rig/Hitbox".to_string() }

impl Default for HitboxConfig {
    fn default() -> Self {
        Self {
            osc_target: None,
            osc_address: default_osc_address(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    /// YOLO-pose ONNXモデル
    #[serde(default = "default_model_path")]
    pub path: String,
    /// 入力解像度（正方形）
    #[serde(default = "default_input_size")]
    pub input_size: u32,
    /// 人物スコア閾値
    #[serde(default = "default_score_threshold")]
    pub score_threshold: f32,
    #[serde(default = "default_iou_threshold")]
    pub iou_threshold: f32,
    /// 推論タイムアウト。超えたら「検出なし」扱い
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_model_path() -> String { "models/yolov8n-pose.onnx".to_string() }
fn default_input_size() -> u32 { 640 }
fn default_score_threshold() -> f32 { 0.5 }
fn default_iou_threshold() -> f32 { 0.45 }
fn default_timeout_ms() -> u64 { 500 }

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: default_model_path(),
            input_size: default_input_size(),
            score_threshold: default_score_threshold(),
            iou_threshold: default_iou_threshold(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Invalid config")?;
        Ok(config)
    }

    /// 読めなければ警告を出してデフォルト設定を返す
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("WARNING: {:#}. Using default config.", e);
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.app.window_width, 1920);
        assert_eq!(config.app.window_height, 1080);
        assert!(config.app.mirror);
        assert_eq!(config.smooth.alpha, 0.5);
        assert_eq!(config.smooth.confidence_threshold, 0.5);
        assert_eq!(config.rig.visibility_threshold, 0.5);
        assert_eq!(config.rig.head_scale, 1.5);
        assert_eq!(config.calibration.crop_right, 1.0);
        assert!(config.hitbox.osc_target.is_none());
        assert!(config.app.font.is_none());
        assert_eq!(config.model.timeout_ms, 500);
    }

    #[test]
    fn test_partial_section() {
        let config = Config::parse(
            r#"
            [app]
            font = "fonts/ui.ttf"

            [smooth]
            alpha = 0.8

            [calibration]
            scale = 1.5
            offset_x = -40
            "#,
        )
        .unwrap();
        assert_eq!(config.app.font.as_deref(), Some("fonts/ui.ttf"));
        assert_eq!(config.smooth.alpha, 0.8);
        assert_eq!(config.smooth.max_subjects, 4);
        assert_eq!(config.calibration.scale, 1.5);
        assert_eq!(config.calibration.offset_x, -40);
        assert_eq!(config.calibration.crop_left, 0.0);
    }

    #[test]
    fn test_invalid_config_is_error() {
        assert!(Config::parse("[smooth]\nalpha = \"fast\"").is_err());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = Config::load_or_default("definitely/not/here.toml");
        assert_eq!(config.ingress.addr, "0.0.0.0:5000");
    }
}
