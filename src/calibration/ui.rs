use image::imageops::{self, FilterType};
use image::RgbImage;

use super::{CalibrationParams, Control, SliderValues};
use crate::frame::transform::crop_horizontal;
use crate::geometry::Rect;
use crate::render::{rgb, Canvas, UiFont};

const BACKGROUND: u32 = rgb(30, 30, 30);
const TRACK: u32 = rgb(50, 50, 50);
const TRACK_INNER: u32 = rgb(80, 80, 80);
const KNOB: u32 = rgb(200, 200, 200);
const BUTTON: u32 = rgb(70, 140, 70);
const GUIDE: u32 = rgb(255, 0, 0);
const TEXT: u32 = rgb(255, 255, 255);
const TEXT_DIM: u32 = rgb(200, 200, 200);

const LABEL_PX: f32 = 18.0;
const BUTTON_PX: f32 = 26.0;
const GUIDE_PX: f32 = 28.0;
const GUIDE_TEXT: &str = "Adjust settings until body fits within this region";
const BUTTON_TEXT: &str = "Configure";
const WAITING_TEXT: &str = "Waiting for camera...";

const SLIDER_HEIGHT: u32 = 24;
/// 体を収める目安枠
const GUIDE_SIZE: (u32, u32) = (100, 175);
const PLACEHOLDER_SIZE: (u32, u32) = (640, 480);
/// プレビューを持ち上げる量
const PREVIEW_LIFT: i32 = 60;

/// キャリブレーション画面への入力
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down { x: f32, y: f32 },
    Move { x: f32, y: f32 },
    Up,
    /// ウィンドウを閉じた / ESC
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CalibrationState {
    Editing,
    Accepted(CalibrationParams),
    /// 開始時の値のまま
    Cancelled(CalibrationParams),
}

impl CalibrationState {
    pub fn is_done(&self) -> bool {
        !matches!(self, CalibrationState::Editing)
    }

    /// 確定・取消後に使う値
    pub fn params(&self) -> Option<CalibrationParams> {
        match self {
            CalibrationState::Editing => None,
            CalibrationState::Accepted(p) | CalibrationState::Cancelled(p) => Some(*p),
        }
    }
}

/// スライダー5本と確定ボタンからなるキャリブレーション画面
pub struct CalibrationUi {
    window: (u32, u32),
    initial: CalibrationParams,
    values: SliderValues,
    dragging: Option<Control>,
    state: CalibrationState,
    /// なければ文字は描かない
    font: Option<UiFont>,
}

impl CalibrationUi {
    pub fn new(initial: CalibrationParams, window: (u32, u32)) -> Self {
        let half = half_window(window);
        Self {
            window,
            initial,
            values: SliderValues::from_params(&initial, half),
            dragging: None,
            state: CalibrationState::Editing,
            font: None,
        }
    }

    pub fn with_font(mut self, font: Option<UiFont>) -> Self {
        self.font = font;
        self
    }

    pub fn state(&self) -> CalibrationState {
        self.state
    }

    pub fn values(&self) -> &SliderValues {
        &self.values
    }

    pub fn dragging(&self) -> Option<Control> {
        self.dragging
    }

    /// 編集中の値（実単位）
    pub fn current(&self) -> CalibrationParams {
        self.values.to_params(half_window(self.window))
    }

    /// 終了状態になった後の入力は無視する
    pub fn handle(&mut self, event: PointerEvent) -> CalibrationState {
        if self.state.is_done() {
            return self.state;
        }
        match event {
            PointerEvent::Quit => {
                self.dragging = None;
                self.state = CalibrationState::Cancelled(self.initial);
            }
            PointerEvent::Down { x, y } => {
                let (px, py) = (x.floor() as i32, y.floor() as i32);
                let hit = Control::ALL
                    .iter()
                    .copied()
                    .find(|&c| self.slider_rect(c).contains(px, py));
                match hit {
                    Some(control) => self.dragging = Some(control),
                    None if self.accept_button().contains(px, py) => {
                        self.state = CalibrationState::Accepted(self.current());
                    }
                    None => {}
                }
            }
            PointerEvent::Move { x, .. } => {
                if let Some(control) = self.dragging {
                    let rect = self.slider_rect(control);
                    let t = (x - rect.x as f32) / rect.width.max(1) as f32;
                    self.values.set(control, t);
                }
            }
            PointerEvent::Up => self.dragging = None,
        }
        self.state
    }

    pub fn slider_rect(&self, control: Control) -> Rect {
        let i = Control::ALL.iter().position(|&c| c == control).unwrap_or(0) as i32;
        let (w, h) = self.window;
        Rect::new(
            50,
            h as i32 - 260 + 40 * i,
            w.saturating_sub(100),
            SLIDER_HEIGHT,
        )
    }

    pub fn accept_button(&self) -> Rect {
        let (w, h) = self.window;
        Rect::new(w as i32 / 2 - 80, h as i32 - 70, 160, 40)
    }

    pub fn guide_rect(&self) -> Rect {
        let (w, h) = (self.window.0 as i32, self.window.1 as i32);
        let (gw, gh) = GUIDE_SIZE;
        Rect::new(
            (w - gw as i32).div_euclid(2),
            (h - gh as i32).div_euclid(2) + 150,
            gw,
            gh,
        )
    }

    /// クロップ後サイズ source のプレビュー配置
    ///
    /// 幅80%・高さ60%に収まる倍率に scale を掛け、中央から少し上に置く。
    pub fn preview_rect(&self, source: (u32, u32)) -> Rect {
        let (w, h) = self.window;
        let params = self.current();
        let max_w = (w as f32 * 0.8).floor();
        let max_h = (h as f32 * 0.6).floor();
        let base_fit = (max_w / source.0.max(1) as f32).min(max_h / source.1.max(1) as f32);

        let fw = (source.0 as f32 * base_fit * params.scale).round().max(1.0) as u32;
        let fh = (source.1 as f32 * base_fit * params.scale).round().max(1.0) as u32;
        let x = (w / 2) as i32 - (fw / 2) as i32 + params.offset_x;
        let y = (h / 2) as i32 - (fh / 2) as i32 - PREVIEW_LIFT + params.offset_y;
        Rect::new(x, y, fw, fh)
    }

    /// ウィンドウタイトル用の現在値
    pub fn title(&self) -> String {
        let p = self.current();
        format!(
            "Calibration | Scale {:.2} | Offset X {} | Offset Y {} | Crop {:.2}-{:.2}",
            p.scale, p.offset_x, p.offset_y, p.crop_left, p.crop_right
        )
    }

    /// 画面全体を描く。frame は未加工の最新フレーム
    pub fn draw<C: Canvas + ?Sized>(&self, canvas: &mut C, frame: Option<&RgbImage>) {
        canvas.fill(BACKGROUND);

        match frame {
            Some(raw) => {
                let cropped = crop_horizontal(raw, self.values.crop_left, self.values.crop_right);
                let rect = self.preview_rect(cropped.dimensions());
                let scaled = imageops::resize(&cropped, rect.width, rect.height, FilterType::Triangle);
                canvas.blit_image(&scaled, (rect.x, rect.y));
            }
            None => {
                let (w, h) = (self.window.0 as i32, self.window.1 as i32);
                let (pw, ph) = PLACEHOLDER_SIZE;
                let placeholder = Rect::new(
                    w / 2 - pw as i32 / 2,
                    h / 2 - ph as i32 / 2 - PREVIEW_LIFT,
                    pw,
                    ph,
                );
                canvas.fill_rect(placeholder, TRACK);
                if let Some(font) = &self.font {
                    canvas.draw_text(font, WAITING_TEXT, (placeholder.x + 12, placeholder.y + 12), LABEL_PX, TEXT_DIM);
                }
            }
        }

        for control in Control::ALL {
            self.draw_slider(canvas, control);
        }

        let guide = self.guide_rect();
        canvas.stroke_rect(guide, 4, GUIDE);
        let button = self.accept_button();
        canvas.fill_rect(button, BUTTON);

        if let Some(font) = &self.font {
            let guide_text_center = (self.window.0 as f32 / 2.0, (guide.bottom() + 20) as f32);
            canvas.draw_text_centered(font, GUIDE_TEXT, guide_text_center, GUIDE_PX, TEXT);
            let (bx, by) = button.center();
            canvas.draw_text_centered(font, BUTTON_TEXT, (bx as f32, by as f32), BUTTON_PX, TEXT);
        }
    }

    fn draw_slider<C: Canvas + ?Sized>(&self, canvas: &mut C, control: Control) {
        let rect = self.slider_rect(control);
        canvas.fill_rect(rect, TRACK);
        let inner_w = rect.width.saturating_sub(8);
        let inner = Rect::new(rect.x + 4, rect.y + 4, inner_w, rect.height.saturating_sub(8));
        canvas.fill_rect(inner, TRACK_INNER);

        let t = self.values.get(control);
        let knob_x = rect.x + 4 + (inner_w as f32 * t) as i32;
        let knob = Rect::new(knob_x - 6, rect.y + rect.height as i32 / 2 - 8, 12, 16);
        canvas.fill_rect(knob, KNOB);

        if let Some(font) = &self.font {
            let label = format!("{}: {:.2}", control.label(), t);
            canvas.draw_text(font, &label, (rect.x, rect.y - 22), LABEL_PX, TEXT);
        }
    }
}

fn half_window(window: (u32, u32)) -> (i32, i32) {
    ((window.0 / 2) as i32, (window.1 / 2) as i32)
}
