use anyhow::{Context, Result};
use minifb::{Key, MouseButton, MouseMode, Window, WindowOptions};

use super::canvas::FrameBuffer;
use crate::calibration::PointerEvent;

/// minifbを使用したウィンドウ
pub struct MinifbRenderer {
    window: Window,
    width: usize,
    height: usize,
    mouse_down: bool,
    mouse_pos: (f32, f32),
}

impl MinifbRenderer {
    /// ウィンドウを作成
    pub fn new(title: &str, width: usize, height: usize) -> Result<Self> {
        let window = Window::new(
            title,
            width,
            height,
            WindowOptions {
                resize: false,
                ..WindowOptions::default()
            },
        )
        .context("Failed to open window")?;

        Ok(Self {
            window,
            width,
            height,
            mouse_down: false,
            mouse_pos: (0.0, 0.0),
        })
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width as u32, self.height as u32)
    }

    pub fn set_target_fps(&mut self, fps: usize) {
        self.window.set_target_fps(fps);
    }

    pub fn set_title(&mut self, title: &str) {
        self.window.set_title(title);
    }

    /// ウィンドウが開いていて ESC が押されていない
    pub fn is_open(&self) -> bool {
        self.window.is_open() && !self.window.is_key_down(Key::Escape)
    }

    /// ESC と関係なくウィンドウ自体が開いているか
    pub fn window_open(&self) -> bool {
        self.window.is_open()
    }

    pub fn escape_down(&self) -> bool {
        self.window.is_key_down(Key::Escape)
    }

    /// 前回からのマウス状態の変化をポインタイベントにする
    pub fn poll_pointer(&mut self) -> Vec<PointerEvent> {
        let mut events = Vec::new();
        if !self.is_open() {
            events.push(PointerEvent::Quit);
            return events;
        }

        let down = self.window.get_mouse_down(MouseButton::Left);
        let pos = self
            .window
            .get_mouse_pos(MouseMode::Clamp)
            .unwrap_or(self.mouse_pos);

        match (self.mouse_down, down) {
            (false, true) => events.push(PointerEvent::Down { x: pos.0, y: pos.1 }),
            (true, true) if pos != self.mouse_pos => events.push(PointerEvent::Move { x: pos.0, y: pos.1 }),
            (true, false) => events.push(PointerEvent::Up),
            _ => {}
        }

        self.mouse_down = down;
        self.mouse_pos = pos;
        events
    }

    /// バッファをウィンドウに表示
    pub fn present(&mut self, frame: &FrameBuffer) -> Result<()> {
        self.window
            .update_with_buffer(frame.pixels(), self.width, self.height)
            .context("Failed to update window")?;
        Ok(())
    }
}
