use image::{RgbImage, RgbaImage};

use super::text::UiFont;
use crate::geometry::{rotated_extent, Rect};

/// 0RGB 形式の色
pub const fn rgb(r: u8, g: u8, b: u8) -> u32 {
    ((r as u32) << 16) | ((g as u32) << 8) | b as u32
}

/// 描画先
pub trait Canvas {
    fn size(&self) -> (u32, u32);

    fn fill(&mut self, color: u32);

    fn fill_rect(&mut self, rect: Rect, color: u32);

    /// 矩形の枠線（内側に thickness ピクセル）
    fn stroke_rect(&mut self, rect: Rect, thickness: u32, color: u32) {
        let t = thickness.min(rect.width).min(rect.height);
        if t == 0 {
            return;
        }
        self.fill_rect(Rect::new(rect.x, rect.y, rect.width, t), color);
        self.fill_rect(Rect::new(rect.x, rect.bottom() - t as i32, rect.width, t), color);
        self.fill_rect(Rect::new(rect.x, rect.y, t, rect.height), color);
        self.fill_rect(Rect::new(rect.right() - t as i32, rect.y, t, rect.height), color);
    }

    fn fill_circle(&mut self, cx: i32, cy: i32, radius: i32, color: u32);

    /// 画像を等倍で origin（左上）に置く
    fn blit_image(&mut self, image: &RgbImage, origin: (i32, i32));

    /// スプライトを size に拡縮し、center を中心に rotation_deg（反時計回り）回して合成する
    fn blit_sprite(&mut self, sprite: &RgbaImage, center: (f32, f32), size: (u32, u32), rotation_deg: f32);

    /// 文字列を origin（左上）から描く
    fn draw_text(&mut self, font: &UiFont, text: &str, origin: (i32, i32), px: f32, color: u32) {
        let (w, h) = font.measure(text, px);
        let center = (origin.0 as f32 + w as f32 / 2.0, origin.1 as f32 + h as f32 / 2.0);
        self.draw_text_centered(font, text, center, px, color);
    }

    fn draw_text_centered(&mut self, font: &UiFont, text: &str, center: (f32, f32), px: f32, color: u32) {
        let image = font.render(text, px, color);
        let size = image.dimensions();
        self.blit_sprite(&image, center, size, 0.0);
    }
}

/// ソフトウェア描画用のフレームバッファ
pub struct FrameBuffer {
    width: u32,
    height: u32,
    pixels: Vec<u32>,
}

impl FrameBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0u32; width as usize * height as usize],
        }
    }

    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    /// 範囲外は None
    pub fn pixel(&self, x: i32, y: i32) -> Option<u32> {
        self.index(x, y).map(|i| self.pixels[i])
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x >= 0 && y >= 0 && (x as u32) < self.width && (y as u32) < self.height {
            Some(y as usize * self.width as usize + x as usize)
        } else {
            None
        }
    }

    fn set_pixel(&mut self, x: i32, y: i32, color: u32) {
        if let Some(i) = self.index(x, y) {
            self.pixels[i] = color;
        }
    }

    fn blend_pixel(&mut self, x: i32, y: i32, rgba: [u8; 4]) {
        let Some(i) = self.index(x, y) else {
            return;
        };
        let a = rgba[3] as u32;
        if a == 0 {
            return;
        }
        if a == 255 {
            self.pixels[i] = rgb(rgba[0], rgba[1], rgba[2]);
            return;
        }
        let dst = self.pixels[i];
        let mix = |src: u8, shift: u32| {
            let d = (dst >> shift) & 0xFF;
            (src as u32 * a + d * (255 - a)) / 255
        };
        self.pixels[i] = (mix(rgba[0], 16) << 16) | (mix(rgba[1], 8) << 8) | mix(rgba[2], 0);
    }

    /// 描画対象の範囲に切り詰めた矩形 (x0, y0, x1, y1)
    fn clip(&self, rect: Rect) -> Option<(i32, i32, i32, i32)> {
        let x0 = rect.left().max(0);
        let y0 = rect.top().max(0);
        let x1 = rect.right().min(self.width as i32);
        let y1 = rect.bottom().min(self.height as i32);
        if x0 < x1 && y0 < y1 {
            Some((x0, y0, x1, y1))
        } else {
            None
        }
    }
}

impl Canvas for FrameBuffer {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn fill(&mut self, color: u32) {
        self.pixels.fill(color);
    }

    fn fill_rect(&mut self, rect: Rect, color: u32) {
        let Some((x0, y0, x1, y1)) = self.clip(rect) else {
            return;
        };
        let w = self.width as usize;
        for y in y0..y1 {
            let row = y as usize * w;
            self.pixels[row + x0 as usize..row + x1 as usize].fill(color);
        }
    }

    fn fill_circle(&mut self, cx: i32, cy: i32, radius: i32, color: u32) {
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if dx * dx + dy * dy <= radius * radius {
                    self.set_pixel(cx + dx, cy + dy, color);
                }
            }
        }
    }

    fn blit_image(&mut self, image: &RgbImage, origin: (i32, i32)) {
        let rect = Rect::new(origin.0, origin.1, image.width(), image.height());
        let Some((x0, y0, x1, y1)) = self.clip(rect) else {
            return;
        };
        for y in y0..y1 {
            for x in x0..x1 {
                let p = image.get_pixel((x - origin.0) as u32, (y - origin.1) as u32);
                self.set_pixel(x, y, rgb(p[0], p[1], p[2]));
            }
        }
    }

    fn blit_sprite(&mut self, sprite: &RgbaImage, center: (f32, f32), size: (u32, u32), rotation_deg: f32) {
        let (sw, sh) = sprite.dimensions();
        if sw == 0 || sh == 0 || size.0 == 0 || size.1 == 0 {
            return;
        }
        let bounds = Rect::from_center(
            (center.0.round() as i32, center.1.round() as i32),
            rotated_extent(size, rotation_deg),
        );
        let Some((x0, y0, x1, y1)) = self.clip(bounds) else {
            return;
        };

        // 画面上の点をスプライトのローカル座標へ逆回転
        let (sin, cos) = (-rotation_deg).to_radians().sin_cos();
        let (w, h) = (size.0 as f32, size.1 as f32);
        let (kx, ky) = (sw as f32 / w, sh as f32 / h);

        for y in y0..y1 {
            for x in x0..x1 {
                let u = x as f32 + 0.5 - center.0;
                let v = y as f32 + 0.5 - center.1;
                let lx = u * cos + v * sin + w / 2.0;
                let ly = -u * sin + v * cos + h / 2.0;
                if lx < 0.0 || ly < 0.0 || lx >= w || ly >= h {
                    continue;
                }
                let sx = ((lx * kx) as u32).min(sw - 1);
                let sy = ((ly * ky) as u32).min(sh - 1);
                self.blend_pixel(x, y, sprite.get_pixel(sx, sy).0);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, Rgba};

    const RED: u32 = 0xFF0000;

    #[test]
    fn test_fill_rect_clips() {
        let mut fb = FrameBuffer::new(10, 10);
        fb.fill_rect(Rect::new(-5, 8, 8, 8), RED);
        assert_eq!(fb.pixel(0, 9), Some(RED));
        assert_eq!(fb.pixel(2, 9), Some(RED));
        assert_eq!(fb.pixel(3, 9), Some(0));
        assert_eq!(fb.pixel(0, 7), Some(0));
        assert_eq!(fb.pixel(10, 0), None);
    }

    #[test]
    fn test_stroke_rect_leaves_inside_empty() {
        let mut fb = FrameBuffer::new(20, 20);
        fb.stroke_rect(Rect::new(2, 2, 10, 10), 2, RED);
        assert_eq!(fb.pixel(2, 2), Some(RED));
        assert_eq!(fb.pixel(11, 11), Some(RED));
        assert_eq!(fb.pixel(6, 6), Some(0));
    }

    #[test]
    fn test_blit_image_offset() {
        let mut fb = FrameBuffer::new(4, 4);
        let image = RgbImage::from_pixel(2, 2, Rgb([0, 255, 0]));
        fb.blit_image(&image, (3, -1));
        assert_eq!(fb.pixel(3, 0), Some(0x00FF00));
        assert_eq!(fb.pixel(3, 1), Some(0));
        assert_eq!(fb.pixel(2, 0), Some(0));
    }

    #[test]
    fn test_blit_sprite_unrotated_covers_size() {
        let mut fb = FrameBuffer::new(40, 40);
        let sprite = RgbaImage::from_pixel(5, 5, Rgba([255, 0, 0, 255]));
        fb.blit_sprite(&sprite, (20.0, 20.0), (10, 4), 0.0);
        assert_eq!(fb.pixel(15, 18), Some(RED));
        assert_eq!(fb.pixel(24, 21), Some(RED));
        assert_eq!(fb.pixel(25, 20), Some(0));
        assert_eq!(fb.pixel(20, 22), Some(0));
    }

    #[test]
    fn test_blit_sprite_rotated_quarter_turn() {
        let mut fb = FrameBuffer::new(40, 40);
        // 左半分が赤、右半分が緑
        let sprite = RgbaImage::from_fn(10, 2, |x, _| {
            if x < 5 {
                Rgba([255, 0, 0, 255])
            } else {
                Rgba([0, 255, 0, 255])
            }
        });
        // 反時計回り90° → スプライトの右端が上を向く
        fb.blit_sprite(&sprite, (20.0, 20.0), (20, 4), 90.0);
        assert_eq!(fb.pixel(20, 12), Some(0x00FF00));
        assert_eq!(fb.pixel(20, 27), Some(RED));
        assert_eq!(fb.pixel(12, 20), Some(0));
    }

    #[test]
    fn test_alpha_blend() {
        let mut fb = FrameBuffer::new(2, 2);
        fb.fill(0x0000FF);
        let transparent = RgbaImage::from_pixel(2, 2, Rgba([255, 0, 0, 0]));
        fb.blit_sprite(&transparent, (1.0, 1.0), (2, 2), 0.0);
        assert_eq!(fb.pixel(0, 0), Some(0x0000FF));

        let half = RgbaImage::from_pixel(2, 2, Rgba([255, 0, 0, 128]));
        fb.blit_sprite(&half, (1.0, 1.0), (2, 2), 0.0);
        let p = fb.pixel(0, 0).unwrap();
        assert_eq!(p >> 16, 128);
        assert_eq!(p & 0xFF, 127);
    }

    #[test]
    fn test_draw_text_stays_right_of_origin() {
        let Some(font) = UiFont::system() else {
            eprintln!("no system font found, skipping");
            return;
        };
        let mut fb = FrameBuffer::new(200, 60);
        fb.draw_text(&font, "Offset X", (50, 20), 20.0, RED);
        let (w, _) = font.measure("Offset X", 20.0);
        let painted: Vec<(i32, i32)> = (0..60)
            .flat_map(|y| (0..200).map(move |x| (x, y)))
            .filter(|&(x, y)| fb.pixel(x, y) != Some(0))
            .collect();
        assert!(!painted.is_empty());
        assert!(painted.iter().all(|&(x, _)| x >= 48 && x <= 52 + w as i32));
    }
}
