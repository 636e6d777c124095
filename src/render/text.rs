use ab_glyph::{FontVec, PxScale};
use anyhow::{Context, Result};
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_text_mut, text_size};

/// 設定でフォントを指定しないときに探す場所
pub const SYSTEM_FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// 画面上の文字描画用フォント
pub struct UiFont {
    font: FontVec,
}

impl UiFont {
    pub fn load(path: &str) -> Result<Self> {
        let data = std::fs::read(path).with_context(|| format!("Failed to read font {}", path))?;
        let font = FontVec::try_from_vec(data).with_context(|| format!("Invalid font {}", path))?;
        Ok(Self { font })
    }

    /// 最初に読み込めた候補
    pub fn load_first(candidates: &[&str]) -> Option<Self> {
        candidates.iter().find_map(|path| Self::load(path).ok())
    }

    pub fn system() -> Option<Self> {
        Self::load_first(SYSTEM_FONT_CANDIDATES)
    }

    /// 描いたときの大きさ (幅, 高さ)
    pub fn measure(&self, text: &str, px: f32) -> (u32, u32) {
        text_size(PxScale::from(px), &self.font, text)
    }

    /// 透明な背景に文字だけを描いた画像。アルファがグリフの濃さ
    pub fn render(&self, text: &str, px: f32, color: u32) -> RgbaImage {
        let (w, h) = self.measure(text, px);
        let [_, r, g, b] = color.to_be_bytes();
        // 上下のはみ出し分の余白
        let pad = (px / 4.0).ceil() as u32;
        let mut image = RgbaImage::from_pixel(w + pad * 2, h + pad * 2, Rgba([r, g, b, 0]));
        draw_text_mut(
            &mut image,
            Rgba([r, g, b, 255]),
            pad as i32,
            pad as i32,
            PxScale::from(px),
            &self.font,
            text,
        );
        image
    }
}
