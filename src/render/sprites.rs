use image::{Rgba, RgbaImage};
use std::path::Path;

use crate::rig::{SpriteKind, SpriteSizes};

/// 部位ごとのスプライト画像
pub struct SpriteSet {
    images: Vec<RgbaImage>,
    missing: Vec<SpriteKind>,
}

impl SpriteSet {
    /// dir からスプライトを読む。読めないものは単色の代替画像にする
    pub fn load<P: AsRef<Path>>(dir: P) -> Self {
        let dir = dir.as_ref();
        let mut images = Vec::with_capacity(SpriteKind::COUNT);
        let mut missing = Vec::new();
        for kind in SpriteKind::ALL {
            match image::open(dir.join(kind.file_name())) {
                Ok(img) => images.push(img.to_rgba8()),
                Err(_) => {
                    missing.push(kind);
                    images.push(placeholder(kind));
                }
            }
        }
        Self { images, missing }
    }

    /// すべて代替画像
    pub fn placeholders() -> Self {
        Self {
            images: SpriteKind::ALL.iter().map(|&k| placeholder(k)).collect(),
            missing: SpriteKind::ALL.to_vec(),
        }
    }

    pub fn get(&self, kind: SpriteKind) -> &RgbaImage {
        &self.images[kind as usize]
    }

    /// 読み込めず代替画像になった種別
    pub fn missing(&self) -> &[SpriteKind] {
        &self.missing
    }

    pub fn sizes(&self) -> SpriteSizes {
        let mut sizes = SpriteSizes::default();
        for kind in SpriteKind::ALL {
            sizes.set(kind, self.get(kind).dimensions());
        }
        sizes
    }
}

fn placeholder_color(kind: SpriteKind) -> Rgba<u8> {
    match kind {
        SpriteKind::Head => Rgba([255, 214, 170, 255]),
        SpriteKind::Torso => Rgba([70, 110, 200, 255]),
        SpriteKind::Bicep | SpriteKind::Forearm => Rgba([235, 180, 140, 255]),
        SpriteKind::Thigh | SpriteKind::Shin => Rgba([60, 60, 80, 255]),
    }
}

fn placeholder(kind: SpriteKind) -> RgbaImage {
    let (w, h) = kind.placeholder_size();
    RgbaImage::from_pixel(w, h, placeholder_color(kind))
}
