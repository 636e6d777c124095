use image::RgbImage;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Mutex, MutexGuard};

const EMPTY: u8 = 0;
const FULL: u8 = 1;
const CLAIMED: u8 = 2;

/// `FrameSlot::offer` の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferStatus {
    /// 空きスロットに格納した
    Stored,
    /// 未消費のフレームを上書きした
    Replaced,
    /// 消費中なので受け付けなかった
    Busy,
}

/// 上流フレームの受け渡し口（単一プロデューサ／単一コンシューマ）
///
/// 状態は EMPTY / FULL / CLAIMED。コンシューマは FULL→CLAIMED の CAS で
/// フレームを確保し、`ClaimedFrame` を落とした時点で EMPTY に戻す。
/// CLAIMED の間、プロデューサの書き込みは拒否される。
pub struct FrameSlot {
    state: AtomicU8,
    frame: Mutex<Option<RgbImage>>,
}

impl Default for FrameSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSlot {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(EMPTY),
            frame: Mutex::new(None),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<RgbImage>> {
        self.frame.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// 最新フレームを置く。未消費のフレームは捨てられる
    pub fn offer(&self, image: RgbImage) -> OfferStatus {
        if self.state.load(Ordering::Acquire) == CLAIMED {
            return OfferStatus::Busy;
        }

        let mut guard = self.lock();
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            if current == CLAIMED {
                return OfferStatus::Busy;
            }
            match self
                .state
                .compare_exchange(current, FULL, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }
        *guard = Some(image);

        if current == FULL {
            OfferStatus::Replaced
        } else {
            OfferStatus::Stored
        }
    }

    /// FULL なら確保してフレームを取り出す
    pub fn claim(&self) -> Option<ClaimedFrame<'_>> {
        self.state
            .compare_exchange(FULL, CLAIMED, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;

        match self.lock().take() {
            Some(image) => Some(ClaimedFrame { slot: self, image }),
            None => {
                self.state.store(EMPTY, Ordering::Release);
                None
            }
        }
    }

    /// 消費せずに最新フレームの複製を得る（キャリブレーションのプレビュー用）
    pub fn peek(&self) -> Option<RgbImage> {
        self.lock().clone()
    }

    pub fn is_claimed(&self) -> bool {
        self.state.load(Ordering::Acquire) == CLAIMED
    }

    pub fn has_frame(&self) -> bool {
        self.state.load(Ordering::Acquire) == FULL
    }
}

/// 確保中のフレーム。drop でスロットを解放する
pub struct ClaimedFrame<'a> {
    slot: &'a FrameSlot,
    image: RgbImage,
}

impl ClaimedFrame<'_> {
    pub fn image(&self) -> &RgbImage {
        &self.image
    }
}

impl std::ops::Deref for ClaimedFrame<'_> {
    type Target = RgbImage;

    fn deref(&self) -> &RgbImage {
        &self.image
    }
}

impl Drop for ClaimedFrame<'_> {
    fn drop(&mut self) {
        self.slot.state.store(EMPTY, Ordering::Release);
    }
}
