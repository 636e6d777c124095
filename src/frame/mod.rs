pub mod slot;
pub mod transform;

pub use slot::{ClaimedFrame, FrameSlot, OfferStatus};
pub use transform::{transform, DisplayFrame};
