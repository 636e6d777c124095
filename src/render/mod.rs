pub mod canvas;
pub mod draw;
pub mod sprites;
pub mod text;
#[cfg(feature = "desktop")]
pub mod window;

pub use canvas::{rgb, Canvas, FrameBuffer};
pub use draw::{draw_keypoints, draw_rig};
pub use sprites::SpriteSet;
pub use text::UiFont;
#[cfg(feature = "desktop")]
pub use window::MinifbRenderer;
