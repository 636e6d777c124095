pub mod bones;
pub mod builder;
pub mod hitbox;

pub use bones::{Bone, SpriteKind, SpriteSizes, LIMB_SEGMENTS};
pub use builder::{build_rig, head_center, PlacedBone, Rig, RigParams};
pub use hitbox::{HitboxTracker, OscHitboxSender};
