pub mod smooth;
pub mod subjects;

pub use smooth::KeypointSmoother;
pub use subjects::{placement_anchor, FrameGeometry, SubjectArena, TrackedSubject};
