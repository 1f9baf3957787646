pub mod capabilities;
pub mod controller;
pub mod localizer;
pub mod loop_worker;

pub use capabilities::{
    ContactPoint, ContactTracker, Detection, FramePacket, FrameSource, HandLandmarks,
    ObjectDetector, SurfaceBox,
};
pub use controller::SensingController;
pub use localizer::{Localization, LocalizerConfig, LocalizerStage, SurfaceLocalizer};
pub use loop_worker::{frame_loop, pump_frames, Capabilities, FrameLoopStats};
