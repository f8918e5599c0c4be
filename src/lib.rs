//! Posecast renders short, seamlessly looping clips of a posed humanoid character and exports
//! them as animated GIFs.
//!
//! Every frame is a pure function of loop time:
//!
//! - Load a [`Character`] and snapshot its rest pose into a [`MotionRig`]
//! - Frame it once with the camera pose calculator ([`Shot`])
//! - Per frame: reset the rig, [`evaluate`] a [`MotionPresetId`], render, draw the speech overlay
//! - Stream the frames into a [`FrameSink`], e.g. the [`GifSink`] behind [`export_gif`]
//!
//! The interactive [`PreviewSession`] goes through the same per-frame path as the export, so a
//! preview frame and the exported frame at the same time are identical.
//!
//! Speech text is drawn with the built-in [`overlay::font`], which covers printable ASCII only;
//! other characters, non-Latin scripts included, come out as `?`.
#![forbid(unsafe_code)]

mod foundation;

/// Motion rig, presets and the evaluator.
pub mod animation;
/// Camera framing.
pub mod camera;
/// Character IDs, scene model and loaders.
pub mod character;
/// Encoding sinks.
pub mod encode;
/// GIF export pipeline and request documents.
pub mod export;
/// Speech overlay.
pub mod overlay;
/// Interactive preview.
pub mod preview;
/// Rendering backend.
pub mod render;

pub use crate::foundation::core::{
    Canvas, Fps, FrameIndex, LOOP_DURATION_SECS, Rgba8,
};
pub use crate::foundation::error::{PosecastError, PosecastResult};

pub use crate::animation::evaluator::{MotionParams, evaluate};
pub use crate::animation::presets::{MotionPresetId, MotionSpeed, MotionStrength, PresetFamily};
pub use crate::animation::rig::MotionRig;
pub use crate::camera::pose::{
    CameraAngle, CameraFraming, CameraPan, CameraRequest, PerspectiveCamera, apply_camera_pose,
};
pub use crate::character::ids::{
    CharacterId, parse_lineup, parse_lineup_or_default, serialize_lineup,
};
pub use crate::character::loader::{CharacterLoader, MannequinLoader, load_character};
pub use crate::character::model::{Character, HumanBone};
pub use crate::encode::gif::{GIF_MIME, GifBlob, GifSink};
pub use crate::encode::sink::{FrameSink, InMemorySink, SinkConfig};
pub use crate::export::pipeline::{
    ExportJob, GIF_EXPORT_SPEC, GifExportSpec, RendererHandle, Shot, export_gif, export_gif_with,
};
pub use crate::export::request::GifRequest;
pub use crate::overlay::speech::{SpeechOverlay, SpeechPosition, SpeechRenderMode};
pub use crate::preview::session::{LoadOutcome, PreviewLoop, PreviewSession, PreviewStatus};
pub use crate::render::backend::{FrameRGBA, SceneRenderer};
pub use crate::render::cpu::CpuRasterizer;
pub use crate::render::resources::ResourceStats;
