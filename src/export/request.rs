use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::animation::evaluator::MotionParams;
use crate::animation::presets::{MotionPresetId, MotionSpeed, MotionStrength};
use crate::camera::pose::{CameraAngle, CameraFraming, CameraPan, CameraRequest};
use crate::character::ids::CharacterId;
use crate::export::pipeline::ExportJob;
use crate::foundation::error::{PosecastError, PosecastResult};
use crate::overlay::speech::{SpeechOverlay, SpeechPosition, SpeechRenderMode};
use crate::overlay::style::{DEFAULT_SPEECH_STYLE, speech_style};
use crate::render::background::{DEFAULT_BACKGROUND, background_color};

/// JSON-facing description of one GIF export.
///
/// Every field is optional; missing fields take the product defaults. The character ID is kept
/// as a raw number so that out-of-range or fractional input is caught by [`GifRequest::validate`]
/// instead of failing inside the parser.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GifRequest {
    pub character_id: f64,
    pub speech_text: String,
    pub speech_position: SpeechPosition,
    pub speech_render_mode: SpeechRenderMode,
    pub speech_style: String,
    pub motion: MotionPresetId,
    pub strength: MotionStrength,
    pub speed: MotionSpeed,
    pub background: String,
    pub camera_angle: CameraAngle,
    pub framing: CameraFraming,
    pub pan: CameraPan,
}

impl Default for GifRequest {
    fn default() -> Self {
        Self {
            character_id: f64::from(CharacterId::DEFAULT.get()),
            speech_text: "Hello".to_owned(),
            speech_position: SpeechPosition::default(),
            speech_render_mode: SpeechRenderMode::default(),
            speech_style: DEFAULT_SPEECH_STYLE.to_owned(),
            motion: MotionPresetId::default(),
            strength: MotionStrength::default(),
            speed: MotionSpeed::default(),
            background: DEFAULT_BACKGROUND.to_owned(),
            camera_angle: CameraAngle::default(),
            framing: CameraFraming::default(),
            pan: CameraPan::default(),
        }
    }
}

impl GifRequest {
    pub fn from_json(s: &str) -> PosecastResult<Self> {
        Self::from_reader(s.as_bytes())
    }

    pub fn from_reader<R: std::io::Read>(r: R) -> PosecastResult<Self> {
        serde_json::from_reader(r)
            .map_err(|e| PosecastError::validation(format!("parse gif request JSON: {e}")))
    }

    pub fn from_path(path: impl AsRef<Path>) -> PosecastResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            PosecastError::validation(format!("open gif request JSON '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    pub fn to_json_pretty(&self) -> PosecastResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| PosecastError::serde(e.to_string()))
    }

    /// Check boundary values. Unknown style ids and backgrounds are not errors; they fall back
    /// to the defaults when the job is built. A background may also be a CSS color.
    pub fn validate(&self) -> PosecastResult<()> {
        self.character()?;
        Ok(())
    }

    pub fn character(&self) -> PosecastResult<CharacterId> {
        CharacterId::from_f64(self.character_id)
    }

    pub fn motion_params(&self) -> MotionParams {
        MotionParams {
            preset: self.motion,
            strength: self.strength,
            speed: self.speed,
        }
    }

    pub fn camera_request(&self) -> CameraRequest {
        CameraRequest {
            framing: self.framing,
            pan: self.pan,
            angle: self.camera_angle,
        }
    }

    pub fn overlay(&self) -> SpeechOverlay {
        SpeechOverlay {
            text: self.speech_text.clone(),
            position: self.speech_position,
            mode: self.speech_render_mode,
            style: speech_style(&self.speech_style),
        }
    }

    /// Validate and resolve into the pipeline's job description.
    pub fn to_job(&self) -> PosecastResult<ExportJob> {
        self.validate()?;
        Ok(ExportJob {
            motion: self.motion_params(),
            camera: self.camera_request(),
            overlay: self.overlay(),
            background: background_color(&self.background),
        })
    }

    /// Download filename for this request at `unix_timestamp`.
    pub fn filename(&self, unix_timestamp: u64) -> PosecastResult<String> {
        Ok(self.character()?.download_filename(unix_timestamp))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/export/request.rs"]
mod tests;
