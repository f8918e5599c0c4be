use std::sync::Arc;

use glam::Vec3;

use crate::animation::evaluator::{MotionParams, evaluate};
use crate::animation::rig::MotionRig;
use crate::camera::pose::{CameraRequest, PerspectiveCamera, apply_camera_pose};
use crate::character::model::Character;
use crate::encode::gif::{GifBlob, GifSink};
use crate::encode::sink::{FrameSink, SinkConfig};
use crate::foundation::core::{Canvas, Fps, FrameIndex, Rgba8};
use crate::foundation::error::{PosecastError, PosecastResult};
use crate::overlay::speech::{OverlayCompositor, SpeechOverlay};
use crate::render::backend::{FrameRGBA, Light, MemberId, SceneRenderer, StagePose, studio_lights};
use crate::render::cpu::CpuRasterizer;
use crate::render::resources::ResourceStats;

/// Fixed output format of an export.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GifExportSpec {
    /// Square edge length in pixels.
    pub size: u32,
    pub fps: Fps,
    pub duration_secs: f64,
    pub max_colors: usize,
    /// Yield to the scheduler after this many frames.
    pub yield_every: u64,
}

pub const GIF_EXPORT_SPEC: GifExportSpec = GifExportSpec {
    size: 512,
    fps: Fps { num: 12, den: 1 },
    duration_secs: 3.0,
    max_colors: 256,
    yield_every: 2,
};

impl GifExportSpec {
    pub fn canvas(&self) -> Canvas {
        Canvas::square(self.size)
    }

    pub fn frame_count(&self) -> u64 {
        self.fps.frames_in(self.duration_secs)
    }

    /// Loop time of frame `i`: `i · duration / frame_count`.
    pub fn frame_time(&self, i: u64) -> f32 {
        let n = self.frame_count().max(1);
        (i as f64 * (self.duration_secs / n as f64)) as f32
    }

    pub fn sink_config(&self) -> SinkConfig {
        SinkConfig {
            width: self.size,
            height: self.size,
            fps: self.fps,
        }
    }

    pub fn validate(&self) -> PosecastResult<()> {
        if self.size == 0 || self.size > u32::from(u16::MAX) {
            return Err(PosecastError::validation("export size must be in 1..=65535"));
        }
        if self.fps.num == 0 || self.fps.den == 0 {
            return Err(PosecastError::validation("export fps must be > 0"));
        }
        if self.frame_count() == 0 {
            return Err(PosecastError::validation("export must contain at least one frame"));
        }
        if !(1..=256).contains(&self.max_colors) {
            return Err(PosecastError::validation("palette size must be in 1..=256"));
        }
        if self.yield_every == 0 {
            return Err(PosecastError::validation("yield_every must be > 0"));
        }
        Ok(())
    }
}

/// Resolved parameters of one export (and of one preview frame).
#[derive(Clone, Debug, PartialEq)]
pub struct ExportJob {
    pub motion: MotionParams,
    pub camera: CameraRequest,
    pub overlay: SpeechOverlay,
    pub background: Rgba8,
}

impl Default for ExportJob {
    fn default() -> Self {
        Self {
            motion: MotionParams::default(),
            camera: CameraRequest::default(),
            overlay: SpeechOverlay::new("Hello"),
            background: Rgba8::WHITE,
        }
    }
}

/// Camera placed once for a parameter set, plus the target re-asserted every frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Shot {
    pub camera: PerspectiveCamera,
    pub target: Vec3,
}

impl Shot {
    /// Frame `character`, which must be in its rest pose.
    pub fn frame(
        character: &Character,
        lens: PerspectiveCamera,
        request: CameraRequest,
    ) -> PosecastResult<Self> {
        let mut camera = lens;
        let target = apply_camera_pose(character, &mut camera, request)?;
        Ok(Self { camera, target })
    }
}

/// A character attached to a renderer, together with the rig driving it.
pub struct StagedCharacter {
    pub member: MemberId,
    pub character: Character,
    pub rig: MotionRig,
}

impl StagedCharacter {
    /// Capture the rig from `character` in its current pose, which becomes the rest pose.
    pub fn new(member: MemberId, character: Character) -> Self {
        let rig = MotionRig::capture(&character);
        Self {
            member,
            character,
            rig,
        }
    }

    /// Put every rigged node back to rest.
    pub fn rest(&mut self) {
        self.rig.reset(&mut self.character.scene);
    }
}

/// Pose, render and overlay one frame at loop time `t`.
///
/// Preview and export both go through here, so equal inputs give equal pixels.
pub fn compose_frame<R: SceneRenderer + ?Sized>(
    renderer: &mut R,
    staged: &mut StagedCharacter,
    shot: &Shot,
    job: &ExportJob,
    t: f32,
    compositor: &mut OverlayCompositor,
) -> PosecastResult<FrameRGBA> {
    staged.rest();
    evaluate(&staged.rig, &mut staged.character, t, job.motion);

    let mut camera = shot.camera;
    camera.look_at(shot.target);
    let pose = StagePose {
        member: staged.member,
        scene: &staged.character.scene,
    };
    let mut frame = renderer.render(&camera, &[pose])?;
    compositor.draw(&mut frame, t, &job.overlay)?;
    Ok(frame)
}

/// Scope guard over a renderer's per-export members.
///
/// Everything attached through the guard is detached again when it drops, on success and on
/// error alike.
pub struct StageGuard<'r, R: SceneRenderer + ?Sized> {
    renderer: &'r mut R,
    members: Vec<MemberId>,
    completed: bool,
}

impl<'r, R: SceneRenderer + ?Sized> StageGuard<'r, R> {
    pub fn new(renderer: &'r mut R) -> Self {
        Self {
            renderer,
            members: Vec::new(),
            completed: false,
        }
    }

    pub fn attach_character(&mut self, character: &Character) -> PosecastResult<MemberId> {
        let id = self.renderer.attach_character(character)?;
        self.members.push(id);
        Ok(id)
    }

    pub fn attach_lights(&mut self, lights: impl IntoIterator<Item = Light>) {
        for light in lights {
            let id = self.renderer.attach_light(light);
            self.members.push(id);
        }
    }

    pub fn renderer(&mut self) -> &mut R {
        self.renderer
    }

    pub fn members(&self) -> &[MemberId] {
        &self.members
    }

    /// Mark the export as successful; the members are still released on drop.
    pub fn complete(mut self) {
        self.completed = true;
    }
}

impl<R: SceneRenderer + ?Sized> Drop for StageGuard<'_, R> {
    fn drop(&mut self) {
        let mut released = 0usize;
        for id in self.members.drain(..) {
            if self.renderer.detach(id) {
                released += 1;
            }
        }
        if self.completed {
            tracing::debug!(released, "stage released");
        } else {
            tracing::warn!(released, "stage released after failed export");
        }
    }
}

/// Render every frame of `spec` for `character` into `sink`.
///
/// `character` is read in its rest pose and never mutated; the loop animates a private copy.
/// Returns the number of frames pushed.
pub async fn render_loop<R, S, F>(
    renderer: &mut R,
    character: &Character,
    job: &ExportJob,
    spec: &GifExportSpec,
    sink: &mut S,
    mut progress: F,
) -> PosecastResult<u64>
where
    R: SceneRenderer + Send + ?Sized,
    S: FrameSink + ?Sized,
    F: FnMut(f32) + Send,
{
    spec.validate()?;
    character.validate()?;
    if renderer.canvas() != spec.canvas() {
        let c = renderer.canvas();
        return Err(PosecastError::validation(format!(
            "renderer is {}x{}, export needs {}x{}",
            c.width, c.height, spec.size, spec.size
        )));
    }

    let shot = Shot::frame(character, PerspectiveCamera::export_default(), job.camera)?;
    let n = spec.frame_count();
    progress(0.0);

    renderer.set_clear_color(job.background);
    let mut stage = StageGuard::new(renderer);
    stage.attach_lights(studio_lights());
    let member = stage.attach_character(character)?;
    let mut staged = StagedCharacter::new(member, character.clone());
    let mut compositor = OverlayCompositor::new();

    sink.begin(spec.sink_config())?;
    for i in 0..n {
        let t = spec.frame_time(i);
        let frame = compose_frame(stage.renderer(), &mut staged, &shot, job, t, &mut compositor)?;
        sink.push_frame(FrameIndex(i), &frame)?;
        progress((i + 1) as f32 / n as f32);
        if (i + 1) % spec.yield_every == 0 {
            tokio::task::yield_now().await;
        }
    }
    sink.end()?;

    stage.complete();
    Ok(n)
}

/// Export a seamless GIF loop with the fixed [`GIF_EXPORT_SPEC`].
pub async fn export_gif<F>(
    renderer: &RendererHandle,
    character: &Character,
    job: &ExportJob,
    progress: F,
) -> PosecastResult<GifBlob>
where
    F: FnMut(f32) + Send,
{
    export_gif_with(renderer, character, job, &GIF_EXPORT_SPEC, progress).await
}

/// [`export_gif`] with an explicit output format.
#[tracing::instrument(skip_all, fields(character = %character.id, preset = %job.motion.preset))]
pub async fn export_gif_with<F>(
    renderer: &RendererHandle,
    character: &Character,
    job: &ExportJob,
    spec: &GifExportSpec,
    progress: F,
) -> PosecastResult<GifBlob>
where
    F: FnMut(f32) + Send,
{
    let started = std::time::Instant::now();
    let mut lease = renderer.try_lease()?;
    let rasterizer = lease.renderer()?;

    let mut sink = GifSink::new(job.background, spec.max_colors);
    let frames = render_loop(rasterizer, character, job, spec, &mut sink, progress).await?;
    let blob = sink
        .take_blob()
        .ok_or_else(|| PosecastError::encode("gif sink finished without output"))?;

    tracing::debug!(
        frames,
        bytes = blob.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "gif export finished"
    );
    Ok(blob)
}

/// Shared, lazily created export renderer.
///
/// The rasterizer and its render targets are built on first use and reused by every export
/// until [`dispose`](Self::dispose). Only one export may use it at a time; a second concurrent
/// caller gets [`PosecastError::Busy`].
#[derive(Clone)]
pub struct RendererHandle {
    canvas: Canvas,
    inner: Arc<tokio::sync::Mutex<Option<CpuRasterizer>>>,
}

impl RendererHandle {
    pub fn new(canvas: Canvas) -> Self {
        Self {
            canvas,
            inner: Arc::new(tokio::sync::Mutex::new(None)),
        }
    }

    /// Handle sized for [`GIF_EXPORT_SPEC`].
    pub fn for_export() -> Self {
        Self::new(GIF_EXPORT_SPEC.canvas())
    }

    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    /// Exclusive access without waiting.
    pub fn try_lease(&self) -> PosecastResult<RendererLease<'_>> {
        let guard = self
            .inner
            .try_lock()
            .map_err(|_| PosecastError::busy("another export is using the shared renderer"))?;
        Ok(RendererLease {
            canvas: self.canvas,
            guard,
        })
    }

    pub async fn is_initialized(&self) -> bool {
        self.inner.lock().await.is_some()
    }

    /// Live resources of the shared renderer, `None` before first use.
    pub async fn resource_stats(&self) -> Option<ResourceStats> {
        self.inner
            .lock()
            .await
            .as_ref()
            .map(|r| r.resource_stats())
    }

    /// Drop the shared renderer and release its render targets. The next export recreates it.
    pub async fn dispose(&self) -> Option<ResourceStats> {
        let stats = self.inner.lock().await.take().map(CpuRasterizer::dispose);
        if let Some(stats) = &stats {
            tracing::debug!(live = stats.live_total(), "shared renderer disposed");
        }
        stats
    }
}

/// Exclusive access to the shared renderer.
pub struct RendererLease<'a> {
    canvas: Canvas,
    guard: tokio::sync::MutexGuard<'a, Option<CpuRasterizer>>,
}

impl RendererLease<'_> {
    /// The shared rasterizer, created on first access.
    pub fn renderer(&mut self) -> PosecastResult<&mut CpuRasterizer> {
        if self.guard.is_none() {
            *self.guard = Some(CpuRasterizer::new(self.canvas)?);
            tracing::debug!(size = self.canvas.width, "shared renderer created");
        }
        self.guard
            .as_mut()
            .ok_or_else(|| PosecastError::render("shared renderer unavailable"))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/export/pipeline.rs"]
mod tests;
