use std::sync::Arc;
use std::time::Duration;

use crate::camera::pose::{CAMERA_FAR, CAMERA_FOV_DEG, CAMERA_NEAR, PerspectiveCamera};
use crate::character::ids::CharacterId;
use crate::character::loader::{CharacterLoader, LoadTicket, LoadTracker, load_character};
use crate::character::model::Character;
use crate::encode::gif::GifBlob;
use crate::export::pipeline::{
    ExportJob, RendererHandle, Shot, StagedCharacter, compose_frame, export_gif,
};
use crate::foundation::core::{Canvas, Fps, FrameIndex, LOOP_DURATION_SECS};
use crate::foundation::error::{PosecastError, PosecastResult};
use crate::foundation::math::wrap;
use crate::overlay::speech::OverlayCompositor;
use crate::render::backend::{FrameRGBA, MemberId, SceneRenderer, studio_lights};
use crate::render::cpu::CpuRasterizer;
use crate::render::resources::ResourceStats;

/// Result of applying a finished character load.
#[derive(Debug)]
pub enum LoadOutcome {
    /// The character is now on stage.
    Applied(CharacterId),
    /// A newer request superseded this one; the result was dropped.
    Stale(CharacterId),
    Failed(PosecastError),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PreviewStatus {
    Idle,
    Loading(CharacterId),
    Ready(CharacterId),
    /// Loading failed; nothing is rendered until another load succeeds.
    Failed { id: CharacterId, message: String },
}

struct ActiveCharacter {
    staged: StagedCharacter,
    /// Untouched copy in the rest pose, used for framing and exports.
    rest: Character,
}

/// Interactive preview of one character.
///
/// Owns its own renderer, separate from the shared export renderer. The camera is framed once
/// per character and camera-parameter change; every frame re-poses the character from rest.
pub struct PreviewSession {
    renderer: CpuRasterizer,
    lights: Vec<MemberId>,
    lens: PerspectiveCamera,
    tracker: LoadTracker,
    active: Option<ActiveCharacter>,
    job: ExportJob,
    shot: Option<Shot>,
    compositor: OverlayCompositor,
    status: PreviewStatus,
}

impl PreviewSession {
    pub fn new(canvas: Canvas) -> PosecastResult<Self> {
        let mut renderer = CpuRasterizer::new(canvas)?;
        let lens = PerspectiveCamera::new(
            CAMERA_FOV_DEG,
            canvas.width as f32 / canvas.height as f32,
            CAMERA_NEAR,
            CAMERA_FAR,
        )?;
        let lights = studio_lights()
            .into_iter()
            .map(|l| renderer.attach_light(l))
            .collect();
        let job = ExportJob::default();
        renderer.set_clear_color(job.background);
        Ok(Self {
            renderer,
            lights,
            lens,
            tracker: LoadTracker::new(),
            active: None,
            job,
            shot: None,
            compositor: OverlayCompositor::new(),
            status: PreviewStatus::Idle,
        })
    }

    pub fn status(&self) -> &PreviewStatus {
        &self.status
    }

    pub fn job(&self) -> &ExportJob {
        &self.job
    }

    pub fn shot(&self) -> Option<&Shot> {
        self.shot.as_ref()
    }

    pub fn active_character(&self) -> Option<CharacterId> {
        self.active.as_ref().map(|a| a.rest.id)
    }

    /// The active character in its rest pose.
    pub fn rest_character(&self) -> Option<&Character> {
        self.active.as_ref().map(|a| &a.rest)
    }

    pub fn resource_stats(&self) -> ResourceStats {
        self.renderer.resource_stats()
    }

    pub fn light_count(&self) -> usize {
        self.lights.len()
    }

    /// Start a load for `id`. Any load still in flight becomes stale.
    pub fn begin_load(&mut self, id: CharacterId) -> LoadTicket {
        self.status = PreviewStatus::Loading(id);
        self.tracker.begin(id)
    }

    /// Apply the result of the load started with `ticket`.
    ///
    /// Stale results are dropped without touching the stage. Otherwise the previous character
    /// is detached and its resources released before the new one is attached.
    #[tracing::instrument(skip(self, result), fields(id = ticket.id.get()))]
    pub fn finish_load(
        &mut self,
        ticket: LoadTicket,
        result: PosecastResult<Character>,
    ) -> LoadOutcome {
        if !self.tracker.is_current(&ticket) {
            tracing::warn!("discarding stale character load");
            return LoadOutcome::Stale(ticket.id);
        }
        self.clear_active();

        let attached = result.and_then(|character| {
            let member = self.renderer.attach_character(&character)?;
            Ok((member, character))
        });
        match attached {
            Ok((member, character)) => {
                let active = ActiveCharacter {
                    staged: StagedCharacter::new(member, character.clone()),
                    rest: character,
                };
                match Shot::frame(&active.rest, self.lens, self.job.camera) {
                    Ok(shot) => self.shot = Some(shot),
                    Err(err) => {
                        self.renderer.detach(member);
                        return self.fail(ticket.id, err);
                    }
                }
                self.active = Some(active);
                self.status = PreviewStatus::Ready(ticket.id);
                tracing::debug!(members = self.renderer.member_count(), "character on stage");
                LoadOutcome::Applied(ticket.id)
            }
            Err(err) => self.fail(ticket.id, err),
        }
    }

    /// Validate `raw`, load it and apply the result.
    ///
    /// Invalid IDs are rejected before the loader runs and leave the current stage untouched.
    pub async fn load<L>(&mut self, loader: &L, raw: f64) -> LoadOutcome
    where
        L: CharacterLoader + Sync,
    {
        let id = match CharacterId::from_f64(raw) {
            Ok(id) => id,
            Err(err) => return LoadOutcome::Failed(err),
        };
        let ticket = self.begin_load(id);
        let result = load_character(loader, f64::from(id.get())).await;
        self.finish_load(ticket, result)
    }

    /// Drop the active character and cancel pending loads.
    pub fn unload(&mut self) {
        self.tracker.cancel();
        self.clear_active();
        self.status = PreviewStatus::Idle;
    }

    /// Replace the preview parameters. Returns whether the camera was re-framed.
    pub fn set_job(&mut self, job: ExportJob) -> PosecastResult<bool> {
        let reframe = job.camera != self.job.camera;
        self.renderer.set_clear_color(job.background);
        self.job = job;
        if !reframe {
            return Ok(false);
        }
        if let Some(active) = &self.active {
            self.shot = Some(Shot::frame(&active.rest, self.lens, self.job.camera)?);
        }
        Ok(true)
    }

    /// Render the preview at `elapsed` seconds, wrapped into the loop. `None` while no character
    /// is on stage.
    pub fn render_frame(&mut self, elapsed: f32) -> PosecastResult<Option<FrameRGBA>> {
        let (Some(active), Some(shot)) = (self.active.as_mut(), self.shot.as_ref()) else {
            return Ok(None);
        };
        let t = wrap(elapsed, LOOP_DURATION_SECS);
        let frame = compose_frame(
            &mut self.renderer,
            &mut active.staged,
            shot,
            &self.job,
            t,
            &mut self.compositor,
        )?;
        Ok(Some(frame))
    }

    /// Export the active character with the current parameters through the shared renderer.
    pub async fn export_gif<F>(
        &self,
        renderer: &RendererHandle,
        progress: F,
    ) -> PosecastResult<GifBlob>
    where
        F: FnMut(f32) + Send,
    {
        let character = self
            .rest_character()
            .ok_or_else(|| PosecastError::validation("no character loaded"))?;
        export_gif(renderer, character, &self.job, progress).await
    }

    fn clear_active(&mut self) {
        if let Some(old) = self.active.take() {
            self.renderer.detach(old.staged.member);
            tracing::debug!(id = old.rest.id.get(), "previous character released");
        }
        self.shot = None;
    }

    fn fail(&mut self, id: CharacterId, err: PosecastError) -> LoadOutcome {
        tracing::warn!(%err, "character load failed");
        self.status = PreviewStatus::Failed {
            id,
            message: err.to_string(),
        };
        LoadOutcome::Failed(err)
    }
}

/// Repeating preview render driven by a tokio interval.
///
/// Starting a loop stops the previous one; stopping aborts the scheduled task so no frame of an
/// old loop runs afterwards. Dropping the loop stops it.
#[derive(Debug, Default)]
pub struct PreviewLoop {
    task: Option<tokio::task::JoinHandle<()>>,
}

impl PreviewLoop {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render `session` at `fps` on the current tokio runtime, handing each frame to `on_frame`.
    pub fn start<F>(
        &mut self,
        session: Arc<tokio::sync::Mutex<PreviewSession>>,
        fps: Fps,
        mut on_frame: F,
    ) -> PosecastResult<()>
    where
        F: FnMut(FrameIndex, PosecastResult<Option<FrameRGBA>>) + Send + 'static,
    {
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
            PosecastError::render(format!("preview loop needs a tokio runtime: {e}"))
        })?;
        self.stop();

        let step = fps.frame_duration_secs();
        let period = Duration::from_secs_f64(step);
        self.task = Some(runtime.spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            let mut frame = 0u64;
            loop {
                ticker.tick().await;
                let elapsed = (frame as f64 * step) % f64::from(LOOP_DURATION_SECS);
                let out = session.lock().await.render_frame(elapsed as f32);
                on_frame(FrameIndex(frame), out);
                frame += 1;
            }
        }));
        tracing::debug!(fps = fps.as_f64(), "preview loop started");
        Ok(())
    }

    /// Cancel the running loop. Returns `false` when nothing was running.
    pub fn stop(&mut self) -> bool {
        match self.task.take() {
            Some(task) => {
                task.abort();
                tracing::debug!("preview loop stopped");
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for PreviewLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/preview/session.rs"]
mod tests;
