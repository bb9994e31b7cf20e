use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::future::join_all;
use tokio::sync::Semaphore;

use crate::assets::media::{AudioProbe, FfprobeAudioProbe};
use crate::assets::text::TextRenderer;
use crate::config::{Layout, RenderConfig};
use crate::foundation::error::{ReelError, ReelResult, RenderWarning, WarningKind};
use crate::render::pipeline::{RenderThreading, RenderToMp4Opts, render_to_mp4};
use crate::report::{FinalRender, SceneReport};
use crate::script::model::{Scene, Script};
use crate::synth::{AudioArtifact, Collaborators, call_with_timeout};
use crate::timeline::avatar::{
    AvatarCompositor, AvatarStrategy, SplitPanes, select_avatar_image,
};
use crate::timeline::captions::{CaptionEngine, SceneSlot};
use crate::timeline::duration::{
    DurationPolicy, DurationSource, ResolvedDuration, resolve_duration,
};
use crate::timeline::model::{Clip, Timeline};
use crate::timeline::scene_track::{DescriptionSource, SceneTrackBuilder};
use crate::timeline::stitch::stitch;
use crate::timeline::visual::{FALLBACK_DESCRIPTION, VisualStrategy};

/// Cooperative cancellation flag, checked on scene boundaries.
#[derive(Clone, Debug, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Timeline ready to encode, with per-scene reports.
#[derive(Clone, Debug)]
pub struct Assembled {
    pub timeline: Timeline,
    pub scenes: Vec<SceneReport>,
    pub warnings: Vec<RenderWarning>,
}

/// Everything one scene contributes before it is placed on the timeline.
struct ScenePrep {
    clip: Clip,
    resolved: ResolvedDuration,
    description: String,
    description_source: DescriptionSource,
    visual: Option<VisualStrategy>,
    avatar: Option<AvatarStrategy>,
    panes: Option<SplitPanes>,
    warnings: Vec<RenderWarning>,
}

/// A scene's placement and provenance, kept for its report.
struct SceneFacts {
    slot: SceneSlot,
    resolved: ResolvedDuration,
    description: String,
    description_source: DescriptionSource,
    visual: Option<VisualStrategy>,
    avatar: Option<AvatarStrategy>,
    panes: Option<SplitPanes>,
}

/// Turns a script into a timeline and the timeline into a video.
///
/// The expensive per-scene work (speech, duration probe, visuals, lip-sync) runs concurrently,
/// bounded by `max_concurrent_scenes`. Placement is a sequential fold in script order that owns
/// the timeline cursor.
pub struct Assembler {
    cfg: RenderConfig,
    collaborators: Collaborators,
    text: Arc<dyn TextRenderer>,
    probe: Arc<dyn AudioProbe>,
    cancel: CancelHandle,
    threads: Option<usize>,
}

impl Assembler {
    /// Validates `cfg`. Audio is probed with `ffprobe` unless [`Assembler::with_probe`] replaces it.
    pub fn new(
        cfg: RenderConfig,
        collaborators: Collaborators,
        text: Arc<dyn TextRenderer>,
    ) -> ReelResult<Self> {
        cfg.validate()?;
        Ok(Self {
            cfg,
            collaborators,
            text,
            probe: Arc::new(FfprobeAudioProbe),
            cancel: CancelHandle::default(),
            threads: None,
        })
    }

    pub fn with_probe(mut self, probe: Arc<dyn AudioProbe>) -> Self {
        self.probe = probe;
        self
    }

    /// Worker threads for parallel frame rendering (rayon default when unset).
    pub fn with_threads(mut self, threads: Option<usize>) -> Self {
        self.threads = threads;
        self
    }

    pub fn config(&self) -> &RenderConfig {
        &self.cfg
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    fn check_cancelled(&self) -> ReelResult<()> {
        if self.cancel.is_cancelled() {
            return Err(ReelError::Cancelled);
        }
        Ok(())
    }

    /// Resolve, build, stitch and caption every scene.
    ///
    /// Fails only for an empty script, a cancelled run, or a timeline without a single usable clip.
    #[tracing::instrument(skip_all, fields(scenes = script.scenes.len(), layout = ?self.cfg.layout))]
    pub async fn assemble(&self, script: &Script) -> ReelResult<Assembled> {
        if script.scenes.is_empty() {
            return Err(ReelError::empty_timeline("script has no scenes"));
        }
        script.validate()?;

        let avatar_image = match self.cfg.layout {
            Layout::AvatarSplit => {
                let image = select_avatar_image(script);
                if image.is_none() {
                    tracing::info!("no usable avatar image; avatar panes use the placeholder");
                }
                image
            }
            Layout::FullFrame => None,
        };

        tracing::info!("building scene clips");
        let permits = Semaphore::new(self.cfg.max_concurrent_scenes);
        let preps = join_all(
            script
                .scenes
                .iter()
                .map(|scene| self.prepare_scene(script, scene, avatar_image.as_deref(), &permits)),
        )
        .await;

        // The cursor is only ever advanced here, once per scene, in script order.
        let mut cursor = 0.0f64;
        let mut warnings = Vec::new();
        let mut placed_clips = Vec::with_capacity(preps.len());
        let mut facts = Vec::with_capacity(preps.len());
        for prep in preps {
            self.check_cancelled()?;
            let ScenePrep {
                clip,
                resolved,
                description,
                description_source,
                visual,
                avatar,
                panes,
                warnings: mut scene_warnings,
            } = prep?;
            let slot = SceneSlot {
                scene_index: clip.scene_index,
                start_sec: cursor,
                duration_sec: resolved.duration_sec,
            };
            cursor += resolved.duration_sec;
            warnings.append(&mut scene_warnings);
            placed_clips.push((slot, clip));
            facts.push(SceneFacts {
                slot,
                resolved,
                description,
                description_source,
                visual,
                avatar,
                panes,
            });
        }
        self.check_cancelled()?;

        if placed_clips.iter().all(|(_, clip)| clip.is_gap()) {
            return Err(ReelError::empty_timeline(format!(
                "none of the {} scene(s) produced a usable clip",
                script.scenes.len()
            )));
        }

        tracing::info!(duration_sec = cursor, "stitching primary track");
        let primary = stitch(placed_clips, self.cfg.crossfade_sec, &mut warnings);

        tracing::info!("building caption track");
        let cues: Vec<(SceneSlot, &str)> = facts
            .iter()
            .zip(&script.scenes)
            .map(|(f, scene)| (f.slot, scene.caption()))
            .collect();
        let captions = CaptionEngine {
            style: &self.cfg.caption,
            canvas: self.cfg.canvas,
            text: self.text.as_ref(),
        }
        .build_track(&cues, &mut warnings);

        let scenes = facts
            .into_iter()
            .zip(&primary)
            .map(|(f, placed)| SceneReport {
                scene_index: f.slot.scene_index,
                start_sec: f.slot.start_sec,
                duration_sec: f.slot.duration_sec,
                nominal_sec: f.resolved.nominal_sec,
                duration_source: f.resolved.source,
                description: f.description,
                description_source: f.description_source,
                visual: f.visual,
                avatar: f.avatar,
                panes: f.panes,
                transition: placed.transition,
                caption_lines: captions
                    .iter()
                    .find(|c| c.scene_index == f.slot.scene_index)
                    .map(|c| c.lines.clone())
                    .unwrap_or_default(),
                has_audio: placed.clip.audio.is_some(),
                gap: placed.clip.is_gap(),
            })
            .collect();

        let timeline = Timeline {
            canvas: self.cfg.canvas,
            fps: self.cfg.fps,
            duration_sec: cursor,
            primary,
            captions,
        };
        tracing::info!(
            duration_sec = timeline.duration_sec,
            frames = timeline.total_frames(),
            warnings = warnings.len(),
            "timeline assembled"
        );
        Ok(Assembled {
            timeline,
            scenes,
            warnings,
        })
    }

    /// Assemble and encode to `out_path`.
    ///
    /// Encoding runs on a blocking thread and is not interruptible; cancellation is honoured up
    /// to the moment it starts.
    #[tracing::instrument(skip_all, fields(out = %out_path.as_ref().display()))]
    pub async fn render(&self, script: &Script, out_path: impl AsRef<Path>) -> ReelResult<FinalRender> {
        let Assembled {
            timeline,
            scenes,
            mut warnings,
        } = self.assemble(script).await?;
        self.check_cancelled()?;

        let path = out_path.as_ref().to_path_buf();
        let opts = RenderToMp4Opts {
            bg_rgba: self.cfg.background_rgba,
            overwrite: self.cfg.overwrite,
            enable_audio: self.cfg.enable_audio,
            threading: RenderThreading {
                parallel: self.cfg.parallel,
                chunk_size: self.cfg.chunk_size,
                threads: self.threads,
            },
        };

        tracing::info!(frames = timeline.total_frames(), "encoding");
        let target = path.clone();
        let (timeline, encoded) = tokio::task::spawn_blocking(move || {
            let res = render_to_mp4(&timeline, target, &opts);
            (timeline, res)
        })
        .await
        .map_err(|e| ReelError::encode(format!("encode task failed: {e}")))?;
        let (stats, mut audio_warnings) = encoded?;
        warnings.append(&mut audio_warnings);

        tracing::info!(
            path = %path.display(),
            duration_sec = timeline.duration_sec,
            frames = stats.frames_total,
            warnings = warnings.len(),
            "render complete"
        );
        Ok(FinalRender {
            path,
            total_duration_sec: timeline.duration_sec,
            frame_count: stats.frames_total,
            scenes,
            warnings,
        })
    }

    async fn prepare_scene(
        &self,
        script: &Script,
        scene: &Scene,
        avatar_image: Option<&Path>,
        permits: &Semaphore,
    ) -> ReelResult<ScenePrep> {
        let _permit = permits.acquire().await.map_err(|_| ReelError::Cancelled)?;
        self.check_cancelled()?;

        let mut warnings = Vec::new();
        let artifact = self.resolve_speech(script, scene, &mut warnings).await;
        let resolved = self
            .resolve_scene_duration(scene, artifact.clone(), &mut warnings)
            .await;
        let duration = resolved.duration_sec;

        if scene.is_empty() && artifact.is_none() {
            tracing::debug!(scene = scene.index, "empty scene kept as a gap");
            return Ok(ScenePrep {
                clip: Clip::gap(scene.index, duration, self.cfg.background_rgba),
                resolved,
                description: FALLBACK_DESCRIPTION.to_string(),
                description_source: DescriptionSource::Fallback,
                visual: None,
                avatar: None,
                panes: None,
                warnings,
            });
        }

        let audio = artifact.map(|a| a.path);
        let scenes = SceneTrackBuilder {
            cfg: &self.cfg,
            collaborators: &self.collaborators,
            text: self.text.as_ref(),
        };
        let (description, description_source) = scenes.describe(scene, &mut warnings).await;

        let (clip, visual, avatar, panes) = match self.cfg.layout {
            Layout::FullFrame => {
                let (clip, visual) = scenes
                    .build_clip(scene, &description, duration, audio, &mut warnings)
                    .await;
                (clip, visual, None, None)
            }
            Layout::AvatarSplit => {
                let compositor = AvatarCompositor {
                    cfg: &self.cfg,
                    collaborators: &self.collaborators,
                    text: self.text.as_ref(),
                };
                let out = compositor
                    .build_clip(
                        &scenes,
                        scene,
                        &description,
                        duration,
                        audio,
                        avatar_image,
                        &mut warnings,
                    )
                    .await;
                (out.clip, out.visual, Some(out.avatar), Some(out.panes))
            }
        };

        let (clip, visual, avatar, panes) = match check_clip(&clip) {
            Ok(()) => (clip, Some(visual), avatar, panes),
            Err(e) => {
                tracing::warn!(scene = scene.index, error = %e, "scene clip unusable; slot kept as a gap");
                warnings.push(RenderWarning::from_error(Some(scene.index), &e));
                (
                    Clip::gap(scene.index, duration, self.cfg.background_rgba),
                    None,
                    None,
                    None,
                )
            }
        };

        Ok(ScenePrep {
            clip,
            resolved,
            description,
            description_source,
            visual,
            avatar,
            panes,
            warnings,
        })
    }

    /// Pre-supplied audio, else synthesized speech for the dialogue, else none.
    async fn resolve_speech(
        &self,
        script: &Script,
        scene: &Scene,
        warnings: &mut Vec<RenderWarning>,
    ) -> Option<AudioArtifact> {
        if let Some(path) = scene.audio.as_ref() {
            return Some(AudioArtifact {
                path: path.clone(),
                measured_duration_sec: None,
            });
        }
        let dialogue = scene.dialogue.trim();
        if dialogue.is_empty() {
            return None;
        }

        let voice = script.voice_for(scene);
        match call_with_timeout(
            "speech synthesis",
            self.cfg.collaborator_timeout(),
            self.collaborators.speech.synthesize(dialogue, &voice),
        )
        .await
        {
            Ok(artifact) => {
                tracing::debug!(scene = scene.index, voice = voice.voice_id(), "speech synthesized");
                Some(artifact)
            }
            Err(e) => {
                tracing::warn!(scene = scene.index, error = %e, "speech synthesis failed; scene is silent");
                warnings.push(RenderWarning::from_error(Some(scene.index), &e));
                None
            }
        }
    }

    /// Duration policy off the async runtime: probing spawns `ffprobe`.
    async fn resolve_scene_duration(
        &self,
        scene: &Scene,
        artifact: Option<AudioArtifact>,
        warnings: &mut Vec<RenderWarning>,
    ) -> ResolvedDuration {
        let policy = DurationPolicy {
            default_sec: self.cfg.default_scene_duration_sec,
            divergence_warn_ratio: self.cfg.divergence_warn_ratio,
        };
        let nominal = scene.nominal_or(self.cfg.default_scene_duration_sec);
        let index = scene.index;
        let probe = Arc::clone(&self.probe);

        let joined = tokio::task::spawn_blocking(move || {
            let mut w = Vec::new();
            let resolved = resolve_duration(index, nominal, artifact.as_ref(), probe.as_ref(), policy, &mut w);
            (resolved, w)
        })
        .await;
        match joined {
            Ok((resolved, mut w)) => {
                warnings.append(&mut w);
                resolved
            }
            Err(e) => {
                warnings.push(RenderWarning::scene(
                    index,
                    WarningKind::DurationProbe,
                    format!("duration probe task failed: {e}; using nominal {nominal}s"),
                ));
                let nominal = if nominal.is_finite() && nominal > 0.0 {
                    nominal
                } else {
                    policy.default_sec
                };
                ResolvedDuration {
                    duration_sec: nominal,
                    nominal_sec: nominal,
                    source: DurationSource::Nominal,
                }
            }
        }
    }
}

/// Every layer must yield a picture for the whole clip.
fn check_clip(clip: &Clip) -> ReelResult<()> {
    if !clip.duration_sec.is_finite() || clip.duration_sec <= 0.0 {
        return Err(ReelError::composition(format!(
            "clip duration {} is not positive",
            clip.duration_sec
        )));
    }
    for (i, layer) in clip.layers.iter().enumerate() {
        match layer.content.sample(0.0) {
            Some(r) if !r.is_empty() => {}
            _ => {
                return Err(ReelError::composition(format!(
                    "layer {i} has no picture"
                )));
            }
        }
    }
    Ok(())
}

/// Output path next to the script: `<script stem>.mp4`.
pub fn default_output_path(script_path: &Path) -> PathBuf {
    script_path.with_extension("mp4")
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/assembler.rs"]
mod tests;
