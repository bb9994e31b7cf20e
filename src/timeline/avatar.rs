use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::assets::media;
use crate::assets::raster::{Raster, fit_height};
use crate::assets::text::{TextRenderer, TextStyle};
use crate::config::RenderConfig;
use crate::foundation::core::Canvas;
use crate::foundation::error::{ReelError, ReelResult, RenderWarning, WarningKind};
use crate::script::model::{Scene, Script};
use crate::synth::{Collaborators, call_with_timeout};
use crate::timeline::model::{Clip, Layer, VisualContent};
use crate::timeline::scene_track::{SceneTrackBuilder, decode_rgba};
use crate::timeline::visual::VisualStrategy;

/// Label drawn on the generic avatar pane.
pub const AVATAR_PLACEHOLDER_LABEL: [&str; 2] = ["Avatar", "Placeholder"];
const AVATAR_LABEL_FONT_SIZE: f32 = 30.0;

/// Upper bound on decoded lip-sync frames per scene.
const MAX_LIPSYNC_FRAMES: u32 = 9_000;

/// Named ways of filling the avatar pane, tried in order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AvatarStrategy {
    /// Talking-head video from the lip-sync engine, looped over the scene.
    LipSync,
    /// The avatar image held for the whole scene, silent.
    StaticImage,
    /// Solid pane with a label. Cannot fail.
    Placeholder,
}

pub fn avatar_chain(skip_lipsync: bool, has_image: bool, has_audio: bool) -> Vec<AvatarStrategy> {
    let mut chain = Vec::with_capacity(3);
    if has_image {
        if !skip_lipsync && has_audio {
            chain.push(AvatarStrategy::LipSync);
        }
        chain.push(AvatarStrategy::StaticImage);
    }
    chain.push(AvatarStrategy::Placeholder);
    chain
}

/// Avatar image for split layout: the script's chosen character if its image exists, else the
/// first character whose image exists.
pub fn select_avatar_image(script: &Script) -> Option<PathBuf> {
    let usable = |p: &Option<PathBuf>| p.as_ref().filter(|p| p.is_file()).cloned();
    if let Some(name) = script.avatar_character.as_deref() {
        match script.character(name).and_then(|c| usable(&c.avatar_image)) {
            Some(p) => return Some(p),
            None => tracing::debug!(character = name, "chosen avatar character has no image"),
        }
    }
    script.characters.iter().find_map(|c| usable(&c.avatar_image))
}

/// Pixel rectangle on the canvas.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PaneRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Split-screen geometry: avatar on the left quarter, content on the rest.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SplitLayout {
    pub canvas: Canvas,
    pub avatar_width: u32,
    pub content_width: u32,
}

impl SplitLayout {
    pub fn for_canvas(canvas: Canvas) -> Self {
        let avatar_width = canvas.width / 4;
        Self {
            canvas,
            avatar_width,
            content_width: canvas.width - avatar_width,
        }
    }

    /// Vertically centered rect of `height` (capped at the canvas height) in the avatar column.
    pub fn avatar_rect(&self, height: u32) -> PaneRect {
        let height = height.clamp(1, self.canvas.height);
        PaneRect {
            x: 0,
            y: (self.canvas.height - height) / 2,
            width: self.avatar_width,
            height,
        }
    }

    /// Content pane: the canvas aspect scaled to the content width, vertically centered.
    pub fn content_rect(&self) -> PaneRect {
        let height = fit_height(
            self.canvas.width,
            self.canvas.height,
            self.content_width,
            self.canvas.height,
        );
        PaneRect {
            x: self.avatar_width,
            y: (self.canvas.height - height) / 2,
            width: self.content_width,
            height,
        }
    }
}

/// Both panes of one composited scene.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SplitPanes {
    pub avatar: PaneRect,
    pub content: PaneRect,
}

/// Result of compositing one split-layout scene.
#[derive(Clone, Debug)]
pub struct AvatarScene {
    pub clip: Clip,
    pub visual: VisualStrategy,
    pub avatar: AvatarStrategy,
    pub panes: SplitPanes,
}

/// Builds split-screen scene clips.
pub struct AvatarCompositor<'a> {
    pub cfg: &'a RenderConfig,
    pub collaborators: &'a Collaborators,
    pub text: &'a dyn TextRenderer,
}

impl AvatarCompositor<'_> {
    pub fn layout(&self) -> SplitLayout {
        SplitLayout::for_canvas(self.cfg.canvas)
    }

    /// Fill the avatar pane, degrading through [`avatar_chain`].
    pub async fn build_avatar_pane(
        &self,
        scene_index: usize,
        duration_sec: f64,
        avatar_image: Option<&Path>,
        audio: Option<&Path>,
        warnings: &mut Vec<RenderWarning>,
    ) -> (VisualContent, AvatarStrategy) {
        let layout = self.layout();
        let chain = avatar_chain(
            self.cfg.skip_lipsync,
            avatar_image.is_some(),
            audio.is_some(),
        );
        for strategy in chain {
            let attempt = match (strategy, avatar_image, audio) {
                (AvatarStrategy::LipSync, Some(img), Some(audio)) => {
                    self.lipsync_pane(img, audio, duration_sec, &layout).await
                }
                (AvatarStrategy::StaticImage, Some(img), _) => {
                    static_pane(img, &layout).await
                }
                (AvatarStrategy::Placeholder, _, _) => Ok(VisualContent::Still(Arc::new(
                    placeholder_pane(&layout, self.cfg, self.text),
                ))),
                _ => continue,
            };
            match attempt {
                Ok(content) => {
                    tracing::debug!(scene = scene_index, ?strategy, "avatar pane resolved");
                    return (content, strategy);
                }
                Err(e) => {
                    tracing::warn!(scene = scene_index, ?strategy, error = %e, "avatar strategy failed");
                    warnings.push(RenderWarning::scene(
                        scene_index,
                        WarningKind::AssetSynthesis,
                        format!("{strategy:?} avatar failed: {e}"),
                    ));
                }
            }
        }
        (
            VisualContent::Still(Arc::new(placeholder_pane(&layout, self.cfg, self.text))),
            AvatarStrategy::Placeholder,
        )
    }

    /// Avatar pane plus the scene's own visual in the content pane, over a blank canvas. The
    /// speech is attached once, to the composite.
    #[allow(clippy::too_many_arguments)]
    pub async fn build_clip(
        &self,
        scenes: &SceneTrackBuilder<'_>,
        scene: &Scene,
        description: &str,
        duration_sec: f64,
        audio: Option<PathBuf>,
        avatar_image: Option<&Path>,
        warnings: &mut Vec<RenderWarning>,
    ) -> AvatarScene {
        let layout = self.layout();
        let content_rect = layout.content_rect();
        let content = scenes
            .build_visual(
                scene,
                description,
                duration_sec,
                (content_rect.width, content_rect.height),
                warnings,
            )
            .await;

        let (avatar_content, avatar_strategy) = self
            .build_avatar_pane(
                scene.index,
                duration_sec,
                avatar_image,
                audio.as_deref(),
                warnings,
            )
            .await;
        let avatar_height = avatar_content
            .size()
            .map(|(_, h)| h)
            .unwrap_or(layout.canvas.height);
        let avatar_rect = layout.avatar_rect(avatar_height);

        let clip = Clip {
            scene_index: scene.index,
            duration_sec,
            background_rgba: self.cfg.background_rgba,
            layers: vec![
                Layer {
                    content: avatar_content,
                    x: i64::from(avatar_rect.x),
                    y: i64::from(avatar_rect.y),
                },
                Layer {
                    content: content.content,
                    x: i64::from(content_rect.x),
                    y: i64::from(content_rect.y),
                },
            ],
            audio,
        };

        AvatarScene {
            clip,
            visual: content.strategy,
            avatar: avatar_strategy,
            panes: SplitPanes {
                avatar: avatar_rect,
                content: content_rect,
            },
        }
    }

    async fn lipsync_pane(
        &self,
        avatar_image: &Path,
        audio: &Path,
        duration_sec: f64,
        layout: &SplitLayout,
    ) -> ReelResult<VisualContent> {
        let video = call_with_timeout(
            "lip-sync",
            self.cfg.collaborator_timeout(),
            self.collaborators.lipsync.animate(avatar_image, audio),
        )
        .await?;

        let fps = self.cfg.fps.as_f64();
        let width = layout.avatar_width;
        let max_height = layout.canvas.height;
        let max_frames = ((duration_sec * fps).ceil() as u32).clamp(1, MAX_LIPSYNC_FRAMES);
        let frames = tokio::task::spawn_blocking(move || -> ReelResult<Vec<Raster>> {
            let info = media::probe_video(&video)?;
            if let Some(short) = lipsync_shortfall(info.duration_sec, duration_sec) {
                tracing::debug!(
                    video_sec = info.duration_sec,
                    short_by_sec = short,
                    "lip-sync clip shorter than its scene; frames loop"
                );
            }
            let height = fit_height(info.width, info.height, width, max_height);
            media::decode_video_frames(&video, width, height, fps, max_frames)
        })
        .await
        .map_err(|e| ReelError::synthesis(format!("lip-sync decode task failed: {e}")))??;

        if frames.is_empty() {
            return Err(ReelError::synthesis("lip-sync video has no frames"));
        }
        Ok(VisualContent::Frames {
            frames: Arc::new(frames),
            fps,
        })
    }
}

/// How much shorter a lip-sync video is than its scene, ignoring sub-frame jitter and videos
/// whose duration is unknown (`0.0`).
pub fn lipsync_shortfall(video_sec: f64, scene_sec: f64) -> Option<f64> {
    const TOLERANCE_SEC: f64 = 0.05;
    if video_sec <= 0.0 {
        return None;
    }
    let short = scene_sec - video_sec;
    (short > TOLERANCE_SEC).then_some(short)
}

async fn static_pane(avatar_image: &Path, layout: &SplitLayout) -> ReelResult<VisualContent> {
    let img = decode_rgba(avatar_image).await?;
    let height = fit_height(
        img.width(),
        img.height(),
        layout.avatar_width,
        layout.canvas.height,
    );
    Ok(VisualContent::Still(Arc::new(Raster::from_rgba_image_resized(
        &img,
        layout.avatar_width,
        height,
    ))))
}

/// Full-height solid pane with a centered two-line label.
pub fn placeholder_pane(
    layout: &SplitLayout,
    cfg: &RenderConfig,
    text: &dyn TextRenderer,
) -> Raster {
    let (w, h) = (layout.avatar_width.max(1), layout.canvas.height);
    let mut pane = Raster::solid(w, h, cfg.avatar_placeholder_rgba);
    let style = TextStyle {
        font_size: AVATAR_LABEL_FONT_SIZE,
        stroke_width: 0.0,
        ..cfg.placeholder.text_style()
    };
    let lines: Vec<String> = AVATAR_PLACEHOLDER_LABEL
        .iter()
        .map(|s| s.to_string())
        .collect();
    let block_h = lines.len() as f32 * style.line_advance(text) - style.line_gap;
    let top = ((h as f32 - block_h) / 2.0).max(0.0);
    match text.render_block(&lines, w, h, top, &style) {
        Ok(label) => pane.blit_over(&label, 0, 0, 1.0),
        Err(e) => tracing::warn!(error = %e, "avatar label render failed; using bare pane"),
    }
    pane
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/avatar.rs"]
mod tests;
