use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;

use crate::assets::raster::Raster;
use crate::assets::text::TextRenderer;
use crate::config::RenderConfig;
use crate::foundation::error::{ReelError, ReelResult, RenderWarning, WarningKind};
use crate::script::model::Scene;
use crate::synth::{Collaborators, call_with_timeout};
use crate::timeline::model::{Clip, Layer, VisualContent};
use crate::timeline::visual::{
    FALLBACK_DESCRIPTION, VisualStrategy, placeholder_visual, variant_count, variant_prompt,
    visual_chain,
};

/// Origin of the prompt a scene's visual is built from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DescriptionSource {
    Script,
    /// Summarized from the dialogue by the text transformer.
    Derived,
    /// The dialogue itself, after the text transformer failed.
    Dialogue,
    Fallback,
}

/// Visual chosen for one scene.
#[derive(Clone, Debug)]
pub struct SceneVisual {
    pub content: VisualContent,
    pub strategy: VisualStrategy,
}

/// Turns one scene into a clip of exactly its resolved duration.
pub struct SceneTrackBuilder<'a> {
    pub cfg: &'a RenderConfig,
    pub collaborators: &'a Collaborators,
    pub text: &'a dyn TextRenderer,
}

impl SceneTrackBuilder<'_> {
    fn timeout(&self) -> Duration {
        self.cfg.collaborator_timeout()
    }

    /// Prompt for the scene visual. An empty description is derived from the dialogue first.
    pub async fn describe(
        &self,
        scene: &Scene,
        warnings: &mut Vec<RenderWarning>,
    ) -> (String, DescriptionSource) {
        let visual = scene.visual_description.trim();
        if !visual.is_empty() {
            return (visual.to_string(), DescriptionSource::Script);
        }
        let dialogue = scene.dialogue.trim();
        if dialogue.is_empty() {
            return (FALLBACK_DESCRIPTION.to_string(), DescriptionSource::Fallback);
        }

        let derived = call_with_timeout(
            "text transform",
            self.timeout(),
            self.collaborators
                .text
                .describe_dialogue(dialogue, scene.speaker.as_deref()),
        )
        .await;
        match derived {
            Ok(s) if !s.trim().is_empty() => {
                tracing::debug!(scene = scene.index, "derived visual description from dialogue");
                (s.trim().to_string(), DescriptionSource::Derived)
            }
            Ok(_) => {
                let e = ReelError::synthesis("text transform returned an empty description");
                warnings.push(RenderWarning::from_error(Some(scene.index), &e));
                (dialogue.to_string(), DescriptionSource::Dialogue)
            }
            Err(e) => {
                tracing::warn!(scene = scene.index, error = %e, "description derivation failed");
                warnings.push(RenderWarning::from_error(Some(scene.index), &e));
                (dialogue.to_string(), DescriptionSource::Dialogue)
            }
        }
    }

    /// Walk the visual chain until one strategy yields a `width`x`height` visual.
    pub async fn build_visual(
        &self,
        scene: &Scene,
        description: &str,
        duration_sec: f64,
        (width, height): (u32, u32),
        warnings: &mut Vec<RenderWarning>,
    ) -> SceneVisual {
        for strategy in visual_chain(scene.image.is_some(), duration_sec, self.cfg) {
            let attempt = match strategy {
                VisualStrategy::PreSupplied => match scene.image.as_deref() {
                    Some(path) => load_still(path, width, height).await,
                    None => continue,
                },
                VisualStrategy::Synthesized => self.synthesize_still(description, width, height).await,
                VisualStrategy::VariantSequence => {
                    self.synthesize_variants(scene.index, description, duration_sec, width, height)
                        .await
                }
                VisualStrategy::Placeholder => Ok(VisualContent::Still(Arc::new(
                    placeholder_visual(description, width, height, self.cfg, self.text),
                ))),
            };

            match attempt {
                Ok(content) => {
                    tracing::debug!(scene = scene.index, ?strategy, "scene visual resolved");
                    return SceneVisual { content, strategy };
                }
                Err(e) => {
                    tracing::debug!(scene = scene.index, ?strategy, error = %e, "visual strategy failed");
                    warnings.push(RenderWarning::scene(
                        scene.index,
                        WarningKind::AssetSynthesis,
                        format!("{strategy:?} visual failed: {e}"),
                    ));
                }
            }
        }

        // Unreachable in practice: the chain always ends with the placeholder.
        SceneVisual {
            content: VisualContent::Still(Arc::new(Raster::solid(
                width,
                height,
                self.cfg.placeholder_rgba,
            ))),
            strategy: VisualStrategy::Placeholder,
        }
    }

    /// Full-frame clip: the scene visual over the whole canvas with the speech attached once.
    pub async fn build_clip(
        &self,
        scene: &Scene,
        description: &str,
        duration_sec: f64,
        audio: Option<PathBuf>,
        warnings: &mut Vec<RenderWarning>,
    ) -> (Clip, VisualStrategy) {
        let canvas = self.cfg.canvas;
        let visual = self
            .build_visual(
                scene,
                description,
                duration_sec,
                (canvas.width, canvas.height),
                warnings,
            )
            .await;
        let clip = Clip {
            scene_index: scene.index,
            duration_sec,
            background_rgba: self.cfg.background_rgba,
            layers: vec![Layer {
                content: visual.content,
                x: 0,
                y: 0,
            }],
            audio,
        };
        (clip, visual.strategy)
    }

    async fn synthesize_still(
        &self,
        prompt: &str,
        width: u32,
        height: u32,
    ) -> ReelResult<VisualContent> {
        let img = call_with_timeout(
            "image synthesis",
            self.timeout(),
            self.collaborators.image.synthesize(prompt),
        )
        .await?;
        Ok(VisualContent::Still(Arc::new(resize_synthesized(
            &img, width, height,
        )?)))
    }

    async fn synthesize_variants(
        &self,
        scene_index: usize,
        description: &str,
        duration_sec: f64,
        width: u32,
        height: u32,
    ) -> ReelResult<VisualContent> {
        let count = variant_count(duration_sec);
        let timeout = self.timeout();
        let image = &self.collaborators.image;
        let results = join_all((1..=count).map(|k| {
            let prompt = variant_prompt(description, k);
            async move {
                call_with_timeout("image variant synthesis", timeout, image.synthesize(&prompt))
                    .await
            }
        }))
        .await;

        let mut stills = Vec::with_capacity(count);
        let mut failed = 0usize;
        for res in results {
            match res.and_then(|img| resize_synthesized(&img, width, height)) {
                Ok(r) => stills.push(Arc::new(r)),
                Err(e) => {
                    failed += 1;
                    tracing::debug!(scene = scene_index, error = %e, "variant synthesis failed");
                }
            }
        }
        if stills.len() < 2 {
            return Err(ReelError::synthesis(format!(
                "only {} of {count} variant images succeeded",
                stills.len()
            )));
        }
        if failed > 0 {
            tracing::warn!(
                scene = scene_index,
                failed,
                kept = stills.len(),
                "some variant images failed; sequence uses the rest"
            );
        }

        let each = duration_sec / stills.len() as f64;
        Ok(VisualContent::Sequence(
            stills.into_iter().map(|r| (r, each)).collect(),
        ))
    }
}

fn resize_synthesized(img: &image::RgbaImage, width: u32, height: u32) -> ReelResult<Raster> {
    if img.width() == 0 || img.height() == 0 {
        return Err(ReelError::synthesis("synthesized image is empty"));
    }
    Ok(Raster::from_rgba_image_resized(img, width, height))
}

/// Decode an image file off the async runtime and resize it to exactly `width`x`height`.
pub(crate) async fn load_still(path: &Path, width: u32, height: u32) -> ReelResult<VisualContent> {
    let img = decode_rgba(path).await?;
    Ok(VisualContent::Still(Arc::new(Raster::from_rgba_image_resized(
        &img, width, height,
    ))))
}

pub(crate) async fn decode_rgba(path: &Path) -> ReelResult<image::RgbaImage> {
    let owned = path.to_path_buf();
    let img = tokio::task::spawn_blocking(move || image::open(&owned).map(|i| i.to_rgba8()))
        .await
        .map_err(|e| ReelError::synthesis(format!("image decode task failed: {e}")))?
        .map_err(|e| ReelError::synthesis(format!("decode image '{}': {e}", path.display())))?;
    if img.width() == 0 || img.height() == 0 {
        return Err(ReelError::synthesis(format!(
            "image '{}' is empty",
            path.display()
        )));
    }
    Ok(img)
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/scene_track.rs"]
mod tests;
