use std::sync::Mutex;

use async_trait::async_trait;

use super::*;
use crate::assets::text::BlockTextRenderer;
use crate::foundation::core::Canvas;
use crate::synth::{ImageSynthesizer, TextTransformer};

#[derive(Default)]
struct RecordingImages {
    fail: bool,
    prompts: Mutex<Vec<String>>,
}

#[async_trait]
impl ImageSynthesizer for RecordingImages {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn synthesize(&self, prompt: &str) -> ReelResult<image::RgbaImage> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if self.fail {
            return Err(ReelError::synthesis("engine down"));
        }
        Ok(image::RgbaImage::from_pixel(8, 8, image::Rgba([200, 10, 10, 255])))
    }
}

struct Summarizer {
    fail: bool,
}

#[async_trait]
impl TextTransformer for Summarizer {
    fn name(&self) -> &'static str {
        "summarizer"
    }

    async fn describe_dialogue(&self, dialogue: &str, _speaker: Option<&str>) -> ReelResult<String> {
        if self.fail {
            return Err(ReelError::synthesis("llm down"));
        }
        Ok(format!("An illustration of: {dialogue}"))
    }
}

fn small_cfg() -> RenderConfig {
    RenderConfig {
        canvas: Canvas {
            width: 64,
            height: 36,
        },
        ..RenderConfig::default()
    }
}

#[tokio::test]
async fn script_description_is_used_verbatim() {
    let cfg = small_cfg();
    let collab = Collaborators::offline();
    let b = SceneTrackBuilder {
        cfg: &cfg,
        collaborators: &collab,
        text: &BlockTextRenderer,
    };
    let mut warnings = Vec::new();
    let scene = Scene::new(0).with_visual("  A lake ").with_dialogue("Hi");
    let (desc, src) = b.describe(&scene, &mut warnings).await;
    assert_eq!(desc, "A lake");
    assert_eq!(src, DescriptionSource::Script);
    assert!(warnings.is_empty());
}

#[tokio::test]
async fn empty_description_is_derived_before_image_synthesis() {
    let cfg = small_cfg();
    let images = Arc::new(RecordingImages::default());
    let collab = Collaborators::offline()
        .with_image(images.clone())
        .with_text(Arc::new(Summarizer { fail: false }));
    let b = SceneTrackBuilder {
        cfg: &cfg,
        collaborators: &collab,
        text: &BlockTextRenderer,
    };
    let mut warnings = Vec::new();
    let scene = Scene::new(0).with_dialogue("Water boils at 100 degrees");

    let (desc, src) = b.describe(&scene, &mut warnings).await;
    assert_eq!(src, DescriptionSource::Derived);
    let visual = b.build_visual(&scene, &desc, 2.0, (64, 36), &mut warnings).await;

    assert_eq!(visual.strategy, VisualStrategy::Synthesized);
    assert_eq!(
        images.prompts.lock().unwrap().as_slice(),
        ["An illustration of: Water boils at 100 degrees".to_string()]
    );
    assert!(warnings.is_empty());
}

#[tokio::test]
async fn failed_derivation_falls_back_to_dialogue() {
    let cfg = small_cfg();
    let collab = Collaborators::offline().with_text(Arc::new(Summarizer { fail: true }));
    let b = SceneTrackBuilder {
        cfg: &cfg,
        collaborators: &collab,
        text: &BlockTextRenderer,
    };
    let mut warnings = Vec::new();
    let (desc, src) = b
        .describe(&Scene::new(4).with_dialogue("Hello"), &mut warnings)
        .await;
    assert_eq!(desc, "Hello");
    assert_eq!(src, DescriptionSource::Dialogue);
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].scene_index, Some(4));

    let (desc, src) = b.describe(&Scene::new(5), &mut warnings).await;
    assert_eq!(desc, FALLBACK_DESCRIPTION);
    assert_eq!(src, DescriptionSource::Fallback);
}

#[tokio::test]
async fn failing_synthesis_ends_in_placeholder() {
    let cfg = small_cfg();
    let collab = Collaborators::offline().with_image(Arc::new(RecordingImages {
        fail: true,
        ..RecordingImages::default()
    }));
    let b = SceneTrackBuilder {
        cfg: &cfg,
        collaborators: &collab,
        text: &BlockTextRenderer,
    };
    let mut warnings = Vec::new();
    let visual = b
        .build_visual(&Scene::new(0), "a lake", 6.0, (64, 36), &mut warnings)
        .await;
    assert_eq!(visual.strategy, VisualStrategy::Placeholder);
    assert_eq!(visual.content.size(), Some((64, 36)));
    // Variant sequence and single still both failed.
    assert_eq!(warnings.len(), 2);
    assert!(warnings.iter().all(|w| w.kind == WarningKind::AssetSynthesis));
}

#[tokio::test]
async fn long_scenes_use_a_variant_sequence() {
    let cfg = small_cfg();
    let images = Arc::new(RecordingImages::default());
    let collab = Collaborators::offline().with_image(images.clone());
    let b = SceneTrackBuilder {
        cfg: &cfg,
        collaborators: &collab,
        text: &BlockTextRenderer,
    };
    let mut warnings = Vec::new();
    let visual = b
        .build_visual(&Scene::new(0), "a lake", 6.0, (64, 36), &mut warnings)
        .await;

    assert_eq!(visual.strategy, VisualStrategy::VariantSequence);
    let VisualContent::Sequence(items) = &visual.content else {
        panic!("expected a sequence");
    };
    assert_eq!(items.len(), 3);
    let total: f64 = items.iter().map(|(_, d)| d).sum();
    assert!((total - 6.0).abs() < 1e-9);

    let mut prompts = images.prompts.lock().unwrap().clone();
    prompts.sort();
    assert_eq!(prompts[0], "a lake. Variation 1, alternate angle or moment");
}

/// Only the first variant prompt and plain prompts succeed.
struct FirstVariantOnly;

#[async_trait]
impl ImageSynthesizer for FirstVariantOnly {
    fn name(&self) -> &'static str {
        "first-variant-only"
    }

    async fn synthesize(&self, prompt: &str) -> ReelResult<image::RgbaImage> {
        if prompt.contains("Variation") && !prompt.contains("Variation 1,") {
            return Err(ReelError::synthesis("variant refused"));
        }
        Ok(image::RgbaImage::from_pixel(8, 8, image::Rgba([10, 200, 10, 255])))
    }
}

#[tokio::test]
async fn lone_surviving_variant_falls_through_to_single_still() {
    let cfg = small_cfg();
    let collab = Collaborators::offline().with_image(Arc::new(FirstVariantOnly));
    let b = SceneTrackBuilder {
        cfg: &cfg,
        collaborators: &collab,
        text: &BlockTextRenderer,
    };
    let mut warnings = Vec::new();
    let visual = b
        .build_visual(&Scene::new(0), "a lake", 6.0, (64, 36), &mut warnings)
        .await;

    assert_eq!(visual.strategy, VisualStrategy::Synthesized);
    assert!(matches!(visual.content, VisualContent::Still(_)));
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].kind, WarningKind::AssetSynthesis);
}

#[tokio::test]
async fn presupplied_image_is_resized_to_target() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("still.png");
    image::RgbaImage::from_pixel(10, 10, image::Rgba([0, 0, 255, 255]))
        .save(&path)
        .unwrap();

    let cfg = small_cfg();
    let collab = Collaborators::offline();
    let b = SceneTrackBuilder {
        cfg: &cfg,
        collaborators: &collab,
        text: &BlockTextRenderer,
    };
    let mut warnings = Vec::new();
    let scene = Scene::new(0).with_image(&path);
    let (clip, strategy) = b
        .build_clip(&scene, "x", 2.5, Some(PathBuf::from("speech.mp3")), &mut warnings)
        .await;

    assert_eq!(strategy, VisualStrategy::PreSupplied);
    assert_eq!(clip.duration_sec, 2.5);
    assert_eq!(clip.audio.as_deref(), Some(Path::new("speech.mp3")));
    assert_eq!(clip.layers.len(), 1);
    let frame = clip.render_at(cfg.canvas, 1.0);
    assert_eq!(frame.pixel(32, 18), [0, 0, 255, 255]);
}

#[tokio::test]
async fn missing_presupplied_image_falls_through() {
    let cfg = small_cfg();
    let collab = Collaborators::offline().with_image(Arc::new(RecordingImages::default()));
    let b = SceneTrackBuilder {
        cfg: &cfg,
        collaborators: &collab,
        text: &BlockTextRenderer,
    };
    let mut warnings = Vec::new();
    let scene = Scene::new(0).with_image("/nope/missing.png");
    let visual = b
        .build_visual(&scene, "x", 1.0, (64, 36), &mut warnings)
        .await;
    assert_eq!(visual.strategy, VisualStrategy::Synthesized);
    assert_eq!(warnings.len(), 1);
}
