use crate::assets::raster::Raster;
use crate::assets::text::{TextRenderer, wrap_words};
use crate::config::RenderConfig;

/// Prompt used when a scene has neither a visual description nor dialogue.
pub const FALLBACK_DESCRIPTION: &str = "Educational illustration";

/// Named ways of obtaining a scene visual, tried in order until one succeeds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisualStrategy {
    /// Image supplied with the script.
    PreSupplied,
    /// One freshly synthesized still.
    Synthesized,
    /// Several synthesized variants shown back to back.
    VariantSequence,
    /// Solid fill with the description as text. Cannot fail.
    Placeholder,
}

/// Ordered visual strategies for one scene.
///
/// With `long_scene_variants` set, a single still is considered insufficient for a long scene,
/// so the variant sequence is tried before it.
pub fn visual_chain(has_image: bool, duration_sec: f64, cfg: &RenderConfig) -> Vec<VisualStrategy> {
    let long = duration_sec >= cfg.variant_threshold_sec;
    let mut chain = Vec::with_capacity(4);
    if has_image {
        chain.push(VisualStrategy::PreSupplied);
    }
    if long && cfg.long_scene_variants {
        chain.push(VisualStrategy::VariantSequence);
        chain.push(VisualStrategy::Synthesized);
    } else {
        chain.push(VisualStrategy::Synthesized);
        if long {
            chain.push(VisualStrategy::VariantSequence);
        }
    }
    chain.push(VisualStrategy::Placeholder);
    chain
}

/// Number of variants for a scene: one per two seconds, between 2 and 4.
pub fn variant_count(duration_sec: f64) -> usize {
    let per_two = (duration_sec / 2.0).floor().max(0.0) as usize;
    per_two.clamp(2, 4)
}

/// Prompt for variant `k` (1-based).
pub fn variant_prompt(description: &str, k: usize) -> String {
    format!("{description}. Variation {k}, alternate angle or moment")
}

/// Solid placeholder with `description` wrapped and centered from a third of the height down.
pub fn placeholder_visual(
    description: &str,
    width: u32,
    height: u32,
    cfg: &RenderConfig,
    text: &dyn TextRenderer,
) -> Raster {
    let mut out = Raster::solid(width, height, cfg.placeholder_rgba);
    let style = cfg.placeholder.text_style();
    let bound = width.saturating_sub(cfg.placeholder.margin_px).max(1) as f32;
    let lines = wrap_words(description, bound, &style, text);
    if lines.is_empty() {
        return out;
    }
    let top = (height / 3) as f32;
    match text.render_block(&lines, width, height, top, &style) {
        Ok(layer) => out.blit_over(&layer, 0, 0, 1.0),
        Err(e) => tracing::warn!(error = %e, "placeholder text render failed; using bare fill"),
    }
    out
}
