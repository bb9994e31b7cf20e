use std::sync::Arc;

use crate::assets::raster::Raster;
use crate::assets::text::{TextRenderer, wrap_words};
use crate::config::CaptionStyle;
use crate::foundation::core::Canvas;
use crate::foundation::error::{ReelResult, RenderWarning, WarningKind};
use crate::timeline::model::CaptionClip;

/// One scene's slot on the timeline, as placed by the assembler.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneSlot {
    pub scene_index: usize,
    pub start_sec: f64,
    pub duration_sec: f64,
}

/// Lays out and rasterizes caption bands.
pub struct CaptionEngine<'a> {
    pub style: &'a CaptionStyle,
    pub canvas: Canvas,
    pub text: &'a dyn TextRenderer,
}

impl CaptionEngine<'_> {
    pub fn max_line_width(&self) -> f32 {
        self.style.max_line_width(self.canvas)
    }

    /// Greedy word wrap bounded by the canvas width minus the margin.
    pub fn layout_lines(&self, caption: &str) -> Vec<String> {
        wrap_words(
            caption,
            self.max_line_width(),
            &self.style.text_style(),
            self.text,
        )
    }

    /// How many lines fit in the band below the top padding.
    pub fn max_lines(&self) -> usize {
        let style = self.style.text_style();
        let line_h = self.text.line_height(&style);
        let advance = style.line_advance(self.text);
        let room = self.style.band_height_px as f32 - self.style.top_padding;
        if room < line_h || advance <= 0.0 {
            return 1;
        }
        1 + ((room - line_h) / advance).floor() as usize
    }

    /// Top edge of the band on the canvas.
    pub fn band_origin_y(&self) -> i64 {
        i64::from(self.canvas.height) - i64::from(self.style.band_bottom_offset_px)
    }

    /// Transparent full-width band with `lines` stacked from the top padding, each centered.
    pub fn render_band(&self, lines: &[String]) -> ReelResult<Raster> {
        self.text.render_block(
            lines,
            self.canvas.width,
            self.style.band_height_px,
            self.style.top_padding,
            &self.style.text_style(),
        )
    }

    /// One caption clip per scene with caption text, each covering exactly that scene's slot.
    /// Scenes without text produce nothing; their slot is simply uncaptioned.
    pub fn build_track(
        &self,
        cues: &[(SceneSlot, &str)],
        warnings: &mut Vec<RenderWarning>,
    ) -> Vec<CaptionClip> {
        let max_lines = self.max_lines();
        let origin_y = self.band_origin_y();
        let mut out = Vec::new();

        for (slot, caption) in cues {
            let caption = caption.trim();
            if caption.is_empty() {
                continue;
            }
            let mut lines = self.layout_lines(caption);
            if lines.len() > max_lines {
                let dropped = lines.len() - max_lines;
                tracing::warn!(
                    scene = slot.scene_index,
                    dropped,
                    "caption overflows its band; trailing lines dropped"
                );
                warnings.push(RenderWarning::scene(
                    slot.scene_index,
                    WarningKind::Composition,
                    format!("caption overflows band; {dropped} trailing line(s) dropped"),
                ));
                lines.truncate(max_lines);
            }

            let band = match self.render_band(&lines) {
                Ok(band) => band,
                Err(e) => {
                    tracing::warn!(scene = slot.scene_index, error = %e, "caption render failed");
                    warnings.push(RenderWarning::scene(
                        slot.scene_index,
                        WarningKind::Composition,
                        format!("caption render failed: {e}"),
                    ));
                    continue;
                }
            };

            out.push(CaptionClip {
                scene_index: slot.scene_index,
                start_sec: slot.start_sec,
                duration_sec: slot.duration_sec,
                lines,
                band: Arc::new(band),
                origin_y,
            });
        }
        out
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/captions.rs"]
mod tests;
