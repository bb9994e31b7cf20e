use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::assets::text::TextStyle;
use crate::foundation::core::{Canvas, Fps};
use crate::foundation::error::{ReelError, ReelResult};

/// Per-scene layout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    /// Scene visual fills the canvas.
    #[default]
    FullFrame,
    /// Avatar pane on the left quarter, scene visual on the right three quarters.
    AvatarSplit,
}

/// Caption band geometry and glyph style.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CaptionStyle {
    pub font_size: f32,
    pub stroke_width: f32,
    /// Horizontal margin subtracted from the canvas width to get the line bound.
    pub margin_px: u32,
    pub band_height_px: u32,
    /// Distance from the canvas bottom edge to the band's top edge.
    pub band_bottom_offset_px: u32,
    pub line_gap: f32,
    /// Offset of the first line inside the band.
    pub top_padding: f32,
    pub fill_rgba: [u8; 4],
    pub stroke_rgba: [u8; 4],
    pub font_family: String,
}

impl Default for CaptionStyle {
    fn default() -> Self {
        Self {
            font_size: 36.0,
            stroke_width: 2.0,
            margin_px: 80,
            band_height_px: 140,
            band_bottom_offset_px: 160,
            line_gap: 6.0,
            top_padding: 10.0,
            fill_rgba: [255, 255, 255, 255],
            stroke_rgba: [0, 0, 0, 255],
            font_family: TextStyle::default().font_family,
        }
    }
}

impl CaptionStyle {
    pub fn text_style(&self) -> TextStyle {
        TextStyle {
            font_size: self.font_size,
            fill_rgba: self.fill_rgba,
            stroke_rgba: self.stroke_rgba,
            stroke_width: self.stroke_width,
            line_gap: self.line_gap,
            font_family: self.font_family.clone(),
        }
    }

    /// Maximum rendered width of one caption line.
    pub fn max_line_width(&self, canvas: Canvas) -> f32 {
        canvas.width.saturating_sub(self.margin_px) as f32
    }
}

/// Text drawn on programmatic placeholder visuals.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlaceholderStyle {
    pub font_size: f32,
    pub line_gap: f32,
    pub margin_px: u32,
    pub text_rgba: [u8; 4],
}

impl Default for PlaceholderStyle {
    fn default() -> Self {
        Self {
            font_size: 40.0,
            line_gap: 10.0,
            margin_px: 80,
            text_rgba: [255, 255, 255, 255],
        }
    }
}

impl PlaceholderStyle {
    pub fn text_style(&self) -> TextStyle {
        TextStyle {
            font_size: self.font_size,
            fill_rgba: self.text_rgba,
            stroke_width: 0.0,
            line_gap: self.line_gap,
            ..TextStyle::default()
        }
    }
}

/// Every knob of one render. All fields default, so `{}` is a valid config file.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    pub canvas: Canvas,
    pub fps: Fps,
    pub layout: Layout,
    /// Crossfade window between consecutive scenes; `0` means hard cuts only.
    pub crossfade_sec: f64,
    /// Scenes at least this long may use a variant image sequence.
    pub variant_threshold_sec: f64,
    /// Prefer a variant sequence over a single still for long scenes.
    pub long_scene_variants: bool,
    /// Nominal duration for scenes that do not declare one.
    pub default_scene_duration_sec: f64,
    /// Upper bound for every collaborator call.
    pub collaborator_timeout_ms: u64,
    /// Scenes whose assets are prepared at the same time.
    pub max_concurrent_scenes: usize,
    pub skip_lipsync: bool,
    pub enable_audio: bool,
    pub overwrite: bool,
    /// Parallel frame rendering.
    pub parallel: bool,
    /// Frames per render chunk.
    pub chunk_size: usize,
    /// Canvas fill under every scene (straight RGBA8).
    pub background_rgba: [u8; 4],
    /// Placeholder visual fill (straight RGBA8).
    pub placeholder_rgba: [u8; 4],
    /// Avatar placeholder pane fill (straight RGBA8).
    pub avatar_placeholder_rgba: [u8; 4],
    /// Measured/nominal ratio (either way) above which a divergence warning is recorded.
    pub divergence_warn_ratio: f64,
    pub caption: CaptionStyle,
    pub placeholder: PlaceholderStyle,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            canvas: Canvas::default(),
            fps: Fps::default(),
            layout: Layout::default(),
            crossfade_sec: 0.5,
            variant_threshold_sec: 4.0,
            long_scene_variants: true,
            default_scene_duration_sec: 5.0,
            collaborator_timeout_ms: 120_000,
            max_concurrent_scenes: 4,
            skip_lipsync: false,
            enable_audio: true,
            overwrite: true,
            parallel: false,
            chunk_size: 64,
            background_rgba: [0, 0, 0, 255],
            placeholder_rgba: [64, 64, 128, 255],
            avatar_placeholder_rgba: [128, 128, 128, 255],
            divergence_warn_ratio: 2.0,
            caption: CaptionStyle::default(),
            placeholder: PlaceholderStyle::default(),
        }
    }
}

impl RenderConfig {
    pub fn from_reader<R: std::io::Read>(r: R) -> ReelResult<Self> {
        let cfg: RenderConfig = serde_json::from_reader(r)
            .map_err(|e| ReelError::validation(format!("parse render config JSON: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_path(path: impl AsRef<Path>) -> ReelResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            ReelError::validation(format!("open render config '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    pub fn validate(&self) -> ReelResult<()> {
        self.canvas.validate()?;
        Fps::new(self.fps.num, self.fps.den)?;
        if self.fps.den != 1 {
            return Err(ReelError::validation(
                "fps must be integral (den == 1) for mp4 output",
            ));
        }
        for (name, v) in [
            ("crossfade_sec", self.crossfade_sec),
            ("variant_threshold_sec", self.variant_threshold_sec),
        ] {
            if !v.is_finite() || v < 0.0 {
                return Err(ReelError::validation(format!(
                    "{name} must be finite and >= 0"
                )));
            }
        }
        if !self.default_scene_duration_sec.is_finite() || self.default_scene_duration_sec <= 0.0 {
            return Err(ReelError::validation(
                "default_scene_duration_sec must be finite and > 0",
            ));
        }
        if !self.divergence_warn_ratio.is_finite() || self.divergence_warn_ratio < 1.0 {
            return Err(ReelError::validation(
                "divergence_warn_ratio must be finite and >= 1",
            ));
        }
        if self.collaborator_timeout_ms == 0 {
            return Err(ReelError::validation("collaborator_timeout_ms must be > 0"));
        }
        if self.max_concurrent_scenes == 0 {
            return Err(ReelError::validation("max_concurrent_scenes must be > 0"));
        }
        if self.chunk_size == 0 {
            return Err(ReelError::validation("chunk_size must be > 0"));
        }
        if self.caption.margin_px >= self.canvas.width {
            return Err(ReelError::validation(
                "caption margin_px must be smaller than the canvas width",
            ));
        }
        if self.caption.band_height_px == 0
            || self.caption.band_height_px > self.canvas.height
            || self.caption.band_bottom_offset_px > self.canvas.height
        {
            return Err(ReelError::validation(
                "caption band must be non-empty and fit inside the canvas",
            ));
        }
        if self.placeholder.margin_px >= self.canvas.width {
            return Err(ReelError::validation(
                "placeholder margin_px must be smaller than the canvas width",
            ));
        }
        self.caption.text_style().validate()?;
        self.placeholder.text_style().validate()?;
        Ok(())
    }

    pub fn collaborator_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.collaborator_timeout_ms)
    }
}
