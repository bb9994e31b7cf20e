use std::path::PathBuf;
use std::sync::Arc;

use crate::assets::raster::Raster;
use crate::foundation::core::{Canvas, Fps, FrameIndex, FrameRange};
use crate::foundation::error::ReelResult;

/// Picture source of one layer, sampled at clip-local time.
///
/// Whatever its native length, content is held (stills, the last sequence item) or looped
/// (decoded frames) to cover the clip; it is never time-stretched.
#[derive(Clone, Debug)]
pub enum VisualContent {
    Still(Arc<Raster>),
    /// Back-to-back items, each shown for its duration in seconds.
    Sequence(Vec<(Arc<Raster>, f64)>),
    /// Decoded video frames at `fps`, looped.
    Frames { frames: Arc<Vec<Raster>>, fps: f64 },
}

impl VisualContent {
    pub fn sample(&self, local_sec: f64) -> Option<&Raster> {
        let t = local_sec.max(0.0);
        match self {
            Self::Still(r) => Some(r.as_ref()),
            Self::Sequence(items) => {
                let mut end = 0.0f64;
                for (r, d) in items {
                    end += *d;
                    if t < end {
                        return Some(r.as_ref());
                    }
                }
                items.last().map(|(r, _)| r.as_ref())
            }
            Self::Frames { frames, fps } => {
                if frames.is_empty() {
                    return None;
                }
                let idx = if *fps > 0.0 {
                    (t * fps).floor() as usize % frames.len()
                } else {
                    0
                };
                frames.get(idx)
            }
        }
    }

    /// `(width, height)` of the first sampled raster.
    pub fn size(&self) -> Option<(u32, u32)> {
        self.sample(0.0).map(|r| (r.width, r.height))
    }
}

/// Content placed at a pixel offset on the canvas.
#[derive(Clone, Debug)]
pub struct Layer {
    pub content: VisualContent,
    pub x: i64,
    pub y: i64,
}

/// Fixed-duration audio+visual unit for one scene.
#[derive(Clone, Debug)]
pub struct Clip {
    pub scene_index: usize,
    pub duration_sec: f64,
    /// Canvas fill under the layers (straight RGBA8).
    pub background_rgba: [u8; 4],
    /// Bottom-to-top.
    pub layers: Vec<Layer>,
    /// Speech attached once to the clip.
    pub audio: Option<PathBuf>,
}

impl Clip {
    /// A slot that keeps timing but shows nothing but the background.
    pub fn gap(scene_index: usize, duration_sec: f64, background_rgba: [u8; 4]) -> Self {
        Self {
            scene_index,
            duration_sec,
            background_rgba,
            layers: Vec::new(),
            audio: None,
        }
    }

    pub fn is_gap(&self) -> bool {
        self.layers.is_empty() && self.audio.is_none()
    }

    /// Composite this clip at clip-local time `local_sec`.
    pub fn render_at(&self, canvas: Canvas, local_sec: f64) -> Raster {
        let mut out = Raster::solid(canvas.width, canvas.height, self.background_rgba);
        let t = local_sec.clamp(0.0, self.duration_sec.max(0.0));
        for layer in &self.layers {
            if let Some(r) = layer.content.sample(t) {
                out.blit_over(r, layer.x, layer.y, 1.0);
            }
        }
        out
    }
}

/// How a clip enters after the previous one.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Transition {
    Cut,
    /// Blend from the previous clip's last frame over the first `window_sec` of this clip.
    Crossfade { window_sec: f64 },
}

/// A clip at its absolute position on the primary track.
#[derive(Clone, Debug)]
pub struct PlacedClip {
    pub clip: Clip,
    pub start_sec: f64,
    pub transition: Transition,
}

impl PlacedClip {
    pub fn end_sec(&self) -> f64 {
        self.start_sec + self.clip.duration_sec
    }

    pub fn frame_range(&self, fps: Fps) -> ReelResult<FrameRange> {
        FrameRange::from_secs(self.start_sec, self.end_sec(), fps)
    }
}

/// Transparent caption band shown over one scene's slot.
#[derive(Clone, Debug)]
pub struct CaptionClip {
    pub scene_index: usize,
    pub start_sec: f64,
    pub duration_sec: f64,
    pub lines: Vec<String>,
    pub band: Arc<Raster>,
    /// Top edge of the band on the canvas.
    pub origin_y: i64,
}

impl CaptionClip {
    pub fn frame_range(&self, fps: Fps) -> ReelResult<FrameRange> {
        FrameRange::from_secs(self.start_sec, self.start_sec + self.duration_sec, fps)
    }
}

/// Primary track plus caption overlay sharing one global duration.
#[derive(Clone, Debug)]
pub struct Timeline {
    pub canvas: Canvas,
    pub fps: Fps,
    /// Exact sum of per-scene resolved durations.
    pub duration_sec: f64,
    pub primary: Vec<PlacedClip>,
    pub captions: Vec<CaptionClip>,
}

impl Timeline {
    pub fn total_frames(&self) -> u64 {
        self.fps.secs_to_frame_round(self.duration_sec)
    }

    /// Index of the primary clip covering `frame`, if any.
    pub fn clip_at(&self, frame: FrameIndex) -> Option<usize> {
        self.primary.iter().position(|p| {
            p.frame_range(self.fps)
                .map(|r| r.contains(frame))
                .unwrap_or(false)
        })
    }
}
