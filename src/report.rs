//! Serializable summary of a render.

use std::path::PathBuf;

use crate::foundation::error::RenderWarning;
use crate::timeline::avatar::{AvatarStrategy, SplitPanes};
use crate::timeline::duration::DurationSource;
use crate::timeline::model::Transition;
use crate::timeline::scene_track::DescriptionSource;
use crate::timeline::visual::VisualStrategy;

/// How one scene ended up on the timeline.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct SceneReport {
    pub scene_index: usize,
    pub start_sec: f64,
    pub duration_sec: f64,
    pub nominal_sec: f64,
    pub duration_source: DurationSource,
    pub description: String,
    pub description_source: DescriptionSource,
    /// `None` for a gap.
    pub visual: Option<VisualStrategy>,
    /// Set in avatar-split layout only.
    pub avatar: Option<AvatarStrategy>,
    pub panes: Option<SplitPanes>,
    pub transition: Transition,
    /// Empty when the scene is uncaptioned.
    pub caption_lines: Vec<String>,
    pub has_audio: bool,
    /// The slot keeps its timing but shows only the background.
    pub gap: bool,
}

impl SceneReport {
    pub fn end_sec(&self) -> f64 {
        self.start_sec + self.duration_sec
    }
}

/// Result of a successful render.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct FinalRender {
    pub path: PathBuf,
    /// Exact sum of the per-scene resolved durations.
    pub total_duration_sec: f64,
    pub frame_count: u64,
    pub scenes: Vec<SceneReport>,
    /// Every absorbed failure, in the order it happened.
    pub warnings: Vec<RenderWarning>,
}
