/// Convenience result type used across reelsmith.
pub type ReelResult<T> = Result<T, ReelError>;

/// Top-level error taxonomy used by compositor APIs.
///
/// Only [`ReelError::Encode`], [`ReelError::EmptyTimeline`], [`ReelError::Validation`] and
/// [`ReelError::Cancelled`] ever escape a render. The remaining variants are produced inside the
/// fallback chains and folded into [`RenderWarning`]s.
#[derive(thiserror::Error, Debug)]
pub enum ReelError {
    /// Invalid script or configuration data.
    #[error("validation error: {0}")]
    Validation(String),

    /// An external generator (speech, image, lip-sync, text transform) failed or timed out.
    #[error("asset synthesis error: {0}")]
    AssetSynthesis(String),

    /// Audio duration could not be measured.
    #[error("duration probe error: {0}")]
    DurationProbe(String),

    /// A scene clip could not be built even after every fallback.
    #[error("composition error: {0}")]
    Composition(String),

    /// Final write failed (ffmpeg, disk, memory).
    #[error("encode error: {0}")]
    Encode(String),

    /// No scene produced a usable clip.
    #[error("empty timeline: {0}")]
    EmptyTimeline(String),

    /// Render was cancelled on a scene boundary.
    #[error("render cancelled")]
    Cancelled,

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ReelError {
    /// Build a [`ReelError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`ReelError::AssetSynthesis`] value.
    pub fn synthesis(msg: impl Into<String>) -> Self {
        Self::AssetSynthesis(msg.into())
    }

    /// Build a [`ReelError::DurationProbe`] value.
    pub fn probe(msg: impl Into<String>) -> Self {
        Self::DurationProbe(msg.into())
    }

    /// Build a [`ReelError::Composition`] value.
    pub fn composition(msg: impl Into<String>) -> Self {
        Self::Composition(msg.into())
    }

    /// Build a [`ReelError::Encode`] value.
    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    /// Build a [`ReelError::EmptyTimeline`] value.
    pub fn empty_timeline(msg: impl Into<String>) -> Self {
        Self::EmptyTimeline(msg.into())
    }

    /// Whether this error aborts a render instead of being absorbed by a fallback chain.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Encode(_) | Self::EmptyTimeline(_) | Self::Validation(_) | Self::Cancelled
        )
    }
}

/// Category of an absorbed, non-fatal failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// A generator failed; a fallback strategy was used instead.
    AssetSynthesis,
    /// Audio could not be probed; nominal duration was used.
    DurationProbe,
    /// A scene clip could not be built; its slot was left as a gap.
    Composition,
    /// Measured audio diverges strongly from the nominal duration.
    DurationDivergence,
    /// A crossfade could not be applied; a hard cut was used.
    TransitionDegraded,
    /// Scene audio could not be decoded for the final mix; the scene is silent.
    AudioDecode,
}

/// Absorbed failure attached to a successful render.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RenderWarning {
    /// Scene the warning belongs to, if any.
    pub scene_index: Option<usize>,
    /// Warning category.
    pub kind: WarningKind,
    /// Human-readable detail.
    pub message: String,
}

impl RenderWarning {
    /// Build a warning bound to one scene.
    pub fn scene(scene_index: usize, kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            scene_index: Some(scene_index),
            kind,
            message: message.into(),
        }
    }

    /// Map an absorbed error onto the matching warning category.
    pub fn from_error(scene_index: Option<usize>, err: &ReelError) -> Self {
        let kind = match err {
            ReelError::DurationProbe(_) => WarningKind::DurationProbe,
            ReelError::Composition(_) => WarningKind::Composition,
            _ => WarningKind::AssetSynthesis,
        };
        Self {
            scene_index,
            kind,
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
