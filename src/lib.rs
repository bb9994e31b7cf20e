//! Reelsmith is a scene-timeline compositor.
//!
//! It turns a script of scenes (dialogue, visual descriptions, optional pre-supplied assets) into
//! one captioned MP4:
//!
//! - Resolve each scene's duration from its speech, falling back to the script value
//! - Build one clip per scene through ordered fallback chains (visual source, avatar pane)
//! - Stitch clips with crossfades and overlay word-wrapped captions on the same slots
//! - Stream frames into a [`FrameSink`] such as the `ffmpeg`-backed [`FfmpegSink`]
//!
//! External generators (speech, image, lip-sync, text transform) sit behind the traits in
//! [`Collaborators`]; any of them may fail or time out without failing the render.
#![forbid(unsafe_code)]

mod assets;
mod foundation;

pub(crate) mod audio;
pub(crate) mod config;
pub(crate) mod encode;
pub(crate) mod render;
pub(crate) mod report;
pub(crate) mod script;
pub(crate) mod synth;
pub(crate) mod timeline;

pub use crate::foundation::core::{Canvas, Fps, FrameIndex, FrameRange};
pub use crate::foundation::error::{ReelError, ReelResult, RenderWarning, WarningKind};

pub use crate::assets::media::{
    AudioProbe, FfprobeAudioProbe, MIX_SAMPLE_RATE, is_ffmpeg_on_path, is_ffprobe_on_path,
};
pub use crate::assets::raster::Raster;
pub use crate::assets::text::{
    BlockTextRenderer, SvgTextRenderer, TextEngine, TextRenderer, TextStyle, wrap_words,
};
pub use crate::config::{CaptionStyle, Layout, PlaceholderStyle, RenderConfig};
pub use crate::encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts};
pub use crate::encode::sink::{AudioInputConfig, FrameSink, InMemorySink, SinkConfig};
pub use crate::render::pipeline::{
    RenderStats, RenderThreading, RenderToMp4Opts, encode_timeline, render_frame, render_frames,
    render_to_mp4,
};
pub use crate::report::{FinalRender, SceneReport};
pub use crate::script::model::{Character, Gender, Scene, Script, VoiceProfile, VoiceStyle};
pub use crate::synth::{
    AudioArtifact, Collaborators, ImageSynthesizer, LipSyncAnimator, SpeechSynthesizer,
    TextTransformer, Unavailable,
};
pub use crate::timeline::assembler::{Assembled, Assembler, CancelHandle, default_output_path};
pub use crate::timeline::avatar::{AvatarStrategy, PaneRect, SplitLayout, SplitPanes};
pub use crate::timeline::duration::DurationSource;
pub use crate::timeline::model::{
    CaptionClip, Clip, Layer, PlacedClip, Timeline, Transition, VisualContent,
};
pub use crate::timeline::scene_track::DescriptionSource;
pub use crate::timeline::visual::VisualStrategy;
