//! External generators the compositor calls into.
//!
//! Speech, image, lip-sync and text-transform engines are black boxes behind async traits. The
//! compositor never trusts them: every call is bounded by [`call_with_timeout`] and any failure
//! falls through to the next strategy of the relevant fallback chain.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::foundation::error::{ReelError, ReelResult};
use crate::script::model::VoiceProfile;

/// Speech produced for one scene.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioArtifact {
    pub path: PathBuf,
    /// Duration reported by the engine, when it knows it.
    pub measured_duration_sec: Option<f64>,
}

/// Text to speech.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    fn name(&self) -> &'static str;
    async fn synthesize(&self, text: &str, voice: &VoiceProfile) -> ReelResult<AudioArtifact>;
}

/// Prompt to still image (straight-alpha RGBA, any size).
#[async_trait]
pub trait ImageSynthesizer: Send + Sync {
    fn name(&self) -> &'static str;
    async fn synthesize(&self, prompt: &str) -> ReelResult<image::RgbaImage>;
}

/// Avatar image plus speech to a short talking-head video file.
#[async_trait]
pub trait LipSyncAnimator: Send + Sync {
    fn name(&self) -> &'static str;
    async fn animate(&self, avatar_image: &Path, audio: &Path) -> ReelResult<PathBuf>;
}

/// Turns dialogue into one descriptive sentence usable as an image prompt.
#[async_trait]
pub trait TextTransformer: Send + Sync {
    fn name(&self) -> &'static str;
    async fn describe_dialogue(&self, dialogue: &str, speaker: Option<&str>) -> ReelResult<String>;
}

/// Stand-in for a generator that is not configured. Every call fails, which sends the
/// compositor straight to its fallbacks.
#[derive(Clone, Copy, Debug, Default)]
pub struct Unavailable;

fn unavailable(what: &str) -> ReelError {
    ReelError::synthesis(format!("{what} is not configured"))
}

#[async_trait]
impl SpeechSynthesizer for Unavailable {
    fn name(&self) -> &'static str {
        "unavailable"
    }

    async fn synthesize(&self, _text: &str, _voice: &VoiceProfile) -> ReelResult<AudioArtifact> {
        Err(unavailable("speech synthesis"))
    }
}

#[async_trait]
impl ImageSynthesizer for Unavailable {
    fn name(&self) -> &'static str {
        "unavailable"
    }

    async fn synthesize(&self, _prompt: &str) -> ReelResult<image::RgbaImage> {
        Err(unavailable("image synthesis"))
    }
}

#[async_trait]
impl LipSyncAnimator for Unavailable {
    fn name(&self) -> &'static str {
        "unavailable"
    }

    async fn animate(&self, _avatar_image: &Path, _audio: &Path) -> ReelResult<PathBuf> {
        Err(unavailable("lip-sync"))
    }
}

#[async_trait]
impl TextTransformer for Unavailable {
    fn name(&self) -> &'static str {
        "unavailable"
    }

    async fn describe_dialogue(
        &self,
        _dialogue: &str,
        _speaker: Option<&str>,
    ) -> ReelResult<String> {
        Err(unavailable("text transform"))
    }
}

/// The set of generators one render may use. Members left out are [`Unavailable`].
#[derive(Clone)]
pub struct Collaborators {
    pub speech: Arc<dyn SpeechSynthesizer>,
    pub image: Arc<dyn ImageSynthesizer>,
    pub lipsync: Arc<dyn LipSyncAnimator>,
    pub text: Arc<dyn TextTransformer>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self::offline()
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators")
            .field("speech", &self.speech.name())
            .field("image", &self.image.name())
            .field("lipsync", &self.lipsync.name())
            .field("text", &self.text.name())
            .finish()
    }
}

impl Collaborators {
    /// No generators at all: only pre-supplied assets and placeholders.
    pub fn offline() -> Self {
        Self {
            speech: Arc::new(Unavailable),
            image: Arc::new(Unavailable),
            lipsync: Arc::new(Unavailable),
            text: Arc::new(Unavailable),
        }
    }

    pub fn with_speech(mut self, speech: Arc<dyn SpeechSynthesizer>) -> Self {
        self.speech = speech;
        self
    }

    pub fn with_image(mut self, image: Arc<dyn ImageSynthesizer>) -> Self {
        self.image = image;
        self
    }

    pub fn with_lipsync(mut self, lipsync: Arc<dyn LipSyncAnimator>) -> Self {
        self.lipsync = lipsync;
        self
    }

    pub fn with_text(mut self, text: Arc<dyn TextTransformer>) -> Self {
        self.text = text;
        self
    }
}

/// Run one collaborator call under `timeout`.
///
/// A timeout and every error the collaborator returns come back as
/// [`ReelError::AssetSynthesis`], so callers only ever see a recoverable failure.
pub async fn call_with_timeout<T, F>(what: &str, timeout: Duration, fut: F) -> ReelResult<T>
where
    F: Future<Output = ReelResult<T>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(Ok(v)) => Ok(v),
        Ok(Err(e @ ReelError::AssetSynthesis(_))) => Err(e),
        Ok(Err(e)) => Err(ReelError::synthesis(format!("{what}: {e}"))),
        Err(_) => Err(ReelError::synthesis(format!(
            "{what} timed out after {} ms",
            timeout.as_millis()
        ))),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/synth/mod.rs"]
mod tests;
