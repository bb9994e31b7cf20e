use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::foundation::error::{ReelError, ReelResult};

/// An ordered narrative script: the input of every render.
///
/// Scripts are strict JSON documents. Unknown fields are rejected so typos surface as validation
/// errors instead of silently falling back to defaults.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Script {
    /// Optional human-facing title, only used in logs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Scenes in playback order.
    pub scenes: Vec<Scene>,
    /// Cast used for voices and avatars.
    #[serde(default)]
    pub characters: Vec<Character>,
    /// Character whose avatar is preferred in split layout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_character: Option<String>,
    /// Voice used when neither the scene nor its speaker names one.
    #[serde(default)]
    pub default_voice: VoiceProfile,
}

/// One narrative beat.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scene {
    /// Position label; must increase strictly through the script.
    pub index: usize,
    /// Script-declared duration in seconds. Missing means the configured default (5s).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nominal_duration_sec: Option<f64>,
    /// Spoken text; may be empty.
    #[serde(default)]
    pub dialogue: String,
    /// Intended visual; may be empty.
    #[serde(default)]
    pub visual_description: String,
    /// Pre-supplied still image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<PathBuf>,
    /// Pre-supplied speech audio.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<PathBuf>,
    /// Caption override. Missing means the dialogue is captioned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption_text: Option<String>,
    /// Name of the speaking character.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
    /// Explicit voice for this scene.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice: Option<VoiceProfile>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Character {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice: Option<VoiceProfile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_image: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Gender {
    Male,
    #[default]
    Female,
    Neutral,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum VoiceStyle {
    #[default]
    Professional,
    Friendly,
    Energetic,
    Calm,
    Confident,
    Playful,
    Narrative,
    Technical,
}

/// Speaker voice characteristics handed to speech synthesis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VoiceProfile {
    #[serde(default)]
    pub gender: Gender,
    #[serde(default)]
    pub style: VoiceStyle,
}

/// Voice used for keys missing from the table.
pub const DEFAULT_VOICE_ID: &str = "alloy";

const VOICE_TABLE: &[(&str, &str)] = &[
    ("Male_Professional", "onyx"),
    ("Female_Professional", "nova"),
    ("Neutral_Professional", "alloy"),
    ("Male_Friendly", "echo"),
    ("Female_Friendly", "shimmer"),
    ("Neutral_Friendly", "fable"),
    ("Male_Energetic", "fable"),
    ("Female_Energetic", "alloy"),
    ("Neutral_Energetic", "echo"),
    ("Male_Calm", "onyx"),
    ("Female_Calm", "nova"),
    ("Neutral_Calm", "shimmer"),
    ("Male_Confident", "onyx"),
    ("Female_Confident", "nova"),
    ("Neutral_Confident", "alloy"),
    ("Male_Playful", "fable"),
    ("Female_Playful", "shimmer"),
    ("Neutral_Playful", "echo"),
    ("Male_Narrative", "echo"),
    ("Female_Narrative", "nova"),
    ("Neutral_Narrative", "alloy"),
    ("Male_Technical", "onyx"),
    ("Female_Technical", "nova"),
    ("Neutral_Technical", "alloy"),
];

/// Look up a `Gender_Style` key in the voice table.
pub fn voice_id_for_key(key: &str) -> &'static str {
    VOICE_TABLE
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, v)| *v)
        .unwrap_or(DEFAULT_VOICE_ID)
}

impl VoiceProfile {
    pub fn new(gender: Gender, style: VoiceStyle) -> Self {
        Self { gender, style }
    }

    /// `Gender_Style` lookup key, e.g. `Male_Calm`.
    pub fn key(&self) -> String {
        format!("{:?}_{:?}", self.gender, self.style)
    }

    /// Synthesis engine voice id.
    pub fn voice_id(&self) -> &'static str {
        voice_id_for_key(&self.key())
    }
}

impl Scene {
    /// Scene with only an index; handy for programmatic scripts.
    pub fn new(index: usize) -> Self {
        Self {
            index,
            ..Self::default()
        }
    }

    pub fn with_nominal(mut self, secs: f64) -> Self {
        self.nominal_duration_sec = Some(secs);
        self
    }

    pub fn with_dialogue(mut self, text: impl Into<String>) -> Self {
        self.dialogue = text.into();
        self
    }

    pub fn with_visual(mut self, text: impl Into<String>) -> Self {
        self.visual_description = text.into();
        self
    }

    pub fn with_audio(mut self, path: impl Into<PathBuf>) -> Self {
        self.audio = Some(path.into());
        self
    }

    pub fn with_image(mut self, path: impl Into<PathBuf>) -> Self {
        self.image = Some(path.into());
        self
    }

    /// Nominal duration, using `default_sec` when the script leaves it out.
    pub fn nominal_or(&self, default_sec: f64) -> f64 {
        self.nominal_duration_sec.unwrap_or(default_sec)
    }

    /// Text burned in as caption: the override when present, else the dialogue.
    pub fn caption(&self) -> &str {
        self.caption_text
            .as_deref()
            .unwrap_or(&self.dialogue)
            .trim()
    }

    /// A scene with nothing to say and nothing to show.
    pub fn is_empty(&self) -> bool {
        self.dialogue.trim().is_empty()
            && self.visual_description.trim().is_empty()
            && self.image.is_none()
            && self.audio.is_none()
    }
}

impl Script {
    /// Parse a script from a JSON reader.
    pub fn from_reader<R: std::io::Read>(r: R) -> ReelResult<Self> {
        let script: Script = serde_json::from_reader(r)
            .map_err(|e| ReelError::validation(format!("parse script JSON: {e}")))?;
        Ok(script)
    }

    /// Parse a script from disk. Relative asset paths are resolved against the script's
    /// directory.
    pub fn from_path(path: impl AsRef<Path>) -> ReelResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            ReelError::validation(format!("open script JSON '{}': {e}", path.display()))
        })?;
        let mut script = Self::from_reader(BufReader::new(f))?;
        if let Some(root) = path.parent() {
            script.rebase_paths(root);
        }
        Ok(script)
    }

    fn rebase_paths(&mut self, root: &Path) {
        let rebase = |p: &mut Option<PathBuf>| {
            if let Some(inner) = p
                && inner.is_relative()
            {
                *inner = root.join(&*inner);
            }
        };
        for scene in &mut self.scenes {
            rebase(&mut scene.image);
            rebase(&mut scene.audio);
        }
        for ch in &mut self.characters {
            rebase(&mut ch.avatar_image);
        }
    }

    pub fn validate(&self) -> ReelResult<()> {
        if self.scenes.is_empty() {
            return Err(ReelError::validation("script must contain at least one scene"));
        }
        let mut prev: Option<usize> = None;
        for scene in &self.scenes {
            if let Some(p) = prev
                && scene.index <= p
            {
                return Err(ReelError::validation(format!(
                    "scene indexes must increase strictly (scene {} follows {p})",
                    scene.index
                )));
            }
            prev = Some(scene.index);
        }

        for (i, ch) in self.characters.iter().enumerate() {
            if ch.name.trim().is_empty() {
                return Err(ReelError::validation(format!(
                    "character #{i} must have a non-empty name"
                )));
            }
            if self.characters[..i].iter().any(|c| c.name == ch.name) {
                return Err(ReelError::validation(format!(
                    "duplicate character name '{}'",
                    ch.name
                )));
            }
        }
        Ok(())
    }

    pub fn character(&self, name: &str) -> Option<&Character> {
        self.characters.iter().find(|c| c.name == name)
    }

    /// Voice for one scene: the scene's own voice, else its speaker's, else the script default.
    pub fn voice_for(&self, scene: &Scene) -> VoiceProfile {
        if let Some(v) = scene.voice {
            return v;
        }
        scene
            .speaker
            .as_deref()
            .and_then(|name| self.character(name))
            .and_then(|c| c.voice)
            .unwrap_or(self.default_voice)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/script/model.rs"]
mod tests;
