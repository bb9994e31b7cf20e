use std::sync::Mutex;

use async_trait::async_trait;

use super::*;
use crate::assets::raster::Raster;
use crate::assets::text::BlockTextRenderer;
use crate::config::{CaptionStyle, PlaceholderStyle};
use crate::foundation::core::{Canvas, Fps};
use crate::script::model::{Character, Gender, VoiceProfile, VoiceStyle};
use crate::synth::SpeechSynthesizer;
use crate::timeline::model::{Layer, Transition, VisualContent};

/// Reports a fixed duration per file name; anything else is unreadable.
struct TableProbe;

impl AudioProbe for TableProbe {
    fn duration_sec(&self, path: &Path) -> ReelResult<f64> {
        match path.file_name().and_then(|n| n.to_str()) {
            Some("three.wav") => Ok(3.0),
            _ => Err(ReelError::probe("unreadable")),
        }
    }
}

#[derive(Default)]
struct RecordingSpeech {
    fail: bool,
    voices: Mutex<Vec<&'static str>>,
}

#[async_trait]
impl SpeechSynthesizer for RecordingSpeech {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn synthesize(&self, text: &str, voice: &VoiceProfile) -> ReelResult<AudioArtifact> {
        self.voices.lock().unwrap().push(voice.voice_id());
        if self.fail {
            return Err(ReelError::synthesis("tts down"));
        }
        Ok(AudioArtifact {
            path: PathBuf::from(format!("{}.mp3", text.len())),
            measured_duration_sec: Some(2.5),
        })
    }
}

fn small_cfg() -> RenderConfig {
    RenderConfig {
        canvas: Canvas {
            width: 64,
            height: 36,
        },
        fps: Fps::new(10, 1).unwrap(),
        enable_audio: false,
        caption: CaptionStyle {
            font_size: 6.0,
            stroke_width: 1.0,
            margin_px: 8,
            band_height_px: 16,
            band_bottom_offset_px: 18,
            line_gap: 1.0,
            top_padding: 1.0,
            ..CaptionStyle::default()
        },
        placeholder: PlaceholderStyle {
            font_size: 6.0,
            line_gap: 1.0,
            margin_px: 8,
            ..PlaceholderStyle::default()
        },
        ..RenderConfig::default()
    }
}

fn assembler(cfg: RenderConfig, collaborators: Collaborators) -> Assembler {
    Assembler::new(cfg, collaborators, Arc::new(BlockTextRenderer))
        .unwrap()
        .with_probe(Arc::new(TableProbe))
}

fn script(scenes: Vec<Scene>) -> Script {
    Script {
        scenes,
        ..Script::default()
    }
}

#[tokio::test]
async fn presupplied_audio_wins_over_synthesis() {
    let speech = Arc::new(RecordingSpeech::default());
    let asm = assembler(
        small_cfg(),
        Collaborators::offline().with_speech(speech.clone()),
    );
    let s = script(vec![
        Scene::new(0)
            .with_nominal(5.0)
            .with_dialogue("Hi")
            .with_audio("three.wav"),
    ]);
    let out = asm.assemble(&s).await.unwrap();

    assert!(speech.voices.lock().unwrap().is_empty());
    assert_eq!(out.scenes[0].duration_source, DurationSource::Probed);
    assert_eq!(out.timeline.duration_sec, 3.0);
    assert!(out.scenes[0].has_audio);
}

#[tokio::test]
async fn synthesized_speech_duration_is_authoritative() {
    let speech = Arc::new(RecordingSpeech::default());
    let asm = assembler(
        small_cfg(),
        Collaborators::offline().with_speech(speech.clone()),
    );
    let out = asm
        .assemble(&script(vec![Scene::new(0).with_nominal(5.0).with_dialogue("Hi")]))
        .await
        .unwrap();
    assert_eq!(out.scenes[0].duration_source, DurationSource::Reported);
    assert_eq!(out.scenes[0].nominal_sec, 5.0);
    assert_eq!(out.timeline.duration_sec, 2.5);
}

#[tokio::test]
async fn speech_voice_follows_the_speaker() {
    let speech = Arc::new(RecordingSpeech::default());
    let asm = assembler(
        small_cfg(),
        Collaborators::offline().with_speech(speech.clone()),
    );
    let mut scene = Scene::new(0).with_dialogue("Hello there");
    scene.speaker = Some("Ada".to_string());
    let mut s = script(vec![scene, Scene::new(1).with_dialogue("Bye")]);
    s.characters = vec![Character {
        name: "Ada".to_string(),
        voice: Some(VoiceProfile::new(Gender::Male, VoiceStyle::Calm)),
        avatar_image: None,
    }];
    asm.assemble(&s).await.unwrap();

    let mut voices = speech.voices.lock().unwrap().clone();
    voices.sort();
    let mut expected = vec![
        VoiceProfile::new(Gender::Male, VoiceStyle::Calm).voice_id(),
        s.default_voice.voice_id(),
    ];
    expected.sort();
    assert_eq!(voices, expected);
}

#[tokio::test]
async fn failed_speech_falls_back_to_nominal() {
    let speech = Arc::new(RecordingSpeech {
        fail: true,
        ..RecordingSpeech::default()
    });
    let asm = assembler(small_cfg(), Collaborators::offline().with_speech(speech));
    let out = asm
        .assemble(&script(vec![Scene::new(0).with_nominal(4.0).with_dialogue("Hi")]))
        .await
        .unwrap();
    assert_eq!(out.timeline.duration_sec, 4.0);
    assert_eq!(out.scenes[0].duration_source, DurationSource::Nominal);
    assert!(!out.scenes[0].has_audio);
    assert!(
        out.warnings
            .iter()
            .any(|w| w.kind == WarningKind::AssetSynthesis && w.scene_index == Some(0))
    );
}

#[tokio::test]
async fn empty_scene_keeps_its_slot_as_a_gap() {
    let asm = assembler(small_cfg(), Collaborators::offline());
    let out = asm
        .assemble(&script(vec![
            Scene::new(0).with_nominal(1.0).with_visual("a lake"),
            Scene::new(1).with_nominal(2.0),
            Scene::new(2).with_nominal(1.5).with_visual("a hill"),
        ]))
        .await
        .unwrap();

    assert!(out.scenes[1].gap);
    assert_eq!(out.scenes[1].visual, None);
    assert_eq!(out.scenes[2].start_sec, 3.0);
    assert_eq!(out.timeline.duration_sec, 4.5);
    assert_eq!(out.timeline.primary[2].transition, Transition::Cut);
}

#[tokio::test]
async fn nothing_but_gaps_is_an_empty_timeline() {
    let asm = assembler(small_cfg(), Collaborators::offline());
    let err = asm
        .assemble(&script(vec![Scene::new(0), Scene::new(1)]))
        .await
        .unwrap_err();
    assert!(matches!(err, ReelError::EmptyTimeline(_)));
    assert!(err.is_fatal());
}

#[tokio::test]
async fn cancelled_before_start_returns_no_timeline() {
    let asm = assembler(small_cfg(), Collaborators::offline());
    asm.cancel_handle().cancel();
    let err = asm
        .assemble(&script(vec![Scene::new(0).with_visual("a lake")]))
        .await
        .unwrap_err();
    assert!(matches!(err, ReelError::Cancelled));
}

#[test]
fn invalid_config_is_rejected_up_front() {
    let cfg = RenderConfig {
        max_concurrent_scenes: 0,
        ..small_cfg()
    };
    assert!(Assembler::new(cfg, Collaborators::offline(), Arc::new(BlockTextRenderer)).is_err());
}

#[test]
fn clips_without_pictures_are_unusable() {
    let mut clip = Clip::gap(0, 1.0, [0, 0, 0, 255]);
    assert!(check_clip(&clip).is_ok());

    clip.layers.push(Layer {
        content: VisualContent::Frames {
            frames: Arc::new(Vec::new()),
            fps: 10.0,
        },
        x: 0,
        y: 0,
    });
    assert!(matches!(check_clip(&clip), Err(ReelError::Composition(_))));

    clip.layers[0].content = VisualContent::Still(Arc::new(Raster::solid(1, 1, [1, 1, 1, 255])));
    assert!(check_clip(&clip).is_ok());
    clip.duration_sec = 0.0;
    assert!(check_clip(&clip).is_err());
}

#[test]
fn output_path_sits_next_to_the_script() {
    assert_eq!(
        default_output_path(Path::new("/tmp/lesson/script.json")),
        PathBuf::from("/tmp/lesson/script.mp4")
    );
}
