use super::*;
use crate::foundation::core::{Canvas, Fps};
use crate::timeline::model::{Clip, PlacedClip, Transition};

const RATE: u32 = 100;

fn placed(index: usize, start: f64, dur: f64, audio: Option<&str>) -> PlacedClip {
    let mut clip = Clip::gap(index, dur, [0, 0, 0, 255]);
    clip.audio = audio.map(PathBuf::from);
    PlacedClip {
        clip,
        start_sec: start,
        transition: Transition::Cut,
    }
}

fn timeline(primary: Vec<PlacedClip>) -> Timeline {
    let duration_sec = primary.iter().map(|p| p.clip.duration_sec).sum();
    Timeline {
        canvas: Canvas {
            width: 2,
            height: 2,
        },
        fps: Fps::new(10, 1).unwrap(),
        duration_sec,
        primary,
        captions: Vec::new(),
    }
}

fn constant_pcm(value: f32, secs: f64) -> AudioPcm {
    let frames = (secs * f64::from(RATE)) as usize;
    AudioPcm {
        sample_rate: RATE,
        channels: 2,
        interleaved_f32: vec![value; frames * 2],
    }
}

fn decode(path: &Path) -> ReelResult<AudioPcm> {
    match path.to_str() {
        Some("long.wav") => Ok(constant_pcm(0.5, 3.0)),
        Some("short.wav") => Ok(constant_pcm(0.25, 0.5)),
        _ => Err(ReelError::synthesis("unreadable")),
    }
}

#[test]
fn speech_is_bounded_to_its_slot() {
    let tl = timeline(vec![
        placed(0, 0.0, 1.0, Some("long.wav")),
        placed(1, 1.0, 1.0, Some("short.wav")),
    ]);
    let mut warnings = Vec::new();
    let manifest = build_audio_manifest(&tl, RATE, &decode, &mut warnings);
    assert!(warnings.is_empty());
    assert_eq!(manifest.total_samples, 200);
    assert_eq!(
        (
            manifest.segments[0].timeline_start_sample,
            manifest.segments[0].timeline_end_sample
        ),
        (0, 100)
    );

    let mix = mix_manifest(&manifest);
    assert_eq!(mix.len(), 400);
    // Scene 0's three seconds of speech stop at its slot end.
    assert_eq!(mix[2 * 99], 0.5);
    assert_eq!(mix[2 * 100], 0.25);
    // Scene 1's half second ends early and leaves silence.
    assert_eq!(mix[2 * 160], 0.0);
}

#[test]
fn undecodable_audio_silences_only_that_scene() {
    let tl = timeline(vec![
        placed(0, 0.0, 1.0, Some("broken.wav")),
        placed(1, 1.0, 1.0, Some("short.wav")),
        placed(2, 2.0, 1.0, None),
    ]);
    let mut warnings = Vec::new();
    let manifest = build_audio_manifest(&tl, RATE, &decode, &mut warnings);
    assert_eq!(manifest.segments.len(), 1);
    assert_eq!(manifest.segments[0].scene_index, 1);
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].kind, WarningKind::AudioDecode);
    assert_eq!(warnings[0].scene_index, Some(0));
}

#[test]
fn mix_is_clamped() {
    let manifest = AudioManifest {
        sample_rate: RATE,
        channels: 2,
        total_samples: 10,
        segments: (0..3)
            .map(|i| AudioSegment {
                scene_index: i,
                timeline_start_sample: 0,
                timeline_end_sample: 10,
                source_sample_rate: RATE,
                source_channels: 1,
                source_interleaved_f32: Arc::new(vec![0.6; 10]),
            })
            .collect(),
    };
    let mix = mix_manifest(&manifest);
    assert!(mix.iter().all(|s| *s == 1.0));
}

#[test]
fn f32le_file_holds_every_sample() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mix.f32le");
    write_mix_to_f32le_file(&[0.0, 1.0, -1.0], &path).unwrap();
    assert_eq!(std::fs::metadata(&path).unwrap().len(), 12);

    let guard = TempFileGuard(Some(path.clone()));
    drop(guard);
    assert!(!path.exists());
}

#[test]
fn guard_owns_mix_path_before_the_write() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mix.f32le");
    let mut guard = TempFileGuard(None);
    let written = guard.write_mix(&[0.5, -0.5], path.clone()).unwrap();
    assert_eq!(written, path);
    assert_eq!(guard.0.as_deref(), Some(path.as_path()));
    drop(guard);
    assert!(!path.exists());

    let missing = dir.path().join("no_such_dir").join("mix.f32le");
    let mut guard = TempFileGuard(None);
    assert!(guard.write_mix(&[0.0], missing.clone()).is_err());
    assert_eq!(guard.0.as_deref(), Some(missing.as_path()));
}
