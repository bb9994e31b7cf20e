use super::*;

#[test]
fn json_defaults_are_applied() {
    let script = Script::from_reader(
        r#"{
            "scenes": [
                {"index": 0, "dialogue": "Hi there"},
                {"index": 1, "nominal_duration_sec": 3.5, "caption_text": "Override"}
            ]
        }"#
        .as_bytes(),
    )
    .unwrap();
    script.validate().unwrap();

    assert_eq!(script.scenes[0].nominal_or(5.0), 5.0);
    assert_eq!(script.scenes[1].nominal_or(5.0), 3.5);
    assert_eq!(script.scenes[0].caption(), "Hi there");
    assert_eq!(script.scenes[1].caption(), "Override");
    assert_eq!(script.default_voice, VoiceProfile::default());
}

#[test]
fn unknown_fields_are_rejected() {
    let err = Script::from_reader(r#"{"scenes": [{"index": 0, "duration": 4}]}"#.as_bytes())
        .unwrap_err();
    assert!(matches!(err, ReelError::Validation(_)));
}

#[test]
fn validation_catches_order_and_empty_scripts() {
    let script = Script {
        scenes: vec![Scene::new(1), Scene::new(1)],
        ..Script::default()
    };
    assert!(script.validate().is_err());

    let script = Script {
        scenes: vec![Scene::new(0).with_nominal(0.0), Scene::new(1).with_nominal(-2.0)],
        ..Script::default()
    };
    assert!(script.validate().is_ok());

    assert!(Script::default().validate().is_err());
}

#[test]
fn voice_resolution_prefers_scene_then_speaker_then_default() {
    let calm = VoiceProfile::new(Gender::Male, VoiceStyle::Calm);
    let playful = VoiceProfile::new(Gender::Neutral, VoiceStyle::Playful);
    let script = Script {
        scenes: vec![Scene::new(0)],
        characters: vec![Character {
            name: "Ada".to_string(),
            voice: Some(calm),
            avatar_image: None,
        }],
        ..Script::default()
    };

    let mut scene = Scene::new(0);
    assert_eq!(script.voice_for(&scene), VoiceProfile::default());

    scene.speaker = Some("Ada".to_string());
    assert_eq!(script.voice_for(&scene), calm);

    scene.voice = Some(playful);
    assert_eq!(script.voice_for(&scene), playful);

    scene.voice = None;
    scene.speaker = Some("Nobody".to_string());
    assert_eq!(script.voice_for(&scene), VoiceProfile::default());
}

#[test]
fn voice_table_lookup() {
    assert_eq!(VoiceProfile::default().voice_id(), "nova");
    assert_eq!(
        VoiceProfile::new(Gender::Male, VoiceStyle::Friendly).voice_id(),
        "echo"
    );
    assert_eq!(VoiceProfile::new(Gender::Neutral, VoiceStyle::Calm).key(), "Neutral_Calm");
    assert_eq!(voice_id_for_key("Robot_Monotone"), DEFAULT_VOICE_ID);
}

#[test]
fn relative_paths_follow_the_script_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("script.json");
    std::fs::write(
        &path,
        r#"{"scenes": [{"index": 0, "image": "img/a.png", "audio": "/abs/a.mp3"}]}"#,
    )
    .unwrap();

    let script = Script::from_path(&path).unwrap();
    assert_eq!(
        script.scenes[0].image.as_deref(),
        Some(dir.path().join("img/a.png").as_path())
    );
    assert_eq!(
        script.scenes[0].audio.as_deref(),
        Some(std::path::Path::new("/abs/a.mp3"))
    );
}

#[test]
fn empty_scene_detection() {
    assert!(Scene::new(0).is_empty());
    assert!(Scene::new(0).with_dialogue("  ").is_empty());
    assert!(!Scene::new(0).with_visual("a lake").is_empty());
}
