use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        ReelError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(
        ReelError::synthesis("x")
            .to_string()
            .contains("asset synthesis error:")
    );
    assert!(
        ReelError::probe("x")
            .to_string()
            .contains("duration probe error:")
    );
    assert!(ReelError::encode("x").to_string().contains("encode error:"));
    assert!(
        ReelError::empty_timeline("x")
            .to_string()
            .contains("empty timeline:")
    );
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = ReelError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}

#[test]
fn only_terminal_errors_are_fatal() {
    assert!(ReelError::encode("disk full").is_fatal());
    assert!(ReelError::empty_timeline("no clips").is_fatal());
    assert!(ReelError::Cancelled.is_fatal());
    assert!(!ReelError::synthesis("dalle down").is_fatal());
    assert!(!ReelError::probe("bad mp3").is_fatal());
    assert!(!ReelError::composition("no visual").is_fatal());
}

#[test]
fn warnings_classify_absorbed_errors() {
    let w = RenderWarning::from_error(Some(2), &ReelError::probe("corrupt"));
    assert_eq!(w.kind, WarningKind::DurationProbe);
    assert_eq!(w.scene_index, Some(2));

    let w = RenderWarning::from_error(None, &ReelError::synthesis("timeout"));
    assert_eq!(w.kind, WarningKind::AssetSynthesis);
    assert!(w.message.contains("timeout"));
}
