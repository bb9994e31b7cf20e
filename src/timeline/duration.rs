use crate::assets::media::AudioProbe;
use crate::foundation::error::{RenderWarning, WarningKind};
use crate::synth::AudioArtifact;

/// Where a resolved duration came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationSource {
    /// Reported by the speech engine alongside the artifact.
    Reported,
    /// Measured by probing the audio file.
    Probed,
    /// Script value (or the configured default).
    Nominal,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResolvedDuration {
    /// Always finite and > 0.
    pub duration_sec: f64,
    pub nominal_sec: f64,
    pub source: DurationSource,
}

/// Policy inputs of [`resolve_duration`].
#[derive(Clone, Copy, Debug)]
pub struct DurationPolicy {
    pub default_sec: f64,
    pub divergence_warn_ratio: f64,
}

fn usable(secs: f64) -> bool {
    secs.is_finite() && secs > 0.0
}

/// Pick the authoritative duration of one scene.
///
/// Measured audio always wins over the nominal value, however far apart they are. Audio that
/// cannot be measured falls back to the nominal value with a [`WarningKind::DurationProbe`]
/// warning. A nominal value that is not a positive number is replaced by the policy default.
pub fn resolve_duration(
    scene_index: usize,
    nominal_sec: f64,
    audio: Option<&AudioArtifact>,
    probe: &dyn AudioProbe,
    policy: DurationPolicy,
    warnings: &mut Vec<RenderWarning>,
) -> ResolvedDuration {
    let nominal_sec = if usable(nominal_sec) {
        nominal_sec
    } else {
        policy.default_sec
    };
    let nominal = ResolvedDuration {
        duration_sec: nominal_sec,
        nominal_sec,
        source: DurationSource::Nominal,
    };

    let Some(audio) = audio else {
        return nominal;
    };

    let measured = match audio.measured_duration_sec.filter(|d| usable(*d)) {
        Some(d) => Some((d, DurationSource::Reported)),
        None => match probe.duration_sec(&audio.path) {
            Ok(d) if usable(d) => Some((d, DurationSource::Probed)),
            Ok(d) => {
                let msg = format!(
                    "audio '{}' probed to unusable duration {d}; using nominal {nominal_sec}s",
                    audio.path.display()
                );
                tracing::warn!(scene = scene_index, "{msg}");
                warnings.push(RenderWarning::scene(
                    scene_index,
                    WarningKind::DurationProbe,
                    msg,
                ));
                None
            }
            Err(e) => {
                tracing::warn!(
                    scene = scene_index,
                    error = %e,
                    "audio probe failed; using nominal duration"
                );
                warnings.push(RenderWarning::from_error(Some(scene_index), &e));
                None
            }
        },
    };

    let Some((duration_sec, source)) = measured else {
        return nominal;
    };

    let ratio = (duration_sec / nominal_sec).max(nominal_sec / duration_sec);
    if ratio > policy.divergence_warn_ratio {
        let msg = format!(
            "measured audio {duration_sec:.3}s diverges from nominal {nominal_sec:.3}s \
             (x{ratio:.2}); keeping the measured value"
        );
        tracing::warn!(scene = scene_index, "{msg}");
        warnings.push(RenderWarning::scene(
            scene_index,
            WarningKind::DurationDivergence,
            msg,
        ));
    }

    ResolvedDuration {
        duration_sec,
        nominal_sec,
        source,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/duration.rs"]
mod tests;
