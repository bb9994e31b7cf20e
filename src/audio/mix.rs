use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::assets::media::AudioPcm;
use crate::foundation::error::{ReelError, ReelResult, RenderWarning, WarningKind};
use crate::timeline::model::Timeline;

/// Output channel count of the bus.
pub const MIX_CHANNELS: u16 = 2;

/// One scene's speech in bus sample space.
#[derive(Clone, Debug)]
pub struct AudioSegment {
    pub scene_index: usize,
    pub timeline_start_sample: u64,
    /// Exclusive. The end of the scene slot: speech never spills into the next scene.
    pub timeline_end_sample: u64,
    pub source_sample_rate: u32,
    pub source_channels: u16,
    pub source_interleaved_f32: Arc<Vec<f32>>,
}

/// Everything needed to mix the soundtrack of one timeline.
#[derive(Clone, Debug)]
pub struct AudioManifest {
    pub sample_rate: u32,
    pub channels: u16,
    pub total_samples: u64,
    pub segments: Vec<AudioSegment>,
}

/// Nearest bus sample for a time in seconds.
pub fn secs_to_sample(secs: f64, sample_rate: u32) -> u64 {
    (secs * f64::from(sample_rate)).round().max(0.0) as u64
}

/// Decode every clip's speech and place it on its slot.
///
/// A clip whose audio cannot be decoded stays silent and records a
/// [`WarningKind::AudioDecode`] warning.
pub fn build_audio_manifest(
    timeline: &Timeline,
    sample_rate: u32,
    decode: &(dyn Fn(&Path) -> ReelResult<AudioPcm> + Sync),
    warnings: &mut Vec<RenderWarning>,
) -> AudioManifest {
    let total_samples = secs_to_sample(timeline.duration_sec, sample_rate);
    let mut segments = Vec::new();

    for placed in &timeline.primary {
        let Some(path) = placed.clip.audio.as_deref() else {
            continue;
        };
        let scene_index = placed.clip.scene_index;
        let pcm = match decode(path) {
            Ok(pcm) if pcm.channels > 0 && pcm.sample_rate > 0 => pcm,
            Ok(_) => {
                warnings.push(RenderWarning::scene(
                    scene_index,
                    WarningKind::AudioDecode,
                    format!("audio '{}' decoded to an empty layout", path.display()),
                ));
                continue;
            }
            Err(e) => {
                tracing::warn!(scene = scene_index, error = %e, "scene audio decode failed; scene is silent");
                warnings.push(RenderWarning::scene(
                    scene_index,
                    WarningKind::AudioDecode,
                    format!("audio '{}' could not be decoded: {e}", path.display()),
                ));
                continue;
            }
        };
        if pcm.interleaved_f32.is_empty() {
            continue;
        }
        let speech_sec = pcm.duration_sec();
        if speech_sec > placed.clip.duration_sec + 1.0 / f64::from(sample_rate.max(1)) {
            tracing::debug!(
                scene = scene_index,
                speech_sec,
                slot_sec = placed.clip.duration_sec,
                "speech runs past its slot; the tail is not mixed"
            );
        }

        let start = secs_to_sample(placed.start_sec, sample_rate);
        let end = secs_to_sample(placed.end_sec(), sample_rate).min(total_samples);
        if end <= start {
            continue;
        }
        segments.push(AudioSegment {
            scene_index,
            timeline_start_sample: start,
            timeline_end_sample: end,
            source_sample_rate: pcm.sample_rate,
            source_channels: pcm.channels,
            source_interleaved_f32: Arc::new(pcm.interleaved_f32),
        });
    }

    AudioManifest {
        sample_rate,
        channels: MIX_CHANNELS,
        total_samples,
        segments,
    }
}

/// Mix all manifest segments into interleaved output PCM, clamped to [-1, 1].
pub fn mix_manifest(manifest: &AudioManifest) -> Vec<f32> {
    let frames = manifest.total_samples as usize;
    let mut out = vec![0.0f32; frames * usize::from(manifest.channels)];

    for seg in &manifest.segments {
        tracing::debug!(
            scene = seg.scene_index,
            start = seg.timeline_start_sample,
            end = seg.timeline_end_sample,
            "mixing scene speech"
        );
        mix_segment(&mut out, manifest, seg);
    }

    for s in &mut out {
        *s = s.clamp(-1.0, 1.0);
    }
    out
}

fn mix_segment(out: &mut [f32], manifest: &AudioManifest, seg: &AudioSegment) {
    let src = seg.source_interleaved_f32.as_ref();
    let channels = usize::from(seg.source_channels);
    let src_frames = src.len() / channels;
    if src_frames == 0 {
        return;
    }

    for dst_sample in seg.timeline_start_sample..seg.timeline_end_sample {
        let rel_sec = (dst_sample - seg.timeline_start_sample) as f64
            / f64::from(manifest.sample_rate);
        let src_pos = rel_sec * f64::from(seg.source_sample_rate);
        let src_frame0 = src_pos.floor() as usize;
        if src_frame0 >= src_frames {
            break;
        }
        let src_frame1 = (src_frame0 + 1).min(src_frames - 1);
        let frac = (src_pos - src_frame0 as f64) as f32;

        let (l, r) = if channels == 1 {
            let v0 = src[src_frame0];
            let v1 = src[src_frame1];
            let v = v0 + ((v1 - v0) * frac);
            (v, v)
        } else {
            let i0 = src_frame0 * channels;
            let i1 = src_frame1 * channels;
            (
                src[i0] + ((src[i1] - src[i0]) * frac),
                src[i0 + 1] + ((src[i1 + 1] - src[i0 + 1]) * frac),
            )
        };

        let dst_idx = dst_sample as usize * usize::from(manifest.channels);
        let Some(slot) = out.get_mut(dst_idx..dst_idx + usize::from(manifest.channels)) else {
            break;
        };
        slot[0] += l;
        if slot.len() > 1 {
            slot[1] += r;
        }
    }
}

/// Write interleaved `f32` PCM samples to a raw little-endian `.f32le` file.
pub fn write_mix_to_f32le_file(samples_interleaved: &[f32], out_path: &Path) -> ReelResult<()> {
    let mut bytes = Vec::<u8>::with_capacity(samples_interleaved.len() * 4);
    for &sample in samples_interleaved {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    std::fs::write(out_path, bytes).map_err(|e| {
        ReelError::encode(format!(
            "failed to write mixed audio file '{}': {e}",
            out_path.display()
        ))
    })
}

/// Unique scratch path for one render's mixed soundtrack.
pub fn temp_mix_path() -> PathBuf {
    std::env::temp_dir().join(format!(
        "reelsmith_audio_mix_{}_{}.f32le",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0)
    ))
}

/// Deletes the wrapped file on drop.
pub struct TempFileGuard(pub Option<PathBuf>);

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if let Some(path) = self.0.take() {
            let _ = std::fs::remove_file(path);
        }
    }
}

impl TempFileGuard {
    /// Take ownership of `path` for cleanup, then write the mix there.
    ///
    /// The guard holds the path even when the write fails part way.
    pub fn write_mix(
        &mut self,
        samples_interleaved: &[f32],
        path: PathBuf,
    ) -> ReelResult<PathBuf> {
        self.0 = Some(path.clone());
        write_mix_to_f32le_file(samples_interleaved, &path)?;
        Ok(path)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/audio/mix.rs"]
mod tests;
