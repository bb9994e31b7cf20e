use std::path::Path;
use std::process::{Command, Stdio};

use crate::assets::raster::Raster;
use crate::foundation::error::{ReelError, ReelResult};

/// Sample rate of the final audio bus.
pub const MIX_SAMPLE_RATE: u32 = 48_000;

/// What the lip-sync path needs to know about a decoded talking-head video.
#[derive(Clone, Copy, Debug)]
pub struct VideoSourceInfo {
    pub width: u32,
    pub height: u32,
    /// Container duration; `0.0` when ffprobe does not report one.
    pub duration_sec: f64,
}

#[derive(Clone, Debug)]
pub struct AudioPcm {
    pub sample_rate: u32,
    pub channels: u16,
    pub interleaved_f32: Vec<f32>,
}

impl AudioPcm {
    pub fn duration_sec(&self) -> f64 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0.0;
        }
        let frames = self.interleaved_f32.len() / usize::from(self.channels);
        frames as f64 / f64::from(self.sample_rate)
    }
}

/// Measures the playable duration of an audio artifact.
pub trait AudioProbe: Send + Sync {
    fn duration_sec(&self, path: &Path) -> ReelResult<f64>;
}

/// [`AudioProbe`] backed by the system `ffprobe` binary.
#[derive(Clone, Copy, Debug, Default)]
pub struct FfprobeAudioProbe;

impl AudioProbe for FfprobeAudioProbe {
    fn duration_sec(&self, path: &Path) -> ReelResult<f64> {
        #[derive(serde::Deserialize)]
        struct ProbeStream {
            codec_type: Option<String>,
            duration: Option<String>,
        }
        #[derive(serde::Deserialize)]
        struct ProbeFormat {
            duration: Option<String>,
        }
        #[derive(serde::Deserialize)]
        struct ProbeOut {
            #[serde(default)]
            streams: Vec<ProbeStream>,
            format: Option<ProbeFormat>,
        }

        if !path.exists() {
            return Err(ReelError::probe(format!(
                "audio file '{}' does not exist",
                path.display()
            )));
        }

        let out = Command::new("ffprobe")
            .args([
                "-v",
                "error",
                "-print_format",
                "json",
                "-show_streams",
                "-show_format",
            ])
            .arg(path)
            .output()
            .map_err(|e| ReelError::probe(format!("failed to run ffprobe: {e}")))?;
        if !out.status.success() {
            return Err(ReelError::probe(format!(
                "ffprobe failed for '{}': {}",
                path.display(),
                String::from_utf8_lossy(&out.stderr).trim()
            )));
        }

        let parsed: ProbeOut = serde_json::from_slice(&out.stdout)
            .map_err(|e| ReelError::probe(format!("ffprobe json parse failed: {e}")))?;
        let audio = parsed
            .streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some("audio"))
            .ok_or_else(|| {
                ReelError::probe(format!("no audio stream in '{}'", path.display()))
            })?;

        // Container duration first; some muxers only fill the stream field.
        let duration = parsed
            .format
            .as_ref()
            .and_then(|f| f.duration.as_deref())
            .or(audio.duration.as_deref())
            .and_then(|s| s.parse::<f64>().ok())
            .ok_or_else(|| {
                ReelError::probe(format!("ffprobe reported no duration for '{}'", path.display()))
            })?;

        if !duration.is_finite() || duration <= 0.0 {
            return Err(ReelError::probe(format!(
                "non-positive audio duration {duration} for '{}'",
                path.display()
            )));
        }
        Ok(duration)
    }
}

fn tool_on_path(tool: &str) -> bool {
    Command::new(tool)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

pub fn is_ffmpeg_on_path() -> bool {
    tool_on_path("ffmpeg")
}

pub fn is_ffprobe_on_path() -> bool {
    tool_on_path("ffprobe")
}

pub fn probe_video(source_path: &Path) -> ReelResult<VideoSourceInfo> {
    #[derive(serde::Deserialize)]
    struct ProbeStream {
        codec_type: Option<String>,
        width: Option<u32>,
        height: Option<u32>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeFormat {
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeOut {
        streams: Vec<ProbeStream>,
        format: Option<ProbeFormat>,
    }

    let out = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_streams",
            "-show_format",
        ])
        .arg(source_path)
        .output()
        .map_err(|e| ReelError::synthesis(format!("failed to run ffprobe: {e}")))?;
    if !out.status.success() {
        return Err(ReelError::synthesis(format!(
            "ffprobe failed for '{}': {}",
            source_path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    let parsed: ProbeOut = serde_json::from_slice(&out.stdout)
        .map_err(|e| ReelError::synthesis(format!("ffprobe json parse failed: {e}")))?;
    let video_stream = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| ReelError::synthesis("no video stream found"))?;
    let width = video_stream
        .width
        .ok_or_else(|| ReelError::synthesis("missing video width from ffprobe"))?;
    let height = video_stream
        .height
        .ok_or_else(|| ReelError::synthesis("missing video height from ffprobe"))?;

    let duration_sec = parsed
        .format
        .as_ref()
        .and_then(|f| f.duration.as_ref())
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0)
        .unwrap_or(0.0);

    Ok(VideoSourceInfo {
        width,
        height,
        duration_sec,
    })
}

/// Decode up to `max_frames` frames of `source`, scaled to `width`x`height` and resampled to
/// `fps` frames per second.
pub fn decode_video_frames(
    source: &Path,
    width: u32,
    height: u32,
    fps: f64,
    max_frames: u32,
) -> ReelResult<Vec<Raster>> {
    if width == 0 || height == 0 {
        return Err(ReelError::validation("video decode size must be non-zero"));
    }
    if max_frames == 0 {
        return Ok(Vec::new());
    }

    let out = Command::new("ffmpeg")
        .args(["-v", "error", "-i"])
        .arg(source)
        .args([
            "-an",
            "-vf",
            &format!("fps={fps:.6},scale={width}:{height}"),
            "-frames:v",
            &max_frames.to_string(),
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "pipe:1",
        ])
        .output()
        .map_err(|e| ReelError::synthesis(format!("failed to run ffmpeg for video decode: {e}")))?;

    if !out.status.success() {
        return Err(ReelError::synthesis(format!(
            "ffmpeg video decode failed for '{}': {}",
            source.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    let expected_len = width as usize * height as usize * 4;
    if out.stdout.len() < expected_len || !out.stdout.len().is_multiple_of(expected_len) {
        return Err(ReelError::synthesis(format!(
            "decoded video has invalid size: got {} bytes, expected multiples of {expected_len}",
            out.stdout.len()
        )));
    }

    let frames = out
        .stdout
        .chunks_exact(expected_len)
        .take(max_frames as usize)
        .map(|chunk| {
            image::RgbaImage::from_raw(width, height, chunk.to_vec())
                .map(Raster::from_rgba_image)
                .ok_or_else(|| ReelError::synthesis("decoded frame does not match its size"))
        })
        .collect::<ReelResult<Vec<_>>>()?;
    Ok(frames)
}

pub fn decode_audio_f32_stereo(path: &Path, sample_rate: u32) -> ReelResult<AudioPcm> {
    let out = Command::new("ffmpeg")
        .args(["-v", "error", "-i"])
        .arg(path)
        .args([
            "-vn",
            "-f",
            "f32le",
            "-acodec",
            "pcm_f32le",
            "-ac",
            "2",
            "-ar",
            &sample_rate.to_string(),
            "pipe:1",
        ])
        .output()
        .map_err(|e| ReelError::synthesis(format!("failed to run ffmpeg for audio decode: {e}")))?;

    if !out.status.success() {
        let msg = String::from_utf8_lossy(&out.stderr);
        // A file without an audio stream decodes to silence.
        if msg.contains("Stream specifier")
            || msg.contains("matches no streams")
            || msg.contains("Output file #0 does not contain any stream")
        {
            return Ok(AudioPcm {
                sample_rate,
                channels: 2,
                interleaved_f32: Vec::new(),
            });
        }
        return Err(ReelError::synthesis(format!(
            "ffmpeg audio decode failed for '{}': {}",
            path.display(),
            msg.trim()
        )));
    }

    pcm_from_f32le(&out.stdout, sample_rate)
}

fn pcm_from_f32le(bytes: &[u8], sample_rate: u32) -> ReelResult<AudioPcm> {
    if !bytes.len().is_multiple_of(4) {
        return Err(ReelError::synthesis(
            "decoded audio byte length is not aligned to f32 samples",
        ));
    }
    let interleaved_f32 = bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    Ok(AudioPcm {
        sample_rate,
        channels: 2,
        interleaved_f32,
    })
}
