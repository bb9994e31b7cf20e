use std::path::PathBuf;

use rayon::prelude::*;

use crate::assets::media::{MIX_SAMPLE_RATE, decode_audio_f32_stereo};
use crate::assets::raster::Raster;
use crate::audio::mix::{TempFileGuard, build_audio_manifest, mix_manifest, temp_mix_path};
use crate::encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts};
use crate::encode::sink::{AudioInputConfig, FrameSink, SinkConfig};
use crate::foundation::core::{FrameIndex, FrameRange};
use crate::foundation::error::{ReelError, ReelResult, RenderWarning};
use crate::timeline::model::{Timeline, Transition};

/// Composite one output frame: the covering clip (blended with the previous clip's last frame
/// while a crossfade window is open) with any caption band on top.
///
/// Returns a premultiplied canvas-sized [`Raster`]. Frames past the end of the primary track show
/// the background of the last clip.
pub fn render_frame(timeline: &Timeline, frame: FrameIndex) -> Raster {
    let canvas = timeline.canvas;
    let t = timeline.fps.frames_to_secs(frame.0);

    let mut out = match timeline.clip_at(frame) {
        Some(idx) => {
            let placed = &timeline.primary[idx];
            let local = t - placed.start_sec;
            let current = placed.clip.render_at(canvas, local);
            match (placed.transition, idx.checked_sub(1)) {
                (Transition::Crossfade { window_sec }, Some(prev_idx))
                    if window_sec > 0.0 && local < window_sec =>
                {
                    let prev = &timeline.primary[prev_idx].clip;
                    let tail = prev.render_at(canvas, prev.duration_sec);
                    let mix = (local / window_sec).clamp(0.0, 1.0) as f32;
                    match Raster::crossfade(&tail, &current, mix) {
                        Ok(blended) => blended,
                        Err(e) => {
                            tracing::debug!(frame = frame.0, error = %e, "crossfade failed; hard cut");
                            current
                        }
                    }
                }
                _ => current,
            }
        }
        None => {
            let bg = timeline
                .primary
                .last()
                .map(|p| p.clip.background_rgba)
                .unwrap_or([0, 0, 0, 255]);
            Raster::solid(canvas.width, canvas.height, bg)
        }
    };

    for caption in &timeline.captions {
        let covers = caption
            .frame_range(timeline.fps)
            .map(|r| r.contains(frame))
            .unwrap_or(false);
        if covers {
            out.blit_over(&caption.band, 0, caption.origin_y, 1.0);
        }
    }
    out
}

/// Threading and chunking controls for multi-frame rendering.
#[derive(Clone, Debug)]
pub struct RenderThreading {
    /// Enable parallel rendering when `true`.
    pub parallel: bool,
    /// Chunk size in frames for batched scheduling.
    pub chunk_size: usize,
    /// Optional explicit worker thread count.
    pub threads: Option<usize>,
}

impl Default for RenderThreading {
    fn default() -> Self {
        Self {
            parallel: false,
            chunk_size: 64,
            threads: None,
        }
    }
}

/// Aggregated rendering counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub frames_total: u64,
    pub chunks: u64,
}

/// Render a frame range (inclusive start, exclusive end).
pub fn render_frames(
    timeline: &Timeline,
    range: FrameRange,
    threading: &RenderThreading,
) -> ReelResult<Vec<Raster>> {
    let pool = if threading.parallel {
        Some(build_thread_pool(threading.threads)?)
    } else {
        None
    };
    let mut out = Vec::with_capacity(range.len_frames().min(4096) as usize);
    for chunk in chunks(range, threading.chunk_size)? {
        out.append(&mut render_chunk(timeline, chunk, pool.as_ref()));
    }
    Ok(out)
}

/// Stream the whole timeline into `sink`, frame 0 first.
pub fn encode_timeline(
    timeline: &Timeline,
    sink: &mut dyn FrameSink,
    threading: &RenderThreading,
    audio: Option<AudioInputConfig>,
) -> ReelResult<RenderStats> {
    let total = timeline.total_frames();
    if total == 0 {
        return Err(ReelError::empty_timeline("timeline has no frames to encode"));
    }
    let range = FrameRange::new(FrameIndex(0), FrameIndex(total))?;
    let pool = if threading.parallel {
        Some(build_thread_pool(threading.threads)?)
    } else {
        None
    };

    sink.begin(SinkConfig {
        width: timeline.canvas.width,
        height: timeline.canvas.height,
        fps: timeline.fps,
        audio,
    })?;

    let mut stats = RenderStats::default();
    for chunk in chunks(range, threading.chunk_size)? {
        let frames = render_chunk(timeline, chunk, pool.as_ref());
        for (offset, frame) in frames.iter().enumerate() {
            sink.push_frame(FrameIndex(chunk.start.0 + offset as u64), frame)?;
        }
        stats.frames_total += chunk.len_frames();
        stats.chunks += 1;
    }
    sink.end()?;

    tracing::debug!(frames = stats.frames_total, chunks = stats.chunks, "frames encoded");
    Ok(stats)
}

/// Options for [`render_to_mp4`].
#[derive(Clone, Debug)]
pub struct RenderToMp4Opts {
    /// Background color to flatten alpha over (RGBA8, straight alpha).
    pub bg_rgba: [u8; 4],
    /// Whether to overwrite `out_path` if it already exists.
    pub overwrite: bool,
    /// Mix and mux scene speech.
    pub enable_audio: bool,
    pub threading: RenderThreading,
}

impl Default for RenderToMp4Opts {
    fn default() -> Self {
        Self {
            bg_rgba: [0, 0, 0, 255],
            overwrite: true,
            enable_audio: true,
            threading: RenderThreading::default(),
        }
    }
}

/// Render a timeline to an MP4 through the system `ffmpeg` binary.
///
/// Blocking. On any failure the partially written output is removed and the error surfaces as
/// [`ReelError::Encode`] (or [`ReelError::Validation`] for a bad canvas). Audio that fails to
/// decode only silences its scene and is reported in the returned warnings.
pub fn render_to_mp4(
    timeline: &Timeline,
    out_path: impl Into<PathBuf>,
    opts: &RenderToMp4Opts,
) -> ReelResult<(RenderStats, Vec<RenderWarning>)> {
    let out_path = out_path.into();
    let mut warnings = Vec::new();

    let mut audio_tmp = TempFileGuard(None);
    let has_audio = timeline.primary.iter().any(|p| p.clip.audio.is_some());
    let audio = if opts.enable_audio && has_audio {
        let decode = |p: &std::path::Path| decode_audio_f32_stereo(p, MIX_SAMPLE_RATE);
        let manifest = build_audio_manifest(timeline, MIX_SAMPLE_RATE, &decode, &mut warnings);
        if manifest.segments.is_empty() {
            None
        } else {
            let mixed = mix_manifest(&manifest);
            let path = audio_tmp.write_mix(&mixed, temp_mix_path())?;
            Some(AudioInputConfig {
                path,
                sample_rate: manifest.sample_rate,
                channels: manifest.channels,
            })
        }
    } else {
        None
    };

    let mut sink = FfmpegSink::new(FfmpegSinkOpts {
        out_path,
        overwrite: opts.overwrite,
        bg_rgba: opts.bg_rgba,
    });
    let stats = match encode_timeline(timeline, &mut sink, &opts.threading, audio) {
        Ok(stats) => stats,
        Err(e) => {
            sink.abort();
            return Err(match e {
                ReelError::Encode(_) | ReelError::Validation(_) => e,
                other => ReelError::encode(other.to_string()),
            });
        }
    };
    drop(audio_tmp);
    Ok((stats, warnings))
}

fn render_chunk(
    timeline: &Timeline,
    range: FrameRange,
    pool: Option<&rayon::ThreadPool>,
) -> Vec<Raster> {
    match pool {
        Some(pool) => pool.install(|| {
            (range.start.0..range.end.0)
                .into_par_iter()
                .map(|f| render_frame(timeline, FrameIndex(f)))
                .collect()
        }),
        None => (range.start.0..range.end.0)
            .map(|f| render_frame(timeline, FrameIndex(f)))
            .collect(),
    }
}

fn chunks(range: FrameRange, chunk_size: usize) -> ReelResult<Vec<FrameRange>> {
    let chunk_size = normalized_chunk_size(chunk_size);
    let mut out = Vec::new();
    let mut chunk_start = range.start.0;
    while chunk_start < range.end.0 {
        let chunk_end = (chunk_start + chunk_size).min(range.end.0);
        out.push(FrameRange::new(FrameIndex(chunk_start), FrameIndex(chunk_end))?);
        chunk_start = chunk_end;
    }
    Ok(out)
}

fn build_thread_pool(threads: Option<usize>) -> ReelResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(ReelError::validation(
            "render threading 'threads' must be >= 1 when set",
        ));
    }

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| ReelError::encode(format!("failed to build rayon thread pool: {e}")))
}

fn normalized_chunk_size(chunk_size: usize) -> u64 {
    chunk_size.max(1) as u64
}

#[cfg(test)]
#[path = "../../tests/unit/render/pipeline.rs"]
mod tests;
