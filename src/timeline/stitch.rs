use crate::foundation::error::{RenderWarning, WarningKind};
use crate::timeline::captions::SceneSlot;
use crate::timeline::model::{Clip, PlacedClip, Transition};

/// Transition into the clip after `prev`.
///
/// Both clips must outlast the window for a crossfade; otherwise it is a hard cut.
pub fn choose_transition(prev: &Clip, current: &Clip, window_sec: f64) -> Transition {
    if window_sec > 0.0 && prev.duration_sec > window_sec && current.duration_sec > window_sec {
        Transition::Crossfade { window_sec }
    } else {
        Transition::Cut
    }
}

/// Concatenate scene clips onto their slots.
///
/// Slot offsets are taken as given: a crossfade only blends pixels and never moves a clip, so the
/// track length stays the exact sum of the slot durations. A crossfade that cannot be applied
/// (one side has no picture) becomes a hard cut.
pub fn stitch(
    clips: Vec<(SceneSlot, Clip)>,
    window_sec: f64,
    warnings: &mut Vec<RenderWarning>,
) -> Vec<PlacedClip> {
    let mut out: Vec<PlacedClip> = Vec::with_capacity(clips.len());
    for (slot, clip) in clips {
        let transition = match out.last() {
            None => Transition::Cut,
            Some(prev) => match choose_transition(&prev.clip, &clip, window_sec) {
                Transition::Crossfade { .. } if prev.clip.layers.is_empty() || clip.layers.is_empty() => {
                    tracing::debug!(scene = slot.scene_index, "crossfade degraded to cut");
                    warnings.push(RenderWarning::scene(
                        slot.scene_index,
                        WarningKind::TransitionDegraded,
                        "crossfade needs a picture on both sides; using a hard cut",
                    ));
                    Transition::Cut
                }
                t => t,
            },
        };
        out.push(PlacedClip {
            clip,
            start_sec: slot.start_sec,
            transition,
        });
    }
    out
}
