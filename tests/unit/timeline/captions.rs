use super::*;
use crate::assets::text::BlockTextRenderer;

fn style() -> CaptionStyle {
    CaptionStyle {
        font_size: 10.0,
        stroke_width: 2.0,
        margin_px: 24,
        band_height_px: 40,
        band_bottom_offset_px: 44,
        line_gap: 2.0,
        top_padding: 2.0,
        ..CaptionStyle::default()
    }
}

const CANVAS: Canvas = Canvas {
    width: 64,
    height: 64,
};

fn slot(scene_index: usize, start_sec: f64, duration_sec: f64) -> SceneSlot {
    SceneSlot {
        scene_index,
        start_sec,
        duration_sec,
    }
}

#[test]
fn hello_world_wraps_into_two_lines() {
    let style = style();
    let engine = CaptionEngine {
        style: &style,
        canvas: CANVAS,
        text: &BlockTextRenderer,
    };
    assert_eq!(engine.max_line_width(), 40.0);
    assert_eq!(
        engine.layout_lines("Hello world"),
        vec!["Hello".to_string(), "world".to_string()]
    );
}

#[test]
fn no_line_exceeds_the_bound() {
    let style = style();
    let engine = CaptionEngine {
        style: &style,
        canvas: CANVAS,
        text: &BlockTextRenderer,
    };
    let text = "a bb ccc dddd eeeee ffffff ggggggg hhhhhhhhhhhhhhh i j";
    let ts = style.text_style();
    for line in engine.layout_lines(text) {
        assert!(
            BlockTextRenderer.measure(&line, &ts) <= engine.max_line_width(),
            "line '{line}' too wide"
        );
    }
}

#[test]
fn captions_cover_exactly_their_scene_slots() {
    let style = style();
    let engine = CaptionEngine {
        style: &style,
        canvas: CANVAS,
        text: &BlockTextRenderer,
    };
    let cues = [
        (slot(0, 0.0, 4.8), "Hi"),
        (slot(1, 4.8, 2.0), "   "),
        (slot(2, 6.8, 3.1), "Bye"),
    ];
    let mut warnings = Vec::new();
    let clips = engine.build_track(&cues, &mut warnings);

    assert_eq!(clips.len(), 2);
    assert_eq!((clips[0].start_sec, clips[0].duration_sec), (0.0, 4.8));
    assert_eq!((clips[1].start_sec, clips[1].duration_sec), (6.8, 3.1));
    assert_eq!(clips[1].scene_index, 2);
    assert_eq!(clips[0].origin_y, 20);
    assert_eq!((clips[0].band.width, clips[0].band.height), (64, 40));
    assert!(warnings.is_empty());

    // Captioned time plus uncaptioned slots add up to the whole track.
    let captioned: f64 = clips.iter().map(|c| c.duration_sec).sum();
    assert!((captioned + 2.0 - 9.9).abs() < 1e-9);
}

#[test]
fn band_is_transparent_outside_glyphs() {
    let style = style();
    let engine = CaptionEngine {
        style: &style,
        canvas: CANVAS,
        text: &BlockTextRenderer,
    };
    let band = engine.render_band(&["Hi".to_string()]).unwrap();
    assert_eq!(band.pixel(0, 0), [0, 0, 0, 0]);
    assert_eq!(band.pixel(63, 39), [0, 0, 0, 0]);
    assert!(band.data.chunks_exact(4).any(|px| px[3] == 255));
}

#[test]
fn overflowing_lines_are_dropped_with_a_warning() {
    let style = style();
    let engine = CaptionEngine {
        style: &style,
        canvas: CANVAS,
        text: &BlockTextRenderer,
    };
    // Line height 14, advance 16: lines start at 2, 18 and the third would end past 40.
    assert_eq!(engine.max_lines(), 2);

    let mut warnings = Vec::new();
    let clips = engine.build_track(&[(slot(7, 0.0, 1.0), "one two six ten abc def")], &mut warnings);
    assert_eq!(clips[0].lines.len(), 2);
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].scene_index, Some(7));
}
