use super::*;

fn block_style(size: f32, stroke: f32) -> TextStyle {
    TextStyle {
        font_size: size,
        stroke_width: stroke,
        line_gap: 0.0,
        ..TextStyle::default()
    }
}

#[test]
fn block_metrics_include_outline() {
    let style = block_style(10.0, 2.0);
    assert_eq!(BlockTextRenderer.measure("Hello", &style), 29.0);
    assert_eq!(BlockTextRenderer.measure("Hello world", &style), 59.0);
    assert_eq!(BlockTextRenderer.measure("", &style), 0.0);
    assert_eq!(BlockTextRenderer.line_height(&style), 14.0);
}

#[test]
fn wrap_breaks_when_candidate_exceeds_bound() {
    let style = block_style(10.0, 2.0);
    let lines = wrap_words("Hello world", 40.0, &style, &BlockTextRenderer);
    assert_eq!(lines, vec!["Hello".to_string(), "world".to_string()]);
}

#[test]
fn wrap_keeps_short_text_on_one_line() {
    let style = block_style(10.0, 0.0);
    let lines = wrap_words("  a   b c ", 100.0, &style, &BlockTextRenderer);
    assert_eq!(lines, vec!["a b c".to_string()]);
}

#[test]
fn wrap_hard_breaks_overlong_words() {
    let style = block_style(10.0, 0.0);
    let lines = wrap_words("abcdefghij", 22.0, &style, &BlockTextRenderer);
    assert_eq!(
        lines,
        vec!["abcd".to_string(), "efgh".to_string(), "ij".to_string()]
    );
    for line in &lines {
        assert!(BlockTextRenderer.measure(line, &style) <= 22.0);
    }
}

#[test]
fn wrap_of_blank_text_is_empty() {
    let style = block_style(10.0, 0.0);
    assert!(wrap_words("   ", 50.0, &style, &BlockTextRenderer).is_empty());
}

#[test]
fn block_render_draws_centered_glyphs() {
    let style = TextStyle {
        font_size: 10.0,
        stroke_width: 0.0,
        line_gap: 0.0,
        fill_rgba: [255, 255, 255, 255],
        ..TextStyle::default()
    };
    let out = BlockTextRenderer
        .render_block(&["ab".to_string()], 40, 12, 0.0, &style)
        .unwrap();
    assert_eq!((out.width, out.height), (40, 12));

    // Line is 10px wide, centered: glyphs live in x 15..25.
    assert_eq!(out.pixel(0, 8), [0, 0, 0, 0]);
    assert_eq!(out.pixel(39, 8), [0, 0, 0, 0]);
    assert_eq!(out.pixel(16, 8), [255, 255, 255, 255]);
}

#[test]
fn style_validation_rejects_bad_sizes() {
    assert!(TextStyle::default().validate().is_ok());
    assert!(block_style(0.0, 0.0).validate().is_err());
    assert!(block_style(10.0, -1.0).validate().is_err());
}

#[test]
fn xml_escape_covers_markup() {
    assert_eq!(escape_xml("a<b>&\"c'"), "a&lt;b&gt;&amp;&quot;c&apos;");
}
