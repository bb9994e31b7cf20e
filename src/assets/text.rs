use std::path::Path;
use std::sync::Arc;

use anyhow::Context as _;

use crate::assets::raster::Raster;
use crate::foundation::error::{ReelError, ReelResult};

/// Styling shared by caption and placeholder text.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TextStyle {
    /// Font size in pixels.
    pub font_size: f32,
    /// Glyph fill color (straight RGBA8).
    pub fill_rgba: [u8; 4],
    /// Outline color (straight RGBA8).
    pub stroke_rgba: [u8; 4],
    /// Outline width in pixels; `0` disables the outline.
    pub stroke_width: f32,
    /// Extra vertical space between stacked lines.
    pub line_gap: f32,
    /// CSS-style font family list.
    pub font_family: String,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_size: 36.0,
            fill_rgba: [255, 255, 255, 255],
            stroke_rgba: [0, 0, 0, 255],
            stroke_width: 2.0,
            line_gap: 6.0,
            font_family: "Helvetica, Arial, 'DejaVu Sans', sans-serif".to_string(),
        }
    }
}

impl TextStyle {
    pub fn validate(&self) -> ReelResult<()> {
        if !self.font_size.is_finite() || self.font_size <= 0.0 {
            return Err(ReelError::validation("text font_size must be finite and > 0"));
        }
        if !self.stroke_width.is_finite() || self.stroke_width < 0.0 {
            return Err(ReelError::validation(
                "text stroke_width must be finite and >= 0",
            ));
        }
        if !self.line_gap.is_finite() || self.line_gap < 0.0 {
            return Err(ReelError::validation("text line_gap must be finite and >= 0"));
        }
        Ok(())
    }

    /// Vertical distance between the tops of two stacked lines.
    pub fn line_advance(&self, renderer: &dyn TextRenderer) -> f32 {
        renderer.line_height(self) + self.line_gap
    }
}

/// Measures and rasterizes lines of text.
///
/// `measure` must report the full inked width including the outline; caption wrapping relies on
/// it to keep every line inside the band.
pub trait TextRenderer: Send + Sync {
    /// Short identifier for logs.
    fn name(&self) -> &'static str;
    /// Rendered width of one line, in pixels.
    fn measure(&self, text: &str, style: &TextStyle) -> f32;
    /// Rendered height of one line, in pixels.
    fn line_height(&self, style: &TextStyle) -> f32;
    /// Rasterize `lines` stacked top-down from `top`, each centered horizontally, into a
    /// transparent `width`x`height` raster.
    fn render_block(
        &self,
        lines: &[String],
        width: u32,
        height: u32,
        top: f32,
        style: &TextStyle,
    ) -> ReelResult<Raster>;
}

/// Renderer selection.
pub struct TextEngine;

impl TextEngine {
    /// Pick the best available renderer: shaped SVG text when any font face loads, block glyphs
    /// otherwise.
    pub fn detect(fonts_dir: Option<&Path>) -> Arc<dyn TextRenderer> {
        let renderer = SvgTextRenderer::new(fonts_dir);
        if renderer.face_count() == 0 {
            tracing::warn!("no font faces found; captions use block glyphs");
            return Arc::new(BlockTextRenderer);
        }
        tracing::debug!(faces = renderer.face_count(), "using svg text renderer");
        Arc::new(renderer)
    }
}

/// Greedy word wrap bounded by `max_width`.
///
/// A word that would push the current line past the bound starts a new line. A single word wider
/// than the bound on its own is broken between characters.
pub fn wrap_words(
    text: &str,
    max_width: f32,
    style: &TextStyle,
    renderer: &dyn TextRenderer,
) -> Vec<String> {
    let fits = |s: &str| renderer.measure(s, style) <= max_width;
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        if fits(&candidate) {
            current = candidate;
            continue;
        }
        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if fits(word) {
            current = word.to_string();
            continue;
        }

        let mut piece = String::new();
        for ch in word.chars() {
            piece.push(ch);
            if !fits(&piece) && piece.chars().count() > 1 {
                piece.pop();
                lines.push(std::mem::take(&mut piece));
                piece.push(ch);
            }
        }
        current = piece;
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Deterministic fixed-advance renderer that draws one box per glyph.
///
/// Used when the system has no usable fonts, and in tests where exact metrics matter.
#[derive(Clone, Copy, Debug, Default)]
pub struct BlockTextRenderer;

impl BlockTextRenderer {
    /// Horizontal advance per character, as a fraction of the font size.
    pub const ADVANCE_EM: f32 = 0.5;

    fn advance(style: &TextStyle) -> f32 {
        style.font_size * Self::ADVANCE_EM
    }
}

impl TextRenderer for BlockTextRenderer {
    fn name(&self) -> &'static str {
        "block"
    }

    fn measure(&self, text: &str, style: &TextStyle) -> f32 {
        let chars = text.chars().count();
        if chars == 0 {
            return 0.0;
        }
        chars as f32 * Self::advance(style) + 2.0 * style.stroke_width
    }

    fn line_height(&self, style: &TextStyle) -> f32 {
        style.font_size + 2.0 * style.stroke_width
    }

    fn render_block(
        &self,
        lines: &[String],
        width: u32,
        height: u32,
        top: f32,
        style: &TextStyle,
    ) -> ReelResult<Raster> {
        let mut out = Raster::transparent(width, height);
        let advance = Self::advance(style);
        let glyph_w = (advance * 0.8).max(1.0);
        let glyph_h = (style.font_size * 0.7).max(1.0);
        let sw = style.stroke_width;
        let line_advance = style.line_advance(self);

        for (i, line) in lines.iter().enumerate() {
            let line_w = self.measure(line, style);
            let left = (width as f32 - line_w) / 2.0 + sw;
            let glyph_top = top + i as f32 * line_advance + sw + (style.font_size - glyph_h);
            for (c, ch) in line.chars().enumerate() {
                if ch.is_whitespace() {
                    continue;
                }
                let gx = left + c as f32 * advance;
                if sw > 0.0 {
                    let outline = Raster::solid(
                        (glyph_w + 2.0 * sw).round() as u32,
                        (glyph_h + 2.0 * sw).round() as u32,
                        style.stroke_rgba,
                    );
                    out.blit_over(
                        &outline,
                        (gx - sw).round() as i64,
                        (glyph_top - sw).round() as i64,
                        1.0,
                    );
                }
                let glyph = Raster::solid(
                    glyph_w.round() as u32,
                    glyph_h.round() as u32,
                    style.fill_rgba,
                );
                out.blit_over(&glyph, gx.round() as i64, glyph_top.round() as i64, 1.0);
            }
        }
        Ok(out)
    }
}

/// Shaped text through `usvg` (system fonts plus an optional font directory), rasterized with
/// `resvg`. The outline is an SVG stroke painted under the fill.
pub struct SvgTextRenderer {
    fontdb: Arc<usvg::fontdb::Database>,
}

impl SvgTextRenderer {
    pub fn new(fonts_dir: Option<&Path>) -> Self {
        let mut db = usvg::fontdb::Database::new();
        db.load_system_fonts();
        if let Some(dir) = fonts_dir {
            load_fonts_from_dir(&mut db, dir);
        }
        Self {
            fontdb: Arc::new(db),
        }
    }

    pub fn face_count(&self) -> usize {
        self.fontdb.len()
    }

    fn parse(&self, svg: &str) -> ReelResult<usvg::Tree> {
        let opts = usvg::Options {
            fontdb: self.fontdb.clone(),
            font_resolver: make_font_resolver(),
            ..Default::default()
        };
        let tree = usvg::Tree::from_data(svg.as_bytes(), &opts).context("parse text svg")?;
        Ok(tree)
    }
}

impl TextRenderer for SvgTextRenderer {
    fn name(&self) -> &'static str {
        "svg"
    }

    fn measure(&self, text: &str, style: &TextStyle) -> f32 {
        if text.trim().is_empty() {
            return 0.0;
        }
        let w = ((text.chars().count() as f32 + 2.0) * style.font_size * 2.0).ceil() as u32;
        let h = (style.font_size * 3.0).ceil() as u32;
        let svg = format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}">{}</svg>"#,
            text_element(text, 0.0, style.font_size * 1.5, "start", style)
        );
        match self.parse(&svg) {
            Ok(tree) if !tree.root().children().is_empty() => {
                tree.root().abs_stroke_bounding_box().width()
            }
            Ok(_) => BlockTextRenderer.measure(text, style),
            Err(e) => {
                tracing::debug!(error = %e, "text measure fell back to block metrics");
                BlockTextRenderer.measure(text, style)
            }
        }
    }

    fn line_height(&self, style: &TextStyle) -> f32 {
        style.font_size * 1.2 + 2.0 * style.stroke_width
    }

    fn render_block(
        &self,
        lines: &[String],
        width: u32,
        height: u32,
        top: f32,
        style: &TextStyle,
    ) -> ReelResult<Raster> {
        if width == 0 || height == 0 {
            return Err(ReelError::validation("text block size must be non-zero"));
        }
        let line_advance = style.line_advance(self);
        let cx = width as f32 / 2.0;
        let mut body = String::new();
        for (i, line) in lines.iter().enumerate() {
            let baseline =
                top + i as f32 * line_advance + style.stroke_width + style.font_size * 0.95;
            body.push_str(&text_element(line, cx, baseline, "middle", style));
        }
        let svg = format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}">{body}</svg>"#
        );
        let tree = self.parse(&svg)?;

        let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
            .ok_or_else(|| ReelError::composition("failed to allocate text pixmap"))?;
        resvg::render(
            &tree,
            resvg::tiny_skia::Transform::identity(),
            &mut pixmap.as_mut(),
        );
        Raster::from_premul(width, height, pixmap.data().to_vec())
    }
}

fn text_element(text: &str, x: f32, y: f32, anchor: &str, style: &TextStyle) -> String {
    let [fr, fg, fb, fa] = style.fill_rgba;
    let [sr, sg, sb, sa] = style.stroke_rgba;
    let stroke = if style.stroke_width > 0.0 {
        format!(
            r#" stroke="rgb({sr},{sg},{sb})" stroke-opacity="{}" stroke-width="{}" stroke-linejoin="round" paint-order="stroke""#,
            f32::from(sa) / 255.0,
            style.stroke_width * 2.0
        )
    } else {
        String::new()
    };
    format!(
        r#"<text x="{x}" y="{y}" text-anchor="{anchor}" font-family="{}" font-size="{}" fill="rgb({fr},{fg},{fb})" fill-opacity="{}"{stroke}>{}</text>"#,
        escape_xml(&style.font_family),
        style.font_size,
        f32::from(fa) / 255.0,
        escape_xml(text)
    )
}

fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

fn load_fonts_from_dir(db: &mut usvg::fontdb::Database, dir: &Path) {
    let Ok(rd) = std::fs::read_dir(dir) else {
        return;
    };

    for entry in rd.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(ext) = path.extension().and_then(|s| s.to_str()) else {
            continue;
        };
        let ext = ext.to_ascii_lowercase();
        if ext != "ttf" && ext != "otf" && ext != "ttc" {
            continue;
        }
        let _ = db.load_font_file(&path);
    }
}

fn make_font_resolver() -> usvg::FontResolver<'static> {
    use usvg::FontResolver;

    FontResolver {
        select_font: Box::new(|font, fontdb| {
            let mut families = Vec::<usvg::fontdb::Family<'_>>::new();
            for family in font.families() {
                families.push(match family {
                    usvg::FontFamily::Serif => usvg::fontdb::Family::Serif,
                    usvg::FontFamily::SansSerif => usvg::fontdb::Family::SansSerif,
                    usvg::FontFamily::Cursive => usvg::fontdb::Family::Cursive,
                    usvg::FontFamily::Fantasy => usvg::fontdb::Family::Fantasy,
                    usvg::FontFamily::Monospace => usvg::fontdb::Family::Monospace,
                    usvg::FontFamily::Named(s) => usvg::fontdb::Family::Name(s),
                });
            }
            families.push(usvg::fontdb::Family::SansSerif);

            let query = usvg::fontdb::Query {
                families: &families,
                weight: usvg::fontdb::Weight(font.weight()),
                stretch: usvg::fontdb::Stretch::Normal,
                style: usvg::fontdb::Style::Normal,
            };

            if let Some(id) = fontdb.query(&query) {
                return Some(id);
            }
            // Any face beats dropping the caption.
            fontdb.faces().next().map(|f| f.id)
        }),
        select_fallback: FontResolver::default_fallback_selector(),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/text.rs"]
mod tests;
