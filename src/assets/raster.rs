use std::path::Path;

use anyhow::Context as _;

use crate::foundation::error::{ReelError, ReelResult};
use crate::foundation::math::{mul_div255_u8, premul_rgba, premultiply_rgba8_in_place};

/// Premultiplied RGBA8 pixel buffer.
///
/// Every visual in the compositor (scene stills, avatar frames, caption bands, rendered output
/// frames) is carried as a `Raster`.
#[derive(Clone, PartialEq, Eq)]
pub struct Raster {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Row-major premultiplied RGBA8 bytes.
    pub data: Vec<u8>,
}

impl std::fmt::Debug for Raster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Raster")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("data_len", &self.data.len())
            .finish()
    }
}

impl Raster {
    /// Fully transparent raster.
    pub fn transparent(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0u8; width as usize * height as usize * 4],
        }
    }

    /// Raster filled with one straight-alpha color.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let px = premul_rgba(rgba);
        let mut data = Vec::with_capacity(width as usize * height as usize * 4);
        for _ in 0..(width as usize * height as usize) {
            data.extend_from_slice(&px);
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Wrap premultiplied bytes, checking the length.
    pub fn from_premul(width: u32, height: u32, data: Vec<u8>) -> ReelResult<Self> {
        if data.len() != width as usize * height as usize * 4 {
            return Err(ReelError::validation(format!(
                "raster data length {} does not match {width}x{height}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Convert a decoded straight-alpha image.
    pub fn from_rgba_image(img: image::RgbaImage) -> Self {
        let (width, height) = img.dimensions();
        let mut data = img.into_raw();
        premultiply_rgba8_in_place(&mut data);
        Self {
            width,
            height,
            data,
        }
    }

    /// Decode an encoded image file (png, jpeg, webp, ...).
    pub fn open(path: &Path) -> ReelResult<Self> {
        let img = image::open(path)
            .with_context(|| format!("decode image '{}'", path.display()))?
            .to_rgba8();
        Ok(Self::from_rgba_image(img))
    }

    /// Decode a straight-alpha image and resize it to exactly `width`x`height`.
    ///
    /// Resampling happens before premultiplication so the Lanczos filter never sees
    /// premultiplied edges.
    pub fn from_rgba_image_resized(img: &image::RgbaImage, width: u32, height: u32) -> Self {
        if img.dimensions() == (width, height) {
            return Self::from_rgba_image(img.clone());
        }
        let resized =
            image::imageops::resize(img, width, height, image::imageops::FilterType::Lanczos3);
        Self::from_rgba_image(resized)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Source-over composite `src` at integer offset `(x, y)`, clipped to this raster.
    pub fn blit_over(&mut self, src: &Raster, x: i64, y: i64, opacity: f32) {
        let opacity = opacity.clamp(0.0, 1.0);
        if opacity <= 0.0 {
            return;
        }
        let x0 = x.max(0);
        let y0 = y.max(0);
        let x1 = (x + i64::from(src.width)).min(i64::from(self.width));
        let y1 = (y + i64::from(src.height)).min(i64::from(self.height));
        if x0 >= x1 || y0 >= y1 {
            return;
        }

        let dst_stride = self.width as usize * 4;
        let src_stride = src.width as usize * 4;
        let row_bytes = (x1 - x0) as usize * 4;
        for dy in y0..y1 {
            let sy = (dy - y) as usize;
            let sx = (x0 - x) as usize;
            let d_off = dy as usize * dst_stride + x0 as usize * 4;
            let s_off = sy * src_stride + sx * 4;
            let dst_row = &mut self.data[d_off..d_off + row_bytes];
            let src_row = &src.data[s_off..s_off + row_bytes];
            for (d, s) in dst_row.chunks_exact_mut(4).zip(src_row.chunks_exact(4)) {
                let out = over([d[0], d[1], d[2], d[3]], [s[0], s[1], s[2], s[3]], opacity);
                d.copy_from_slice(&out);
            }
        }
    }

    /// Blend `a` towards `b` by `t` (0 = all `a`, 1 = all `b`).
    pub fn crossfade(a: &Raster, b: &Raster, t: f32) -> ReelResult<Self> {
        if a.width != b.width || a.height != b.height {
            return Err(ReelError::composition(format!(
                "crossfade size mismatch: {}x{} vs {}x{}",
                a.width, a.height, b.width, b.height
            )));
        }
        let mut data = vec![0u8; a.data.len()];
        for ((d, pa), pb) in data
            .chunks_exact_mut(4)
            .zip(a.data.chunks_exact(4))
            .zip(b.data.chunks_exact(4))
        {
            let out = crossfade_px([pa[0], pa[1], pa[2], pa[3]], [pb[0], pb[1], pb[2], pb[3]], t);
            d.copy_from_slice(&out);
        }
        Ok(Self {
            width: a.width,
            height: a.height,
            data,
        })
    }

    /// Premultiplied pixel at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = (y as usize * self.width as usize + x as usize) * 4;
        [
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ]
    }
}

/// Height of a `src_w`x`src_h` image scaled to `width`, capped at `max_height` (min 1).
pub fn fit_height(src_w: u32, src_h: u32, width: u32, max_height: u32) -> u32 {
    if src_w == 0 {
        return max_height.max(1);
    }
    let h = (f64::from(src_h) * f64::from(width) / f64::from(src_w)).round() as u32;
    h.clamp(1, max_height.max(1))
}

type PremulRgba8 = [u8; 4];

fn over(dst: PremulRgba8, src: PremulRgba8, opacity: f32) -> PremulRgba8 {
    if src[3] == 0 {
        return dst;
    }
    let op = ((opacity * 255.0).round() as i32).clamp(0, 255) as u16;
    if op == 255 && src[3] == 255 {
        return src;
    }

    let sa = mul_div255_u8(u16::from(src[3]), op);
    if sa == 0 {
        return dst;
    }
    let inv = 255u16 - u16::from(sa);

    let mut out = [0u8; 4];
    out[3] = sa.saturating_add(mul_div255_u8(u16::from(dst[3]), inv));
    for i in 0..3 {
        let sc = mul_div255_u8(u16::from(src[i]), op);
        let dc = mul_div255_u8(u16::from(dst[i]), inv);
        out[i] = sc.saturating_add(dc);
    }
    out
}

fn crossfade_px(a: PremulRgba8, b: PremulRgba8, t: f32) -> PremulRgba8 {
    let t = t.clamp(0.0, 1.0);
    let tt = ((t * 255.0).round() as i32).clamp(0, 255) as u16;
    let it = 255u16 - tt;

    let mut out = [0u8; 4];
    for i in 0..4 {
        let av = mul_div255_u8(u16::from(a[i]), it);
        let bv = mul_div255_u8(u16::from(b[i]), tt);
        out[i] = av.saturating_add(bv);
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/assets/raster.rs"]
mod tests;
