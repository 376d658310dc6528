// src/framebuffer.rs

//! The authoritative RGBA8 pixel buffer and every primitive that mutates it.
//!
//! All coordinates are absolute framebuffer coordinates in pixels. Input
//! rectangles come straight from an untrusted server, so every primitive
//! clips to the buffer and treats degenerate rectangles as no-ops instead of
//! reporting errors.

pub mod tile;

#[cfg(test)]
mod tests;

use crate::color::{Palette, Rgb};
use crate::image::DecodedImage;
use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};

/// Bytes per framebuffer pixel (R, G, B, A).
pub const BYTES_PER_PIXEL: usize = 4;

/// Alpha written by every opaque primitive.
const OPAQUE: u8 = 0xff;

/// Selects how primitives that have two implementations are carried out.
///
/// Both paths produce identical pixels; `Software` mirrors the fallback a
/// client uses when it cannot rely on an accelerated copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawPath {
    /// In-place overlap-aware moves; tiles are recorded and replayed.
    #[default]
    Native,
    /// Copies are staged through a temporary buffer; tiles are composed in
    /// a scratch buffer.
    Software,
}

/// A rectangle as received from the protocol layer. Width and height may be
/// zero or negative, in which case the rectangle is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Intersects the rectangle with `[0, bound_w) x [0, bound_h)`.
    pub(crate) fn clip(&self, bound_w: usize, bound_h: usize) -> Option<ClippedRect> {
        if self.is_empty() {
            return None;
        }
        let (x, skip_x, width) = clip_axis(self.x, self.width, bound_w)?;
        let (y, skip_y, height) = clip_axis(self.y, self.height, bound_h)?;
        Some(ClippedRect {
            x,
            y,
            width,
            height,
            skip_x,
            skip_y,
        })
    }
}

/// A rectangle known to lie inside a buffer. `skip_x`/`skip_y` record how
/// many leading columns and rows of the original rectangle were cut off, so
/// that source data laid out for the original rectangle can be indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ClippedRect {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
    pub skip_x: usize,
    pub skip_y: usize,
}

fn clip_axis(start: i32, len: i32, bound: usize) -> Option<(usize, usize, usize)> {
    let start = i64::from(start);
    let end = start + i64::from(len);
    let lo = start.max(0);
    let hi = end.min(bound as i64);
    if lo >= hi {
        return None;
    }
    Some((lo as usize, (lo - start) as usize, (hi - lo) as usize))
}

/// Owns the logical pixel buffer of the remote screen.
///
/// Invariant: `pixels.len() == width * height * BYTES_PER_PIXEL`, and both
/// dimensions are at least 1.
#[derive(Debug, Clone)]
pub struct Framebuffer {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    draw_path: DrawPath,
}

impl Framebuffer {
    /// Creates a zeroed framebuffer using the native draw path.
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_draw_path(width, height, DrawPath::Native)
    }

    /// Falls back to 1x1 if the requested size does not fit in memory.
    pub fn with_draw_path(width: u32, height: u32, draw_path: DrawPath) -> Self {
        let (mut width, mut height) = sanitize_dimensions(width, height);
        let len = match buffer_len(width, height) {
            Some(len) => len,
            None => {
                warn!(
                    "Framebuffer: {}x{} is too large, starting at 1x1",
                    width, height
                );
                (width, height) = (1, 1);
                BYTES_PER_PIXEL
            }
        };
        Self {
            width,
            height,
            pixels: vec![0; len],
            draw_path,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn draw_path(&self) -> DrawPath {
        self.draw_path
    }

    /// Raw RGBA8 contents, row-major.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Returns the RGBA value at `(x, y)`, or `None` outside the buffer.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let off = self.offset(x as usize, y as usize);
        let mut px = [0u8; 4];
        px.copy_from_slice(&self.pixels[off..off + BYTES_PER_PIXEL]);
        Some(px)
    }

    #[inline]
    fn offset(&self, x: usize, y: usize) -> usize {
        (y * self.width as usize + x) * BYTES_PER_PIXEL
    }

    #[inline]
    fn stride(&self) -> usize {
        self.width as usize * BYTES_PER_PIXEL
    }

    /// Reallocates the buffer, keeping the overlapping top-left region.
    ///
    /// Newly exposed pixels are zero; callers that want them painted must
    /// draw them explicitly. Dimensions below 1 are clamped to 1; a size
    /// whose byte length overflows is ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        let (width, height) = sanitize_dimensions(width, height);
        if width == self.width && height == self.height {
            return;
        }
        let Some(len) = buffer_len(width, height) else {
            warn!(
                "Framebuffer: resize to {}x{} overflows, keeping {}x{}",
                width, height, self.width, self.height
            );
            return;
        };
        debug!(
            "Framebuffer: resize {}x{} -> {}x{}",
            self.width, self.height, width, height
        );

        let mut pixels = vec![0u8; len];
        let keep_row_bytes = self.width.min(width) as usize * BYTES_PER_PIXEL;
        let new_stride = width as usize * BYTES_PER_PIXEL;
        let old_stride = self.stride();
        for row in 0..self.height.min(height) as usize {
            let src = row * old_stride;
            let dst = row * new_stride;
            pixels[dst..dst + keep_row_bytes]
                .copy_from_slice(&self.pixels[src..src + keep_row_bytes]);
        }

        self.width = width;
        self.height = height;
        self.pixels = pixels;
    }

    /// Resets every byte of the buffer to zero.
    pub fn clear(&mut self) {
        self.pixels.fill(0);
    }

    pub fn fill_rect(&mut self, x: i32, y: i32, width: i32, height: i32, rgb: Rgb) {
        let Some(clip) = self.clip(Rect::new(x, y, width, height)) else {
            return;
        };
        let value = [rgb[0], rgb[1], rgb[2], OPAQUE];
        for row in clip.y..clip.y + clip.height {
            let start = self.offset(clip.x, row);
            let end = start + clip.width * BYTES_PER_PIXEL;
            for px in self.pixels[start..end].chunks_exact_mut(BYTES_PER_PIXEL) {
                px.copy_from_slice(&value);
            }
        }
    }

    /// Copies a `width` x `height` block from `(src_x, src_y)` to `(x, y)`.
    ///
    /// Source and destination may overlap; the result is always the same as
    /// copying the source through a temporary buffer first. Portions that
    /// fall outside the buffer on either side are dropped.
    pub fn copy_image(
        &mut self,
        src_x: i32,
        src_y: i32,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
    ) {
        let Some((sx, sy, dx, dy, w, h)) =
            self.clip_copy(src_x, src_y, x, y, width, height)
        else {
            trace!(
                "Framebuffer: copy ({},{}) -> ({},{}) {}x{} is empty after clipping",
                src_x,
                src_y,
                x,
                y,
                width,
                height
            );
            return;
        };

        let row_bytes = w * BYTES_PER_PIXEL;
        match self.draw_path {
            DrawPath::Native => {
                // Walk rows away from the overlap so no source row is
                // overwritten before it is read; copy_within handles the
                // horizontal overlap inside a row.
                if dy > sy {
                    for row in (0..h).rev() {
                        self.move_row(sx, sy + row, dx, dy + row, row_bytes);
                    }
                } else {
                    for row in 0..h {
                        self.move_row(sx, sy + row, dx, dy + row, row_bytes);
                    }
                }
            }
            DrawPath::Software => {
                let mut staged = Vec::with_capacity(row_bytes * h);
                for row in 0..h {
                    let src = self.offset(sx, sy + row);
                    staged.extend_from_slice(&self.pixels[src..src + row_bytes]);
                }
                for (row, chunk) in staged.chunks_exact(row_bytes).enumerate() {
                    let dst = self.offset(dx, dy + row);
                    self.pixels[dst..dst + row_bytes].copy_from_slice(chunk);
                }
            }
        }
    }

    fn move_row(&mut self, sx: usize, sy: usize, dx: usize, dy: usize, row_bytes: usize) {
        let src = self.offset(sx, sy);
        let dst = self.offset(dx, dy);
        self.pixels.copy_within(src..src + row_bytes, dst);
    }

    /// Clips a copy so both its source and destination lie in the buffer.
    fn clip_copy(
        &self,
        src_x: i32,
        src_y: i32,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
    ) -> Option<(usize, usize, usize, usize, usize, usize)> {
        let (sx, dx, w) = clip_copy_axis(src_x, x, width, self.width)?;
        let (sy, dy, h) = clip_copy_axis(src_y, y, height, self.height)?;
        Some((sx, sy, dx, dy, w, h))
    }

    /// Writes packed pixels laid out as (B, G, R, X) per pixel.
    pub fn blit_bgrx(
        &mut self,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        data: &[u8],
        offset: usize,
    ) {
        self.blit_with(Rect::new(x, y, width, height), data, offset, 4, |px| {
            [px[2], px[1], px[0], OPAQUE]
        });
    }

    /// Writes tightly packed (R, G, B) pixels.
    pub fn blit_rgb(
        &mut self,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        data: &[u8],
        offset: usize,
    ) {
        self.blit_with(Rect::new(x, y, width, height), data, offset, 3, |px| {
            [px[0], px[1], px[2], OPAQUE]
        });
    }

    /// Writes one palette index per pixel, resolved through `palette`.
    pub fn blit_indexed(
        &mut self,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        data: &[u8],
        offset: usize,
        palette: &Palette,
    ) {
        self.blit_with(Rect::new(x, y, width, height), data, offset, 1, |px| {
            let [r, g, b] = palette.lookup(u16::from(px[0]));
            [r, g, b, OPAQUE]
        });
    }

    /// Copies RGBA pixels verbatim, alpha included.
    pub fn put_rgba(&mut self, x: i32, y: i32, width: i32, height: i32, data: &[u8]) {
        self.blit_with(Rect::new(x, y, width, height), data, 0, 4, |px| {
            [px[0], px[1], px[2], px[3]]
        });
    }

    /// Copies a decoded image with its top-left corner at `(x, y)`.
    pub fn draw_image(&mut self, image: &DecodedImage, x: i32, y: i32) {
        let (Ok(width), Ok(height)) = (i32::try_from(image.width()), i32::try_from(image.height()))
        else {
            warn!(
                "Framebuffer: image of {}x{} is too large to draw",
                image.width(),
                image.height()
            );
            return;
        };
        self.put_rgba(x, y, width, height, image.pixels());
    }

    /// Shared body of every blit: the source holds `rect.width * rect.height`
    /// pixels of `bpp` bytes starting at `offset`, and `convert` turns one
    /// source pixel into RGBA.
    fn blit_with<F>(&mut self, rect: Rect, data: &[u8], offset: usize, bpp: usize, convert: F)
    where
        F: Fn(&[u8]) -> [u8; 4],
    {
        if rect.is_empty() {
            return;
        }
        let src_w = rect.width as usize;
        let needed = src_w
            .checked_mul(rect.height as usize)
            .and_then(|n| n.checked_mul(bpp))
            .and_then(|n| n.checked_add(offset));
        match needed {
            Some(needed) if needed <= data.len() => {}
            _ => {
                warn!(
                    "Framebuffer: blit {:?} needs {:?} bytes from offset {} but only {} were given, ignoring",
                    rect,
                    needed,
                    offset,
                    data.len()
                );
                return;
            }
        }
        let Some(clip) = self.clip(rect) else {
            return;
        };

        for row in 0..clip.height {
            let src_row = offset + ((clip.skip_y + row) * src_w + clip.skip_x) * bpp;
            let dst_row = self.offset(clip.x, clip.y + row);
            let src = &data[src_row..src_row + clip.width * bpp];
            let dst = &mut self.pixels[dst_row..dst_row + clip.width * BYTES_PER_PIXEL];
            for (src_px, dst_px) in src
                .chunks_exact(bpp)
                .zip(dst.chunks_exact_mut(BYTES_PER_PIXEL))
            {
                dst_px.copy_from_slice(&convert(src_px));
            }
        }
    }

    /// Copies the given region into `out`, replacing its contents. Rows are
    /// packed with no padding. Returns the size actually copied after
    /// clipping to the buffer.
    pub fn read_region(&self, x: u32, y: u32, width: u32, height: u32, out: &mut Vec<u8>) -> (u32, u32) {
        out.clear();
        let x = x.min(self.width);
        let y = y.min(self.height);
        let width = width.min(self.width - x) as usize;
        let height = height.min(self.height - y) as usize;
        out.reserve(width * height * BYTES_PER_PIXEL);
        for row in 0..height {
            let start = self.offset(x as usize, y as usize + row);
            out.extend_from_slice(&self.pixels[start..start + width * BYTES_PER_PIXEL]);
        }
        (width as u32, height as u32)
    }

    fn clip(&self, rect: Rect) -> Option<ClippedRect> {
        rect.clip(self.width as usize, self.height as usize)
    }
}

fn clip_copy_axis(src: i32, dst: i32, len: i32, bound: u32) -> Option<(usize, usize, usize)> {
    let (mut src, mut dst, mut len) = (i64::from(src), i64::from(dst), i64::from(len));
    let lead = (-src).max(-dst).max(0);
    src += lead;
    dst += lead;
    len -= lead;
    let bound = i64::from(bound);
    len = len.min(bound - src).min(bound - dst);
    if len <= 0 {
        return None;
    }
    Some((src as usize, dst as usize, len as usize))
}

/// Byte length of a `width` x `height` buffer, if it fits in `usize`.
fn buffer_len(width: u32, height: u32) -> Option<usize> {
    (width as usize)
        .checked_mul(height as usize)?
        .checked_mul(BYTES_PER_PIXEL)
}

/// Clamps a requested size to at least 1x1.
pub(crate) fn sanitize_dimensions(width: u32, height: u32) -> (u32, u32) {
    if width == 0 || height == 0 {
        warn!(
            "Framebuffer: refusing {}x{}, clamping to at least 1x1",
            width, height
        );
    }
    (width.max(1), height.max(1))
}
