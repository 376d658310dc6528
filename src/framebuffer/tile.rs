// src/framebuffer/tile.rs

//! Accumulates one "background plus sub-rectangles" tile and commits it to
//! the framebuffer in a single step.
//!
//! The visible result of a committed tile is always: the whole tile filled
//! with the background, then every sub-rectangle applied in call order.
//! Sub-rectangles are clipped to the tile, and the tile is clipped to the
//! framebuffer it was opened on.

use super::{ClippedRect, DrawPath, Framebuffer, Rect, BYTES_PER_PIXEL};
use crate::color::Rgb;
use log::{debug, trace};

#[derive(Debug, Clone)]
enum Pending {
    /// Sub-rectangles in absolute coordinates, replayed on commit.
    Recorded(Vec<(Rect, Rgb)>),
    /// The visible part of the tile composed in its own RGBA buffer.
    Scratch(Vec<u8>),
}

#[derive(Debug, Clone)]
pub struct TileAccumulator {
    /// The tile as requested; sub-tile coordinates are relative to its
    /// origin.
    rect: Rect,
    background: Rgb,
    /// Part of the tile inside the framebuffer. `None` if nothing of the
    /// tile is visible, in which case the tile draws nothing.
    area: Option<ClippedRect>,
    pending: Pending,
}

impl TileAccumulator {
    /// Opens a tile on `fb`, using its draw path. Nothing is drawn until
    /// `commit`.
    pub fn new(rect: Rect, background: Rgb, fb: &Framebuffer) -> Self {
        let area = rect.clip(fb.width() as usize, fb.height() as usize);
        if area.is_none() {
            debug!("Tile: {:?} lies outside the framebuffer", rect);
        }
        let pending = match fb.draw_path() {
            DrawPath::Native => Pending::Recorded(Vec::new()),
            DrawPath::Software => {
                let pixels = area.map_or(0, |a| a.width * a.height);
                let mut scratch = Vec::with_capacity(pixels * BYTES_PER_PIXEL);
                for _ in 0..pixels {
                    scratch.extend_from_slice(&[background[0], background[1], background[2], 0xff]);
                }
                Pending::Scratch(scratch)
            }
        };
        Self {
            rect,
            background,
            area,
            pending,
        }
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn background(&self) -> Rgb {
        self.background
    }

    /// Punches a sub-rectangle given relative to the tile origin.
    pub fn sub_tile(&mut self, rel_x: i32, rel_y: i32, width: i32, height: i32, rgb: Rgb) {
        let Some(area) = self.area else {
            return;
        };
        let Some((x, y, w, h)) = self.visible_part(area, rel_x, rel_y, width, height) else {
            trace!(
                "Tile: sub-tile ({},{}) {}x{} lies outside {:?}",
                rel_x,
                rel_y,
                width,
                height,
                self.rect
            );
            return;
        };

        match &mut self.pending {
            Pending::Recorded(punches) => punches.push((
                Rect::new(x as i32, y as i32, w as i32, h as i32),
                rgb,
            )),
            Pending::Scratch(scratch) => {
                let value = [rgb[0], rgb[1], rgb[2], 0xff];
                for row in y - area.y..y - area.y + h {
                    let start = (row * area.width + x - area.x) * BYTES_PER_PIXEL;
                    let end = start + w * BYTES_PER_PIXEL;
                    for px in scratch[start..end].chunks_exact_mut(BYTES_PER_PIXEL) {
                        px.copy_from_slice(&value);
                    }
                }
            }
        }
    }

    /// Intersects a tile-relative sub-rectangle with the tile and with
    /// `area`, returning it in absolute coordinates.
    fn visible_part(
        &self,
        area: ClippedRect,
        rel_x: i32,
        rel_y: i32,
        width: i32,
        height: i32,
    ) -> Option<(usize, usize, usize, usize)> {
        let tile_w = i64::from(self.rect.width);
        let tile_h = i64::from(self.rect.height);
        let (x, w) = intersect_axis(
            i64::from(rel_x).max(0),
            (i64::from(rel_x) + i64::from(width)).min(tile_w),
            i64::from(self.rect.x),
            area.x,
            area.width,
        )?;
        let (y, h) = intersect_axis(
            i64::from(rel_y).max(0),
            (i64::from(rel_y) + i64::from(height)).min(tile_h),
            i64::from(self.rect.y),
            area.y,
            area.height,
        )?;
        Some((x, y, w, h))
    }

    /// Writes the finished tile into `fb`, consuming the accumulator.
    pub fn commit(self, fb: &mut Framebuffer) {
        let Some(area) = self.area else {
            return;
        };
        let (x, y, width, height) = (
            area.x as i32,
            area.y as i32,
            area.width as i32,
            area.height as i32,
        );
        match self.pending {
            Pending::Recorded(punches) => {
                fb.fill_rect(x, y, width, height, self.background);
                for (rect, rgb) in punches {
                    fb.fill_rect(rect.x, rect.y, rect.width, rect.height, rgb);
                }
            }
            Pending::Scratch(scratch) => fb.put_rgba(x, y, width, height, &scratch),
        }
    }
}

/// Maps the tile-relative span `[lo, hi)` to absolute coordinates via
/// `origin` and intersects it with `[area_start, area_start + area_len)`.
fn intersect_axis(
    lo: i64,
    hi: i64,
    origin: i64,
    area_start: usize,
    area_len: usize,
) -> Option<(usize, usize)> {
    let area_start = area_start as i64;
    let start = (origin + lo).max(area_start);
    let end = (origin + hi).min(area_start + area_len as i64);
    if start >= end {
        return None;
    }
    Some((start as usize, (end - start) as usize))
}
