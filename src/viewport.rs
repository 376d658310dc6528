// src/viewport.rs

//! Viewport and scale transform.
//!
//! The viewport is a cropped, pannable window onto the framebuffer. While it
//! is disabled the effective viewport is always the whole framebuffer; the
//! stored rectangle is kept so it can be re-enabled later. The scale factor
//! only affects the presented (output) size and never the framebuffer.
//!
//! ## Coordinate systems
//!
//! 1. **Absolute**: framebuffer pixels, `(0, 0)` is the framebuffer origin.
//! 2. **Viewport-relative**: offset from the effective viewport origin.
//!    `abs_x`/`abs_y` convert these to absolute without touching scale.
//! 3. **Presented**: output pixels of the presentation surface, i.e.
//!    viewport-relative pixels multiplied by the scale factor.

use log::{debug, warn};

/// A rectangle inside the framebuffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ViewportRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl ViewportRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Viewport {
    enabled: bool,
    /// `None` until the viewport is first resized or moved; it then starts
    /// out as the full framebuffer.
    stored: Option<ViewportRect>,
    scale: f64,
    fb_width: u32,
    fb_height: u32,
}

impl Viewport {
    pub fn new(enabled: bool, scale: f64, fb_width: u32, fb_height: u32) -> Self {
        let mut viewport = Self {
            enabled,
            stored: None,
            scale: 1.0,
            fb_width,
            fb_height,
        };
        viewport.set_scale(scale);
        viewport
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Enables or disables cropping. Nothing is forgotten when disabling.
    pub fn set_enabled(&mut self, enabled: bool) {
        debug!("Viewport: enabled {} -> {}", self.enabled, enabled);
        self.enabled = enabled;
    }

    fn full(&self) -> ViewportRect {
        ViewportRect::new(0, 0, self.fb_width, self.fb_height)
    }

    /// The stored rectangle, whether or not it is currently in effect.
    pub fn stored(&self) -> ViewportRect {
        self.stored.unwrap_or_else(|| self.full())
    }

    /// The rectangle currently exposed for presentation.
    pub fn effective(&self) -> ViewportRect {
        if self.enabled {
            self.stored()
        } else {
            self.full()
        }
    }

    /// Translates the viewport by `(dx, dy)` and clamps it into the
    /// framebuffer. Returns `false` (and changes nothing) while disabled.
    pub fn change_position(&mut self, dx: i32, dy: i32) -> bool {
        if !self.enabled {
            debug!("Viewport: ignoring move by ({}, {}) while disabled", dx, dy);
            return false;
        }
        let mut rect = self.stored();
        rect.x = clamp_position(i64::from(rect.x) + i64::from(dx), rect.width, self.fb_width);
        rect.y = clamp_position(i64::from(rect.y) + i64::from(dy), rect.height, self.fb_height);
        debug!("Viewport: moved by ({}, {}) to {:?}", dx, dy, rect);
        self.stored = Some(rect);
        true
    }

    /// Sets the viewport size, each axis clamped to the framebuffer, then
    /// re-clamps the position. Returns `false` (and changes nothing) while
    /// disabled.
    pub fn change_size(&mut self, width: i32, height: i32) -> bool {
        if !self.enabled {
            debug!("Viewport: ignoring resize to {}x{} while disabled", width, height);
            return false;
        }
        let mut rect = self.stored();
        rect.width = clamp_len(width, self.fb_width);
        rect.height = clamp_len(height, self.fb_height);
        rect.x = clamp_position(i64::from(rect.x), rect.width, self.fb_width);
        rect.y = clamp_position(i64::from(rect.y), rect.height, self.fb_height);
        debug!("Viewport: resized to {:?}", rect);
        self.stored = Some(rect);
        true
    }

    /// Keeps the stored rectangle inside a resized framebuffer. Position is
    /// given up before size: the origin moves back first, and the size only
    /// shrinks when it no longer fits at all.
    pub fn framebuffer_resized(&mut self, fb_width: u32, fb_height: u32) {
        self.fb_width = fb_width;
        self.fb_height = fb_height;
        if let Some(rect) = self.stored.as_mut() {
            let width = rect.width.min(fb_width);
            let height = rect.height.min(fb_height);
            rect.x = rect.x.min(fb_width - width);
            rect.y = rect.y.min(fb_height - height);
            rect.width = width;
            rect.height = height;
            debug!(
                "Viewport: refit to {}x{} framebuffer as {:?}",
                fb_width, fb_height, rect
            );
        }
    }

    pub fn framebuffer_size(&self) -> (u32, u32) {
        (self.fb_width, self.fb_height)
    }

    /// Converts a viewport-relative x coordinate to an absolute one.
    pub fn abs_x(&self, x: i32) -> i32 {
        x.saturating_add(self.effective().x as i32)
    }

    /// Converts a viewport-relative y coordinate to an absolute one.
    pub fn abs_y(&self, y: i32) -> i32 {
        y.saturating_add(self.effective().y as i32)
    }

    /// Converts a presented (scaled) coordinate to an absolute one.
    pub fn presented_to_absolute(&self, x: f64, y: f64) -> (i32, i32) {
        let rect = self.effective();
        (
            ((x / self.scale).floor() as i32).saturating_add(rect.x as i32),
            ((y / self.scale).floor() as i32).saturating_add(rect.y as i32),
        )
    }

    /// True iff the effective viewport hides part of the framebuffer.
    pub fn is_clipping(&self) -> bool {
        let rect = self.effective();
        rect.width < self.fb_width || rect.height < self.fb_height
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Sets the scale factor. Non-finite or non-positive factors are
    /// rejected and leave the current factor in place.
    pub fn set_scale(&mut self, factor: f64) -> bool {
        if !factor.is_finite() || factor <= 0.0 {
            warn!("Viewport: rejecting scale factor {}", factor);
            return false;
        }
        self.scale = factor;
        true
    }

    /// Picks the largest factor that fits the framebuffer into
    /// `max_width` x `max_height`, optionally never enlarging it.
    pub fn autoscale(&mut self, max_width: u32, max_height: u32, downscale_only: bool) -> f64 {
        let x_ratio = f64::from(max_width) / f64::from(self.fb_width);
        let y_ratio = f64::from(max_height) / f64::from(self.fb_height);
        let mut factor = x_ratio.min(y_ratio);
        if downscale_only && factor > 1.0 {
            factor = 1.0;
        }
        debug!(
            "Viewport: autoscale into {}x{} (downscale_only={}) -> {}",
            max_width, max_height, downscale_only, factor
        );
        if !self.set_scale(factor) {
            warn!("Viewport: autoscale produced no usable factor, keeping {}", self.scale);
        }
        self.scale
    }

    /// Output size: effective viewport size times scale, each axis rounded
    /// to the nearest integer on its own.
    pub fn presented_size(&self) -> (u32, u32) {
        let rect = self.effective();
        (
            (f64::from(rect.width) * self.scale).round() as u32,
            (f64::from(rect.height) * self.scale).round() as u32,
        )
    }
}

fn clamp_len(len: i32, limit: u32) -> u32 {
    (len.max(0) as u32).min(limit)
}

/// Clamps an origin so `[pos, pos + len)` stays in `[0, limit)`; `len` must
/// not exceed `limit`.
fn clamp_position(pos: i64, len: u32, limit: u32) -> u32 {
    pos.clamp(0, i64::from(limit - len)) as u32
}
