// src/display/screen.rs
//! `Display` - the rendering core of the remote-framebuffer client.
//!
//! Owns the framebuffer, palette, viewport, render queue and tile
//! accumulator, and talks to the presentation surface through a
//! `PresentationBridge`. Everything runs on the caller's thread; the only
//! asynchronous part is image decoding, whose completions are picked up by
//! `handle_decode_completions`.

use crate::color::{Color, Palette, Rgb};
use crate::config::DisplayConfig;
use crate::display::bridge::PresentationBridge;
use crate::display::driver::DisplayDriver;
use crate::framebuffer::tile::TileAccumulator;
use crate::framebuffer::{Framebuffer, Rect};
use crate::image::{DecodedImage, ImageDecoder, ImageHandle, Logo, PngDecoder};
use crate::render_queue::{FlushCallback, RenderItem, RenderQueue, RenderTarget};
use crate::viewport::{Viewport, ViewportRect};
use anyhow::{Context, Result};
use log::{debug, info, warn};

/// Pixel state the render queue draws into.
struct Canvas {
    fb: Framebuffer,
    palette: Palette,
    true_color: bool,
}

impl RenderTarget for Canvas {
    fn fill_rect(&mut self, x: i32, y: i32, width: i32, height: i32, color: Color) {
        let rgb = color.resolve(&self.palette, self.true_color);
        self.fb.fill_rect(x, y, width, height, rgb);
    }

    fn copy_image(&mut self, src_x: i32, src_y: i32, x: i32, y: i32, width: i32, height: i32) {
        self.fb.copy_image(src_x, src_y, x, y, width, height);
    }

    fn blit_image(&mut self, x: i32, y: i32, width: i32, height: i32, data: &[u8], offset: usize) {
        if self.true_color {
            self.fb.blit_bgrx(x, y, width, height, data, offset);
        } else {
            self.fb
                .blit_indexed(x, y, width, height, data, offset, &self.palette);
        }
    }

    fn blit_rgb_image(
        &mut self,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        data: &[u8],
        offset: usize,
    ) {
        self.fb.blit_rgb(x, y, width, height, data, offset);
    }

    fn draw_image(&mut self, image: &DecodedImage, x: i32, y: i32) {
        self.fb.draw_image(image, x, y);
    }
}

pub struct Display<D: DisplayDriver> {
    canvas: Canvas,
    viewport: Viewport,
    queue: RenderQueue,
    tile: Option<TileAccumulator>,
    bridge: PresentationBridge<D>,
    decoder: Box<dyn ImageDecoder>,
    logo: Option<Logo>,
    cursor_uri: bool,
}

impl<D: DisplayDriver> Display<D> {
    /// Creates a display presenting to `driver`, decoding images with the
    /// built-in PNG decoder.
    pub fn new(driver: D, config: &DisplayConfig) -> Result<Self> {
        Self::with_decoder(driver, config, Box::new(PngDecoder))
    }

    pub fn with_decoder(
        driver: D,
        config: &DisplayConfig,
        decoder: Box<dyn ImageDecoder>,
    ) -> Result<Self> {
        let bridge = PresentationBridge::new(driver)?;
        let fb = Framebuffer::with_draw_path(
            config.initial_width,
            config.initial_height,
            config.draw_path(),
        );
        let viewport = Viewport::new(
            config.viewport_enabled,
            config.initial_scale,
            fb.width(),
            fb.height(),
        );
        let logo = match &config.logo {
            Some(logo_config) => {
                let mut logo = Logo::load(&logo_config.path).context("Failed to load logo")?;
                logo.mime_type = logo_config.mime_type.clone();
                Some(logo)
            }
            None => None,
        };
        let cursor_uri = config
            .cursor_uri_support
            .resolve(bridge.supports_cursor_uris());

        info!(
            "Display: {}x{} framebuffer, {:?} draw path, viewport {}, scale {}, cursor URIs {}",
            fb.width(),
            fb.height(),
            fb.draw_path(),
            if config.viewport_enabled { "on" } else { "off" },
            viewport.scale(),
            if cursor_uri { "on" } else { "off" }
        );

        let mut display = Self {
            canvas: Canvas {
                fb,
                palette: Palette::new(),
                true_color: true,
            },
            viewport,
            queue: RenderQueue::new(),
            tile: None,
            bridge,
            decoder,
            logo,
            cursor_uri,
        };
        display.sync_surface_size();
        Ok(display)
    }

    // --- Accessors ---

    pub fn framebuffer(&self) -> &Framebuffer {
        &self.canvas.fb
    }

    pub fn width(&self) -> u32 {
        self.canvas.fb.width()
    }

    pub fn height(&self) -> u32 {
        self.canvas.fb.height()
    }

    /// The presentation surface driver.
    pub fn surface(&self) -> &D {
        self.bridge.driver()
    }

    pub fn surface_mut(&mut self) -> &mut D {
        self.bridge.driver_mut()
    }

    /// Whether cursors may be sent to the surface as data URIs.
    pub fn cursor_uri_enabled(&self) -> bool {
        self.cursor_uri
    }

    pub fn set_logo(&mut self, logo: Option<Logo>) {
        self.logo = logo;
    }

    pub fn logo(&self) -> Option<&Logo> {
        self.logo.as_ref()
    }

    /// Number of queued draw operations not yet applied.
    pub fn pending_updates(&self) -> usize {
        self.queue.len()
    }

    // --- Framebuffer size ---

    /// Resizes the framebuffer, keeping the overlapping top-left content and
    /// refitting the viewport. Sizes below 1 are clamped to 1.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.canvas.fb.resize(width, height);
        let (width, height) = (self.canvas.fb.width(), self.canvas.fb.height());
        self.viewport.framebuffer_resized(width, height);
        self.sync_surface_size();
    }

    /// Blanks the framebuffer, or replaces it with the logo if one is set.
    ///
    /// The logo is decoded and queued like any other image, so callers that
    /// need to see it should `flush`.
    pub fn clear(&mut self) {
        let Some((width, height)) = self.logo.as_ref().map(|logo| (logo.width, logo.height))
        else {
            debug!("Display: clear");
            self.canvas.fb.clear();
            return;
        };
        debug!("Display: clear to {}x{} logo", width, height);
        self.resize(width, height);
        if let Some(logo) = &self.logo {
            let image = self.decoder.decode(&logo.mime_type, &logo.data);
            self.queue.push(RenderItem::Image { x: 0, y: 0, image }, &mut self.canvas);
        }
    }

    // --- Immediate drawing ---

    pub fn fill_rect(&mut self, x: i32, y: i32, width: i32, height: i32, color: Color) {
        self.canvas.fill_rect(x, y, width, height, color);
    }

    pub fn copy_image(&mut self, src_x: i32, src_y: i32, x: i32, y: i32, width: i32, height: i32) {
        self.canvas.copy_image(src_x, src_y, x, y, width, height);
    }

    /// Draws BGRX pixels in true-color mode, palette indices otherwise.
    pub fn blit_image(&mut self, x: i32, y: i32, width: i32, height: i32, data: &[u8], offset: usize) {
        self.canvas.blit_image(x, y, width, height, data, offset);
    }

    pub fn blit_rgb_image(
        &mut self,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        data: &[u8],
        offset: usize,
    ) {
        self.canvas.blit_rgb_image(x, y, width, height, data, offset);
    }

    pub fn draw_image(&mut self, image: &DecodedImage, x: i32, y: i32) {
        self.canvas.draw_image(image, x, y);
    }

    // --- Tiles ---

    /// Opens a tile filled with `background`. A tile that is still open is
    /// committed first.
    pub fn start_tile(&mut self, x: i32, y: i32, width: i32, height: i32, background: Color) {
        if let Some(open) = self.tile.take() {
            debug!("Display: committing unfinished tile {:?}", open.rect());
            open.commit(&mut self.canvas.fb);
        }
        let rgb = background.resolve(&self.canvas.palette, self.canvas.true_color);
        self.tile = Some(TileAccumulator::new(
            Rect::new(x, y, width, height),
            rgb,
            &self.canvas.fb,
        ));
    }

    /// Punches a sub-rectangle, relative to the tile origin.
    pub fn sub_tile(&mut self, x: i32, y: i32, width: i32, height: i32, color: Color) {
        let rgb: Rgb = color.resolve(&self.canvas.palette, self.canvas.true_color);
        match self.tile.as_mut() {
            Some(tile) => tile.sub_tile(x, y, width, height, rgb),
            None => warn!("Display: sub_tile without an open tile, ignoring"),
        }
    }

    /// Commits the open tile to the framebuffer.
    pub fn finish_tile(&mut self) {
        match self.tile.take() {
            Some(tile) => tile.commit(&mut self.canvas.fb),
            None => warn!("Display: finish_tile without an open tile, ignoring"),
        }
    }

    // --- Palette ---

    /// Replaces the palette wholesale.
    pub fn set_palette<I>(&mut self, mapping: I)
    where
        I: IntoIterator<Item = (u16, Rgb)>,
    {
        self.canvas.palette.replace(mapping);
        debug!("Display: palette now has {} entries", self.canvas.palette.len());
    }

    pub fn palette(&self) -> &Palette {
        &self.canvas.palette
    }

    /// Selects whether `blit_image` data is BGRX pixels (true) or palette
    /// indices (false), and likewise whether fill and tile colors are
    /// expected as `Color::Rgb` or `Color::Indexed`.
    pub fn set_true_color(&mut self, true_color: bool) {
        self.canvas.true_color = true_color;
    }

    pub fn true_color(&self) -> bool {
        self.canvas.true_color
    }

    // --- Render queue ---

    /// Appends a draw operation, applied in order with everything queued
    /// before it.
    pub fn enqueue(&mut self, item: RenderItem) {
        self.queue.push(item, &mut self.canvas);
    }

    /// Starts decoding `bytes` and queues the result for drawing at
    /// `(x, y)`.
    pub fn decode_and_queue_image(&mut self, x: i32, y: i32, mime_type: &str, bytes: &[u8]) {
        let image = self.decoder.decode(mime_type, bytes);
        self.enqueue(RenderItem::Image { x, y, image });
    }

    /// Queues an image whose decode is tracked by the caller.
    pub fn queue_image(&mut self, x: i32, y: i32, image: ImageHandle) {
        self.enqueue(RenderItem::Image { x, y, image });
    }

    /// Resumes the render queue for every image decode that finished since
    /// the last call. Returns the number of completions handled.
    pub fn handle_decode_completions(&mut self) -> usize {
        self.queue.handle_completions(&mut self.canvas)
    }

    /// Runs `callback` once every currently queued update has been applied.
    pub fn flush(&mut self, callback: impl FnOnce() + 'static) {
        self.queue.flush(Box::new(callback));
    }

    /// The most recently registered flush callback that has not run yet.
    pub fn flush_callback(&self) -> Option<&FlushCallback> {
        self.queue.flush_callback()
    }

    // --- Presentation ---

    /// Presents the framebuffer, cropped to the effective viewport.
    pub fn flip(&mut self) {
        self.bridge
            .present(&self.canvas.fb, self.viewport.effective());
    }

    /// Size the surface is shown at (viewport size times scale).
    pub fn presented_size(&self) -> (u32, u32) {
        self.bridge.output_size()
    }

    fn sync_surface_size(&mut self) {
        let rect = self.viewport.effective();
        self.bridge.resize_buffer(rect.width, rect.height);
        let (width, height) = self.viewport.presented_size();
        self.bridge.resize_presentation(width, height);
    }

    // --- Viewport and scale ---

    pub fn viewport(&self) -> ViewportRect {
        self.viewport.effective()
    }

    pub fn viewport_enabled(&self) -> bool {
        self.viewport.is_enabled()
    }

    pub fn set_viewport_enabled(&mut self, enabled: bool) {
        self.viewport.set_enabled(enabled);
        self.sync_surface_size();
        self.flip();
    }

    /// Pans the viewport by `(dx, dy)` and redraws. Ignored while the
    /// viewport is disabled.
    pub fn change_viewport_position(&mut self, dx: i32, dy: i32) {
        if self.viewport.change_position(dx, dy) {
            self.flip();
        }
    }

    /// Resizes the viewport, resizes the surface to match and redraws.
    /// Ignored while the viewport is disabled.
    pub fn change_viewport_size(&mut self, width: i32, height: i32) {
        if self.viewport.change_size(width, height) {
            self.sync_surface_size();
            self.flip();
        }
    }

    pub fn is_clipping(&self) -> bool {
        self.viewport.is_clipping()
    }

    pub fn abs_x(&self, x: i32) -> i32 {
        self.viewport.abs_x(x)
    }

    pub fn abs_y(&self, y: i32) -> i32 {
        self.viewport.abs_y(y)
    }

    /// Maps a point on the scaled surface back to framebuffer coordinates.
    pub fn presented_to_absolute(&self, x: f64, y: f64) -> (i32, i32) {
        self.viewport.presented_to_absolute(x, y)
    }

    pub fn set_scale(&mut self, factor: f64) {
        if self.viewport.set_scale(factor) {
            self.sync_surface_size();
        }
    }

    pub fn scale(&self) -> f64 {
        self.viewport.scale()
    }

    /// Scales the presentation to fit `max_width` x `max_height` and
    /// returns the chosen factor.
    pub fn autoscale(&mut self, max_width: u32, max_height: u32, downscale_only: bool) -> f64 {
        let factor = self
            .viewport
            .autoscale(max_width, max_height, downscale_only);
        self.sync_surface_size();
        factor
    }
}
