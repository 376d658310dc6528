//! Headless display driver implementation.
//!
//! Keeps the last frame it was asked to present so callers (the replay
//! binary, tests) can inspect what would have been on screen.

use crate::display::driver::DisplayDriver;
use crate::display::messages::{DisplayError, DriverRequest, DriverResponse, FrameRegion};
use log::{info, trace};

#[derive(Debug, Clone, Default)]
pub struct HeadlessDisplayDriver {
    supports_cursor_uris: bool,
    buffer_size: (u32, u32),
    output_size: (u32, u32),
    presented: Option<FrameRegion>,
    present_count: u64,
}

impl HeadlessDisplayDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advertise (or not) support for data-URI cursors on `Init`.
    pub fn with_cursor_uri_support(mut self, supported: bool) -> Self {
        self.supports_cursor_uris = supported;
        self
    }

    /// Bitmap size last requested via `ResizeBuffer`.
    pub fn buffer_size(&self) -> (u32, u32) {
        self.buffer_size
    }

    /// Presented size last requested via `ResizeOutput`.
    pub fn output_size(&self) -> (u32, u32) {
        self.output_size
    }

    /// Copy of the last presented frame.
    pub fn presented(&self) -> Option<&FrameRegion> {
        self.presented.as_ref()
    }

    pub fn present_count(&self) -> u64 {
        self.present_count
    }
}

impl DisplayDriver for HeadlessDisplayDriver {
    fn handle_request(&mut self, request: DriverRequest) -> Result<DriverResponse, DisplayError> {
        match request {
            DriverRequest::Init => {
                info!(
                    "HeadlessDisplayDriver: Init (cursor URIs supported: {})",
                    self.supports_cursor_uris
                );
                Ok(DriverResponse::InitComplete {
                    supports_cursor_uris: self.supports_cursor_uris,
                })
            }
            DriverRequest::ResizeBuffer {
                width_px,
                height_px,
            } => {
                trace!("HeadlessDisplayDriver: ResizeBuffer {}x{}", width_px, height_px);
                self.buffer_size = (width_px, height_px);
                Ok(DriverResponse::BufferResized)
            }
            DriverRequest::ResizeOutput {
                width_px,
                height_px,
            } => {
                trace!("HeadlessDisplayDriver: ResizeOutput {}x{}", width_px, height_px);
                self.output_size = (width_px, height_px);
                Ok(DriverResponse::OutputResized)
            }
            DriverRequest::Present(frame) => {
                trace!(
                    "HeadlessDisplayDriver: Present {}x{}",
                    frame.width,
                    frame.height
                );
                self.present_count += 1;
                // Keep our own copy; the original goes back for reuse.
                match self.presented.as_mut() {
                    Some(kept) => {
                        kept.width = frame.width;
                        kept.height = frame.height;
                        kept.pixels.clear();
                        kept.pixels.extend_from_slice(&frame.pixels);
                    }
                    None => self.presented = Some(frame.clone()),
                }
                Ok(DriverResponse::PresentComplete(frame))
            }
        }
    }
}
