// src/display/bridge.rs
//! PresentationBridge - synchronous wrapper around a DisplayDriver.
//!
//! Tracks the sizes last pushed to the surface and recycles the frame
//! allocation handed back by the driver after each present.

use crate::display::driver::DisplayDriver;
use crate::display::messages::{DisplayError, DriverRequest, DriverResponse, FrameRegion};
use crate::framebuffer::Framebuffer;
use crate::viewport::ViewportRect;
use anyhow::{Context, Result};
use log::{info, trace, warn};

pub struct PresentationBridge<D: DisplayDriver> {
    driver: D,
    supports_cursor_uris: bool,
    buffer_size: (u32, u32),
    output_size: (u32, u32),
    /// Frame returned by the driver, reused by the next present.
    spare: Option<FrameRegion>,
}

impl<D: DisplayDriver> PresentationBridge<D> {
    /// Initializes the driver and records its capabilities.
    pub fn new(mut driver: D) -> Result<Self> {
        info!("PresentationBridge: Initializing driver...");
        let response = driver
            .handle_request(DriverRequest::Init)
            .map_err(|e| anyhow::anyhow!(e))
            .context("Failed to initialize display driver")?;

        let supports_cursor_uris = match response {
            DriverResponse::InitComplete {
                supports_cursor_uris,
            } => supports_cursor_uris,
            _ => {
                return Err(anyhow::anyhow!(
                    "Expected InitComplete response, got {:?}",
                    response
                ));
            }
        };

        Ok(Self {
            driver,
            supports_cursor_uris,
            buffer_size: (0, 0),
            output_size: (0, 0),
            spare: None,
        })
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    pub fn supports_cursor_uris(&self) -> bool {
        self.supports_cursor_uris
    }

    pub fn buffer_size(&self) -> (u32, u32) {
        self.buffer_size
    }

    pub fn output_size(&self) -> (u32, u32) {
        self.output_size
    }

    /// Sets the surface bitmap size (the unscaled viewport size).
    pub fn resize_buffer(&mut self, width_px: u32, height_px: u32) {
        if self.buffer_size == (width_px, height_px) {
            return;
        }
        match self.driver.handle_request(DriverRequest::ResizeBuffer {
            width_px,
            height_px,
        }) {
            Ok(_) => self.buffer_size = (width_px, height_px),
            Err(e) => warn!(
                "PresentationBridge: resizing buffer to {}x{} failed: {}",
                width_px, height_px, e
            ),
        }
    }

    /// Sets the presented size (viewport size times scale).
    pub fn resize_presentation(&mut self, width_px: u32, height_px: u32) {
        if self.output_size == (width_px, height_px) {
            return;
        }
        match self.driver.handle_request(DriverRequest::ResizeOutput {
            width_px,
            height_px,
        }) {
            Ok(_) => self.output_size = (width_px, height_px),
            Err(e) => warn!(
                "PresentationBridge: resizing output to {}x{} failed: {}",
                width_px, height_px, e
            ),
        }
    }

    /// Copies `region` of the framebuffer to the surface.
    pub fn present(&mut self, fb: &Framebuffer, region: ViewportRect) {
        let mut frame = self.spare.take().unwrap_or_default();
        let (width, height) = fb.read_region(
            region.x,
            region.y,
            region.width,
            region.height,
            &mut frame.pixels,
        );
        frame.width = width;
        frame.height = height;
        trace!("PresentationBridge: presenting {:?}", region);

        match self.driver.handle_request(DriverRequest::Present(frame)) {
            Ok(DriverResponse::PresentComplete(frame)) => self.spare = Some(frame),
            Ok(other) => warn!(
                "PresentationBridge: expected PresentComplete, got {:?}",
                other
            ),
            Err(DisplayError::PresentationFailed(frame, reason)) => {
                // Recover the frame even on error
                self.spare = Some(frame);
                warn!("Presentation failed, frame recovered: {}", reason);
            }
            Err(DisplayError::Generic(e)) => {
                warn!("PresentationBridge: present failed: {:#}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::drivers::HeadlessDisplayDriver;
    use test_log::test;

    /// Fails every present, handing the frame back.
    struct FailingDriver {
        attempts: u32,
    }

    impl DisplayDriver for FailingDriver {
        fn handle_request(
            &mut self,
            request: DriverRequest,
        ) -> Result<DriverResponse, DisplayError> {
            match request {
                DriverRequest::Init => Ok(DriverResponse::InitComplete {
                    supports_cursor_uris: false,
                }),
                DriverRequest::ResizeBuffer { .. } => Ok(DriverResponse::BufferResized),
                DriverRequest::ResizeOutput { .. } => Ok(DriverResponse::OutputResized),
                DriverRequest::Present(frame) => {
                    self.attempts += 1;
                    Err(DisplayError::PresentationFailed(
                        frame,
                        "surface lost".to_string(),
                    ))
                }
            }
        }
    }

    #[test]
    fn init_reports_cursor_uri_capability() {
        let bridge =
            PresentationBridge::new(HeadlessDisplayDriver::new().with_cursor_uri_support(true))
                .unwrap();
        assert!(bridge.supports_cursor_uris());
    }

    #[test]
    fn present_crops_the_requested_region() {
        let mut fb = Framebuffer::new(3, 3);
        fb.fill_rect(1, 1, 1, 1, [9, 8, 7]);
        let mut bridge = PresentationBridge::new(HeadlessDisplayDriver::new()).unwrap();

        bridge.present(&fb, ViewportRect::new(1, 1, 2, 2));
        let frame = bridge.driver().presented().unwrap();
        assert_eq!((frame.width, frame.height), (2, 2));
        assert_eq!(&frame.pixels[0..4], &[9, 8, 7, 0xff]);
        assert_eq!(&frame.pixels[4..16], &[0; 12]);
    }

    #[test]
    fn failed_present_keeps_the_frame_for_reuse() {
        let fb = Framebuffer::new(2, 2);
        let mut bridge = PresentationBridge::new(FailingDriver { attempts: 0 }).unwrap();
        bridge.present(&fb, ViewportRect::new(0, 0, 2, 2));
        bridge.present(&fb, ViewportRect::new(0, 0, 2, 2));
        assert_eq!(bridge.driver().attempts, 2);
        assert!(bridge.spare.is_some());
    }

    #[test]
    fn resizes_reach_the_driver_only_when_changed() {
        let mut bridge = PresentationBridge::new(HeadlessDisplayDriver::new()).unwrap();
        bridge.resize_buffer(4, 3);
        bridge.resize_presentation(8, 6);
        assert_eq!(bridge.driver().buffer_size(), (4, 3));
        assert_eq!(bridge.driver().output_size(), (8, 6));
        assert_eq!(bridge.output_size(), (8, 6));
    }
}
