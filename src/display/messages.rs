// src/display/messages.rs
//! Message types for communication between the presentation bridge and the
//! presentation surface driver.
//!
//! All communication happens via ownership transfer - no shared state. A
//! presented frame is handed to the driver and handed back once shown, so
//! its allocation can be reused for the next flip.

use thiserror::Error;

/// A packed RGBA8 copy of the viewport-cropped framebuffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameRegion {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Requests sent from the bridge to the driver.
#[derive(Debug, Clone)]
pub enum DriverRequest {
    /// Driver prepares the surface and reports its capabilities.
    /// Driver responds with InitComplete.
    Init,

    /// Set the bitmap size of the surface, i.e. the size of the frames it
    /// will receive. Driver responds with BufferResized.
    ResizeBuffer { width_px: u32, height_px: u32 },

    /// Set the size the surface is shown at, after scaling.
    /// Driver responds with OutputResized.
    ResizeOutput { width_px: u32, height_px: u32 },

    /// Show a frame. Driver takes ownership, shows it, and responds with
    /// PresentComplete.
    Present(FrameRegion),
}

/// Responses sent from the driver to the bridge.
#[derive(Debug)]
pub enum DriverResponse {
    /// Initialization complete.
    InitComplete { supports_cursor_uris: bool },

    BufferResized,

    OutputResized,

    /// Frame shown, ownership returned for reuse.
    PresentComplete(FrameRegion),
}

#[derive(Error, Debug)]
pub enum DisplayError {
    /// The frame could not be shown. The frame is handed back so its
    /// allocation is not lost.
    #[error("Presentation failed: {1}")]
    PresentationFailed(FrameRegion, String),

    #[error(transparent)]
    Generic(#[from] anyhow::Error),
}
