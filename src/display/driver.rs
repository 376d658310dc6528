// src/display/driver.rs
//! DisplayDriver trait - minimal interface of a presentation surface.
//!
//! The surface only has to be resizable and able to receive raw RGBA8
//! frames. Everything else (viewport cropping, scaling arithmetic, frame
//! reuse) lives in the `PresentationBridge`.
//!
//! ## Lifecycle
//! 1. Construct the driver (platform specific)
//! 2. `handle_request(Init)` - report capabilities
//! 3. Request/response loop - all operations via messages
//! 4. `Drop` - cleanup (no explicit shutdown message)

use crate::display::messages::{DisplayError, DriverRequest, DriverResponse};

/// Presentation surface driver.
pub trait DisplayDriver {
    /// Handle a request from the bridge, returning a response.
    ///
    /// ## Request/Response Pairs
    /// - `Init` → `InitComplete`
    /// - `ResizeBuffer` → `BufferResized`
    /// - `ResizeOutput` → `OutputResized`
    /// - `Present(frame)` → `PresentComplete(frame)`
    ///
    /// ## Error Handling
    /// When a `Present` request fails, the frame is returned via
    /// `DisplayError::PresentationFailed` so the bridge can reuse it.
    fn handle_request(&mut self, request: DriverRequest) -> Result<DriverResponse, DisplayError>;
}
