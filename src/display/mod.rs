// src/display/mod.rs
//! Display core and its presentation surface.
//!
//! - Display: framebuffer, palette, viewport and render queue in one place
//! - PresentationBridge: copies the viewport-cropped framebuffer out
//! - DisplayDriver: the external surface (headless implementation included)
//! - Messages: Request/Response protocol between bridge and driver

pub mod bridge;
pub mod driver;
pub mod drivers;
pub mod messages;
pub mod screen;

pub use bridge::PresentationBridge;
pub use driver::DisplayDriver;
pub use drivers::HeadlessDisplayDriver;
pub use messages::{DisplayError, DriverRequest, DriverResponse, FrameRegion};
pub use screen::Display;
