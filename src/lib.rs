//! Rendering core of a remote-framebuffer (VNC) client.
//!
//! Draw primitives decoded from the wire are applied, in protocol order, to
//! a local RGBA framebuffer, which is then presented through a cropped and
//! scaled viewport to an external surface.

pub mod color;
pub mod config;
pub mod display;
pub mod framebuffer;
pub mod image;
pub mod render_queue;
pub mod script;
pub mod viewport;
