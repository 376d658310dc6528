// src/script.rs

//! JSON draw scripts for replaying a sequence of updates without a server.
//!
//! A script is a JSON array of commands tagged by `"op"`, for example:
//!
//! ```json
//! [
//!   {"op": "resize", "width": 4, "height": 4},
//!   {"op": "fill", "x": 0, "y": 0, "width": 4, "height": 4, "color": {"Rgb": [0, 255, 0]}},
//!   {"op": "copy", "src_x": 0, "src_y": 0, "x": 2, "y": 2, "width": 2, "height": 2},
//!   {"op": "flip"}
//! ]
//! ```
//!
//! Pixel primitives go through the render queue, exactly like updates
//! arriving from a server would.

use crate::color::{Color, Rgb};
use crate::display::{Display, DisplayDriver, FrameRegion};
use crate::framebuffer::Rect;
use crate::render_queue::RenderItem;
use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubTile {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub color: Color,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Command {
    Resize {
        width: u32,
        height: u32,
    },
    Clear,
    Fill {
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        color: Color,
    },
    Copy {
        src_x: i32,
        src_y: i32,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
    },
    Blit {
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        data: Vec<u8>,
    },
    BlitRgb {
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        data: Vec<u8>,
    },
    Tile {
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        background: Color,
        #[serde(default)]
        sub_tiles: Vec<SubTile>,
    },
    /// Draws an image file; relative paths resolve against the script.
    Image {
        x: i32,
        y: i32,
        path: PathBuf,
        #[serde(default = "default_mime_type")]
        mime_type: String,
    },
    Palette {
        entries: Vec<(u16, Rgb)>,
    },
    TrueColor {
        enabled: bool,
    },
    ViewportEnabled {
        enabled: bool,
    },
    ViewportSize {
        width: i32,
        height: i32,
    },
    ViewportMove {
        dx: i32,
        dy: i32,
    },
    Scale {
        factor: f64,
    },
    Autoscale {
        max_width: u32,
        max_height: u32,
        #[serde(default)]
        downscale_only: bool,
    },
    Flip,
}

fn default_mime_type() -> String {
    crate::image::MIME_PNG.to_string()
}

pub fn parse_script(json: &str) -> Result<Vec<Command>> {
    serde_json::from_str(json).context("Failed to parse draw script")
}

pub fn load_script(path: &Path) -> Result<Vec<Command>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read draw script {}", path.display()))?;
    parse_script(&text)
}

/// Applies `commands` to `display` in order. `base_dir` anchors relative
/// image paths.
pub fn run_script<D: DisplayDriver>(
    display: &mut Display<D>,
    commands: &[Command],
    base_dir: &Path,
) -> Result<()> {
    info!("Replaying {} command(s)", commands.len());
    for (index, command) in commands.iter().enumerate() {
        debug!("Command {}: {:?}", index, command);
        match command {
            Command::Resize { width, height } => display.resize(*width, *height),
            Command::Clear => display.clear(),
            Command::Fill {
                x,
                y,
                width,
                height,
                color,
            } => display.enqueue(RenderItem::Fill {
                rect: Rect::new(*x, *y, *width, *height),
                color: *color,
            }),
            Command::Copy {
                src_x,
                src_y,
                x,
                y,
                width,
                height,
            } => display.enqueue(RenderItem::Copy {
                src_x: *src_x,
                src_y: *src_y,
                rect: Rect::new(*x, *y, *width, *height),
            }),
            Command::Blit {
                x,
                y,
                width,
                height,
                data,
            } => display.enqueue(RenderItem::Blit {
                rect: Rect::new(*x, *y, *width, *height),
                data: data.clone(),
            }),
            Command::BlitRgb {
                x,
                y,
                width,
                height,
                data,
            } => display.enqueue(RenderItem::BlitRgb {
                rect: Rect::new(*x, *y, *width, *height),
                data: data.clone(),
            }),
            Command::Tile {
                x,
                y,
                width,
                height,
                background,
                sub_tiles,
            } => {
                display.start_tile(*x, *y, *width, *height, *background);
                for sub in sub_tiles {
                    display.sub_tile(sub.x, sub.y, sub.width, sub.height, sub.color);
                }
                display.finish_tile();
            }
            Command::Image {
                x,
                y,
                path,
                mime_type,
            } => {
                let full_path = base_dir.join(path);
                let bytes = std::fs::read(&full_path).with_context(|| {
                    format!(
                        "Command {}: failed to read image {}",
                        index,
                        full_path.display()
                    )
                })?;
                display.decode_and_queue_image(*x, *y, mime_type, &bytes);
            }
            Command::Palette { entries } => display.set_palette(entries.iter().copied()),
            Command::TrueColor { enabled } => display.set_true_color(*enabled),
            Command::ViewportEnabled { enabled } => display.set_viewport_enabled(*enabled),
            Command::ViewportSize { width, height } => {
                display.change_viewport_size(*width, *height)
            }
            Command::ViewportMove { dx, dy } => display.change_viewport_position(*dx, *dy),
            Command::Scale { factor } => display.set_scale(*factor),
            Command::Autoscale {
                max_width,
                max_height,
                downscale_only,
            } => {
                display.autoscale(*max_width, *max_height, *downscale_only);
            }
            Command::Flip => display.flip(),
        }
    }
    Ok(())
}

/// Writes a frame as a binary PPM (P6), dropping alpha.
pub fn write_ppm<W: Write>(frame: &FrameRegion, mut out: W) -> Result<()> {
    write!(out, "P6\n{} {}\n255\n", frame.width, frame.height).context("Failed to write PPM header")?;
    let mut rgb = Vec::with_capacity(frame.pixels.len() / 4 * 3);
    for px in frame.pixels.chunks_exact(4) {
        rgb.extend_from_slice(&px[..3]);
    }
    out.write_all(&rgb).context("Failed to write PPM pixels")?;
    out.flush().context("Failed to flush PPM output")?;
    Ok(())
}
