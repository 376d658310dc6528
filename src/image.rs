// src/image.rs

//! Externally decoded images and the one-shot handles that track them.
//!
//! Decoding is a collaborator outside the display core: the core asks an
//! `ImageDecoder` for an `ImageHandle` and later learns, through a channel,
//! that the handle has been resolved. A handle resolves exactly once, either
//! with pixels or with an error; both count as "ready" so a failed decode
//! never stalls the render queue.

use anyhow::{Context, Result};
use log::{debug, warn};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

pub const MIME_PNG: &str = "image/png";

static NEXT_IMAGE_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ImageError {
    #[error("Unsupported image type '{0}'")]
    UnsupportedType(String),
    #[error("Failed to decode image: {0}")]
    Decode(String),
}

/// Fully decoded RGBA8 pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl DecodedImage {
    /// Wraps RGBA8 pixels. Returns `None` if `pixels` does not hold exactly
    /// `width * height` pixels.
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Option<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(4)?;
        (pixels.len() == expected).then_some(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

/// Identifies a handle in completion notifications.
pub type ImageId = u64;

#[derive(Debug)]
enum ImageState {
    Pending,
    Ready(Arc<DecodedImage>),
    Failed(ImageError),
}

#[derive(Debug)]
struct ImageSlot {
    state: ImageState,
    waiter: Option<Sender<ImageId>>,
}

/// Shared, one-shot slot for an image that may still be decoding.
#[derive(Debug, Clone)]
pub struct ImageHandle {
    id: ImageId,
    slot: Arc<Mutex<ImageSlot>>,
}

impl ImageHandle {
    /// A handle whose decode has not finished yet.
    pub fn pending() -> Self {
        Self::with_state(ImageState::Pending)
    }

    /// A handle that is already decoded.
    pub fn ready(image: DecodedImage) -> Self {
        Self::with_state(ImageState::Ready(Arc::new(image)))
    }

    /// A handle whose decode already failed.
    pub fn failed(err: ImageError) -> Self {
        Self::with_state(ImageState::Failed(err))
    }

    fn with_state(state: ImageState) -> Self {
        Self {
            id: NEXT_IMAGE_ID.fetch_add(1, Ordering::Relaxed),
            slot: Arc::new(Mutex::new(ImageSlot {
                state,
                waiter: None,
            })),
        }
    }

    pub fn id(&self) -> ImageId {
        self.id
    }

    // A panic while holding the lock cannot leave the slot half-written, so
    // a poisoned mutex is still safe to read.
    fn lock(&self) -> MutexGuard<'_, ImageSlot> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// True once the decode finished, successfully or not.
    pub fn is_ready(&self) -> bool {
        !matches!(self.lock().state, ImageState::Pending)
    }

    /// The decoded pixels, if the decode succeeded.
    pub fn image(&self) -> Option<Arc<DecodedImage>> {
        match &self.lock().state {
            ImageState::Ready(image) => Some(Arc::clone(image)),
            _ => None,
        }
    }

    /// The decode error, if the decode failed.
    pub fn error(&self) -> Option<ImageError> {
        match &self.lock().state {
            ImageState::Failed(err) => Some(err.clone()),
            _ => None,
        }
    }

    /// Completes the decode and notifies the registered waiter, if any.
    /// Only the first call has an effect.
    pub fn resolve(&self, result: std::result::Result<DecodedImage, ImageError>) {
        let waiter = {
            let mut slot = self.lock();
            if !matches!(slot.state, ImageState::Pending) {
                warn!("Image {}: resolved twice, ignoring", self.id);
                return;
            }
            slot.state = match result {
                Ok(image) => ImageState::Ready(Arc::new(image)),
                Err(err) => {
                    warn!("Image {}: {}", self.id, err);
                    ImageState::Failed(err)
                }
            };
            slot.waiter.take()
        };
        if let Some(tx) = waiter {
            // The receiver is gone only if the display was dropped.
            let _ = tx.send(self.id);
        }
    }

    /// Registers a one-shot completion notification. If the handle is
    /// already resolved the notification is sent immediately.
    pub fn notify_when_ready(&self, tx: Sender<ImageId>) {
        let mut slot = self.lock();
        if matches!(slot.state, ImageState::Pending) {
            slot.waiter = Some(tx);
        } else {
            drop(slot);
            let _ = tx.send(self.id);
        }
    }
}

/// Turns an encoded byte blob into pixels, possibly asynchronously.
pub trait ImageDecoder {
    /// Starts decoding. The returned handle resolves once the pixels are
    /// available or the decode failed.
    fn decode(&mut self, mime_type: &str, bytes: &[u8]) -> ImageHandle;
}

/// Decodes PNG images synchronously; the returned handle is always ready.
#[derive(Debug, Clone, Copy, Default)]
pub struct PngDecoder;

impl ImageDecoder for PngDecoder {
    fn decode(&mut self, mime_type: &str, bytes: &[u8]) -> ImageHandle {
        if mime_type != MIME_PNG {
            return ImageHandle::failed(ImageError::UnsupportedType(mime_type.to_string()));
        }
        match decode_png(bytes) {
            Ok(image) => {
                debug!(
                    "PngDecoder: decoded {}x{} image",
                    image.width(),
                    image.height()
                );
                ImageHandle::ready(image)
            }
            Err(err) => ImageHandle::failed(err),
        }
    }
}

/// Decodes a PNG into RGBA8, expanding palette, grayscale and 16-bit input.
pub fn decode_png(bytes: &[u8]) -> std::result::Result<DecodedImage, ImageError> {
    let mut decoder = png::Decoder::new(bytes);
    decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
    let mut reader = decoder
        .read_info()
        .map_err(|e| ImageError::Decode(e.to_string()))?;
    let mut buf = vec![0; reader.output_buffer_size()];
    let info = reader
        .next_frame(&mut buf)
        .map_err(|e| ImageError::Decode(e.to_string()))?;
    let data = &buf[..info.buffer_size()];

    let pixel_count = info.width as usize * info.height as usize;
    let mut rgba = Vec::with_capacity(pixel_count * 4);
    match info.color_type {
        png::ColorType::Rgba => rgba.extend_from_slice(data),
        png::ColorType::Rgb => {
            for px in data.chunks_exact(3) {
                rgba.extend_from_slice(&[px[0], px[1], px[2], 0xff]);
            }
        }
        png::ColorType::GrayscaleAlpha => {
            for px in data.chunks_exact(2) {
                rgba.extend_from_slice(&[px[0], px[0], px[0], px[1]]);
            }
        }
        png::ColorType::Grayscale => {
            for &v in data {
                rgba.extend_from_slice(&[v, v, v, 0xff]);
            }
        }
        png::ColorType::Indexed => {
            return Err(ImageError::Decode(
                "indexed PNG was not expanded to RGB".to_string(),
            ));
        }
    }

    DecodedImage::from_rgba(info.width, info.height, rgba).ok_or_else(|| {
        ImageError::Decode(format!(
            "decoded data does not match {}x{}",
            info.width, info.height
        ))
    })
}

/// Placeholder image drawn by `clear`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Logo {
    pub width: u32,
    pub height: u32,
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl Logo {
    /// Builds a logo from PNG bytes, reading its dimensions from the header.
    pub fn from_png(data: Vec<u8>) -> Result<Self> {
        let (width, height) = {
            let reader = png::Decoder::new(data.as_slice())
                .read_info()
                .context("Failed to read PNG header of logo")?;
            let info = reader.info();
            (info.width, info.height)
        };
        Ok(Self {
            width,
            height,
            mime_type: MIME_PNG.to_string(),
            data,
        })
    }

    pub fn load(path: &std::path::Path) -> Result<Self> {
        let data = std::fs::read(path)
            .with_context(|| format!("Failed to read logo from {}", path.display()))?;
        Self::from_png(data)
    }
}
