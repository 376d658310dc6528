// src/render_queue.rs

//! Strictly ordered queue of pending draw operations.
//!
//! Items are applied to a `RenderTarget` in exactly the order they were
//! pushed. An `Image` item whose decode has not finished suspends the whole
//! queue: the queue registers a one-shot completion notification on the
//! image and returns. When the notification arrives (see
//! `handle_completions`) processing resumes at the same item.
//!
//! There is no timeout and no cancellation. An image that never resolves
//! stalls everything queued behind it; decode failures resolve the image
//! and are drawn as nothing.


use crate::color::Color;
use crate::framebuffer::Rect;
use crate::image::{DecodedImage, ImageHandle, ImageId};
use log::{debug, trace, warn};
use std::collections::VecDeque;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

/// One-shot callback fired when the queue drains.
pub type FlushCallback = Box<dyn FnOnce()>;

/// A queued draw operation.
#[derive(Debug, Clone)]
pub enum RenderItem {
    Fill {
        rect: Rect,
        color: Color,
    },
    Copy {
        src_x: i32,
        src_y: i32,
        rect: Rect,
    },
    /// Packed true-color pixels (B, G, R, X), or palette indices when the
    /// display is not in true-color mode.
    Blit {
        rect: Rect,
        data: Vec<u8>,
    },
    /// Packed (R, G, B) pixels.
    BlitRgb {
        rect: Rect,
        data: Vec<u8>,
    },
    Image {
        x: i32,
        y: i32,
        image: ImageHandle,
    },
}

/// The drawing operations the queue dispatches to.
pub trait RenderTarget {
    fn fill_rect(&mut self, x: i32, y: i32, width: i32, height: i32, color: Color);

    fn copy_image(&mut self, src_x: i32, src_y: i32, x: i32, y: i32, width: i32, height: i32);

    fn blit_image(&mut self, x: i32, y: i32, width: i32, height: i32, data: &[u8], offset: usize);

    fn blit_rgb_image(
        &mut self,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        data: &[u8],
        offset: usize,
    );

    fn draw_image(&mut self, image: &DecodedImage, x: i32, y: i32);
}

pub struct RenderQueue {
    items: VecDeque<RenderItem>,
    /// Image the queue is currently suspended on, if any.
    waiting_on: Option<ImageId>,
    completion_tx: Sender<ImageId>,
    completion_rx: Receiver<ImageId>,
    flush_callbacks: Vec<FlushCallback>,
}

impl Default for RenderQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderQueue {
    pub fn new() -> Self {
        let (completion_tx, completion_rx) = mpsc::channel();
        Self {
            items: VecDeque::new(),
            waiting_on: None,
            completion_tx,
            completion_rx,
            flush_callbacks: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The image the queue is suspended on, if any.
    pub fn waiting_on(&self) -> Option<ImageId> {
        self.waiting_on
    }

    /// Appends an item. Processing starts right away only if the queue was
    /// empty; otherwise a scan is already running or suspended and will
    /// reach this item in turn.
    pub fn push(&mut self, item: RenderItem, target: &mut impl RenderTarget) {
        let was_empty = self.items.is_empty();
        self.items.push_back(item);
        if was_empty {
            self.scan(target);
        } else {
            trace!("RenderQueue: queued behind {} item(s)", self.items.len() - 1);
        }
    }

    /// Applies items from the front until the queue is empty or the front
    /// item is an image that is not ready yet.
    pub fn scan(&mut self, target: &mut impl RenderTarget) {
        while let Some(front) = self.items.front() {
            if let RenderItem::Image { image, .. } = front {
                if !image.is_ready() {
                    if self.waiting_on != Some(image.id()) {
                        debug!(
                            "RenderQueue: suspended on image {} with {} item(s) queued",
                            image.id(),
                            self.items.len()
                        );
                        self.waiting_on = Some(image.id());
                        image.notify_when_ready(self.completion_tx.clone());
                    }
                    return;
                }
            }

            let Some(item) = self.items.pop_front() else {
                break;
            };
            self.waiting_on = None;
            Self::dispatch(item, target);
        }

        self.fire_flush_callbacks();
    }

    fn dispatch(item: RenderItem, target: &mut impl RenderTarget) {
        match item {
            RenderItem::Fill { rect, color } => {
                target.fill_rect(rect.x, rect.y, rect.width, rect.height, color);
            }
            RenderItem::Copy { src_x, src_y, rect } => {
                target.copy_image(src_x, src_y, rect.x, rect.y, rect.width, rect.height);
            }
            RenderItem::Blit { rect, data } => {
                target.blit_image(rect.x, rect.y, rect.width, rect.height, &data, 0);
            }
            RenderItem::BlitRgb { rect, data } => {
                target.blit_rgb_image(rect.x, rect.y, rect.width, rect.height, &data, 0);
            }
            RenderItem::Image { x, y, image } => match image.image() {
                Some(decoded) => target.draw_image(&decoded, x, y),
                None => warn!(
                    "RenderQueue: image {} at ({}, {}) failed to decode, skipping: {:?}",
                    image.id(),
                    x,
                    y,
                    image.error()
                ),
            },
        }
    }

    /// Drains pending decode notifications and resumes processing if any
    /// arrived. Returns the number of notifications handled.
    pub fn handle_completions(&mut self, target: &mut impl RenderTarget) -> usize {
        let mut handled = 0;
        loop {
            match self.completion_rx.try_recv() {
                Ok(id) => {
                    trace!("RenderQueue: image {} completed", id);
                    handled += 1;
                }
                Err(TryRecvError::Empty) => break,
                // The queue holds a sender itself, so this cannot happen.
                Err(TryRecvError::Disconnected) => break,
            }
        }
        if handled > 0 {
            self.scan(target);
        }
        handled
    }

    /// Registers `callback` to run once the queue is empty, or runs it now
    /// if it already is.
    pub fn flush(&mut self, callback: FlushCallback) {
        self.flush_callbacks.push(callback);
        if self.items.is_empty() {
            self.fire_flush_callbacks();
        } else {
            debug!(
                "RenderQueue: flush deferred until {} item(s) drain",
                self.items.len()
            );
        }
    }

    /// The most recently registered flush callback that has not fired yet.
    pub fn flush_callback(&self) -> Option<&FlushCallback> {
        self.flush_callbacks.last()
    }

    fn fire_flush_callbacks(&mut self) {
        if self.flush_callbacks.is_empty() {
            return;
        }
        trace!(
            "RenderQueue: drained, firing {} flush callback(s)",
            self.flush_callbacks.len()
        );
        for callback in std::mem::take(&mut self.flush_callbacks) {
            callback();
        }
    }
}
