//! Frame differencing and dirty-rectangle tracking
//!
//! `FrameDiff` keeps two destination-sized buffers. `current` is only
//! written where a freshly converted pixel differs from `previous`, so at
//! the start of every scan both buffers agree outside the pixels written
//! by the last scan. After a scan that found changes, `previous` is
//! resynchronized from `current`.
//!
//! The scan always covers the whole destination. The dirty rectangle only
//! bounds how much has to be transmitted.

use crate::convert::{convert, SourceFrame};
use crate::display::Framebuffer;
use crate::orientation::Orientation;

/// Inclusive bounding box of changed pixels, in destination coordinates
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DirtyRect {
    pub x_min: u16,
    pub y_min: u16,
    pub x_max: u16,
    pub y_max: u16,
}

impl DirtyRect {
    /// Single-pixel rectangle
    pub const fn point(x: u16, y: u16) -> Self {
        Self {
            x_min: x,
            y_min: y,
            x_max: x,
            y_max: y,
        }
    }

    /// Rectangle covering a whole `width × height` frame
    pub const fn full(width: u16, height: u16) -> Self {
        Self {
            x_min: 0,
            y_min: 0,
            x_max: width - 1,
            y_max: height - 1,
        }
    }

    pub const fn width(&self) -> u16 {
        self.x_max - self.x_min + 1
    }

    pub const fn height(&self) -> u16 {
        self.y_max - self.y_min + 1
    }

    /// Number of pixels that will be transmitted
    pub const fn area(&self) -> usize {
        self.width() as usize * self.height() as usize
    }

    pub const fn contains(&self, x: u16, y: u16) -> bool {
        x >= self.x_min && x <= self.x_max && y >= self.y_min && y <= self.y_max
    }

    fn include(&mut self, x: u16, y: u16) {
        self.x_min = self.x_min.min(x);
        self.x_max = self.x_max.max(x);
        self.y_min = self.y_min.min(y);
        self.y_max = self.y_max.max(y);
    }
}

/// Double-buffered diff engine
pub struct FrameDiff {
    current: Framebuffer,
    previous: Framebuffer,
    full_refresh: bool,
}

impl FrameDiff {
    /// Zeroed buffers sized for `orientation`
    pub fn new(orientation: Orientation) -> Self {
        let (width, height) = orientation.dimensions();
        Self::with_dimensions(width, height)
    }

    /// Zeroed buffers of an explicit size (both dimensions must be positive)
    pub fn with_dimensions(width: u16, height: u16) -> Self {
        assert!(width > 0 && height > 0, "destination must not be empty");
        Self {
            current: Framebuffer::new(width, height),
            previous: Framebuffer::new(width, height),
            full_refresh: false,
        }
    }

    pub fn width(&self) -> u16 {
        self.current.width()
    }

    pub fn height(&self) -> u16 {
        self.current.height()
    }

    /// Buffer holding the pixels to transmit
    pub fn current(&self) -> &Framebuffer {
        &self.current
    }

    /// Reference buffer for the next comparison
    pub fn previous(&self) -> &Framebuffer {
        &self.previous
    }

    /// Treat every pixel as changed on the next `diff` call
    ///
    /// Used when the panel contents are unknown: at power-on and after a
    /// transmission failed part-way.
    pub fn invalidate(&mut self) {
        self.full_refresh = true;
    }

    /// Whether the next `diff` will report the full frame
    pub fn is_invalidated(&self) -> bool {
        self.full_refresh
    }

    /// Convert `frame`, record changed pixels into `current`, and return
    /// their bounding box (`None` when nothing changed)
    pub fn diff(&mut self, frame: &SourceFrame<'_>) -> Option<DirtyRect> {
        let force = core::mem::take(&mut self.full_refresh);
        let (width, height) = (self.width(), self.height());
        let mut bounds: Option<DirtyRect> = None;

        for y in 0..height {
            let reference = self.previous.row_span(y, 0, width - 1).unwrap_or(&[]);
            for (x, &old) in (0..width).zip(reference) {
                let pixel = convert(frame, width, height, x, y);
                if force || pixel != old {
                    self.current.set_pixel(x, y, pixel);
                    match bounds.as_mut() {
                        Some(rect) => rect.include(x, y),
                        None => bounds = Some(DirtyRect::point(x, y)),
                    }
                }
            }
        }

        if let Some(rect) = bounds {
            self.previous.copy_from(&self.current);
            log::trace!(
                "dirty ({}, {})-({}, {}), {} px",
                rect.x_min,
                rect.y_min,
                rect.x_max,
                rect.y_max,
                rect.area()
            );
        }
        bounds
    }
}
