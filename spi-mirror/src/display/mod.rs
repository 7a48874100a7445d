//! Display driver and framebuffer
//!
//! Provides the ST7796 SPI driver and the framebuffer the diff engine
//! writes into. The main loop only sees the `DisplaySink` trait.

pub mod framebuffer;
pub mod st7796;

use core::fmt;

use embedded_hal::{digital, spi};

pub use framebuffer::Framebuffer;
pub use st7796::St7796;

use crate::diff::DirtyRect;

/// Consumer of dirty rectangles
pub trait DisplaySink {
    type Error: fmt::Display;

    /// Transmit `rect` of `frame` to the panel; `None` is a no-op
    fn present(&mut self, rect: Option<DirtyRect>, frame: &Framebuffer) -> Result<(), Self::Error>;
}

/// Display errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayError {
    /// SPI transfer failed
    Spi(spi::ErrorKind),
    /// DC or RST line could not be driven
    Pin(digital::ErrorKind),
    /// Rectangle or framebuffer does not fit the panel
    Window,
}

impl fmt::Display for DisplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spi(kind) => write!(f, "SPI transfer failed: {}", kind),
            Self::Pin(kind) => write!(f, "GPIO write failed: {}", kind),
            Self::Window => write!(f, "window outside panel bounds"),
        }
    }
}

impl core::error::Error for DisplayError {}
