//! Host frame sources
//!
//! Two providers, picked by `capture.source`: the X11 root window
//! (`x11`) and a Linux framebuffer device (`fbdev`). Both hand out
//! 32-bit little-endian XRGB rows.

pub mod fbdev;
pub mod x11;

pub use fbdev::FbdevCapture;
pub use x11::X11Capture;

use spi_mirror::{FrameError, FrameSource, SourceFrame};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::config::{CaptureConfig, CaptureSource};

/// Capture errors
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unexpected contents in {path}: {value:?}")]
    Attribute { path: PathBuf, value: String },

    #[error("{bits} bits per pixel is not supported, capture needs 32 bpp")]
    Depth { bits: u32 },

    #[error("invalid frame geometry")]
    Geometry(#[from] FrameError),

    #[error("cannot connect to the X server")]
    Connect(#[from] x11rb::errors::ConnectError),

    #[error("X11 request failed")]
    X11(#[from] x11rb::errors::ReplyOrIdError),

    #[error("X screen {0} does not exist")]
    NoScreen(usize),

    #[error("X server has no pixmap format for depth {0}")]
    NoFormat(u8),

    #[error("X server sends big-endian images, only LSB-first is supported")]
    ByteOrder,

    #[error("shared memory segment of {len} bytes")]
    SharedMemory {
        len: usize,
        #[source]
        source: io::Error,
    },
}

/// The configured frame source
pub enum Capture {
    Fbdev(FbdevCapture),
    X11(X11Capture),
}

impl Capture {
    pub fn open(config: &CaptureConfig) -> Result<Self, CaptureError> {
        match config.source {
            CaptureSource::Fbdev => FbdevCapture::open(&config.framebuffer).map(Self::Fbdev),
            CaptureSource::X11 => X11Capture::open(config.display.as_deref()).map(Self::X11),
        }
    }
}

impl FrameSource for Capture {
    type Error = CaptureError;

    fn capture(&mut self) -> Result<SourceFrame<'_>, Self::Error> {
        match self {
            Self::Fbdev(fb) => fb.capture(),
            Self::X11(x) => x.capture(),
        }
    }
}
