//! Verified screen mirroring for SPI LCD panels with I2C touch
//!
//! This crate contains the host-independent core of the screen mirror:
//! it downsamples captured desktop frames onto a small ST7796 panel,
//! sends only the region that changed, and turns FT6336 touch samples
//! into oriented touch-down events.
//!
//! # Architecture
//!
//! ```text
//!             Mirror (loop controller)
//!     ┌──────────────┼───────────────────┐
//!     ▼              ▼                   ▼
//! ┌─────────┐  ┌────────────┐     ┌─────────────┐
//! │  Touch  │  │ FrameDiff  │     │   Display   │
//! │ (FT6336)│  │ cur / prev │────▶│  (ST7796)   │
//! └────┬────┘  └─────┬──────┘     └──────┬──────┘
//!      │             ▼                   │
//!      │       ┌───────────┐             │
//!      │       │  convert  │             │
//!      │       └───────────┘             │
//!      ▼                                 ▼
//!   I2C bus     Orientation table     SPI bus + DC pin
//! ```
//!
//! Bus access goes through `embedded-hal` 1.0 traits, so the same code
//! drives Linux spidev/i2c-dev on the target and mocks in tests.
//!
//! # Verification
//!
//! The pixel and coordinate arithmetic is written inside `verus!` blocks:
//! - Source sample coordinates always fall inside the source frame
//! - RGB565 packing never loses the channel bit layout
//! - Touch coordinates decode to 12-bit values

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod convert;
pub mod diff;
pub mod display;
pub mod mirror;
pub mod orientation;
pub mod touch;

// Re-export main types
pub use convert::{convert, FrameError, Pixel, SourceFrame};
pub use diff::{DirtyRect, FrameDiff};
pub use display::{DisplayError, DisplaySink, Framebuffer, St7796};
pub use mirror::{FrameSource, Iteration, Mirror, MirrorStats};
pub use orientation::{Orientation, OrientationSpec};
pub use touch::{Ft6336, TouchController, TouchPoint, TouchSample, TouchState};
