//! Touch controller drivers
//!
//! Provides the FT6336 capacitive touch driver. Drivers report only
//! touch-down events, already remapped to the active orientation.

pub mod ft6336;

pub use ft6336::{Ft6336, TouchKind, TouchSample, TouchState};

/// Touch position in oriented screen coordinates
///
/// Values are not clamped; a controller reporting beyond the panel edge
/// can produce coordinates outside the screen or below zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TouchPoint {
    pub x: i32,
    pub y: i32,
}

/// Touch controller trait
pub trait TouchController {
    /// Poll the controller once; `Some` only for a new touch-down
    fn poll_event(&mut self) -> Option<TouchPoint>;
}

/// Touch disabled or not detected
impl<T: TouchController> TouchController for Option<T> {
    fn poll_event(&mut self) -> Option<TouchPoint> {
        self.as_mut().and_then(TouchController::poll_event)
    }
}
