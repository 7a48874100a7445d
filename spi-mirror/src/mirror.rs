//! Mirror loop controller
//!
//! One iteration polls touch, captures a host frame, diffs it against the
//! panel contents and pushes the dirty rectangle to the display. Capture
//! and transport failures are absorbed so the loop keeps running.

use core::fmt;
use core::sync::atomic::{AtomicBool, Ordering};

use crate::convert::SourceFrame;
use crate::diff::{DirtyRect, FrameDiff};
use crate::display::DisplaySink;
use crate::touch::{TouchController, TouchPoint};

/// Provider of host frames
pub trait FrameSource {
    type Error: fmt::Display;

    /// Grab the current host frame
    fn capture(&mut self) -> Result<SourceFrame<'_>, Self::Error>;
}

/// Outcome of a single `Mirror::step`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Iteration {
    /// Touch-down reported this iteration
    pub touch: Option<TouchPoint>,
    /// Region that changed (transmitted unless the display failed)
    pub dirty: Option<DirtyRect>,
}

/// Running counters
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MirrorStats {
    pub iterations: u64,
    pub frames_presented: u64,
    pub pixels_transmitted: u64,
    pub touch_events: u64,
    pub capture_errors: u64,
    pub transport_errors: u64,
}

impl fmt::Display for MirrorStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} iterations, {} frames ({} px), {} touches, {} capture / {} transport errors",
            self.iterations,
            self.frames_presented,
            self.pixels_transmitted,
            self.touch_events,
            self.capture_errors,
            self.transport_errors
        )
    }
}

/// Screen mirror: owns the frame source, touch controller, display and
/// the diff buffers
pub struct Mirror<S, T, D> {
    source: S,
    touch: T,
    display: D,
    diff: FrameDiff,
    stats: MirrorStats,
    stats_interval: u64,
}

impl<S, T, D> Mirror<S, T, D>
where
    S: FrameSource,
    T: TouchController,
    D: DisplaySink,
{
    /// `diff` must be sized like the display
    pub fn new(source: S, touch: T, display: D, diff: FrameDiff) -> Self {
        Self {
            source,
            touch,
            display,
            diff,
            stats: MirrorStats::default(),
            stats_interval: 0,
        }
    }

    /// Log the counters every `interval` iterations of `run` (0 disables)
    pub fn with_stats_interval(mut self, interval: u64) -> Self {
        self.stats_interval = interval;
        self
    }

    /// Repaint the whole panel on the next iteration
    pub fn invalidate(&mut self) {
        self.diff.invalidate();
    }

    pub fn stats(&self) -> MirrorStats {
        self.stats
    }

    pub fn frame_diff(&self) -> &FrameDiff {
        &self.diff
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn into_parts(self) -> (S, T, D) {
        (self.source, self.touch, self.display)
    }

    /// Run one poll → capture → diff → present cycle
    pub fn step(&mut self) -> Iteration {
        self.stats.iterations += 1;

        let touch = self.touch.poll_event();
        if touch.is_some() {
            self.stats.touch_events += 1;
        }

        let dirty = match self.source.capture() {
            Ok(frame) => self.diff.diff(&frame),
            Err(e) => {
                self.stats.capture_errors += 1;
                log::warn!("capture failed, skipping frame: {}", e);
                return Iteration { touch, dirty: None };
            }
        };

        if let Some(rect) = dirty {
            match self.display.present(Some(rect), self.diff.current()) {
                Ok(()) => {
                    self.stats.frames_presented += 1;
                    self.stats.pixels_transmitted += rect.area() as u64;
                }
                Err(e) => {
                    self.stats.transport_errors += 1;
                    log::warn!("display write failed, full refresh scheduled: {}", e);
                    // Panel contents are unknown after a partial write
                    self.diff.invalidate();
                }
            }
        }

        Iteration { touch, dirty }
    }

    /// Step until `stop` is set, calling `observer` after every iteration
    pub fn run<F>(&mut self, stop: &AtomicBool, mut observer: F) -> MirrorStats
    where
        F: FnMut(&Iteration),
    {
        while !stop.load(Ordering::Relaxed) {
            let iteration = self.step();
            observer(&iteration);

            if self.stats_interval > 0 && self.stats.iterations % self.stats_interval == 0 {
                log::info!("{}", self.stats);
            }
        }
        log::debug!("mirror stopped: {}", self.stats);
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::{DisplayError, Framebuffer};
    use crate::convert::Pixel;
    use std::vec;
    use std::vec::Vec;

    const W: u32 = 8;
    const H: u32 = 4;

    fn solid(rgb: (u8, u8, u8)) -> Vec<u8> {
        let mut data = Vec::new();
        for _ in 0..W * H {
            data.extend_from_slice(&[rgb.2, rgb.1, rgb.0, 0]);
        }
        data
    }

    /// Replays scripted captures, then repeats the last good one
    struct Script {
        frames: Vec<Result<Vec<u8>, &'static str>>,
        last: Vec<u8>,
    }

    impl Script {
        fn new(frames: Vec<Result<Vec<u8>, &'static str>>) -> Self {
            Self {
                frames,
                last: solid((0, 0, 0)),
            }
        }
    }

    impl FrameSource for Script {
        type Error = &'static str;

        fn capture(&mut self) -> Result<SourceFrame<'_>, Self::Error> {
            if !self.frames.is_empty() {
                self.last = self.frames.remove(0)?;
            }
            SourceFrame::packed(&self.last, W, H).map_err(|_| "bad geometry")
        }
    }

    struct Touches(Vec<Option<TouchPoint>>);

    impl TouchController for Touches {
        fn poll_event(&mut self) -> Option<TouchPoint> {
            if self.0.is_empty() {
                None
            } else {
                self.0.remove(0)
            }
        }
    }

    /// Records presented rectangles; fails the first `fail` calls
    #[derive(Default)]
    struct Panel {
        presented: Vec<(DirtyRect, Pixel)>,
        fail: usize,
    }

    impl DisplaySink for Panel {
        type Error = DisplayError;

        fn present(&mut self, rect: Option<DirtyRect>, frame: &Framebuffer) -> Result<(), Self::Error> {
            let Some(rect) = rect else { return Ok(()) };
            if self.fail > 0 {
                self.fail -= 1;
                return Err(DisplayError::Spi(embedded_hal::spi::ErrorKind::Other));
            }
            let corner = frame.get_pixel(rect.x_min, rect.y_min).unwrap_or_default();
            self.presented.push((rect, corner));
            Ok(())
        }
    }

    fn mirror(frames: Vec<Result<Vec<u8>, &'static str>>, panel: Panel) -> Mirror<Script, Touches, Panel> {
        Mirror::new(
            Script::new(frames),
            Touches(Vec::new()),
            panel,
            FrameDiff::with_dimensions(W as u16, H as u16),
        )
    }

    #[test]
    fn test_changed_frame_is_presented_once() {
        let mut m = mirror(vec![Ok(solid((0xFF, 0, 0)))], Panel::default());

        let first = m.step();
        assert_eq!(first.dirty, Some(DirtyRect::full(W as u16, H as u16)));
        let second = m.step();
        assert_eq!(second.dirty, None);

        assert_eq!(m.display().presented, vec![(DirtyRect::full(8, 4), Pixel::RED)]);
        let stats = m.stats();
        assert_eq!(stats.iterations, 2);
        assert_eq!(stats.frames_presented, 1);
        assert_eq!(stats.pixels_transmitted, 32);
    }

    #[test]
    fn test_invalidate_repaints_unchanged_frame() {
        let mut m = mirror(Vec::new(), Panel::default());
        assert_eq!(m.step().dirty, None);

        m.invalidate();
        assert_eq!(m.step().dirty, Some(DirtyRect::full(8, 4)));
        assert_eq!(m.display().presented.len(), 1);
    }

    #[test]
    fn test_capture_error_skips_iteration() {
        let mut m = mirror(vec![Err("gone"), Ok(solid((0, 0, 0xFF)))], Panel::default());

        assert_eq!(m.step(), Iteration::default());
        assert_eq!(m.stats().capture_errors, 1);
        assert!(m.step().dirty.is_some());
        assert_eq!(m.display().presented[0].1, Pixel::BLUE);
    }

    #[test]
    fn test_transport_error_forces_full_refresh() {
        let mut data = solid((0, 0, 0));
        data[0..4].copy_from_slice(&[0xFF, 0xFF, 0xFF, 0]);
        let panel = Panel {
            fail: 1,
            ..Panel::default()
        };
        let mut m = mirror(vec![Ok(data)], panel);

        assert_eq!(m.step().dirty, Some(DirtyRect::point(0, 0)));
        assert_eq!(m.stats().transport_errors, 1);
        assert!(m.frame_diff().is_invalidated());

        // Same frame again: the whole panel is resent
        assert_eq!(m.step().dirty, Some(DirtyRect::full(8, 4)));
        assert_eq!(m.display().presented, vec![(DirtyRect::full(8, 4), Pixel::WHITE)]);
    }

    #[test]
    fn test_touch_is_reported_before_capture() {
        let point = TouchPoint { x: 1, y: 2 };
        let mut m = Mirror::new(
            Script::new(vec![Err("gone")]),
            Touches(vec![Some(point)]),
            Panel::default(),
            FrameDiff::with_dimensions(W as u16, H as u16),
        );

        // Touch still surfaces when the capture fails
        assert_eq!(m.step().touch, Some(point));
        assert_eq!(m.stats().touch_events, 1);
    }

    #[test]
    fn test_run_stops_on_flag() {
        let stop = AtomicBool::new(false);
        let mut m = mirror(vec![Ok(solid((0, 0xFF, 0)))], Panel::default()).with_stats_interval(2);

        let mut seen = 0;
        let stats = m.run(&stop, |_| {
            seen += 1;
            if seen == 3 {
                stop.store(true, Ordering::Relaxed);
            }
        });
        assert_eq!(seen, 3);
        assert_eq!(stats.iterations, 3);
        assert_eq!(stats.frames_presented, 1);
    }

    #[test]
    fn test_run_with_flag_set_does_nothing() {
        let stop = AtomicBool::new(true);
        let mut m = mirror(vec![Ok(solid((0xFF, 0xFF, 0xFF)))], Panel::default());
        assert_eq!(m.run(&stop, |_| panic!("no iteration expected")), MirrorStats::default());
    }
}
