//! Panel orientation table
//!
//! The ST7796 is a 320×480 portrait panel. Each supported rotation fixes
//! the destination resolution, the MADCTL byte written at init, and the
//! transform from raw touch-sensor coordinates to panel coordinates.

use core::fmt;
use core::str::FromStr;

use crate::touch::TouchPoint;

/// Native short edge of the panel in pixels
pub const PANEL_SHORT: u16 = 320;
/// Native long edge of the panel in pixels
pub const PANEL_LONG: u16 = 480;

/// Panel rotation, selected once at startup
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum Orientation {
    /// 320×480, connector at the bottom
    Portrait = 0,
    /// 480×320
    #[default]
    Landscape = 1,
    /// 320×480, rotated 180°
    PortraitInverted = 2,
    /// 480×320, rotated 180°
    LandscapeInverted = 3,
}

/// Fixed properties of one orientation
#[derive(Clone, Copy)]
pub struct OrientationSpec {
    /// Destination width in pixels
    pub width: u16,
    /// Destination height in pixels
    pub height: u16,
    /// ST7796 memory access control value (rotation + BGR order)
    pub madctl: u8,
    /// Raw sensor (x, y) to destination (x, y)
    pub remap: fn(u16, u16) -> (i32, i32),
}

fn remap_portrait(x: u16, y: u16) -> (i32, i32) {
    (i32::from(x), i32::from(y))
}

fn remap_landscape(x: u16, y: u16) -> (i32, i32) {
    (i32::from(y), i32::from(PANEL_SHORT) - i32::from(x))
}

fn remap_portrait_inverted(x: u16, y: u16) -> (i32, i32) {
    (
        i32::from(PANEL_SHORT) - i32::from(x),
        i32::from(PANEL_LONG) - i32::from(y),
    )
}

fn remap_landscape_inverted(x: u16, y: u16) -> (i32, i32) {
    (i32::from(PANEL_LONG) - i32::from(y), i32::from(x))
}

/// Lookup table indexed by `Orientation as usize`
pub static ORIENTATIONS: [OrientationSpec; 4] = [
    OrientationSpec {
        width: PANEL_SHORT,
        height: PANEL_LONG,
        madctl: 0x48,
        remap: remap_portrait,
    },
    OrientationSpec {
        width: PANEL_LONG,
        height: PANEL_SHORT,
        madctl: 0x28,
        remap: remap_landscape,
    },
    OrientationSpec {
        width: PANEL_SHORT,
        height: PANEL_LONG,
        madctl: 0x88,
        remap: remap_portrait_inverted,
    },
    OrientationSpec {
        width: PANEL_LONG,
        height: PANEL_SHORT,
        madctl: 0xE8,
        remap: remap_landscape_inverted,
    },
];

impl Orientation {
    /// All orientations in index order
    pub const ALL: [Self; 4] = [
        Self::Portrait,
        Self::Landscape,
        Self::PortraitInverted,
        Self::LandscapeInverted,
    ];

    /// Table entry for this orientation
    pub fn spec(self) -> &'static OrientationSpec {
        &ORIENTATIONS[self as usize]
    }

    /// Numeric index (0-3)
    pub const fn index(self) -> u8 {
        self as u8
    }

    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(usize::from(index)).copied()
    }

    /// Destination (width, height)
    pub fn dimensions(self) -> (u16, u16) {
        let spec = self.spec();
        (spec.width, spec.height)
    }

    /// Translate raw touch-sensor coordinates into destination coordinates
    ///
    /// No clamping: readings beyond the panel edge map beyond the
    /// destination bounds.
    pub fn remap(self, raw_x: u16, raw_y: u16) -> TouchPoint {
        let (x, y) = (self.spec().remap)(raw_x, raw_y);
        TouchPoint { x, y }
    }

    /// Config/CLI name
    pub const fn name(self) -> &'static str {
        match self {
            Self::Portrait => "portrait",
            Self::Landscape => "landscape",
            Self::PortraitInverted => "portrait-inverted",
            Self::LandscapeInverted => "landscape-inverted",
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Unknown orientation name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOrientationError;

impl fmt::Display for ParseOrientationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(
            "expected one of: portrait, landscape, portrait-inverted, landscape-inverted, 0-3",
        )
    }
}

impl core::error::Error for ParseOrientationError {}

impl FromStr for Orientation {
    type Err = ParseOrientationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(index) = s.parse::<u8>() {
            return Self::from_index(index).ok_or(ParseOrientationError);
        }
        Self::ALL
            .into_iter()
            .find(|o| o.name().eq_ignore_ascii_case(s))
            .ok_or(ParseOrientationError)
    }
}
