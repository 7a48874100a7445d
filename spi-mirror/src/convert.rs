//! Nearest-neighbour downsampling and XRGB8888 → RGB565 conversion
//!
//! A captured host frame is sampled once per destination pixel by integer
//! (floor) scaling, then quantized to 5/6/5 bits and stored byte-swapped
//! so the pixel can be streamed to the panel as-is.

use core::fmt;

use verus_builtin_macros::verus;

verus! {

/// Map a destination coordinate onto the source axis (floor scaling)
pub fn scale_coordinate(dest: u32, src_len: u32, dest_len: u32) -> (result: u32)
    requires
        dest < dest_len,
        src_len > 0,
    ensures
        result < src_len,
{
    ((dest as u64) * (src_len as u64) / (dest_len as u64)) as u32
}

/// Pack 8-bit channels into RGB565 (red: top 5 bits, green: top 6, blue: top 5)
pub fn pack_rgb565(r: u8, g: u8, b: u8) -> (result: u16)
    ensures
        result == (((r & 0xF8) as u16) << 8) | (((g & 0xFC) as u16) << 3) | ((b >> 3) as u16),
{
    (((r & 0xF8) as u16) << 8) | (((g & 0xFC) as u16) << 3) | ((b >> 3) as u16)
}

/// Exchange the high and low byte of a 16-bit word
pub fn swap_bytes(value: u16) -> (result: u16)
    ensures
        result == (value >> 8) | (value << 8),
{
    (value >> 8) | (value << 8)
}

} // verus!

/// One panel pixel: RGB565, stored byte-swapped for the big-endian bus
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(transparent)]
pub struct Pixel(u16);

impl Pixel {
    pub const BLACK: Self = Self(0x0000);
    pub const WHITE: Self = Self(0xFFFF);
    pub const RED: Self = Self(0x00F8);
    pub const GREEN: Self = Self(0xE007);
    pub const BLUE: Self = Self(0x1F00);

    /// Convert 8-bit channels to a wire pixel
    pub fn from_rgb888(r: u8, g: u8, b: u8) -> Self {
        Self(swap_bytes(pack_rgb565(r, g, b)))
    }

    /// Convert one 32-bit sample (byte 0 blue, byte 1 green, byte 2 red)
    pub fn from_xrgb8888(sample: u32) -> Self {
        let [b, g, r, _] = sample.to_le_bytes();
        Self::from_rgb888(r, g, b)
    }

    /// Stored (byte-swapped) value
    pub const fn raw(self) -> u16 {
        self.0
    }

    /// Bytes in transmission order
    pub const fn wire_bytes(self) -> [u8; 2] {
        self.0.to_le_bytes()
    }
}

/// Borrowed view of one captured host frame (32 bits per pixel)
#[derive(Clone, Copy)]
pub struct SourceFrame<'a> {
    data: &'a [u8],
    width: u32,
    height: u32,
    stride: usize,
}

impl<'a> SourceFrame<'a> {
    /// Wrap a capture buffer, checking that every sample is addressable
    pub fn new(data: &'a [u8], width: u32, height: u32, stride: usize) -> Result<Self, FrameError> {
        if width == 0 || height == 0 {
            return Err(FrameError::Empty);
        }
        let row_bytes = width as usize * 4;
        if stride < row_bytes {
            return Err(FrameError::StrideTooSmall {
                stride,
                min: row_bytes,
            });
        }
        let required = stride * (height as usize - 1) + row_bytes;
        if data.len() < required {
            return Err(FrameError::Truncated {
                len: data.len(),
                required,
            });
        }
        Ok(Self {
            data,
            width,
            height,
            stride,
        })
    }

    /// Wrap a buffer with no row padding
    pub fn packed(data: &'a [u8], width: u32, height: u32) -> Result<Self, FrameError> {
        Self::new(data, width, height, width as usize * 4)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Raw 32-bit sample at source coordinates
    pub fn sample(&self, x: u32, y: u32) -> u32 {
        let offset = y as usize * self.stride + x as usize * 4;
        let bytes = &self.data[offset..offset + 4];
        u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
    }
}

/// Convert the source sample under destination pixel `(dest_x, dest_y)`
pub fn convert(frame: &SourceFrame<'_>, dest_width: u16, dest_height: u16, dest_x: u16, dest_y: u16) -> Pixel {
    debug_assert!(dest_x < dest_width && dest_y < dest_height);
    let src_x = scale_coordinate(u32::from(dest_x), frame.width, u32::from(dest_width));
    let src_y = scale_coordinate(u32::from(dest_y), frame.height, u32::from(dest_height));
    Pixel::from_xrgb8888(frame.sample(src_x, src_y))
}

/// Capture buffer geometry errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// Zero width or height
    Empty,
    /// Row stride shorter than one row of pixels
    StrideTooSmall { stride: usize, min: usize },
    /// Buffer shorter than the declared geometry
    Truncated { len: usize, required: usize },
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "source frame has zero width or height"),
            Self::StrideTooSmall { stride, min } => {
                write!(f, "row stride {} is smaller than {} bytes", stride, min)
            }
            Self::Truncated { len, required } => {
                write!(f, "frame buffer holds {} bytes, geometry needs {}", len, required)
            }
        }
    }
}

impl core::error::Error for FrameError {}
