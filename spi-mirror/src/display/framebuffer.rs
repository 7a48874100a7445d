//! RGB565 Framebuffer with bounds-checked access
//!
//! Row-major grid of wire pixels sized for the active orientation.

use alloc::vec;
use alloc::vec::Vec;

use crate::convert::Pixel;

/// Destination-sized pixel grid
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Framebuffer {
    width: u16,
    height: u16,
    buffer: Vec<Pixel>,
}

impl Framebuffer {
    /// Create a new framebuffer initialized to black
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            buffer: vec![Pixel::BLACK; usize::from(width) * usize::from(height)],
        }
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    #[inline]
    fn index(&self, x: u16, y: u16) -> usize {
        usize::from(y) * usize::from(self.width) + usize::from(x)
    }

    /// Get pixel at coordinates
    pub fn get_pixel(&self, x: u16, y: u16) -> Option<Pixel> {
        if x < self.width && y < self.height {
            Some(self.buffer[self.index(x, y)])
        } else {
            None
        }
    }

    /// Set pixel at coordinates (bounds-checked)
    pub fn set_pixel(&mut self, x: u16, y: u16, pixel: Pixel) -> bool {
        if x < self.width && y < self.height {
            let idx = self.index(x, y);
            self.buffer[idx] = pixel;
            true
        } else {
            false
        }
    }

    /// Contiguous run `[y, x0..=x1]`, or `None` when out of bounds
    pub fn row_span(&self, y: u16, x0: u16, x1: u16) -> Option<&[Pixel]> {
        if y >= self.height || x0 > x1 || x1 >= self.width {
            return None;
        }
        let start = self.index(x0, y);
        let end = self.index(x1, y) + 1;
        Some(&self.buffer[start..end])
    }

    /// Overwrite every pixel with `other`'s (same dimensions)
    pub fn copy_from(&mut self, other: &Framebuffer) {
        debug_assert_eq!((self.width, self.height), (other.width, other.height));
        self.buffer.copy_from_slice(&other.buffer);
    }

    /// Clear framebuffer to a solid color
    pub fn clear(&mut self, pixel: Pixel) {
        self.buffer.fill(pixel);
    }

    pub fn as_slice(&self) -> &[Pixel] {
        &self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds() {
        let mut fb = Framebuffer::new(4, 3);
        let white = Pixel::from_rgb888(0xFF, 0xFF, 0xFF);
        assert!(fb.set_pixel(3, 2, white));
        assert!(!fb.set_pixel(4, 0, white));
        assert!(!fb.set_pixel(0, 3, white));
        assert_eq!(fb.get_pixel(3, 2), Some(white));
        assert_eq!(fb.get_pixel(0, 0), Some(Pixel::BLACK));
        assert_eq!(fb.get_pixel(4, 2), None);
        assert_eq!(fb.as_slice().len(), 12);
    }

    #[test]
    fn test_row_span() {
        let mut fb = Framebuffer::new(4, 3);
        let red = Pixel::from_rgb888(0xFF, 0, 0);
        fb.set_pixel(1, 1, red);
        fb.set_pixel(2, 1, red);

        let span = fb.row_span(1, 1, 2).unwrap();
        assert_eq!(span, &[red, red]);
        assert_eq!(fb.row_span(1, 0, 3).unwrap().len(), 4);
        assert!(fb.row_span(1, 2, 1).is_none());
        assert!(fb.row_span(1, 0, 4).is_none());
        assert!(fb.row_span(3, 0, 0).is_none());
    }

    #[test]
    fn test_copy_and_clear() {
        let mut a = Framebuffer::new(2, 2);
        let mut b = Framebuffer::new(2, 2);
        a.clear(Pixel::from_rgb888(0, 0xFF, 0));
        assert_ne!(a, b);
        b.copy_from(&a);
        assert_eq!(a, b);
    }
}
