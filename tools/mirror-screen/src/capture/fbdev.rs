//! Linux framebuffer capture
//!
//! Reads the geometry of `/dev/fbN` from sysfs once, then copies the whole
//! device into an owned buffer on every capture.

use spi_mirror::{FrameSource, SourceFrame};
use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use super::CaptureError;

const SYSFS_GRAPHICS: &str = "/sys/class/graphics";
const DEV_ROOT: &str = "/dev";

/// Framebuffer geometry as reported by sysfs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FbGeometry {
    pub width: u32,
    pub height: u32,
    /// Bytes per row
    pub stride: usize,
}

impl FbGeometry {
    /// Read `virtual_size`, `bits_per_pixel` and `stride` of `name`
    pub fn read(sysfs_root: &Path, name: &str) -> Result<Self, CaptureError> {
        let dir = sysfs_root.join(name);

        let size_path = dir.join("virtual_size");
        let size = read_attribute(&size_path)?;
        let (width, height) = parse_virtual_size(&size).ok_or_else(|| CaptureError::Attribute {
            path: size_path.clone(),
            value: size.clone(),
        })?;

        let bits = parse_attribute::<u32>(&dir.join("bits_per_pixel"))?;
        if bits != 32 {
            return Err(CaptureError::Depth { bits });
        }

        let stride = parse_attribute::<usize>(&dir.join("stride"))?;
        Ok(Self {
            width,
            height,
            stride,
        })
    }

    /// Bytes needed to hold one frame
    pub fn frame_len(&self) -> usize {
        self.stride * self.height as usize
    }
}

fn read_attribute(path: &Path) -> Result<String, CaptureError> {
    fs::read_to_string(path).map_err(|source| CaptureError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_attribute<T: std::str::FromStr>(path: &Path) -> Result<T, CaptureError> {
    let value = read_attribute(path)?;
    value.trim().parse().map_err(|_| CaptureError::Attribute {
        path: path.to_path_buf(),
        value,
    })
}

/// Parse sysfs `virtual_size` ("1920,1080")
pub fn parse_virtual_size(input: &str) -> Option<(u32, u32)> {
    let (w, h) = input.trim().split_once(',')?;
    Some((w.trim().parse().ok()?, h.trim().parse().ok()?))
}

/// Frame source backed by a Linux framebuffer device
pub struct FbdevCapture {
    path: PathBuf,
    device: File,
    geometry: FbGeometry,
    buffer: Vec<u8>,
}

impl FbdevCapture {
    /// Open `/dev/<name>` using the geometry from `/sys/class/graphics/<name>`
    pub fn open(name: &str) -> Result<Self, CaptureError> {
        Self::open_at(Path::new(SYSFS_GRAPHICS), Path::new(DEV_ROOT), name)
    }

    pub fn open_at(sysfs_root: &Path, dev_root: &Path, name: &str) -> Result<Self, CaptureError> {
        let geometry = FbGeometry::read(sysfs_root, name)?;
        let buffer = vec![0u8; geometry.frame_len()];
        // Reject geometry the converter cannot sample before touching the device
        SourceFrame::new(&buffer, geometry.width, geometry.height, geometry.stride)?;

        let path = dev_root.join(name);
        let device = File::open(&path).map_err(|source| CaptureError::Io {
            path: path.clone(),
            source,
        })?;

        log::info!(
            "capturing {} ({}x{}, stride {})",
            path.display(),
            geometry.width,
            geometry.height,
            geometry.stride
        );

        Ok(Self {
            path,
            device,
            geometry,
            buffer,
        })
    }

    pub fn geometry(&self) -> FbGeometry {
        self.geometry
    }

    fn read_frame(&mut self) -> io::Result<()> {
        self.device.seek(SeekFrom::Start(0))?;
        self.device.read_exact(&mut self.buffer)
    }
}

impl FrameSource for FbdevCapture {
    type Error = CaptureError;

    fn capture(&mut self) -> Result<SourceFrame<'_>, Self::Error> {
        self.read_frame().map_err(|source| CaptureError::Io {
            path: self.path.clone(),
            source,
        })?;
        let g = self.geometry;
        Ok(SourceFrame::new(&self.buffer, g.width, g.height, g.stride)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spi_mirror::{convert, FrameError, Pixel};
    use tempfile::tempdir;

    /// Lay out a fake sysfs entry and device node
    fn fake_fb(root: &Path, size: &str, bpp: &str, stride: &str, data: &[u8]) {
        let sys = root.join("sys").join("fb1");
        fs::create_dir_all(&sys).unwrap();
        fs::write(sys.join("virtual_size"), size).unwrap();
        fs::write(sys.join("bits_per_pixel"), bpp).unwrap();
        fs::write(sys.join("stride"), stride).unwrap();
        fs::create_dir_all(root.join("dev")).unwrap();
        fs::write(root.join("dev").join("fb1"), data).unwrap();
    }

    #[test]
    fn test_parse_virtual_size() {
        assert_eq!(parse_virtual_size("1920,1080\n"), Some((1920, 1080)));
        assert_eq!(parse_virtual_size("640, 480"), Some((640, 480)));
        assert_eq!(parse_virtual_size("640x480"), None);
    }

    #[test]
    fn test_capture_reads_device() {
        let dir = tempdir().unwrap();
        // 2x2 at 12 bytes per row; bottom-right pixel is red
        let mut data = vec![0u8; 24];
        data[16..20].copy_from_slice(&[0x00, 0x00, 0xFF, 0x00]);
        fake_fb(dir.path(), "2,2\n", "32\n", "12\n", &data);

        let mut cap = FbdevCapture::open_at(&dir.path().join("sys"), &dir.path().join("dev"), "fb1").unwrap();
        assert_eq!(
            cap.geometry(),
            FbGeometry {
                width: 2,
                height: 2,
                stride: 12
            }
        );

        let frame = cap.capture().unwrap();
        assert_eq!(convert(&frame, 2, 2, 1, 1), Pixel::RED);
        assert_eq!(convert(&frame, 2, 2, 0, 0), Pixel::BLACK);
    }

    #[test]
    fn test_rejects_16bpp() {
        let dir = tempdir().unwrap();
        fake_fb(dir.path(), "2,2", "16", "4", &[0u8; 8]);
        let err = FbdevCapture::open_at(&dir.path().join("sys"), &dir.path().join("dev"), "fb1")
            .err()
            .unwrap();
        assert!(matches!(err, CaptureError::Depth { bits: 16 }));
    }

    #[test]
    fn test_rejects_short_stride() {
        let dir = tempdir().unwrap();
        fake_fb(dir.path(), "4,1", "32", "8", &[0u8; 8]);
        let err = FbdevCapture::open_at(&dir.path().join("sys"), &dir.path().join("dev"), "fb1")
            .err()
            .unwrap();
        assert!(matches!(err, CaptureError::Geometry(FrameError::StrideTooSmall { .. })));
    }

    #[test]
    fn test_truncated_device_is_capture_error() {
        let dir = tempdir().unwrap();
        fake_fb(dir.path(), "2,2", "32", "8", &[0u8; 10]);
        let mut cap = FbdevCapture::open_at(&dir.path().join("sys"), &dir.path().join("dev"), "fb1").unwrap();
        assert!(matches!(cap.capture(), Err(CaptureError::Io { .. })));
    }

    #[test]
    fn test_missing_sysfs_entry() {
        let dir = tempdir().unwrap();
        let err = FbdevCapture::open_at(dir.path(), dir.path(), "fb9").err().unwrap();
        assert!(err.to_string().contains("virtual_size"));
    }
}
