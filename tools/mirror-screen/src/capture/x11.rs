//! X11 root window capture
//!
//! Grabs the whole root window as a ZPixmap. With MIT-SHM the server
//! writes straight into a SysV shared memory segment; without it (remote
//! displays, restricted servers) every frame travels in a `GetImage` reply.

use std::io;
use std::ptr::{self, NonNull};

use spi_mirror::{FrameSource, SourceFrame};
use x11rb::connection::{Connection, RequestConnection};
use x11rb::errors::ReplyOrIdError;
use x11rb::protocol::shm::{self, ConnectionExt as _};
use x11rb::protocol::xproto::{ConnectionExt as _, Format, ImageFormat, ImageOrder, Window};
use x11rb::rust_connection::RustConnection;

use super::CaptureError;

const ALL_PLANES: u32 = !0;

fn x11_error<E: Into<ReplyOrIdError>>(e: E) -> CaptureError {
    CaptureError::X11(e.into())
}

/// Bytes per row of a ZPixmap image `width` pixels wide
pub fn scanline_stride(width: u16, format: &Format) -> usize {
    let pad = usize::from(format.scanline_pad.max(8));
    let bits = usize::from(width) * usize::from(format.bits_per_pixel);
    bits.div_ceil(pad) * pad / 8
}

/// Pixmap format for `depth`; the converter reads 32 bpp LSB-first pixels only
pub fn root_format(formats: &[Format], depth: u8, order: ImageOrder) -> Result<Format, CaptureError> {
    let format = formats
        .iter()
        .find(|f| f.depth == depth)
        .cloned()
        .ok_or(CaptureError::NoFormat(depth))?;
    if format.bits_per_pixel != 32 {
        return Err(CaptureError::Depth {
            bits: u32::from(format.bits_per_pixel),
        });
    }
    if order != ImageOrder::LSB_FIRST {
        return Err(CaptureError::ByteOrder);
    }
    Ok(format)
}

/// Process-side mapping of a SysV segment, detached on drop
struct Mapping {
    addr: NonNull<u8>,
    len: usize,
}

impl Mapping {
    fn as_slice(&self) -> &[u8] {
        // SAFETY: `addr` maps `len` bytes until `self` is dropped
        unsafe { std::slice::from_raw_parts(self.addr.as_ptr(), self.len) }
    }
}

impl Drop for Mapping {
    fn drop(&mut self) {
        // SAFETY: `addr` came from shmat and is detached exactly once
        if unsafe { libc::shmdt(self.addr.as_ptr().cast()) } != 0 {
            log::debug!("shmdt failed: {}", io::Error::last_os_error());
        }
    }
}

/// Segment shared with the X server
struct ShmSegment {
    seg: shm::Seg,
    mapping: Mapping,
}

impl ShmSegment {
    /// `Ok(None)` when the server lacks MIT-SHM
    fn open(conn: &RustConnection, len: usize) -> Result<Option<Self>, CaptureError> {
        if conn
            .extension_information(shm::X11_EXTENSION_NAME)
            .map_err(x11_error)?
            .is_none()
        {
            return Ok(None);
        }

        let shm_error = |source| CaptureError::SharedMemory { len, source };

        // SAFETY: a private segment; no pointers are passed in
        let id = unsafe { libc::shmget(libc::IPC_PRIVATE, len, libc::IPC_CREAT | 0o600) };
        if id < 0 {
            return Err(shm_error(io::Error::last_os_error()));
        }

        // SAFETY: `id` is a segment created above
        let raw = unsafe { libc::shmat(id, ptr::null(), 0) };
        let mapping = match NonNull::new(raw.cast::<u8>()).filter(|_| raw as isize != -1) {
            Some(addr) => Ok(Mapping { addr, len }),
            None => Err(shm_error(io::Error::last_os_error())),
        };

        let attached = mapping.and_then(|mapping| {
            let seg = conn.generate_id().map_err(x11_error)?;
            conn.shm_attach(seg, id as u32, false)
                .map_err(x11_error)?
                .check()
                .map_err(x11_error)?;
            Ok(Self { seg, mapping })
        });

        // Removed once both sides detach
        // SAFETY: IPC_RMID takes no buffer
        unsafe { libc::shmctl(id, libc::IPC_RMID, ptr::null_mut()) };

        attached.map(Some)
    }
}

enum Transfer {
    Shm(ShmSegment),
    GetImage(Vec<u8>),
}

/// Frame source backed by the X11 root window
pub struct X11Capture {
    conn: RustConnection,
    root: Window,
    width: u16,
    height: u16,
    stride: usize,
    transfer: Transfer,
}

impl X11Capture {
    /// Connect to `display` (or `$DISPLAY`) and prepare root window grabs
    pub fn open(display: Option<&str>) -> Result<Self, CaptureError> {
        let (conn, screen_num) = x11rb::connect(display)?;

        let setup = conn.setup();
        let screen = setup
            .roots
            .get(screen_num)
            .ok_or(CaptureError::NoScreen(screen_num))?;
        let format = root_format(&setup.pixmap_formats, screen.root_depth, setup.image_byte_order)?;
        let root = screen.root;
        let (width, height) = (screen.width_in_pixels, screen.height_in_pixels);
        let stride = scanline_stride(width, &format);

        let transfer = match ShmSegment::open(&conn, stride * usize::from(height)) {
            Ok(Some(segment)) => Transfer::Shm(segment),
            Ok(None) => {
                log::warn!("X server has no MIT-SHM, using GetImage");
                Transfer::GetImage(Vec::new())
            }
            Err(e) => {
                log::warn!("MIT-SHM setup failed ({}), using GetImage", e);
                Transfer::GetImage(Vec::new())
            }
        };

        log::info!(
            "capturing X11 screen {} ({}x{}, stride {}, {})",
            screen_num,
            width,
            height,
            stride,
            match transfer {
                Transfer::Shm(_) => "shm",
                Transfer::GetImage(_) => "GetImage",
            }
        );

        Ok(Self {
            conn,
            root,
            width,
            height,
            stride,
            transfer,
        })
    }
}

impl FrameSource for X11Capture {
    type Error = CaptureError;

    fn capture(&mut self) -> Result<SourceFrame<'_>, Self::Error> {
        let (w, h) = (self.width, self.height);
        let data: &[u8] = match &mut self.transfer {
            Transfer::Shm(segment) => {
                self.conn
                    .shm_get_image(
                        self.root,
                        0,
                        0,
                        w,
                        h,
                        ALL_PLANES,
                        u8::from(ImageFormat::Z_PIXMAP),
                        segment.seg,
                        0,
                    )
                    .map_err(x11_error)?
                    .reply()
                    .map_err(x11_error)?;
                segment.mapping.as_slice()
            }
            Transfer::GetImage(buffer) => {
                let reply = self
                    .conn
                    .get_image(ImageFormat::Z_PIXMAP, self.root, 0, 0, w, h, ALL_PLANES)
                    .map_err(x11_error)?
                    .reply()
                    .map_err(x11_error)?;
                *buffer = reply.data;
                buffer.as_slice()
            }
        };
        Ok(SourceFrame::new(data, u32::from(w), u32::from(h), self.stride)?)
    }
}

impl Drop for X11Capture {
    fn drop(&mut self) {
        if let Transfer::Shm(segment) = &self.transfer {
            let detached = self
                .conn
                .shm_detach(segment.seg)
                .map_err(x11_error)
                .and_then(|_| self.conn.flush().map_err(x11_error));
            if let Err(e) = detached {
                log::debug!("shm detach failed: {}", e);
            }
        }
    }
}
