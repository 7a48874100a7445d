//! ST7796 LCD Controller Driver
//!
//! Driver for the ST7796S TFT controller found on 3.5" 320×480 SPI
//! panels. Commands are sent with DC low, parameters and pixel data with
//! DC high; chip select is handled by the `SpiDevice`.

use alloc::vec::Vec;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{Error as _, OutputPin};
use embedded_hal::spi::{Error as _, SpiDevice};

use super::{DisplayError, DisplaySink, Framebuffer};
use crate::diff::DirtyRect;
use crate::orientation::Orientation;

/// ST7796 commands
#[allow(dead_code)]
pub mod cmd {
    pub const NOP: u8 = 0x00;
    pub const SWRESET: u8 = 0x01;
    pub const SLPOUT: u8 = 0x11;
    pub const DISPOFF: u8 = 0x28;
    pub const DISPON: u8 = 0x29;
    pub const CASET: u8 = 0x2A; // Column address set
    pub const RASET: u8 = 0x2B; // Row address set
    pub const RAMWR: u8 = 0x2C; // Memory write
    pub const MADCTL: u8 = 0x36; // Memory access control
    pub const COLMOD: u8 = 0x3A; // Pixel format
    pub const DIC: u8 = 0xB4; // Display inversion control
    pub const DFC: u8 = 0xB6; // Display function control
    pub const PWR2: u8 = 0xC1;
    pub const PWR3: u8 = 0xC2;
    pub const VCMPCTL: u8 = 0xC5; // VCOM control
    pub const DOCA: u8 = 0xE8; // Display output ctrl adjust
    pub const CSCON: u8 = 0xF0; // Command set control
}

/// One register write of the power-on sequence
struct InitStep {
    cmd: u8,
    params: &'static [u8],
    delay_ms: u32,
}

const fn step(cmd: u8, params: &'static [u8], delay_ms: u32) -> InitStep {
    InitStep {
        cmd,
        params,
        delay_ms,
    }
}

/// Runs before MADCTL: soft reset and unlock of command set 2
const INIT_UNLOCK: &[InitStep] = &[
    step(cmd::SWRESET, &[], 150),
    step(cmd::CSCON, &[0xC3], 0),
    step(cmd::CSCON, &[0x96], 0),
];

/// Runs after MADCTL: RGB565, panel driving, power and gamma, wake up
const INIT_PANEL: &[InitStep] = &[
    step(cmd::COLMOD, &[0x55], 0),
    step(cmd::DIC, &[0x01], 0),
    step(cmd::DFC, &[0x80, 0x02, 0x3B], 0),
    step(cmd::DOCA, &[0x40, 0x8A, 0x00, 0x00, 0x29, 0x19, 0xA5, 0x33], 0),
    step(cmd::PWR2, &[0x06], 0),
    step(cmd::PWR3, &[0xA7], 0),
    step(cmd::VCMPCTL, &[0x18], 0),
    step(cmd::SLPOUT, &[], 150),
    step(cmd::DISPON, &[], 50),
];

/// Hardware reset pulse width and recovery time
const RESET_DELAY_MS: u32 = 120;

/// ST7796 driver
pub struct St7796<SPI, DC> {
    spi: SPI,
    dc: DC,
    orientation: Orientation,
    width: u16,
    height: u16,
    /// Staging buffer for one row of wire bytes
    row: Vec<u8>,
}

impl<SPI, DC> St7796<SPI, DC>
where
    SPI: SpiDevice,
    DC: OutputPin,
{
    /// Create a new driver; the panel is untouched until `init`
    pub fn new(spi: SPI, dc: DC, orientation: Orientation) -> Self {
        let (width, height) = orientation.dimensions();
        Self {
            spi,
            dc,
            orientation,
            width,
            height,
            row: Vec::with_capacity(usize::from(width) * 2),
        }
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Give the bus and DC pin back
    pub fn release(self) -> (SPI, DC) {
        (self.spi, self.dc)
    }

    /// Hardware reset followed by the register initialization sequence
    pub fn init<RST, D>(&mut self, rst: &mut RST, delay: &mut D) -> Result<(), DisplayError>
    where
        RST: OutputPin,
        D: DelayNs,
    {
        rst.set_low().map_err(|e| DisplayError::Pin(e.kind()))?;
        delay.delay_ms(RESET_DELAY_MS);
        rst.set_high().map_err(|e| DisplayError::Pin(e.kind()))?;
        delay.delay_ms(RESET_DELAY_MS);

        self.run_steps(INIT_UNLOCK, delay)?;
        self.command(cmd::MADCTL, &[self.orientation.spec().madctl])?;
        self.run_steps(INIT_PANEL, delay)?;

        log::debug!(
            "ST7796 initialized, {} ({}x{})",
            self.orientation,
            self.width,
            self.height
        );
        Ok(())
    }

    fn run_steps<D: DelayNs>(&mut self, steps: &[InitStep], delay: &mut D) -> Result<(), DisplayError> {
        for s in steps {
            self.command(s.cmd, s.params)?;
            if s.delay_ms > 0 {
                delay.delay_ms(s.delay_ms);
            }
        }
        Ok(())
    }

    /// Send a command byte followed by its parameters
    pub fn command(&mut self, cmd: u8, params: &[u8]) -> Result<(), DisplayError> {
        self.dc.set_low().map_err(|e| DisplayError::Pin(e.kind()))?;
        self.spi.write(&[cmd]).map_err(|e| DisplayError::Spi(e.kind()))?;
        if !params.is_empty() {
            self.write_data(params)?;
        }
        Ok(())
    }

    fn write_data(&mut self, data: &[u8]) -> Result<(), DisplayError> {
        self.dc.set_high().map_err(|e| DisplayError::Pin(e.kind()))?;
        self.spi.write(data).map_err(|e| DisplayError::Spi(e.kind()))
    }

    /// Set the drawing window (inclusive) and enter memory write
    pub fn set_window(&mut self, x0: u16, y0: u16, x1: u16, y1: u16) -> Result<(), DisplayError> {
        if x0 > x1 || y0 > y1 || x1 >= self.width || y1 >= self.height {
            return Err(DisplayError::Window);
        }
        let [x0_hi, x0_lo] = x0.to_be_bytes();
        let [x1_hi, x1_lo] = x1.to_be_bytes();
        let [y0_hi, y0_lo] = y0.to_be_bytes();
        let [y1_hi, y1_lo] = y1.to_be_bytes();
        self.command(cmd::CASET, &[x0_hi, x0_lo, x1_hi, x1_lo])?;
        self.command(cmd::RASET, &[y0_hi, y0_lo, y1_hi, y1_lo])?;
        self.command(cmd::RAMWR, &[])
    }

    /// Address `rect` and stream its rows from `frame`
    ///
    /// Every pixel inside the rectangle is sent, changed or not.
    pub fn write_rect(&mut self, rect: &DirtyRect, frame: &Framebuffer) -> Result<(), DisplayError> {
        if frame.width() != self.width || frame.height() != self.height {
            return Err(DisplayError::Window);
        }
        self.set_window(rect.x_min, rect.y_min, rect.x_max, rect.y_max)?;
        self.dc.set_high().map_err(|e| DisplayError::Pin(e.kind()))?;

        for y in rect.y_min..=rect.y_max {
            let span = frame
                .row_span(y, rect.x_min, rect.x_max)
                .ok_or(DisplayError::Window)?;
            self.row.clear();
            for pixel in span {
                self.row.extend_from_slice(&pixel.wire_bytes());
            }
            self.spi
                .write(&self.row)
                .map_err(|e| DisplayError::Spi(e.kind()))?;
        }
        Ok(())
    }
}

impl<SPI, DC> DisplaySink for St7796<SPI, DC>
where
    SPI: SpiDevice,
    DC: OutputPin,
{
    type Error = DisplayError;

    fn present(&mut self, rect: Option<DirtyRect>, frame: &Framebuffer) -> Result<(), Self::Error> {
        match rect {
            Some(rect) => self.write_rect(&rect, frame),
            None => Ok(()),
        }
    }
}
