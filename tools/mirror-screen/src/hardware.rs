//! Bus and GPIO handles for the panel and touch controller
//!
//! Everything is opened up front so any wiring problem is reported before
//! the mirror loop starts. `Session` keeps the reset and backlight lines
//! and switches the backlight off when it is dropped.

use anyhow::{anyhow, Context, Result};
use embedded_hal::digital::{Error as _, OutputPin};
use linux_embedded_hal::gpio_cdev::{Chip, LineRequestFlags};
use linux_embedded_hal::spidev::{SpiModeFlags, SpidevOptions};
use linux_embedded_hal::{CdevPin, Delay, I2cdev, SpidevDevice};
use spi_mirror::{Ft6336, Orientation, St7796};

use crate::config::Config;

const CONSUMER_DC: &str = "mirror-screen-dc";
const CONSUMER_RST: &str = "mirror-screen-rst";
const CONSUMER_BL: &str = "mirror-screen-bl";

pub type Panel = St7796<SpidevDevice, CdevPin>;
pub type Touch = Ft6336<I2cdev>;

/// Reset and backlight lines, held for the lifetime of the mirror
pub struct Session {
    rst: CdevPin,
    backlight: CdevPin,
}

impl Session {
    pub fn backlight_on(&mut self) -> Result<()> {
        self.backlight
            .set_high()
            .map_err(|e| anyhow!("backlight on failed: {}", e.kind()))
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        match self.backlight.set_low() {
            Ok(()) => log::debug!("backlight off"),
            Err(e) => log::warn!("backlight off failed: {}", e.kind()),
        }
    }
}

/// Opened hardware, ready to be handed to the mirror loop
pub struct Hardware {
    pub panel: Panel,
    pub touch: Option<Touch>,
    pub session: Session,
}

fn output_line(chip: &mut Chip, offset: u32, initial: u8, consumer: &str) -> Result<CdevPin> {
    let line = chip
        .get_line(offset)
        .with_context(|| format!("getting GPIO line {}", offset))?;
    let handle = line
        .request(LineRequestFlags::OUTPUT, initial, consumer)
        .with_context(|| format!("requesting GPIO line {} as {}", offset, consumer))?;
    CdevPin::new(handle).with_context(|| format!("creating pin for GPIO {}", offset))
}

impl Hardware {
    /// Open SPI, GPIO and (optionally) I2C without touching the panel
    pub fn open(config: &Config, orientation: Orientation, with_touch: bool) -> Result<Self> {
        let display = &config.display;

        let mut spi = SpidevDevice::open(&display.spi_device)
            .with_context(|| format!("opening SPI device {}", display.spi_device.display()))?;
        let options = SpidevOptions::new()
            .bits_per_word(8)
            .max_speed_hz(display.spi_speed_hz)
            .mode(SpiModeFlags::SPI_MODE_0)
            .build();
        spi.configure(&options).context("configuring SPI")?;

        let mut chip = Chip::new(&display.gpio_chip)
            .with_context(|| format!("opening GPIO chip {}", display.gpio_chip.display()))?;
        let dc = output_line(&mut chip, display.dc_pin, 0, CONSUMER_DC)?;
        let rst = output_line(&mut chip, display.rst_pin, 1, CONSUMER_RST)?;
        let backlight = output_line(&mut chip, display.backlight_pin, 0, CONSUMER_BL)?;

        let touch = if with_touch {
            let i2c = I2cdev::new(&config.touch.i2c_device)
                .with_context(|| format!("opening I2C device {}", config.touch.i2c_device.display()))?;
            log::info!(
                "touch controller at {:#04x} on {}",
                config.touch.address,
                config.touch.i2c_device.display()
            );
            Some(Ft6336::new(i2c, config.touch.address, orientation))
        } else {
            log::info!("touch disabled");
            None
        };

        log::info!(
            "panel on {} at {} Hz (DC {}, RST {}, BL {})",
            display.spi_device.display(),
            display.spi_speed_hz,
            display.dc_pin,
            display.rst_pin,
            display.backlight_pin
        );

        Ok(Self {
            panel: St7796::new(spi, dc, orientation),
            touch,
            session: Session { rst, backlight },
        })
    }

    /// Reset and initialize the panel, then light it
    pub fn init_panel(&mut self) -> Result<()> {
        self.panel
            .init(&mut self.session.rst, &mut Delay)
            .context("initializing ST7796")?;
        self.session.backlight_on()
    }
}
