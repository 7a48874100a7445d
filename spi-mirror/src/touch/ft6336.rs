//! FT6336 Capacitive Touch Controller Driver
//!
//! Polls the FT6336 over I2C, decodes the first touch point and turns it
//! into a single event per contact. Register layout used:
//!
//! | Register | Contents |
//! |----------|----------|
//! | `0x02`   | number of touch points (low nibble) |
//! | `0x03`   | event flag (bits 7:6) and X high nibble |
//! | `0x04`   | X low byte |
//! | `0x05`   | Y high nibble |
//! | `0x06`   | Y low byte |

use embedded_hal::i2c::I2c;
use verus_builtin_macros::verus;

use super::{TouchController, TouchPoint};
use crate::orientation::Orientation;

/// Default 7-bit bus address
pub const DEFAULT_ADDRESS: u8 = 0x38;

/// FT6336 registers
mod reg {
    pub const TD_STATUS: u8 = 0x02;
    pub const P1_XH: u8 = 0x03;
}

verus! {

/// Join a 4-bit high nibble and a low byte into a 12-bit coordinate
pub fn decode_coordinate(high: u8, low: u8) -> (result: u16)
    ensures
        result < 4096,
{
    (((high & 0x0F) as u16) << 8) | (low as u16)
}

/// Event flag held in the top two bits of the first point register
pub fn decode_event(flag: u8) -> (result: u8)
    ensures
        result < 4,
{
    flag >> 6
}

} // verus!

/// Event flag reported for a touch point
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TouchKind {
    Down,
    Up,
    Contact,
    Reserved,
}

impl TouchKind {
    fn from_flag(flag: u8) -> Self {
        match decode_event(flag) {
            0 => Self::Down,
            1 => Self::Up,
            2 => Self::Contact,
            _ => Self::Reserved,
        }
    }
}

/// One decoded controller sample
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TouchSample {
    /// Number of active points (0 when nothing touches the panel)
    pub points: u8,
    /// Event and raw position of the first point, when `points > 0`
    pub first: Option<(TouchKind, u16, u16)>,
}

/// Debounce state
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TouchState {
    #[default]
    Idle,
    Pressed,
}

/// FT6336 driver
pub struct Ft6336<I2C> {
    i2c: I2C,
    address: u8,
    orientation: Orientation,
    state: TouchState,
    bus_errors: u32,
    bus_ok: bool,
}

impl<I2C: I2c> Ft6336<I2C> {
    pub fn new(i2c: I2C, address: u8, orientation: Orientation) -> Self {
        Self {
            i2c,
            address,
            orientation,
            state: TouchState::Idle,
            bus_errors: 0,
            bus_ok: true,
        }
    }

    pub fn state(&self) -> TouchState {
        self.state
    }

    /// Failed bus reads since creation
    pub fn bus_errors(&self) -> u32 {
        self.bus_errors
    }

    pub fn release(self) -> I2C {
        self.i2c
    }

    /// Read and decode the controller registers, without debouncing
    ///
    /// Returns `None` when either read fails.
    pub fn sample(&mut self) -> Option<TouchSample> {
        let mut status = [0u8; 1];
        if let Err(e) = self.i2c.write_read(self.address, &[reg::TD_STATUS], &mut status) {
            self.record_bus_error(&e);
            return None;
        }

        let points = status[0] & 0x0F;
        if points == 0 {
            self.bus_ok = true;
            return Some(TouchSample { points, first: None });
        }

        let mut data = [0u8; 4];
        if let Err(e) = self.i2c.write_read(self.address, &[reg::P1_XH], &mut data) {
            self.record_bus_error(&e);
            return None;
        }
        self.bus_ok = true;

        let kind = TouchKind::from_flag(data[0]);
        let x = decode_coordinate(data[0], data[1]);
        let y = decode_coordinate(data[2], data[3]);
        Some(TouchSample {
            points,
            first: Some((kind, x, y)),
        })
    }

    fn record_bus_error(&mut self, err: &I2C::Error) {
        self.bus_errors = self.bus_errors.saturating_add(1);
        if self.bus_ok {
            log::warn!("touch controller read failed: {:?}", err);
        } else {
            log::debug!("touch controller read failed again: {:?}", err);
        }
        self.bus_ok = false;
    }
}

impl<I2C: I2c> TouchController for Ft6336<I2C> {
    fn poll_event(&mut self) -> Option<TouchPoint> {
        let sample = self.sample()?;
        let Some((kind, raw_x, raw_y)) = sample.first else {
            self.state = TouchState::Idle;
            return None;
        };

        match (self.state, kind) {
            (TouchState::Idle, TouchKind::Down) => {
                self.state = TouchState::Pressed;
                let point = self.orientation.remap(raw_x, raw_y);
                log::debug!("touch down raw ({}, {}) -> ({}, {})", raw_x, raw_y, point.x, point.y);
                Some(point)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::i2c::ErrorKind;
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTransaction};
    use std::vec;
    use std::vec::Vec;

    const ADDR: u8 = DEFAULT_ADDRESS;

    fn status(points: u8) -> I2cTransaction {
        I2cTransaction::write_read(ADDR, vec![0x02], vec![points])
    }

    fn point(flag: u8, x: u16, y: u16) -> I2cTransaction {
        let [xh, xl] = x.to_be_bytes();
        let [yh, yl] = y.to_be_bytes();
        I2cTransaction::write_read(ADDR, vec![0x03], vec![(flag << 6) | xh, xl, yh, yl])
    }

    fn touch(flag: u8, x: u16, y: u16) -> Vec<I2cTransaction> {
        vec![status(1), point(flag, x, y)]
    }

    #[test]
    fn test_register_map() {
        assert_eq!(reg::TD_STATUS, 0x02);
        assert_eq!(reg::P1_XH, 0x03);
    }

    #[test]
    fn test_decode_coordinate() {
        assert_eq!(decode_coordinate(0x81, 0x2C), 0x12C);
        assert_eq!(decode_coordinate(0xFF, 0xFF), 0xFFF);
        assert_eq!(decode_event(0x81), 2);
    }

    #[test]
    fn test_down_contact_release_down_emits_twice() {
        let mut expectations = Vec::new();
        expectations.extend(touch(0, 160, 100)); // Down
        expectations.extend(touch(2, 161, 100)); // Contact
        expectations.extend(touch(2, 162, 101)); // Contact
        expectations.push(status(0));
        expectations.extend(touch(0, 20, 30)); // Down

        let mut i2c = I2cMock::new(&expectations);
        let mut ft = Ft6336::new(i2c.clone(), ADDR, Orientation::Landscape);

        assert_eq!(ft.poll_event(), Some(TouchPoint { x: 100, y: 160 }));
        assert_eq!(ft.state(), TouchState::Pressed);
        assert_eq!(ft.poll_event(), None);
        assert_eq!(ft.poll_event(), None);
        assert_eq!(ft.poll_event(), None);
        assert_eq!(ft.state(), TouchState::Idle);
        assert_eq!(ft.poll_event(), Some(TouchPoint { x: 30, y: 300 }));
        assert_eq!(ft.bus_errors(), 0);

        i2c.done();
    }

    #[test]
    fn test_up_event_is_suppressed() {
        let mut expectations = touch(1, 10, 10);
        expectations.extend(touch(3, 10, 10));
        let mut i2c = I2cMock::new(&expectations);
        let mut ft = Ft6336::new(i2c.clone(), ADDR, Orientation::Portrait);

        assert_eq!(ft.poll_event(), None);
        assert_eq!(ft.poll_event(), None);
        assert_eq!(ft.state(), TouchState::Idle);

        i2c.done();
    }

    #[test]
    fn test_failed_read_keeps_state() {
        let expectations = [
            status(1),
            point(0, 5, 6),
            // Pressed; the status read fails
            I2cTransaction::write_read(ADDR, vec![0x02], vec![0]).with_error(ErrorKind::Other),
            // Pressed; the point read fails
            status(1),
            I2cTransaction::write_read(ADDR, vec![0x03], vec![0, 0, 0, 0]).with_error(ErrorKind::Other),
            // Still pressed, so a Down is not repeated
            status(1),
            point(0, 5, 6),
        ];
        let mut i2c = I2cMock::new(&expectations);
        let mut ft = Ft6336::new(i2c.clone(), ADDR, Orientation::Portrait);

        assert_eq!(ft.poll_event(), Some(TouchPoint { x: 5, y: 6 }));
        assert_eq!(ft.poll_event(), None);
        assert_eq!(ft.state(), TouchState::Pressed);
        assert_eq!(ft.poll_event(), None);
        assert_eq!(ft.state(), TouchState::Pressed);
        assert_eq!(ft.bus_errors(), 2);
        assert_eq!(ft.poll_event(), None);

        i2c.done();
    }

    #[test]
    fn test_failed_read_while_idle_emits_nothing() {
        let expectations = [I2cTransaction::write_read(ADDR, vec![0x02], vec![0]).with_error(ErrorKind::Other)];
        let mut i2c = I2cMock::new(&expectations);
        let mut ft = Ft6336::new(i2c.clone(), ADDR, Orientation::Landscape);

        assert_eq!(ft.poll_event(), None);
        assert_eq!(ft.state(), TouchState::Idle);
        assert_eq!(ft.bus_errors(), 1);

        i2c.done();
    }

    #[test]
    fn test_sample_reports_raw_values() {
        let mut expectations = vec![status(0x12)];
        expectations.push(point(2, 0x345, 0x0AB));
        let mut i2c = I2cMock::new(&expectations);
        let mut ft = Ft6336::new(i2c.clone(), ADDR, Orientation::Landscape);

        // Only the low nibble counts points
        assert_eq!(
            ft.sample(),
            Some(TouchSample {
                points: 2,
                first: Some((TouchKind::Contact, 0x345, 0x0AB)),
            })
        );

        i2c.done();
    }
}
