// Licensed under the Apache-2.0 license

//! GPIO pin controller.
//!
//! Owns the GPIO register window and the pin-validity table for the
//! identified board revision. Function selection is a read-modify-write of
//! the pin's 3-bit field; output levels go through the write-only set/clear
//! strobes; pull resistors take the two-phase clocked sequence the chip
//! requires.

use embedded_hal::delay::DelayNs;
use log::debug;

use crate::bcm2835::{
    FSEL_BITS_PER_PIN, FSEL_MASK, FSEL_PINS_PER_WORD, GPCLR0, GPFSEL0, GPIO_BASE, GPIO_LEN,
    GPLEV0, GPPUD, GPPUDCLK0, GPSET0,
};
use crate::delay::Sleep;
use crate::error::{Error, Result};
use crate::mmio::{DevMem, RegisterWindow};
use crate::platform::{BoardRevision, CpuInfo, PlatformInfo};

/// Settle time for each phase of the pull-resistor sequence. The chip wants
/// at least 150 core-clock cycles; one microsecond covers that with margin.
pub const PULL_SETTLE_NS: u32 = 1_000;

/// Pin multiplexer setting, carrying the chip's 3-bit field code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinFunction {
    Input = 0b000,
    Output = 0b001,
    Alt0 = 0b100,
    Alt1 = 0b101,
    Alt2 = 0b110,
    Alt3 = 0b111,
    Alt4 = 0b011,
    Alt5 = 0b010,
}

impl PinFunction {
    /// The 3-bit code packed into the function-select field.
    pub fn code(self) -> u32 {
        self as u32
    }

    /// Decodes a function-select field read back from the register.
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0b000 => Some(PinFunction::Input),
            0b001 => Some(PinFunction::Output),
            0b100 => Some(PinFunction::Alt0),
            0b101 => Some(PinFunction::Alt1),
            0b110 => Some(PinFunction::Alt2),
            0b111 => Some(PinFunction::Alt3),
            0b011 => Some(PinFunction::Alt4),
            0b010 => Some(PinFunction::Alt5),
            _ => None,
        }
    }
}

/// Logic level of a pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

/// Internal pull resistor setting, with the GPPUD control codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullMode {
    Disabled = 0,
    PullDown = 1,
    PullUp = 2,
}

impl PullMode {
    pub fn code(self) -> u32 {
        self as u32
    }
}

/// Handle on the GPIO block.
///
/// `M` is the register window and `D` the time source, both swappable for
/// tests. The controller is unusable until [`setup`](Self::setup) succeeds
/// and again after [`close`](Self::close); operations in between those
/// states report [`Error::NotInitialised`].
#[derive(Debug)]
pub struct GpioController<M = DevMem, D = Sleep> {
    active: Option<Active<M>>,
    delay: D,
}

#[derive(Debug)]
struct Active<M> {
    window: M,
    revision: BoardRevision,
}

impl GpioController {
    /// Maps the GPIO block out of `/dev/mem` and identifies the board.
    pub fn open() -> Result<Self> {
        let mut gpio = GpioController::new(Sleep);
        gpio.setup(DevMem::map(GPIO_BASE, GPIO_LEN)?, &CpuInfo)?;
        Ok(gpio)
    }
}

impl<M: RegisterWindow, D: DelayNs> GpioController<M, D> {
    /// An unopened controller; call [`setup`](Self::setup) before use.
    pub fn new(delay: D) -> Self {
        GpioController {
            active: None,
            delay,
        }
    }

    /// Installs the register window and selects the pin table.
    ///
    /// Fails `AlreadyInitialised` if the controller is already open. If the
    /// platform cannot be identified the window is dropped (and unmapped)
    /// before the error is returned.
    pub fn setup(&mut self, window: M, platform: &impl PlatformInfo) -> Result<()> {
        if self.active.is_some() {
            return Err(Error::AlreadyInitialised);
        }
        let revision = BoardRevision::detect(platform)?;
        debug!("gpio controller open, {revision:?}");
        self.active = Some(Active { window, revision });
        Ok(())
    }

    /// Releases the register window.
    ///
    /// The controller is closed afterwards even if the unmap itself fails.
    pub fn close(&mut self) -> Result<()> {
        let active = self.active.take().ok_or(Error::NotInitialised)?;
        active.window.close()
    }

    /// The board revision identified at setup.
    pub fn revision(&self) -> Result<BoardRevision> {
        Ok(self.active()?.revision)
    }

    /// The BSC0 bus pins `(SDA, SCL)` for this board.
    pub fn i2c_pins(&self) -> Result<(u8, u8)> {
        Ok(self.active()?.revision.i2c_pins())
    }

    /// Multiplexes `pin` to `function`.
    pub fn set_function(&mut self, pin: u8, function: PinFunction) -> Result<()> {
        let active = self.active_pin(pin)?;
        let offset = fsel_offset(pin);
        let shift = fsel_shift(pin);
        let mut word = active.window.read_word(offset);
        word &= !(FSEL_MASK << shift);
        word |= function.code() << shift;
        active.window.write_word(offset, word);
        Ok(())
    }

    /// Drives an output pin high or low through the set/clear strobes.
    pub fn set_pin(&mut self, pin: u8, level: Level) -> Result<()> {
        let active = self.active_pin(pin)?;
        let strobe = match level {
            Level::High => GPSET0,
            Level::Low => GPCLR0,
        };
        active.window.write_word(strobe, 1 << pin);
        Ok(())
    }

    /// Samples the level register for `pin`.
    pub fn read_pin(&mut self, pin: u8) -> Result<Level> {
        let active = self.active_pin(pin)?;
        let levels = active.window.read_word(GPLEV0);
        if levels & (1 << pin) != 0 {
            Ok(Level::High)
        } else {
            Ok(Level::Low)
        }
    }

    /// Latches `mode` into `pin`'s pull resistor.
    ///
    /// Control bits, settle, per-pin clock, settle, then both deasserted.
    /// Skipping either wait leaves the resistor state undefined on real
    /// silicon, so they always run, whatever the time source.
    pub fn set_pull_resistor(&mut self, pin: u8, mode: PullMode) -> Result<()> {
        let GpioController { active, delay } = self;
        let active = active.as_mut().ok_or(Error::NotInitialised)?;
        if !active.revision.is_valid_pin(pin) {
            return Err(Error::InvalidPin);
        }
        active.window.write_word(GPPUD, mode.code());
        delay.delay_ns(PULL_SETTLE_NS);
        active.window.write_word(GPPUDCLK0, 1 << pin);
        delay.delay_ns(PULL_SETTLE_NS);
        active.window.write_word(GPPUD, 0);
        active.window.write_word(GPPUDCLK0, 0);
        Ok(())
    }

    fn active(&self) -> Result<&Active<M>> {
        self.active.as_ref().ok_or(Error::NotInitialised)
    }

    fn active_pin(&mut self, pin: u8) -> Result<&mut Active<M>> {
        let active = self.active.as_mut().ok_or(Error::NotInitialised)?;
        if !active.revision.is_valid_pin(pin) {
            return Err(Error::InvalidPin);
        }
        Ok(active)
    }
}

fn fsel_offset(pin: u8) -> usize {
    GPFSEL0 + (usize::from(pin) / FSEL_PINS_PER_WORD) * core::mem::size_of::<u32>()
}

fn fsel_shift(pin: u8) -> u32 {
    (u32::from(pin) % FSEL_PINS_PER_WORD as u32) * FSEL_BITS_PER_PIN
}
