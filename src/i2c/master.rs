// Licensed under the Apache-2.0 license

//! Polled BSC0 master.
//!
//! One transfer at a time: program the length, fire the start bit and chase
//! the FIFO until the controller raises done. Failures are read out of the
//! latched status bits and cleared back with write-one-to-clear stores so
//! the next transfer starts from a clean slate.

use embedded_hal::delay::DelayNs;
use fugit::HertzU32;
use log::debug;

use crate::bcm2835::{
    BSC0_BASE, BSC0_LEN, BSC_A, BSC_C, BSC_C_CLEAR, BSC_C_I2CEN, BSC_C_READ, BSC_C_ST, BSC_DIV,
    BSC_DLEN, BSC_FIFO, BSC_S, BSC_S_CLKT, BSC_S_DONE, BSC_S_ERR, BSC_S_RXD, BSC_S_TXD,
};
use crate::delay::Sleep;
use crate::error::{Error, Result};
use crate::gpio::{GpioController, PinFunction, PullMode};
use crate::i2c::timing::BusTiming;
use crate::mmio::{DevMem, RegisterWindow};

/// Handle on the BSC0 controller, driven in polled master mode.
///
/// Setup borrows the GPIO controller to route the bus pins to their
/// alternate function; the pins are handed back to input on
/// [`cleanup`](Self::cleanup). Like [`GpioController`], every operation
/// between `new` and `setup`, or after `cleanup`, reports
/// [`Error::NotInitialised`].
#[derive(Debug)]
pub struct I2cMaster<M = DevMem, D = Sleep> {
    active: Option<Active<M>>,
    delay: D,
    timing: BusTiming,
}

#[derive(Debug)]
struct Active<M> {
    window: M,
    pins: (u8, u8),
}

impl I2cMaster {
    /// Maps the BSC0 block out of `/dev/mem` and claims the bus pins.
    pub fn open(gpio: &mut GpioController) -> Result<Self> {
        let mut master = I2cMaster::new(Sleep);
        master.setup(DevMem::map(BSC0_BASE, BSC0_LEN)?, gpio)?;
        Ok(master)
    }
}

impl<M: RegisterWindow, D: DelayNs> I2cMaster<M, D> {
    /// An unopened master; call [`setup`](Self::setup) before use.
    pub fn new(delay: D) -> Self {
        I2cMaster {
            active: None,
            delay,
            timing: BusTiming::default(),
        }
    }

    /// Routes the bus pins and brings the controller up at the current
    /// clock (100 kHz on a fresh master).
    ///
    /// Pull resistors come off SDA and SCL before the pins switch to their
    /// alternate function; the board carries fixed external pull-ups. If
    /// any pin operation fails the window is dropped and the master stays
    /// unopened.
    pub fn setup<G, GD>(&mut self, mut window: M, gpio: &mut GpioController<G, GD>) -> Result<()>
    where
        G: RegisterWindow,
        GD: DelayNs,
    {
        if self.active.is_some() {
            return Err(Error::AlreadyInitialised);
        }
        let pins = gpio.i2c_pins()?;
        let (sda, scl) = pins;
        for pin in [sda, scl] {
            gpio.set_pull_resistor(pin, PullMode::Disabled)?;
        }
        for pin in [sda, scl] {
            gpio.set_function(pin, PinFunction::Alt0)?;
        }
        window.write_word(BSC_DIV, self.timing.divider());
        window.write_word(BSC_C, BSC_C_I2CEN | BSC_C_CLEAR);
        window.write_word(BSC_S, BSC_S_CLKT | BSC_S_ERR | BSC_S_DONE);
        debug!(
            "i2c master up on pins {pins:?}, divider {}",
            self.timing.divider()
        );
        self.active = Some(Active { window, pins });
        Ok(())
    }

    /// Disables the controller and hands the bus pins back to input.
    ///
    /// The master is closed afterwards even if a step fails; the first
    /// failure is the one reported.
    pub fn cleanup<G, GD>(&mut self, gpio: &mut GpioController<G, GD>) -> Result<()>
    where
        G: RegisterWindow,
        GD: DelayNs,
    {
        let mut active = self.active.take().ok_or(Error::NotInitialised)?;
        let (sda, scl) = active.pins;
        let mut first_error = None;
        for pin in [sda, scl] {
            if let Err(error) = gpio.set_function(pin, PinFunction::Input) {
                if first_error.is_none() {
                    first_error = Some(error);
                }
            }
        }
        active.window.write_word(BSC_C, 0);
        if let Err(error) = active.window.close() {
            if first_error.is_none() {
                first_error = Some(error);
            }
        }
        match first_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// Reprograms the bus clock.
    ///
    /// Rejected frequencies leave the previous clock in force.
    pub fn set_clock(&mut self, frequency: HertzU32) -> Result<()> {
        let active = self.active.as_mut().ok_or(Error::NotInitialised)?;
        let timing = BusTiming::for_frequency(frequency)?;
        active.window.write_word(BSC_DIV, timing.divider());
        self.timing = timing;
        Ok(())
    }

    /// Selects the peripheral subsequent transfers address.
    ///
    /// Addresses are seven bits; the high bit of `address` is ignored.
    pub fn set_slave_address(&mut self, address: u8) -> Result<()> {
        let active = self.active.as_mut().ok_or(Error::NotInitialised)?;
        active
            .window
            .write_word(BSC_A, u32::from(address & 0x7F));
        Ok(())
    }

    /// Writes `data` to the addressed peripheral.
    ///
    /// An empty `data` still puts the address on the wire, which is how the
    /// bus is probed for live peripherals.
    pub fn write(&mut self, data: &[u8]) -> Result<()> {
        let I2cMaster {
            active,
            delay,
            timing,
        } = self;
        let active = active.as_mut().ok_or(Error::NotInitialised)?;
        let timing = *timing;
        let len = transfer_len(data.len())?;
        let window = &mut active.window;

        window.write_word(BSC_C, BSC_C_I2CEN | BSC_C_CLEAR);
        window.write_word(BSC_DLEN, len);
        window.write_word(BSC_C, BSC_C_I2CEN | BSC_C_ST);

        let mut pending = data.iter();
        let mut remaining = data.len();
        while window.read_word(BSC_S) & BSC_S_DONE == 0 {
            remaining -= fill_fifo(window, &mut pending);
            delay.delay_ns(timing.poll_interval_ns(remaining));
        }
        finish(window, remaining)
    }

    /// Fills `buffer` from the addressed peripheral.
    pub fn read(&mut self, buffer: &mut [u8]) -> Result<()> {
        let I2cMaster {
            active,
            delay,
            timing,
        } = self;
        let active = active.as_mut().ok_or(Error::NotInitialised)?;
        let timing = *timing;
        let len = transfer_len(buffer.len())?;
        let window = &mut active.window;

        window.write_word(BSC_C, BSC_C_I2CEN | BSC_C_CLEAR);
        window.write_word(BSC_DLEN, len);
        window.write_word(BSC_C, BSC_C_I2CEN | BSC_C_ST | BSC_C_READ);

        let mut remaining = buffer.len();
        let mut slots = buffer.iter_mut();
        while window.read_word(BSC_S) & BSC_S_DONE == 0 {
            remaining -= drain_fifo(window, &mut slots);
            delay.delay_ns(timing.poll_interval_ns(remaining));
        }
        // Anything the controller clocked in between the last poll and the
        // done flag is still sitting in the FIFO.
        remaining -= drain_fifo(window, &mut slots);
        finish(window, remaining)
    }

    /// The bus pins `(SDA, SCL)` claimed at setup.
    pub fn pins(&self) -> Result<(u8, u8)> {
        Ok(self.active.as_ref().ok_or(Error::NotInitialised)?.pins)
    }
}

/// Pushes pending bytes while the FIFO advertises space, returning how many
/// went in.
fn fill_fifo<M: RegisterWindow>(window: &mut M, pending: &mut core::slice::Iter<'_, u8>) -> usize {
    let mut sent = 0;
    while window.read_word(BSC_S) & BSC_S_TXD != 0 {
        match pending.next() {
            Some(&byte) => {
                window.write_word(BSC_FIFO, u32::from(byte));
                sent += 1;
            }
            None => break,
        }
    }
    sent
}

/// Pops received bytes while the FIFO advertises data, returning how many
/// came out.
fn drain_fifo<M: RegisterWindow>(
    window: &mut M,
    slots: &mut core::slice::IterMut<'_, u8>,
) -> usize {
    let mut received = 0;
    while window.read_word(BSC_S) & BSC_S_RXD != 0 {
        match slots.next() {
            Some(slot) => {
                *slot = window.read_word(BSC_FIFO) as u8;
                received += 1;
            }
            None => break,
        }
    }
    received
}

/// Classifies the latched status once a transfer reports done and clears
/// the bits it consumed. An address or data NACK outranks a clock-stretch
/// timeout; both outrank a byte-count mismatch.
fn finish<M: RegisterWindow>(window: &mut M, remaining: usize) -> Result<()> {
    let status = window.read_word(BSC_S);
    let mut failure = None;
    if status & BSC_S_CLKT != 0 {
        window.write_word(BSC_S, BSC_S_CLKT);
        failure = Some(Error::I2cClockTimeout);
    }
    if status & BSC_S_ERR != 0 {
        window.write_word(BSC_S, BSC_S_ERR);
        failure = Some(Error::I2cNack);
    }
    window.write_word(BSC_S, BSC_S_DONE);
    let result = match failure {
        Some(error) => Err(error),
        None if remaining > 0 => Err(Error::I2cShortTransfer),
        None => Ok(()),
    };
    if let Err(error) = &result {
        debug!("transfer ended with status {status:#06x}: {error}");
    }
    result
}

/// The length register holds sixteen bits; longer transfers are refused
/// before any register is touched.
fn transfer_len(len: usize) -> Result<u32> {
    match u16::try_from(len) {
        Ok(len) => Ok(u32::from(len)),
        Err(_) => Err(Error::RangeError),
    }
}
