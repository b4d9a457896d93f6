// Licensed under the Apache-2.0 license

//! Hardware PWM on channel 1.
//!
//! Drives the PWM block through GPIO18 with the oscillator as clock source.
//! The clock manager wants its password in every control store and its
//! divider moved only through the passworded divider register.

use embedded_hal::delay::DelayNs;
use fugit::HertzU32;
use log::debug;

use crate::bcm2835::{
    CM_BASE, CM_DIV_MAX, CM_DIV_SHIFT, CM_ENABLE, CM_LEN, CM_PASSWORD, CM_PWMCTL, CM_PWMDIV,
    CM_SRC_OSC, OSC_HZ, PWM_BASE, PWM_CTL, PWM_CTL_MODE1, PWM_CTL_MSEN1, PWM_CTL_PWEN1, PWM_DAT1,
    PWM_LEN, PWM_RNG1,
};
use crate::error::{Error, Result};
use crate::gpio::{GpioController, PinFunction};
use crate::mmio::{DevMem, RegisterWindow};

/// The pin channel 1 drives in its alternate-5 routing.
pub const PWM_PIN: u8 = 18;

/// Pulse shaping for channel 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PwmMode {
    /// Pulses spread evenly across the range.
    Balanced,
    /// One mark of `data` ticks followed by space for the rest of the range.
    MarkSpace,
    /// Range-sized words shifted out bit by bit.
    Serialiser,
}

/// Handle on the PWM block and its slice of the clock manager.
#[derive(Debug)]
pub struct PwmController<M = DevMem> {
    active: Option<Active<M>>,
}

#[derive(Debug)]
struct Active<M> {
    pwm: M,
    clocks: M,
}

impl PwmController {
    /// Maps the PWM and clock-manager blocks out of `/dev/mem` and claims
    /// the channel pin.
    pub fn open(gpio: &mut GpioController) -> Result<Self> {
        let mut pwm = PwmController::new();
        pwm.setup(
            DevMem::map(PWM_BASE, PWM_LEN)?,
            DevMem::map(CM_BASE, CM_LEN)?,
            gpio,
        )?;
        Ok(pwm)
    }
}

impl<M: RegisterWindow> PwmController<M> {
    /// An unopened controller; call [`setup`](Self::setup) before use.
    pub fn new() -> Self {
        PwmController { active: None }
    }

    /// Routes the channel pin, starts the oscillator-sourced clock and
    /// leaves the channel disabled with zero range and data.
    pub fn setup<G, GD>(
        &mut self,
        mut pwm: M,
        mut clocks: M,
        gpio: &mut GpioController<G, GD>,
    ) -> Result<()>
    where
        G: RegisterWindow,
        GD: DelayNs,
    {
        if self.active.is_some() {
            return Err(Error::AlreadyInitialised);
        }
        gpio.set_function(PWM_PIN, PinFunction::Alt5)?;
        pwm.write_word(PWM_CTL, 0);
        clocks.write_word(CM_PWMCTL, CM_PASSWORD | CM_SRC_OSC);
        clocks.write_word(CM_PWMCTL, CM_PASSWORD | CM_SRC_OSC | CM_ENABLE);
        pwm.write_word(PWM_RNG1, 0);
        pwm.write_word(PWM_DAT1, 0);
        debug!("pwm channel 1 up on pin {PWM_PIN}");
        self.active = Some(Active { pwm, clocks });
        Ok(())
    }

    /// Stops the channel and its clock and hands the pin back to input.
    ///
    /// The controller is closed afterwards even if a step fails; the first
    /// failure is the one reported.
    pub fn cleanup<G, GD>(&mut self, gpio: &mut GpioController<G, GD>) -> Result<()>
    where
        G: RegisterWindow,
        GD: DelayNs,
    {
        let mut active = self.active.take().ok_or(Error::NotInitialised)?;
        let mut first_error = gpio.set_function(PWM_PIN, PinFunction::Input).err();
        active.pwm.write_word(PWM_CTL, 0);
        active
            .clocks
            .write_word(CM_PWMCTL, CM_PASSWORD | CM_SRC_OSC);
        if let Err(error) = active.pwm.close() {
            if first_error.is_none() {
                first_error = Some(error);
            }
        }
        if let Err(error) = active.clocks.close() {
            if first_error.is_none() {
                first_error = Some(error);
            }
        }
        match first_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// Sets the tick rate the range and data counts run at.
    ///
    /// The divider out of the oscillator must land in the 12-bit field, so
    /// `frequency` is accepted between `OSC_HZ / 4095` (rounding up, about
    /// 4.7 kHz) and `OSC_HZ` itself.
    pub fn set_clock_frequency(&mut self, frequency: HertzU32) -> Result<()> {
        let active = self.active.as_mut().ok_or(Error::NotInitialised)?;
        let hz = frequency.to_Hz();
        if hz == 0 {
            return Err(Error::RangeError);
        }
        let divider = OSC_HZ / hz;
        if divider == 0 || divider > CM_DIV_MAX {
            return Err(Error::RangeError);
        }
        active
            .clocks
            .write_word(CM_PWMDIV, CM_PASSWORD | (divider << CM_DIV_SHIFT));
        Ok(())
    }

    /// Selects how the channel shapes its output.
    pub fn set_mode(&mut self, mode: PwmMode) -> Result<()> {
        let active = self.active.as_mut().ok_or(Error::NotInitialised)?;
        let mut ctl = active.pwm.read_word(PWM_CTL);
        ctl &= !(PWM_CTL_MODE1 | PWM_CTL_MSEN1);
        match mode {
            PwmMode::Balanced => {}
            PwmMode::MarkSpace => ctl |= PWM_CTL_MSEN1,
            PwmMode::Serialiser => ctl |= PWM_CTL_MODE1,
        }
        active.pwm.write_word(PWM_CTL, ctl);
        Ok(())
    }

    /// Starts the channel.
    pub fn enable(&mut self) -> Result<()> {
        let active = self.active.as_mut().ok_or(Error::NotInitialised)?;
        let ctl = active.pwm.read_word(PWM_CTL);
        active.pwm.write_word(PWM_CTL, ctl | PWM_CTL_PWEN1);
        Ok(())
    }

    /// Stops the channel.
    pub fn disable(&mut self) -> Result<()> {
        let active = self.active.as_mut().ok_or(Error::NotInitialised)?;
        let ctl = active.pwm.read_word(PWM_CTL);
        active.pwm.write_word(PWM_CTL, ctl & !PWM_CTL_PWEN1);
        Ok(())
    }

    /// Ticks per output period.
    pub fn set_range(&mut self, range: u32) -> Result<()> {
        let active = self.active.as_mut().ok_or(Error::NotInitialised)?;
        active.pwm.write_word(PWM_RNG1, range);
        Ok(())
    }

    /// Ticks spent high per period, or the serialiser word.
    pub fn set_data(&mut self, data: u32) -> Result<()> {
        let active = self.active.as_mut().ok_or(Error::NotInitialised)?;
        active.pwm.write_word(PWM_DAT1, data);
        Ok(())
    }
}

impl<M: RegisterWindow> Default for PwmController<M> {
    fn default() -> Self {
        PwmController::new()
    }
}
