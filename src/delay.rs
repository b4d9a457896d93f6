// Licensed under the Apache-2.0 license

//! Time providers.
//!
//! Controllers take any [`DelayNs`] implementation, so tests can run the
//! timed register sequences without real waiting.

use std::thread;
use std::time::Duration;

use embedded_hal::delay::DelayNs;

/// Production delay: puts the calling thread to sleep.
///
/// The kernel will usually sleep longer than asked; for the pull-resistor
/// settle and FIFO pacing waits in this kit, longer is always safe.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sleep;

impl DelayNs for Sleep {
    fn delay_ns(&mut self, ns: u32) {
        thread::sleep(Duration::from_nanos(u64::from(ns)));
    }
}

/// Zero-cost delay for tests and simulated windows.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDelay;

impl DelayNs for NoopDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}
