// Licensed under the Apache-2.0 license

//! Bus clock and transfer pacing arithmetic.

use fugit::HertzU32;

use crate::bcm2835::{BSC_DIV_MAX, BSC_FIFO_DEPTH, OSC_HZ};
use crate::error::{Error, Result};

/// Slowest supported bus frequency.
pub const MIN_BUS_HZ: u32 = 10_000;
/// Fastest frequency the bus is specified for.
pub const MAX_BUS_HZ: u32 = 400_000;
/// Standard-mode rate applied at setup.
pub const DEFAULT_BUS_HZ: u32 = 100_000;

/// Clock edges per transferred byte: eight data bits plus the acknowledge.
const CLOCKS_PER_BYTE: u32 = 9;

/// Divider and pacing figures derived from a requested bus frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusTiming {
    divider: u32,
    byte_time_ns: u32,
}

impl BusTiming {
    /// Derives the oscillator divider and per-byte wire time for `frequency`.
    ///
    /// Frequencies outside `MIN_BUS_HZ..=MAX_BUS_HZ` report
    /// [`Error::RangeError`]. Inside the range the divider always fits the
    /// 12-bit register field.
    pub fn for_frequency(frequency: HertzU32) -> Result<Self> {
        let hz = frequency.to_Hz();
        if !(MIN_BUS_HZ..=MAX_BUS_HZ).contains(&hz) {
            return Err(Error::RangeError);
        }
        let divider = OSC_HZ / hz;
        debug_assert!(divider <= BSC_DIV_MAX);
        Ok(BusTiming {
            divider,
            byte_time_ns: (1_000_000_000 / hz) * CLOCKS_PER_BYTE,
        })
    }

    /// Value for the clock divider register.
    pub fn divider(self) -> u32 {
        self.divider
    }

    /// Nanoseconds one byte occupies on the wire.
    pub fn byte_time_ns(self) -> u32 {
        self.byte_time_ns
    }

    /// Sleep length between status polls with `remaining` bytes to move.
    ///
    /// Half the wire time of the bytes that still fit through the FIFO, so
    /// the loop wakes roughly twice per FIFO's worth of traffic. Never less
    /// than half a byte time, even for a zero-length transfer.
    pub fn poll_interval_ns(self, remaining: usize) -> u32 {
        let batch = remaining.clamp(1, BSC_FIFO_DEPTH) as u32;
        self.byte_time_ns * batch / 2
    }
}

impl Default for BusTiming {
    fn default() -> Self {
        BusTiming {
            divider: OSC_HZ / DEFAULT_BUS_HZ,
            byte_time_ns: (1_000_000_000 / DEFAULT_BUS_HZ) * CLOCKS_PER_BYTE,
        }
    }
}
