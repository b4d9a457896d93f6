// Licensed under the Apache-2.0 license

//! Board identification and pin validity.
//!
//! Which header pins exist depends on the PCB revision, read once at GPIO
//! setup time. The revision source sits behind [`PlatformInfo`] so the
//! mapping logic stays testable without a live `/proc/cpuinfo`.

use std::fs;

use log::debug;

use crate::error::{Error, Result};

/// Pins wired out on revision 1 boards, in header order.
const REV1_PINS: [u8; 17] = [0, 1, 4, 7, 8, 9, 10, 11, 14, 15, 17, 18, 21, 22, 23, 24, 25];

/// Pins wired out on revision 2 boards, in header order.
const REV2_PINS: [u8; 17] = [2, 3, 4, 7, 8, 9, 10, 11, 14, 15, 17, 18, 22, 23, 24, 25, 27];

/// Supplies the raw platform revision code.
pub trait PlatformInfo {
    fn revision_code(&self) -> Result<u32>;
}

/// Reads the revision code from `/proc/cpuinfo`.
#[derive(Debug, Default)]
pub struct CpuInfo;

impl PlatformInfo for CpuInfo {
    fn revision_code(&self) -> Result<u32> {
        let text = fs::read_to_string("/proc/cpuinfo")
            .map_err(|error| Error::external("read /proc/cpuinfo", error.to_string()))?;
        parse_revision_code(&text)
            .ok_or_else(|| Error::external("parse /proc/cpuinfo", "no Revision field"))
    }
}

/// Extracts the hexadecimal `Revision` field from cpuinfo text.
fn parse_revision_code(text: &str) -> Option<u32> {
    let line = text.lines().find(|line| line.starts_with("Revision"))?;
    let (_, value) = line.split_once(':')?;
    u32::from_str_radix(value.trim(), 16).ok()
}

/// PCB revision, the selector for one of the two fixed pin tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardRevision {
    Rev1,
    Rev2,
}

impl BoardRevision {
    /// Maps a raw revision code onto a known PCB revision.
    ///
    /// Codes 0x02-0x03 are revision 1 boards, 0x04-0x0f revision 2.
    /// Anything else is unidentified and no pin operation is safe.
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0x02..=0x03 => Some(BoardRevision::Rev1),
            0x04..=0x0F => Some(BoardRevision::Rev2),
            _ => None,
        }
    }

    /// Reads the revision from `platform` and maps it, in one step.
    pub fn detect(platform: &impl PlatformInfo) -> Result<Self> {
        let code = platform.revision_code()?;
        let revision = BoardRevision::from_code(code).ok_or_else(|| {
            Error::external("identify board revision", format!("unknown code {code:#x}"))
        })?;
        debug!("platform revision {code:#x} -> {revision:?}");
        Ok(revision)
    }

    /// The pins physically wired out on this revision.
    pub fn valid_pins(self) -> &'static [u8] {
        match self {
            BoardRevision::Rev1 => &REV1_PINS,
            BoardRevision::Rev2 => &REV2_PINS,
        }
    }

    /// True when `pin` exists on this revision's header.
    pub fn is_valid_pin(self, pin: u8) -> bool {
        self.valid_pins().contains(&pin)
    }

    /// The BSC0 bus pins `(SDA, SCL)`, the first two header entries.
    pub fn i2c_pins(self) -> (u8, u8) {
        match self {
            BoardRevision::Rev1 => (0, 1),
            BoardRevision::Rev2 => (2, 3),
        }
    }
}
