// Licensed under the Apache-2.0 license

//! Failure taxonomy shared by every controller in the kit.

use std::io;

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = core::result::Result<T, Error>;

/// Everything a controller call can report.
///
/// Each variant carries its display string; the derive keeps the
/// variant-to-string table complete at compile time.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// A call finished without assigning an outcome. `Result` makes this
    /// state unreachable; the variant stays so the status table is complete.
    #[error("internal error: call outcome was never assigned")]
    DefaultUnset,

    /// The pin is not wired out on the identified board revision.
    #[error("pin is not valid on this board revision")]
    InvalidPin,

    /// A numeric argument fell outside the accepted range.
    #[error("argument out of range")]
    RangeError,

    /// A required buffer or output slot was absent. References make this
    /// unreachable from the current call surface; kept for the status table.
    #[error("required argument was null")]
    NullArgument,

    /// An OS or resource call failed underneath the kit.
    #[error("{call} failed: {detail}")]
    ExternalFailure {
        call: &'static str,
        detail: String,
    },

    /// The controller's register window is not open.
    #[error("not initialised")]
    NotInitialised,

    /// The controller's register window is already open.
    #[error("already initialised")]
    AlreadyInitialised,

    /// The slave did not acknowledge its address or a data byte.
    #[error("i2c slave did not acknowledge")]
    I2cNack,

    /// The slave stretched the clock past the hardware timeout.
    #[error("i2c clock stretch timeout")]
    I2cClockTimeout,

    /// The transfer completed with fewer bytes moved than requested.
    #[error("i2c transfer ended short")]
    I2cShortTransfer,
}

impl Error {
    /// Captures `errno` from the OS call that just failed.
    pub(crate) fn last_os(call: &'static str) -> Self {
        Error::ExternalFailure {
            call,
            detail: io::Error::last_os_error().to_string(),
        }
    }

    pub(crate) fn external(call: &'static str, detail: impl Into<String>) -> Self {
        Error::ExternalFailure {
            call,
            detail: detail.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Error;

    // One arm per variant keeps this match a compile-time completeness check
    // on the display table.
    fn rendered(error: &Error) -> String {
        match error {
            Error::DefaultUnset
            | Error::InvalidPin
            | Error::RangeError
            | Error::NullArgument
            | Error::ExternalFailure { .. }
            | Error::NotInitialised
            | Error::AlreadyInitialised
            | Error::I2cNack
            | Error::I2cClockTimeout
            | Error::I2cShortTransfer => error.to_string(),
        }
    }

    #[test]
    fn every_variant_renders() {
        let all = [
            Error::DefaultUnset,
            Error::InvalidPin,
            Error::RangeError,
            Error::NullArgument,
            Error::external("open /dev/mem", "permission denied"),
            Error::NotInitialised,
            Error::AlreadyInitialised,
            Error::I2cNack,
            Error::I2cClockTimeout,
            Error::I2cShortTransfer,
        ];
        for error in &all {
            assert!(!rendered(error).is_empty());
        }
    }

    #[test]
    fn external_failure_names_the_call() {
        let error = Error::external("mmap", "bad address");
        assert_eq!(error.to_string(), "mmap failed: bad address");
    }
}
