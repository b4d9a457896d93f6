// Licensed under the Apache-2.0 license

// Prevent panic-prone patterns in production code only
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::indexing_slicing))]
#![cfg_attr(not(test), warn(clippy::expect_used))]
pub mod bcm2835;
pub mod delay;
pub mod error;
pub mod gpio;
pub mod i2c;
pub mod mmio;
pub mod platform;
pub mod pwm;

pub use error::{Error, Result};
