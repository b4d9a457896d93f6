// Licensed under the Apache-2.0 license

//! BSC0 I2C master module.
//!
//! This module drives the broadcom serial controller in polled master mode.
//! [`timing`] turns a bus frequency into the divider and pacing figures the
//! transfer loops run on; [`master`] owns the register window and implements
//! setup, addressed reads and writes, and teardown.

pub mod master;
pub mod timing;

pub use master::I2cMaster;
pub use timing::BusTiming;
