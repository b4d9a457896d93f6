// Licensed under the Apache-2.0 license

//! BCM2835 physical register map.
//!
//! Bases, window extents, register offsets and bit masks for the peripheral
//! blocks this kit drives. Offsets are bytes from the owning block's base;
//! every register is one 32-bit word. Values follow the BCM2835 ARM
//! peripherals datasheet and are part of the compatibility surface.

/// Board crystal. Feeds the clock-manager dividers.
pub const OSC_HZ: u32 = 19_200_000;

// ---------------------------------------------------------------------------
// GPIO block
// ---------------------------------------------------------------------------

/// Physical base of the GPIO register block.
pub const GPIO_BASE: usize = 0x2020_0000;
/// Window extent: through GPPUDCLK1, the last register the block documents.
pub const GPIO_LEN: usize = 0xA0;

/// Function-select word 0. Word n covers pins `10n..10n+9`, 3 bits per pin.
pub const GPFSEL0: usize = 0x00;
/// Output set word 0, pins 0-31. Write-only strobe.
pub const GPSET0: usize = 0x1C;
/// Output clear word 0, pins 0-31. Write-only strobe.
pub const GPCLR0: usize = 0x28;
/// Pin level word 0, pins 0-31.
pub const GPLEV0: usize = 0x34;
/// Pull-up/down control.
pub const GPPUD: usize = 0x94;
/// Pull-up/down clock word 0, pins 0-31.
pub const GPPUDCLK0: usize = 0x98;
/// Pull-up/down clock word 1, pins 32-53.
pub const GPPUDCLK1: usize = 0x9C;

/// Pins per function-select word.
pub const FSEL_PINS_PER_WORD: usize = 10;
/// Width of one pin's function field.
pub const FSEL_BITS_PER_PIN: u32 = 3;
/// Mask of one pin's function field, pre-shift.
pub const FSEL_MASK: u32 = 0b111;

// ---------------------------------------------------------------------------
// BSC0 (I2C master) block
// ---------------------------------------------------------------------------

/// Physical base of the BSC0 register block.
pub const BSC0_BASE: usize = 0x2020_5000;
/// Window extent: through DEL.
pub const BSC0_LEN: usize = 0x1C;

/// Control register.
pub const BSC_C: usize = 0x00;
/// Status register. ERR/CLKT/DONE are write-one-to-clear.
pub const BSC_S: usize = 0x04;
/// Data length register, 16 bits wide.
pub const BSC_DLEN: usize = 0x08;
/// Slave address register, 7 bits wide.
pub const BSC_A: usize = 0x0C;
/// Data FIFO.
pub const BSC_FIFO: usize = 0x10;
/// Clock divider register.
pub const BSC_DIV: usize = 0x14;
/// Data delay register.
pub const BSC_DEL: usize = 0x18;

/// Control: enable the controller.
pub const BSC_C_I2CEN: u32 = 0x8000;
/// Control: start the programmed transfer.
pub const BSC_C_ST: u32 = 0x80;
/// Control: clear the FIFO.
pub const BSC_C_CLEAR: u32 = 0x10;
/// Control: transfer direction, set for read.
pub const BSC_C_READ: u32 = 0x1;

/// Status: clock stretch timeout.
pub const BSC_S_CLKT: u32 = 0x200;
/// Status: slave address or data not acknowledged.
pub const BSC_S_ERR: u32 = 0x100;
/// Status: FIFO full.
pub const BSC_S_RXF: u32 = 0x80;
/// Status: FIFO empty.
pub const BSC_S_TXE: u32 = 0x40;
/// Status: FIFO holds at least one received byte.
pub const BSC_S_RXD: u32 = 0x20;
/// Status: FIFO can accept at least one byte to transmit.
pub const BSC_S_TXD: u32 = 0x10;
/// Status: FIFO needs reading.
pub const BSC_S_RXR: u32 = 0x8;
/// Status: FIFO needs writing.
pub const BSC_S_TXW: u32 = 0x4;
/// Status: transfer done.
pub const BSC_S_DONE: u32 = 0x2;
/// Status: transfer active.
pub const BSC_S_TA: u32 = 0x1;

/// Hardware FIFO depth in bytes.
pub const BSC_FIFO_DEPTH: usize = 16;

/// Largest clock divider the divider field carries.
pub const BSC_DIV_MAX: u32 = 0xFFF;

// ---------------------------------------------------------------------------
// PWM block
// ---------------------------------------------------------------------------

/// Physical base of the PWM register block.
pub const PWM_BASE: usize = 0x2020_C000;
/// Window extent: through DAT2.
pub const PWM_LEN: usize = 0x28;

/// PWM control register.
pub const PWM_CTL: usize = 0x00;
/// PWM status register.
pub const PWM_STA: usize = 0x04;
/// Channel 1 range register.
pub const PWM_RNG1: usize = 0x10;
/// Channel 1 data register.
pub const PWM_DAT1: usize = 0x14;
/// FIFO input register.
pub const PWM_FIF1: usize = 0x18;
/// Channel 2 range register.
pub const PWM_RNG2: usize = 0x20;
/// Channel 2 data register.
pub const PWM_DAT2: usize = 0x24;

/// Control: channel 1 enable.
pub const PWM_CTL_PWEN1: u32 = 0x01;
/// Control: channel 1 mode, set for serialiser.
pub const PWM_CTL_MODE1: u32 = 0x02;
/// Control: channel 1 mark-space enable.
pub const PWM_CTL_MSEN1: u32 = 0x80;

// ---------------------------------------------------------------------------
// Clock manager block
// ---------------------------------------------------------------------------

/// Physical base of the clock-manager register block.
pub const CM_BASE: usize = 0x2010_1000;
/// Window extent: through the PWM divider register.
pub const CM_LEN: usize = 0xA8;

/// PWM clock control register.
pub const CM_PWMCTL: usize = 0xA0;
/// PWM clock divider register.
pub const CM_PWMDIV: usize = 0xA4;

/// Clock registers only accept writes carrying this password in bits 31:24.
pub const CM_PASSWORD: u32 = 0x5A00_0000;
/// Clock control: source the 19.2 MHz crystal.
pub const CM_SRC_OSC: u32 = 0x1;
/// Clock control: enable the clock generator.
pub const CM_ENABLE: u32 = 0x10;
/// Integer divider position inside the divider register.
pub const CM_DIV_SHIFT: u32 = 12;
/// Largest integer divider the 12-bit field holds.
pub const CM_DIV_MAX: u32 = 0xFFF;
