// Licensed under the Apache-2.0 license

//! Register-level doubles shared by the integration tests.
//!
//! Each model keeps its state behind `Rc` so a probe handle can inspect and
//! steer the registers after the window itself has moved into a controller.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use heapless::Deque;

use bcm2835_ddk::bcm2835::{
    BSC0_LEN, BSC_A, BSC_C, BSC_C_CLEAR, BSC_C_READ, BSC_C_ST, BSC_DLEN, BSC_FIFO,
    BSC_FIFO_DEPTH, BSC_S, BSC_S_CLKT, BSC_S_DONE, BSC_S_ERR, BSC_S_RXD, BSC_S_TA, BSC_S_TXD,
    FSEL_BITS_PER_PIN, FSEL_MASK, FSEL_PINS_PER_WORD, GPCLR0, GPFSEL0, GPIO_LEN, GPLEV0, GPSET0,
};
use bcm2835_ddk::mmio::RegisterWindow;
use bcm2835_ddk::platform::PlatformInfo;
use bcm2835_ddk::Result;

/// Revision codes selecting the two pin tables.
pub const REV1_CODE: u32 = 0x03;
pub const REV2_CODE: u32 = 0x0E;

/// Platform double reporting a fixed revision code.
pub struct FixedPlatform(pub u32);

impl PlatformInfo for FixedPlatform {
    fn revision_code(&self) -> Result<u32> {
        Ok(self.0)
    }
}

/// One entry in the shared register/delay journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceEvent {
    Write(usize, u32),
    Delay(u32),
}

pub type Trace = Rc<RefCell<Vec<TraceEvent>>>;

pub fn new_trace() -> Trace {
    Rc::new(RefCell::new(Vec::new()))
}

/// Delay double that journals every wait it is asked for.
pub struct TracingDelay(pub Trace);

impl DelayNs for TracingDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.0.borrow_mut().push(TraceEvent::Delay(ns));
    }
}

// ---------------------------------------------------------------------------
// GPIO block model
// ---------------------------------------------------------------------------

struct GpioState {
    words: Vec<u32>,
    trace: Option<Trace>,
}

impl GpioState {
    fn record(&self, offset: usize, value: u32) {
        if let Some(trace) = &self.trace {
            trace.borrow_mut().push(TraceEvent::Write(offset, value));
        }
    }
}

/// Register window with the GPIO block's strobe semantics: stores to the
/// set/clear registers edit the level register and read back as zero.
pub struct GpioModel {
    state: Rc<RefCell<GpioState>>,
}

/// Inspection handle onto a [`GpioModel`]'s registers.
#[derive(Clone)]
pub struct GpioProbe {
    state: Rc<RefCell<GpioState>>,
}

impl GpioModel {
    pub fn new() -> (GpioModel, GpioProbe) {
        GpioModel::with_trace(None)
    }

    pub fn traced(trace: Trace) -> (GpioModel, GpioProbe) {
        GpioModel::with_trace(Some(trace))
    }

    fn with_trace(trace: Option<Trace>) -> (GpioModel, GpioProbe) {
        let state = Rc::new(RefCell::new(GpioState {
            words: vec![0; GPIO_LEN / 4],
            trace,
        }));
        (
            GpioModel {
                state: Rc::clone(&state),
            },
            GpioProbe { state },
        )
    }
}

impl RegisterWindow for GpioModel {
    fn read_word(&self, offset: usize) -> u32 {
        match offset {
            GPSET0 | GPCLR0 => 0,
            _ => self.state.borrow().words[offset / 4],
        }
    }

    fn write_word(&mut self, offset: usize, value: u32) {
        let mut state = self.state.borrow_mut();
        state.record(offset, value);
        match offset {
            GPSET0 => state.words[GPLEV0 / 4] |= value,
            GPCLR0 => state.words[GPLEV0 / 4] &= !value,
            _ => state.words[offset / 4] = value,
        }
    }

    fn len(&self) -> usize {
        GPIO_LEN
    }
}

impl GpioProbe {
    /// Raw word at `offset`.
    pub fn reg(&self, offset: usize) -> u32 {
        self.state.borrow().words[offset / 4]
    }

    /// The 3-bit function-select field currently held for `pin`.
    pub fn function_of(&self, pin: u8) -> u32 {
        let word = self.reg(GPFSEL0 + (usize::from(pin) / FSEL_PINS_PER_WORD) * 4);
        (word >> ((u32::from(pin) % FSEL_PINS_PER_WORD as u32) * FSEL_BITS_PER_PIN)) & FSEL_MASK
    }

    /// Forces the level register bit for `pin`, as external input would.
    pub fn drive_level(&self, pin: u8, high: bool) {
        let mut state = self.state.borrow_mut();
        let bit = 1u32 << pin;
        if high {
            state.words[GPLEV0 / 4] |= bit;
        } else {
            state.words[GPLEV0 / 4] &= !bit;
        }
    }
}

// ---------------------------------------------------------------------------
// BSC block model
// ---------------------------------------------------------------------------

/// Behaviour the modelled bus peripheral exhibits on the next transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BscFault {
    /// Every byte acknowledged, full length served.
    None,
    /// Address phase not acknowledged.
    Nack,
    /// Clock held low past the stretch limit.
    ClockStretch,
    /// Only this many bytes accepted or supplied before the bus goes quiet.
    Short(usize),
}

struct BscState {
    regs: [u32; BSC0_LEN / 4],
    latches: u32,
    fifo: Deque<u8, BSC_FIFO_DEPTH>,
    received: Vec<u8>,
    reply: Vec<u8>,
    reply_cursor: usize,
    fault: BscFault,
    reading: bool,
    active: bool,
    moved: usize,
}

impl BscState {
    fn start_transfer(&mut self, control: u32) {
        self.moved = 0;
        self.reading = control & BSC_C_READ != 0;
        match self.fault {
            BscFault::Nack => self.latches |= BSC_S_ERR | BSC_S_DONE,
            BscFault::ClockStretch => self.latches |= BSC_S_CLKT | BSC_S_DONE,
            BscFault::None | BscFault::Short(_) => {
                self.active = true;
                self.tick();
            }
        }
    }

    /// Moves bytes the way the wire would between two status polls.
    fn tick(&mut self) {
        if !self.active {
            return;
        }
        let dlen = self.regs[BSC_DLEN / 4] as usize;
        let limit = match self.fault {
            BscFault::Short(n) => n.min(dlen),
            _ => dlen,
        };
        if self.reading {
            while self.moved < limit && !self.fifo.is_full() {
                let byte = self.reply.get(self.reply_cursor).copied().unwrap_or(0xFF);
                self.reply_cursor += 1;
                let _ = self.fifo.push_back(byte);
                self.moved += 1;
            }
        } else {
            while self.moved < limit {
                match self.fifo.pop_front() {
                    Some(byte) => {
                        self.received.push(byte);
                        self.moved += 1;
                    }
                    None => break,
                }
            }
        }
        if self.moved >= limit {
            self.latches |= BSC_S_DONE;
            self.active = false;
        }
    }

    fn status(&mut self) -> u32 {
        self.tick();
        let mut status = self.latches;
        if !self.fifo.is_empty() {
            status |= BSC_S_RXD;
        }
        if !self.fifo.is_full() {
            status |= BSC_S_TXD;
        }
        if self.active {
            status |= BSC_S_TA;
        }
        status
    }
}

/// Register window acting out the serial controller's transfer machine.
pub struct BscModel {
    state: Rc<RefCell<BscState>>,
}

/// Inspection and fault-injection handle onto a [`BscModel`].
#[derive(Clone)]
pub struct BscProbe {
    state: Rc<RefCell<BscState>>,
}

impl BscModel {
    pub fn new() -> (BscModel, BscProbe) {
        let state = Rc::new(RefCell::new(BscState {
            regs: [0; BSC0_LEN / 4],
            latches: 0,
            fifo: Deque::new(),
            received: Vec::new(),
            reply: Vec::new(),
            reply_cursor: 0,
            fault: BscFault::None,
            reading: false,
            active: false,
            moved: 0,
        }));
        (
            BscModel {
                state: Rc::clone(&state),
            },
            BscProbe { state },
        )
    }
}

impl RegisterWindow for BscModel {
    fn read_word(&self, offset: usize) -> u32 {
        match offset {
            BSC_S => self.state.borrow_mut().status(),
            BSC_FIFO => u32::from(self.state.borrow_mut().fifo.pop_front().unwrap_or(0)),
            _ => self.state.borrow().regs[offset / 4],
        }
    }

    fn write_word(&mut self, offset: usize, value: u32) {
        let mut state = self.state.borrow_mut();
        match offset {
            BSC_C => {
                state.regs[BSC_C / 4] = value;
                if value & BSC_C_CLEAR != 0 {
                    state.fifo.clear();
                }
                if value & BSC_C_ST != 0 {
                    state.start_transfer(value);
                }
            }
            BSC_S => {
                state.latches &= !(value & (BSC_S_DONE | BSC_S_ERR | BSC_S_CLKT));
            }
            BSC_FIFO => {
                let _ = state.fifo.push_back(value as u8);
            }
            _ => state.regs[offset / 4] = value,
        }
    }

    fn len(&self) -> usize {
        BSC0_LEN
    }
}

impl BscProbe {
    /// Raw stored word at `offset` (not the live status view).
    pub fn reg(&self, offset: usize) -> u32 {
        self.state.borrow().regs[offset / 4]
    }

    /// Slave address register contents.
    pub fn address(&self) -> u32 {
        self.reg(BSC_A)
    }

    /// Every byte the modelled peripheral has accepted so far.
    pub fn received(&self) -> Vec<u8> {
        self.state.borrow().received.clone()
    }

    /// Queues the bytes the peripheral serves on the next read transfer.
    pub fn load_reply(&self, bytes: &[u8]) {
        let mut state = self.state.borrow_mut();
        state.reply = bytes.to_vec();
        state.reply_cursor = 0;
    }

    /// Selects the failure mode for subsequent transfers.
    pub fn set_fault(&self, fault: BscFault) {
        self.state.borrow_mut().fault = fault;
    }

    /// Latched error/done bits still pending acknowledgement.
    pub fn status_latches(&self) -> u32 {
        self.state.borrow().latches
    }
}
