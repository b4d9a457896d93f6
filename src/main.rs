// Licensed under the Apache-2.0 license

//! Demo runner exercising each peripheral from the command line.
//!
//! Wants root (or equivalent capabilities) for `/dev/mem`. Pass one of the
//! demo names as the first argument; `blink` is the default.

use std::env;
use std::process;
use std::thread;
use std::time::Duration;

use fugit::RateExtU32;
use log::{info, warn, LevelFilter};

use bcm2835_ddk::gpio::{GpioController, Level, PinFunction, PullMode};
use bcm2835_ddk::i2c::I2cMaster;
use bcm2835_ddk::pwm::{PwmController, PwmMode, PWM_PIN};
use bcm2835_ddk::{Error, Result};

/// Pin wired to the demo LED.
const LED_PIN: u8 = 17;
/// Pin sampled by the input and pull demos.
const INPUT_PIN: u8 = 4;
/// 24Cxx-style EEPROM used by the `eeprom` demo.
const EEPROM_ADDRESS: u8 = 0x50;

struct StderrLogger;

impl log::Log for StderrLogger {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        eprintln!("[{}] {}", record.level(), record.args());
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn main() -> Result<()> {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(LevelFilter::Debug);
    }
    let demo = env::args().nth(1).unwrap_or_else(|| String::from("blink"));
    match demo.as_str() {
        "blink" => blink(),
        "input" => watch_input(),
        "pull" => compare_pulls(),
        "scan" => scan_bus(),
        "eeprom" => exercise_eeprom(),
        "pwm" => sweep_pwm(),
        other => {
            eprintln!("unknown demo '{other}'");
            eprintln!("demos: blink input pull scan eeprom pwm");
            process::exit(2);
        }
    }
}

/// Toggles the LED pin ten times at 2.5 Hz.
fn blink() -> Result<()> {
    let mut gpio = GpioController::open()?;
    info!("board revision {:?}", gpio.revision()?);
    gpio.set_function(LED_PIN, PinFunction::Output)?;
    for _ in 0..10 {
        gpio.set_pin(LED_PIN, Level::High)?;
        thread::sleep(Duration::from_millis(200));
        gpio.set_pin(LED_PIN, Level::Low)?;
        thread::sleep(Duration::from_millis(200));
    }
    gpio.close()
}

/// Samples the input pin for five seconds with its pull-up engaged.
fn watch_input() -> Result<()> {
    let mut gpio = GpioController::open()?;
    gpio.set_function(INPUT_PIN, PinFunction::Input)?;
    gpio.set_pull_resistor(INPUT_PIN, PullMode::PullUp)?;
    for _ in 0..20 {
        info!("pin {INPUT_PIN}: {:?}", gpio.read_pin(INPUT_PIN)?);
        thread::sleep(Duration::from_millis(250));
    }
    gpio.set_pull_resistor(INPUT_PIN, PullMode::Disabled)?;
    gpio.close()
}

/// Shows the input pin following each pull resistor while left floating.
fn compare_pulls() -> Result<()> {
    let mut gpio = GpioController::open()?;
    gpio.set_function(INPUT_PIN, PinFunction::Input)?;
    for mode in [PullMode::PullUp, PullMode::PullDown] {
        gpio.set_pull_resistor(INPUT_PIN, mode)?;
        thread::sleep(Duration::from_millis(5));
        info!(
            "pin {INPUT_PIN} with {mode:?}: {:?}",
            gpio.read_pin(INPUT_PIN)?
        );
    }
    gpio.set_pull_resistor(INPUT_PIN, PullMode::Disabled)?;
    gpio.close()
}

/// Probes every 7-bit address in the usual assignable range.
fn scan_bus() -> Result<()> {
    let mut gpio = GpioController::open()?;
    let mut i2c = I2cMaster::open(&mut gpio)?;
    let mut found = 0u32;
    for address in 0x08..=0x77u8 {
        i2c.set_slave_address(address)?;
        match i2c.write(&[]) {
            Ok(()) => {
                info!("responder at {address:#04x}");
                found += 1;
            }
            Err(Error::I2cNack) => {}
            Err(error) => warn!("probe of {address:#04x} failed: {error}"),
        }
    }
    info!("scan complete, {found} responder(s)");
    i2c.cleanup(&mut gpio)?;
    gpio.close()
}

/// Writes a marker into an EEPROM at fast mode and reads it back.
fn exercise_eeprom() -> Result<()> {
    let mut gpio = GpioController::open()?;
    let mut i2c = I2cMaster::open(&mut gpio)?;
    i2c.set_clock(400_000.Hz())?;
    i2c.set_slave_address(EEPROM_ADDRESS)?;

    let payload = *b"bcm2835-ddk";
    let mut message = vec![0x00];
    message.extend_from_slice(&payload);
    i2c.write(&message)?;
    // Internal write cycle; the part NACKs until it finishes.
    thread::sleep(Duration::from_millis(5));

    i2c.write(&[0x00])?;
    let mut readback = [0u8; 11];
    i2c.read(&mut readback)?;
    if readback == payload {
        info!("eeprom read back {} bytes intact", readback.len());
    } else {
        warn!("eeprom mismatch: wrote {payload:02x?}, read {readback:02x?}");
    }
    i2c.cleanup(&mut gpio)?;
    gpio.close()
}

/// Sweeps the LED brightness through a full mark-space range on pin 18.
fn sweep_pwm() -> Result<()> {
    let mut gpio = GpioController::open()?;
    let mut pwm = PwmController::open(&mut gpio)?;
    pwm.set_clock_frequency(1_000_000.Hz())?;
    pwm.set_mode(PwmMode::MarkSpace)?;
    pwm.set_range(1_024)?;
    pwm.enable()?;
    info!("sweeping duty cycle on pin {PWM_PIN}");
    for step in 0..=16u32 {
        pwm.set_data(step * 64)?;
        thread::sleep(Duration::from_millis(150));
    }
    pwm.disable()?;
    pwm.cleanup(&mut gpio)?;
    gpio.close()
}
