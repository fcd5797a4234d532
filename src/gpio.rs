//! Digital I/O for the external beat switch and its LED
//!
//! The switch is wired with a pull-up: pressed reads LOW. The LED is a plain
//! output pin.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Logic level of a pin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high {
            Level::High
        } else {
            Level::Low
        }
    }
}

/// GPIO service used by the switch poller
pub trait Gpio: Send + Sync {
    /// False when no hardware is attached; polling is then skipped entirely
    fn enabled(&self) -> bool {
        true
    }

    fn read_switch_pin(&self) -> Result<Level>;

    fn write_led_pin(&self, level: Level) -> Result<()>;
}

/// Stand-in used when no GPIO is configured or it failed to initialise
pub struct DisabledGpio;

impl Gpio for DisabledGpio {
    fn enabled(&self) -> bool {
        false
    }

    fn read_switch_pin(&self) -> Result<Level> {
        // Released switch
        Ok(Level::High)
    }

    fn write_led_pin(&self, _level: Level) -> Result<()> {
        Ok(())
    }
}

/// Linux sysfs GPIO (`/sys/class/gpio`)
pub struct SysfsGpio {
    switch_value: PathBuf,
    led_value: PathBuf,
}

impl SysfsGpio {
    /// Export both pins, configure directions and switch the LED off
    pub fn open(root: impl AsRef<Path>, switch_pin: u32, led_pin: u32) -> Result<Self> {
        let root = root.as_ref();
        let switch_dir = export_pin(root, switch_pin)?;
        let led_dir = export_pin(root, led_pin)?;

        write_attr(&switch_dir.join("direction"), "in")?;
        write_attr(&led_dir.join("direction"), "out")?;

        let gpio = Self {
            switch_value: switch_dir.join("value"),
            led_value: led_dir.join("value"),
        };
        gpio.write_led_pin(Level::Low)?;

        info!(
            "GPIO ready: switch on pin {}, LED on pin {}",
            switch_pin, led_pin
        );
        Ok(gpio)
    }
}

fn export_pin(root: &Path, pin: u32) -> Result<PathBuf> {
    let dir = root.join(format!("gpio{}", pin));
    if !dir.exists() {
        debug!("Exporting GPIO pin {}", pin);
        write_attr(&root.join("export"), &pin.to_string())?;
    }
    if !dir.exists() {
        return Err(Error::Gpio(format!("pin {} did not appear after export", pin)));
    }
    Ok(dir)
}

fn write_attr(path: &Path, value: &str) -> Result<()> {
    fs::write(path, value)
        .map_err(|e| Error::Gpio(format!("write {} to {}: {}", value, path.display(), e)))
}

impl Gpio for SysfsGpio {
    fn read_switch_pin(&self) -> Result<Level> {
        let raw = fs::read_to_string(&self.switch_value)?;
        match raw.trim() {
            "0" => Ok(Level::Low),
            "1" => Ok(Level::High),
            other => Err(Error::Gpio(format!("unexpected pin value '{}'", other))),
        }
    }

    fn write_led_pin(&self, level: Level) -> Result<()> {
        let value = match level {
            Level::Low => "0",
            Level::High => "1",
        };
        write_attr(&self.led_value, value)
    }
}
