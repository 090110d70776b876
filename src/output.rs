//! Output pin drivers.
//!
//! The control loop only ever writes a level; it never reads the pin back.
//! Hardware resources are released through [`DriverGuard`], which runs
//! [`OutputDriver::cleanup`] exactly once when it goes out of scope.

use crate::config::{DriverKind, OutputConfig};
use crate::error::{Result, SyncError};
use log::info;
use rppal::gpio::{Gpio, OutputPin};
use std::ops::{Deref, DerefMut};

/// A single digital output.
pub trait OutputDriver: Send {
    /// BCM number of the driven pin.
    fn pin(&self) -> u8;

    /// Drive the pin high (`true`) or low (`false`). Idempotent.
    fn set_level(&mut self, on: bool) -> Result<()>;

    /// Release platform resources tied to the pin.
    fn cleanup(&mut self);
}

impl<D: OutputDriver + ?Sized> OutputDriver for Box<D> {
    fn pin(&self) -> u8 {
        (**self).pin()
    }

    fn set_level(&mut self, on: bool) -> Result<()> {
        (**self).set_level(on)
    }

    fn cleanup(&mut self) {
        (**self).cleanup()
    }
}

/// Open the driver selected by configuration.
pub fn open(config: &OutputConfig) -> Result<Box<dyn OutputDriver>> {
    match config.driver {
        DriverKind::Gpio => Ok(Box::new(GpioOutput::new(config.pin)?)),
        DriverKind::Simulated => Ok(Box::new(SimulatedOutput::new(config.pin))),
    }
}

/// Raspberry Pi GPIO pin configured as an output.
pub struct GpioOutput {
    number: u8,
    pin: Option<OutputPin>,
}

impl GpioOutput {
    /// Claim `number` as an output, initially low.
    pub fn new(number: u8) -> Result<Self> {
        let mut pin = Gpio::new()?.get(number)?.into_output_low();
        // Restore the pin's original mode when released.
        pin.set_reset_on_drop(true);
        info!("GPIO pin {} configured as output", number);
        Ok(Self {
            number,
            pin: Some(pin),
        })
    }
}

impl OutputDriver for GpioOutput {
    fn pin(&self) -> u8 {
        self.number
    }

    fn set_level(&mut self, on: bool) -> Result<()> {
        let pin = self.pin.as_mut().ok_or_else(|| {
            SyncError::Output(format!("GPIO pin {} already released", self.number))
        })?;
        if on {
            pin.set_high();
        } else {
            pin.set_low();
        }
        Ok(())
    }

    fn cleanup(&mut self) {
        if let Some(pin) = self.pin.take() {
            drop(pin);
            info!("GPIO pin {} released", self.number);
        }
    }
}

/// Stand-in driver for hosts without GPIO hardware. Logs every write.
#[derive(Debug)]
pub struct SimulatedOutput {
    number: u8,
    level: Option<bool>,
    released: bool,
}

impl SimulatedOutput {
    pub fn new(number: u8) -> Self {
        info!("[Sim] Simulating output pin {}", number);
        Self {
            number,
            level: None,
            released: false,
        }
    }

    /// Last level written, `None` before the first write.
    pub fn level(&self) -> Option<bool> {
        self.level
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl OutputDriver for SimulatedOutput {
    fn pin(&self) -> u8 {
        self.number
    }

    fn set_level(&mut self, on: bool) -> Result<()> {
        if self.released {
            return Err(SyncError::Output(format!(
                "simulated pin {} already released",
                self.number
            )));
        }
        info!(
            "[Sim] Pin {} set {}",
            self.number,
            if on { "high" } else { "low" }
        );
        self.level = Some(on);
        Ok(())
    }

    fn cleanup(&mut self) {
        self.released = true;
        info!("[Sim] Pin {} released", self.number);
    }
}

/// Owns a driver and cleans it up exactly once when dropped.
///
/// Drop also runs while unwinding, so a panic in the control loop still
/// releases the pin.
pub struct DriverGuard<D: OutputDriver> {
    driver: D,
}

impl<D: OutputDriver> DriverGuard<D> {
    pub fn new(driver: D) -> Self {
        Self { driver }
    }
}

impl<D: OutputDriver> Deref for DriverGuard<D> {
    type Target = D;

    fn deref(&self) -> &D {
        &self.driver
    }
}

impl<D: OutputDriver> DerefMut for DriverGuard<D> {
    fn deref_mut(&mut self) -> &mut D {
        &mut self.driver
    }
}

impl<D: OutputDriver> Drop for DriverGuard<D> {
    fn drop(&mut self) {
        self.driver.cleanup();
    }
}
