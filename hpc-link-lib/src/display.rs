//! Backlight and LCD contrast control through the MCU.
//!
//! Panel power itself is switched by board lines outside the MCU; the
//! [`PowerLine`] trait stands in for them.

use crate::constants::{BACKLIGHT_DEFAULT_BRIGHTNESS, BACKLIGHT_MAX_BRIGHTNESS, LCD_DEFAULT_CONTRAST, LCD_MAX_CONTRAST};
use crate::error::LinkError;
use crate::mcu::{Command, Mcu, McuPort};
use std::sync::Arc;
use tracing::{debug, warn};

/// A single on/off board line.
pub trait PowerLine: Send {
    fn is_on(&self) -> bool;
    fn set(&mut self, on: bool);
}

fn get_value<P: McuPort>(mcu: &Mcu<P>, command: Command) -> Result<u8, LinkError> {
    let mut transaction = mcu.start(command).map_err(|failed| {
        warn!(%command, "MCU get failed");
        failed.end()
    })?;
    let result = transaction.read();
    transaction.end();
    result
}

fn set_value<P: McuPort>(mcu: &Mcu<P>, command: Command, value: u8) -> Result<(), LinkError> {
    let mut transaction = mcu.start(command).map_err(|failed| {
        warn!(%command, "MCU set failed");
        failed.end()
    })?;
    let result = transaction.send_parameter(value);
    transaction.end();
    result
}

/// Backlight PWM. The MCU counts brightness downwards; this API counts up.
pub struct Backlight<P, L> {
    mcu: Arc<Mcu<P>>,
    line: L,
}

impl<P: McuPort, L: PowerLine> Backlight<P, L> {
    pub fn new(mcu: Arc<Mcu<P>>, line: L) -> Self {
        Self { mcu, line }
    }

    pub fn max_brightness(&self) -> u8 {
        BACKLIGHT_MAX_BRIGHTNESS
    }

    /// Power the backlight at the default brightness.
    pub fn init(&mut self) -> Result<(), LinkError> {
        self.set_brightness(BACKLIGHT_DEFAULT_BRIGHTNESS)
    }

    pub fn is_on(&self) -> bool {
        self.line.is_on()
    }

    /// Current brightness; 0 while the backlight is unpowered.
    pub fn brightness(&self) -> Result<u8, LinkError> {
        if !self.line.is_on() {
            return Ok(0);
        }
        let raw = get_value(&self.mcu, Command::GetBrightness)?;
        Ok(BACKLIGHT_MAX_BRIGHTNESS - raw)
    }

    /// Power the backlight and set its brightness.
    pub fn set_brightness(&mut self, brightness: u8) -> Result<(), LinkError> {
        self.line.set(true);
        set_value(&self.mcu, Command::SetBrightness, BACKLIGHT_MAX_BRIGHTNESS - brightness)?;
        debug!(brightness, "backlight brightness set");
        Ok(())
    }

    /// Stop the PWM and cut backlight power.
    pub fn power_off(&mut self) -> Result<(), LinkError> {
        let transaction = self.mcu.start(Command::BrightnessOff);
        self.line.set(false);
        match transaction {
            Ok(transaction) => {
                transaction.end();
                Ok(())
            }
            Err(failed) => {
                warn!("BrightnessOff failed");
                Err(failed.end())
            }
        }
    }
}

/// LCD panel contrast and power.
pub struct Lcd<P, L> {
    mcu: Arc<Mcu<P>>,
    line: L,
}

impl<P: McuPort, L: PowerLine> Lcd<P, L> {
    pub fn new(mcu: Arc<Mcu<P>>, line: L) -> Self {
        Self { mcu, line }
    }

    pub fn max_contrast(&self) -> u8 {
        LCD_MAX_CONTRAST
    }

    /// Apply the default contrast and power the panel.
    pub fn init(&mut self) -> Result<(), LinkError> {
        self.set_contrast(LCD_DEFAULT_CONTRAST)?;
        self.set_power(true);
        Ok(())
    }

    pub fn is_powered(&self) -> bool {
        self.line.is_on()
    }

    pub fn set_power(&mut self, on: bool) {
        self.line.set(on);
    }

    /// Current contrast; 0 while the panel is unpowered.
    pub fn contrast(&self) -> Result<u8, LinkError> {
        if !self.line.is_on() {
            return Ok(0);
        }
        get_value(&self.mcu, Command::GetContrast)
    }

    pub fn set_contrast(&mut self, contrast: u8) -> Result<(), LinkError> {
        set_value(&self.mcu, Command::SetContrast, contrast)
    }
}
