//! Runtime configuration.
//!
//! Every field defaults to the value the hardware was characterised with, so
//! an empty JSON object is a valid configuration.

use crate::constants::*;
use crate::error::LinkError;
use crate::keymap::{self, Keymap};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct McuConfig {
    /// Ready-line polls before a byte exchange times out
    pub ready_timeout: u32,
    /// Reads spent draining leftover data on a desynchronised start
    pub drain_limit: usize,
}

impl Default for McuConfig {
    fn default() -> Self {
        Self {
            ready_timeout: MCU_READY_TIMEOUT,
            drain_limit: MCU_DRAIN_LIMIT,
        }
    }
}

/// Main battery calibration for the percentage model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatteryCalibration {
    /// Raw reading of a drained battery
    pub min_raw: i32,
    /// Raw reading of a full battery without AC power
    pub max_raw: i32,
    pub ac_numerator: i32,
    pub ac_denominator: i32,
}

impl Default for BatteryCalibration {
    fn default() -> Self {
        Self {
            min_raw: MAIN_BATTERY_MIN_RAW,
            max_raw: MAIN_BATTERY_MAX_RAW,
            ac_numerator: MAIN_BATTERY_AC_NUMERATOR,
            ac_denominator: MAIN_BATTERY_AC_DENOMINATOR,
        }
    }
}

impl BatteryCalibration {
    pub fn span(&self) -> i64 {
        i64::from(self.max_raw) - i64::from(self.min_raw)
    }

    /// Squared span scaled so that a full battery lands on 100.
    pub fn divisor(&self) -> i64 {
        let span = self.span();
        span.saturating_mul(span) / 100
    }
}

/// Which MobilePro table the framer maps scancodes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeymapKind {
    #[default]
    FunctionKeys,
    Special,
}

impl KeymapKind {
    pub fn keymap(&self) -> &'static Keymap {
        match self {
            KeymapKind::FunctionKeys => &keymap::MOBILEPRO,
            KeymapKind::Special => &keymap::MOBILEPRO_SPECIAL,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FramerConfig {
    pub poll_delay_ms: u64,
    pub overrun_poll_delay_ms: u64,
    pub keymap: KeymapKind,
}

impl Default for FramerConfig {
    fn default() -> Self {
        Self {
            poll_delay_ms: MP_POLL_DELAY_MS,
            overrun_poll_delay_ms: MP_OVERRUN_POLL_DELAY_MS,
            keymap: KeymapKind::default(),
        }
    }
}

impl FramerConfig {
    pub fn poll_delay(&self) -> Duration {
        Duration::from_millis(self.poll_delay_ms)
    }

    pub fn overrun_poll_delay(&self) -> Duration {
        Duration::from_millis(self.overrun_poll_delay_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    pub mcu: McuConfig,
    pub battery: BatteryCalibration,
    pub framer: FramerConfig,
}

impl LinkConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json(text: &str) -> Result<Self, LinkError> {
        let config: LinkConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), LinkError> {
        if self.mcu.ready_timeout == 0 {
            return Err(LinkError::Config("mcu.ready_timeout must be non-zero".to_string()));
        }
        if self.battery.max_raw <= self.battery.min_raw {
            return Err(LinkError::Config(format!(
                "battery.max_raw ({}) must exceed battery.min_raw ({})",
                self.battery.max_raw, self.battery.min_raw
            )));
        }
        if self.battery.span().checked_mul(self.battery.span()).is_none() {
            return Err(LinkError::Config(format!(
                "battery calibration span {} is too large",
                self.battery.span()
            )));
        }
        if self.battery.divisor() == 0 {
            return Err(LinkError::Config("battery calibration span is too small".to_string()));
        }
        if self.battery.ac_denominator == 0 {
            return Err(LinkError::Config("battery.ac_denominator must be non-zero".to_string()));
        }
        Ok(())
    }
}
