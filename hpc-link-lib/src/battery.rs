use crate::config::BatteryCalibration;
use crate::constants::{BATTERY_CRITICAL_PERCENT, BATTERY_FRAME_SIZE, BATTERY_LOW_PERCENT};
use crate::error::LinkError;
use crate::mcu::{Command, Mcu, McuPort, StartError};
use modular_bitfield::prelude::*;
use serde::Serialize;
use std::sync::Arc;
use strum_macros::Display;
use tracing::debug;

/// Board lines describing the power supply.
pub trait PowerSupply: Send {
    fn ac_online(&self) -> bool;
    fn charging(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum BatteryKind {
    Main,
    Backup,
}

/// High byte of the battery frame: bits 8-9 of each reading.
#[bitfield(bytes = 1)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatteryHighBits {
    pub main: B2,
    pub backup: B2,
    #[skip]
    unused: B4,
}

/// Decode a GetBatteryData response.
///
/// Wire layout: `[main low, backup low, high bits]`. Returns `None` when the
/// battery is absent: main reads `0b11` in its high bits, backup reads `0b00`.
pub fn decode_battery(frame: [u8; BATTERY_FRAME_SIZE], kind: BatteryKind) -> Option<u16> {
    let high = BatteryHighBits::from_bytes([frame[2]]);
    let (low, bits) = match kind {
        BatteryKind::Main => (frame[0], high.main()),
        BatteryKind::Backup => (frame[1], high.backup()),
    };
    let absent = match kind {
        BatteryKind::Main => bits == 0b11,
        BatteryKind::Backup => bits == 0b00,
    };
    if absent {
        return None;
    }
    Some((u16::from(bits) << 8) | u16::from(low))
}

/// The `-1` absent sentinel of the wire contract.
pub fn raw_sentinel(reading: Option<u16>) -> i32 {
    reading.map_or(-1, i32::from)
}

/// Main battery charge in percent.
///
/// Cell voltage over time is not linear, so the offset from the drained level
/// is squared before scaling. AC power lifts the voltage a little, which the
/// calibration's AC ratio takes back out. Readings above full clamp to 100.
pub fn percentage(raw: u16, ac_online: bool, calibration: &BatteryCalibration) -> u8 {
    let offset = i64::from(raw) - i64::from(calibration.min_raw);
    let mut pct = offset
        .saturating_mul(offset)
        .checked_div(calibration.divisor())
        .unwrap_or(i64::MAX);
    if ac_online {
        pct = pct
            .saturating_mul(i64::from(calibration.ac_numerator))
            .checked_div(i64::from(calibration.ac_denominator))
            .unwrap_or(pct);
    }
    pct.clamp(0, 100) as u8
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
pub enum BatteryStatus {
    NotPresent,
    Critical,
    Low,
    High,
    Charging,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PowerStatus {
    /// Main battery life in percent, `None` without a battery
    pub battery_life: Option<u8>,
    pub status: BatteryStatus,
    pub ac_online: bool,
}

impl PowerStatus {
    pub fn classify(battery_life: Option<u8>, ac_online: bool, charging: bool) -> Self {
        let status = match battery_life {
            None => BatteryStatus::NotPresent,
            Some(_) if charging => BatteryStatus::Charging,
            Some(life) if life < BATTERY_CRITICAL_PERCENT => BatteryStatus::Critical,
            Some(life) if life < BATTERY_LOW_PERCENT => BatteryStatus::Low,
            Some(_) => BatteryStatus::High,
        };
        Self {
            battery_life,
            status,
            ac_online,
        }
    }
}

/// Battery monitor on the MCU.
pub struct Battery<P, S> {
    mcu: Arc<Mcu<P>>,
    supply: S,
    calibration: BatteryCalibration,
}

impl<P: McuPort, S: PowerSupply> Battery<P, S> {
    pub fn new(mcu: Arc<Mcu<P>>, supply: S, calibration: BatteryCalibration) -> Self {
        Self {
            mcu,
            supply,
            calibration,
        }
    }

    /// Read the raw GetBatteryData response.
    pub fn read_frame(&self) -> Result<[u8; BATTERY_FRAME_SIZE], LinkError> {
        let mut transaction = self.mcu.start(Command::GetBatteryData).map_err(StartError::end)?;
        let mut frame = [0u8; BATTERY_FRAME_SIZE];
        let result = frame.iter_mut().try_for_each(|byte| {
            *byte = transaction.read()?;
            Ok::<(), LinkError>(())
        });
        transaction.end();
        result?;
        Ok(frame)
    }

    /// Raw reading for one battery, `None` when absent.
    pub fn read_raw(&self, kind: BatteryKind) -> Result<Option<u16>, LinkError> {
        let frame = self.read_frame()?;
        let reading = decode_battery(frame, kind);
        debug!(%kind, raw = raw_sentinel(reading), "battery reading");
        Ok(reading)
    }

    /// Main battery charge in percent, `None` when absent.
    pub fn main_percentage(&self) -> Result<Option<u8>, LinkError> {
        let ac_online = self.supply.ac_online();
        Ok(self
            .read_raw(BatteryKind::Main)?
            .map(|raw| percentage(raw, ac_online, &self.calibration)))
    }

    /// Backup battery level; there is no percentage model for it.
    pub fn backup_level(&self) -> Result<Option<u16>, LinkError> {
        self.read_raw(BatteryKind::Backup)
    }

    pub fn power_status(&self) -> Result<PowerStatus, LinkError> {
        let battery_life = self.main_percentage()?;
        Ok(PowerStatus::classify(
            battery_life,
            self.supply.ac_online(),
            self.supply.charging(),
        ))
    }
}
