// Wire constants for the Jornada 720 MCU and the MobilePro 900/c serial link

/// Byte the MCU answers with when it has nothing else to say
pub const MCU_TX_DUMMY: u8 = 0x11;

/// Byte the MCU answers with after a failed command
pub const MCU_ERROR_CODE: u8 = 0x00;

/// Ready-line polls before a byte exchange gives up
pub const MCU_READY_TIMEOUT: u32 = 400_000;

/// Reads spent flushing leftover data after a desynchronised start
pub const MCU_DRAIN_LIMIT: usize = 256;

/// Bytes returned by GetBatteryData
pub const BATTERY_FRAME_SIZE: usize = 3;

/// Bytes returned by GetTouchSamples
pub const TOUCH_FRAME_SIZE: usize = 8;

/// Main battery calibration, raw units
pub const MAIN_BATTERY_MIN_RAW: i32 = 430;
pub const MAIN_BATTERY_MAX_RAW: i32 = 670;

/// Voltage correction applied while on AC power (numerator / denominator)
pub const MAIN_BATTERY_AC_NUMERATOR: i32 = 100;
pub const MAIN_BATTERY_AC_DENOMINATOR: i32 = 105;

/// Battery life thresholds for power status, percent
pub const BATTERY_LOW_PERCENT: u8 = 30;
pub const BATTERY_CRITICAL_PERCENT: u8 = 5;

pub const BACKLIGHT_MAX_BRIGHTNESS: u8 = 0xFF;
pub const BACKLIGHT_DEFAULT_BRIGHTNESS: u8 = 0x19;
pub const LCD_MAX_CONTRAST: u8 = 0xFF;
pub const LCD_DEFAULT_CONTRAST: u8 = 0x80;

/// MobilePro: single byte sent when any key changes state
pub const MP_KEY_NOTIFY: u8 = 0x12;

/// MobilePro: keyboard poll command, echoed as the first byte of the reply
pub const MP_KEY_POLL: u8 = 0x13;

/// MobilePro: leading byte of an absolute touch position
pub const MP_TOUCH_POSITION: u8 = 0x04;

/// MobilePro: single byte sent when the stylus is lifted
pub const MP_TOUCH_END: u8 = 0x05;

/// MobilePro: tells the controller it may transmit again
pub const MP_CLEAR_TO_SEND: u8 = 0x01;

/// Receive buffer cap per interrupt episode
pub const MP_RX_LIMIT: usize = 15;

pub const MP_TOUCH_FRAME_SIZE: usize = 5;
pub const MP_POLL_FRAME_SIZE: usize = 14;
/// Shorter poll reply seen on the Axim X30 variant of the controller
pub const MP_SHORT_POLL_FRAME_SIZE: usize = 10;

/// Size of the key matrix state (poll frame minus its leading echo byte)
pub const MP_MATRIX_SIZE: usize = MP_POLL_FRAME_SIZE - 1;

/// Poll replies with more changed bits than this are treated as line noise
pub const MP_MAX_KEY_CHANGES: usize = 5;

/// Delay before a deferred keyboard poll, milliseconds
pub const MP_POLL_DELAY_MS: u64 = 20;

/// Delay before the recovery poll after a FIFO overrun, milliseconds
pub const MP_OVERRUN_POLL_DELAY_MS: u64 = 40;

/// Absolute axis ranges reported to input consumers
pub const JORNADA_TOUCH_X: AxisRange = AxisRange { min: 270, max: 3900 };
pub const JORNADA_TOUCH_Y: AxisRange = AxisRange { min: 180, max: 3700 };
pub const MOBILEPRO_TOUCH_X: AxisRange = AxisRange { min: 32, max: 1004 };
pub const MOBILEPRO_TOUCH_Y: AxisRange = AxisRange { min: 96, max: 792 };

pub const JORNADA_KEYBOARD_NAME: &str = "Jornada 720 keyboard";
pub const JORNADA_TOUCH_NAME: &str = "Jornada 720 touchscreen";
pub const MOBILEPRO_KEYBOARD_NAME: &str = "MobilePro900/c keyboard";
pub const MOBILEPRO_TOUCH_NAME: &str = "MobilePro900/c touchscreen";

/// Inclusive range of an absolute touch axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisRange {
    pub min: u16,
    pub max: u16,
}

impl AxisRange {
    pub fn contains(&self, value: u16) -> bool {
        (self.min..=self.max).contains(&value)
    }
}
