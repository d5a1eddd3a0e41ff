use crate::constants::TOUCH_FRAME_SIZE;
use crate::error::LinkError;
use crate::event::TouchSample;
use crate::mcu::{Command, Mcu, McuPort, StartError};
use modular_bitfield::prelude::*;
use std::sync::Arc;
use tracing::trace;

/// Pen detect line of the touchscreen.
pub trait PenDetect: Send {
    fn pen_down(&self) -> bool;
}

/// High byte of one axis: bits 8-9 of each of the three samples.
#[bitfield(bytes = 1)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleHighBits {
    pub first: B2,
    pub second: B2,
    pub third: B2,
    #[skip]
    unused: B2,
}

fn axis(low: [u8; 3], high: u8) -> u16 {
    let high = SampleHighBits::from_bytes([high]);
    let samples = [
        u16::from(low[0]) | (u16::from(high.first()) << 8),
        u16::from(low[1]) | (u16::from(high.second()) << 8),
        u16::from(low[2]) | (u16::from(high.third()) << 8),
    ];
    samples.iter().sum::<u16>() / 3
}

/// Decode a GetTouchSamples response into one averaged position.
///
/// The MCU returns the three X low bytes, the three Y low bytes, then the X
/// and Y high bytes last (HP's documentation lists them out of order).
pub fn decode_samples(frame: [u8; TOUCH_FRAME_SIZE]) -> TouchSample {
    let x = axis([frame[0], frame[1], frame[2]], frame[6]);
    let y = axis([frame[3], frame[4], frame[5]], frame[7]);
    TouchSample::down(x, y)
}

/// Jornada 720 touchscreen behind the MCU.
pub struct Touchscreen<P, D> {
    mcu: Arc<Mcu<P>>,
    pen: D,
}

impl<P: McuPort, D: PenDetect> Touchscreen<P, D> {
    pub fn new(mcu: Arc<Mcu<P>>, pen: D) -> Self {
        Self { mcu, pen }
    }

    /// Sample the touchscreen. Call when the pen interrupt fires.
    pub fn sample(&self) -> Result<TouchSample, LinkError> {
        if !self.pen.pen_down() {
            return Ok(TouchSample::lifted());
        }

        let mut transaction = self.mcu.start(Command::GetTouchSamples).map_err(StartError::end)?;
        let mut frame = [0u8; TOUCH_FRAME_SIZE];
        let result = frame.iter_mut().try_for_each(|byte| {
            *byte = transaction.read()?;
            Ok::<(), LinkError>(())
        });
        transaction.end();
        result?;

        let sample = decode_samples(frame);
        trace!(x = sample.x, y = sample.y, "touch sample");
        Ok(sample)
    }
}
