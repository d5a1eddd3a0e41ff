//! MobilePro 900/c serial packets.
//!
//! The keyboard/touchscreen controller shares one UART and sends no length
//! field and no checksum. A packet is whatever arrived before the receive
//! timeout interrupt, so it is recognised purely by its length and leading
//! byte:
//!
//! | length | lead   | meaning                          |
//! |--------|--------|----------------------------------|
//! | 1      | `0x05` | stylus lifted                    |
//! | 1      | `0x12` | a key changed, poll with `0x13`  |
//! | 5      | `0x04` | absolute touch position          |
//! | 10, 14 | `0x13` | keyboard poll reply (key matrix) |
//!
//! Anything else is dropped.

use crate::constants::*;
use crate::error::{DiscardReason, LinkError};
use crate::event::TouchSample;
use bytes::Bytes;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    TouchEnd,
    KeyNotify,
    TouchPosition(TouchSample),
    /// Key matrix bytes following the `0x13` echo
    KeyPoll(Bytes),
}

impl Packet {
    pub fn name(&self) -> &'static str {
        match self {
            Packet::TouchEnd => "touch-end",
            Packet::KeyNotify => "key-notify",
            Packet::TouchPosition(_) => "touch-position",
            Packet::KeyPoll(_) => "key-poll",
        }
    }
}

fn touch_position(bytes: &[u8]) -> TouchSample {
    let x = u16::from_be_bytes([bytes[1], bytes[2]]);
    let y = u16::from_be_bytes([bytes[3], bytes[4]]);
    TouchSample::down(x, y)
}

impl TryFrom<Bytes> for Packet {
    type Error = LinkError;

    fn try_from(mut bytes: Bytes) -> Result<Self, Self::Error> {
        let len = bytes.len();
        let Some(&lead) = bytes.first() else {
            return Err(LinkError::discard(0, DiscardReason::Empty));
        };

        match (len, lead) {
            (1, MP_TOUCH_END) => Ok(Packet::TouchEnd),
            (1, MP_KEY_NOTIFY) => Ok(Packet::KeyNotify),
            (MP_TOUCH_FRAME_SIZE, MP_TOUCH_POSITION) => Ok(Packet::TouchPosition(touch_position(&bytes))),
            (MP_SHORT_POLL_FRAME_SIZE | MP_POLL_FRAME_SIZE, MP_KEY_POLL) => {
                let matrix = bytes.split_off(1);
                Ok(Packet::KeyPoll(matrix))
            }
            (1 | MP_TOUCH_FRAME_SIZE | MP_SHORT_POLL_FRAME_SIZE | MP_POLL_FRAME_SIZE, _) => {
                Err(LinkError::discard(len, DiscardReason::UnexpectedLead))
            }
            (MP_RX_LIMIT, _) => Err(LinkError::discard(len, DiscardReason::Overlong)),
            _ => Err(LinkError::discard(len, DiscardReason::UnknownLength)),
        }
    }
}
