//! MobilePro key matrix delta decoder.
//!
//! A poll reply carries one bit per key, 1 meaning up, so an idle keyboard
//! reads all `0xFF`. Each reply is compared with the last accepted one and
//! every flipped bit becomes a scancode: bit `j` of matrix byte `i` (1-based,
//! counting after the `0x13` echo) is scancode `j * 16 + i + 1`, plus 128
//! when the bit is now set (released).

use crate::constants::{MP_MATRIX_SIZE, MP_MAX_KEY_CHANGES};
use crate::error::{DiscardReason, LinkError};
use crate::event::KeyEvent;
use crate::keymap::Keymap;
use std::fmt;
use tracing::debug;

const RELEASE_BIT: u8 = 0x80;

/// A raw matrix scancode with its release bit.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ScanCode(pub u8);

impl ScanCode {
    fn new(bit: usize, byte: usize, released: bool) -> Self {
        // at most 7 * 16 + 13 + 1, always below the release bit
        let code = (bit * 16 + byte + 1) as u8;
        if released {
            ScanCode(code | RELEASE_BIT)
        } else {
            ScanCode(code)
        }
    }

    /// Keymap index with the release bit stripped.
    pub fn index(&self) -> u8 {
        self.0 & !RELEASE_BIT
    }

    pub fn is_release(&self) -> bool {
        self.0 & RELEASE_BIT != 0
    }

    pub fn to_event(self, keymap: &Keymap) -> Option<KeyEvent> {
        keymap.get(self.index()).map(|code| KeyEvent {
            code,
            pressed: !self.is_release(),
        })
    }
}

impl fmt::Debug for ScanCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ScanCode({}{})", self.index(), if self.is_release() { " up" } else { "" })
    }
}

/// Result of one accepted poll reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatrixUpdate {
    /// Changes in the order they were found
    pub codes: Vec<ScanCode>,
    /// Every key in the reply reads up
    pub all_released: bool,
}

/// Last accepted key matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMatrix {
    last: [u8; MP_MATRIX_SIZE],
}

impl Default for KeyMatrix {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyMatrix {
    pub fn new() -> Self {
        Self {
            last: [0xFF; MP_MATRIX_SIZE],
        }
    }

    pub fn state(&self) -> &[u8; MP_MATRIX_SIZE] {
        &self.last
    }

    /// Diff a poll reply (matrix bytes only) against the stored state.
    ///
    /// More than five changes in one reply is treated as noise: nothing is
    /// emitted and the stored state is left alone.
    pub fn decode(&mut self, matrix: &[u8]) -> Result<MatrixUpdate, LinkError> {
        let frame_len = matrix.len() + 1;
        if matrix.is_empty() || matrix.len() > MP_MATRIX_SIZE {
            return Err(LinkError::discard(frame_len, DiscardReason::UnknownLength));
        }

        let mut codes = Vec::new();
        for (offset, (&current, &last)) in matrix.iter().zip(self.last.iter()).enumerate() {
            let byte = offset + 1;
            let mut delta = current ^ last;
            while delta != 0 {
                let bit = delta.trailing_zeros() as usize;
                codes.push(ScanCode::new(bit, byte, current & (1 << bit) != 0));
                delta &= delta - 1;
            }
        }

        if codes.len() > MP_MAX_KEY_CHANGES {
            debug!(changes = codes.len(), "dropping noisy key matrix");
            return Err(LinkError::discard(frame_len, DiscardReason::Noise));
        }

        self.last[..matrix.len()].copy_from_slice(matrix);
        let all_released = matrix.iter().all(|&byte| byte == 0xFF);
        Ok(MatrixUpdate { codes, all_released })
    }
}
