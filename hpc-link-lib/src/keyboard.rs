use crate::error::LinkError;
use crate::event::KeyEvent;
use crate::keymap::{self, Keymap};
use crate::mcu::{Command, Mcu, McuPort, Transaction};
use std::sync::Arc;
use tracing::{trace, warn};

/// Scan codes above this value report a release of `code - 128`.
const RELEASE_OFFSET: u8 = 128;

/// Translate one MCU scan code into a key event.
pub fn scan_code_event(code: u8, keymap: &Keymap) -> Option<KeyEvent> {
    let (index, pressed) = if code > RELEASE_OFFSET {
        (code - RELEASE_OFFSET, false)
    } else {
        (code, true)
    };
    let key = keymap.get(index)?;
    Some(KeyEvent { code: key, pressed })
}

/// Jornada 720 keyboard behind the MCU.
pub struct Keyboard<P> {
    mcu: Arc<Mcu<P>>,
    keymap: &'static Keymap,
}

impl<P: McuPort> Keyboard<P> {
    pub fn new(mcu: Arc<Mcu<P>>) -> Self {
        Self {
            mcu,
            keymap: &keymap::JORNADA720,
        }
    }

    pub fn keymap(&self) -> &'static Keymap {
        self.keymap
    }

    /// Fetch pending key events. Call when the keyboard interrupt fires.
    ///
    /// Fails only when nothing could be read; a read that stops partway
    /// returns the events decoded so far.
    pub fn scan(&self) -> Result<Vec<KeyEvent>, LinkError> {
        let mut transaction = self
            .mcu
            .start(Command::GetScanKeyCode)
            .map_err(|failed| {
                warn!("GetScanKeyCode failed");
                failed.end()
            })?;
        let result = read_scan_codes(&mut transaction);
        transaction.end();

        let codes = result?;
        Ok(codes
            .into_iter()
            .filter_map(|code| {
                let event = scan_code_event(code, self.keymap);
                if event.is_none() {
                    trace!(code, "unmapped scan code");
                }
                event
            })
            .collect())
    }
}

/// Codes already clocked out of the MCU are kept when a later read fails.
fn read_scan_codes<P: McuPort>(transaction: &mut Transaction<'_, P>) -> Result<Vec<u8>, LinkError> {
    let count = transaction.read()?;
    let mut codes = Vec::with_capacity(usize::from(count));
    for _ in 0..count {
        match transaction.read() {
            Ok(code) => codes.push(code),
            Err(err) => {
                warn!(%err, read = codes.len(), count, "scan code read cut short");
                break;
            }
        }
    }
    Ok(codes)
}
