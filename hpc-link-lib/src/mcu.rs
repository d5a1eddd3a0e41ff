//! Jornada 720 MCU transaction bracket.
//!
//! The MCU sits on a half-duplex synchronous serial link. Every exchange
//! clocks one byte out and one byte in, least significant bit first on the
//! wire, so both directions go through [`reverse`]. A conversation is
//! bracketed by [`Mcu::start`] and [`Transaction::end`]: the bracket holds the
//! link lock and keeps the MCU enable line asserted.
//!
//! WARNING: every `start()` needs a matching `end()`, including a `start()`
//! that failed. A failed start hands the open transaction back inside
//! [`StartError`] for exactly that reason.

use crate::config::McuConfig;
use crate::constants::{MCU_ERROR_CODE, MCU_TX_DUMMY};
use crate::error::LinkError;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use strum_macros::Display;
use tracing::{debug, info, trace, warn};

/// Hardware behind the MCU link.
pub trait McuPort: Send {
    /// Whether the MCU is ready to clock the next byte.
    fn ready(&mut self) -> bool;

    /// Exchange one raw wire byte, full duplex.
    fn transfer(&mut self, byte: u8) -> u8;

    /// Drive the MCU enable line. Asserted means the MCU listens.
    fn set_enable(&mut self, asserted: bool);
}

/// MCU command opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum Command {
    GetBatteryData = 0xC0,
    GetScanKeyCode = 0x90,
    GetTouchSamples = 0xA0,
    GetContrast = 0xD0,
    SetContrast = 0xD1,
    GetBrightness = 0xD2,
    SetBrightness = 0xD3,
    ContrastOff = 0xD8,
    BrightnessOff = 0xD9,
    PwmOff = 0xDF,
    TxDummy = 0x11,
}

/// Reverse the bit order of a byte (`ghijklmn` becomes `nmlkjihg`).
pub const fn reverse(byte: u8) -> u8 {
    byte.reverse_bits()
}

/// One MCU link with its exclusive transaction lock.
pub struct Mcu<P> {
    port: Mutex<P>,
    config: McuConfig,
}

impl<P: McuPort> Mcu<P> {
    pub fn new(port: P) -> Self {
        Self::with_config(port, McuConfig::default())
    }

    pub fn with_config(mut port: P, config: McuConfig) -> Self {
        // no data wanted until the first transaction
        port.set_enable(false);
        Self {
            port: Mutex::new(port),
            config,
        }
    }

    pub fn config(&self) -> &McuConfig {
        &self.config
    }

    /// Open a transaction with `command`.
    ///
    /// Blocks until no other transaction is open. On failure the transaction
    /// is still open and must be ended through [`StartError::end`].
    pub fn start(&self, command: Command) -> Result<Transaction<'_, P>, StartError<'_, P>> {
        let mut guard = self.port.lock().unwrap_or_else(PoisonError::into_inner);
        guard.set_enable(true);

        let mut transaction = Transaction {
            port: guard,
            config: &self.config,
            open: true,
        };

        let first = match transaction.write(command.into()) {
            Ok(byte) => byte,
            Err(error) => return Err(StartError { error, transaction }),
        };
        if first == MCU_TX_DUMMY {
            trace!(%command, "MCU transaction started");
            return Ok(transaction);
        }

        warn!(%command, first, "Leftover MCU data, flushing");
        let mut drained = 0;
        while drained < self.config.drain_limit {
            if transaction.read().is_err() {
                break;
            }
            drained += 1;
        }
        Err(StartError {
            error: LinkError::ProtocolDesync { first, drained },
            transaction,
        })
    }

    /// Check that the MCU answers at all.
    pub fn probe(&self) -> Result<(), LinkError> {
        let mut transaction = self.start(Command::GetBrightness).map_err(StartError::end)?;
        let result = transaction.read();
        transaction.end();
        let brightness = result?;
        info!(brightness, "MCU present");
        Ok(())
    }

    pub fn into_inner(self) -> P {
        self.port.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

/// An open MCU bracket. Holds the link lock until [`Transaction::end`].
pub struct Transaction<'a, P: McuPort> {
    port: MutexGuard<'a, P>,
    config: &'a McuConfig,
    open: bool,
}

impl<P: McuPort> Transaction<'_, P> {
    /// Exchange one byte after waiting for the ready line.
    pub fn write(&mut self, byte: u8) -> Result<u8, LinkError> {
        let mut polls = self.config.ready_timeout;
        while !self.port.ready() {
            polls = polls.saturating_sub(1);
            if polls == 0 {
                warn!(byte, "MCU ready wait timed out");
                return Err(LinkError::Timeout {
                    polls: self.config.ready_timeout,
                });
            }
            std::hint::spin_loop();
        }

        let reply = reverse(self.port.transfer(reverse(byte)));
        trace!(sent = byte, reply, "MCU exchange");
        Ok(reply)
    }

    /// Read one response byte.
    pub fn read(&mut self) -> Result<u8, LinkError> {
        self.write(MCU_TX_DUMMY)
    }

    /// Send a command parameter; the MCU must acknowledge with the dummy byte.
    pub fn send_parameter(&mut self, value: u8) -> Result<(), LinkError> {
        let ack = self.write(value)?;
        if ack != MCU_TX_DUMMY {
            if ack == MCU_ERROR_CODE {
                debug!(value, "MCU reported an error for parameter");
            } else {
                debug!(value, ack, "MCU rejected parameter");
            }
            return Err(LinkError::ProtocolError {
                expected: MCU_TX_DUMMY,
                actual: ack,
            });
        }
        Ok(())
    }

    /// Close the bracket: deassert enable and release the lock.
    pub fn end(mut self) {
        self.close();
    }

    fn close(&mut self) {
        if self.open {
            self.port.set_enable(false);
            self.open = false;
        }
    }
}

impl<P: McuPort> Drop for Transaction<'_, P> {
    fn drop(&mut self) {
        if self.open {
            warn!("MCU transaction dropped without end()");
            self.close();
        }
    }
}

impl<P: McuPort> fmt::Debug for Transaction<'_, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction").field("open", &self.open).finish_non_exhaustive()
    }
}

/// A failed [`Mcu::start`]. The bracket is still open.
pub struct StartError<'a, P: McuPort> {
    pub error: LinkError,
    transaction: Transaction<'a, P>,
}

impl<'a, P: McuPort> StartError<'a, P> {
    /// End the still-open transaction and return the failure.
    pub fn end(self) -> LinkError {
        self.transaction.end();
        self.error
    }

    /// Keep talking on the open bracket anyway.
    pub fn into_parts(self) -> (Transaction<'a, P>, LinkError) {
        (self.transaction, self.error)
    }
}

impl<P: McuPort> fmt::Debug for StartError<'_, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StartError")
            .field("error", &self.error)
            .field("transaction", &self.transaction)
            .finish()
    }
}
