//! MobilePro 900/c keyboard and touchscreen link.
//!
//! The controller only says *that* a key changed (`0x12`); the host then polls
//! with `0x13` and keeps polling while any key is held. Polls go out from a
//! deferred task so the receive path never waits on the UART transmitter.

use crate::config::FramerConfig;
use crate::constants::*;
use crate::error::{DiscardReason, LinkError};
use crate::event::{InputEvent, TouchSample};
use crate::keymap::Keymap;
use crate::matrix::KeyMatrix;
use crate::packet::Packet;
use bytes::{BufMut, BytesMut};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error, trace, warn};

/// The UART the controller is wired to.
pub trait SerialPort: Send {
    /// Receive FIFO overflowed since the last check.
    fn overrun(&mut self) -> bool;
    fn flush_rx(&mut self);
    /// Next byte from the receive FIFO, `None` once it is empty.
    fn read_byte(&mut self) -> Option<u8>;
    fn write_byte(&mut self, byte: u8);
    /// Flow control towards the controller.
    fn set_rts(&mut self, asserted: bool);
    /// Stop receive interrupts for good.
    fn disable_receive(&mut self);
}

struct FramerState {
    matrix: KeyMatrix,
    /// A key is held or a poll is on its way
    keydown: bool,
    exiting: bool,
    poll: Option<JoinHandle<()>>,
}

pub struct Framer<S> {
    port: Arc<Mutex<S>>,
    state: Arc<Mutex<FramerState>>,
    runtime: Handle,
    config: FramerConfig,
    keymap: &'static Keymap,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<S: SerialPort + 'static> Framer<S> {
    /// Deferred polls are spawned on `runtime`.
    pub fn new(port: S, config: FramerConfig, runtime: Handle) -> Self {
        Self {
            port: Arc::new(Mutex::new(port)),
            state: Arc::new(Mutex::new(FramerState {
                matrix: KeyMatrix::new(),
                keydown: false,
                exiting: false,
                poll: None,
            })),
            runtime,
            keymap: config.keymap.keymap(),
            config,
        }
    }

    /// Open flow control and tell the controller it may transmit.
    pub fn start(&self) {
        let mut port = lock(&self.port);
        port.set_rts(true);
        port.write_byte(MP_CLEAR_TO_SEND);
        debug!(keymap = self.keymap.name(), "MobilePro link started");
    }

    pub fn keymap(&self) -> &'static Keymap {
        self.keymap
    }

    /// Whether a key is held (or a poll for one is pending).
    pub fn key_held(&self) -> bool {
        lock(&self.state).keydown
    }

    pub fn poll_pending(&self) -> bool {
        lock(&self.state)
            .poll
            .as_ref()
            .is_some_and(|poll| !poll.is_finished())
    }

    pub fn matrix(&self) -> KeyMatrix {
        lock(&self.state).matrix.clone()
    }

    /// Handle one receive-timeout interrupt: drain the FIFO and decode it.
    pub fn handle_interrupt(&self) -> Vec<InputEvent> {
        let mut port = lock(&self.port);
        port.set_rts(false);

        if port.overrun() {
            port.flush_rx();
            error!("receive FIFO overrun");
            let mut state = lock(&self.state);
            self.schedule_poll(&mut state, self.config.overrun_poll_delay());
            port.set_rts(true);
            return Vec::new();
        }

        let mut buffer = BytesMut::with_capacity(MP_RX_LIMIT);
        while buffer.len() < MP_RX_LIMIT {
            match port.read_byte() {
                Some(byte) => buffer.put_u8(byte),
                None => break,
            }
        }
        trace!(bytes = ?&buffer[..], "receive episode");

        let events = self.dispatch(&mut port, buffer.freeze());
        port.set_rts(true);
        events
    }

    fn dispatch(&self, port: &mut S, frame: bytes::Bytes) -> Vec<InputEvent> {
        let lead = frame.first().copied();
        let mut state = lock(&self.state);

        match Packet::try_from(frame) {
            Ok(Packet::TouchEnd) => {
                port.write_byte(MP_CLEAR_TO_SEND);
                vec![InputEvent::Touch(TouchSample::lifted())]
            }
            Ok(Packet::KeyNotify) => {
                if !state.keydown {
                    state.keydown = true;
                    self.schedule_poll(&mut state, self.config.poll_delay());
                }
                Vec::new()
            }
            Ok(Packet::TouchPosition(sample)) => vec![InputEvent::Touch(sample)],
            Ok(Packet::KeyPoll(matrix)) => {
                let events = match state.matrix.decode(&matrix) {
                    Ok(update) => {
                        state.keydown = !update.all_released;
                        update
                            .codes
                            .into_iter()
                            .filter_map(|code| code.to_event(self.keymap))
                            .map(InputEvent::Key)
                            .collect()
                    }
                    Err(err) => {
                        // keys may still be down under the noise
                        debug!(%err, "key poll dropped");
                        state.keydown = true;
                        Vec::new()
                    }
                };
                if state.keydown {
                    self.schedule_poll(&mut state, self.config.poll_delay());
                }
                events
            }
            Err(LinkError::FramingDiscard {
                len,
                reason: DiscardReason::Overlong,
            }) => {
                error!(len, lead = ?lead, "unsupported packet size");
                Vec::new()
            }
            Err(LinkError::FramingDiscard {
                len,
                reason: reason @ (DiscardReason::UnknownLength | DiscardReason::Empty),
            }) => {
                port.write_byte(MP_CLEAR_TO_SEND);
                if state.keydown {
                    self.schedule_poll(&mut state, self.config.poll_delay());
                } else {
                    warn!(len, lead = ?lead, %reason, "dropping frame");
                }
                Vec::new()
            }
            Err(err) => {
                debug!(%err, lead = ?lead, "dropping frame");
                Vec::new()
            }
        }
    }

    fn schedule_poll(&self, state: &mut FramerState, delay: Duration) {
        if state.exiting {
            return;
        }
        if state.poll.as_ref().is_some_and(|poll| !poll.is_finished()) {
            trace!("poll already pending");
            return;
        }

        let port = Arc::clone(&self.port);
        let shared = Arc::clone(&self.state);
        state.poll = Some(self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            let mut port = lock(&port);
            {
                // cleared before the poll goes out so its reply can re-arm
                let mut state = lock(&shared);
                state.poll = None;
                if state.exiting {
                    return;
                }
            }
            port.write_byte(MP_KEY_POLL);
            trace!("key poll sent");
        }));
    }

    /// Stop the link. No poll is sent once this returns.
    pub async fn shutdown(&self) {
        let pending = {
            let mut state = lock(&self.state);
            state.exiting = true;
            state.poll.take()
        };
        lock(&self.port).disable_receive();

        if let Some(poll) = pending {
            poll.abort();
            // a cancelled poll reports a JoinError; either way it is gone
            let _ = poll.await;
        }
        debug!("MobilePro link stopped");
    }
}
