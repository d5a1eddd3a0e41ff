//! Common test utilities: scripted hardware behind the link traits

// Shared across test files; not every item is used in each one
#[allow(unused_imports)]
pub use bytes::Bytes;
#[allow(unused_imports)]
pub use hex;
#[allow(unused_imports)]
pub use hpc_link_lib::battery::{Battery, BatteryKind, BatteryStatus, PowerSupply};
#[allow(unused_imports)]
pub use hpc_link_lib::config::{FramerConfig, KeymapKind, McuConfig};
#[allow(unused_imports)]
pub use hpc_link_lib::display::{Backlight, Lcd, PowerLine};
#[allow(unused_imports)]
pub use hpc_link_lib::error::{DiscardReason, LinkError};
#[allow(unused_imports)]
pub use hpc_link_lib::event::{InputEvent, KeyEvent, TouchSample};
#[allow(unused_imports)]
pub use hpc_link_lib::framer::{Framer, SerialPort};
#[allow(unused_imports)]
pub use hpc_link_lib::keyboard::Keyboard;
#[allow(unused_imports)]
pub use hpc_link_lib::keymap::KeyCode;
#[allow(unused_imports)]
pub use hpc_link_lib::mcu::{Command, Mcu, McuPort, StartError, reverse};
#[allow(unused_imports)]
pub use hpc_link_lib::touch::{PenDetect, Touchscreen};

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;

/// Route library logs to the test output; `RUST_LOG` picks the level.
#[allow(dead_code)]
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .with_target(false)
        .try_init();
}

/// MCU dummy byte, the answer to a command that was understood
#[allow(dead_code)]
pub const ACK: u8 = 0x11;

/// Short ready timeout so an exhausted script fails fast
#[allow(dead_code)]
pub const FAST_MCU: McuConfig = McuConfig {
    ready_timeout: 1_000,
    drain_limit: 256,
};

#[allow(dead_code)]
#[derive(Default)]
struct McuWire {
    replies: VecDeque<u8>,
    sent: Vec<u8>,
    enable: Vec<bool>,
}

/// MCU that answers from a script of logical (unreversed) bytes.
///
/// The ready line is high while script bytes remain.
#[allow(dead_code)]
pub struct ScriptedMcu {
    wire: Arc<Mutex<McuWire>>,
    stuck: bool,
}

/// Test-side view of a [`ScriptedMcu`].
#[allow(dead_code)]
#[derive(Clone)]
pub struct McuProbe {
    wire: Arc<Mutex<McuWire>>,
}

#[allow(dead_code)]
impl ScriptedMcu {
    pub fn new() -> (Self, McuProbe) {
        let wire = Arc::new(Mutex::new(McuWire::default()));
        (
            Self {
                wire: Arc::clone(&wire),
                stuck: false,
            },
            McuProbe { wire },
        )
    }

    /// An MCU whose ready line never rises.
    pub fn stuck() -> (Self, McuProbe) {
        let (mut mcu, probe) = Self::new();
        mcu.stuck = true;
        (mcu, probe)
    }
}

impl McuPort for ScriptedMcu {
    fn ready(&mut self) -> bool {
        !self.stuck && !self.wire.lock().unwrap().replies.is_empty()
    }

    fn transfer(&mut self, byte: u8) -> u8 {
        let mut wire = self.wire.lock().unwrap();
        wire.sent.push(byte);
        let reply = wire.replies.pop_front().unwrap_or(ACK);
        reverse(reply)
    }

    fn set_enable(&mut self, asserted: bool) {
        self.wire.lock().unwrap().enable.push(asserted);
    }
}

#[allow(dead_code)]
impl McuProbe {
    /// Queue logical reply bytes.
    pub fn reply(&self, bytes: &[u8]) {
        self.wire.lock().unwrap().replies.extend(bytes.iter().copied());
    }

    /// Bytes the host sent, as logical values.
    pub fn sent(&self) -> Vec<u8> {
        self.wire.lock().unwrap().sent.iter().map(|&b| reverse(b)).collect()
    }

    /// Bytes exactly as they were clocked onto the wire.
    pub fn wire(&self) -> Vec<u8> {
        self.wire.lock().unwrap().sent.clone()
    }

    pub fn clear_sent(&self) {
        self.wire.lock().unwrap().sent.clear();
    }

    pub fn enable_history(&self) -> Vec<bool> {
        self.wire.lock().unwrap().enable.clone()
    }

    /// Whether the MCU enable line is currently asserted.
    pub fn enabled(&self) -> bool {
        self.wire.lock().unwrap().enable.last().copied().unwrap_or(false)
    }

    pub fn pending_replies(&self) -> usize {
        self.wire.lock().unwrap().replies.len()
    }
}

#[allow(dead_code)]
pub fn scripted_mcu() -> (Arc<Mcu<ScriptedMcu>>, McuProbe) {
    init_logging();
    let (port, probe) = ScriptedMcu::new();
    (Arc::new(Mcu::with_config(port, FAST_MCU)), probe)
}

#[allow(dead_code)]
#[derive(Default)]
struct SerialWire {
    rx: VecDeque<u8>,
    tx: Vec<u8>,
    rts: Vec<bool>,
    overrun: bool,
    receive_disabled: bool,
}

/// UART with a FIFO the test fills by hand.
#[allow(dead_code)]
pub struct MockSerial {
    wire: Arc<Mutex<SerialWire>>,
}

#[allow(dead_code)]
#[derive(Clone)]
pub struct SerialProbe {
    wire: Arc<Mutex<SerialWire>>,
}

#[allow(dead_code)]
impl MockSerial {
    pub fn new() -> (Self, SerialProbe) {
        let wire = Arc::new(Mutex::new(SerialWire::default()));
        (
            Self {
                wire: Arc::clone(&wire),
            },
            SerialProbe { wire },
        )
    }
}

impl SerialPort for MockSerial {
    fn overrun(&mut self) -> bool {
        std::mem::take(&mut self.wire.lock().unwrap().overrun)
    }

    fn flush_rx(&mut self) {
        self.wire.lock().unwrap().rx.clear();
    }

    fn read_byte(&mut self) -> Option<u8> {
        self.wire.lock().unwrap().rx.pop_front()
    }

    fn write_byte(&mut self, byte: u8) {
        self.wire.lock().unwrap().tx.push(byte);
    }

    fn set_rts(&mut self, asserted: bool) {
        self.wire.lock().unwrap().rts.push(asserted);
    }

    fn disable_receive(&mut self) {
        self.wire.lock().unwrap().receive_disabled = true;
    }
}

#[allow(dead_code)]
impl SerialProbe {
    /// Put one receive episode into the FIFO.
    pub fn receive(&self, bytes: &[u8]) {
        self.wire.lock().unwrap().rx.extend(bytes.iter().copied());
    }

    pub fn receive_hex(&self, hex_data: &str) {
        self.receive(&hex::decode(hex_data).expect("Failed to decode hex"));
    }

    pub fn set_overrun(&self) {
        self.wire.lock().unwrap().overrun = true;
    }

    pub fn tx(&self) -> Vec<u8> {
        self.wire.lock().unwrap().tx.clone()
    }

    pub fn polls_sent(&self) -> usize {
        self.tx().iter().filter(|&&b| b == 0x13).count()
    }

    pub fn rx_len(&self) -> usize {
        self.wire.lock().unwrap().rx.len()
    }

    pub fn rts_history(&self) -> Vec<bool> {
        self.wire.lock().unwrap().rts.clone()
    }

    pub fn receive_disabled(&self) -> bool {
        self.wire.lock().unwrap().receive_disabled
    }
}

/// Fixed board power lines.
#[allow(dead_code)]
pub struct FixedSupply {
    pub ac_online: bool,
    pub charging: bool,
}

impl PowerSupply for FixedSupply {
    fn ac_online(&self) -> bool {
        self.ac_online
    }

    fn charging(&self) -> bool {
        self.charging
    }
}

#[allow(dead_code)]
pub struct FixedPen(pub bool);

impl PenDetect for FixedPen {
    fn pen_down(&self) -> bool {
        self.0
    }
}

/// A power line whose state the test can observe.
#[allow(dead_code)]
#[derive(Clone, Default)]
pub struct SharedLine(pub Arc<AtomicBool>);

impl PowerLine for SharedLine {
    fn is_on(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn set(&mut self, on: bool) {
        self.0.store(on, Ordering::SeqCst);
    }
}

/// Key matrix poll reply with the given (byte, bit) positions held down.
#[allow(dead_code)]
pub fn poll_reply(held: &[(usize, u8)]) -> Vec<u8> {
    let mut frame = vec![0xFF; 14];
    frame[0] = 0x13;
    for &(byte, bit) in held {
        frame[byte] &= !(1 << bit);
    }
    frame
}
