use strum_macros::Display;
use thiserror::Error;

/// Why a received serial frame was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum DiscardReason {
    #[strum(to_string = "empty receive episode")]
    Empty,
    /// The FIFO cap was hit; the frame is longer than any known packet.
    #[strum(to_string = "unsupported packet size")]
    Overlong,
    #[strum(to_string = "unknown packet length")]
    UnknownLength,
    #[strum(to_string = "unexpected leading byte")]
    UnexpectedLead,
    /// Too many key state changes in one poll response.
    #[strum(to_string = "noisy key matrix")]
    Noise,
}

/// The primary error type for the `hpc-link-lib` library.
#[derive(Error, Debug)]
pub enum LinkError {
    #[error("MCU did not signal ready within {polls} polls")]
    Timeout { polls: u32 },

    #[error("Leftover MCU data at transaction start (first byte {first:#04x}, drained {drained})")]
    ProtocolDesync { first: u8, drained: usize },

    #[error("MCU acknowledged with {actual:#04x}, expected {expected:#04x}")]
    ProtocolError { expected: u8, actual: u8 },

    #[error("Discarded {len}-byte frame: {reason}")]
    FramingDiscard { len: usize, reason: DiscardReason },

    #[error("Invalid config: {0}")]
    Config(String),

    #[error("Config parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LinkError {
    pub(crate) fn discard(len: usize, reason: DiscardReason) -> Self {
        LinkError::FramingDiscard { len, reason }
    }
}
