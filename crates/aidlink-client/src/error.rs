use std::fmt;
use std::time::Duration;

use aidlink_frame::{FrameError, Section};
use aidlink_transport::TransportError;

/// Phase of a send; failures report the phase they stopped in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SendStage {
    Validating,
    Resolving,
    Connecting,
    Handshake,
    SendingHeader,
    SendingStrings,
    SendingPayload,
}

impl fmt::Display for SendStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SendStage::Validating => "validating",
            SendStage::Resolving => "resolving",
            SendStage::Connecting => "connecting",
            SendStage::Handshake => "handshake",
            SendStage::SendingHeader => "sending-header",
            SendStage::SendingStrings => "sending-strings",
            SendStage::SendingPayload => "sending-payload",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while transmitting or receiving an image.
#[derive(Debug, thiserror::Error)]
pub enum TransmitError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// Reading the readiness byte failed.
    #[error("readiness receive failed: {0}")]
    Recv(std::io::Error),

    /// The viewer closed the connection before signalling readiness.
    #[error("viewer closed the connection before signalling readiness")]
    PeerClosed,

    /// The viewer never signalled readiness within the poll budget.
    #[error("viewer not ready after {polls} polls of {poll_timeout:?}")]
    HandshakeTimeout { polls: u32, poll_timeout: Duration },
}

impl TransmitError {
    /// The send phase this error stopped in.
    pub fn stage(&self) -> SendStage {
        match self {
            TransmitError::Transport(err) => match err {
                TransportError::Resolve { .. }
                | TransportError::NoAddress { .. }
                | TransportError::HostTooLong { .. } => SendStage::Resolving,
                _ => SendStage::Connecting,
            },
            TransmitError::Frame(FrameError::PayloadTooLarge { .. }) => SendStage::Validating,
            TransmitError::Frame(err) => match err.section() {
                Some(Section::Format | Section::Name | Section::Notes) => SendStage::SendingStrings,
                Some(Section::Payload) => SendStage::SendingPayload,
                Some(Section::Magic | Section::Header) | None => SendStage::SendingHeader,
            },
            TransmitError::Recv(_)
            | TransmitError::PeerClosed
            | TransmitError::HandshakeTimeout { .. } => SendStage::Handshake,
        }
    }
}

pub type Result<T> = std::result::Result<T, TransmitError>;
