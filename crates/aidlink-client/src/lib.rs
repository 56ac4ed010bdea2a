//! High-level image transmission to a remote viewer.
//!
//! This is the "just works" layer. Configure a [`Transmitter`] once, tune the
//! per-channel display adjustments, and call [`Transmitter::send`] for every
//! image. Each send opens its own connection, waits for the viewer's readiness
//! byte, writes one frame and closes the connection again.

pub mod config;
pub mod error;
pub mod handshake;
pub mod listener;
pub mod transmitter;

pub use config::{TransmissionConfig, DEFAULT_HOST, DEFAULT_PORT, DEFAULT_TIMEOUT};
pub use error::{Result, SendStage, TransmitError};
pub use handshake::{
    await_ready, await_ready_on, HandshakeConfig, DEFAULT_MAX_POLLS, DEFAULT_POLL_TIMEOUT,
    READY_BYTE,
};
pub use listener::{ViewerListener, ViewerSession};
pub use transmitter::{SendReport, Transmitter};

pub use aidlink_frame::{AuxFlags, Channel, ImageDescriptor, ImageFrame};
pub use aidlink_transport::RetryPolicy;
