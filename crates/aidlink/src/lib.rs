//! Stream images from a running program to a remote image viewer.
//!
//! A [`client::Transmitter`] opens a TCP connection per image, waits for the
//! viewer's readiness byte and sends a single frame: magic, fixed header,
//! format/name/notes strings and the raw pixel payload.
//!
//! # Crate Structure
//!
//! - [`transport`]: TCP connection establishment and process-wide socket setup
//! - [`frame`]: Wire header codec, frame writer/reader and channel adjustments
//! - [`client`]: Transmission facade, readiness handshake and viewer listener
//!   (behind the `client` feature)

/// Re-export transport types.
pub mod transport {
    pub use aidlink_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use aidlink_frame::*;
}

/// Re-export client types (requires `client` feature).
#[cfg(feature = "client")]
pub mod client {
    pub use aidlink_client::*;
}
