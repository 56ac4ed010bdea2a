use std::io::{ErrorKind, Read};
use std::time::Duration;

use aidlink_transport::{Connection, Link, TransportError};
use tracing::{debug, trace};

use crate::error::{Result, TransmitError};

/// Byte the viewer writes once it can accept an image.
pub const READY_BYTE: u8 = b'$';
/// Wait per readiness poll.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(250);
/// Poll budget before giving up on the viewer.
pub const DEFAULT_MAX_POLLS: u32 = 10_000;

/// Readiness wait parameters.
///
/// The worst-case wait is `poll_timeout * max_polls`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeConfig {
    /// How long a single poll blocks waiting for a byte.
    pub poll_timeout: Duration,
    /// Number of polls (timeouts or non-readiness bytes) tolerated.
    pub max_polls: u32,
    /// Byte that signals readiness.
    pub ready_byte: u8,
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            max_polls: DEFAULT_MAX_POLLS,
            ready_byte: READY_BYTE,
        }
    }
}

/// Wait for the readiness byte on `conn`, polling with `config.poll_timeout`.
///
/// Returns the number of polls consumed before the byte arrived.
pub fn await_ready_on<L: Link>(conn: &mut Connection<L>, config: &HandshakeConfig) -> Result<u32> {
    let poll_timeout = config.poll_timeout.max(Duration::from_millis(1));
    conn.set_read_timeout(Some(poll_timeout))
        .map_err(|err| match err {
            TransportError::Io(source) => TransmitError::Recv(source),
            other => TransmitError::Transport(other),
        })?;
    await_ready(conn, config)
}

/// Read single bytes from `reader` until the readiness byte arrives.
///
/// `reader` is expected to time out its reads (`WouldBlock`/`TimedOut`); each
/// timeout or non-readiness byte consumes one poll. End of stream and other
/// read errors fail immediately.
pub fn await_ready<R: Read + ?Sized>(reader: &mut R, config: &HandshakeConfig) -> Result<u32> {
    let max_polls = config.max_polls.max(1);
    let mut polls = 0u32;
    let mut byte = [0u8; 1];

    loop {
        match reader.read(&mut byte) {
            Ok(0) => return Err(TransmitError::PeerClosed),
            Ok(_) if byte[0] == config.ready_byte => {
                debug!(polls, "viewer ready");
                return Ok(polls);
            }
            Ok(_) => trace!(byte = byte[0], "ignoring non-readiness byte"),
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {}
            Err(err) => return Err(TransmitError::Recv(err)),
        }

        polls += 1;
        if polls >= max_polls {
            return Err(TransmitError::HandshakeTimeout {
                polls,
                poll_timeout: config.poll_timeout,
            });
        }
    }
}
