use std::net::SocketAddr;

/// Errors that can occur while establishing a viewer connection.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The host name could not be resolved.
    #[error("failed to resolve {host}:{port}: {source}")]
    Resolve {
        host: String,
        port: u16,
        source: std::io::Error,
    },

    /// Resolution succeeded but produced no usable address.
    #[error("no address found for {host}:{port}")]
    NoAddress { host: String, port: u16 },

    /// The host name exceeds the protocol limit.
    #[error("host name too long ({len} bytes, max {max})")]
    HostTooLong { len: usize, max: usize },

    /// A required socket option could not be applied.
    #[error("failed to set socket option {option}: {source}")]
    SocketOption {
        option: &'static str,
        source: std::io::Error,
    },

    /// Every connect attempt failed.
    #[error("failed to connect to {addr} after {attempts} attempt(s): {source}")]
    ConnectRetriesExhausted {
        addr: SocketAddr,
        attempts: u32,
        source: std::io::Error,
    },

    /// Process-wide transport setup failed.
    #[error("transport runtime initialization failed: {0}")]
    Runtime(std::io::Error),

    /// An I/O error occurred on the transport stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TransportError>;
