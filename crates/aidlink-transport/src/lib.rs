//! TCP transport for the aidlink image protocol.
//!
//! Resolves the viewer host, dials a stream socket with a bounded number of
//! attempts, and applies the socket options the protocol relies on (linger on
//! close). Also owns the process-wide transport runtime (signal disposition
//! on Unix, Winsock startup on Windows).
//!
//! This is the lowest layer of aidlink. Everything else builds on top of
//! the [`Connection`] type provided here.

pub mod error;
pub mod runtime;
pub mod tcp;

pub use error::{Result, TransportError};
pub use tcp::{
    connect, connect_with, resolve, set_linger, ConnectConfig, Connection, Dialer, Link,
    RetryPolicy, TcpDialer, DEFAULT_CONNECT_ATTEMPTS, DEFAULT_LINGER, DEFAULT_RETRY_DELAY,
    MAX_HOST_LEN,
};
